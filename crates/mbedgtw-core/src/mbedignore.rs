//! Temporary `.mbedignore` patch
//!
//! Greentea tests are compiled together with the project sources, so the
//! project's own `main()` would collide with the test's. While tests are being
//! compiled, typical main file locations are appended to `.mbedignore`; the
//! original file is restored when the guard is dropped.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Ignore file name
pub const MBEDIGNORE_FILE: &str = ".mbedignore";

const BLOCK_START: &str = "# GREENTEA_COMPILE_PROJECT_PATH START";
const BLOCK_END: &str = "# GREENTEA_COMPILE_PROJECT_PATH END";

/// Patterns excluded while compiling tests
pub const MAIN_FILE_PATTERNS: &[&str] = &["main.cpp", "*_main.cpp", "*/main.cpp", "*/*_main.cpp"];

/// Restores `.mbedignore` on drop
#[derive(Debug)]
pub struct MbedignorePatch {
    path: PathBuf,
    original: Option<String>,
    restored: bool,
}

impl MbedignorePatch {
    /// Append the main-file exclusion block to `<project_dir>/.mbedignore`
    pub fn apply(project_dir: &Path) -> io::Result<Self> {
        Self::apply_with(project_dir, |path, content| fs::write(path, content))
    }

    fn apply_with(
        project_dir: &Path,
        write: impl FnOnce(&Path, &str) -> io::Result<()>,
    ) -> io::Result<Self> {
        let path = project_dir.join(MBEDIGNORE_FILE);

        let original = if path.exists() {
            Some(strip_stale_block(&fs::read_to_string(&path)?))
        } else {
            None
        };

        let mut content = original.clone().unwrap_or_default();
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(BLOCK_START);
        content.push('\n');
        for pattern in MAIN_FILE_PATTERNS {
            content.push_str(pattern);
            content.push('\n');
        }
        content.push_str(BLOCK_END);
        content.push('\n');

        // a failed write is undone by the guard's drop
        let patch = Self {
            path,
            original,
            restored: false,
        };
        write(&patch.path, &content)?;
        log::debug!("Patched {}", patch.path.display());
        Ok(patch)
    }

    /// Restore the original file now, reporting errors
    pub fn restore(mut self) -> io::Result<()> {
        self.restore_inner()
    }

    fn restore_inner(&mut self) -> io::Result<()> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        match &self.original {
            Some(data) => fs::write(&self.path, data),
            None => fs::remove_file(&self.path),
        }
    }
}

impl Drop for MbedignorePatch {
    fn drop(&mut self) {
        if let Err(e) = self.restore_inner() {
            log::warn!("Failed to restore {}: {}", self.path.display(), e);
        }
    }
}

/// Drop a block left behind by an interrupted run (and everything after it)
fn strip_stale_block(data: &str) -> String {
    let mut result = String::with_capacity(data.len());
    for line in data.split_inclusive('\n') {
        if line.starts_with(BLOCK_START) {
            break;
        }
        result.push_str(line);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MBEDIGNORE_FILE);

        let patch = MbedignorePatch::apply(dir.path()).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(BLOCK_START));
        for pattern in MAIN_FILE_PATTERNS {
            assert!(content.lines().any(|l| l == *pattern));
        }

        drop(patch);
        assert!(!path.exists());
    }

    #[test]
    fn test_patch_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MBEDIGNORE_FILE);
        fs::write(&path, "mbed-os/features/*\ndocs/*").unwrap();

        let patch = MbedignorePatch::apply(dir.path()).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("mbed-os/features/*\ndocs/*\n"));
        assert!(content.contains("*/*_main.cpp\n"));

        patch.restore().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "mbed-os/features/*\ndocs/*");
    }

    #[test]
    fn test_failed_write_restores_original() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MBEDIGNORE_FILE);
        fs::write(&path, "docs/*\n").unwrap();

        let result = MbedignorePatch::apply_with(dir.path(), |path, _| {
            fs::write(path, "")?;
            Err(io::Error::new(io::ErrorKind::WriteZero, "disk full"))
        });
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::WriteZero);
        assert_eq!(fs::read_to_string(&path).unwrap(), "docs/*\n");
    }

    #[test]
    fn test_failed_write_removes_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MBEDIGNORE_FILE);

        let result = MbedignorePatch::apply_with(dir.path(), |path, _| {
            fs::write(path, "main.cpp\n")?;
            Err(io::Error::other("interrupted"))
        });
        assert!(result.is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_stale_block_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MBEDIGNORE_FILE);
        let stale = format!("docs/*\n{}\nmain.cpp\n", BLOCK_START);
        fs::write(&path, stale).unwrap();

        {
            let _patch = MbedignorePatch::apply(dir.path()).unwrap();
            let content = fs::read_to_string(&path).unwrap();
            assert_eq!(content.matches(BLOCK_START).count(), 1);
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "docs/*\n");
    }
}
