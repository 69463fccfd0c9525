//! Board-manager script invoker
//!
//! The script implements three commands:
//!
//! ```text
//! <script> list                                         -> JSON array of targets
//! <script> flash --target-id <id> --image-path <path>   -> exit 0 on success
//! <script> reset --target-id <id>                       -> exit 0 on success
//! ```
//!
//! Failures are surfaced once; nothing is retried.

use std::env;
use std::path::{Path, PathBuf};

use mbedgtw_core::{TargetRecord, TargetRegistry};

use crate::error::AdapterError;
use crate::process::{CommandRunner, Invocation, ProcessOutput};

/// Result type for board-manager operations
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Wrapper around a board-manager script
pub struct BoardManager<'r> {
    runner: &'r dyn CommandRunner,
    script: PathBuf,
    registry: TargetRegistry,
}

impl<'r> BoardManager<'r> {
    /// Locate the script (PATH first, then a file path) and create a manager
    pub fn new(runner: &'r dyn CommandRunner, script: &str) -> Result<Self> {
        let script = resolve_script(script)?;
        log::debug!("Using board manager script {}", script.display());
        Ok(Self::with_script_path(runner, script))
    }

    /// Create a manager for an already-resolved script path
    pub fn with_script_path(runner: &'r dyn CommandRunner, script: PathBuf) -> Self {
        Self {
            runner,
            script,
            registry: TargetRegistry::new(),
        }
    }

    /// Resolved script path
    pub fn script(&self) -> &Path {
        &self.script
    }

    /// Targets reported by the last successful `list` call
    pub fn registry(&self) -> &TargetRegistry {
        &self.registry
    }

    /// Run `<script> list` and remember the result
    pub fn list(&mut self) -> Result<&TargetRegistry> {
        let output = self.run(&["list"])?;
        self.registry = TargetRegistry::from_json(&output.stdout)?;
        log::debug!("Board manager reported {} target(s)", self.registry.len());
        Ok(&self.registry)
    }

    /// Look up a target from the last `list` call
    pub fn target(&self, target_id: &str) -> Result<&TargetRecord> {
        self.registry
            .get(target_id)
            .ok_or_else(|| AdapterError::UnknownTarget(target_id.to_string()))
    }

    /// Run `<script> flash --target-id <id> --image-path <path>`
    ///
    /// If `image_path` doesn't carry the target's image format extension, the
    /// sibling file with the right extension is flashed instead. Returns the
    /// path that was actually flashed.
    pub fn flash(&self, target_id: &str, image_path: &Path) -> Result<PathBuf> {
        let target = self.target(target_id)?;
        let image_path = resolve_image(target, image_path)?;
        let image_arg = image_path.to_string_lossy().into_owned();
        self.run(&[
            "flash",
            "--target-id",
            target.target_id.as_str(),
            "--image-path",
            image_arg.as_str(),
        ])?;
        Ok(image_path)
    }

    /// Run `<script> reset --target-id <id>`
    ///
    /// Rejected without invoking the script if the target doesn't declare
    /// `reset_command`.
    pub fn reset(&self, target_id: &str) -> Result<()> {
        let target = self.target(target_id)?;
        if !target.reset_command {
            return Err(AdapterError::ResetUnsupported(target_id.to_string()));
        }
        self.run(&["reset", "--target-id", target.target_id.as_str()])?;
        Ok(())
    }

    fn run(&self, args: &[&str]) -> Result<ProcessOutput> {
        let invocation = Invocation::new(&self.script).args(args);
        log::info!("Run external board manager script: {}", invocation);

        let output = self.runner.output(&invocation)?;
        if !output.success() {
            return Err(AdapterError::CommandFailed {
                command: invocation.to_string(),
                code: output.code,
                stderr: output.stderr,
            });
        }
        if !output.stderr.trim().is_empty() {
            log::debug!("{} stderr:\n{}", args[0], output.stderr.trim_end());
        }
        Ok(output)
    }
}

/// Make the image path absolute and match it to the target's image format
fn resolve_image(target: &TargetRecord, image_path: &Path) -> Result<PathBuf> {
    let image_path = absolute(image_path);
    if target.image_format.matches_path(&image_path) {
        return Ok(image_path);
    }

    let candidate = image_path.with_extension(target.image_format.extension());
    if candidate.is_file() {
        log::debug!(
            "Target {} expects {} images, using {}",
            target.target_id,
            target.image_format,
            candidate.display()
        );
        Ok(candidate)
    } else {
        Err(AdapterError::ImageNotFound(candidate))
    }
}

/// Find the script on PATH, or accept it as a file path
pub fn resolve_script(script: &str) -> Result<PathBuf> {
    if let Some(found) = find_in_path(script) {
        return Ok(found);
    }
    let path = Path::new(script);
    if path.is_file() {
        return Ok(absolute(path));
    }
    Err(AdapterError::ScriptNotFound(script.to_string()))
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    if name.is_empty() || Path::new(name).components().count() != 1 {
        return None;
    }
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;
    use mbedgtw_core::ImageFormat;

    const ONE_TARGET: &str = r#"[{"target_id": "FFFF00000000000000000000", "target_name": "BLACKPILL_F401CC",
        "serial_port": "/dev/ttyUSB0", "image_format": "elf", "reset_command": false}]"#;

    fn manager(runner: &ScriptedRunner) -> BoardManager<'_> {
        BoardManager::with_script_path(runner, PathBuf::from("/opt/bm.sh"))
    }

    #[test]
    fn test_list() {
        let runner = ScriptedRunner::new();
        runner.push_output(0, ONE_TARGET, "");
        let mut bm = manager(&runner);

        let registry = bm.list().unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.targets()[0].image_format, ImageFormat::Elf);

        let calls = runner.calls();
        assert_eq!(calls[0].program(), "/opt/bm.sh");
        assert_eq!(calls[0].args_lossy(), ["list"]);
    }

    #[test]
    fn test_list_failure_is_fatal() {
        let runner = ScriptedRunner::new();
        runner.push_output(2, "", "no usb access");
        let mut bm = manager(&runner);
        match bm.list() {
            Err(AdapterError::CommandFailed { code, stderr, .. }) => {
                assert_eq!(code, Some(2));
                assert_eq!(stderr, "no usb access");
            }
            other => panic!("unexpected result: {:?}", other.map(|r| r.len())),
        }
    }

    #[test]
    fn test_list_invalid_output() {
        let runner = ScriptedRunner::new();
        runner.push_output(0, "Found 1 board", "");
        let mut bm = manager(&runner);
        assert!(matches!(bm.list(), Err(AdapterError::InvalidListOutput(_))));
    }

    #[test]
    fn test_empty_list_rejects_flash_and_reset() {
        let runner = ScriptedRunner::new();
        runner.push_output(0, "[]", "");
        let mut bm = manager(&runner);
        assert!(bm.list().unwrap().is_empty());

        assert!(matches!(
            bm.flash("FFFF00000000000000000000", Path::new("/tmp/app.elf")),
            Err(AdapterError::UnknownTarget(_))
        ));
        assert!(matches!(
            bm.reset("FFFF00000000000000000000"),
            Err(AdapterError::UnknownTarget(_))
        ));
        // only the list call reached the script
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn test_flash_passes_exact_arguments() {
        let runner = ScriptedRunner::new();
        runner.push_output(0, ONE_TARGET, "");
        runner.push_output(0, "", "");
        let mut bm = manager(&runner);
        bm.list().unwrap();

        let flashed = bm
            .flash("FFFF00000000000000000000", Path::new("/work/build/app.elf"))
            .unwrap();
        assert_eq!(flashed, PathBuf::from("/work/build/app.elf"));

        let calls = runner.calls();
        assert_eq!(
            calls[1].args_lossy(),
            [
                "flash",
                "--target-id",
                "FFFF00000000000000000000",
                "--image-path",
                "/work/build/app.elf"
            ]
        );
    }

    #[test]
    fn test_flash_format_mismatch_is_rejected_before_invocation() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("app.bin");
        std::fs::write(&bin, b"image").unwrap();

        let runner = ScriptedRunner::new();
        runner.push_output(0, ONE_TARGET, "");
        let mut bm = manager(&runner);
        bm.list().unwrap();

        match bm.flash("FFFF00000000000000000000", &bin) {
            Err(AdapterError::ImageNotFound(path)) => assert_eq!(path, dir.path().join("app.elf")),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn test_flash_uses_sibling_image() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.bin"), b"image").unwrap();
        std::fs::write(dir.path().join("app.elf"), b"image").unwrap();

        let runner = ScriptedRunner::new();
        runner.push_output(0, ONE_TARGET, "");
        runner.push_output(0, "", "");
        let mut bm = manager(&runner);
        bm.list().unwrap();

        let flashed = bm
            .flash("FFFF00000000000000000000", &dir.path().join("app.bin"))
            .unwrap();
        assert_eq!(flashed, dir.path().join("app.elf"));
    }

    #[test]
    fn test_flash_failure_carries_exit_code() {
        let runner = ScriptedRunner::new();
        runner.push_output(0, ONE_TARGET, "");
        runner.push_output(5, "", "probe not responding");
        let mut bm = manager(&runner);
        bm.list().unwrap();

        assert!(matches!(
            bm.flash("FFFF00000000000000000000", Path::new("/work/app.elf")),
            Err(AdapterError::CommandFailed { code: Some(5), .. })
        ));
    }

    #[test]
    fn test_reset_requires_reset_command() {
        let runner = ScriptedRunner::new();
        runner.push_output(0, ONE_TARGET, "");
        let mut bm = manager(&runner);
        bm.list().unwrap();

        assert!(matches!(
            bm.reset("FFFF00000000000000000000"),
            Err(AdapterError::ResetUnsupported(_))
        ));
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn test_reset() {
        let runner = ScriptedRunner::new();
        runner.push_output(
            0,
            r#"[{"target_id": "0740AA", "target_name": "NUCLEO_F401RE", "serial_port": "/dev/ttyACM0",
                "image_format": "bin", "reset_command": true}]"#,
            "",
        );
        runner.push_output(0, "", "");
        let mut bm = manager(&runner);
        bm.list().unwrap();

        bm.reset("0740AA").unwrap();
        assert_eq!(runner.calls()[1].args_lossy(), ["reset", "--target-id", "0740AA"]);
    }

    #[test]
    fn test_resolve_script() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("bm.sh");
        std::fs::write(&script, "#!/bin/sh\n").unwrap();

        assert_eq!(resolve_script(script.to_str().unwrap()).unwrap(), script);
        assert!(matches!(
            resolve_script("/nonexistent/bm.sh"),
            Err(AdapterError::ScriptNotFound(_))
        ));
    }
}
