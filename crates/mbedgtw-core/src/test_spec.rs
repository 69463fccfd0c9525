//! Greentea test specification (`test_spec.json`)
//!
//! `mbed test --greentea --compile` writes an index of the built test binaries
//! next to them:
//!
//! ```json
//! {
//!     "builds": {
//!         "BLACKPILL_F401CC-GCC_ARM": {
//!             "platform": "BLACKPILL_F401CC",
//!             "toolchain": "GCC_ARM",
//!             "base_path": "BUILD/tests/BLACKPILL_F401CC/GCC_ARM-DEBUG",
//!             "baud_rate": 9600,
//!             "binary_type": "bootable",
//!             "tests": {
//!                 "tests-demo-demo": {
//!                     "binaries": [{"path": "BUILD/tests/.../tests-demo-demo.bin"}]
//!                 }
//!             },
//!             "test_apps": {}
//!         }
//!     }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::TestSpecError;
use crate::project::DEFAULT_BAUD_RATE;

/// File name of the test specification
pub const TEST_SPEC_FILE: &str = "test_spec.json";

/// Whole `test_spec.json` document
#[derive(Debug, Clone, Deserialize)]
pub struct TestSpec {
    #[serde(default)]
    pub builds: BTreeMap<String, TestBuild>,
}

/// One target/toolchain build
#[derive(Debug, Clone, Deserialize)]
pub struct TestBuild {
    pub platform: String,
    pub toolchain: String,
    #[serde(default)]
    pub base_path: Option<String>,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default)]
    pub binary_type: Option<String>,
    #[serde(default)]
    pub tests: BTreeMap<String, TestEntry>,
}

/// One greentea test
#[derive(Debug, Clone, Deserialize)]
pub struct TestEntry {
    #[serde(default)]
    pub binaries: Vec<TestBinary>,
}

/// A built test image
#[derive(Debug, Clone, Deserialize)]
pub struct TestBinary {
    pub path: String,
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

/// A test selected to run, with its image path resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedTest {
    pub name: String,
    pub image_path: PathBuf,
}

impl TestSpec {
    /// Parse a test specification
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Load a test specification from a file
    pub fn load(path: &Path) -> Result<Self, TestSpecError> {
        let text = fs::read_to_string(path).map_err(|source| TestSpecError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| TestSpecError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Find the build for a target/toolchain pair (case-insensitive)
    pub fn build_for(&self, target: &str, toolchain: &str) -> Result<&TestBuild, TestSpecError> {
        self.builds
            .values()
            .find(|b| {
                b.platform.eq_ignore_ascii_case(target) && b.toolchain.eq_ignore_ascii_case(toolchain)
            })
            .ok_or_else(|| TestSpecError::MissingBuild {
                target: target.to_string(),
                toolchain: toolchain.to_string(),
            })
    }
}

impl TestBuild {
    /// Tests matching the filter, sorted by name, with image paths resolved
    /// against `project_dir`
    pub fn select_tests(
        &self,
        filter: &TestFilter,
        project_dir: &Path,
    ) -> Result<Vec<SelectedTest>, TestSpecError> {
        let mut selected = Vec::new();
        for (name, entry) in &self.tests {
            if !filter.matches(name) {
                continue;
            }
            let binary = entry.binaries.first().ok_or_else(|| TestSpecError::NoBinaries {
                test: name.clone(),
            })?;
            let path = Path::new(&binary.path);
            let image_path = if path.is_absolute() {
                path.to_path_buf()
            } else {
                project_dir.join(path)
            };
            selected.push(SelectedTest {
                name: name.clone(),
                image_path,
            });
        }
        Ok(selected)
    }
}

/// Test name filter from `--tests-by-name` (comma-separated, `*` wildcard)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestFilter {
    patterns: Vec<String>,
}

impl TestFilter {
    /// Filter that accepts every test
    pub fn all() -> Self {
        Self::default()
    }

    /// Parse `test1,test2,tests-foo-*`
    pub fn parse(spec: &str) -> Self {
        Self {
            patterns: spec
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// True if the filter accepts every test
    pub fn is_all(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Check a test name against the filter
    pub fn matches(&self, name: &str) -> bool {
        self.is_all() || self.patterns.iter().any(|p| wildcard_match(p, name))
    }
}

/// Match `name` against a pattern where `*` matches any run of characters
fn wildcard_match(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();
    let (mut p, mut n) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while n < name.len() {
        if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, n));
            p += 1;
        } else if p < pattern.len() && pattern[p] == name[n] {
            p += 1;
            n += 1;
        } else if let Some((star_p, star_n)) = backtrack {
            p = star_p + 1;
            n = star_n + 1;
            backtrack = Some((star_p, star_n + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|&c| c == '*')
}
