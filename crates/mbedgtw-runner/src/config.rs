//! Run configuration
//!
//! Built once by the CLI from arguments and `VZNNCV_MBEDGTW_*` environment
//! variables, then passed down to every pipeline.

use std::path::PathBuf;

/// Default mbed-cli command
pub const DEFAULT_MBED_CLI: &str = "mbed-cli";
/// Default host-test harness command
pub const DEFAULT_HTRUN: &str = "mbedhtrun";
/// Default greentea runner command
pub const DEFAULT_MBEDGT: &str = "mbedgt";
/// Default board listing command (used without a board-manager script)
pub const DEFAULT_MBEDLS: &str = "mbedls";

/// Commands used to start the vendor tools
///
/// Each value may contain arguments (`python3 -u -m mbed`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommands {
    pub mbed_cli: String,
    pub htrun: String,
    pub mbedgt: String,
    pub mbedls: String,
}

impl Default for ToolCommands {
    fn default() -> Self {
        Self {
            mbed_cli: DEFAULT_MBED_CLI.to_string(),
            htrun: DEFAULT_HTRUN.to_string(),
            mbedgt: DEFAULT_MBEDGT.to_string(),
            mbedls: DEFAULT_MBEDLS.to_string(),
        }
    }
}

/// Everything a pipeline needs to know about the current run
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Mbed project root
    pub project_dir: PathBuf,
    /// Board-manager script (name on PATH or file path)
    pub board_manager_script: Option<String>,
    /// `--tests-by-name` filter
    pub tests_by_name: Option<String>,
    /// Explicit target, overrides `.mbed`
    pub target: Option<String>,
    /// Explicit toolchain, overrides `.mbed`
    pub toolchain: Option<String>,
    /// Explicit build profile, overrides `.mbed`
    pub profile: Option<String>,
    /// Application configuration file
    pub app_config: Option<PathBuf>,
    /// Use existing build artifacts
    pub no_compile: bool,
    /// Verbosity level (number of `-v`)
    pub verbose: u8,
    pub tools: ToolCommands,
}

impl RunConfig {
    /// Configuration for a project with defaults everywhere else
    pub fn for_project(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            ..Self::default()
        }
    }

    /// `-v`, `-vv`, ... flag forwarded to mbed-cli, if any
    pub fn verbose_flag(&self) -> Option<String> {
        (self.verbose > 0).then(|| format!("-{}", "v".repeat(self.verbose as usize)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_flag() {
        let mut config = RunConfig::for_project("/p");
        assert_eq!(config.verbose_flag(), None);
        config.verbose = 2;
        assert_eq!(config.verbose_flag().as_deref(), Some("-vv"));
    }
}
