//! CLI argument parsing
//!
//! Every option can also be set through a `VZNNCV_MBEDGTW_*` environment
//! variable. Nothing below the CLI reads the environment; the parsed options
//! are folded into a single [`RunConfig`].

use clap::{Parser, Subcommand};
use mbedgtw_runner::config::{
    RunConfig, ToolCommands, DEFAULT_HTRUN, DEFAULT_MBEDGT, DEFAULT_MBEDLS, DEFAULT_MBED_CLI,
};
use std::path::PathBuf;

/// Prefix of the environment variables that mirror CLI options
pub const ENV_PREFIX: &str = "VZNNCV_MBEDGTW_";

#[derive(Parser)]
#[command(name = "mbedgtw")]
#[command(
    author,
    version,
    about = "Run Mbed OS greentea tests on boards managed by an external script",
    long_about = None
)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Mbed project location
#[derive(clap::Args, Debug, Clone)]
pub struct ProjectArgs {
    /// Mbed project root directory
    #[arg(long, env = "VZNNCV_MBEDGTW_PROJECT_DIR", default_value = ".")]
    pub project_dir: PathBuf,
}

/// Board-manager script selection
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ScriptArgs {
    /// Board manager script (name on PATH or file path) implementing
    /// `list`, `flash` and `reset`
    #[arg(short = 's', long, env = "VZNNCV_MBEDGTW_BOARD_MANAGER_SCRIPT")]
    pub board_manager_script: Option<String>,
}

/// Board-manager script that must be present
#[derive(clap::Args, Debug, Clone)]
pub struct RequiredScriptArgs {
    /// Board manager script (name on PATH or file path)
    #[arg(short = 's', long, env = "VZNNCV_MBEDGTW_BOARD_MANAGER_SCRIPT")]
    pub board_manager_script: String,
}

/// Greentea test name filter
#[derive(clap::Args, Debug, Clone, Default)]
pub struct TestFilterArgs {
    /// Comma-separated test names (`*` matches any characters)
    #[arg(short = 'n', long, env = "VZNNCV_MBEDGTW_TESTS_BY_NAME")]
    pub tests_by_name: Option<String>,
}

/// Options forwarded to the Mbed tools
#[derive(clap::Args, Debug, Clone)]
pub struct VendorArgs {
    /// Build target (defaults to TARGET from .mbed)
    #[arg(short = 'm', long, env = "VZNNCV_MBEDGTW_TARGET")]
    pub target: Option<String>,

    /// Toolchain (defaults to TOOLCHAIN from .mbed)
    #[arg(short = 't', long, env = "VZNNCV_MBEDGTW_TOOLCHAIN")]
    pub toolchain: Option<String>,

    /// Build profile name or path (defaults to PROFILE from .mbed, then "debug")
    #[arg(long, env = "VZNNCV_MBEDGTW_PROFILE")]
    pub profile: Option<String>,

    /// Application configuration file
    #[arg(long, env = "VZNNCV_MBEDGTW_APP_CONFIG")]
    pub app_config: Option<PathBuf>,

    /// mbed-cli command (may include arguments)
    #[arg(long, env = "VZNNCV_MBEDGTW_MBED_CLI", default_value = DEFAULT_MBED_CLI)]
    pub mbed_cli: String,

    /// Host test harness command
    #[arg(long, env = "VZNNCV_MBEDGTW_HTRUN", default_value = DEFAULT_HTRUN)]
    pub htrun: String,

    /// Greentea runner command, used when no board manager script is given
    #[arg(long, env = "VZNNCV_MBEDGTW_MBEDGT", default_value = DEFAULT_MBEDGT)]
    pub mbedgt: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List greentea tests of the project
    ListTests {
        #[command(flatten)]
        project: ProjectArgs,

        #[command(flatten)]
        filter: TestFilterArgs,

        #[command(flatten)]
        vendor: VendorArgs,
    },

    /// List boards reported by the board manager script
    ListTargets {
        #[command(flatten)]
        script: ScriptArgs,

        /// Print targets as JSON
        #[arg(short, long, env = "VZNNCV_MBEDGTW_JSON")]
        json: bool,

        /// Board listing command, used when no board manager script is given
        #[arg(long, env = "VZNNCV_MBEDGTW_MBEDLS", default_value = DEFAULT_MBEDLS)]
        mbedls: String,
    },

    /// Build greentea tests and run them on the attached board
    RunTests {
        #[command(flatten)]
        project: ProjectArgs,

        #[command(flatten)]
        script: ScriptArgs,

        #[command(flatten)]
        filter: TestFilterArgs,

        /// Use existing build artifacts
        #[arg(long, env = "VZNNCV_MBEDGTW_NO_COMPILE")]
        no_compile: bool,

        #[command(flatten)]
        vendor: VendorArgs,
    },

    /// Build the main program, flash it and run it as a greentea test
    RunMain {
        #[command(flatten)]
        project: ProjectArgs,

        #[command(flatten)]
        script: ScriptArgs,

        /// Use existing build artifacts
        #[arg(long, env = "VZNNCV_MBEDGTW_NO_COMPILE")]
        no_compile: bool,

        #[command(flatten)]
        vendor: VendorArgs,
    },

    /// Run the host test harness against an already flashed board
    #[command(visible_alias = "debug-test")]
    DebugTests {
        #[command(flatten)]
        project: ProjectArgs,

        #[command(flatten)]
        script: ScriptArgs,

        #[command(flatten)]
        filter: TestFilterArgs,

        #[command(flatten)]
        vendor: VendorArgs,
    },

    /// Flash an image through the board manager script
    Flash {
        #[command(flatten)]
        script: RequiredScriptArgs,

        /// Target id as reported by `list-targets`
        #[arg(long, env = "VZNNCV_MBEDGTW_TARGET_ID")]
        target_id: String,

        /// Firmware image
        #[arg(long, env = "VZNNCV_MBEDGTW_IMAGE_PATH")]
        image_path: PathBuf,
    },

    /// Reset a board through the board manager script
    Reset {
        #[command(flatten)]
        script: RequiredScriptArgs,

        /// Target id as reported by `list-targets`
        #[arg(long, env = "VZNNCV_MBEDGTW_TARGET_ID")]
        target_id: String,
    },
}

impl VendorArgs {
    fn apply(&self, config: &mut RunConfig) {
        config.target = self.target.clone();
        config.toolchain = self.toolchain.clone();
        config.profile = self.profile.clone();
        config.app_config = self.app_config.clone();
        config.tools = ToolCommands {
            mbed_cli: self.mbed_cli.clone(),
            htrun: self.htrun.clone(),
            mbedgt: self.mbedgt.clone(),
            ..config.tools.clone()
        };
    }
}

/// Build the run configuration for a project command
pub fn run_config(
    verbose: u8,
    project: &ProjectArgs,
    script: Option<&ScriptArgs>,
    filter: Option<&TestFilterArgs>,
    no_compile: bool,
    vendor: &VendorArgs,
) -> RunConfig {
    let mut config = RunConfig::for_project(&project.project_dir);
    config.board_manager_script = script.and_then(|s| s.board_manager_script.clone());
    config.tests_by_name = filter.and_then(|f| f.tests_by_name.clone());
    config.no_compile = no_compile;
    config.verbose = verbose;
    vendor.apply(&mut config);
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_tests_config() {
        let cli = Cli::try_parse_from([
            "mbedgtw",
            "-vv",
            "run-tests",
            "--project-dir",
            "/work/blinky",
            "-s",
            "target_manager.sh",
            "-n",
            "tests-demo-*",
            "--no-compile",
            "-m",
            "BLACKPILL_F401CC",
            "--mbed-cli",
            "python3 -m mbed",
        ])
        .unwrap();

        let Commands::RunTests {
            project,
            script,
            filter,
            no_compile,
            vendor,
        } = &cli.command
        else {
            panic!("expected run-tests");
        };
        let config = run_config(
            cli.verbose,
            project,
            Some(script),
            Some(filter),
            *no_compile,
            vendor,
        );
        assert_eq!(config.project_dir, PathBuf::from("/work/blinky"));
        assert_eq!(config.board_manager_script.as_deref(), Some("target_manager.sh"));
        assert_eq!(config.tests_by_name.as_deref(), Some("tests-demo-*"));
        assert!(config.no_compile);
        assert_eq!(config.verbose, 2);
        assert_eq!(config.target.as_deref(), Some("BLACKPILL_F401CC"));
        assert_eq!(config.toolchain, None);
        assert_eq!(config.tools.mbed_cli, "python3 -m mbed");
        assert_eq!(config.tools.htrun, DEFAULT_HTRUN);
        assert_eq!(config.tools.mbedls, DEFAULT_MBEDLS);
    }

    #[test]
    fn test_options_from_environment() {
        std::env::set_var("VZNNCV_MBEDGTW_PROJECT_DIR", "/work/from-env");
        std::env::set_var("VZNNCV_MBEDGTW_PROFILE", "release");

        let from_env = Cli::try_parse_from(["mbedgtw", "list-tests"]);
        let overridden =
            Cli::try_parse_from(["mbedgtw", "list-tests", "--project-dir", "/work/from-cli"]);

        std::env::remove_var("VZNNCV_MBEDGTW_PROJECT_DIR");
        std::env::remove_var("VZNNCV_MBEDGTW_PROFILE");

        let Commands::ListTests { project, vendor, .. } = from_env.unwrap().command else {
            panic!("expected list-tests");
        };
        assert_eq!(project.project_dir, PathBuf::from("/work/from-env"));
        assert_eq!(vendor.profile.as_deref(), Some("release"));

        let Commands::ListTests { project, .. } = overridden.unwrap().command else {
            panic!("expected list-tests");
        };
        assert_eq!(project.project_dir, PathBuf::from("/work/from-cli"));
    }

    #[test]
    fn test_debug_test_alias() {
        let cli = Cli::try_parse_from(["mbedgtw", "debug-test", "-s", "bm.sh"]).unwrap();
        assert!(matches!(cli.command, Commands::DebugTests { .. }));
    }

    #[test]
    fn test_flash_requires_script() {
        // the variable must not leak in from the test environment
        if std::env::var_os("VZNNCV_MBEDGTW_BOARD_MANAGER_SCRIPT").is_some() {
            return;
        }
        assert!(Cli::try_parse_from([
            "mbedgtw",
            "flash",
            "--target-id",
            "FFFF0001",
            "--image-path",
            "app.bin"
        ])
        .is_err());
    }
}
