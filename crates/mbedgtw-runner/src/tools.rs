//! Vendor tool wrappers
//!
//! Thin argument builders for `mbed-cli`, `mbedhtrun`, `mbedgt` and `mbedls`.
//! Their output is passed through to the terminal unchanged, except for the
//! host-test harness whose output is parsed into a [`HostTestReport`].

use std::path::{Path, PathBuf};

use mbedgtw_core::htrun::HostTestReport;
use mbedgtw_core::project::{AppConfig, BuildSelection};
use mbedgtw_core::TargetRecord;

use crate::config::RunConfig;
use crate::error::{BridgeError, Result};
use crate::process::{CommandRunner, Invocation};

/// Host-test sync packets sent before giving up
const HTRUN_SYNC_COUNT: u32 = 5;

/// Host tests shipped with a project, relative to its root
pub const HOST_TESTS_DIR: &str = "TESTS/host_tests";

/// `mbed-cli` front-end bound to a project directory
pub struct MbedCli<'a> {
    runner: &'a dyn CommandRunner,
    config: &'a RunConfig,
}

impl<'a> MbedCli<'a> {
    pub fn new(runner: &'a dyn CommandRunner, config: &'a RunConfig) -> Self {
        Self { runner, config }
    }

    fn invocation(&self, args: &[String]) -> Invocation {
        // mbed-cli locates the program through PWD, which must be absolute
        let project_dir = &self.config.project_dir;
        let pwd = std::path::absolute(project_dir).unwrap_or_else(|e| {
            log::warn!("Cannot resolve {}: {}", project_dir.display(), e);
            project_dir.clone()
        });
        Invocation::from_command(&self.config.tools.mbed_cli)
            .args(args)
            .current_dir(project_dir)
            .env("PWD", pwd)
    }

    fn run(&self, args: Vec<String>) -> Result<()> {
        let invocation = self.invocation(&args);
        log::info!("Run command: {}", invocation);
        let code = self.runner.status(&invocation)?;
        if code != Some(0) {
            return Err(BridgeError::ToolFailed {
                tool: self.config.tools.mbed_cli.clone(),
                code,
            });
        }
        Ok(())
    }

    /// Common `-m`/`-t`/`--profile`/`--app-config`/`-v` arguments
    fn build_args(&self, selection: Option<&BuildSelection>, args: &mut Vec<String>) {
        if let Some(selection) = selection {
            args.extend(["--profile".to_string(), selection.profile.clone()]);
        }
        if let Some(target) = &self.config.target {
            args.extend(["-m".to_string(), target.clone()]);
        }
        if let Some(toolchain) = &self.config.toolchain {
            args.extend(["-t".to_string(), toolchain.clone()]);
        }
        if let Some(app_config) = &self.config.app_config {
            args.extend([
                "--app-config".to_string(),
                app_config.to_string_lossy().into_owned(),
            ]);
        }
        args.extend(self.config.verbose_flag());
    }

    /// `mbed test --greentea --compile`
    pub fn compile_tests(&self, selection: &BuildSelection) -> Result<()> {
        let mut args = vec![
            "test".to_string(),
            "--greentea".to_string(),
            "--compile".to_string(),
        ];
        if let Some(tests) = &self.config.tests_by_name {
            args.extend(["--tests-by-name".to_string(), tests.clone()]);
        }
        self.build_args(Some(selection), &mut args);
        self.run(args)
    }

    /// `mbed test --greentea --compile-list`
    pub fn compile_list(&self) -> Result<()> {
        let mut args = vec![
            "test".to_string(),
            "--greentea".to_string(),
            "--compile-list".to_string(),
        ];
        if let Some(tests) = &self.config.tests_by_name {
            args.extend(["--tests-by-name".to_string(), tests.clone()]);
        }
        self.build_args(None, &mut args);
        self.run(args)
    }

    /// `mbed compile`
    pub fn compile(&self, selection: &BuildSelection) -> Result<()> {
        let mut args = vec!["compile".to_string()];
        self.build_args(Some(selection), &mut args);
        self.run(args)
    }

    /// `mbed compile --config`, parsed
    pub fn app_config(&self) -> Result<AppConfig> {
        let mut args = vec!["compile".to_string(), "--config".to_string()];
        if let Some(target) = &self.config.target {
            args.extend(["-m".to_string(), target.clone()]);
        }
        if let Some(toolchain) = &self.config.toolchain {
            args.extend(["-t".to_string(), toolchain.clone()]);
        }
        if let Some(app_config) = &self.config.app_config {
            args.extend([
                "--app-config".to_string(),
                app_config.to_string_lossy().into_owned(),
            ]);
        }
        let invocation = self.invocation(&args);
        log::info!("Run command: {}", invocation);

        let output = self.runner.output(&invocation)?;
        if !output.success() {
            if !output.stderr.trim().is_empty() {
                log::error!("{}", output.stderr.trim_end());
            }
            return Err(BridgeError::ToolFailed {
                tool: self.config.tools.mbed_cli.clone(),
                code: output.code,
            });
        }
        Ok(AppConfig::parse(&output.stdout))
    }
}

/// Parameters of one host-test harness run
#[derive(Debug, Clone)]
pub struct HarnessRun<'a> {
    pub target: &'a TargetRecord,
    pub baud_rate: u32,
    pub host_tests_dir: Option<PathBuf>,
    /// Echo the harness output
    pub echo: bool,
}

/// `mbedhtrun` wrapper
pub struct HostTestHarness<'a> {
    runner: &'a dyn CommandRunner,
    command: &'a str,
}

impl<'a> HostTestHarness<'a> {
    pub fn new(runner: &'a dyn CommandRunner, command: &'a str) -> Self {
        Self { runner, command }
    }

    /// Build the harness command line; flashing and reset are handled by the
    /// board-manager script, so the harness skips both
    pub fn invocation(&self, run: &HarnessRun<'_>, project_dir: &Path) -> Invocation {
        let mut invocation = Invocation::from_command(self.command)
            .args([
                "--micro",
                run.target.target_name.as_str(),
                "--target-id",
                run.target.target_id.as_str(),
                "--sync",
                HTRUN_SYNC_COUNT.to_string().as_str(),
                "--port",
                format!("{}:{}", run.target.serial_port, run.baud_rate).as_str(),
                "--skip-flashing",
                "--skip-reset",
            ])
            .current_dir(project_dir);
        if let Some(dir) = &run.host_tests_dir {
            invocation = invocation.arg("-e").arg(dir);
        }
        if run.echo {
            invocation = invocation.arg("--verbose");
        }
        invocation
    }

    /// Run the harness and parse its output
    pub fn run(
        &self,
        run: &HarnessRun<'_>,
        project_dir: &Path,
    ) -> Result<(HostTestReport, Option<i32>)> {
        let invocation = self.invocation(run, project_dir);
        log::info!("Run command: {}", invocation);

        let mut report = HostTestReport::new();
        let code = self.runner.stream(&invocation, &mut |line| {
            if let Some(failure) = report.consume_line(line) {
                log::error!("{}", failure);
            }
            if run.echo {
                println!("{}", line);
            }
        })?;
        if code != Some(0) {
            log::debug!("{} exited with {:?}", self.command, code);
        }
        Ok((report, code))
    }
}

/// Host tests directory of a project, if it has one
pub fn host_tests_dir(project_dir: &Path) -> Option<PathBuf> {
    let dir = project_dir.join(HOST_TESTS_DIR);
    dir.is_dir().then_some(dir)
}

/// Run the vendor greentea runner (`mbedgt`) for boards it detects itself
pub fn run_greentea(runner: &dyn CommandRunner, config: &RunConfig) -> Result<()> {
    let mut invocation =
        Invocation::from_command(&config.tools.mbedgt).current_dir(&config.project_dir);
    if let Some(tests) = &config.tests_by_name {
        invocation = invocation.args(["--test-by-names", tests.as_str()]);
    }
    if config.verbose > 0 {
        invocation = invocation.args(["--verbose", "--verbose-test-result"]);
    }
    log::info!("Run command: {}", invocation);

    let code = runner.status(&invocation)?;
    if code != Some(0) {
        return Err(BridgeError::ToolFailed {
            tool: config.tools.mbedgt.clone(),
            code,
        });
    }
    Ok(())
}

/// Run the vendor board lister (`mbedls`)
pub fn run_mbedls(runner: &dyn CommandRunner, config: &RunConfig, json: bool) -> Result<()> {
    let mut invocation = Invocation::from_command(&config.tools.mbedls);
    if json {
        invocation = invocation.arg("--json");
    }
    log::info!("Run command: {}", invocation);

    let code = runner.status(&invocation)?;
    if code != Some(0) {
        return Err(BridgeError::ToolFailed {
            tool: config.tools.mbedls.clone(),
            code,
        });
    }
    Ok(())
}
