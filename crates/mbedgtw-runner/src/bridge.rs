//! Test-runner bridge
//!
//! Linear pipelines that tie the vendor tools to the board-manager script:
//!
//! ```text
//! run-tests:   compile tests -> list targets -> for each test:
//!                  flash -> [reset] -> mbedhtrun -> collect result
//! run-main:    compile program -> list targets -> flash -> [reset] -> mbedhtrun
//! debug-tests: list targets -> mbedhtrun (no flashing, no reset)
//! ```
//!
//! Infrastructure failures (compilation, flashing, listing) stop the pipeline
//! immediately. Test failures are collected and reported at the end.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use mbedgtw_core::htrun::{HostTestReport, TestResult};
use mbedgtw_core::mbedignore::MbedignorePatch;
use mbedgtw_core::project::{BuildSelection, ProgramConfig};
use mbedgtw_core::test_spec::{TestFilter, TestSpec, TEST_SPEC_FILE};
use mbedgtw_core::{ImageFormat, TargetRecord};

use crate::adapter::BoardManager;
use crate::config::RunConfig;
use crate::error::{AdapterError, BridgeError, Result};
use crate::process::CommandRunner;
use crate::progress::{track, Progress, Step};
use crate::tools::{self, HarnessRun, HostTestHarness, MbedCli};

/// Result of one test suite (one test binary on one board)
#[derive(Debug, Clone)]
pub struct SuiteOutcome {
    pub target_id: String,
    /// `<PLATFORM>-<TOOLCHAIN>`
    pub build: String,
    pub test: String,
    pub result: TestResult,
    pub report: HostTestReport,
    pub harness_code: Option<i32>,
}

/// Results of a whole run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub suites: Vec<SuiteOutcome>,
}

impl RunSummary {
    /// True if every suite passed
    pub fn passed(&self) -> bool {
        self.suites.iter().all(|s| s.result.is_ok())
    }

    /// Process exit code for this run
    pub fn exit_code(&self) -> i32 {
        match self.suites.iter().find(|s| !s.result.is_ok()) {
            None => 0,
            Some(failed) => match failed.harness_code {
                Some(code) if code != 0 => code,
                _ => 1,
            },
        }
    }
}

/// Build artifacts of the main program, keyed by format
pub type Artifacts = BTreeMap<ImageFormat, PathBuf>;

/// Drives the vendor tools and the board-manager script
pub struct TestBridge<'a> {
    runner: &'a dyn CommandRunner,
    config: &'a RunConfig,
    progress: &'a mut dyn Progress,
}

impl<'a> TestBridge<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        config: &'a RunConfig,
        progress: &'a mut dyn Progress,
    ) -> Self {
        Self {
            runner,
            config,
            progress,
        }
    }

    fn program(&self) -> Result<ProgramConfig> {
        Ok(ProgramConfig::load(&self.config.project_dir)?)
    }

    /// Target, toolchain and profile of this run
    pub fn build_selection(&self, program: &ProgramConfig) -> Result<BuildSelection> {
        Ok(BuildSelection {
            target: program.resolve_target(self.config.target.as_deref())?,
            toolchain: program.resolve_toolchain(self.config.toolchain.as_deref())?,
            profile: program.resolve_profile(self.config.profile.as_deref())?,
        })
    }

    fn board_manager(&self, command: &'static str) -> Result<BoardManager<'a>> {
        let script = self
            .config
            .board_manager_script
            .as_deref()
            .ok_or(BridgeError::ScriptRequired(command))?;
        Ok(BoardManager::new(self.runner, script)?)
    }

    /// `mbed test --compile-list`
    pub fn list_tests(&mut self) -> Result<()> {
        MbedCli::new(self.runner, self.config).compile_list()
    }

    /// Compile greentea tests with the project's main files excluded
    pub fn build_tests(&mut self) -> Result<()> {
        let program = self.program()?;
        let selection = BuildSelection {
            // target/toolchain are only forwarded when given explicitly
            target: String::new(),
            toolchain: String::new(),
            profile: program.resolve_profile(self.config.profile.as_deref())?,
        };

        let patch = MbedignorePatch::apply(program.project_dir()).map_err(|source| {
            BridgeError::Io {
                path: program.project_dir().join(mbedgtw_core::mbedignore::MBEDIGNORE_FILE),
                source,
            }
        })?;
        let result = MbedCli::new(self.runner, self.config).compile_tests(&selection);
        if let Err(e) = patch.restore() {
            log::warn!("Failed to restore .mbedignore: {}", e);
        }
        result
    }

    /// Compile (unless `no_compile`) and run greentea tests
    ///
    /// Returns `None` when the run was delegated to `mbedgt` because no
    /// board-manager script is configured; `mbedgt` prints its own report.
    pub fn run_tests(&mut self) -> Result<Option<RunSummary>> {
        if !self.config.no_compile {
            log::info!("Build tests ...");
            self.build_tests()?;
        }

        if self.config.board_manager_script.is_none() {
            log::info!("Run tests");
            tools::run_greentea(self.runner, self.config)?;
            return Ok(None);
        }

        let program = self.program()?;
        let selection = self.build_selection(&program)?;
        let spec_path = selection
            .test_artifact_dir(&program.build_dir())
            .join(TEST_SPEC_FILE);
        let spec = TestSpec::load(&spec_path)?;
        let build = spec.build_for(&selection.target, &selection.toolchain)?;

        let filter = self
            .config
            .tests_by_name
            .as_deref()
            .map(TestFilter::parse)
            .unwrap_or_default();
        let tests = build.select_tests(&filter, program.project_dir())?;
        if tests.is_empty() {
            return Err(BridgeError::NoTests(
                self.config.tests_by_name.clone().unwrap_or_default(),
            ));
        }

        let mut manager = self.board_manager("run-tests")?;
        let target = self.select_target(&mut manager, &selection.target)?;
        let build_name = format!(
            "{}-{}",
            build.platform.to_uppercase(),
            build.toolchain.to_uppercase()
        );

        log::info!("Run {} test(s) on {}", tests.len(), target.target_id);
        let mut summary = RunSummary::default();
        for test in &tests {
            log::info!("Test {}", test.name);
            self.flash(&manager, &target, &test.image_path)?;
            self.reset(&manager, &target);
            let echo = self.config.verbose > 0;
            let (report, code) =
                self.run_harness(&target, build.baud_rate, program.project_dir(), echo)?;
            let result = report.suite_result(code);
            log::info!("{}: {}", test.name, result);
            summary.suites.push(SuiteOutcome {
                target_id: target.target_id.clone(),
                build: build_name.clone(),
                test: test.name.clone(),
                result,
                report,
                harness_code: code,
            });
        }
        Ok(Some(summary))
    }

    /// Compile (unless `no_compile`) the main program and collect its images
    pub fn build_main(&mut self) -> Result<Artifacts> {
        let program = self.program()?;
        let selection = self.build_selection(&program)?;

        if !self.config.no_compile {
            MbedCli::new(self.runner, self.config).compile(&selection)?;
        }

        let dir = selection.main_artifact_dir(&program.build_dir());
        if !dir.is_dir() {
            return Err(BridgeError::BuildDirMissing(dir));
        }

        let name = program.program_name();
        let artifacts: Artifacts = ImageFormat::ALL
            .into_iter()
            .map(|format| (format, dir.join(format!("{}.{}", name, format))))
            .filter(|(_, path)| path.is_file())
            .collect();
        if artifacts.is_empty() {
            return Err(BridgeError::NoArtifacts(dir));
        }
        Ok(artifacts)
    }

    /// Build, flash and run the main program as a greentea test
    pub fn run_main(&mut self) -> Result<RunSummary> {
        let mut manager = self.board_manager("run-main")?;
        let artifacts = self.build_main()?;

        let program = self.program()?;
        let selection = self.build_selection(&program)?;
        let target = self.select_target(&mut manager, &selection.target)?;

        let image = pick_artifact(&artifacts, target.image_format);
        self.flash(&manager, &target, &image)?;
        self.reset(&manager, &target);

        self.debug_target(&target, &program)
    }

    /// Run the host-test harness against an already flashed board
    pub fn debug_test(&mut self) -> Result<RunSummary> {
        let mut manager = self.board_manager("debug-tests")?;
        let program = self.program()?;
        let selection = self.build_selection(&program)?;
        let target = self.select_target(&mut manager, &selection.target)?;
        self.debug_target(&target, &program)
    }

    fn debug_target(&mut self, target: &TargetRecord, program: &ProgramConfig) -> Result<RunSummary> {
        let baud_rate = MbedCli::new(self.runner, self.config)
            .app_config()?
            .stdio_baud_rate();
        // debug runs always echo the board output
        let (report, code) = self.run_harness(target, baud_rate, program.project_dir(), true)?;
        let result = report.suite_result(code);

        let toolchain = program
            .resolve_toolchain(self.config.toolchain.as_deref())
            .unwrap_or_default();
        Ok(RunSummary {
            suites: vec![SuiteOutcome {
                target_id: target.target_id.clone(),
                build: format!(
                    "{}-{}",
                    target.target_name.to_uppercase(),
                    toolchain.to_uppercase()
                ),
                test: program.program_name(),
                result,
                report,
                harness_code: code,
            }],
        })
    }

    /// List targets and pick the single board of the given platform
    pub fn select_target(
        &mut self,
        manager: &mut BoardManager<'_>,
        platform: &str,
    ) -> Result<TargetRecord> {
        track(self.progress, Step::ListTargets, || manager.list().map(|_| ()))?;
        let registry = manager.registry();
        let mut matching = registry.by_platform(platform);
        match (matching.next(), matching.next()) {
            (Some(target), None) => {
                log::info!(
                    "Using {} board {} on {}",
                    platform,
                    target.target_id,
                    target.serial_port
                );
                Ok(target.clone())
            }
            (None, _) => Err(BridgeError::NoBoards(platform.to_string())),
            (Some(_), Some(_)) => Err(BridgeError::MultipleBoards {
                platform: platform.to_string(),
                count: registry.by_platform(platform).count(),
            }),
        }
    }

    fn flash(&mut self, manager: &BoardManager<'_>, target: &TargetRecord, image: &Path) -> Result<()> {
        let step = Step::Flash {
            target_id: target.target_id.clone(),
            image: image.to_path_buf(),
        };
        track(self.progress, step, || manager.flash(&target.target_id, image))?;
        Ok(())
    }

    /// Reset through the script if the board supports it; failures are
    /// reported but don't stop the run
    fn reset(&mut self, manager: &BoardManager<'_>, target: &TargetRecord) {
        if !target.reset_command {
            return;
        }
        let step = Step::Reset {
            target_id: target.target_id.clone(),
        };
        match track(self.progress, step, || manager.reset(&target.target_id)) {
            Ok(()) => {}
            Err(e @ AdapterError::CommandFailed { .. }) => {
                log::warn!("Reset of {} has failed: {}", target.target_id, e)
            }
            Err(e) => log::warn!("Skipping reset of {}: {}", target.target_id, e),
        }
    }

    fn run_harness(
        &mut self,
        target: &TargetRecord,
        baud_rate: u32,
        project_dir: &Path,
        echo: bool,
    ) -> Result<(HostTestReport, Option<i32>)> {
        let run = HarnessRun {
            target,
            baud_rate,
            host_tests_dir: tools::host_tests_dir(project_dir),
            echo,
        };
        HostTestHarness::new(self.runner, &self.config.tools.htrun).run(&run, project_dir)
    }
}

/// The image matching the board's format, or any available one
fn pick_artifact(artifacts: &Artifacts, format: ImageFormat) -> PathBuf {
    artifacts
        .get(&format)
        .or_else(|| artifacts.get(&ImageFormat::Bin))
        .or_else(|| artifacts.values().next())
        .cloned()
        .unwrap_or_default()
}
