//! Test run commands implementation

use mbedgtw_runner::{BridgeError, CommandRunner, RunConfig, TestBridge};

use super::progress::IndicatifProgress;
use super::report::print_summary;

/// Build and run greentea tests; returns the exit code
pub fn run_tests(runner: &dyn CommandRunner, config: &RunConfig) -> Result<i32, BridgeError> {
    let mut progress = IndicatifProgress::new();
    let summary = TestBridge::new(runner, config, &mut progress).run_tests()?;
    // None: mbedgt ran the tests and printed its own report
    Ok(summary.as_ref().map(print_summary).unwrap_or(0))
}

/// Build, flash and run the main program; returns the exit code
pub fn run_main(runner: &dyn CommandRunner, config: &RunConfig) -> Result<i32, BridgeError> {
    let mut progress = IndicatifProgress::new();
    let summary = TestBridge::new(runner, config, &mut progress).run_main()?;
    Ok(print_summary(&summary))
}

/// Attach the host test harness to a flashed board; returns the exit code
pub fn debug_tests(runner: &dyn CommandRunner, config: &RunConfig) -> Result<i32, BridgeError> {
    if let Some(tests) = &config.tests_by_name {
        log::info!("Debugging the image already on the board, --tests-by-name {} is informational", tests);
    }
    let mut progress = IndicatifProgress::new();
    let summary = TestBridge::new(runner, config, &mut progress).debug_test()?;
    Ok(print_summary(&summary))
}
