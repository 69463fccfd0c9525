//! List commands implementation

use mbedgtw_core::TargetRegistry;
use mbedgtw_runner::adapter::BoardManager;
use mbedgtw_runner::bridge::TestBridge;
use mbedgtw_runner::progress::track;
use mbedgtw_runner::{tools, BridgeError, CommandRunner, RunConfig, Step};

use super::progress::IndicatifProgress;

/// List greentea tests (`mbed test --compile-list`)
pub fn list_tests(runner: &dyn CommandRunner, config: &RunConfig) -> Result<(), BridgeError> {
    let mut progress = IndicatifProgress::new();
    TestBridge::new(runner, config, &mut progress).list_tests()
}

/// List attached boards
///
/// Without a board manager script the vendor board lister is used.
pub fn list_targets(
    runner: &dyn CommandRunner,
    script: Option<&str>,
    mbedls: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(script) = script else {
        let mut config = RunConfig::default();
        config.tools.mbedls = mbedls.to_string();
        tools::run_mbedls(runner, &config, json)?;
        return Ok(());
    };

    let mut manager = BoardManager::new(runner, script)?;
    let mut progress = IndicatifProgress::new();
    track(&mut progress, Step::ListTargets, || manager.list().map(|_| ()))?;

    if json {
        println!("{}", targets_json(manager.registry())?);
    } else {
        print_targets(manager.registry());
    }
    Ok(())
}

/// Target list in the board-manager `list` format
fn targets_json(registry: &TargetRegistry) -> serde_json::Result<String> {
    serde_json::to_string_pretty(registry.targets())
}

fn print_targets(registry: &TargetRegistry) {
    if registry.is_empty() {
        println!("No targets found");
        return;
    }

    let id_width = registry
        .iter()
        .map(|t| t.target_id.len())
        .max()
        .unwrap_or(0)
        .max("Target ID".len());
    let name_width = registry
        .iter()
        .map(|t| t.target_name.len())
        .max()
        .unwrap_or(0)
        .max("Name".len());
    let port_width = registry
        .iter()
        .map(|t| t.serial_port.len())
        .max()
        .unwrap_or(0)
        .max("Serial port".len());

    println!(
        "{:<id_width$}  {:<name_width$}  {:<port_width$}  {:<6}  {}",
        "Target ID", "Name", "Serial port", "Format", "Reset"
    );
    println!("{}", "-".repeat(id_width + name_width + port_width + 21));

    for target in registry {
        println!(
            "{:<id_width$}  {:<name_width$}  {:<port_width$}  {:<6}  {}",
            target.target_id,
            target.target_name,
            target.serial_port,
            target.image_format,
            if target.reset_command { "yes" } else { "no" }
        );
    }
}
