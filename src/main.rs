//! mbedgtw - greentea test runner wrapper
//!
//! Runs Mbed OS greentea tests on boards that the vendor tools can't detect
//! or flash on their own. Board discovery, flashing and reset go through a
//! user-supplied *board manager script*:
//!
//! ```text
//! <script> list                                         -> JSON target list
//! <script> flash --target-id <id> --image-path <path>
//! <script> reset --target-id <id>
//! ```
//!
//! Building and test execution stay with `mbed-cli` and `mbedhtrun`; mbedgtw
//! only glues them together. Without a script the vendor tools (`mbedgt`,
//! `mbedls`) are run directly.

mod cli;
mod commands;

use clap::Parser;
use cli::{run_config, Cli, Commands, ENV_PREFIX};
use mbedgtw_runner::{AdapterError, BridgeError, SystemRunner};

fn main() {
    let cli = Cli::parse();

    // Initialize logger; RUST_LOG still takes precedence
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_filter(cli.verbose)),
    )
    .init();

    if cli.verbose > 0 {
        log_environment();
    }

    let code = match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{}", e);
            exit_code(e.as_ref())
        }
    };
    if code != 0 {
        std::process::exit(code);
    }
}

fn run(cli: &Cli) -> Result<i32, Box<dyn std::error::Error>> {
    let runner = SystemRunner;

    match &cli.command {
        Commands::ListTests {
            project,
            filter,
            vendor,
        } => {
            let config = run_config(cli.verbose, project, None, Some(filter), false, vendor);
            commands::list_tests(&runner, &config)?;
            Ok(0)
        }
        Commands::ListTargets {
            script,
            json,
            mbedls,
        } => commands::list_targets(
            &runner,
            script.board_manager_script.as_deref(),
            mbedls,
            *json,
        )
        .map(|()| 0),
        Commands::RunTests {
            project,
            script,
            filter,
            no_compile,
            vendor,
        } => {
            let config = run_config(
                cli.verbose,
                project,
                Some(script),
                Some(filter),
                *no_compile,
                vendor,
            );
            Ok(commands::run_tests(&runner, &config)?)
        }
        Commands::RunMain {
            project,
            script,
            no_compile,
            vendor,
        } => {
            let config = run_config(cli.verbose, project, Some(script), None, *no_compile, vendor);
            Ok(commands::run_main(&runner, &config)?)
        }
        Commands::DebugTests {
            project,
            script,
            filter,
            vendor,
        } => {
            let config = run_config(
                cli.verbose,
                project,
                Some(script),
                Some(filter),
                false,
                vendor,
            );
            Ok(commands::debug_tests(&runner, &config)?)
        }
        Commands::Flash {
            script,
            target_id,
            image_path,
        } => {
            commands::flash(&runner, &script.board_manager_script, target_id, image_path)?;
            Ok(0)
        }
        Commands::Reset { script, target_id } => {
            commands::reset(&runner, &script.board_manager_script, target_id)?;
            Ok(0)
        }
    }
}

/// Default log filter for the `-v` count
fn log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Exit code for a failed command; vendor tool and script failures keep
/// their own code
fn exit_code(err: &(dyn std::error::Error + 'static)) -> i32 {
    if let Some(e) = err.downcast_ref::<BridgeError>() {
        e.exit_code()
    } else if let Some(e) = err.downcast_ref::<AdapterError>() {
        e.exit_code()
    } else {
        1
    }
}

/// Log the `VZNNCV_MBEDGTW_*` variables that are set, sorted by name
fn log_environment() {
    let mut vars: Vec<(String, String)> = std::env::vars_os()
        .map(|(k, v)| (k.to_string_lossy().into_owned(), v.to_string_lossy().into_owned()))
        .filter(|(k, _)| k.starts_with(ENV_PREFIX))
        .collect();
    if vars.is_empty() {
        return;
    }
    vars.sort();
    log::info!("Environment variables:");
    for (key, value) in vars {
        log::info!("  {}={}", key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_follows_verbosity() {
        assert_eq!(log_filter(0), "info");
        assert_eq!(log_filter(1), "debug");
        assert_eq!(log_filter(2), "trace");
        assert_eq!(log_filter(5), "trace");
    }

    #[test]
    fn test_exit_code() {
        let err: Box<dyn std::error::Error> = Box::new(BridgeError::ToolFailed {
            tool: "mbedgt".into(),
            code: Some(3),
        });
        assert_eq!(exit_code(err.as_ref()), 3);

        let err: Box<dyn std::error::Error> = Box::new(AdapterError::CommandFailed {
            command: "target_manager.sh flash".into(),
            code: Some(4),
            stderr: String::new(),
        });
        assert_eq!(exit_code(err.as_ref()), 4);

        let err: Box<dyn std::error::Error> =
            Box::new(AdapterError::UnknownTarget("FFFF0001".into()));
        assert_eq!(exit_code(err.as_ref()), 1);

        let err: Box<dyn std::error::Error> = "bad value".into();
        assert_eq!(exit_code(err.as_ref()), 1);
    }
}
