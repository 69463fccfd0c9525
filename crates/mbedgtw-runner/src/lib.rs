//! Process layer for mbedgtw
//!
//! Everything that spawns a process lives here:
//!
//! - [`adapter`]: the board-manager script (`list`, `flash`, `reset`)
//! - [`tools`]: `mbed-cli`, `mbedhtrun`, `mbedgt` and `mbedls` invocations
//! - [`bridge`]: the pipelines gluing both together (`run-tests`,
//!   `run-main`, `debug-tests`, ...)
//!
//! All processes go through the [`CommandRunner`] trait so the pipelines can
//! be exercised without any vendor tool installed.

pub mod adapter;
pub mod bridge;
pub mod config;
pub mod error;
pub mod process;
pub mod progress;
pub mod tools;

#[cfg(test)]
mod testing;

pub use adapter::BoardManager;
pub use bridge::{RunSummary, SuiteOutcome, TestBridge};
pub use config::{RunConfig, ToolCommands};
pub use error::{AdapterError, BridgeError, ProcessError};
pub use process::{CommandRunner, Invocation, ProcessOutput, SystemRunner};
pub use progress::{NoProgress, Progress, Step};
