//! CLI command implementations
//!
//! Thin layer over `mbedgtw-runner`: builds the progress reporter, runs a
//! pipeline and prints its results.

mod board;
mod list;
mod progress;
mod report;
mod run;

pub use board::{flash, reset};
pub use list::{list_targets, list_tests};
pub use run::{debug_tests, run_main, run_tests};
