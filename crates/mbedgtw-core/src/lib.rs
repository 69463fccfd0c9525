//! Core data layer for mbedgtw
//!
//! This crate knows how to read and validate the data that flows between
//! mbedgtw, the board-manager script and the Mbed greentea tooling. It never
//! spawns processes itself; that is the job of `mbedgtw-runner`.
//!
//! - [`target`] / [`registry`]: target records reported by a board-manager
//!   script and their validation
//! - [`project`]: `.mbed` program configuration and `mbed compile --config`
//!   output parsing
//! - [`test_spec`]: greentea `test_spec.json` loading and test name filters
//! - [`htrun`]: host-test harness output parsing
//! - [`mbedignore`]: temporary `.mbedignore` patch used while compiling tests

pub mod error;
pub mod htrun;
pub mod mbedignore;
pub mod project;
pub mod registry;
pub mod target;
pub mod test_spec;

pub use error::{ProjectError, RegistryError, TestSpecError};
pub use registry::TargetRegistry;
pub use target::{ImageFormat, TargetRecord};
