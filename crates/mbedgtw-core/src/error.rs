//! Error types for mbedgtw-core

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while parsing the output of a board-manager `list` call
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Output is not a JSON document
    #[error("target list is not valid JSON ({source}):\n{output}")]
    InvalidJson {
        output: String,
        #[source]
        source: serde_json::Error,
    },

    /// Output is valid JSON, but not an array
    #[error("target list must be a JSON array, found {found}")]
    NotAnArray { found: &'static str },

    /// An array entry is not a JSON object
    #[error("target record #{index} must be a JSON object, found {found}")]
    NotAnObject { index: usize, found: &'static str },

    /// A mandatory field is absent
    #[error("target record #{index} doesn't have mandatory field \"{field}\":\n{record}")]
    MissingField {
        index: usize,
        field: &'static str,
        record: String,
    },

    /// A field has the wrong JSON type
    #[error("field \"{field}\" of target record #{index} must be {expected}, found {found}")]
    WrongType {
        index: usize,
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    /// `target_id` is not a hex string of at least 4 digits
    #[error("target record #{index} has invalid target_id \"{value}\" (expected at least 4 hex digits)")]
    InvalidTargetId { index: usize, value: String },

    /// `target_name` is empty
    #[error("target record #{index} has an empty target_name")]
    EmptyTargetName { index: usize },

    /// `image_format` is not one of bin/hex/elf
    #[error("target record #{index} has unsupported image_format \"{value}\" (expected bin, hex or elf)")]
    InvalidImageFormat { index: usize, value: String },

    /// Two records share one `target_id`
    #[error("target id \"{target_id}\" is reported more than once")]
    DuplicateTargetId { target_id: String },
}

/// Errors produced while resolving project configuration
#[derive(Debug, Error)]
pub enum ProjectError {
    /// Failed to read a project file
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A mandatory option has no explicit value and isn't set in `.mbed`
    #[error("cannot resolve {option}: it isn't specified explicitly and isn't found in the \".mbed\" file ({key} record)")]
    Unresolved {
        option: &'static str,
        key: &'static str,
    },
}

/// Errors produced while loading a greentea test specification
#[derive(Debug, Error)]
pub enum TestSpecError {
    /// Failed to read `test_spec.json`
    #[error("failed to read test specification {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `test_spec.json` does not follow the expected schema
    #[error("invalid test specification {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// No build for the requested target/toolchain pair
    #[error("test specification has no build for {target}-{toolchain}")]
    MissingBuild { target: String, toolchain: String },

    /// A test entry has no binaries
    #[error("test \"{test}\" has no binaries")]
    NoBinaries { test: String },
}

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;
