//! Error types for mbedgtw-runner

use std::path::PathBuf;

use mbedgtw_core::{ProjectError, RegistryError, TestSpecError};
use thiserror::Error;

use crate::process::describe_exit;

/// Failure to start or talk to a child process
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Program could not be started
    #[error("failed to run \"{program}\": {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O error while reading child output
    #[error("I/O error while reading process output: {0}")]
    Io(#[from] std::io::Error),
}

/// Board-manager script errors
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Script is neither on PATH nor an existing file
    #[error("cannot find board manager script: {0}")]
    ScriptNotFound(String),

    /// Script could not be started
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// Script exited with a non-zero status
    #[error("command \"{command}\" has failed with {}{}", exit_status(.code), stderr_suffix(.stderr))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// `list` output is not a valid target list
    #[error("board manager script returned an invalid target list: {0}")]
    InvalidListOutput(#[from] RegistryError),

    /// Target id was not reported by the last `list` call
    #[error("unknown target \"{0}\"")]
    UnknownTarget(String),

    /// Target doesn't declare `reset_command`
    #[error("target \"{0}\" doesn't support reset through the board manager script")]
    ResetUnsupported(String),

    /// No image with the format expected by the target
    #[error("cannot find a firmware image \"{}\"", .0.display())]
    ImageNotFound(PathBuf),
}

impl AdapterError {
    /// Process exit code that reports this error
    ///
    /// A failed script invocation surfaces the script's own exit code.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::CommandFailed {
                code: Some(code), ..
            } if *code != 0 => *code,
            _ => 1,
        }
    }
}

fn exit_status(code: &Option<i32>) -> String {
    describe_exit(*code)
}

fn stderr_suffix(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        String::new()
    } else {
        format!(":\n{}", stderr)
    }
}

/// Test pipeline errors
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error(transparent)]
    TestSpec(#[from] TestSpecError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    /// A vendor tool exited with a non-zero status
    #[error("{tool} has failed with {}", exit_status(.code))]
    ToolFailed { tool: String, code: Option<i32> },

    /// No board of the requested platform is attached
    #[error("no \"{0}\" boards are found")]
    NoBoards(String),

    /// More than one board of the requested platform is attached
    #[error("multiple \"{platform}\" boards are found ({count})")]
    MultipleBoards { platform: String, count: usize },

    /// Build output directory is missing
    #[error("build directory \"{}\" doesn't exist", .0.display())]
    BuildDirMissing(PathBuf),

    /// Build finished without any image
    #[error("cannot find any build artifact in \"{}\"", .0.display())]
    NoArtifacts(PathBuf),

    /// Test filter selected nothing
    #[error("no tests match \"{0}\"")]
    NoTests(String),

    /// Command needs a board-manager script
    #[error("{0} requires a board manager script (--board-manager-script)")]
    ScriptRequired(&'static str),

    /// Failed to patch project files
    #[error("failed to update {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BridgeError {
    /// Process exit code that reports this error
    ///
    /// Vendor tool failures surface the tool's own exit code.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ToolFailed {
                code: Some(code), ..
            } if *code != 0 => *code,
            Self::Adapter(e) => e.exit_code(),
            _ => 1,
        }
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, BridgeError>;
