//! Subprocess invocation
//!
//! Every external program (board-manager script, mbed-cli, mbedhtrun, mbedgt)
//! is started through the [`CommandRunner`] trait. [`SystemRunner`] spawns real
//! processes; tests substitute a scripted runner.

use std::ffi::OsString;
use std::fmt;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::ProcessError;

/// A fully described command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    env: Vec<(String, OsString)>,
}

impl Invocation {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
        }
    }

    /// Build an invocation from a command string such as `python3 -m mbed`
    ///
    /// The string is split on whitespace; the first word is the program.
    pub fn from_command(command: &str) -> Self {
        let mut words = command.split_whitespace();
        let mut invocation = Self::new(words.next().unwrap_or_default());
        invocation.args.extend(words.map(OsString::from));
        invocation
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> &OsString {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Arguments as lossy strings (handy for assertions and logs)
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    pub fn get_current_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Value of an environment override, if one is set
    pub fn get_env(&self, key: &str) -> Option<&OsString> {
        self.env.iter().rev().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` if the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Human readable exit status
pub fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

/// Runs external programs to completion
pub trait CommandRunner {
    /// Run with stdout and stderr captured
    fn output(&self, cmd: &Invocation) -> Result<ProcessOutput, ProcessError>;

    /// Run with stdio inherited from mbedgtw; returns the exit code
    fn status(&self, cmd: &Invocation) -> Result<Option<i32>, ProcessError>;

    /// Run with stdout delivered line by line and stderr inherited
    fn stream(
        &self,
        cmd: &Invocation,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<Option<i32>, ProcessError>;
}

/// [`CommandRunner`] backed by `std::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    fn spawn_error(cmd: &Invocation, source: std::io::Error) -> ProcessError {
        ProcessError::Spawn {
            program: cmd.program.to_string_lossy().into_owned(),
            source,
        }
    }
}

impl CommandRunner for SystemRunner {
    fn output(&self, cmd: &Invocation) -> Result<ProcessOutput, ProcessError> {
        log::debug!("Capturing output of: {}", cmd);
        let output = cmd
            .to_command()
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Self::spawn_error(cmd, e))?;
        Ok(ProcessOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn status(&self, cmd: &Invocation) -> Result<Option<i32>, ProcessError> {
        let status = cmd
            .to_command()
            .status()
            .map_err(|e| Self::spawn_error(cmd, e))?;
        Ok(status.code())
    }

    fn stream(
        &self,
        cmd: &Invocation,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<Option<i32>, ProcessError> {
        let mut child = cmd
            .to_command()
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| Self::spawn_error(cmd, e))?;

        if let Some(stdout) = child.stdout.take() {
            if let Err(e) = forward_lines(stdout, on_line) {
                // the child must still be reaped
                if let Err(kill) = child.kill() {
                    log::debug!("Failed to kill {}: {}", cmd, kill);
                }
                if let Err(wait) = child.wait() {
                    log::debug!("Failed to wait for {}: {}", cmd, wait);
                }
                return Err(e.into());
            }
        }

        let status = child.wait()?;
        Ok(status.code())
    }
}

/// Feed every line of `source` to `on_line`, without the line terminator
fn forward_lines(source: impl Read, on_line: &mut dyn FnMut(&str)) -> io::Result<()> {
    let mut reader = BufReader::new(source);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf);
        on_line(line.trim_end_matches(['\r', '\n']));
    }
}
