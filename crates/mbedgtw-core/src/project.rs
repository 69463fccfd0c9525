//! Project configuration
//!
//! Two sources are read:
//!
//! - the `.mbed` file in the project root (`KEY=VALUE` lines written by
//!   `mbed config`), which provides the default target, toolchain and profile
//! - the output of `mbed compile --config`, which lists the resolved
//!   application configuration parameters

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ProjectError;

/// Name of the program configuration file
pub const CONFIG_FILE: &str = ".mbed";
/// Build directory, relative to the project root
pub const BUILD_DIR: &str = "BUILD";
/// Profile used when neither the CLI nor `.mbed` sets one
pub const DEFAULT_PROFILE: &str = "debug";
/// Baud rate used when the application doesn't override it
pub const DEFAULT_BAUD_RATE: u32 = 9600;
/// Application parameter that holds the stdio baud rate
pub const BAUD_RATE_PARAM: &str = "platform.stdio-baud-rate";

/// Program configuration read from `.mbed`
#[derive(Debug, Clone)]
pub struct ProgramConfig {
    project_dir: PathBuf,
    values: HashMap<String, String>,
}

impl ProgramConfig {
    /// Load `.mbed` from the project directory
    ///
    /// A missing file is not an error; it just provides no values.
    pub fn load(project_dir: &Path) -> Result<Self, ProjectError> {
        let project_dir = absolute(project_dir);
        let path = project_dir.join(CONFIG_FILE);
        let values = if path.is_file() {
            let text = fs::read_to_string(&path).map_err(|source| ProjectError::Io {
                path: path.clone(),
                source,
            })?;
            parse_program_config(&text)
        } else {
            log::debug!("No {} file in {}", CONFIG_FILE, project_dir.display());
            HashMap::new()
        };

        Ok(Self {
            project_dir,
            values,
        })
    }

    /// Build a configuration from already-parsed values
    pub fn from_values(project_dir: &Path, values: HashMap<String, String>) -> Self {
        Self {
            project_dir: absolute(project_dir),
            values,
        }
    }

    /// Absolute project directory
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// `<project>/BUILD`
    pub fn build_dir(&self) -> PathBuf {
        self.project_dir.join(BUILD_DIR)
    }

    /// Program name (project directory base name)
    pub fn program_name(&self) -> String {
        self.project_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Raw `.mbed` value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Resolve the target name
    pub fn resolve_target(&self, explicit: Option<&str>) -> Result<String, ProjectError> {
        self.resolve("target", "TARGET", explicit, None)
    }

    /// Resolve the toolchain name
    pub fn resolve_toolchain(&self, explicit: Option<&str>) -> Result<String, ProjectError> {
        self.resolve("toolchain", "TOOLCHAIN", explicit, None)
    }

    /// Resolve the build profile (name or path)
    pub fn resolve_profile(&self, explicit: Option<&str>) -> Result<String, ProjectError> {
        self.resolve("profile", "PROFILE", explicit, Some(DEFAULT_PROFILE))
    }

    fn resolve(
        &self,
        option: &'static str,
        key: &'static str,
        explicit: Option<&str>,
        default: Option<&str>,
    ) -> Result<String, ProjectError> {
        explicit
            .filter(|v| !v.is_empty())
            .or_else(|| self.get(key).filter(|v| !v.is_empty()))
            .or(default)
            .map(str::to_string)
            .ok_or(ProjectError::Unresolved { option, key })
    }
}

/// Resolved build coordinates: which target/toolchain/profile a build uses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSelection {
    pub target: String,
    pub toolchain: String,
    pub profile: String,
}

impl BuildSelection {
    /// Profile name without directory or extension (`release` for `profiles/release.json`)
    pub fn profile_name(&self) -> String {
        Path::new(&self.profile)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.profile.clone())
    }

    /// `<TOOLCHAIN>-<PROFILE>` directory name used by mbed-cli
    pub fn variant_dir(&self) -> String {
        format!(
            "{}-{}",
            self.toolchain.to_uppercase(),
            self.profile_name().to_uppercase()
        )
    }

    /// Directory holding the main program artifacts
    pub fn main_artifact_dir(&self, build_dir: &Path) -> PathBuf {
        build_dir
            .join(self.target.to_uppercase())
            .join(self.variant_dir())
    }

    /// Directory holding greentea test artifacts and `test_spec.json`
    pub fn test_artifact_dir(&self, build_dir: &Path) -> PathBuf {
        build_dir
            .join("tests")
            .join(self.target.to_uppercase())
            .join(self.variant_dir())
    }
}

fn parse_program_config(text: &str) -> HashMap<String, String> {
    let mut values = HashMap::new();
    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((name, value)) = line.split_once('=') {
            if name.is_empty() {
                continue;
            }
            values.insert(name.to_string(), value.to_string());
        }
    }
    values
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

/// Application configuration parsed from `mbed compile --config` output
///
/// A parameter maps to `None` when the tool reports it as "has no value".
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    params: HashMap<String, Option<String>>,
}

impl AppConfig {
    /// Parse `mbed compile --config` output
    ///
    /// Configuration lines look like:
    ///
    /// ```text
    /// platform.stdio-baud-rate = 9600 (macro name: "MBED_CONF_PLATFORM_STDIO_BAUD_RATE")
    /// platform.stdio-flush-at-exit has no value
    /// ```
    pub fn parse(output: &str) -> Self {
        let mut params = HashMap::new();
        for line in output.lines() {
            let line = line.trim_end();
            if !is_config_line(line) {
                continue;
            }
            if let Some((name, value)) = parse_config_line(line) {
                params.insert(name, value);
            }
        }
        Self { params }
    }

    /// Look up a parameter; `Some(None)` means "declared without value"
    pub fn get(&self, name: &str) -> Option<Option<&str>> {
        self.params.get(name).map(|v| v.as_deref())
    }

    /// Stdio baud rate of the application
    pub fn stdio_baud_rate(&self) -> u32 {
        match self.get(BAUD_RATE_PARAM).flatten() {
            Some(value) => value.parse().unwrap_or_else(|_| {
                log::warn!(
                    "Invalid {} value \"{}\", using {}",
                    BAUD_RATE_PARAM,
                    value,
                    DEFAULT_BAUD_RATE
                );
                DEFAULT_BAUD_RATE
            }),
            None => DEFAULT_BAUD_RATE,
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

/// `<ident>.` prefix marks a configuration line
fn is_config_line(line: &str) -> bool {
    match line.find('.') {
        Some(pos) if pos > 0 => line[..pos].chars().all(is_ident_char),
        _ => false,
    }
}

fn parse_config_line(line: &str) -> Option<(String, Option<String>)> {
    let name_end = line
        .find(|c: char| !(is_ident_char(c) || c == '.'))
        .unwrap_or(line.len());
    let name = &line[..name_end];
    let rest = line[name_end..].trim_start();

    if let Some(value) = rest.strip_prefix('=') {
        Some((name.to_string(), Some(strip_macro_comment(value).trim().to_string())))
    } else if rest.trim().eq_ignore_ascii_case("has no value") {
        Some((name.to_string(), None))
    } else {
        None
    }
}

/// Remove a trailing `(macro name: ...)` annotation
fn strip_macro_comment(value: &str) -> &str {
    let value = value.trim_end();
    if value.ends_with(')') {
        if let Some(open) = value.rfind('(') {
            if !value[open + 1..value.len() - 1].contains('(') {
                return &value[..open];
            }
        }
    }
    value
}
