//! Target records reported by a board-manager script

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Number of leading `target_id` digits that identify the board class
pub const PLATFORM_ID_LEN: usize = 4;

/// Firmware image format expected by a board
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Raw binary
    Bin,
    /// Intel HEX
    Hex,
    /// ELF executable
    Elf,
}

impl ImageFormat {
    /// All formats, in the order build artifacts are searched
    pub const ALL: [ImageFormat; 3] = [ImageFormat::Elf, ImageFormat::Bin, ImageFormat::Hex];

    /// File extension (without the dot)
    pub fn extension(self) -> &'static str {
        match self {
            Self::Bin => "bin",
            Self::Hex => "hex",
            Self::Elf => "elf",
        }
    }

    /// Check whether a path carries this format's extension
    pub fn matches_path(self, path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some(self.extension())
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.extension())
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bin" => Ok(Self::Bin),
            "hex" => Ok(Self::Hex),
            "elf" => Ok(Self::Elf),
            other => Err(format!("unsupported image format: {}", other)),
        }
    }
}

/// One physical board exposed by the board-manager script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetRecord {
    /// Unique board id (hex string, first 4 digits are the platform id)
    pub target_id: String,
    /// Mbed platform name (e.g. "NUCLEO_F401RE")
    pub target_name: String,
    /// Serial port the board's stdio is connected to
    pub serial_port: String,
    /// Image format accepted by the `flash` command
    pub image_format: ImageFormat,
    /// Whether the script implements `reset` for this board
    pub reset_command: bool,
}

impl TargetRecord {
    /// Platform id (first 4 digits of the target id)
    pub fn platform_id(&self) -> &str {
        &self.target_id[..PLATFORM_ID_LEN.min(self.target_id.len())]
    }
}

/// Check that a string is a valid target id
pub fn is_valid_target_id(id: &str) -> bool {
    id.len() >= PLATFORM_ID_LEN && id.chars().all(|c| c.is_ascii_hexdigit())
}
