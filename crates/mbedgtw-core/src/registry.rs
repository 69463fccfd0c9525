//! Target registry
//!
//! Parses the JSON array printed by `<script> list`:
//!
//! ```json
//! [
//!     {
//!         "target_id": "FFFF00000000000000000000",
//!         "target_name": "BLACKPILL_F401CC",
//!         "serial_port": "/dev/ttyUSB0",
//!         "image_format": "elf",
//!         "reset_command": true
//!     }
//! ]
//! ```
//!
//! `reset_command` is optional and defaults to `false`. Unknown fields are
//! ignored.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::error::{RegistryError, Result};
use crate::target::{is_valid_target_id, ImageFormat, TargetRecord};

/// Ordered set of targets returned by one `list` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetRegistry {
    targets: Vec<TargetRecord>,
}

impl TargetRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate raw `list` output
    pub fn from_json(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        let value: Value =
            serde_json::from_str(trimmed).map_err(|source| RegistryError::InvalidJson {
                output: trimmed.to_string(),
                source,
            })?;

        let entries = match value {
            Value::Array(entries) => entries,
            other => {
                return Err(RegistryError::NotAnArray {
                    found: json_type_name(&other),
                })
            }
        };

        let mut targets = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            targets.push(parse_record(index, entry)?);
        }
        Self::from_records(targets)
    }

    /// Build a registry from already-validated records
    ///
    /// Fails if two records share a target id.
    pub fn from_records(targets: Vec<TargetRecord>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(targets.len());
        for target in &targets {
            if !seen.insert(target.target_id.as_str()) {
                return Err(RegistryError::DuplicateTargetId {
                    target_id: target.target_id.clone(),
                });
            }
        }
        Ok(Self { targets })
    }

    /// Number of targets
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// True if no boards are attached
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Iterate over targets in script output order
    pub fn iter(&self) -> impl Iterator<Item = &TargetRecord> {
        self.targets.iter()
    }

    /// Targets as a slice
    pub fn targets(&self) -> &[TargetRecord] {
        &self.targets
    }

    /// Find a target by id
    pub fn get(&self, target_id: &str) -> Option<&TargetRecord> {
        self.targets.iter().find(|t| t.target_id == target_id)
    }

    /// All targets of the given platform (`target_name`)
    pub fn by_platform<'a>(&'a self, platform: &'a str) -> impl Iterator<Item = &'a TargetRecord> {
        self.targets.iter().filter(move |t| t.target_name == platform)
    }
}

impl<'a> IntoIterator for &'a TargetRegistry {
    type Item = &'a TargetRecord;
    type IntoIter = std::slice::Iter<'a, TargetRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.targets.iter()
    }
}

fn parse_record(index: usize, entry: &Value) -> Result<TargetRecord> {
    let object = entry.as_object().ok_or(RegistryError::NotAnObject {
        index,
        found: json_type_name(entry),
    })?;

    let target_id = required_str(index, object, "target_id")?;
    if !is_valid_target_id(&target_id) {
        return Err(RegistryError::InvalidTargetId {
            index,
            value: target_id,
        });
    }

    let target_name = required_str(index, object, "target_name")?;
    if target_name.is_empty() {
        return Err(RegistryError::EmptyTargetName { index });
    }

    let serial_port = required_str(index, object, "serial_port")?;

    let image_format = required_str(index, object, "image_format")?;
    let image_format = image_format
        .parse::<ImageFormat>()
        .map_err(|_| RegistryError::InvalidImageFormat {
            index,
            value: image_format,
        })?;

    let reset_command = match object.get("reset_command") {
        None => false,
        Some(Value::Bool(b)) => *b,
        Some(other) => {
            return Err(RegistryError::WrongType {
                index,
                field: "reset_command",
                expected: "a boolean",
                found: json_type_name(other),
            })
        }
    };

    Ok(TargetRecord {
        target_id,
        target_name,
        serial_port,
        image_format,
        reset_command,
    })
}

fn required_str(index: usize, object: &Map<String, Value>, field: &'static str) -> Result<String> {
    match object.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(RegistryError::WrongType {
            index,
            field,
            expected: "a string",
            found: json_type_name(other),
        }),
        None => Err(RegistryError::MissingField {
            index,
            field,
            record: serde_json::to_string_pretty(object).unwrap_or_default(),
        }),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_TARGET: &str = r#"
    [
        {
            "target_id": "FFFF00000000000000000000",
            "target_name": "BLACKPILL_F401CC",
            "serial_port": "/dev/ttyUSB0",
            "image_format": "elf",
            "reset_command": false
        }
    ]
    "#;

    #[test]
    fn test_parse_single_target() {
        let registry = TargetRegistry::from_json(ONE_TARGET).unwrap();
        assert_eq!(registry.len(), 1);

        let target = registry.get("FFFF00000000000000000000").unwrap();
        assert_eq!(target.target_name, "BLACKPILL_F401CC");
        assert_eq!(target.serial_port, "/dev/ttyUSB0");
        assert_eq!(target.image_format, ImageFormat::Elf);
        assert!(!target.reset_command);
        assert_eq!(target.platform_id(), "FFFF");
    }

    #[test]
    fn test_empty_array_means_no_boards() {
        let registry = TargetRegistry::from_json("  []\n").unwrap();
        assert!(registry.is_empty());
        assert!(registry.get("FFFF").is_none());
    }

    #[test]
    fn test_values_are_kept_verbatim() {
        let json = r#"[
            {"target_id": "abcd0001", "target_name": "My Board", "serial_port": "COM3 ",
             "image_format": "hex", "reset_command": true, "extra": 42},
            {"target_id": "ABCD0002", "target_name": "MY_BOARD", "serial_port": "/dev/serial/by-id/usb-x",
             "image_format": "bin"}
        ]"#;
        let registry = TargetRegistry::from_json(json).unwrap();
        let ids: Vec<_> = registry.iter().map(|t| t.target_id.as_str()).collect();
        assert_eq!(ids, ["abcd0001", "ABCD0002"]);

        let first = &registry.targets()[0];
        assert_eq!(first.target_name, "My Board");
        assert_eq!(first.serial_port, "COM3 ");
        assert!(first.reset_command);

        // reset_command defaults to false
        assert!(!registry.targets()[1].reset_command);
    }

    #[test]
    fn test_duplicate_target_id() {
        let json = r#"[
            {"target_id": "FFFF0001", "target_name": "A", "serial_port": "/dev/a", "image_format": "bin"},
            {"target_id": "FFFF0001", "target_name": "B", "serial_port": "/dev/b", "image_format": "bin"}
        ]"#;
        match TargetRegistry::from_json(json) {
            Err(RegistryError::DuplicateTargetId { target_id }) => assert_eq!(target_id, "FFFF0001"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_missing_field() {
        let json = r#"[{"target_id": "FFFF0001", "target_name": "A", "image_format": "bin"}]"#;
        match TargetRegistry::from_json(json) {
            Err(RegistryError::MissingField { index, field, .. }) => {
                assert_eq!(index, 0);
                assert_eq!(field, "serial_port");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_wrong_types() {
        let json = r#"[{"target_id": 1234, "target_name": "A", "serial_port": "/dev/a", "image_format": "bin"}]"#;
        assert!(matches!(
            TargetRegistry::from_json(json),
            Err(RegistryError::WrongType { field: "target_id", .. })
        ));

        let json = r#"[{"target_id": "FFFF", "target_name": "A", "serial_port": "/dev/a",
                        "image_format": "bin", "reset_command": "true"}]"#;
        assert!(matches!(
            TargetRegistry::from_json(json),
            Err(RegistryError::WrongType { field: "reset_command", .. })
        ));
    }

    #[test]
    fn test_invalid_values() {
        let json = r#"[{"target_id": "FFF", "target_name": "A", "serial_port": "/dev/a", "image_format": "bin"}]"#;
        assert!(matches!(
            TargetRegistry::from_json(json),
            Err(RegistryError::InvalidTargetId { .. })
        ));

        let json = r#"[{"target_id": "FFFF", "target_name": "A", "serial_port": "/dev/a", "image_format": "srec"}]"#;
        assert!(matches!(
            TargetRegistry::from_json(json),
            Err(RegistryError::InvalidImageFormat { .. })
        ));

        let json = r#"[{"target_id": "FFFF", "target_name": "", "serial_port": "/dev/a", "image_format": "bin"}]"#;
        assert!(matches!(
            TargetRegistry::from_json(json),
            Err(RegistryError::EmptyTargetName { index: 0 })
        ));
    }

    #[test]
    fn test_malformed_output() {
        assert!(matches!(
            TargetRegistry::from_json("Board not found"),
            Err(RegistryError::InvalidJson { .. })
        ));
        assert!(matches!(
            TargetRegistry::from_json(""),
            Err(RegistryError::InvalidJson { .. })
        ));
        assert!(matches!(
            TargetRegistry::from_json(r#"{"target_id": "FFFF"}"#),
            Err(RegistryError::NotAnArray { found: "an object" })
        ));
        assert!(matches!(
            TargetRegistry::from_json("[1]"),
            Err(RegistryError::NotAnObject { index: 0, .. })
        ));
    }

    #[test]
    fn test_by_platform() {
        let json = r#"[
            {"target_id": "07400001", "target_name": "NUCLEO_F401RE", "serial_port": "/dev/a", "image_format": "bin"},
            {"target_id": "FFFF0001", "target_name": "BLACKPILL_F401CC", "serial_port": "/dev/b", "image_format": "elf"},
            {"target_id": "07400002", "target_name": "NUCLEO_F401RE", "serial_port": "/dev/c", "image_format": "bin"}
        ]"#;
        let registry = TargetRegistry::from_json(json).unwrap();
        assert_eq!(registry.by_platform("NUCLEO_F401RE").count(), 2);
        assert_eq!(registry.by_platform("BLACKPILL_F401CC").count(), 1);
        assert_eq!(registry.by_platform("K64F").count(), 0);
    }
}
