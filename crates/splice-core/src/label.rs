//! Schema labels of the form `Name.Version`.

use std::fmt;

use crate::error::{Result, SpliceError};

/// A parsed `"<Name>.<Version>"` schema label, as carried in the
/// `OTIO_SCHEMA` key of every encoded object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaLabel {
    pub name: String,
    pub version: u32,
}

impl SchemaLabel {
    /// Key under which every encoded object carries its label.
    pub const KEY: &'static str = "OTIO_SCHEMA";

    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// Parse `"Track.1"` into `("Track", 1)`.
    ///
    /// The version is everything after the last `.`, so schema names may
    /// themselves contain dots.
    pub fn parse(label: &str) -> Result<Self> {
        let (name, version) = label
            .rsplit_once('.')
            .ok_or_else(|| SpliceError::MalformedSchemaLabel(label.to_string()))?;
        if name.is_empty() {
            return Err(SpliceError::MalformedSchemaLabel(label.to_string()));
        }
        let version = version
            .parse::<u32>()
            .map_err(|_| SpliceError::MalformedSchemaLabel(label.to_string()))?;
        Ok(Self::new(name, version))
    }

    /// Check that `label` names `expected` at a version no newer than `current`.
    pub fn expect(label: &str, expected: &str, current: u32) -> Result<Self> {
        let parsed = Self::parse(label)?;
        if parsed.name != expected {
            return Err(SpliceError::TypeMismatch {
                expected: expected.to_string(),
                found: parsed.name,
            });
        }
        if parsed.version > current {
            return Err(SpliceError::UnsupportedSchemaVersion {
                name: parsed.name,
                version: parsed.version,
                current,
            });
        }
        Ok(parsed)
    }
}

impl fmt::Display for SchemaLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.name, self.version)
    }
}
