//! Validated logical names for backup artifacts.
//!

use core::fmt;

use serde::{Deserialize, Serialize, de};
use thiserror::Error;

/// The longest label accepted, in bytes.
pub const MAX_LABEL_LENGTH: usize = 128;

/// A logical backup name that only accepts `[a-zA-Z0-9_.-]`.
///
/// Labels never contain a path separator and never start with `.`, so they are safe to use as a
/// file name and as a single segment of a remote key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ArtifactLabel {
    label: String,
}

impl ArtifactLabel {
    /// The label as a string slice.
    pub fn as_str(&self) -> &str {
        &self.label
    }
}

impl TryFrom<&str> for ArtifactLabel {
    type Error = LabelError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(Self::Error::Empty);
        }

        // Check length
        if value.len() > MAX_LABEL_LENGTH {
            return Err(Self::Error::TooLong(value.len(), MAX_LABEL_LENGTH));
        }

        // All characters must be valid
        if let Some((index, character)) = value
            .char_indices()
            .find(|(_, character)| !is_valid_character(*character))
        {
            return Err(Self::Error::Invalid(index, character));
        }

        // Hidden files and `..` are not labels
        if value.starts_with('.') {
            return Err(Self::Error::Invalid(0, '.'));
        }

        Ok(Self {
            label: value.to_string(),
        })
    }
}

fn is_valid_character(character: char) -> bool {
    character.is_ascii_alphanumeric() || matches!(character, '-' | '_' | '.')
}

impl TryFrom<String> for ArtifactLabel {
    type Error = LabelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl Default for ArtifactLabel {
    fn default() -> Self {
        Self {
            label: "backup".to_string(),
        }
    }
}

impl fmt::Debug for ArtifactLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ArtifactLabel").field(&self.label).finish()
    }
}

impl fmt::Display for ArtifactLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

impl<'de> Deserialize<'de> for ArtifactLabel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let string: String = Deserialize::deserialize(deserializer)?;
        Self::try_from(string).map_err(de::Error::custom)
    }
}

impl Serialize for ArtifactLabel {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.label)
    }
}

#[allow(missing_docs)]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LabelError {
    /// `length, limit`
    #[error("Label was too long {0} > {1}")]
    TooLong(usize, usize),

    #[error("Label was empty")]
    Empty,

    /// `index, char`
    #[error("Invalid character at index {0}: '{1}', may only contain [a-zA-Z0-9_.-]")]
    Invalid(usize, char),
}
