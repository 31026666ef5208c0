//! Names for backup artifacts and their remote keys.
//!

use core::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::label::ArtifactLabel;

/// Sortable, filesystem safe timestamp format.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// The file extension of every artifact.
pub const ARTIFACT_EXTENSION: &str = "zip";

/// The capture instant of a backup run, formatted as `YYYY-MM-DD_HH-MM-SS` in local time.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(String);

impl Timestamp {
    /// The current local time.
    pub fn now() -> Self {
        Self::from_datetime(Local::now())
    }

    /// Format a given instant.
    pub fn from_datetime(datetime: DateTime<Local>) -> Self {
        Self(datetime.format(TIMESTAMP_FORMAT).to_string())
    }

    /// The formatted timestamp.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The file name of an artifact, `<label>_<timestamp>.zip`.
pub fn artifact_name(label: &ArtifactLabel, timestamp: &Timestamp) -> String {
    format!("{label}_{timestamp}.{ARTIFACT_EXTENSION}")
}

/// The key of an artifact inside the destination folder.
///
/// The two parts are joined with a single `/` and are otherwise left as is.
pub fn remote_key(folder: &str, artifact_name: &str) -> String {
    format!("{folder}/{artifact_name}")
}
