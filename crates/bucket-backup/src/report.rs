//! The result of a backup run.
//!

use core::fmt;
use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{config::Mode, naming::Timestamp, store::FolderStatus};

/// What happened to a single unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "cause")]
pub enum UnitOutcome {
    /// The artifact was uploaded and the local copy removed.
    Success,

    /// The artifact could not be created, nothing was uploaded.
    ArchiveFailed(String),

    /// The artifact could not be uploaded, the local copy was kept.
    UploadFailed(String),

    /// The artifact was uploaded but the local copy could not be removed.
    CleanupFailed(String),
}

impl UnitOutcome {
    /// If the backup of this unit is stored remotely.
    pub fn is_uploaded(&self) -> bool {
        matches!(self, Self::Success | Self::CleanupFailed(_))
    }
}

/// The report for a single unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitReport {
    /// The unit's name.
    pub unit: String,

    /// The key the artifact was uploaded to.
    pub remote_key: String,

    /// Where the artifact was written locally.
    pub local_path: PathBuf,

    /// The size of the artifact, if one was created.
    pub bytes: Option<u64>,

    /// What happened.
    pub outcome: UnitOutcome,
}

/// The report of a whole run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// The capture instant shared by every artifact in the run.
    pub timestamp: Timestamp,

    /// The mode of the run.
    pub mode: Mode,

    /// If the destination folder had to be created.
    pub folder: FolderStatus,

    /// The units in configured order.
    pub units: Vec<UnitReport>,
}

impl Report {
    /// If every unit succeeded.
    pub fn is_success(&self) -> bool {
        self.units
            .iter()
            .all(|unit| unit.outcome == UnitOutcome::Success)
    }

    /// The units that did not fully succeed.
    pub fn failures(&self) -> impl Iterator<Item = &UnitReport> {
        self.units
            .iter()
            .filter(|unit| unit.outcome != UnitOutcome::Success)
    }

    /// The outcome of each unit in order.
    pub fn outcomes(&self) -> Vec<&UnitOutcome> {
        self.units.iter().map(|unit| &unit.outcome).collect()
    }

    /// Write the report as JSON.
    pub fn write_json(&self, path: &Path) -> Result<(), WriteReportError> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents).map_err(WriteReportError::WriteFile)?;
        Ok(())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let uploaded = self
            .units
            .iter()
            .filter(|unit| unit.outcome.is_uploaded())
            .count();

        write!(
            f,
            "{:?} backup {}: {uploaded}/{} units uploaded",
            self.mode,
            self.timestamp,
            self.units.len()
        )
    }
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum WriteReportError {
    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::error::Error),

    #[error("Failed to write report file: {0}")]
    WriteFile(#[source] io::Error),
}
