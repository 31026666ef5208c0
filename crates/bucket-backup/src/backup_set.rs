//! The directories backed up together.
//!

use std::{
    collections::HashSet,
    ffi::OsStr,
    fs, io,
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::label::{ArtifactLabel, LabelError};

/// A non-empty, ordered set of existing directories with distinct base names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackupSet {
    directories: Vec<PathBuf>,
}

impl BackupSet {
    /// Check the directories and build a set from them.
    pub fn new(directories: Vec<PathBuf>) -> Result<Self, ConfigError> {
        if directories.is_empty() {
            return Err(ConfigError::EmptyBackupSet);
        }

        {
            let mut names = HashSet::with_capacity(directories.len());
            for directory in &directories {
                let metadata = fs::metadata(directory)
                    .map_err(|e| ConfigError::MissingDirectory(e, directory.clone()))?;
                if !metadata.is_dir() {
                    return Err(ConfigError::NotDirectory(directory.clone()));
                }

                let name = base_name(directory)?;
                if !names.insert(name) {
                    return Err(ConfigError::DuplicateName(name.to_string()));
                }
            }
        }

        Ok(Self { directories })
    }

    /// The directories in configured order.
    pub fn directories(&self) -> &[PathBuf] {
        &self.directories
    }
}

/// The label of the artifact for a single directory.
pub fn directory_label(directory: &Path) -> Result<ArtifactLabel, ConfigError> {
    let name = base_name(directory)?;
    ArtifactLabel::try_from(name).map_err(|e| ConfigError::InvalidLabel(e, name.to_string()))
}

fn base_name(directory: &Path) -> Result<&str, ConfigError> {
    directory
        .file_name()
        .and_then(OsStr::to_str)
        .ok_or_else(|| ConfigError::NoBaseName(directory.to_path_buf()))
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No source directories were configured")]
    EmptyBackupSet,

    #[error("Source directory {1:?} could not be accessed: {0}")]
    MissingDirectory(#[source] io::Error, PathBuf),

    #[error("Source {0:?} is not a directory")]
    NotDirectory(PathBuf),

    #[error("Source {0:?} has no usable base name")]
    NoBaseName(PathBuf),

    #[error("More than one source is named '{0}'")]
    DuplicateName(String),

    #[error("Source '{1}' can't be used as an artifact name: {0}")]
    InvalidLabel(#[source] LabelError, String),

    #[error("No bucket was configured")]
    MissingBucket,

    #[error("No destination folder was configured")]
    MissingFolder,

    #[error("The store timeout must be at least one second")]
    ZeroTimeout,
}
