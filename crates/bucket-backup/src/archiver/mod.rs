//! Packs source directories into a single archive artifact.
//!

use std::{
    io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zip::result::ZipError;

mod zip_archiver;

pub use zip_archiver::{MAX_COMPRESSION_LEVEL, ZipArchiver};

/// Something that can pack directory trees into an archive file.
pub trait DirectoryArchiver: Send + Sync {
    /// Archive `directories` into the new file `destination`.
    ///
    /// `destination` must not exist. The artifact is only returned once every byte has been flushed
    /// to disk and the file has been closed. On error, a file left at `destination` is invalid, see
    /// [`ArchiveError::created_output`].
    fn archive(
        &self,
        directories: &[PathBuf],
        layout: Layout,
        destination: &Path,
    ) -> Result<ArchiveArtifact, ArchiveError>;
}

/// Where the contents of each directory are placed inside the archive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layout {
    /// Each directory's contents are rooted under an entry named after the directory.
    Nested,

    /// The directory's contents are placed at the archive root.
    Flat,
}

/// A finished archive on the local filesystem.
#[derive(Clone, Debug)]
pub struct ArchiveArtifact {
    /// Where the artifact was written.
    pub path: PathBuf,

    /// The artifact's file name.
    pub name: String,

    /// The size of the artifact in bytes.
    pub bytes: u64,

    /// When the artifact was created.
    pub created: DateTime<Local>,
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("No directories were given to archive")]
    NoDirectories,

    #[error("Failed to access source {1:?}: {0}")]
    AccessSource(#[source] io::Error, PathBuf),

    #[error("Source {0:?} is not a directory")]
    NotDirectory(PathBuf),

    #[error("Source {0:?} has no usable base name")]
    NoBaseName(PathBuf),

    #[error("Path {0:?} is not valid unicode")]
    NotUnicode(PathBuf),

    #[error("Failed to read source {1:?}: {0}")]
    ReadSource(#[source] io::Error, PathBuf),

    #[error("Failed to copy source {1:?} into the archive: {0}")]
    CopySource(#[source] io::Error, PathBuf),

    #[error("Entry {0:?} is outside its source directory")]
    OutsideSource(PathBuf),

    #[error("Failed to create archive {1:?}: {0}")]
    CreateOutput(#[source] io::Error, PathBuf),

    #[error("Failed to walk source directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Failed to write archive: {0}")]
    Zip(#[from] ZipError),

    #[error("Failed to {1}: {0}")]
    Io(#[source] io::Error, &'static str),
}

impl ArchiveError {
    /// If the archiver had created the output file before failing.
    ///
    /// When true, the file at the destination is a partial archive owned by the caller.
    pub fn created_output(&self) -> bool {
        !matches!(
            self,
            Self::NoDirectories
                | Self::AccessSource(_, _)
                | Self::NotDirectory(_)
                | Self::NoBaseName(_)
                | Self::CreateOutput(_, _)
        )
    }
}
