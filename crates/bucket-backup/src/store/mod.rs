//! Remote object storage for backup artifacts.
//!

use core::time::Duration;
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::archiver::ArchiveArtifact;

mod memory;
mod s3;

pub use memory::MemoryStore;
pub use s3::S3Store;

/// A flat key/value object store such as an S3 bucket.
pub trait ObjectStore: Send + Sync {
    /// Query an object's metadata.
    fn head_object(&self, key: &str) -> HeadOutcome;

    /// Store `body` under `key`, replacing any existing object.
    ///
    /// The object is only durably stored if this returns `Ok`.
    fn put_object(&self, key: &str, body: Vec<u8>) -> Result<(), StoreError>;

    /// Store the contents of the file at `path` under `key`, replacing any existing object.
    ///
    /// Reads the whole file into memory unless the store can stream it.
    fn put_file(&self, key: &str, path: &Path) -> Result<(), StoreError> {
        let body = fs::read(path).map_err(|e| StoreError::ReadArtifact(e, path.to_path_buf()))?;
        self.put_object(key, body)
    }
}

impl<T: ObjectStore + ?Sized> ObjectStore for Arc<T> {
    fn head_object(&self, key: &str) -> HeadOutcome {
        (**self).head_object(key)
    }

    fn put_object(&self, key: &str, body: Vec<u8>) -> Result<(), StoreError> {
        (**self).put_object(key, body)
    }

    fn put_file(&self, key: &str, path: &Path) -> Result<(), StoreError> {
        (**self).put_file(key, path)
    }
}

/// The result of checking if an object exists.
#[derive(Debug)]
pub enum HeadOutcome {
    /// The object exists.
    Found,

    /// The store reported that there is no such object.
    NotFound,

    /// The store could not answer.
    TransportError(StoreError),
}

/// What [`BlobGateway::ensure_folder`] had to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FolderStatus {
    /// The folder marker was already present.
    Existing,

    /// The folder marker was created.
    Created,
}

/// Backup level operations on top of an [`ObjectStore`].
pub struct BlobGateway<S> {
    store: S,
}

impl<S: ObjectStore> BlobGateway<S> {
    /// Wrap a store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// If an object exists under `key`.
    pub fn exists(&self, key: &str) -> Result<bool, StoreError> {
        match self.store.head_object(key) {
            HeadOutcome::Found => Ok(true),
            HeadOutcome::NotFound => Ok(false),
            HeadOutcome::TransportError(error) => Err(error),
        }
    }

    /// Create an empty marker object at `folder_key` unless one is already there.
    pub fn ensure_folder(&self, folder_key: &str) -> Result<FolderStatus, StoreError> {
        if self.exists(folder_key)? {
            return Ok(FolderStatus::Existing);
        }

        self.store.put_object(folder_key, Vec::new())?;

        Ok(FolderStatus::Created)
    }

    /// Upload `content` under `key`.
    pub fn upload(&self, key: &str, content: Vec<u8>) -> Result<(), StoreError> {
        self.store.put_object(key, content)
    }

    /// Upload the contents of a local artifact under `key`.
    ///
    /// Sent as a single `PutObject`, so S3 rejects artifacts larger than 5 GiB.
    pub fn upload_artifact(&self, key: &str, artifact: &ArchiveArtifact) -> Result<(), StoreError> {
        self.store.put_file(key, &artifact.path)
    }
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum StoreError {
    /// `operation, key, cause`
    #[error("Failed to {0} '{1}': {2}")]
    Request(&'static str, String, String),

    /// `operation, key, deadline`
    #[error("Timed out after {2:?} trying to {0} '{1}'")]
    Timeout(&'static str, String, Duration),

    #[error("Failed to read artifact {1:?}: {0}")]
    ReadArtifact(#[source] io::Error, PathBuf),

    #[error("Failed to create async runtime: {0}")]
    Runtime(#[source] io::Error),
}
