//! Bucket backup config
//!

use core::{fmt, time::Duration};
use std::{fs, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{archiver::Layout, backup_set::ConfigError, label::ArtifactLabel};

/// How the source directories are split into artifacts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// Every source goes into one artifact, each under a folder named after the source.
    #[default]
    Aggregate,

    /// Every source gets its own artifact, with the source's contents at the archive root.
    PerDirectory,
}

impl Mode {
    /// The archive layout used by this mode.
    pub fn layout(self) -> Layout {
        match self {
            Self::Aggregate => Layout::Nested,
            Self::PerDirectory => Layout::Flat,
        }
    }
}

/// Static credentials for the store.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct StaticCredentials {
    /// The access key ID.
    pub access_key_id: String,

    /// The secret access key.
    pub secret_access_key: String,
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Where backups are stored.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreConfig {
    /// The bucket name.
    pub bucket: String,

    /// The folder inside the bucket to store backups in.
    pub folder: String,

    /// The bucket's region.
    pub region: String,

    /// A custom endpoint, for S3 compatible stores.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,

    /// Use path style addressing instead of virtual hosted buckets.
    #[serde(default)]
    pub force_path_style: bool,

    /// The deadline for a single request to the store.
    pub timeout_seconds: u64,

    /// Credentials to use instead of the default AWS credential chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<StaticCredentials>,
}

impl StoreConfig {
    /// The deadline for a single request to the store.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            folder: String::new(),
            region: "us-east-1".to_string(),
            endpoint_url: None,
            force_path_style: false,
            timeout_seconds: 60 * 10,
            credentials: None,
        }
    }
}

/// The backup config
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// How sources are split into artifacts.
    #[serde(default)]
    pub mode: Mode,

    /// The name of the artifact in aggregate mode.
    #[serde(default)]
    pub backup_name: ArtifactLabel,

    /// Joined to the front of every relative source.
    #[serde(default)]
    pub source_root: PathBuf,

    /// The directories to back up.
    pub sources: Vec<PathBuf>,

    /// Where artifacts are written before they are uploaded.
    pub staging_directory: PathBuf,

    /// Run per directory backups in parallel.
    #[serde(default)]
    pub parallel: bool,

    /// Upload to an in-memory store instead of the configured bucket, keeping local artifacts.
    #[serde(default)]
    pub dry_run: bool,

    /// Where to write the JSON report of the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_file: Option<PathBuf>,

    /// Where backups are stored.
    pub store: StoreConfig,
}

impl Config {
    /// Tries to load a config from a toml file.
    pub fn load_toml(file_path: PathBuf) -> Result<Self, LoadConfigError> {
        if !file_path.exists() {
            return Err(LoadConfigError::NoFile);
        }

        let contents = fs::read_to_string(file_path).map_err(LoadConfigError::Read)?;
        let config = toml::from_str(&contents)?;

        Ok(config)
    }

    /// The configured sources joined onto the source root.
    pub fn source_directories(&self) -> Vec<PathBuf> {
        self.sources
            .iter()
            .map(|source| self.source_root.join(source))
            .collect()
    }

    /// Check the settings that do not depend on the filesystem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.bucket.is_empty() {
            return Err(ConfigError::MissingBucket);
        }

        if self.store.folder.is_empty() {
            return Err(ConfigError::MissingFolder);
        }

        if self.store.timeout_seconds == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            backup_name: ArtifactLabel::default(),
            source_root: PathBuf::new(),
            sources: vec![
                PathBuf::from("world"),
                PathBuf::from("world_nether"),
                PathBuf::from("world_the_end"),
            ],
            staging_directory: PathBuf::from("."),
            parallel: false,
            dry_run: false,
            report_file: Some(PathBuf::from("report.json")),
            store: StoreConfig::default(),
        }
    }
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("The file does not exist.")]
    NoFile,

    #[error("Failed to read the file:\n{0}")]
    Read(#[source] std::io::Error),

    #[error("Failed to deserialize the file:\n{0}")]
    Deserialize(#[from] toml::de::Error),
}
