//! Runs a backup from the configured sources to the store.
//!

use std::{
    fs, io, panic,
    path::{Path, PathBuf},
    thread,
};

use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    archiver::{DirectoryArchiver, Layout},
    backup_set::{BackupSet, ConfigError, directory_label},
    config::{Config, Mode},
    context::Context,
    label::ArtifactLabel,
    naming::{Timestamp, artifact_name, remote_key},
    report::{Report, UnitOutcome, UnitReport},
    store::{BlobGateway, FolderStatus, ObjectStore, StoreError},
};

/// The smallest independently reported piece of work.
#[derive(Clone, Debug)]
struct Unit {
    label: ArtifactLabel,
    directories: Vec<PathBuf>,
    layout: Layout,
}

/// Drives a backup run: ensure the destination, then archive, upload and clean up each unit.
pub struct Orchestrator<A, S> {
    config: Config,
    archiver: A,
    gateway: BlobGateway<S>,
}

impl<A: DirectoryArchiver, S: ObjectStore> Orchestrator<A, S> {
    /// Create an orchestrator for a config.
    pub fn new(config: Config, archiver: A, store: S) -> Self {
        Self {
            config,
            archiver,
            gateway: BlobGateway::new(store),
        }
    }

    /// The run's config.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The gateway to the store.
    pub fn gateway(&self) -> &BlobGateway<S> {
        &self.gateway
    }

    /// Run one backup.
    ///
    /// Fails only if the config is invalid or the destination folder can't be ensured, every other
    /// failure is confined to its unit and reported.
    pub fn run(&self) -> Result<Report, RunError> {
        self.config.validate()?;
        let backup_set = BackupSet::new(self.config.source_directories())?;
        let units = self.plan(&backup_set)?;

        let staging_directory = &self.config.staging_directory;
        fs::create_dir_all(staging_directory)
            .map_err(|e| RunError::StagingDirectory(e, staging_directory.clone()))?;

        let context = Context {
            unit: None,
            stage: "Ensure Destination",
        };
        let folder = &self.config.store.folder;
        let folder_status = self
            .gateway
            .ensure_folder(folder)
            .inspect_err(|e| error!("{context}Could not ensure backup folder '{folder}': {e}"))
            .map_err(RunError::Destination)?;
        match folder_status {
            FolderStatus::Existing => info!("{context}Backup folder '{folder}' already exists"),
            FolderStatus::Created => info!("{context}Created backup folder '{folder}'"),
        }

        let timestamp = Timestamp::now();

        let reports: Vec<UnitReport> = if self.config.parallel && units.len() > 1 {
            let timestamp = &timestamp;
            thread::scope(|scope| {
                let handles: Vec<_> = units
                    .iter()
                    .map(|unit| scope.spawn(move || self.run_unit(unit, timestamp)))
                    .collect();

                handles
                    .into_iter()
                    .map(|handle| handle.join().unwrap_or_else(|e| panic::resume_unwind(e)))
                    .collect()
            })
        } else {
            units
                .iter()
                .map(|unit| self.run_unit(unit, &timestamp))
                .collect()
        };

        Ok(Report {
            timestamp,
            mode: self.config.mode,
            folder: folder_status,
            units: reports,
        })
    }

    /// Split the backup set into units for the configured mode.
    fn plan(&self, backup_set: &BackupSet) -> Result<Vec<Unit>, ConfigError> {
        match self.config.mode {
            Mode::Aggregate => Ok(vec![Unit {
                label: self.config.backup_name.clone(),
                directories: backup_set.directories().to_vec(),
                layout: Mode::Aggregate.layout(),
            }]),

            Mode::PerDirectory => backup_set
                .directories()
                .iter()
                .map(|directory| {
                    directory_label(directory).map(|label| Unit {
                        label,
                        directories: vec![directory.clone()],
                        layout: Mode::PerDirectory.layout(),
                    })
                })
                .collect(),
        }
    }

    /// Archive, upload then clean up a single unit.
    fn run_unit(&self, unit: &Unit, timestamp: &Timestamp) -> UnitReport {
        let mut context = Context::for_unit(unit.label.as_str());

        let name = artifact_name(&unit.label, timestamp);
        let local_path = self.config.staging_directory.join(&name);
        let key = remote_key(&self.config.store.folder, &name);

        let mut report = UnitReport {
            unit: unit.label.to_string(),
            remote_key: key,
            local_path,
            bytes: None,
            outcome: UnitOutcome::Success,
        };

        // Build artifact
        context.stage = "Build Artifact";
        let archived = self
            .archiver
            .archive(&unit.directories, unit.layout, &report.local_path);
        let artifact = match archived {
            Ok(artifact) => artifact,
            Err(e) => {
                error!("{context}Could not create {name}: {e}");
                if e.created_output() {
                    discard_partial(&context, &report.local_path);
                }

                report.outcome = UnitOutcome::ArchiveFailed(e.to_string());
                return report;
            }
        };
        report.bytes = Some(artifact.bytes);
        info!("{context}Created {name} ({} bytes)", artifact.bytes);

        // Upload
        context.stage = "Upload";
        if let Err(e) = self.gateway.upload_artifact(&report.remote_key, &artifact) {
            error!(
                "{context}Could not upload {name}, keeping {:?}: {e}",
                artifact.path
            );
            report.outcome = UnitOutcome::UploadFailed(e.to_string());
            return report;
        }
        info!("{context}Uploaded to '{}'", report.remote_key);

        // Cleanup
        context.stage = "Cleanup";
        if self.config.dry_run {
            info!("{context}Dry run, keeping local artifact {:?}", artifact.path);
            return report;
        }

        if let Err(e) = fs::remove_file(&artifact.path) {
            let error = CleanupError::RemoveArtifact(e, artifact.path.clone());
            warn!("{context}{error}");
            report.outcome = UnitOutcome::CleanupFailed(error.to_string());
            return report;
        }
        info!("{context}Deleted local artifact {:?}", artifact.path);

        report
    }
}

/// Remove a partial artifact left by a failed archive.
fn discard_partial(context: &Context, path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => info!("{context}Discarded partial artifact {path:?}"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("{context}Could not discard partial artifact {path:?}: {e}"),
    }
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Invalid config: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to create staging directory {1:?}: {0}")]
    StagingDirectory(#[source] io::Error, PathBuf),

    #[error("Failed to ensure the destination folder: {0}")]
    Destination(#[source] StoreError),
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("Failed to remove local artifact {1:?}: {0}")]
    RemoveArtifact(#[source] io::Error, PathBuf),
}
