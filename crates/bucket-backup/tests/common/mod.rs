//! # common
//!

#![allow(dead_code)]

use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{self, Read},
    path::{Path, PathBuf},
};

use bucket_backup::{
    archiver::{ArchiveArtifact, ArchiveError, DirectoryArchiver, Layout, ZipArchiver},
    config::{Config, Mode, StoreConfig},
};
use zip::ZipArchive;

pub const BUCKET: &str = "test-bucket";
pub const FOLDER: &str = "backups";

/// A config backing up `sources` below `root` into `staging`.
pub fn test_config(root: &Path, sources: &[&str], staging: &Path, mode: Mode) -> Config {
    Config {
        mode,
        source_root: root.to_path_buf(),
        sources: sources.iter().map(PathBuf::from).collect(),
        staging_directory: staging.to_path_buf(),
        report_file: None,
        store: StoreConfig {
            bucket: BUCKET.to_string(),
            folder: FOLDER.to_string(),
            ..StoreConfig::default()
        },
        ..Config::default()
    }
}

/// Every file entry in a zip archive and its contents.
pub fn read_entries(bytes: &[u8]) -> BTreeMap<String, Vec<u8>> {
    let mut archive = ZipArchive::new(io::Cursor::new(bytes)).unwrap();
    let mut entries = BTreeMap::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).unwrap();
        if entry.is_dir() {
            continue;
        }

        let mut contents = Vec::new();
        entry.read_to_end(&mut contents).unwrap();
        entries.insert(entry.name().to_string(), contents);
    }

    entries
}

/// Every entry name in a zip archive file, including directories.
pub fn entry_names(path: &Path) -> Vec<String> {
    let archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    archive.file_names().map(str::to_string).collect()
}

/// Every file entry in a zip archive file and its contents.
pub fn read_archive(path: &Path) -> BTreeMap<String, Vec<u8>> {
    read_entries(&fs::read(path).unwrap())
}

/// Files left in a directory.
pub fn files_in(directory: &Path) -> Vec<PathBuf> {
    fs::read_dir(directory)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.is_file())
        .collect()
}

/// Archives with a zip archiver, except for directories named `fail_on`.
///
/// A failing archive leaves a partial file behind, like an archiver failing midway would.
pub struct FailingArchiver {
    pub fail_on: String,
}

impl DirectoryArchiver for FailingArchiver {
    fn archive(
        &self,
        directories: &[PathBuf],
        layout: Layout,
        destination: &Path,
    ) -> Result<ArchiveArtifact, ArchiveError> {
        let should_fail = directories
            .iter()
            .any(|directory| directory.file_name().is_some_and(|name| name == self.fail_on.as_str()));

        if should_fail {
            fs::write(destination, b"partial").unwrap();
            return Err(ArchiveError::Io(
                io::Error::other("simulated failure"),
                "write archive",
            ));
        }

        ZipArchiver::default().archive(directories, layout, destination)
    }
}
