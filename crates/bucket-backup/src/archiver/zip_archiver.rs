#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::{
    ffi::OsStr,
    fs::{self, File, Metadata, OpenOptions},
    io::{self, BufWriter, Seek, Write},
    path::{Component, Path, PathBuf},
};

use chrono::{DateTime, Local};
use tracing::warn;
use walkdir::WalkDir;
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use super::{ArchiveArtifact, ArchiveError, DirectoryArchiver, Layout};

/// The highest deflate compression level.
pub const MAX_COMPRESSION_LEVEL: i64 = 9;

/// Files at or above this size need ZIP64 headers.
const LARGE_FILE_BYTES: u64 = 0xFFFF_FFFF;

/// Archive directories into a deflate compressed zip file.
#[derive(Clone, Copy, Debug)]
pub struct ZipArchiver {
    /// The deflate compression level, `0..=9`.
    pub compression_level: i64,
}

impl Default for ZipArchiver {
    fn default() -> Self {
        Self {
            compression_level: MAX_COMPRESSION_LEVEL,
        }
    }
}

impl DirectoryArchiver for ZipArchiver {
    fn archive(
        &self,
        directories: &[PathBuf],
        layout: Layout,
        destination: &Path,
    ) -> Result<ArchiveArtifact, ArchiveError> {
        if directories.is_empty() {
            return Err(ArchiveError::NoDirectories);
        }

        // Check every source before creating the output.
        let mut sources = Vec::with_capacity(directories.len());
        for directory in directories {
            let metadata = fs::metadata(directory)
                .map_err(|e| ArchiveError::AccessSource(e, directory.clone()))?;
            if !metadata.is_dir() {
                return Err(ArchiveError::NotDirectory(directory.clone()));
            }

            let prefix = match layout {
                Layout::Nested => Some(base_name(directory)?),
                Layout::Flat => None,
            };

            sources.push((directory.as_path(), prefix, metadata));
        }

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(destination)
            .map_err(|e| ArchiveError::CreateOutput(e, destination.to_path_buf()))?;
        let created = Local::now();

        let name = destination
            .file_name()
            .and_then(OsStr::to_str)
            .ok_or_else(|| ArchiveError::NotUnicode(destination.to_path_buf()))?
            .to_string();

        let mut writer = ZipWriter::new(BufWriter::new(file));
        for (directory, prefix, metadata) in sources {
            self.append_directory(&mut writer, directory, prefix, &metadata)?;
        }

        // Flush everything to disk before handing the artifact over.
        let file = writer
            .finish()?
            .into_inner()
            .map_err(|e| ArchiveError::Io(e.into_error(), "flush archive"))?;
        file.sync_all()
            .map_err(|e| ArchiveError::Io(e, "sync archive"))?;
        let bytes = file
            .metadata()
            .map_err(|e| ArchiveError::Io(e, "get archive metadata"))?
            .len();
        drop(file);

        Ok(ArchiveArtifact {
            path: destination.to_path_buf(),
            name,
            bytes,
            created,
        })
    }
}

impl ZipArchiver {
    /// Create an archiver with a given compression level.
    pub fn new(compression_level: i64) -> Self {
        Self { compression_level }
    }

    /// Entry options carrying the modification time and permissions of `metadata`.
    fn entry_options(&self, metadata: &Metadata) -> SimpleFileOptions {
        let mut options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(self.compression_level));

        // Zip timestamps can't go before 1980, older files keep the default.
        if let Some(modified) = modified_time(metadata) {
            options = options.last_modified_time(modified);
        }

        #[cfg(unix)]
        {
            options = options.unix_permissions(metadata.permissions().mode());
        }

        options
    }

    /// Add every entry below `directory`, optionally rooted under `prefix`.
    fn append_directory<W: Write + Seek>(
        &self,
        writer: &mut ZipWriter<W>,
        directory: &Path,
        prefix: Option<&str>,
        metadata: &Metadata,
    ) -> Result<(), ArchiveError> {
        if let Some(prefix) = prefix {
            writer.add_directory(prefix, self.entry_options(metadata))?;
        }

        for entry in WalkDir::new(directory)
            .follow_links(false)
            .min_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            let path = entry.path();
            let name = entry_name(prefix, path, directory)?;
            let file_type = entry.file_type();
            let metadata = entry.metadata()?;
            let options = self.entry_options(&metadata);

            if file_type.is_dir() {
                writer.add_directory(name, options)?;
            } else if file_type.is_file() {
                let mut source =
                    File::open(path).map_err(|e| ArchiveError::ReadSource(e, path.to_path_buf()))?;

                writer.start_file(name, options.large_file(metadata.len() >= LARGE_FILE_BYTES))?;
                io::copy(&mut source, writer)
                    .map_err(|e| ArchiveError::CopySource(e, path.to_path_buf()))?;
            } else if file_type.is_symlink() {
                let target =
                    fs::read_link(path).map_err(|e| ArchiveError::ReadSource(e, path.to_path_buf()))?;
                let target = target
                    .to_str()
                    .ok_or_else(|| ArchiveError::NotUnicode(path.to_path_buf()))?;

                writer.add_symlink(name, target, options)?;
            } else {
                warn!("Skipping {path:?}: not a regular file, directory or symlink");
            }
        }

        Ok(())
    }
}

/// The local modification time of `metadata` as a zip timestamp.
fn modified_time(metadata: &Metadata) -> Option<zip::DateTime> {
    let modified = DateTime::<Local>::from(metadata.modified().ok()?);
    zip::DateTime::try_from(modified.naive_local()).ok()
}

/// The name of a directory inside an archive.
fn base_name(directory: &Path) -> Result<&str, ArchiveError> {
    directory
        .file_name()
        .and_then(OsStr::to_str)
        .ok_or_else(|| ArchiveError::NoBaseName(directory.to_path_buf()))
}

/// The `/` separated archive entry name for `path` relative to `root`.
fn entry_name(prefix: Option<&str>, path: &Path, root: &Path) -> Result<String, ArchiveError> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| ArchiveError::OutsideSource(path.to_path_buf()))?;

    let mut segments: Vec<&str> = prefix.into_iter().collect();
    for component in relative.components() {
        if let Component::Normal(segment) = component {
            let segment = segment
                .to_str()
                .ok_or_else(|| ArchiveError::NotUnicode(path.to_path_buf()))?;
            segments.push(segment);
        }
    }

    Ok(segments.join("/"))
}
