//! Tests for the zip archiver
//!

#[cfg(unix)]
use std::os::unix::fs::{PermissionsExt, symlink};
use std::{
    fs::{self, File},
    path::PathBuf,
    time::SystemTime,
};

use bucket_backup::archiver::{ArchiveError, DirectoryArchiver, Layout, ZipArchiver};
use chrono::{Local, TimeZone};
use common::{entry_names, read_archive};
use zip::ZipArchive;
use shared::test::{scratch_directory, source_directory};

mod common;

#[test]
fn flat_round_trip() {
    let scratch = scratch_directory();
    let source = source_directory(
        scratch.path(),
        "world",
        &[("a.txt", "alpha"), ("b/c.txt", "charlie")],
    );
    let destination = scratch.path().join("world.zip");

    let artifact = ZipArchiver::default()
        .archive(&[source], Layout::Flat, &destination)
        .unwrap();

    assert_eq!(artifact.path, destination);
    assert_eq!(artifact.name, "world.zip");
    assert_eq!(artifact.bytes, fs::metadata(&destination).unwrap().len());

    let entries = read_archive(&destination);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries["a.txt"], b"alpha");
    assert_eq!(entries["b/c.txt"], b"charlie");
}

#[test]
fn nested_roots_each_directory() {
    let scratch = scratch_directory();
    let world = source_directory(scratch.path(), "world", &[("level.dat", "overworld")]);
    let nether = source_directory(scratch.path(), "world_nether", &[("level.dat", "nether")]);
    let destination = scratch.path().join("backup.zip");

    ZipArchiver::default()
        .archive(&[world, nether], Layout::Nested, &destination)
        .unwrap();

    let entries = read_archive(&destination);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries["world/level.dat"], b"overworld");
    assert_eq!(entries["world_nether/level.dat"], b"nether");
}

#[test]
fn keeps_empty_directories() {
    let scratch = scratch_directory();
    let source = source_directory(scratch.path(), "world", &[("a.txt", "alpha")]);
    fs::create_dir_all(source.join("region/empty")).unwrap();
    let destination = scratch.path().join("world.zip");

    ZipArchiver::default()
        .archive(&[source], Layout::Nested, &destination)
        .unwrap();

    let names = entry_names(&destination);
    assert!(names.contains(&"world/".to_string()));
    assert!(names.contains(&"world/region/empty/".to_string()));
    assert!(names.contains(&"world/a.txt".to_string()));
}

#[test]
fn existing_destination_is_untouched() {
    let scratch = scratch_directory();
    let source = source_directory(scratch.path(), "world", &[("a.txt", "alpha")]);
    let destination = scratch.path().join("world.zip");
    fs::write(&destination, "someone else's file").unwrap();

    let error = ZipArchiver::default()
        .archive(&[source], Layout::Flat, &destination)
        .unwrap_err();

    assert!(matches!(error, ArchiveError::CreateOutput(_, _)));
    assert!(!error.created_output());
    assert_eq!(
        fs::read_to_string(&destination).unwrap(),
        "someone else's file"
    );
}

#[test]
fn missing_source() {
    let scratch = scratch_directory();
    let destination = scratch.path().join("world.zip");

    let error = ZipArchiver::default()
        .archive(&[scratch.path().join("missing")], Layout::Flat, &destination)
        .unwrap_err();

    assert!(matches!(error, ArchiveError::AccessSource(_, _)));
    assert!(!error.created_output());
    assert!(!destination.exists());
}

#[test]
fn file_source() {
    let scratch = scratch_directory();
    let file = scratch.path().join("file.txt");
    fs::write(&file, "not a directory").unwrap();
    let destination = scratch.path().join("world.zip");

    let error = ZipArchiver::default()
        .archive(&[file], Layout::Flat, &destination)
        .unwrap_err();

    assert!(matches!(error, ArchiveError::NotDirectory(_)));
    assert!(!destination.exists());
}

#[test]
fn no_directories() {
    let scratch = scratch_directory();
    let destination = scratch.path().join("world.zip");
    let directories: Vec<PathBuf> = Vec::new();

    let error = ZipArchiver::default()
        .archive(&directories, Layout::Nested, &destination)
        .unwrap_err();

    assert!(matches!(error, ArchiveError::NoDirectories));
}

#[test]
fn lower_compression_still_round_trips() {
    let scratch = scratch_directory();
    let contents = "block ".repeat(4096);
    let source = source_directory(scratch.path(), "world", &[("chunk.bin", &contents)]);
    let destination = scratch.path().join("fast.zip");

    let artifact = ZipArchiver::new(1)
        .archive(&[source], Layout::Flat, &destination)
        .unwrap();

    assert!(artifact.bytes < u64::try_from(contents.len()).unwrap());
    assert_eq!(read_archive(&destination)["chunk.bin"], contents.as_bytes());
}

#[test]
fn keeps_modification_time() {
    let scratch = scratch_directory();
    let source = source_directory(scratch.path(), "world", &[("level.dat", "overworld")]);
    let modified = Local
        .with_ymd_and_hms(2023, 6, 15, 12, 34, 56)
        .single()
        .unwrap();
    File::options()
        .write(true)
        .open(source.join("level.dat"))
        .unwrap()
        .set_modified(SystemTime::from(modified))
        .unwrap();
    let destination = scratch.path().join("world.zip");

    ZipArchiver::default()
        .archive(&[source], Layout::Flat, &destination)
        .unwrap();

    let mut archive = ZipArchive::new(File::open(&destination).unwrap()).unwrap();
    let entry = archive.by_name("level.dat").unwrap();
    let stored = entry.last_modified().unwrap();
    assert_eq!(
        (
            stored.year(),
            stored.month(),
            stored.day(),
            stored.hour(),
            stored.minute(),
            stored.second()
        ),
        (2023, 6, 15, 12, 34, 56)
    );
}

#[cfg(unix)]
#[test]
fn keeps_permissions() {
    let scratch = scratch_directory();
    let source = source_directory(scratch.path(), "world", &[("run.sh", "#!/bin/sh")]);
    fs::set_permissions(source.join("run.sh"), fs::Permissions::from_mode(0o750)).unwrap();
    let destination = scratch.path().join("world.zip");

    ZipArchiver::default()
        .archive(&[source], Layout::Flat, &destination)
        .unwrap();

    let mut archive = ZipArchive::new(File::open(&destination).unwrap()).unwrap();
    let mode = archive.by_name("run.sh").unwrap().unix_mode().unwrap();
    assert_eq!(mode & 0o777, 0o750);
}

#[cfg(unix)]
#[test]
fn stores_symlinks() {
    let scratch = scratch_directory();
    let source = source_directory(scratch.path(), "world", &[("a.txt", "alpha")]);
    symlink("a.txt", source.join("link.txt")).unwrap();
    let destination = scratch.path().join("world.zip");

    ZipArchiver::default()
        .archive(&[source], Layout::Flat, &destination)
        .unwrap();

    // The link is stored with its target as the contents, not the target's contents.
    let entries = read_archive(&destination);
    assert_eq!(entries["a.txt"], b"alpha");
    assert_eq!(entries["link.txt"], b"a.txt");

    let mut archive = ZipArchive::new(File::open(&destination).unwrap()).unwrap();
    let mode = archive.by_name("link.txt").unwrap().unix_mode().unwrap();
    assert_eq!(mode & 0o170_000, 0o120_000);
}
