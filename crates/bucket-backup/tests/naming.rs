//! Tests for artifact naming
//!

use bucket_backup::{
    label::ArtifactLabel,
    naming::{Timestamp, artifact_name, remote_key},
};
use chrono::{Local, TimeZone};

fn at(hour: u32, minute: u32, second: u32) -> Timestamp {
    let datetime = Local
        .with_ymd_and_hms(2024, 1, 5, hour, minute, second)
        .single()
        .unwrap();
    Timestamp::from_datetime(datetime)
}

#[test]
fn timestamp_is_zero_padded() {
    assert_eq!(at(7, 3, 9).as_str(), "2024-01-05_07-03-09");
}

#[test]
fn timestamps_sort_chronologically() {
    assert!(at(9, 59, 59) < at(10, 0, 0));
}

#[test]
fn now_has_fixed_width() {
    let timestamp = Timestamp::now();
    assert_eq!(timestamp.as_str().len(), "YYYY-MM-DD_HH-MM-SS".len());
    assert!(!timestamp.as_str().contains(['/', ':', ' ']));
}

#[test]
fn artifact_name_embeds_timestamp() {
    let label = ArtifactLabel::default();
    assert_eq!(
        artifact_name(&label, &at(7, 3, 9)),
        "backup_2024-01-05_07-03-09.zip"
    );
}

#[test]
fn remote_key_joins_once() {
    assert_eq!(remote_key("backups", "a.zip"), "backups/a.zip");
    assert_eq!(remote_key("a/b", "c.zip"), "a/b/c.zip");
}

#[test]
fn same_instant_different_labels_are_distinct() {
    let timestamp = at(12, 0, 0);
    let world = ArtifactLabel::try_from("world").unwrap();
    let nether = ArtifactLabel::try_from("world_nether").unwrap();

    assert_ne!(
        remote_key("backups", &artifact_name(&world, &timestamp)),
        remote_key("backups", &artifact_name(&nether, &timestamp))
    );
}

#[test]
fn one_second_apart_same_label_are_distinct() {
    let label = ArtifactLabel::try_from("world").unwrap();

    assert_ne!(
        remote_key("backups", &artifact_name(&label, &at(12, 0, 0))),
        remote_key("backups", &artifact_name(&label, &at(12, 0, 1)))
    );
}
