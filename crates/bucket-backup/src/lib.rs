//! # bucket-backup
//! Archives a set of directories and uploads the archives to an object store bucket.
//!

pub mod archiver;
pub mod backup_set;
pub mod config;
pub mod context;
pub mod label;
pub mod naming;
pub mod orchestrator;
pub mod report;
pub mod store;
