//! # Shared
//! The shared components between the backup binaries and their tests.
//!

#![warn(missing_docs)]

mod failure;
mod logger;

pub use failure::Failure;
pub use logger::{LoggerError, init_logger};
