//! # bucket-backup
//! Runs a single backup using `./config.toml`.
//!

use std::{fs, path::PathBuf, process::ExitCode};

use bucket_backup::{
    archiver::ZipArchiver,
    config::Config,
    orchestrator::{Orchestrator, RunError},
    report::Report,
    store::{MemoryStore, ObjectStore, S3Store},
};
use mimalloc::MiMalloc;
use shared::{Failure, init_logger};
use tracing::{error, info, warn};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> ExitCode {
    let _logger = init_logger().or_log_and_panic("Could not initialize logger");

    // Initialize config if args include 'init'.
    if std::env::args().any(|arg| arg.eq("init")) {
        let config = Config::default();
        let contents =
            toml::to_string_pretty(&config).or_log_and_panic("Could not serialize config file");
        fs::write("config.toml", contents).or_log_and_panic("Could not create config file");
        return ExitCode::SUCCESS;
    }

    // Load config
    let config =
        Config::load_toml(PathBuf::from("./config.toml")).or_log_and_panic("Could not load config");
    let report_file = config.report_file.clone();

    let result = if config.dry_run {
        warn!("Dry run, nothing will be uploaded and artifacts are kept locally");
        run(config, MemoryStore::new())
    } else {
        let store = S3Store::new(&config.store).or_log_and_panic("Could not create store client");
        run(config, store)
    };

    let report = match result {
        Ok(report) => report,
        Err(error) => {
            error!("Backup aborted: {error}");
            return ExitCode::FAILURE;
        }
    };

    for failure in report.failures() {
        error!("[{}] {:?}", failure.unit, failure.outcome);
    }
    info!("{report}");

    if let Some(report_file) = report_file {
        if let Err(error) = report.write_json(&report_file) {
            error!("Could not write report to {report_file:?}: {error}");
        }
    }

    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run<S: ObjectStore>(config: Config, store: S) -> Result<Report, RunError> {
    Orchestrator::new(config, ZipArchiver::default(), store).run()
}
