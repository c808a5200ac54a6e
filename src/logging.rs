use std::path::PathBuf;

use anyhow::Context;
use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, Naming};

use crate::config;

/// Start the process-wide log facade. Called exactly once, before the queue
/// connection or model load; after this the logger is never reconfigured.
///
/// Sink levels come from `config::logging`: the rotating file under the
/// user's home gets everything, stderr only mirrors warnings and errors.
pub fn init_logging() -> anyhow::Result<()> {
    let log_dir = worker_log_dir()?;

    Logger::try_with_str(config::logging::FILE_LOG_SPEC)?
        .log_to_file(FileSpec::default().directory(log_dir).basename(config::logging::LOG_FILE_NAME))
        .rotate(
            Criterion::Size(config::logging::LOG_ROTATE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(config::logging::LOG_ROTATE_KEEP_FILES),
        )
        .duplicate_to_stderr(config::logging::STDERR_MIRROR)
        .format(flexi_logger::detailed_format)
        .start()
        .context("failed to start logger")?;

    log::info!("{}", "=".repeat(60));
    log::info!("sent2vec worker starting");
    log::info!("Version: {}", config::WORKER_VERSION);
    log::info!("Platform: {}", std::env::consts::OS);
    log::info!("{}", "=".repeat(60));

    Ok(())
}

fn worker_log_dir() -> anyhow::Result<PathBuf> {
    let home = home_dir().context("cannot determine home directory for logs")?;
    let dir = home.join(config::logging::LOG_DIR_REL);
    std::fs::create_dir_all(&dir).with_context(|| format!("failed creating log dir {}", dir.display()))?;
    Ok(dir)
}

fn home_dir() -> Option<PathBuf> {
    if let Ok(v) = std::env::var("HOME") {
        if !v.is_empty() {
            return Some(PathBuf::from(v));
        }
    }
    // Windows fallback
    if let Ok(v) = std::env::var("USERPROFILE") {
        if !v.is_empty() {
            return Some(PathBuf::from(v));
        }
    }
    None
}
