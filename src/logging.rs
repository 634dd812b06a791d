//! Tracing subscriber setup.
//!
//! The dialog owns the terminal, so log output goes to a file. The path is
//! `--log-file`, else `$DCHOOSE_LOG_FILE`, else `<cache dir>/dchoose/dchoose.log`.
//! Filtering comes from `$DCHOOSE_LOG` or `$RUST_LOG`, defaulting to `info`.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::Result;

const LOG_ENV: &str = "DCHOOSE_LOG";
const LOG_FILE_ENV: &str = "DCHOOSE_LOG_FILE";
const DEFAULT_FILTER: &str = "info";

/// Resolve the log file path: explicit path, environment, then cache dir.
pub fn resolve_log_file_path(cli_file: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = cli_file.filter(|p| !p.as_os_str().is_empty()) {
        return Some(p.to_path_buf());
    }
    if let Some(p) = std::env::var_os(LOG_FILE_ENV).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(p));
    }
    dirs::cache_dir().map(|dir| dir.join("dchoose").join("dchoose.log"))
}

fn env_filter() -> EnvFilter {
    let directives = std::env::var(LOG_ENV)
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| DEFAULT_FILTER.to_string());
    EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Build a subscriber writing to `log_file`.
pub fn build_subscriber(log_file: File) -> impl tracing::Subscriber + Send + Sync {
    let fmt_layer = fmt::layer()
        .with_writer(Arc::new(log_file))
        .with_ansi(false)
        .with_target(false);
    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter())
}

/// Install the global subscriber. Returns the log file in use.
pub fn init(log_file_path: &Path) -> Result<PathBuf> {
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::options()
        .create(true)
        .append(true)
        .open(log_file_path)?;
    build_subscriber(file).init();
    Ok(log_file_path.to_path_buf())
}
