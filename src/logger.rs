//! Opt-in operation logging.
//!
//! Runs are logged to a file only when `[logging] debug` is set in the
//! config. The log goes to /var/log/patchx.log when that is writable,
//! otherwise to ~/.patchx/patchx.log. A logging failure downgrades to a
//! warning so a broken log path never blocks a patch run.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

const SYSTEM_LOG: &str = "/var/log/patchx.log";

/// Set up file logging if enabled; returns the log path actually in use
pub fn init_debug_logging(debug_enabled: bool) -> Result<Option<PathBuf>> {
    if !debug_enabled {
        return Ok(None);
    }

    match open_log_file() {
        Ok((path, file)) => {
            let subscriber = registry()
                .with(
                    fmt::layer()
                        .with_writer(file)
                        .with_ansi(false)
                        .with_target(false)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false),
                )
                .with(EnvFilter::new("patchx=info"));

            tracing::subscriber::set_global_default(subscriber)
                .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))?;

            Ok(Some(path))
        }
        Err(e) => {
            eprintln!("Warning: debug logging disabled: {}", e);
            Ok(None)
        }
    }
}

/// Open the log file for appending, preferring the system location
fn open_log_file() -> Result<(PathBuf, File)> {
    let system_path = PathBuf::from(SYSTEM_LOG);
    if let Ok(file) = append_to(&system_path) {
        return Ok((system_path, file));
    }

    let home_path = home_log_path()?;
    if let Some(parent) = home_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }

    let file = append_to(&home_path)
        .with_context(|| format!("Failed to open log file: {}", home_path.display()))?;
    Ok((home_path, file))
}

fn append_to(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn home_log_path() -> Result<PathBuf> {
    let home_dir =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home_dir.join(".patchx").join("patchx.log"))
}
