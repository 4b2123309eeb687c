// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rotating file logging plus stderr, grounded in the teacher's
//! `daemon/src/main.rs::{setup_logging, rotate_log_if_needed}`.

use crate::error::DaemonError;
use std::path::Path;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep (agent.log.1, .2, .3).
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate `log_path` if it exceeds [`MAX_LOG_SIZE`]. Best-effort: rotation
/// failures are silently ignored so the agent still starts.
pub fn rotate_log_if_needed(log_path: &Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

/// Install a `tracing` subscriber writing to both `log_path` (non-blocking,
/// rotated at startup) and stderr. Returns the worker guard, which must be
/// held for the life of the process or buffered log lines are dropped.
pub fn setup(
    log_path: &Path,
    debug: bool,
    extra_debug: bool,
) -> Result<tracing_appender::non_blocking::WorkerGuard, DaemonError> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_appender::rolling::never(
        log_path.parent().ok_or_else(|| {
            DaemonError::InvalidConfig("log path has no parent directory".to_string())
        })?,
        log_path.file_name().ok_or_else(|| {
            DaemonError::InvalidConfig("log path has no file name".to_string())
        })?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if extra_debug || debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(guard)
}
