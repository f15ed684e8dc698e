// src/log.rs
//
// tracing setup: an append-only debug log under the store directory, plus an
// optional stderr layer for the CLI. Timestamps are time since process start.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

use tracing_subscriber::fmt::{self, format::Writer, time::FormatTime};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::consts::LOG_ENV;

static START: OnceLock<Instant> = OnceLock::new();

fn start() -> Instant {
    *START.get_or_init(Instant::now)
}

fn fmt_elapsed(ms: u128) -> String {
    let total_ms = ms as u64;
    let h = total_ms / 3_600_000;
    let m = (total_ms % 3_600_000) / 60_000;
    let s = (total_ms % 60_000) / 1_000;
    let ms = total_ms % 1_000;
    format!("{h:02}:{m:02}:{s:02}.{ms:03}")
}

struct Elapsed;

impl FormatTime for Elapsed {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", fmt_elapsed(start().elapsed().as_millis()))
    }
}

/// Install the global subscriber. `GUILD_TRACKER_LOG` overrides the level
/// (default `info`, `debug` when `verbose`). A second call is a no-op.
pub fn init(log_path: &Path, verbose: bool, stderr: bool) -> io::Result<()> {
    start();

    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(log_path)?;

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_timer(Elapsed)
        .with_writer(Mutex::new(file));

    let stderr_layer = stderr.then(|| {
        fmt::layer()
            .with_target(false)
            .with_timer(Elapsed)
            .with_writer(io::stderr)
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init();
    Ok(())
}
