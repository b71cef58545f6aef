//! Tracing setup for the two process kinds.
//!
//! The interactive CLI logs to stderr (quiet by default). The heartbeat has no
//! terminal, so it appends to `<home>/heartbeat.log`.

use std::env;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

/// Heartbeat log is truncated on launch once it grows past this.
const MAX_HEARTBEAT_LOG_SIZE: u64 = 1024 * 1024;

fn debug_forced() -> bool {
    env::var("TASKLY_DEBUG_LOG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false)
}

fn filter(default_level: &str) -> EnvFilter {
    if debug_forced() {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("TASKLY_LOG").unwrap_or_else(|_| EnvFilter::new(default_level))
    }
}

pub fn init_cli() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter("warn"))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn heartbeat_log_path(home: &Path) -> PathBuf {
    home.join("heartbeat.log")
}

pub fn init_heartbeat(home: &Path) {
    let path = heartbeat_log_path(home);
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let oversized = fs::metadata(&path)
        .map(|meta| meta.len() > MAX_HEARTBEAT_LOG_SIZE)
        .unwrap_or(false);
    let file = OpenOptions::new()
        .create(true)
        .append(!oversized)
        .write(true)
        .truncate(oversized)
        .open(&path);
    let Ok(file) = file else {
        return;
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter("info"))
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
}
