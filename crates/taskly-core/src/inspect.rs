//! Read-only queries over the tracking state.

use std::time::Duration;

use chrono::{Local, TimeZone};
use serde::Serialize;

use crate::process::is_heartbeat_process;
use crate::timeline::{CompletedSession, TimelineError, TimelineStore};

/// Heartbeats older than this many intervals count as stale.
const STALE_AFTER_INTERVALS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSessionView {
    pub project: String,
    pub start_time: i64,
    pub pid: u32,
    pub last_update: Option<i64>,
    /// Whether the recorded pid is still a running heartbeat.
    pub process_alive: bool,
}

impl ActiveSessionView {
    pub fn elapsed_ms(&self, now: i64) -> i64 {
        (now - self.start_time).max(0)
    }

    /// True when the heartbeat has not ticked for several intervals.
    pub fn is_stale(&self, now: i64, interval: Duration) -> bool {
        let last_seen = self.last_update.unwrap_or(self.start_time);
        let limit = (interval * STALE_AFTER_INTERVALS).as_millis() as i64;
        now - last_seen > limit
    }
}

pub fn status(store: &TimelineStore) -> Result<Option<ActiveSessionView>, TimelineError> {
    let state = store.load()?;
    Ok(state.active.map(|active| ActiveSessionView {
        project: active.project,
        start_time: active.start_time,
        pid: active.pid,
        last_update: active.last_update,
        process_alive: is_heartbeat_process(active.pid),
    }))
}

pub fn history(store: &TimelineStore) -> Result<Vec<CompletedSession>, TimelineError> {
    Ok(store.load()?.log)
}

/// `1h 02m 03s`, `4m 05s`, `7s`.
pub fn format_elapsed(elapsed_ms: i64) -> String {
    let total = elapsed_ms.max(0) / 1000;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Local wall-clock rendering of a millisecond timestamp.
pub fn format_local_time(ms: i64, pattern: &str) -> String {
    match Local.timestamp_millis_opt(ms).single() {
        Some(time) => time.format(pattern).to_string(),
        None => ms.to_string(),
    }
}
