//! Body of the detached heartbeat process.
//!
//! ## Lifecycle
//!
//! 1. Spawned by `Tracker::start` as `taskly heartbeat <project>`
//! 2. Every interval: stamp `active.lastUpdate` if the active session is ours
//! 3. Runs until `Tracker::stop` sends SIGTERM
//!
//! The tracker already wrote `active` (with our pid) before the first tick, so the
//! heartbeat never writes anything but `lastUpdate`.

use std::convert::Infallible;
use std::thread;
use std::time::Duration;

use crate::timeline::{now_millis, TimelineError, TimelineStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Updated,
    /// `active` is cleared; nothing to stamp.
    Idle,
    /// `active` belongs to another heartbeat.
    Foreign { owner: u32 },
}

/// One heartbeat: stamp `lastUpdate` on the active session if it is owned by `own_pid`.
pub fn tick(store: &TimelineStore, own_pid: u32, now: i64) -> Result<TickOutcome, TimelineError> {
    let _guard = store.lock()?;
    let mut state = store.load()?;
    let outcome = match state.active.as_mut() {
        None => TickOutcome::Idle,
        Some(active) if active.pid != own_pid => TickOutcome::Foreign { owner: active.pid },
        Some(active) => {
            active.last_update = Some(now);
            TickOutcome::Updated
        }
    };
    if outcome == TickOutcome::Updated {
        store.save(&state)?;
    }
    Ok(outcome)
}

/// Tick forever. Only process termination ends this loop; failed ticks are logged.
pub fn run(store: &TimelineStore, project: &str, interval: Duration) -> Infallible {
    let own_pid = std::process::id();
    tracing::info!(project, pid = own_pid, interval_secs = interval.as_secs(), "Heartbeat running");
    loop {
        thread::sleep(interval);
        match tick(store, own_pid, now_millis()) {
            Ok(TickOutcome::Updated) => tracing::trace!(project, "Heartbeat stamped"),
            Ok(TickOutcome::Idle) => tracing::debug!(project, "No active session; waiting for stop"),
            Ok(TickOutcome::Foreign { owner }) => {
                tracing::debug!(project, owner, "Active session owned by another heartbeat")
            }
            Err(err) => tracing::warn!(project, error = %err, "Heartbeat tick failed"),
        }
    }
}
