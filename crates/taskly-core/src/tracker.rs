//! Starting and stopping tracking sessions.
//!
//! The tracker is the single writer of `active`: `start` records the session after
//! spawning its heartbeat, `stop` signals the heartbeat and moves the session into the
//! log. Both run their whole read-modify-write while holding the timeline lock, so a
//! heartbeat tick can never interleave with them.

use std::io;

use serde::Serialize;

use crate::process::{ProcessControl, Termination};
use crate::timeline::{now_millis, CompletedSession, Session, TimelineError, TimelineStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionHandle {
    pub project: String,
    pub start_time: i64,
    pub pid: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StopWarning {
    /// The heartbeat was already gone; the session was finalized anyway.
    ProcessNotFound { pid: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StopOutcome {
    pub session: CompletedSession,
    pub warning: Option<StopWarning>,
}

pub struct Tracker<P> {
    store: TimelineStore,
    processes: P,
}

impl<P: ProcessControl> Tracker<P> {
    pub fn new(store: TimelineStore, processes: P) -> Self {
        Self { store, processes }
    }

    pub fn start(&self, project: &str) -> Result<SessionHandle, TimelineError> {
        let project = project.trim();
        if project.is_empty() {
            return Err(TimelineError::EmptyProject);
        }

        let _guard = self.store.lock()?;
        let mut state = self.store.load()?;
        if let Some(active) = &state.active {
            return Err(TimelineError::AlreadyTracking {
                existing: active.project.clone(),
            });
        }

        let pid = self
            .processes
            .spawn_heartbeat(project)
            .map_err(TimelineError::Spawn)?;
        let session = Session {
            project: project.to_string(),
            start_time: now_millis(),
            pid,
            last_update: None,
        };
        state.active = Some(session.clone());

        if let Err(err) = self.store.save(&state) {
            // Nothing records this heartbeat; do not leave it running.
            if let Err(kill_err) = self.processes.terminate(pid) {
                tracing::warn!(pid, error = %kill_err, "Failed to reap heartbeat after failed save");
            }
            return Err(err);
        }

        tracing::info!(project = %session.project, pid, "Tracking started");
        Ok(SessionHandle {
            project: session.project,
            start_time: session.start_time,
            pid,
        })
    }

    pub fn stop(&self) -> Result<StopOutcome, TimelineError> {
        let _guard = self.store.lock()?;
        let mut state = self.store.load()?;
        let Some(active) = state.active.clone() else {
            return Err(TimelineError::NotTracking);
        };

        let warning = match self.processes.terminate(active.pid) {
            Ok(Termination::Signalled) => None,
            Ok(Termination::AlreadyGone) => {
                tracing::warn!(pid = active.pid, "Tracking process not found; it may have already stopped");
                Some(StopWarning::ProcessNotFound { pid: active.pid })
            }
            Err(source) => return Err(termination_error(active.pid, source)),
        };

        let end_time = match (&warning, active.last_update) {
            // A dead heartbeat stopped counting at its last tick.
            (Some(StopWarning::ProcessNotFound { .. }), Some(last_update)) => last_update,
            _ => now_millis(),
        };
        let completed = CompletedSession::finish(&active, end_time.max(active.start_time));
        state.log.push(completed.clone());
        state.active = None;
        self.store.save(&state)?;

        tracing::info!(project = %completed.project, duration = %completed.duration, "Tracking stopped");
        Ok(StopOutcome {
            session: completed,
            warning,
        })
    }
}

fn termination_error(pid: u32, source: io::Error) -> TimelineError {
    TimelineError::ProcessTermination { pid, source }
}
