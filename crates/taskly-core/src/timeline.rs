use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lock::StateLock;
use crate::storage::{init_if_missing, write_atomic};

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("Already tracking: {existing}")]
    AlreadyTracking { existing: String },
    #[error("No active tracking session.")]
    NotTracking,
    #[error("Project name must not be empty")]
    EmptyProject,
    #[error("Failed to stop tracking process {pid}: {source}")]
    ProcessTermination {
        pid: u32,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to start tracking process: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("Tracking state at {path} is corrupt: {source}")]
    CorruptState {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to lock tracking state {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Tracking state IO error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize tracking state: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub project: String,
    /// Milliseconds since the Unix epoch.
    pub start_time: i64,
    pub pid: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<i64>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompletedSession {
    pub project: String,
    pub start_time: i64,
    pub end_time: i64,
    /// Seconds with two decimals, e.g. `"12.34 sec"`.
    pub duration: String,
}

impl CompletedSession {
    pub fn finish(session: &Session, end_time: i64) -> Self {
        Self {
            project: session.project.clone(),
            start_time: session.start_time,
            end_time,
            duration: format_duration_secs(end_time - session.start_time),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct TrackingState {
    pub active: Option<Session>,
    #[serde(default)]
    pub log: Vec<CompletedSession>,
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn format_duration_secs(duration_ms: i64) -> String {
    format!("{:.2} sec", duration_ms.max(0) as f64 / 1000.0)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairOutcome {
    AlreadyValid,
    Reset { backup: PathBuf },
}

/// Reads and writes `timeline.json`; the only code that touches that file.
#[derive(Debug, Clone)]
pub struct TimelineStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl TimelineStore {
    pub fn new(home: &Path) -> Self {
        Self {
            path: timeline_path(home),
            lock_path: home.join("timeline.lock"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock(&self) -> Result<StateLock, TimelineError> {
        StateLock::acquire(&self.lock_path).map_err(|source| TimelineError::Lock {
            path: self.lock_path.clone(),
            source,
        })
    }

    pub fn load(&self) -> Result<TrackingState, TimelineError> {
        let created = init_if_missing(&self.path, &default_document()?).map_err(|source| {
            TimelineError::Io {
                context: format!("create {}", self.path.display()),
                source,
            }
        })?;
        if created {
            tracing::debug!(path = %self.path.display(), "Created default tracking state");
        }
        let raw = fs::read_to_string(&self.path).map_err(|source| TimelineError::Io {
            context: format!("read {}", self.path.display()),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| TimelineError::CorruptState {
            path: self.path.clone(),
            source,
        })
    }

    pub fn save(&self, state: &TrackingState) -> Result<(), TimelineError> {
        let raw = serde_json::to_string_pretty(state)?;
        write_atomic(&self.path, raw.as_bytes()).map_err(|source| TimelineError::Io {
            context: format!("write {}", self.path.display()),
            source,
        })
    }

    /// Move a corrupt document aside and start over from the default one.
    pub fn repair(&self) -> Result<RepairOutcome, TimelineError> {
        let _guard = self.lock()?;
        match self.load() {
            Ok(_) => Ok(RepairOutcome::AlreadyValid),
            Err(TimelineError::CorruptState { .. }) => {
                let backup = self
                    .path
                    .with_file_name(format!("timeline.json.corrupt-{}", now_millis()));
                fs::rename(&self.path, &backup).map_err(|source| TimelineError::Io {
                    context: format!("move {} aside", self.path.display()),
                    source,
                })?;
                self.save(&TrackingState::default())?;
                tracing::warn!(backup = %backup.display(), "Reset corrupt tracking state");
                Ok(RepairOutcome::Reset { backup })
            }
            Err(err) => Err(err),
        }
    }
}

pub fn timeline_path(home: &Path) -> PathBuf {
    home.join("timeline.json")
}

fn default_document() -> Result<Vec<u8>, TimelineError> {
    Ok(serde_json::to_string_pretty(&TrackingState::default())?.into_bytes())
}
