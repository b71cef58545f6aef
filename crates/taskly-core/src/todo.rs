use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::search::{rank, Ranked};
use crate::storage::{init_if_missing, write_atomic};

pub const DEADLINE_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Error)]
pub enum TodoError {
    #[error("Task store IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Task store at {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to serialize tasks: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Task description must not be empty")]
    EmptyTask,
    #[error("Enter a valid datetime in YYYY-MM-DD HH:mm format (got {0:?})")]
    InvalidDeadline(String),
    #[error("Deadline cannot be in the past: {0}")]
    DeadlineInPast(String),
    #[error("Unknown priority {0:?} (expected low, medium or high)")]
    InvalidPriority(String),
    #[error("Unknown status {0:?} (expected pending, in-progress or done)")]
    InvalidStatus(String),
    #[error("Task not found: {0}")]
    TaskNotFound(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = TodoError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(TodoError::InvalidPriority(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Pending,
    InProgress,
    Done,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::InProgress => "in-progress",
            Status::Done => "done",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = TodoError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "pending" => Ok(Status::Pending),
            "in-progress" | "in progress" => Ok(Status::InProgress),
            "done" => Ok(Status::Done),
            other => Err(TodoError::InvalidStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: u64,
    /// Creation time, milliseconds since the Unix epoch.
    pub time: i64,
    pub task: String,
    pub status: Status,
    pub priority: Priority,
    /// Deadline in `YYYY-MM-DD HH:mm`, local time.
    pub last_day: String,
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub task: String,
    pub priority: Priority,
    pub last_day: String,
}

/// Parse and check a `YYYY-MM-DD HH:mm` deadline against `now`.
pub fn validate_deadline(input: &str, now: DateTime<Local>) -> Result<DateTime<Local>, TodoError> {
    let trimmed = input.trim();
    let re = Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}$").expect("regex");
    if !re.is_match(trimmed) {
        return Err(TodoError::InvalidDeadline(trimmed.to_string()));
    }
    let naive = NaiveDateTime::parse_from_str(trimmed, DEADLINE_FORMAT)
        .map_err(|_| TodoError::InvalidDeadline(trimmed.to_string()))?;
    let deadline = Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| TodoError::InvalidDeadline(trimmed.to_string()))?;
    if deadline < now {
        return Err(TodoError::DeadlineInPast(trimmed.to_string()));
    }
    Ok(deadline)
}

pub fn next_task_id(tasks: &[Task]) -> u64 {
    tasks.iter().map(|task| task.id).max().unwrap_or(0) + 1
}

pub fn task_path(home: &Path) -> PathBuf {
    home.join("task.json")
}

/// Keyed operations over the `task.json` array.
#[derive(Debug, Clone)]
pub struct TodoStore {
    path: PathBuf,
}

impl TodoStore {
    pub fn new(home: &Path) -> Self {
        Self {
            path: task_path(home),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<Task>, TodoError> {
        init_if_missing(&self.path, b"[]")?;
        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&raw).map_err(|source| TodoError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    pub fn save(&self, tasks: &[Task]) -> Result<(), TodoError> {
        let raw = serde_json::to_string_pretty(tasks)?;
        write_atomic(&self.path, raw.as_bytes())?;
        Ok(())
    }

    pub fn add(&self, new_task: NewTask, now: DateTime<Local>) -> Result<Task, TodoError> {
        let description = new_task.task.trim();
        if description.is_empty() {
            return Err(TodoError::EmptyTask);
        }
        validate_deadline(&new_task.last_day, now)?;

        let mut tasks = self.load()?;
        let task = Task {
            id: next_task_id(&tasks),
            time: now.timestamp_millis(),
            task: description.to_string(),
            status: Status::Pending,
            priority: new_task.priority,
            last_day: new_task.last_day.trim().to_string(),
        };
        tasks.push(task.clone());
        self.save(&tasks)?;
        tracing::debug!(id = task.id, "Task added");
        Ok(task)
    }

    pub fn list(&self) -> Result<Vec<Task>, TodoError> {
        self.load()
    }

    pub fn set_status(&self, id: u64, status: Status) -> Result<Task, TodoError> {
        self.update(id, |task| task.status = status)
    }

    pub fn mark_done(&self, id: u64) -> Result<Task, TodoError> {
        self.set_status(id, Status::Done)
    }

    pub fn set_priority(&self, id: u64, priority: Priority) -> Result<Task, TodoError> {
        self.update(id, |task| task.priority = priority)
    }

    pub fn delete(&self, id: u64) -> Result<Task, TodoError> {
        let mut tasks = self.load()?;
        let idx = tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or(TodoError::TaskNotFound(id))?;
        let removed = tasks.remove(idx);
        self.save(&tasks)?;
        Ok(removed)
    }

    pub fn search(&self, query: &str) -> Result<Vec<Ranked<Task>>, TodoError> {
        let tasks = self.load()?;
        Ok(rank(tasks, query, |task| {
            vec![
                task.task.clone(),
                task.status.to_string(),
                task.priority.to_string(),
                task.last_day.clone(),
            ]
        }))
    }

    fn update<F>(&self, id: u64, apply: F) -> Result<Task, TodoError>
    where
        F: FnOnce(&mut Task),
    {
        let mut tasks = self.load()?;
        let task = tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or(TodoError::TaskNotFound(id))?;
        apply(task);
        let updated = task.clone();
        self.save(&tasks)?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(text: &str) -> DateTime<Local> {
        let naive = NaiveDateTime::parse_from_str(text, DEADLINE_FORMAT).unwrap();
        Local.from_local_datetime(&naive).earliest().unwrap()
    }

    #[test]
    fn deadline_format_is_strict() {
        let now = at("2026-01-01 09:00");
        assert!(validate_deadline("2026-01-02 10:00", now).is_ok());
        assert!(matches!(
            validate_deadline("2026-1-2 10:00", now),
            Err(TodoError::InvalidDeadline(_))
        ));
        assert!(matches!(
            validate_deadline("2026-02-30 10:00", now),
            Err(TodoError::InvalidDeadline(_))
        ));
        assert!(matches!(
            validate_deadline("2025-12-31 23:59", now),
            Err(TodoError::DeadlineInPast(_))
        ));
    }

    #[test]
    fn priority_and_status_parse_loosely() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!("in progress".parse::<Status>().unwrap(), Status::InProgress);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn status_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_value(Status::InProgress).unwrap(),
            serde_json::json!("in-progress")
        );
    }
}
