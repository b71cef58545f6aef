//! Plain-text rendering for listings and user-facing messages.

use std::time::Duration;

use taskly_core::inspect::{format_elapsed, format_local_time, ActiveSessionView};
use taskly_core::search::Ranked;
use taskly_core::timeline::{CompletedSession, TimelineError};
use taskly_core::todo::{Task, TodoError};
use taskly_core::tracker::{StopOutcome, StopWarning};

pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(idx) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let render_row = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![render_row(headers.to_vec())];
    lines.push(
        widths
            .iter()
            .map(|width| "-".repeat(*width))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in rows {
        lines.push(render_row(row.iter().map(String::as_str).collect()));
    }
    lines.join("\n")
}

pub fn tasks_table(tasks: &[Task]) -> String {
    let rows: Vec<Vec<String>> = tasks
        .iter()
        .map(|task| {
            vec![
                task.id.to_string(),
                task.task.clone(),
                task.status.to_string(),
                task.priority.to_string(),
                task.last_day.clone(),
            ]
        })
        .collect();
    table(&["ID", "TASK", "STATUS", "PRIORITY", "DEADLINE"], &rows)
}

pub fn search_table(hits: &[Ranked<Task>]) -> String {
    let tasks: Vec<Task> = hits.iter().map(|hit| hit.item.clone()).collect();
    tasks_table(&tasks)
}

pub fn log_table(log: &[CompletedSession]) -> String {
    let rows: Vec<Vec<String>> = log
        .iter()
        .map(|entry| {
            vec![
                entry.project.clone(),
                format_local_time(entry.start_time, "%Y-%m-%d %H:%M:%S"),
                format_local_time(entry.end_time, "%Y-%m-%d %H:%M:%S"),
                entry.duration.clone(),
            ]
        })
        .collect();
    table(&["PROJECT", "START", "END", "DURATION"], &rows)
}

pub fn status_lines(view: &ActiveSessionView, now: i64, interval: Duration) -> Vec<String> {
    let mut lines = vec![format!(
        "Tracking: {} (since {}, elapsed {})",
        view.project,
        format_local_time(view.start_time, "%H:%M:%S"),
        format_elapsed(view.elapsed_ms(now))
    )];
    if !view.process_alive {
        lines.push(format!(
            "Warning: heartbeat process {} is not running; run `taskly track stop` to finalize.",
            view.pid
        ));
    } else if view.is_stale(now, interval) {
        lines.push(format!(
            "Warning: no heartbeat from process {} recently; run `taskly track stop` to finalize.",
            view.pid
        ));
    }
    lines
}

pub fn stop_lines(outcome: &StopOutcome) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(StopWarning::ProcessNotFound { pid }) = &outcome.warning {
        lines.push(format!(
            "Warning: Process {} not found. It may have already stopped.",
            pid
        ));
    }
    lines.push(format!(
        "Tracking stopped. Duration: {}",
        outcome.session.duration
    ));
    lines
}

pub fn error_message(err: &anyhow::Error) -> String {
    if let Some(timeline) = err.downcast_ref::<TimelineError>() {
        return match timeline {
            TimelineError::CorruptState { .. } => format!(
                "{}\nRun `taskly track repair` to move it aside and start fresh.",
                timeline
            ),
            other => other.to_string(),
        };
    }
    if let Some(todo) = err.downcast_ref::<TodoError>() {
        return todo.to_string();
    }
    format!("{:#}", err)
}
