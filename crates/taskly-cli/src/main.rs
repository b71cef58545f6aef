mod logging;
mod menu;
mod render;
mod version;

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use serde_json::json;

use taskly_core::config::{load_config_or_default, resolve_taskly_home, TasklyConfig};
use taskly_core::heartbeat;
use taskly_core::inspect::{self, format_elapsed};
use taskly_core::process::{SystemProcesses, EXIT_MISSING_PROJECT};
use taskly_core::timeline::{now_millis, RepairOutcome, TimelineStore};
use taskly_core::todo::{NewTask, Priority, Status, TodoStore};
use taskly_core::tracker::Tracker;

#[derive(Parser)]
#[command(name = "taskly", version = version::FULL, about = "Todo list and background time tracker")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Manage the todo list (interactive menu when no action is given)
    Todo {
        #[command(subcommand)]
        action: Option<TodoAction>,
    },
    /// Track time spent on a project (interactive menu when no action is given)
    Track {
        #[command(subcommand)]
        action: Option<TrackAction>,
    },
    /// Print version information
    Version,
    /// Background ticker; spawned by `track start`, never run by hand
    #[command(hide = true)]
    Heartbeat { project: Option<String> },
}

#[derive(Subcommand)]
enum TodoAction {
    /// Add a task
    Add {
        task: String,
        #[arg(long, default_value = "medium")]
        priority: String,
        /// Deadline as "YYYY-MM-DD HH:mm"
        #[arg(long)]
        deadline: String,
        #[arg(long)]
        json: bool,
    },
    /// List all tasks
    List {
        #[arg(long)]
        json: bool,
    },
    /// Mark a task as done
    Done { id: u64 },
    /// Set a task's status (pending, in-progress, done)
    Status { id: u64, status: String },
    /// Change a task's priority (low, medium, high)
    Priority { id: u64, priority: String },
    /// Delete a task
    Delete { id: u64 },
    /// Fuzzy search over task, status, priority and deadline
    Search {
        query: String,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum TrackAction {
    /// Start tracking a project in the background
    Start { project: String },
    /// Stop the active session and append it to the log
    Stop {
        #[arg(long)]
        json: bool,
    },
    /// Show the active session
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Show completed sessions
    Log {
        #[arg(long)]
        json: bool,
    },
    /// Move a corrupt timeline.json aside and start from an empty one
    Repair,
}

pub struct App {
    home: PathBuf,
    config: TasklyConfig,
}

impl App {
    fn from_env() -> Result<Self> {
        let home = resolve_taskly_home()?;
        let config = load_config_or_default(&home);
        tracing::debug!(home = %home.display(), "Resolved taskly home");
        Ok(Self { home, config })
    }

    pub fn timeline(&self) -> TimelineStore {
        TimelineStore::new(&self.home)
    }

    pub fn todo(&self) -> TodoStore {
        TodoStore::new(&self.home)
    }

    pub fn tracker(&self) -> Result<Tracker<SystemProcesses>> {
        let processes = SystemProcesses::current(self.home.clone())
            .context("locate taskly executable")?;
        Ok(Tracker::new(self.timeline(), processes))
    }

    pub fn heartbeat_interval(&self) -> Duration {
        self.config.heartbeat_interval()
    }
}

fn main() {
    let cli = Cli::parse();

    if let Some(Command::Heartbeat { project }) = &cli.command {
        std::process::exit(run_heartbeat(project.as_deref()));
    }

    logging::init_cli();
    if let Err(err) = run(cli) {
        eprintln!("{}", render::error_message(&err));
        std::process::exit(1);
    }
}

fn run_heartbeat(project: Option<&str>) -> i32 {
    let Some(project) = project.map(str::trim).filter(|p| !p.is_empty()) else {
        eprintln!("taskly heartbeat: missing project name");
        return EXIT_MISSING_PROJECT;
    };
    let home = match resolve_taskly_home() {
        Ok(home) => home,
        Err(err) => {
            eprintln!("taskly heartbeat: {}", err);
            return 1;
        }
    };
    logging::init_heartbeat(&home);
    let interval = load_config_or_default(&home).heartbeat_interval();
    match heartbeat::run(&TimelineStore::new(&home), project, interval) {}
}

fn run(cli: Cli) -> Result<()> {
    let app = App::from_env()?;
    let mut prompt = menu::TerminalPrompt::new(io::stdin().lock(), io::stdout());

    match cli.command {
        None => menu::main_menu(&mut prompt, &app),
        Some(Command::Todo { action: None }) => menu::todo_menu(&mut prompt, &app),
        Some(Command::Track { action: None }) => menu::track_menu(&mut prompt, &app),
        Some(Command::Todo {
            action: Some(action),
        }) => run_todo(&app, action),
        Some(Command::Track {
            action: Some(action),
        }) => run_track(&app, action),
        Some(Command::Version) => {
            println!("taskly {}", version::FULL);
            Ok(())
        }
        Some(Command::Heartbeat { .. }) => unreachable!("handled before logging init"),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_todo(app: &App, action: TodoAction) -> Result<()> {
    let store = app.todo();
    match action {
        TodoAction::Add {
            task,
            priority,
            deadline,
            json,
        } => {
            let priority: Priority = priority.parse()?;
            let added = store.add(
                NewTask {
                    task,
                    priority,
                    last_day: deadline,
                },
                Local::now(),
            )?;
            if json {
                return print_json(&added);
            }
            println!(
                "Task \"{}\" added with {} priority! (id {})",
                added.task, added.priority, added.id
            );
        }
        TodoAction::List { json } => {
            let tasks = store.list()?;
            if json {
                return print_json(&tasks);
            }
            if tasks.is_empty() {
                println!("No tasks available");
            } else {
                println!("{}", render::tasks_table(&tasks));
            }
        }
        TodoAction::Done { id } => {
            let task = store.mark_done(id)?;
            println!("Task \"{}\" marked as done", task.task);
        }
        TodoAction::Status { id, status } => {
            let status: Status = status.parse()?;
            let task = store.set_status(id, status)?;
            println!("Task \"{}\" is now {}", task.task, task.status);
        }
        TodoAction::Priority { id, priority } => {
            let priority: Priority = priority.parse()?;
            let task = store.set_priority(id, priority)?;
            println!("{} priority has been updated to {}", task.task, task.priority);
        }
        TodoAction::Delete { id } => {
            let task = store.delete(id)?;
            println!(
                "{} with the Priority of ({}) has been deleted.",
                task.task, task.priority
            );
        }
        TodoAction::Search { query, json } => {
            let hits = store.search(&query)?;
            if json {
                let payload: Vec<_> = hits
                    .iter()
                    .map(|hit| json!({ "score": hit.score, "task": hit.item }))
                    .collect();
                return print_json(&payload);
            }
            if hits.is_empty() {
                println!("No matching tasks found.");
            } else {
                println!("{}", render::search_table(&hits));
            }
        }
    }
    Ok(())
}

fn run_track(app: &App, action: TrackAction) -> Result<()> {
    match action {
        TrackAction::Start { project } => {
            let handle = app.tracker()?.start(&project)?;
            println!("Tracking started for: {}", handle.project);
        }
        TrackAction::Stop { json } => {
            let outcome = app.tracker()?.stop()?;
            if json {
                return print_json(&outcome);
            }
            for line in render::stop_lines(&outcome) {
                println!("{}", line);
            }
        }
        TrackAction::Status { json } => {
            let view = inspect::status(&app.timeline())?;
            let now = now_millis();
            if json {
                let payload = match &view {
                    Some(view) => json!({
                        "active": view,
                        "elapsed_ms": view.elapsed_ms(now),
                        "elapsed": format_elapsed(view.elapsed_ms(now)),
                        "stale": !view.process_alive || view.is_stale(now, app.heartbeat_interval()),
                    }),
                    None => json!({ "active": null }),
                };
                return print_json(&payload);
            }
            match view {
                Some(view) => {
                    for line in render::status_lines(&view, now, app.heartbeat_interval()) {
                        println!("{}", line);
                    }
                }
                None => println!("No active tracking session."),
            }
        }
        TrackAction::Log { json } => {
            let log = inspect::history(&app.timeline())?;
            if json {
                return print_json(&log);
            }
            if log.is_empty() {
                println!("No logs found.");
            } else {
                println!("{}", render::log_table(&log));
            }
        }
        TrackAction::Repair => match app.timeline().repair()? {
            RepairOutcome::AlreadyValid => println!("Tracking state is valid; nothing to repair."),
            RepairOutcome::Reset { backup } => println!(
                "Tracking state was corrupt; moved it to {} and started fresh.",
                backup.display()
            ),
        },
    }
    Ok(())
}
