//! Interactive menus on top of a minimal prompt abstraction.

use std::io::{self, BufRead, Write};

use chrono::Local;
use taskly_core::inspect;
use taskly_core::timeline::now_millis;
use taskly_core::todo::{NewTask, Priority, Task, TodoError, DEADLINE_FORMAT};

use crate::render;
use crate::App;

/// "Pick one of N" plus free-text input. `None` means the input ended.
pub trait Prompt {
    fn select(&mut self, message: &str, options: &[&str]) -> io::Result<Option<usize>>;
    fn input(&mut self, message: &str) -> io::Result<Option<String>>;
}

pub struct TerminalPrompt<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

impl<R: BufRead, W: Write> Prompt for TerminalPrompt<R, W> {
    fn select(&mut self, message: &str, options: &[&str]) -> io::Result<Option<usize>> {
        loop {
            writeln!(self.writer, "{}", message)?;
            for (idx, option) in options.iter().enumerate() {
                writeln!(self.writer, "  {}) {}", idx + 1, option)?;
            }
            write!(self.writer, "> ")?;
            self.writer.flush()?;

            let Some(answer) = self.read_line()? else {
                return Ok(None);
            };
            if let Some(idx) = parse_choice(&answer, options) {
                return Ok(Some(idx));
            }
            writeln!(self.writer, "Invalid option, please try again.")?;
        }
    }

    fn input(&mut self, message: &str) -> io::Result<Option<String>> {
        write!(self.writer, "{} ", message)?;
        self.writer.flush()?;
        self.read_line()
    }
}

/// Accepts a 1-based number or the option text (case-insensitive).
fn parse_choice(answer: &str, options: &[&str]) -> Option<usize> {
    if let Ok(number) = answer.parse::<usize>() {
        return (1..=options.len()).contains(&number).then(|| number - 1);
    }
    options
        .iter()
        .position(|option| option.eq_ignore_ascii_case(answer))
}

fn report(result: anyhow::Result<()>) {
    if let Err(err) = result {
        println!("{}", render::error_message(&err));
    }
}

pub fn main_menu(prompt: &mut dyn Prompt, app: &App) -> anyhow::Result<()> {
    const CHOICES: [&str; 3] = ["todo", "Time tracking", "exit"];
    loop {
        match prompt.select("What do you want to do", &CHOICES)? {
            Some(0) => todo_menu(prompt, app)?,
            Some(1) => track_menu(prompt, app)?,
            _ => {
                println!("Goodbye");
                return Ok(());
            }
        }
    }
}

pub fn track_menu(prompt: &mut dyn Prompt, app: &App) -> anyhow::Result<()> {
    const CHOICES: [&str; 5] = [
        "Start Tracking",
        "Stop Tracking",
        "Check Status",
        "View Log",
        "Back",
    ];
    loop {
        match prompt.select("Choose an action:", &CHOICES)? {
            Some(0) => {
                let Some(project) = prompt.input("Enter project name:")? else {
                    return Ok(());
                };
                report(start_tracking(app, &project));
            }
            Some(1) => report(stop_tracking(app)),
            Some(2) => report(check_status(app)),
            Some(3) => report(show_log(app)),
            _ => return Ok(()),
        }
    }
}

fn start_tracking(app: &App, project: &str) -> anyhow::Result<()> {
    let handle = app.tracker()?.start(project)?;
    println!("Tracking started for: {}", handle.project);
    Ok(())
}

fn stop_tracking(app: &App) -> anyhow::Result<()> {
    let outcome = app.tracker()?.stop()?;
    for line in render::stop_lines(&outcome) {
        println!("{}", line);
    }
    Ok(())
}

fn check_status(app: &App) -> anyhow::Result<()> {
    match inspect::status(&app.timeline())? {
        Some(view) => {
            for line in render::status_lines(&view, now_millis(), app.heartbeat_interval()) {
                println!("{}", line);
            }
        }
        None => println!("No active tracking session."),
    }
    Ok(())
}

fn show_log(app: &App) -> anyhow::Result<()> {
    let log = inspect::history(&app.timeline())?;
    if log.is_empty() {
        println!("No logs found.");
    } else {
        println!("{}", render::log_table(&log));
    }
    Ok(())
}

pub fn todo_menu(prompt: &mut dyn Prompt, app: &App) -> anyhow::Result<()> {
    const CHOICES: [&str; 7] = [
        "Add a Task",
        "List Tasks",
        "Mark As Done",
        "Delete Tasks",
        "Priority Tasks",
        "Search And Filters",
        "exit",
    ];
    loop {
        let result = match prompt.select("Todo Options", &CHOICES)? {
            Some(0) => add_task(prompt, app),
            Some(1) => list_tasks(app),
            Some(2) => mark_done(prompt, app),
            Some(3) => delete_task(prompt, app),
            Some(4) => change_priority(prompt, app),
            Some(5) => search_tasks(prompt, app),
            _ => return Ok(()),
        };
        report(result);
    }
}

fn select_priority(prompt: &mut dyn Prompt, message: &str) -> io::Result<Option<Priority>> {
    let names: Vec<&str> = Priority::ALL.iter().map(|p| p.as_str()).collect();
    Ok(prompt.select(message, &names)?.map(|idx| Priority::ALL[idx]))
}

fn select_task(prompt: &mut dyn Prompt, message: &str, tasks: &[Task]) -> io::Result<Option<u64>> {
    let labels: Vec<String> = tasks
        .iter()
        .map(|task| format!("{} ({}, {})", task.task, task.status, task.priority))
        .collect();
    let options: Vec<&str> = labels.iter().map(String::as_str).collect();
    Ok(prompt.select(message, &options)?.map(|idx| tasks[idx].id))
}

fn add_task(prompt: &mut dyn Prompt, app: &App) -> anyhow::Result<()> {
    let Some(text) = prompt.input("Enter a new task:")? else {
        return Ok(());
    };
    let Some(priority) = select_priority(prompt, "Select Priority:")? else {
        return Ok(());
    };
    let store = app.todo();
    loop {
        let now = Local::now();
        let message = format!(
            "Enter the deadline (YYYY-MM-DD HH:mm) (Now: {}):",
            now.format(DEADLINE_FORMAT)
        );
        let Some(deadline) = prompt.input(&message)? else {
            return Ok(());
        };
        let new_task = NewTask {
            task: text.clone(),
            priority,
            last_day: deadline,
        };
        match store.add(new_task, now) {
            Ok(task) => {
                println!("Task \"{}\" added with {} priority!", task.task, task.priority);
                return Ok(());
            }
            Err(err @ (TodoError::InvalidDeadline(_) | TodoError::DeadlineInPast(_))) => {
                println!("{}", err)
            }
            Err(err) => return Err(err.into()),
        }
    }
}

fn list_tasks(app: &App) -> anyhow::Result<()> {
    let tasks = app.todo().list()?;
    if tasks.is_empty() {
        println!("No tasks available");
    } else {
        println!("{}", render::tasks_table(&tasks));
    }
    Ok(())
}

fn mark_done(prompt: &mut dyn Prompt, app: &App) -> anyhow::Result<()> {
    let store = app.todo();
    let tasks = store.list()?;
    if tasks.is_empty() {
        println!("No tasks Available to Mark As Done");
        return Ok(());
    }
    if let Some(id) = select_task(prompt, "Select Task to mark As done", &tasks)? {
        let task = store.mark_done(id)?;
        println!("Task \"{}\" marked as done", task.task);
    }
    Ok(())
}

fn delete_task(prompt: &mut dyn Prompt, app: &App) -> anyhow::Result<()> {
    let store = app.todo();
    let tasks = store.list()?;
    if tasks.is_empty() {
        println!("No tasks available for deletion.");
        return Ok(());
    }
    if let Some(id) = select_task(prompt, "Select a task to delete", &tasks)? {
        let task = store.delete(id)?;
        println!("{} with the Priority of ({}) has been deleted.", task.task, task.priority);
    }
    Ok(())
}

fn change_priority(prompt: &mut dyn Prompt, app: &App) -> anyhow::Result<()> {
    let store = app.todo();
    let tasks = store.list()?;
    if tasks.is_empty() {
        println!("No task Available");
        return Ok(());
    }
    let Some(id) = select_task(prompt, "Select a task to change the Priority", &tasks)? else {
        return Ok(());
    };
    let Some(priority) = select_priority(prompt, "Select Priority for The Task")? else {
        return Ok(());
    };
    let task = store.set_priority(id, priority)?;
    println!("{} priority has been updated to {}", task.task, task.priority);
    Ok(())
}

fn search_tasks(prompt: &mut dyn Prompt, app: &App) -> anyhow::Result<()> {
    let store = app.todo();
    if store.list()?.is_empty() {
        println!("No tasks available");
        return Ok(());
    }
    let Some(query) = prompt.input("Search your tasks :")? else {
        return Ok(());
    };
    let hits = store.search(&query)?;
    if hits.is_empty() {
        println!("No matching tasks found.");
    } else {
        println!("{}", render::search_table(&hits));
    }
    Ok(())
}
