//! OS process plumbing for the background heartbeat.
//!
//! The heartbeat runs as its own process (`taskly heartbeat <project>`) so it keeps
//! ticking after the CLI that started it has exited. It is spawned with null stdio in
//! a fresh process group. A detached waiter thread reaps it, so a long-lived parent
//! (the interactive menu) never keeps a stopped heartbeat around as a zombie.
//!
//! A recorded pid is only trusted while it still runs `taskly heartbeat`: after a
//! reboot or crash the number may belong to an unrelated process.

use std::io;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;

use sysinfo::{Pid, ProcessRefreshKind, ProcessStatus, System, UpdateKind};

/// Hidden subcommand the heartbeat process is launched with.
pub const HEARTBEAT_SUBCOMMAND: &str = "heartbeat";

/// Exit code of the heartbeat entry point when no project was given.
pub const EXIT_MISSING_PROJECT: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The signal was delivered.
    Signalled,
    /// No process with that pid exists anymore.
    AlreadyGone,
}

/// Seam between the supervisor and the operating system.
pub trait ProcessControl {
    /// Launch a detached heartbeat for `project` and return its pid.
    fn spawn_heartbeat(&self, project: &str) -> io::Result<u32>;

    /// Ask `pid` to terminate. A missing process is `Ok(AlreadyGone)`.
    fn terminate(&self, pid: u32) -> io::Result<Termination>;
}

/// Real processes: re-executes `exe` with the hidden heartbeat subcommand.
#[derive(Debug, Clone)]
pub struct SystemProcesses {
    exe: PathBuf,
    home: PathBuf,
}

impl SystemProcesses {
    pub fn new(exe: PathBuf, home: PathBuf) -> Self {
        Self { exe, home }
    }

    /// Uses the currently running executable.
    pub fn current(home: PathBuf) -> io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?, home))
    }

    fn heartbeat_command(&self, project: &str) -> Command {
        let mut cmd = Command::new(&self.exe);
        cmd.arg(HEARTBEAT_SUBCOMMAND)
            .arg(project)
            .env("TASKLY_HOME", &self.home)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // Own process group: Ctrl-C in the launching terminal must not reach it.
            cmd.process_group(0);
        }
        cmd
    }
}

impl ProcessControl for SystemProcesses {
    fn spawn_heartbeat(&self, project: &str) -> io::Result<u32> {
        let mut child = self.heartbeat_command(project).spawn()?;
        let pid = child.id();
        tracing::debug!(pid, exe = %self.exe.display(), "Spawned heartbeat process");
        let reaper = thread::Builder::new()
            .name(format!("heartbeat-reaper-{pid}"))
            .spawn(move || {
                let _ = child.wait();
            });
        if let Err(err) = reaper {
            tracing::warn!(pid, error = %err, "Could not start heartbeat reaper");
        }
        Ok(pid)
    }

    fn terminate(&self, pid: u32) -> io::Result<Termination> {
        if !is_heartbeat_process(pid) {
            tracing::debug!(pid, "Recorded pid is not a running heartbeat");
            return Ok(Termination::AlreadyGone);
        }
        terminate_pid(pid)
    }
}

/// Send SIGTERM to `pid`.
#[cfg(unix)]
pub fn terminate_pid(pid: u32) -> io::Result<Termination> {
    if pid == 0 || pid > i32::MAX as u32 {
        // No tracked process can live there; kill(0) would hit our own group.
        return Ok(Termination::AlreadyGone);
    }
    if pid == std::process::id() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("refusing to signal own process {pid}"),
        ));
    }
    // SAFETY: `kill` takes plain integers; errno is read right after the call.
    let res = unsafe { libc::kill(pid as i32, libc::SIGTERM) };
    if res == 0 {
        return Ok(Termination::Signalled);
    }
    let err = io::Error::last_os_error();
    if is_no_such_process(&err) {
        Ok(Termination::AlreadyGone)
    } else {
        Err(err)
    }
}

#[cfg(not(unix))]
pub fn terminate_pid(_pid: u32) -> io::Result<Termination> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "process termination is only supported on unix",
    ))
}

/// True while `pid` is a live `taskly heartbeat` process. Zombies, missing pids and
/// pids reused by other programs are all false.
pub fn is_heartbeat_process(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }
    let sys_pid = Pid::from_u32(pid);
    let mut sys = System::new();
    if !sys.refresh_process_specifics(
        sys_pid,
        ProcessRefreshKind::new().with_cmd(UpdateKind::Always),
    ) {
        return false;
    }
    match sys.process(sys_pid) {
        Some(process) if !matches!(process.status(), ProcessStatus::Zombie) => {
            is_heartbeat_cmd(process.cmd())
        }
        _ => false,
    }
}

fn is_heartbeat_cmd(cmd: &[String]) -> bool {
    cmd.get(1).map(String::as_str) == Some(HEARTBEAT_SUBCOMMAND)
}

#[cfg(unix)]
fn is_no_such_process(err: &io::Error) -> bool {
    matches!(err.raw_os_error(), Some(code) if code == libc::ESRCH)
}
