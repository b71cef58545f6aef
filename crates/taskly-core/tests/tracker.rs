use std::cell::{Cell, RefCell};
use std::fs;
use std::io;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use taskly_core::inspect::{history, status};
use taskly_core::process::{ProcessControl, Termination};
use taskly_core::timeline::{now_millis, Session, TimelineError, TimelineStore, TrackingState};
use taskly_core::tracker::{StopWarning, Tracker};

#[derive(Clone, Copy)]
enum KillBehavior {
    Deliver,
    Missing,
    Denied,
}

struct FakeProcesses {
    next_pid: Cell<u32>,
    kill: Cell<KillBehavior>,
    spawned: RefCell<Vec<String>>,
    terminated: RefCell<Vec<u32>>,
}

impl FakeProcesses {
    fn new() -> Self {
        Self {
            next_pid: Cell::new(5000),
            kill: Cell::new(KillBehavior::Deliver),
            spawned: RefCell::new(Vec::new()),
            terminated: RefCell::new(Vec::new()),
        }
    }
}

impl ProcessControl for &FakeProcesses {
    fn spawn_heartbeat(&self, project: &str) -> io::Result<u32> {
        self.spawned.borrow_mut().push(project.to_string());
        let pid = self.next_pid.get();
        self.next_pid.set(pid + 1);
        Ok(pid)
    }

    fn terminate(&self, pid: u32) -> io::Result<Termination> {
        self.terminated.borrow_mut().push(pid);
        match self.kill.get() {
            KillBehavior::Deliver => Ok(Termination::Signalled),
            KillBehavior::Missing => Ok(Termination::AlreadyGone),
            KillBehavior::Denied => Err(io::Error::from(io::ErrorKind::PermissionDenied)),
        }
    }
}

fn setup() -> (TempDir, TimelineStore, FakeProcesses) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = TimelineStore::new(dir.path());
    (dir, store, FakeProcesses::new())
}

#[test]
fn start_records_active_session_with_child_pid() {
    let (_dir, store, fake) = setup();
    let tracker = Tracker::new(store.clone(), &fake);

    let before = now_millis();
    let handle = tracker.start("writing-docs").expect("start");
    assert_eq!(handle.project, "writing-docs");
    assert_eq!(handle.pid, 5000);
    assert!(handle.start_time >= before);

    let active = store.load().expect("load").active.expect("active");
    assert_eq!(active.project, "writing-docs");
    assert_eq!(active.pid, 5000);
    assert_eq!(active.start_time, handle.start_time);
    assert_eq!(active.last_update, None);
    assert_eq!(*fake.spawned.borrow(), vec!["writing-docs".to_string()]);
}

#[test]
fn second_start_fails_and_leaves_file_untouched() {
    let (_dir, store, fake) = setup();
    let tracker = Tracker::new(store.clone(), &fake);
    tracker.start("A").expect("start A");
    let before = fs::read(store.path()).expect("read");

    let err = tracker.start("B").expect_err("second start");
    match err {
        TimelineError::AlreadyTracking { existing } => assert_eq!(existing, "A"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fs::read(store.path()).expect("read"), before);
    assert_eq!(fake.spawned.borrow().len(), 1);
}

#[test]
fn blank_project_is_rejected_before_spawning() {
    let (_dir, store, fake) = setup();
    let tracker = Tracker::new(store, &fake);
    assert!(matches!(tracker.start("   "), Err(TimelineError::EmptyProject)));
    assert!(fake.spawned.borrow().is_empty());
}

#[test]
fn stop_without_session_fails_and_keeps_log() {
    let (_dir, store, fake) = setup();
    let tracker = Tracker::new(store.clone(), &fake);
    tracker.start("first").expect("start");
    tracker.stop().expect("stop");
    let log_before = store.load().expect("load").log;

    assert!(matches!(tracker.stop(), Err(TimelineError::NotTracking)));
    assert_eq!(store.load().expect("load").log, log_before);
    assert_eq!(*fake.terminated.borrow(), vec![5000]);
}

#[test]
fn stop_moves_session_into_log() {
    let (_dir, store, fake) = setup();
    let tracker = Tracker::new(store.clone(), &fake);
    let handle = tracker.start("writing-docs").expect("start");

    let outcome = tracker.stop().expect("stop");
    assert_eq!(outcome.warning, None);
    let done = &outcome.session;
    assert_eq!(done.project, "writing-docs");
    assert_eq!(done.start_time, handle.start_time);
    assert!(done.end_time >= done.start_time);

    let expected = (done.end_time - done.start_time) as f64 / 1000.0;
    let secs: f64 = done
        .duration
        .strip_suffix(" sec")
        .expect("unit suffix")
        .parse()
        .expect("number");
    assert!((secs - expected).abs() < 0.01);
    let decimals = done.duration.split('.').nth(1).expect("decimals");
    assert_eq!(decimals.len(), "00 sec".len());

    let state = store.load().expect("load");
    assert!(state.active.is_none());
    assert_eq!(state.log, vec![done.clone()]);
    assert_eq!(*fake.terminated.borrow(), vec![handle.pid]);
}

#[test]
fn missing_process_is_a_warning_and_still_finalizes() {
    let (_dir, store, fake) = setup();
    let tracker = Tracker::new(store.clone(), &fake);
    tracker.start("orphaned").expect("start");
    fake.kill.set(KillBehavior::Missing);

    let outcome = tracker.stop().expect("stop");
    assert_eq!(outcome.warning, Some(StopWarning::ProcessNotFound { pid: 5000 }));
    let state = store.load().expect("load");
    assert!(state.active.is_none());
    assert_eq!(state.log.len(), 1);
}

#[test]
fn dead_heartbeat_ends_session_at_last_update() {
    let (_dir, store, fake) = setup();
    store
        .save(&TrackingState {
            active: Some(Session {
                project: "crashed".to_string(),
                start_time: 1_000,
                pid: 77,
                last_update: Some(11_000),
            }),
            log: Vec::new(),
        })
        .expect("seed");
    fake.kill.set(KillBehavior::Missing);

    let outcome = Tracker::new(store, &fake).stop().expect("stop");
    assert_eq!(outcome.session.end_time, 11_000);
    assert_eq!(outcome.session.duration, "10.00 sec");
}

#[test]
fn termination_failure_aborts_without_touching_state() {
    let (_dir, store, fake) = setup();
    let tracker = Tracker::new(store.clone(), &fake);
    tracker.start("stubborn").expect("start");
    let before = fs::read(store.path()).expect("read");
    fake.kill.set(KillBehavior::Denied);

    let err = tracker.stop().expect_err("denied");
    assert!(matches!(err, TimelineError::ProcessTermination { pid: 5000, .. }));
    assert_eq!(fs::read(store.path()).expect("read"), before);

    // Retrying once the process is gone finalizes exactly once.
    fake.kill.set(KillBehavior::Missing);
    tracker.stop().expect("retry");
    assert_eq!(store.load().expect("load").log.len(), 1);
    assert!(matches!(tracker.stop(), Err(TimelineError::NotTracking)));
}

#[test]
fn start_stop_scenario_through_inspector() {
    let (_dir, store, fake) = setup();
    let tracker = Tracker::new(store.clone(), &fake);

    assert_eq!(status(&store).expect("status"), None);
    tracker.start("writing-docs").expect("start");

    let view = status(&store).expect("status").expect("active");
    assert_eq!(view.project, "writing-docs");
    assert!(view.elapsed_ms(now_millis()) >= 0);
    assert_eq!(status(&store).expect("status again"), Some(view));

    let outcome = tracker.stop().expect("stop");
    assert!(outcome.session.duration.ends_with(" sec"));
    assert_eq!(history(&store).expect("history"), vec![outcome.session]);
    assert_eq!(status(&store).expect("status"), None);
}

#[test]
fn corrupt_state_blocks_start() {
    let (_dir, store, fake) = setup();
    fs::write(store.path(), "[]]").expect("write");
    let tracker = Tracker::new(store, &fake);
    assert!(matches!(
        tracker.start("x"),
        Err(TimelineError::CorruptState { .. })
    ));
    assert!(fake.spawned.borrow().is_empty());
}
