//! Per-application state.
//!
//! An `AppRecord` owns one application's running flag and log lines behind a
//! single `RwLock`. Nothing outside this module ever holds a reference to the
//! live log buffer: readers get an owned `Snapshot`, writers go through
//! `RecordGuard` or the one-shot `start`/`stop` helpers.

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use crate::launcher::{LaunchError, Launcher};

/// Lifecycle state of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppStatus {
    /// Not running (initial state).
    Stopped,
    /// Running.
    Running,
}

impl AppStatus {
    pub fn from_running(running: bool) -> Self {
        if running {
            AppStatus::Running
        } else {
            AppStatus::Stopped
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AppStatus::Stopped => "Stopped",
            AppStatus::Running => "Running",
        }
    }
}

/// Owned copy of a record's observable state, captured under one read guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub running: bool,
    pub logs: Vec<String>,
}

impl Snapshot {
    pub fn status(&self) -> AppStatus {
        AppStatus::from_running(self.running)
    }
}

#[derive(Debug)]
struct RecordState {
    running: bool,
    logs: Vec<String>,
}

/// A supervised application.
pub struct AppRecord {
    name: String,
    launcher: Arc<dyn Launcher>,
    state: RwLock<RecordState>,
}

impl std::fmt::Debug for AppRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppRecord")
            .field("name", &self.name)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl AppRecord {
    /// Creates a stopped record whose log starts with `initial_log`.
    pub fn new(
        name: impl Into<String>,
        initial_log: impl Into<String>,
        launcher: Arc<dyn Launcher>,
    ) -> Self {
        Self {
            name: name.into(),
            launcher,
            state: RwLock::new(RecordState {
                running: false,
                logs: vec![initial_log.into()],
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Takes the exclusive guard.
    ///
    /// Use this when a decision and the mutation it guards must happen in the
    /// same critical section. Drop the guard before calling back into this
    /// record.
    pub fn lock(&self) -> RecordGuard<'_> {
        // Every critical section leaves the pair consistent, so a poisoned
        // lock still holds a valid state.
        let state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        RecordGuard {
            name: &self.name,
            launcher: self.launcher.as_ref(),
            state,
        }
    }

    /// Starts the application. Calling it twice logs two "started" lines.
    pub fn start(&self, log_path: &Path) -> Result<(), LaunchError> {
        self.lock().start(log_path)
    }

    /// Stops the application. Calling it twice logs two "stopped" lines.
    pub fn stop(&self) -> Result<(), LaunchError> {
        self.lock().stop()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.with_snapshot(|snapshot| snapshot)
    }

    /// Hands a snapshot to `f` while the read guard is still held.
    ///
    /// No write can land between capturing the snapshot and whatever `f`
    /// does with it, so snapshots queued from here reach a consumer in the
    /// order they were taken. `f` must not lock this record.
    pub fn with_snapshot<R>(&self, f: impl FnOnce(Snapshot) -> R) -> R {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(Snapshot {
            running: state.running,
            logs: state.logs.clone(),
        })
    }
}

/// Exclusive access to one record.
pub struct RecordGuard<'a> {
    name: &'a str,
    launcher: &'a dyn Launcher,
    state: RwLockWriteGuard<'a, RecordState>,
}

impl RecordGuard<'_> {
    pub fn running(&self) -> bool {
        self.state.running
    }

    pub fn start(&mut self, log_path: &Path) -> Result<(), LaunchError> {
        self.launcher.launch(self.name, log_path)?;
        self.state.running = true;
        self.state.logs.push(format!("{} started", self.name));
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), LaunchError> {
        self.launcher.terminate(self.name)?;
        self.state.running = false;
        self.state.logs.push(format!("{} stopped", self.name));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::launcher::testing::FlakyLauncher;
    use crate::launcher::StubLauncher;

    fn record(name: &str) -> AppRecord {
        AppRecord::new(name, format!("{} initialized", name), Arc::new(StubLauncher))
    }

    #[test]
    fn new_record_is_stopped_with_initial_line() {
        let snapshot = record("App1").snapshot();
        assert!(!snapshot.running);
        assert_eq!(snapshot.status(), AppStatus::Stopped);
        assert_eq!(snapshot.logs, vec!["App1 initialized"]);
    }

    #[test]
    fn start_and_stop_append_in_order() {
        let app = record("App1");
        app.start(Path::new("/tmp")).unwrap();
        assert!(app.snapshot().running);
        app.stop().unwrap();
        let snapshot = app.snapshot();
        assert!(!snapshot.running);
        assert_eq!(
            snapshot.logs,
            vec!["App1 initialized", "App1 started", "App1 stopped"]
        );
    }

    #[test]
    fn double_start_duplicates_log_line() {
        let app = record("App1");
        app.start(Path::new("/tmp")).unwrap();
        app.start(Path::new("/tmp")).unwrap();
        let snapshot = app.snapshot();
        assert!(snapshot.running);
        assert_eq!(
            snapshot.logs,
            vec!["App1 initialized", "App1 started", "App1 started"]
        );
    }

    #[test]
    fn snapshot_is_detached_from_live_buffer() {
        let app = record("App1");
        let before = app.snapshot();
        app.start(Path::new("/tmp")).unwrap();
        assert_eq!(before.logs.len(), 1);
        assert!(!before.running);
        assert_eq!(app.snapshot().logs.len(), 2);
    }

    #[test]
    fn repeated_snapshots_are_equal() {
        let app = record("App1");
        app.start(Path::new("/tmp")).unwrap();
        assert_eq!(app.snapshot(), app.snapshot());
    }

    #[test]
    fn with_snapshot_blocks_writers_until_done() {
        let app = Arc::new(record("App1"));
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let reader = {
            let app = Arc::clone(&app);
            thread::spawn(move || {
                app.with_snapshot(|snapshot| {
                    entered_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                    snapshot
                })
            })
        };
        entered_rx.recv().unwrap();
        let writer = {
            let app = Arc::clone(&app);
            thread::spawn(move || app.start(Path::new("/tmp")).unwrap())
        };
        thread::sleep(std::time::Duration::from_millis(20));
        release_tx.send(()).unwrap();

        let seen = reader.join().unwrap();
        writer.join().unwrap();
        assert!(!seen.running);
        assert_eq!(seen.logs, vec!["App1 initialized"]);
        assert!(app.snapshot().running);
    }

    #[test]
    fn failed_launch_leaves_state_untouched() {
        let app = AppRecord::new("api", "api initialized", Arc::new(FlakyLauncher::failing_launch()));
        let err = app.start(Path::new("/tmp")).unwrap_err();
        assert!(matches!(err, LaunchError::Launch { .. }));
        let snapshot = app.snapshot();
        assert!(!snapshot.running);
        assert_eq!(snapshot.logs, vec!["api initialized"]);
    }

    #[test]
    fn failed_terminate_keeps_running() {
        let app = AppRecord::new(
            "api",
            "api initialized",
            Arc::new(FlakyLauncher::failing_terminate()),
        );
        app.start(Path::new("/tmp")).unwrap();
        assert!(app.stop().is_err());
        let snapshot = app.snapshot();
        assert!(snapshot.running);
        assert_eq!(snapshot.logs, vec!["api initialized", "api started"]);
    }

    #[test]
    fn guard_checks_and_acts_in_one_section() {
        let app = record("App1");
        {
            let mut guard = app.lock();
            assert!(!guard.running());
            guard.start(Path::new("/tmp")).unwrap();
            assert!(guard.running());
        }
        assert!(app.snapshot().running);
    }

    #[test]
    fn snapshots_never_observe_half_updates() {
        let app = Arc::new(record("App1"));
        let writers: Vec<_> = (0..4)
            .map(|_| {
                let app = Arc::clone(&app);
                thread::spawn(move || {
                    for _ in 0..200 {
                        app.start(Path::new("/tmp")).unwrap();
                        app.stop().unwrap();
                    }
                })
            })
            .collect();
        let reader = {
            let app = Arc::clone(&app);
            thread::spawn(move || {
                for _ in 0..500 {
                    let snapshot = app.snapshot();
                    let last = snapshot.logs.last().cloned().unwrap_or_default();
                    if snapshot.running {
                        assert_eq!(last, "App1 started");
                    } else {
                        assert!(last == "App1 stopped" || last == "App1 initialized");
                    }
                }
            })
        };
        for writer in writers {
            writer.join().unwrap();
        }
        reader.join().unwrap();
        let snapshot = app.snapshot();
        assert!(!snapshot.running);
        assert_eq!(snapshot.logs.len(), 1 + 4 * 200 * 2);
    }
}
