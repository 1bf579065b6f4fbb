//! Start/stop/restart policy.
//!
//! The controller decides which record operations run, in which order, and
//! what the operator is told about it. Every command for an application runs
//! behind that application's restart gate, so two requests for the same
//! application never interleave their stop/start steps. Gates are per
//! application; commands for different applications proceed independently.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::launcher::LaunchError;
use crate::record::AppRecord;
use crate::registry::Registry;

/// Receives lifecycle progress for display.
///
/// Implementations must return quickly; they are called from lifecycle tasks
/// after the record guard has been released.
pub trait LifecycleObserver: Send + Sync {
    /// A multi-step operation has begun.
    fn on_announce(&self, name: &str, message: &str);
    /// An operation finished.
    fn on_result(&self, name: &str, success: bool, message: &str);
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("failed to stop {name}: {source}")]
    StopFailed { name: String, source: LaunchError },
    #[error("failed to start {name}: {source}")]
    StartFailed { name: String, source: LaunchError },
    #[error("{0} is already running")]
    AlreadyRunning(String),
    #[error("{0} is not running")]
    NotRunning(String),
}

pub struct LifecycleController {
    registry: Arc<Registry>,
    gates: HashMap<String, Mutex<()>>,
}

impl LifecycleController {
    pub fn new(registry: Arc<Registry>) -> Self {
        let gates = registry
            .names()
            .into_iter()
            .map(|name| (name, Mutex::new(())))
            .collect();
        Self { registry, gates }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Stops the application if it is running, then starts it.
    ///
    /// The stop check and the stop itself share one critical section; the
    /// guard is released before the start and before anything is reported.
    /// A failed stop ends the attempt without starting. Unknown names are
    /// ignored.
    pub async fn restart(
        &self,
        name: &str,
        observer: &dyn LifecycleObserver,
    ) -> Result<(), LifecycleError> {
        let Some((record, gate)) = self.resolve(name) else {
            return Ok(());
        };
        observer.on_announce(name, &format!("Restarting app: {}...", name));
        let _serial = gate.lock().await;

        let stopped = {
            let mut guard = record.lock();
            if guard.running() {
                Some(guard.stop())
            } else {
                None
            }
        };
        if let Some(Err(source)) = stopped {
            tracing::warn!(app = name, error = %source, "restart aborted: stop failed");
            observer.on_result(
                name,
                false,
                &format!("Failed to stop app: {} | Error: {}", name, source),
            );
            return Err(LifecycleError::StopFailed {
                name: name.to_string(),
                source,
            });
        }

        if let Err(source) = record.start(self.registry.log_path()) {
            tracing::warn!(app = name, error = %source, "restart failed: start failed");
            observer.on_result(
                name,
                false,
                &format!("Failed to restart app: {} | Error: {}", name, source),
            );
            return Err(LifecycleError::StartFailed {
                name: name.to_string(),
                source,
            });
        }

        tracing::info!(app = name, "restarted");
        observer.on_result(name, true, &format!("Successfully restarted app: {}", name));
        Ok(())
    }

    /// Starts a stopped application. Rejected when it is already running.
    pub async fn start(
        &self,
        name: &str,
        observer: &dyn LifecycleObserver,
    ) -> Result<(), LifecycleError> {
        let Some((record, gate)) = self.resolve(name) else {
            return Ok(());
        };
        let _serial = gate.lock().await;

        let outcome = {
            let mut guard = record.lock();
            if guard.running() {
                Err(LifecycleError::AlreadyRunning(name.to_string()))
            } else {
                guard
                    .start(self.registry.log_path())
                    .map_err(|source| LifecycleError::StartFailed {
                        name: name.to_string(),
                        source,
                    })
            }
        };
        match &outcome {
            Ok(()) => {
                tracing::info!(app = name, "started");
                observer.on_result(name, true, &format!("Started app: {}", name));
            }
            Err(LifecycleError::StartFailed { source, .. }) => {
                tracing::warn!(app = name, error = %source, "start failed");
                observer.on_result(
                    name,
                    false,
                    &format!("Failed to start app: {} | Error: {}", name, source),
                );
            }
            Err(err) => observer.on_result(name, false, &format!("App {}", err)),
        }
        outcome
    }

    /// Stops a running application. Rejected when it is already stopped.
    pub async fn stop(
        &self,
        name: &str,
        observer: &dyn LifecycleObserver,
    ) -> Result<(), LifecycleError> {
        let Some((record, gate)) = self.resolve(name) else {
            return Ok(());
        };
        let _serial = gate.lock().await;

        let outcome = {
            let mut guard = record.lock();
            if !guard.running() {
                Err(LifecycleError::NotRunning(name.to_string()))
            } else {
                guard.stop().map_err(|source| LifecycleError::StopFailed {
                    name: name.to_string(),
                    source,
                })
            }
        };
        match &outcome {
            Ok(()) => {
                tracing::info!(app = name, "stopped");
                observer.on_result(name, true, &format!("Stopped app: {}", name));
            }
            Err(LifecycleError::StopFailed { source, .. }) => {
                tracing::warn!(app = name, error = %source, "stop failed");
                observer.on_result(
                    name,
                    false,
                    &format!("Failed to stop app: {} | Error: {}", name, source),
                );
            }
            Err(err) => observer.on_result(name, false, &format!("App {}", err)),
        }
        outcome
    }

    /// Stops every running application, waiting behind each gate in turn.
    /// Returns how many stops failed. Nothing is reported to an observer.
    pub async fn stop_all(&self) -> usize {
        let mut failures = 0;
        for record in self.registry.records() {
            let Some(gate) = self.gates.get(record.name()) else {
                continue;
            };
            let _serial = gate.lock().await;
            // Only gated commands change the running flag.
            if !record.snapshot().running {
                continue;
            }
            if let Err(err) = record.stop() {
                tracing::warn!(app = record.name(), error = %err, "stop on exit failed");
                failures += 1;
            }
        }
        failures
    }

    fn resolve(&self, name: &str) -> Option<(Arc<AppRecord>, &Mutex<()>)> {
        let resolved = self.registry.lookup(name).zip(self.gates.get(name));
        if resolved.is_none() {
            tracing::debug!(app = name, "ignoring command for unknown application");
        }
        resolved
    }
}
