//! Wiring between operator commands, the lifecycle controller and the bridge.
//!
//! Every method here is safe to call from the render loop: reads take a
//! snapshot and submit it, lifecycle commands are handed to a tokio task.
//! Snapshots are submitted under the record's read guard, so the render loop
//! applies them in the order they were taken.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::bridge::Bridge;
use crate::lifecycle::{LifecycleController, LifecycleObserver};
use crate::registry::Registry;

/// Observer that turns lifecycle progress into bridge updates.
pub struct BridgeObserver {
    registry: Arc<Registry>,
    bridge: Bridge,
}

impl LifecycleObserver for BridgeObserver {
    fn on_announce(&self, _name: &str, message: &str) {
        let message = message.to_string();
        self.bridge.submit(move |view| view.set_status(message));
    }

    fn on_result(&self, name: &str, success: bool, message: &str) {
        let message = message.to_string();
        let Some(record) = self.registry.lookup(name) else {
            self.bridge
                .submit(move |view| view.set_result(message, success));
            return;
        };
        let name = name.to_string();
        record.with_snapshot(|snapshot| {
            self.bridge.submit(move |view| {
                view.set_result(message, success);
                view.refresh(&name, snapshot);
            })
        });
    }
}

#[derive(Debug, Clone, Copy)]
enum Command {
    Restart,
    Start,
    Stop,
}

#[derive(Clone)]
pub struct Dashboard {
    controller: Arc<LifecycleController>,
    bridge: Bridge,
    observer: Arc<BridgeObserver>,
}

impl Dashboard {
    pub fn new(registry: Arc<Registry>, bridge: Bridge) -> Self {
        let controller = Arc::new(LifecycleController::new(Arc::clone(&registry)));
        let observer = Arc::new(BridgeObserver {
            registry: Arc::clone(&registry),
            bridge: bridge.clone(),
        });
        Self {
            controller,
            bridge,
            observer,
        }
    }

    /// Shows `name` in the log and status panes. Unknown names submit nothing.
    pub fn select(&self, name: &str) -> bool {
        let Some(record) = self.controller.registry().lookup(name) else {
            return false;
        };
        let name = name.to_string();
        record.with_snapshot(|snapshot| {
            self.bridge.submit(move |view| view.show(&name, snapshot))
        });
        true
    }

    /// Publishes every application's current state to the list.
    pub fn prime(&self) {
        for record in self.controller.registry().records() {
            let name = record.name().to_string();
            record.with_snapshot(|snapshot| {
                self.bridge.submit(move |view| view.refresh(&name, snapshot))
            });
        }
    }

    pub fn restart(&self, name: &str) -> JoinHandle<()> {
        self.spawn(Command::Restart, name)
    }

    pub fn start(&self, name: &str) -> JoinHandle<()> {
        self.spawn(Command::Start, name)
    }

    pub fn stop(&self, name: &str) -> JoinHandle<()> {
        self.spawn(Command::Stop, name)
    }

    pub fn restart_all(&self) -> Vec<JoinHandle<()>> {
        self.controller
            .registry()
            .names()
            .iter()
            .map(|name| self.restart(name))
            .collect()
    }

    /// Stops whatever is still running before the dashboard exits.
    pub async fn shutdown(&self) {
        let failures = self.controller.stop_all().await;
        if failures > 0 {
            tracing::warn!(failures, "some applications failed to stop on exit");
        }
    }

    fn spawn(&self, command: Command, name: &str) -> JoinHandle<()> {
        let controller = Arc::clone(&self.controller);
        let observer = Arc::clone(&self.observer);
        let name = name.to_string();
        tokio::spawn(async move {
            let observer: &dyn LifecycleObserver = observer.as_ref();
            let outcome = match command {
                Command::Restart => controller.restart(&name, observer).await,
                Command::Start => controller.start(&name, observer).await,
                Command::Stop => controller.stop(&name, observer).await,
            };
            if let Err(err) = outcome {
                tracing::debug!(app = %name, ?command, error = %err, "command reported failure");
            }
        })
    }
}
