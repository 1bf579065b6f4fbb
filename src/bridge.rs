//! Submission queue between lifecycle tasks and the render loop.
//!
//! Widget state is only ever touched on the render loop. Any thread that wants
//! the screen to change submits a closure here; the render loop drains the
//! queue and applies the closures to its `View` in submission order.
//! Closures must carry already-captured data and never lock a record.

use tokio::sync::mpsc;

use crate::view::View;

/// A deferred mutation of the render-side state.
pub type Update = Box<dyn FnOnce(&mut View) + Send + 'static>;

/// Producer half; cheap to clone and safe to use from any thread.
#[derive(Clone)]
pub struct Bridge {
    tx: mpsc::UnboundedSender<Update>,
}

/// Consumer half, owned by the render loop.
pub struct UpdateQueue {
    rx: mpsc::UnboundedReceiver<Update>,
}

pub fn channel() -> (Bridge, UpdateQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Bridge { tx }, UpdateQueue { rx })
}

impl Bridge {
    /// Enqueues `update` for the render loop and returns immediately.
    pub fn submit<F>(&self, update: F)
    where
        F: FnOnce(&mut View) + Send + 'static,
    {
        if self.tx.send(Box::new(update)).is_err() {
            tracing::debug!("render loop has exited; dropping update");
        }
    }
}

impl UpdateQueue {
    /// Waits for the next update. Returns `None` once every `Bridge` is gone.
    pub async fn recv(&mut self) -> Option<Update> {
        self.rx.recv().await
    }

    /// Takes the next queued update without waiting.
    pub fn try_next(&mut self) -> Option<Update> {
        self.rx.try_recv().ok()
    }

    /// Applies every update already queued, in order. Returns how many ran.
    pub fn apply_pending(&mut self, view: &mut View) -> usize {
        let mut applied = 0;
        while let Some(update) = self.try_next() {
            update(view);
            applied += 1;
        }
        applied
    }
}
