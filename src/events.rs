//! Event definitions for the render loop.
//!
//! Terminal input and process signals are forwarded to the render loop as
//! `Event`s over a tokio channel; lifecycle progress travels separately through
//! the bridge.

use crossterm::event::KeyEvent;

/// Represents an input event delivered to the render loop.
#[derive(Debug, Clone)]
pub enum Event {
    /// A keyboard event received from the user.
    Key(KeyEvent),
    /// The terminal window was resized.
    Resize { width: u16, height: u16 },
    /// The process received ctrl-c or SIGTERM.
    Shutdown,
}
