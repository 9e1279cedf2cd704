//! Session state tracking for Stash connections.
//!
//! A session only ever moves forward: `Disconnected` to `Connected`.

use std::sync::atomic::{AtomicBool, Ordering};

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No probe has succeeded yet
    Disconnected,

    /// A probe succeeded; terminal
    Connected,
}

impl SessionState {
    /// Check if the session is connected.
    pub fn is_connected(&self) -> bool {
        matches!(self, SessionState::Connected)
    }
}

/// One-way connected flag shared by concurrent `connect` callers.
///
/// Concurrent callers may all run a probe; only the first successful one
/// observes the transition.
#[derive(Debug, Default)]
pub struct Session {
    connected: AtomicBool,
}

impl Session {
    /// Create a disconnected session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current session state.
    pub fn state(&self) -> SessionState {
        if self.connected.load(Ordering::Acquire) {
            SessionState::Connected
        } else {
            SessionState::Disconnected
        }
    }

    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Mark the session connected. Returns `true` if this call made the transition.
    pub fn mark_connected(&self) -> bool {
        !self.connected.swap(true, Ordering::AcqRel)
    }
}
