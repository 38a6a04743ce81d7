//! Browser session identity and lifecycle.
//!
//! ```text
//! Connecting ──HandshakeCompleted──► Connected ──Closed──► Disconnected
//!      └────────────────────Closed───────────────────────────┘
//! ```
//!
//! `Disconnected` is terminal.  A browser that reconnects gets a new session
//! with a new id; nothing carries over from the old one.

use std::fmt;

use uuid::Uuid;

/// Opaque identifier of one browser session, used as the hub key and in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    /// Prints the first 8 hex digits, which is plenty to tell sessions apart
    /// in a log.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let simple = self.0.simple().to_string();
        f.write_str(&simple[..8])
    }
}

/// Where a browser session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// TCP accepted, WebSocket upgrade not finished yet.
    Connecting,
    /// Upgrade done; the session is a member of the broadcast hub.
    Connected,
    /// Connection closed or failed.  Terminal.
    Disconnected,
}

/// Transport-level occurrences that move a session between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The WebSocket upgrade handshake succeeded.
    HandshakeCompleted,
    /// The connection closed, errored, or the handshake failed.
    Closed,
}

impl SessionState {
    /// Applies `event` and returns the next state.
    ///
    /// A handshake completing twice, or anything happening after
    /// `Disconnected`, leaves the state unchanged.
    pub fn advance(self, event: SessionEvent) -> SessionState {
        match (self, event) {
            (SessionState::Disconnected, _) => SessionState::Disconnected,
            (_, SessionEvent::Closed) => SessionState::Disconnected,
            (SessionState::Connecting, SessionEvent::HandshakeCompleted) => SessionState::Connected,
            (SessionState::Connected, SessionEvent::HandshakeCompleted) => SessionState::Connected,
        }
    }

    /// Events may only be delivered to `Connected` sessions.
    pub fn can_receive(self) -> bool {
        self == SessionState::Connected
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
