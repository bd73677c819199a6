//! Session state machine
//!
//! Tracks a streaming connection from admission to teardown.

use std::time::Instant;

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Admitted, handshake not yet written
    Connecting,
    /// Handshake written, steady-state loop running
    Open,
    /// Loop exited, cleanup in progress
    Closing,
    /// Cleanup done
    Closed,
}

/// Per-connection session state
#[derive(Debug)]
pub struct SessionState {
    /// Assigned client id
    pub id: String,

    /// Caller-identifying metadata
    pub remote: String,

    /// Current phase
    pub phase: SessionPhase,

    /// When the connection was admitted
    pub connected_at: Instant,

    /// Data events written to the transport
    pub events_sent: u64,

    /// Keepalive comments written to the transport
    pub keepalives_sent: u64,
}

impl SessionState {
    /// Create state for a freshly admitted connection
    pub fn new(id: &str, remote: &str) -> Self {
        Self {
            id: id.to_string(),
            remote: remote.to_string(),
            phase: SessionPhase::Connecting,
            connected_at: Instant::now(),
            events_sent: 0,
            keepalives_sent: 0,
        }
    }

    /// Enter the steady-state loop
    pub fn open(&mut self) {
        if self.phase == SessionPhase::Connecting {
            self.phase = SessionPhase::Open;
        }
    }

    /// Begin teardown
    pub fn close(&mut self) {
        if self.phase != SessionPhase::Closed {
            self.phase = SessionPhase::Closing;
        }
    }

    /// Teardown finished
    pub fn closed(&mut self) {
        self.phase = SessionPhase::Closed;
    }

    /// Whether the steady-state loop is running
    pub fn is_open(&self) -> bool {
        self.phase == SessionPhase::Open
    }

    /// Session duration so far
    pub fn duration(&self) -> std::time::Duration {
        self.connected_at.elapsed()
    }

    /// Record one data/comment/retry event written to the peer
    pub fn on_event_sent(&mut self) {
        self.events_sent += 1;
    }

    /// Record one idle keepalive written to the peer
    pub fn on_keepalive(&mut self) {
        self.keepalives_sent += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_lifecycle() {
        let mut state = SessionState::new("100", "test");

        assert_eq!(state.phase, SessionPhase::Connecting);
        assert!(!state.is_open());

        state.open();
        assert_eq!(state.phase, SessionPhase::Open);
        assert!(state.is_open());

        state.close();
        assert_eq!(state.phase, SessionPhase::Closing);

        state.closed();
        assert_eq!(state.phase, SessionPhase::Closed);
    }

    #[test]
    fn test_open_only_from_connecting() {
        let mut state = SessionState::new("100", "test");
        state.close();
        state.open();
        assert_eq!(state.phase, SessionPhase::Closing);
    }

    #[test]
    fn test_counters() {
        let mut state = SessionState::new("100", "test");
        state.on_event_sent();
        state.on_event_sent();
        state.on_keepalive();
        assert_eq!(state.events_sent, 2);
        assert_eq!(state.keepalives_sent, 1);
    }
}
