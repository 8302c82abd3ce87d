//! WebSocket Session Management
//!
//! Lifecycle: `Connecting -> Upgraded -> Active -> Closing -> Closed`.
//! A session that fails before `Active` never owns a registry entry.

use std::time::Instant;

use super::messages::CloseCause;
use super::registry::ConnectionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Identity verified, upgrade pending
    Connecting,
    /// Socket upgraded, history not yet delivered
    Upgraded,
    /// Registered and reading
    Active,
    /// Leaving the registry
    Closing,
    Closed,
}

/// Per-connection session state
#[derive(Debug)]
pub struct SessionState {
    pub connection_id: ConnectionId,
    pub user_id: i64,
    phase: SessionPhase,
    close_cause: Option<CloseCause>,
    pub connected_at: Instant,
    pub last_seen: Instant,
    pub messages_sent: u64,
}

impl SessionState {
    pub fn new(connection_id: ConnectionId, user_id: i64) -> Self {
        let now = Instant::now();
        Self {
            connection_id,
            user_id,
            phase: SessionPhase::Connecting,
            close_cause: None,
            connected_at: now,
            last_seen: now,
            messages_sent: 0,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn close_cause(&self) -> Option<CloseCause> {
        self.close_cause
    }

    pub fn mark_upgraded(&mut self) {
        if self.phase == SessionPhase::Connecting {
            self.phase = SessionPhase::Upgraded;
        }
    }

    pub fn activate(&mut self) {
        if self.phase == SessionPhase::Upgraded {
            self.phase = SessionPhase::Active;
        }
    }

    /// Any inbound frame, pongs included.
    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    pub fn record_sent(&mut self) {
        self.messages_sent += 1;
    }

    /// Enter `Closing`. Returns true only for the first caller, which owns
    /// the one-time cleanup.
    pub fn begin_close(&mut self, cause: CloseCause) -> bool {
        match self.phase {
            SessionPhase::Closing | SessionPhase::Closed => false,
            _ => {
                self.phase = SessionPhase::Closing;
                self.close_cause = Some(cause);
                true
            }
        }
    }

    pub fn finish(&mut self) {
        self.phase = SessionPhase::Closed;
    }

    pub fn is_active(&self) -> bool {
        self.phase == SessionPhase::Active
    }
}
