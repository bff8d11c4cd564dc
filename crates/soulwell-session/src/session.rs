//! Per-seat connection records and the timeouts that govern them.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use soulwell_protocol::{ConnectionStatus, PlayerId};
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// ResilienceConfig
// ---------------------------------------------------------------------------

/// How long the table waits for a player who dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResilienceConfig {
    /// Time a disconnected player has to come back before they fold.
    pub grace_period_secs: u64,

    /// Time a disconnected player may sit on their own turn before it
    /// passes to the next player. Shorter than the grace period.
    pub inactivity_timeout_secs: u64,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            grace_period_secs: 120,
            inactivity_timeout_secs: 30,
        }
    }
}

impl ResilienceConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }

    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Connection lifecycle of one seat.
///
/// ```text
///   Connected ──(disconnect)──→ Disconnected ──(grace elapsed)──→ Evicted
///       ↑                            │
///       └────────(reconnect)─────────┘
/// ```
///
/// `since` is a tokio [`Instant`] so paused-clock tests can move it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Disconnected { since: Instant },
    Evicted,
}

impl SessionState {
    /// The public status other players see.
    pub fn status(&self) -> ConnectionStatus {
        match self {
            Self::Connected => ConnectionStatus::Connected,
            Self::Disconnected { .. } => ConnectionStatus::Disconnected,
            Self::Evicted => ConnectionStatus::Evicted,
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One human seat's membership in a room.
#[derive(Debug, Clone)]
pub struct Session {
    pub player_id: PlayerId,
    pub state: SessionState,

    /// 32 hex characters, issued at join and never rotated. A leaked
    /// token stays valid for the life of the room.
    pub reconnect_token: String,
}

impl Session {
    pub fn status(&self) -> ConnectionStatus {
        self.state.status()
    }
}
