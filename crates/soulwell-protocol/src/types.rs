//! Types that travel on the wire regardless of which room or intent is
//! involved.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A stable identifier for a seated player.
///
/// Issued once when the player joins a room and kept across reconnects;
/// a new socket gets a new connection id but the same `PlayerId`.
///
/// `#[serde(transparent)]` keeps it a plain number in JSON (`42`, not
/// `{"0":42}`), which is what the browser client stores alongside its
/// reconnect token.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// Identifies one room: one table, one game session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ConnectionStatus
// ---------------------------------------------------------------------------

/// What the rest of the table sees about a seat's connection.
///
/// ```text
///   Connected ──(transport lost)──→ Disconnected ──(grace expired)──→ Evicted
///       ↑                                │
///       └───────────(reconnect)──────────┘
/// ```
///
/// `Evicted` is terminal: the seat folds and can never act again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionStatus {
    #[default]
    Connected,
    Disconnected,
    Evicted,
}

impl ConnectionStatus {
    /// `true` while the seat still takes part in turn rotation
    /// (connected, or disconnected but inside the grace period).
    pub fn in_rotation(self) -> bool {
        !matches!(self, Self::Evicted)
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The top-level frame. Every message on the wire is an `Envelope`.
///
/// ```text
/// ┌──────────────────────────────────┐
/// │ seq: 42                          │  ← per-direction counter
/// │ timestamp: 15000                 │  ← ms since the server started
/// │ ┌──────────────────────────────┐ │
/// │ │ payload: {"type":"playCard"} │ │  ← intent or event
/// │ └──────────────────────────────┘ │
/// └──────────────────────────────────┘
/// ```
///
/// Clients may omit `seq`/`timestamp`; both default to 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<P> {
    /// Auto-incrementing sequence number, maintained by each side.
    #[serde(default)]
    pub seq: u64,

    /// Milliseconds since the sender started.
    #[serde(default)]
    pub timestamp: u64,

    /// The intent (client → server) or event (server → client).
    pub payload: P,
}

impl<P> Envelope<P> {
    /// Wraps a payload with the given sequence number and timestamp.
    pub fn new(seq: u64, timestamp: u64, payload: P) -> Self {
        Self { seq, timestamp, payload }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&PlayerId(42)).unwrap();
        assert_eq!(json, "42");
        let back: PlayerId = serde_json::from_str("42").unwrap();
        assert_eq!(back, PlayerId(42));
    }

    #[test]
    fn test_ids_display() {
        assert_eq!(PlayerId(7).to_string(), "P-7");
        assert_eq!(RoomId(3).to_string(), "R-3");
    }

    #[test]
    fn test_connection_status_serializes_camel_case() {
        let json = serde_json::to_string(&ConnectionStatus::Disconnected).unwrap();
        assert_eq!(json, "\"disconnected\"");
    }

    #[test]
    fn test_connection_status_in_rotation() {
        assert!(ConnectionStatus::Connected.in_rotation());
        assert!(ConnectionStatus::Disconnected.in_rotation());
        assert!(!ConnectionStatus::Evicted.in_rotation());
    }

    #[test]
    fn test_envelope_seq_and_timestamp_default_when_missing() {
        let env: Envelope<String> =
            serde_json::from_str(r#"{"payload":"hello"}"#).unwrap();
        assert_eq!(env.seq, 0);
        assert_eq!(env.timestamp, 0);
        assert_eq!(env.payload, "hello");
    }

    #[test]
    fn test_envelope_missing_payload_is_error() {
        let result: Result<Envelope<String>, _> =
            serde_json::from_str(r#"{"seq":1,"timestamp":100}"#);
        assert!(result.is_err());
    }
}
