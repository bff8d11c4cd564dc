//! Error types for the session layer.

use soulwell_protocol::PlayerId;

/// Ways a seat's connection bookkeeping can refuse a request.
///
/// All of these are reported to the transport that asked and change
/// nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The room has no seat for this player.
    #[error("no session for player {0}")]
    NotFound(PlayerId),

    /// The token does not match the one issued at join time.
    #[error("invalid reconnection token")]
    InvalidToken,

    /// The grace period ran out; the seat has folded for good.
    #[error("player {0} has been evicted")]
    Evicted(PlayerId),

    /// The seat is still held by a live connection.
    #[error("player {0} is already connected")]
    AlreadyConnected(PlayerId),

    /// A token was already issued for this membership.
    #[error("player {0} already holds a token in this room")]
    AlreadyIssued(PlayerId),
}
