//! Error types for the room layer.

use soulwell_game::GameError;
use soulwell_protocol::{PlayerId, RoomId};
use soulwell_session::SessionError;

/// Malformed intent, illegal move, wrong turn.
pub const CODE_VALIDATION: u16 = 400;
/// Unknown room or seat.
pub const CODE_NOT_FOUND: u16 = 404;
/// Room full, game already running, seat already taken.
pub const CODE_CONFLICT: u16 = 409;
/// The room failed and was closed.
pub const CODE_INTERNAL: u16 = 500;

/// Errors that can occur during room operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// The room's actor has stopped or its channel is full.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),

    #[error("player {0} is not seated in room {1}")]
    NotInRoom(PlayerId, RoomId),

    #[error(transparent)]
    Game(#[from] GameError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl RoomError {
    /// The `code` sent with the `error` event.
    pub fn code(&self) -> u16 {
        match self {
            Self::NotFound(_) | Self::Unavailable(_) | Self::NotInRoom(..) => CODE_NOT_FOUND,
            Self::Game(e) => match e {
                GameError::RoomFull(_) | GameError::AlreadyStarted | GameError::AlreadySeated(_) => {
                    CODE_CONFLICT
                }
                GameError::PlayerNotFound(_) => CODE_NOT_FOUND,
                GameError::InvariantViolation(_) => CODE_INTERNAL,
                _ => CODE_VALIDATION,
            },
            Self::Session(e) => match e {
                SessionError::NotFound(_) => CODE_NOT_FOUND,
                SessionError::AlreadyConnected(_) | SessionError::AlreadyIssued(_) => CODE_CONFLICT,
                SessionError::InvalidToken | SessionError::Evicted(_) => CODE_VALIDATION,
            },
        }
    }
}
