//! Error types for the game layer.

use soulwell_protocol::PlayerId;

use crate::game::GameStatus;
use crate::player::Phase;

/// Errors returned by the [`GameSession`](crate::GameSession) orchestrator.
///
/// Every variant except [`InvariantViolation`](Self::InvariantViolation)
/// is a rejection of one intent: the session is left unchanged and only
/// the offending actor hears about it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// The operation needs a game in progress.
    #[error("game is not in progress (status: {0:?})")]
    NotPlaying(GameStatus),

    /// The operation is only valid before the game starts.
    #[error("game has already started")]
    AlreadyStarted,

    #[error("room is full ({0} players)")]
    RoomFull(usize),

    #[error("player {0} is not at this table")]
    PlayerNotFound(PlayerId),

    #[error("player {0} is already seated")]
    AlreadySeated(PlayerId),

    /// The player already escaped and has no cards left to play.
    #[error("player {0} has already escaped")]
    PlayerNotAlive(PlayerId),

    /// The player folded after their grace period ran out.
    #[error("player {0} has been evicted")]
    PlayerEvicted(PlayerId),

    #[error("it is not {0}'s turn")]
    NotYourTurn(PlayerId),

    /// The index (or pinned card id) does not name a card in the
    /// actor's current-phase container.
    #[error("no card at index {index} in {phase}")]
    CardNotFound { index: usize, phase: Phase },

    #[error("cannot play {played} on {top}")]
    IllegalCard { played: u8, top: u8 },

    /// Taking the pile is only allowed when nothing is playable.
    #[error("a legal card is available and must be played")]
    MustPlayLegalCard,

    #[error("only the host can do that")]
    NotHost,

    #[error("not every player is ready")]
    NotAllReady,

    #[error("at least {0} players are needed to start")]
    NotEnoughPlayers(usize),

    #[error("invalid game config: {0}")]
    InvalidConfig(String),

    /// Internal state no longer makes sense. Fatal for the room.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl GameError {
    /// `true` if the room cannot continue after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvariantViolation(_))
    }
}
