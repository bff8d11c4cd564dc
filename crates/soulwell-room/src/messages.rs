//! What clients send and what the server sends back.
//!
//! Both enums are internally tagged on `type` with camelCase names, so a
//! frame looks like:
//!
//! ```json
//! {"seq": 3, "timestamp": 0, "payload": {"type": "playCard", "cardIndex": 1}}
//! ```

use serde::{Deserialize, Serialize};
use soulwell_game::{Card, CardId, DeckType, Difficulty, GameStatus, GameView};
use soulwell_protocol::{PlayerId, RoomId};

use crate::{GameMode, RoomError, RoomSettings};

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Every intent a client can send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientIntent {
    /// First frame on every connection.
    Hello { version: u32 },

    #[serde(rename_all = "camelCase")]
    CreateRoom {
        player_name: String,
        #[serde(default)]
        max_players: Option<usize>,
        #[serde(default)]
        deck_type: DeckType,
        #[serde(default)]
        mode: GameMode,
    },

    #[serde(rename_all = "camelCase")]
    JoinRoom { room_id: RoomId, player_name: String },

    SetReady { ready: bool },

    StartGame,

    AddBot {
        #[serde(default)]
        difficulty: Difficulty,
    },

    #[serde(rename_all = "camelCase")]
    PlayCard {
        card_index: usize,
        #[serde(default)]
        card_id: Option<CardId>,
        #[serde(default)]
        target_player_id: Option<PlayerId>,
    },

    TakeDiscardPile,

    #[serde(rename_all = "camelCase")]
    Reconnect {
        room_id: RoomId,
        player_id: PlayerId,
        token: String,
    },

    LeaveRoom,

    ListRooms,

    #[serde(rename_all = "camelCase")]
    Heartbeat {
        #[serde(default)]
        client_time: u64,
    },
}

impl ClientIntent {
    /// Splits off the intents a seated player sends to their room.
    /// Anything else comes back unchanged for the connection to handle.
    pub fn into_action(self) -> Result<PlayerAction, ClientIntent> {
        Ok(match self {
            Self::SetReady { ready } => PlayerAction::SetReady { ready },
            Self::StartGame => PlayerAction::StartGame,
            Self::AddBot { difficulty } => PlayerAction::AddBot { difficulty },
            Self::PlayCard {
                card_index,
                card_id,
                target_player_id,
            } => PlayerAction::PlayCard {
                card_index,
                card_id,
                target: target_player_id,
            },
            Self::TakeDiscardPile => PlayerAction::TakeDiscardPile,
            other => return Err(other),
        })
    }

    /// The room settings a `createRoom` asks for.
    pub fn room_settings(&self) -> Option<RoomSettings> {
        match self {
            Self::CreateRoom {
                max_players,
                deck_type,
                mode,
                ..
            } => Some(RoomSettings {
                max_players: *max_players,
                deck_type: *deck_type,
                mode: *mode,
            }),
            _ => None,
        }
    }
}

/// An intent bound for the seat's room actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerAction {
    SetReady {
        ready: bool,
    },
    StartGame,
    AddBot {
        difficulty: Difficulty,
    },
    PlayCard {
        card_index: usize,
        card_id: Option<CardId>,
        target: Option<PlayerId>,
    },
    TakeDiscardPile,
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Room metadata for lobby listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub status: GameStatus,
    pub player_count: usize,
    pub max_players: usize,
    pub deck_type: DeckType,
    pub host_name: Option<String>,
}

impl RoomInfo {
    pub fn is_joinable(&self) -> bool {
        self.status == GameStatus::Waiting && self.player_count < self.max_players
    }
}

/// Every event the server sends.
///
/// State-carrying events hold a [`GameView`] rendered for the receiving
/// seat, so the same event differs per recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    Welcome { protocol_version: u32 },

    #[serde(rename_all = "camelCase")]
    RoomCreated {
        room_id: RoomId,
        player_id: PlayerId,
        token: String,
        state: GameView,
    },

    #[serde(rename_all = "camelCase")]
    RoomJoined {
        room_id: RoomId,
        player_id: PlayerId,
        token: String,
        state: GameView,
    },

    GameStarted { state: GameView },

    GameStateUpdate { state: GameView },

    #[serde(rename_all = "camelCase")]
    CardPlayed {
        player_id: PlayerId,
        card: Card,
        was_purified: bool,
        skipped_player_id: Option<PlayerId>,
        target_player_id: Option<PlayerId>,
        custom_effect: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    DiscardPileTaken {
        player_id: PlayerId,
        count: usize,
        forced: bool,
    },

    #[serde(rename_all = "camelCase")]
    TurnPassed { player_id: PlayerId },

    #[serde(rename_all = "camelCase")]
    PlayerEscaped { player_id: PlayerId, place: usize },

    #[serde(rename_all = "camelCase")]
    GameOver {
        winner_id: Option<PlayerId>,
        sinner_id: Option<PlayerId>,
    },

    #[serde(rename_all = "camelCase")]
    ReconnectionSuccess {
        room_id: RoomId,
        player_id: PlayerId,
        state: GameView,
    },

    ReconnectionFailed { message: String },

    #[serde(rename_all = "camelCase")]
    PlayerDisconnected { player_id: PlayerId },

    #[serde(rename_all = "camelCase")]
    PlayerReconnected { player_id: PlayerId },

    #[serde(rename_all = "camelCase")]
    PlayerRemoved { player_id: PlayerId },

    #[serde(rename_all = "camelCase")]
    RoomClosed { room_id: RoomId, reason: String },

    RoomList { rooms: Vec<RoomInfo> },

    #[serde(rename_all = "camelCase")]
    HeartbeatAck { client_time: u64, server_time: u64 },

    Error { code: u16, message: String },
}

impl ServerEvent {
    pub fn error(code: u16, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }
}

impl From<&RoomError> for ServerEvent {
    fn from(err: &RoomError) -> Self {
        Self::error(err.code(), err.to_string())
    }
}
