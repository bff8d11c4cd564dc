//! Room configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use soulwell_game::{DeckType, Difficulty, GameConfig};
use soulwell_session::ResilienceConfig;

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Server-wide settings every room is spawned with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RoomConfig {
    /// Start as soon as every seat is ready, without waiting for the
    /// host's `startGame`.
    pub auto_start: bool,

    /// How long a bot pretends to think before its mover is asked.
    pub bot_think_ms: u64,

    /// Random spread added to or taken from `bot_think_ms`.
    pub bot_jitter_ms: u64,

    /// How long the mover may take before the bot picks up the pile.
    pub bot_budget_ms: u64,

    /// Grace and inactivity windows for dropped players.
    pub resilience: ResilienceConfig,

    /// Capacity of each room's command channel.
    pub channel_size: usize,

    /// Fixed shuffle seed for every room. Tests only.
    pub seed: Option<u64>,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            auto_start: false,
            bot_think_ms: 800,
            bot_jitter_ms: 300,
            bot_budget_ms: 2_000,
            resilience: ResilienceConfig::default(),
            channel_size: 64,
            seed: None,
        }
    }
}

impl RoomConfig {
    pub fn bot_think(&self) -> Duration {
        Duration::from_millis(self.bot_think_ms)
    }

    pub fn bot_jitter(&self) -> Duration {
        Duration::from_millis(self.bot_jitter_ms)
    }

    pub fn bot_budget(&self) -> Duration {
        Duration::from_millis(self.bot_budget_ms)
    }
}

// ---------------------------------------------------------------------------
// RoomSettings
// ---------------------------------------------------------------------------

/// How a room's seats are filled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum GameMode {
    /// Humans only, until the host adds bots.
    #[default]
    Multiplayer,
    /// The creator against `bots` computer players.
    VsBots {
        bots: usize,
        #[serde(default)]
        difficulty: Difficulty,
    },
}

/// Per-room choices made by whoever creates the room.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomSettings {
    /// `None` takes the table default.
    pub max_players: Option<usize>,
    pub deck_type: DeckType,
    pub mode: GameMode,
}

impl RoomSettings {
    /// The game rules for a room with these settings. A vs-bots table
    /// always has room for the creator and every bot.
    pub fn game_config(&self, seed: Option<u64>) -> GameConfig {
        let defaults = GameConfig::default();
        let mut max_players = self.max_players.unwrap_or(defaults.max_players);
        if let GameMode::VsBots { bots, .. } = self.mode {
            max_players = max_players.max(bots + 1);
        }
        GameConfig {
            deck_type: self.deck_type,
            max_players,
            seed,
            ..defaults
        }
    }
}
