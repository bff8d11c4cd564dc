//! Per-viewer snapshots of a session.
//!
//! A hand is shown in full only to its owner. Face-down creatures are
//! never shown to anyone, owner included; only their count leaves the
//! server. Soul wells are private the same way.

use serde::{Deserialize, Serialize};
use soulwell_protocol::{ConnectionStatus, PlayerId, RoomId};

use crate::card::Card;
use crate::catalog::DeckType;
use crate::game::{GameSession, GameStatus};
use crate::player::{Difficulty, Phase, Player};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "visibility", rename_all = "camelCase")]
pub enum HandView {
    Full { cards: Vec<Card> },
    Hidden { count: usize },
}

impl HandView {
    pub fn len(&self) -> usize {
        match self {
            Self::Full { cards } => cards.len(),
            Self::Hidden { count } => *count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: PlayerId,
    pub display_name: String,
    pub hand: HandView,
    pub face_up: Vec<Card>,
    pub face_down_count: usize,
    pub soul_well_count: usize,
    pub phase: Phase,
    pub is_ready: bool,
    pub is_alive: bool,
    pub is_bot: bool,
    pub difficulty: Option<Difficulty>,
    pub is_host: bool,
    pub connection_status: ConnectionStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub room_id: RoomId,
    pub status: GameStatus,
    pub deck_type: DeckType,
    pub max_players: usize,
    /// The seat this view was rendered for, if any.
    pub you: Option<PlayerId>,
    pub players: Vec<PlayerView>,
    pub current_player_id: Option<PlayerId>,
    pub turn: u64,
    pub draw_pile_count: usize,
    pub discard_pile: Vec<Card>,
    pub last_played_card: Option<Card>,
    pub next_player_may_play_anything: bool,
    pub winner_id: Option<PlayerId>,
    pub sinner_id: Option<PlayerId>,
}

impl GameSession {
    /// Renders the table as `viewer` is allowed to see it. `None` gives
    /// the fully public view.
    pub fn view_for(&self, viewer: Option<PlayerId>) -> GameView {
        GameView {
            room_id: self.room_id(),
            status: self.status(),
            deck_type: self.config().deck_type,
            max_players: self.config().max_players,
            you: viewer,
            players: self
                .players()
                .iter()
                .map(|p| self.player_view(p, viewer))
                .collect(),
            current_player_id: self.current_player().map(|p| p.id),
            turn: self.turn(),
            draw_pile_count: self.draw_pile_len(),
            discard_pile: self.pile().discard.clone(),
            last_played_card: self.pile().last_played.clone(),
            next_player_may_play_anything: self.pile().may_play_anything,
            winner_id: self.winner(),
            sinner_id: self.sinner(),
        }
    }

    fn player_view(&self, p: &Player, viewer: Option<PlayerId>) -> PlayerView {
        let hand = if viewer == Some(p.id) {
            HandView::Full {
                cards: p.hand.clone(),
            }
        } else {
            HandView::Hidden {
                count: p.hand.len(),
            }
        };
        PlayerView {
            id: p.id,
            display_name: p.display_name.clone(),
            hand,
            face_up: p.face_up.clone(),
            face_down_count: p.face_down.len(),
            soul_well_count: p.soul_well.len(),
            phase: p.phase,
            is_ready: p.is_ready,
            is_alive: p.is_alive,
            is_bot: p.is_bot,
            difficulty: p.difficulty,
            is_host: self.host() == Some(p.id),
            connection_status: p.connection_status,
        }
    }
}
