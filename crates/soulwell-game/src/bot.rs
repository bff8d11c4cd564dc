//! The contract between the room and a bot policy.
//!
//! The room builds a [`MoveRequest`] when a bot's turn comes up, hands it
//! to a [`BotMover`] off the room's executor, and feeds the answer back
//! in as an ordinary move. A mover that is slow, panics, or names an
//! illegal card is replaced by a forced pile pickup; the mover never sees
//! the session itself.

use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use soulwell_protocol::PlayerId;

use crate::card::{Card, CardId, PURIFY_VALUE};
use crate::error::GameError;
use crate::game::GameSession;
use crate::player::{Difficulty, Phase};
use crate::rules::legal_moves;

/// One playable slot. `card` is `None` for face-down slots, which the bot
/// has to pick blind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalMove {
    pub index: usize,
    pub card: Option<Card>,
}

/// Everything a mover is allowed to know about its turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub player_id: PlayerId,
    pub difficulty: Difficulty,
    pub phase: Phase,
    /// Empty means the only option is to take the pile.
    pub legal_moves: Vec<LegalMove>,
    pub top_card: Option<Card>,
    pub may_play_anything: bool,
    pub pile_size: usize,
}

impl MoveRequest {
    /// Builds the request for `player_id`'s current turn.
    ///
    /// In the face-down phase every slot is offered, unrevealed.
    pub fn for_player(game: &GameSession, player_id: PlayerId) -> Result<Self, GameError> {
        let player = game
            .player(player_id)
            .ok_or(GameError::PlayerNotFound(player_id))?;
        let cards = player.active_cards();

        let legal_moves = if player.phase == Phase::FaceDown {
            (0..cards.len())
                .map(|index| LegalMove { index, card: None })
                .collect()
        } else {
            legal_moves(cards, game.pile())
                .into_iter()
                .map(|index| LegalMove {
                    index,
                    card: Some(cards[index].clone()),
                })
                .collect()
        };

        Ok(Self {
            player_id,
            difficulty: player.difficulty.unwrap_or_default(),
            phase: player.phase,
            legal_moves,
            top_card: game.pile().last_played.clone(),
            may_play_anything: game.pile().may_play_anything,
            pile_size: game.pile().len(),
        })
    }
}

/// A mover's answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum BotDecision {
    #[serde(rename_all = "camelCase")]
    Play {
        card_index: usize,
        card_id: Option<CardId>,
    },
    TakePile,
}

impl BotDecision {
    fn play(m: &LegalMove) -> Self {
        Self::Play {
            card_index: m.index,
            card_id: m.card.as_ref().map(|c| c.id),
        }
    }
}

/// A bot policy.
///
/// `decide` runs on a blocking thread and may take as long as it likes;
/// the room stops waiting once the configured budget is spent.
pub trait BotMover: Send + Sync + 'static {
    fn decide(&self, request: &MoveRequest) -> BotDecision;
}

/// The default policy.
///
/// `Easy` plays any legal card at random. `Normal` and `Hard` hold their
/// specials back and play the lowest plain card they can; `Hard` also
/// burns a large tower with a 10 as soon as it has one.
#[derive(Clone, Copy, Debug, Default)]
pub struct CautiousMover;

/// Tower size at which a `Hard` bot spends a 10 eagerly.
const BURN_AT: usize = 6;

impl BotMover for CautiousMover {
    fn decide(&self, request: &MoveRequest) -> BotDecision {
        let moves: &[LegalMove] = &request.legal_moves;
        if moves.is_empty() {
            return BotDecision::TakePile;
        }
        if request.difficulty == Difficulty::Easy {
            return moves
                .choose(&mut rand::rng())
                .map_or(BotDecision::TakePile, BotDecision::play);
        }

        let known = move || moves.iter().filter_map(|m| m.card.as_ref().map(|c| (m, c)));

        if request.difficulty == Difficulty::Hard && request.pile_size >= BURN_AT {
            if let Some((m, _)) = known().find(|(_, c)| c.value == PURIFY_VALUE) {
                return BotDecision::play(m);
            }
        }

        let plain = known()
            .filter(|(_, c)| !c.is_special())
            .min_by_key(|(_, c)| c.value);
        let special = known().min_by_key(|(_, c)| c.value);

        match plain.or(special) {
            Some((m, _)) => BotDecision::play(m),
            // face-down: nothing is known, pick blind
            None => moves
                .choose(&mut rand::rng())
                .map_or(BotDecision::TakePile, BotDecision::play),
        }
    }
}
