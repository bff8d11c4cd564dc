//! Game rules for Soulwell.
//!
//! Everything here is synchronous and owns no I/O. The room layer drives
//! it one intent at a time.
//!
//! # Layers
//!
//! - [`card`] and [`catalog`]: immutable card definitions and the three
//!   thematic decks.
//! - [`deck`]: shuffle and draw.
//! - [`player`]: one seat's containers and phase.
//! - [`rules`]: pure legality, purification and effect evaluation.
//! - [`GameSession`]: the turn state machine that applies rule outcomes.
//! - [`bot`]: the request/decision contract for bot policies.
//!
//! # Example
//!
//! ```
//! use soulwell_game::{GameConfig, GameSession, GameStatus, Player};
//! use soulwell_protocol::{PlayerId, RoomId};
//!
//! let config = GameConfig { seed: Some(1), ..GameConfig::default() };
//! let mut game = GameSession::new(RoomId(1), config).unwrap();
//! for id in [PlayerId(1), PlayerId(2)] {
//!     game.add_player(Player::human(id, "someone")).unwrap();
//!     game.set_ready(id, true).unwrap();
//! }
//! game.start(Some(PlayerId(1))).unwrap();
//!
//! assert_eq!(game.status(), GameStatus::Playing);
//! assert_eq!(game.current_player().map(|p| p.id), Some(PlayerId(1)));
//! ```

pub mod bot;
pub mod card;
pub mod catalog;
pub mod deck;
mod error;
mod game;
pub mod player;
pub mod rules;
mod view;

pub use bot::{BotDecision, BotMover, CautiousMover, LegalMove, MoveRequest};
pub use card::{Card, CardId, CardKind, Effect};
pub use catalog::DeckType;
pub use deck::Deck;
pub use error::GameError;
pub use game::{GameConfig, GameEvent, GameSession, GameStatus, MIN_PLAYERS};
pub use player::{Difficulty, Phase, Player};
pub use rules::{EffectDelta, Pile};
pub use view::{GameView, HandView, PlayerView};
