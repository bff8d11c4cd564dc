//! Rooms for Soulwell.
//!
//! Each room runs as an isolated Tokio task that owns one
//! [`GameSession`](soulwell_game::GameSession), the room's reconnect
//! sessions and its timers. Everything that changes a table goes through
//! the room's command channel, one command at a time.
//!
//! # Key types
//!
//! - [`RoomManager`]: creates, lists and destroys rooms
//! - [`RoomHandle`]: talk to a running room
//! - [`ClientIntent`] / [`ServerEvent`]: the wire vocabulary
//! - [`RoomConfig`]: server-wide room settings (bot timing, resilience)

mod config;
mod error;
mod manager;
mod messages;
mod room;

pub use config::{GameMode, RoomConfig, RoomSettings};
pub use error::{CODE_CONFLICT, CODE_INTERNAL, CODE_NOT_FOUND, CODE_VALIDATION, RoomError};
pub use manager::RoomManager;
pub use messages::{ClientIntent, PlayerAction, RoomInfo, ServerEvent};
pub use room::{PlayerSender, RoomHandle, Seat};
