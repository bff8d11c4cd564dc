//! # Soulwell
//!
//! Authoritative server for Soulwell, a turn-based card game played over
//! WebSockets.
//!
//! The server owns every table. Clients send intents (`playCard`,
//! `takeDiscardPile`, ...) and receive events rendered for their own seat;
//! nothing a client says is trusted until the table's room actor has
//! checked it against the rules and the turn order.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use soulwell::prelude::*;
//!
//! # async fn run() -> Result<(), SoulwellError> {
//! let server = SoulwellServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::SoulwellError;
pub use server::{ServerConfig, SoulwellServer, SoulwellServerBuilder};

/// The types most servers and tests need.
pub mod prelude {
    pub use crate::{ServerConfig, SoulwellError, SoulwellServer, SoulwellServerBuilder};
    pub use soulwell_game::{BotDecision, BotMover, CautiousMover, DeckType, Difficulty, GameView, MoveRequest};
    pub use soulwell_protocol::{Envelope, PROTOCOL_VERSION, PlayerId, RoomId};
    pub use soulwell_room::{ClientIntent, GameMode, RoomConfig, RoomInfo, ServerEvent};
}
