//! Connection resilience for Soulwell rooms.
//!
//! Each room owns a [`SessionManager`] for its human seats. It issues the
//! reconnect token at join time, tracks who is connected, checks tokens on
//! reconnect and decides when a dropped player has been gone too long.
//!
//! The manager never schedules anything itself. The room actor starts the
//! grace and inactivity timers from [`ResilienceConfig`] and calls back in
//! when they fire, so every state change happens on the room's executor.

mod error;
mod manager;
mod session;

pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{ResilienceConfig, Session, SessionState};
