//! Wire protocol for the Soulwell card server.
//!
//! This crate holds the pieces every other layer agrees on:
//!
//! - **Identity** ([`PlayerId`], [`RoomId`]) and the public
//!   [`ConnectionStatus`] of a seat.
//! - **Framing** ([`Envelope`]): the sequence-numbered wrapper around
//!   every intent and event.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how envelopes become
//!   bytes.
//!
//! The protocol layer knows nothing about cards or rooms. The intent and
//! event enums live in `soulwell-room`; here they are just a `P` inside an
//! `Envelope<P>`.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope<P>) → Room (intents, events)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{ConnectionStatus, Envelope, PlayerId, RoomId};

/// Version a client must announce in its `hello` intent.
pub const PROTOCOL_VERSION: u32 = 1;
