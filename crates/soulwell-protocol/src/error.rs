//! Error types for the protocol layer.
//!
//! Each crate defines its own error enum, so a `ProtocolError` always
//! means "the bytes were wrong", never "the move was illegal".

/// Errors that can occur while encoding or decoding envelopes.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (a Rust value could not become bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, a missing field, or an
    /// intent `type` the server does not know.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame decoded but breaks a protocol rule, e.g. the first
    /// intent on a connection is not `hello`.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
