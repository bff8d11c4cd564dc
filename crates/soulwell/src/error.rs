//! Unified error type for the Soulwell server.

use soulwell_protocol::ProtocolError;
use soulwell_room::RoomError;
use soulwell_transport::TransportError;

/// Top-level error wrapping every layer's error.
///
/// The `#[from]` conversions let `?` lift layer errors without mapping.
#[derive(Debug, thiserror::Error)]
pub enum SoulwellError {
    /// Connection, send or receive failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded, or broke the handshake.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room refused or failed an operation.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The config file could not be read or parsed.
    #[error("invalid config: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err: SoulwellError = TransportError::ConnectionClosed("gone".into()).into();
        assert!(matches!(err, SoulwellError::Transport(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err: SoulwellError = ProtocolError::InvalidMessage("expected hello".into()).into();
        assert!(matches!(err, SoulwellError::Protocol(_)));
    }

    #[test]
    fn test_from_room_error() {
        let err: SoulwellError = RoomError::NotFound(soulwell_protocol::RoomId(1)).into();
        assert!(matches!(err, SoulwellError::Room(_)));
        assert_eq!(err.to_string(), "room R-1 not found");
    }
}
