//! Codec trait and implementations.
//!
//! A codec turns envelopes into bytes and back. The server is written
//! against the [`Codec`] trait so the JSON codec used by browser clients
//! can be swapped for a binary one without touching the room layer.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to bytes and decodes bytes back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task for the lifetime of the server.
///
/// `decode` asks for `DeserializeOwned` so the decoded intent does not
/// borrow the receive buffer; the buffer is dropped as soon as the intent
/// is routed to its room.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or do not
    /// match the expected shape.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`.
///
/// Browser clients speak JSON, and it keeps frames readable in DevTools.
///
/// ```rust
/// use soulwell_protocol::{Codec, Envelope, JsonCodec};
///
/// let codec = JsonCodec;
/// let envelope = Envelope { seq: 1, timestamp: 5000, payload: "ping".to_string() };
///
/// let bytes = codec.encode(&envelope).unwrap();
/// let decoded: Envelope<String> = codec.decode(&bytes).unwrap();
/// assert_eq!(envelope, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{Envelope, PlayerId};

    #[test]
    fn test_json_codec_decode_garbage_is_decode_error() {
        let result: Result<Envelope<PlayerId>, _> = JsonCodec.decode(b"not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_json_codec_encodes_envelope_fields() {
        let env = Envelope { seq: 3, timestamp: 9, payload: PlayerId(4) };
        let bytes = JsonCodec.encode(&env).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["seq"], 3);
        assert_eq!(value["timestamp"], 9);
        assert_eq!(value["payload"], 4);
    }
}
