//! Codec trait and implementations for turning payloads into frames.
//!
//! Connections carry text frames, so a codec maps between Rust values and
//! `String`s. The room and the connection handler only ever see the
//! [`Codec`] trait; which format sits behind it is a server-level choice.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Encodes outbound payloads and decodes inbound frames.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a text frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value cannot be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Parses a text frame into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the frame is malformed or does
    /// not match the expected shape.
    fn decode<T: DeserializeOwned>(&self, frame: &str) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`, producing compact JSON documents.
///
/// ```rust
/// use nightfall_protocol::{ClientMessage, Codec, JsonCodec, PlayerId};
///
/// let codec = JsonCodec;
/// let msg: ClientMessage = codec.decode(r#"{"type":"vote","targetId":3}"#).unwrap();
/// assert_eq!(msg, ClientMessage::Vote { target_id: PlayerId(3) });
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, frame: &str) -> Result<T, ProtocolError> {
        serde_json::from_str(frame).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ClientMessage, PlayerId, ServerMessage};

    #[test]
    fn test_json_codec_decodes_client_command() {
        let msg: ClientMessage = JsonCodec
            .decode(r#"{"type":"wolfKill","targetId":4}"#)
            .unwrap();
        assert_eq!(msg, ClientMessage::WolfKill { target_id: PlayerId(4) });
    }

    #[test]
    fn test_json_codec_encodes_compact_json() {
        let frame = JsonCodec
            .encode(&ServerMessage::Log { text: "hi".into(), emph: false })
            .unwrap();
        assert_eq!(frame, r#"{"type":"log","text":"hi","emph":false}"#);
    }

    #[test]
    fn test_json_codec_rejects_garbage() {
        let result: Result<ClientMessage, _> = JsonCodec.decode("not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_json_codec_rejects_non_object() {
        let result: Result<ClientMessage, _> = JsonCodec.decode("[1,2,3]");
        assert!(result.is_err());
    }
}
