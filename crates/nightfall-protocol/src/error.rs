//! Error types for the protocol layer.
//!
//! A `ProtocolError` always means the problem is in (de)serialization,
//! never in networking or game rules.

/// Errors that can occur while encoding or decoding payloads.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization of an outbound payload failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// An inbound frame is not a well-formed payload: malformed JSON,
    /// a missing or unknown `type`, or fields of the wrong shape.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame parsed but is not acceptable at the protocol level,
    /// e.g. a binary frame where text was expected.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
