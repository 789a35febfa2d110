//! Unified error type for the Nightfall server.

use nightfall_protocol::ProtocolError;
use nightfall_room::RoomError;
use nightfall_transport::TransportError;

/// Top-level error that wraps every layer's error.
///
/// `#[from]` on each variant lets `?` convert layer errors directly.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Binding, accepting or talking to a connection failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A payload could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The room refused the connection or is gone.
    #[error(transparent)]
    Room(#[from] RoomError),
}
