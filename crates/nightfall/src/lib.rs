//! # Nightfall
//!
//! Real-time party-game server. Players connect over WebSocket, the host
//! starts a game, secret roles are dealt, and the room cycles through
//! timed night and day phases until one side wins.
//!
//! The crates underneath:
//!
//! - `nightfall-transport` accepts connections and moves text frames
//! - `nightfall-protocol` defines the JSON payloads
//! - `nightfall-room` runs the game as a single actor task
//! - `nightfall-tick` drives phase deadlines
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nightfall::prelude::*;
//!
//! # async fn run() -> Result<(), ServerError> {
//! let server = NightfallServer::builder()
//!     .bind("0.0.0.0:10000")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::ServerError;
pub use server::{DEFAULT_PORT, NightfallServer, NightfallServerBuilder, ServerConfig};

/// Everything needed to run a server or talk to its room.
pub mod prelude {
    pub use crate::{NightfallServer, NightfallServerBuilder, ServerConfig, ServerError};
    pub use nightfall_protocol::{
        ClientMessage, Codec, JsonCodec, Phase, PlayerId, Role, ServerMessage,
    };
    pub use nightfall_room::{RoomConfig, RoomHandle, RoomInfo, RoomSettings};
}
