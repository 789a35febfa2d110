//! Wire protocol for Nightfall.
//!
//! This crate defines everything that crosses the connection boundary:
//!
//! - **Types** ([`ClientMessage`], [`ServerMessage`], [`Phase`], [`Role`],
//!   [`PlayerId`], [`Recipient`]): the payloads exchanged with clients.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how payloads are turned
//!   into text frames and back.
//! - **Errors** ([`ProtocolError`]): what can go wrong while doing so.
//!
//! # Architecture
//!
//! The protocol layer sits between the transport (raw text frames) and the
//! room (game rules). It knows nothing about connections or phases'
//! timing, only about shapes on the wire.
//!
//! ```text
//! Transport (frames) → Protocol (ClientMessage) → Room (state machine)
//! Room (ServerMessage, Recipient) → Protocol (frames) → Transport
//! ```
//!
//! Every payload is a JSON object carrying a `type` field, e.g.
//! `{"type":"vote","targetId":3}`.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientMessage, LobbyPlayer, Phase, PlayerId, Recipient, Role,
    ServerMessage, SettingsView, StatePlayer,
};
