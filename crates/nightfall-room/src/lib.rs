//! The Nightfall room: one game session and its phase state machine.
//!
//! A single room runs as an isolated Tokio task (actor model). It owns the
//! players, the settings and the phase state, and is driven by exactly two
//! event sources: client commands arriving on its queue and a fixed-interval
//! timer that advances phases whose deadline has passed.
//!
//! # Key types
//!
//! - [`Game`]: the rules (role dealing, night kill, vote, hunter shot,
//!   win check and command validation). Synchronous and runtime-free.
//! - [`RoomHandle`] / [`spawn_room`]: the actor wrapping a `Game`
//! - [`PlayerRegistry`]: the connected players
//! - [`RoomSettings`]: host-editable timings and rules
//! - [`RoomConfig`]: process-level limits (player caps, tick interval)

mod commands;
mod config;
mod engine;
mod error;
mod game;
mod player;
mod room;
mod state;

pub use config::{RoomConfig, RoomSettings, SettingsUpdate};
pub use engine::{HUNTER_MIN_PLAYERS, WinRule, Winner, tally};
pub use error::{CommandError, RoomError};
pub use game::{Game, Outbox, RoomInfo};
pub use player::{Player, PlayerRegistry};
pub use room::{PlayerSender, RoomHandle, spawn_room};
pub use state::RoomState;
