//! The room's whole game: players, settings and phase state.
//!
//! [`Game`] is plain data plus synchronous methods. It never awaits and
//! never touches a channel; every method returns an [`Outbox`] of
//! `(Recipient, ServerMessage)` pairs and the room actor delivers them.
//! That keeps the rules testable without a runtime.
//!
//! The methods are split across modules:
//!
//! - `engine`: phase transitions and resolutions (night, vote, hunter
//!   shot, win check)
//! - `commands`: connect, disconnect and client command validation

use std::time::Duration;

use nightfall_protocol::{
    LobbyPlayer, Phase, PlayerId, Recipient, ServerMessage, StatePlayer,
};
use tokio::time::Instant;

use crate::config::{RoomConfig, RoomSettings};
use crate::player::{Player, PlayerRegistry};
use crate::state::RoomState;

/// Payloads produced by one step of the game, in send order.
pub type Outbox = Vec<(Recipient, ServerMessage)>;

/// A point-in-time snapshot of the room for diagnostics and tests.
///
/// Unlike the `state` payload, this includes roles.
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub phase: Phase,
    pub day: u32,
    pub host_id: Option<PlayerId>,
    pub seed: u32,
    /// Time left in the current phase, `None` when untimed.
    pub deadline_in: Option<Duration>,
    pub hunter_shooter_id: Option<PlayerId>,
    pub pending_after_phase: Option<Phase>,
    pub settings: RoomSettings,
    pub players: Vec<Player>,
}

impl RoomInfo {
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }
}

/// One room's game.
#[derive(Debug)]
pub struct Game {
    pub(crate) config: RoomConfig,
    pub(crate) settings: RoomSettings,
    pub(crate) players: PlayerRegistry,
    pub(crate) state: RoomState,
}

impl Game {
    pub fn new(config: RoomConfig) -> Self {
        let settings = config.settings.clone();
        Self {
            config,
            settings,
            players: PlayerRegistry::new(),
            state: RoomState::new(),
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    pub fn settings(&self) -> &RoomSettings {
        &self.settings
    }

    pub fn players(&self) -> &PlayerRegistry {
        &self.players
    }

    pub fn state(&self) -> &RoomState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn lobby_view(&self) -> ServerMessage {
        ServerMessage::Lobby {
            host_id: self.state.host_id,
            phase: self.state.phase,
            players: self
                .players
                .iter()
                .map(|p| LobbyPlayer {
                    id: p.id,
                    name: p.name.clone(),
                    ready: p.ready,
                })
                .collect(),
            settings: self.settings.view(),
            all_ready: self.players.all_ready(),
            min_players: self.config.min_players,
        }
    }

    pub fn state_view(&self, now: Instant) -> ServerMessage {
        ServerMessage::State {
            phase: self.state.phase,
            day: self.state.day,
            players: self
                .players
                .iter()
                .map(|p| StatePlayer {
                    id: p.id,
                    name: p.name.clone(),
                    alive: p.alive,
                })
                .collect(),
            hunter_shooter_id: self.state.hunter_shooter_id,
            ends_in_ms: self
                .state
                .ends_in(now)
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
        }
    }

    pub fn info(&self, now: Instant) -> RoomInfo {
        RoomInfo {
            phase: self.state.phase,
            day: self.state.day,
            host_id: self.state.host_id,
            seed: self.state.seed,
            deadline_in: self.state.ends_in(now),
            hunter_shooter_id: self.state.hunter_shooter_id,
            pending_after_phase: self.state.pending_after_phase,
            settings: self.settings.clone(),
            players: self.players.iter().cloned().collect(),
        }
    }

    /// Switches phase using the configured duration for it.
    pub(crate) fn enter(&mut self, phase: Phase, now: Instant) {
        let duration = self.settings.duration_for(phase);
        self.state.enter(phase, duration, now);
        tracing::info!(phase = %phase, day = self.state.day, "phase entered");
    }
}

pub(crate) fn log(text: impl Into<String>) -> (Recipient, ServerMessage) {
    log_to(Recipient::All, text, false)
}

pub(crate) fn log_emph(text: impl Into<String>) -> (Recipient, ServerMessage) {
    log_to(Recipient::All, text, true)
}

pub(crate) fn log_to(
    to: Recipient,
    text: impl Into<String>,
    emph: bool,
) -> (Recipient, ServerMessage) {
    (
        to,
        ServerMessage::Log {
            text: text.into(),
            emph,
        },
    )
}
