//! Room configuration and host-editable game settings.

use std::ops::RangeInclusive;
use std::time::Duration;

use nightfall_protocol::{Phase, SettingsView};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Process-level configuration for the room. Fixed for the room's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Players required (all ready) before the host may start.
    pub min_players: usize,

    /// Connections beyond this are refused.
    pub max_players: usize,

    /// Longest accepted display name, in characters.
    pub max_name_len: usize,

    /// Cadence at which phase deadlines are checked.
    pub tick_interval: Duration,

    /// Capacity of the room actor's command queue. Senders wait when full.
    pub channel_size: usize,

    /// Settings the room starts with and keeps across resets.
    pub settings: RoomSettings,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            min_players: 5,
            max_players: 16,
            max_name_len: 18,
            tick_interval: Duration::from_millis(250),
            channel_size: 64,
            settings: RoomSettings::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// RoomSettings
// ---------------------------------------------------------------------------

/// Timing and rule parameters for one game.
///
/// Only the host edits these, and only in the lobby. Every field stays
/// inside its allowed range; [`RoomSettings::apply`] clamps rather than
/// rejects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSettings {
    pub reveal: Duration,
    pub night: Duration,
    pub talk: Duration,
    pub vote: Duration,
    pub hunter: Duration,
    pub wolves_count: u8,
    pub hunter_enabled: bool,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            reveal: Duration::from_secs(8),
            night: Duration::from_secs(20),
            talk: Duration::from_secs(22),
            vote: Duration::from_secs(20),
            hunter: Duration::from_secs(15),
            wolves_count: 1,
            hunter_enabled: true,
        }
    }
}

/// A partial settings edit as sent by the host. `None` keeps the current
/// value. Durations are in seconds and may be anything the client sent;
/// [`RoomSettings::apply`] brings them into range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsUpdate {
    pub reveal_s: Option<i64>,
    pub night_s: Option<i64>,
    pub talk_s: Option<i64>,
    pub vote_s: Option<i64>,
    pub hunter_s: Option<i64>,
    pub wolves_count: Option<i64>,
    pub hunter_enabled: Option<bool>,
}

impl RoomSettings {
    pub const REVEAL_SECS: RangeInclusive<i64> = 3..=30;
    pub const NIGHT_SECS: RangeInclusive<i64> = 10..=120;
    pub const TALK_SECS: RangeInclusive<i64> = 10..=300;
    pub const VOTE_SECS: RangeInclusive<i64> = 10..=120;
    pub const HUNTER_SECS: RangeInclusive<i64> = 5..=60;
    pub const MAX_WOLVES: u8 = 3;

    /// Highest wolf count that still leaves two non-wolves, capped at
    /// [`Self::MAX_WOLVES`]. Never below 1.
    pub fn max_wolves(player_count: usize) -> u8 {
        let room_for = player_count.saturating_sub(2).min(usize::from(Self::MAX_WOLVES));
        (room_for as u8).max(1)
    }

    /// Applies a host edit, clamping every field into range.
    pub fn apply(&mut self, update: &SettingsUpdate, player_count: usize) {
        fn secs(value: Option<i64>, range: &RangeInclusive<i64>, current: Duration) -> Duration {
            value.map_or(current, |s| {
                Duration::from_secs(s.clamp(*range.start(), *range.end()).unsigned_abs())
            })
        }

        self.reveal = secs(update.reveal_s, &Self::REVEAL_SECS, self.reveal);
        self.night = secs(update.night_s, &Self::NIGHT_SECS, self.night);
        self.talk = secs(update.talk_s, &Self::TALK_SECS, self.talk);
        self.vote = secs(update.vote_s, &Self::VOTE_SECS, self.vote);
        self.hunter = secs(update.hunter_s, &Self::HUNTER_SECS, self.hunter);
        if let Some(enabled) = update.hunter_enabled {
            self.hunter_enabled = enabled;
        }
        let upper = Self::max_wolves(player_count);
        self.wolves_count = match update.wolves_count {
            Some(requested) => {
                u8::try_from(requested.clamp(1, i64::from(upper))).unwrap_or(upper)
            }
            None => self.wolves_count.clamp(1, upper),
        };
    }

    /// How long `phase` lasts, or `None` for untimed phases.
    pub fn duration_for(&self, phase: Phase) -> Option<Duration> {
        match phase {
            Phase::Reveal => Some(self.reveal),
            Phase::Night => Some(self.night),
            Phase::DayTalk => Some(self.talk),
            Phase::DayVote => Some(self.vote),
            Phase::HunterShot => Some(self.hunter),
            Phase::Lobby | Phase::GameOver => None,
        }
    }

    pub fn view(&self) -> SettingsView {
        SettingsView {
            reveal_s: self.reveal.as_secs(),
            night_s: self.night.as_secs(),
            talk_s: self.talk.as_secs(),
            vote_s: self.vote.as_secs(),
            hunter_s: self.hunter.as_secs(),
            wolves_count: self.wolves_count,
            hunter_enabled: self.hunter_enabled,
        }
    }
}
