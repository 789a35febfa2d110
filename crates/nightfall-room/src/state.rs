//! Phase bookkeeping and the per-game random generator.

use std::collections::BTreeMap;
use std::time::Duration;

use nightfall_protocol::{Phase, PlayerId};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::time::Instant;

/// Where the room is in the game and what it is waiting for.
///
/// Invariants:
/// - `deadline` is `None` exactly when `phase` is untimed.
/// - `votes` is emptied on every entry into `DayVote`, `wolf_target` on
///   every entry into `Night`.
/// - `rng` is seeded from `seed` once per game; every random choice the
///   engine makes draws from it, so a game replays from its seed.
#[derive(Debug)]
pub struct RoomState {
    pub(crate) phase: Phase,
    pub(crate) day: u32,
    pub(crate) deadline: Option<Instant>,
    pub(crate) host_id: Option<PlayerId>,
    pub(crate) wolf_target: Option<PlayerId>,
    /// voter → target
    pub(crate) votes: BTreeMap<PlayerId, PlayerId>,
    pub(crate) hunter_shooter_id: Option<PlayerId>,
    /// Where to go once the hunter interrupt resolves.
    pub(crate) pending_after_phase: Option<Phase>,
    pub(crate) pending_after_day: u32,
    pub(crate) seed: u32,
    pub(crate) rng: StdRng,
}

impl RoomState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Lobby,
            day: 1,
            deadline: None,
            host_id: None,
            wolf_target: None,
            votes: BTreeMap::new(),
            hunter_shooter_id: None,
            pending_after_phase: None,
            pending_after_day: 1,
            seed: 0,
            rng: StdRng::seed_from_u64(0),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn host_id(&self) -> Option<PlayerId> {
        self.host_id
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn hunter_shooter_id(&self) -> Option<PlayerId> {
        self.hunter_shooter_id
    }

    pub fn wolf_target(&self) -> Option<PlayerId> {
        self.wolf_target
    }

    pub fn votes(&self) -> &BTreeMap<PlayerId, PlayerId> {
        &self.votes
    }

    /// Starts a fresh game: new seed and generator, day 1, nothing pending.
    pub(crate) fn begin_game(&mut self, seed: u32) {
        self.seed = seed;
        self.rng = StdRng::seed_from_u64(u64::from(seed));
        self.day = 1;
        self.wolf_target = None;
        self.votes.clear();
        self.clear_interrupt();
    }

    /// Switches to `phase` with a deadline `duration` from `now`.
    pub(crate) fn enter(&mut self, phase: Phase, duration: Option<Duration>, now: Instant) {
        self.phase = phase;
        self.deadline = if phase.is_timed() {
            duration.map(|d| now + d)
        } else {
            None
        };
        match phase {
            Phase::Night => self.wolf_target = None,
            Phase::DayVote => self.votes.clear(),
            _ => {}
        }
    }

    /// Records the phase the engine was about to enter when a hunter died.
    pub(crate) fn suspend(&mut self, shooter: PlayerId, resume: Phase, resume_day: u32) {
        self.hunter_shooter_id = Some(shooter);
        self.pending_after_phase = Some(resume);
        self.pending_after_day = resume_day;
    }

    pub(crate) fn clear_interrupt(&mut self) {
        self.hunter_shooter_id = None;
        self.pending_after_phase = None;
        self.pending_after_day = self.day;
    }

    /// `true` once the current phase's deadline has passed.
    pub fn is_due(&self, now: Instant) -> bool {
        self.phase.is_timed() && self.deadline.is_some_and(|d| now >= d)
    }

    pub fn ends_in(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }

    /// Drops every reference to a departed player.
    pub(crate) fn forget(&mut self, id: PlayerId) {
        self.votes.retain(|voter, target| *voter != id && *target != id);
        if self.wolf_target == Some(id) {
            self.wolf_target = None;
        }
    }

    /// Back to an untimed lobby. Host and seed survive.
    pub(crate) fn reset_to_lobby(&mut self) {
        self.phase = Phase::Lobby;
        self.day = 1;
        self.deadline = None;
        self.wolf_target = None;
        self.votes.clear();
        self.clear_interrupt();
    }
}

impl Default for RoomState {
    fn default() -> Self {
        Self::new()
    }
}
