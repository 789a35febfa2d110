//! Fixed-interval timer that drives phase deadlines.
//!
//! The room never sleeps until a deadline directly. Instead it checks at a
//! steady cadence (250 ms by default) whether the current phase is due, and
//! performs at most one transition per check. A phase that is overdue by
//! several transitions therefore catches up one step per tick, each step
//! setting its own fresh deadline.
//!
//! # Integration
//!
//! The scheduler sits inside the room actor's `tokio::select!` loop, next
//! to the command queue, so timer work and commands are serialized:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = commands.recv() => { /* apply command */ }
//!         _ = scheduler.wait_for_tick() => {
//!             /* advance the phase if its deadline passed */
//!             scheduler.record_tick_end();
//!         }
//!     }
//! }
//! ```
//!
//! While the room sits in an untimed phase the actor pauses the scheduler,
//! and `wait_for_tick` pends without waking the task at all.

use std::time::{Duration, Instant};

use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the tick scheduler.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Time between two checks.
    pub interval: Duration,
    /// Fraction of `interval` (0.0–1.0) a single tick's work may take
    /// before a warning is logged.
    pub budget_warn_threshold: f64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            interval: Self::DEFAULT_INTERVAL,
            budget_warn_threshold: 0.5,
        }
    }
}

impl TickConfig {
    /// The reference cadence.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(250);
    /// Shortest accepted interval.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(10);
    /// Longest accepted interval. Must stay well below the shortest phase.
    pub const MAX_INTERVAL: Duration = Duration::from_secs(1);

    /// A config ticking every `interval`, other fields at their defaults.
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    /// Clamps out-of-range values. Called by [`TickScheduler::new`].
    pub fn validated(mut self) -> Self {
        let clamped = self.interval.clamp(Self::MIN_INTERVAL, Self::MAX_INTERVAL);
        if clamped != self.interval {
            warn!(
                requested_ms = self.interval.as_millis() as u64,
                clamped_ms = clamped.as_millis() as u64,
                "tick interval out of range, clamping"
            );
            self.interval = clamped;
        }
        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        self
    }
}

// ---------------------------------------------------------------------------
// Tick info
// ---------------------------------------------------------------------------

/// What [`TickScheduler::wait_for_tick`] reports for each tick.
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Monotonically increasing tick number, starting at 1.
    pub tick: u64,
    /// How late the tick fired relative to its schedule.
    pub late_by: Duration,
    /// Whole intervals that elapsed without a tick because the task was
    /// busy or descheduled. They are skipped, never replayed.
    pub skipped: u64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Repeating alarm bound to a room's lifetime.
///
/// Dropping the scheduler cancels it; there is no background task.
pub struct TickScheduler {
    interval: Duration,
    budget_warn_threshold: f64,
    tick_count: u64,
    next_tick: TokioInstant,
    /// Set by `wait_for_tick`, consumed by `record_tick_end`.
    tick_start: Option<Instant>,
    paused: bool,
}

impl TickScheduler {
    /// Creates a running scheduler whose first tick fires one interval
    /// from now.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        debug!(
            interval_ms = config.interval.as_millis() as u64,
            "tick scheduler created"
        );
        Self {
            interval: config.interval,
            budget_warn_threshold: config.budget_warn_threshold,
            tick_count: 0,
            next_tick: TokioInstant::now() + config.interval,
            tick_start: None,
            paused: false,
        }
    }

    /// Creates a scheduler with the given interval and default settings.
    pub fn with_interval(interval: Duration) -> Self {
        Self::new(TickConfig::with_interval(interval))
    }

    /// Waits until the next tick is due.
    ///
    /// When paused this future never resolves, which lets `tokio::select!`
    /// keep serving its other branches. Cancel-safe: dropping the future
    /// before it resolves leaves the schedule untouched.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        if self.paused {
            std::future::pending::<()>().await;
        }

        time::sleep_until(self.next_tick).await;

        let now = TokioInstant::now();
        let late_by = now.saturating_duration_since(self.next_tick);
        let skipped = (late_by.as_nanos() / self.interval.as_nanos()) as u64;
        if skipped > 0 {
            warn!(
                tick = self.tick_count + 1,
                skipped,
                late_ms = late_by.as_millis() as u64,
                "tick overrun, skipping ahead"
            );
        }

        // Reschedule from now, not from the missed slot, so a stall never
        // produces a burst of back-to-back ticks.
        self.next_tick = now + self.interval;
        self.tick_count += 1;
        self.tick_start = Some(Instant::now());
        trace!(tick = self.tick_count, "tick fired");

        TickInfo {
            tick: self.tick_count,
            late_by,
            skipped,
        }
    }

    /// Records that the work for the current tick is done and warns if it
    /// used more than the configured share of the interval.
    pub fn record_tick_end(&mut self) {
        let Some(start) = self.tick_start.take() else {
            return;
        };
        let elapsed = start.elapsed();
        let utilization = elapsed.as_secs_f64() / self.interval.as_secs_f64();
        if utilization >= self.budget_warn_threshold {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                interval_ms = self.interval.as_millis() as u64,
                "tick work exceeded budget"
            );
        }
    }

    /// Stops ticking until [`resume`](Self::resume). Idempotent.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(tick = self.tick_count, "tick scheduler paused");
        }
    }

    /// Restarts ticking one interval from now. Idempotent.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.next_tick = TokioInstant::now() + self.interval;
            debug!(tick = self.tick_count, "tick scheduler resumed");
        }
    }

    /// Pauses or resumes so that the scheduler runs exactly when `active`.
    pub fn set_active(&mut self, active: bool) {
        if active {
            self.resume();
        } else {
            self.pause();
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}
