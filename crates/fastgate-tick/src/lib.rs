//! Main-loop clock for Fastgate.
//!
//! Game servers run their logic on a fixed-rate tick loop (20 Hz for the
//! servers Fastgate targets) and express delays in ticks. The gate's main
//! loop mirrors that: a [`TickScheduler`] fires at the server's rate and
//! a [`TaskQueue`] holds work that should run "N ticks from now".
//!
//! # Integration
//!
//! Both sit inside the gate's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle events */ }
//!         tick = scheduler.wait_for_tick() => {
//!             for task in queue.drain_due(tick.tick) { /* run task */ }
//!         }
//!     }
//! }
//! ```

mod queue;

pub use queue::TaskQueue;

use std::time::Duration;

use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the tick clock.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Tick rate in Hz. Clamped to `1..=MAX_TICK_RATE_HZ`.
    pub tick_rate_hz: u32,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: Self::DEFAULT_TICK_RATE_HZ,
        }
    }
}

impl TickConfig {
    /// The rate game servers tick at.
    pub const DEFAULT_TICK_RATE_HZ: u32 = 20;

    /// Maximum supported tick rate.
    pub const MAX_TICK_RATE_HZ: u32 = 128;

    /// Create a config for a specific tick rate.
    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self { tick_rate_hz }
    }

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`TickScheduler::new`]. A rate of 0 would
    /// never fire delayed tasks, so it is raised to 1.
    pub fn validated(mut self) -> Self {
        if self.tick_rate_hz > Self::MAX_TICK_RATE_HZ {
            warn!(
                rate = self.tick_rate_hz,
                max = Self::MAX_TICK_RATE_HZ,
                "tick_rate_hz exceeds maximum, clamping"
            );
            self.tick_rate_hz = Self::MAX_TICK_RATE_HZ;
        }
        if self.tick_rate_hz == 0 {
            warn!("tick_rate_hz is 0, using 1");
            self.tick_rate_hz = 1;
        }
        self
    }

    /// Duration of a single tick.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate_hz.max(1) as f64)
    }
}

// ---------------------------------------------------------------------------
// Tick info (returned to caller each tick)
// ---------------------------------------------------------------------------

/// Information about a tick, returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Monotonically increasing tick number (starts at 1).
    pub tick: u64,
    /// How many tick slots were skipped because the loop woke up late.
    pub ticks_skipped: u64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fixed-rate tick clock.
///
/// When the loop falls behind, missed ticks are skipped rather than
/// replayed: the next tick is scheduled from "now". Delayed tasks never
/// run early, they just run on the first tick at or after their due tick.
pub struct TickScheduler {
    tick_duration: Duration,
    tick_count: u64,
    /// When the next tick should fire (Tokio instant for `sleep_until`).
    next_tick: TokioInstant,
}

impl TickScheduler {
    /// Create a new scheduler from config. The first tick fires one tick
    /// duration from now.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let tick_duration = config.tick_duration();

        debug!(
            rate_hz = config.tick_rate_hz,
            tick_ms = tick_duration.as_secs_f64() * 1000.0,
            "tick scheduler created"
        );

        Self {
            tick_duration,
            tick_count: 0,
            next_tick: TokioInstant::now() + tick_duration,
        }
    }

    /// Create a scheduler for a specific tick rate.
    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self::new(TickConfig::with_rate(tick_rate_hz))
    }

    /// Wait until the next tick is due.
    ///
    /// Cancel-safe: if the future is dropped inside `select!`, no tick is
    /// consumed and the deadline is unchanged.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        time::sleep_until(self.next_tick).await;

        let now = TokioInstant::now();
        let late_by = now.saturating_duration_since(self.next_tick);
        let ticks_skipped = (late_by.as_nanos() / self.tick_duration.as_nanos()) as u64;

        self.tick_count += 1;
        if ticks_skipped > 0 {
            warn!(
                tick = self.tick_count,
                skipped = ticks_skipped,
                late_ms = late_by.as_secs_f64() * 1000.0,
                "main loop overrun, skipping ahead"
            );
        }
        // Always schedule from now, not from the missed deadline.
        self.next_tick = now + self.tick_duration;

        trace!(tick = self.tick_count, "tick fired");

        TickInfo {
            tick: self.tick_count,
            ticks_skipped,
        }
    }

    /// Current tick count.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// The fixed tick duration.
    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }
}
