//! Periodic reconnect timer for Spyglass.
//!
//! While a session has lost its connection, the timer fires once per
//! interval (1 s by default) and the session makes one reconnect attempt
//! per firing. Once the connection is back, the timer is disarmed.
//!
//! # Disarmed mode
//!
//! A disarmed timer's [`ReconnectTimer::wait_for_tick`] pends forever, so
//! it can sit in a `tokio::select!` loop unconditionally.
//!
//! # Integration
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         event = channel.next_event() => { /* may arm or disarm */ }
//!         _ = timer.wait_for_tick() => reconciler.on_timer_tick(),
//!     }
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the reconnect timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerConfig {
    /// Time between reconnect attempts.
    pub interval: Duration,
    /// Random delay (0..=jitter) added to the *first* firing after arming, so
    /// many clients dropped by the same server restart don't reconnect in
    /// lockstep. Zero disables it.
    pub jitter: Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            interval: Self::DEFAULT_INTERVAL,
            jitter: Duration::ZERO,
        }
    }
}

impl TimerConfig {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

    /// Shortest interval accepted. Anything lower would spin on a dead
    /// server.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    /// Jitter below this is treated as none.
    pub const MIN_JITTER: Duration = Duration::from_micros(1);

    /// Raises the interval to [`Self::MIN_INTERVAL`] if needed and drops
    /// sub-microsecond jitter.
    pub fn validated(mut self) -> Self {
        if self.interval < Self::MIN_INTERVAL {
            debug!(
                interval_ms = self.interval.as_millis() as u64,
                min_ms = Self::MIN_INTERVAL.as_millis() as u64,
                "reconnect interval below minimum — clamping"
            );
            self.interval = Self::MIN_INTERVAL;
        }
        if !self.jitter.is_zero() && self.jitter < Self::MIN_JITTER {
            debug!(
                jitter_ns = self.jitter.as_nanos() as u64,
                "reconnect jitter below minimum — disabling"
            );
            self.jitter = Duration::ZERO;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Tick
// ---------------------------------------------------------------------------

/// Returned by [`ReconnectTimer::wait_for_tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Firings since the timer was last armed (starts at 1).
    pub attempt: u64,
    /// Firings over the timer's whole life.
    pub total: u64,
}

// ---------------------------------------------------------------------------
// Timer
// ---------------------------------------------------------------------------

/// A repeating timer that can be switched on and off.
///
/// One `ReconnectTimer` per session. It is never shared, so nothing here
/// is synchronized.
#[derive(Debug)]
pub struct ReconnectTimer {
    config: TimerConfig,
    /// When the next firing is due. `None` while disarmed.
    next: Option<Instant>,
    attempt: u64,
    total: u64,
}

impl ReconnectTimer {
    pub fn new(config: TimerConfig) -> Self {
        let config = config.validated();
        debug!(
            interval_ms = config.interval.as_millis() as u64,
            jitter_ms = config.jitter.as_millis() as u64,
            "reconnect timer created"
        );
        Self {
            config,
            next: None,
            attempt: 0,
            total: 0,
        }
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self::new(TimerConfig::with_interval(interval))
    }

    /// Starts firing one interval from now.
    ///
    /// Arming an armed timer does nothing, so repeated disconnect reports
    /// cannot push the next attempt further out.
    pub fn arm(&mut self) {
        if self.next.is_some() {
            return;
        }
        let jitter = if self.config.jitter.is_zero() {
            Duration::ZERO
        } else {
            let max = u64::try_from(self.config.jitter.as_nanos()).unwrap_or(u64::MAX);
            Duration::from_nanos(rand::rng().random_range(0..=max))
        };
        self.next = Some(Instant::now() + self.config.interval + jitter);
        self.attempt = 0;
        debug!(interval_ms = self.config.interval.as_millis() as u64, "reconnect timer armed");
    }

    /// Stops firing. Idempotent.
    pub fn disarm(&mut self) {
        if self.next.take().is_some() {
            debug!(attempts = self.attempt, "reconnect timer disarmed");
        }
    }

    pub fn is_armed(&self) -> bool {
        self.next.is_some()
    }

    /// Waits for the next firing.
    ///
    /// While disarmed this future pends forever. Cancel-safe: dropping the
    /// future before it resolves leaves the schedule untouched.
    pub async fn wait_for_tick(&mut self) -> Tick {
        let Some(next) = self.next else {
            std::future::pending::<()>().await;
            unreachable!()
        };

        time::sleep_until(next).await;

        // Schedule from now rather than from the missed deadline, so a
        // stalled loop does not produce a burst of attempts.
        self.next = Some(Instant::now() + self.config.interval);
        self.attempt += 1;
        self.total += 1;

        trace!(attempt = self.attempt, total = self.total, "reconnect timer fired");

        Tick {
            attempt: self.attempt,
            total: self.total,
        }
    }

    /// Firings since the last [`arm`](Self::arm).
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    /// Firings over the timer's whole life.
    pub fn total_ticks(&self) -> u64 {
        self.total
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }
}

impl Default for ReconnectTimer {
    fn default() -> Self {
        Self::new(TimerConfig::default())
    }
}
