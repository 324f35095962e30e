// src/recognizer/clock.rs
//
// Fixed-rate gate for inference. On each due tick the reference time
// advances by exactly one period, so missed ticks are caught up instead of
// accumulating drift.

use std::time::{Duration, Instant};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Clock {
    clock_speed_hz: f64,
    period: Duration,
    last_tick: Option<Instant>,
    measured_since: Option<Instant>,
    ticks_counted: u64,
}

impl Clock {
    pub fn new(clock_speed_hz: f64) -> Self {
        let mut clock = Self {
            clock_speed_hz: 0.0,
            period: Duration::ZERO,
            last_tick: None,
            measured_since: None,
            ticks_counted: 0,
        };
        clock.set_clock_speed(clock_speed_hz);
        clock
    }

    pub fn is_time_to_run(&mut self) -> bool {
        self.is_time_to_run_at(Instant::now())
    }

    /// The first call always ticks.
    pub fn is_time_to_run_at(&mut self, now: Instant) -> bool {
        let Some(last) = self.last_tick else {
            self.last_tick = Some(now);
            self.ticks_counted += 1;
            return true;
        };

        if now.saturating_duration_since(last) >= self.period {
            self.last_tick = Some(last + self.period);
            self.ticks_counted += 1;
            true
        } else {
            false
        }
    }

    pub fn clock_speed(&self) -> f64 {
        self.clock_speed_hz
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Non-positive or non-finite speeds are ignored, as are speeds so low
    /// that their period does not fit in a `Duration`.
    pub fn set_clock_speed(&mut self, clock_speed_hz: f64) {
        if !(clock_speed_hz.is_finite() && clock_speed_hz > 0.0) {
            warn!("Ignoring invalid clock speed {}", clock_speed_hz);
            return;
        }
        match Duration::try_from_secs_f64(1.0 / clock_speed_hz) {
            Ok(period) => {
                self.clock_speed_hz = clock_speed_hz;
                self.period = period;
            }
            Err(e) => warn!("Ignoring clock speed {}: {}", clock_speed_hz, e),
        }
    }

    pub fn reset(&mut self) {
        self.last_tick = None;
        self.measured_since = None;
    }

    pub fn real_clock_speed(&mut self) -> f64 {
        self.real_clock_speed_at(Instant::now())
    }

    /// Ticks per second since the previous query; 0 on the first query.
    pub fn real_clock_speed_at(&mut self, now: Instant) -> f64 {
        let since = *self.measured_since.get_or_insert(now);
        self.measured_since = Some(now);

        let elapsed = now.saturating_duration_since(since).as_secs_f64();
        if elapsed == 0.0 {
            return 0.0;
        }
        let rate = self.ticks_counted as f64 / elapsed;
        self.ticks_counted = 0;
        rate
    }
}
