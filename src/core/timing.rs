//! Motion timing model
//!
//! The plotter gives no feedback, so every move is paced by an estimate of
//! how long the head takes to travel. Distance is Manhattan distance, which
//! is never shorter than the true path, so the estimate errs on the slow side.

use std::time::Duration;

use crate::config::TimingConfig;

/// A position in integer device units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// `|dx| + |dy|`
    pub fn distance(self, other: Point) -> u64 {
        let dx = (i64::from(self.x) - i64::from(other.x)).unsigned_abs();
        let dy = (i64::from(self.y) - i64::from(other.y)).unsigned_abs();
        dx + dy
    }
}

/// Running plotter state, threaded through every dispatch step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlotterState {
    /// Last coordinate pair sent to the device
    pub position: Point,
    /// Paced transmission events so far (diagnostics only)
    pub waitpoints: u64,
}

impl PlotterState {
    pub fn new(home: Point) -> Self {
        Self {
            position: home,
            waitpoints: 0,
        }
    }

    /// Same state with the waitpoint counter advanced
    #[must_use]
    pub fn with_waitpoints(self, n: u64) -> Self {
        Self {
            waitpoints: self.waitpoints + n,
            ..self
        }
    }
}

/// Transit time estimator
#[derive(Debug, Clone, Copy)]
pub struct TimingModel {
    /// Device units per motor step
    step_size: f64,
    /// Device units per second
    pen_speed: f64,
    min_latency: Duration,
}

impl TimingModel {
    pub fn new(config: &TimingConfig) -> Self {
        Self {
            step_size: config.step_size,
            pen_speed: config.pen_speed,
            min_latency: Duration::from_micros(config.min_latency_us),
        }
    }

    /// Per-command processing time of the device, independent of motion
    pub fn min_latency(&self) -> Duration {
        self.min_latency
    }

    /// Microseconds the head needs to cover `distance` device units.
    ///
    /// Strictly increasing in `distance` as long as one unit takes at least
    /// 1 us, which config validation enforces.
    pub fn delay_us(&self, distance: u64) -> u64 {
        if distance == 0 {
            return 0;
        }
        let seconds = self.step_size * distance as f64 / self.pen_speed;
        (seconds * 1_000_000.0).round() as u64
    }

    /// Estimate the transit from `from` to `target`.
    ///
    /// Returns the delay and the new head position, which is always `target`.
    pub fn estimate(&self, from: Point, target: Point) -> (Duration, Point) {
        let delay = self.delay_us(from.distance(target));
        (Duration::from_micros(delay), target)
    }
}
