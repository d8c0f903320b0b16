//! Device output with pacing
//!
//! The plotter has no handshake. Each line is written and flushed, then the
//! single worker holds for the computed delay before anything else is sent.

use std::io::{self, Write};
use std::time::Duration;

/// Blocks the worker between device writes
pub trait PacingClock {
    fn hold(&mut self, duration: Duration);
}

/// Real-time pacing on the monotonic clock
#[derive(Debug, Default)]
pub struct SleepClock;

impl PacingClock for SleepClock {
    fn hold(&mut self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// No waiting at all, for previewing the rewritten stream
#[derive(Debug, Default)]
pub struct NoPacing;

impl PacingClock for NoPacing {
    fn hold(&mut self, _duration: Duration) {}
}

/// Line writer to the device
pub struct Transmitter<W: Write, C: PacingClock> {
    out: W,
    clock: C,
    /// Lines written so far
    lines: u64,
}

impl<W: Write, C: PacingClock> Transmitter<W, C> {
    pub fn new(out: W, clock: C) -> Self {
        Self {
            out,
            clock,
            lines: 0,
        }
    }

    /// Write `line` plus a newline, flush, then hold for `pause`.
    pub fn send(&mut self, line: &[u8], pause: Duration) -> io::Result<()> {
        self.out.write_all(line)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        self.lines += 1;
        self.clock.hold(pause);
        Ok(())
    }

    pub fn lines_sent(&self) -> u64 {
        self.lines
    }

    #[cfg(test)]
    pub fn parts(&self) -> (&W, &C) {
        (&self.out, &self.clock)
    }
}

/// Clock that records every hold instead of sleeping
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingClock {
    pub holds: Vec<Duration>,
}

#[cfg(test)]
impl PacingClock for RecordingClock {
    fn hold(&mut self, duration: Duration) {
        self.holds.push(duration);
    }
}
