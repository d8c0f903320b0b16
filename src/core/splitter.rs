//! Command splitters
//!
//! The 7440A rejects commands longer than its input buffer, so multi-point
//! commands are rewritten into one coordinate pair per line:
//!
//! ```text
//! PD555,222,666,444;   ->   PD555,222
//!                           PD666,444
//!
//! PU42,24;             ->   PU
//!                           PA42,24
//! ```
//!
//! Every coordinate list is parsed before the first line goes out, so a
//! malformed command emits nothing.

use std::io::Write;

use tracing::debug;

use super::command::{Mnemonic, RawCommand};
use super::dispatch::{PlotError, Result};
use super::timing::{PlotterState, Point, TimingModel};
use super::transmit::{PacingClock, Transmitter};
use crate::config::PenLiftPolicy;

fn point_line(mnemonic: Mnemonic, p: Point) -> String {
    format!("{}{},{}", mnemonic.code(), p.x, p.y)
}

/// Rewrite `PD`/`PA` into one paced line per coordinate pair.
pub fn split_path<W: Write, C: PacingClock>(
    cmd: &RawCommand<'_>,
    mut state: PlotterState,
    timing: &TimingModel,
    tx: &mut Transmitter<W, C>,
) -> Result<PlotterState> {
    let points = cmd.points()?;
    if points.is_empty() {
        debug!("{} without coordinates at byte {}, nothing to send", cmd.mnemonic().code(), cmd.offset());
        return Ok(state);
    }

    let mnemonic = cmd.mnemonic();
    for target in points {
        let (delay, position) = timing.estimate(state.position, target);
        tx.send(point_line(mnemonic, target).as_bytes(), timing.min_latency() + delay)
            .map_err(PlotError::Output)?;
        state = PlotterState { position, ..state }.with_waitpoints(1);
    }
    Ok(state)
}

/// Rewrite `PU` into bare lifts followed by absolute moves.
///
/// With [`PenLiftPolicy::PerPoint`] the lift is repeated before every move;
/// with [`PenLiftPolicy::Once`] only the first move gets one. A `PU` with no
/// coordinate pair is sent unmodified.
pub fn split_pen_up<W: Write, C: PacingClock>(
    cmd: &RawCommand<'_>,
    mut state: PlotterState,
    timing: &TimingModel,
    policy: PenLiftPolicy,
    tx: &mut Transmitter<W, C>,
) -> Result<PlotterState> {
    let min = timing.min_latency();

    if cmd.has_no_pairs() {
        tx.send(cmd.text(), min).map_err(PlotError::Output)?;
        return Ok(state);
    }

    let points = cmd.points()?;
    for (i, target) in points.into_iter().enumerate() {
        if i == 0 || policy == PenLiftPolicy::PerPoint {
            tx.send(Mnemonic::PenUp.code().as_bytes(), min)
                .map_err(PlotError::Output)?;
            state = state.with_waitpoints(1);
        }

        // Travel time, then pen-down settle
        let (delay, position) = timing.estimate(state.position, target);
        tx.send(point_line(Mnemonic::PlotAbsolute, target).as_bytes(), min + delay + min)
            .map_err(PlotError::Output)?;
        state = PlotterState { position, ..state }.with_waitpoints(2);
    }
    Ok(state)
}
