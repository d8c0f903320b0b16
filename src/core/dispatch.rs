//! Command dispatcher
//!
//! Drives the single plotting worker: scan a command, route it by mnemonic,
//! send the rewritten lines, and thread the plotter state on to the next one.
//!
//! | Mnemonic | Handling |
//! |----------|----------|
//! | PD, PA   | split into one line per pair |
//! | PU       | split into lift + absolute move pairs |
//! | SP + id  | wait for the operator, nothing sent |
//! | IN       | passthrough, long init delay |
//! | other    | passthrough, default delay |

use std::io::{self, Write};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use super::command::{Mnemonic, ParseError, RawCommand};
use super::operator::Operator;
use super::scanner::CommandScanner;
use super::splitter::{split_path, split_pen_up};
use super::timing::{PlotterState, TimingModel};
use super::transmit::{PacingClock, Transmitter};
use crate::config::{Config, PenLiftPolicy};

#[derive(Error, Debug)]
pub enum PlotError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Failed to write to plotter: {0}")]
    Output(#[source] io::Error),

    #[error("Pen change not confirmed: {0}")]
    Operator(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, PlotError>;

/// How far through the input buffer the worker is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub consumed: usize,
    pub total: usize,
}

impl Progress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.consumed as f64 / self.total as f64 * 100.0
    }
}

pub struct Dispatcher<W: Write, C: PacingClock, O: Operator> {
    timing: TimingModel,
    lift: PenLiftPolicy,
    init_delay: Duration,
    default_delay: Duration,
    tx: Transmitter<W, C>,
    operator: O,
}

impl<W: Write, C: PacingClock, O: Operator> Dispatcher<W, C, O> {
    pub fn new(config: &Config, tx: Transmitter<W, C>, operator: O) -> Self {
        Self {
            timing: TimingModel::new(&config.timing),
            lift: config.pen_up.lift,
            init_delay: Duration::from_micros(config.timing.init_delay_us),
            default_delay: Duration::from_micros(config.timing.default_delay_us),
            tx,
            operator,
        }
    }

    /// Plot a whole buffer, in order, stopping at the first error.
    ///
    /// `on_progress` is called after each command has been sent and paced.
    pub fn run<F: FnMut(Progress)>(
        &mut self,
        buf: &[u8],
        mut state: PlotterState,
        mut on_progress: F,
    ) -> Result<PlotterState> {
        let mut scanner = CommandScanner::new(buf);
        while let Some(cmd) = scanner.next_command()? {
            state = self.dispatch(&cmd, state)?;
            on_progress(Progress {
                consumed: scanner.position(),
                total: scanner.total_len(),
            });
        }
        info!(
            "Sent {} lines, {} waitpoints",
            self.tx.lines_sent(),
            state.waitpoints
        );
        Ok(state)
    }

    /// Handle one command and return the updated state
    pub fn dispatch(&mut self, cmd: &RawCommand<'_>, state: PlotterState) -> Result<PlotterState> {
        debug!(
            "Dispatching {:?} at byte {}",
            String::from_utf8_lossy(cmd.text()),
            cmd.offset()
        );

        match cmd.mnemonic() {
            Mnemonic::PenDown | Mnemonic::PlotAbsolute => {
                split_path(cmd, state, &self.timing, &mut self.tx)
            }
            Mnemonic::PenUp => split_pen_up(cmd, state, &self.timing, self.lift, &mut self.tx),
            Mnemonic::SelectPen => {
                let pen = cmd.args().trim_ascii();
                if !pen.is_empty() {
                    let pen = String::from_utf8_lossy(pen);
                    info!("Waiting for pen {}", pen);
                    self.operator
                        .confirm_pen(&pen)
                        .map_err(PlotError::Operator)?;
                }
                Ok(state)
            }
            // The 7440A is slow to init
            Mnemonic::Initialize => self.passthrough(cmd, state, self.init_delay),
            Mnemonic::Other => self.passthrough(cmd, state, self.default_delay),
        }
    }

    fn passthrough(
        &mut self,
        cmd: &RawCommand<'_>,
        state: PlotterState,
        pause: Duration,
    ) -> Result<PlotterState> {
        self.tx.send(cmd.text(), pause).map_err(PlotError::Output)?;
        Ok(state)
    }

    #[cfg(test)]
    fn parts(&self) -> (&Transmitter<W, C>, &O) {
        (&self.tx, &self.operator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::command::ParseErrorKind;
    use crate::core::operator::ScriptedOperator;
    use crate::core::timing::Point;
    use crate::core::transmit::RecordingClock;

    type TestDispatcher = Dispatcher<Vec<u8>, RecordingClock, ScriptedOperator>;

    fn dispatcher(config: &Config) -> TestDispatcher {
        Dispatcher::new(
            config,
            Transmitter::new(Vec::new(), RecordingClock::default()),
            ScriptedOperator::default(),
        )
    }

    fn home() -> PlotterState {
        PlotterState::new(Config::default().home.point())
    }

    fn output(d: &TestDispatcher) -> Vec<String> {
        String::from_utf8(d.parts().0.parts().0.clone())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn holds(d: &TestDispatcher) -> Vec<Duration> {
        d.parts().0.parts().1.holds.clone()
    }

    #[test]
    fn test_path_scenario() {
        let mut d = dispatcher(&Config::default());
        let state = d.run(b"PD0,0,10,0,10,10;", home(), |_| {}).unwrap();

        assert_eq!(output(&d), vec!["PD0,0", "PD10,0", "PD10,10"]);
        assert_eq!(state.position, Point::new(10, 10));
        assert_eq!(state.waitpoints, 3);
    }

    #[test]
    fn test_pen_up_scenario() {
        let mut d = dispatcher(&Config::default());
        let state = d.run(b"PU5,5;", home(), |_| {}).unwrap();

        assert_eq!(output(&d), vec!["PU", "PA5,5"]);
        assert_eq!(state.position, Point::new(5, 5));
        assert_eq!(state.waitpoints, 3);
    }

    #[test]
    fn test_select_pen_waits_for_operator() {
        let mut d = dispatcher(&Config::default());
        let state = d.run(b"SPA;", home(), |_| {}).unwrap();

        assert!(output(&d).is_empty());
        assert!(holds(&d).is_empty());
        assert_eq!(d.parts().1.requests, vec!["A".to_string()]);
        assert_eq!(state, home());
    }

    #[test]
    fn test_select_pen_without_id() {
        let mut d = dispatcher(&Config::default());
        d.run(b"SP;", home(), |_| {}).unwrap();

        assert!(output(&d).is_empty());
        assert!(d.parts().1.requests.is_empty());
    }

    #[test]
    fn test_operator_failure_aborts() {
        let mut d = Dispatcher::new(
            &Config::default(),
            Transmitter::new(Vec::new(), RecordingClock::default()),
            ScriptedOperator {
                fail: true,
                ..ScriptedOperator::default()
            },
        );
        let err = d.run(b"SP2;PD1,1;", home(), |_| {}).unwrap_err();

        assert!(matches!(err, PlotError::Operator(_)));
        assert!(output(&d).is_empty());
    }

    #[test]
    fn test_initialize_scenario() {
        let mut d = dispatcher(&Config::default());
        let state = d.run(b"IN;", home(), |_| {}).unwrap();

        assert_eq!(output(&d), vec!["IN"]);
        assert_eq!(holds(&d), vec![Duration::from_micros(2_200_000)]);
        assert_eq!(state, home());
    }

    #[test]
    fn test_unknown_passthrough() {
        let mut d = dispatcher(&Config::default());
        d.run(b"VS10;", home(), |_| {}).unwrap();

        assert_eq!(output(&d), vec!["VS10"]);
        assert_eq!(holds(&d), vec![Duration::from_micros(150_000)]);
    }

    #[test]
    fn test_unterminated_scenario() {
        let mut d = dispatcher(&Config::default());
        let err = d.run(b"PD10,20", home(), |_| {}).unwrap_err();

        match err {
            PlotError::Parse(e) => assert_eq!(e.kind, ParseErrorKind::UnterminatedCommand),
            other => panic!("unexpected error: {other}"),
        }
        assert!(output(&d).is_empty());
    }

    #[test]
    fn test_parse_error_stops_run() {
        let mut d = dispatcher(&Config::default());
        let err = d.run(b"IN;PD1,2,3;PU0,0;", home(), |_| {}).unwrap_err();

        assert!(matches!(err, PlotError::Parse(_)));
        assert_eq!(output(&d), vec!["IN"]);
    }

    #[test]
    fn test_inkscape_style_file() {
        let input = b"IN;\nSP1;\nPU100,200;\nPD150,200,150,250;\nPU;\nSP0;\n";
        let mut d = dispatcher(&Config::default());
        let mut reports = Vec::new();

        let state = d.run(input, home(), |p| reports.push(p)).unwrap();

        assert_eq!(
            output(&d),
            vec!["IN", "PU", "PA100,200", "PD150,200", "PD150,250", "PU"]
        );
        assert_eq!(state.position, Point::new(150, 250));
        // 1 + 2 for the pen-up pair, 1 per drawn point
        assert_eq!(state.waitpoints, 5);
        assert_eq!(d.parts().1.requests, vec!["1".to_string(), "0".to_string()]);
        assert_eq!(reports.len(), 6);
        assert_eq!(reports.last().map(|p| p.consumed), Some(input.len() - 1));
    }

    #[test]
    fn test_state_carries_across_commands() {
        let mut d = dispatcher(&Config::default());
        let state = d.run(b"PU0,0;PD1000,0;", PlotterState::new(Point::new(0, 0)), |_| {}).unwrap();

        assert_eq!(state.position, Point::new(1000, 0));
        // lift, move (no travel), then 1000 units = 125 ms
        assert_eq!(
            holds(&d),
            vec![
                Duration::from_millis(32),
                Duration::from_millis(64),
                Duration::from_millis(32 + 125),
            ]
        );
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(Progress { consumed: 50, total: 200 }.percent(), 25.0);
        assert_eq!(Progress { consumed: 0, total: 0 }.percent(), 100.0);
    }
}
