//! Core plotting engine.
//!
//! - **scanner**: splits the input buffer into `;`-terminated commands
//! - **command**: mnemonic classification and coordinate parsing
//! - **timing**: transit-time estimate and running plotter state
//! - **splitter**: rewrites multi-point `PD`/`PA`/`PU` into device-safe lines
//! - **dispatch**: routes each command and drives the single worker
//! - **transmit**: line output and pacing
//! - **operator**: manual pen-change confirmation
//!
//! # Data Flow
//!
//! ```text
//! input buffer
//! └── CommandScanner
//!     └── Dispatcher ── PlotterState threaded through every step
//!         ├── split_path / split_pen_up ── TimingModel
//!         ├── passthrough
//!         └── Operator (SP)
//!             └── Transmitter (write + hold)
//! ```

pub mod command;
pub mod dispatch;
pub mod operator;
pub mod scanner;
pub mod splitter;
pub mod timing;
pub mod transmit;

pub use dispatch::{Dispatcher, Progress};
pub use operator::ConsoleOperator;
pub use timing::{PlotterState, Point};
pub use transmit::{NoPacing, PacingClock, SleepClock, Transmitter};
