//! hplot - Timed HPGL driver for HP pen plotters
//!
//! Old HP plotters (tested on an HPIB 7440A with Inkscape-generated files)
//! have no flow control and a short command buffer. hplot reads a whole HPGL
//! file, splits long commands into one coordinate pair per line, and paces
//! output so the pen has stopped moving before the next line arrives.
//!
//! # Quick Start
//!
//! ```text
//! hplot drawing.hpgl > /dev/ttyUSB0
//! hplot -o /dev/ttyUSB0 drawing.hpgl
//! hplot --no-pacing drawing.hpgl     # preview the rewritten stream
//! ```
//!
//! The device stream goes to stdout (or `--output`); progress and pen-change
//! prompts go to stderr, and logs to `~/.hplot/hplot.log`.

mod config;
mod core;

use std::env;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use crossterm::terminal::{Clear, ClearType};
use crossterm::tty::IsTty;
use crossterm::{cursor, queue};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, PenLiftPolicy};
use crate::core::{
    ConsoleOperator, Dispatcher, NoPacing, PacingClock, PlotterState, Progress, SleepClock,
    Transmitter,
};

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// What the invocation asks for
#[derive(Debug, PartialEq)]
enum Action {
    Plot(PathBuf),
    DumpConfig,
}

/// Command line options
#[derive(Debug, PartialEq)]
struct Args {
    action: Action,
    /// Device path, stdout when absent
    output: Option<PathBuf>,
    /// Explicit config file
    config: Option<PathBuf>,
    single_lift: bool,
    no_pacing: bool,
}

fn print_version() {
    eprintln!("hplot {}", VERSION);
}

fn print_usage() {
    eprintln!("Outputs timed HPGL to stdout. Syntax: hplot [OPTIONS] file.hpgl");
}

fn print_help() {
    eprintln!("hplot {} - Timed HPGL driver for HP pen plotters", VERSION);
    eprintln!();
    print_usage();
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -o, --output <PATH>   Write to a device instead of stdout");
    eprintln!("  -c, --config <PATH>   Config file (default: ~/.hplot/config.toml)");
    eprintln!("      --single-lift     Send one bare PU per PU command, not per point");
    eprintln!("      --no-pacing       Do not wait between lines");
    eprintln!("      --dump-config     Print the effective configuration and exit");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Log level: HPLOT_LOG=debug (written to ~/.hplot/hplot.log)");
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Args, String> {
    let mut args = args.into_iter();
    let mut file = None;
    let mut output = None;
    let mut config = None;
    let mut single_lift = false;
    let mut no_pacing = false;
    let mut dump_config = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-o" | "--output" => {
                let path = args.next().ok_or("Missing output path")?;
                output = Some(PathBuf::from(path));
            }
            "-c" | "--config" => {
                let path = args.next().ok_or("Missing config path")?;
                config = Some(PathBuf::from(path));
            }
            "--single-lift" => single_lift = true,
            "--no-pacing" => no_pacing = true,
            "--dump-config" => dump_config = true,
            other if other.starts_with('-') && other.len() > 1 => {
                return Err(format!("Unknown option: {}", other));
            }
            _ => {
                if file.is_some() {
                    return Err("Expected exactly one HPGL file".to_string());
                }
                file = Some(PathBuf::from(arg));
            }
        }
    }

    let action = match (file, dump_config) {
        (_, true) => Action::DumpConfig,
        (Some(file), false) => Action::Plot(file),
        (None, false) => return Err("Missing HPGL file".to_string()),
    };

    Ok(Args {
        action,
        output,
        config,
        single_lift,
        no_pacing,
    })
}

/// Log to `~/.hplot/hplot.log`; the device stream and stderr stay clean
fn init_logging() {
    let log_path = config::hplot_dir()
        .map(|dir| dir.join("hplot.log"))
        .unwrap_or_else(|| PathBuf::from("hplot.log"));

    if let Some(parent) = log_path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_from_env("HPLOT_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

/// Single rewritten progress line on stderr
struct ProgressLine {
    /// stderr is a terminal, so the line can be cleared before redrawing
    tty: bool,
}

impl ProgressLine {
    fn new() -> Self {
        Self {
            tty: io::stderr().is_tty(),
        }
    }

    fn update(&mut self, progress: Progress) {
        let _ = self.render(&mut io::stderr().lock(), progress);
    }

    fn render<W: Write>(&self, out: &mut W, progress: Progress) -> io::Result<()> {
        if self.tty {
            queue!(out, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine))?;
        }
        write!(
            out,
            " Progress: {} bytes of {} total ({:3.2}%). Press Ctrl+C to stop.",
            progress.consumed,
            progress.total,
            progress.percent()
        )?;
        if !self.tty {
            out.write_all(b"\r")?;
        }
        out.flush()
    }

    fn finish(&mut self) {
        eprintln!();
    }
}

fn open_output(path: Option<&PathBuf>) -> anyhow::Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)
                .with_context(|| format!("open {}", path.display()))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(io::stdout().lock())),
    }
}

fn plot<C: PacingClock>(
    config: &Config,
    buf: &[u8],
    out: Box<dyn Write>,
    clock: C,
) -> anyhow::Result<PlotterState> {
    let mut dispatcher = Dispatcher::new(config, Transmitter::new(out, clock), ConsoleOperator);
    let mut progress = ProgressLine::new();

    let result = dispatcher.run(buf, PlotterState::new(config.home.point()), |p| {
        progress.update(p)
    });
    progress.finish();

    result.context("Plotting stopped")
}

fn main() -> anyhow::Result<()> {
    let args = match parse_args(env::args().skip(1)) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage();
            std::process::exit(2);
        }
    };

    init_logging();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("config {}", path.display()))?,
        None => Config::load(),
    };
    if args.single_lift {
        config.pen_up.lift = PenLiftPolicy::Once;
    }

    let file = match args.action {
        Action::DumpConfig => {
            print!("{}", config.to_toml()?);
            return Ok(());
        }
        Action::Plot(file) => file,
    };

    eprintln!("hplot started. HPGL file: {}.", file.display());
    info!("hplot {} starting on {}", VERSION, file.display());

    let buf = fs::read(&file).with_context(|| format!("read {}", file.display()))?;
    eprintln!("File opened in buffer.");

    let out = open_output(args.output.as_ref())?;

    eprintln!("Now plotting data.");
    let state = if args.no_pacing {
        plot(&config, &buf, out, NoPacing)?
    } else {
        plot(&config, &buf, out, SleepClock)?
    };

    eprintln!("Plotting done, {} waitpoints.", state.waitpoints);
    info!("Plotting done, {} waitpoints", state.waitpoints);
    Ok(())
}
