//! Operator interaction
//!
//! Pen changes on single-pen plotters are manual. `SP<id>` suspends plotting
//! until someone confirms the new pen is in place.

use std::io::{self, BufRead, Write};

use crossterm::terminal::{Clear, ClearType};
use crossterm::{cursor, queue};

pub trait Operator {
    /// Block until the operator confirms pen `pen` is loaded
    fn confirm_pen(&mut self, pen: &str) -> io::Result<()>;
}

/// Prompts on stderr, waits for ENTER on stdin
#[derive(Debug, Default)]
pub struct ConsoleOperator;

impl Operator for ConsoleOperator {
    fn confirm_pen(&mut self, pen: &str) -> io::Result<()> {
        let mut err = io::stderr().lock();
        queue!(err, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine))?;
        write!(err, " Please put pen {} and press [ENTER]", pen)?;
        err.flush()?;
        drop(err);

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stdin closed while waiting for pen change",
            ));
        }
        Ok(())
    }
}

/// Confirms immediately and remembers which pens were asked for
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ScriptedOperator {
    pub requests: Vec<String>,
    pub fail: bool,
}

#[cfg(test)]
impl Operator for ScriptedOperator {
    fn confirm_pen(&mut self, pen: &str) -> io::Result<()> {
        self.requests.push(pen.to_string());
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no operator"));
        }
        Ok(())
    }
}
