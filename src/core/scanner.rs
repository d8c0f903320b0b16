//! Command scanner
//!
//! Splits the input buffer into `;`-terminated commands. Forward-only: to
//! start over, build a new scanner.

use super::command::{ParseError, ParseErrorKind, RawCommand};

const TERMINATOR: u8 = b';';

pub struct CommandScanner<'a> {
    buf: &'a [u8],
    cursor: usize,
}

impl<'a> CommandScanner<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, cursor: 0 }
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn total_len(&self) -> usize {
        self.buf.len()
    }

    /// Scan the next command.
    ///
    /// Leading whitespace and empty commands are skipped. Returns `Ok(None)`
    /// once only whitespace remains. An unterminated command consumes the
    /// rest of the buffer, so the scanner is exhausted after an error.
    pub fn next_command(&mut self) -> Result<Option<RawCommand<'a>>, ParseError> {
        loop {
            let rest = &self.buf[self.cursor..];
            let skipped = rest
                .iter()
                .position(|b| !b.is_ascii_whitespace())
                .unwrap_or(rest.len());
            let start = self.cursor + skipped;
            if start >= self.buf.len() {
                self.cursor = self.buf.len();
                return Ok(None);
            }

            let Some(len) = self.buf[start..].iter().position(|&b| b == TERMINATOR) else {
                self.cursor = self.buf.len();
                return Err(ParseError {
                    kind: ParseErrorKind::UnterminatedCommand,
                    offset: start,
                });
            };

            self.cursor = start + len + 1;
            let text = self.buf[start..start + len].trim_ascii_end();
            if text.is_empty() {
                tracing::debug!("Skipping empty command at byte {}", start);
                continue;
            }
            return Ok(Some(RawCommand::new(text, start)));
        }
    }
}

impl<'a> Iterator for CommandScanner<'a> {
    type Item = Result<RawCommand<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_command().transpose()
    }
}
