//! Raw HPGL commands
//!
//! A `RawCommand` is the slice between two `;` terminators, borrowed from the
//! input buffer for the duration of one dispatch.

use thiserror::Error;

use super::timing::Point;

/// Why a command could not be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// No `;` before the end of the buffer
    UnterminatedCommand,
    /// Odd number of fields, or an empty field between commas
    MalformedCoordinateList,
    /// Field is not a decimal number, or does not fit in device units
    InvalidCoordinate,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} at byte {offset}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// Byte offset of the offending command in the input buffer
    pub offset: usize,
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            ParseErrorKind::UnterminatedCommand => "unterminated command",
            ParseErrorKind::MalformedCoordinateList => "malformed coordinate list",
            ParseErrorKind::InvalidCoordinate => "invalid coordinate",
        };
        f.write_str(msg)
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// Two-character command code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mnemonic {
    /// PD - pen down, draw through each point
    PenDown,
    /// PA - plot absolute
    PlotAbsolute,
    /// PU - pen up, travel to each point
    PenUp,
    /// SP - select pen
    SelectPen,
    /// IN - initialize
    Initialize,
    /// Anything else, passed through as-is
    Other,
}

impl Mnemonic {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        match bytes {
            [b'P', b'D', ..] => Mnemonic::PenDown,
            [b'P', b'A', ..] => Mnemonic::PlotAbsolute,
            [b'P', b'U', ..] => Mnemonic::PenUp,
            [b'S', b'P', ..] => Mnemonic::SelectPen,
            [b'I', b'N', ..] => Mnemonic::Initialize,
            _ => Mnemonic::Other,
        }
    }

    /// Wire spelling of a recognized mnemonic
    pub fn code(&self) -> &'static str {
        match self {
            Mnemonic::PenDown => "PD",
            Mnemonic::PlotAbsolute => "PA",
            Mnemonic::PenUp => "PU",
            Mnemonic::SelectPen => "SP",
            Mnemonic::Initialize => "IN",
            Mnemonic::Other => "",
        }
    }
}

/// One command, without its terminator and surrounding whitespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawCommand<'a> {
    text: &'a [u8],
    offset: usize,
}

impl<'a> RawCommand<'a> {
    pub fn new(text: &'a [u8], offset: usize) -> Self {
        Self { text, offset }
    }

    /// Full command text, as it appeared in the input
    pub fn text(&self) -> &'a [u8] {
        self.text
    }

    /// Byte offset of the command in the input buffer
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn mnemonic(&self) -> Mnemonic {
        Mnemonic::from_bytes(self.text)
    }

    /// Everything after the mnemonic
    pub fn args(&self) -> &'a [u8] {
        self.text.get(2..).unwrap_or(&[])
    }

    /// True when the argument text contains no comma at all
    pub fn has_no_pairs(&self) -> bool {
        !self.args().contains(&b',')
    }

    /// Parse the arguments as `x,y[,x,y...]`.
    ///
    /// An empty argument list yields no points. Fractional values are
    /// truncated toward zero.
    pub fn points(&self) -> Result<Vec<Point>> {
        let args = self.args().trim_ascii();
        if args.is_empty() {
            return Ok(Vec::new());
        }

        let fields: Vec<&[u8]> = args.split(|&b| b == b',').collect();
        if fields.len() % 2 != 0 {
            return Err(self.error(ParseErrorKind::MalformedCoordinateList));
        }

        fields
            .chunks_exact(2)
            .map(|pair| {
                Ok(Point::new(
                    self.parse_coordinate(pair[0])?,
                    self.parse_coordinate(pair[1])?,
                ))
            })
            .collect()
    }

    fn parse_coordinate(&self, field: &[u8]) -> Result<i32> {
        let field = field.trim_ascii();
        if field.is_empty() {
            return Err(self.error(ParseErrorKind::MalformedCoordinateList));
        }

        let value: f64 = std::str::from_utf8(field)
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|v: &f64| v.is_finite())
            .ok_or_else(|| self.error(ParseErrorKind::InvalidCoordinate))?;

        let value = value.trunc();
        if value < f64::from(i32::MIN) || value > f64::from(i32::MAX) {
            return Err(self.error(ParseErrorKind::InvalidCoordinate));
        }
        Ok(value as i32)
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError {
            kind,
            offset: self.offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mnemonic_classification() {
        assert_eq!(Mnemonic::from_bytes(b"PD1,2"), Mnemonic::PenDown);
        assert_eq!(Mnemonic::from_bytes(b"PA"), Mnemonic::PlotAbsolute);
        assert_eq!(Mnemonic::from_bytes(b"PU"), Mnemonic::PenUp);
        assert_eq!(Mnemonic::from_bytes(b"SP1"), Mnemonic::SelectPen);
        assert_eq!(Mnemonic::from_bytes(b"IN"), Mnemonic::Initialize);
        assert_eq!(Mnemonic::from_bytes(b"VS10"), Mnemonic::Other);
        assert_eq!(Mnemonic::from_bytes(b"P"), Mnemonic::Other);
        // Case sensitive, like the device firmware we target
        assert_eq!(Mnemonic::from_bytes(b"pd1,2"), Mnemonic::Other);
    }

    #[test]
    fn test_points() {
        let cmd = RawCommand::new(b"PD0,0,10,0,10,10", 0);
        assert_eq!(
            cmd.points().unwrap(),
            vec![Point::new(0, 0), Point::new(10, 0), Point::new(10, 10)]
        );

        let cmd = RawCommand::new(b"PA 5 , -7", 0);
        assert_eq!(cmd.points().unwrap(), vec![Point::new(5, -7)]);

        let cmd = RawCommand::new(b"PD", 0);
        assert!(cmd.points().unwrap().is_empty());
    }

    #[test]
    fn test_fractions_truncate_toward_zero() {
        let cmd = RawCommand::new(b"PD10.7,-3.9", 0);
        assert_eq!(cmd.points().unwrap(), vec![Point::new(10, -3)]);
    }

    #[test]
    fn test_malformed_lists() {
        for text in [&b"PD1,2,3"[..], b"PD12", b"PD1,,2,3", b"PD1,2,"] {
            let err = RawCommand::new(text, 7).points().unwrap_err();
            assert_eq!(err.kind, ParseErrorKind::MalformedCoordinateList);
            assert_eq!(err.offset, 7);
        }
    }

    #[test]
    fn test_invalid_coordinates() {
        for text in [&b"PD1,x"[..], b"PDnan,0", b"PD1e12,0"] {
            let err = RawCommand::new(text, 0).points().unwrap_err();
            assert_eq!(err.kind, ParseErrorKind::InvalidCoordinate);
        }
    }

    #[test]
    fn test_has_no_pairs() {
        assert!(RawCommand::new(b"PU", 0).has_no_pairs());
        assert!(RawCommand::new(b"PU5", 0).has_no_pairs());
        assert!(!RawCommand::new(b"PU5,5", 0).has_no_pairs());
    }
}
