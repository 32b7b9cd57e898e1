#![deny(clippy::all)]
#![deny(warnings)]
#![cfg_attr(not(feature = "std"), no_std)]

//! # EDM G/M-code Parser
//!
//! A stateless, allocation-free parser for the controller's fixed G/M-code
//! dialect. A command line is a whitespace-delimited token list: the first
//! token is `G<n>[.m]` or `M<n>`, the rest are parameter tokens.
//!
//! - Axis letters (`X`, `Y`, `Z`) may appear bare (`G28 X`) or with a value
//!   (`G0 X10.5`).
//! - Scalar letters (`P`, `Q`, `R`) always require a value.
//! - Anything else rejects the whole line; the parser never partially
//!   succeeds.
//!
//! Parsing is case-sensitive (`g0` is an error) and tokens must be separated
//! by whitespace (`G0X1` is an error). The produced [`Command`] prints back
//! in canonical form via `Display`, so `parse(&cmd.to_string())` returns the
//! same record.

use core::fmt;

/// Whether the command is a G-code or an M-code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdKind {
    G,
    M,
}

/// State of one axis letter within a parsed command.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum AxisArg {
    /// The axis letter did not appear.
    #[default]
    Absent,
    /// The axis letter appeared with no value (e.g. `X` in `G28 X`).
    Bare,
    /// The axis letter appeared with a value (e.g. `X10.5`).
    Value(f32),
}

impl AxisArg {
    /// Returns the value if the axis carried one.
    pub fn value(&self) -> Option<f32> {
        match *self {
            AxisArg::Value(v) => Some(v),
            _ => None,
        }
    }

    /// True iff the axis appeared bare (letter without value).
    pub fn is_bare(&self) -> bool {
        matches!(self, AxisArg::Bare)
    }

    /// True iff the axis appeared at all.
    pub fn is_present(&self) -> bool {
        !matches!(self, AxisArg::Absent)
    }
}

/// A fully parsed G/M-code command line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Command {
    pub kind: CmdKind,
    /// Major code: 0 for `G0`, 38 for `G38.2`.
    pub code: u16,
    /// Minor code: `Some(2)` for `G38.2`, `None` for `G38`.
    pub sub_code: Option<u8>,

    pub x: AxisArg,
    pub y: AxisArg,
    pub z: AxisArg,

    pub p: Option<f32>,
    pub q: Option<f32>,
    pub r: Option<f32>,
}

impl Command {
    fn new(kind: CmdKind, code: u16, sub_code: Option<u8>) -> Self {
        Self {
            kind,
            code,
            sub_code,
            x: AxisArg::Absent,
            y: AxisArg::Absent,
            z: AxisArg::Absent,
            p: None,
            q: None,
            r: None,
        }
    }
}

/// Reasons a command line fails to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The line contained no tokens.
    Empty,
    /// The first token did not start with `G` or `M`.
    BadCommandLetter,
    /// The major code was not an integer in 0..=999.
    BadCode,
    /// The minor code (after `.`) was not an integer in 0..=9.
    BadSubCode,
    /// A parameter token started with an unsupported letter.
    UnknownParameter(char),
    /// A parameter value was not a valid number.
    BadValue(char),
    /// A scalar parameter (`P`/`Q`/`R`) appeared without a value.
    MissingValue(char),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ParseError::Empty => write!(f, "empty command"),
            ParseError::BadCommandLetter => write!(f, "command must start with G or M"),
            ParseError::BadCode => write!(f, "command number must be an integer in 0..=999"),
            ParseError::BadSubCode => write!(f, "sub-code must be an integer in 0..=9"),
            ParseError::UnknownParameter(c) => write!(f, "unknown parameter letter '{c}'"),
            ParseError::BadValue(c) => write!(f, "malformed value for parameter '{c}'"),
            ParseError::MissingValue(c) => write!(f, "parameter '{c}' requires a value"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseError {}

/// Parses an unsigned decimal integer with no sign, no junk, no empty input.
fn parse_uint(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Parses a finite decimal value (`10`, `-20.3`, `.5`).
fn parse_value(s: &str) -> Option<f32> {
    let v: f32 = s.parse().ok()?;
    v.is_finite().then_some(v)
}

/// Parses the leading `G<n>[.m]` / `M<n>` token.
fn parse_command_number(token: &str) -> Result<Command, ParseError> {
    let kind = match token.as_bytes().first() {
        Some(b'G') => CmdKind::G,
        Some(b'M') => CmdKind::M,
        _ => return Err(ParseError::BadCommandLetter),
    };

    let number = &token[1..];
    let (code_part, sub_part) = match number.split_once('.') {
        Some((major, minor)) => (major, Some(minor)),
        None => (number, None),
    };

    let code = parse_uint(code_part)
        .filter(|&c| c <= 999)
        .ok_or(ParseError::BadCode)?;
    let sub_code = match sub_part {
        Some(minor) => Some(
            parse_uint(minor)
                .filter(|&m| m <= 9)
                .ok_or(ParseError::BadSubCode)? as u8,
        ),
        None => None,
    };

    Ok(Command::new(kind, code as u16, sub_code))
}

/// Parses an axis token (`X`, `X10.5`) into its [`AxisArg`].
fn parse_axis(letter: char, rest: &str) -> Result<AxisArg, ParseError> {
    if rest.is_empty() {
        return Ok(AxisArg::Bare);
    }
    parse_value(rest)
        .map(AxisArg::Value)
        .ok_or(ParseError::BadValue(letter))
}

/// Parses a scalar token (`P500`, `Q1.5`); bare scalars are rejected.
fn parse_scalar(letter: char, rest: &str) -> Result<f32, ParseError> {
    if rest.is_empty() {
        return Err(ParseError::MissingValue(letter));
    }
    parse_value(rest).ok_or(ParseError::BadValue(letter))
}

/// Parses one command line into a [`Command`].
///
/// The whole line is rejected on the first malformed token; the parser has
/// no side effects and no partial results.
pub fn parse(line: &str) -> Result<Command, ParseError> {
    let mut tokens = line.split_whitespace();
    let first = tokens.next().ok_or(ParseError::Empty)?;
    let mut cmd = parse_command_number(first)?;

    for token in tokens {
        let letter = token.chars().next().unwrap_or('\0');
        let rest = &token[letter.len_utf8()..];
        match letter {
            'X' => cmd.x = parse_axis('X', rest)?,
            'Y' => cmd.y = parse_axis('Y', rest)?,
            'Z' => cmd.z = parse_axis('Z', rest)?,
            'P' => cmd.p = Some(parse_scalar('P', rest)?),
            'Q' => cmd.q = Some(parse_scalar('Q', rest)?),
            'R' => cmd.r = Some(parse_scalar('R', rest)?),
            _ => return Err(ParseError::UnknownParameter(letter)),
        }
    }

    Ok(cmd)
}

impl fmt::Display for Command {
    /// Canonical form: `G0`, `G38.2 X10.5`, `M3 P750 Q1.5 R30`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self.kind {
            CmdKind::G => 'G',
            CmdKind::M => 'M',
        };
        write!(f, "{letter}{}", self.code)?;
        if let Some(sub) = self.sub_code {
            write!(f, ".{sub}")?;
        }
        for (letter, arg) in [('X', self.x), ('Y', self.y), ('Z', self.z)] {
            match arg {
                AxisArg::Absent => {}
                AxisArg::Bare => write!(f, " {letter}")?,
                AxisArg::Value(v) => write!(f, " {letter}{v}")?,
            }
        }
        for (letter, arg) in [('P', self.p), ('Q', self.q), ('R', self.r)] {
            if let Some(v) = arg {
                write!(f, " {letter}{v}")?;
            }
        }
        Ok(())
    }
}
