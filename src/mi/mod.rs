//! Classification of MI output records.
//!
//! Every line the debugger prints belongs to one record family, recognized by
//! its leading sigil: `*`/`+`/`=` are asynchronous records, `~`/`&`/`@` are
//! stream output, a run of digits followed by `^` is the result of a
//! previously issued command (the digits echo the command token). Payload
//! syntax after the sigil varies between debugger families and is parsed on
//! demand by the active backend (see [`crate::backend`]).

pub mod parser;

use std::str::FromStr;
use strum_macros::{Display, EnumString};

/// Numeric tag correlating an issued command with its result record.
///
/// Allocated modulo [`TOKEN_MODULUS`], always rendered zero-padded to
/// [`TOKEN_WIDTH`] digits.
pub type Token = u32;

pub const TOKEN_WIDTH: usize = 6;
pub const TOKEN_MODULUS: Token = 1_000_000;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("result record with missing or malformed token: {0}")]
    BadToken(String),
    #[error("unknown result class: {0}")]
    UnknownResultClass(String),
    #[error("malformed stream output: {0}")]
    BadStream(String),
    #[error("payload parsing: {0}")]
    Payload(String),
    #[error("unrecognized output record: {0}")]
    Unrecognized(String),
}

/// Class of a result record (the word right after `^`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display, EnumString)]
pub enum ResultClass {
    #[strum(serialize = "done")]
    Done,
    #[strum(serialize = "running")]
    Running,
    #[strum(serialize = "connected")]
    Connected,
    #[strum(serialize = "error")]
    Error,
    #[strum(serialize = "exit")]
    Exit,
}

/// Stream output family: `~` console, `&` internal log, `@` target output.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display)]
pub enum StreamKind {
    Console,
    Log,
    Target,
}

/// Asynchronous record family: `*` exec state, `+` status, `=` notification.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display)]
pub enum AsyncKind {
    Exec,
    Status,
    Notify,
}

/// An unsolicited record, never correlated with an outstanding command.
#[derive(Debug, Clone, PartialEq)]
pub struct AsyncRecord {
    pub kind: AsyncKind,
    /// Async class, e.g. `stopped`, `running`, `breakpoint-modified`.
    pub class: String,
    /// Raw payload after the class, parsed by the backend when needed.
    pub payload: String,
}

/// The result of a previously issued command.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    pub token: Option<Token>,
    pub class: ResultClass,
    /// Raw payload after the class, parsed by the backend when needed.
    pub payload: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutputRecord {
    Async(AsyncRecord),
    Result(ResultRecord),
    Stream(StreamKind, String),
    /// The interactive prompt or a blank line, both carry no information.
    Prompt,
}

/// Split `class[,payload]` right after an async or result sigil.
fn split_class(rest: &str) -> (&str, &str) {
    match rest.split_once(',') {
        Some((class, payload)) => (class, payload),
        None => (rest, ""),
    }
}

/// Classify one complete output line (terminators included or not).
pub fn classify(raw: &str) -> Result<OutputRecord, DecodeError> {
    let line = raw.trim_end_matches(['\r', '\n']);
    if line.is_empty() || line.trim_end() == "(gdb)" {
        return Ok(OutputRecord::Prompt);
    }

    let digits_end = line
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(line.len());
    let (digits, rest) = line.split_at(digits_end);

    if let Some(rest) = rest.strip_prefix('^') {
        if digits.is_empty() {
            return Err(DecodeError::BadToken(line.to_string()));
        }
        let token: Token = digits
            .parse()
            .map_err(|_| DecodeError::BadToken(line.to_string()))?;
        let (class, payload) = split_class(rest);
        let class = ResultClass::from_str(class)
            .map_err(|_| DecodeError::UnknownResultClass(class.to_string()))?;
        return Ok(OutputRecord::Result(ResultRecord {
            token: Some(token),
            class,
            payload: payload.to_string(),
        }));
    }

    if !digits.is_empty() {
        // digits not followed by a result marker
        return Err(DecodeError::Unrecognized(line.to_string()));
    }

    let mut chars = line.chars();
    let sigil = chars.next().expect("line is not empty");
    let rest = chars.as_str();
    match sigil {
        '*' | '+' | '=' => {
            let kind = match sigil {
                '*' => AsyncKind::Exec,
                '+' => AsyncKind::Status,
                _ => AsyncKind::Notify,
            };
            let (class, payload) = split_class(rest);
            if class.is_empty() {
                return Err(DecodeError::Unrecognized(line.to_string()));
            }
            Ok(OutputRecord::Async(AsyncRecord {
                kind,
                class: class.to_string(),
                payload: payload.to_string(),
            }))
        }
        '~' | '&' | '@' => {
            let kind = match sigil {
                '~' => StreamKind::Console,
                '&' => StreamKind::Log,
                _ => StreamKind::Target,
            };
            let text = parser::parse_c_string(rest)
                .map_err(|_| DecodeError::BadStream(line.to_string()))?;
            Ok(OutputRecord::Stream(kind, text))
        }
        _ => Err(DecodeError::Unrecognized(line.to_string())),
    }
}
