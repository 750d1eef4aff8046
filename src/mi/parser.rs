//! Structured-value grammar shared by GDB-family MI implementations.
//!
//! A result payload is a comma separated list of named results, where a value
//! is either a c-string constant, a tuple of named results or a list:
//!
//! ```text
//! bkpt={number="1",file="main.c",line="10"}
//! stack=[frame={level="0",func="main"},frame={level="1"}]
//! ```

use super::DecodeError;
use chumsky::error::Rich;
use chumsky::prelude::{any, choice, just, recursive};
use chumsky::{extra, IterParser, Parser};
use itertools::Itertools;

type Err<'a> = extra::Err<Rich<'a, char>>;

/// One node of a parsed MI payload.
#[derive(Debug, Clone, PartialEq)]
pub enum MiValue {
    /// C-string constant, unescaped.
    Const(String),
    /// `{name="v",...}`
    Tuple(MiResults),
    /// `[...]`, items are values; named results inside a list are represented
    /// as single-entry tuples.
    List(Vec<MiValue>),
}

impl MiValue {
    pub fn as_const(&self) -> Option<&str> {
        match self {
            MiValue::Const(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&MiResults> {
        match self {
            MiValue::Tuple(results) => Some(results),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[MiValue]> {
        match self {
            MiValue::List(items) => Some(items),
            _ => None,
        }
    }
}

/// Ordered set of named results (`variable=value` pairs).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MiResults(pub Vec<(String, MiValue)>);

impl MiResults {
    pub fn get(&self, name: &str) -> Option<&MiValue> {
        self.0
            .iter()
            .find_map(|(n, v)| (n == name).then_some(v))
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(MiValue::as_const)
    }

    pub fn get_u32(&self, name: &str) -> Option<u32> {
        self.get_str(name).and_then(|s| s.parse().ok())
    }
}

fn c_string<'a>() -> impl Parser<'a, &'a str, String, Err<'a>> + Clone {
    let escape = just('\\').ignore_then(choice((
        just('\\').to('\\'),
        just('"').to('"'),
        just('n').to('\n'),
        just('r').to('\r'),
        just('t').to('\t'),
        // anything else is kept verbatim (gdb also emits octal escapes,
        // those are passed through untouched)
        any(),
    )));
    let regular = any().filter(|c: &char| *c != '"' && *c != '\\');
    regular
        .or(escape)
        .repeated()
        .collect::<String>()
        .delimited_by(just('"'), just('"'))
        .labelled("c-string")
}

fn variable<'a>() -> impl Parser<'a, &'a str, String, Err<'a>> + Clone {
    any()
        .filter(|c: &char| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .repeated()
        .at_least(1)
        .collect::<String>()
        .labelled("variable name")
}

fn value<'a>() -> impl Parser<'a, &'a str, MiValue, Err<'a>> + Clone {
    recursive(|value| {
        let result = variable().then_ignore(just('=')).then(value.clone());

        let tuple = result
            .clone()
            .separated_by(just(','))
            .collect::<Vec<_>>()
            .delimited_by(just('{'), just('}'))
            .map(|pairs| MiValue::Tuple(MiResults(pairs)));

        // lists may hold plain values or named results
        let list_item = result
            .map(|(name, value)| MiValue::Tuple(MiResults(vec![(name, value)])))
            .or(value);
        let list = list_item
            .separated_by(just(','))
            .collect::<Vec<_>>()
            .delimited_by(just('['), just(']'))
            .map(MiValue::List);

        choice((c_string().map(MiValue::Const), tuple, list))
    })
}

fn results<'a>() -> impl Parser<'a, &'a str, MiResults, Err<'a>> + Clone {
    variable()
        .then_ignore(just('='))
        .then(value())
        .separated_by(just(','))
        .collect::<Vec<_>>()
        .map(MiResults)
}

/// Parse a record payload (everything after the result/async class) into a
/// result set. An empty payload is a valid empty set.
pub fn parse_results(input: &str) -> Result<MiResults, DecodeError> {
    if input.is_empty() {
        return Ok(MiResults::default());
    }
    results()
        .parse(input)
        .into_result()
        .map_err(|errors| DecodeError::Payload(errors.iter().map(|e| e.to_string()).join("; ")))
}

/// Parse one standalone c-string (the body of a stream-output record).
pub fn parse_c_string(input: &str) -> Result<String, DecodeError> {
    c_string()
        .parse(input)
        .into_result()
        .map_err(|errors| DecodeError::Payload(errors.iter().map(|e| e.to_string()).join("; ")))
}
