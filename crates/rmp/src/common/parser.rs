//! Shared pieces of the nom parsers used for textual settings.

use std::fmt::{Debug, Display, Formatter};

use nom::IResult;
use nom::character::complete::digit1;
use nom::combinator::{all_consuming, map_res};
use nom::error::{ErrorKind, FromExternalError, ParseError};

/// Keeps the first error instead of accumulating nom's context chain, so the
/// message points at the place where input stopped making sense.
pub enum ParserError<I> {
    /// Input had the right shape but an invalid value, e.g. hour 25.
    Semantic(anyhow::Error),
    Syntax(I, ErrorKind),
}

impl<I: Debug> Debug for ParserError<I> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Semantic(error) => write!(f, "Semantic error at {error}"),
            Self::Syntax(input, kind) => write!(f, "Unexpected input {input:?} (expected {kind:?})"),
        }
    }
}

impl<I> ParseError<I> for ParserError<I> {
    fn from_error_kind(input: I, kind: ErrorKind) -> Self {
        ParserError::Syntax(input, kind)
    }

    fn append(_: I, _: ErrorKind, other: Self) -> Self {
        other
    }
}

impl<I: Display, E: Into<anyhow::Error>> FromExternalError<I, E> for ParserError<I> {
    fn from_external_error(input: I, _: ErrorKind, error: E) -> Self {
        ParserError::Semantic(anyhow::anyhow!("'{input}': {}", error.into()))
    }
}

pub type NomResult<'a, Ret> = IResult<&'a str, Ret, ParserError<&'a str>>;

/// Runs the parser and requires it to consume the whole input.
pub fn consume_all<'a, F, O>(parser: F, input: &'a str) -> anyhow::Result<O>
where
    F: FnMut(&'a str) -> NomResult<'a, O>,
{
    match all_consuming(parser)(input) {
        Ok((_, value)) => Ok(value),
        Err(nom::Err::Error(error) | nom::Err::Failure(error)) => Err(anyhow::anyhow!("{error:?}")),
        Err(nom::Err::Incomplete(_)) => Err(anyhow::anyhow!("Unexpected end of input")),
    }
}

pub fn p_u32(input: &str) -> NomResult<u32> {
    map_res(digit1, str::parse::<u32>)(input)
}
