use thiserror::Error;

use crate::Base;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building a grammar model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("alternation must have at least one branch")]
    EmptyAlternation,

    #[error("concatenation must have at least one element")]
    EmptyConcatenation,

    #[error("invalid repeat {min}*{max}, min exceeds max")]
    InvalidRepeat { min: u32, max: u32 },

    #[error("invalid rule name: '{0}'")]
    InvalidRuleName(String),

    #[error("numeric value without digits")]
    EmptyDigits,

    #[error("invalid {base} digits: '{digits}'")]
    InvalidDigits { base: Base, digits: String },

    #[error("reversed numeric range {lo}-{hi}")]
    ReversedRange { lo: u32, hi: u32 },

    #[error("rule '{0}' is already defined, use '=/' to add alternatives")]
    DuplicateRule(String),

    #[error("incremental definition of undefined rule '{0}'")]
    UndefinedIncrement(String),

    #[error("failed to parse: {0}")]
    ParseError(String),
}

impl From<nom::Err<nom::error::Error<&str>>> for Error {
    fn from(err: nom::Err<nom::error::Error<&str>>) -> Error {
        match err {
            nom::Err::Incomplete(_) => Error::ParseError("incomplete input".to_owned()),
            nom::Err::Error(e) | nom::Err::Failure(e) => {
                let line = e.input.lines().next().unwrap_or_default();
                Error::ParseError(format!("{:?} at '{}'", e.code, line))
            }
        }
    }
}
