use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// A grammar construct that can't be rendered as an identifier fragment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("{construct} contains {ch:?}, which has no identifier encoding")]
    UnencodableCharacter { construct: &'static str, ch: char },
}

/// Errors raised while synthesizing a schema. Every error names the rule
/// being synthesized when it was raised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("rule '{rule}': {source}")]
    Signature {
        rule: String,
        #[source]
        source: SignatureError,
    },

    #[error("rule '{rule}': malformed repeat '{signature}', min {min} exceeds max {max}")]
    MalformedRepeat {
        rule: String,
        signature: String,
        min: u32,
        max: u32,
    },

    #[error("rule '{rule}': malformed numeric value '{signature}': {reason}")]
    MalformedNumVal {
        rule: String,
        signature: String,
        reason: String,
    },

    #[error("rule '{rule}': reference to undefined rule '{reference}'")]
    UndefinedRule { rule: String, reference: String },

    #[error("rule '{rule}': unsupported construct '{signature}': {reason}")]
    Unsupported {
        rule: String,
        signature: String,
        reason: String,
    },

    #[error("rule '{rule}': invariant violated for '{signature}': {message}")]
    InvariantViolation {
        rule: String,
        signature: String,
        message: String,
    },
}

impl Error {
    /// The rule that was being synthesized.
    pub fn rule(&self) -> &str {
        match self {
            Error::Signature { rule, .. }
            | Error::MalformedRepeat { rule, .. }
            | Error::MalformedNumVal { rule, .. }
            | Error::UndefinedRule { rule, .. }
            | Error::Unsupported { rule, .. }
            | Error::InvariantViolation { rule, .. } => rule,
        }
    }
}
