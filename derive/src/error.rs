use std::fmt::{self, Display};

use proc_macro2::Span;

pub type Result<T> = std::result::Result<T, DeriveError>;

#[derive(Debug, Clone, PartialEq)]
pub enum DeriveError {
    MissingGrammarSource,
    MultipleGrammarSources,
    InvalidAttribute(String),
    ReadGrammarFile { path: String, message: String },
    Grammar(abnf::Error),
    Schema(cstgen::Error),
    Syn(String),
}

impl DeriveError {
    /// Convert into an error rendered as `compile_error!` at `span`.
    pub fn into_syn(self, span: Span) -> syn::Error {
        syn::Error::new(span, self.to_string())
    }
}

impl Display for DeriveError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            DeriveError::MissingGrammarSource => {
                write!(f, "No grammar source provided, use abnf_file or abnf_inline")
            }
            DeriveError::MultipleGrammarSources => {
                write!(f, "At most one grammar source can be provided")
            }
            DeriveError::InvalidAttribute(ref s) => write!(f, "Invalid attribute: {}", s),
            DeriveError::ReadGrammarFile {
                ref path,
                ref message,
            } => write!(f, "Failed to read abnf file {}: {}", path, message),
            DeriveError::Grammar(ref e) => write!(f, "Invalid grammar: {}", e),
            DeriveError::Schema(ref e) => write!(f, "Failed to synthesize schema: {}", e),
            DeriveError::Syn(ref s) => write!(f, "syn error: {}", s),
        }
    }
}

impl From<syn::Error> for DeriveError {
    fn from(e: syn::Error) -> DeriveError {
        DeriveError::Syn(e.to_string())
    }
}

impl From<abnf::Error> for DeriveError {
    fn from(e: abnf::Error) -> DeriveError {
        DeriveError::Grammar(e)
    }
}

impl From<cstgen::Error> for DeriveError {
    fn from(e: cstgen::Error) -> DeriveError {
        DeriveError::Schema(e)
    }
}
