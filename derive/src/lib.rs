//! Proc macro for deriving concrete syntax tree types from ABNF grammars.
//!
//! ```ignore
//! #[derive(Cst)]
//! #[abnf_file = "grammars/abnf.abnf"]
//! #[abnf_module = "meta"]
//! pub struct AbnfGrammar;
//! ```
//!
//! The grammar is completed with the RFC 5234 core rules it references and
//! compiled into a module holding one type per rule, an `inners` module with
//! one type per shared anonymous shape, and a visitor trait per sum type.
//! Errors are reported as compile errors at the derive site.

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod error;
mod generate;

#[proc_macro_derive(Cst, attributes(abnf_file, abnf_inline, abnf_module))]
pub fn derive(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    match generate::generate(&ast) {
        Ok(expanded) => expanded.into(),
        Err(e) => e.into_syn(ast.ident.span()).to_compile_error().into(),
    }
}
