//! ABNF grammars compiled into concrete syntax tree types.
//!
//! [`compile`] turns grammar text into a [`Schema`] at runtime, the [`Cst`]
//! derive does the same at compile time and emits the types.
#![allow(uncommon_codepoints, mixed_script_confusables, confusable_idents)]

use anyhow::{Context, Result};

pub use abnf::{Grammar, RuleName, CORE_RULES};
pub use cst_derive::Cst;
pub use cstgen::{
    synthesize, synthesize_with, Accept, Field, Node, NodeId, NodeKind, Origin, Schema,
    SynthesisOptions, Terminal, Variant, VisitorContract,
};

/// The ABNF definition of ABNF (RFC 5234 section 4).
pub const ABNF_GRAMMAR: &str = include_str!("../grammars/abnf.abnf");

/// Types for ABNF grammars themselves, generated from [`ABNF_GRAMMAR`].
#[derive(Cst)]
#[abnf_file = "grammars/abnf.abnf"]
#[abnf_module = "meta"]
pub struct AbnfGrammar;

/// Parse a grammar, add the core rules it uses and synthesize its schema.
pub fn compile(text: &str) -> Result<Schema> {
    compile_with(text, &SynthesisOptions::default())
}

pub fn compile_with(text: &str, options: &SynthesisOptions) -> Result<Schema> {
    let grammar: Grammar = text.parse().context("failed to parse grammar")?;
    let grammar = grammar
        .with_core_rules()
        .context("failed to add core rules")?;
    let schema = synthesize_with(&grammar, options).context("failed to synthesize schema")?;
    Ok(schema)
}
