//! Synthesizes a concrete syntax tree schema from an ABNF grammar.
//!
//! Every grammar rule gets exactly one node, and every recurring anonymous
//! shape (a nested alternation, a repeated element, a literal, a numeric
//! range) gets exactly one shared inner node, named after its canonical
//! signature. Numeric terminals are expanded into one type per value, built
//! out of shared digit types. Every sum gets a visitor contract for exhaustive
//! double dispatch.
//!
//! ```
//! let grammar: abnf::Grammar = "bit = \"0\" / \"1\"\n".parse().unwrap();
//! let schema = cstgen::synthesize(&grammar).unwrap();
//!
//! let bit = schema.node(schema.rule("BIT").unwrap());
//! let variants: Vec<&str> = bit.variants().iter().map(|v| v.name.as_str()).collect();
//! assert_eq!(variants, vec!["_ʺx30ʺ", "_ʺx31ʺ"]);
//! assert_eq!(schema.contracts()[0].visitor, "_bitVisitor");
//! ```
mod dedup;
mod error;
mod node;
mod numeric;
mod options;
mod reserve;
pub mod signature;
mod synth;
mod visitor;

pub use dedup::{Collision, DedupCache, Shape};
pub use error::{Error, Result, SignatureError};
pub use node::{Field, Node, NodeId, NodeKind, Origin, Schema, Terminal, Variant};
pub use options::SynthesisOptions;
pub use signature::Signer;
pub use synth::{synthesize, synthesize_with};
pub use visitor::{Accept, VisitorContract, DISPATCH};
