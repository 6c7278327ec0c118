//! Signature keyed node cache.

use std::collections::HashMap;

use abnf::{Alternation, Concatenation, Element, Repetition};
use tracing::trace;

use crate::error::Error;
use crate::node::NodeId;

/// The grammar fragment a signature was computed from.
///
/// Rule references compare ignoring case, the same way they resolve.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Shape {
    Alternation(Alternation),
    Concatenation(Concatenation),
    Repetition(Repetition),
    Element(Element),
}

/// Two different shapes produced the same signature.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Collision {
    pub signature: String,
    /// Rule that requested the signature.
    pub rule: String,
    /// Rule that first registered it.
    pub first_rule: String,
    pub existing: Shape,
    pub requested: Shape,
}

impl From<Collision> for Error {
    fn from(c: Collision) -> Error {
        Error::InvariantViolation {
            rule: c.rule,
            message: format!(
                "signature first produced by {:?} in rule '{}', now by {:?}",
                c.existing, c.first_rule, c.requested
            ),
            signature: c.signature,
        }
    }
}

#[derive(Debug)]
struct Entry {
    shape: Shape,
    node: NodeId,
    rule: String,
}

/// Maps signatures to the node built for them during one synthesis run.
///
/// The cache is owned by the run and handed down the call graph, a fresh run
/// starts from an empty cache.
#[derive(Debug, Default)]
pub struct DedupCache {
    entries: HashMap<String, Entry>,
}

impl DedupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the node registered for a signature. The shape must match the
    /// shape the node was built from.
    pub fn lookup(
        &self,
        signature: &str,
        shape: &Shape,
        rule: &str,
    ) -> Result<Option<NodeId>, Collision> {
        match self.entries.get(signature) {
            None => Ok(None),
            Some(entry) if &entry.shape == shape => Ok(Some(entry.node)),
            Some(entry) => Err(Collision {
                signature: signature.to_owned(),
                rule: rule.to_owned(),
                first_rule: entry.rule.clone(),
                existing: entry.shape.clone(),
                requested: shape.clone(),
            }),
        }
    }

    /// Return the node for a signature, calling `build` to create it on a
    /// miss. Nested lookups made by `build` go through the cache it's given.
    pub fn lookup_or_create<E, F>(
        &mut self,
        signature: String,
        shape: Shape,
        rule: &str,
        build: F,
    ) -> Result<NodeId, E>
    where
        E: From<Collision>,
        F: FnOnce(&mut DedupCache) -> Result<NodeId, E>,
    {
        if let Some(node) = self.lookup(&signature, &shape, rule)? {
            trace!(%signature, %node, "dedup hit");
            return Ok(node);
        }
        let node = build(self)?;
        // A nested build can't register the signature of its own ancestor,
        // shapes are strictly smaller on the way down.
        self.entries.insert(
            signature,
            Entry {
                shape,
                node,
                rule: rule.to_owned(),
            },
        );
        Ok(node)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
