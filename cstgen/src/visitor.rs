//! Double dispatch contracts for sum nodes.
//!
//! Every sum gets a visitor with one `accept` method per variant, and a
//! `dispatch` entry point on the sum that forwards to exactly one of them.
//! Adding a variant to a sum adds a method to its visitor, so implementations
//! that miss a variant stop compiling.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::node::{Node, NodeId, Origin, Schema};

/// Name of the dispatch entry point on every sum.
pub const DISPATCH: &str = "dispatch";

/// One visitor method.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Accept {
    /// `accept` followed by the variant name.
    pub method: String,
    pub variant: String,
    /// Type the method receives.
    pub payload: NodeId,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct VisitorContract {
    pub sum: NodeId,
    /// Name of the visitor trait, the sum name followed by `Visitor`.
    pub visitor: String,
    pub dispatch: String,
    /// One entry per variant, in variant order.
    pub accepts: Vec<Accept>,
}

/// Contracts for every sum in the schema, in node order.
///
/// A visitor is declared next to its sum, so its name must not be taken by a
/// node of the same origin.
pub fn generate(schema: &Schema) -> Result<Vec<VisitorContract>> {
    let taken: HashSet<(Origin, &str)> = schema
        .nodes()
        .map(|(_, node)| (node.origin, node.name.as_str()))
        .collect();

    schema
        .sums()
        .map(|(id, node)| {
            let contract = contract(id, node)?;
            if taken.contains(&(node.origin, contract.visitor.as_str())) {
                return Err(Error::InvariantViolation {
                    rule: node.name.clone(),
                    signature: node.signature.clone(),
                    message: format!("visitor '{}' is also a node name", contract.visitor),
                });
            }
            Ok(contract)
        })
        .collect()
}

fn contract(id: NodeId, node: &Node) -> Result<VisitorContract> {
    let accepts: Vec<Accept> = node
        .variants()
        .iter()
        .map(|v| Accept {
            method: format!("accept{}", v.name),
            variant: v.name.clone(),
            payload: v.payload,
        })
        .collect();

    let violation = |message: String| Error::InvariantViolation {
        rule: node.name.clone(),
        signature: node.signature.clone(),
        message,
    };
    if accepts.is_empty() || accepts.len() != node.variants().len() {
        return Err(violation(format!(
            "{} accept methods for {} variants",
            accepts.len(),
            node.variants().len()
        )));
    }
    let mut seen = HashSet::new();
    for accept in &accepts {
        if !seen.insert(accept.method.as_str()) {
            return Err(violation(format!(
                "duplicate visitor method '{}'",
                accept.method
            )));
        }
    }

    Ok(VisitorContract {
        sum: id,
        visitor: format!("{}Visitor", node.name),
        dispatch: DISPATCH.to_owned(),
        accepts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeKind, Terminal, Variant};

    fn node(name: &str, kind: NodeKind) -> Node {
        Node {
            name: name.to_owned(),
            signature: name[1..].to_owned(),
            origin: Origin::Inner,
            kind,
        }
    }

    #[test]
    fn accept_per_variant() {
        let sum = node(
            "_aⳆb",
            NodeKind::Sum(vec![
                Variant {
                    name: "_a".to_owned(),
                    payload: NodeId::new(1),
                },
                Variant {
                    name: "_b".to_owned(),
                    payload: NodeId::new(2),
                },
            ]),
        );
        let c = contract(NodeId::new(0), &sum).unwrap();
        assert_eq!(c.visitor, "_aⳆbVisitor");
        assert_eq!(c.dispatch, "dispatch");
        let methods: Vec<&str> = c.accepts.iter().map(|a| a.method.as_str()).collect();
        assert_eq!(methods, vec!["accept_a", "accept_b"]);
        assert_eq!(c.accepts[1].payload, NodeId::new(2));
    }

    #[test]
    fn duplicate_variant_names_rejected() {
        let sum = node(
            "_s",
            NodeKind::Sum(vec![
                Variant {
                    name: "_a".to_owned(),
                    payload: NodeId::new(1),
                },
                Variant {
                    name: "_a".to_owned(),
                    payload: NodeId::new(1),
                },
            ]),
        );
        assert!(matches!(
            contract(NodeId::new(0), &sum),
            Err(Error::InvariantViolation { .. })
        ));
    }

    #[test]
    fn empty_sum_rejected() {
        let sum = node("_s", NodeKind::Sum(vec![]));
        assert!(contract(NodeId::new(0), &sum).is_err());

        // Not a sum, nothing to generate from.
        let literal = node("_ʺx61ʺ", NodeKind::Terminal(Terminal::Literal("a".to_owned())));
        assert!(contract(NodeId::new(0), &literal).is_err());
    }
}
