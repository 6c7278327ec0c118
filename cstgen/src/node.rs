use std::collections::HashMap;
use std::fmt::{self, Display};

use abnf::{Base, RuleName};

use crate::visitor::VisitorContract;

/// Index of a node in a [`Schema`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn new(idx: usize) -> Self {
        NodeId(idx)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a node came from.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Origin {
    /// The type of a grammar rule.
    Rule,
    /// An anonymous node, shared by every occurrence of its signature.
    Inner,
}

/// One alternative of a sum.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Variant {
    pub name: String,
    pub payload: NodeId,
}

/// One member of a product.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Field {
    pub name: String,
    pub ty: NodeId,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Terminal {
    /// A quoted literal, matched ignoring case.
    Literal(String),
    /// Prose, opaque to the schema.
    Prose(String),
    /// A single digit symbol of some base.
    Digit(char),
    /// One numeric value, decomposed into digit fields.
    Value {
        base: Base,
        value: u32,
        digits: Vec<Field>,
    },
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum NodeKind {
    Sum(Vec<Variant>),
    Product(Vec<Field>),
    Optional(NodeId),
    Sequence {
        inner: NodeId,
        min: u32,
        max: Option<u32>,
    },
    Terminal(Terminal),
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Node {
    /// Identifier of the generated type.
    pub name: String,
    /// Signature of the shape the node was built from.
    pub signature: String,
    pub origin: Origin,
    pub kind: NodeKind,
}

impl Node {
    pub fn is_sum(&self) -> bool {
        matches!(self.kind, NodeKind::Sum(_))
    }

    /// Variants of a sum, empty for everything else.
    pub fn variants(&self) -> &[Variant] {
        match &self.kind {
            NodeKind::Sum(variants) => variants,
            _ => &[],
        }
    }

    /// Fields of a product or numeric value, empty for everything else.
    pub fn fields(&self) -> &[Field] {
        match &self.kind {
            NodeKind::Product(fields) => fields,
            NodeKind::Terminal(Terminal::Value { digits, .. }) => digits,
            _ => &[],
        }
    }
}

/// The synthesized type schema.
///
/// Rule nodes come first, in rule declaration order, followed by inner nodes
/// in creation order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schema {
    pub(crate) nodes: Vec<Node>,
    pub(crate) rules: Vec<(RuleName, NodeId)>,
    pub(crate) rule_index: HashMap<RuleName, NodeId>,
    pub(crate) inner_index: HashMap<String, NodeId>,
    pub(crate) contracts: Vec<VisitorContract>,
}

impl Schema {
    pub(crate) fn new(nodes: Vec<Node>, rules: Vec<(RuleName, NodeId)>) -> Self {
        let rule_index = rules.iter().cloned().collect();
        let inner_index = nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.origin == Origin::Inner)
            .map(|(idx, n)| (n.name.clone(), NodeId(idx)))
            .collect();
        Schema {
            nodes,
            rules,
            rule_index,
            inner_index,
            contracts: Vec::new(),
        }
    }

    /// Panics if the id doesn't come from this schema.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(idx, n)| (NodeId(idx), n))
    }

    /// Rule names with their nodes, in declaration order.
    pub fn rules(&self) -> impl Iterator<Item = (&RuleName, NodeId)> {
        self.rules.iter().map(|(name, id)| (name, *id))
    }

    /// Node of a rule, ignoring case.
    pub fn rule(&self, name: &str) -> Option<NodeId> {
        let name = RuleName::new(name).ok()?;
        self.rule_index.get(&name).copied()
    }

    pub fn inners(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes().filter(|(_, n)| n.origin == Origin::Inner)
    }

    /// Inner node by generated name, e.g. `_ʺx30ʺ`.
    pub fn inner(&self, name: &str) -> Option<NodeId> {
        self.inner_index.get(name).copied()
    }

    pub fn sums(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes().filter(|(_, n)| n.is_sum())
    }

    /// Visitor contracts, one per sum in node order.
    pub fn contracts(&self) -> &[VisitorContract] {
        &self.contracts
    }

    pub fn contract(&self, sum: NodeId) -> Option<&VisitorContract> {
        self.contracts.iter().find(|c| c.sum == sum)
    }

    /// Rebuild the number a value terminal stands for from its digit fields.
    pub fn decode_value(&self, id: NodeId) -> Option<u32> {
        match &self.get(id)?.kind {
            NodeKind::Terminal(Terminal::Value { base, digits, .. }) => {
                digits.iter().try_fold(0u32, |acc, field| {
                    match self.get(field.ty)?.kind {
                        NodeKind::Terminal(Terminal::Digit(symbol)) => {
                            let digit = symbol.to_digit(base.radix())?;
                            acc.checked_mul(base.radix())?.checked_add(digit)
                        }
                        _ => None,
                    }
                })
            }
            _ => None,
        }
    }
}
