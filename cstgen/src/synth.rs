//! Type schema synthesis.
//!
//! Every rule gets a reserved node before any body is visited, so references
//! (including recursive ones) resolve to a node id without descending into the
//! referenced rule. Anonymous shapes are built once per signature through the
//! dedup cache.

use std::collections::{BTreeMap, HashMap};

use abnf::{Alternation, Base, Concatenation, Element, Grammar, Repetition, RuleName};
use tracing::{debug, info};

use crate::dedup::{DedupCache, Shape};
use crate::error::{Error, Result, SignatureError};
use crate::node::{Field, Node, NodeId, NodeKind, Origin, Schema, Terminal, Variant};
use crate::options::SynthesisOptions;
use crate::reserve::{ReservePos, ReserveVec};
use crate::signature::Signer;
use crate::visitor;

/// Synthesize the schema of a grammar with default options.
///
/// The grammar must be closed: every referenced rule must be defined. Use
/// [`Grammar::with_core_rules`] first to pull in the RFC 5234 core rules.
pub fn synthesize(grammar: &Grammar) -> Result<Schema> {
    synthesize_with(grammar, &SynthesisOptions::default())
}

pub fn synthesize_with(grammar: &Grammar, options: &SynthesisOptions) -> Result<Schema> {
    let mut cache = DedupCache::new();
    let mut synth = Synthesizer::new(grammar, options.clone());

    for rule in grammar.rules() {
        synth.rule(&mut cache, &rule.name, &rule.body)?;
    }

    let mut schema = synth.finish()?;
    schema.contracts = visitor::generate(&schema)?;

    info!(
        rules = grammar.len(),
        nodes = schema.len(),
        sums = schema.contracts.len(),
        cached = cache.len(),
        "schema synthesized"
    );
    Ok(schema)
}

/// Where a synthesized shape should land.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Slot {
    /// A rule's reserved node. Only a sum or product can fill it.
    Rule(ReservePos),
    /// An inner node, shared through the dedup cache.
    Anonymous,
}

pub(crate) struct Synthesizer<'g> {
    signer: Signer<'g>,
    pub(crate) options: SynthesisOptions,
    nodes: ReserveVec<Node>,
    rules: HashMap<RuleName, ReservePos>,
    /// Generated rule type names, indexed by reserved position.
    rule_names: Vec<String>,
    order: Vec<(RuleName, NodeId)>,
    inner_names: HashMap<String, NodeId>,
    pub(crate) digits: BTreeMap<char, NodeId>,
    pub(crate) values: HashMap<(Base, u32), NodeId>,
    /// Rule currently being synthesized, for error reporting.
    pub(crate) current: String,
}

impl<'g> Synthesizer<'g> {
    fn new(grammar: &'g Grammar, options: SynthesisOptions) -> Self {
        let mut nodes = ReserveVec::new();
        let mut rules = HashMap::new();
        let mut rule_names = Vec::new();
        let mut order = Vec::new();
        for rule in grammar.rules() {
            let pos = nodes.reserve_next();
            rules.insert(rule.name.clone(), pos);
            rule_names.push(format!("_{}", rule_identifier(&rule.name)));
            order.push((rule.name.clone(), NodeId::new(pos.index())));
        }

        Synthesizer {
            signer: Signer::new(grammar),
            options,
            nodes,
            rules,
            rule_names,
            order,
            inner_names: HashMap::new(),
            digits: BTreeMap::new(),
            values: HashMap::new(),
            current: String::new(),
        }
    }

    fn finish(self) -> Result<Schema> {
        let rule_names = self.rule_names;
        let nodes = self.nodes.into_values().map_err(|pos| {
            let rule = rule_names.get(pos.index()).cloned().unwrap_or_default();
            Error::InvariantViolation {
                signature: rule.clone(),
                rule,
                message: "rule node was never filled".to_owned(),
            }
        })?;
        Ok(Schema::new(nodes, self.order))
    }

    fn rule(&mut self, cache: &mut DedupCache, name: &RuleName, body: &Alternation) -> Result<()> {
        self.current = name.to_string();
        let pos = self.rule_pos(name)?;
        debug!(rule = %name, branches = body.branches().len(), "synthesizing rule");

        let ty = self.alternation(cache, body, Slot::Rule(pos))?;
        if self.nodes.is_reserved(pos.index()) {
            // Body is neither a sum nor a product, wrap it so the rule still
            // gets its own named type.
            let field = format!("_{}", self.sign(|s| s.alternation(body))?);
            debug!(rule = %name, %field, "wrapping rule body");
            self.fill_rule(pos, NodeKind::Product(vec![Field { name: field, ty }]))?;
        }
        Ok(())
    }

    pub(crate) fn alternation(
        &mut self,
        cache: &mut DedupCache,
        alt: &Alternation,
        slot: Slot,
    ) -> Result<NodeId> {
        match alt.branches() {
            [branch] => self.concatenation(cache, branch, slot),
            branches => {
                let signature = self.sign(|s| s.alternation(alt))?;
                let shape = Shape::Alternation(alt.clone());
                self.materialize(cache, slot, signature, shape, |this, cache| {
                    let mut names = Vec::with_capacity(branches.len());
                    let mut payloads = Vec::with_capacity(branches.len());
                    for branch in branches {
                        names.push(format!("_{}", this.sign(|s| s.concatenation(branch))?));
                        payloads.push(this.concatenation(cache, branch, Slot::Anonymous)?);
                    }
                    let variants = disambiguate(names)
                        .into_iter()
                        .zip(payloads)
                        .map(|(name, payload)| Variant { name, payload })
                        .collect();
                    Ok(NodeKind::Sum(variants))
                })
            }
        }
    }

    fn concatenation(
        &mut self,
        cache: &mut DedupCache,
        concat: &Concatenation,
        slot: Slot,
    ) -> Result<NodeId> {
        match concat.elements() {
            [rep] => self.repetition(cache, rep, slot),
            elements => {
                let signature = self.sign(|s| s.concatenation(concat))?;
                let shape = Shape::Concatenation(concat.clone());
                self.materialize(cache, slot, signature, shape, |this, cache| {
                    let mut names = Vec::with_capacity(elements.len());
                    let mut types = Vec::with_capacity(elements.len());
                    for rep in elements {
                        names.push(format!("_{}", this.sign(|s| s.repetition(rep))?));
                        types.push(this.repetition(cache, rep, Slot::Anonymous)?);
                    }
                    Ok(NodeKind::Product(fields(names, types)))
                })
            }
        }
    }

    fn repetition(
        &mut self,
        cache: &mut DedupCache,
        rep: &Repetition,
        slot: Slot,
    ) -> Result<NodeId> {
        let (min, max) = rep.bounds();
        if let Some(max) = max {
            if min > max {
                return Err(Error::MalformedRepeat {
                    rule: self.current.clone(),
                    signature: self.sign(|s| s.repetition(rep))?,
                    min,
                    max,
                });
            }
        }

        if (min, max) == (1, Some(1)) {
            return self.element(cache, &rep.element, slot);
        }

        let signature = self.sign(|s| s.repetition(rep))?;
        let shape = Shape::Repetition(rep.clone());
        self.materialize(cache, Slot::Anonymous, signature, shape, |this, cache| {
            let inner = this.element(cache, &rep.element, Slot::Anonymous)?;
            Ok(match (min, max) {
                (0, Some(1)) => NodeKind::Optional(inner),
                _ => NodeKind::Sequence { inner, min, max },
            })
        })
    }

    fn element(&mut self, cache: &mut DedupCache, element: &Element, slot: Slot) -> Result<NodeId> {
        match element {
            Element::Rulename(name) => Ok(NodeId::new(self.rule_pos(name)?.index())),
            Element::Group(alt) => self.alternation(cache, alt, slot),
            Element::Option(alt) => {
                let signature = self.sign(|s| s.element(element))?;
                let shape = Shape::Element(element.clone());
                self.materialize(cache, Slot::Anonymous, signature, shape, |this, cache| {
                    Ok(NodeKind::Optional(this.alternation(cache, alt, Slot::Anonymous)?))
                })
            }
            Element::CharVal(text) => {
                let signature = self.sign(|s| s.element(element))?;
                let shape = Shape::Element(element.clone());
                self.materialize(cache, Slot::Anonymous, signature, shape, |_, _| {
                    Ok(NodeKind::Terminal(Terminal::Literal(text.clone())))
                })
            }
            Element::ProseVal(text) => {
                let signature = self.sign(|s| s.element(element))?;
                if !self.options.allow_prose {
                    return Err(self.unsupported(signature, "prose values are disabled"));
                }
                let shape = Shape::Element(element.clone());
                self.materialize(cache, Slot::Anonymous, signature, shape, |_, _| {
                    Ok(NodeKind::Terminal(Terminal::Prose(text.clone())))
                })
            }
            Element::NumVal(num) => self.num_val(cache, num, slot),
        }
    }

    /// Put a sum or product into its slot. Rule slots are filled directly,
    /// anonymous ones go through the cache.
    pub(crate) fn materialize<F>(
        &mut self,
        cache: &mut DedupCache,
        slot: Slot,
        signature: String,
        shape: Shape,
        build: F,
    ) -> Result<NodeId>
    where
        F: FnOnce(&mut Self, &mut DedupCache) -> Result<NodeKind>,
    {
        match slot {
            Slot::Rule(pos) => {
                let kind = build(self, cache)?;
                self.fill_rule(pos, kind)?;
                Ok(NodeId::new(pos.index()))
            }
            Slot::Anonymous => {
                let rule = self.current.clone();
                cache.lookup_or_create::<Error, _>(signature.clone(), shape, &rule, |cache| {
                    let kind = build(self, cache)?;
                    self.push_inner(format!("_{}", signature), signature, kind)
                })
            }
        }
    }

    fn fill_rule(&mut self, pos: ReservePos, kind: NodeKind) -> Result<()> {
        let name = self
            .rule_names
            .get(pos.index())
            .cloned()
            .ok_or_else(|| Error::InvariantViolation {
                rule: self.current.clone(),
                signature: self.current.clone(),
                message: format!("no rule reserved at {}", pos.index()),
            })?;
        self.nodes.insert_at_reserved(
            pos,
            Node {
                signature: name[1..].to_owned(),
                name,
                origin: Origin::Rule,
                kind,
            },
        );
        Ok(())
    }

    fn rule_pos(&self, name: &RuleName) -> Result<ReservePos> {
        self.rules
            .get(name)
            .copied()
            .ok_or_else(|| Error::UndefinedRule {
                rule: self.current.clone(),
                reference: name.to_string(),
            })
    }

    /// Add an inner node. Generated names must be unique across the schema.
    pub(crate) fn push_inner(
        &mut self,
        name: String,
        signature: String,
        kind: NodeKind,
    ) -> Result<NodeId> {
        if let Some(existing) = self.inner_names.get(&name) {
            return Err(Error::InvariantViolation {
                rule: self.current.clone(),
                signature,
                message: format!("name '{}' already used by node {}", name, existing),
            });
        }
        let id = NodeId::new(self.nodes.push(Node {
            name: name.clone(),
            signature,
            origin: Origin::Inner,
            kind,
        }));
        self.inner_names.insert(name, id);
        Ok(id)
    }

    pub(crate) fn sign<F>(&self, f: F) -> Result<String>
    where
        F: FnOnce(&Signer<'g>) -> std::result::Result<String, SignatureError>,
    {
        f(&self.signer).map_err(|source| Error::Signature {
            rule: self.current.clone(),
            source,
        })
    }

    pub(crate) fn unsupported(&self, signature: String, reason: &str) -> Error {
        Error::Unsupported {
            rule: self.current.clone(),
            signature,
            reason: reason.to_owned(),
        }
    }
}

/// Rule names as identifier fragments. Rule names are validated on
/// construction, so only `-` needs replacing.
fn rule_identifier(name: &RuleName) -> String {
    name.as_str().replace('-', &crate::signature::DASH.to_string())
}

/// Suffix repeated names with `_1`, `_2`, ... in order of appearance.
/// Unique names are left alone.
pub(crate) fn disambiguate(names: Vec<String>) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for name in &names {
        *counts.entry(name.as_str()).or_default() += 1;
    }
    let repeated: Vec<bool> = names.iter().map(|n| counts[n.as_str()] > 1).collect();

    let mut seen: HashMap<String, usize> = HashMap::new();
    names
        .into_iter()
        .zip(repeated)
        .map(|(name, repeated)| {
            if !repeated {
                return name;
            }
            let n = seen.entry(name.clone()).or_default();
            *n += 1;
            format!("{}_{}", name, n)
        })
        .collect()
}

pub(crate) fn fields(names: Vec<String>, types: Vec<NodeId>) -> Vec<Field> {
    disambiguate(names)
        .into_iter()
        .zip(types)
        .map(|(name, ty)| Field { name, ty })
        .collect()
}
