//! Numeric terminal expansion.
//!
//! A single value becomes a value terminal whose fields are its digits. A
//! range becomes a sum with one variant per value, a concatenation a product
//! of value terminals. Value and digit nodes are shared by every occurrence.

use abnf::{Base, Element, NumSpec, NumVal};
use tracing::debug;

use crate::dedup::{DedupCache, Shape};
use crate::error::{Error, Result};
use crate::node::{NodeId, NodeKind, Terminal, Variant};
use crate::signature;
use crate::synth::{fields, Slot, Synthesizer};

impl<'g> Synthesizer<'g> {
    pub(crate) fn num_val(
        &mut self,
        cache: &mut DedupCache,
        num: &NumVal,
        slot: Slot,
    ) -> Result<NodeId> {
        let signature = signature::num_val(num);
        let base = num.base;
        let shape = Shape::Element(Element::NumVal(num.clone()));
        match &num.spec {
            NumSpec::Single(value) => self.value_terminal(base, *value),
            // Renders like a single value, so it must be one.
            NumSpec::Concat(values) if values.len() == 1 => self.value_terminal(base, values[0]),
            &NumSpec::Range(lo, hi) => {
                if lo > hi {
                    return Err(Error::MalformedNumVal {
                        rule: self.current.clone(),
                        signature,
                        reason: "range bounds are reversed".to_owned(),
                    });
                }
                let len = u64::from(hi - lo) + 1;
                if len > u64::from(self.options.max_range_len) {
                    let reason = format!(
                        "range of {} values exceeds the limit of {}",
                        len, self.options.max_range_len
                    );
                    return Err(self.unsupported(signature, &reason));
                }
                debug!(%signature, len, "expanding numeric range");

                let check = signature.clone();
                self.materialize(cache, slot, signature, shape, move |this, _| {
                    let mut variants = Vec::new();
                    for value in lo..=hi {
                        let payload = this.value_terminal(base, value)?;
                        variants.push(Variant {
                            name: value_name(base, value),
                            payload,
                        });
                    }
                    if variants.len() as u64 != len {
                        return Err(Error::InvariantViolation {
                            rule: this.current.clone(),
                            signature: check,
                            message: format!("expected {} variants, built {}", len, variants.len()),
                        });
                    }
                    Ok(NodeKind::Sum(variants))
                })
            }
            NumSpec::Concat(values) => {
                if values.is_empty() {
                    return Err(Error::MalformedNumVal {
                        rule: self.current.clone(),
                        signature,
                        reason: "no values".to_owned(),
                    });
                }
                self.materialize(cache, slot, signature, shape, |this, _| {
                    let mut names = Vec::with_capacity(values.len());
                    let mut types = Vec::with_capacity(values.len());
                    for &value in values {
                        names.push(value_name(base, value));
                        types.push(this.value_terminal(base, value)?);
                    }
                    Ok(NodeKind::Product(fields(names, types)))
                })
            }
        }
    }

    /// The terminal for one value, created on first use.
    pub(crate) fn value_terminal(&mut self, base: Base, value: u32) -> Result<NodeId> {
        if let Some(&id) = self.values.get(&(base, value)) {
            return Ok(id);
        }

        let symbols: Vec<char> = base.format(value).chars().collect();
        let mut types = Vec::with_capacity(symbols.len());
        for &symbol in &symbols {
            types.push(self.digit(symbol)?);
        }
        let names = symbols.iter().map(|s| format!("_{}", s)).collect();
        let digits = fields(names, types);

        let signature = signature::num_val(&NumVal::single(base, value));
        let id = self.push_inner(
            format!("_{}", signature),
            signature,
            NodeKind::Terminal(Terminal::Value { base, value, digits }),
        )?;
        self.values.insert((base, value), id);
        Ok(id)
    }

    fn digit(&mut self, symbol: char) -> Result<NodeId> {
        if let Some(&id) = self.digits.get(&symbol) {
            return Ok(id);
        }
        let id = self.push_inner(
            format!("_{}", symbol),
            symbol.to_string(),
            NodeKind::Terminal(Terminal::Digit(symbol)),
        )?;
        self.digits.insert(symbol, id);
        Ok(id)
    }
}

/// Name of the variant or field holding a value terminal. Hex values are bare,
/// the other bases carry their letter so `%d10` and `%x10` stay apart.
pub(crate) fn value_name(base: Base, value: u32) -> String {
    match base {
        Base::Hex => format!("_{}", base.format(value)),
        _ => format!("_{}{}", base.letter(), base.format(value)),
    }
}
