//! Canonical signatures.
//!
//! A signature renders a grammar shape as an identifier fragment. Equal shapes
//! always render to the same string and different shapes never do, so the
//! signature doubles as the deduplication key and as the generated name.

use std::fmt::Write;

use abnf::{
    Alternation, Concatenation, Element, Grammar, NumSpec, NumVal, Repeat, Repetition, RuleName,
};

use crate::error::SignatureError;

/// Wraps a quoted literal.
pub const LITERAL: char = 'ʺ';
/// Prefixes a numeric terminal.
pub const NUMERIC: char = 'Ⰳ';
/// Numeric range dash, also stands in for `-` in rule names.
pub const DASH: char = 'ⲻ';
/// Separates the values of a numeric concatenation (`%x0D.0A`).
pub const DOT: char = 'ꓸ';
pub const GROUP_OPEN: char = 'Ⲥ';
pub const OPTION_OPEN: char = 'Ⳋ';
/// Closes both groups and options.
pub const CLOSE: char = 'Ↄ';
/// Repetition marker, `*`.
pub const REPEAT: char = 'Ж';
/// Alternation separator, `/`.
pub const ALTERNATIVE: char = 'Ⳇ';
/// Concatenation separator.
pub const CONCAT: char = '_';
/// Wraps prose.
pub const PROSE: char = 'Ⲣ';

/// Computes signatures against a rule table, so rule references render with
/// the canonical spelling of the rule they resolve to.
#[derive(Clone, Copy, Debug)]
pub struct Signer<'g> {
    grammar: &'g Grammar,
}

type Result<T> = std::result::Result<T, SignatureError>;

impl<'g> Signer<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Signer { grammar }
    }

    pub fn alternation(&self, alt: &Alternation) -> Result<String> {
        let mut out = String::new();
        self.write_alternation(alt, &mut out)?;
        Ok(out)
    }

    pub fn concatenation(&self, concat: &Concatenation) -> Result<String> {
        let mut out = String::new();
        self.write_concatenation(concat, &mut out)?;
        Ok(out)
    }

    pub fn repetition(&self, rep: &Repetition) -> Result<String> {
        let mut out = String::new();
        self.write_repetition(rep, &mut out)?;
        Ok(out)
    }

    pub fn element(&self, element: &Element) -> Result<String> {
        let mut out = String::new();
        self.write_element(element, &mut out)?;
        Ok(out)
    }

    /// Render a rule name. References to defined rules use the casing of the
    /// rule's first definition.
    pub fn rule_name(&self, name: &RuleName) -> Result<String> {
        let name = self.grammar.canonical_name(name).unwrap_or(name);
        let mut out = String::with_capacity(name.as_str().len());
        for ch in name.as_str().chars() {
            match ch {
                '-' => out.push(DASH),
                c if c.is_ascii_alphanumeric() => out.push(c),
                c => {
                    return Err(SignatureError::UnencodableCharacter {
                        construct: "rule name",
                        ch: c,
                    })
                }
            }
        }
        Ok(out)
    }

    fn write_alternation(&self, alt: &Alternation, out: &mut String) -> Result<()> {
        for (i, branch) in alt.branches().iter().enumerate() {
            if i > 0 {
                out.push(ALTERNATIVE);
            }
            self.write_concatenation(branch, out)?;
        }
        Ok(())
    }

    fn write_concatenation(&self, concat: &Concatenation, out: &mut String) -> Result<()> {
        for (i, rep) in concat.elements().iter().enumerate() {
            if i > 0 {
                out.push(CONCAT);
            }
            self.write_repetition(rep, out)?;
        }
        Ok(())
    }

    fn write_repetition(&self, rep: &Repetition, out: &mut String) -> Result<()> {
        if let Some(repeat) = &rep.repeat {
            out.push_str(&repeat_prefix(repeat));
        }
        self.write_element(&rep.element, out)
    }

    fn write_element(&self, element: &Element, out: &mut String) -> Result<()> {
        match element {
            Element::Rulename(name) => out.push_str(&self.rule_name(name)?),
            Element::Group(alt) => {
                out.push(GROUP_OPEN);
                self.write_alternation(alt, out)?;
                out.push(CLOSE);
            }
            Element::Option(alt) => {
                out.push(OPTION_OPEN);
                self.write_alternation(alt, out)?;
                out.push(CLOSE);
            }
            Element::CharVal(text) => {
                out.push(LITERAL);
                encode_text(text, "literal", out)?;
                out.push(LITERAL);
            }
            Element::NumVal(num) => out.push_str(&num_val(num)),
            Element::ProseVal(text) => {
                out.push(PROSE);
                encode_text(text, "prose", out)?;
                out.push(PROSE);
            }
        }
        Ok(())
    }
}

/// `n` for exact repeats, `[min]Ж[max]` for ranges.
pub fn repeat_prefix(repeat: &Repeat) -> String {
    match *repeat {
        Repeat::Exact(n) => n.to_string(),
        Repeat::Range { min, max } => {
            let mut out = String::new();
            if let Some(min) = min {
                out.push_str(&min.to_string());
            }
            out.push(REPEAT);
            if let Some(max) = max {
                out.push_str(&max.to_string());
            }
            out
        }
    }
}

pub fn num_val(num: &NumVal) -> String {
    let mut out = String::new();
    out.push(NUMERIC);
    out.push(num.base.letter());
    match &num.spec {
        NumSpec::Single(v) => out.push_str(&num.base.format(*v)),
        NumSpec::Range(lo, hi) => {
            out.push_str(&num.base.format(*lo));
            out.push(DASH);
            out.push_str(&num.base.format(*hi));
        }
        NumSpec::Concat(values) => {
            for (i, v) in values.iter().enumerate() {
                if i > 0 {
                    out.push(DOT);
                }
                out.push_str(&num.base.format(*v));
            }
        }
    }
    out
}

/// Every character becomes `x` and two hex digits. Only printable ASCII can be
/// encoded that way, anything else is an error rather than a lossy name.
fn encode_text(text: &str, construct: &'static str, out: &mut String) -> Result<()> {
    for ch in text.chars() {
        if !(' '..='~').contains(&ch) {
            return Err(SignatureError::UnencodableCharacter { construct, ch });
        }
        // Writing to a String can't fail.
        let _ = write!(out, "x{:02X}", ch as u32);
    }
    Ok(())
}
