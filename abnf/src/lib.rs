//! The ABNF (RFC 5234) grammar model.
//!
//! Grammars are plain data: a rule table of [`Rule`]s whose bodies are
//! [`Alternation`]s of [`Concatenation`]s of [`Repetition`]s of [`Element`]s.
//! Everything renders back to ABNF text through `Display` and can be read from
//! text through `FromStr`.

use std::cmp::Ordering;
use std::fmt::{self, Display};
use std::hash::{Hash, Hasher};
use std::str::FromStr;

mod core_rules;
mod error;
mod grammar;
mod parser;

pub use core_rules::CORE_RULES;
pub use error::{Error, Result};
pub use grammar::Grammar;

/// The name of a rule. Rule names are case insensitive, but the casing they
/// were written with is kept for display.
#[derive(Clone, Debug)]
pub struct RuleName(String);

impl RuleName {
    /// Create a rule name, checking it against `ALPHA *(ALPHA / DIGIT / "-")`.
    pub fn new(name: &str) -> Result<Self> {
        let mut chars = name.chars();
        let valid = match chars.next() {
            Some(c) if c.is_ascii_alphabetic() => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
            }
            _ => false,
        };
        if valid {
            Ok(RuleName(name.to_owned()))
        } else {
            Err(Error::InvalidRuleName(name.to_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn folded(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.bytes().map(|b| b.to_ascii_lowercase())
    }
}

impl PartialEq for RuleName {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for RuleName {}

impl Hash for RuleName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.folded() {
            state.write_u8(b);
        }
        state.write_u8(0xff);
    }
}

impl PartialOrd for RuleName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RuleName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded().cmp(other.folded())
    }
}

impl Display for RuleName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RuleName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        RuleName::new(s)
    }
}

/// Repetition bounds.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Repeat {
    /// `n element`
    Exact(u32),
    /// `[min]*[max] element`. A missing min is 0, a missing max is unbounded.
    Range { min: Option<u32>, max: Option<u32> },
}

impl Repeat {
    /// Create a range repeat, rejecting `min > max`.
    pub fn range(min: Option<u32>, max: Option<u32>) -> Result<Self> {
        let repeat = Repeat::Range { min, max };
        if repeat.is_valid() {
            Ok(repeat)
        } else {
            Err(Error::InvalidRepeat {
                min: repeat.min(),
                max: max.unwrap_or_default(),
            })
        }
    }

    pub fn min(&self) -> u32 {
        match *self {
            Repeat::Exact(n) => n,
            Repeat::Range { min, .. } => min.unwrap_or(0),
        }
    }

    pub fn max(&self) -> Option<u32> {
        match *self {
            Repeat::Exact(n) => Some(n),
            Repeat::Range { max, .. } => max,
        }
    }

    pub fn is_valid(&self) -> bool {
        match self.max() {
            Some(max) => self.min() <= max,
            None => true,
        }
    }
}

impl Display for Repeat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Repeat::Exact(n) => write!(f, "{}", n),
            Repeat::Range { min, max } => {
                if let Some(min) = min {
                    write!(f, "{}", min)?;
                }
                write!(f, "*")?;
                if let Some(max) = max {
                    write!(f, "{}", max)?;
                }
                Ok(())
            }
        }
    }
}

/// Radix of a numeric value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Base {
    Bin,
    Dec,
    Hex,
}

impl Base {
    pub fn radix(self) -> u32 {
        match self {
            Base::Bin => 2,
            Base::Dec => 10,
            Base::Hex => 16,
        }
    }

    /// The letter following `%` in ABNF text.
    pub fn letter(self) -> char {
        match self {
            Base::Bin => 'b',
            Base::Dec => 'd',
            Base::Hex => 'x',
        }
    }

    /// Render a value in this base. Hex values are upper case and padded to
    /// whole bytes.
    pub fn format(self, value: u32) -> String {
        match self {
            Base::Bin => format!("{:b}", value),
            Base::Dec => format!("{}", value),
            Base::Hex => {
                let digits = format!("{:X}", value);
                if digits.len() % 2 == 1 {
                    format!("0{}", digits)
                } else {
                    digits
                }
            }
        }
    }
}

impl Display for Base {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Base::Bin => write!(f, "binary"),
            Base::Dec => write!(f, "decimal"),
            Base::Hex => write!(f, "hexadecimal"),
        }
    }
}

/// The values a numeric terminal matches.
///
/// A concatenation of one value equals the single value.
#[derive(Clone, Eq, Debug)]
pub enum NumSpec {
    /// `%x41`
    Single(u32),
    /// `%x41-5A`, inclusive.
    Range(u32, u32),
    /// `%x0D.0A`
    Concat(Vec<u32>),
}

impl PartialEq for NumSpec {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (NumSpec::Single(a), NumSpec::Single(b)) => a == b,
            (NumSpec::Range(a_lo, a_hi), NumSpec::Range(b_lo, b_hi)) => {
                a_lo == b_lo && a_hi == b_hi
            }
            (NumSpec::Concat(a), NumSpec::Concat(b)) => a == b,
            (NumSpec::Single(v), NumSpec::Concat(values))
            | (NumSpec::Concat(values), NumSpec::Single(v)) => values.as_slice() == [*v],
            _ => false,
        }
    }
}

/// A numeric terminal (`%b`, `%d` or `%x`).
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct NumVal {
    pub base: Base,
    pub spec: NumSpec,
}

impl NumVal {
    pub fn single(base: Base, value: u32) -> Self {
        NumVal {
            base,
            spec: NumSpec::Single(value),
        }
    }

    pub fn range(base: Base, lo: u32, hi: u32) -> Result<Self> {
        if lo > hi {
            return Err(Error::ReversedRange { lo, hi });
        }
        Ok(NumVal {
            base,
            spec: NumSpec::Range(lo, hi),
        })
    }

    /// Values matched one after the other. A single value is the same
    /// terminal as [`NumVal::single`].
    pub fn concat(base: Base, values: Vec<u32>) -> Result<Self> {
        match values.as_slice() {
            [] => return Err(Error::EmptyDigits),
            &[value] => return Ok(NumVal::single(base, value)),
            _ => (),
        }
        Ok(NumVal {
            base,
            spec: NumSpec::Concat(values),
        })
    }

    /// Parse the part of a numeric value following the base letter, e.g.
    /// `41-5A` or `0D.0A`.
    pub fn parse(base: Base, digits: &str) -> Result<Self> {
        let value = |s: &str| -> Result<u32> {
            if s.is_empty() {
                return Err(Error::EmptyDigits);
            }
            u32::from_str_radix(s, base.radix()).map_err(|_| Error::InvalidDigits {
                base,
                digits: s.to_owned(),
            })
        };

        if let Some((lo, hi)) = digits.split_once('-') {
            return NumVal::range(base, value(lo)?, value(hi)?);
        }
        let values = digits.split('.').map(value).collect::<Result<Vec<_>>>()?;
        NumVal::concat(base, values)
    }
}

impl Display for NumVal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "%{}", self.base.letter())?;
        match &self.spec {
            NumSpec::Single(v) => write!(f, "{}", self.base.format(*v)),
            NumSpec::Range(lo, hi) => {
                write!(f, "{}-{}", self.base.format(*lo), self.base.format(*hi))
            }
            NumSpec::Concat(values) => {
                let values: Vec<String> = values.iter().map(|v| self.base.format(*v)).collect();
                write!(f, "{}", values.join("."))
            }
        }
    }
}

/// The smallest unit of a rule body.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Element {
    Rulename(RuleName),
    /// `( alternation )`
    Group(Alternation),
    /// `[ alternation ]`
    Option(Alternation),
    /// A quoted, case-insensitive literal.
    CharVal(String),
    NumVal(NumVal),
    /// `<prose>`, opaque.
    ProseVal(String),
}

impl Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Element::Rulename(name) => write!(f, "{}", name),
            Element::Group(alt) => write!(f, "( {} )", alt),
            Element::Option(alt) => write!(f, "[ {} ]", alt),
            Element::CharVal(s) => write!(f, "\"{}\"", s),
            Element::NumVal(num) => write!(f, "{}", num),
            Element::ProseVal(s) => write!(f, "<{}>", s),
        }
    }
}

/// An element with optional repetition bounds.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Repetition {
    pub repeat: Option<Repeat>,
    pub element: Element,
}

impl Repetition {
    /// The effective `(min, max)` bounds. No repeat means exactly once.
    pub fn bounds(&self) -> (u32, Option<u32>) {
        match &self.repeat {
            Some(repeat) => (repeat.min(), repeat.max()),
            None => (1, Some(1)),
        }
    }
}

impl From<Element> for Repetition {
    fn from(element: Element) -> Self {
        Repetition {
            repeat: None,
            element,
        }
    }
}

impl Display for Repetition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(repeat) = &self.repeat {
            write!(f, "{}", repeat)?;
        }
        write!(f, "{}", self.element)
    }
}

/// A non-empty sequence of repetitions.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Concatenation(Vec<Repetition>);

impl Concatenation {
    pub fn new(elements: Vec<Repetition>) -> Result<Self> {
        if elements.is_empty() {
            return Err(Error::EmptyConcatenation);
        }
        Ok(Concatenation(elements))
    }

    pub fn elements(&self) -> &[Repetition] {
        &self.0
    }
}

impl From<Repetition> for Concatenation {
    fn from(rep: Repetition) -> Self {
        Concatenation(vec![rep])
    }
}

impl Display for Concatenation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let elements: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", elements.join(" "))
    }
}

/// A non-empty, ordered choice between concatenations.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Alternation(Vec<Concatenation>);

impl Alternation {
    pub fn new(branches: Vec<Concatenation>) -> Result<Self> {
        if branches.is_empty() {
            return Err(Error::EmptyAlternation);
        }
        Ok(Alternation(branches))
    }

    pub fn branches(&self) -> &[Concatenation] {
        &self.0
    }

    /// Append the branches of another alternation, keeping their order.
    pub fn extend(&mut self, other: Alternation) {
        self.0.extend(other.0)
    }

    /// Every rule name referenced from this alternation, in order of
    /// appearance.
    pub fn references(&self) -> Vec<&RuleName> {
        let mut names = Vec::new();
        collect_references(self, &mut names);
        names
    }
}

fn collect_references<'a>(alt: &'a Alternation, names: &mut Vec<&'a RuleName>) {
    for branch in alt.branches() {
        for rep in branch.elements() {
            match &rep.element {
                Element::Rulename(name) => names.push(name),
                Element::Group(inner) | Element::Option(inner) => {
                    collect_references(inner, names)
                }
                _ => (),
            }
        }
    }
}

impl From<Concatenation> for Alternation {
    fn from(concat: Concatenation) -> Self {
        Alternation(vec![concat])
    }
}

impl Display for Alternation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let branches: Vec<String> = self.0.iter().map(|b| b.to_string()).collect();
        write!(f, "{}", branches.join(" / "))
    }
}

/// How a rule was defined.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DefinedAs {
    /// `=`
    Fresh,
    /// `=/`, adding alternatives to an existing rule.
    Incremental,
}

impl Display for DefinedAs {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DefinedAs::Fresh => write!(f, "="),
            DefinedAs::Incremental => write!(f, "=/"),
        }
    }
}

/// A rule definition.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Rule {
    pub name: RuleName,
    pub defined_as: DefinedAs,
    pub body: Alternation,
}

impl Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} {}", self.name, self.defined_as, self.body)
    }
}

impl FromStr for Rule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let text = parser::terminate_line(s);
        let (_, rule) = nom::combinator::all_consuming(parser::rule)(&*text)?;
        Ok(rule)
    }
}
