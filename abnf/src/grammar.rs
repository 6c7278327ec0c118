use std::collections::HashMap;
use std::fmt::{self, Display};
use std::str::FromStr;

use nom::combinator::all_consuming;
use tracing::debug;

use crate::error::{Error, Result};
use crate::parser;
use crate::{DefinedAs, Rule, RuleName, CORE_RULES};

/// A rule table holding exactly one rule per case-insensitive name.
///
/// Incremental definitions (`=/`) are folded into the rule they extend, so
/// every rule in the table is a complete definition.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Grammar {
    rules: Vec<Rule>,
    index: HashMap<RuleName, usize>,
}

impl Grammar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a rule table from definitions in declaration order.
    pub fn from_rules<I>(rules: I) -> Result<Self>
    where
        I: IntoIterator<Item = Rule>,
    {
        let mut grammar = Grammar::new();
        for rule in rules {
            grammar.define(rule)?;
        }
        Ok(grammar)
    }

    /// Add a definition to the table.
    ///
    /// Fresh definitions must introduce a new name. Incremental definitions
    /// must extend an existing one, their branches are appended after the
    /// existing branches.
    pub fn define(&mut self, rule: Rule) -> Result<()> {
        let existing = self.index.get(&rule.name).copied();
        match (existing, rule.defined_as) {
            (None, DefinedAs::Fresh) => {
                debug!(rule = %rule.name, "rule defined");
                self.index.insert(rule.name.clone(), self.rules.len());
                self.rules.push(rule);
                Ok(())
            }
            (Some(idx), DefinedAs::Incremental) => {
                debug!(
                    rule = %rule.name,
                    branches = rule.body.branches().len(),
                    "alternatives appended"
                );
                self.rules[idx].body.extend(rule.body);
                Ok(())
            }
            (Some(_), DefinedAs::Fresh) => Err(Error::DuplicateRule(rule.name.to_string())),
            (None, DefinedAs::Incremental) => {
                Err(Error::UndefinedIncrement(rule.name.to_string()))
            }
        }
    }

    pub fn get(&self, name: &RuleName) -> Option<&Rule> {
        self.index.get(name).map(|&idx| &self.rules[idx])
    }

    /// Look up a rule by name, ignoring case.
    pub fn lookup(&self, name: &str) -> Option<&Rule> {
        RuleName::new(name).ok().and_then(|name| self.get(&name))
    }

    /// The canonical name of a rule, as written in its first definition.
    pub fn canonical_name(&self, name: &RuleName) -> Option<&RuleName> {
        self.get(name).map(|rule| &rule.name)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Names referenced by some rule but not defined, in order of first
    /// reference.
    pub fn undefined_references(&self) -> Vec<RuleName> {
        let mut missing: Vec<RuleName> = Vec::new();
        for rule in &self.rules {
            for name in rule.body.references() {
                if self.get(name).is_none() && !missing.contains(name) {
                    missing.push(name.clone());
                }
            }
        }
        missing
    }

    /// Add the RFC 5234 core rules this grammar references without defining.
    ///
    /// Only the rules that are needed are added, including core rules that
    /// are only referenced by other core rules. Rules defined by the grammar
    /// itself always win over the core rule of the same name.
    pub fn with_core_rules(mut self) -> Result<Self> {
        let core: Grammar = CORE_RULES.parse()?;
        loop {
            let needed: Vec<Rule> = self
                .undefined_references()
                .iter()
                .filter_map(|name| core.get(name).cloned())
                .collect();
            if needed.is_empty() {
                return Ok(self);
            }
            for rule in needed {
                debug!(rule = %rule.name, "core rule added");
                self.define(rule)?;
            }
        }
    }
}

impl Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for rule in &self.rules {
            writeln!(f, "{}", rule)?;
        }
        Ok(())
    }
}

impl FromStr for Grammar {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let text = parser::terminate_line(s);
        let (_, rules) = all_consuming(parser::rulelist)(&*text)?;
        Grammar::from_rules(rules)
    }
}
