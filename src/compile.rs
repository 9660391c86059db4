//! Template compiler.
//!
//! Turns a flat [`Template`] into an immutable [`CompiledTemplate`]:
//!
//! 1. every entry is checked (name shape, entry kind) and its grammar parsed;
//! 2. a second pass registers every child/element name that is referenced but
//!    never defined as [`Rule::Unconstrained`];
//! 3. the root rule must exist.
//!
//! The second pass runs only after all entries are read, so the outcome does not
//! depend on entry order.
pub mod grammar;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::{CdlError, ErrorKind, Result};
use crate::rule::{Pseudotype, Rule, ROOT};
use crate::template::{Entry, Template};

static RULE_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(/|\w+)$").unwrap());

/// Resolved rule set. Immutable once built; share it freely between threads.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    rules: IndexMap<String, Rule>,
}

impl CompiledTemplate {
    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    pub fn rules(&self) -> impl Iterator<Item = (&str, &Rule)> {
        self.rules.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

pub fn compile(template: &Template) -> Result<CompiledTemplate> {
    let mut rules = IndexMap::with_capacity(template.len());

    for (name, entry) in template.iter() {
        if !RULE_NAME_RE.is_match(name) {
            return Err(CdlError::new(ErrorKind::BadKey).with_context(name));
        }
        let rule = compile_entry(name, entry).map_err(|e| e.with_context(name))?;
        debug!(rule = name, kind = rule.kind_name(), "compiled rule");
        rules.insert(name.to_string(), rule);
    }

    let undefined: Vec<String> = rules
        .values()
        .flat_map(Rule::references)
        .filter(|child| !rules.contains_key(*child))
        .map(str::to_string)
        .collect();
    for name in undefined {
        if !rules.contains_key(&name) {
            debug!(rule = %name, "auto-registered unconstrained rule");
            rules.insert(name, Rule::Unconstrained);
        }
    }

    if !rules.contains_key(ROOT) {
        return Err(CdlError::new(ErrorKind::MissingRoot));
    }
    Ok(CompiledTemplate { rules })
}

/// Like [`compile`] but panics on a bad template. Meant for templates that are
/// program constants, e.g. behind a `Lazy` static.
pub fn compile_or_panic(template: &Template) -> CompiledTemplate {
    match compile(template) {
        Ok(compiled) => compiled,
        Err(error) => panic!("cdl: compile failed: {error}"),
    }
}

fn compile_entry(name: &str, entry: &Entry) -> Result<Rule> {
    match entry {
        Entry::Grammar(grammar) => compile_grammar(name, grammar),
        Entry::Validator(f) => Ok(Rule::Validator(f.clone())),
        Entry::Enum(ty) => Ok(Rule::Enum(ty.clone())),
        Entry::Unsupported(value) => Err(CdlError::new(ErrorKind::BadValue)
            .with_supplementary(format!("unsupported template value {value}"))),
    }
}

fn compile_grammar(name: &str, grammar: &str) -> Result<Rule> {
    if grammar.is_empty() {
        if name == ROOT {
            return Err(CdlError::new(ErrorKind::BadValue)
                .with_supplementary("the root rule cannot alias itself"));
        }
        return Ok(Rule::Root);
    }
    if let Some(rest) = grammar.strip_prefix("{}") {
        return grammar::parse_map_spec(rest).map(Rule::Map);
    }
    if let Some(rest) = grammar.strip_prefix("[]") {
        let (element, range) = grammar::parse_array_spec(rest)?;
        return Ok(Rule::Array { element, range });
    }
    Ok(match Pseudotype::from_name(grammar) {
        Some(pseudo) => Rule::Pseudotype(pseudo),
        None => Rule::Scalar(grammar.to_string()),
    })
}
