// Compiled rule model. One `Rule` per rule name; no grammar text survives here.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::enums::EnumType;
use crate::template::ValidatorFn;

/// Name of the entry point rule.
pub const ROOT: &str = "/";

/// Inclusive item-count bounds; `None` on either side means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Range {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Range {
    pub const UNBOUNDED: Range = Range { min: None, max: None };

    pub fn between(min: usize, max: usize) -> Self {
        Self { min: Some(min), max: Some(max) }
    }

    pub fn at_least(min: usize) -> Self {
        Self { min: Some(min), max: None }
    }

    pub fn contains(&self, len: usize) -> bool {
        self.min.is_none_or(|min| len >= min) && self.max.is_none_or(|max| len <= max)
    }

    pub(crate) fn describe_mismatch(&self, got: usize) -> String {
        let min = self.min.unwrap_or(0);
        match self.max {
            None => format!("got {got}, expecting at least {min}"),
            Some(max) => format!("got {got}, expecting between {min} and {max}"),
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            (None, None) => Ok(()),
            (min, None) => write!(f, "{{{},}}", min.unwrap_or(0)),
            (min, Some(max)) => write!(f, "{{{},{}}}", min.unwrap_or(0), max),
        }
    }
}

/// Presence and cardinality of one map child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirement {
    pub mandatory: bool,
    pub array: bool,
    pub range: Range,
}

impl Default for Requirement {
    fn default() -> Self {
        Self { mandatory: true, array: false, range: Range::UNBOUNDED }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pseudotype {
    Number,
    Integer,
    IpPort,
}

impl Pseudotype {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "number" => Some(Pseudotype::Number),
            "integer" => Some(Pseudotype::Integer),
            "ipport" => Some(Pseudotype::IpPort),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Pseudotype::Number => "number",
            Pseudotype::Integer => "integer",
            Pseudotype::IpPort => "ipport",
        }
    }
}

#[derive(Clone)]
pub enum Rule {
    /// Exact concrete type name, see [`type_name_of`].
    Scalar(String),
    Pseudotype(Pseudotype),
    Enum(Arc<EnumType>),
    Map(IndexMap<String, Requirement>),
    Array { element: String, range: Range },
    Validator(ValidatorFn),
    /// Empty grammar: validates against the root rule.
    Root,
    /// Referenced by a map or array spec but never defined; accepts anything.
    Unconstrained,
}

impl Rule {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Rule::Scalar(_) => "scalar",
            Rule::Pseudotype(_) => "pseudotype",
            Rule::Enum(_) => "enum",
            Rule::Map(_) => "map",
            Rule::Array { .. } => "array",
            Rule::Validator(_) => "validator",
            Rule::Root => "root",
            Rule::Unconstrained => "unconstrained",
        }
    }

    /// Names of other rules this one descends into.
    pub fn references(&self) -> Vec<&str> {
        match self {
            Rule::Map(children) => children.keys().map(String::as_str).collect(),
            Rule::Array { element, .. } => vec![element.as_str()],
            _ => Vec::new(),
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Scalar(name) => f.debug_tuple("Scalar").field(name).finish(),
            Rule::Pseudotype(p) => f.debug_tuple("Pseudotype").field(p).finish(),
            Rule::Enum(ty) => f.debug_tuple("Enum").field(&ty.tokens().collect::<Vec<_>>()).finish(),
            Rule::Map(children) => f.debug_tuple("Map").field(children).finish(),
            Rule::Array { element, range } => f
                .debug_struct("Array")
                .field("element", element)
                .field("range", range)
                .finish(),
            Rule::Validator(_) => f.write_str("Validator(..)"),
            Rule::Root => f.write_str("Root"),
            Rule::Unconstrained => f.write_str("Unconstrained"),
        }
    }
}

/// Renders the rule back in template grammar (enums and validators are
/// described, not reproduced).
impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Scalar(name) => f.write_str(name),
            Rule::Pseudotype(p) => f.write_str(p.name()),
            Rule::Enum(ty) => write!(f, "enum({})", ty.tokens().collect::<Vec<_>>().join("|")),
            Rule::Map(children) => {
                f.write_str("{}")?;
                for (i, (name, req)) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    f.write_str(name)?;
                    if !req.mandatory {
                        f.write_str("?")?;
                    }
                    if req.array {
                        match req.range {
                            Range { min: Some(0), max: None } => f.write_str("*")?,
                            Range { min: Some(1), max: None } => f.write_str("+")?,
                            range => write!(f, "{range}")?,
                        }
                    }
                }
                Ok(())
            }
            Rule::Array { element, range } => write!(f, "[]{element}{range}"),
            Rule::Validator(_) => f.write_str("<validator>"),
            Rule::Root => f.write_str("<root>"),
            Rule::Unconstrained => f.write_str("<any>"),
        }
    }
}

/// Concrete type name of a decoded value as matched by `Scalar` rules.
/// Numbers keep their decoded representation: `3` is `i64`, `3.0` is `f64`.
pub fn type_name_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_i64() => "i64",
        Value::Number(n) if n.is_u64() => "u64",
        Value::Number(_) => "f64",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
