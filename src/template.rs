//! User-authored, uncompiled templates.
//!
//! A template is flat: rule name → grammar string, validator callback, or enum
//! type. Templates can also be read from an already-decoded tree (JSON/YAML
//! file), where arrays of strings and `token: text` maps declare enum types.
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::enums::EnumType;
use crate::error::{CdlError, ErrorKind, Result};

/// User validation callback. Its error is reported unchanged apart from the
/// context frames added by enclosing maps and arrays.
pub type ValidatorFn = Arc<dyn Fn(&Value) -> Result<()> + Send + Sync>;

#[derive(Clone)]
pub enum Entry {
    Grammar(String),
    Validator(ValidatorFn),
    Enum(Arc<EnumType>),
    /// Any other decoded value; the compiler rejects it with `BadValue`.
    Unsupported(Value),
}

impl Entry {
    pub fn validator<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Result<()> + Send + Sync + 'static,
    {
        Entry::Validator(Arc::new(f))
    }

    fn from_value(value: &Value) -> Self {
        match value {
            Value::String(grammar) => Entry::Grammar(grammar.clone()),
            Value::Array(items) => {
                let tokens: Option<Vec<&str>> = items.iter().map(Value::as_str).collect();
                match tokens {
                    Some(tokens) => Entry::Enum(EnumType::new(tokens)),
                    None => Entry::Unsupported(value.clone()),
                }
            }
            Value::Object(items) => {
                let pairs: Option<Vec<(&str, &str)>> = items
                    .iter()
                    .map(|(k, v)| v.as_str().map(|text| (k.as_str(), text)))
                    .collect();
                match pairs {
                    Some(pairs) => Entry::Enum(EnumType::with_text(pairs)),
                    None => Entry::Unsupported(value.clone()),
                }
            }
            _ => Entry::Unsupported(value.clone()),
        }
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Grammar(g) => f.debug_tuple("Grammar").field(g).finish(),
            Entry::Validator(_) => f.write_str("Validator(..)"),
            Entry::Enum(ty) => f.debug_tuple("Enum").field(&ty.tokens().collect::<Vec<_>>()).finish(),
            Entry::Unsupported(v) => f.debug_tuple("Unsupported").field(v).finish(),
        }
    }
}

impl From<&str> for Entry {
    fn from(grammar: &str) -> Self {
        Entry::Grammar(grammar.to_string())
    }
}

impl From<String> for Entry {
    fn from(grammar: String) -> Self {
        Entry::Grammar(grammar)
    }
}

impl From<Arc<EnumType>> for Entry {
    fn from(ty: Arc<EnumType>) -> Self {
        Entry::Enum(ty)
    }
}

impl From<&Arc<EnumType>> for Entry {
    fn from(ty: &Arc<EnumType>) -> Self {
        Entry::Enum(Arc::clone(ty))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Template {
    entries: IndexMap<String, Entry>,
}

impl Template {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Template::insert`].
    pub fn with(mut self, name: impl Into<String>, entry: impl Into<Entry>) -> Self {
        self.insert(name, entry);
        self
    }

    /// Adds or replaces an entry; keys are unique.
    pub fn insert(&mut self, name: impl Into<String>, entry: impl Into<Entry>) {
        self.entries.insert(name.into(), entry.into());
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reads a template from a decoded mapping.
    pub fn from_value(value: &Value) -> Result<Self> {
        let Some(items) = value.as_object() else {
            return Err(CdlError::new(ErrorKind::ExpectedMap)
                .with_supplementary("a template must be a map of rule names"));
        };
        Ok(items
            .iter()
            .map(|(name, spec)| (name.clone(), Entry::from_value(spec)))
            .collect())
    }
}

impl<K: Into<String>, E: Into<Entry>> FromIterator<(K, E)> for Template {
    fn from_iter<I: IntoIterator<Item = (K, E)>>(iter: I) -> Self {
        let mut template = Template::new();
        for (name, entry) in iter {
            template.insert(name, entry);
        }
        template
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_decoded_template() {
        let template = Template::from_value(&json!({
            "/": "{}level port",
            "level": ["debug", "info"],
            "mode": {"rw": "Read/write", "ro": "Read only"},
            "port": 8080,
        }))
        .unwrap();
        assert_eq!(template.len(), 4);
        assert!(matches!(template.get("/"), Some(Entry::Grammar(g)) if g == "{}level port"));
        assert!(matches!(template.get("level"), Some(Entry::Enum(ty)) if ty.len() == 2));
        match template.get("mode") {
            Some(Entry::Enum(ty)) => assert_eq!(ty.text(0), Some("Read only")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(template.get("port"), Some(Entry::Unsupported(_))));
    }

    #[test]
    fn mixed_arrays_are_unsupported() {
        let template = Template::from_value(&json!({"x": ["a", 1]})).unwrap();
        assert!(matches!(template.get("x"), Some(Entry::Unsupported(_))));
    }

    #[test]
    fn non_map_is_rejected() {
        let err = Template::from_value(&json!(["/"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExpectedMap);
    }

    #[test]
    fn builder_keeps_insertion_order() {
        let template = Template::new()
            .with("/", "{}a")
            .with("a", Entry::validator(|_| Ok(())))
            .with("b", "string");
        let names: Vec<&str> = template.iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["/", "a", "b"]);
    }
}
