//! Closed token sets ([`EnumType`]) and values bound to them ([`Enum`]).
//!
//! An enum type is built once, shared behind an `Arc`, and never mutated.
//! Two `Enum`s are equal only when they come from the *same* type (pointer
//! identity) and select the same token.
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::error::{CdlError, ErrorKind, Result};

#[derive(Debug)]
pub struct EnumType {
    tokens: Vec<String>,
    texts: Vec<Option<String>>,
    index: HashMap<String, usize>,
}

impl EnumType {
    /// Builds a type from tokens in the order given. Repeated tokens keep
    /// their first position.
    pub fn new<I, S>(tokens: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Self::build(tokens.into_iter().map(|t| (t.into(), None))))
    }

    /// Builds a type whose tokens carry display text. Tokens are sorted.
    pub fn with_text<I, K, V>(pairs: I) -> Arc<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let sorted: BTreeMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Arc::new(Self::build(sorted.into_iter().map(|(k, v)| (k, Some(v)))))
    }

    fn build(items: impl Iterator<Item = (String, Option<String>)>) -> Self {
        let mut out = Self { tokens: Vec::new(), texts: Vec::new(), index: HashMap::new() };
        for (token, text) in items {
            if out.index.contains_key(&token) {
                continue;
            }
            out.index.insert(token.clone(), out.tokens.len());
            out.tokens.push(token);
            out.texts.push(text.filter(|t| !t.is_empty()));
        }
        out
    }

    pub fn has(&self, token: &str) -> bool {
        self.index.contains_key(token)
    }

    pub fn index_of(&self, token: &str) -> Option<usize> {
        self.index.get(token).copied()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    pub fn token(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).map(String::as_str)
    }

    /// Display text, falling back to the token itself.
    pub fn text(&self, index: usize) -> Option<&str> {
        let token = self.tokens.get(index)?;
        Some(self.texts[index].as_deref().unwrap_or(token))
    }

    /// Binds `token` to this type. Fails with `Internal` for non-members;
    /// callers are expected to have checked membership already.
    pub fn instantiate(self: &Arc<Self>, token: &str) -> Result<Enum> {
        match self.index_of(token) {
            Some(index) => Ok(Enum { ty: Arc::clone(self), index }),
            None => Err(CdlError::new(ErrorKind::Internal)
                .with_supplementary(format!("bad enum initialiser '{token}'"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Enum {
    ty: Arc<EnumType>,
    index: usize,
}

impl Enum {
    pub fn enum_type(&self) -> &Arc<EnumType> {
        &self.ty
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_str(&self) -> &str {
        &self.ty.tokens[self.index]
    }

    pub fn text(&self) -> &str {
        self.ty.texts[self.index].as_deref().unwrap_or_else(|| self.as_str())
    }

    pub fn has(&self, token: &str) -> bool {
        self.ty.has(token)
    }

    /// Selects another token of the same type; returns false (and leaves the
    /// value alone) for non-members.
    pub fn set(&mut self, token: &str) -> bool {
        match self.ty.index_of(token) {
            Some(index) => {
                self.index = index;
                true
            }
            None => false,
        }
    }
}

impl PartialEq for Enum {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.ty, &other.ty) && self.index == other.index
    }
}

impl Eq for Enum {}

impl fmt::Display for Enum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
