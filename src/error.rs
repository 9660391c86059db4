//! Error kinds and the context-carrying [`CdlError`].
//!
//! Every failure the engine reports, at compile time or during validation, is a
//! `CdlError`: a stable kind, an optional free-text supplement, and the trail of
//! keys / indices collected while the failure unwound (innermost first).
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use thiserror::Error;

use crate::enums::{Enum, EnumType};
use crate::path::Segment;

pub type Result<T, E = CdlError> = std::result::Result<T, E>;

// ————————————————————————————————————————————————————————————————————————————
// KINDS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Internal,
    MissingRoot,
    BadOptionValue,
    BadRangeOptionModifier,
    BadRangeOptionModifierValue,
    BadOptionModifier,
    BadKey,
    BadValue,
    UnknownKey,
    ExpectedMap,
    ExpectedArray,
    OutOfRange,
    BadType,
    MissingMandatory,
    BadConfigurator,
    BadEnumValue,
}

static REGISTRY: Lazy<Arc<EnumType>> = Lazy::new(|| {
    EnumType::with_text(ErrorKind::ALL.iter().map(|kind| (kind.code(), kind.text())))
});

impl ErrorKind {
    pub const ALL: [ErrorKind; 16] = [
        ErrorKind::Internal,
        ErrorKind::MissingRoot,
        ErrorKind::BadOptionValue,
        ErrorKind::BadRangeOptionModifier,
        ErrorKind::BadRangeOptionModifierValue,
        ErrorKind::BadOptionModifier,
        ErrorKind::BadKey,
        ErrorKind::BadValue,
        ErrorKind::UnknownKey,
        ErrorKind::ExpectedMap,
        ErrorKind::ExpectedArray,
        ErrorKind::OutOfRange,
        ErrorKind::BadType,
        ErrorKind::MissingMandatory,
        ErrorKind::BadConfigurator,
        ErrorKind::BadEnumValue,
    ];

    /// Stable identifier, e.g. `ErrBadKey`.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Internal => "ErrInternal",
            ErrorKind::MissingRoot => "ErrMissingRoot",
            ErrorKind::BadOptionValue => "ErrBadOptionValue",
            ErrorKind::BadRangeOptionModifier => "ErrBadRangeOptionModifier",
            ErrorKind::BadRangeOptionModifierValue => "ErrBadRangeOptionModifierValue",
            ErrorKind::BadOptionModifier => "ErrBadOptionModifier",
            ErrorKind::BadKey => "ErrBadKey",
            ErrorKind::BadValue => "ErrBadValue",
            ErrorKind::UnknownKey => "ErrUnknownKey",
            ErrorKind::ExpectedMap => "ErrExpectedMap",
            ErrorKind::ExpectedArray => "ErrExpectedArray",
            ErrorKind::OutOfRange => "ErrOutOfRange",
            ErrorKind::BadType => "ErrBadType",
            ErrorKind::MissingMandatory => "ErrMissingMandatory",
            ErrorKind::BadConfigurator => "ErrBadConfigurator",
            ErrorKind::BadEnumValue => "ErrBadEnumValue",
        }
    }

    /// Human readable message.
    pub fn text(self) -> &'static str {
        match self {
            ErrorKind::Internal => "Internal error",
            ErrorKind::MissingRoot => "No root key in template",
            ErrorKind::BadOptionValue => "Bad option value",
            ErrorKind::BadRangeOptionModifier => "Bad range option modifier",
            ErrorKind::BadRangeOptionModifierValue => "Bad range option modifier value",
            ErrorKind::BadOptionModifier => "Bad option modifier",
            ErrorKind::BadKey => "Bad key",
            ErrorKind::BadValue => "Bad value",
            ErrorKind::UnknownKey => "Unknown key",
            ErrorKind::ExpectedMap => "Expected map",
            ErrorKind::ExpectedArray => "Expected array",
            ErrorKind::OutOfRange => "Number of array items outside permissible range",
            ErrorKind::BadType => "Bad type",
            ErrorKind::MissingMandatory => "Missing mandatory key",
            ErrorKind::BadConfigurator => "Bad configurator",
            ErrorKind::BadEnumValue => "Bad option",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.code() == code)
    }

    /// The frozen error table as an enum type, codes as tokens and messages as text.
    pub fn registry() -> &'static Arc<EnumType> {
        &REGISTRY
    }

    /// This kind as a value of [`ErrorKind::registry`].
    pub fn as_enum(self) -> Result<Enum> {
        Self::registry().instantiate(self.code())
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// ERROR
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}", self.render())]
pub struct CdlError {
    kind: ErrorKind,
    supplementary: Option<String>,
    /// innermost first
    context: Vec<Segment>,
}

impl CdlError {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, supplementary: None, context: Vec::new() }
    }

    pub fn with_supplementary(mut self, text: impl Into<String>) -> Self {
        self.supplementary = Some(text.into());
        self
    }

    /// Append one enclosing frame. Frames are added as the failure unwinds,
    /// so the first frame is the innermost one.
    pub fn with_context(mut self, segment: impl Into<Segment>) -> Self {
        self.context.push(segment.into());
        self
    }

    pub fn add_context(&mut self, segment: impl Into<Segment>) {
        self.context.push(segment.into());
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn supplementary(&self) -> Option<&str> {
        self.supplementary.as_deref()
    }

    /// Context frames, innermost first.
    pub fn context(&self) -> &[Segment] {
        &self.context
    }

    /// Context frames, outermost first.
    pub fn breadcrumb(&self) -> impl Iterator<Item = &Segment> {
        self.context.iter().rev()
    }

    fn render(&self) -> String {
        let mut out = String::from(self.kind.text());
        if let Some(supplementary) = self.supplementary.as_deref() {
            out.push_str("; ");
            out.push_str(supplementary);
        }
        out.push_str(&format!(" (code {})", self.kind.code()));
        if !self.context.is_empty() {
            let near = self.context
                .iter()
                .map(Segment::describe)
                .collect::<Vec<_>>()
                .join(" at ");
            out.push_str(" near ");
            out.push_str(&near);
        }
        out
    }
}

impl From<ErrorKind> for CdlError {
    fn from(kind: ErrorKind) -> Self {
        CdlError::new(kind)
    }
}
