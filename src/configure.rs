//! Post-validation handlers.
//!
//! A [`Configurator`] maps rule names to handlers. Once a node (and, for maps and
//! arrays, everything below it) has validated, the handler for its rule fires
//! exactly once, children before parents. A handler is either a callback or a
//! typed [`Destination`] the engine writes through.
//!
//! Values reach handlers as [`Configured`]: `number` rules deliver `Float`,
//! `integer` rules deliver `Integer`, enum rules deliver `Enum`; everything else
//! is the decoded value itself.
use std::fmt;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::enums::Enum;
use crate::error::{CdlError, ErrorKind, Result};
use crate::path::Path;
use crate::rule::{type_name_of, Pseudotype, Rule};

#[derive(Debug, Clone, PartialEq)]
pub enum Configured<'v> {
    Value(&'v Value),
    Float(f64),
    Integer(i64),
    Enum(Enum),
}

impl<'v> Configured<'v> {
    pub fn type_name(&self) -> &'static str {
        match self {
            Configured::Value(v) => type_name_of(v),
            Configured::Float(_) => "f64",
            Configured::Integer(_) => "i64",
            Configured::Enum(_) => "enum",
        }
    }

    pub fn as_value(&self) -> Option<&'v Value> {
        match self {
            Configured::Value(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Configured::Float(f) => Some(*f),
            Configured::Value(v) => v.as_f64(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Configured::Integer(i) => Some(*i),
            Configured::Value(v) => v.as_i64(),
            _ => None,
        }
    }

    /// Enum token or string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Configured::Enum(e) => Some(e.as_str()),
            Configured::Value(v) => v.as_str(),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&Enum> {
        match self {
            Configured::Enum(e) => Some(e),
            _ => None,
        }
    }

    /// Owned tree form; enums become their token.
    pub fn to_value(&self) -> Value {
        match self {
            Configured::Value(v) => (*v).clone(),
            Configured::Float(f) => Value::from(*f),
            Configured::Integer(i) => Value::from(*i),
            Configured::Enum(e) => Value::from(e.as_str()),
        }
    }
}

/// Caller-owned storage written after validation.
///
/// The engine compares [`Destination::declared_type`] with
/// [`Configured::type_name`] before calling [`Destination::store`]; on a
/// mismatch the destination is not touched.
pub trait Destination {
    fn declared_type(&self) -> &'static str;

    fn admits(&self, value: &Configured<'_>) -> bool {
        self.declared_type() == value.type_name()
    }

    fn store(&mut self, value: &Configured<'_>) -> Result<()>;
}

fn not_storable(expected: &str, value: &Configured<'_>) -> CdlError {
    CdlError::new(ErrorKind::Internal)
        .with_supplementary(format!("cannot store {} as {expected}", value.type_name()))
}

macro_rules! value_destination {
    ($ty:ty, $name:literal, $extract:expr) => {
        impl Destination for $ty {
            fn declared_type(&self) -> &'static str {
                $name
            }

            fn store(&mut self, value: &Configured<'_>) -> Result<()> {
                let extract: fn(&Configured<'_>) -> Option<$ty> = $extract;
                *self = extract(value).ok_or_else(|| not_storable($name, value))?;
                Ok(())
            }
        }
    };
}

value_destination!(f64, "f64", |v| v.as_f64());
value_destination!(i64, "i64", |v| v.as_i64());
value_destination!(u64, "u64", |v| v.as_value().and_then(Value::as_u64));
value_destination!(bool, "bool", |v| v.as_value().and_then(Value::as_bool));
value_destination!(String, "string", |v| v.as_value().and_then(Value::as_str).map(str::to_string));
value_destination!(Vec<Value>, "array", |v| v.as_value().and_then(Value::as_array).cloned());
value_destination!(Map<String, Value>, "object", |v| v.as_value().and_then(Value::as_object).cloned());

/// Accepts every value.
impl Destination for Value {
    fn declared_type(&self) -> &'static str {
        "any"
    }

    fn admits(&self, _value: &Configured<'_>) -> bool {
        true
    }

    fn store(&mut self, value: &Configured<'_>) -> Result<()> {
        *self = value.to_value();
        Ok(())
    }
}

/// Takes a raw token or an enum value, checked against this destination's own
/// enum type (which need not be the rule's).
impl Destination for Enum {
    fn declared_type(&self) -> &'static str {
        "enum"
    }

    fn admits(&self, value: &Configured<'_>) -> bool {
        matches!(value.type_name(), "enum" | "string")
    }

    fn store(&mut self, value: &Configured<'_>) -> Result<()> {
        let token = value.as_str().ok_or_else(|| not_storable("enum", value))?;
        if !self.set(token) {
            return Err(CdlError::new(ErrorKind::BadEnumValue)
                .with_supplementary(format!("unknown value '{token}'")));
        }
        Ok(())
    }
}

pub type ConfiguratorFn<'a> = Box<dyn FnMut(Configured<'_>, &Path) -> Result<()> + 'a>;

pub enum Handler<'a> {
    Callback(ConfiguratorFn<'a>),
    Destination(&'a mut dyn Destination),
}

impl fmt::Debug for Handler<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Callback(_) => f.write_str("Callback(..)"),
            Handler::Destination(d) => write!(f, "Destination({})", d.declared_type()),
        }
    }
}

#[derive(Debug, Default)]
pub struct Configurator<'a> {
    handlers: IndexMap<String, Handler<'a>>,
}

impl<'a> Configurator<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn callback<F>(mut self, rule: impl Into<String>, f: F) -> Self
    where
        F: FnMut(Configured<'_>, &Path) -> Result<()> + 'a,
    {
        self.handlers.insert(rule.into(), Handler::Callback(Box::new(f)));
        self
    }

    pub fn assign(mut self, rule: impl Into<String>, destination: &'a mut dyn Destination) -> Self {
        self.handlers.insert(rule.into(), Handler::Destination(destination));
        self
    }

    pub fn insert(&mut self, rule: impl Into<String>, handler: Handler<'a>) {
        self.handlers.insert(rule.into(), handler);
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Runs the handler registered for `rule_name`, if any. `value` has
    /// already passed validation against `rule`.
    pub(crate) fn fire(&mut self, rule_name: &str, rule: &Rule, value: &Value, path: &Path) -> Result<()> {
        let Some(handler) = self.handlers.get_mut(rule_name) else {
            return Ok(());
        };
        let configured = coerce(rule, value)?;
        match handler {
            Handler::Callback(f) => f(configured, path),
            Handler::Destination(destination) => {
                if !destination.admits(&configured) {
                    return Err(CdlError::new(ErrorKind::BadType).with_supplementary(format!(
                        "at configuration got {} expected {}",
                        configured.type_name(),
                        destination.declared_type()
                    )));
                }
                destination.store(&configured)
            }
        }
    }
}

fn coerce<'v>(rule: &Rule, value: &'v Value) -> Result<Configured<'v>> {
    match rule {
        Rule::Pseudotype(Pseudotype::Number) => value
            .as_f64()
            .map(Configured::Float)
            .ok_or_else(|| coercion_error(value, "number")),
        Rule::Pseudotype(Pseudotype::Integer) => crate::validate::as_integer(value)
            .map(Configured::Integer)
            .ok_or_else(|| coercion_error(value, "integer")),
        Rule::Enum(ty) => match value.as_str() {
            Some(token) => ty.instantiate(token).map(Configured::Enum),
            None => Err(coercion_error(value, "an option as a string")),
        },
        _ => Ok(Configured::Value(value)),
    }
}

fn coercion_error(value: &Value, expected: &str) -> CdlError {
    CdlError::new(ErrorKind::BadType)
        .with_supplementary(format!("got {} expected {expected}", type_name_of(value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::EnumType;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn coercion_by_rule() {
        let n = json!(3);
        assert_eq!(coerce(&Rule::Pseudotype(Pseudotype::Number), &n).unwrap(), Configured::Float(3.0));
        let f = json!(4.0);
        assert_eq!(coerce(&Rule::Pseudotype(Pseudotype::Integer), &f).unwrap(), Configured::Integer(4));
        let s = json!("x");
        assert_eq!(coerce(&Rule::Scalar("string".into()), &s).unwrap(), Configured::Value(&s));
        let colours = EnumType::new(["red", "x"]);
        let coerced = coerce(&Rule::Enum(colours.clone()), &s).unwrap();
        assert_eq!(coerced, Configured::Enum(colours.instantiate("x").unwrap()));
        assert_eq!(coerced.type_name(), "enum");
    }

    #[test]
    fn scalar_destinations_check_type() {
        let mut target = 0.5f64;
        assert!(target.admits(&Configured::Float(1.0)));
        assert!(!target.admits(&Configured::Integer(1)));
        target.store(&Configured::Float(2.5)).unwrap();
        assert_eq!(target, 2.5);

        let mut name = String::new();
        let value = json!("pear");
        assert!(name.admits(&Configured::Value(&value)));
        name.store(&Configured::Value(&value)).unwrap();
        assert_eq!(name, "pear");
    }

    #[test]
    fn any_destination_takes_everything() {
        let mut target = Value::Null;
        let colours = EnumType::new(["red"]);
        let red = Configured::Enum(colours.instantiate("red").unwrap());
        assert!(target.admits(&red));
        target.store(&red).unwrap();
        assert_eq!(target, json!("red"));
    }

    #[test]
    fn enum_destination_uses_own_type() {
        let rule_type = EnumType::new(["red", "green", "blue"]);
        let own_type = EnumType::new(["red", "green"]);
        let mut target = own_type.instantiate("red").unwrap();

        target.store(&Configured::Enum(rule_type.instantiate("green").unwrap())).unwrap();
        assert_eq!(target.as_str(), "green");
        assert!(Arc::ptr_eq(target.enum_type(), &own_type));

        let err = target.store(&Configured::Enum(rule_type.instantiate("blue").unwrap())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadEnumValue);
        assert_eq!(target.as_str(), "green");
    }
}
