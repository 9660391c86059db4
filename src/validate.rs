//! Recursive validator.
//!
//! Walks an instance tree against a [`CompiledTemplate`], dispatching on the
//! rule of each node. The walk is fail-fast: the first failure aborts it, and
//! every enclosing map key / array index is added to the error as it unwinds.
//! Handlers of an optional [`Configurator`] fire bottom-up once a node and all
//! of its children have passed.
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, trace};

use crate::compile::CompiledTemplate;
use crate::configure::Configurator;
use crate::error::{CdlError, ErrorKind, Result};
use crate::path::Path;
use crate::rule::{type_name_of, Pseudotype, Range, Requirement, Rule, ROOT};

impl CompiledTemplate {
    pub fn validate(&self, value: &Value) -> Result<()> {
        debug!(rules = self.len(), "validating instance");
        Walk { template: self, configurator: None }.item_and_configure(value, ROOT, &Path::root())
    }

    /// Validates `value` and feeds the validated nodes to `configurator`.
    /// Every handler must name a rule of this template (`BadConfigurator`
    /// otherwise, reported before anything is visited).
    pub fn validate_and_configure(&self, value: &Value, configurator: &mut Configurator<'_>) -> Result<()> {
        if let Some(name) = configurator.rule_names().find(|name| !self.contains(name)) {
            return Err(CdlError::new(ErrorKind::BadConfigurator)
                .with_supplementary(format!("no rule named '{name}'")));
        }
        debug!(rules = self.len(), "validating and configuring instance");
        Walk { template: self, configurator: Some(configurator) }
            .item_and_configure(value, ROOT, &Path::root())
    }
}

struct Walk<'t, 'c, 'a> {
    template: &'t CompiledTemplate,
    configurator: Option<&'c mut Configurator<'a>>,
}

impl<'t> Walk<'t, '_, '_> {
    fn item_and_configure(&mut self, value: &Value, name: &str, path: &Path) -> Result<()> {
        let template = self.template;
        let Some(rule) = template.rule(name) else {
            return Err(CdlError::new(ErrorKind::UnknownKey)
                .with_supplementary(format!("no rule named '{name}'")));
        };
        trace!(%path, rule = name, "visit");
        self.item(value, rule, path)?;
        if let Some(configurator) = self.configurator.as_deref_mut() {
            configurator.fire(name, rule, value, path)?;
        }
        Ok(())
    }

    fn item(&mut self, value: &Value, rule: &'t Rule, path: &Path) -> Result<()> {
        match rule {
            Rule::Validator(f) => f(value),
            Rule::Enum(ty) => match value.as_str() {
                Some(token) if ty.has(token) => Ok(()),
                Some(token) => Err(CdlError::new(ErrorKind::BadEnumValue)
                    .with_supplementary(format!("unknown value '{token}'"))),
                None => Err(bad_type(value, "an option as a string")),
            },
            Rule::Map(children) => self.map(value, children, path),
            Rule::Array { element, range } => self.range(value, element, *range, path),
            Rule::Root => {
                let template = self.template;
                match template.rule(ROOT) {
                    // compile never lets the root alias itself
                    Some(Rule::Root) | None => Err(CdlError::new(ErrorKind::Internal)
                        .with_supplementary("root rule is missing or aliases itself")),
                    Some(root) => self.item(value, root, path),
                }
            }
            Rule::Scalar(name) => {
                if type_name_of(value) == name {
                    Ok(())
                } else {
                    Err(bad_type(value, name))
                }
            }
            Rule::Pseudotype(pseudo) => check_pseudotype(*pseudo, value),
            Rule::Unconstrained => Ok(()),
        }
    }

    fn map(&mut self, value: &Value, children: &'t IndexMap<String, Requirement>, path: &Path) -> Result<()> {
        let Some(object) = value.as_object() else {
            return Err(CdlError::new(ErrorKind::ExpectedMap)
                .with_supplementary(format!("got {}", type_name_of(value))));
        };
        let mut missing: Vec<&str> = children
            .iter()
            .filter(|(_, req)| req.mandatory)
            .map(|(name, _)| name.as_str())
            .collect();

        for (key, child) in object {
            let Some(req) = children.get(key) else {
                return Err(CdlError::new(ErrorKind::BadKey).with_context(key.as_str()));
            };
            let child_path = path.push(key.as_str());
            let result = if req.array {
                self.range(child, key, req.range, &child_path)
            } else {
                self.item_and_configure(child, key, &child_path)
            };
            result.map_err(|e| e.with_context(key.as_str()))?;
            missing.retain(|name| *name != key.as_str());
        }

        if !missing.is_empty() {
            let names = missing
                .iter()
                .map(|name| format!("'{name}'"))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(CdlError::new(ErrorKind::MissingMandatory)
                .with_supplementary(format!("missing {names}")));
        }
        Ok(())
    }

    fn range(&mut self, value: &Value, element: &str, range: Range, path: &Path) -> Result<()> {
        let Some(items) = value.as_array() else {
            return Err(CdlError::new(ErrorKind::ExpectedArray)
                .with_supplementary(format!("got {}", type_name_of(value))));
        };
        if !range.contains(items.len()) {
            return Err(CdlError::new(ErrorKind::OutOfRange)
                .with_supplementary(range.describe_mismatch(items.len())));
        }
        for (index, item) in items.iter().enumerate() {
            self.item_and_configure(item, element, &path.push(index))
                .map_err(|e| e.with_context(index))?;
        }
        Ok(())
    }
}

fn bad_type(value: &Value, expected: &str) -> CdlError {
    CdlError::new(ErrorKind::BadType)
        .with_supplementary(format!("got {} expected {expected}", type_name_of(value)))
}

fn check_pseudotype(pseudo: Pseudotype, value: &Value) -> Result<()> {
    let ok = match pseudo {
        Pseudotype::Number => value.is_number(),
        Pseudotype::Integer => as_integer(value).is_some(),
        Pseudotype::IpPort => value.as_str().and_then(split_host_port).is_some(),
    };
    if ok { Ok(()) } else { Err(bad_type(value, pseudo.name())) }
}

/// Integral value representable as `i64`; floats qualify when they have no
/// fractional part.
pub(crate) fn as_integer(value: &Value) -> Option<i64> {
    let Value::Number(n) = value else {
        return None;
    };
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    if n.is_u64() {
        return None;
    }
    let f = n.as_f64()?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// `host:port` or `[host]:port`; the host may be empty, the port must be a
/// decimal `u16`.
pub fn split_host_port(s: &str) -> Option<(&str, &str)> {
    let (host, port) = match s.strip_prefix('[') {
        Some(rest) => {
            let (host, after) = rest.split_once(']')?;
            (host, after.strip_prefix(':')?)
        }
        None => {
            let (host, port) = s.rsplit_once(':')?;
            if host.contains(':') {
                return None;
            }
            (host, port)
        }
    };
    if host.contains(['[', ']']) {
        return None;
    }
    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    port.parse::<u16>().ok()?;
    Some((host, port))
}
