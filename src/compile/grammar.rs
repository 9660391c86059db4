// Grammar strings → rule parts.
//
//   map spec:    `{}child mods child mods ...`   mods: ? ! + * {n,m} {n,}
//   array spec:  `[]child` optionally followed by `{n,m}` / `{n,}`

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{CdlError, ErrorKind, Result};
use crate::rule::{Range, Requirement};

static CHILD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\w+)(.*)$").unwrap());
static ARRAY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\w+)(\{.*\})?$").unwrap());

fn token_error(kind: ErrorKind, token: &str) -> CdlError {
    CdlError::new(kind).with_context(token)
}

fn conflict(token: &str) -> CdlError {
    token_error(ErrorKind::BadOptionModifier, token).with_supplementary("conflicting modifiers")
}

/// Parses the part of a map spec after the `{}` prefix.
pub(crate) fn parse_map_spec(src: &str) -> Result<IndexMap<String, Requirement>> {
    let mut children = IndexMap::new();
    let tokens = src
        .split(|c: char| c.is_whitespace() || c == '|')
        .filter(|t| !t.is_empty());
    for token in tokens {
        let Some(caps) = CHILD_RE.captures(token) else {
            return Err(token_error(ErrorKind::BadOptionValue, token));
        };
        let requirement = parse_modifiers(&caps[2], token)?;
        if children.insert(caps[1].to_string(), requirement).is_some() {
            return Err(token_error(ErrorKind::BadOptionModifier, token)
                .with_supplementary("duplicate child"));
        }
    }
    Ok(children)
}

/// Left-to-right scan of a child's modifier run. Each run may carry at most one
/// presence modifier (`?`/`!`) and at most one cardinality modifier
/// (`+`/`*`/range).
fn parse_modifiers(mods: &str, token: &str) -> Result<Requirement> {
    let mut presence: Option<bool> = None;
    let mut cardinality: Option<Range> = None;
    let mut rest = mods;

    while let Some(c) = rest.chars().next() {
        let consumed = match c {
            '?' | '!' => {
                if presence.replace(c == '!').is_some() {
                    return Err(conflict(token));
                }
                1
            }
            '*' | '+' => {
                let range = if c == '*' { Range::at_least(0) } else { Range::at_least(1) };
                if cardinality.replace(range).is_some() {
                    return Err(conflict(token));
                }
                1
            }
            '{' => {
                let Some(end) = rest.find('}') else {
                    return Err(token_error(ErrorKind::BadRangeOptionModifier, token));
                };
                let range = parse_range(&rest[1..end], token)?;
                if cardinality.replace(range).is_some() {
                    return Err(conflict(token));
                }
                end + 1
            }
            _ => return Err(token_error(ErrorKind::BadOptionModifier, token)),
        };
        rest = &rest[consumed..];
    }

    Ok(Requirement {
        mandatory: presence.unwrap_or(true),
        array: cardinality.is_some(),
        range: cardinality.unwrap_or(Range::UNBOUNDED),
    })
}

/// Parses the inside of `{n,m}` / `{n,}`. Bounds are never clamped or swapped.
fn parse_range(inner: &str, token: &str) -> Result<Range> {
    let Some((min, max)) = inner.split_once(',') else {
        return Err(token_error(ErrorKind::BadRangeOptionModifier, token));
    };
    let bound = |s: &str| -> Result<usize> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(token_error(ErrorKind::BadRangeOptionModifierValue, token));
        }
        s.parse::<usize>()
            .map_err(|_| token_error(ErrorKind::BadRangeOptionModifierValue, token))
    };
    let min = bound(min)?;
    if max.is_empty() {
        return Ok(Range::at_least(min));
    }
    let max = bound(max)?;
    if min > max {
        return Err(token_error(ErrorKind::BadRangeOptionModifierValue, token)
            .with_supplementary(format!("minimum {min} exceeds maximum {max}")));
    }
    Ok(Range::between(min, max))
}

/// Parses the part of an array spec after the `[]` prefix.
pub(crate) fn parse_array_spec(src: &str) -> Result<(String, Range)> {
    let Some(caps) = ARRAY_RE.captures(src) else {
        return Err(token_error(ErrorKind::BadRangeOptionModifier, src));
    };
    let range = match caps.get(2) {
        None => Range::UNBOUNDED,
        Some(braces) => {
            let text = braces.as_str();
            parse_range(&text[1..text.len() - 1], src)?
        }
    };
    Ok((caps[1].to_string(), range))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of<T: std::fmt::Debug>(r: Result<T>) -> ErrorKind {
        r.unwrap_err().kind()
    }

    #[test]
    fn map_modifiers() {
        let children = parse_map_spec("apple peach? pear* plum+ raspberry{1,3} strawberry! kiwi{1,4}? guava!{1,2} orange?{2,31}").unwrap();
        assert_eq!(children.len(), 9);
        assert_eq!(children["apple"], Requirement::default());
        assert!(!children["peach"].mandatory && !children["peach"].array);
        assert_eq!(children["pear"].range, Range::at_least(0));
        assert_eq!(children["plum"].range, Range::at_least(1));
        assert_eq!(children["raspberry"].range, Range::between(1, 3));
        assert!(children["strawberry"].mandatory);
        assert!(!children["kiwi"].mandatory && children["kiwi"].array);
        assert!(children["guava"].mandatory && children["guava"].range == Range::between(1, 2));
        assert_eq!(children["orange"].range, Range::between(2, 31));
    }

    #[test]
    fn bar_separates_like_whitespace() {
        let children = parse_map_spec("a|b?\tc").unwrap();
        assert_eq!(children.keys().collect::<Vec<_>>(), ["a", "b", "c"]);
    }

    #[test]
    fn map_syntax_errors() {
        assert_eq!(kind_of(parse_map_spec("/a")), ErrorKind::BadOptionValue);
        assert_eq!(kind_of(parse_map_spec("a/a")), ErrorKind::BadOptionModifier);
        assert_eq!(kind_of(parse_map_spec("apple/")), ErrorKind::BadOptionModifier);
        assert_eq!(kind_of(parse_map_spec("apple?x")), ErrorKind::BadOptionModifier);
        assert_eq!(kind_of(parse_map_spec("apple{1")), ErrorKind::BadRangeOptionModifier);
        assert_eq!(kind_of(parse_map_spec("apple{3}")), ErrorKind::BadRangeOptionModifier);
        assert_eq!(kind_of(parse_map_spec("apple{-1,-1}")), ErrorKind::BadRangeOptionModifierValue);
        assert_eq!(kind_of(parse_map_spec("apple{a,1}")), ErrorKind::BadRangeOptionModifierValue);
        assert_eq!(kind_of(parse_map_spec("apple{1,a}")), ErrorKind::BadRangeOptionModifierValue);
        assert_eq!(kind_of(parse_map_spec("apple{3,1}")), ErrorKind::BadRangeOptionModifierValue);
    }

    #[test]
    fn conflicting_modifiers_are_rejected() {
        for token in ["a?!", "a!?", "a??", "a+*", "a+{1,2}", "a{1,2}{3,4}"] {
            let err = parse_map_spec(token).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::BadOptionModifier, "{token}");
            assert_eq!(err.supplementary(), Some("conflicting modifiers"));
        }
        for spec in ["a a?", "a? b a", "a|a"] {
            let err = parse_map_spec(spec).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::BadOptionModifier, "{spec}");
            assert_eq!(err.supplementary(), Some("duplicate child"));
        }
        let err = parse_map_spec("a b+ b*").unwrap_err();
        assert_eq!(err.context(), [crate::path::Segment::Key("b*".into())]);
    }

    #[test]
    fn array_specs() {
        assert_eq!(parse_array_spec("foo").unwrap(), ("foo".to_string(), Range::UNBOUNDED));
        assert_eq!(parse_array_spec("foo{1,3}").unwrap().1, Range::between(1, 3));
        assert_eq!(parse_array_spec("foo{2,}").unwrap().1, Range::at_least(2));
        assert_eq!(kind_of(parse_array_spec("")), ErrorKind::BadRangeOptionModifier);
        assert_eq!(kind_of(parse_array_spec("!")), ErrorKind::BadRangeOptionModifier);
        assert_eq!(kind_of(parse_array_spec("foo{3}")), ErrorKind::BadRangeOptionModifier);
        assert_eq!(kind_of(parse_array_spec("foo {1,3}")), ErrorKind::BadRangeOptionModifier);
        assert_eq!(kind_of(parse_array_spec("foo{3,a}")), ErrorKind::BadRangeOptionModifierValue);
        assert_eq!(kind_of(parse_array_spec("foo{4,2}")), ErrorKind::BadRangeOptionModifierValue);
    }
}
