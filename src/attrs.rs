//! Attribute sets: the cache key and payload model.
//!
//! An [`Attrs`] value is a flat mapping from names to [`Attr`] scalars. It is
//! used both as the lookup key of a cache row (the *input*) and as the cached
//! payload (the *info*).
//!
//! # Canonical encoding
//!
//! Both sides are stored as compact JSON. Because [`Attrs`] is a `BTreeMap`,
//! keys are always emitted in sorted order and two attribute sets encode to
//! the same string exactly when they hold the same entries. Row equality in
//! the `Cache` table is byte equality of this encoding, so the format must
//! not change between releases or every existing row becomes unreachable.
//!
//! ```rust
//! # use fetcher_cache::attrs::{self, Attr, Attrs};
//! let mut input = Attrs::new();
//! input.insert("url".into(), Attr::from("https://example.org/a.tar.gz"));
//! input.insert("type".into(), Attr::from("tarball"));
//! assert_eq!(
//!     attrs::encode(&input).unwrap(),
//!     r#"{"type":"tarball","url":"https://example.org/a.tar.gz"}"#,
//! );
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use crate::{CacheError, Result};

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attr {
    String(String),
    Int(u64),
    Bool(bool),
}

impl Attr {
    /// Name of the value's type, as used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Attr::String(_) => "a string",
            Attr::Int(_) => "an integer",
            Attr::Bool(_) => "a Boolean",
        }
    }
}

impl fmt::Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attr::String(s) => f.write_str(s),
            Attr::Int(n) => write!(f, "{n}"),
            Attr::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for Attr {
    fn from(s: &str) -> Self {
        Attr::String(s.to_string())
    }
}

impl From<String> for Attr {
    fn from(s: String) -> Self {
        Attr::String(s)
    }
}

impl From<u64> for Attr {
    fn from(n: u64) -> Self {
        Attr::Int(n)
    }
}

impl From<bool> for Attr {
    fn from(b: bool) -> Self {
        Attr::Bool(b)
    }
}

/// A flat, ordered attribute set.
pub type Attrs = BTreeMap<String, Attr>;

/// Convert an attribute set to a JSON object.
pub fn attrs_to_json(attrs: &Attrs) -> Value {
    let map = attrs
        .iter()
        .map(|(name, attr)| {
            let value = match attr {
                Attr::String(s) => Value::String(s.clone()),
                Attr::Int(n) => Value::from(*n),
                Attr::Bool(b) => Value::Bool(*b),
            };
            (name.clone(), value)
        })
        .collect();
    Value::Object(map)
}

/// Convert a JSON object back into an attribute set.
///
/// Only strings, non-negative integers and booleans are accepted as values.
pub fn json_to_attrs(json: &Value) -> Result<Attrs> {
    let Value::Object(map) = json else {
        return Err(CacheError::InvalidAttrs(format!(
            "expected a JSON object, got {json}"
        )));
    };

    let mut attrs = Attrs::new();
    for (name, value) in map {
        let attr = match value {
            Value::String(s) => Attr::String(s.clone()),
            Value::Bool(b) => Attr::Bool(*b),
            Value::Number(n) => match n.as_u64() {
                Some(n) => Attr::Int(n),
                None => {
                    return Err(CacheError::InvalidAttrs(format!(
                        "attribute '{name}' is not an unsigned integer: {n}"
                    )));
                }
            },
            other => {
                return Err(CacheError::InvalidAttrs(format!(
                    "unsupported type for attribute '{name}': {other}"
                )));
            }
        };
        attrs.insert(name.clone(), attr);
    }
    Ok(attrs)
}

/// Encode an attribute set to its canonical string form.
pub fn encode(attrs: &Attrs) -> Result<String> {
    Ok(serde_json::to_string(&attrs_to_json(attrs))?)
}

/// Decode a string produced by [`encode`].
pub fn decode(s: &str) -> Result<Attrs> {
    let json: Value = serde_json::from_str(s)?;
    json_to_attrs(&json)
}

/// Look up a string attribute, failing if it is present with another type.
pub fn maybe_get_str<'a>(attrs: &'a Attrs, name: &str) -> Result<Option<&'a str>> {
    match attrs.get(name) {
        None => Ok(None),
        Some(Attr::String(s)) => Ok(Some(s)),
        Some(_) => Err(type_error(name, "a string")),
    }
}

/// Look up a required string attribute.
pub fn get_str<'a>(attrs: &'a Attrs, name: &str) -> Result<&'a str> {
    maybe_get_str(attrs, name)?.ok_or_else(|| CacheError::MissingAttr(name.to_string()))
}

/// Look up an integer attribute, failing if it is present with another type.
pub fn maybe_get_int(attrs: &Attrs, name: &str) -> Result<Option<u64>> {
    match attrs.get(name) {
        None => Ok(None),
        Some(Attr::Int(n)) => Ok(Some(*n)),
        Some(_) => Err(type_error(name, "an integer")),
    }
}

/// Look up a required integer attribute.
pub fn get_int(attrs: &Attrs, name: &str) -> Result<u64> {
    maybe_get_int(attrs, name)?.ok_or_else(|| CacheError::MissingAttr(name.to_string()))
}

/// Look up a Boolean attribute, failing if it is present with another type.
pub fn maybe_get_bool(attrs: &Attrs, name: &str) -> Result<Option<bool>> {
    match attrs.get(name) {
        None => Ok(None),
        Some(Attr::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(type_error(name, "a Boolean")),
    }
}

/// Look up a required Boolean attribute.
pub fn get_bool(attrs: &Attrs, name: &str) -> Result<bool> {
    maybe_get_bool(attrs, name)?.ok_or_else(|| CacheError::MissingAttr(name.to_string()))
}

fn type_error(name: &str, expected: &'static str) -> CacheError {
    CacheError::AttrType {
        name: name.to_string(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Attrs {
        let mut attrs = Attrs::new();
        attrs.insert("url".into(), "https://x".into());
        attrs.insert("revCount".into(), 42u64.into());
        attrs.insert("shallow".into(), true.into());
        attrs
    }

    #[test]
    fn encoding_sorts_keys() {
        let encoded = encode(&sample()).unwrap();
        assert_eq!(encoded, r#"{"revCount":42,"shallow":true,"url":"https://x"}"#);
    }

    #[test]
    fn insertion_order_does_not_affect_key() {
        let mut a = Attrs::new();
        a.insert("b".into(), "2".into());
        a.insert("a".into(), "1".into());

        let mut b = Attrs::new();
        b.insert("a".into(), "1".into());
        b.insert("b".into(), "2".into());

        assert_eq!(encode(&a).unwrap(), encode(&b).unwrap());
    }

    #[test]
    fn string_and_int_are_distinct_keys() {
        let mut a = Attrs::new();
        a.insert("n".into(), "1".into());
        let mut b = Attrs::new();
        b.insert("n".into(), 1u64.into());
        assert_ne!(encode(&a).unwrap(), encode(&b).unwrap());
    }

    #[test]
    fn decode_restores_value() {
        let attrs = sample();
        let decoded = decode(&encode(&attrs).unwrap()).unwrap();
        assert_eq!(decoded, attrs);
    }

    #[test]
    fn decode_rejects_malformed_json() {
        let err = decode("{not json").unwrap_err();
        assert!(matches!(err, CacheError::Json(_)));
    }

    #[test]
    fn decode_rejects_non_object() {
        let err = decode("[1, 2]").unwrap_err();
        assert!(matches!(err, CacheError::InvalidAttrs(_)));
    }

    #[test]
    fn decode_rejects_nested_values() {
        let err = decode(r#"{"a":{"b":1}}"#).unwrap_err();
        assert!(err.to_string().contains("'a'"));
    }

    #[test]
    fn decode_rejects_negative_and_float() {
        assert!(decode(r#"{"n":-1}"#).is_err());
        assert!(decode(r#"{"n":1.5}"#).is_err());
    }

    #[test]
    fn typed_getters() {
        let attrs = sample();
        assert_eq!(get_str(&attrs, "url").unwrap(), "https://x");
        assert_eq!(get_int(&attrs, "revCount").unwrap(), 42);
        assert!(get_bool(&attrs, "shallow").unwrap());
        assert_eq!(maybe_get_str(&attrs, "rev").unwrap(), None);
    }

    #[test]
    fn getter_errors() {
        let attrs = sample();
        assert!(matches!(
            get_str(&attrs, "rev"),
            Err(CacheError::MissingAttr(name)) if name == "rev"
        ));
        let err = get_int(&attrs, "url").unwrap_err();
        assert_eq!(err.to_string(), "input attribute 'url' is not an integer");
    }
}
