//! Canonical value model
//!
//! Every driver result leaves the core as a [`CanonicalValue`] and every
//! driver input is derived from one. It is a closed JSON-compatible union,
//! so drivers and the normalizer can match on it exhaustively.

use std::fmt;

use indexmap::IndexMap;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Number;

/// Insertion-ordered mapping used for canonical objects
pub type Mapping = IndexMap<String, CanonicalValue>;

/// Protocol-agnostic representation of a configuration value or subtree
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CanonicalValue {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Mapping(Mapping),
    Sequence(Vec<CanonicalValue>),
}

impl CanonicalValue {
    /// Build an empty mapping
    pub fn mapping() -> Self {
        CanonicalValue::Mapping(Mapping::new())
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            CanonicalValue::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[CanonicalValue]> {
        match self {
            CanonicalValue::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CanonicalValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Look up a key when this value is a mapping
    pub fn get(&self, key: &str) -> Option<&CanonicalValue> {
        self.as_mapping().and_then(|map| map.get(key))
    }

    /// True for `Null`, `Bool`, `Number` and `String`
    pub fn is_scalar(&self) -> bool {
        !matches!(
            self,
            CanonicalValue::Mapping(_) | CanonicalValue::Sequence(_)
        )
    }

    /// Textual form of a scalar, as it would appear in an XML text node.
    ///
    /// `Null` renders as the empty string. Returns `None` for containers.
    pub fn render_scalar(&self) -> Option<String> {
        match self {
            CanonicalValue::Null => Some(String::new()),
            CanonicalValue::Bool(b) => Some(b.to_string()),
            CanonicalValue::Number(n) => Some(n.to_string()),
            CanonicalValue::String(s) => Some(s.clone()),
            CanonicalValue::Mapping(_) | CanonicalValue::Sequence(_) => None,
        }
    }

    /// Short name of the variant, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            CanonicalValue::Null => "null",
            CanonicalValue::Bool(_) => "bool",
            CanonicalValue::Number(_) => "number",
            CanonicalValue::String(_) => "string",
            CanonicalValue::Mapping(_) => "mapping",
            CanonicalValue::Sequence(_) => "sequence",
        }
    }
}

impl From<bool> for CanonicalValue {
    fn from(b: bool) -> Self {
        CanonicalValue::Bool(b)
    }
}

impl From<i64> for CanonicalValue {
    fn from(n: i64) -> Self {
        CanonicalValue::Number(n.into())
    }
}

impl From<u64> for CanonicalValue {
    fn from(n: u64) -> Self {
        CanonicalValue::Number(n.into())
    }
}

impl From<&str> for CanonicalValue {
    fn from(s: &str) -> Self {
        CanonicalValue::String(s.to_string())
    }
}

impl From<String> for CanonicalValue {
    fn from(s: String) -> Self {
        CanonicalValue::String(s)
    }
}

impl From<Mapping> for CanonicalValue {
    fn from(map: Mapping) -> Self {
        CanonicalValue::Mapping(map)
    }
}

impl From<Vec<CanonicalValue>> for CanonicalValue {
    fn from(items: Vec<CanonicalValue>) -> Self {
        CanonicalValue::Sequence(items)
    }
}

impl From<serde_json::Value> for CanonicalValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => CanonicalValue::Null,
            serde_json::Value::Bool(b) => CanonicalValue::Bool(b),
            serde_json::Value::Number(n) => CanonicalValue::Number(n),
            serde_json::Value::String(s) => CanonicalValue::String(s),
            serde_json::Value::Array(items) => {
                CanonicalValue::Sequence(items.into_iter().map(Into::into).collect())
            }
            serde_json::Value::Object(map) => CanonicalValue::Mapping(
                map.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}

impl From<CanonicalValue> for serde_json::Value {
    fn from(value: CanonicalValue) -> Self {
        match value {
            CanonicalValue::Null => serde_json::Value::Null,
            CanonicalValue::Bool(b) => serde_json::Value::Bool(b),
            CanonicalValue::Number(n) => serde_json::Value::Number(n),
            CanonicalValue::String(s) => serde_json::Value::String(s),
            CanonicalValue::Sequence(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            CanonicalValue::Mapping(map) => serde_json::Value::Object(
                map.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}

impl Serialize for CanonicalValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CanonicalValue::Null => serializer.serialize_unit(),
            CanonicalValue::Bool(b) => serializer.serialize_bool(*b),
            CanonicalValue::Number(n) => n.serialize(serializer),
            CanonicalValue::String(s) => serializer.serialize_str(s),
            CanonicalValue::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            CanonicalValue::Mapping(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for CanonicalValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(CanonicalVisitor)
    }
}

struct CanonicalVisitor;

impl<'de> Visitor<'de> for CanonicalVisitor {
    type Value = CanonicalValue;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON-compatible value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(CanonicalValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(CanonicalValue::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        Deserialize::deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(CanonicalValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(CanonicalValue::Number(v.into()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(CanonicalValue::Number(v.into()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Number::from_f64(v)
            .map(CanonicalValue::Number)
            .ok_or_else(|| E::custom("non-finite numbers are not representable"))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(CanonicalValue::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(CanonicalValue::String(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(CanonicalValue::Sequence(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = Mapping::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, CanonicalValue>()? {
            map.insert(key, value);
        }
        Ok(CanonicalValue::Mapping(map))
    }
}
