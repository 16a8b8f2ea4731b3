//! The decoded application value model.
//!
//! Payloads embedded in streamed messages carry application values in one of
//! two binary encodings. Whatever the encoding, decoding yields a [`Value`];
//! consumers never deal with the encoded form.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::Address;

/// Scale of the fixed-point `Fix64` / `UFix64` types (8 decimal places).
pub const FIX64_SCALE: u64 = 100_000_000;

/// The binary encodings a payload can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// Dense CBOR-based form, identified by a magic prefix.
    #[default]
    Compact,
    /// Self-describing JSON form; the fallback when the magic prefix is absent.
    Verbose,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Compact => write!(f, "compact"),
            Encoding::Verbose => write!(f, "verbose"),
        }
    }
}

impl std::str::FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" | "ccf" => Ok(Encoding::Compact),
            "verbose" | "json" => Ok(Encoding::Verbose),
            other => Err(format!("unknown encoding '{other}'")),
        }
    }
}

/// A composite value: struct, resource or event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Composite {
    /// Fully qualified type ID, e.g. `A.0000000000000001.Token.Deposited`.
    pub type_id: String,
    /// Fields in declaration order.
    pub fields: Vec<(String, Value)>,
}

impl Composite {
    pub fn new(type_id: impl Into<String>, fields: Vec<(String, Value)>) -> Self {
        Self {
            type_id: type_id.into(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

/// A storage path value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathValue {
    pub domain: String,
    pub identifier: String,
}

/// A runtime type value.
///
/// `type_id` is only present for nominal (composite) kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticType {
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub type_id: Option<String>,
}

impl StaticType {
    pub fn simple(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            type_id: None,
        }
    }

    pub fn nominal(kind: impl Into<String>, type_id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            type_id: Some(type_id.into()),
        }
    }
}

/// A decoded application value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Void,
    Optional(Option<Box<Value>>),
    Bool(bool),
    String(String),
    Address(Address),
    Int(i128),
    Int64(i64),
    UInt8(u8),
    UInt64(u64),
    UInt(u128),
    /// Signed fixed-point, raw units of 10^-8.
    Fix64(i64),
    /// Unsigned fixed-point, raw units of 10^-8.
    UFix64(u64),
    Array(Vec<Value>),
    Dictionary(Vec<(Value, Value)>),
    Struct(Composite),
    Resource(Composite),
    Event(Composite),
    Path(PathValue),
    Type(StaticType),
}

impl Value {
    /// The type name used by the Verbose encoding.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Void => "Void",
            Value::Optional(_) => "Optional",
            Value::Bool(_) => "Bool",
            Value::String(_) => "String",
            Value::Address(_) => "Address",
            Value::Int(_) => "Int",
            Value::Int64(_) => "Int64",
            Value::UInt8(_) => "UInt8",
            Value::UInt64(_) => "UInt64",
            Value::UInt(_) => "UInt",
            Value::Fix64(_) => "Fix64",
            Value::UFix64(_) => "UFix64",
            Value::Array(_) => "Array",
            Value::Dictionary(_) => "Dictionary",
            Value::Struct(_) => "Struct",
            Value::Resource(_) => "Resource",
            Value::Event(_) => "Event",
            Value::Path(_) => "Path",
            Value::Type(_) => "Type",
        }
    }

    /// Returns the composite payload for struct, resource and event values.
    pub fn as_composite(&self) -> Option<&Composite> {
        match self {
            Value::Struct(c) | Value::Resource(c) | Value::Event(c) => Some(c),
            _ => None,
        }
    }

    /// Returns the inner address if this is an `Address` value.
    pub fn as_address(&self) -> Option<Address> {
        match self {
            Value::Address(a) => Some(*a),
            _ => None,
        }
    }

    /// Nesting depth: scalars are 1, each container adds one level.
    pub fn depth(&self) -> usize {
        match self {
            Value::Optional(Some(inner)) => 1 + inner.depth(),
            Value::Array(items) => 1 + items.iter().map(Value::depth).max().unwrap_or(0),
            Value::Dictionary(entries) => {
                1 + entries
                    .iter()
                    .map(|(k, v)| k.depth().max(v.depth()))
                    .max()
                    .unwrap_or(0)
            }
            Value::Struct(c) | Value::Resource(c) | Value::Event(c) => {
                1 + c.fields.iter().map(|(_, v)| v.depth()).max().unwrap_or(0)
            }
            _ => 1,
        }
    }
}

/// Render raw fixed-point units as `<int>.<8 digits>`.
pub fn format_fix64(raw: i128) -> String {
    let sign = if raw < 0 { "-" } else { "" };
    let abs = raw.unsigned_abs();
    let scale = FIX64_SCALE as u128;
    format!("{sign}{}.{:08}", abs / scale, abs % scale)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => write!(f, "()"),
            Value::Optional(None) => write!(f, "nil"),
            Value::Optional(Some(v)) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Address(a) => write!(f, "{a}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::UInt8(v) => write!(f, "{v}"),
            Value::UInt64(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Fix64(v) => write!(f, "{}", format_fix64(*v as i128)),
            Value::UFix64(v) => write!(f, "{}", format_fix64(*v as i128)),
            Value::Array(items) => {
                let parts: Vec<_> = items.iter().map(|x| x.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::Dictionary(entries) => {
                let parts: Vec<_> = entries.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
            Value::Struct(c) | Value::Resource(c) | Value::Event(c) => {
                let parts: Vec<_> = c
                    .fields
                    .iter()
                    .map(|(k, v)| format!("{k}: {v}"))
                    .collect();
                write!(f, "{}({})", c.type_id, parts.join(", "))
            }
            Value::Path(p) => write!(f, "/{}/{}", p.domain, p.identifier),
            Value::Type(t) => match &t.type_id {
                Some(id) => write!(f, "Type<{id}>()"),
                None => write!(f, "Type<{}>()", t.kind),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fix64_formatting() {
        assert_eq!(format_fix64(150_000_000), "1.50000000");
        assert_eq!(format_fix64(-1), "-0.00000001");
        assert_eq!(format_fix64(0), "0.00000000");
    }

    #[test]
    fn depth_counts_containers() {
        let v = Value::Array(vec![Value::Optional(Some(Box::new(Value::Bool(true))))]);
        assert_eq!(v.depth(), 3);
        assert_eq!(Value::Array(vec![]).depth(), 1);
    }

    #[test]
    fn composite_field_lookup() {
        let event = Value::Event(Composite::new(
            "A.0000000000000001.Token.Deposited",
            vec![("amount".into(), Value::UFix64(100))],
        ));
        let c = event.as_composite().unwrap();
        assert_eq!(c.field("amount"), Some(&Value::UFix64(100)));
        assert!(c.field("missing").is_none());
    }

    #[test]
    fn encoding_parse_and_display() {
        assert_eq!("CCF".parse::<Encoding>().unwrap(), Encoding::Compact);
        assert_eq!("json".parse::<Encoding>().unwrap(), Encoding::Verbose);
        assert_eq!(Encoding::Verbose.to_string(), "verbose");
        assert!("xml".parse::<Encoding>().is_err());
    }
}
