//! The Verbose encoding: self-describing JSON.
//!
//! Every value is `{"type": <Name>, "value": <body>}` (`Void` omits `value`).
//! Integers are decimal strings and fixed-point numbers `"<int>.<8 digits>"`,
//! so no precision is lost to JSON numbers.

use serde::Deserialize;
use serde_json::{json, Map, Value as Json};

use chainaccess_core::types::Address;
use chainaccess_core::value::{format_fix64, Composite, Encoding, PathValue, StaticType, Value};
use chainaccess_core::CodecError;

use crate::{DecodeOptions, MAX_DEPTH};

fn malformed(reason: impl Into<String>) -> CodecError {
    CodecError::malformed(Encoding::Verbose, reason)
}

// ─── Decoding ─────────────────────────────────────────────────────────────────

/// Decode a Verbose payload.
pub fn decode(payload: &[u8], opts: &DecodeOptions) -> Result<Value, CodecError> {
    if payload.is_empty() {
        return Err(malformed("empty payload"));
    }
    if json_nesting(payload) > MAX_JSON_NESTING {
        return Err(malformed(format!("nesting deeper than {MAX_DEPTH}")));
    }
    let mut de = serde_json::Deserializer::from_slice(payload);
    de.disable_recursion_limit();
    let json = Json::deserialize(&mut de).map_err(|e| malformed(e.to_string()))?;
    de.end().map_err(|e| malformed(e.to_string()))?;
    from_json(&json, opts, 1)
}

/// A composite field costs four JSON levels per value level.
const MAX_JSON_NESTING: usize = MAX_DEPTH * 4 + 4;

/// Bracket nesting of a JSON document, ignoring brackets inside strings.
fn json_nesting(bytes: &[u8]) -> usize {
    let (mut depth, mut max) = (0usize, 0usize);
    let (mut in_string, mut escaped) = (false, false);
    for &b in bytes {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' | b'[' => {
                depth += 1;
                max = max.max(depth);
            }
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    max
}

fn as_object<'a>(v: &'a Json, what: &str) -> Result<&'a Map<String, Json>, CodecError> {
    v.as_object()
        .ok_or_else(|| malformed(format!("{what} must be an object")))
}

fn as_array<'a>(v: &'a Json, what: &str) -> Result<&'a Vec<Json>, CodecError> {
    v.as_array()
        .ok_or_else(|| malformed(format!("{what} must be an array")))
}

fn str_field<'a>(obj: &'a Map<String, Json>, key: &str) -> Result<&'a str, CodecError> {
    obj.get(key)
        .and_then(Json::as_str)
        .ok_or_else(|| malformed(format!("missing string field '{key}'")))
}

fn field<'a>(obj: &'a Map<String, Json>, key: &str) -> Result<&'a Json, CodecError> {
    obj.get(key)
        .ok_or_else(|| malformed(format!("missing field '{key}'")))
}

fn parse_num<T: std::str::FromStr>(body: &Json, type_name: &str) -> Result<T, CodecError>
where
    T::Err: std::fmt::Display,
{
    let s = body
        .as_str()
        .ok_or_else(|| malformed(format!("{type_name} value must be a decimal string")))?;
    s.parse::<T>()
        .map_err(|e| malformed(format!("invalid {type_name} '{s}': {e}")))
}

/// Parse `"<int>.<frac>"` into raw 10^-8 units. At most 8 fractional digits.
fn parse_fixed(body: &Json, type_name: &str) -> Result<i128, CodecError> {
    let s = body
        .as_str()
        .ok_or_else(|| malformed(format!("{type_name} value must be a decimal string")))?;
    let invalid = || malformed(format!("invalid {type_name} '{s}'"));

    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
    if int_part.is_empty()
        || frac_part.len() > 8
        || !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }
    let int: i128 = int_part.parse().map_err(|_| invalid())?;
    let frac: i128 = if frac_part.is_empty() {
        0
    } else {
        format!("{frac_part:0<8}").parse().map_err(|_| invalid())?
    };
    let raw = int
        .checked_mul(chainaccess_core::value::FIX64_SCALE as i128)
        .and_then(|x| x.checked_add(frac))
        .ok_or_else(invalid)?;
    Ok(if negative { -raw } else { raw })
}

fn composite(body: &Json, opts: &DecodeOptions, depth: usize) -> Result<Composite, CodecError> {
    let obj = as_object(body, "composite")?;
    let type_id = str_field(obj, "id")?.to_string();
    let mut fields = Vec::new();
    for f in as_array(field(obj, "fields")?, "fields")? {
        let f = as_object(f, "field")?;
        let name = str_field(f, "name")?.to_string();
        fields.push((name, from_json(field(f, "value")?, opts, depth + 1)?));
    }
    Ok(Composite { type_id, fields })
}

fn static_type(body: &Json, opts: &DecodeOptions) -> Result<StaticType, CodecError> {
    let obj = as_object(body, "Type value")?;
    match field(obj, "staticType")? {
        Json::Object(t) => {
            let kind = str_field(t, "kind")?.to_string();
            let type_id = match t.get("typeID") {
                None | Some(Json::Null) => None,
                Some(Json::String(id)) => Some(id.clone()),
                Some(_) => return Err(malformed("typeID must be a string")),
            };
            Ok(StaticType { kind, type_id })
        }
        Json::String(s) if opts.allow_unstructured_static_types => Ok(StaticType::simple(s)),
        Json::String(_) => Err(malformed("unstructured static type not allowed")),
        _ => Err(malformed("staticType must be an object")),
    }
}

fn from_json(v: &Json, opts: &DecodeOptions, depth: usize) -> Result<Value, CodecError> {
    if depth > MAX_DEPTH {
        return Err(malformed(format!("nesting deeper than {MAX_DEPTH}")));
    }
    let obj = as_object(v, "value")?;
    let type_name = str_field(obj, "type")?;
    if type_name == "Void" {
        return Ok(Value::Void);
    }
    let body = field(obj, "value")?;

    let value = match type_name {
        "Optional" => match body {
            Json::Null => Value::Optional(None),
            inner => Value::Optional(Some(Box::new(from_json(inner, opts, depth + 1)?))),
        },
        "Bool" => Value::Bool(
            body.as_bool()
                .ok_or_else(|| malformed("Bool value must be a boolean"))?,
        ),
        "String" => Value::String(
            body.as_str()
                .ok_or_else(|| malformed("String value must be a string"))?
                .to_string(),
        ),
        "Address" => {
            let s = body
                .as_str()
                .ok_or_else(|| malformed("Address value must be a string"))?;
            Value::Address(s.parse::<Address>().map_err(|e| malformed(e.to_string()))?)
        }
        "Int" => Value::Int(parse_num(body, type_name)?),
        "Int64" => Value::Int64(parse_num(body, type_name)?),
        "UInt8" => Value::UInt8(parse_num(body, type_name)?),
        "UInt64" => Value::UInt64(parse_num(body, type_name)?),
        "UInt" => Value::UInt(parse_num(body, type_name)?),
        "Fix64" => {
            let raw = parse_fixed(body, type_name)?;
            Value::Fix64(i64::try_from(raw).map_err(|_| malformed("Fix64 out of range"))?)
        }
        "UFix64" => {
            let raw = parse_fixed(body, type_name)?;
            Value::UFix64(u64::try_from(raw).map_err(|_| malformed("UFix64 out of range"))?)
        }
        "Array" => {
            let items = as_array(body, "Array value")?
                .iter()
                .map(|item| from_json(item, opts, depth + 1))
                .collect::<Result<Vec<_>, _>>()?;
            Value::Array(items)
        }
        "Dictionary" => {
            let mut entries = Vec::new();
            for entry in as_array(body, "Dictionary value")? {
                let entry = as_object(entry, "dictionary entry")?;
                let k = from_json(field(entry, "key")?, opts, depth + 1)?;
                let v = from_json(field(entry, "value")?, opts, depth + 1)?;
                entries.push((k, v));
            }
            Value::Dictionary(entries)
        }
        "Struct" => Value::Struct(composite(body, opts, depth)?),
        "Resource" => Value::Resource(composite(body, opts, depth)?),
        "Event" => Value::Event(composite(body, opts, depth)?),
        "Path" => {
            let p = as_object(body, "Path value")?;
            Value::Path(PathValue {
                domain: str_field(p, "domain")?.to_string(),
                identifier: str_field(p, "identifier")?.to_string(),
            })
        }
        "Type" => Value::Type(static_type(body, opts)?),
        other => return Err(malformed(format!("unknown type '{other}'"))),
    };
    Ok(value)
}

// ─── Encoding ─────────────────────────────────────────────────────────────────

/// Encode a value in canonical Verbose form.
pub fn encode(value: &Value) -> Result<Vec<u8>, CodecError> {
    if value.depth() > MAX_DEPTH {
        return Err(CodecError::unencodable(
            Encoding::Verbose,
            format!("nesting deeper than {MAX_DEPTH}"),
        ));
    }
    serde_json::to_vec(&to_json(value))
        .map_err(|e| CodecError::unencodable(Encoding::Verbose, e.to_string()))
}

fn composite_json(c: &Composite) -> Json {
    let fields: Vec<Json> = c
        .fields
        .iter()
        .map(|(name, v)| json!({ "name": name, "value": to_json(v) }))
        .collect();
    json!({ "id": c.type_id, "fields": fields })
}

/// The JSON tree for a value, as written by [`encode`].
pub fn to_json(value: &Value) -> Json {
    let body = match value {
        Value::Void => return json!({ "type": "Void" }),
        Value::Optional(None) => Json::Null,
        Value::Optional(Some(inner)) => to_json(inner),
        Value::Bool(b) => json!(b),
        Value::String(s) => json!(s),
        Value::Address(a) => json!(a.to_string()),
        Value::Int(v) => json!(v.to_string()),
        Value::Int64(v) => json!(v.to_string()),
        Value::UInt8(v) => json!(v.to_string()),
        Value::UInt64(v) => json!(v.to_string()),
        Value::UInt(v) => json!(v.to_string()),
        Value::Fix64(v) => json!(format_fix64(*v as i128)),
        Value::UFix64(v) => json!(format_fix64(*v as i128)),
        Value::Array(items) => Json::Array(items.iter().map(to_json).collect()),
        Value::Dictionary(entries) => Json::Array(
            entries
                .iter()
                .map(|(k, v)| json!({ "key": to_json(k), "value": to_json(v) }))
                .collect(),
        ),
        Value::Struct(c) | Value::Resource(c) | Value::Event(c) => composite_json(c),
        Value::Path(p) => json!({ "domain": p.domain, "identifier": p.identifier }),
        Value::Type(t) => {
            let mut st = Map::new();
            st.insert("kind".into(), json!(t.kind));
            if let Some(id) = &t.type_id {
                st.insert("typeID".into(), json!(id));
            }
            json!({ "staticType": st })
        }
    };
    json!({ "type": value.type_name(), "value": body })
}
