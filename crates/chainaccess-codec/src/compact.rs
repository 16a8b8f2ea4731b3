//! The Compact encoding: versioned CBOR.
//!
//! ```text
//! payload := tag(130) [ version, value ]
//! value   := [ kind, ...fields ]
//! ```
//!
//! `Int` and `UInt` travel as 16-byte big-endian byte strings, `Address` as an
//! 8-byte byte string. Only definite-length arrays are produced or accepted.

use std::convert::Infallible;

use minicbor::data::{Tag, Type};
use minicbor::decode::Error as DecodeError;
use minicbor::encode::Error as EncodeError;
use minicbor::{Decoder, Encoder};

use chainaccess_core::types::Address;
use chainaccess_core::value::{Composite, Encoding, PathValue, StaticType, Value};
use chainaccess_core::CodecError;

use crate::MAX_DEPTH;

const TAG: u64 = 130;
const VERSION: u64 = 0;

/// Kind codes, the first element of every encoded value.
pub mod kind {
    pub const VOID: u8 = 0;
    pub const OPTIONAL: u8 = 1;
    pub const BOOL: u8 = 2;
    pub const STRING: u8 = 3;
    pub const ADDRESS: u8 = 4;
    pub const INT: u8 = 5;
    pub const INT64: u8 = 6;
    pub const UINT8: u8 = 7;
    pub const UINT64: u8 = 8;
    pub const UINT: u8 = 9;
    pub const FIX64: u8 = 10;
    pub const UFIX64: u8 = 11;
    pub const ARRAY: u8 = 12;
    pub const DICTIONARY: u8 = 13;
    pub const STRUCT: u8 = 14;
    pub const RESOURCE: u8 = 15;
    pub const EVENT: u8 = 16;
    pub const PATH: u8 = 17;
    pub const TYPE: u8 = 18;
}

// ─── Decoding ─────────────────────────────────────────────────────────────────

fn malformed(reason: impl Into<String>) -> CodecError {
    CodecError::malformed(Encoding::Compact, reason)
}

fn cbor(e: DecodeError) -> CodecError {
    malformed(e.to_string())
}

/// Decode a Compact payload, magic prefix included.
pub fn decode(payload: &[u8]) -> Result<Value, CodecError> {
    if payload.is_empty() {
        return Err(malformed("empty payload"));
    }
    let mut d = Decoder::new(payload);

    let tag = d.tag().map_err(cbor)?;
    if tag.as_u64() != TAG {
        return Err(malformed(format!("unexpected tag {}", tag.as_u64())));
    }
    expect_array(&mut d, 2)?;
    let version = d.u64().map_err(cbor)?;
    if version != VERSION {
        return Err(malformed(format!("unsupported version {version}")));
    }

    let value = decode_value(&mut d, 1)?;

    if d.position() != payload.len() {
        return Err(malformed(format!(
            "{} trailing bytes",
            payload.len() - d.position()
        )));
    }
    Ok(value)
}

fn array_len(d: &mut Decoder<'_>) -> Result<u64, CodecError> {
    d.array()
        .map_err(cbor)?
        .ok_or_else(|| malformed("indefinite-length array"))
}

fn expect_array(d: &mut Decoder<'_>, len: u64) -> Result<(), CodecError> {
    let got = array_len(d)?;
    if got != len {
        return Err(malformed(format!("expected array of {len}, got {got}")));
    }
    Ok(())
}

fn fixed_bytes<const N: usize>(d: &mut Decoder<'_>, what: &str) -> Result<[u8; N], CodecError> {
    let bytes = d.bytes().map_err(cbor)?;
    bytes
        .try_into()
        .map_err(|_| malformed(format!("{what} must be {N} bytes, got {}", bytes.len())))
}

fn decode_value(d: &mut Decoder<'_>, depth: usize) -> Result<Value, CodecError> {
    if depth > MAX_DEPTH {
        return Err(malformed(format!("nesting deeper than {MAX_DEPTH}")));
    }
    let len = array_len(d)?;
    if len == 0 {
        return Err(malformed("empty value array"));
    }
    let code = d.u8().map_err(cbor)?;
    let arity = |expected: u64| {
        if len == expected {
            Ok(())
        } else {
            Err(malformed(format!(
                "kind {code} expects {expected} elements, got {len}"
            )))
        }
    };

    let value = match code {
        kind::VOID => {
            arity(1)?;
            Value::Void
        }
        kind::OPTIONAL => {
            arity(2)?;
            if matches!(d.datatype().map_err(cbor)?, Type::Null) {
                d.null().map_err(cbor)?;
                Value::Optional(None)
            } else {
                Value::Optional(Some(Box::new(decode_value(d, depth + 1)?)))
            }
        }
        kind::BOOL => {
            arity(2)?;
            Value::Bool(d.bool().map_err(cbor)?)
        }
        kind::STRING => {
            arity(2)?;
            Value::String(d.str().map_err(cbor)?.to_owned())
        }
        kind::ADDRESS => {
            arity(2)?;
            Value::Address(Address(fixed_bytes::<8>(d, "address")?))
        }
        kind::INT => {
            arity(2)?;
            Value::Int(i128::from_be_bytes(fixed_bytes::<16>(d, "Int")?))
        }
        kind::INT64 => {
            arity(2)?;
            Value::Int64(d.i64().map_err(cbor)?)
        }
        kind::UINT8 => {
            arity(2)?;
            Value::UInt8(d.u8().map_err(cbor)?)
        }
        kind::UINT64 => {
            arity(2)?;
            Value::UInt64(d.u64().map_err(cbor)?)
        }
        kind::UINT => {
            arity(2)?;
            Value::UInt(u128::from_be_bytes(fixed_bytes::<16>(d, "UInt")?))
        }
        kind::FIX64 => {
            arity(2)?;
            Value::Fix64(d.i64().map_err(cbor)?)
        }
        kind::UFIX64 => {
            arity(2)?;
            Value::UFix64(d.u64().map_err(cbor)?)
        }
        kind::ARRAY => {
            arity(2)?;
            let n = array_len(d)?;
            let mut items = Vec::new();
            for _ in 0..n {
                items.push(decode_value(d, depth + 1)?);
            }
            Value::Array(items)
        }
        kind::DICTIONARY => {
            arity(2)?;
            let n = array_len(d)?;
            let mut entries = Vec::new();
            for _ in 0..n {
                expect_array(d, 2)?;
                let k = decode_value(d, depth + 1)?;
                let v = decode_value(d, depth + 1)?;
                entries.push((k, v));
            }
            Value::Dictionary(entries)
        }
        kind::STRUCT | kind::RESOURCE | kind::EVENT => {
            arity(3)?;
            let type_id = d.str().map_err(cbor)?.to_owned();
            let n = array_len(d)?;
            let mut fields = Vec::new();
            for _ in 0..n {
                expect_array(d, 2)?;
                let name = d.str().map_err(cbor)?.to_owned();
                fields.push((name, decode_value(d, depth + 1)?));
            }
            let c = Composite { type_id, fields };
            match code {
                kind::STRUCT => Value::Struct(c),
                kind::RESOURCE => Value::Resource(c),
                _ => Value::Event(c),
            }
        }
        kind::PATH => {
            arity(3)?;
            let domain = d.str().map_err(cbor)?.to_owned();
            let identifier = d.str().map_err(cbor)?.to_owned();
            Value::Path(PathValue { domain, identifier })
        }
        kind::TYPE => {
            arity(3)?;
            let kind = d.str().map_err(cbor)?.to_owned();
            let type_id = if matches!(d.datatype().map_err(cbor)?, Type::Null) {
                d.null().map_err(cbor)?;
                None
            } else {
                Some(d.str().map_err(cbor)?.to_owned())
            };
            Value::Type(StaticType { kind, type_id })
        }
        other => return Err(malformed(format!("unknown kind code {other}"))),
    };
    Ok(value)
}

// ─── Encoding ─────────────────────────────────────────────────────────────────

type Enc = Encoder<Vec<u8>>;
type EncResult = Result<(), EncodeError<Infallible>>;

/// Encode a value in canonical Compact form.
pub fn encode(value: &Value) -> Result<Vec<u8>, CodecError> {
    if value.depth() > MAX_DEPTH {
        return Err(CodecError::unencodable(
            Encoding::Compact,
            format!("nesting deeper than {MAX_DEPTH}"),
        ));
    }
    let mut e = Encoder::new(Vec::new());
    write_payload(&mut e, value)
        .map_err(|err| CodecError::unencodable(Encoding::Compact, err.to_string()))?;
    Ok(e.into_writer())
}

fn write_payload(e: &mut Enc, value: &Value) -> EncResult {
    e.tag(Tag::new(TAG))?.array(2)?.u64(VERSION)?;
    encode_value(e, value)
}

fn encode_composite(e: &mut Enc, code: u8, c: &Composite) -> EncResult {
    e.array(3)?.u8(code)?.str(&c.type_id)?;
    e.array(c.fields.len() as u64)?;
    for (name, v) in &c.fields {
        e.array(2)?.str(name)?;
        encode_value(e, v)?;
    }
    Ok(())
}

fn encode_value(e: &mut Enc, value: &Value) -> EncResult {
    match value {
        Value::Void => {
            e.array(1)?.u8(kind::VOID)?;
        }
        Value::Optional(None) => {
            e.array(2)?.u8(kind::OPTIONAL)?.null()?;
        }
        Value::Optional(Some(inner)) => {
            e.array(2)?.u8(kind::OPTIONAL)?;
            encode_value(e, inner)?;
        }
        Value::Bool(b) => {
            e.array(2)?.u8(kind::BOOL)?.bool(*b)?;
        }
        Value::String(s) => {
            e.array(2)?.u8(kind::STRING)?.str(s)?;
        }
        Value::Address(a) => {
            e.array(2)?.u8(kind::ADDRESS)?.bytes(a.as_bytes())?;
        }
        Value::Int(v) => {
            e.array(2)?.u8(kind::INT)?.bytes(&v.to_be_bytes())?;
        }
        Value::Int64(v) => {
            e.array(2)?.u8(kind::INT64)?.i64(*v)?;
        }
        Value::UInt8(v) => {
            e.array(2)?.u8(kind::UINT8)?.u8(*v)?;
        }
        Value::UInt64(v) => {
            e.array(2)?.u8(kind::UINT64)?.u64(*v)?;
        }
        Value::UInt(v) => {
            e.array(2)?.u8(kind::UINT)?.bytes(&v.to_be_bytes())?;
        }
        Value::Fix64(v) => {
            e.array(2)?.u8(kind::FIX64)?.i64(*v)?;
        }
        Value::UFix64(v) => {
            e.array(2)?.u8(kind::UFIX64)?.u64(*v)?;
        }
        Value::Array(items) => {
            e.array(2)?.u8(kind::ARRAY)?.array(items.len() as u64)?;
            for item in items {
                encode_value(e, item)?;
            }
        }
        Value::Dictionary(entries) => {
            e.array(2)?.u8(kind::DICTIONARY)?.array(entries.len() as u64)?;
            for (k, v) in entries {
                e.array(2)?;
                encode_value(e, k)?;
                encode_value(e, v)?;
            }
        }
        Value::Struct(c) => encode_composite(e, kind::STRUCT, c)?,
        Value::Resource(c) => encode_composite(e, kind::RESOURCE, c)?,
        Value::Event(c) => encode_composite(e, kind::EVENT, c)?,
        Value::Path(p) => {
            e.array(3)?
                .u8(kind::PATH)?
                .str(&p.domain)?
                .str(&p.identifier)?;
        }
        Value::Type(t) => {
            e.array(3)?.u8(kind::TYPE)?.str(&t.kind)?;
            match &t.type_id {
                Some(id) => e.str(id)?,
                None => e.null()?,
            };
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::COMPACT_MAGIC;

    fn deposited() -> Value {
        Value::Event(Composite::new(
            "A.0000000000000001.Token.Deposited",
            vec![
                ("amount".into(), Value::UFix64(150_000_000)),
                (
                    "to".into(),
                    Value::Optional(Some(Box::new(Value::Address(Address([0, 0, 0, 0, 0, 0, 0, 2]))))),
                ),
            ],
        ))
    }

    #[test]
    fn starts_with_magic() {
        let bytes = encode(&Value::Void).unwrap();
        assert!(bytes.starts_with(&COMPACT_MAGIC));
    }

    #[test]
    fn event_round_trip() {
        let v = deposited();
        assert_eq!(decode(&encode(&v).unwrap()).unwrap(), v);
    }

    #[test]
    fn wide_integers_round_trip() {
        for v in [
            Value::Int(i128::MIN),
            Value::Int(-1),
            Value::UInt(u128::MAX),
            Value::Int64(i64::MIN),
            Value::Fix64(-42),
        ] {
            assert_eq!(decode(&encode(&v).unwrap()).unwrap(), v);
        }
    }

    #[test]
    fn truncated_body_is_malformed() {
        let bytes = encode(&deposited()).unwrap();
        for cut in [2, 3, bytes.len() / 2, bytes.len() - 1] {
            let err = decode(&bytes[..cut]).unwrap_err();
            assert!(err.is_malformed(), "cut at {cut}: {err}");
            assert_eq!(err.encoding(), Encoding::Compact);
        }
    }

    #[test]
    fn trailing_bytes_are_malformed() {
        let mut bytes = encode(&Value::Bool(true)).unwrap();
        bytes.push(0x00);
        assert!(decode(&bytes).unwrap_err().to_string().contains("trailing"));
    }

    #[test]
    fn unknown_version_and_kind() {
        let mut e = Encoder::new(Vec::new());
        e.tag(Tag::new(TAG)).unwrap().array(2).unwrap().u64(1).unwrap();
        e.array(1).unwrap().u8(kind::VOID).unwrap();
        let err = decode(&e.into_writer()).unwrap_err();
        assert!(err.to_string().contains("version"));

        let mut e = Encoder::new(Vec::new());
        e.tag(Tag::new(TAG)).unwrap().array(2).unwrap().u64(0).unwrap();
        e.array(1).unwrap().u8(99).unwrap();
        let err = decode(&e.into_writer()).unwrap_err();
        assert!(err.to_string().contains("unknown kind code 99"));
    }

    #[test]
    fn wrong_address_width_is_malformed() {
        let mut e = Encoder::new(Vec::new());
        e.tag(Tag::new(TAG)).unwrap().array(2).unwrap().u64(0).unwrap();
        e.array(2).unwrap().u8(kind::ADDRESS).unwrap().bytes(&[1, 2, 3]).unwrap();
        assert!(decode(&e.into_writer()).unwrap_err().is_malformed());
    }

    #[test]
    fn depth_limit_applies_both_ways() {
        let mut v = Value::Void;
        for _ in 0..MAX_DEPTH {
            v = Value::Array(vec![v]);
        }
        assert!(matches!(
            encode(&v),
            Err(CodecError::Unencodable { .. })
        ));

        let mut e = Encoder::new(Vec::new());
        e.tag(Tag::new(TAG)).unwrap().array(2).unwrap().u64(0).unwrap();
        for _ in 0..MAX_DEPTH {
            e.array(2).unwrap().u8(kind::ARRAY).unwrap().array(1).unwrap();
        }
        e.array(1).unwrap().u8(kind::VOID).unwrap();
        let err = decode(&e.into_writer()).unwrap_err();
        assert!(err.to_string().contains("nesting"));
    }
}
