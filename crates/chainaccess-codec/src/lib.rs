//! # chainaccess-codec
//!
//! Decodes the opaque payloads embedded in streamed messages into [`Value`]s.
//!
//! Two encodings exist. The encoding of a payload is never declared out of
//! band; it is sniffed from a fixed two-byte prefix ([`COMPACT_MAGIC`]).
//! Payloads without the prefix are treated as Verbose.
//!
//! ```text
//! payload ──► detect() ──► Compact ──► compact::decode ──┐
//!                     └──► Verbose ──► verbose::decode ──┴──► Value
//! ```

pub mod compact;
pub mod options;
pub mod verbose;

pub use chainaccess_core::value::{Encoding, Value};
pub use chainaccess_core::CodecError;
pub use options::DecodeOptions;

/// Leading bytes of every Compact payload (CBOR tag 130).
pub const COMPACT_MAGIC: [u8; 2] = [0xd8, 0x82];

/// Maximum nesting depth accepted when decoding or encoding.
pub const MAX_DEPTH: usize = 64;

/// Returns the encoding a payload uses, judged only by its prefix.
pub fn detect(payload: &[u8]) -> Encoding {
    if payload.starts_with(&COMPACT_MAGIC) {
        Encoding::Compact
    } else {
        Encoding::Verbose
    }
}

/// Decode a payload of either encoding.
pub fn decode(payload: &[u8], opts: &DecodeOptions) -> Result<Value, CodecError> {
    match detect(payload) {
        Encoding::Compact => compact::decode(payload),
        Encoding::Verbose => verbose::decode(payload, opts),
    }
}

/// Encode a value in the requested encoding.
pub fn encode(value: &Value, encoding: Encoding) -> Result<Vec<u8>, CodecError> {
    match encoding {
        Encoding::Compact => compact::encode(value),
        Encoding::Verbose => verbose::encode(value),
    }
}

/// Decode a payload and re-encode it in `target`.
pub fn transcode(
    payload: &[u8],
    target: Encoding,
    opts: &DecodeOptions,
) -> Result<Vec<u8>, CodecError> {
    let value = decode(payload, opts)?;
    encode(&value, target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_by_prefix_only() {
        assert_eq!(detect(&[0xd8, 0x82]), Encoding::Compact);
        assert_eq!(detect(&[0xd8, 0x82, 0xff, 0xff]), Encoding::Compact);
        assert_eq!(detect(&[0xd8]), Encoding::Verbose);
        assert_eq!(detect(b"{\"type\":\"Void\"}"), Encoding::Verbose);
        assert_eq!(detect(&[]), Encoding::Verbose);
    }

    #[test]
    fn empty_payload_is_malformed() {
        let err = decode(&[], &DecodeOptions::default()).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn transcode_between_encodings() {
        let v = Value::Array(vec![Value::UInt64(7), Value::String("x".into())]);
        let verbose = encode(&v, Encoding::Verbose).unwrap();
        let compact = transcode(&verbose, Encoding::Compact, &DecodeOptions::default()).unwrap();
        assert_eq!(detect(&compact), Encoding::Compact);
        assert_eq!(decode(&compact, &DecodeOptions::default()).unwrap(), v);
    }
}
