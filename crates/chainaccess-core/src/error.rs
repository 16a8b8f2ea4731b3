//! Error types for the access pipeline.
//!
//! The taxonomy separates where a failure happened: caller input
//! ([`RequestError`]), opening a stream ([`InitError`]), the connection after
//! it was established ([`TransportError`]), payload decoding ([`CodecError`]),
//! message-to-record mapping ([`ConversionError`]) and sequence checks
//! ([`OrderingError`]). In-stream failures reach callers as a [`StreamError`].

use thiserror::Error;

use crate::value::Encoding;

/// Errors produced by the value codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The bytes are not a structurally valid value in the selected encoding.
    #[error("malformed {encoding} payload: {reason}")]
    MalformedPayload { encoding: Encoding, reason: String },

    /// The value cannot be represented in the requested encoding.
    #[error("cannot encode value as {encoding}: {reason}")]
    Unencodable { encoding: Encoding, reason: String },
}

impl CodecError {
    pub fn malformed(encoding: Encoding, reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            encoding,
            reason: reason.into(),
        }
    }

    pub fn unencodable(encoding: Encoding, reason: impl Into<String>) -> Self {
        Self::Unencodable {
            encoding,
            reason: reason.into(),
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedPayload { .. })
    }

    /// The encoding the failing decode or encode ran under.
    pub fn encoding(&self) -> Encoding {
        match self {
            Self::MalformedPayload { encoding, .. } | Self::Unencodable { encoding, .. } => {
                *encoding
            }
        }
    }
}

/// A received message could not be mapped into a domain record.
///
/// Conversion is all-or-nothing: one failing payload fails the whole message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("failed to decode {entity} payload at {location}: {source}")]
    Payload {
        entity: &'static str,
        /// Position of the payload inside the message, e.g. `events[3]`.
        location: String,
        #[source]
        source: CodecError,
    },

    #[error("empty {entity} message")]
    EmptyMessage { entity: &'static str },

    #[error("invalid {field} in {entity}: {reason}")]
    InvalidField {
        entity: &'static str,
        field: &'static str,
        reason: String,
    },
}

impl ConversionError {
    /// Returns the codec error if a payload failed to decode.
    pub fn codec_error(&self) -> Option<&CodecError> {
        match self {
            Self::Payload { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// A sequence-index invariant was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OrderingError {
    /// Gap, duplicate or regression.
    #[error("message index out of order: expected {expected}, got {observed}")]
    OutOfOrder { expected: u64, observed: u64 },

    /// The counter already accepted `u64::MAX`; no further index is valid.
    #[error("message index space exhausted, got {observed}")]
    Exhausted { observed: u64 },
}

/// The underlying connection failed after the stream was established.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection error: {0}")]
    Connection(String),

    /// The server reported an error for this stream.
    #[error("remote error {code}: {message}")]
    Remote { code: i64, message: String },

    /// A frame arrived that does not match the stream's message shape.
    #[error("undecodable frame: {0}")]
    Decode(String),

    #[error("stream closed unexpectedly")]
    Closed,

    #[error("{0}")]
    Other(String),
}

/// The stream could not be opened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitError {
    #[error("connection to {url} failed: {reason}")]
    Connect { url: String, reason: String },

    #[error("opening stream timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("subscription rejected ({code}): {message}")]
    Rejected { code: i64, message: String },

    #[error("cancelled before the stream was established")]
    Cancelled,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Caller input errors, reported before anything touches the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("no start point given: choose a block ID, a height, or latest")]
    MissingStart,

    #[error("conflicting start points: {0}")]
    ConflictingStart(String),

    #[error("invalid identifier '{value}': {reason}")]
    InvalidIdentifier { value: String, reason: String },

    #[error("invalid address '{value}': {reason}")]
    InvalidAddress { value: String, reason: String },

    #[error("invalid event type '{value}': {reason}")]
    InvalidEventType { value: String, reason: String },

    #[error("invalid contract '{value}': {reason}")]
    InvalidContract { value: String, reason: String },

    #[error("heartbeat interval must be greater than zero")]
    InvalidHeartbeat,
}

/// Errors returned synchronously by a subscribe call. No channels exist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscribeError {
    #[error("invalid subscription request: {0}")]
    InvalidRequest(#[from] RequestError),

    #[error("failed to open stream: {0}")]
    Init(#[from] InitError),
}

/// An in-stream failure, delivered at most once on a subscription's error
/// channel. Every variant is terminal for the subscription.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("error receiving {kind}: {source}")]
    Transport {
        kind: &'static str,
        #[source]
        source: TransportError,
    },

    #[error("error converting {kind} for block {height}: {source}")]
    Conversion {
        kind: &'static str,
        height: u64,
        #[source]
        source: ConversionError,
    },

    #[error("{kind} stream out of order at block {height}: {source}")]
    Ordering {
        kind: &'static str,
        height: u64,
        #[source]
        source: OrderingError,
    },
}

impl StreamError {
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    pub fn is_conversion(&self) -> bool {
        matches!(self, Self::Conversion { .. })
    }

    pub fn is_ordering(&self) -> bool {
        matches!(self, Self::Ordering { .. })
    }

    pub fn ordering_error(&self) -> Option<OrderingError> {
        match self {
            Self::Ordering { source, .. } => Some(*source),
            _ => None,
        }
    }

    pub fn conversion_error(&self) -> Option<&ConversionError> {
        match self {
            Self::Conversion { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_error_messages_carry_context() {
        let err = StreamError::Conversion {
            kind: "events",
            height: 42,
            source: ConversionError::Payload {
                entity: "event",
                location: "events[3]".into(),
                source: CodecError::malformed(Encoding::Compact, "unexpected end of input"),
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("block 42"));
        assert!(msg.contains("events[3]"));
        assert!(err.conversion_error().unwrap().codec_error().unwrap().is_malformed());
        assert!(!err.is_transport());
    }

    #[test]
    fn ordering_error_accessor() {
        let err = StreamError::Ordering {
            kind: "account statuses",
            height: 7,
            source: OrderingError::OutOfOrder {
                expected: 12,
                observed: 13,
            },
        };
        assert_eq!(
            err.ordering_error(),
            Some(OrderingError::OutOfOrder {
                expected: 12,
                observed: 13
            })
        );
    }

    #[test]
    fn subscribe_error_from_parts() {
        let e: SubscribeError = RequestError::MissingStart.into();
        assert!(matches!(e, SubscribeError::InvalidRequest(_)));
        let e: SubscribeError = InitError::Cancelled.into();
        assert!(matches!(e, SubscribeError::Init(InitError::Cancelled)));
    }
}
