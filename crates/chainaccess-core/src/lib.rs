//! # chainaccess-core
//!
//! Core types shared across all ChainAccess crates: identifiers, the decoded
//! value model, wire-level stream messages, the domain records delivered to
//! subscribers, subscribe requests and the transport traits every stream
//! source implements.

pub mod error;
pub mod message;
pub mod record;
pub mod request;
pub mod transport;
pub mod types;
pub mod value;

pub use error::{
    CodecError, ConversionError, InitError, OrderingError, RequestError, StreamError,
    SubscribeError, TransportError,
};
pub use message::StreamKind;
pub use record::{
    AccountStatus, AccountStatusResult, Block, BlockDigest, BlockEvents, BlockHeader, Event,
    ExecutionData, ExecutionDataStreamResponse,
};
pub use request::{
    AccountStatusFilter, BlockStatus, EventFilter, StartOptions, StartSelector, StreamRequest,
};
pub use transport::{AccessTransport, BoxedStream, StreamHandle};
pub use types::{Address, Identifier};
pub use value::{Composite, Encoding, StaticType, Value};
