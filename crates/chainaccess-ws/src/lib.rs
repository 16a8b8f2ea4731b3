//! chainaccess-ws: WebSocket transport for ChainAccess subscriptions.
//!
//! Each subscription gets its own connection. The client sends one
//! `subscribe` frame, waits for the server's acknowledgement (or rejection),
//! then reads data frames until the server closes the socket or reports an
//! error.
//!
//! ```text
//! → {"subscription_id":"…","action":"subscribe","topic":"events","arguments":{…}}
//! ← {"subscription_id":"…","action":"subscribe","topic":"events"}
//! ← {"subscription_id":"…","topic":"events","payload":{…}}
//! ← {"subscription_id":"…","error":{"code":500,"message":"…"}}
//! ```

pub mod config;
pub mod frame;
pub mod stream;
pub mod transport;

pub use config::WsTransportConfig;
pub use stream::WsStream;
pub use transport::WsTransport;
