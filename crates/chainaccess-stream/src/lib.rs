//! # chainaccess-stream
//!
//! Push-based, cancellable subscriptions over server-streaming access calls.
//!
//! ```text
//! AccessClient::subscribe_*  ──► AccessTransport::open_*  ──► StreamHandle
//!                                                               │ receive()
//!                       StreamAdapter task ◄────────────────────┘
//!                         │ SequenceState (account statuses)
//!                         │ MessageConverter (+ payload codec)
//!                         ▼
//!                 Subscription { data, errors, cancel }
//! ```
//!
//! # Usage
//! ```no_run
//! # async fn example<T: chainaccess_core::AccessTransport>(transport: T) {
//! use chainaccess_core::{EventFilter, StartSelector};
//! use chainaccess_stream::{AccessClient, CancellationToken};
//!
//! let client = AccessClient::new(transport);
//! let cancel = CancellationToken::new();
//! let mut sub = client
//!     .subscribe_events(&cancel, StartSelector::Latest, EventFilter::default())
//!     .await
//!     .expect("subscribe");
//! while let Some(item) = sub.recv().await {
//!     match item {
//!         Ok(block_events) => println!("{} events at {}", block_events.events.len(), block_events.height),
//!         Err(e) => eprintln!("stream failed: {e}"),
//!     }
//! }
//! # }
//! ```

pub mod adapter;
pub mod client;
pub mod config;
pub mod convert;
pub mod ordering;
pub mod subscription;

pub use adapter::StreamAdapter;
pub use client::AccessClient;
pub use config::SubscribeConfig;
pub use convert::MessageConverter;
pub use ordering::SequenceState;
pub use subscription::{Outcome, Subscription, SubscriptionParts, SubscriptionStats};

pub use tokio_util::sync::CancellationToken;
