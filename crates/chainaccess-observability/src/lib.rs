//! # chainaccess-observability
//!
//! Structured logging for ChainAccess binaries. Library crates only emit
//! `tracing` events; this crate installs the subscriber that renders them,
//! as text or as JSON lines, with per-component levels.

pub mod tracing_setup;

pub use tracing_setup::{init_tracing, LogConfig};
