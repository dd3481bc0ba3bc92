//! # avrosync-observability
//!
//! Logging and metrics for avrosync.
//!
//! ## Built-in metrics
//! - `avrosync.messages_encoded`: counter, tagged with subject
//! - `avrosync.messages_decoded`: counter, tagged with subject
//! - `avrosync.decode_errors`: counter, tagged with error_type
//! - `avrosync.decode_latency_ms`: histogram
//! - `avrosync.sync_records_applied`: counter, tagged with topic
//! - `avrosync.sync_records_skipped`: counter, tagged with topic
//!
//! ## Structured logging
//! Text or JSON logs through `tracing-subscriber`, with per-crate levels.

pub mod metrics;
pub mod tracing_setup;

pub use metrics::AvroSyncMetrics;
pub use tracing_setup::{init_tracing, LogConfig};
