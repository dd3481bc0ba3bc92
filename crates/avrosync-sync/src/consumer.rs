//! `ChangeLogConsumer` trait: abstraction over the log transport.
//!
//! The sync engine only needs a single-partition stream of keyed records
//! plus a marker telling it the retained log has been replayed.

use crate::config::StartOffset;
use async_trait::async_trait;
use avrosync_core::error::TransportError;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

/// One keyed record from the change-log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub offset: i64,
    pub key: Option<Bytes>,
    pub value: Option<Bytes>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    Record(LogRecord),
    /// The consumer reached the end of what the partition held when it
    /// connected. May be emitted again later; only the first one matters.
    PartitionEnd { offset: i64 },
}

/// A live, unbounded stream of change-log events.
pub type LogStream = Pin<Box<dyn Stream<Item = Result<LogEvent, TransportError>> + Send>>;

#[async_trait]
pub trait ChangeLogConsumer: Send + Sync {
    /// Open `topic`/`partition` at `from` and stream its events.
    async fn consume(
        &self,
        topic: &str,
        partition: i32,
        from: StartOffset,
    ) -> Result<LogStream, TransportError>;
}
