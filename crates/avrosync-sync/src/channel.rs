//! In-process change-log backed by a Tokio channel.
//!
//! `ChannelLog` is the consumer side handed to the engine; `LogProducer`
//! appends records and end-of-partition markers. Everything appended before
//! `consume` is called is replayed, which makes it a faithful stand-in for a
//! compacted topic read from its oldest offset.

use crate::config::StartOffset;
use crate::consumer::{ChangeLogConsumer, LogEvent, LogRecord, LogStream};
use async_trait::async_trait;
use avrosync_core::error::TransportError;
use bytes::Bytes;
use futures::StreamExt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::debug;

type Item = Result<LogEvent, TransportError>;

pub struct ChannelLog {
    rx: Mutex<Option<mpsc::UnboundedReceiver<Item>>>,
}

/// Write side of a `ChannelLog`. Cloning shares the offset counter.
#[derive(Clone)]
pub struct LogProducer {
    tx: mpsc::UnboundedSender<Item>,
    next_offset: Arc<AtomicI64>,
}

impl ChannelLog {
    pub fn new() -> (Self, LogProducer) {
        let (tx, rx) = mpsc::unbounded_channel();
        let log = Self {
            rx: Mutex::new(Some(rx)),
        };
        let producer = LogProducer {
            tx,
            next_offset: Arc::new(AtomicI64::new(0)),
        };
        (log, producer)
    }
}

impl LogProducer {
    /// Append a record; returns its offset.
    pub fn send(&self, key: Option<Bytes>, value: Option<Bytes>) -> Result<i64, TransportError> {
        let offset = self.next_offset.fetch_add(1, Ordering::SeqCst);
        self.tx
            .send(Ok(LogEvent::Record(LogRecord { offset, key, value })))
            .map_err(|_| TransportError::Closed)?;
        Ok(offset)
    }

    /// Append a record with JSON key and value.
    pub fn send_json(&self, key: &serde_json::Value, value: &serde_json::Value) -> Result<i64, TransportError> {
        self.send(
            Some(Bytes::from(serde_json::to_vec(key)?)),
            Some(Bytes::from(serde_json::to_vec(value)?)),
        )
    }

    /// Append a tombstone (key, no value).
    pub fn tombstone(&self, key: &serde_json::Value) -> Result<i64, TransportError> {
        self.send(Some(Bytes::from(serde_json::to_vec(key)?)), None)
    }

    /// Signal that everything retained so far has been delivered.
    pub fn end_of_partition(&self) -> Result<(), TransportError> {
        let offset = self.next_offset.load(Ordering::SeqCst);
        self.tx
            .send(Ok(LogEvent::PartitionEnd { offset }))
            .map_err(|_| TransportError::Closed)
    }

    /// Deliver a transport failure to the consumer.
    pub fn fail(&self, err: TransportError) -> Result<(), TransportError> {
        self.tx.send(Err(err)).map_err(|_| TransportError::Closed)
    }
}

#[async_trait]
impl ChangeLogConsumer for ChannelLog {
    async fn consume(
        &self,
        topic: &str,
        partition: i32,
        from: StartOffset,
    ) -> Result<LogStream, TransportError> {
        let min_offset = match from {
            StartOffset::Oldest => i64::MIN,
            StartOffset::At(offset) => offset,
            StartOffset::Latest => {
                return Err(TransportError::Other(
                    "channel log cannot start from the latest offset".into(),
                ))
            }
        };

        let rx = self
            .rx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .ok_or_else(|| TransportError::Other("channel log already consumed".into()))?;

        debug!(topic, partition, ?from, "channel log consumer opened");

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .filter(move |item| {
            let keep = !matches!(item, Ok(LogEvent::Record(r)) if r.offset < min_offset);
            futures::future::ready(keep)
        });

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn replays_everything_sent_before_consume() {
        let (log, producer) = ChannelLog::new();
        producer.send_json(&json!({"k": 1}), &json!({"v": 1})).unwrap();
        producer.tombstone(&json!({"k": 2})).unwrap();
        producer.end_of_partition().unwrap();

        let mut stream = log.consume("_schemas", 0, StartOffset::Oldest).await.unwrap();

        match stream.next().await {
            Some(Ok(LogEvent::Record(r))) => {
                assert_eq!(r.offset, 0);
                assert!(r.value.is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
        match stream.next().await {
            Some(Ok(LogEvent::Record(r))) => assert!(r.value.is_none()),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            stream.next().await.unwrap().unwrap(),
            LogEvent::PartitionEnd { offset: 2 }
        );
    }

    #[tokio::test]
    async fn start_offset_skips_earlier_records() {
        let (log, producer) = ChannelLog::new();
        for i in 0..3 {
            producer.send_json(&json!({"k": i}), &json!({})).unwrap();
        }
        drop(producer);

        let stream = log.consume("_schemas", 0, StartOffset::At(2)).await.unwrap();
        let offsets: Vec<i64> = stream
            .filter_map(|item| async move {
                match item {
                    Ok(LogEvent::Record(r)) => Some(r.offset),
                    _ => None,
                }
            })
            .collect()
            .await;
        assert_eq!(offsets, vec![2]);
    }

    #[tokio::test]
    async fn second_consume_is_rejected() {
        let (log, _producer) = ChannelLog::new();
        let _first = log.consume("_schemas", 0, StartOffset::Oldest).await.unwrap();
        assert!(log.consume("_schemas", 0, StartOffset::Oldest).await.is_err());
    }

    #[tokio::test]
    async fn sending_after_consumer_dropped_reports_closed() {
        let (log, producer) = ChannelLog::new();
        drop(log);
        assert!(matches!(
            producer.send(None, None),
            Err(TransportError::Closed)
        ));
    }
}
