//! avrosync metrics definitions.
//!
//! Instruments come from whatever `Meter` the application hands in; without
//! an installed meter provider they are no-ops.

use avrosync_core::CodecError;
use opentelemetry::{
    metrics::{Counter, Histogram, Meter},
    KeyValue,
};

/// Central metrics handle for avrosync.
#[derive(Clone)]
pub struct AvroSyncMetrics {
    pub messages_encoded: Counter<u64>,
    pub messages_decoded: Counter<u64>,
    pub decode_errors: Counter<u64>,
    pub decode_latency_ms: Histogram<f64>,
    pub sync_records_applied: Counter<u64>,
    pub sync_records_skipped: Counter<u64>,
}

impl AvroSyncMetrics {
    pub fn new(meter: &Meter) -> Self {
        Self {
            messages_encoded: meter
                .u64_counter("avrosync.messages_encoded")
                .with_description("Values encoded into wire envelopes")
                .build(),
            messages_decoded: meter
                .u64_counter("avrosync.messages_decoded")
                .with_description("Envelopes successfully decoded")
                .build(),
            decode_errors: meter
                .u64_counter("avrosync.decode_errors")
                .with_description("Envelopes that failed to decode")
                .build(),
            decode_latency_ms: meter
                .f64_histogram("avrosync.decode_latency_ms")
                .with_description("Time to decode a single envelope in milliseconds")
                .build(),
            sync_records_applied: meter
                .u64_counter("avrosync.sync_records_applied")
                .with_description("Change-log records that installed a schema")
                .build(),
            sync_records_skipped: meter
                .u64_counter("avrosync.sync_records_skipped")
                .with_description("Change-log records that changed nothing")
                .build(),
        }
    }

    pub fn record_encoded(&self, subject: &str) {
        self.messages_encoded
            .add(1, &[KeyValue::new("subject", subject.to_string())]);
    }

    pub fn record_decoded(&self, subject: &str) {
        self.messages_decoded
            .add(1, &[KeyValue::new("subject", subject.to_string())]);
    }

    pub fn record_error(&self, err: &CodecError) {
        self.decode_errors
            .add(1, &[KeyValue::new("error_type", err.kind())]);
    }

    pub fn record_latency(&self, ms: f64, subject: &str) {
        self.decode_latency_ms
            .record(ms, &[KeyValue::new("subject", subject.to_string())]);
    }

    /// Add a sync engine's record counts, as reported by its health
    /// snapshot, tagged with the change-log topic.
    pub fn record_sync_progress(&self, topic: &str, applied: u64, skipped: u64) {
        let attrs = [KeyValue::new("topic", topic.to_string())];
        if applied > 0 {
            self.sync_records_applied.add(applied, &attrs);
        }
        if skipped > 0 {
            self.sync_records_skipped.add(skipped, &attrs);
        }
    }
}
