//! # avrosync-sync
//!
//! Keeps an avrosync `SchemaCache` current by tailing the schema registry's
//! compacted change-log.
//!
//! New versions of subjects the process already registered are compiled and
//! installed as they appear, reusing the decoder of the nearest lower
//! version. Subjects nobody registered locally are ignored.
//!
//! ```ignore
//! let (log, producer) = ChannelLog::new();
//! let engine = SyncEngine::new(SyncConfig::default(), registry.cache().clone(), Arc::new(log));
//! let handle = engine.start().await?;
//! // ...
//! handle.shutdown().await;
//! ```

pub mod apply;
pub mod channel;
pub mod config;
pub mod consumer;
pub mod engine;
pub mod record;

pub use apply::{apply_record, ApplyOutcome, SkipReason};
pub use channel::{ChannelLog, LogProducer};
pub use config::{StartOffset, SyncConfig};
pub use consumer::{ChangeLogConsumer, LogEvent, LogRecord, LogStream};
pub use engine::{SyncEngine, SyncHandle, SyncHealth, SyncState};
pub use record::{SyncKey, SyncValue, SCHEMA_KEYTYPE};
