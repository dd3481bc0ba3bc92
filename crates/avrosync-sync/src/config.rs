//! Sync engine configuration.

use serde::{Deserialize, Serialize};

/// Where the change-log consumer starts reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartOffset {
    /// Replay the whole retained log.
    #[default]
    Oldest,
    /// Only records produced after connecting.
    Latest,
    /// A specific offset.
    At(i64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Compacted topic the registry writes its state to
    #[serde(default = "default_topic")]
    pub topic: String,
    /// Partition of `topic` to tail (the registry log has exactly one)
    #[serde(default)]
    pub partition: i32,
    #[serde(default)]
    pub start_offset: StartOffset,
    /// Upper bound on how long `start()` waits for catch-up
    #[serde(default = "default_startup_timeout_ms")]
    pub startup_timeout_ms: u64,
    /// Log the cache listing after catch-up and after every live install
    #[serde(default = "bool_true")]
    pub log_snapshots: bool,
}

fn default_topic() -> String { "_schemas".into() }
fn default_startup_timeout_ms() -> u64 { 60_000 }
fn bool_true() -> bool { true }

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            partition: 0,
            start_offset: StartOffset::Oldest,
            startup_timeout_ms: default_startup_timeout_ms(),
            log_snapshots: true,
        }
    }
}

impl SyncConfig {
    /// Config tailing `topic` from the oldest offset with default limits.
    pub fn for_topic(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: SyncConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.topic, "_schemas");
        assert_eq!(config.partition, 0);
        assert_eq!(config.start_offset, StartOffset::Oldest);
        assert_eq!(config.startup_timeout_ms, 60_000);
        assert!(config.log_snapshots);
    }

    #[test]
    fn explicit_offset_parses() {
        let config: SyncConfig =
            serde_json::from_str(r#"{"topic": "schemas", "start_offset": {"at": 42}}"#).unwrap();
        assert_eq!(config.topic, "schemas");
        assert_eq!(config.start_offset, StartOffset::At(42));
    }
}
