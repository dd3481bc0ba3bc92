//! # live_sync
//!
//! Registers a subject, starts the change-log sync engine over an in-process
//! log, and shows a version published after startup becoming decodable
//! without re-registering.
//!
//! Run with:
//! ```sh
//! cargo run --bin live_sync
//!
//! # With JSON logging:
//! LOG_JSON=1 cargo run --bin live_sync
//! ```

use anyhow::Result;
use avrosync_core::json_decoder;
use avrosync_observability::{init_tracing, AvroSyncMetrics, LogConfig};
use avrosync_registry::{MemoryRegistryClient, Registry};
use avrosync_sync::{ChannelLog, SyncConfig, SyncEngine, SyncKey, SyncValue};
use opentelemetry::global;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

const ORDER_V1: &str = r#"{
    "type": "record",
    "name": "OrderCreated",
    "namespace": "shop",
    "fields": [
        {"name": "id", "type": "string"},
        {"name": "amount", "type": "long"}
    ]
}"#;

const ORDER_V2: &str = r#"{
    "type": "record",
    "name": "OrderCreated",
    "namespace": "shop",
    "fields": [
        {"name": "id", "type": "string"},
        {"name": "amount", "type": "long"},
        {"name": "currency", "type": "string", "default": "EUR"}
    ]
}"#;

#[derive(Debug, Serialize, Deserialize)]
struct Order {
    id: String,
    amount: i64,
    #[serde(default)]
    currency: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Logging + metrics ──────────────────────────────────────────────────
    let log_config = LogConfig {
        components: [("avrosync-sync".into(), "debug".into())].into(),
        json: std::env::var("LOG_JSON").is_ok(),
        ..LogConfig::default()
    };
    init_tracing(&log_config)?;
    let metrics = AvroSyncMetrics::new(&global::meter("avrosync-demo"));

    // ── 2. Register v1 with a decoder ─────────────────────────────────────────
    let client = MemoryRegistryClient::new();
    let v1 = client.register("orders.created", ORDER_V1);
    let registry = Registry::new(Arc::new(client));
    registry
        .register("orders.created", v1.version, Some(json_decoder::<Order>()))
        .await?;

    // ── 3. Start sync over a log that already holds v1 and a config record ────
    let (log, producer) = ChannelLog::new();
    producer.send_json(
        &serde_json::to_value(SyncKey::schema("orders.created", v1.version))?,
        &serde_json::to_value(SyncValue::new("orders.created", v1.version, v1.id, ORDER_V1))?,
    )?;
    producer.send_json(
        &serde_json::json!({"keytype": "CONFIG", "magic": 0}),
        &serde_json::json!({"compatibilityLevel": "BACKWARD"}),
    )?;
    producer.end_of_partition()?;

    let sync_config = SyncConfig::default();
    let topic = sync_config.topic.clone();
    let engine = SyncEngine::new(
        sync_config,
        registry.cache().clone(),
        Arc::new(log),
    );
    let handle = engine.start().await?;

    // ── 4. Encode / decode with v1 ────────────────────────────────────────────
    let codec = registry.with_schema("orders.created", v1.version)?;
    let bytes = codec.encode(&Order { id: "o-1".into(), amount: 1200, currency: None })?;
    metrics.record_encoded("orders.created");
    info!(len = bytes.len(), id = codec.id(), "encoded with v1");

    // ── 5. Publish v2 while running ───────────────────────────────────────────
    let v2_id = v1.id + 1;
    producer.send_json(
        &serde_json::to_value(SyncKey::schema("orders.created", 2))?,
        &serde_json::to_value(SyncValue::new("orders.created", 2, v2_id, ORDER_V2))?,
    )?;

    let deadline = Instant::now() + Duration::from_secs(5);
    while registry.cache().lookup_by_id(v2_id).is_none() {
        if Instant::now() > deadline {
            anyhow::bail!("v2 never arrived");
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let latest = registry.with_latest_schema("orders.created")?;
    let v2_bytes = latest.encode(&Order {
        id: "o-2".into(),
        amount: 800,
        currency: Some("USD".into()),
    })?;
    metrics.record_encoded("orders.created");

    // ── 6. The v1 codec decodes both ids ──────────────────────────────────────
    for msg in [&bytes, &v2_bytes] {
        let started = Instant::now();
        match codec.decode_as::<Order>(msg) {
            Ok(order) => {
                metrics.record_decoded("orders.created");
                metrics.record_latency(started.elapsed().as_secs_f64() * 1000.0, "orders.created");
                println!("decoded {order:?}");
            }
            Err(e) => {
                metrics.record_error(&e);
                warn!("decode failed: {e}");
            }
        }
    }

    let health = handle.shutdown().await;
    metrics.record_sync_progress(&topic, health.records_applied, health.records_skipped);
    println!(
        "sync {}: applied {}, skipped {}, last offset {:?}",
        health.state, health.records_applied, health.records_skipped, health.last_offset
    );
    println!("{}", registry.cache().render_table());
    Ok(())
}
