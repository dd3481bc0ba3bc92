//! End-to-end registration and envelope scenarios against the in-process
//! registry client.

use avrosync_core::{json_decoder, CodecError, Version};
use avrosync_registry::{MemoryRegistryClient, RegisteredSchema, Registry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ─── Fixtures ─────────────────────────────────────────────────────────────────

const ORDER_V1: &str = r#"{
    "type": "record",
    "name": "OrderCreated",
    "namespace": "shop",
    "fields": [
        {"name": "id", "type": "string"}
    ]
}"#;

const ORDER_V2: &str = r#"{
    "type": "record",
    "name": "OrderCreated",
    "namespace": "shop",
    "fields": [
        {"name": "id", "type": "string"},
        {"name": "amount", "type": "long", "default": 0}
    ]
}"#;

const ORDER_V3: &str = r#"{
    "type": "record",
    "name": "OrderCreated",
    "namespace": "shop",
    "fields": [
        {"name": "id", "type": "string"},
        {"name": "amount", "type": "long", "default": 0},
        {"name": "note", "type": ["null", "string"], "default": null}
    ]
}"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Order {
    id: String,
    #[serde(default)]
    amount: i64,
    #[serde(default)]
    note: Option<String>,
}

fn orders_client() -> MemoryRegistryClient {
    let client = MemoryRegistryClient::new();
    client.register("orders.created", ORDER_V1);
    client.register("orders.created", ORDER_V2);
    client.register("orders.created", ORDER_V3);
    client
}

// ─── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn encode_writes_magic_and_schema_id() {
    let registry = Registry::new(Arc::new(orders_client()));
    registry
        .register("orders.created", 1u32, Some(json_decoder::<Order>()))
        .await
        .unwrap();

    let codec = registry.with_schema("orders.created", 1).unwrap();
    assert_eq!(codec.schema(), ORDER_V1);

    let bytes = codec.encode(&serde_json::json!({"id": "abc"})).unwrap();
    assert_eq!(bytes[0], 0x00);
    assert_eq!(u32::from_be_bytes(bytes[1..5].try_into().unwrap()), 1);
}

#[tokio::test]
async fn unregistered_id_fails_to_decode() {
    let registry = Registry::new(Arc::new(orders_client()));
    registry.register("orders.created", 1u32, None).await.unwrap();
    let codec = registry.with_schema("orders.created", 1).unwrap();

    let msg = [0x00, 0x00, 0x00, 0x03, 0xE7, 0x02];
    assert!(matches!(
        codec.decode(&msg),
        Err(CodecError::UnknownSchemaId { id: 999 })
    ));
}

#[tokio::test]
async fn short_payload_is_malformed() {
    let registry = Registry::new(Arc::new(orders_client()));
    registry.register("orders.created", 1u32, None).await.unwrap();
    let codec = registry.with_schema("orders.created", 1).unwrap();

    for msg in [&[0x00, 0x00, 0x01][..], &[0xFF, 0xFF, 0xFF], &[]] {
        assert!(matches!(
            codec.decode(msg),
            Err(CodecError::MalformedEnvelope { .. })
        ));
    }
}

#[tokio::test]
async fn register_all_installs_every_version_with_one_decoder() {
    let registry = Registry::new(Arc::new(orders_client()));
    let decoder = json_decoder::<Order>();
    registry
        .register("orders.created", Version::All, Some(Arc::clone(&decoder)))
        .await
        .unwrap();

    let cache = registry.cache();
    assert_eq!(cache.len(), 3);
    assert!(cache.is_consistent());

    for version in 1..=3 {
        let schema = cache.lookup("orders.created", version).unwrap();
        let by_id = cache.lookup_by_id(schema.id()).unwrap();
        assert!(Arc::ptr_eq(&schema, &by_id));

        let shared = schema.subject().decoder.as_ref().unwrap();
        assert!(Arc::ptr_eq(shared, &decoder));
    }
}

#[tokio::test]
async fn round_trip_through_every_version() {
    let registry = Registry::new(Arc::new(orders_client()));
    registry
        .register("orders.created", Version::All, Some(json_decoder::<Order>()))
        .await
        .unwrap();

    let samples = [
        Order { id: "a".into(), amount: 0, note: None },
        Order { id: "b".into(), amount: -42, note: None },
        Order { id: "c".into(), amount: i64::MAX, note: Some("rush".into()) },
    ];

    let v3 = registry.with_latest_schema("orders.created").unwrap();
    assert_eq!(v3.version(), 3);
    for order in &samples {
        let bytes = v3.encode(order).unwrap();
        assert_eq!(&v3.decode_as::<Order>(&bytes).unwrap(), order);
    }

    // v1 drops fields it does not know; what it keeps survives unchanged
    let v1 = registry.with_schema("orders.created", 1).unwrap();
    let bytes = v1.encode(&serde_json::json!({"id": "d"})).unwrap();
    let back: Order = v1.decode_as(&bytes).unwrap();
    assert_eq!(back, Order { id: "d".into(), amount: 0, note: None });
}

#[tokio::test]
async fn decode_only_registration_surfaces_missing_decoder() {
    let registry = Registry::new(Arc::new(orders_client()));
    registry.register("orders.created", 2u32, None).await.unwrap();
    let codec = registry.with_schema("orders.created", 2).unwrap();

    let bytes = codec.encode(&serde_json::json!({"id": "x", "amount": 7})).unwrap();
    assert!(matches!(
        codec.decode(&bytes),
        Err(CodecError::MissingDecoder { .. })
    ));
    assert_eq!(codec.decode_json(&bytes).unwrap()["amount"], 7);
}

// ─── Concurrency ──────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_register_and_decode_keep_indexes_consistent() {
    let client = MemoryRegistryClient::new();
    client.insert(RegisteredSchema {
        subject: "orders.created".into(),
        version: 1,
        id: 1,
        schema: ORDER_V1.into(),
    });
    for s in 0..16u32 {
        for v in 1..=3u32 {
            client.insert(RegisteredSchema {
                subject: format!("subject-{s}"),
                version: v,
                id: 100 + s * 10 + v,
                schema: ORDER_V1.replace("OrderCreated", &format!("S{s}V{v}")),
            });
        }
    }

    let registry = Arc::new(Registry::new(Arc::new(client)));
    registry
        .register("orders.created", 1u32, Some(json_decoder::<Order>()))
        .await
        .unwrap();
    let codec = registry.with_schema("orders.created", 1).unwrap();
    let msg = codec.encode(&serde_json::json!({"id": "hot"})).unwrap();

    let mut tasks = Vec::new();
    for s in 0..16u32 {
        let registry = Arc::clone(&registry);
        tasks.push(tokio::spawn(async move {
            registry
                .register(&format!("subject-{s}"), Version::All, Some(json_decoder::<Order>()))
                .await
                .unwrap();
        }));
    }

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let codec = codec.clone();
            let msg = msg.clone();
            let cache = registry.cache().clone();
            std::thread::spawn(move || {
                for _ in 0..500 {
                    let order: Order = codec.decode_as(&msg).unwrap();
                    assert_eq!(order.id, "hot");
                    assert!(cache.is_consistent());
                }
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }
    for reader in readers {
        reader.join().unwrap();
    }

    let cache = registry.cache();
    assert_eq!(cache.len(), 1 + 16 * 3);
    assert!(cache.is_consistent());
    for entry in cache.entries() {
        let schema = cache.lookup_by_id(entry.id).unwrap();
        assert_eq!(schema.subject().name, entry.subject);
        assert_eq!(schema.subject().version, entry.version);
    }
}
