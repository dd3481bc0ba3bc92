//! `Registry`: owns the registry client and the schema cache, and is the
//! entry point for registering subjects and obtaining codecs.

use crate::cache::{InsertOutcome, SchemaCache};
use crate::client::{RegisteredSchema, RegistryClient};
use crate::codec::{GenericCodec, SchemaCodec};
use avrosync_core::{error::RegistryError, CompiledSchema, JsonDecoder, Subject, Version};
use std::sync::Arc;
use tracing::{info, warn};

pub struct Registry {
    client: Arc<dyn RegistryClient>,
    cache: SchemaCache,
}

impl Registry {
    pub fn new(client: Arc<dyn RegistryClient>) -> Self {
        Self::with_cache(client, SchemaCache::new())
    }

    /// Build a registry around an existing (possibly shared) cache.
    pub fn with_cache(client: Arc<dyn RegistryClient>, cache: SchemaCache) -> Self {
        Self { client, cache }
    }

    /// Connect to a Confluent-compatible registry over HTTP.
    #[cfg(feature = "remote")]
    pub fn connect(config: &crate::config::RegistryConfig) -> Result<Self, RegistryError> {
        let client = crate::remote::HttpRegistryClient::new(config)?;
        Ok(Self::new(Arc::new(client)))
    }

    pub fn cache(&self) -> &SchemaCache {
        &self.cache
    }

    /// Fetch, compile, and cache `subject` at `version`.
    ///
    /// `Version::All` registers every version the registry reports, all
    /// sharing `decoder`. Registering a `(subject, version)` that is already
    /// cached only logs a warning. Pass `None` as decoder for subjects that
    /// are only ever encoded.
    pub async fn register(
        &self,
        subject: &str,
        version: impl Into<Version>,
        decoder: Option<Arc<dyn JsonDecoder>>,
    ) -> Result<(), RegistryError> {
        match version.into() {
            Version::All => {
                let versions = self.client.versions(subject).await?;
                for v in versions {
                    self.register_one(subject, Version::Number(v), decoder.clone())
                        .await?;
                }
                Ok(())
            }
            version => self.register_one(subject, version, decoder).await,
        }
    }

    async fn register_one(
        &self,
        subject: &str,
        version: Version,
        decoder: Option<Arc<dyn JsonDecoder>>,
    ) -> Result<(), RegistryError> {
        if let Version::Number(v) = version {
            if self.cache.contains(subject, v) {
                warn!(subject, %version, "subject already registered");
                return Ok(());
            }
        }

        let resolved: RegisteredSchema = match version {
            Version::Number(v) => self.client.by_subject_version(subject, v).await?,
            Version::Latest | Version::All => self.client.latest(subject).await?,
        };

        let compiled = CompiledSchema::compile(Subject::new(
            subject,
            resolved.version,
            resolved.id,
            resolved.schema,
            decoder,
        ))?;

        match self.cache.insert(compiled)? {
            InsertOutcome::Added(schema) => info!(
                subject,
                version = %version,
                resolved_version = schema.subject().version,
                id = schema.id(),
                "subject registered"
            ),
            InsertOutcome::AlreadyPresent(schema) => warn!(
                subject,
                version = schema.subject().version,
                "subject already registered"
            ),
        }

        Ok(())
    }

    /// Codec for a registered `(subject, version)`.
    pub fn with_schema(&self, subject: &str, version: u32) -> Result<SchemaCodec, RegistryError> {
        let schema = self.cache.lookup(subject, version)?;
        Ok(SchemaCodec::new(schema, self.cache.clone()))
    }

    /// Codec for the highest registered version of `subject`.
    pub fn with_latest_schema(&self, subject: &str) -> Result<SchemaCodec, RegistryError> {
        let schema = self.cache.lookup_latest(subject)?;
        Ok(SchemaCodec::new(schema, self.cache.clone()))
    }

    /// Decode-only codec accepting any registered schema id.
    pub fn generic_codec(&self) -> GenericCodec {
        GenericCodec::new(self.cache.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MemoryRegistryClient;
    use avrosync_core::{error::TransportError, json_decoder};

    const SCHEMA: &str = r#"{"type":"record","name":"Order","fields":[{"name":"id","type":"string"}]}"#;

    fn registry_with(versions: usize) -> Registry {
        let client = MemoryRegistryClient::new();
        for i in 0..versions {
            // distinct text per version so each gets its own id
            client.register("orders.created", &SCHEMA.replace("Order", &format!("Order{i}")));
        }
        Registry::new(Arc::new(client))
    }

    #[tokio::test]
    async fn latest_is_keyed_by_resolved_version() {
        let registry = registry_with(3);
        registry
            .register("orders.created", Version::Latest, Some(json_decoder::<serde_json::Value>()))
            .await
            .unwrap();

        assert!(registry.cache().contains("orders.created", 3));
        assert_eq!(registry.with_latest_schema("orders.created").unwrap().version(), 3);
    }

    #[tokio::test]
    async fn duplicate_registration_is_a_noop() {
        let registry = registry_with(1);
        registry.register("orders.created", 1u32, None).await.unwrap();
        registry.register("orders.created", 1u32, None).await.unwrap();
        registry.register("orders.created", Version::Latest, None).await.unwrap();
        assert_eq!(registry.cache().len(), 1);
    }

    #[tokio::test]
    async fn subjects_with_identical_text_share_an_id() {
        let client = MemoryRegistryClient::new();
        let a = client.register("a-key", r#""string""#);
        let b = client.register("b-key", r#""string""#);
        assert_eq!(a.id, b.id);
        let registry = Registry::new(Arc::new(client));

        registry.register("a-key", 1u32, None).await.unwrap();
        registry.register("b-key", 1u32, None).await.unwrap();

        assert_eq!(registry.with_schema("b-key", 1).unwrap().id(), a.id);
        assert_eq!(registry.cache().len(), 2);
        assert!(registry.cache().is_consistent());
    }

    #[tokio::test]
    async fn transport_errors_propagate() {
        let registry = registry_with(0);
        let err = registry.register("orders.created", 1u32, None).await.unwrap_err();
        assert!(matches!(err, RegistryError::Transport(TransportError::Status { status: 404, .. })));

        let err = registry.register("orders.created", Version::All, None).await.unwrap_err();
        assert!(matches!(err, RegistryError::Transport(_)));
    }

    #[tokio::test]
    async fn malformed_schema_fails_to_compile() {
        let client = MemoryRegistryClient::new();
        client.register("broken", r#"{"type":"record"}"#);
        let registry = Registry::new(Arc::new(client));

        let err = registry.register("broken", 1u32, None).await.unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Codec(avrosync_core::CodecError::SchemaCompile { .. })
        ));
        assert!(registry.cache().is_empty());
    }

    #[test]
    fn lookups_on_empty_registry_do_not_panic() {
        let registry = registry_with(0);
        assert!(matches!(
            registry.with_schema("orders.created", 1),
            Err(RegistryError::NotFound { .. })
        ));
        assert!(registry.with_latest_schema("orders.created").is_err());
    }
}
