//! `RegistryClient`: the contract the registration path consumes to resolve
//! subjects and versions into schema text and ids.

use async_trait::async_trait;
use avrosync_core::error::TransportError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

/// A schema as the registry reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredSchema {
    pub subject: String,
    pub version: u32,
    pub id: u32,
    pub schema: String,
}

/// Read access to a schema registry.
///
/// # Thread Safety
/// Implementations must be `Send + Sync`; the trait is object-safe and is
/// stored as `Arc<dyn RegistryClient>`.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Every version registered under `subject`, ascending.
    async fn versions(&self, subject: &str) -> Result<Vec<u32>, TransportError>;

    /// A specific version of `subject`.
    async fn by_subject_version(
        &self,
        subject: &str,
        version: u32,
    ) -> Result<RegisteredSchema, TransportError>;

    /// The newest version of `subject`.
    async fn latest(&self, subject: &str) -> Result<RegisteredSchema, TransportError>;
}

/// In-process registry client.
///
/// Assigns ids the way a registry would (one global counter, reusing the id
/// when the same schema text is registered again). Suitable for tests and
/// embedded deployments that ship their schemas with the binary.
#[derive(Default)]
pub struct MemoryRegistryClient {
    inner: RwLock<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    subjects: HashMap<String, BTreeMap<u32, RegisteredSchema>>,
    ids_by_text: HashMap<String, u32>,
    next_id: u32,
}

impl MemoryRegistryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `schema` as the next version of `subject`; returns the entry.
    pub fn register(&self, subject: &str, schema: &str) -> RegisteredSchema {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());

        let id = match inner.ids_by_text.get(schema) {
            Some(&id) => id,
            None => {
                inner.next_id += 1;
                let id = inner.next_id;
                inner.ids_by_text.insert(schema.to_string(), id);
                id
            }
        };

        let versions = inner.subjects.entry(subject.to_string()).or_default();
        let version = versions.keys().next_back().map_or(1, |v| v + 1);
        let entry = RegisteredSchema {
            subject: subject.to_string(),
            version,
            id,
            schema: schema.to_string(),
        };
        versions.insert(version, entry.clone());
        entry
    }

    /// Insert an entry with caller-chosen version and id.
    pub fn insert(&self, entry: RegisteredSchema) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.next_id = inner.next_id.max(entry.id);
        inner.ids_by_text.insert(entry.schema.clone(), entry.id);
        inner
            .subjects
            .entry(entry.subject.clone())
            .or_default()
            .insert(entry.version, entry);
    }

    fn not_found(subject: &str, version: Option<u32>) -> TransportError {
        let what = version.map_or_else(|| "latest".to_string(), |v| v.to_string());
        TransportError::Status {
            status: 404,
            body: format!("subject [{subject}] version [{what}] not found"),
        }
    }
}

#[async_trait]
impl RegistryClient for MemoryRegistryClient {
    async fn versions(&self, subject: &str) -> Result<Vec<u32>, TransportError> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner
            .subjects
            .get(subject)
            .map(|versions| versions.keys().copied().collect())
            .ok_or_else(|| Self::not_found(subject, None))
    }

    async fn by_subject_version(
        &self,
        subject: &str,
        version: u32,
    ) -> Result<RegisteredSchema, TransportError> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner
            .subjects
            .get(subject)
            .and_then(|versions| versions.get(&version))
            .cloned()
            .ok_or_else(|| Self::not_found(subject, Some(version)))
    }

    async fn latest(&self, subject: &str) -> Result<RegisteredSchema, TransportError> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner
            .subjects
            .get(subject)
            .and_then(|versions| versions.values().next_back())
            .cloned()
            .ok_or_else(|| Self::not_found(subject, None))
    }
}
