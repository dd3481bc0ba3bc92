//! `SchemaCache`: the shared map of compiled schemas.
//!
//! Two indexes, `(subject, version)` and `id`, live behind one `RwLock` and
//! are only ever updated together. Entries are never removed or replaced.
//!
//! A registry hands out the same id when two subjects register identical
//! schema text. Both subjects get a `(subject, version)` entry, while the id
//! stays bound to whichever was cached first.

use avrosync_core::{error::RegistryError, CompiledSchema};
use serde::Serialize;
use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};
use tracing::warn;

#[derive(Default)]
struct Inner {
    /// subject → version → schema (versions ascending)
    by_subject_version: HashMap<String, BTreeMap<u32, Arc<CompiledSchema>>>,
    /// schema id → schema
    by_id: HashMap<u32, Arc<CompiledSchema>>,
}

/// Result of a successful `SchemaCache::insert`.
#[derive(Debug, Clone)]
pub enum InsertOutcome {
    /// The schema is now cached.
    Added(Arc<CompiledSchema>),
    /// `(subject, version)` was already cached; the existing entry is returned
    /// and the new one dropped.
    AlreadyPresent(Arc<CompiledSchema>),
}

impl InsertOutcome {
    pub fn schema(&self) -> &Arc<CompiledSchema> {
        match self {
            Self::Added(s) | Self::AlreadyPresent(s) => s,
        }
    }

    pub fn is_added(&self) -> bool {
        matches!(self, Self::Added(_))
    }
}

/// One row of the cache listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
pub struct SchemaEntry {
    #[tabled(rename = "Schema Id")]
    pub id: u32,
    #[tabled(rename = "Subject")]
    pub subject: String,
    #[tabled(rename = "Version")]
    pub version: u32,
    #[tabled(rename = "Json Decoder")]
    pub json_decoder: bool,
}

/// Thread-safe schema cache. Cloning shares the underlying maps.
#[derive(Clone, Default)]
pub struct SchemaCache {
    inner: Arc<RwLock<Inner>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    // Inserts never leave the maps half-updated, so a poisoned lock still
    // guards consistent data.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a compiled schema to both indexes.
    ///
    /// Fails with `IdConflict` if the schema id is already bound to a
    /// different `(subject, version)` with different schema text.
    pub fn insert(&self, schema: CompiledSchema) -> Result<InsertOutcome, RegistryError> {
        let mut inner = self.write();
        let subject = schema.subject();

        if let Some(existing) = inner
            .by_subject_version
            .get(&subject.name)
            .and_then(|versions| versions.get(&subject.version))
        {
            return Ok(InsertOutcome::AlreadyPresent(Arc::clone(existing)));
        }

        let shares_id = match inner.by_id.get(&subject.id) {
            Some(existing) if existing.schema() == schema.schema() => {
                warn!(
                    id = subject.id,
                    subject = %subject.name,
                    version = subject.version,
                    existing_subject = %existing.subject().name,
                    existing_version = existing.subject().version,
                    "schema id shared with identical schema text"
                );
                true
            }
            Some(existing) => {
                return Err(RegistryError::IdConflict {
                    id: subject.id,
                    subject: subject.name.clone(),
                    version: subject.version,
                    existing_subject: existing.subject().name.clone(),
                    existing_version: existing.subject().version,
                });
            }
            None => false,
        };

        let schema = Arc::new(schema);
        let subject = schema.subject();
        inner
            .by_subject_version
            .entry(subject.name.clone())
            .or_default()
            .insert(subject.version, Arc::clone(&schema));
        if !shares_id {
            inner.by_id.insert(subject.id, Arc::clone(&schema));
        }

        Ok(InsertOutcome::Added(schema))
    }

    /// Look up a concrete `(subject, version)`.
    pub fn lookup(&self, subject: &str, version: u32) -> Result<Arc<CompiledSchema>, RegistryError> {
        self.read()
            .by_subject_version
            .get(subject)
            .and_then(|versions| versions.get(&version))
            .cloned()
            .ok_or_else(|| RegistryError::NotFound {
                subject: subject.to_string(),
                version: Some(version),
            })
    }

    /// The numerically highest cached version of `subject`.
    pub fn lookup_latest(&self, subject: &str) -> Result<Arc<CompiledSchema>, RegistryError> {
        self.read()
            .by_subject_version
            .get(subject)
            .and_then(|versions| versions.values().next_back())
            .cloned()
            .ok_or_else(|| RegistryError::NotFound {
                subject: subject.to_string(),
                version: None,
            })
    }

    pub fn lookup_by_id(&self, id: u32) -> Option<Arc<CompiledSchema>> {
        self.read().by_id.get(&id).cloned()
    }

    pub fn contains(&self, subject: &str, version: u32) -> bool {
        self.read()
            .by_subject_version
            .get(subject)
            .is_some_and(|versions| versions.contains_key(&version))
    }

    /// Whether any version of `subject` has been cached.
    pub fn is_tracked(&self, subject: &str) -> bool {
        self.read().by_subject_version.contains_key(subject)
    }

    /// The highest cached version of `subject` strictly below `version`.
    pub fn nearest_below(&self, subject: &str, version: u32) -> Option<Arc<CompiledSchema>> {
        self.read()
            .by_subject_version
            .get(subject)?
            .range(..version)
            .next_back()
            .map(|(_, schema)| Arc::clone(schema))
    }

    /// Number of cached `(subject, version)` entries.
    pub fn len(&self) -> usize {
        self.read().by_subject_version.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All cached entries, ordered by subject then version.
    pub fn entries(&self) -> Vec<SchemaEntry> {
        let inner = self.read();
        let mut subjects: Vec<_> = inner.by_subject_version.iter().collect();
        subjects.sort_by(|a, b| a.0.cmp(b.0));

        subjects
            .into_iter()
            .flat_map(|(_, versions)| versions.values())
            .map(|schema| {
                let subject = schema.subject();
                SchemaEntry {
                    id: subject.id,
                    subject: subject.name.clone(),
                    version: subject.version,
                    json_decoder: subject.has_decoder(),
                }
            })
            .collect()
    }

    /// Human-readable listing of every cached schema.
    pub fn render_table(&self) -> String {
        let mut table = Table::new(self.entries());
        table
            .with(Style::ascii())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    /// Check that both indexes describe the same set of schemas: every id
    /// entry is the `(subject, version)` entry it names, and every
    /// `(subject, version)` entry's id resolves to the same schema text.
    pub fn is_consistent(&self) -> bool {
        let inner = self.read();
        for (name, versions) in &inner.by_subject_version {
            for (version, schema) in versions {
                let subject = schema.subject();
                if &subject.name != name || subject.version != *version {
                    return false;
                }
                match inner.by_id.get(&subject.id) {
                    Some(by_id) if Arc::ptr_eq(by_id, schema) => {}
                    Some(by_id) if by_id.schema() == schema.schema() => {}
                    _ => return false,
                }
            }
        }
        inner.by_id.iter().all(|(id, schema)| {
            let subject = schema.subject();
            *id == subject.id
                && inner
                    .by_subject_version
                    .get(&subject.name)
                    .and_then(|versions| versions.get(&subject.version))
                    .is_some_and(|cached| Arc::ptr_eq(cached, schema))
        })
    }
}
