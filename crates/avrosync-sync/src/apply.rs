//! Applying one change-log record to the schema cache.

use crate::record::{SyncKey, SyncValue};
use avrosync_core::{CompiledSchema, Subject};
use avrosync_registry::{InsertOutcome, SchemaCache};
use std::fmt;
use tracing::{debug, error, info, warn};

/// What `apply_record` did with a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Installed { subject: String, version: u32, id: u32 },
    Skipped(SkipReason),
}

impl ApplyOutcome {
    pub fn is_installed(&self) -> bool {
        matches!(self, Self::Installed { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Missing or empty key or value
    Tombstone,
    /// Key or value is not valid JSON
    Malformed,
    /// Not a `SCHEMA` record, or the value names no subject
    NotSchema,
    Deleted,
    /// Nobody registered the subject locally
    Untracked,
    AlreadyPresent,
    /// Only higher versions are cached; there is no decoder to borrow
    NoLowerVersion,
    /// The version it would borrow from has no decoder
    DecodeOnly,
    CompileFailed,
    IdConflict,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Tombstone => "tombstone",
            Self::Malformed => "malformed",
            Self::NotSchema => "not a schema record",
            Self::Deleted => "deleted",
            Self::Untracked => "untracked subject",
            Self::AlreadyPresent => "already present",
            Self::NoLowerVersion => "no lower version",
            Self::DecodeOnly => "no decoder to borrow",
            Self::CompileFailed => "compile failed",
            Self::IdConflict => "id conflict",
        };
        f.write_str(s)
    }
}

/// Install the schema carried by a change-log record, if it is a new version
/// of a subject this process already tracks.
///
/// The new version reuses the decoder of the nearest lower cached version.
/// No compatibility check is made: the registry is trusted to only accept
/// versions whose data still deserializes into the same type.
///
/// Never fails; every problem is logged and reported as a `SkipReason`.
pub fn apply_record(cache: &SchemaCache, key: Option<&[u8]>, value: Option<&[u8]>) -> ApplyOutcome {
    let (key, value) = match (key, value) {
        (Some(k), Some(v)) if !k.is_empty() && !v.is_empty() => (k, v),
        _ => return ApplyOutcome::Skipped(SkipReason::Tombstone),
    };

    let key: SyncKey = match serde_json::from_slice(key) {
        Ok(k) => k,
        Err(e) => {
            warn!("cannot parse change-log key: {e}");
            return ApplyOutcome::Skipped(SkipReason::Malformed);
        }
    };
    let value: SyncValue = match serde_json::from_slice(value) {
        Ok(v) => v,
        Err(e) => {
            warn!(keytype = %key.keytype, "cannot parse change-log value: {e}");
            return ApplyOutcome::Skipped(SkipReason::Malformed);
        }
    };

    if !key.is_schema() || value.subject.is_empty() {
        return ApplyOutcome::Skipped(SkipReason::NotSchema);
    }
    // The value is authoritative; the key only says what kind of record this is
    let SyncValue {
        subject: name,
        version,
        id,
        schema,
        deleted,
    } = value;

    if deleted {
        debug!(subject = %name, version, "ignoring deleted schema");
        return ApplyOutcome::Skipped(SkipReason::Deleted);
    }
    if !cache.is_tracked(&name) {
        return ApplyOutcome::Skipped(SkipReason::Untracked);
    }
    if cache.contains(&name, version) {
        return ApplyOutcome::Skipped(SkipReason::AlreadyPresent);
    }

    let Some(lower) = cache.nearest_below(&name, version) else {
        debug!(subject = %name, version, "no lower version cached, not installing");
        return ApplyOutcome::Skipped(SkipReason::NoLowerVersion);
    };
    let Some(decoder) = lower.subject().decoder.clone() else {
        info!(
            subject = %name,
            version,
            borrowed_version = lower.subject().version,
            "lower version has no decoder, not installing"
        );
        return ApplyOutcome::Skipped(SkipReason::DecodeOnly);
    };

    let compiled = match CompiledSchema::compile(Subject::new(
        name.as_str(),
        version,
        id,
        schema,
        Some(decoder),
    )) {
        Ok(c) => c,
        Err(_) => return ApplyOutcome::Skipped(SkipReason::CompileFailed),
    };

    match cache.insert(compiled) {
        Ok(InsertOutcome::Added(schema)) => {
            info!(
                subject = %name,
                version,
                id = schema.id(),
                borrowed_version = lower.subject().version,
                "installed schema from change-log"
            );
            ApplyOutcome::Installed {
                subject: name,
                version,
                id: schema.id(),
            }
        }
        // Lost a race with a concurrent register
        Ok(InsertOutcome::AlreadyPresent(_)) => ApplyOutcome::Skipped(SkipReason::AlreadyPresent),
        Err(e) => {
            error!(subject = %name, version, "{e}");
            ApplyOutcome::Skipped(SkipReason::IdConflict)
        }
    }
}
