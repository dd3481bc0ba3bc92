//! JSON shapes of schema registry change-log records.
//!
//! The registry writes several record kinds (`SCHEMA`, `CONFIG`, `NOOP`,
//! `DELETE_SUBJECT`, ...) to the same topic. Every field defaults so that all
//! of them parse; only `SCHEMA` records are acted on.

use serde::{Deserialize, Serialize};

pub const SCHEMA_KEYTYPE: &str = "SCHEMA";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncKey {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub keytype: String,
    #[serde(default)]
    pub version: u32,
}

impl SyncKey {
    pub fn schema(subject: impl Into<String>, version: u32) -> Self {
        Self {
            subject: subject.into(),
            keytype: SCHEMA_KEYTYPE.into(),
            version,
        }
    }

    /// Whether the record carries a schema. Subject and version are read
    /// from the value, not from here.
    pub fn is_schema(&self) -> bool {
        self.keytype == SCHEMA_KEYTYPE
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncValue {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub schema: String,
    #[serde(default)]
    pub deleted: bool,
}

impl SyncValue {
    pub fn new(subject: impl Into<String>, version: u32, id: u32, schema: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            version,
            id,
            schema: schema.into(),
            deleted: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_ignores_magic_field() {
        let key: SyncKey = serde_json::from_str(
            r#"{"subject":"orders","version":3,"magic":1,"keytype":"SCHEMA"}"#,
        )
        .unwrap();
        assert_eq!(key, SyncKey::schema("orders", 3));
        assert!(key.is_schema());
    }

    #[test]
    fn config_records_parse_but_are_not_schemas() {
        let key: SyncKey = serde_json::from_str(r#"{"magic":0,"keytype":"CONFIG"}"#).unwrap();
        assert!(!key.is_schema());

        let value: SyncValue = serde_json::from_str(r#"{"compatibilityLevel":"BACKWARD"}"#).unwrap();
        assert_eq!(value, SyncValue::default());
    }

    #[test]
    fn deleted_flag_round_trips() {
        let value: SyncValue = serde_json::from_str(
            r#"{"subject":"s","version":2,"id":7,"schema":"\"string\"","deleted":true}"#,
        )
        .unwrap();
        assert!(value.deleted);
        assert_eq!(value.id, 7);
    }
}
