use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::upload::{Blueprint, FieldSettings};

/// A content record that owns a media folder, stored in redb
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: String,
    /// Stream path or webroot-relative folder; empty means no media
    pub media_path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Media fields keyed by dot path (`header.hero`)
    #[serde(default)]
    pub fields: BTreeMap<String, FieldSettings>,
    #[serde(default)]
    pub title: Option<String>,
}

impl Blueprint for ContentRecord {
    fn field_settings(&self, field: &str) -> Option<FieldSettings> {
        self.fields.get(field).cloned()
    }
}
