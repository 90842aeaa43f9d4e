//! Row model - opaque records of the backing table
//!
//! Only `id`, `updated_at` and `name` carry meaning for synchronization; every
//! other column is passed through untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::RowId;

/// One record as returned by the projection query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: RowId,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub name: Option<String>,
    /// Extra columns the consumer asked for
    #[serde(flatten)]
    pub columns: Map<String, Value>,
}

impl Row {
    /// Create a row without extra columns
    pub fn new(id: impl Into<RowId>, updated_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            updated_at,
            name: None,
            columns: Map::new(),
        }
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add an extra column
    pub fn with_column(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.columns.insert(key.into(), value.into());
        self
    }

    /// Keep only the named extra columns
    pub fn project(&self, columns: &[String]) -> Self {
        Self {
            id: self.id.clone(),
            updated_at: self.updated_at,
            name: self.name.clone(),
            columns: self
                .columns
                .iter()
                .filter(|(k, _)| columns.iter().any(|c| c == *k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

/// Row-level change kind carried by the push channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// Row-level change notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowChange {
    pub kind: ChangeKind,
    pub table: String,
    /// New row for inserts/updates, last known row for deletes
    pub row: Row,
}
