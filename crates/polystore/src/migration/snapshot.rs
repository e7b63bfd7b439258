//! Versioned snapshot document and import mode.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::catalog::INSERT_ORDER;
use crate::core::{is_plain_identifier, Row, SqlValue};
use crate::error::{Result, StoreError};

/// Snapshot format version written by this crate.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Every row of the nine tables, keyed by table name.
///
/// Deserializing goes through [`Snapshot::from_value`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "Value")]
pub struct Snapshot {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    /// Secret-free descriptor of the database the rows came from.
    pub source: String,
    pub tables: BTreeMap<String, Vec<Row>>,
}

impl Snapshot {
    /// Empty snapshot with every table present.
    pub fn empty(source: impl Into<String>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            exported_at: Utc::now(),
            source: source.into(),
            tables: INSERT_ORDER
                .iter()
                .map(|t| (t.to_string(), Vec::new()))
                .collect(),
        }
    }

    /// Rows of one table; a table absent from the snapshot has none.
    pub fn rows(&self, table: &str) -> &[Row] {
        self.tables.get(table).map(Vec::as_slice).unwrap_or_default()
    }

    /// Total rows across all tables.
    pub fn row_count(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    /// Parse a snapshot payload.
    ///
    /// The `tables` mapping is required. Missing tables become empty, unknown
    /// table keys are ignored, and a row that is not an object becomes an
    /// empty row (skipped on import). Column names must be plain identifiers.
    pub fn from_value(raw: &Value) -> Result<Self> {
        let Some(obj) = raw.as_object() else {
            return Err(StoreError::validation("snapshot must be a JSON object"));
        };

        let version = match obj.get("version") {
            None | Some(Value::Null) => SNAPSHOT_VERSION,
            Some(v) => v
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| StoreError::validation("snapshot version must be a positive integer"))?,
        };
        if version > SNAPSHOT_VERSION {
            return Err(StoreError::validation(format!(
                "snapshot version {} is newer than supported version {}",
                version, SNAPSHOT_VERSION
            )));
        }

        let exported_at = match obj.get("exportedAt").and_then(Value::as_str) {
            None => Utc::now(),
            Some(text) => DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| {
                    StoreError::validation(format!("snapshot exportedAt is not ISO-8601: {}", e))
                })?,
        };

        let source = obj
            .get("source")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();

        let Some(raw_tables) = obj.get("tables").and_then(Value::as_object) else {
            return Err(StoreError::validation("snapshot.tables must be an object"));
        };

        for key in raw_tables.keys() {
            if !INSERT_ORDER.contains(&key.as_str()) {
                debug!("Ignoring unknown snapshot table '{}'", key);
            }
        }

        let mut tables = BTreeMap::new();
        for table in INSERT_ORDER {
            let rows = match raw_tables.get(table) {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(items)) => items.iter().map(row_from_json).collect(),
                Some(_) => {
                    return Err(StoreError::validation(format!(
                        "snapshot.tables.{} must be an array",
                        table
                    )))
                }
            };
            tables.insert(table.to_string(), rows);
        }

        let snapshot = Self {
            version,
            exported_at,
            source,
            tables,
        };
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Parse a snapshot from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: Value = serde_json::from_str(text)
            .map_err(|e| StoreError::validation(format!("snapshot is not valid JSON: {}", e)))?;
        Self::from_value(&raw)
    }

    /// Check every column name of every known table.
    ///
    /// Column names are embedded in INSERT statements, so anything other than
    /// a plain identifier is rejected before a transaction starts.
    pub fn validate(&self) -> Result<()> {
        for table in INSERT_ORDER {
            for row in self.rows(table) {
                if let Some(bad) = row.keys().find(|c| !is_plain_identifier(c)) {
                    return Err(StoreError::validation(format!(
                        "invalid column name {:?} in table {}",
                        bad, table
                    )));
                }
            }
        }
        Ok(())
    }
}

impl TryFrom<Value> for Snapshot {
    type Error = StoreError;

    fn try_from(raw: Value) -> Result<Self> {
        Self::from_value(&raw)
    }
}

fn row_from_json(value: &Value) -> Row {
    match value {
        Value::Object(fields) => fields
            .iter()
            .map(|(k, v)| (k.clone(), SqlValue::from_json(v)))
            .collect(),
        _ => Row::new(),
    }
}

/// How an import treats existing rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Delete every row of the nine tables first, then repair identities.
    #[default]
    Replace,
    /// Insert on top of existing rows; an id collision aborts the import.
    Append,
}

impl ImportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportMode::Replace => "replace",
            ImportMode::Append => "append",
        }
    }
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportMode {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "replace" => Ok(ImportMode::Replace),
            "append" => Ok(ImportMode::Append),
            other => Err(StoreError::validation(format!(
                "unknown import mode '{}'. Valid modes: replace, append",
                other
            ))),
        }
    }
}
