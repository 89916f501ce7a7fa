use crate::error::{BookingError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Row filter understood by every [`Database`] backend
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    In(String, Vec<Value>),
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(column.to_string(), value.into())
    }

    pub fn is_in<V: Into<Value>>(column: &str, values: impl IntoIterator<Item = V>) -> Self {
        Filter::In(column.to_string(), values.into_iter().map(Into::into).collect())
    }

    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(column, _) | Filter::In(column, _) => column,
        }
    }

    pub fn matches(&self, row: &Value) -> bool {
        let cell = row.get(self.column()).unwrap_or(&Value::Null);
        match self {
            Filter::Eq(_, expected) => cell == expected,
            Filter::In(_, candidates) => candidates.iter().any(|c| c == cell),
        }
    }

    /// PostgREST query parameter, e.g. `("id", "in.(\"a\",\"b\")")`
    pub fn to_query_param(&self) -> (String, String) {
        match self {
            Filter::Eq(column, Value::Null) => (column.clone(), "is.null".to_string()),
            Filter::Eq(column, value) => (column.clone(), format!("eq.{}", plain(value))),
            Filter::In(column, values) => {
                let list: Vec<String> = values.iter().map(quoted).collect();
                (column.clone(), format!("in.({})", list.join(",")))
            }
        }
    }
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn quoted(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        other => other.to_string(),
    }
}

/// Table-level access to the managed database
#[async_trait]
pub trait Database: Send + Sync {
    async fn select(&self, table: &str, filters: &[Filter]) -> Result<Vec<Value>>;
    /// Inserts rows and returns them as stored
    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>>;
    /// Merges `patch` into every matching row and returns the updated rows
    async fn update(&self, table: &str, filters: &[Filter], patch: Value) -> Result<Vec<Value>>;
}

/// Selects rows and deserializes them into `T`
pub async fn fetch_rows<T: DeserializeOwned>(
    db: &dyn Database,
    table: &str,
    filters: &[Filter],
) -> Result<Vec<T>> {
    db.select(table, filters)
        .await?
        .into_iter()
        .map(|row| serde_json::from_value(row).map_err(BookingError::from))
        .collect()
}

/// In-memory database for development and tests
pub struct InMemoryDatabase {
    tables: Mutex<HashMap<String, Vec<Value>>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self { tables: Mutex::new(HashMap::new()) }
    }

    /// Seeds a table, replacing its contents
    pub fn with_rows(self, table: &str, rows: Vec<Value>) -> Self {
        self.lock().insert(table.to_string(), rows);
        self
    }

    /// Snapshot of a table
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.lock().get(table).cloned().unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<Value>>> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for InMemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Database for InMemoryDatabase {
    async fn select(&self, table: &str, filters: &[Filter]) -> Result<Vec<Value>> {
        let tables = self.lock();
        let rows: Vec<Value> = tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| filters.iter().all(|f| f.matches(row)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        debug!("select {} ({} filters) -> {} rows", table, filters.len(), rows.len());
        Ok(rows)
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>> {
        let mut stored = Vec::with_capacity(rows.len());
        for row in rows {
            let mut object = into_object(row)?;
            object
                .entry("id")
                .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
            stored.push(Value::Object(object));
        }
        self.lock()
            .entry(table.to_string())
            .or_default()
            .extend(stored.iter().cloned());
        debug!("insert {} -> {} rows", table, stored.len());
        Ok(stored)
    }

    async fn update(&self, table: &str, filters: &[Filter], patch: Value) -> Result<Vec<Value>> {
        let patch = into_object(patch)?;
        let mut tables = self.lock();
        let mut updated = Vec::new();
        if let Some(rows) = tables.get_mut(table) {
            for row in rows.iter_mut().filter(|row| filters.iter().all(|f| f.matches(row))) {
                if let Value::Object(object) = row {
                    for (column, value) in &patch {
                        object.insert(column.clone(), value.clone());
                    }
                }
                updated.push(row.clone());
            }
        }
        debug!("update {} -> {} rows", table, updated.len());
        Ok(updated)
    }
}

fn into_object(value: Value) -> Result<Map<String, Value>> {
    match value {
        Value::Object(object) => Ok(object),
        other => Err(BookingError::Validation(format!("expected a JSON object row, got {}", other))),
    }
}
