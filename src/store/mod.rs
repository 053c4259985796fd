//! Document store module
//!
//! The narrow persistence contract consumed by the cache. Records are JSON
//! documents keyed by object id, one table per aggregate kind.

pub mod error;
pub mod memory;
pub mod postgres;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::aggregate::Record;

/// One condition of a [`Filter`]
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// The field equals the value
    Eq(Value),
    /// The array field contains the value
    Contains(Value),
}

/// Conjunction of equality and set-membership conditions on top-level fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Condition)>,
}

impl Filter {
    /// Matches every live document.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self::all().and_eq(field, value)
    }

    pub fn contains(field: &str, value: impl Into<Value>) -> Self {
        Self::all().and_contains(field, value)
    }

    pub fn and_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push((field.to_string(), Condition::Eq(value.into())));
        self
    }

    pub fn and_contains(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push((field.to_string(), Condition::Contains(value.into())));
        self
    }

    pub fn conditions(&self) -> &[(String, Condition)] {
        &self.conditions
    }

    /// JSONB containment document equivalent to this filter.
    ///
    /// Several conditions on the same array field merge into one array.
    pub fn to_containment(&self) -> Value {
        let mut doc = Map::new();
        for (field, condition) in &self.conditions {
            match condition {
                Condition::Eq(value) => {
                    doc.insert(field.clone(), value.clone());
                }
                Condition::Contains(value) => {
                    let entry = doc
                        .entry(field.clone())
                        .or_insert_with(|| Value::Array(Vec::new()));
                    match entry {
                        Value::Array(items) => items.push(value.clone()),
                        other => *other = Value::Array(vec![value.clone()]),
                    }
                }
            }
        }
        Value::Object(doc)
    }

    /// Evaluate the filter against a document held in memory.
    pub fn matches(&self, doc: &Value) -> bool {
        self.conditions.iter().all(|(field, condition)| {
            let Some(actual) = doc.get(field) else {
                return false;
            };
            match condition {
                Condition::Eq(expected) => actual == expected,
                Condition::Contains(expected) => actual
                    .as_array()
                    .map(|items| items.contains(expected))
                    .unwrap_or(false),
            }
        })
    }
}

/// Top-level field values written by one update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields(Map<String, Value>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// Set a structured value.
    pub fn set_json<T: Serialize + ?Sized>(self, key: &str, value: &T) -> StoreResult<Self> {
        let value = serde_json::to_value(value)?;
        Ok(self.set(key, value))
    }

    /// Stamp the write with its operator and time.
    pub fn touched(self, operator: &str) -> Self {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::AutoSi, true);
        self.set("operator", operator).set("updatedAt", now)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// One write of a transactional batch
#[derive(Debug, Clone)]
pub struct FieldWrite {
    pub table: &'static str,
    pub uid: String,
    pub fields: Fields,
}

impl FieldWrite {
    pub fn new(table: &'static str, uid: impl Into<String>, fields: Fields) -> Self {
        Self {
            table,
            uid: uid.into(),
            fields,
        }
    }
}

/// Document store contract
///
/// Every lookup excludes tombstoned documents. Identifiers are opaque strings.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create(&self, table: &'static str, uid: &str, seq: u64, doc: Value) -> StoreResult<()>;

    async fn find_by_id(&self, table: &'static str, uid: &str) -> StoreResult<Option<Value>>;

    async fn find_one_by(&self, table: &'static str, filter: &Filter) -> StoreResult<Option<Value>>;

    /// Matching documents in insertion order.
    async fn find_many_by(&self, table: &'static str, filter: &Filter) -> StoreResult<Vec<Value>>;

    /// Merge `fields` into the document. Fails with `NotFound` for a missing
    /// or tombstoned document.
    async fn update_fields(&self, table: &'static str, uid: &str, fields: Fields) -> StoreResult<()>;

    /// Mark the document deleted. A missing document is not an error.
    async fn tombstone(&self, table: &'static str, uid: &str, operator: &str) -> StoreResult<()>;

    async fn append_to_array_field(
        &self,
        table: &'static str,
        uid: &str,
        field: &str,
        value: Value,
    ) -> StoreResult<()>;

    /// Remove every element equal to `value`, keeping the order of the rest.
    async fn remove_from_array_field(
        &self,
        table: &'static str,
        uid: &str,
        field: &str,
        value: Value,
    ) -> StoreResult<()>;

    async fn next_sequence(&self, table: &'static str) -> StoreResult<u64>;

    async fn count(&self, table: &'static str, filter: &Filter) -> StoreResult<u64>;

    /// Apply several updates atomically: all of them or none.
    async fn apply_batch(&self, writes: Vec<FieldWrite>) -> StoreResult<()>;
}

// =========================================================================
// Typed access
// =========================================================================

impl dyn DocumentStore + '_ {
    pub async fn insert_record<R: Record>(&self, record: &R) -> StoreResult<()> {
        let doc = serde_json::to_value(record)?;
        self.create(R::TABLE, record.uid(), record.base().id, doc)
            .await
    }

    pub async fn fetch_record<R: Record>(&self, uid: &str) -> StoreResult<Option<R>> {
        match self.find_by_id(R::TABLE, uid).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn find_record<R: Record>(&self, filter: &Filter) -> StoreResult<Option<R>> {
        match self.find_one_by(R::TABLE, filter).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn find_records<R: Record>(&self, filter: &Filter) -> StoreResult<Vec<R>> {
        self.find_many_by(R::TABLE, filter)
            .await?
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(StoreError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_containment_document() {
        let filter = Filter::eq("scene", "s1")
            .and_contains("members", "u1")
            .and_contains("members", "u2");

        assert_eq!(
            filter.to_containment(),
            json!({"scene": "s1", "members": ["u1", "u2"]})
        );
    }

    #[test]
    fn test_empty_filter_is_empty_object() {
        assert_eq!(Filter::all().to_containment(), json!({}));
        assert!(Filter::all().matches(&json!({"anything": 1})));
    }

    #[test]
    fn test_matches_in_memory() {
        let doc = json!({"scene": "s1", "members": ["u1", "u2"], "type": 3});

        assert!(Filter::eq("scene", "s1").matches(&doc));
        assert!(Filter::eq("type", 3).matches(&doc));
        assert!(Filter::contains("members", "u2").matches(&doc));
        assert!(!Filter::contains("members", "u9").matches(&doc));
        assert!(!Filter::eq("missing", "x").matches(&doc));
        assert!(!Filter::contains("scene", "s1").matches(&doc));
    }

    #[test]
    fn test_fields_touched() {
        let fields = Fields::new().set("name", "Hall").touched("alice");
        let map = fields.as_map();
        assert_eq!(map["name"], "Hall");
        assert_eq!(map["operator"], "alice");
        assert!(map["updatedAt"].as_str().unwrap().ends_with('Z'));
    }
}
