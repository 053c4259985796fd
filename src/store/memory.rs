//! In-memory document store
//!
//! Honors the same contract as the Postgres store: tombstones, insertion
//! order, array operations, sequences and atomic batches. Used by tests and
//! local runs without a database.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use super::{DocumentStore, FieldWrite, Fields, Filter, StoreError, StoreResult};

#[derive(Debug, Clone)]
struct Row {
    uid: String,
    data: Value,
    deleted: bool,
}

#[derive(Debug, Default)]
struct Tables {
    rows: HashMap<&'static str, Vec<Row>>,
    sequences: HashMap<&'static str, u64>,
}

impl Tables {
    fn live(&self, table: &str) -> impl Iterator<Item = &Row> {
        self.rows
            .get(table)
            .into_iter()
            .flatten()
            .filter(|row| !row.deleted)
    }

    fn live_mut(&mut self, table: &'static str, uid: &str) -> StoreResult<&mut Row> {
        self.rows
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|row| !row.deleted && row.uid == uid))
            .ok_or_else(|| StoreError::NotFound {
                table,
                uid: uid.to_string(),
            })
    }

    fn merge(&mut self, table: &'static str, uid: &str, fields: &Fields) -> StoreResult<()> {
        let row = self.live_mut(table, uid)?;
        if let Value::Object(doc) = &mut row.data {
            for (key, value) in fields.as_map() {
                doc.insert(key.clone(), value.clone());
            }
        }
        Ok(())
    }
}

/// Document store kept in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of live documents in `table`.
    pub fn live_count(&self, table: &str) -> usize {
        self.read().map(|t| t.live(table).count()).unwrap_or(0)
    }

    fn check(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable);
        }
        Ok(())
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, Tables>> {
        self.check()?;
        self.tables.read().map_err(|_| StoreError::Unavailable)
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, Tables>> {
        self.check()?;
        self.tables.write().map_err(|_| StoreError::Unavailable)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create(&self, table: &'static str, uid: &str, _seq: u64, doc: Value) -> StoreResult<()> {
        let mut tables = self.write()?;
        let rows = tables.rows.entry(table).or_default();
        if rows.iter().any(|row| row.uid == uid) {
            return Err(StoreError::Database(sqlx::Error::Protocol(format!(
                "duplicate key {uid} in {table}"
            ))));
        }
        rows.push(Row {
            uid: uid.to_string(),
            data: doc,
            deleted: false,
        });
        Ok(())
    }

    async fn find_by_id(&self, table: &'static str, uid: &str) -> StoreResult<Option<Value>> {
        let tables = self.read()?;
        let found = tables.live(table).find(|row| row.uid == uid);
        Ok(found.map(|row| row.data.clone()))
    }

    async fn find_one_by(&self, table: &'static str, filter: &Filter) -> StoreResult<Option<Value>> {
        let tables = self.read()?;
        let found = tables.live(table).find(|row| filter.matches(&row.data));
        Ok(found.map(|row| row.data.clone()))
    }

    async fn find_many_by(&self, table: &'static str, filter: &Filter) -> StoreResult<Vec<Value>> {
        let tables = self.read()?;
        Ok(tables
            .live(table)
            .filter(|row| filter.matches(&row.data))
            .map(|row| row.data.clone())
            .collect())
    }

    async fn update_fields(&self, table: &'static str, uid: &str, fields: Fields) -> StoreResult<()> {
        self.write()?.merge(table, uid, &fields)
    }

    async fn tombstone(&self, table: &'static str, uid: &str, operator: &str) -> StoreResult<()> {
        let mut tables = self.write()?;
        if let Ok(row) = tables.live_mut(table, uid) {
            row.deleted = true;
            if let Value::Object(doc) = &mut row.data {
                doc.insert("operator".into(), operator.into());
                doc.insert(
                    "deletedAt".into(),
                    Utc::now()
                        .to_rfc3339_opts(SecondsFormat::AutoSi, true)
                        .into(),
                );
            }
        }
        Ok(())
    }

    async fn append_to_array_field(
        &self,
        table: &'static str,
        uid: &str,
        field: &str,
        value: Value,
    ) -> StoreResult<()> {
        let mut tables = self.write()?;
        let row = tables.live_mut(table, uid)?;
        if let Value::Object(doc) = &mut row.data {
            let entry = doc
                .entry(field.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            match entry {
                Value::Array(items) => items.push(value),
                other => *other = Value::Array(vec![value]),
            }
        }
        Ok(())
    }

    async fn remove_from_array_field(
        &self,
        table: &'static str,
        uid: &str,
        field: &str,
        value: Value,
    ) -> StoreResult<()> {
        let mut tables = self.write()?;
        let row = tables.live_mut(table, uid)?;
        if let Some(Value::Array(items)) = row.data.get_mut(field) {
            items.retain(|item| *item != value);
        }
        Ok(())
    }

    async fn next_sequence(&self, table: &'static str) -> StoreResult<u64> {
        let mut tables = self.write()?;
        let counter = tables.sequences.entry(table).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn count(&self, table: &'static str, filter: &Filter) -> StoreResult<u64> {
        let tables = self.read()?;
        Ok(tables.live(table).filter(|row| filter.matches(&row.data)).count() as u64)
    }

    async fn apply_batch(&self, writes: Vec<FieldWrite>) -> StoreResult<()> {
        let mut tables = self.write()?;

        // Validate every target first so a failing write leaves nothing applied.
        for write in &writes {
            tables.live_mut(write.table, &write.uid)?;
        }
        for write in &writes {
            tables.merge(write.table, &write.uid, &write.fields)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_tombstoned_rows_are_invisible() {
        let store = MemoryStore::new();
        store.create("scenes", "a", 1, json!({"uid": "a"})).await.unwrap();
        store.tombstone("scenes", "a", "op").await.unwrap();

        assert!(store.find_by_id("scenes", "a").await.unwrap().is_none());
        assert_eq!(store.count("scenes", &Filter::all()).await.unwrap(), 0);
        // tombstone is a no-op the second time
        store.tombstone("scenes", "a", "op").await.unwrap();
    }

    #[tokio::test]
    async fn test_array_ops_keep_order() {
        let store = MemoryStore::new();
        store
            .create("scenes", "a", 1, json!({"uid": "a", "members": []}))
            .await
            .unwrap();
        for id in ["x", "y", "z"] {
            store
                .append_to_array_field("scenes", "a", "members", json!(id))
                .await
                .unwrap();
        }
        store
            .remove_from_array_field("scenes", "a", "members", json!("y"))
            .await
            .unwrap();

        let doc = store.find_by_id("scenes", "a").await.unwrap().unwrap();
        assert_eq!(doc["members"], json!(["x", "z"]));
    }

    #[tokio::test]
    async fn test_batch_is_all_or_nothing() {
        let store = MemoryStore::new();
        store.create("rooms", "a", 1, json!({"q": 1})).await.unwrap();

        let result = store
            .apply_batch(vec![
                FieldWrite::new("rooms", "a", Fields::new().set("q", 2)),
                FieldWrite::new("rooms", "missing", Fields::new().set("q", 3)),
            ])
            .await;

        assert!(matches!(result, Err(StoreError::NotFound { .. })));
        let doc = store.find_by_id("rooms", "a").await.unwrap().unwrap();
        assert_eq!(doc["q"], 1);
    }

    #[tokio::test]
    async fn test_sequences_are_per_table() {
        let store = MemoryStore::new();
        assert_eq!(store.next_sequence("scenes").await.unwrap(), 1);
        assert_eq!(store.next_sequence("scenes").await.unwrap(), 2);
        assert_eq!(store.next_sequence("devices").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_switch() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.next_sequence("scenes").await,
            Err(StoreError::Unavailable)
        ));
        store.set_unavailable(false);
        assert!(store.next_sequence("scenes").await.is_ok());
    }
}
