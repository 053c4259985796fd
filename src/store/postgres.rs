//! Postgres document store
//!
//! Each aggregate table holds `uid`, `seq`, a JSONB `data` document and the
//! tombstone column `deleted_at`. Filters are JSONB containment.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};

use crate::aggregate::tables;

use super::{DocumentStore, FieldWrite, Fields, Filter, StoreError, StoreResult};

/// Document store backed by a Postgres pool
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run one store call under the store timeout.
    async fn timed<T, F>(&self, call: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(timeout_ms = self.timeout.as_millis() as u64, "Store call timed out");
                Err(StoreError::Timeout)
            }
        }
    }

    async fn update_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        write: &FieldWrite,
    ) -> StoreResult<()> {
        let sql = format!(
            "UPDATE {} SET data = data || $2 WHERE uid = $1 AND deleted_at IS NULL",
            table_name(write.table)?
        );
        let result = sqlx::query(&sql)
            .bind(&write.uid)
            .bind(Json(write.fields.as_map()))
            .execute(&mut **tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                table: write.table,
                uid: write.uid.clone(),
            });
        }
        Ok(())
    }
}

/// Only known tables are ever spliced into SQL.
fn table_name(table: &'static str) -> StoreResult<&'static str> {
    if tables::ALL.contains(&table) {
        Ok(table)
    } else {
        Err(StoreError::Database(sqlx::Error::Protocol(format!(
            "unknown table {table}"
        ))))
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn create(&self, table: &'static str, uid: &str, seq: u64, doc: Value) -> StoreResult<()> {
        let sql = format!(
            "INSERT INTO {} (uid, seq, data, created_at) VALUES ($1, $2, $3, NOW())",
            table_name(table)?
        );
        self.timed(async {
            sqlx::query(&sql)
                .bind(uid)
                .bind(seq as i64)
                .bind(Json(&doc))
                .execute(&self.pool)
                .await?;
            Ok(())
        })
        .await
    }

    async fn find_by_id(&self, table: &'static str, uid: &str) -> StoreResult<Option<Value>> {
        let sql = format!(
            "SELECT data FROM {} WHERE uid = $1 AND deleted_at IS NULL",
            table_name(table)?
        );
        self.timed(async {
            let row: Option<Json<Value>> = sqlx::query_scalar(&sql)
                .bind(uid)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row.map(|Json(doc)| doc))
        })
        .await
    }

    async fn find_one_by(&self, table: &'static str, filter: &Filter) -> StoreResult<Option<Value>> {
        let sql = format!(
            "SELECT data FROM {} WHERE deleted_at IS NULL AND data @> $1 ORDER BY seq LIMIT 1",
            table_name(table)?
        );
        let containment = filter.to_containment();
        self.timed(async {
            let row: Option<Json<Value>> = sqlx::query_scalar(&sql)
                .bind(Json(&containment))
                .fetch_optional(&self.pool)
                .await?;
            Ok(row.map(|Json(doc)| doc))
        })
        .await
    }

    async fn find_many_by(&self, table: &'static str, filter: &Filter) -> StoreResult<Vec<Value>> {
        let sql = format!(
            "SELECT data FROM {} WHERE deleted_at IS NULL AND data @> $1 ORDER BY seq",
            table_name(table)?
        );
        let containment = filter.to_containment();
        self.timed(async {
            let rows: Vec<Json<Value>> = sqlx::query_scalar(&sql)
                .bind(Json(&containment))
                .fetch_all(&self.pool)
                .await?;
            Ok(rows.into_iter().map(|Json(doc)| doc).collect())
        })
        .await
    }

    async fn update_fields(&self, table: &'static str, uid: &str, fields: Fields) -> StoreResult<()> {
        let write = FieldWrite::new(table, uid, fields);
        self.timed(async {
            let mut tx = self.pool.begin().await?;
            Self::update_in_tx(&mut tx, &write).await?;
            tx.commit().await?;
            Ok(())
        })
        .await
    }

    async fn tombstone(&self, table: &'static str, uid: &str, operator: &str) -> StoreResult<()> {
        let sql = format!(
            r#"
            UPDATE {}
            SET deleted_at = NOW(),
                data = data || jsonb_build_object('operator', $2::text, 'deletedAt', to_jsonb(NOW()))
            WHERE uid = $1 AND deleted_at IS NULL
            "#,
            table_name(table)?
        );
        self.timed(async {
            sqlx::query(&sql)
                .bind(uid)
                .bind(operator)
                .execute(&self.pool)
                .await?;
            Ok(())
        })
        .await
    }

    async fn append_to_array_field(
        &self,
        table: &'static str,
        uid: &str,
        field: &str,
        value: Value,
    ) -> StoreResult<()> {
        let sql = format!(
            r#"
            UPDATE {}
            SET data = jsonb_set(
                data,
                ARRAY[$2::text],
                COALESCE(data -> $2::text, '[]'::jsonb) || jsonb_build_array($3::jsonb)
            )
            WHERE uid = $1 AND deleted_at IS NULL
            "#,
            table_name(table)?
        );
        self.timed(async {
            let result = sqlx::query(&sql)
                .bind(uid)
                .bind(field)
                .bind(Json(&value))
                .execute(&self.pool)
                .await?;
            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound {
                    table,
                    uid: uid.to_string(),
                });
            }
            Ok(())
        })
        .await
    }

    async fn remove_from_array_field(
        &self,
        table: &'static str,
        uid: &str,
        field: &str,
        value: Value,
    ) -> StoreResult<()> {
        let sql = format!(
            r#"
            UPDATE {}
            SET data = jsonb_set(
                data,
                ARRAY[$2::text],
                COALESCE(
                    (SELECT jsonb_agg(e.value ORDER BY e.idx)
                     FROM jsonb_array_elements(COALESCE(data -> $2::text, '[]'::jsonb))
                          WITH ORDINALITY AS e(value, idx)
                     WHERE e.value <> $3::jsonb),
                    '[]'::jsonb
                )
            )
            WHERE uid = $1 AND deleted_at IS NULL
            "#,
            table_name(table)?
        );
        self.timed(async {
            let result = sqlx::query(&sql)
                .bind(uid)
                .bind(field)
                .bind(Json(&value))
                .execute(&self.pool)
                .await?;
            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound {
                    table,
                    uid: uid.to_string(),
                });
            }
            Ok(())
        })
        .await
    }

    async fn next_sequence(&self, table: &'static str) -> StoreResult<u64> {
        let name = table_name(table)?;
        self.timed(async {
            let value: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO sequences (name, value) VALUES ($1, 1)
                ON CONFLICT (name) DO UPDATE SET value = sequences.value + 1
                RETURNING value
                "#,
            )
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
            Ok(value as u64)
        })
        .await
    }

    async fn count(&self, table: &'static str, filter: &Filter) -> StoreResult<u64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE deleted_at IS NULL AND data @> $1",
            table_name(table)?
        );
        let containment = filter.to_containment();
        self.timed(async {
            let count: i64 = sqlx::query_scalar(&sql)
                .bind(Json(&containment))
                .fetch_one(&self.pool)
                .await?;
            Ok(count as u64)
        })
        .await
    }

    async fn apply_batch(&self, writes: Vec<FieldWrite>) -> StoreResult<()> {
        if writes.is_empty() {
            return Ok(());
        }
        self.timed(async {
            let mut tx = self.pool.begin().await?;
            for write in &writes {
                Self::update_in_tx(&mut tx, write).await?;
            }
            tx.commit().await?;
            Ok(())
        })
        .await
    }
}
