use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};

use crate::error::{StoreError, StoreResult};
use crate::query::{Condition, QueryPredicate};
use crate::record::{Record, record_id};
use crate::settings::{DEFAULT_TABLE, StoreSettings};
use crate::store::{RecordStore, RecordStream};

/// Rows fetched per round trip by `stream_all`.
const STREAM_BATCH_SIZE: i64 = 500;

/// PostgreSQL-backed record store.
///
/// Each record is one JSONB document keyed by `(collection, id)`.
/// Predicates compile to JSONB path lookups with bound parameters.
#[derive(Clone)]
pub struct PostgresRecordStore {
    pool: PgPool,
    table: String,
}

impl PostgresRecordStore {
    /// Creates a store over the default `records` table.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            table: DEFAULT_TABLE.to_string(),
        }
    }

    /// Creates a store over a custom table.
    pub fn with_table(pool: PgPool, table: impl Into<String>) -> StoreResult<Self> {
        let table = table.into();
        if !is_identifier(&table) {
            return Err(StoreError::InvalidTableName(table));
        }
        Ok(Self { pool, table })
    }

    /// Opens a connection pool from settings.
    pub async fn connect(settings: &StoreSettings) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .connect(&settings.database_url)
            .await?;
        Self::with_table(pool, settings.table.clone())
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Creates the records table and its index if they do not exist.
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        let table = &self.table;
        let sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                seq BIGSERIAL NOT NULL,
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                data JSONB NOT NULL,
                inserted_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                modified_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (collection, id)
            );
            CREATE INDEX IF NOT EXISTS idx_{table}_collection_seq ON {table} (collection, seq);
            "#
        );
        sqlx::raw_sql(&sql).execute(&self.pool).await?;
        tracing::info!(table = %self.table, "record schema ready");
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && name.len() <= 63
}

fn row_to_record(row: &PgRow) -> StoreResult<Record> {
    let data: Value = row.try_get("data")?;
    Ok(serde_json::from_value(data)?)
}

fn path_segments(path: &str) -> Vec<String> {
    path.split('.').map(str::to_string).collect()
}

/// A bound parameter, kept in placeholder order.
enum Param {
    Text(String),
    Path(Vec<String>),
    Json(Value),
    Int(i64),
}

/// Builds the `WHERE`/`LIMIT`/`OFFSET` tail of a find query.
///
/// `$1` is always the collection.
fn compile_predicate(predicate: &QueryPredicate, params: &mut Vec<Param>) -> String {
    let mut sql = String::new();

    for condition in &predicate.conditions {
        params.push(Param::Path(path_segments(condition.path())));
        let path = params.len();

        match condition {
            Condition::Eq { value, .. } => {
                params.push(Param::Json(value.clone()));
                sql.push_str(&format!(" AND (data #> ${path}) = ${}", params.len()));
            }
            Condition::NotEq { value, .. } => {
                params.push(Param::Json(value.clone()));
                sql.push_str(&format!(
                    " AND (data #> ${path}) IS DISTINCT FROM ${}",
                    params.len()
                ));
            }
            Condition::OneOf { values, .. } => {
                params.push(Param::Json(Value::Array(values.clone())));
                sql.push_str(&format!(
                    " AND (data #> ${path}) IN (SELECT jsonb_array_elements(${}))",
                    params.len()
                ));
            }
            Condition::IsNull { .. } => {
                sql.push_str(&format!(
                    " AND COALESCE(data #> ${path}, 'null'::jsonb) = 'null'::jsonb"
                ));
            }
        }
    }

    sql.push_str(" ORDER BY seq ASC");

    if let Some(limit) = predicate.limit {
        params.push(Param::Int(i64::try_from(limit).unwrap_or(i64::MAX)));
        sql.push_str(&format!(" LIMIT ${}", params.len()));
    }
    if let Some(offset) = predicate.offset {
        params.push(Param::Int(i64::try_from(offset).unwrap_or(i64::MAX)));
        sql.push_str(&format!(" OFFSET ${}", params.len()));
    }

    sql
}

/// Keyset cursor over one collection, used by `stream_all`.
struct Cursor {
    pool: PgPool,
    sql: String,
    collection: String,
    after: i64,
}

impl Cursor {
    async fn next_batch(&mut self) -> StoreResult<Vec<Record>> {
        let rows = sqlx::query(&self.sql)
            .bind(&self.collection)
            .bind(self.after)
            .bind(STREAM_BATCH_SIZE)
            .fetch_all(&self.pool)
            .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            self.after = row.try_get("seq")?;
            records.push(row_to_record(&row)?);
        }
        Ok(records)
    }
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    async fn find(
        &self,
        collection: &str,
        predicate: &QueryPredicate,
        relations: &[String],
    ) -> StoreResult<Vec<Record>> {
        tracing::trace!(collection, ?relations, "find");

        let mut params = vec![Param::Text(collection.to_string())];
        let tail = compile_predicate(predicate, &mut params);
        let sql = format!("SELECT data FROM {} WHERE collection = $1{tail}", self.table);

        let mut query = sqlx::query(&sql);
        for param in params {
            query = match param {
                Param::Text(text) => query.bind(text),
                Param::Path(path) => query.bind(path),
                Param::Json(value) => query.bind(value),
                Param::Int(n) => query.bind(n),
            };
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_record).collect()
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: &str,
        relations: &[String],
    ) -> StoreResult<Option<Record>> {
        tracing::trace!(collection, id, ?relations, "find_by_id");

        let sql = format!(
            "SELECT data FROM {} WHERE collection = $1 AND id = $2",
            self.table
        );
        let row: Option<PgRow> = sqlx::query(&sql)
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn upsert(&self, collection: &str, record: Record) -> StoreResult<()> {
        let id = record_id(&record)
            .ok_or_else(|| StoreError::MissingId {
                collection: collection.to_string(),
            })?
            .to_string();

        let sql = format!(
            r#"
            INSERT INTO {} (collection, id, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id) DO UPDATE SET
                data = EXCLUDED.data,
                modified_at = NOW()
            "#,
            self.table
        );
        sqlx::query(&sql)
            .bind(collection)
            .bind(id)
            .bind(Value::Object(record))
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        let sql = format!(
            "DELETE FROM {} WHERE collection = $1 AND id = $2",
            self.table
        );
        let result = sqlx::query(&sql)
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn stream_all(&self, collection: &str) -> StoreResult<RecordStream> {
        use futures_util::{StreamExt, stream};

        let cursor = Cursor {
            pool: self.pool.clone(),
            sql: format!(
                "SELECT seq, data FROM {} WHERE collection = $1 AND seq > $2 ORDER BY seq ASC LIMIT $3",
                self.table
            ),
            collection: collection.to_string(),
            after: 0,
        };

        let batches = stream::unfold(Some(cursor), |state| async move {
            let mut cursor = state?;
            match cursor.next_batch().await {
                Ok(records) if records.is_empty() => None,
                Ok(records) => Some((
                    records.into_iter().map(Ok).collect::<Vec<StoreResult<Record>>>(),
                    Some(cursor),
                )),
                Err(e) => Some((vec![Err(e)], None)),
            }
        });

        Ok(Box::pin(batches.flat_map(stream::iter)))
    }
}
