//! Durable document store on SQLite.
//!
//! Every collection of every project shares one table:
//!
//! ```sql
//! documents(project TEXT, collection TEXT, key TEXT, value TEXT,
//!           PRIMARY KEY (project, collection, key))
//! ```
//!
//! `value` holds the JSON document. Filters, range, ordering and cursors are
//! pushed into SQL through `json_extract`, whose type ordering
//! (NULL < numbers < text) matches the in-memory evaluator.

use async_trait::async_trait;
use crs_application::ports::storage_backend::{
    Direction, Document, Query, StorageBackend, StorageError, validate_key,
};
use serde_json::Value;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS documents (
    project TEXT NOT NULL,
    collection TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (project, collection, key)
);";

/// A scalar query parameter in SQLite's terms.
#[derive(Debug, Clone, PartialEq)]
enum Bind {
    Null,
    Int(i64),
    Real(f64),
    Text(String),
}

impl Bind {
    fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Bind::Null,
            Value::Bool(b) => Bind::Int(i64::from(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Bind::Int(i),
                None => Bind::Real(n.as_f64().unwrap_or(0.0)),
            },
            Value::String(s) => Bind::Text(s.clone()),
            // rejected by Query::validate
            other => Bind::Text(other.to_string()),
        }
    }
}

fn unavailable(err: sqlx::Error) -> StorageError {
    StorageError::Unavailable(err.to_string())
}

fn extract(field: &str) -> String {
    format!("json_extract(value, '$.{field}')")
}

/// SQL text plus its positional parameters.
#[derive(Debug, Default)]
struct Statement {
    sql: String,
    binds: Vec<Bind>,
}

impl Statement {
    fn push(&mut self, clause: &str) {
        self.sql.push_str(clause);
    }

    fn bind(&mut self, value: Bind) {
        self.binds.push(value);
    }

    fn arguments(self) -> (String, Vec<Bind>) {
        (self.sql, self.binds)
    }
}

/// Translate a validated query into SQL.
fn build_select(project: &str, collection: &str, query: &Query) -> Statement {
    let mut stmt = Statement::default();
    stmt.push("SELECT key, value FROM documents WHERE project = ? AND collection = ?");
    stmt.bind(Bind::Text(project.to_string()));
    stmt.bind(Bind::Text(collection.to_string()));

    for (field, expected) in &query.filters {
        let column = extract(field);
        match Bind::from_json(expected) {
            Bind::Null => stmt.push(&format!(" AND {column} IS NULL")),
            bind => {
                stmt.push(&format!(" AND {column} = ?"));
                stmt.bind(bind);
            }
        }
    }

    if let Some(range) = &query.range {
        let column = extract(&range.field);
        stmt.push(&format!(" AND {column} IS NOT NULL"));
        if let Some(from) = &range.from {
            stmt.push(&format!(" AND {column} >= ?"));
            stmt.bind(Bind::from_json(from));
        }
        if let Some(to) = &range.to {
            stmt.push(&format!(" AND {column} <= ?"));
            stmt.bind(Bind::from_json(to));
        }
    }

    let sort = extract(&query.order_by.field);
    if let Some(cursor) = &query.start_after {
        let key = Bind::Text(cursor.key.clone());
        match (Bind::from_json(&cursor.value), query.order_by.direction) {
            (Bind::Null, Direction::Ascending) => {
                stmt.push(&format!(
                    " AND ({sort} IS NOT NULL OR key > ?)"
                ));
                stmt.bind(key);
            }
            (Bind::Null, Direction::Descending) => {
                stmt.push(&format!(" AND {sort} IS NULL AND key < ?"));
                stmt.bind(key);
            }
            (value, Direction::Ascending) => {
                stmt.push(&format!(
                    " AND ({sort} > ? OR ({sort} = ? AND key > ?))"
                ));
                stmt.bind(value.clone());
                stmt.bind(value);
                stmt.bind(key);
            }
            (value, Direction::Descending) => {
                stmt.push(&format!(
                    " AND ({sort} < ? OR {sort} IS NULL OR ({sort} = ? AND key < ?))"
                ));
                stmt.bind(value.clone());
                stmt.bind(value);
                stmt.bind(key);
            }
        }
    }

    let dir = match query.order_by.direction {
        Direction::Ascending => "ASC",
        Direction::Descending => "DESC",
    };
    stmt.push(&format!(" ORDER BY {sort} {dir}, key {dir}"));

    if let Some(limit) = query.limit {
        stmt.push(" LIMIT ?");
        stmt.bind(Bind::Int(i64::try_from(limit).unwrap_or(i64::MAX)));
    }
    stmt
}

fn bind_all<'q>(
    mut q: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    binds: Vec<Bind>,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    for bind in binds {
        q = match bind {
            Bind::Null => q.bind(None::<String>),
            Bind::Int(i) => q.bind(i),
            Bind::Real(f) => q.bind(f),
            Bind::Text(s) => q.bind(s),
        };
    }
    q
}

/// SQLite-backed implementation of [`StorageBackend`].
pub struct DocumentStoreBackend {
    pool: Pool<Sqlite>,
    project: String,
}

impl DocumentStoreBackend {
    /// Open (creating if needed) the database at `url`.
    ///
    /// `url` is either a `sqlite:` connection string or a plain file path.
    pub async fn connect(
        url: &str,
        project: impl Into<String>,
        max_connections: u32,
    ) -> Result<Self, StorageError> {
        let options = if url.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(url).map_err(unavailable)?
        } else {
            SqliteConnectOptions::new().filename(url)
        };
        let options = options.create_if_missing(true);

        // Each connection to an in-memory database is a separate database
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let mut pool_options = SqlitePoolOptions::new();
        pool_options = if in_memory {
            pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            pool_options.max_connections(max_connections.max(1))
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(unavailable)?;
        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .map_err(unavailable)?;

        let project = project.into();
        info!(url, project = %project, "Connected document store");
        Ok(Self { pool, project })
    }

    /// Open a database file, creating parent directories.
    pub async fn open_file(path: &Path, project: impl Into<String>) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        }
        Self::connect(&path.to_string_lossy(), project, 5).await
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    fn decode(key: &str, raw: &str) -> Result<Value, StorageError> {
        serde_json::from_str(raw).map_err(|e| StorageError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl StorageBackend for DocumentStoreBackend {
    fn name(&self) -> &str {
        "document_store"
    }

    async fn put(&self, collection: &str, key: &str, value: Value) -> Result<(), StorageError> {
        validate_key(collection)?;
        validate_key(key)?;
        let raw = serde_json::to_string(&value).map_err(|e| StorageError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        sqlx::query(
            "INSERT INTO documents (project, collection, key, value)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(project, collection, key) DO UPDATE SET
               value = excluded.value",
        )
        .bind(&self.project)
        .bind(collection)
        .bind(key)
        .bind(raw)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;
        Ok(())
    }

    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StorageError> {
        validate_key(collection)?;
        validate_key(key)?;
        let row = sqlx::query(
            "SELECT value FROM documents WHERE project = ?1 AND collection = ?2 AND key = ?3",
        )
        .bind(&self.project)
        .bind(collection)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        match row {
            Some(row) => {
                let raw: String = row.try_get("value").map_err(unavailable)?;
                Self::decode(key, &raw).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<(), StorageError> {
        validate_key(collection)?;
        validate_key(key)?;
        sqlx::query("DELETE FROM documents WHERE project = ?1 AND collection = ?2 AND key = ?3")
            .bind(&self.project)
            .bind(collection)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StorageError> {
        validate_key(collection)?;
        query.validate()?;
        let (sql, binds) = build_select(&self.project, collection, query).arguments();
        let rows = bind_all(sqlx::query(&sql), binds)
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable)?;

        let mut documents = Vec::with_capacity(rows.len());
        for row in rows {
            let key: String = row.try_get("key").map_err(unavailable)?;
            let raw: String = row.try_get("value").map_err(unavailable)?;
            let value = Self::decode(&key, &raw)?;
            documents.push(Document { key, value });
        }
        debug!(collection, matched = documents.len(), "Document store query");
        Ok(documents)
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.pool.close().await;
        info!("Closed document store");
        Ok(())
    }
}
