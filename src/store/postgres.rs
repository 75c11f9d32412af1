//! Postgres/pgvector export target for text-chunk embeddings.
//!
//! Schema (bootstrapped by [`ChunkStore::ensure_schema`]):
//!
//! ```sql
//! CREATE TABLE <table> (
//!     filename  TEXT   NOT NULL,
//!     location  BIGINT NOT NULL,
//!     text      TEXT   NOT NULL,
//!     embedding vector(<dim>) NOT NULL,
//!     PRIMARY KEY (filename, location)
//! );
//! ```
//!
//! The table name is interpolated into SQL, so it is validated as a plain
//! identifier first — connection strings are trusted, table names are not.

use crate::error::MultidexError;
use crate::store::{ChunkHit, ChunkRecord};
use pgvector::Vector;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::{debug, info};

fn export_err(e: impl std::fmt::Display) -> MultidexError {
    MultidexError::ExportFailed {
        target: "postgres".into(),
        detail: e.to_string(),
    }
}

fn query_err(e: impl std::fmt::Display) -> MultidexError {
    MultidexError::QueryFailed {
        target: "postgres".into(),
        detail: e.to_string(),
    }
}

/// Lowercase identifier, starting with a letter or underscore. Rejects
/// anything that would need quoting (and with it, injection via the
/// interpolated table name).
fn validate_table_name(name: &str) -> Result<(), MultidexError> {
    let mut chars = name.chars();
    let valid_first = chars
        .next()
        .map(|c| c.is_ascii_lowercase() || c == '_')
        .unwrap_or(false);
    let valid_rest = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid_first && valid_rest {
        Ok(())
    } else {
        Err(MultidexError::InvalidConfig(format!(
            "'{name}' is not a valid table name (use lowercase letters, digits, underscores)"
        )))
    }
}

/// Connection-pooled store for one chunk table.
pub struct ChunkStore {
    pool: PgPool,
    table: String,
}

impl ChunkStore {
    /// Connect a pool of up to `max_connections` to the database.
    pub async fn connect(
        database_url: &str,
        table: &str,
        max_connections: u32,
    ) -> Result<Self, MultidexError> {
        validate_table_name(table)?;
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(export_err)?;
        info!("connected to postgres, table '{table}'");
        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }

    /// Close the pool. Call on shutdown so in-flight queries drain cleanly.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Create the extension, table, and cosine index if missing.
    pub async fn ensure_schema(&self, dim: usize) -> Result<(), MultidexError> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await
            .map_err(export_err)?;
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {t} (\
             filename TEXT NOT NULL, \
             location BIGINT NOT NULL, \
             text TEXT NOT NULL, \
             embedding vector({dim}) NOT NULL, \
             PRIMARY KEY (filename, location))",
            t = self.table
        ))
        .execute(&self.pool)
        .await
        .map_err(export_err)?;
        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS {t}_embedding_idx \
             ON {t} USING hnsw (embedding vector_cosine_ops)",
            t = self.table
        ))
        .execute(&self.pool)
        .await
        .map_err(export_err)?;
        Ok(())
    }

    /// Replace every row belonging to `filename` with `records`, atomically.
    pub async fn replace_document(
        &self,
        filename: &str,
        records: &[ChunkRecord],
    ) -> Result<(), MultidexError> {
        let mut tx = self.pool.begin().await.map_err(export_err)?;
        sqlx::query(&format!("DELETE FROM {t} WHERE filename = $1", t = self.table))
            .bind(filename)
            .execute(&mut *tx)
            .await
            .map_err(export_err)?;
        for record in records {
            sqlx::query(&format!(
                "INSERT INTO {t} (filename, location, text, embedding) \
                 VALUES ($1, $2, $3, $4)",
                t = self.table
            ))
            .bind(&record.filename)
            .bind(record.location as i64)
            .bind(&record.text)
            .bind(Vector::from(record.embedding.clone()))
            .execute(&mut *tx)
            .await
            .map_err(export_err)?;
        }
        tx.commit().await.map_err(export_err)?;
        debug!("replaced {} rows for '{filename}'", records.len());
        Ok(())
    }

    /// Rank chunks by cosine distance to `embedding`; score is
    /// `1 - distance`, higher is better.
    pub async fn search(
        &self,
        embedding: Vec<f32>,
        limit: usize,
    ) -> Result<Vec<ChunkHit>, MultidexError> {
        let rows = sqlx::query(&format!(
            "SELECT filename, text, embedding <=> $1 AS distance \
             FROM {t} ORDER BY distance LIMIT $2",
            t = self.table
        ))
        .bind(Vector::from(embedding))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(query_err)?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let distance: f64 = row.get("distance");
                ChunkHit {
                    filename: row.get("filename"),
                    text: row.get("text"),
                    score: 1.0 - distance,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_identifiers() {
        assert!(validate_table_name("doc_chunks").is_ok());
        assert!(validate_table_name("_staging2").is_ok());
    }

    #[test]
    fn rejects_questionable_names() {
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("2fast").is_err());
        assert!(validate_table_name("Doc").is_err());
        assert!(validate_table_name("chunks; DROP TABLE users").is_err());
        assert!(validate_table_name("white space").is_err());
    }
}
