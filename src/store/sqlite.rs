//! SQLite-backed [`MetadataStore`].
//!
//! Rows live in the `artifact_metadata` table created by
//! [`crate::migrate`]. Timestamps are stored as Unix milliseconds.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use super::MetadataStore;
use crate::error::SyncResult;
use crate::models::ArtifactMetadata;
use crate::signature::Signature;

pub struct SqliteMetadataStore {
    pool: SqlitePool,
}

impl SqliteMetadataStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_metadata(row: &sqlx::sqlite::SqliteRow) -> ArtifactMetadata {
    let millis: i64 = row.get("last_updated");
    ArtifactMetadata {
        filename: row.get("filename"),
        client_id: row.get("client_id"),
        remote_document_id: row.get("file_id"),
        signature: Signature::from_stored(row.get::<String, _>("signature")),
        last_updated: DateTime::from_timestamp_millis(millis).unwrap_or_default(),
    }
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn get(&self, filename: &str, client_id: &str) -> SyncResult<Option<ArtifactMetadata>> {
        let row = sqlx::query(
            "SELECT client_id, filename, file_id, signature, last_updated \
             FROM artifact_metadata WHERE client_id = ? AND filename = ?",
        )
        .bind(client_id)
        .bind(filename)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_metadata))
    }

    async fn put(
        &self,
        filename: &str,
        remote_document_id: &str,
        signature: &Signature,
        timestamp: DateTime<Utc>,
        client_id: &str,
    ) -> SyncResult<()> {
        sqlx::query(
            r#"
            INSERT INTO artifact_metadata (client_id, filename, file_id, signature, last_updated)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(client_id, filename) DO UPDATE SET
                file_id = excluded.file_id,
                signature = excluded.signature,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(client_id)
        .bind(filename)
        .bind(remote_document_id)
        .bind(signature.as_str())
        .bind(timestamp.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self, client_id: Option<&str>) -> SyncResult<Vec<ArtifactMetadata>> {
        let rows = sqlx::query(
            "SELECT client_id, filename, file_id, signature, last_updated \
             FROM artifact_metadata \
             WHERE (?1 IS NULL OR client_id = ?1) \
             ORDER BY client_id, filename",
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_metadata).collect())
    }
}
