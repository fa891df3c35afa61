use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create the metadata schema on an open pool. Safe to run repeatedly.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS artifact_metadata (
            client_id TEXT NOT NULL,
            filename TEXT NOT NULL,
            file_id TEXT NOT NULL,
            signature TEXT NOT NULL,
            last_updated INTEGER NOT NULL,
            PRIMARY KEY (client_id, filename)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_artifact_metadata_updated ON artifact_metadata(last_updated DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
