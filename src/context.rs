//! Wiring of the shared runtime pieces used by CLI commands.

use std::sync::Arc;

use anyhow::Result;
use sqlx::SqlitePool;

use crate::activities::ActivitiesFeed;
use crate::config::Config;
use crate::db;
use crate::engine::SyncEngine;
use crate::harvest::ScheduleFeed;
use crate::jobs::JobRunner;
use crate::migrate;
use crate::rate;
use crate::remote::HttpDocumentClient;
use crate::store::SqliteMetadataStore;

pub struct AppContext {
    pub config: Arc<Config>,
    pub pool: SqlitePool,
    pub remote: Arc<HttpDocumentClient>,
    pub engine: Arc<SyncEngine>,
}

impl AppContext {
    /// Open the database (creating the schema if missing) and build the
    /// remote client and sync engine from `config`.
    pub async fn open(config: Config) -> Result<Self> {
        let pool = db::connect(&config).await?;
        migrate::apply(&pool).await?;

        let remote = Arc::new(HttpDocumentClient::from_config(&config)?);
        let store = Arc::new(SqliteMetadataStore::new(pool.clone()));
        let gate: Arc<dyn rate::RateGate> = Arc::from(rate::from_delay_ms(config.sync.delay_ms));
        let engine = Arc::new(SyncEngine::new(store, remote.clone(), gate));

        Ok(Self {
            config: Arc::new(config),
            pool,
            remote,
            engine,
        })
    }

    pub fn runner(&self) -> JobRunner {
        JobRunner::new(
            self.config.clone(),
            self.engine.clone(),
            Arc::new(ScheduleFeed::from_config(&self.config.upstream.schedule)),
            Arc::new(ActivitiesFeed::from_config(&self.config.upstream.activities)),
        )
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
