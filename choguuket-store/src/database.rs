use choguuket_core::{StoreError, StoreResult};
use futures_util::future::BoxFuture;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, Pool, Postgres};
use std::time::Duration;
use tracing::{info, warn};

use crate::app_config::DatabaseConfig;

/// Maps a driver error onto the store taxonomy.
pub fn backend(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolTimedOut => StoreError::Backend("timed out acquiring a connection".into()),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => StoreError::Corrupt(err.to_string()),
        other => StoreError::Backend(other.to_string()),
    }
}

#[derive(Clone)]
pub struct Database {
    pub pool: Pool<Postgres>,
    statement_timeout: Duration,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect(config.url.expose())
            .await?;

        Ok(Self::from_pool(pool, config.statement_timeout()))
    }

    pub fn from_pool(pool: Pool<Postgres>, statement_timeout: Duration) -> Self {
        Self { pool, statement_timeout }
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    /// Runs `work` inside one transaction.
    ///
    /// Commits when `work` returns `Ok`, rolls back when it returns `Err`, and hands the
    /// result back unchanged. The whole unit, commit included, is bounded by the configured
    /// statement timeout; a unit that times out is dropped mid-flight and its transaction is
    /// rolled back by the driver.
    pub async fn transact<T, F>(&self, work: F) -> StoreResult<T>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, StoreResult<T>> + Send,
    {
        let unit = async {
            let mut tx = self.pool.begin().await.map_err(backend)?;
            match work(&mut *tx).await {
                Ok(value) => {
                    tx.commit().await.map_err(backend)?;
                    Ok(value)
                }
                Err(err) => {
                    if let Err(rollback) = tx.rollback().await {
                        warn!("Rollback failed after {}: {}", err, rollback);
                    }
                    Err(err)
                }
            }
        };

        tokio::time::timeout(self.statement_timeout, unit)
            .await
            .map_err(|_| StoreError::Timeout(self.statement_timeout))?
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
