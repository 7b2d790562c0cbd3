// PostgreSQL pool shared by the repositories

use crate::config::DatabaseConfig;
use crate::errors::DatabaseError;
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument};

/// Cheaply cloneable handle to the eventboard database
#[derive(Debug, Clone)]
pub struct DbPool {
    pool: PgPool,
}

impl DbPool {
    /// Connect eagerly, failing fast when the database is unreachable
    ///
    /// # Errors
    /// Returns `DatabaseError::ConnectionFailed` when no connection can be opened
    #[instrument(skip(config), fields(max_connections = config.max_connections))]
    pub async fn new(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let pool = Self::options(config)
            .connect(&config.url)
            .await
            .map_err(|e| {
                error!(error = %e, "Could not connect to PostgreSQL");
                DatabaseError::ConnectionFailed(e.to_string())
            })?;

        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Connected to PostgreSQL"
        );
        Ok(Self { pool })
    }

    /// Build the pool without opening a connection
    ///
    /// Router tests use it for requests that are rejected before any query runs.
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        Self::options(config)
            .connect_lazy(&config.url)
            .map(|pool| Self { pool })
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))
    }

    fn options(config: &DatabaseConfig) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply pending schema migrations
    #[instrument(skip(self, migrator))]
    pub async fn migrate(&self, migrator: &Migrator) -> Result<(), DatabaseError> {
        migrator.run(&self.pool).await.map_err(|e| {
            error!(error = %e, "Schema migration failed");
            DatabaseError::from(e)
        })?;
        info!(migrations = migrator.iter().count(), "Schema is up to date");
        Ok(())
    }

    /// Round-trip a trivial query
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        let started = Instant::now();
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Database ping failed");
                DatabaseError::HealthCheckFailed(e.to_string())
            })?;

        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "Database ping ok");
        Ok(())
    }

    /// Wait for checked-out connections and close the pool
    #[instrument(skip(self))]
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database pool closed");
    }
}
