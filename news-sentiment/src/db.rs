use crate::config::DatabaseConfig;
use crate::types::{PipelineError, Result};
use sqlx::postgres::PgConnection;
use sqlx::Connection;
use tracing::{debug, warn};

/// Hands out one connection per stage invocation. There is no pool: a stage
/// opens a connection, uses it and gives it back through [`Database::release`].
/// A connection dropped on an error path is torn down by sqlx, which also
/// rolls back any open transaction.
#[derive(Debug, Clone)]
pub struct Database {
    config: DatabaseConfig,
}

impl Database {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }

    pub async fn connect(&self) -> Result<PgConnection> {
        debug!(
            "Connecting to postgres at {}:{}/{}",
            self.config.host, self.config.port, self.config.name
        );
        PgConnection::connect_with(&self.config.connect_options())
            .await
            .map_err(PipelineError::Connection)
    }

    pub async fn release(&self, conn: PgConnection) {
        if let Err(e) = conn.close().await {
            warn!("Failed to close database connection cleanly: {}", e);
        }
    }
}
