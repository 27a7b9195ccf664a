//! Database connection management.

use crate::repository::Repository;
use crate::schema;
use proteka_common::config::DatabaseConfig;
use proteka_common::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Main database handle. Cheap to clone; wraps the connection pool.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to PostgreSQL with a bounded pool.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    /// Create all tables and indexes if they don't exist. Idempotent.
    pub async fn initialize(&self) -> Result<()> {
        schema::init_schema(&self.pool).await
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn repository(&self) -> Repository {
        Repository::new(self.pool.clone())
    }
}
