//! # agrimap-db
//!
//! PostgreSQL persistence for confirmed zone records and filesystem
//! storage for uploaded map images.
//!
//! The pipeline core only sees the collaborator traits from
//! `agrimap-core`; this crate provides the production implementations.

pub mod images;
pub mod pool;
pub mod zones;

pub use images::FilesystemImageStore;
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use zones::PgZoneRepository;

use std::sync::Arc;

use sqlx::PgPool;

use agrimap_core::Result;

/// Embedded schema migrations, applied at startup.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Database handle bundling the connection pool and repositories.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
    pub zones: Arc<PgZoneRepository>,
}

impl Database {
    /// Connect with default pool configuration.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = create_pool(database_url).await?;
        Ok(Self::from_pool(pool))
    }

    /// Build a database handle from an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        let zones = Arc::new(PgZoneRepository::new(pool.clone()));
        Self { pool, zones }
    }

    /// Apply pending schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| agrimap_core::Error::Storage(format!("Migration failed: {}", e)))?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
