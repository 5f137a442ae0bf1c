//! Database layer for the newsroom
//!
//! Provides:
//! - SeaORM entity models
//! - The article store interface with SeaORM and in-memory backends
//! - Repository for users, categories, and comments
//! - Connection pool management and schema bootstrap

pub mod memory;
pub mod models;
mod repository;
pub mod store;

pub use memory::MemoryArticleStore;
pub use repository::{Repository, UserChanges};
pub use store::{ArticleStore, SeaOrmArticleStore};

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use std::time::Duration;
use tracing::info;

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    conn: DatabaseConnection,
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to database...");

        let mut opts = ConnectOptions::new(&config.url);
        opts.max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .sqlx_logging(true);

        let conn = Database::connect(opts)
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to connect: {}", e),
            })?;

        info!("Database connection established");

        Ok(Self { conn })
    }

    /// A pool with no backing connection; every query fails with a database error
    pub fn disconnected() -> Self {
        Self {
            conn: DatabaseConnection::Disconnected,
        }
    }

    /// Get the connection for reads
    pub fn read(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Get the connection for writes
    pub fn write(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Ping failed: {}", e),
            })?;

        Ok(())
    }

    /// Create any missing tables from the entity definitions
    pub async fn ensure_schema(&self) -> Result<()> {
        use models::{ArticleEntity, CategoryEntity, CommentEntity, UserEntity};

        self.create_table(UserEntity).await?;
        self.create_table(CategoryEntity).await?;
        self.create_table(ArticleEntity).await?;
        self.create_table(CommentEntity).await?;

        info!("Database schema verified");
        Ok(())
    }

    async fn create_table<E: EntityTrait>(&self, entity: E) -> Result<()> {
        let backend = self.conn.get_database_backend();
        let schema = Schema::new(backend);
        let mut stmt = schema.create_table_from_entity(entity);
        stmt.if_not_exists();

        self.conn.execute(backend.build(&stmt)).await?;
        Ok(())
    }
}
