//! Database infrastructure using SeaORM

use sea_orm::{ConnectOptions, Database as SeaDatabase, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod entities;
pub mod migration;

/// Database wrapper for the conversion target
pub struct Database {
    conn: DatabaseConnection,
}

impl Database {
    /// Open the database at the specified path, creating it if absent
    pub async fn open_or_create(path: &Path) -> Result<Self, DbErr> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DbErr::Custom(format!("Failed to create directory: {}", e)))?;
        }

        let db_url = format!("sqlite://{}?mode=rwc", path.display());

        let mut opt = ConnectOptions::new(db_url);
        opt.max_connections(10)
            .min_connections(2)
            .connect_timeout(Duration::from_secs(8))
            .idle_timeout(Duration::from_secs(8))
            .sqlx_logging(false); // tracing carries query diagnostics instead

        let conn = SeaDatabase::connect(opt).await?;

        info!("Opened database at {:?}", path);

        Ok(Self { conn })
    }

    /// In-memory database for tests
    pub async fn memory() -> Result<Self, DbErr> {
        let conn = SeaDatabase::connect("sqlite::memory:").await?;
        Ok(Self { conn })
    }

    /// Apply ordered, idempotent schema migrations
    pub async fn migrate(&self) -> Result<(), DbErr> {
        migration::Migrator::up(&self.conn, None).await?;
        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get the database connection
    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }
}
