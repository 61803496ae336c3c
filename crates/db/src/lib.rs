//! Database layer for liaison.
//!
//! Holds the relationship group tables, their migrations and the
//! [`repositories::RelationshipRepository`] that every mutation goes through.

pub mod entities;
pub mod migrations;
pub mod repositories;
pub mod test_utils;

use liaison_common::config::DatabaseConfig;
use liaison_common::{AppError, AppResult, Config};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;
use tracing::log::LevelFilter;
use tracing::{debug, info};

/// Pool options for the configured database.
#[must_use]
pub fn connect_options(config: &DatabaseConfig) -> ConnectOptions {
    let mut opt = ConnectOptions::new(&config.url);

    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .sqlx_logging(true)
        .sqlx_logging_level(LevelFilter::Debug);

    opt
}

/// Initialize database connection.
pub async fn init(config: &Config) -> AppResult<DatabaseConnection> {
    Database::connect(connect_options(&config.database))
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

/// Apply pending migrations, returning how many ran.
pub async fn migrate(db: &DatabaseConnection) -> AppResult<usize> {
    let pending = migrations::Migrator::get_pending_migrations(db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .len();

    if pending == 0 {
        debug!("Relationship schema is up to date");
        return Ok(0);
    }

    migrations::Migrator::up(db, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    info!(applied = pending, "Applied relationship migrations");
    Ok(pending)
}
