//! Liaison schema migration entry point.
//!
//! Loads configuration, connects to the database and applies pending
//! migrations for the relationship tables.

use liaison_common::{AppError, Config};
use liaison_common::config::LoggingConfig;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));

    let (json, text) = if logging.json {
        (Some(tracing_subscriber::fmt::layer().json()), None)
    } else {
        (None, Some(tracing_subscriber::fmt::layer()))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Configuration comes first so the log filter can be read from it
    let config = Config::load()?;
    init_tracing(&config.logging);

    info!("Starting liaison migrations...");

    let db = liaison_db::init(&config).await.inspect_err(AppError::log)?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );

    info!("Running database migrations...");
    let applied = liaison_db::migrate(&db).await.inspect_err(AppError::log)?;
    info!(applied, "Migrations completed");

    db.close().await?;
    Ok(())
}
