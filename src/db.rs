use crate::config::Config;
use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::str::FromStr;
use std::time::Duration;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Opens the pool and brings the schema up to date.
pub async fn init_db(config: &Config) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.database_url)
        .with_context(|| format!("Invalid DATABASE_URL: {}", config.database_url))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    let filename = options.clone().get_filename().to_path_buf();
    if let Some(parent) = filename.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory {}", parent.display()))?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(config.db_max_connections.max(1))
        .connect_with(options)
        .await
        .context("Failed to connect to database")?;

    MIGRATOR
        .run(&pool)
        .await
        .context("Failed to apply database migrations")?;

    tracing::info!("Database ready, migrations applied");

    Ok(pool)
}

/// Liveness probe for the persistence layer.
pub async fn ping(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
