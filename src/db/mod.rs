use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

use crate::config::DbConfig;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

/// Opens the pool without touching the schema.
pub async fn connect(config: &DbConfig) -> anyhow::Result<SqlitePool> {
	// Grant and hierarchy tables rely on ON DELETE CASCADE
	let options = SqliteConnectOptions::from_str(&config.database_url)
		.context("invalid DATABASE_URL")?
		.create_if_missing(true)
		.foreign_keys(true);

	SqlitePoolOptions::new()
		.max_connections(config.max_connections)
		.min_connections(1)
		.acquire_timeout(config.acquire_timeout)
		.connect_with(options)
		.await
		.context("failed to connect to database")
}

/// Opens the pool and applies pending migrations.
pub async fn init(config: &DbConfig) -> anyhow::Result<SqlitePool> {
	let pool = connect(config).await?;

	MIGRATOR
		.run(&pool)
		.await
		.context("failed to run migrations")?;

	tracing::info!(url = %config.database_url, "database ready");

	Ok(pool)
}
