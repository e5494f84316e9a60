use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Errors from DatabaseManager
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Connection setup and schema management for the drinks database
pub struct DatabaseManager;

impl DatabaseManager {
    const CREATE_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS drinks (
            id SERIAL PRIMARY KEY,
            title VARCHAR(80) NOT NULL UNIQUE,
            recipe TEXT NOT NULL
        )
    "#;

    /// Open a pool against `DATABASE_URL` and make sure the table exists
    pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        let url = config
            .url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;
        let parsed = url::Url::parse(url).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        if !matches!(parsed.scheme(), "postgres" | "postgresql") {
            return Err(DatabaseError::InvalidDatabaseUrl);
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        sqlx::query(Self::CREATE_TABLE).execute(&pool).await?;

        info!(
            "Connected to database {}{}",
            parsed.host_str().unwrap_or("localhost"),
            parsed.path()
        );
        Ok(pool)
    }

    /// Drop and recreate the drinks table, optionally seeding the sample drink.
    /// Destroys every stored record.
    pub async fn reset(pool: &PgPool, seed: bool) -> Result<(), DatabaseError> {
        let mut tx = pool.begin().await?;
        sqlx::query("DROP TABLE IF EXISTS drinks").execute(&mut *tx).await?;
        sqlx::query(Self::CREATE_TABLE).execute(&mut *tx).await?;
        if seed {
            sqlx::query("INSERT INTO drinks (title, recipe) VALUES ($1, $2)")
                .bind("water")
                .bind(r#"[{"name": "water", "color": "blue", "parts": 1}]"#)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        info!("Reset drinks table (seeded: {})", seed);
        Ok(())
    }
}
