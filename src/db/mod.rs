pub mod enums;
pub mod models;
pub mod paginator;
pub mod services;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{error, info};

pub type DbPool = SqlitePool;

pub async fn connect(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
}

pub async fn init_db(pool: &DbPool) -> Result<(), sqlx::Error> {
    info!("Running database migrations...");
    let migrations = include_str!("../../migrations/20250801000000_create_initial_tables.sql");
    sqlx::raw_sql(migrations).execute(pool).await.map_err(|e| {
        error!("Failed to execute migrations: {}", e);
        e
    })?;
    info!("Database migrations completed successfully.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_creates_a_missing_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daybook.db");
        let url = format!("sqlite://{}", path.display());

        let pool = connect(&url).await.unwrap();
        init_db(&pool).await.unwrap();
        assert!(path.exists());

        // Migrations are idempotent, so a restart can run them again.
        init_db(&pool).await.unwrap();
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::Utc;

    pub async fn test_pool() -> DbPool {
        // A single connection keeps the in-memory database alive and shared.
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();
        init_db(&pool).await.unwrap();
        pool
    }

    pub async fn seed_user(pool: &DbPool, username: &str) -> i64 {
        let now = Utc::now();
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO users (username, password_hash, role, created_at, updated_at)
             VALUES (?, 'x', 'user', ?, ?) RETURNING id",
        )
        .bind(username)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .unwrap();
        id
    }
}
