//! Database module for SQLite persistence
//!
//! The durable store: authors and gists, each keyed by its upstream id and
//! written with insert-or-replace semantics. The two tables are written
//! independently; there is no transaction spanning both.

mod authors;
mod gists;
mod schema;

pub use authors::*;
pub use gists::*;
pub use schema::*;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::error::{AppError, Result};

/// Create a new database connection pool
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run migrations
    initialize_schema(&pool).await?;

    Ok(pool)
}

/// Check that a connection can be acquired and used.
///
/// The pooled connection is returned to the pool when this returns, on every
/// path.
pub async fn ping(pool: &SqlitePool) -> Result<()> {
    let mut conn = pool
        .acquire()
        .await
        .map_err(|e| AppError::StoreUnavailable(e.to_string()))?;

    sqlx::query("SELECT 1")
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::StoreUnavailable(e.to_string()))?;

    Ok(())
}

fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::Internal(format!("Invalid {} timestamp {:?}: {}", column, value, e)))
}


#[cfg(test)]
mod tests {
    use super::test_support::temp_pool;
    use super::*;

    #[tokio::test]
    async fn test_ping() {
        let (_dir, pool) = temp_pool().await;
        ping(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_ping_closed_pool_is_unavailable() {
        let (_dir, pool) = temp_pool().await;
        pool.close().await;
        assert!(matches!(ping(&pool).await, Err(AppError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_schema_init_is_repeatable() {
        let (_dir, pool) = temp_pool().await;
        initialize_schema(&pool).await.unwrap();
    }
}
