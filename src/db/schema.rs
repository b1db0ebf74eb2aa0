//! Database schema initialization

use sqlx::SqlitePool;

use crate::error::Result;

/// Initialize the database schema
pub async fn initialize_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(SCHEMA_SQL)
        .execute(pool)
        .await?;

    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Authors table (GitHub accounts, refreshed on every fetch)
CREATE TABLE IF NOT EXISTS authors (
    id TEXT PRIMARY KEY,
    login TEXT NOT NULL,
    avatar_url TEXT NOT NULL,
    html_url TEXT NOT NULL,
    account_type TEXT NOT NULL,
    fetched_at TEXT NOT NULL
);

-- Gists table; rendered files are embedded in order as JSON
CREATE TABLE IF NOT EXISTS gists (
    id TEXT PRIMARY KEY,
    html_url TEXT NOT NULL,
    public INTEGER NOT NULL,
    description TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    author_id TEXT NOT NULL,
    author_login TEXT NOT NULL,
    files_json TEXT NOT NULL DEFAULT '[]'
);

CREATE INDEX IF NOT EXISTS idx_gists_author_id ON gists(author_id);
"#;
