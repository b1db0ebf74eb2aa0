//! Author database operations

use sqlx::SqlitePool;

use super::parse_timestamp;
use crate::error::Result;
use crate::models::Author;

#[derive(Debug, sqlx::FromRow)]
struct AuthorRow {
    id: String,
    login: String,
    avatar_url: String,
    html_url: String,
    account_type: String,
    fetched_at: String,
}

impl AuthorRow {
    fn into_author(self) -> Result<Author> {
        Ok(Author {
            fetched_at: parse_timestamp("fetched_at", &self.fetched_at)?,
            id: self.id,
            login: self.login,
            avatar_url: self.avatar_url,
            html_url: self.html_url,
            account_type: self.account_type,
        })
    }
}

/// Author repository
pub struct AuthorRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AuthorRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get an author by id
    pub async fn get(&self, id: &str) -> Result<Option<Author>> {
        let row = sqlx::query_as::<_, AuthorRow>(
            r#"
            SELECT id, login, avatar_url, html_url, account_type, fetched_at
            FROM authors
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(AuthorRow::into_author).transpose()
    }

    /// Insert an author, or replace every field of the existing record
    pub async fn upsert(&self, author: &Author) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO authors (id, login, avatar_url, html_url, account_type, fetched_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                login = excluded.login,
                avatar_url = excluded.avatar_url,
                html_url = excluded.html_url,
                account_type = excluded.account_type,
                fetched_at = excluded.fetched_at
            "#,
        )
        .bind(&author.id)
        .bind(&author.login)
        .bind(&author.avatar_url)
        .bind(&author.html_url)
        .bind(&author.account_type)
        .bind(author.fetched_at.to_rfc3339())
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Count stored authors
    pub async fn count(&self) -> Result<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM authors")
            .fetch_one(self.pool)
            .await?;

        Ok(result.0)
    }
}
