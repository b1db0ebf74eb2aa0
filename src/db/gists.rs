//! Gist database operations

use sqlx::SqlitePool;

use super::parse_timestamp;
use crate::error::Result;
use crate::models::{Gist, RenderedFile};

#[derive(Debug, sqlx::FromRow)]
struct GistRow {
    id: String,
    html_url: String,
    public: bool,
    description: Option<String>,
    created_at: String,
    updated_at: String,
    author_id: String,
    author_login: String,
    files_json: String,
}

impl GistRow {
    fn into_gist(self) -> Result<Gist> {
        let files: Vec<RenderedFile> = serde_json::from_str(&self.files_json)?;

        Ok(Gist {
            created_at: parse_timestamp("created_at", &self.created_at)?,
            updated_at: parse_timestamp("updated_at", &self.updated_at)?,
            id: self.id,
            html_url: self.html_url,
            public: self.public,
            description: self.description,
            author_id: self.author_id,
            author_login: self.author_login,
            files,
        })
    }
}

/// Gist repository
pub struct GistRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> GistRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a gist by id
    pub async fn get(&self, id: &str) -> Result<Option<Gist>> {
        let row = sqlx::query_as::<_, GistRow>(
            r#"
            SELECT id, html_url, public, description, created_at, updated_at,
                   author_id, author_login, files_json
            FROM gists
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(GistRow::into_gist).transpose()
    }

    /// Insert a gist, or replace every field of the existing record
    pub async fn upsert(&self, gist: &Gist) -> Result<()> {
        let files_json = serde_json::to_string(&gist.files)?;

        sqlx::query(
            r#"
            INSERT INTO gists (
                id, html_url, public, description, created_at, updated_at,
                author_id, author_login, files_json
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                html_url = excluded.html_url,
                public = excluded.public,
                description = excluded.description,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at,
                author_id = excluded.author_id,
                author_login = excluded.author_login,
                files_json = excluded.files_json
            "#,
        )
        .bind(&gist.id)
        .bind(&gist.html_url)
        .bind(gist.public)
        .bind(&gist.description)
        .bind(gist.created_at.to_rfc3339())
        .bind(gist.updated_at.to_rfc3339())
        .bind(&gist.author_id)
        .bind(&gist.author_login)
        .bind(&files_json)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Count stored gists
    pub async fn count(&self) -> Result<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM gists")
            .fetch_one(self.pool)
            .await?;

        Ok(result.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::temp_pool;
    use chrono::{TimeZone, Utc};

    fn sample_gist() -> Gist {
        Gist {
            id: "12345".to_string(),
            html_url: "https://gist.github.com/12345".to_string(),
            public: true,
            description: None,
            created_at: Utc.with_ymd_and_hms(2013, 3, 1, 10, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2013, 3, 2, 11, 30, 0).unwrap(),
            author_id: "4242".to_string(),
            author_login: "octocat".to_string(),
            files: vec![
                RenderedFile {
                    filename: "z.md".to_string(),
                    language: Some("Markdown".to_string()),
                    raw_content: "Hello *world*".to_string(),
                    rendered_html: "<p>Hello <em>world</em></p>\n".to_string(),
                },
                RenderedFile {
                    filename: "a.txt".to_string(),
                    language: None,
                    raw_content: "plain".to_string(),
                    rendered_html: "<p>plain</p>\n".to_string(),
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let (_dir, pool) = temp_pool().await;
        let repo = GistRepository::new(&pool);

        repo.upsert(&sample_gist()).await.unwrap();
        repo.upsert(&sample_gist()).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 1);
        assert_eq!(repo.get("12345").await.unwrap(), Some(sample_gist()));
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let (_dir, pool) = temp_pool().await;
        let repo = GistRepository::new(&pool);
        repo.upsert(&sample_gist()).await.unwrap();

        let mut edited = sample_gist();
        edited.description = Some("Edited".to_string());
        edited.files.truncate(1);
        repo.upsert(&edited).await.unwrap();

        let stored = repo.get("12345").await.unwrap().unwrap();
        assert_eq!(stored, edited);
        assert_eq!(stored.files.len(), 1);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_files_keep_order() {
        let (_dir, pool) = temp_pool().await;
        let repo = GistRepository::new(&pool);
        repo.upsert(&sample_gist()).await.unwrap();

        let stored = repo.get("12345").await.unwrap().unwrap();
        let names: Vec<_> = stored.files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec!["z.md", "a.txt"]);
    }

    #[tokio::test]
    async fn test_missing_gist() {
        let (_dir, pool) = temp_pool().await;
        assert_eq!(GistRepository::new(&pool).get("nope").await.unwrap(), None);
    }
}
