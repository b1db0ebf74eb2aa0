//! Stored gist records
//!
//! `Author` and `Gist` are the canonical records kept in the durable store.
//! A `Gist` embeds its rendered files inline, in upstream order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The GitHub account that created a gist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub login: String,
    pub avatar_url: String,
    /// Profile page (`html_url` upstream)
    pub html_url: String,
    /// `User` or `Organization`
    pub account_type: String,
    pub fetched_at: DateTime<Utc>,
}

/// A gist with every renderable file converted to HTML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gist {
    pub id: String,
    pub html_url: String,
    pub public: bool,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_id: String,
    pub author_login: String,
    pub files: Vec<RenderedFile>,
}

/// One source file of a gist plus its HTML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedFile {
    pub filename: String,
    pub language: Option<String>,
    pub raw_content: String,
    pub rendered_html: String,
}

impl Gist {
    /// Title used for pages: the description, or a fallback built from the id
    pub fn title(&self) -> String {
        match self.description.as_deref().map(str::trim) {
            Some(description) if !description.is_empty() => description.to_string(),
            _ => format!("Gist {}", self.id),
        }
    }
}
