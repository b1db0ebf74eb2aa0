//! Upstream gist payloads
//!
//! Only the fields the server reads are modelled; everything else in the
//! GitHub response is ignored.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use thiserror::Error;

/// Gist fetch errors
#[derive(Debug, Error)]
pub enum FetchError {
    /// Non-success status, or the API could not be reached
    #[error("Gist fetch failed: {0}")]
    NotFound(String),

    /// Success status with a body that is not a gist
    #[error("Gist response malformed: {0}")]
    Malformed(String),
}

/// A gist as returned by `GET /gists/{id}`
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "GistPayload")]
pub struct RawGist {
    pub id: String,
    pub html_url: String,
    pub public: bool,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner: RawOwner,
    /// Files in the order the API lists them
    pub files: Vec<RawFile>,
}

/// Wire shape of a gist before the owner is resolved
#[derive(Deserialize)]
struct GistPayload {
    id: String,
    html_url: String,
    public: bool,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    owner: Option<RawOwner>,
    /// Legacy field name for the owner
    #[serde(default)]
    user: Option<RawOwner>,
    #[serde(deserialize_with = "files_in_order")]
    files: Vec<RawFile>,
}

impl TryFrom<GistPayload> for RawGist {
    type Error = String;

    fn try_from(payload: GistPayload) -> Result<Self, Self::Error> {
        let owner = payload
            .owner
            .or(payload.user)
            .ok_or_else(|| format!("gist {} has no owner", payload.id))?;

        Ok(RawGist {
            id: payload.id,
            html_url: payload.html_url,
            public: payload.public,
            description: payload.description,
            created_at: payload.created_at,
            updated_at: payload.updated_at,
            owner,
            files: payload.files,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawOwner {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub login: String,
    pub avatar_url: String,
    pub html_url: String,
    #[serde(rename = "type")]
    pub account_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFile {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub content: String,
}

impl RawGist {
    /// Parse a response body. A gist without an owner is malformed.
    pub fn from_slice(body: &[u8]) -> Result<Self, FetchError> {
        serde_json::from_slice(body).map_err(|e| FetchError::Malformed(e.to_string()))
    }
}

/// GitHub sends numeric account ids; keep them as strings like every other key.
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Number(u64),
        Text(String),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Number(n) => n.to_string(),
        Id::Text(s) => s,
    })
}

fn files_in_order<'de, D>(deserializer: D) -> Result<Vec<RawFile>, D::Error>
where
    D: Deserializer<'de>,
{
    struct FilesVisitor;

    impl<'de> Visitor<'de> for FilesVisitor {
        type Value = Vec<RawFile>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a map of gist files keyed by filename")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut files = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((name, mut file)) = map.next_entry::<String, RawFile>()? {
                if file.filename.is_empty() {
                    file.filename = name;
                }
                files.push(file);
            }
            Ok(files)
        }
    }

    deserializer.deserialize_map(FilesVisitor)
}
