//! GitHub API client
//!
//! Every call carries the OAuth application's client id and secret as query
//! parameters.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::provider::{GistSource, MarkdownService};
use super::types::{FetchError, RawGist};
use crate::config::GitHubConfig;
use crate::render::RenderError;

/// Markdown render request body
#[derive(Serialize)]
struct MarkdownRequest<'a> {
    mode: &'static str,
    text: &'a str,
}

/// Client for the gists and markdown endpoints
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    base_url: String,
    client_id: String,
    client_secret: String,
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig) -> reqwest::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("gistio-server/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        })
    }

    fn auth_params(&self) -> [(&'static str, &str); 2] {
        [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ]
    }
}

#[async_trait]
impl GistSource for GitHubClient {
    async fn fetch(&self, id: &str) -> Result<RawGist, FetchError> {
        let url = format!("{}/gists/{}", self.base_url, id);

        let response = self
            .client
            .get(&url)
            .query(&self.auth_params())
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(gist_id = %id, "Fetch failed: {}", e);
                FetchError::NotFound(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(gist_id = %id, status = status.as_u16(), "Fetch failed");
            return Err(FetchError::NotFound(format!("GitHub returned {}", status)));
        }

        let body = response.bytes().await.map_err(|e| {
            tracing::warn!(gist_id = %id, "Fetch failed reading body: {}", e);
            FetchError::NotFound(e.to_string())
        })?;

        RawGist::from_slice(&body).map_err(|e| {
            tracing::error!(gist_id = %id, "Fetch failed: unable to decode response: {}", e);
            e
        })
    }
}

#[async_trait]
impl MarkdownService for GitHubClient {
    async fn render_markdown(&self, text: &str) -> Result<String, RenderError> {
        let url = format!("{}/markdown", self.base_url);

        let response = self
            .client
            .post(&url)
            .query(&self.auth_params())
            .json(&MarkdownRequest { mode: "gfm", text })
            .send()
            .await
            .map_err(|e| RenderError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::Upstream(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| RenderError::Transport(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::types::tests::sample_gist_json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GitHubClient {
        GitHubClient::new(&GitHubConfig {
            api_url: server.uri(),
            client_id: "cid".to_string(),
            client_secret: "secret".to_string(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_sends_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gists/12345"))
            .and(query_param("client_id", "cid"))
            .and(query_param("client_secret", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_gist_json()))
            .expect(1)
            .mount(&server)
            .await;

        let gist = client_for(&server).fetch("12345").await.unwrap();
        assert_eq!(gist.id, "12345");
        assert_eq!(gist.files.len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_non_success_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gists/999"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch("999").await.unwrap_err();
        assert!(matches!(err, FetchError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_fetch_garbage_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gists/1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch("1").await.unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_markdown_posts_gfm_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/markdown"))
            .and(query_param("client_id", "cid"))
            .and(body_json(serde_json::json!({"mode": "gfm", "text": "Hello *world*"})))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>Hello <em>world</em></p>\n"))
            .mount(&server)
            .await;

        let html = client_for(&server).render_markdown("Hello *world*").await.unwrap();
        assert_eq!(html, "<p>Hello <em>world</em></p>\n");
    }

    #[tokio::test]
    async fn test_markdown_failure_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/markdown"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = client_for(&server).render_markdown("x").await.unwrap_err();
        assert!(matches!(err, RenderError::Upstream(403)));
    }
}
