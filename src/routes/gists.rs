//! Gist page and content routes

use axum::{
    extract::{Path, State},
    http::header,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};

use crate::cache::CACHE_TTL_SECS;
use crate::error::{AppError, Result};
use crate::html::render_gist_page;
use crate::models::{Author, Gist};
use crate::state::AppState;

/// Reported TTL when the key is not cached
const NO_TTL: i64 = -2;

/// Create the gists router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:id", get(gist_page))
        .route("/:id/content", get(gist_content))
}

/// Gist ids are unsigned integers; anything else cannot exist
fn validate_id(id: &str) -> Result<&str> {
    if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) {
        Ok(id)
    } else {
        Err(AppError::NotFound(format!("invalid gist id {:?}", id)))
    }
}

/// Run the pipeline under the request deadline
async fn resolve(state: &AppState, id: &str) -> Result<(Author, Gist)> {
    let deadline = state.config().request_timeout();
    tokio::time::timeout(deadline, state.pipeline().resolve(id))
        .await
        .map_err(|_| AppError::Timeout(deadline.as_secs()))?
}

/// Rendered HTML page for a gist
async fn gist_page(State(state): State<AppState>, Path(id): Path<String>) -> Result<Html<String>> {
    let id = validate_id(&id)?;
    let (author, gist) = resolve(&state, id).await?;
    Ok(Html(render_gist_page(&author, &gist)))
}

/// Serialized gist, read through the content cache
async fn gist_content(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    let id = validate_id(&id)?;
    let cache = state.cache();

    let (body, cache_hit) = match cache.get(id) {
        Some(body) => (body, true),
        None => {
            let (_, gist) = resolve(&state, id).await?;
            let body = serde_json::to_vec(&gist)?;
            cache.set(id, body.clone(), CACHE_TTL_SECS);
            (body, false)
        }
    };

    let ttl = cache
        .remaining_ttl(id)
        .and_then(|secs| i64::try_from(secs).ok())
        .unwrap_or(NO_TTL);
    tracing::debug!(gist_id = %id, cache_hit = cache_hit, ttl = ttl, "Serving gist content");

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::HeaderName::from_static("x-cache-hit"), cache_hit.to_string()),
            (header::HeaderName::from_static("x-expire-ttl-seconds"), ttl.to_string()),
        ],
        body,
    )
        .into_response())
}
