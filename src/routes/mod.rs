//! Route modules for the Gistio server

pub mod gists;
pub mod health;

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::{Html, Response},
    routing::get,
    Router,
};

use crate::db;
use crate::error::Result;
use crate::html::render_home_page;
use crate::state::AppState;

/// Build the application router
pub fn router(state: AppState) -> Router {
    let gists = gists::router().route_layer(middleware::from_fn_with_state(
        state.clone(),
        require_database,
    ));

    Router::new()
        .route("/", get(home))
        .route("/health", get(health::health_check))
        .route("/api/v1/health", get(health::health_check))
        .merge(gists)
        .with_state(state)
}

async fn home() -> Html<String> {
    Html(render_home_page())
}

/// Reject the request with 503 unless the database answers
async fn require_database(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    db::ping(state.db()).await?;
    Ok(next.run(request).await)
}
