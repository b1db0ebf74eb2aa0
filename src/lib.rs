//! Gistio Server
//!
//! Serves GitHub gists as typeset articles. Gists are fetched from the GitHub
//! API on first request, rendered to HTML, stored in SQLite and served as a
//! page or as JSON through a short-lived cache.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod html;
pub mod models;
pub mod pipeline;
pub mod render;
pub mod routes;
pub mod state;
pub mod upstream;
