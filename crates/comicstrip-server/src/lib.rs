// ABOUTME: HTTP server for comicstrip, providing the JSON API and the HTMX editor and reader.
// ABOUTME: Uses Axum with shared state holding the ComicStore and open editor drafts.

pub mod api;
pub mod app_state;
pub mod config;
pub mod drafts;
pub mod routes;
pub mod web;

pub use app_state::{AppState, SharedState};
pub use config::{BackendKind, ComicConfig, ConfigError};
pub use routes::create_router;
