// ABOUTME: Route definitions for the comicstrip HTTP server.
// ABOUTME: Assembles the JSON API, editor and reader pages, and local blob serving into one Router.

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::app_state::SharedState;
use crate::web;

/// Largest request body accepted, sized for a handful of page images.
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Build the complete Axum router with all routes and shared state.
pub fn create_router(state: SharedState) -> Router {
    let mut router = Router::new()
        .route("/health", get(health))
        .route(
            "/api/comics",
            get(api::comics::list_comics).post(api::comics::create_comic),
        )
        .route(
            "/api/comics/{id}",
            get(api::comics::get_comic).put(api::comics::update_comic),
        )
        .route("/", get(web::editor::open_editor))
        .route("/edit", get(web::editor::open_editor))
        .route("/drafts/{draft}", get(web::editor::editor_page))
        .route("/drafts/{draft}/pages", post(web::editor::add_page))
        .route(
            "/drafts/{draft}/pages/{key}/image",
            get(web::editor::upload_preview),
        )
        .route("/drafts/{draft}/remove", post(web::editor::remove_page))
        .route("/drafts/{draft}/prev", post(web::editor::previous_page))
        .route("/drafts/{draft}/next", post(web::editor::next_page))
        .route("/drafts/{draft}/goto/{number}", post(web::editor::go_to_page))
        .route("/drafts/{draft}/caption/edit", post(web::editor::begin_caption))
        .route("/drafts/{draft}/caption/save", post(web::editor::save_caption))
        .route(
            "/drafts/{draft}/caption/cancel",
            post(web::editor::cancel_caption),
        )
        .route("/drafts/{draft}/image", post(web::editor::replace_image))
        .route("/drafts/{draft}/title", post(web::editor::set_title))
        .route("/drafts/{draft}/save", post(web::editor::save))
        .route("/drafts/{draft}/new", post(web::editor::new_comic))
        .route("/comic/{id}", get(web::reader::view_comic))
        .route("/comic/{id}/key", get(web::reader::key_nav))
        .route("/comic/{id}/click", get(web::reader::click_nav));

    if let Some(dir) = &state.blob_dir {
        router = router.nest_service("/blobs", ServeDir::new(dir));
    }

    router
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler. Returns 200 OK with a simple JSON body.
async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}
