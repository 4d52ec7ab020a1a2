// ABOUTME: Comic CRUD API handlers: list recent comics, create, read, and update in place.
// ABOUTME: Pages carry either an image URL or a base64 image payload that is uploaded on save.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use comicstrip_core::{ComicId, ComicSummary, ImageUpload, PageDraft, PageId, PageImage};
use comicstrip_store::StoreError;
use serde::{Deserialize, Serialize};

use crate::app_state::SharedState;

const DEFAULT_LIST_LIMIT: usize = 20;
const MAX_LIST_LIMIT: usize = 100;

/// Inline image data for a page that has not been uploaded yet.
#[derive(Debug, Deserialize)]
pub struct ImagePayload {
    pub file_name: String,
    #[serde(default)]
    pub content_type: Option<String>,
    pub data_base64: String,
}

/// One page in a create or update request.
#[derive(Debug, Deserialize)]
pub struct PagePayload {
    /// Existing page id, for updates that keep a page's identity.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub image: Option<ImagePayload>,
    #[serde(default)]
    pub caption: String,
}

/// Request body for creating or updating a comic.
#[derive(Debug, Deserialize)]
pub struct ComicPayload {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub pages: Vec<PagePayload>,
}

/// Response body after a create or update.
#[derive(Debug, Serialize)]
pub struct ComicIdResponse {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

impl PagePayload {
    /// Turn the wire shape into a draft. An inline image wins over a URL; a
    /// page with neither is kept as caption-only.
    fn into_draft(self) -> Result<PageDraft, String> {
        let image = match (self.image, self.image_url) {
            (Some(payload), _) => {
                let bytes = STANDARD
                    .decode(payload.data_base64.as_bytes())
                    .map_err(|e| format!("invalid base64 image data: {}", e))?;
                let upload = ImageUpload::new(
                    &payload.file_name,
                    payload.content_type.as_deref(),
                    bytes,
                )
                .map_err(|e| e.to_string())?;
                PageImage::Upload(upload)
            }
            (None, Some(url)) if !url.trim().is_empty() => {
                PageImage::remote(&url).map_err(|e| e.to_string())?
            }
            (None, _) => PageImage::Remote(String::new()),
        };

        let draft = PageDraft::new(image, self.caption);
        Ok(match self.id {
            Some(id) if !id.is_empty() => draft.with_id(PageId::from(id)),
            _ => draft,
        })
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": message.into() })),
    )
        .into_response()
}

fn parse_comic_id(id: &str) -> Result<ComicId, Box<Response>> {
    ComicId::parse(id)
        .map_err(|e| Box::new(error_response(StatusCode::BAD_REQUEST, e.to_string())))
}

fn into_drafts(pages: Vec<PagePayload>) -> Result<Vec<PageDraft>, Box<Response>> {
    pages
        .into_iter()
        .enumerate()
        .map(|(i, page)| {
            page.into_draft().map_err(|e| {
                Box::new(error_response(
                    StatusCode::BAD_REQUEST,
                    format!("page {}: {}", i + 1, e),
                ))
            })
        })
        .collect()
}

fn store_error_response(err: StoreError) -> Response {
    match err {
        StoreError::NotFound(id) => {
            error_response(StatusCode::NOT_FOUND, format!("comic not found: {}", id))
        }
        other => {
            tracing::error!(error = %other, "comic store request failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    }
}

/// GET /api/comics - Most recently updated comics first.
pub async fn list_comics(
    State(state): State<SharedState>,
    Query(query): Query<ListQuery>,
) -> Response {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    match state.store.list_comics(limit).await {
        Ok(summaries) => Json::<Vec<ComicSummary>>(summaries).into_response(),
        Err(e) => store_error_response(e),
    }
}

/// POST /api/comics - Create a comic, uploading any inline images.
pub async fn create_comic(
    State(state): State<SharedState>,
    Json(req): Json<ComicPayload>,
) -> Response {
    let drafts = match into_drafts(req.pages) {
        Ok(d) => d,
        Err(resp) => return *resp,
    };

    match state.store.save_comic(&drafts, &req.title).await {
        Ok(id) => {
            tracing::info!(comic_id = %id, pages = drafts.len(), "comic created via api");
            (
                StatusCode::CREATED,
                Json(ComicIdResponse { id: id.to_string() }),
            )
                .into_response()
        }
        Err(e) => store_error_response(e),
    }
}

/// GET /api/comics/{id} - Comic with pages ordered by position.
pub async fn get_comic(State(state): State<SharedState>, Path(id): Path<String>) -> Response {
    let comic_id = match parse_comic_id(&id) {
        Ok(id) => id,
        Err(resp) => return *resp,
    };

    match state.store.get_comic(&comic_id).await {
        Ok(Some(comic)) => Json(comic).into_response(),
        Ok(None) => store_error_response(StoreError::NotFound(comic_id)),
        Err(e) => store_error_response(e),
    }
}

/// PUT /api/comics/{id} - Replace title and page set, keeping page ids that are sent back.
pub async fn update_comic(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<ComicPayload>,
) -> Response {
    let comic_id = match parse_comic_id(&id) {
        Ok(id) => id,
        Err(resp) => return *resp,
    };
    let drafts = match into_drafts(req.pages) {
        Ok(d) => d,
        Err(resp) => return *resp,
    };

    match state.store.update_comic(&comic_id, &drafts, &req.title).await {
        Ok(()) => {
            tracing::info!(comic_id = %comic_id, pages = drafts.len(), "comic updated via api");
            Json(ComicIdResponse {
                id: comic_id.to_string(),
            })
            .into_response()
        }
        Err(e) => store_error_response(e),
    }
}
