// ABOUTME: Read-only comic viewer: one page at a time with buttons, click zones, and arrow keys.
// ABOUTME: Key and click navigation resolve through ReaderCursor and redirect to the resulting page.

use askama::Template;
use askama_derive_axum::IntoResponse as AskamaIntoResponse;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use comicstrip_core::{ComicId, NavKey, ReaderCursor};
use serde::Deserialize;

use crate::app_state::SharedState;
use crate::web::not_found_page;

#[derive(Template, AskamaIntoResponse)]
#[template(path = "reader.html")]
pub struct ReaderTemplate {
    pub comic_id: String,
    pub title: String,
    pub page_number: usize,
    pub page_count: usize,
    pub image_url: Option<String>,
    pub caption: String,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
    pub share_url: String,
    pub edit_url: String,
}

#[derive(Debug, Deserialize)]
pub struct ReaderQuery {
    pub page: Option<usize>,
}

/// Query sent by the reader script. `of` is the page count the client saw.
#[derive(Debug, Deserialize)]
pub struct KeyNavQuery {
    #[serde(default)]
    pub key: String,
    pub page: usize,
    pub of: usize,
}

#[derive(Debug, Deserialize)]
pub struct ClickNavQuery {
    pub x: f64,
    pub width: f64,
    pub page: usize,
    pub of: usize,
}

fn page_url(comic_id: &str, page_number: usize) -> String {
    format!("/comic/{}?page={}", comic_id, page_number)
}

/// GET /comic/{id}?page=n - Render one page of a saved comic.
pub async fn view_comic(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(query): Query<ReaderQuery>,
) -> Response {
    let comic_id = match ComicId::parse(&id) {
        Ok(id) => id,
        Err(_) => return not_found_page("That link does not point to a comic."),
    };

    let comic = match state.store.get_comic(&comic_id).await {
        Ok(Some(comic)) if !comic.pages.is_empty() => comic,
        Ok(Some(_)) => return not_found_page("This comic has no pages yet."),
        Ok(None) => {
            return not_found_page(format!("No comic with id {} exists.", comic_id));
        }
        Err(e) => {
            tracing::error!(comic_id = %comic_id, error = %e, "failed to load comic for reader");
            return not_found_page("The comic could not be loaded. Please try again later.");
        }
    };

    let cursor = ReaderCursor::at_page(comic.pages.len(), query.page.unwrap_or(1));
    let page = &comic.pages[cursor.index()];
    let id = comic.id.as_str();

    ReaderTemplate {
        comic_id: id.to_string(),
        title: comic.title.clone(),
        page_number: cursor.page_number(),
        page_count: cursor.len(),
        image_url: page.image_url.clone(),
        caption: page.caption.clone(),
        prev_url: cursor
            .has_previous()
            .then(|| page_url(id, cursor.page_number() - 1)),
        next_url: cursor
            .has_next()
            .then(|| page_url(id, cursor.page_number() + 1)),
        share_url: state.view_url(id),
        edit_url: state.edit_url(id),
    }
    .into_response()
}

fn nav_redirect(id: &str, page: usize, of: usize, key: Option<NavKey>) -> Response {
    let comic_id = match ComicId::parse(id) {
        Ok(id) => id,
        Err(_) => return not_found_page("That link does not point to a comic."),
    };
    let mut cursor = ReaderCursor::at_page(of, page);
    if let Some(key) = key {
        cursor.apply(key);
    }
    Redirect::to(&page_url(comic_id.as_str(), cursor.page_number())).into_response()
}

/// GET /comic/{id}/key?key=&page=&of= - Arrow-key navigation.
pub async fn key_nav(Path(id): Path<String>, Query(query): Query<KeyNavQuery>) -> Response {
    nav_redirect(&id, query.page, query.of, NavKey::from_key(&query.key))
}

/// GET /comic/{id}/click?x=&width=&page=&of= - Click-zone navigation.
pub async fn click_nav(Path(id): Path<String>, Query(query): Query<ClickNavQuery>) -> Response {
    nav_redirect(
        &id,
        query.page,
        query.of,
        NavKey::from_click(query.x, query.width),
    )
}
