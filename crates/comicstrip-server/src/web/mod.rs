// ABOUTME: Web UI route handlers serving HTML via Askama templates and HTMX.
// ABOUTME: The editor works on server-held drafts; the reader pages through a saved comic.

pub mod editor;
pub mod reader;

use askama::Template;
use askama_derive_axum::IntoResponse as AskamaIntoResponse;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

/// Full-page "Comic Not Found" view, used by both the reader and the editor loader.
#[derive(Template, AskamaIntoResponse)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub message: String,
}

/// Render the not-found page with a 404 status.
pub(crate) fn not_found_page(message: impl Into<String>) -> Response {
    let page = NotFoundTemplate {
        message: message.into(),
    };
    match page.render() {
        Ok(html) => (StatusCode::NOT_FOUND, Html(html)).into_response(),
        Err(e) => {
            tracing::error!("failed to render not-found page: {}", e);
            error_fragment(StatusCode::NOT_FOUND, "Comic not found.")
        }
    }
}

/// Inline error paragraph, the same shape HTMX targets swap in.
#[derive(Template)]
#[template(path = "partials/error.html")]
struct ErrorFragmentTemplate<'a> {
    message: &'a str,
}

/// Render an `error-msg` fragment with `status`.
pub(crate) fn error_fragment(status: StatusCode, message: &str) -> Response {
    match (ErrorFragmentTemplate { message }).render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!("failed to render error fragment: {}", e);
            status.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn error_fragment_escapes_markup() {
        let resp = error_fragment(StatusCode::BAD_REQUEST, "<b>\"x\" & 'y'</b>");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.starts_with("<p class=\"error-msg\">"), "{}", html);
        assert!(!html.contains("<b>"), "{}", html);
        assert!(!html.contains("\"x\""), "{}", html);
        assert!(html.trim_end().ends_with("</p>"), "{}", html);
    }

    #[test]
    fn not_found_page_has_404_status() {
        let resp = not_found_page("No comic with id abc.");
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
