// ABOUTME: Comic editor handlers: open a draft, then mutate it through HTMX posts.
// ABOUTME: Every post re-renders the editor panel; mutations on a bound comic trigger auto-save.

use std::sync::Arc;

use askama::Template;
use askama_derive_axum::IntoResponse as AskamaIntoResponse;
use axum::extract::{Form, Multipart, Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Redirect, Response};
use comicstrip_core::{ComicId, Editor, EditorError, EditorPage, ImageUpload, PageImage};
use serde::Deserialize;
use tokio::sync::Mutex;
use ulid::Ulid;

use crate::app_state::SharedState;
use crate::drafts::{DraftSession, Notice};
use crate::web::{error_fragment, not_found_page};

const RECENT_COMICS: usize = 10;

/// One page as the editor templates see it.
pub struct PageView {
    pub number: usize,
    pub key: String,
    pub caption: String,
    /// Where to load the image from: the stored URL, or the draft preview
    /// route for uploads that have not been saved yet.
    pub image_src: Option<String>,
    pub label: String,
    pub pending: bool,
    pub current: bool,
}

/// Everything the editor panel renders.
pub struct EditorView {
    pub draft_id: String,
    pub title: String,
    pub pages: Vec<PageView>,
    pub current_number: usize,
    pub page_count: usize,
    pub has_previous: bool,
    pub has_next: bool,
    pub editing_caption: Option<String>,
    pub comic_id: Option<String>,
    pub view_url: Option<String>,
    pub edit_url: Option<String>,
    pub info: Option<String>,
    pub error: Option<String>,
    pub autosave: bool,
}

impl EditorView {
    /// Build the view and consume the pending notice so it shows once.
    fn build(state: &SharedState, draft_id: Ulid, session: &mut DraftSession) -> Self {
        let draft = draft_id.to_string();
        let editor = &session.editor;
        let current = editor.current_index();
        let pages = editor
            .pages()
            .iter()
            .enumerate()
            .map(|(i, page)| page_view(&draft, i, page, i == current && !editor.is_empty()))
            .collect();

        let comic_id = editor.comic_id().map(|id| id.to_string());
        let (info, error) = match session.notice.take() {
            Some(Notice::Info(msg)) => (Some(msg), None),
            Some(Notice::Error(msg)) => (None, Some(msg)),
            None => (None, None),
        };

        Self {
            draft_id: draft,
            title: editor.title().to_string(),
            pages,
            current_number: if editor.is_empty() { 0 } else { current + 1 },
            page_count: editor.len(),
            has_previous: editor.has_previous(),
            has_next: editor.has_next(),
            editing_caption: editor.edit_text().map(str::to_string),
            view_url: comic_id.as_deref().map(|id| state.view_url(id)),
            edit_url: comic_id.as_deref().map(|id| state.edit_url(id)),
            comic_id,
            info,
            error,
            autosave: state.autosave,
        }
    }

    /// The page under the cursor, if any.
    pub fn current(&self) -> Option<&PageView> {
        self.pages.iter().find(|p| p.current)
    }
}

fn page_view(draft: &str, index: usize, page: &EditorPage, current: bool) -> PageView {
    let image_src = match &page.image {
        PageImage::Remote(url) if url.is_empty() => None,
        PageImage::Remote(url) => Some(url.clone()),
        PageImage::Upload(_) => Some(format!("/drafts/{}/pages/{}/image", draft, page.key)),
    };
    PageView {
        number: index + 1,
        key: page.key.to_string(),
        caption: page.caption.clone(),
        image_src,
        label: page.image.label().to_string(),
        pending: page.image.is_upload(),
        current,
    }
}

/// Summary row for the recent comics sidebar.
pub struct RecentComic {
    pub id: String,
    pub title: String,
    pub updated_at: String,
}

/// Full editor page: layout, recent comics, and the panel.
#[derive(Template, AskamaIntoResponse)]
#[template(path = "editor.html")]
pub struct EditorPageTemplate {
    pub view: EditorView,
    pub recent: Vec<RecentComic>,
}

/// Partial: the editor panel swapped in by HTMX after each post.
#[derive(Template, AskamaIntoResponse)]
#[template(path = "partials/editor.html")]
pub struct EditorPanelTemplate {
    pub view: EditorView,
}

#[derive(Debug, Deserialize)]
pub struct OpenQuery {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TitleForm {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct CaptionForm {
    pub text: String,
}

/// Fields of the add-page and replace-image forms.
#[derive(Debug, Default)]
struct PageForm {
    image: Option<ImageUpload>,
    image_url: Option<String>,
    caption: String,
}

impl PageForm {
    /// A picked file wins over a pasted URL. `None` when neither was given.
    fn take_image(&mut self) -> Result<Option<PageImage>, String> {
        if let Some(upload) = self.image.take() {
            return Ok(Some(PageImage::Upload(upload)));
        }
        match self.image_url.take() {
            Some(url) if !url.trim().is_empty() => PageImage::remote(&url)
                .map(Some)
                .map_err(|e| e.to_string()),
            _ => Ok(None),
        }
    }
}

async fn read_page_form(mut multipart: Multipart) -> Result<PageForm, String> {
    let mut form = PageForm::default();
    while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(|e| e.to_string())?;
                // Browsers send an empty part when no file was picked.
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                let upload = ImageUpload::new(file_name, content_type.as_deref(), bytes.to_vec())
                    .map_err(|e| e.to_string())?;
                form.image = Some(upload);
            }
            "image_url" => form.image_url = Some(field.text().await.map_err(|e| e.to_string())?),
            "caption" => form.caption = field.text().await.map_err(|e| e.to_string())?,
            _ => {}
        }
    }
    Ok(form)
}

async fn load_draft(
    state: &SharedState,
    raw: &str,
) -> Result<(Ulid, Arc<Mutex<DraftSession>>), Box<Response>> {
    let draft_not_found = || {
        Box::new(error_fragment(
            StatusCode::NOT_FOUND,
            "This editor session has expired. Reload the page to start again.",
        ))
    };
    let draft_id = raw.parse::<Ulid>().map_err(|_| draft_not_found())?;
    let session = state.draft(&draft_id).await.ok_or_else(draft_not_found)?;
    Ok((draft_id, session))
}

fn render_panel(state: &SharedState, draft_id: Ulid, session: &mut DraftSession) -> Response {
    EditorPanelTemplate {
        view: EditorView::build(state, draft_id, session),
    }
    .into_response()
}

fn report(session: &mut DraftSession, err: impl std::fmt::Display) {
    tracing::debug!(error = %err, "editor action rejected");
    session.notice = Some(Notice::Error(err.to_string()));
}

/// GET / and GET /edit?id= - Open a blank draft, or one loaded from a saved comic.
pub async fn open_editor(
    State(state): State<SharedState>,
    Query(query): Query<OpenQuery>,
) -> Response {
    let requested = query.id.filter(|id| !id.trim().is_empty());
    let editor = match requested {
        None => Editor::new(),
        Some(raw) => {
            let comic_id = match ComicId::parse(raw.trim()) {
                Ok(id) => id,
                Err(_) => return not_found_page("That link does not point to a comic."),
            };
            match state.store.get_comic(&comic_id).await {
                Ok(Some(comic)) => Editor::from_comic(&comic),
                Ok(None) => {
                    return not_found_page(format!("No comic with id {} exists.", comic_id));
                }
                Err(e) => {
                    tracing::error!(comic_id = %comic_id, error = %e, "failed to load comic for editing");
                    return not_found_page(format!("Failed to load comic: {}", e));
                }
            }
        }
    };

    let draft_id = state.open_draft(editor).await;
    tracing::debug!(draft_id = %draft_id, "opened editor draft");
    Redirect::to(&format!("/drafts/{}", draft_id)).into_response()
}

/// GET /drafts/{draft} - Full editor page.
pub async fn editor_page(State(state): State<SharedState>, Path(draft): Path<String>) -> Response {
    let (draft_id, session) = match load_draft(&state, &draft).await {
        Ok(found) => found,
        Err(_) => return Redirect::to("/").into_response(),
    };

    let recent = match state.store.list_comics(RECENT_COMICS).await {
        Ok(list) => list
            .into_iter()
            .map(|c| RecentComic {
                id: c.id.to_string(),
                title: c.title,
                updated_at: c.updated_at.format("%Y-%m-%d %H:%M").to_string(),
            })
            .collect(),
        Err(e) => {
            tracing::error!(error = %e, "failed to list recent comics");
            Vec::new()
        }
    };

    let mut session = session.lock().await;
    EditorPageTemplate {
        view: EditorView::build(&state, draft_id, &mut session),
        recent,
    }
    .into_response()
}

/// POST /drafts/{draft}/pages - Insert a page after the current one.
pub async fn add_page(
    State(state): State<SharedState>,
    Path(draft): Path<String>,
    multipart: Multipart,
) -> Response {
    let (draft_id, session) = match load_draft(&state, &draft).await {
        Ok(found) => found,
        Err(resp) => return *resp,
    };
    let form = read_page_form(multipart).await;

    let mut session = session.lock().await;
    let inserted = form.and_then(|mut form| {
        let image = form
            .take_image()?
            .ok_or_else(|| EditorError::MissingCaption.to_string())?;
        session
            .editor
            .insert_after_current(image, &form.caption)
            .map_err(|e| e.to_string())
    });

    match inserted {
        Ok(index) => {
            tracing::debug!(draft_id = %draft_id, page = index + 1, "page added");
            session.autosave(&state.store, state.autosave).await;
        }
        Err(e) => report(&mut session, e),
    }
    render_panel(&state, draft_id, &mut session)
}

/// POST /drafts/{draft}/remove - Remove the current page.
pub async fn remove_page(State(state): State<SharedState>, Path(draft): Path<String>) -> Response {
    let (draft_id, session) = match load_draft(&state, &draft).await {
        Ok(found) => found,
        Err(resp) => return *resp,
    };
    let mut session = session.lock().await;
    match session.editor.remove_current() {
        Ok(_) => session.autosave(&state.store, state.autosave).await,
        Err(e) => report(&mut session, e),
    }
    render_panel(&state, draft_id, &mut session)
}

/// POST /drafts/{draft}/prev
pub async fn previous_page(
    State(state): State<SharedState>,
    Path(draft): Path<String>,
) -> Response {
    let (draft_id, session) = match load_draft(&state, &draft).await {
        Ok(found) => found,
        Err(resp) => return *resp,
    };
    let mut session = session.lock().await;
    session.editor.previous_page();
    render_panel(&state, draft_id, &mut session)
}

/// POST /drafts/{draft}/next
pub async fn next_page(State(state): State<SharedState>, Path(draft): Path<String>) -> Response {
    let (draft_id, session) = match load_draft(&state, &draft).await {
        Ok(found) => found,
        Err(resp) => return *resp,
    };
    let mut session = session.lock().await;
    session.editor.next_page();
    render_panel(&state, draft_id, &mut session)
}

/// POST /drafts/{draft}/goto/{number} - Jump to a page from the thumbnail strip.
pub async fn go_to_page(
    State(state): State<SharedState>,
    Path((draft, number)): Path<(String, usize)>,
) -> Response {
    let (draft_id, session) = match load_draft(&state, &draft).await {
        Ok(found) => found,
        Err(resp) => return *resp,
    };
    let mut session = session.lock().await;
    session.editor.go_to(number.saturating_sub(1));
    render_panel(&state, draft_id, &mut session)
}

/// POST /drafts/{draft}/caption/edit - Open the caption editor on the current page.
pub async fn begin_caption(
    State(state): State<SharedState>,
    Path(draft): Path<String>,
) -> Response {
    let (draft_id, session) = match load_draft(&state, &draft).await {
        Ok(found) => found,
        Err(resp) => return *resp,
    };
    let mut session = session.lock().await;
    if let Err(e) = session.editor.begin_caption_edit() {
        report(&mut session, e);
    }
    render_panel(&state, draft_id, &mut session)
}

/// POST /drafts/{draft}/caption/save - Commit the edited caption.
pub async fn save_caption(
    State(state): State<SharedState>,
    Path(draft): Path<String>,
    Form(form): Form<CaptionForm>,
) -> Response {
    let (draft_id, session) = match load_draft(&state, &draft).await {
        Ok(found) => found,
        Err(resp) => return *resp,
    };
    let mut session = session.lock().await;
    let committed = session
        .editor
        .set_edit_text(form.text)
        .and_then(|()| session.editor.commit_caption_edit());
    match committed {
        Ok(()) => session.autosave(&state.store, state.autosave).await,
        Err(e) => report(&mut session, e),
    }
    render_panel(&state, draft_id, &mut session)
}

/// POST /drafts/{draft}/caption/cancel
pub async fn cancel_caption(
    State(state): State<SharedState>,
    Path(draft): Path<String>,
) -> Response {
    let (draft_id, session) = match load_draft(&state, &draft).await {
        Ok(found) => found,
        Err(resp) => return *resp,
    };
    let mut session = session.lock().await;
    session.editor.cancel_caption_edit();
    render_panel(&state, draft_id, &mut session)
}

/// POST /drafts/{draft}/image - Replace the current page's image.
pub async fn replace_image(
    State(state): State<SharedState>,
    Path(draft): Path<String>,
    multipart: Multipart,
) -> Response {
    let (draft_id, session) = match load_draft(&state, &draft).await {
        Ok(found) => found,
        Err(resp) => return *resp,
    };
    let form = read_page_form(multipart).await;

    let mut session = session.lock().await;
    let replaced = form.and_then(|mut form| {
        let image = form
            .take_image()?
            .ok_or_else(|| "please choose an image".to_string())?;
        session
            .editor
            .replace_current_image(image)
            .map_err(|e| e.to_string())
    });
    match replaced {
        Ok(()) => session.autosave(&state.store, state.autosave).await,
        Err(e) => report(&mut session, e),
    }
    render_panel(&state, draft_id, &mut session)
}

/// POST /drafts/{draft}/title
pub async fn set_title(
    State(state): State<SharedState>,
    Path(draft): Path<String>,
    Form(form): Form<TitleForm>,
) -> Response {
    let (draft_id, session) = match load_draft(&state, &draft).await {
        Ok(found) => found,
        Err(resp) => return *resp,
    };
    let mut session = session.lock().await;
    session.editor.set_title(form.title);
    session.autosave(&state.store, state.autosave).await;
    render_panel(&state, draft_id, &mut session)
}

/// POST /drafts/{draft}/save - Manual save: create or update.
pub async fn save(State(state): State<SharedState>, Path(draft): Path<String>) -> Response {
    let (draft_id, session) = match load_draft(&state, &draft).await {
        Ok(found) => found,
        Err(resp) => return *resp,
    };
    let mut session = session.lock().await;
    session.save_with_notice(&state.store).await;
    render_panel(&state, draft_id, &mut session)
}

/// POST /drafts/{draft}/new - Discard the draft's contents and start a new comic.
pub async fn new_comic(State(state): State<SharedState>, Path(draft): Path<String>) -> Response {
    let (draft_id, session) = match load_draft(&state, &draft).await {
        Ok(found) => found,
        Err(resp) => return *resp,
    };
    let mut session = session.lock().await;
    session.editor.reset();
    session.notice = None;
    render_panel(&state, draft_id, &mut session)
}

/// GET /drafts/{draft}/pages/{key}/image - Preview bytes of an unsaved upload.
pub async fn upload_preview(
    State(state): State<SharedState>,
    Path((draft, key)): Path<(String, String)>,
) -> Response {
    let (_, session) = match load_draft(&state, &draft).await {
        Ok(found) => found,
        Err(resp) => return *resp,
    };
    let Ok(key) = key.parse::<Ulid>() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let session = session.lock().await;
    let upload = session
        .editor
        .pages()
        .iter()
        .find(|p| p.key == key)
        .and_then(|p| match &p.image {
            PageImage::Upload(upload) => Some(upload),
            PageImage::Remote(_) => None,
        });
    match upload {
        Some(upload) => (
            [(header::CONTENT_TYPE, upload.content_type().to_string())],
            upload.bytes().to_vec(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
