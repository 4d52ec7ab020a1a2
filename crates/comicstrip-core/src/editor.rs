// ABOUTME: Editor state for building a comic: an ordered page list with a cursor.
// ABOUTME: Handles insert/remove, caption editing, image replacement, clamped navigation, and save hand-off.

use thiserror::Error;
use ulid::Ulid;

use crate::image::PageImage;
use crate::model::{Comic, ComicId, PageId};
use crate::sync::PageDraft;

/// Errors returned by editor operations. None of them change editor state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditorError {
    #[error("please add both an image and a caption")]
    MissingCaption,

    #[error("caption cannot be empty")]
    EmptyCaption,

    #[error("there is no current page")]
    NoCurrentPage,

    #[error("caption is not being edited")]
    NotEditing,

    #[error("please create at least one page before saving")]
    NothingToSave,
}

/// A page held by the editor. `id` is present once the page has been persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorPage {
    /// Local handle, stable for the lifetime of the editor.
    pub key: Ulid,
    pub id: Option<PageId>,
    pub image: PageImage,
    pub caption: String,
}

impl EditorPage {
    fn new(image: PageImage, caption: String) -> Self {
        Self {
            key: Ulid::new(),
            id: None,
            image,
            caption,
        }
    }
}

/// In-memory comic editor.
#[derive(Debug, Clone, Default)]
pub struct Editor {
    comic_id: Option<ComicId>,
    title: String,
    pages: Vec<EditorPage>,
    cursor: usize,
    caption_edit: Option<String>,
}

impl Editor {
    /// Blank editor for a new comic.
    pub fn new() -> Self {
        Self::default()
    }

    /// Editor bound to an existing comic (edit mode), cursor on the first page.
    pub fn from_comic(comic: &Comic) -> Self {
        let mut editor = Self::new();
        editor.load(comic);
        editor
    }

    pub fn comic_id(&self) -> Option<&ComicId> {
        self.comic_id.as_ref()
    }

    pub fn is_edit_mode(&self) -> bool {
        self.comic_id.is_some()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn pages(&self) -> &[EditorPage] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.cursor
    }

    pub fn current_page(&self) -> Option<&EditorPage> {
        self.pages.get(self.cursor)
    }

    pub fn has_previous(&self) -> bool {
        self.cursor > 0
    }

    pub fn has_next(&self) -> bool {
        self.cursor + 1 < self.pages.len()
    }

    /// Insert a page right after the current one (at 0 when empty) and move
    /// the cursor onto it. Returns the new page's index.
    pub fn insert_after_current(
        &mut self,
        image: PageImage,
        caption: &str,
    ) -> Result<usize, EditorError> {
        let caption = caption.trim();
        if caption.is_empty() {
            return Err(EditorError::MissingCaption);
        }

        let index = if self.pages.is_empty() {
            0
        } else {
            self.cursor + 1
        };
        self.pages
            .insert(index, EditorPage::new(image, caption.to_string()));
        self.cursor = index;
        self.caption_edit = None;
        Ok(index)
    }

    /// Remove the current page. The cursor stays put unless it fell off the end.
    pub fn remove_current(&mut self) -> Result<EditorPage, EditorError> {
        if self.cursor >= self.pages.len() {
            return Err(EditorError::NoCurrentPage);
        }
        let removed = self.pages.remove(self.cursor);
        self.clamp_cursor();
        self.caption_edit = None;
        Ok(removed)
    }

    pub fn previous_page(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            self.caption_edit = None;
        }
    }

    pub fn next_page(&mut self) {
        if self.has_next() {
            self.cursor += 1;
            self.caption_edit = None;
        }
    }

    /// Jump to a 0-based index, clamped to the page list.
    pub fn go_to(&mut self, index: usize) {
        self.cursor = index;
        self.clamp_cursor();
        self.caption_edit = None;
    }

    pub fn is_editing_caption(&self) -> bool {
        self.caption_edit.is_some()
    }

    /// Text currently in the caption edit buffer.
    pub fn edit_text(&self) -> Option<&str> {
        self.caption_edit.as_deref()
    }

    /// Open the caption editor pre-filled with the current caption.
    pub fn begin_caption_edit(&mut self) -> Result<(), EditorError> {
        let caption = self
            .current_page()
            .map(|p| p.caption.clone())
            .ok_or(EditorError::NoCurrentPage)?;
        self.caption_edit = Some(caption);
        Ok(())
    }

    pub fn set_edit_text(&mut self, text: impl Into<String>) -> Result<(), EditorError> {
        match self.caption_edit.as_mut() {
            Some(buffer) => {
                *buffer = text.into();
                Ok(())
            }
            None => Err(EditorError::NotEditing),
        }
    }

    /// Write the edit buffer into the current page. Blank text is refused and
    /// the editor stays open.
    pub fn commit_caption_edit(&mut self) -> Result<(), EditorError> {
        let text = self
            .caption_edit
            .as_deref()
            .ok_or(EditorError::NotEditing)?
            .trim()
            .to_string();
        if text.is_empty() {
            return Err(EditorError::EmptyCaption);
        }
        let cursor = self.cursor;
        let page = self
            .pages
            .get_mut(cursor)
            .ok_or(EditorError::NoCurrentPage)?;
        page.caption = text;
        self.caption_edit = None;
        Ok(())
    }

    pub fn cancel_caption_edit(&mut self) {
        self.caption_edit = None;
    }

    pub fn replace_current_image(&mut self, image: PageImage) -> Result<(), EditorError> {
        let cursor = self.cursor;
        let page = self
            .pages
            .get_mut(cursor)
            .ok_or(EditorError::NoCurrentPage)?;
        page.image = image;
        Ok(())
    }

    /// New comics need at least one page; a bound comic may be emptied.
    pub fn check_savable(&self) -> Result<(), EditorError> {
        if self.pages.is_empty() && self.comic_id.is_none() {
            Err(EditorError::NothingToSave)
        } else {
            Ok(())
        }
    }

    /// Auto-save applies only to a bound comic with a title and pages.
    pub fn should_autosave(&self) -> bool {
        self.comic_id.is_some() && !self.title.trim().is_empty() && !self.pages.is_empty()
    }

    /// Convert the page list into the shape the persistence client expects.
    pub fn to_drafts(&self) -> Vec<PageDraft> {
        self.pages
            .iter()
            .map(|p| PageDraft {
                id: p.id.clone(),
                image: p.image.clone(),
                caption: p.caption.clone(),
            })
            .collect()
    }

    /// Take on the persisted form of the comic after a confirmed save.
    /// Pages get their stored ids and URLs; the cursor is kept where possible.
    pub fn adopt_saved(&mut self, comic: &Comic) {
        let cursor = self.cursor;
        let editing = self.caption_edit.take();
        self.load(comic);
        self.cursor = cursor;
        self.clamp_cursor();
        self.caption_edit = editing;
    }

    /// Bind to a comic that was saved but could not be reloaded. Pages keep
    /// their local form and are re-synced on the next save.
    pub fn bind(&mut self, id: ComicId) {
        self.comic_id = Some(id);
    }

    /// Drop everything and start a new comic.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn load(&mut self, comic: &Comic) {
        self.comic_id = Some(comic.id.clone());
        self.title = comic.title.clone();
        self.pages = comic
            .pages
            .iter()
            .map(|p| EditorPage {
                key: Ulid::new(),
                id: Some(p.id.clone()),
                image: PageImage::Remote(p.image_url.clone().unwrap_or_default()),
                caption: p.caption.clone(),
            })
            .collect();
        self.cursor = 0;
        self.caption_edit = None;
    }

    fn clamp_cursor(&mut self) {
        if self.pages.is_empty() {
            self.cursor = 0;
        } else if self.cursor >= self.pages.len() {
            self.cursor = self.pages.len() - 1;
        }
    }
}
