// ABOUTME: Server-side editor sessions ("drafts"), one per open editor tab.
// ABOUTME: Runs create-or-update saves and auto-saves, leaving the editor untouched when a save fails.

use comicstrip_core::{ComicId, Editor, EditorError};
use comicstrip_store::{ComicStore, StoreError};
use thiserror::Error;

/// Why a save did not go through.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error(transparent)]
    Editor(#[from] EditorError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Banner shown above the editor after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

/// One editor session. Held behind a per-draft mutex so saves never overlap.
#[derive(Debug, Default)]
pub struct DraftSession {
    pub editor: Editor,
    pub notice: Option<Notice>,
}

impl DraftSession {
    pub fn new(editor: Editor) -> Self {
        Self {
            editor,
            notice: None,
        }
    }

    /// Create the comic if the editor is unbound, otherwise update it in place.
    /// On success the editor adopts the stored pages so later saves diff
    /// against persisted ids.
    pub async fn save(&mut self, store: &ComicStore) -> Result<ComicId, SaveError> {
        self.editor.check_savable()?;
        let drafts = self.editor.to_drafts();
        let title = self.editor.title().to_string();

        let comic_id = match self.editor.comic_id().cloned() {
            Some(id) => {
                store.update_comic(&id, &drafts, &title).await?;
                id
            }
            None => store.save_comic(&drafts, &title).await?,
        };

        match store.get_comic(&comic_id).await {
            Ok(Some(comic)) => self.editor.adopt_saved(&comic),
            Ok(None) => {
                tracing::warn!(comic_id = %comic_id, "saved comic vanished before reload");
                self.editor.bind(comic_id.clone());
            }
            Err(e) => {
                tracing::warn!(comic_id = %comic_id, error = %e, "failed to reload saved comic");
                self.editor.bind(comic_id.clone());
            }
        }
        Ok(comic_id)
    }

    /// Manual save: records the outcome as a notice.
    pub async fn save_with_notice(&mut self, store: &ComicStore) {
        let was_bound = self.editor.is_edit_mode();
        match self.save(store).await {
            Ok(id) => {
                tracing::info!(comic_id = %id, updated = was_bound, "comic saved");
                let message = if was_bound {
                    "Comic updated."
                } else {
                    "Comic saved."
                };
                self.notice = Some(Notice::Info(message.to_string()));
            }
            Err(e) => {
                tracing::error!(error = %e, "save failed");
                self.notice = Some(Notice::Error(e.to_string()));
            }
        }
    }

    /// Save after a mutation when auto-save applies. Failures only surface as
    /// a notice; the editor keeps its unsaved pages.
    pub async fn autosave(&mut self, store: &ComicStore, enabled: bool) {
        if !enabled || !self.editor.should_autosave() {
            return;
        }
        match self.save(store).await {
            Ok(id) => {
                tracing::debug!(comic_id = %id, "auto-saved");
                self.notice = Some(Notice::Info("All changes saved.".to_string()));
            }
            Err(e) => {
                tracing::warn!(error = %e, "auto-save failed");
                self.notice = Some(Notice::Error(format!("Auto-save failed: {}", e)));
            }
        }
    }
}
