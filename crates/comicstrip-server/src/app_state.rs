// ABOUTME: Shared application state for the comicstrip HTTP server.
// ABOUTME: Holds the ComicStore, open editor drafts keyed by ULID with idle eviction, and share-link settings.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use comicstrip_core::Editor;
use comicstrip_store::ComicStore;
use tokio::sync::{Mutex, RwLock};
use ulid::Ulid;

use crate::drafts::DraftSession;

/// How long a draft may sit untouched before it is dropped.
pub const DEFAULT_DRAFT_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// An editor session plus the last time a request reached it.
pub struct OpenDraft {
    pub session: Arc<Mutex<DraftSession>>,
    last_used: Instant,
}

impl OpenDraft {
    fn new(session: DraftSession) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            last_used: Instant::now(),
        }
    }

    fn is_idle(&self, ttl: Duration) -> bool {
        self.last_used.elapsed() >= ttl
    }
}

/// Shared application state accessible by all Axum handlers.
pub struct AppState {
    pub store: ComicStore,
    /// Open editor sessions. Each session has its own lock so a save on one
    /// draft never blocks another.
    pub drafts: Arc<RwLock<HashMap<Ulid, OpenDraft>>>,
    /// Drafts idle for at least this long are evicted.
    pub draft_ttl: Duration,
    /// Prefix for share links, without a trailing slash.
    pub public_base_url: String,
    pub autosave: bool,
    /// Directory served at /blobs when the local backend is in use.
    pub blob_dir: Option<PathBuf>,
}

/// Type alias for the Arc-wrapped state used with Axum's State extractor.
pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(store: ComicStore, public_base_url: impl Into<String>, autosave: bool) -> Self {
        Self {
            store,
            drafts: Arc::new(RwLock::new(HashMap::new())),
            draft_ttl: DEFAULT_DRAFT_TTL,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            autosave,
            blob_dir: None,
        }
    }

    pub fn with_blob_dir(mut self, dir: PathBuf) -> Self {
        self.blob_dir = Some(dir);
        self
    }

    pub fn with_draft_ttl(mut self, ttl: Duration) -> Self {
        self.draft_ttl = ttl;
        self
    }

    /// Register a new draft around `editor` and return its id. Idle drafts
    /// are swept first so the map stays bounded by recent activity.
    pub async fn open_draft(&self, editor: Editor) -> Ulid {
        let id = Ulid::new();
        let mut drafts = self.drafts.write().await;
        let before = drafts.len();
        drafts.retain(|_, draft| !draft.is_idle(self.draft_ttl));
        let evicted = before - drafts.len();
        if evicted > 0 {
            tracing::debug!(evicted, open = drafts.len(), "evicted idle drafts");
        }
        drafts.insert(id, OpenDraft::new(DraftSession::new(editor)));
        id
    }

    /// Look up a draft and mark it as used. An idle draft is dropped and
    /// reported as missing.
    pub async fn draft(&self, id: &Ulid) -> Option<Arc<Mutex<DraftSession>>> {
        let mut drafts = self.drafts.write().await;
        let draft = drafts.get_mut(id)?;
        if draft.is_idle(self.draft_ttl) {
            drafts.remove(id);
            tracing::debug!(draft = %id, "dropped idle draft");
            return None;
        }
        draft.last_used = Instant::now();
        Some(Arc::clone(&draft.session))
    }

    /// `{public_base_url}/comic/{id}`
    pub fn view_url(&self, comic_id: &str) -> String {
        format!("{}/comic/{}", self.public_base_url, comic_id)
    }

    /// `{public_base_url}/edit?id={id}`
    pub fn edit_url(&self, comic_id: &str) -> String {
        format!("{}/edit?id={}", self.public_base_url, comic_id)
    }
}

#[cfg(test)]
mod tests {
    use comicstrip_core::IdStyle;
    use comicstrip_store::LocalBackend;
    use tempfile::TempDir;

    use super::*;

    fn state(dir: &TempDir, ttl: Duration) -> AppState {
        let backend = LocalBackend::open(dir.path(), "http://localhost:7332").unwrap();
        let store = ComicStore::new(Arc::new(backend), IdStyle::Short);
        AppState::new(store, "http://localhost:7332/", true).with_draft_ttl(ttl)
    }

    #[tokio::test]
    async fn idle_drafts_are_evicted_when_a_new_one_opens() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, Duration::ZERO);

        let first = state.open_draft(Editor::new()).await;
        for _ in 0..50 {
            state.open_draft(Editor::new()).await;
        }

        assert_eq!(state.drafts.read().await.len(), 1);
        assert!(state.draft(&first).await.is_none());
    }

    #[tokio::test]
    async fn expired_draft_lookup_removes_it() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, Duration::ZERO);
        let id = state.open_draft(Editor::new()).await;

        assert!(state.draft(&id).await.is_none());
        assert!(state.drafts.read().await.is_empty());
    }

    #[tokio::test]
    async fn active_drafts_are_kept() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, DEFAULT_DRAFT_TTL);
        let first = state.open_draft(Editor::new()).await;
        let second = state.open_draft(Editor::new()).await;

        assert!(state.draft(&first).await.is_some());
        assert!(state.draft(&second).await.is_some());
        assert_eq!(state.drafts.read().await.len(), 2);
        assert_eq!(state.view_url("abc"), "http://localhost:7332/comic/abc");
    }
}
