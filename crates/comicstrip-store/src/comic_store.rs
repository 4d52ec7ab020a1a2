// ABOUTME: Persistence client for comics: save, update (diff-based page sync), get, and list.
// ABOUTME: Uploads pending images, resolves public URLs, and wraps backend failures with step context.

use std::sync::Arc;

use chrono::Utc;
use comicstrip_core::model::effective_title;
use comicstrip_core::{
    Comic, ComicId, ComicSummary, IdStyle, Page, PageDraft, PageId, PageImage, WriteKind,
    plan_page_sync,
};
use futures::future::try_join_all;
use thiserror::Error;

use crate::backend::{Backend, BackendError, BlobStore, ComicRow, RowStore};

/// Errors surfaced by the persistence client. Each names the operation and
/// the step that failed, followed by the backend's message.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to save comic: {step}: {source}")]
    Save {
        step: &'static str,
        source: BackendError,
    },

    #[error("failed to update comic: {step}: {source}")]
    Update {
        step: &'static str,
        source: BackendError,
    },

    #[error("failed to get comic: {step}: {source}")]
    Get {
        step: &'static str,
        source: BackendError,
    },

    #[error("failed to list comics: {0}")]
    List(#[source] BackendError),

    #[error("comic not found: {0}")]
    NotFound(ComicId),
}

fn save_err(step: &'static str) -> impl FnOnce(BackendError) -> StoreError {
    move |source| StoreError::Save { step, source }
}

fn update_err(step: &'static str) -> impl FnOnce(BackendError) -> StoreError {
    move |source| StoreError::Update { step, source }
}

fn get_err(step: &'static str) -> impl FnOnce(BackendError) -> StoreError {
    move |source| StoreError::Get { step, source }
}

/// Client over a backend-as-a-service. Cheap to clone.
#[derive(Clone)]
pub struct ComicStore {
    backend: Arc<dyn Backend>,
    id_style: IdStyle,
}

impl ComicStore {
    pub fn new(backend: Arc<dyn Backend>, id_style: IdStyle) -> Self {
        Self { backend, id_style }
    }

    /// Create a comic: insert the comic row, upload pending images, then
    /// insert every page at positions 1..=n. Returns the new id.
    ///
    /// Nothing is rolled back. If a later step fails the comic row (and any
    /// uploaded blobs) stay behind.
    pub async fn save_comic(&self, pages: &[PageDraft], title: &str) -> Result<ComicId, StoreError> {
        let comic_id = ComicId::generate(self.id_style);
        let row = ComicRow::new(comic_id.clone(), effective_title(title));

        self.backend
            .insert_comic(&row)
            .await
            .map_err(save_err("creating comic"))?;

        let urls = self
            .resolve_images(&comic_id, pages)
            .await
            .map_err(save_err("uploading image"))?;

        let rows: Vec<Page> = pages
            .iter()
            .zip(urls)
            .enumerate()
            .map(|(index, (draft, image_url))| Page {
                id: PageId::generate(),
                comic_id: comic_id.clone(),
                page_number: (index + 1) as u32,
                image_url,
                caption: draft.caption.clone(),
            })
            .collect();

        self.backend
            .insert_pages(&rows)
            .await
            .map_err(save_err("creating pages"))?;

        tracing::info!(comic_id = %comic_id, pages = rows.len(), "saved comic");
        Ok(comic_id)
    }

    /// Bring a stored comic in line with `pages`: update the title, delete
    /// pages that were dropped, update kept pages in place and insert new
    /// ones, renumbering everything to match list order.
    pub async fn update_comic(
        &self,
        id: &ComicId,
        pages: &[PageDraft],
        title: &str,
    ) -> Result<(), StoreError> {
        let matched = self
            .backend
            .update_comic_title(id, &effective_title(title), Utc::now())
            .await
            .map_err(update_err("updating comic title"))?;
        if !matched {
            return Err(StoreError::NotFound(id.clone()));
        }

        let existing = self
            .backend
            .select_page_ids(id)
            .await
            .map_err(update_err("fetching existing pages"))?;
        let plan = plan_page_sync(&existing, pages);

        let urls = self
            .resolve_images(id, pages)
            .await
            .map_err(update_err("uploading image"))?;

        if !plan.delete.is_empty() {
            self.backend
                .delete_pages(&plan.delete)
                .await
                .map_err(update_err("deleting removed pages"))?;
        }

        let mut inserts = Vec::new();
        for write in &plan.writes {
            let draft = &pages[write.draft_index];
            let mut row = Page {
                id: PageId::generate(),
                comic_id: id.clone(),
                page_number: write.page_number,
                image_url: urls[write.draft_index].clone(),
                caption: draft.caption.clone(),
            };
            match &write.kind {
                WriteKind::Update(page_id) => {
                    row.id = page_id.clone();
                    self.backend
                        .update_page(&row)
                        .await
                        .map_err(update_err("updating page"))?;
                }
                WriteKind::Insert => inserts.push(row),
            }
        }

        if !inserts.is_empty() {
            self.backend
                .insert_pages(&inserts)
                .await
                .map_err(update_err("creating new pages"))?;
        }

        tracing::info!(
            comic_id = %id,
            deleted = plan.delete.len(),
            updated = plan.updates(),
            inserted = plan.inserts(),
            "updated comic"
        );
        Ok(())
    }

    /// Fetch a comic with its pages ordered by position, or `None` if the
    /// comic row does not exist.
    pub async fn get_comic(&self, id: &ComicId) -> Result<Option<Comic>, StoreError> {
        let Some(row) = self
            .backend
            .select_comic(id)
            .await
            .map_err(get_err("fetching comic"))?
        else {
            return Ok(None);
        };

        let mut pages = self
            .backend
            .select_pages(id)
            .await
            .map_err(get_err("fetching pages"))?;
        pages.sort_by_key(|p| p.page_number);

        Ok(Some(Comic {
            id: row.id,
            title: row.title,
            created_at: row.created_at,
            updated_at: row.updated_at,
            pages,
        }))
    }

    /// Most recently updated comics first.
    pub async fn list_comics(&self, limit: usize) -> Result<Vec<ComicSummary>, StoreError> {
        let rows = self
            .backend
            .list_comics(limit)
            .await
            .map_err(StoreError::List)?;
        Ok(rows.into_iter().map(ComicSummary::from).collect())
    }

    /// Resolve each draft's image to a stored URL, uploading pending files
    /// concurrently. The first failed upload aborts the whole batch.
    async fn resolve_images(
        &self,
        comic_id: &ComicId,
        pages: &[PageDraft],
    ) -> Result<Vec<Option<String>>, BackendError> {
        try_join_all(pages.iter().map(|page| self.resolve_image(comic_id, &page.image))).await
    }

    async fn resolve_image(
        &self,
        comic_id: &ComicId,
        image: &PageImage,
    ) -> Result<Option<String>, BackendError> {
        match image {
            PageImage::Remote(url) if url.is_empty() => Ok(None),
            PageImage::Remote(url) => Ok(Some(url.clone())),
            PageImage::Upload(upload) => {
                let path = upload.blob_path(comic_id);
                self.backend
                    .upload(&path, upload.bytes().to_vec(), upload.content_type())
                    .await?;
                Ok(Some(self.backend.public_url(&path)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalBackend;
    use crate::testing::{FailingBackend, FailPoint};
    use comicstrip_core::ImageUpload;
    use tempfile::TempDir;

    fn local_store(dir: &TempDir) -> (Arc<LocalBackend>, ComicStore) {
        let backend = Arc::new(LocalBackend::open(dir.path(), "http://localhost:7332").unwrap());
        let store = ComicStore::new(backend.clone(), IdStyle::Uuid);
        (backend, store)
    }

    fn linked(caption: &str) -> PageDraft {
        PageDraft::new(
            PageImage::Remote(format!("https://img.example/{}.png", caption)),
            caption,
        )
    }

    fn uploaded(name: &str, caption: &str) -> PageDraft {
        let upload = ImageUpload::new(name, Some("image/png"), vec![0x89, 0x50, 0x4e, 0x47]).unwrap();
        PageDraft::new(PageImage::Upload(upload), caption)
    }

    fn captions(comic: &Comic) -> Vec<&str> {
        comic.pages.iter().map(|p| p.caption.as_str()).collect()
    }

    /// Reload a comic's pages as drafts carrying their stored ids.
    fn as_drafts(comic: &Comic) -> Vec<PageDraft> {
        comic
            .pages
            .iter()
            .map(|p| {
                PageDraft::new(
                    PageImage::Remote(p.image_url.clone().unwrap_or_default()),
                    p.caption.clone(),
                )
                .with_id(p.id.clone())
            })
            .collect()
    }

    #[tokio::test]
    async fn save_then_get_preserves_order_and_captions() {
        let dir = TempDir::new().unwrap();
        let (_backend, store) = local_store(&dir);
        let pages = vec![linked("one"), uploaded("two.png", "two"), linked("three")];

        let id = store.save_comic(&pages, "Trilogy").await.unwrap();
        let comic = store.get_comic(&id).await.unwrap().unwrap();

        assert_eq!(comic.title, "Trilogy");
        assert_eq!(captions(&comic), vec!["one", "two", "three"]);
        let numbers: Vec<u32> = comic.pages.iter().map(|p| p.page_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn uploads_resolve_to_public_urls_under_comic_prefix() {
        let dir = TempDir::new().unwrap();
        let (backend, store) = local_store(&dir);

        let id = store
            .save_comic(&[uploaded("cat.png", "meow")], "Cats")
            .await
            .unwrap();
        let comic = store.get_comic(&id).await.unwrap().unwrap();
        let url = comic.pages[0].image_url.clone().unwrap();

        let prefix = format!("http://localhost:7332/blobs/{}/", id);
        assert!(url.starts_with(&prefix), "unexpected url {}", url);
        assert!(url.ends_with("-cat.png"));
        let stored = backend.blob_dir().join(url.trim_start_matches("http://localhost:7332/blobs/"));
        assert!(stored.exists());
    }

    #[tokio::test]
    async fn blank_title_gets_default() {
        let dir = TempDir::new().unwrap();
        let (_backend, store) = local_store(&dir);
        let id = store.save_comic(&[linked("a")], "  ").await.unwrap();
        let comic = store.get_comic(&id).await.unwrap().unwrap();
        assert_eq!(comic.title, "My Comic");
    }

    #[tokio::test]
    async fn short_id_style_is_used_for_new_comics() {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(LocalBackend::open(dir.path(), "http://x").unwrap());
        let store = ComicStore::new(backend, IdStyle::Short);
        let id = store.save_comic(&[linked("a")], "Short").await.unwrap();
        assert_eq!(id.as_str().len(), 8);
        assert!(store.get_comic(&id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn update_diffs_pages_and_keeps_ids() {
        let dir = TempDir::new().unwrap();
        let (_backend, store) = local_store(&dir);
        let id = store
            .save_comic(&[linked("a"), linked("b"), linked("c")], "Draft")
            .await
            .unwrap();
        let before = store.get_comic(&id).await.unwrap().unwrap();

        // Drop "b", move "c" to the front, edit "a", append a new page
        let mut drafts = as_drafts(&before);
        let b = drafts.remove(1);
        let c = drafts.remove(1);
        drafts.insert(0, c);
        drafts[1].caption = "a (edited)".to_string();
        drafts.push(linked("d"));

        store.update_comic(&id, &drafts, "Final").await.unwrap();
        let after = store.get_comic(&id).await.unwrap().unwrap();

        assert_eq!(after.title, "Final");
        assert_eq!(captions(&after), vec!["c", "a (edited)", "d"]);
        assert_eq!(after.pages[0].id, before.pages[2].id);
        assert_eq!(after.pages[1].id, before.pages[0].id);
        assert!(after.pages.iter().all(|p| Some(&p.id) != b.id.as_ref()));
        let numbers: Vec<u32> = after.pages.iter().map(|p| p.page_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn removing_every_page_leaves_empty_comic() {
        let dir = TempDir::new().unwrap();
        let (_backend, store) = local_store(&dir);
        let id = store
            .save_comic(&[linked("a"), linked("b")], "Doomed")
            .await
            .unwrap();

        store.update_comic(&id, &[], "Doomed").await.unwrap();

        let comic = store.get_comic(&id).await.unwrap().unwrap();
        assert!(comic.pages.is_empty());
    }

    #[tokio::test]
    async fn update_of_unknown_comic_is_not_found() {
        let dir = TempDir::new().unwrap();
        let (_backend, store) = local_store(&dir);
        let missing = ComicId::parse("missing").unwrap();

        let err = store.update_comic(&missing, &[linked("a")], "x").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn get_of_unknown_comic_is_none() {
        let dir = TempDir::new().unwrap();
        let (_backend, store) = local_store(&dir);
        let missing = ComicId::parse("missing").unwrap();
        assert!(store.get_comic(&missing).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_sorts_pages_stored_out_of_order() {
        let dir = TempDir::new().unwrap();
        let (backend, store) = local_store(&dir);
        let id = ComicId::parse("manual").unwrap();
        backend
            .insert_comic(&ComicRow::new(id.clone(), "Manual".to_string()))
            .await
            .unwrap();
        let page = |n: u32| Page {
            id: PageId::generate(),
            comic_id: id.clone(),
            page_number: n,
            image_url: None,
            caption: format!("page {}", n),
        };
        backend.insert_pages(&[page(2), page(3), page(1)]).await.unwrap();

        let comic = store.get_comic(&id).await.unwrap().unwrap();
        assert_eq!(captions(&comic), vec!["page 1", "page 2", "page 3"]);
    }

    #[tokio::test]
    async fn failed_page_insert_reports_step_and_leaves_orphan_comic() {
        let dir = TempDir::new().unwrap();
        let local = Arc::new(LocalBackend::open(dir.path(), "http://x").unwrap());
        let failing = Arc::new(FailingBackend::new(local.clone(), FailPoint::InsertPages));
        let store = ComicStore::new(failing, IdStyle::Uuid);

        let err = store.save_comic(&[linked("a")], "Orphan").await.unwrap_err();
        let message = err.to_string();
        assert!(
            message.starts_with("failed to save comic: creating pages:"),
            "got: {}",
            message
        );

        // The comic row was written before the failure and is not rolled back
        let listed = local.list_comics(10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(local.select_pages(&listed[0].id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_upload_aborts_update_before_page_writes() {
        let dir = TempDir::new().unwrap();
        let local = Arc::new(LocalBackend::open(dir.path(), "http://x").unwrap());
        let id = ComicStore::new(local.clone(), IdStyle::Uuid)
            .save_comic(&[linked("a")], "Stable")
            .await
            .unwrap();

        let failing = Arc::new(FailingBackend::new(local.clone(), FailPoint::Upload));
        let store = ComicStore::new(failing, IdStyle::Uuid);
        let before = store.get_comic(&id).await.unwrap().unwrap();
        let mut drafts = as_drafts(&before);
        drafts.push(uploaded("new.png", "new"));

        let err = store.update_comic(&id, &drafts, "Stable").await.unwrap_err();
        assert!(err.to_string().contains("uploading image"), "got: {}", err);

        let after = store.get_comic(&id).await.unwrap().unwrap();
        assert_eq!(captions(&after), vec!["a"]);
    }

    async fn update_failing_at(point: FailPoint) -> (StoreError, Comic) {
        let dir = TempDir::new().unwrap();
        let local = Arc::new(LocalBackend::open(dir.path(), "http://x").unwrap());
        let id = ComicStore::new(local.clone(), IdStyle::Uuid)
            .save_comic(&[linked("a"), linked("b")], "Before")
            .await
            .unwrap();

        let store = ComicStore::new(Arc::new(FailingBackend::new(local, point)), IdStyle::Uuid);
        let stored = store.get_comic(&id).await.unwrap().unwrap();
        // Keep "b" with a new caption and drop "a": one delete and one update.
        let mut kept = as_drafts(&stored).remove(1);
        kept.caption = "b, revised".to_string();

        let err = store.update_comic(&id, &[kept], "After").await.unwrap_err();
        let after = store.get_comic(&id).await.unwrap().unwrap();
        (err, after)
    }

    #[tokio::test]
    async fn failed_title_update_reports_step_and_changes_nothing() {
        let (err, after) = update_failing_at(FailPoint::UpdateTitle).await;
        assert!(
            err.to_string().starts_with("failed to update comic: updating comic title:"),
            "got: {}",
            err
        );
        assert_eq!(after.title, "Before");
        assert_eq!(captions(&after), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn failed_page_delete_reports_step_and_keeps_pages() {
        let (err, after) = update_failing_at(FailPoint::DeletePages).await;
        assert!(
            err.to_string().starts_with("failed to update comic: deleting removed pages:"),
            "got: {}",
            err
        );
        assert_eq!(after.title, "After");
        assert_eq!(captions(&after), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn failed_page_update_reports_step_after_delete() {
        let (err, after) = update_failing_at(FailPoint::UpdatePage).await;
        assert!(
            err.to_string().starts_with("failed to update comic: updating page:"),
            "got: {}",
            err
        );
        assert!(matches!(err, StoreError::Update { .. }));
        // The delete already went through; the kept page still has its old caption.
        assert_eq!(captions(&after), vec!["b"]);
    }

    #[tokio::test]
    async fn failed_comic_fetch_reports_step() {
        let dir = TempDir::new().unwrap();
        let local = Arc::new(LocalBackend::open(dir.path(), "http://x").unwrap());
        let id = ComicStore::new(local.clone(), IdStyle::Uuid)
            .save_comic(&[linked("a")], "Hidden")
            .await
            .unwrap();

        let store = ComicStore::new(
            Arc::new(FailingBackend::new(local, FailPoint::SelectComic)),
            IdStyle::Uuid,
        );
        let err = store.get_comic(&id).await.unwrap_err();
        assert!(
            err.to_string().starts_with("failed to get comic: fetching comic:"),
            "got: {}",
            err
        );
    }

    #[tokio::test]
    async fn list_returns_saved_comics() {
        let dir = TempDir::new().unwrap();
        let (_backend, store) = local_store(&dir);
        store.save_comic(&[linked("a")], "One").await.unwrap();
        store.save_comic(&[linked("b")], "Two").await.unwrap();

        let listed = store.list_comics(10).await.unwrap();
        let mut titles: Vec<&str> = listed.iter().map(|c| c.title.as_str()).collect();
        titles.sort();
        assert_eq!(titles, vec!["One", "Two"]);
    }
}
