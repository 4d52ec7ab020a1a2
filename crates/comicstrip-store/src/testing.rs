// ABOUTME: Test utilities for comicstrip-store, including a backend that fails on demand.
// ABOUTME: Wraps a real backend and injects a remote error at one chosen call.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use comicstrip_core::{ComicId, Page, PageId};

use crate::backend::{Backend, BackendError, BlobStore, ComicRow, RowStore};

/// The backend call that should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    InsertComic,
    UpdateTitle,
    SelectComic,
    InsertPages,
    UpdatePage,
    DeletePages,
    Upload,
}

/// Delegates to an inner backend, except at `fail_at` where it returns a
/// 503-style error as the hosted service would.
pub struct FailingBackend {
    inner: Arc<dyn Backend>,
    fail_at: FailPoint,
}

impl FailingBackend {
    pub fn new(inner: Arc<dyn Backend>, fail_at: FailPoint) -> Self {
        Self { inner, fail_at }
    }

    fn check(&self, point: FailPoint) -> Result<(), BackendError> {
        if self.fail_at == point {
            Err(BackendError::Status {
                status: 503,
                message: format!("injected failure at {:?}", point),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RowStore for FailingBackend {
    async fn insert_comic(&self, comic: &ComicRow) -> Result<(), BackendError> {
        self.check(FailPoint::InsertComic)?;
        self.inner.insert_comic(comic).await
    }

    async fn update_comic_title(
        &self,
        id: &ComicId,
        title: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, BackendError> {
        self.check(FailPoint::UpdateTitle)?;
        self.inner.update_comic_title(id, title, updated_at).await
    }

    async fn select_comic(&self, id: &ComicId) -> Result<Option<ComicRow>, BackendError> {
        self.check(FailPoint::SelectComic)?;
        self.inner.select_comic(id).await
    }

    async fn list_comics(&self, limit: usize) -> Result<Vec<ComicRow>, BackendError> {
        self.inner.list_comics(limit).await
    }

    async fn select_page_ids(&self, comic_id: &ComicId) -> Result<Vec<PageId>, BackendError> {
        self.inner.select_page_ids(comic_id).await
    }

    async fn select_pages(&self, comic_id: &ComicId) -> Result<Vec<Page>, BackendError> {
        self.inner.select_pages(comic_id).await
    }

    async fn insert_pages(&self, pages: &[Page]) -> Result<(), BackendError> {
        self.check(FailPoint::InsertPages)?;
        self.inner.insert_pages(pages).await
    }

    async fn update_page(&self, page: &Page) -> Result<(), BackendError> {
        self.check(FailPoint::UpdatePage)?;
        self.inner.update_page(page).await
    }

    async fn delete_pages(&self, ids: &[PageId]) -> Result<(), BackendError> {
        self.check(FailPoint::DeletePages)?;
        self.inner.delete_pages(ids).await
    }
}

#[async_trait]
impl BlobStore for FailingBackend {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), BackendError> {
        self.check(FailPoint::Upload)?;
        self.inner.upload(path, bytes, content_type).await
    }

    fn public_url(&self, path: &str) -> String {
        self.inner.public_url(path)
    }
}
