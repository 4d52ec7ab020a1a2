// ABOUTME: Backend-as-a-service abstraction: a row store for comics/pages and a blob store for images.
// ABOUTME: Implemented by the REST backend (hosted service) and the local SQLite + filesystem backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use comicstrip_core::{ComicId, ComicSummary, Page, PageId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by a backend call. The persistence client wraps these with
/// the operation and step that failed.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid row: {0}")]
    InvalidRow(String),

    #[error("invalid blob path: {0}")]
    InvalidPath(String),

    #[error("local store lock poisoned")]
    Poisoned,
}

/// A row of the `comics` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComicRow {
    pub id: ComicId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ComicRow {
    pub fn new(id: ComicId, title: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            title,
            created_at: now,
            updated_at: now,
        }
    }
}

impl From<ComicRow> for ComicSummary {
    fn from(row: ComicRow) -> Self {
        ComicSummary {
            id: row.id,
            title: row.title,
            updated_at: row.updated_at,
        }
    }
}

/// Table operations over `comics` and `comic_pages`. Rows of `comic_pages`
/// are the core `Page` type.
#[async_trait]
pub trait RowStore: Send + Sync {
    async fn insert_comic(&self, comic: &ComicRow) -> Result<(), BackendError>;

    /// Returns false when no comic row matched `id`.
    async fn update_comic_title(
        &self,
        id: &ComicId,
        title: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, BackendError>;

    async fn select_comic(&self, id: &ComicId) -> Result<Option<ComicRow>, BackendError>;

    /// Most recently updated first.
    async fn list_comics(&self, limit: usize) -> Result<Vec<ComicRow>, BackendError>;

    async fn select_page_ids(&self, comic_id: &ComicId) -> Result<Vec<PageId>, BackendError>;

    /// Pages of one comic ordered by `page_number` ascending.
    async fn select_pages(&self, comic_id: &ComicId) -> Result<Vec<Page>, BackendError>;

    async fn insert_pages(&self, pages: &[Page]) -> Result<(), BackendError>;

    async fn update_page(&self, page: &Page) -> Result<(), BackendError>;

    async fn delete_pages(&self, ids: &[PageId]) -> Result<(), BackendError>;
}

/// Object storage for page images.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str)
    -> Result<(), BackendError>;

    /// Publicly reachable URL for an uploaded object.
    fn public_url(&self, path: &str) -> String;
}

/// Everything the persistence client needs from a hosted backend.
pub trait Backend: RowStore + BlobStore {}

impl<T: RowStore + BlobStore> Backend for T {}

/// Reject object paths that could escape the bucket or blob directory.
pub(crate) fn check_blob_path(path: &str) -> Result<(), BackendError> {
    let bad = path.is_empty()
        || path.starts_with('/')
        || path
            .split('/')
            .any(|seg| seg.is_empty() || seg == "." || seg == ".." || seg.contains('\\'));
    if bad {
        Err(BackendError::InvalidPath(path.to_string()))
    } else {
        Ok(())
    }
}
