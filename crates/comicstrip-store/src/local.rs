// ABOUTME: Self-hosted backend: SQLite tables for comics/pages and a directory of blob files.
// ABOUTME: Mirrors the hosted service's table layout so either backend can sit behind ComicStore.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use comicstrip_core::{ComicId, Page, PageId};
use rusqlite::{Connection, OptionalExtension, params};

use crate::backend::{BackendError, BlobStore, ComicRow, RowStore, check_blob_path};

const DB_FILE: &str = "comicstrip.db";
const BLOB_DIR: &str = "blobs";

/// Local row + blob backend rooted at a home directory:
/// `{home}/comicstrip.db` and `{home}/blobs/{comic_id}/...`.
pub struct LocalBackend {
    conn: Mutex<Connection>,
    blob_dir: PathBuf,
    public_base_url: String,
}

impl LocalBackend {
    /// Open or create the database and blob directory under `home`.
    /// Blobs are published as `{public_base_url}/blobs/{path}`.
    pub fn open(home: &Path, public_base_url: &str) -> Result<Self, BackendError> {
        std::fs::create_dir_all(home)?;
        let blob_dir = home.join(BLOB_DIR);
        std::fs::create_dir_all(&blob_dir)?;

        let conn = Connection::open(home.join(DB_FILE))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS comics (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS comic_pages (
                id TEXT PRIMARY KEY,
                comic_id TEXT NOT NULL,
                page_number INTEGER NOT NULL,
                image_url TEXT,
                caption TEXT NOT NULL,
                FOREIGN KEY (comic_id) REFERENCES comics(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS comic_pages_by_position
                ON comic_pages (comic_id, page_number);",
        )?;

        tracing::debug!(home = %home.display(), "opened local backend");

        Ok(Self {
            conn: Mutex::new(conn),
            blob_dir,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Directory holding uploaded blobs, for static file serving.
    pub fn blob_dir(&self) -> &Path {
        &self.blob_dir
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, BackendError> {
        self.conn.lock().map_err(|_| BackendError::Poisoned)
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, BackendError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| BackendError::InvalidRow(format!("bad timestamp {:?}: {}", raw, e)))
}

fn parse_comic_id(raw: String) -> Result<ComicId, BackendError> {
    ComicId::parse(&raw).map_err(|e| BackendError::InvalidRow(e.to_string()))
}

/// Raw comic columns as read from SQLite, before validation.
type RawComic = (String, String, String, String);

fn comic_from_raw((id, title, created_at, updated_at): RawComic) -> Result<ComicRow, BackendError> {
    Ok(ComicRow {
        id: parse_comic_id(id)?,
        title,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

#[async_trait]
impl RowStore for LocalBackend {
    async fn insert_comic(&self, comic: &ComicRow) -> Result<(), BackendError> {
        self.conn()?.execute(
            "INSERT INTO comics (id, title, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                comic.id.as_str(),
                comic.title,
                comic.created_at.to_rfc3339(),
                comic.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn update_comic_title(
        &self,
        id: &ComicId,
        title: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, BackendError> {
        let changed = self.conn()?.execute(
            "UPDATE comics SET title = ?2, updated_at = ?3 WHERE id = ?1",
            params![id.as_str(), title, updated_at.to_rfc3339()],
        )?;
        Ok(changed > 0)
    }

    async fn select_comic(&self, id: &ComicId) -> Result<Option<ComicRow>, BackendError> {
        let raw: Option<RawComic> = self
            .conn()?
            .query_row(
                "SELECT id, title, created_at, updated_at FROM comics WHERE id = ?1",
                params![id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        raw.map(comic_from_raw).transpose()
    }

    async fn list_comics(&self, limit: usize) -> Result<Vec<ComicRow>, BackendError> {
        let raws = {
            let conn = self.conn()?;
            let mut stmt = conn.prepare(
                "SELECT id, title, created_at, updated_at FROM comics
                 ORDER BY updated_at DESC LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit as i64], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?;
            let raws: Vec<RawComic> = rows.collect::<Result<_, _>>()?;
            raws
        };

        raws.into_iter().map(comic_from_raw).collect()
    }

    async fn select_page_ids(&self, comic_id: &ComicId) -> Result<Vec<PageId>, BackendError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id FROM comic_pages WHERE comic_id = ?1")?;
        let rows = stmt.query_map(params![comic_id.as_str()], |row| row.get::<_, String>(0))?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(PageId::from(row?));
        }
        Ok(ids)
    }

    async fn select_pages(&self, comic_id: &ComicId) -> Result<Vec<Page>, BackendError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, page_number, image_url, caption FROM comic_pages
             WHERE comic_id = ?1 ORDER BY page_number ASC",
        )?;
        let rows = stmt.query_map(params![comic_id.as_str()], |row| {
            Ok(Page {
                id: PageId::from(row.get::<_, String>(0)?),
                comic_id: comic_id.clone(),
                page_number: row.get(1)?,
                image_url: row.get(2)?,
                caption: row.get(3)?,
            })
        })?;

        let mut pages = Vec::new();
        for row in rows {
            pages.push(row?);
        }
        Ok(pages)
    }

    async fn insert_pages(&self, pages: &[Page]) -> Result<(), BackendError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        for page in pages {
            tx.execute(
                "INSERT INTO comic_pages (id, comic_id, page_number, image_url, caption)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    page.id.as_str(),
                    page.comic_id.as_str(),
                    page.page_number,
                    page.image_url,
                    page.caption,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    async fn update_page(&self, page: &Page) -> Result<(), BackendError> {
        self.conn()?.execute(
            "UPDATE comic_pages SET page_number = ?2, image_url = ?3, caption = ?4 WHERE id = ?1",
            params![page.id.as_str(), page.page_number, page.image_url, page.caption],
        )?;
        Ok(())
    }

    async fn delete_pages(&self, ids: &[PageId]) -> Result<(), BackendError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        for id in ids {
            tx.execute("DELETE FROM comic_pages WHERE id = ?1", params![id.as_str()])?;
        }
        tx.commit()?;
        Ok(())
    }
}

#[async_trait]
impl BlobStore for LocalBackend {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), BackendError> {
        check_blob_path(path)?;
        let target = self.blob_dir.join(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Names carry a fresh uuid, so an existing file means a caller bug.
        if tokio::fs::try_exists(&target).await? {
            return Err(BackendError::InvalidPath(format!("{} already exists", path)));
        }
        tokio::fs::write(&target, bytes).await?;
        tracing::debug!(path, "stored blob");
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.public_base_url, BLOB_DIR, path)
    }
}
