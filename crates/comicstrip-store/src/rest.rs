// ABOUTME: Hosted backend-as-a-service adapter: PostgREST-style table endpoints plus a storage API.
// ABOUTME: Translates RowStore/BlobStore calls into HTTP requests and maps error bodies to BackendError.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use comicstrip_core::{ComicId, Page, PageId};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::backend::{BackendError, BlobStore, ComicRow, RowStore, check_blob_path};

const COMICS_TABLE: &str = "comics";
const PAGES_TABLE: &str = "comic_pages";

/// Connection settings for a hosted project.
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Project URL, e.g. `https://xyzcompany.example.co`.
    pub url: String,
    /// Anonymous API key, sent as both `apikey` and bearer token.
    pub api_key: String,
    pub bucket: String,
}

/// Row + blob backend speaking to a hosted backend-as-a-service over HTTP.
pub struct RestBackend {
    client: reqwest::Client,
    url: String,
    api_key: String,
    bucket: String,
}

#[derive(Deserialize)]
struct IdOnly {
    id: PageId,
}

impl RestBackend {
    pub fn new(config: RestConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    pub fn with_client(config: RestConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            bucket: config.bucket,
        }
    }

    /// `{url}/rest/v1/{table}`
    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.url, table)
    }

    /// `{url}/storage/v1/object/{bucket}/{path}`
    pub fn object_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.url, self.bucket, path)
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, BackendError> {
        let resp = builder.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(BackendError::Status {
            status: status.as_u16(),
            message: error_message(&body),
        })
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, BackendError> {
        let builder = self
            .request(reqwest::Method::GET, self.table_url(table))
            .query(query);
        let resp = self.send(builder).await?;
        Ok(resp.json::<Vec<T>>().await?)
    }
}

/// `eq.{value}` equality filter.
pub fn filter_eq(value: &str) -> String {
    format!("eq.{}", value)
}

/// `in.("a","b")` membership filter. Values are quoted so ids containing
/// reserved characters stay intact.
pub fn filter_in<'a>(values: impl IntoIterator<Item = &'a str>) -> String {
    let quoted: Vec<String> = values
        .into_iter()
        .map(|v| format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

/// Pull a human-readable message out of an error body. The hosted APIs use
/// `message` (rows) or `error` (storage); anything else is passed through.
pub fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["message", "error_description", "error"] {
            if let Some(msg) = value.get(key).and_then(|m| m.as_str()) {
                return msg.to_string();
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "no error details".to_string()
    } else {
        trimmed.to_string()
    }
}

#[async_trait]
impl RowStore for RestBackend {
    async fn insert_comic(&self, comic: &ComicRow) -> Result<(), BackendError> {
        let builder = self
            .request(reqwest::Method::POST, self.table_url(COMICS_TABLE))
            .header("Prefer", "return=minimal")
            .json(&[comic]);
        self.send(builder).await?;
        Ok(())
    }

    async fn update_comic_title(
        &self,
        id: &ComicId,
        title: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, BackendError> {
        let builder = self
            .request(reqwest::Method::PATCH, self.table_url(COMICS_TABLE))
            .query(&[("id", filter_eq(id.as_str()))])
            .header("Prefer", "return=representation")
            .json(&json!({ "title": title, "updated_at": updated_at }));
        let resp = self.send(builder).await?;
        let rows: Vec<Value> = resp.json().await?;
        Ok(!rows.is_empty())
    }

    async fn select_comic(&self, id: &ComicId) -> Result<Option<ComicRow>, BackendError> {
        let rows: Vec<ComicRow> = self
            .select(
                COMICS_TABLE,
                &[("select", "*".to_string()), ("id", filter_eq(id.as_str()))],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn list_comics(&self, limit: usize) -> Result<Vec<ComicRow>, BackendError> {
        self.select(
            COMICS_TABLE,
            &[
                ("select", "*".to_string()),
                ("order", "updated_at.desc".to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    async fn select_page_ids(&self, comic_id: &ComicId) -> Result<Vec<PageId>, BackendError> {
        let rows: Vec<IdOnly> = self
            .select(
                PAGES_TABLE,
                &[
                    ("select", "id".to_string()),
                    ("comic_id", filter_eq(comic_id.as_str())),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(|r| r.id).collect())
    }

    async fn select_pages(&self, comic_id: &ComicId) -> Result<Vec<Page>, BackendError> {
        self.select(
            PAGES_TABLE,
            &[
                ("select", "*".to_string()),
                ("comic_id", filter_eq(comic_id.as_str())),
                ("order", "page_number.asc".to_string()),
            ],
        )
        .await
    }

    async fn insert_pages(&self, pages: &[Page]) -> Result<(), BackendError> {
        if pages.is_empty() {
            return Ok(());
        }
        let builder = self
            .request(reqwest::Method::POST, self.table_url(PAGES_TABLE))
            .header("Prefer", "return=minimal")
            .json(pages);
        self.send(builder).await?;
        Ok(())
    }

    async fn update_page(&self, page: &Page) -> Result<(), BackendError> {
        let builder = self
            .request(reqwest::Method::PATCH, self.table_url(PAGES_TABLE))
            .query(&[("id", filter_eq(page.id.as_str()))])
            .header("Prefer", "return=minimal")
            .json(&json!({
                "image_url": page.image_url,
                "caption": page.caption,
                "page_number": page.page_number,
            }));
        self.send(builder).await?;
        Ok(())
    }

    async fn delete_pages(&self, ids: &[PageId]) -> Result<(), BackendError> {
        if ids.is_empty() {
            return Ok(());
        }
        let builder = self
            .request(reqwest::Method::DELETE, self.table_url(PAGES_TABLE))
            .query(&[("id", filter_in(ids.iter().map(|id| id.as_str())))]);
        self.send(builder).await?;
        Ok(())
    }
}

#[async_trait]
impl BlobStore for RestBackend {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), BackendError> {
        check_blob_path(path)?;
        let builder = self
            .request(reqwest::Method::POST, self.object_url(path))
            .header("Content-Type", content_type)
            .header("x-upsert", "false")
            .body(bytes);
        self.send(builder).await?;
        tracing::debug!(path, bucket = %self.bucket, "uploaded blob");
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.url, self.bucket, path
        )
    }
}
