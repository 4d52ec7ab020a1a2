// ABOUTME: Page image references: either a remote URL or a freshly picked local upload.
// ABOUTME: Validates accepted image types and derives blob storage paths for uploads.

use std::fmt;

use uuid::Uuid;

use crate::model::{ComicId, ModelError};

/// File extensions accepted for uploaded page images.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "gif", "webp"];

/// A local image file waiting to be uploaded to blob storage.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageUpload {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

impl ImageUpload {
    /// Build an upload, rejecting empty payloads and non-image file types.
    /// The content type always comes from the extension. A declared type
    /// must match it, though a missing or octet-stream type is allowed.
    pub fn new(
        file_name: impl Into<String>,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<Self, ModelError> {
        let file_name = file_name.into();
        let ext = extension(&file_name)
            .ok_or_else(|| ModelError::UnsupportedImage(file_name.clone()))?;
        let inferred = content_type_for(&ext)
            .ok_or_else(|| ModelError::UnsupportedImage(file_name.clone()))?;
        if bytes.is_empty() {
            return Err(ModelError::EmptyImage(file_name));
        }

        // The extension decides the stored type; a declared type may only agree with it.
        match content_type.map(str::trim) {
            None | Some("") | Some("application/octet-stream") => {}
            Some(ct) if ct.eq_ignore_ascii_case(inferred) => {}
            Some(ct) => {
                return Err(ModelError::UnsupportedImage(format!("{} ({})", file_name, ct)));
            }
        }
        let content_type = inferred.to_string();

        Ok(Self {
            file_name,
            content_type,
            bytes,
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Object path for this upload under the comic's prefix:
    /// `{comic_id}/{uuid}-{sanitized file name}`.
    pub fn blob_path(&self, comic_id: &ComicId) -> String {
        format!(
            "{}/{}-{}",
            comic_id,
            Uuid::new_v4(),
            sanitize_file_name(&self.file_name)
        )
    }
}

impl fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// The image shown on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageImage {
    /// Already persisted, or linked from elsewhere.
    Remote(String),
    /// Picked locally, not yet uploaded.
    Upload(ImageUpload),
}

impl PageImage {
    /// Accept a linked image URL. Only http(s) URLs are allowed.
    pub fn remote(url: &str) -> Result<Self, ModelError> {
        let url = url.trim();
        if url.starts_with("https://") || url.starts_with("http://") {
            Ok(PageImage::Remote(url.to_string()))
        } else {
            Err(ModelError::InvalidImageUrl(url.to_string()))
        }
    }

    pub fn remote_url(&self) -> Option<&str> {
        match self {
            PageImage::Remote(url) => Some(url),
            PageImage::Upload(_) => None,
        }
    }

    pub fn is_upload(&self) -> bool {
        matches!(self, PageImage::Upload(_))
    }

    /// Short label for display: the URL or the pending file name.
    pub fn label(&self) -> &str {
        match self {
            PageImage::Remote(url) => url,
            PageImage::Upload(upload) => upload.file_name(),
        }
    }
}

fn extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

fn content_type_for(ext: &str) -> Option<&'static str> {
    match ext {
        "jpeg" | "jpg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Keep object names to a conservative character set; anything else becomes '-'.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    base.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}
