// ABOUTME: Defines the persisted comic model: Comic, Page, and their identifier newtypes.
// ABOUTME: Comic ids come in two generated styles (UUID or short alphanumeric code).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Title used when a comic is saved without one.
pub const DEFAULT_TITLE: &str = "My Comic";

const SHORT_CODE_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const SHORT_CODE_LEN: usize = 8;
/// Bytes of a v4 UUID that carry the version and variant bits.
const UUID_FIXED_BYTES: [usize; 2] = [6, 8];
const MAX_ID_LEN: usize = 64;

/// Errors raised while validating model values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid comic id: {0:?}")]
    InvalidComicId(String),

    #[error("unknown id style: {0}")]
    UnknownIdStyle(String),

    #[error("unsupported image type: {0}")]
    UnsupportedImage(String),

    #[error("image upload is empty: {0}")]
    EmptyImage(String),

    #[error("image url must be http or https: {0}")]
    InvalidImageUrl(String),
}

/// How new comic identifiers are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStyle {
    #[default]
    Uuid,
    Short,
}

impl FromStr for IdStyle {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uuid" => Ok(IdStyle::Uuid),
            "short" => Ok(IdStyle::Short),
            other => Err(ModelError::UnknownIdStyle(other.to_string())),
        }
    }
}

/// Identifier of a comic. Either a hyphenated UUID or a short alphanumeric code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComicId(String);

impl ComicId {
    /// Generate a fresh identifier in the requested style.
    pub fn generate(style: IdStyle) -> Self {
        match style {
            IdStyle::Uuid => Self(Uuid::new_v4().to_string()),
            IdStyle::Short => {
                let code = Uuid::new_v4()
                    .as_bytes()
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| !UUID_FIXED_BYTES.contains(i))
                    .take(SHORT_CODE_LEN)
                    .map(|(_, b)| SHORT_CODE_ALPHABET[*b as usize % SHORT_CODE_ALPHABET.len()] as char)
                    .collect();
                Self(code)
            }
        }
    }

    /// Validate an identifier received from a URL or request body.
    /// Accepts ASCII alphanumerics and hyphens, at most 64 characters.
    pub fn parse(raw: &str) -> Result<Self, ModelError> {
        let trimmed = raw.trim();
        let valid = !trimmed.is_empty()
            && trimmed.len() <= MAX_ID_LEN
            && trimmed.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        if valid {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(ModelError::InvalidComicId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ComicId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Identifier of a persisted page row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(String);

impl PageId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A persisted page: one image + caption unit at a 1-based position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub comic_id: ComicId,
    pub page_number: u32,
    pub image_url: Option<String>,
    pub caption: String,
}

/// A persisted comic with its pages ordered by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comic {
    pub id: ComicId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub pages: Vec<Page>,
}

impl Comic {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Listing entry for recently edited comics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComicSummary {
    pub id: ComicId,
    pub title: String,
    pub updated_at: DateTime<Utc>,
}

/// Resolve the title a comic is stored under; blank titles fall back to the default.
pub fn effective_title(title: &str) -> String {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        trimmed.to_string()
    }
}
