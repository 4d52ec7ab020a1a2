// ABOUTME: Configuration loading and validation for the comicstrip server.
// ABOUTME: Reads COMICSTRIP_* environment variables and checks backend settings before startup.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use comicstrip_core::IdStyle;
use thiserror::Error;

use crate::app_state::DEFAULT_DRAFT_TTL;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("COMICSTRIP_BIND is not a valid socket address: {0}")]
    InvalidBind(String),

    #[error("COMICSTRIP_BACKEND must be 'local' or 'rest', got: {0}")]
    UnknownBackend(String),

    #[error("COMICSTRIP_ID_STYLE must be 'uuid' or 'short', got: {0}")]
    UnknownIdStyle(String),

    #[error("COMICSTRIP_DRAFT_TTL_SECS must be a positive number of seconds, got: {0}")]
    InvalidDraftTtl(String),

    #[error("COMICSTRIP_BACKEND=rest requires {0} to be set")]
    MissingRestSetting(&'static str),
}

/// Which backend-as-a-service implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// SQLite rows + blob files under COMICSTRIP_HOME.
    Local,
    /// Hosted row/object store reached over HTTP.
    Rest,
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(BackendKind::Local),
            "rest" => Ok(BackendKind::Rest),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ComicConfig {
    pub home: PathBuf,
    pub bind: SocketAddr,
    public_base_url: Option<String>,
    pub backend: BackendKind,
    pub backend_url: Option<String>,
    pub backend_key: Option<String>,
    pub bucket: String,
    pub id_style: IdStyle,
    pub autosave: bool,
    pub draft_ttl: Duration,
}

impl ComicConfig {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// Environment variables:
    /// - COMICSTRIP_HOME: data directory for the local backend (default: ~/.comicstrip)
    /// - COMICSTRIP_BIND: socket address to bind (default: 127.0.0.1:7332)
    /// - COMICSTRIP_PUBLIC_BASE_URL: prefix for share links and local blob URLs (default: http://{bind})
    /// - COMICSTRIP_BACKEND: `local` or `rest` (default: local)
    /// - COMICSTRIP_BACKEND_URL / COMICSTRIP_BACKEND_KEY: hosted project URL and anon key
    /// - COMICSTRIP_BUCKET: blob bucket name (default: comics)
    /// - COMICSTRIP_ID_STYLE: `uuid` or `short` (default: uuid)
    /// - COMICSTRIP_AUTOSAVE: auto-save edits to existing comics (default: true)
    /// - COMICSTRIP_DRAFT_TTL_SECS: drop editor drafts idle this long (default: 7200)
    pub fn from_env() -> Result<Self, ConfigError> {
        let home = std::env::var("COMICSTRIP_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                std::env::var("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("/tmp"))
                    .join(".comicstrip")
            });

        let bind_str =
            std::env::var("COMICSTRIP_BIND").unwrap_or_else(|_| "127.0.0.1:7332".to_string());
        let bind: SocketAddr = bind_str
            .parse()
            .map_err(|_| ConfigError::InvalidBind(bind_str))?;

        let public_base_url = non_empty_var("COMICSTRIP_PUBLIC_BASE_URL")
            .map(|u| u.trim_end_matches('/').to_string());

        let backend = match non_empty_var("COMICSTRIP_BACKEND") {
            Some(raw) => raw.parse()?,
            None => BackendKind::Local,
        };

        let backend_url = non_empty_var("COMICSTRIP_BACKEND_URL");
        let backend_key = non_empty_var("COMICSTRIP_BACKEND_KEY");
        let bucket = non_empty_var("COMICSTRIP_BUCKET").unwrap_or_else(|| "comics".to_string());

        let id_style = match non_empty_var("COMICSTRIP_ID_STYLE") {
            Some(raw) => raw
                .parse::<IdStyle>()
                .map_err(|_| ConfigError::UnknownIdStyle(raw))?,
            None => IdStyle::Uuid,
        };

        let autosave = std::env::var("COMICSTRIP_AUTOSAVE")
            .map(|v| !matches!(v.trim(), "false" | "0" | "no"))
            .unwrap_or(true);

        let draft_ttl = match non_empty_var("COMICSTRIP_DRAFT_TTL_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => return Err(ConfigError::InvalidDraftTtl(raw)),
            },
            None => DEFAULT_DRAFT_TTL,
        };

        let config = Self {
            home,
            bind,
            public_base_url,
            backend,
            backend_url,
            backend_key,
            bucket,
            id_style,
            autosave,
            draft_ttl,
        };
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides on top of the environment.
    pub fn with_overrides(mut self, bind: Option<SocketAddr>, home: Option<PathBuf>) -> Self {
        if let Some(bind) = bind {
            self.bind = bind;
        }
        if let Some(home) = home {
            self.home = home;
        }
        self
    }

    /// Base URL used in share links. Falls back to the bind address.
    pub fn public_base_url(&self) -> String {
        self.public_base_url
            .clone()
            .unwrap_or_else(|| format!("http://{}", self.bind))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.backend == BackendKind::Rest {
            if self.backend_url.is_none() {
                return Err(ConfigError::MissingRestSetting("COMICSTRIP_BACKEND_URL"));
            }
            if self.backend_key.is_none() {
                return Err(ConfigError::MissingRestSetting("COMICSTRIP_BACKEND_KEY"));
            }
        }
        Ok(())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
