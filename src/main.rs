// ABOUTME: Entry point for the comicstrip binary.
// ABOUTME: Parses CLI arguments, loads configuration, picks a backend, and starts the HTTP server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use comicstrip_server::{AppState, BackendKind, ComicConfig, create_router};
use comicstrip_store::{ComicStore, LocalBackend, RestBackend, RestConfig};

#[derive(Debug, Parser)]
#[command(name = "comicstrip", about = "Build and share multi-page comics")]
struct Args {
    /// Address to listen on (overrides COMICSTRIP_BIND).
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Data directory for the local backend (overrides COMICSTRIP_HOME).
    #[arg(long)]
    home: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "comicstrip=debug,tower_http=debug".into()),
        )
        .init();

    let args = Args::parse();
    let config = ComicConfig::from_env()
        .context("invalid configuration")?
        .with_overrides(args.bind, args.home);
    let public_base_url = config.public_base_url();

    let state = match config.backend {
        BackendKind::Local => {
            let backend = LocalBackend::open(&config.home, &public_base_url)
                .with_context(|| format!("failed to open local backend at {}", config.home.display()))?;
            let blob_dir = backend.blob_dir().to_path_buf();
            let store = ComicStore::new(Arc::new(backend), config.id_style);
            tracing::info!(home = %config.home.display(), "using local backend");
            AppState::new(store, public_base_url.clone(), config.autosave)
                .with_blob_dir(blob_dir)
                .with_draft_ttl(config.draft_ttl)
        }
        BackendKind::Rest => {
            let rest = RestConfig {
                url: config.backend_url.clone().unwrap_or_default(),
                api_key: config.backend_key.clone().unwrap_or_default(),
                bucket: config.bucket.clone(),
            };
            tracing::info!(url = %rest.url, bucket = %rest.bucket, "using hosted backend");
            let store = ComicStore::new(Arc::new(RestBackend::new(rest)), config.id_style);
            AppState::new(store, public_base_url.clone(), config.autosave)
                .with_draft_ttl(config.draft_ttl)
        }
    };

    let app = create_router(Arc::new(state));
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    tracing::info!(bind = %config.bind, url = %public_base_url, "comicstrip listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
