use std::sync::Arc;

use axum::Router;
use configs::AppConfig;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::routes;
use crate::state::AppState;
use service::{documents::DocumentStore, signing::PdfSignatureCompositor};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Prepare directories and the document store, then assemble the router.
pub async fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    let dirs = [cfg.storage.upload_dir.as_str(), cfg.storage.store_dir.as_str()];
    common::env::ensure_dirs(&dirs).await?;

    let documents = DocumentStore::open(cfg.storage.store_path()).await?;
    info!(
        event = "store_ready",
        collection = %documents.file_path().display(),
        "document store initialized"
    );

    let state = AppState::new(
        documents,
        Arc::new(PdfSignatureCompositor::default()),
        cfg.storage.upload_path(),
    );
    Ok(routes::build_router(state, build_cors(), cfg.server.body_limit_bytes))
}

/// Public entry: build the app and run the HTTP server
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let app = build_app(&cfg).await?;

    let addr = cfg.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %listener.local_addr()?, upload_dir = %cfg.storage.upload_dir, "docsign server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
