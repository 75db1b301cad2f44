pub mod documents;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use common::types::Health;

use crate::metrics;
use crate::state::AppState;

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn metrics_handler() -> (axum::http::StatusCode, String) {
    metrics::encode_metrics()
}

/// Build the full application router: health, metrics and the document API.
pub fn build_router(state: AppState, cors: CorsLayer, body_limit: usize) -> Router {
    metrics::register();

    let public = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler));

    let api = Router::new()
        .route("/api/documents", get(documents::list_documents))
        .route("/api/documents/upload", post(documents::upload_document))
        .route("/api/documents/:id", get(documents::get_document))
        .route("/api/documents/:id/sign", post(documents::sign_document))
        .route("/api/documents/:id/download", get(documents::download_document))
        .with_state(state);

    public
        .merge(api)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                // 5xx responses are logged at ERROR
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use service::documents::{DocumentPatch, DocumentStore};
    use service::signing::PdfSignatureCompositor;
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn app() -> (Router, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!("docsign_router_{}", Uuid::new_v4()));
        let state = AppState::new(
            Arc::new(DocumentStore::new(&dir)),
            Arc::new(PdfSignatureCompositor::default()),
            &dir,
        );
        (build_router(state, CorsLayer::very_permissive(), 1024 * 1024), dir)
    }

    #[tokio::test]
    async fn health_reports_ok() -> anyhow::Result<()> {
        let (app, _dir) = app();
        let res = app.oneshot(Request::builder().uri("/health").body(Body::empty())?).await?;
        assert_eq!(res.status(), StatusCode::OK);
        let body = to_bytes(res.into_body(), usize::MAX).await?;
        let json: serde_json::Value = serde_json::from_slice(&body)?;
        assert_eq!(json["status"], "ok");
        Ok(())
    }

    #[tokio::test]
    async fn metrics_lists_document_counters() -> anyhow::Result<()> {
        let (app, _dir) = app();
        let res = app.oneshot(Request::builder().uri("/metrics").body(Body::empty())?).await?;
        assert_eq!(res.status(), StatusCode::OK);
        let body = to_bytes(res.into_body(), usize::MAX).await?;
        let text = String::from_utf8(body.to_vec())?;
        assert!(text.contains("docsign_documents_uploaded_total"));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_and_malformed_ids_are_not_found() -> anyhow::Result<()> {
        let (app, dir) = app();
        for uri in [
            format!("/api/documents/{}", Uuid::new_v4()),
            "/api/documents/not-a-uuid".to_string(),
            format!("/api/documents/{}/download", Uuid::new_v4()),
        ] {
            let res = app.clone().oneshot(Request::builder().uri(uri).body(Body::empty())?).await?;
            assert_eq!(res.status(), StatusCode::NOT_FOUND);
        }
        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn pending_record_is_not_downloadable_even_with_a_file_name() -> anyhow::Result<()> {
        let dir = std::env::temp_dir().join(format!("docsign_router_{}", Uuid::new_v4()));
        let store = DocumentStore::open(&dir).await?;
        let rec = store.create("doc.pdf", "1-ab12-doc.pdf").await?;
        let draft = DocumentPatch {
            status: None,
            signed_file_name: Some("draft.pdf".into()),
        };
        store.update(rec.id, draft).await?;
        tokio::fs::write(dir.join("draft.pdf"), b"%PDF").await?;

        let state = AppState::new(store, Arc::new(PdfSignatureCompositor::default()), &dir);
        let app = build_router(state, CorsLayer::very_permissive(), 1024 * 1024);
        let uri = format!("/api/documents/{}/download", rec.id);
        let res = app.oneshot(Request::builder().uri(uri).body(Body::empty())?).await?;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    }
}
