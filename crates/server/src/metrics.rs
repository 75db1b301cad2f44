use axum::http::StatusCode;
use once_cell::sync::Lazy;
use prometheus::{register_int_counter, Encoder, IntCounter, TextEncoder};

// Prometheus metrics (default registry)
pub static DOCUMENTS_UPLOADED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "docsign_documents_uploaded_total",
        "Total documents registered through upload"
    )
    .expect("register documents_uploaded_total")
});

pub static DOCUMENTS_SIGNED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "docsign_documents_signed_total",
        "Total documents signed"
    )
    .expect("register documents_signed_total")
});

pub static DOCUMENTS_DOWNLOADED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "docsign_documents_downloaded_total",
        "Total signed documents downloaded"
    )
    .expect("register documents_downloaded_total")
});

pub static STORE_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "docsign_store_failures_total",
        "Total requests failed by the document store"
    )
    .expect("register store_failures_total")
});

/// Register every counter so `/metrics` lists them before first use.
pub fn register() {
    Lazy::force(&DOCUMENTS_UPLOADED_TOTAL);
    Lazy::force(&DOCUMENTS_SIGNED_TOTAL);
    Lazy::force(&DOCUMENTS_DOWNLOADED_TOTAL);
    Lazy::force(&STORE_FAILURES_TOTAL);
}

pub fn encode_metrics() -> (StatusCode, String) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (StatusCode::INTERNAL_SERVER_ERROR, format!("metrics encode error: {e}"));
    }
    (StatusCode::OK, String::from_utf8(buffer).unwrap_or_default())
}
