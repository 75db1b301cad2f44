use std::io::ErrorKind;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use service::documents::{DocumentPatch, DocumentRecord};
use service::signing::decode_signature_data;
use tokio::io::AsyncWriteExt;
use tracing::info;
use uuid::Uuid;

use crate::errors::JsonApiError;
use crate::metrics;
use crate::state::AppState;

const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: String,
    pub document_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRequest {
    pub signature_data: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignResponse {
    pub message: String,
    pub signed_document_url: String,
}

/// Keep only the final path component, restricted to `[A-Za-z0-9._-]`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "document".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Short random tag that keeps artifact names distinct within one millisecond.
pub fn artifact_token() -> String {
    let mut token = Uuid::new_v4().simple().to_string();
    token.truncate(12);
    token
}

/// `<unix-millis>-<token>-<sanitized original name>`
pub fn stored_file_name(original_name: &str, millis: i64, token: &str) -> String {
    format!("{}-{}-{}", millis, token, sanitize_file_name(original_name))
}

/// `signed-<token>-<stored name>`; each signing attempt writes its own file.
pub fn signed_file_name(stored_file_name: &str, token: &str) -> String {
    format!("signed-{token}-{stored_file_name}")
}

/// Write `data` to a file that must not exist yet. A partial file is removed.
async fn write_new_artifact(path: &std::path::Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    let written = async {
        file.write_all(data).await?;
        file.sync_all().await
    }
    .await;
    if written.is_err() {
        let _ = tokio::fs::remove_file(path).await;
    }
    written
}

/// Unparseable ids can never match a record, so they are plain 404s.
fn parse_id(raw: &str, not_found: &str) -> Result<Uuid, JsonApiError> {
    Uuid::parse_str(raw).map_err(|_| JsonApiError::not_found(not_found))
}

/// Accept a multipart `file` field, store it and register the document.
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, JsonApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| JsonApiError::bad_request("Invalid multipart body", Some(e.to_string())))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let original_name = field.file_name().unwrap_or("document.pdf").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| JsonApiError::bad_request("Invalid multipart body", Some(e.to_string())))?;

        let millis = Utc::now().timestamp_millis();
        let stored = stored_file_name(&original_name, millis, &artifact_token());
        let stored_path = state.artifact_path(&stored);
        write_new_artifact(&stored_path, &data)
            .await
            .map_err(JsonApiError::internal)?;

        let doc = match state.documents.create(&original_name, &stored).await {
            Ok(doc) => doc,
            Err(e) => {
                let _ = tokio::fs::remove_file(&stored_path).await;
                return Err(e.into());
            }
        };
        metrics::DOCUMENTS_UPLOADED_TOTAL.inc();
        info!(
            event = "document_uploaded",
            document_id = %doc.id,
            original_name = %doc.original_name,
            stored_file_name = %doc.stored_file_name,
            size = data.len(),
            "document uploaded"
        );
        return Ok(Json(UploadResponse {
            message: "File uploaded successfully".into(),
            document_id: doc.id,
        }));
    }

    Err(JsonApiError::bad_request("No file uploaded", None))
}

pub async fn list_documents(
    State(state): State<AppState>,
) -> Result<Json<Vec<DocumentRecord>>, JsonApiError> {
    Ok(Json(state.documents.list().await?))
}

pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentRecord>, JsonApiError> {
    let id = parse_id(&id, "Document not found")?;
    state
        .documents
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| JsonApiError::not_found("Document not found"))
}

/// Stamp the signature on the stored PDF, write it under a fresh signed name
/// and mark the record Signed.
///
/// The store update picks the winner among concurrent attempts; a losing
/// attempt removes the file it wrote, so the record always names the bytes
/// of the request that got 200.
pub async fn sign_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SignRequest>,
) -> Result<Json<SignResponse>, JsonApiError> {
    let id = parse_id(&id, "Document not found")?;
    let doc = state
        .documents
        .get(id)
        .await?
        .ok_or_else(|| JsonApiError::not_found("Document not found"))?;
    if doc.is_signed() {
        return Err(JsonApiError::conflict("Document already signed", None));
    }

    let signature = decode_signature_data(&req.signature_data)?;
    let original = tokio::fs::read(state.artifact_path(&doc.stored_file_name))
        .await
        .map_err(JsonApiError::internal)?;

    let compositor = Arc::clone(&state.compositor);
    let signed = tokio::task::spawn_blocking(move || compositor.compose(&original, &signature))
        .await
        .map_err(JsonApiError::internal)??;

    let signed_name = signed_file_name(&doc.stored_file_name, &artifact_token());
    let signed_path = state.artifact_path(&signed_name);
    write_new_artifact(&signed_path, &signed)
        .await
        .map_err(JsonApiError::internal)?;

    let updated = match state.documents.update(id, DocumentPatch::signed(signed_name)).await {
        Ok(Some(updated)) => updated,
        outcome => {
            let _ = tokio::fs::remove_file(&signed_path).await;
            return Err(match outcome {
                Err(e) => e.into(),
                Ok(_) => JsonApiError::not_found("Document not found"),
            });
        }
    };
    metrics::DOCUMENTS_SIGNED_TOTAL.inc();
    info!(
        event = "document_signed",
        document_id = %updated.id,
        signed_file_name = updated.signed_file_name.as_deref().unwrap_or_default(),
        size = signed.len(),
        "document signed"
    );

    Ok(Json(SignResponse {
        message: "Document signed successfully".into(),
        signed_document_url: format!("/api/documents/{id}/download"),
    }))
}

/// Serve the signed artifact; unknown or unsigned documents are 404.
pub async fn download_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, JsonApiError> {
    const NOT_FOUND: &str = "Signed document not found";
    let id = parse_id(&id, NOT_FOUND)?;
    let doc = state
        .documents
        .get(id)
        .await?
        .ok_or_else(|| JsonApiError::not_found(NOT_FOUND))?;
    let signed = doc
        .signed_file_name
        .as_deref()
        .filter(|_| doc.is_signed())
        .ok_or_else(|| JsonApiError::not_found(NOT_FOUND))?;

    let bytes = match tokio::fs::read(state.artifact_path(signed)).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(JsonApiError::not_found(NOT_FOUND)),
        Err(e) => return Err(JsonApiError::internal(e)),
    };
    metrics::DOCUMENTS_DOWNLOADED_TOTAL.inc();
    info!(
        event = "document_downloaded",
        document_id = %doc.id,
        size = bytes.len(),
        "signed document downloaded"
    );

    let disposition = format!(
        "attachment; filename=\"signed-{}\"",
        sanitize_file_name(&doc.original_name)
    );
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_uploaded_names() {
        assert_eq!(sanitize_file_name("doc.pdf"), "doc.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\my file.pdf"), "my_file.pdf");
        assert_eq!(sanitize_file_name("..."), "document");
        assert_eq!(sanitize_file_name(""), "document");
    }

    #[test]
    fn derives_artifact_names() {
        let stored = stored_file_name("doc.pdf", 1700, "ab12");
        assert_eq!(stored, "1700-ab12-doc.pdf");
        assert_eq!(signed_file_name(&stored, "cd34"), "signed-cd34-1700-ab12-doc.pdf");
    }

    #[test]
    fn tokens_differ_between_calls() {
        let a = artifact_token();
        assert_eq!(a.len(), 12);
        assert_ne!(a, artifact_token());
        assert_ne!(
            stored_file_name("doc.pdf", 1, &a),
            stored_file_name("doc.pdf", 1, &artifact_token())
        );
    }

    #[tokio::test]
    async fn new_artifacts_never_replace_existing_files() -> anyhow::Result<()> {
        let dir = std::env::temp_dir().join(format!("docsign_artifact_{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join("1-ab12-doc.pdf");

        write_new_artifact(&path, b"first").await?;
        let err = write_new_artifact(&path, b"second").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(tokio::fs::read(&path).await?, b"first");

        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    }
}
