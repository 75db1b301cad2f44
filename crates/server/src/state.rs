use std::path::PathBuf;
use std::sync::Arc;

use service::documents::DocumentRepository;
use service::signing::SignatureCompositor;

/// Shared handler state: metadata store, compositor and the artifact directory.
#[derive(Clone)]
pub struct AppState {
    pub documents: Arc<dyn DocumentRepository>,
    pub compositor: Arc<dyn SignatureCompositor>,
    pub upload_dir: PathBuf,
}

impl AppState {
    pub fn new(
        documents: Arc<dyn DocumentRepository>,
        compositor: Arc<dyn SignatureCompositor>,
        upload_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            documents,
            compositor,
            upload_dir: upload_dir.into(),
        }
    }

    pub fn artifact_path(&self, file_name: &str) -> PathBuf {
        self.upload_dir.join(file_name)
    }
}
