use async_trait::async_trait;
use uuid::Uuid;

use crate::documents::model::{DocumentPatch, DocumentRecord};
use crate::errors::StoreError;

/// Trait abstraction for document metadata storage.
/// `Ok(None)` means "no such document" and is not an error.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn create(
        &self,
        original_name: &str,
        stored_file_name: &str,
    ) -> Result<DocumentRecord, StoreError>;
    async fn get(&self, id: Uuid) -> Result<Option<DocumentRecord>, StoreError>;
    async fn update(
        &self,
        id: Uuid,
        patch: DocumentPatch,
    ) -> Result<Option<DocumentRecord>, StoreError>;
    async fn list(&self) -> Result<Vec<DocumentRecord>, StoreError>;
}
