use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::documents::model::{DocumentPatch, DocumentRecord};
use crate::documents::repository::DocumentRepository;
use crate::errors::StoreError;
use crate::storage::{JsonCollectionStore, Mutation};

/// File name of the collection inside the store directory.
pub const COLLECTION_FILE: &str = "documents.json";

/// File-backed document metadata store (`<dir>/documents.json`).
///
/// `create` and `update` are serialized by the underlying collection store,
/// so concurrent requests in one process never lose each other's writes.
/// `get` and `list` read the last committed collection without locking.
pub struct DocumentStore {
    collection: JsonCollectionStore<DocumentRecord>,
}

impl DocumentStore {
    /// Build a handle for `dir`; storage is prepared on first use.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self { collection: JsonCollectionStore::new(dir.as_ref().join(COLLECTION_FILE)) }
    }

    /// Build a handle and run the bootstrap eagerly.
    pub async fn open<P: AsRef<Path>>(dir: P) -> Result<Arc<Self>, StoreError> {
        let store = Self::new(dir);
        store.init().await?;
        Ok(Arc::new(store))
    }

    pub async fn init(&self) -> Result<(), StoreError> {
        self.collection.init().await
    }

    pub fn file_path(&self) -> PathBuf {
        self.collection.file_path().to_path_buf()
    }

    /// Register a freshly uploaded document as `Pending`.
    pub async fn create(
        &self,
        original_name: &str,
        stored_file_name: &str,
    ) -> Result<DocumentRecord, StoreError> {
        self.collection
            .mutate(|docs| {
                let mut id = Uuid::new_v4();
                while docs.iter().any(|d| d.id == id) {
                    id = Uuid::new_v4();
                }
                let rec = DocumentRecord::new(id, original_name, stored_file_name, Utc::now());
                docs.push(rec.clone());
                Ok(Mutation::Commit(rec))
            })
            .await
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<DocumentRecord>, StoreError> {
        let docs = self.collection.load().await?;
        Ok(docs.into_iter().find(|d| d.id == id))
    }

    /// Merge `patch` into the record with `id`. Unknown ids return `Ok(None)`
    /// and write nothing, whatever the patch holds.
    pub async fn update(
        &self,
        id: Uuid,
        patch: DocumentPatch,
    ) -> Result<Option<DocumentRecord>, StoreError> {
        self.collection
            .mutate(|docs| {
                let Some(rec) = docs.iter_mut().find(|d| d.id == id) else {
                    return Ok(Mutation::Skip(None));
                };
                patch.apply(rec, Utc::now())?;
                Ok(Mutation::Commit(Some(rec.clone())))
            })
            .await
    }

    /// All records in creation order.
    pub async fn list(&self) -> Result<Vec<DocumentRecord>, StoreError> {
        self.collection.load().await
    }
}

#[async_trait::async_trait]
impl DocumentRepository for DocumentStore {
    async fn create(
        &self,
        original_name: &str,
        stored_file_name: &str,
    ) -> Result<DocumentRecord, StoreError> {
        self.create(original_name, stored_file_name).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<DocumentRecord>, StoreError> {
        self.get(id).await
    }

    async fn update(
        &self,
        id: Uuid,
        patch: DocumentPatch,
    ) -> Result<Option<DocumentRecord>, StoreError> {
        self.update(id, patch).await
    }

    async fn list(&self) -> Result<Vec<DocumentRecord>, StoreError> {
        self.list().await
    }
}
