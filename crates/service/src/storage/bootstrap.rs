//! One-time preparation of a collection file.
//!
//! `initialize_collection` is idempotent on its own: the file is opened with
//! create-new semantics, so when several callers race only one writes the
//! empty collection and the rest see `AlreadyExists`. [`Bootstrap`] adds a
//! per-store latch so the filesystem is touched at most once per handle.

use std::io::ErrorKind;
use std::path::Path;

use tokio::{fs, io::AsyncWriteExt, sync::OnceCell};

use crate::errors::StoreError;

const EMPTY_COLLECTION: &[u8] = b"[]";

/// Ensure the parent directory and the collection file exist.
///
/// Returns `true` when this call created the file, `false` when it was
/// already present (its content is never touched).
pub async fn initialize_collection(file_path: &Path) -> Result<bool, StoreError> {
    if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| StoreError::storage(parent, e))?;
    }

    let mut file = match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(file_path)
        .await
    {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(StoreError::storage(file_path, e)),
    };
    file.write_all(EMPTY_COLLECTION)
        .await
        .map_err(|e| StoreError::storage(file_path, e))?;
    file.sync_all()
        .await
        .map_err(|e| StoreError::storage(file_path, e))?;
    Ok(true)
}

/// Latch guaranteeing a single successful initialization per store handle.
/// A failed attempt leaves the latch open so the next operation retries.
#[derive(Debug, Default)]
pub struct Bootstrap {
    ready: OnceCell<()>,
}

impl Bootstrap {
    pub fn new() -> Self {
        Self { ready: OnceCell::new() }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.initialized()
    }

    pub async fn ensure(&self, file_path: &Path) -> Result<(), StoreError> {
        self.ready
            .get_or_try_init(|| async {
                initialize_collection(file_path).await?;
                Ok::<(), StoreError>(())
            })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use uuid::Uuid;

    fn temp_file() -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("docsign_bootstrap_{}", Uuid::new_v4()))
            .join("nested")
            .join("documents.json")
    }

    #[tokio::test]
    async fn creates_parents_and_empty_collection() -> anyhow::Result<()> {
        let path = temp_file();
        assert!(initialize_collection(&path).await?);
        assert_eq!(fs::read(&path).await?, b"[]");

        let _ = fs::remove_dir_all(path.parent().unwrap().parent().unwrap()).await;
        Ok(())
    }

    #[tokio::test]
    async fn second_call_leaves_existing_content_untouched() -> anyhow::Result<()> {
        let path = temp_file();
        assert!(initialize_collection(&path).await?);
        fs::write(&path, br#"[{"kept":true}]"#).await?;

        assert!(!initialize_collection(&path).await?);
        assert_eq!(fs::read(&path).await?, br#"[{"kept":true}]"#);

        let _ = fs::remove_dir_all(path.parent().unwrap().parent().unwrap()).await;
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_initializers_create_exactly_once() -> anyhow::Result<()> {
        let path = Arc::new(temp_file());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let path = Arc::clone(&path);
            handles.push(tokio::spawn(async move { initialize_collection(&path).await }));
        }
        let mut created = 0;
        for h in handles {
            if h.await?? {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(fs::read(path.as_path()).await?, b"[]");

        let _ = fs::remove_dir_all(path.parent().unwrap().parent().unwrap()).await;
        Ok(())
    }

    #[tokio::test]
    async fn latch_reports_ready_after_first_success() -> anyhow::Result<()> {
        let path = temp_file();
        let bootstrap = Bootstrap::new();
        assert!(!bootstrap.is_ready());
        bootstrap.ensure(&path).await?;
        bootstrap.ensure(&path).await?;
        assert!(bootstrap.is_ready());

        let _ = fs::remove_dir_all(path.parent().unwrap().parent().unwrap()).await;
        Ok(())
    }
}
