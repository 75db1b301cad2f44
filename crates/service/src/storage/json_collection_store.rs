use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tokio::{fs, io::AsyncWriteExt, sync::Mutex};
use uuid::Uuid;

use super::bootstrap::Bootstrap;
use crate::errors::StoreError;

/// Outcome of a [`JsonCollectionStore::mutate`] closure.
pub enum Mutation<R> {
    /// Persist the mutated collection, then return the value.
    Commit(R),
    /// Return the value without writing anything.
    Skip(R),
}

/// Generic JSON file-backed collection store.
///
/// The whole collection is a JSON array in a single file, read and written
/// wholesale on every operation. Writes go to a temporary sibling and are
/// renamed over the target, so a reader sees either the previous or the new
/// array and never a torn one. Mutations hold `write_lock` for the entire
/// read-modify-write cycle; reads do not take it.
///
/// Only one process may own a given file.
pub struct JsonCollectionStore<T> {
    file_path: PathBuf,
    bootstrap: Bootstrap,
    write_lock: Mutex<()>,
    _item: PhantomData<fn() -> T>,
}

impl<T> JsonCollectionStore<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    /// Create a handle without touching the filesystem; the file is prepared
    /// lazily by the first operation (or eagerly via [`Self::init`]).
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            file_path: path.into(),
            bootstrap: Bootstrap::new(),
            write_lock: Mutex::new(()),
            _item: PhantomData,
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Ensure the directory and an empty collection exist. Idempotent.
    pub async fn init(&self) -> Result<(), StoreError> {
        self.bootstrap.ensure(&self.file_path).await
    }

    /// Read the whole collection as last persisted.
    pub async fn load(&self) -> Result<Vec<T>, StoreError> {
        self.init().await?;
        read_collection(&self.file_path).await
    }

    /// Serialized read-modify-write. An `Err` from `f` or a [`Mutation::Skip`]
    /// leaves the file untouched.
    pub async fn mutate<R, F>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut Vec<T>) -> Result<Mutation<R>, StoreError>,
    {
        self.init().await?;
        let _guard = self.write_lock.lock().await;
        let mut items = read_collection(&self.file_path).await?;
        match f(&mut items)? {
            Mutation::Skip(out) => Ok(out),
            Mutation::Commit(out) => {
                write_collection(&self.file_path, &items).await?;
                Ok(out)
            }
        }
    }
}

/// Missing or blank file reads as an empty collection; anything else that
/// does not parse is `MalformedState`.
async fn read_collection<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::storage(path, e)),
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    serde_json::from_slice(&bytes).map_err(|e| StoreError::malformed(path, e))
}

async fn write_collection<T: Serialize>(path: &Path, items: &[T]) -> Result<(), StoreError> {
    let data = serde_json::to_vec_pretty(items).map_err(|e| StoreError::storage(path, e))?;
    let tmp = temp_sibling(path);

    let written = async {
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp, path).await
    }
    .await;

    if let Err(e) = written {
        let _ = fs::remove_file(&tmp).await;
        return Err(StoreError::storage(path, e));
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "collection".to_string());
    path.with_file_name(format!(".{name}.{}.tmp", Uuid::new_v4()))
}
