//! Document metadata: records, typed patches and the file-backed store.

pub mod model;
pub mod repository;
pub mod store;

pub use model::{DocumentPatch, DocumentRecord, DocumentStatus};
pub use repository::DocumentRepository;
pub use store::{DocumentStore, COLLECTION_FILE};
