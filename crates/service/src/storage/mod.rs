//! Storage abstractions for the service layer
//!
//! File-backed JSON collections plus the bootstrap step that prepares them.

pub mod bootstrap;
pub mod json_collection_store;

pub use bootstrap::{initialize_collection, Bootstrap};
pub use json_collection_store::{JsonCollectionStore, Mutation};
