//! Service layer for docsign.
//! - `documents`: document metadata records and the file-backed store.
//! - `storage`: generic JSON collection persistence and its bootstrap.
//! - `signing`: signature decoding and PDF compositing.

pub mod documents;
pub mod errors;
pub mod signing;
pub mod storage;
