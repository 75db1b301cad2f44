//! Signature compositing: decoding the signature payload and stamping it
//! onto the first page of a PDF.

pub mod compositor;
pub mod signature;

pub use compositor::{Placement, PdfSignatureCompositor, SignError, SignatureCompositor};
pub use signature::decode_signature_data;
