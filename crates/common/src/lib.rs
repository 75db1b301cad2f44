//! Shared plumbing for the docsign workspace: logging setup, runtime
//! directory checks and the small DTOs every HTTP surface returns.

pub mod env;
pub mod types;
pub mod utils;
