//! OpenAPI document loading for v2 and v3 documents.
//!
//! Documents are parsed into `serde_json::Value`, local `$ref`s are expanded, and
//! each operation is reduced to an [`Operation`]: declared parameters with their
//! primitive types, raw response objects, and merged `produces`.

mod build;
mod load;
mod types;

pub use build::*;
pub use load::*;
pub use types::*;
