//! Response descriptors and the per-operation response builder.

mod builder;
mod descriptor;

pub use builder::{ResponseBuilder, StatusResponse};
pub use descriptor::{ContentEntry, HeaderVec, ResolvedResponse, ResponseDescriptor, MAX_INLINE_HEADERS};
