//! Session layer: the driver boundary and the session handle.

pub mod backend;
#[allow(clippy::module_inception)]
mod session;

pub use backend::{DataSetMeta, ExecuteReply, FetchChunk, SessionBackend, SharedBackend};
pub use session::Session;
