//! In-memory backends for the collaborator interfaces in `remote`.
//!
//! Used as the local deployment target and by the test suites. Semantics
//! mirror the hosted collaborators: full-result-set pushes, server-assigned
//! monotonic creation timestamps, store-level ordering.

mod blob;
mod identity;
mod store;

pub use blob::MemoryBlobStore;
pub use identity::MemoryIdentityProvider;
pub use store::MemoryStore;
