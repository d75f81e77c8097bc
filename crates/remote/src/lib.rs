//! Narrow interfaces to the external collaborators: the document store,
//! the identity provider and the blob store.
//!
//! The sync engine consumes these traits only; concrete backends live in
//! their own crates (`local-store` provides the in-memory one).

mod blob;
mod error;
mod identity;
pub mod shapes;
mod store;

pub use blob::{BlobHandle, BlobStore};
pub use error::{AuthError, BlobError, StoreError};
pub use identity::{Identity, IdentityProvider};
pub use shapes::Shape;
pub use store::{
    CollectionPath, Direction, DocSubscription, Document, DocumentSnapshot, DocumentStore, OrderBy,
    Query, SnapshotSet, Subscription, is_server_timestamp, server_timestamp,
};
