//! Blob store interface.

use async_trait::async_trait;

use crate::error::BlobError;

/// Opaque reference to an uploaded blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobHandle {
    pub path: String,
}

/// Narrow interface to the blob store. Uploads and URL resolution are the
/// only operations the core needs; blob lifecycle (deletion, garbage
/// collection) is out of scope and orphaned blobs are accepted.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, path: &str, bytes: &[u8]) -> Result<BlobHandle, BlobError>;

    async fn retrieval_url(&self, handle: &BlobHandle) -> Result<String, BlobError>;
}
