//! In-memory blob store.

use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;
use remote::{BlobError, BlobHandle, BlobStore};

#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, path: &str, bytes: &[u8]) -> Result<BlobHandle, BlobError> {
        let mut blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        blobs.insert(path.to_string(), bytes.to_vec());
        Ok(BlobHandle {
            path: path.to_string(),
        })
    }

    async fn retrieval_url(&self, handle: &BlobHandle) -> Result<String, BlobError> {
        let blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        if !blobs.contains_key(&handle.path) {
            return Err(BlobError::Resolve(handle.path.clone()));
        }
        Ok(format!("memory://{}", handle.path))
    }
}
