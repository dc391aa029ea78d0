use std::{
    collections::HashMap,
    path::PathBuf,
    sync::Arc,
};

use async_trait::async_trait;
use tokio::{fs, sync::RwLock};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    store::StoreResult,
};

/// Content types accepted as payment screenshots, with the file extension used on disk.
const ACCEPTED_TYPES: [(&str, &str); 4] = [
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/webp", "webp"),
];

/// Payment proof uploaded by a customer for a wallet payment.
#[derive(Debug, Clone)]
pub struct EvidenceUpload {
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub transaction_id: Option<String>,
}

impl EvidenceUpload {
    /// Rejects blobs that are empty, too large, or not an accepted image type.
    pub fn validate(&self, max_bytes: usize) -> AppResult<&'static str> {
        let content_type = self.content_type.trim().to_ascii_lowercase();
        let extension = ACCEPTED_TYPES
            .iter()
            .find(|(accepted, _)| *accepted == content_type)
            .map(|(_, ext)| *ext)
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "unsupported evidence type `{}`; upload a PNG, JPEG or WebP image",
                    self.content_type
                ))
            })?;

        if self.bytes.is_empty() {
            return Err(AppError::Validation("evidence file is empty".into()));
        }
        if self.bytes.len() > max_bytes {
            return Err(AppError::Validation(format!(
                "evidence file is {} bytes; the limit is {} bytes",
                self.bytes.len(),
                max_bytes
            )));
        }
        Ok(extension)
    }
}

/// Blob storage for payment evidence. Returns an opaque reference.
#[async_trait]
pub trait EvidenceStore: Send + Sync {
    async fn put(&self, order_id: Uuid, extension: &str, bytes: &[u8]) -> StoreResult<String>;

    /// Deletes a blob that no payment ended up referencing.
    async fn remove(&self, reference: &str) -> StoreResult<()>;
}

/// Writes evidence files under a directory on local disk.
#[derive(Debug, Clone)]
pub struct LocalEvidenceStore {
    root: PathBuf,
}

impl LocalEvidenceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl EvidenceStore for LocalEvidenceStore {
    async fn put(&self, order_id: Uuid, extension: &str, bytes: &[u8]) -> StoreResult<String> {
        fs::create_dir_all(&self.root).await?;
        let file_name = format!("{order_id}-{}.{extension}", Uuid::new_v4().simple());
        fs::write(self.root.join(&file_name), bytes).await?;
        Ok(file_name)
    }

    async fn remove(&self, reference: &str) -> StoreResult<()> {
        fs::remove_file(self.root.join(reference)).await?;
        Ok(())
    }
}

/// Keeps evidence blobs in memory; used by tests and local runs.
#[derive(Debug, Default, Clone)]
pub struct InMemoryEvidenceStore {
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemoryEvidenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, reference: &str) -> Option<Vec<u8>> {
        self.blobs.read().await.get(reference).cloned()
    }

    pub async fn blob_count(&self) -> usize {
        self.blobs.read().await.len()
    }
}

#[async_trait]
impl EvidenceStore for InMemoryEvidenceStore {
    async fn put(&self, order_id: Uuid, extension: &str, bytes: &[u8]) -> StoreResult<String> {
        let reference = format!("mem://{order_id}/{}.{extension}", Uuid::new_v4().simple());
        self.blobs
            .write()
            .await
            .insert(reference.clone(), bytes.to_vec());
        Ok(reference)
    }

    async fn remove(&self, reference: &str) -> StoreResult<()> {
        self.blobs.write().await.remove(reference);
        Ok(())
    }
}
