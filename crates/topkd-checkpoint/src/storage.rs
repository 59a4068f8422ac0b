//! Blob storage abstraction for checkpoint artifacts.
//!
//! Implementations:
//! - `OpenDalStorage` (filesystem, S3, in-memory via OpenDAL)
//! - test doubles in this workspace's test code

use async_trait::async_trait;
use opendal::Operator;

/// Errors from a blob storage backend. "Not found" is distinguished
/// because the checkpointer treats a missing manifest as a cold start.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("blob {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Storage abstraction for reading and writing checkpoint blobs.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Write `data` under `key`, replacing any existing blob.
    async fn upload(&self, key: &str, data: Vec<u8>) -> Result<(), StorageError>;

    /// Read the blob stored under `key`.
    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError>;
}

/// Unified storage backend over an OpenDAL operator.
#[derive(Clone)]
pub struct OpenDalStorage {
    operator: Operator,
}

impl OpenDalStorage {
    pub fn new(operator: Operator) -> Self {
        Self { operator }
    }

    /// Storage rooted in a local directory.
    #[cfg(feature = "services-fs")]
    pub fn new_fs(root: &str) -> anyhow::Result<Self> {
        use opendal::services;

        let builder = services::Fs::default().root(root);
        let operator = Operator::new(builder)?.finish();
        Ok(Self { operator })
    }

    /// Storage in an S3 bucket (or any S3-compatible endpoint).
    #[cfg(feature = "services-s3")]
    pub fn new_s3(bucket: &str, region: &str, endpoint: Option<&str>) -> anyhow::Result<Self> {
        use opendal::services;

        let mut builder = services::S3::default().bucket(bucket).region(region);
        if let Some(ep) = endpoint {
            builder = builder.endpoint(ep);
        }

        let operator = Operator::new(builder)?.finish();
        Ok(Self { operator })
    }

    /// Ephemeral in-memory storage, for tests and local experiments.
    #[cfg(any(test, feature = "services-memory"))]
    pub fn new_memory() -> anyhow::Result<Self> {
        use opendal::services;

        let operator = Operator::new(services::Memory::default())?.finish();
        Ok(Self { operator })
    }
}

#[async_trait]
impl BlobStorage for OpenDalStorage {
    async fn upload(&self, key: &str, data: Vec<u8>) -> Result<(), StorageError> {
        self.operator
            .write(key, data)
            .await
            .map_err(|e| StorageError::Other(e.into()))?;
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        match self.operator.read(key).await {
            Ok(data) => Ok(data.to_vec()),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(StorageError::Other(e.into())),
        }
    }
}
