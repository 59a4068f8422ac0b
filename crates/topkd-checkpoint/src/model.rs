//! Blob-level reads and writes of checkpoint artifacts.
//!
//! All artifacts are JSON. The manifest lives under a single well-known
//! key and is overwritten in place; content blobs carry the offset in
//! their name so each checkpoint generation gets fresh keys.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use topkd_core::RankedItem;

use crate::storage::BlobStorage;
use crate::CheckpointError;

/// Key of the manifest blob, the single source of truth for which blob
/// generation is current.
pub const MANIFEST_KEY: &str = "manifest.json";

/// Pointer to the current checkpoint generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointManifest {
    pub last_offset: i64,
    pub counters_blob_file_name: String,
    pub all_time_items_file_name: String,
}

/// Reads and writes manifest and content blobs through the storage
/// collaborator. The only component that touches blob encoding.
pub struct CheckPointerModel {
    storage: Arc<dyn BlobStorage>,
}

impl CheckPointerModel {
    pub fn new(storage: Arc<dyn BlobStorage>) -> Self {
        Self { storage }
    }

    pub async fn read_manifest(&self) -> Result<CheckpointManifest, CheckpointError> {
        let data = self.storage.download(MANIFEST_KEY).await?;
        serde_json::from_slice(&data).map_err(|source| CheckpointError::Decode {
            what: "manifest",
            source,
        })
    }

    pub async fn write_manifest(
        &self,
        manifest: &CheckpointManifest,
    ) -> Result<(), CheckpointError> {
        let data = serde_json::to_vec(manifest).map_err(|source| CheckpointError::Encode {
            what: "manifest",
            source,
        })?;
        self.storage.upload(MANIFEST_KEY, data).await?;
        Ok(())
    }

    pub async fn read_counters(
        &self,
        blob_file_name: &str,
    ) -> Result<HashMap<String, i64>, CheckpointError> {
        let data = self.storage.download(blob_file_name).await?;
        serde_json::from_slice(&data).map_err(|source| CheckpointError::Decode {
            what: "counters blob",
            source,
        })
    }

    pub async fn write_counters(
        &self,
        blob_file_name: &str,
        counters: &HashMap<String, i64>,
    ) -> Result<(), CheckpointError> {
        let data = serde_json::to_vec(counters).map_err(|source| CheckpointError::Encode {
            what: "counters blob",
            source,
        })?;
        self.storage.upload(blob_file_name, data).await?;
        Ok(())
    }

    pub async fn read_items(
        &self,
        blob_file_name: &str,
    ) -> Result<Vec<RankedItem>, CheckpointError> {
        let data = self.storage.download(blob_file_name).await?;
        serde_json::from_slice(&data).map_err(|source| CheckpointError::Decode {
            what: "items blob",
            source,
        })
    }

    pub async fn write_items(
        &self,
        blob_file_name: &str,
        items: &[RankedItem],
    ) -> Result<(), CheckpointError> {
        let data = serde_json::to_vec(items).map_err(|source| CheckpointError::Encode {
            what: "items blob",
            source,
        })?;
        self.storage.upload(blob_file_name, data).await?;
        Ok(())
    }
}
