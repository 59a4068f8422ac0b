//! Restore/dump orchestration over the checkpoint model.

use tracing::info;
use topkd_core::{Counters, SharedTopKItems, GET_ALL_ITEMS_LIMIT};

use crate::model::{CheckPointerModel, CheckpointManifest};
use crate::storage::StorageError;
use crate::CheckpointError;

/// What a restore found. Carrying this explicitly avoids overloading
/// `last_offset == 0`, which is also a real event-log offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// No manifest exists yet; state was left untouched.
    ColdStart,
    /// A checkpoint was loaded; `last_offset` is reflected in the state.
    Restored { last_offset: i64 },
}

impl RestoreOutcome {
    /// The offset aggregation should resume from.
    pub fn next_offset(&self) -> i64 {
        match self {
            Self::ColdStart => 0,
            Self::Restored { last_offset } => last_offset + 1,
        }
    }
}

/// Restores and dumps aggregation state as manifest + blobs.
pub struct CheckPointer {
    model: CheckPointerModel,
}

impl CheckPointer {
    pub fn new(model: CheckPointerModel) -> Self {
        Self { model }
    }

    /// Load the current checkpoint into `counters` and `all_time_items`.
    ///
    /// A missing manifest is a cold start, not an error. Any other
    /// failure is fatal; no partial restoration is attempted.
    pub async fn restore_state(
        &self,
        counters: &mut Counters,
        all_time_items: &SharedTopKItems,
    ) -> Result<RestoreOutcome, CheckpointError> {
        let manifest = match self.model.read_manifest().await {
            Ok(manifest) => manifest,
            Err(CheckpointError::Storage(StorageError::NotFound(_))) => {
                info!("Manifest not found. No state to restore from.");
                return Ok(RestoreOutcome::ColdStart);
            }
            Err(err) => return Err(err),
        };

        let counter_values = self
            .model
            .read_counters(&manifest.counters_blob_file_name)
            .await?;
        counters.update_items_count(manifest.last_offset, &counter_values);

        let items = self
            .model
            .read_items(&manifest.all_time_items_file_name)
            .await?;
        all_time_items.load(items);

        Ok(RestoreOutcome::Restored {
            last_offset: manifest.last_offset,
        })
    }

    /// Persist a new checkpoint generation.
    ///
    /// Content blobs are written first and the manifest strictly last:
    /// a failure at any earlier step leaves the old manifest pointing at
    /// the old, still-consistent blob pair. Blobs written before a
    /// failed manifest write are orphaned and never collected.
    pub async fn dump_state(
        &self,
        counters: &Counters,
        all_time_items: &SharedTopKItems,
    ) -> Result<(), CheckpointError> {
        let last_offset = counters.last_offset();
        let manifest = CheckpointManifest {
            last_offset,
            counters_blob_file_name: format!("counters-{last_offset}"),
            all_time_items_file_name: format!("all-time-items-{last_offset}"),
        };

        self.model
            .write_counters(&manifest.counters_blob_file_name, counters.items_counters())
            .await?;
        self.model
            .write_items(
                &manifest.all_time_items_file_name,
                &all_time_items.get_items(GET_ALL_ITEMS_LIMIT),
            )
            .await?;
        self.model.write_manifest(&manifest).await?;

        info!(last_offset, "Checkpoint written");
        Ok(())
    }
}
