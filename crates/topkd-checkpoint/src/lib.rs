// topkd-checkpoint - Durable snapshots of aggregation state
//
// A checkpoint is a manifest plus two content blobs (counters, ranked
// items). Consistency comes purely from write ordering: content blobs
// first, manifest last. There is no multi-file atomic commit and no GC
// of superseded blob generations.

mod checkpointer;
mod model;
mod storage;

pub use checkpointer::{CheckPointer, RestoreOutcome};
pub use model::{CheckPointerModel, CheckpointManifest, MANIFEST_KEY};
pub use storage::{BlobStorage, OpenDalStorage, StorageError};

/// Errors surfaced by checkpoint reads and writes.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("failed to encode {what}: {source}")]
    Encode {
        what: &'static str,
        source: serde_json::Error,
    },

    #[error("failed to decode {what}: {source}")]
    Decode {
        what: &'static str,
        source: serde_json::Error,
    },
}
