// Initialization utilities for server mode
//
// Storage backend and logging/tracing setup

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;
use topkd_checkpoint::OpenDalStorage;
use topkd_config::{LogFormat, ServerConfig, StorageBackend, StorageConfig};

/// Initialize the tracing subscriber once, per server config.
pub fn init_tracing(config: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

/// Build the checkpoint blob storage from config.
pub fn init_storage(config: &StorageConfig) -> Result<OpenDalStorage> {
    match config.backend {
        StorageBackend::Fs => {
            info!("Using filesystem checkpoint storage at: {}", config.fs.path);
            std::fs::create_dir_all(&config.fs.path).with_context(|| {
                format!("failed to create checkpoint directory {}", config.fs.path)
            })?;
            OpenDalStorage::new_fs(&config.fs.path)
        }
        StorageBackend::S3 => {
            let s3 = config
                .s3
                .as_ref()
                .context("s3 config required for the s3 backend")?;
            info!(
                "Using S3 checkpoint storage: bucket={}, region={}",
                s3.bucket, s3.region
            );
            OpenDalStorage::new_s3(&s3.bucket, &s3.region, s3.endpoint.as_deref())
        }
        StorageBackend::Memory => {
            info!("Using in-memory checkpoint storage (nothing survives restarts)");
            OpenDalStorage::new_memory()
        }
    }
}
