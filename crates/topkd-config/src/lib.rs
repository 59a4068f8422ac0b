// topkd-config - Unified runtime configuration
//
// Sources, highest priority first:
// 1. Environment variables (TOPKD_*)
// 2. Explicit config file path
// 3. Default config file locations (./topkd.toml, ./.topkd.toml)
// 4. Built-in defaults

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Main runtime configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub aggregator: AggregatorConfig,
    pub storage: StorageConfig,
    pub event_log: EventLogConfig,
    pub server: ServerConfig,
}

/// Aggregation loop configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    pub flush_interval_secs: u64,
    pub top_k_size: usize,
    pub verbose: bool,
}

impl AggregatorConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            flush_interval_secs: 5,
            top_k_size: 1000,
            verbose: false,
        }
    }
}

/// Checkpoint blob storage configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub fs: FsConfig,
    pub s3: Option<S3Config>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Fs,
            fs: FsConfig::default(),
            s3: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Fs,
    S3,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fs" | "filesystem" => Ok(Self::Fs),
            "s3" | "aws" => Ok(Self::S3),
            "memory" => Ok(Self::Memory),
            other => anyhow::bail!("unknown storage backend: {other}"),
        }
    }
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fs => write!(f, "fs"),
            Self::S3 => write!(f, "s3"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FsConfig {
    pub path: String,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            path: "./checkpoints".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// Local JSONL event log configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EventLogConfig {
    pub path: String,
    pub poll_interval_ms: u64,
}

impl EventLogConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            path: "./events.jsonl".to_string(),
            poll_interval_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => anyhow::bail!("unknown log format: {other}"),
        }
    }
}

/// HTTP query surface configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

const DEFAULT_CONFIG_PATHS: &[&str] = &["./topkd.toml", "./.topkd.toml"];

impl RuntimeConfig {
    /// Load from an explicit TOML file, then apply environment overrides.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let mut config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load from the first default config location that exists, or fall
    /// back to built-in defaults. Environment overrides apply either way.
    pub fn load_or_default() -> Result<Self> {
        for candidate in DEFAULT_CONFIG_PATHS {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        fn env_var(key: &str) -> Option<String> {
            std::env::var(key).ok().filter(|v| !v.is_empty())
        }

        if let Some(value) = env_var("TOPKD_FLUSH_INTERVAL_SECS") {
            self.aggregator.flush_interval_secs =
                value.parse().context("TOPKD_FLUSH_INTERVAL_SECS")?;
        }
        if let Some(value) = env_var("TOPKD_TOP_K_SIZE") {
            self.aggregator.top_k_size = value.parse().context("TOPKD_TOP_K_SIZE")?;
        }
        if let Some(value) = env_var("TOPKD_STORAGE_BACKEND") {
            self.storage.backend = value.parse().context("TOPKD_STORAGE_BACKEND")?;
        }
        if let Some(value) = env_var("TOPKD_STORAGE_FS_PATH") {
            self.storage.fs.path = value;
        }
        if let Some(value) = env_var("TOPKD_EVENT_LOG_PATH") {
            self.event_log.path = value;
        }
        if let Some(value) = env_var("TOPKD_LISTEN_ADDR") {
            self.server.listen_addr = value;
        }
        if let Some(value) = env_var("TOPKD_LOG_LEVEL") {
            self.server.log_level = value;
        }
        if let Some(value) = env_var("TOPKD_LOG_FORMAT") {
            self.server.log_format = value.parse().context("TOPKD_LOG_FORMAT")?;
        }
        Ok(())
    }

    /// Fail fast on configurations the process cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.aggregator.top_k_size == 0 {
            anyhow::bail!("aggregator.top_k_size must be greater than zero");
        }
        if self.storage.backend == StorageBackend::S3 && self.storage.s3.is_none() {
            anyhow::bail!("storage.s3 section is required for the s3 backend");
        }
        Ok(())
    }
}
