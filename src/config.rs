//! Run configuration

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Main conversion run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Config schema version
    pub version: u32,

    /// Path to the relational database file
    pub db_path: PathBuf,

    /// Root of the legacy content-addressed source tree
    pub source_root: PathBuf,

    /// Root of the content-addressed asset store
    pub asset_root: PathBuf,

    /// Path of the advisory run lock file
    pub lock_path: PathBuf,

    /// Search backend endpoint; None runs in database-only mode
    pub search: Option<SearchConfig>,

    /// Batch assembly limits
    pub batch: BatchConfig,

    /// Submission retry policy
    pub retry: RetryConfig,

    /// Run the consistency sweeper after this many committed batches
    pub sweep_every_batches: u32,
}

/// Search backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Document batch endpoint URL
    pub endpoint: String,
}

/// Size and count caps for search-submission batches
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum total payload bytes per batch
    pub max_batch_bytes: usize,

    /// Maximum record count per batch
    pub max_batch_docs: usize,

    /// Maximum serialized bytes for a single record
    pub max_doc_bytes: usize,
}

/// Retry policy for transient search backend failures
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Fixed interval between attempts, in seconds
    pub interval_secs: u64,

    /// Total wall-clock budget across attempts, in seconds
    pub budget_secs: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_bytes: 4 * 1024 * 1024,
            max_batch_docs: 500,
            max_doc_bytes: 1024 * 1024,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            budget_secs: 600,
        }
    }
}

impl RunConfig {
    /// Load configuration from a JSON file
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading config from {:?}", path);
            let json = fs::read_to_string(path)?;
            let config: RunConfig = serde_json::from_str(&json)?;
            config.validate()?;
            Ok(config)
        } else {
            Err(anyhow!("no config found at {:?}", path))
        }
    }

    /// Load configuration, creating a default next to the data directory if absent
    pub fn load_or_create(path: &Path, data_dir: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from(path)
        } else {
            warn!("No config found, creating default at {:?}", path);
            let config = Self::default_with_dir(data_dir.to_path_buf());
            config.save(path)?;
            Ok(config)
        }
    }

    /// Create default configuration rooted at a data directory
    pub fn default_with_dir(data_dir: PathBuf) -> Self {
        Self {
            version: Self::TARGET_VERSION,
            db_path: data_dir.join("corpus.db"),
            source_root: data_dir.join("source"),
            asset_root: data_dir.join("assets"),
            lock_path: data_dir.join("convert.lock"),
            search: None,
            batch: BatchConfig::default(),
            retry: RetryConfig::default(),
            sweep_every_batches: 10,
        }
    }

    /// Save configuration to disk
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Current schema version
    pub const TARGET_VERSION: u32 = 1;

    fn validate(&self) -> Result<()> {
        if self.version != Self::TARGET_VERSION {
            return Err(anyhow!("unknown config version: {}", self.version));
        }
        if self.batch.max_doc_bytes > self.batch.max_batch_bytes {
            return Err(anyhow!(
                "max_doc_bytes ({}) exceeds max_batch_bytes ({})",
                self.batch.max_doc_bytes,
                self.batch.max_batch_bytes
            ));
        }
        if self.batch.max_batch_docs == 0 || self.batch.max_batch_bytes == 0 {
            return Err(anyhow!("batch caps must be non-zero"));
        }
        Ok(())
    }
}
