//! Incremental conversion of a legacy scholarly repository into a
//! relational database and a hosted search index.
//!
//! The crate is a library; the command surface that selects what to convert
//! lives outside it. A [`Converter`] owns one exclusive run: it holds the
//! advisory lock, the migrated database, the metadata normalizer, and the
//! optional search backend, and exposes the three conversion operations
//! (hierarchy, items, informational pages) on top of them.

pub mod assets;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod hierarchy;
pub mod lock;
pub mod logging;
pub mod metadata;
pub mod pipeline;
pub mod search;
pub mod source;

pub use config::RunConfig;
pub use error::{ConvertError, Result};
pub use pipeline::{RunStats, WorkItem};

use crate::assets::FsAssetStore;
use crate::db::Database;
use crate::hierarchy::LinkStats;
use crate::lock::RunLock;
use crate::metadata::{DialectTransform, NativeOnly, Normalizer};
use crate::pipeline::info::InfoStats;
use crate::search::{HttpSearchBackend, SearchBackend};
use std::sync::Arc;
use tracing::info;

/// One exclusive conversion run against a target database and index.
pub struct Converter {
    config: RunConfig,
    db: Database,
    normalizer: Normalizer,
    backend: Option<Arc<dyn SearchBackend>>,
    // Held for the lifetime of the run, released on drop
    _lock: RunLock,
}

impl Converter {
    /// Open a run with the default HTTP search backend (when configured)
    /// and the native-only dialect transform.
    pub async fn open(config: RunConfig) -> Result<Self> {
        let backend = config
            .search
            .as_ref()
            .map(|s| Arc::new(HttpSearchBackend::new(s.endpoint.clone())) as Arc<dyn SearchBackend>);
        Self::open_with(config, backend, Arc::new(NativeOnly)).await
    }

    /// Open a run with explicit collaborators. Acquires the advisory lock
    /// first; a held lock fails the open with no side effects.
    pub async fn open_with(
        config: RunConfig,
        backend: Option<Arc<dyn SearchBackend>>,
        transform: Arc<dyn DialectTransform>,
    ) -> Result<Self> {
        let lock = RunLock::acquire(&config.lock_path)?;
        let db = Database::open_or_create(&config.db_path).await?;
        db.migrate().await?;
        if backend.is_none() {
            info!("No search backend configured, running database-only");
        }
        Ok(Self {
            config,
            db,
            normalizer: Normalizer::new(transform),
            backend,
            _lock: lock,
        })
    }

    /// Convert the full organizational hierarchy from its source document.
    pub async fn convert_hierarchy(&self, xml: &str) -> Result<LinkStats> {
        let src = hierarchy::parse_hierarchy(xml)?;
        hierarchy::sync_full(self.db.conn(), &src).await
    }

    /// Convert a set of items incrementally.
    pub async fn convert_items(&self, work: Vec<WorkItem>) -> Result<RunStats> {
        pipeline::convert_items(
            self.db.conn(),
            &self.config,
            self.backend.clone(),
            &self.normalizer,
            work,
        )
        .await
    }

    /// Rebuild the informational-page side of the search index.
    pub async fn rebuild_info_index(&self) -> Result<InfoStats> {
        let Some(backend) = self.backend.clone() else {
            return Err(ConvertError::Configuration(
                "informational index rebuild requires a search backend".to_string(),
            ));
        };
        pipeline::info::rebuild_info_index(
            self.db.conn(),
            backend,
            &self.config.batch,
            &self.config.retry,
        )
        .await
    }

    /// Content-addressed store for derived assets (cover images, thumbnails).
    pub fn asset_store(&self) -> FsAssetStore {
        FsAssetStore::new(&self.config.asset_root)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}
