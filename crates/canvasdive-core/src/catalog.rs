//! Read-through cache for canvas types and named layouts.
//!
//! Data comes from an injected [`CatalogSource`]; entries are dropped when a
//! [`CatalogChange`] notification arrives and reloaded on next access.

use std::sync::Arc;

use async_trait::async_trait;
use canvasdive_canvas::{builtin_canvas_types, builtin_layouts, CanvasType, LayoutCatalog, NamedLayout};
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Upstream source of catalog data
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// All canvas types
    async fn load_canvas_types(&self) -> Result<Vec<CanvasType>>;

    /// All named layouts
    async fn load_layouts(&self) -> Result<Vec<NamedLayout>>;
}

/// In-memory catalog source
#[derive(Debug, Clone, Default)]
pub struct StaticCatalogSource {
    canvas_types: Vec<CanvasType>,
    layouts: Vec<NamedLayout>,
}

impl StaticCatalogSource {
    /// Create from explicit data
    #[must_use]
    pub fn new(canvas_types: Vec<CanvasType>, layouts: Vec<NamedLayout>) -> Self {
        Self {
            canvas_types,
            layouts,
        }
    }

    /// Catalog shipped with the crate
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(builtin_canvas_types(), builtin_layouts())
    }
}

#[async_trait]
impl CatalogSource for StaticCatalogSource {
    async fn load_canvas_types(&self) -> Result<Vec<CanvasType>> {
        Ok(self.canvas_types.clone())
    }

    async fn load_layouts(&self) -> Result<Vec<NamedLayout>> {
        Ok(self.layouts.clone())
    }
}

/// What changed upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogChange {
    /// Canvas types changed
    CanvasTypes,
    /// Layouts changed
    Layouts,
    /// Everything changed
    All,
}

/// Read-through cache over a [`CatalogSource`]
pub struct CatalogCache {
    source: Arc<dyn CatalogSource>,
    canvas_types: RwLock<Option<Arc<Vec<CanvasType>>>>,
    layouts: RwLock<Option<Arc<LayoutCatalog>>>,
}

impl CatalogCache {
    /// Create an empty cache
    #[must_use]
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self {
            source,
            canvas_types: RwLock::new(None),
            layouts: RwLock::new(None),
        }
    }

    /// All canvas types, loading on miss
    pub async fn canvas_types(&self) -> Result<Arc<Vec<CanvasType>>> {
        if let Some(cached) = self.canvas_types.read().await.as_ref() {
            return Ok(Arc::clone(cached));
        }

        let mut slot = self.canvas_types.write().await;
        if let Some(cached) = slot.as_ref() {
            return Ok(Arc::clone(cached));
        }
        let loaded = Arc::new(self.source.load_canvas_types().await?);
        debug!(count = loaded.len(), "Loaded canvas types");
        *slot = Some(Arc::clone(&loaded));
        Ok(loaded)
    }

    /// One canvas type by ID
    pub async fn canvas_type(&self, id: &str) -> Result<CanvasType> {
        self.canvas_types()
            .await?
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| Error::CanvasTypeNotFound(id.to_string()))
    }

    /// Layout catalog, loading on miss
    pub async fn layouts(&self) -> Result<Arc<LayoutCatalog>> {
        if let Some(cached) = self.layouts.read().await.as_ref() {
            return Ok(Arc::clone(cached));
        }

        let mut slot = self.layouts.write().await;
        if let Some(cached) = slot.as_ref() {
            return Ok(Arc::clone(cached));
        }
        let loaded = Arc::new(LayoutCatalog::new(self.source.load_layouts().await?));
        debug!(count = loaded.layouts().len(), "Loaded layouts");
        *slot = Some(Arc::clone(&loaded));
        Ok(loaded)
    }

    /// Drop cached entries affected by `change`
    pub async fn invalidate(&self, change: CatalogChange) {
        if matches!(change, CatalogChange::CanvasTypes | CatalogChange::All) {
            *self.canvas_types.write().await = None;
        }
        if matches!(change, CatalogChange::Layouts | CatalogChange::All) {
            *self.layouts.write().await = None;
        }
        debug!(?change, "Catalog cache invalidated");
    }

    /// Invalidate on every notification from `changes` until the channel closes.
    ///
    /// A lagged receiver invalidates everything since changes were missed.
    pub fn spawn_invalidation_listener(
        self: Arc<Self>,
        mut changes: broadcast::Receiver<CatalogChange>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => self.invalidate(change).await,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "Catalog listener lagged, dropping all entries");
                        self.invalidate(CatalogChange::All).await;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("Catalog change channel closed");
                        break;
                    }
                }
            }
        })
    }
}
