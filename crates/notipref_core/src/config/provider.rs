//! Catalog providers injected into the engine.
//!
//! The engine asks its provider for the current catalog once per operation,
//! so a swapped catalog takes effect on the next call without any global
//! state.

use crate::model::catalog::Catalog;
use arc_swap::ArcSwap;
use log::info;
use std::sync::Arc;

/// Source of the catalog snapshot used by one engine operation.
pub trait CatalogProvider: Send + Sync {
    fn current(&self) -> Arc<Catalog>;
}

/// Catalog fixed for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    catalog: Arc<Catalog>,
}

impl StaticCatalog {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
        }
    }
}

impl CatalogProvider for StaticCatalog {
    fn current(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog)
    }
}

/// Catalog that can be replaced at runtime.
///
/// Operations already holding a snapshot finish against it; later
/// operations observe the replacement.
#[derive(Debug)]
pub struct SwappableCatalog {
    inner: ArcSwap<Catalog>,
}

impl SwappableCatalog {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            inner: ArcSwap::from_pointee(catalog),
        }
    }

    /// Replaces the catalog and returns the previous snapshot.
    pub fn replace(&self, catalog: Catalog) -> Arc<Catalog> {
        info!(
            "event=catalog_swap module=config status=ok channels={} notifications={}",
            catalog.channels.len(),
            catalog.notifications.len()
        );
        self.inner.swap(Arc::new(catalog))
    }
}

impl CatalogProvider for SwappableCatalog {
    fn current(&self) -> Arc<Catalog> {
        self.inner.load_full()
    }
}
