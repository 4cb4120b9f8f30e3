//! Read-through cache for rendered template fragments.

use std::future::Future;
use std::sync::Arc;

use tracing::debug;

use super::config::CacheConfig;
use super::deps;
use super::keys::{CacheKey, FragmentKey};
use super::registry::CacheRegistry;
use super::store::FragmentStore;

/// Serves fragments from the store or renders and registers them.
#[derive(Clone)]
pub struct FragmentCache {
    config: CacheConfig,
    store: Arc<FragmentStore>,
    registry: Arc<CacheRegistry>,
}

impl FragmentCache {
    pub fn new(config: CacheConfig, store: Arc<FragmentStore>, registry: Arc<CacheRegistry>) -> Self {
        Self {
            config,
            store,
            registry,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enable_fragment_cache
    }

    pub fn get(&self, key: &FragmentKey) -> Option<String> {
        if !self.is_enabled() {
            return None;
        }
        self.store.get(key)
    }

    pub fn contains(&self, key: &FragmentKey) -> bool {
        self.is_enabled() && self.store.contains(key)
    }

    /// Return the cached fragment for `key`, or run `render` and cache its
    /// output together with the dependencies it recorded.
    ///
    /// Errors from `render` are returned as-is and nothing is stored.
    pub async fn get_or_render<F, E>(&self, key: FragmentKey, render: F) -> Result<String, E>
    where
        F: Future<Output = Result<String, E>>,
    {
        if !self.is_enabled() {
            return render.await;
        }

        if let Some(html) = self.store.get(&key) {
            debug!(target: "wger::cache", fragment = %key.name(), outcome = "hit", "serving cached fragment");
            return Ok(html);
        }

        debug!(target: "wger::cache", fragment = %key.name(), outcome = "miss", "rendering fragment");
        let (rendered, entities) = deps::with_collector(render).await;
        let html = rendered?;

        debug!(
            target: "wger::cache",
            fragment = %key.name(),
            deps_count = entities.len(),
            "caching fragment"
        );
        if let Some(evicted) = self.store.set(key.clone(), html.clone()) {
            self.registry.unregister(&CacheKey::Fragment(evicted));
        }
        self.registry.register(CacheKey::Fragment(key), entities);

        Ok(html)
    }
}
