//! Bidirectional cache registry.
//!
//! Tracks which cache entries were built from which entities so that a
//! change to an entity can be mapped to the entries it invalidates.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use super::keys::{CacheKey, EntityKey};
use super::lock::RwLockExt;

const SOURCE: &str = "cache::registry";

/// Tracks entity → cache_keys and cache_key → entities mappings.
pub struct CacheRegistry {
    entity_to_keys: RwLock<HashMap<EntityKey, HashSet<CacheKey>>>,
    key_to_entities: RwLock<HashMap<CacheKey, HashSet<EntityKey>>>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self {
            entity_to_keys: RwLock::new(HashMap::new()),
            key_to_entities: RwLock::new(HashMap::new()),
        }
    }

    /// Register a cache entry with the entities it was built from.
    ///
    /// Re-registering a key replaces its previous dependency set.
    pub fn register(&self, cache_key: CacheKey, entities: HashSet<EntityKey>) {
        let mut e2k = self.entity_to_keys.write_recovered(SOURCE, "register.e2k");
        let mut k2e = self.key_to_entities.write_recovered(SOURCE, "register.k2e");

        if let Some(previous) = k2e.remove(&cache_key) {
            detach(&mut e2k, &cache_key, previous);
        }
        for entity in &entities {
            e2k.entry(entity.clone())
                .or_default()
                .insert(cache_key.clone());
        }
        k2e.insert(cache_key, entities);
    }

    /// All cache keys affected by an entity change.
    pub fn keys_for_entity(&self, entity: &EntityKey) -> HashSet<CacheKey> {
        self.entity_to_keys
            .read_recovered(SOURCE, "keys_for_entity")
            .get(entity)
            .cloned()
            .unwrap_or_default()
    }

    /// All entities a cache key depends on.
    pub fn entities_for_key(&self, cache_key: &CacheKey) -> HashSet<EntityKey> {
        self.key_to_entities
            .read_recovered(SOURCE, "entities_for_key")
            .get(cache_key)
            .cloned()
            .unwrap_or_default()
    }

    /// Remove a cache key and clean up entity mappings.
    pub fn unregister(&self, cache_key: &CacheKey) {
        let mut e2k = self.entity_to_keys.write_recovered(SOURCE, "unregister.e2k");
        let mut k2e = self.key_to_entities.write_recovered(SOURCE, "unregister.k2e");

        if let Some(entities) = k2e.remove(cache_key) {
            detach(&mut e2k, cache_key, entities);
        }
    }

    pub fn clear(&self) {
        self.entity_to_keys.write_recovered(SOURCE, "clear.e2k").clear();
        self.key_to_entities.write_recovered(SOURCE, "clear.k2e").clear();
    }

    pub fn entity_count(&self) -> usize {
        self.entity_to_keys.read_recovered(SOURCE, "entity_count").len()
    }

    pub fn key_count(&self) -> usize {
        self.key_to_entities.read_recovered(SOURCE, "key_count").len()
    }
}

fn detach(
    e2k: &mut HashMap<EntityKey, HashSet<CacheKey>>,
    cache_key: &CacheKey,
    entities: HashSet<EntityKey>,
) {
    for entity in entities {
        if let Some(keys) = e2k.get_mut(&entity) {
            keys.remove(cache_key);
            if keys.is_empty() {
                e2k.remove(&entity);
            }
        }
    }
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new()
    }
}
