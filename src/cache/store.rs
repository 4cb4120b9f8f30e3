//! Cache storage implementations.
//!
//! `ObjectStore` keeps domain rows; `FragmentStore` keeps rendered HTML
//! fragments keyed by [`FragmentKey`].

use std::sync::RwLock;
use std::time::{Duration, Instant};

use lru::LruCache;
use metrics::counter;

use crate::domain::api_keys::ApiKeyRecord;
use crate::domain::entities::EquipmentRecord;

use super::config::CacheConfig;
use super::instruments;
use super::keys::FragmentKey;
use super::lock::RwLockExt;

const SOURCE: &str = "cache::store";

fn record_lookup<T>(found: Option<T>, kind: &'static str) -> Option<T> {
    if found.is_some() {
        counter!(instruments::OBJECT_HIT, "kind" => kind).increment(1);
    } else {
        counter!(instruments::OBJECT_MISS, "kind" => kind).increment(1);
    }
    found
}

struct CachedApiKey {
    record: ApiKeyRecord,
    cached_at: Instant,
}

/// Object cache for equipment rows and API keys.
///
/// API keys expire after `api_key_ttl` so revocations written by another
/// process are eventually observed.
pub struct ObjectStore {
    equipment_by_id: RwLock<LruCache<i64, EquipmentRecord>>,
    api_keys_by_prefix: RwLock<LruCache<String, CachedApiKey>>,
    api_key_ttl: Duration,
}

impl ObjectStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            equipment_by_id: RwLock::new(LruCache::new(config.object_equipment_limit_non_zero())),
            api_keys_by_prefix: RwLock::new(LruCache::new(config.object_api_key_limit_non_zero())),
            api_key_ttl: config.api_key_ttl(),
        }
    }

    pub fn get_equipment(&self, id: i64) -> Option<EquipmentRecord> {
        let found = self
            .equipment_by_id
            .write_recovered(SOURCE, "get_equipment")
            .get(&id)
            .cloned();
        record_lookup(found, "equipment")
    }

    pub fn set_equipment(&self, equipment: EquipmentRecord) {
        self.equipment_by_id
            .write_recovered(SOURCE, "set_equipment")
            .put(equipment.id, equipment);
    }

    pub fn invalidate_equipment(&self, id: i64) {
        self.equipment_by_id
            .write_recovered(SOURCE, "invalidate_equipment")
            .pop(&id);
    }

    pub fn get_api_key_by_prefix(&self, prefix: &str) -> Option<ApiKeyRecord> {
        let mut keys = self
            .api_keys_by_prefix
            .write_recovered(SOURCE, "get_api_key_by_prefix");
        let lookup = keys.get(prefix).map(|entry| {
            (entry.cached_at.elapsed() < self.api_key_ttl).then(|| entry.record.clone())
        });
        let found = match lookup {
            Some(Some(record)) => Some(record),
            Some(None) => {
                keys.pop(prefix);
                None
            }
            None => None,
        };
        drop(keys);
        record_lookup(found, "api_key")
    }

    pub fn set_api_key(&self, key: ApiKeyRecord) {
        self.api_keys_by_prefix
            .write_recovered(SOURCE, "set_api_key")
            .put(
                key.prefix.clone(),
                CachedApiKey {
                    record: key,
                    cached_at: Instant::now(),
                },
            );
    }

    pub fn invalidate_api_key(&self, prefix: &str) {
        self.api_keys_by_prefix
            .write_recovered(SOURCE, "invalidate_api_key")
            .pop(prefix);
    }

    pub fn clear(&self) {
        self.equipment_by_id
            .write_recovered(SOURCE, "clear.equipment_by_id")
            .clear();
        self.api_keys_by_prefix
            .write_recovered(SOURCE, "clear.api_keys_by_prefix")
            .clear();
    }
}

/// Rendered template fragments.
pub struct FragmentStore {
    fragments: RwLock<LruCache<FragmentKey, String>>,
}

impl FragmentStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            fragments: RwLock::new(LruCache::new(config.fragment_limit_non_zero())),
        }
    }

    pub fn get(&self, key: &FragmentKey) -> Option<String> {
        let found = self
            .fragments
            .write_recovered(SOURCE, "fragment_get")
            .get(key)
            .cloned();
        if found.is_some() {
            counter!(instruments::FRAGMENT_HIT, "fragment" => key.name().to_string()).increment(1);
        } else {
            counter!(instruments::FRAGMENT_MISS, "fragment" => key.name().to_string()).increment(1);
        }
        found
    }

    /// Presence check without touching LRU order or metrics.
    pub fn contains(&self, key: &FragmentKey) -> bool {
        self.fragments
            .read_recovered(SOURCE, "fragment_contains")
            .contains(key)
    }

    /// Store a fragment. Returns the key pushed out by capacity, if any.
    pub fn set(&self, key: FragmentKey, html: String) -> Option<FragmentKey> {
        let evicted = self
            .fragments
            .write_recovered(SOURCE, "fragment_set")
            .push(key.clone(), html)
            .map(|(evicted_key, _)| evicted_key)
            .filter(|evicted_key| *evicted_key != key);
        if let Some(evicted_key) = &evicted {
            counter!(instruments::FRAGMENT_EVICT, "fragment" => evicted_key.name().to_string())
                .increment(1);
        }
        evicted
    }

    pub fn invalidate(&self, key: &FragmentKey) -> bool {
        self.fragments
            .write_recovered(SOURCE, "fragment_invalidate")
            .pop(key)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.fragments.read_recovered(SOURCE, "fragment_len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
