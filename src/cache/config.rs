//! Cache configuration.
//!
//! Controls the object cache and the template-fragment cache via `wger.toml`.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_OBJECT_EQUIPMENT_LIMIT: usize = 500;
const DEFAULT_OBJECT_API_KEY_LIMIT: usize = 100;
const DEFAULT_FRAGMENT_LIMIT: usize = 200;
const DEFAULT_AUTO_CONSUME_INTERVAL_MS: u64 = 5000;
const DEFAULT_CONSUME_BATCH_LIMIT: usize = 100;
const DEFAULT_API_KEY_TTL_SECS: u64 = 60;

/// Cache configuration from `wger.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable the object cache (equipment rows, API keys).
    pub enable_object_cache: bool,
    /// Enable the rendered template-fragment cache.
    pub enable_fragment_cache: bool,
    /// Maximum equipment rows in the object cache.
    pub object_equipment_limit: usize,
    /// Maximum API keys in the object cache.
    pub object_api_key_limit: usize,
    /// Maximum rendered fragments.
    pub fragment_limit: usize,
    /// Auto-consume interval (ms) for eventual consistency.
    pub auto_consume_interval_ms: u64,
    /// Maximum events per consumption batch.
    pub consume_batch_limit: usize,
    /// Seconds a cached API key is trusted before it is re-read.
    pub api_key_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enable_object_cache: true,
            enable_fragment_cache: true,
            object_equipment_limit: DEFAULT_OBJECT_EQUIPMENT_LIMIT,
            object_api_key_limit: DEFAULT_OBJECT_API_KEY_LIMIT,
            fragment_limit: DEFAULT_FRAGMENT_LIMIT,
            auto_consume_interval_ms: DEFAULT_AUTO_CONSUME_INTERVAL_MS,
            consume_batch_limit: DEFAULT_CONSUME_BATCH_LIMIT,
            api_key_ttl_secs: DEFAULT_API_KEY_TTL_SECS,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enable_object_cache: settings.enable_object_cache,
            enable_fragment_cache: settings.enable_fragment_cache,
            object_equipment_limit: settings.object_equipment_limit,
            object_api_key_limit: settings.object_api_key_limit,
            fragment_limit: settings.fragment_limit,
            auto_consume_interval_ms: settings.auto_consume_interval_ms,
            consume_batch_limit: settings.consume_batch_limit,
            api_key_ttl_secs: settings.api_key_ttl_secs,
        }
    }
}

impl CacheConfig {
    /// Returns true if any cache layer is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enable_object_cache || self.enable_fragment_cache
    }

    pub fn object_equipment_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.object_equipment_limit).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn object_api_key_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.object_api_key_limit).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn api_key_ttl(&self) -> Duration {
        Duration::from_secs(self.api_key_ttl_secs)
    }

    pub fn fragment_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.fragment_limit).unwrap_or(NonZeroUsize::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert!(config.enable_object_cache);
        assert!(config.enable_fragment_cache);
        assert_eq!(config.object_equipment_limit, 500);
        assert_eq!(config.object_api_key_limit, 100);
        assert_eq!(config.fragment_limit, 200);
        assert_eq!(config.auto_consume_interval_ms, 5000);
        assert_eq!(config.consume_batch_limit, 100);
        assert_eq!(config.api_key_ttl(), Duration::from_secs(60));
    }

    #[test]
    fn enabled_when_either_layer_is_on() {
        let fragments_only = CacheConfig {
            enable_object_cache: false,
            ..Default::default()
        };
        assert!(fragments_only.is_enabled());

        let objects_only = CacheConfig {
            enable_fragment_cache: false,
            ..Default::default()
        };
        assert!(objects_only.is_enabled());
    }

    #[test]
    fn disabled_when_both_off() {
        let config = CacheConfig {
            enable_object_cache: false,
            enable_fragment_cache: false,
            ..Default::default()
        };
        assert!(!config.is_enabled());
    }

    #[test]
    fn non_zero_clamps_to_min() {
        let config = CacheConfig {
            fragment_limit: 0,
            ..Default::default()
        };
        assert_eq!(config.fragment_limit_non_zero().get(), 1);
    }
}
