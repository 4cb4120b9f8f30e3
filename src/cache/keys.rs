//! Cache key definitions.
//!
//! `EntityKey` names the domain data a cache entry was built from;
//! `CacheKey` names the entry itself.

use std::fmt::{self, Display};

use sha2::{Digest, Sha256};

const FRAGMENT_KEY_PREFIX: &str = "template.cache";

/// Identifies a domain entity or derived collection for cache invalidation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKey {
    /// A piece of equipment by id.
    Equipment(i64),
    /// The set of all equipment (listing, ordering, membership).
    EquipmentIndex,
    /// An exercise translation by id.
    Exercise(i64),
    /// An exercise base by id, including its equipment set.
    ExerciseBase(i64),
    /// The set of all exercises and their names/descriptions.
    ExerciseIndex,
    /// An API key by prefix.
    ApiKey(String),
}

/// Object cache keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObjectKey {
    EquipmentById(i64),
    ApiKeyByPrefix(String),
}

/// Named template fragment plus the values it varies on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FragmentKey {
    name: String,
    vary_on: Vec<String>,
}

impl FragmentKey {
    pub fn new<I>(name: impl Into<String>, vary_on: I) -> Self
    where
        I: IntoIterator,
        I::Item: Display,
    {
        Self {
            name: name.into(),
            vary_on: vary_on.into_iter().map(|value| value.to_string()).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vary_on(&self) -> &[String] {
        &self.vary_on
    }

    /// Stable string form: `template.cache.<name>.<sha256(vary_on joined by ':')>`.
    pub fn cache_key(&self) -> String {
        let digest = Sha256::digest(self.vary_on.join(":").as_bytes());
        format!("{FRAGMENT_KEY_PREFIX}.{}.{}", self.name, hex::encode(digest))
    }
}

impl Display for FragmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cache_key())
    }
}

/// Unified cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Object(ObjectKey),
    Fragment(FragmentKey),
}
