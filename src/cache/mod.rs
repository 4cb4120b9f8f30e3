//! wger cache system
//!
//! Two layers, both in-process:
//!
//! - **Object cache**: equipment rows and API keys by lookup key
//! - **Fragment cache**: rendered HTML fragments keyed by name and
//!   discriminator values (`template.cache.<name>.<digest>`)
//!
//! Write paths publish events through [`CacheTrigger`]; the
//! [`CacheConsumer`] evicts every entry whose recorded dependencies
//! intersect the change.
//!
//! ```toml
//! [cache]
//! enable_object_cache = true
//! enable_fragment_cache = true
//! fragment_limit = 200
//! # ... see config.rs for all options
//! ```

mod config;
mod consumer;
pub mod deps;
mod events;
mod fragment;
mod instruments;
mod keys;
mod lock;
mod planner;
mod registry;
mod store;
mod trigger;

pub use config::CacheConfig;
pub use consumer::CacheConsumer;
pub use events::{CacheEvent, Epoch, EventKind, EventQueue};
pub use fragment::FragmentCache;
pub use instruments::describe_metrics;
pub use keys::{CacheKey, EntityKey, FragmentKey, ObjectKey};
pub use planner::ConsumptionPlan;
pub use registry::CacheRegistry;
pub use store::{FragmentStore, ObjectStore};
pub use trigger::CacheTrigger;
