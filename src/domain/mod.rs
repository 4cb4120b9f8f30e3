//! Domain layer types and invariants.

pub mod api_keys;
pub mod entities;
pub mod equipment;
pub mod error;
pub mod languages;
