//! Application services layer.

pub mod api_keys;
pub mod chrome;
pub mod context;
pub mod equipment;
pub mod error;
pub mod exercises;
pub mod fixtures;
pub mod languages;
pub mod overview;
pub mod pagination;
pub mod repos;
