//! wger: workout, fitness and weight manager.
//!
//! This crate serves the equipment catalogue: administrative CRUD views, a
//! paginated list, a per-language overview backed by a fragment cache, and a
//! read-only JSON API.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
