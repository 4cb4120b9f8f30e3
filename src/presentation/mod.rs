//! View models, askama templates and named routes.

pub mod routes;
pub mod views;
