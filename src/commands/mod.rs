//! JSON command layer.
//!
//! Each handler takes an optional `serde_json::Value` payload from the UI
//! bridge, parses it with a serde struct (camelCase with snake_case
//! aliases), calls into the domain modules, and shapes a JSON response.
//! Every failure is flattened into a single user-visible string; the caller
//! shows it and re-triggers the action, there is no retry here.

pub mod analytics;
pub mod auth;
pub mod menu;
pub mod orders;
