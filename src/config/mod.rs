//! Configuration module for siteforge
//!
//! Provides types and parsing for `siteforge.toml` project configuration.

pub mod loader;
pub mod schema;

pub use loader::{default_config, find_config, load_config, ConfigError, CONFIG_FILE_NAME};
pub use schema::*;
