//! Configuration loading
//!
//! Loads the application configuration from `.env`, a config file and
//! `BITEBASE_*` environment variables.

pub mod loader;

// Re-export commonly used items
pub use loader::{apply_env_overrides, find_config_path, load, load_from_env, load_from_file};
