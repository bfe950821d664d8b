//! Configuration loading
//!
//! This module provides utilities for loading client settings from
//! environment variables and files.

pub mod loader;

// Re-export commonly used items
pub use loader::{
    load, load_from_env, load_from_file, parse_settings, probe_config_paths, settings_from_vars,
};
