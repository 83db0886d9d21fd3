//! Configuration module for speaking-buddy.
//!
//! This module is split into several sub-modules:
//! - `types`: Credentials and per-field default helpers
//! - `config_struct`: Config struct definition
//! - `defaults`: Config Default implementation
//! - `io`: Config loading and saving

mod config_struct;
mod defaults;
mod io;
mod types;

// Re-export public types for external use
pub use config_struct::Config;
pub use io::{get_config_path, load_config_from, save_config_to};
pub use types::{Credentials, DEFAULT_CHILD_NAME};
