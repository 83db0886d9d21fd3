//! Config Default implementation.

use super::config_struct::Config;
use super::types::{
    default_child_name, default_export_dir, default_level, default_live_setup_timeout_secs,
    default_request_timeout_secs, default_text_model,
};

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: String::new(),
            text_model: default_text_model(),
            child_name: default_child_name(),
            level: default_level(),
            request_timeout_secs: default_request_timeout_secs(),
            live_setup_timeout_secs: default_live_setup_timeout_secs(),
            export_dir: default_export_dir(),
        }
    }
}
