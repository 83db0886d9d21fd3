//! Config struct definition.

use serde::{Deserialize, Serialize};

use super::types::{
    default_child_name, default_export_dir, default_level, default_live_setup_timeout_secs,
    default_request_timeout_secs, default_text_model, Credentials,
};
use crate::level::ProficiencyLevel;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub gemini_api_key: String,
    /// Text model for script writing and scoring
    #[serde(default = "default_text_model")]
    pub text_model: String,

    // --- Learner ---
    #[serde(default = "default_child_name")]
    pub child_name: String,
    #[serde(default = "default_level")]
    pub level: ProficiencyLevel,

    // --- Network ---
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_live_setup_timeout_secs")]
    pub live_setup_timeout_secs: u64,

    // --- Export ---
    #[serde(default = "default_export_dir")]
    pub export_dir: String,
}

impl Config {
    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.gemini_api_key, &self.text_model)
    }

    /// Use `GEMINI_API_KEY` from the environment when no key is stored.
    pub fn apply_env(&mut self) {
        if self.gemini_api_key.trim().is_empty() {
            if let Ok(key) = std::env::var("GEMINI_API_KEY") {
                self.gemini_api_key = key.trim().to_string();
            }
        }
    }
}
