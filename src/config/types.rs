//! Credentials and default value helpers for configuration.

use crate::level::ProficiencyLevel;
use crate::model_config::{resolve_text_model, DEFAULT_TEXT_MODEL};

// --- CONSTANTS ---
pub const DEFAULT_CHILD_NAME: &str = "Anna";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_LIVE_SETUP_TIMEOUT_SECS: u64 = 15;

/// API key and model selection handed to every provider call.
///
/// Callers take a fresh snapshot when they issue a call, so an update made
/// while a call is in flight only affects the next one.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub text_model: String,
}

impl Credentials {
    pub fn new(api_key: &str, text_model: &str) -> Self {
        Self {
            api_key: api_key.trim().to_string(),
            text_model: resolve_text_model(text_model).to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

// The key never goes to the log.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &if self.api_key.is_empty() { "<empty>" } else { "<set>" })
            .field("text_model", &self.text_model)
            .finish()
    }
}

// --- DEFAULT FUNCTIONS ---
pub fn default_text_model() -> String {
    DEFAULT_TEXT_MODEL.to_string()
}

pub fn default_child_name() -> String {
    DEFAULT_CHILD_NAME.to_string()
}

pub fn default_level() -> ProficiencyLevel {
    ProficiencyLevel::Starter
}

pub fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

pub fn default_live_setup_timeout_secs() -> u64 {
    DEFAULT_LIVE_SETUP_TIMEOUT_SECS
}

pub fn default_export_dir() -> String {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_default()
        .join("speaking-buddy")
        .to_string_lossy()
        .into_owned()
}
