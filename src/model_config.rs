/// Centralized Model Configuration

/// Image model used for the illustration
pub const IMAGE_MODEL: &str = "gemini-2.5-flash-image";

/// Speech model used to read the script aloud
pub const TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";

/// Prebuilt voice for the read-aloud example
pub const TTS_VOICE: &str = "Kore";

/// Native audio model used for live transcription
pub const LIVE_MODEL: &str = "gemini-2.5-flash-native-audio-preview-12-2025";

pub const DEFAULT_TEXT_MODEL: &str = "gemini-3-flash-preview";

#[derive(Clone, Debug, PartialEq)]
pub struct ModelConfig {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

impl ModelConfig {
    const fn new(id: &'static str, name: &'static str, description: &'static str) -> Self {
        Self {
            id,
            name,
            description,
        }
    }
}

/// Text models the user can pick for script writing and scoring.
/// The first entry is the default.
static TEXT_MODELS: [ModelConfig; 3] = [
    ModelConfig::new(DEFAULT_TEXT_MODEL, "Gemini 3 Flash", "Fast & efficient"),
    ModelConfig::new("gemini-3-pro-preview", "Gemini 3 Pro", "Premium quality"),
    ModelConfig::new("gemini-2.5-flash", "Gemini 2.5 Flash", "Fallback option"),
];

pub fn get_all_models() -> &'static [ModelConfig] {
    &TEXT_MODELS
}

pub fn get_model_by_id(id: &str) -> Option<&'static ModelConfig> {
    get_all_models().iter().find(|m| m.id == id)
}

/// Resolve a configured model id, falling back to the default for unknown ids.
pub fn resolve_text_model(id: &str) -> &'static str {
    match get_model_by_id(id.trim()) {
        Some(model) => model.id,
        None => {
            if !id.trim().is_empty() {
                tracing::warn!(model = id, "Unknown text model, using default");
            }
            DEFAULT_TEXT_MODEL
        }
    }
}
