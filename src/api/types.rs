use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

// --- generateContent RESPONSE ---

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(rename = "finishReason", default)]
    pub finish_reason: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(rename = "inlineData", default)]
    pub inline_data: Option<InlineData>,
    #[serde(default)]
    pub thought: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct InlineData {
    #[serde(rename = "mimeType", default)]
    pub mime_type: String,
    pub data: String,
}

impl GenerateContentResponse {
    fn parts(&self) -> impl Iterator<Item = &Part> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter())
            .into_iter()
            .flatten()
    }

    /// First inline blob of the first candidate
    pub fn first_inline_data(&self) -> Option<&InlineData> {
        self.parts().find_map(|p| p.inline_data.as_ref())
    }

    /// Concatenated non-thought text of the first candidate
    pub fn text(&self) -> String {
        self.parts()
            .filter(|p| !p.thought.unwrap_or(false))
            .filter_map(|p| p.text.as_deref())
            .collect()
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.candidates.first()?.finish_reason.as_deref()
    }
}

// --- DOMAIN PAYLOADS ---

/// Generated picture, kept as raw bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Illustration {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl Illustration {
    pub fn from_inline(inline: &InlineData) -> anyhow::Result<Self> {
        let bytes = general_purpose::STANDARD.decode(inline.data.trim())?;
        if bytes.is_empty() {
            return Err(anyhow::anyhow!("Empty image payload"));
        }
        let mime_type = if inline.mime_type.is_empty() {
            "image/png".to_string()
        } else {
            inline.mime_type.clone()
        };
        Ok(Self { bytes, mime_type })
    }

    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.bytes)
    }

    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            _ => "png",
        }
    }
}

/// Structured script as returned by the language model.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ScriptDraft {
    pub intro: String,
    pub points: Vec<String>,
    pub conclusion: String,
}

/// Structured pronunciation assessment.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    pub score: f64,
    pub cefr_level: String,
    #[serde(default)]
    pub mistakes: Vec<String>,
    pub feedback: String,
}
