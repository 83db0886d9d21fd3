//! Gemini REST client: illustration, script, speech and scoring calls.
//!
//! Every call is a single blocking `generateContent` request. Nothing is
//! cached between calls; the credential snapshot passed in decides the key
//! and text model for that call alone.

use base64::{engine::general_purpose, Engine as _};
use serde_json::json;
use std::time::Duration;

use super::client::{build_agent, describe_http_error};
use super::prompts::{illustration_prompt, scoring_prompt, script_prompt, speech_prompt};
use super::types::{GenerateContentResponse, Illustration, ScoreReport, ScriptDraft};
use super::{ContentGenerator, SpeechScorer};
use crate::audio::{Waveform, SPEECH_SAMPLE_RATE};
use crate::config::Credentials;
use crate::error::PracticeError;
use crate::level::ProficiencyLevel;
use crate::model_config::{IMAGE_MODEL, TTS_MODEL, TTS_VOICE};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Clone)]
pub struct GeminiClient {
    agent: ureq::Agent,
    base_url: String,
}

impl GeminiClient {
    pub fn new(timeout: Duration) -> Self {
        Self::with_base_url(timeout, GEMINI_BASE_URL)
    }

    pub fn with_base_url(timeout: Duration, base_url: &str) -> Self {
        Self {
            agent: build_agent(timeout),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    fn generate(
        &self,
        creds: &Credentials,
        model: &str,
        payload: serde_json::Value,
    ) -> anyhow::Result<GenerateContentResponse> {
        let started = std::time::Instant::now();
        let resp = self
            .agent
            .post(&self.endpoint(model))
            .header("x-goog-api-key", &creds.api_key)
            .send_json(payload)
            .map_err(describe_http_error)?;

        let parsed: GenerateContentResponse = resp
            .into_body()
            .read_json()
            .map_err(|e| anyhow::anyhow!("Failed to parse response: {}", e))?;

        tracing::debug!(
            model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            finish_reason = parsed.finish_reason().unwrap_or("-"),
            "generateContent completed"
        );
        Ok(parsed)
    }
}

fn require_key(creds: &Credentials) -> Result<(), PracticeError> {
    if creds.is_configured() {
        Ok(())
    } else {
        Err(PracticeError::Generation("missing API key".into()))
    }
}

impl ContentGenerator for GeminiClient {
    fn generate_illustration(
        &self,
        creds: &Credentials,
        theme: &str,
    ) -> Result<Illustration, PracticeError> {
        require_key(creds)?;
        tracing::info!(model = IMAGE_MODEL, theme, "Generating illustration");

        let payload = json!({
            "contents": [{
                "parts": [{ "text": illustration_prompt(theme) }]
            }],
            "generationConfig": {
                "imageConfig": { "aspectRatio": "4:3" }
            }
        });

        let resp = self
            .generate(creds, IMAGE_MODEL, payload)
            .map_err(PracticeError::generation)?;
        let inline = resp
            .first_inline_data()
            .ok_or_else(|| PracticeError::Generation("No image data found in response".into()))?;
        Illustration::from_inline(inline).map_err(PracticeError::generation)
    }

    fn generate_script(
        &self,
        creds: &Credentials,
        illustration: &Illustration,
        theme: &str,
        level: ProficiencyLevel,
    ) -> Result<ScriptDraft, PracticeError> {
        require_key(creds)?;
        tracing::info!(model = %creds.text_model, theme, %level, "Generating script");

        let payload = json!({
            "contents": [{
                "parts": [
                    {
                        "inlineData": {
                            "mimeType": illustration.mime_type,
                            "data": illustration.to_base64()
                        }
                    },
                    { "text": script_prompt(theme, level) }
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "intro": { "type": "STRING" },
                        "points": { "type": "ARRAY", "items": { "type": "STRING" } },
                        "conclusion": { "type": "STRING" }
                    },
                    "required": ["intro", "points", "conclusion"]
                }
            }
        });

        let resp = self
            .generate(creds, &creds.text_model, payload)
            .map_err(PracticeError::generation)?;
        parse_script(&resp.text()).map_err(PracticeError::generation)
    }

    fn synthesize_speech(&self, creds: &Credentials, text: &str) -> Result<Waveform, PracticeError> {
        require_key(creds)?;
        tracing::info!(model = TTS_MODEL, chars = text.len(), "Synthesizing example speech");

        let payload = json!({
            "contents": [{
                "parts": [{ "text": speech_prompt(text) }]
            }],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {
                        "prebuiltVoiceConfig": { "voiceName": TTS_VOICE }
                    }
                }
            }
        });

        let resp = self
            .generate(creds, TTS_MODEL, payload)
            .map_err(PracticeError::generation)?;
        let inline = resp
            .first_inline_data()
            .ok_or_else(|| PracticeError::Generation("No audio data generated".into()))?;
        let bytes = general_purpose::STANDARD
            .decode(inline.data.trim())
            .map_err(PracticeError::generation)?;

        let waveform = Waveform::from_pcm16_le(&bytes, parse_sample_rate(&inline.mime_type), 1);
        if waveform.is_empty() {
            return Err(PracticeError::Generation("No audio data generated".into()));
        }
        Ok(waveform)
    }
}

impl SpeechScorer for GeminiClient {
    fn score(
        &self,
        creds: &Credentials,
        reference: &str,
        transcript: &str,
    ) -> Result<ScoreReport, PracticeError> {
        require_key(creds)?;
        tracing::info!(
            model = %creds.text_model,
            transcript_chars = transcript.len(),
            "Scoring practice attempt"
        );

        let payload = json!({
            "contents": [{
                "parts": [{ "text": scoring_prompt(reference, transcript) }]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "score": { "type": "NUMBER" },
                        "cefrLevel": { "type": "STRING" },
                        "mistakes": { "type": "ARRAY", "items": { "type": "STRING" } },
                        "feedback": { "type": "STRING" }
                    },
                    "required": ["score", "cefrLevel", "mistakes", "feedback"]
                }
            }
        });

        let resp = self
            .generate(creds, &creds.text_model, payload)
            .map_err(PracticeError::generation)?;
        parse_score(&resp.text()).map_err(PracticeError::generation)
    }
}

/// Models sometimes wrap JSON in a markdown fence even in JSON mode.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

pub(crate) fn parse_script(text: &str) -> anyhow::Result<ScriptDraft> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Err(anyhow::anyhow!("Empty script response"));
    }
    let draft: ScriptDraft = serde_json::from_str(body)
        .map_err(|e| anyhow::anyhow!("Malformed script response: {}", e))?;

    let points: Vec<String> = draft
        .points
        .iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    let intro = draft.intro.trim().to_string();
    let conclusion = draft.conclusion.trim().to_string();

    if intro.is_empty() || conclusion.is_empty() || points.is_empty() {
        return Err(anyhow::anyhow!("Script response is missing sections"));
    }
    Ok(ScriptDraft {
        intro,
        points,
        conclusion,
    })
}

pub(crate) fn parse_score(text: &str) -> anyhow::Result<ScoreReport> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Err(anyhow::anyhow!("Empty scoring response"));
    }
    let mut report: ScoreReport = serde_json::from_str(body)
        .map_err(|e| anyhow::anyhow!("Malformed scoring response: {}", e))?;

    if !report.score.is_finite() {
        return Err(anyhow::anyhow!("Score is not a number"));
    }
    report.score = report.score.clamp(0.0, 100.0);
    report.feedback = report.feedback.trim().to_string();
    if report.feedback.is_empty() {
        return Err(anyhow::anyhow!("Scoring response has no feedback"));
    }
    report.cefr_level = report.cefr_level.trim().to_string();
    report.mistakes = report
        .mistakes
        .into_iter()
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .collect();
    Ok(report)
}

/// Sample rate from a mime type like `audio/L16;codec=pcm;rate=24000`.
pub(crate) fn parse_sample_rate(mime_type: &str) -> u32 {
    mime_type
        .split(';')
        .filter_map(|p| p.trim().strip_prefix("rate="))
        .find_map(|r| r.parse().ok())
        .unwrap_or(SPEECH_SAMPLE_RATE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_parses_and_trims() {
        let draft = parse_script(
            r#"{"intro": " Hello everyone, my name is [Name]. ",
                "points": ["I see a lion.", "  ", "The lion is big."],
                "conclusion": "That is all. Thank you for listening."}"#,
        )
        .unwrap();
        assert_eq!(draft.intro, "Hello everyone, my name is [Name].");
        assert_eq!(draft.points, vec!["I see a lion.", "The lion is big."]);
    }

    #[test]
    fn script_accepts_fenced_json() {
        let text = "```json\n{\"intro\":\"Hi\",\"points\":[\"A\"],\"conclusion\":\"Bye\"}\n```";
        assert_eq!(parse_script(text).unwrap().conclusion, "Bye");
    }

    #[test]
    fn script_rejects_missing_fields() {
        assert!(parse_script(r#"{"intro":"Hi","conclusion":"Bye"}"#).is_err());
        assert!(parse_script(r#"{"intro":"Hi","points":[],"conclusion":"Bye"}"#).is_err());
        assert!(parse_script("not json").is_err());
        assert!(parse_script("").is_err());
    }

    #[test]
    fn score_is_clamped() {
        let high = parse_score(
            r#"{"score": 140, "cefrLevel": "A1", "mistakes": [], "feedback": "Wow!"}"#,
        )
        .unwrap();
        assert_eq!(high.score, 100.0);

        let low = parse_score(
            r#"{"score": -3, "cefrLevel": "Pre-A1", "mistakes": ["cat"], "feedback": "Keep going"}"#,
        )
        .unwrap();
        assert_eq!(low.score, 0.0);
        assert_eq!(low.mistakes, vec!["cat"]);
    }

    #[test]
    fn score_requires_feedback() {
        assert!(parse_score(
            r#"{"score": 50, "cefrLevel": "A1", "mistakes": [], "feedback": "  "}"#
        )
        .is_err());
        assert!(parse_score(r#"{"score": 50}"#).is_err());
    }

    #[test]
    fn sample_rate_from_mime() {
        assert_eq!(parse_sample_rate("audio/L16;codec=pcm;rate=24000"), 24000);
        assert_eq!(parse_sample_rate("audio/pcm; rate=16000"), 16000);
        assert_eq!(parse_sample_rate("audio/pcm"), SPEECH_SAMPLE_RATE);
    }

    #[test]
    fn empty_key_fails_before_network() {
        // Unroutable base URL: reaching the network would error differently.
        let client = GeminiClient::with_base_url(Duration::from_secs(1), "http://127.0.0.1:9");
        let creds = Credentials::new("   ", "");
        let err = client.generate_illustration(&creds, "Zoo").unwrap_err();
        assert_eq!(err, PracticeError::Generation("missing API key".into()));
        assert!(client.score(&creds, "a", "b").is_err());
    }
}
