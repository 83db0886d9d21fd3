//! Provider clients and the seams the session drives them through.

pub mod client;
pub mod gemini;
pub mod gemini_live;
pub mod prompts;
pub mod types;

pub use gemini::GeminiClient;
pub use gemini_live::{LiveEvent, LiveLink, LiveTranscriber};
pub use types::{Illustration, ScoreReport, ScriptDraft};

use crate::audio::Waveform;
use crate::config::Credentials;
use crate::error::PracticeError;
use crate::level::ProficiencyLevel;

/// Illustration, script and example-speech generation.
pub trait ContentGenerator {
    fn generate_illustration(
        &self,
        creds: &Credentials,
        theme: &str,
    ) -> Result<Illustration, PracticeError>;

    fn generate_script(
        &self,
        creds: &Credentials,
        illustration: &Illustration,
        theme: &str,
        level: ProficiencyLevel,
    ) -> Result<ScriptDraft, PracticeError>;

    fn synthesize_speech(&self, creds: &Credentials, text: &str) -> Result<Waveform, PracticeError>;
}

/// Compares what the child said against the script.
pub trait SpeechScorer {
    fn score(
        &self,
        creds: &Credentials,
        reference: &str,
        transcript: &str,
    ) -> Result<ScoreReport, PracticeError>;
}

/// Opens one live transcription session per practice attempt.
pub trait TranscriptionChannel {
    fn open(&self, creds: &Credentials) -> Result<LiveLink, PracticeError>;
}
