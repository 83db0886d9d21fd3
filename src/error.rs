//! Error kinds surfaced by the practice session.

/// Errors that can occur anywhere between theme selection and scoring.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PracticeError {
    /// A provider returned an error, nothing, or a malformed structured payload.
    #[error("Generation failed: {0}")]
    Generation(String),

    /// The microphone could not be opened.
    #[error("Microphone unavailable: {0}")]
    Permission(String),

    /// The speaker could not be opened.
    #[error("Audio output unavailable: {0}")]
    Playback(String),

    /// The live transcription stream failed to open or dropped mid-session.
    #[error("Live transcription failed: {0}")]
    Channel(String),

    /// The user intent was missing required input.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Writing an exported illustration or recording failed.
    #[error("Export failed: {0}")]
    Export(String),
}

impl PracticeError {
    pub(crate) fn generation(err: impl std::fmt::Display) -> Self {
        PracticeError::Generation(err.to_string())
    }

    pub(crate) fn channel(err: impl std::fmt::Display) -> Self {
        PracticeError::Channel(err.to_string())
    }
}
