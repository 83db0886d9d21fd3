//! Practice session state machine.

mod orchestrator;
mod state;

pub use orchestrator::Session;
pub use state::{
    FailedAction, LastError, LiveTranscriptBuffer, PracticeResult, PresentationData, SessionState,
};
