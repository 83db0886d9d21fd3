//! Session state and the entities it exposes for display.

use std::fmt;

use crate::api::prompts::personalize;
use crate::api::{Illustration, ScoreReport, ScriptDraft};
use crate::error::PracticeError;
use crate::level::ProficiencyLevel;

/// The single state of a practice session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    GeneratingImage,
    GeneratingScript,
    Ready,
    Practicing,
    Scoring,
    Result,
    Error,
}

impl SessionState {
    pub fn label(self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::GeneratingImage => "Drawing picture",
            SessionState::GeneratingScript => "Writing script",
            SessionState::Ready => "Ready",
            SessionState::Practicing => "Practicing",
            SessionState::Scoring => "Scoring",
            SessionState::Result => "Result",
            SessionState::Error => "Error",
        }
    }

    /// States in which a presentation must exist.
    pub fn has_presentation(self) -> bool {
        matches!(
            self,
            SessionState::Ready
                | SessionState::Practicing
                | SessionState::Scoring
                | SessionState::Result
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Picture plus the personalised script the child reads aloud.
#[derive(Clone, Debug, PartialEq)]
pub struct PresentationData {
    pub theme: String,
    pub level: ProficiencyLevel,
    pub illustration: Illustration,
    pub intro: String,
    pub points: Vec<String>,
    pub conclusion: String,
    /// `intro`, every point and `conclusion` joined by single spaces.
    pub script: String,
}

impl PresentationData {
    pub fn assemble(
        theme: &str,
        level: ProficiencyLevel,
        illustration: Illustration,
        draft: ScriptDraft,
        child_name: &str,
    ) -> Self {
        let intro = personalize(&draft.intro, child_name);
        let points: Vec<String> = draft
            .points
            .iter()
            .map(|p| personalize(p, child_name))
            .collect();
        let conclusion = personalize(&draft.conclusion, child_name);

        let mut script = intro.clone();
        for part in points.iter().chain(std::iter::once(&conclusion)) {
            script.push(' ');
            script.push_str(part);
        }

        Self {
            theme: theme.to_string(),
            level,
            illustration,
            intro,
            points,
            conclusion,
            script,
        }
    }

    pub fn word_count(&self) -> usize {
        self.script.split_whitespace().count()
    }
}

/// Fragments received during one practice attempt, in arrival order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LiveTranscriptBuffer {
    fragments: Vec<String>,
}

impl LiveTranscriptBuffer {
    pub fn push(&mut self, fragment: String) {
        self.fragments.push(fragment);
    }

    pub fn clear(&mut self) {
        self.fragments.clear();
    }

    /// Fragments joined with single spaces, whitespace runs collapsed.
    pub fn text(&self) -> String {
        self.fragments
            .iter()
            .flat_map(|f| f.split_whitespace())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.iter().all(|f| f.trim().is_empty())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PracticeResult {
    pub score: f64,
    pub cefr_level: String,
    pub mistakes: Vec<String>,
    pub feedback: String,
    pub transcript: String,
}

impl PracticeResult {
    pub fn from_report(report: ScoreReport, transcript: String) -> Self {
        Self {
            score: report.score.clamp(0.0, 100.0),
            cefr_level: report.cefr_level,
            mistakes: report.mistakes,
            feedback: report.feedback,
            transcript,
        }
    }

    /// 0 to 5 stars.
    pub fn stars(&self) -> u8 {
        (self.score / 20.0).round().clamp(0.0, 5.0) as u8
    }
}

/// What `retry` re-issues after a failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailedAction {
    Start {
        theme: String,
        level: ProficiencyLevel,
    },
    Practice,
    Scoring {
        transcript: String,
    },
}

/// Last failure shown to the user. Notices carry no action and leave the
/// state unchanged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LastError {
    pub error: PracticeError,
    pub action: Option<FailedAction>,
}

impl LastError {
    pub fn notice(error: PracticeError) -> Self {
        Self {
            error,
            action: None,
        }
    }

    pub fn message(&self) -> String {
        self.error.to_string()
    }
}
