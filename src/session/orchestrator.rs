//! The practice session: theme and level in, picture and script out, then
//! record, transcribe and score.
//!
//! Every user intent is a method on [`Session`]. Intents that do not apply to
//! the current state are logged and return `false`. Provider and device
//! failures never escape: they move the session to [`SessionState::Error`]
//! with enough context for [`Session::retry`] to re-issue the failed step.

use std::path::{Path, PathBuf};

use super::state::{
    FailedAction, LastError, LiveTranscriptBuffer, PracticeResult, PresentationData, SessionState,
};
use crate::api::{ContentGenerator, LiveEvent, LiveLink, SpeechScorer, TranscriptionChannel};
use crate::audio::{AudioIo, Waveform};
use crate::config::Credentials;
use crate::error::PracticeError;
use crate::export;
use crate::level::ProficiencyLevel;
use crate::themes::{find_theme, ThemeSelection};

pub struct Session {
    generator: Box<dyn ContentGenerator>,
    scorer: Box<dyn SpeechScorer>,
    channel: Box<dyn TranscriptionChannel>,
    audio: Box<dyn AudioIo>,

    credentials: Credentials,
    child_name: String,
    level: ProficiencyLevel,
    selection: ThemeSelection,

    state: SessionState,
    presentation: Option<PresentationData>,
    transcript: LiveTranscriptBuffer,
    result: Option<PracticeResult>,
    last_error: Option<LastError>,

    link: Option<LiveLink>,
    /// Synthesized reading of the current script, fetched on first play.
    speech: Option<Waveform>,
}

impl Session {
    pub fn new(
        generator: Box<dyn ContentGenerator>,
        scorer: Box<dyn SpeechScorer>,
        channel: Box<dyn TranscriptionChannel>,
        audio: Box<dyn AudioIo>,
        credentials: Credentials,
    ) -> Self {
        Self {
            generator,
            scorer,
            channel,
            audio,
            credentials,
            child_name: crate::config::DEFAULT_CHILD_NAME.to_string(),
            level: ProficiencyLevel::default(),
            selection: ThemeSelection::default(),
            state: SessionState::Idle,
            presentation: None,
            transcript: LiveTranscriptBuffer::default(),
            result: None,
            last_error: None,
            link: None,
            speech: None,
        }
    }

    // --- GETTERS ---

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn presentation(&self) -> Option<&PresentationData> {
        self.presentation.as_ref()
    }

    pub fn transcript(&self) -> &LiveTranscriptBuffer {
        &self.transcript
    }

    pub fn result(&self) -> Option<&PracticeResult> {
        self.result.as_ref()
    }

    pub fn last_error(&self) -> Option<&LastError> {
        self.last_error.as_ref()
    }

    pub fn selection(&self) -> &ThemeSelection {
        &self.selection
    }

    pub fn level(&self) -> ProficiencyLevel {
        self.level
    }

    pub fn child_name(&self) -> &str {
        &self.child_name
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn is_playing(&self) -> bool {
        self.audio.is_playing()
    }

    pub fn is_capturing(&self) -> bool {
        self.audio.is_capturing()
    }

    pub fn input_level(&self) -> f32 {
        self.audio.input_level()
    }

    // --- SETUP INTENTS ---

    pub fn select_theme(&mut self, id: &str) -> bool {
        if !self.expect_state(SessionState::Idle, "select_theme") {
            return false;
        }
        match find_theme(id) {
            Some(theme) => {
                self.selection.select(theme);
                self.last_error = None;
                tracing::debug!(theme = theme.id, "Theme selected");
                true
            }
            None => {
                self.notice(PracticeError::Validation(format!("Unknown theme: {}", id)));
                false
            }
        }
    }

    pub fn set_custom_theme(&mut self, text: &str) -> bool {
        if !self.expect_state(SessionState::Idle, "set_custom_theme") {
            return false;
        }
        self.selection.set_custom(text);
        self.last_error = None;
        true
    }

    pub fn set_level(&mut self, level: ProficiencyLevel) -> bool {
        if !self.expect_state(SessionState::Idle, "set_level") {
            return false;
        }
        self.level = level;
        tracing::debug!(%level, "Level set");
        true
    }

    /// Takes effect on the next generated script.
    pub fn set_child_name(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            self.notice(PracticeError::Validation("Name cannot be empty".into()));
            return false;
        }
        self.child_name = name.to_string();
        true
    }

    /// Replace the credential. Calls already issued keep the old one.
    /// From `Error` this also returns to `Idle`, keeping the theme selection.
    pub fn change_credential(&mut self, api_key: &str, text_model: &str) {
        self.credentials = Credentials::new(api_key, text_model);
        tracing::info!(credentials = ?self.credentials, "Credential updated");
        if self.state == SessionState::Error {
            self.release_all();
            self.clear_cycle();
            self.transition(SessionState::Idle);
        }
    }

    // --- GENERATION ---

    /// Generate the picture and script for the selected theme.
    pub fn start(&mut self) -> bool {
        if !self.expect_state(SessionState::Idle, "start") {
            return false;
        }
        let Some(theme) = self.selection.theme_text() else {
            self.notice(PracticeError::Validation(
                "Pick one theme or type your own".into(),
            ));
            return false;
        };
        self.last_error = None;
        self.generate(theme, self.level);
        true
    }

    fn generate(&mut self, theme: String, level: ProficiencyLevel) {
        self.transition(SessionState::GeneratingImage);
        let creds = self.credentials.clone();

        let illustration = match self.generator.generate_illustration(&creds, &theme) {
            Ok(image) => image,
            Err(e) => return self.fail(e, FailedAction::Start { theme, level }),
        };
        tracing::info!(bytes = illustration.bytes.len(), "Illustration ready");

        self.transition(SessionState::GeneratingScript);
        let creds = self.credentials.clone();
        let draft = match self
            .generator
            .generate_script(&creds, &illustration, &theme, level)
        {
            Ok(draft) => draft,
            Err(e) => return self.fail(e, FailedAction::Start { theme, level }),
        };

        let presentation =
            PresentationData::assemble(&theme, level, illustration, draft, &self.child_name);
        tracing::info!(
            words = presentation.word_count(),
            points = presentation.points.len(),
            "Script ready"
        );
        self.presentation = Some(presentation);
        self.speech = None;
        self.transition(SessionState::Ready);
    }

    // --- EXAMPLE PLAYBACK ---

    /// Play the example reading. Failures are notices; the session stays
    /// `Ready`. Returns `false` when nothing new started.
    pub fn play_example(&mut self) -> bool {
        if !self.expect_state(SessionState::Ready, "play_example") {
            return false;
        }
        if self.audio.is_playing() {
            return false;
        }
        if self.speech.is_none() {
            let Some(script) = self.presentation.as_ref().map(|p| p.script.clone()) else {
                return false;
            };
            let creds = self.credentials.clone();
            match self.generator.synthesize_speech(&creds, &script) {
                Ok(wave) => self.speech = Some(wave),
                Err(e) => {
                    self.notice(e);
                    return false;
                }
            }
        }
        let Some(wave) = self.speech.as_ref() else {
            return false;
        };
        match self.audio.start_playback(wave) {
            Ok(started) => started,
            Err(e) => {
                self.notice(e);
                false
            }
        }
    }

    pub fn stop_example(&mut self) -> bool {
        let was_playing = self.audio.is_playing();
        self.audio.stop_playback();
        was_playing
    }

    // --- PRACTICE ---

    pub fn start_practice(&mut self) -> bool {
        if !self.expect_state(SessionState::Ready, "start_practice") {
            return false;
        }
        self.last_error = None;
        self.open_practice();
        true
    }

    fn open_practice(&mut self) {
        self.audio.stop_playback();
        self.transcript.clear();
        self.result = None;

        let creds = self.credentials.clone();
        let link = match self.channel.open(&creds) {
            Ok(link) => link,
            Err(e) => return self.fail(e, FailedAction::Practice),
        };
        let Some(sink) = link.chunk_sender() else {
            return self.fail(
                PracticeError::Channel("Channel closed before capture started".into()),
                FailedAction::Practice,
            );
        };
        // Keep the link before capture so a capture failure releases it too.
        self.link = Some(link);

        if let Err(e) = self.audio.start_capture(sink) {
            return self.fail(e, FailedAction::Practice);
        }
        tracing::info!("Microphone and live channel open");
        self.transition(SessionState::Practicing);
    }

    /// Move newly arrived fragments into the transcript. Returns how many
    /// were appended. A stream error ends the attempt.
    pub fn poll(&mut self) -> usize {
        self.audio.release_finished_playback();
        if self.state != SessionState::Practicing {
            return 0;
        }
        let events = match self.link.as_ref() {
            Some(link) => link.drain_events(),
            None => return 0,
        };

        let mut appended = 0;
        for event in events {
            match event {
                LiveEvent::Fragment(text) => {
                    self.transcript.push(text);
                    appended += 1;
                }
                LiveEvent::Error(message) => {
                    self.fail(PracticeError::Channel(message), FailedAction::Practice);
                    break;
                }
            }
        }
        appended
    }

    /// Release the microphone and channel, then score what was heard.
    /// Nothing heard goes straight back to `Ready`.
    pub fn stop_practice(&mut self) -> bool {
        if !self.expect_state(SessionState::Practicing, "stop_practice") {
            return false;
        }
        self.audio.stop_capture();
        if let Some(mut link) = self.link.take() {
            link.close();
            for event in link.drain_events() {
                if let LiveEvent::Fragment(text) = event {
                    self.transcript.push(text);
                }
            }
        }

        if self.transcript.is_empty() {
            tracing::info!("Nothing was heard, skipping scoring");
            self.transition(SessionState::Ready);
            return true;
        }
        let transcript = self.transcript.text();
        self.score(transcript);
        true
    }

    fn score(&mut self, transcript: String) {
        self.transition(SessionState::Scoring);
        let Some(reference) = self.presentation.as_ref().map(|p| p.script.clone()) else {
            return self.fail(
                PracticeError::Generation("No script to score against".into()),
                FailedAction::Scoring { transcript },
            );
        };

        let creds = self.credentials.clone();
        match self.scorer.score(&creds, &reference, &transcript) {
            Ok(report) => {
                let result = PracticeResult::from_report(report, transcript);
                tracing::info!(
                    score = result.score,
                    cefr = %result.cefr_level,
                    mistakes = result.mistakes.len(),
                    "Practice scored"
                );
                self.result = Some(result);
                self.transition(SessionState::Result);
            }
            Err(e) => self.fail(e, FailedAction::Scoring { transcript }),
        }
    }

    // --- RECOVERY ---

    /// From `Result`, practice the same script again. From `Error`, re-issue
    /// the failed step with the same inputs.
    pub fn retry(&mut self) -> bool {
        match self.state {
            SessionState::Result => {
                self.result = None;
                self.transcript.clear();
                self.transition(SessionState::Ready);
                true
            }
            SessionState::Error => {
                let Some(action) = self.last_error.take().and_then(|e| e.action) else {
                    tracing::warn!("Nothing to retry");
                    return false;
                };
                tracing::info!(?action, "Retrying failed action");
                match action {
                    FailedAction::Start { theme, level } => self.generate(theme, level),
                    FailedAction::Practice => self.open_practice(),
                    FailedAction::Scoring { transcript } => self.score(transcript),
                }
                true
            }
            other => {
                tracing::debug!(state = %other, "retry ignored");
                false
            }
        }
    }

    /// Release every device and stream, then clear everything but the
    /// learner settings and credential.
    pub fn reset(&mut self) {
        self.release_all();
        self.clear_cycle();
        self.selection.clear();
        self.transition(SessionState::Idle);
    }

    // --- EXPORT ---

    pub fn export_audio(&mut self, dir: &Path) -> Option<PathBuf> {
        let theme = self.presentation.as_ref().map(|p| p.theme.clone());
        let outcome = match (self.speech.as_ref(), theme) {
            (Some(wave), Some(theme)) => export::write_wav(wave, dir, &theme),
            _ => Err(PracticeError::Export(
                "Play the example first to create its audio".into(),
            )),
        };
        self.export_outcome(outcome)
    }

    pub fn export_illustration(&mut self, dir: &Path) -> Option<PathBuf> {
        let outcome = match self.presentation.as_ref() {
            Some(p) => export::write_illustration(&p.illustration, dir, &p.theme),
            None => Err(PracticeError::Export("No picture yet".into())),
        };
        self.export_outcome(outcome)
    }

    fn export_outcome(&mut self, outcome: Result<PathBuf, PracticeError>) -> Option<PathBuf> {
        match outcome {
            Ok(path) => Some(path),
            Err(e) => {
                self.notice(e);
                None
            }
        }
    }

    // --- INTERNALS ---

    fn transition(&mut self, next: SessionState) {
        debug_assert!(!next.has_presentation() || self.presentation.is_some());
        if self.state != next {
            tracing::info!(from = %self.state, to = %next, "Session transition");
        }
        self.state = next;
    }

    fn expect_state(&self, expected: SessionState, intent: &str) -> bool {
        if self.state == expected {
            return true;
        }
        tracing::debug!(intent, state = %self.state, "Intent ignored in current state");
        false
    }

    /// Record a side-intent failure. In `Error` the pending failure stays so
    /// that `retry` can still re-issue it.
    fn notice(&mut self, error: PracticeError) {
        tracing::warn!(%error, "Notice");
        if self.state == SessionState::Error && self.last_error.is_some() {
            return;
        }
        self.last_error = Some(LastError::notice(error));
    }

    /// Error path: same release as a normal stop, then record what to retry.
    fn fail(&mut self, error: PracticeError, action: FailedAction) {
        tracing::error!(%error, state = %self.state, "Session step failed");
        self.release_practice();
        self.audio.stop_playback();
        self.transcript.clear();
        self.result = None;
        if matches!(action, FailedAction::Start { .. }) {
            self.presentation = None;
            self.speech = None;
        }
        self.last_error = Some(LastError {
            error,
            action: Some(action),
        });
        self.transition(SessionState::Error);
    }

    fn release_practice(&mut self) {
        self.audio.stop_capture();
        if let Some(mut link) = self.link.take() {
            link.close();
        }
    }

    fn release_all(&mut self) {
        self.release_practice();
        self.audio.stop_playback();
    }

    fn clear_cycle(&mut self) {
        self.presentation = None;
        self.speech = None;
        self.transcript.clear();
        self.result = None;
        self.last_error = None;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Illustration, ScoreReport, ScriptDraft};
    use crate::audio::MediaChunk;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::atomic::AtomicBool;
    use std::sync::{mpsc, Arc};

    // --- FAKES ---

    #[derive(Default)]
    struct Calls {
        illustrations: Vec<(String, String)>,
        scripts: Vec<(String, ProficiencyLevel, String)>,
        speech: Vec<String>,
        scores: Vec<(String, String, String)>,
        opens: usize,
        fail_illustration: bool,
        fail_script: bool,
        fail_speech: bool,
        fail_score: bool,
        fail_open: bool,
        events: Option<mpsc::Sender<LiveEvent>>,
        chunks: Option<mpsc::Receiver<MediaChunk>>,
    }

    type Shared = Rc<RefCell<Calls>>;

    struct FakeGenerator(Shared);
    struct FakeScorer(Shared);
    struct FakeChannel(Shared);

    impl ContentGenerator for FakeGenerator {
        fn generate_illustration(
            &self,
            creds: &Credentials,
            theme: &str,
        ) -> Result<Illustration, PracticeError> {
            let mut calls = self.0.borrow_mut();
            calls
                .illustrations
                .push((creds.api_key.clone(), theme.to_string()));
            if calls.fail_illustration {
                return Err(PracticeError::Generation("No image data found".into()));
            }
            Ok(Illustration {
                bytes: vec![0x89, b'P', b'N', b'G'],
                mime_type: "image/png".into(),
            })
        }

        fn generate_script(
            &self,
            creds: &Credentials,
            _illustration: &Illustration,
            theme: &str,
            level: ProficiencyLevel,
        ) -> Result<ScriptDraft, PracticeError> {
            let mut calls = self.0.borrow_mut();
            calls
                .scripts
                .push((theme.to_string(), level, creds.api_key.clone()));
            if calls.fail_script {
                return Err(PracticeError::Generation("Malformed script response".into()));
            }
            Ok(ScriptDraft {
                intro: "Hello everyone, my name is [Name].".into(),
                points: vec!["I see a lion.".into(), "The lion is big.".into()],
                conclusion: "That is all. Thank you for listening.".into(),
            })
        }

        fn synthesize_speech(
            &self,
            _creds: &Credentials,
            text: &str,
        ) -> Result<Waveform, PracticeError> {
            let mut calls = self.0.borrow_mut();
            calls.speech.push(text.to_string());
            if calls.fail_speech {
                return Err(PracticeError::Generation("No audio data generated".into()));
            }
            Ok(Waveform {
                samples: vec![0, 100, -100, 0],
                sample_rate: 24000,
                channels: 1,
            })
        }
    }

    impl SpeechScorer for FakeScorer {
        fn score(
            &self,
            creds: &Credentials,
            reference: &str,
            transcript: &str,
        ) -> Result<ScoreReport, PracticeError> {
            let mut calls = self.0.borrow_mut();
            calls.scores.push((
                creds.api_key.clone(),
                reference.to_string(),
                transcript.to_string(),
            ));
            if calls.fail_score {
                return Err(PracticeError::Generation("Malformed scoring response".into()));
            }
            Ok(ScoreReport {
                score: 72.0,
                cefr_level: "Pre-A1".into(),
                mistakes: vec!["cat".into()],
                feedback: "Good try!".into(),
            })
        }
    }

    impl TranscriptionChannel for FakeChannel {
        fn open(&self, _creds: &Credentials) -> Result<LiveLink, PracticeError> {
            let mut calls = self.0.borrow_mut();
            calls.opens += 1;
            if calls.fail_open {
                return Err(PracticeError::Channel("Setup timeout".into()));
            }
            let (chunk_tx, chunk_rx) = mpsc::channel();
            let (event_tx, event_rx) = mpsc::channel();
            calls.events = Some(event_tx);
            calls.chunks = Some(chunk_rx);
            Ok(LiveLink::new(
                chunk_tx,
                event_rx,
                Arc::new(AtomicBool::new(false)),
                None,
            ))
        }
    }

    #[derive(Default)]
    struct AudioLog {
        capturing: bool,
        playing: bool,
        playback_open: bool,
        captures_started: usize,
        playbacks_started: usize,
        fail_capture: bool,
        sink: Option<mpsc::Sender<MediaChunk>>,
    }

    struct FakeAudio(Rc<RefCell<AudioLog>>);

    impl AudioIo for FakeAudio {
        fn start_capture(&mut self, sink: mpsc::Sender<MediaChunk>) -> Result<(), PracticeError> {
            let mut log = self.0.borrow_mut();
            if log.fail_capture {
                return Err(PracticeError::Permission("No input device found".into()));
            }
            log.capturing = true;
            log.captures_started += 1;
            log.sink = Some(sink);
            Ok(())
        }

        fn stop_capture(&mut self) {
            let mut log = self.0.borrow_mut();
            log.capturing = false;
            log.sink = None;
        }

        fn is_capturing(&self) -> bool {
            self.0.borrow().capturing
        }

        fn start_playback(&mut self, _waveform: &Waveform) -> Result<bool, PracticeError> {
            let mut log = self.0.borrow_mut();
            if log.playing {
                return Ok(false);
            }
            log.playing = true;
            log.playback_open = true;
            log.playbacks_started += 1;
            Ok(true)
        }

        fn stop_playback(&mut self) {
            let mut log = self.0.borrow_mut();
            log.playing = false;
            log.playback_open = false;
        }

        fn is_playing(&self) -> bool {
            self.0.borrow().playing
        }

        fn release_finished_playback(&mut self) -> bool {
            let mut log = self.0.borrow_mut();
            if log.playing || !log.playback_open {
                return false;
            }
            log.playback_open = false;
            true
        }
    }

    struct Harness {
        session: Session,
        calls: Shared,
        audio: Rc<RefCell<AudioLog>>,
    }

    impl Harness {
        fn new() -> Self {
            let calls: Shared = Rc::default();
            let audio: Rc<RefCell<AudioLog>> = Rc::default();
            let session = Session::new(
                Box::new(FakeGenerator(calls.clone())),
                Box::new(FakeScorer(calls.clone())),
                Box::new(FakeChannel(calls.clone())),
                Box::new(FakeAudio(audio.clone())),
                Credentials::new("key-1", ""),
            );
            Self {
                session,
                calls,
                audio,
            }
        }

        fn ready() -> Self {
            let mut h = Self::new();
            h.session.set_child_name("Minh");
            assert!(h.session.select_theme("zoo"));
            assert!(h.session.start());
            assert_eq!(h.session.state(), SessionState::Ready);
            h
        }

        fn practicing() -> Self {
            let mut h = Self::ready();
            assert!(h.session.start_practice());
            assert_eq!(h.session.state(), SessionState::Practicing);
            h
        }

        fn say(&self, fragment: &str) {
            let calls = self.calls.borrow();
            let events = calls.events.as_ref().unwrap();
            events
                .send(LiveEvent::Fragment(fragment.to_string()))
                .unwrap();
        }
    }

    // --- START ---

    #[test]
    fn start_requires_exactly_one_theme_source() {
        let mut h = Harness::new();
        assert!(!h.session.start());
        assert_eq!(h.session.state(), SessionState::Idle);
        assert!(matches!(
            h.session.last_error().map(|e| &e.error),
            Some(PracticeError::Validation(_))
        ));

        assert!(h.session.set_custom_theme("   "));
        assert!(!h.session.start());
        assert!(h.calls.borrow().illustrations.is_empty());

        assert!(h.session.set_custom_theme("My robot"));
        assert!(h.session.start());
        assert_eq!(h.calls.borrow().illustrations[0].1, "My robot");
    }

    #[test]
    fn selecting_catalog_theme_clears_custom_text() {
        let mut h = Harness::new();
        h.session.set_custom_theme("Dinosaurs");
        h.session.select_theme("zoo");
        assert_eq!(h.session.selection().custom(), "");
        assert!(h.session.start());
        assert_eq!(h.calls.borrow().illustrations[0].1, "Zoo animals");
    }

    #[test]
    fn unknown_theme_is_a_notice() {
        let mut h = Harness::new();
        assert!(!h.session.select_theme("volcano"));
        assert_eq!(h.session.state(), SessionState::Idle);
        assert!(h.session.last_error().unwrap().action.is_none());
    }

    #[test]
    fn ready_holds_personalised_script() {
        let h = Harness::ready();
        let p = h.session.presentation().unwrap();
        assert_eq!(
            p.script,
            "Hello everyone, my name is Minh. I see a lion. The lion is big. That is all. Thank you for listening."
        );
        assert_eq!(p.theme, "Zoo animals");
        assert!(h.session.last_error().is_none());
    }

    #[test]
    fn starter_level_is_passed_to_script_generation() {
        let mut h = Harness::new();
        h.session.set_level(ProficiencyLevel::Starter);
        h.session.set_custom_theme("Zoo animals");
        h.session.start();

        let calls = h.calls.borrow();
        assert_eq!(calls.scripts[0].0, "Zoo animals");
        assert_eq!(calls.scripts[0].1, ProficiencyLevel::Starter);
        let max_words = crate::level::policy(ProficiencyLevel::Starter).script_words.1 as usize;
        assert!(h.session.presentation().unwrap().word_count() <= max_words);
    }

    #[test]
    fn level_locked_outside_idle() {
        let mut h = Harness::ready();
        assert!(!h.session.set_level(ProficiencyLevel::B2));
        assert_eq!(h.session.level(), ProficiencyLevel::Starter);
    }

    #[test]
    fn illustration_failure_then_retry_uses_same_inputs() {
        let mut h = Harness::new();
        h.session.set_level(ProficiencyLevel::A2);
        h.session.select_theme("beach");
        h.calls.borrow_mut().fail_illustration = true;

        assert!(h.session.start());
        assert_eq!(h.session.state(), SessionState::Error);
        assert!(h.session.presentation().is_none());
        assert!(h.calls.borrow().scripts.is_empty());
        let err = h.session.last_error().unwrap();
        assert!(matches!(err.error, PracticeError::Generation(_)));
        assert_eq!(
            err.action,
            Some(FailedAction::Start {
                theme: "A day at the beach".into(),
                level: ProficiencyLevel::A2
            })
        );

        h.calls.borrow_mut().fail_illustration = false;
        assert!(h.session.retry());
        assert_eq!(h.session.state(), SessionState::Ready);
        let calls = h.calls.borrow();
        assert_eq!(calls.illustrations.len(), 2);
        assert_eq!(calls.illustrations[1].1, "A day at the beach");
        assert_eq!(calls.scripts[0].1, ProficiencyLevel::A2);
    }

    #[test]
    fn script_failure_leaves_no_partial_presentation() {
        let mut h = Harness::new();
        h.session.select_theme("zoo");
        h.calls.borrow_mut().fail_script = true;
        h.session.start();
        assert_eq!(h.session.state(), SessionState::Error);
        assert!(h.session.presentation().is_none());
    }

    // --- PLAYBACK ---

    #[test]
    fn example_speech_is_fetched_once_and_not_doubled() {
        let mut h = Harness::ready();
        assert!(h.session.play_example());
        assert!(h.session.is_playing());
        assert!(!h.session.play_example());
        assert_eq!(h.audio.borrow().playbacks_started, 1);

        assert!(h.session.stop_example());
        assert!(!h.session.stop_example());
        assert!(h.session.play_example());
        assert_eq!(h.calls.borrow().speech.len(), 1);
        assert!(h.calls.borrow().speech[0].contains("Minh"));
    }

    #[test]
    fn speech_failure_keeps_ready() {
        let mut h = Harness::ready();
        h.calls.borrow_mut().fail_speech = true;
        assert!(!h.session.play_example());
        assert_eq!(h.session.state(), SessionState::Ready);
        assert!(h.session.last_error().unwrap().action.is_none());
    }

    // --- PRACTICE ---

    #[test]
    fn practice_stops_playback_and_opens_devices() {
        let mut h = Harness::ready();
        h.session.play_example();
        assert!(h.session.start_practice());
        assert!(!h.session.is_playing());
        assert!(h.session.is_capturing());
        assert_eq!(h.calls.borrow().opens, 1);
        assert!(!h.session.play_example());
    }

    #[test]
    fn captured_chunks_reach_the_channel() {
        let h = Harness::practicing();
        let sink = h.audio.borrow().sink.clone().unwrap();
        sink.send(MediaChunk::from_pcm16(&[1, 2])).unwrap();
        sink.send(MediaChunk::from_pcm16(&[3, 4])).unwrap();

        let calls = h.calls.borrow();
        let rx = calls.chunks.as_ref().unwrap();
        let got: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            got,
            vec![MediaChunk::from_pcm16(&[1, 2]), MediaChunk::from_pcm16(&[3, 4])]
        );
    }

    #[test]
    fn empty_transcript_skips_scoring() {
        let mut h = Harness::practicing();
        h.say("   ");
        h.session.poll();
        assert!(h.session.stop_practice());
        assert_eq!(h.session.state(), SessionState::Ready);
        assert!(h.calls.borrow().scores.is_empty());
        assert!(!h.session.is_capturing());
    }

    #[test]
    fn transcript_is_scored_verbatim() {
        let mut h = Harness::practicing();
        h.say("I have");
        assert_eq!(h.session.poll(), 1);
        // Arrives after the last poll; still collected on stop.
        h.say("a dog");
        assert!(h.session.stop_practice());

        assert_eq!(h.session.state(), SessionState::Result);
        assert!(!h.session.is_capturing());
        let calls = h.calls.borrow();
        assert_eq!(calls.scores.len(), 1);
        assert_eq!(calls.scores[0].2, "I have a dog");
        assert_eq!(
            calls.scores[0].1,
            h.session.presentation().unwrap().script
        );

        let result = h.session.result().unwrap();
        assert_eq!(result.transcript, "I have a dog");
        assert_eq!(result.stars(), 4);
    }

    #[test]
    fn scoring_failure_retries_same_transcript() {
        let mut h = Harness::practicing();
        h.say("I have a cat");
        h.calls.borrow_mut().fail_score = true;
        h.session.stop_practice();
        assert_eq!(h.session.state(), SessionState::Error);
        assert!(h.session.presentation().is_some());

        h.calls.borrow_mut().fail_score = false;
        assert!(h.session.retry());
        assert_eq!(h.session.state(), SessionState::Result);
        let calls = h.calls.borrow();
        assert_eq!(calls.scores.len(), 2);
        assert_eq!(calls.scores[1].2, "I have a cat");
    }

    #[test]
    fn channel_open_failure_goes_to_error() {
        let mut h = Harness::ready();
        h.calls.borrow_mut().fail_open = true;
        assert!(h.session.start_practice());
        assert_eq!(h.session.state(), SessionState::Error);
        assert!(!h.session.is_capturing());

        h.calls.borrow_mut().fail_open = false;
        assert!(h.session.retry());
        assert_eq!(h.session.state(), SessionState::Practicing);
        assert_eq!(h.calls.borrow().opens, 2);
    }

    #[test]
    fn failed_export_keeps_practice_retryable() {
        let mut h = Harness::ready();
        h.calls.borrow_mut().fail_open = true;
        h.session.start_practice();
        assert_eq!(h.session.state(), SessionState::Error);

        let dir = tempfile::tempdir().unwrap();
        assert!(h.session.export_audio(dir.path()).is_none());
        assert!(matches!(
            h.session.last_error().unwrap().error,
            PracticeError::Channel(_)
        ));

        h.calls.borrow_mut().fail_open = false;
        assert!(h.session.retry());
        assert_eq!(h.session.state(), SessionState::Practicing);
    }

    #[test]
    fn blank_name_keeps_start_retryable() {
        let mut h = Harness::new();
        h.session.select_theme("zoo");
        h.calls.borrow_mut().fail_script = true;
        h.session.start();
        assert_eq!(h.session.state(), SessionState::Error);

        assert!(!h.session.set_child_name("  "));
        assert!(h.session.last_error().unwrap().action.is_some());

        h.calls.borrow_mut().fail_script = false;
        assert!(h.session.retry());
        assert_eq!(h.session.state(), SessionState::Ready);
    }

    #[test]
    fn microphone_failure_releases_channel() {
        let mut h = Harness::ready();
        h.audio.borrow_mut().fail_capture = true;
        h.session.start_practice();
        assert_eq!(h.session.state(), SessionState::Error);
        assert!(matches!(
            h.session.last_error().unwrap().error,
            PracticeError::Permission(_)
        ));
        assert!(h.session.link.is_none());
    }

    #[test]
    fn live_error_moves_to_error_and_releases_microphone() {
        let mut h = Harness::practicing();
        h.say("I have");
        h.calls
            .borrow()
            .events
            .as_ref()
            .unwrap()
            .send(LiveEvent::Error("Connection closed by server".into()))
            .unwrap();
        h.session.poll();
        assert_eq!(h.session.state(), SessionState::Error);
        assert!(!h.session.is_capturing());
        assert!(h.session.link.is_none());
        assert_eq!(
            h.session.last_error().unwrap().action,
            Some(FailedAction::Practice)
        );
    }

    #[test]
    fn stop_is_only_valid_while_practicing() {
        let mut h = Harness::practicing();
        h.say("hello");
        assert!(h.session.stop_practice());
        assert!(!h.session.stop_practice());
        assert_eq!(h.calls.borrow().scores.len(), 1);
    }

    // --- RESULT / RESET ---

    #[test]
    fn retry_from_result_returns_to_ready_with_same_script() {
        let mut h = Harness::practicing();
        h.say("I see a lion");
        h.session.stop_practice();
        let script = h.session.presentation().unwrap().script.clone();

        assert!(h.session.retry());
        assert_eq!(h.session.state(), SessionState::Ready);
        assert!(h.session.result().is_none());
        assert!(h.session.transcript().is_empty());
        assert_eq!(h.session.presentation().unwrap().script, script);
    }

    #[test]
    fn reset_from_practice_releases_everything() {
        let mut h = Harness::practicing();
        h.say("I have");
        h.session.poll();
        h.session.reset();

        assert_eq!(h.session.state(), SessionState::Idle);
        assert!(h.session.presentation().is_none());
        assert!(h.session.result().is_none());
        assert!(h.session.transcript().is_empty());
        assert!(h.session.last_error().is_none());
        assert!(h.session.selection().theme_text().is_none());
        assert!(!h.session.is_capturing());
        assert!(h.session.link.is_none());
    }

    #[test]
    fn reset_twice_is_same_as_once() {
        let mut h = Harness::ready();
        h.session.play_example();
        h.session.reset();
        h.session.reset();
        assert_eq!(h.session.state(), SessionState::Idle);
        assert!(!h.session.is_playing());
    }

    #[test]
    fn changed_credential_applies_to_next_call() {
        let mut h = Harness::new();
        h.session.select_theme("zoo");
        h.calls.borrow_mut().fail_illustration = true;
        h.session.start();
        assert_eq!(h.session.state(), SessionState::Error);

        h.session.change_credential("key-2", "gemini-2.5-flash");
        assert_eq!(h.session.state(), SessionState::Idle);
        assert!(h.session.last_error().is_none());
        assert_eq!(h.session.credentials().text_model, "gemini-2.5-flash");

        h.calls.borrow_mut().fail_illustration = false;
        assert!(h.session.start());
        let calls = h.calls.borrow();
        assert_eq!(calls.illustrations[0].0, "key-1");
        assert_eq!(calls.illustrations[1].0, "key-2");
        assert_eq!(calls.scripts[0].2, "key-2");
    }

    #[test]
    fn poll_releases_finished_playback() {
        let mut h = Harness::ready();
        assert!(h.session.play_example());
        h.session.poll();
        assert!(h.audio.borrow().playback_open);

        h.audio.borrow_mut().playing = false;
        h.session.poll();
        assert!(!h.audio.borrow().playback_open);
        assert_eq!(h.session.state(), SessionState::Ready);
    }

    #[test]
    fn retry_is_ignored_in_idle() {
        let mut h = Harness::new();
        assert!(!h.session.retry());
        assert_eq!(h.session.state(), SessionState::Idle);
    }

    // --- EXPORT ---

    #[test]
    fn export_audio_requires_synthesized_speech() {
        let mut h = Harness::ready();
        let dir = tempfile::tempdir().unwrap();
        assert!(h.session.export_audio(dir.path()).is_none());
        assert!(matches!(
            h.session.last_error().unwrap().error,
            PracticeError::Export(_)
        ));

        h.session.play_example();
        let path = h.session.export_audio(dir.path()).unwrap();
        assert!(path.exists());
        assert_eq!(h.session.state(), SessionState::Ready);
    }
}
