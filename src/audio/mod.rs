//! Audio I/O: microphone capture for practice and speaker playback for the
//! example reading.
//!
//! The two directions are independent, but both hold a hardware device that
//! must be released on every exit path. [`AudioIo`] is the seam the session
//! drives; [`CpalAudio`] is the real implementation.

mod capture;
pub mod pcm;
mod playback;

use std::sync::mpsc;

pub use capture::MicCapture;
pub use pcm::{MediaChunk, Waveform};
pub use playback::SpeechPlayer;

use crate::error::PracticeError;

/// Capture rate expected by the live transcription model
pub const CAPTURE_SAMPLE_RATE: u32 = 16000;
pub const CAPTURE_MIME_TYPE: &str = "audio/pcm;rate=16000";

/// Output rate of the speech model
pub const SPEECH_SAMPLE_RATE: u32 = 24000;

/// Hardware audio as seen by the session.
pub trait AudioIo {
    /// Open the microphone fresh and stream encoded chunks into `sink`.
    fn start_capture(&mut self, sink: mpsc::Sender<MediaChunk>) -> Result<(), PracticeError>;
    /// Release the microphone. Idempotent.
    fn stop_capture(&mut self);
    fn is_capturing(&self) -> bool;

    /// Returns `Ok(false)` if a playback is already active.
    fn start_playback(&mut self, waveform: &Waveform) -> Result<bool, PracticeError>;
    /// Release the speaker. Idempotent.
    fn stop_playback(&mut self);
    fn is_playing(&self) -> bool;
    /// Close the output stream once the queued audio has drained. Returns
    /// `true` if a stream was released.
    fn release_finished_playback(&mut self) -> bool {
        false
    }

    /// Microphone level for a meter, 0.0 - 1.0.
    fn input_level(&self) -> f32 {
        0.0
    }
}

/// Default-device implementation backed by cpal.
#[derive(Default)]
pub struct CpalAudio {
    capture: Option<MicCapture>,
    player: SpeechPlayer,
}

impl CpalAudio {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioIo for CpalAudio {
    fn start_capture(&mut self, sink: mpsc::Sender<MediaChunk>) -> Result<(), PracticeError> {
        self.stop_capture();
        self.capture = Some(MicCapture::start(sink)?);
        Ok(())
    }

    fn stop_capture(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            capture.stop();
        }
    }

    fn is_capturing(&self) -> bool {
        self.capture.as_ref().is_some_and(MicCapture::is_active)
    }

    fn start_playback(&mut self, waveform: &Waveform) -> Result<bool, PracticeError> {
        self.player.play(waveform)
    }

    fn stop_playback(&mut self) {
        self.player.stop();
    }

    fn is_playing(&self) -> bool {
        self.player.is_playing()
    }

    fn release_finished_playback(&mut self) -> bool {
        self.player.release_finished()
    }

    fn input_level(&self) -> f32 {
        self.capture.as_ref().map(MicCapture::level).unwrap_or(0.0)
    }
}
