//! Speaker output for the synthesized example reading.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::collections::VecDeque;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use super::pcm::{resample_linear, Waveform};
use crate::error::PracticeError;

/// Plays one waveform at a time through the default output device.
pub struct SpeechPlayer {
    stream: Option<cpal::Stream>,
    queue: Arc<Mutex<VecDeque<f32>>>,
    playing: Arc<AtomicBool>,
}

impl SpeechPlayer {
    pub fn new() -> Self {
        Self {
            stream: None,
            queue: Arc::new(Mutex::new(VecDeque::new())),
            playing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start playing `waveform`. Returns `Ok(false)` without touching the
    /// device when something is already playing.
    pub fn play(&mut self, waveform: &Waveform) -> Result<bool, PracticeError> {
        if self.is_playing() {
            tracing::debug!("Playback already active, ignoring play request");
            return Ok(false);
        }
        // A finished stream may still hold the device.
        self.release();

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| PracticeError::Playback("No audio output device found".into()))?;
        let config = device
            .default_output_config()
            .map_err(|e| PracticeError::Playback(e.to_string()))?;

        let device_rate = config.sample_rate();
        let channels = config.channels() as usize;
        let samples = resample_linear(&waveform.to_mono_f32(), waveform.sample_rate, device_rate);

        if let Ok(mut buf) = self.queue.lock() {
            buf.clear();
            buf.extend(samples);
        }
        self.playing.store(true, Ordering::SeqCst);

        let err_fn = |err| tracing::error!("Audio output stream error: {}", err);

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => {
                let queue = self.queue.clone();
                let playing = self.playing.clone();
                device.build_output_stream(
                    &config.into(),
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        fill_frames(data, channels, &queue, &playing, |s| s)
                    },
                    err_fn,
                    None,
                )
            }
            cpal::SampleFormat::I16 => {
                let queue = self.queue.clone();
                let playing = self.playing.clone();
                device.build_output_stream(
                    &config.into(),
                    move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                        fill_frames(data, channels, &queue, &playing, |s| {
                            (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
                        })
                    },
                    err_fn,
                    None,
                )
            }
            other => {
                self.playing.store(false, Ordering::SeqCst);
                return Err(PracticeError::Playback(format!(
                    "Unsupported output sample format: {:?}",
                    other
                )));
            }
        };

        let stream = match stream {
            Ok(s) => s,
            Err(e) => {
                self.playing.store(false, Ordering::SeqCst);
                return Err(PracticeError::Playback(e.to_string()));
            }
        };

        if let Err(e) = stream.play() {
            self.playing.store(false, Ordering::SeqCst);
            return Err(PracticeError::Playback(e.to_string()));
        }

        tracing::info!(
            device_rate,
            seconds = waveform.duration().as_secs_f32(),
            "Playback started"
        );
        self.stream = Some(stream);
        Ok(true)
    }

    /// Stop immediately and release the device. Safe to call when idle.
    pub fn stop(&mut self) {
        let was_playing = self.playing.swap(false, Ordering::SeqCst);
        if let Ok(mut buf) = self.queue.lock() {
            buf.clear();
        }
        self.release();
        if was_playing {
            tracing::info!("Playback stopped");
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    /// Drop the stream after a playback ran to its end.
    pub fn release_finished(&mut self) -> bool {
        if self.is_playing() || self.stream.is_none() {
            return false;
        }
        self.release();
        tracing::debug!("Playback finished, output stream released");
        true
    }

    fn release(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.pause();
        }
    }
}

impl Default for SpeechPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SpeechPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Copy queued mono samples into every channel of each output frame.
/// Clears `playing` once the queue runs dry.
fn fill_frames<T: Copy + Default>(
    data: &mut [T],
    channels: usize,
    queue: &Mutex<VecDeque<f32>>,
    playing: &AtomicBool,
    convert: impl Fn(f32) -> T,
) {
    let Ok(mut buf) = queue.lock() else {
        data.iter_mut().for_each(|s| *s = T::default());
        return;
    };
    for frame in data.chunks_mut(channels.max(1)) {
        let value = buf.pop_front().map(&convert).unwrap_or_default();
        frame.iter_mut().for_each(|s| *s = value);
    }
    if buf.is_empty() {
        playing.store(false, Ordering::SeqCst);
    }
}
