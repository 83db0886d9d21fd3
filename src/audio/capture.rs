//! Microphone capture: device frames in, ordered 16 kHz PCM16 chunks out.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{
    atomic::{AtomicBool, AtomicU32, Ordering},
    mpsc, Arc,
};

use super::pcm::{encode_capture_frame, rms, MediaChunk, StreamResampler};
use super::CAPTURE_SAMPLE_RATE;
use crate::error::PracticeError;

/// An open microphone. Dropping it (or calling [`MicCapture::stop`]) releases
/// the device.
pub struct MicCapture {
    stream: Option<cpal::Stream>,
    stop_signal: Arc<AtomicBool>,
    level: Arc<AtomicU32>,
}

impl MicCapture {
    /// Open the default input device and start forwarding encoded chunks to
    /// `sink`. Chunks leave in the order the device delivered them.
    pub fn start(sink: mpsc::Sender<MediaChunk>) -> Result<Self, PracticeError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or_else(|| {
            PracticeError::Permission("No microphone available. Please connect a microphone.".into())
        })?;
        let config = device
            .default_input_config()
            .map_err(|e| PracticeError::Permission(e.to_string()))?;

        let sample_rate = config.sample_rate();
        let channels = config.channels() as usize;
        let stop_signal = Arc::new(AtomicBool::new(false));
        let level = Arc::new(AtomicU32::new(0));

        tracing::info!(sample_rate, channels, "Opening microphone");

        let err_fn = |err| tracing::error!("Audio input stream error: {}", err);

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => {
                let mut forward = frame_forwarder(sink, channels, sample_rate, &stop_signal, &level);
                device.build_input_stream(
                    &config.into(),
                    move |data: &[f32], _: &_| forward(data),
                    err_fn,
                    None,
                )
            }
            cpal::SampleFormat::I16 => {
                let mut forward = frame_forwarder(sink, channels, sample_rate, &stop_signal, &level);
                device.build_input_stream(
                    &config.into(),
                    move |data: &[i16], _: &_| {
                        let floats: Vec<f32> = data.iter().map(|&s| s as f32 / 32768.0).collect();
                        forward(&floats)
                    },
                    err_fn,
                    None,
                )
            }
            other => {
                return Err(PracticeError::Permission(format!(
                    "Unsupported microphone sample format: {:?}",
                    other
                )))
            }
        }
        .map_err(|e| PracticeError::Permission(e.to_string()))?;

        stream
            .play()
            .map_err(|e| PracticeError::Permission(e.to_string()))?;

        Ok(Self {
            stream: Some(stream),
            stop_signal,
            level,
        })
    }

    /// Release the device. Safe to call more than once.
    pub fn stop(&mut self) {
        self.stop_signal.store(true, Ordering::SeqCst);
        if let Some(stream) = self.stream.take() {
            let _ = stream.pause();
            drop(stream);
            tracing::info!("Microphone released");
        }
    }

    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    /// RMS of the most recent chunk, 0.0 - 1.0.
    pub fn level(&self) -> f32 {
        f32::from_bits(self.level.load(Ordering::Relaxed))
    }
}

impl Drop for MicCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Build the per-callback closure: encode, meter, forward.
fn frame_forwarder(
    sink: mpsc::Sender<MediaChunk>,
    channels: usize,
    sample_rate: u32,
    stop_signal: &Arc<AtomicBool>,
    level: &Arc<AtomicU32>,
) -> impl FnMut(&[f32]) + Send + 'static {
    let stop_signal = stop_signal.clone();
    let level = level.clone();
    let mut resampler = StreamResampler::new(sample_rate, CAPTURE_SAMPLE_RATE);
    move |data: &[f32]| {
        if stop_signal.load(Ordering::Relaxed) {
            return;
        }
        level.store(rms(data).to_bits(), Ordering::Relaxed);
        if let Some(chunk) = encode_capture_frame(data, channels, &mut resampler) {
            // Receiver gone means the channel closed; the stop path follows.
            if sink.send(chunk).is_err() {
                stop_signal.store(true, Ordering::Relaxed);
            }
        }
    }
}
