//! Sample-format conversions shared by the capture and playback paths.

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::CAPTURE_MIME_TYPE;

/// One base64 PCM16 chunk ready for the live channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaChunk {
    pub data: String,
    pub mime_type: String,
}

impl MediaChunk {
    pub fn from_pcm16(samples: &[i16]) -> Self {
        Self {
            data: general_purpose::STANDARD.encode(pcm16_to_le_bytes(samples)),
            mime_type: CAPTURE_MIME_TYPE.to_string(),
        }
    }
}

/// Decoded speech, 16-bit interleaved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Waveform {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl Waveform {
    pub fn from_pcm16_le(bytes: &[u8], sample_rate: u32, channels: u16) -> Self {
        Self {
            samples: decode_pcm16_le(bytes),
            sample_rate,
            channels,
        }
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Mono f32 samples in [-1, 1).
    pub fn to_mono_f32(&self) -> Vec<f32> {
        downmix(&pcm16_to_f32(&self.samples), self.channels as usize)
    }
}

/// Average interleaved frames down to one channel.
pub fn downmix(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Simple linear resampling
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() || from_rate == 0 || to_rate == 0 {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let new_len = (samples.len() as f64 / ratio) as usize;
    let mut output = Vec::with_capacity(new_len);

    for i in 0..new_len {
        let src_pos = i as f64 * ratio;
        let src_idx = src_pos as usize;
        let frac = (src_pos - src_idx as f64) as f32;

        let s1 = samples.get(src_idx).copied().unwrap_or(0.0);
        let s2 = samples.get(src_idx + 1).copied().unwrap_or(s1);

        output.push(s1 + (s2 - s1) * frac);
    }

    output
}

/// Linear resampler for a stream that arrives in blocks. The read position
/// and the previous block's last sample carry over, so block boundaries
/// neither drop samples nor restart the interpolation.
pub struct StreamResampler {
    ratio: f64,
    // Source position relative to the current block; -1.0 is `prev`.
    pos: f64,
    prev: Option<f32>,
}

impl StreamResampler {
    pub fn new(from_rate: u32, to_rate: u32) -> Self {
        let ratio = if from_rate == 0 || to_rate == 0 {
            1.0
        } else {
            from_rate as f64 / to_rate as f64
        };
        Self {
            ratio,
            pos: 0.0,
            prev: None,
        }
    }

    pub fn process(&mut self, block: &[f32]) -> Vec<f32> {
        if block.is_empty() {
            return Vec::new();
        }
        if self.ratio == 1.0 {
            return block.to_vec();
        }

        let len = block.len();
        let at = |idx: isize| -> f32 {
            if idx < 0 {
                self.prev.unwrap_or(block[0])
            } else {
                block[idx as usize]
            }
        };

        let mut output = Vec::with_capacity((len as f64 / self.ratio) as usize + 1);
        let mut pos = self.pos;
        while pos < (len - 1) as f64 {
            let idx = pos.floor() as isize;
            let frac = (pos - idx as f64) as f32;
            let s1 = at(idx);
            let s2 = at(idx + 1);
            output.push(s1 + (s2 - s1) * frac);
            pos += self.ratio;
        }

        self.pos = pos - len as f64;
        self.prev = block.last().copied();
        output
    }
}

pub fn f32_to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .collect()
}

pub fn pcm16_to_f32(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| s as f32 / 32768.0).collect()
}

/// Little-endian byte packing
pub fn pcm16_to_le_bytes(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}

/// A trailing odd byte is dropped.
pub fn decode_pcm16_le(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Root mean square of a float buffer, for the input meter.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Turn one device callback buffer into a live-channel chunk:
/// mono, 16 kHz, PCM16, base64. `resampler` must target the capture rate
/// and persist across callbacks.
pub fn encode_capture_frame(
    data: &[f32],
    channels: usize,
    resampler: &mut StreamResampler,
) -> Option<MediaChunk> {
    let mono = downmix(data, channels);
    let resampled = resampler.process(&mono);
    if resampled.is_empty() {
        return None;
    }
    Some(MediaChunk::from_pcm16(&f32_to_pcm16(&resampled)))
}
