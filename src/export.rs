//! Saving the example reading and the illustration to disk.

use chrono::Local;
use std::path::{Path, PathBuf};

use crate::api::Illustration;
use crate::audio::Waveform;
use crate::error::PracticeError;

fn export_error(err: impl std::fmt::Display) -> PracticeError {
    PracticeError::Export(err.to_string())
}

/// `speaking-buddy-<theme>-<timestamp>.<ext>` inside `dir`.
fn export_path(dir: &Path, theme: &str, extension: &str) -> PathBuf {
    let slug: String = theme
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    let name = if slug.is_empty() {
        format!("speaking-buddy-{}.{}", stamp, extension)
    } else {
        format!("speaking-buddy-{}-{}.{}", slug, stamp, extension)
    };
    dir.join(name)
}

/// Write the waveform as 16-bit PCM WAV.
pub fn write_wav(waveform: &Waveform, dir: &Path, theme: &str) -> Result<PathBuf, PracticeError> {
    if waveform.is_empty() {
        return Err(PracticeError::Export("No audio to save".into()));
    }
    std::fs::create_dir_all(dir).map_err(export_error)?;
    let path = export_path(dir, theme, "wav");

    let spec = hound::WavSpec {
        channels: waveform.channels.max(1),
        sample_rate: waveform.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).map_err(export_error)?;
    for &sample in &waveform.samples {
        writer.write_sample(sample).map_err(export_error)?;
    }
    writer.finalize().map_err(export_error)?;

    tracing::info!(path = %path.display(), "Saved example audio");
    Ok(path)
}

/// Write the illustration bytes unchanged. The extension follows the
/// detected image format, not the declared mime type.
pub fn write_illustration(
    illustration: &Illustration,
    dir: &Path,
    theme: &str,
) -> Result<PathBuf, PracticeError> {
    let format = image::guess_format(&illustration.bytes).map_err(export_error)?;
    let extension = format
        .extensions_str()
        .first()
        .copied()
        .unwrap_or_else(|| illustration.extension());

    std::fs::create_dir_all(dir).map_err(export_error)?;
    let path = export_path(dir, theme, extension);
    std::fs::write(&path, &illustration.bytes).map_err(export_error)?;

    tracing::info!(path = %path.display(), ?format, "Saved illustration");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_png() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(2, 2, image::Rgb([255, 200, 0]));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn wav_round_trips_through_hound() {
        let dir = tempfile::tempdir().unwrap();
        let wave = Waveform {
            samples: vec![0, 1000, -1000, i16::MAX],
            sample_rate: 24000,
            channels: 1,
        };
        let path = write_wav(&wave, dir.path(), "Zoo animals").unwrap();
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("speaking-buddy-zoo-animals-"));

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 24000);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, wave.samples);
    }

    #[test]
    fn empty_waveform_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let wave = Waveform {
            samples: vec![],
            sample_rate: 24000,
            channels: 1,
        };
        assert!(matches!(
            write_wav(&wave, dir.path(), "x"),
            Err(PracticeError::Export(_))
        ));
    }

    #[test]
    fn illustration_extension_follows_content() {
        let dir = tempfile::tempdir().unwrap();
        let ill = Illustration {
            bytes: tiny_png(),
            mime_type: "image/jpeg".into(),
        };
        let path = write_illustration(&ill, dir.path(), "").unwrap();
        assert_eq!(path.extension().unwrap(), "png");
        assert_eq!(std::fs::read(&path).unwrap(), ill.bytes);
    }

    #[test]
    fn garbage_illustration_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let ill = Illustration {
            bytes: vec![1, 2, 3, 4],
            mime_type: "image/png".into(),
        };
        assert!(write_illustration(&ill, dir.path(), "beach").is_err());
    }
}
