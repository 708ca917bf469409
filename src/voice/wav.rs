//! WAV container encoding and decoding

use std::io::Cursor;
use std::path::Path;

use crate::{Error, Result};

/// Encode mono 16-bit PCM samples as a WAV file
///
/// # Errors
///
/// Returns error if the WAV writer fails
pub fn samples_to_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}

/// Decoded mono 16-bit audio
#[derive(Debug, Clone)]
pub struct WavAudio {
    /// Samples, first channel only
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

/// Read a 16-bit integer WAV file, keeping only the first channel
///
/// # Errors
///
/// Returns error if the file cannot be read or is not 16-bit integer PCM
pub fn read_wav(path: &Path) -> Result<WavAudio> {
    let reader = hound::WavReader::open(path)?;
    decode(reader)
}

/// Decode a 16-bit integer WAV held in memory
///
/// # Errors
///
/// Returns error if the bytes are not 16-bit integer PCM WAV
pub fn wav_to_samples(bytes: &[u8]) -> Result<WavAudio> {
    let reader = hound::WavReader::new(Cursor::new(bytes))?;
    decode(reader)
}

fn decode<R: std::io::Read>(mut reader: hound::WavReader<R>) -> Result<WavAudio> {
    let spec = reader.spec();
    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(Error::Audio(format!(
            "expected 16-bit integer PCM, got {} bit {:?}",
            spec.bits_per_sample, spec.sample_format
        )));
    }

    let channels = usize::from(spec.channels.max(1));
    let samples = reader
        .samples::<i16>()
        .step_by(channels)
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(WavAudio {
        samples,
        sample_rate: spec.sample_rate,
    })
}
