//! WAV import convenience.
//!
//! Assets are normally authored offline as raw big-endian PCM, but for
//! tooling and quick iteration it is handy to load a WAV directly. Only the
//! shapes the hardware can play are accepted: mono, integer, 8 or 16 bits
//! per sample. The samples are re-serialized big-endian as the coprocessor
//! expects them.

use crate::voice::PcmDepth;
use crate::{DriverError, Result};
use std::io::Cursor;

/// A WAV file decoded into loader-ready raw PCM.
#[derive(Debug, Clone)]
pub struct WavPcm {
    /// Raw sample bytes, big-endian for 16-bit data.
    pub data: Vec<u8>,
    /// Bit depth of the samples.
    pub depth: PcmDepth,
    /// Sample rate in Hz.
    pub sample_rate: i32,
}

/// Decode a mono integer WAV into raw PCM bytes.
pub fn decode_wav(wav: &[u8]) -> Result<WavPcm> {
    let mut reader = hound::WavReader::new(Cursor::new(wav))
        .map_err(|e| DriverError::InvalidHeader(format!("WAV: {e}")))?;
    let spec = reader.spec();

    if spec.channels != 1 {
        return Err(DriverError::InvalidHeader(format!(
            "WAV has {} channels, expected mono",
            spec.channels
        )));
    }
    if spec.sample_format != hound::SampleFormat::Int {
        return Err(DriverError::InvalidHeader(
            "WAV uses float samples, expected integer PCM".into(),
        ));
    }
    let depth = match spec.bits_per_sample {
        16 => PcmDepth::Pcm16,
        8 => PcmDepth::Pcm8,
        bits => {
            return Err(DriverError::InvalidHeader(format!(
                "WAV has {bits} bits per sample, expected 8 or 16"
            )))
        }
    };

    let mut data = Vec::new();
    for sample in reader.samples::<i16>() {
        let sample = sample.map_err(|e| DriverError::InvalidHeader(format!("WAV: {e}")))?;
        match depth {
            PcmDepth::Pcm16 => data.extend_from_slice(&sample.to_be_bytes()),
            PcmDepth::Pcm8 => data.push(sample as i8 as u8),
        }
    }

    Ok(WavPcm {
        data,
        depth,
        sample_rate: spec.sample_rate as i32,
    })
}
