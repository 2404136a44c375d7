//! Frame-timing budget derivation.
//!
//! The coprocessor paces decoding against the display refresh: every vertical
//! blank it must have produced enough bytes of audio to cover one frame of
//! real-time playback. That per-frame byte count ("bytes per blank") is
//! derived from the sample rate and bit depth here, and doubles as the rate
//! check for compressed streams.

use crate::voice::PcmDepth;
use serde::{Deserialize, Serialize};

/// Display refresh standard of the host region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoStandard {
    /// 60 Hz refresh.
    #[default]
    Ntsc,
    /// 50 Hz refresh.
    Pal,
}

impl VideoStandard {
    /// Display refresh rate in frames per second.
    pub fn frames_per_second(self) -> i32 {
        match self {
            VideoStandard::Ntsc => 60,
            VideoStandard::Pal => 50,
        }
    }
}

/// Bytes of decoded audio required per display frame to sustain playback.
pub fn bytes_per_blank(sample_rate: i32, depth: PcmDepth, standard: VideoStandard) -> u16 {
    (((sample_rate * depth.bits_per_sample()) >> 3) / standard.frames_per_second()) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_for_16bit_ntsc() {
        assert_eq!(bytes_per_blank(15_360, PcmDepth::Pcm16, VideoStandard::Ntsc), 512);
    }

    #[test]
    fn test_budget_for_8bit_ntsc() {
        assert_eq!(bytes_per_blank(15_360, PcmDepth::Pcm8, VideoStandard::Ntsc), 256);
    }

    #[test]
    fn test_budget_scales_with_refresh_rate() {
        assert_eq!(bytes_per_blank(15_360, PcmDepth::Pcm16, VideoStandard::Pal), 614);
    }

    #[test]
    fn test_adx_master_rates() {
        // The four NTSC ADX master rates map onto the supported decode set.
        for (rate, expected) in [(23_040, 768), (15_360, 512), (11_520, 384), (7_680, 256)] {
            assert_eq!(bytes_per_blank(rate, PcmDepth::Pcm16, VideoStandard::Ntsc), expected);
        }
    }
}
