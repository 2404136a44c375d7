//! Voice identifiers, sample formats, and playback modes.
//!
//! A voice is one independently playable sound slot in the shared command
//! table. Identifiers are signed so that "no voice" can be expressed as a
//! negative value, which playback operations treat as a silent no-op.

use serde::{Deserialize, Serialize};

/// Index of a loaded voice in the shared command table.
///
/// Valid ids are `0..voice_count()`. Negative values mean "no voice" and are
/// ignored by playback operations, so a failed load can be carried around
/// without special-casing every call site.
pub type VoiceId = i16;

/// Placeholder id for "no sound loaded".
pub const NO_VOICE: VoiceId = -1;

/// Number of voice slots in the shared command table.
pub const VOICE_CAPACITY: usize = 93;

/// Pan value for fully left output.
pub const PAN_LEFT: u8 = 1 << 4;

/// Pan value for fully right output.
pub const PAN_RIGHT: u8 = 0;

/// Bit depth of a raw PCM sample asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PcmDepth {
    /// 16-bit signed big-endian samples.
    Pcm16,
    /// 8-bit signed samples.
    Pcm8,
}

impl PcmDepth {
    /// Bits per sample.
    pub fn bits_per_sample(self) -> i32 {
        match self {
            PcmDepth::Pcm16 => 16,
            PcmDepth::Pcm8 => 8,
        }
    }

    /// Largest raw payload accepted for this depth, in bytes.
    pub fn byte_budget(self) -> usize {
        match self {
            PcmDepth::Pcm16 => 128 * 1024,
            PcmDepth::Pcm8 => 64 * 1024,
        }
    }

    /// Descriptor format tag written into the voice slot.
    pub fn format(self) -> SampleFormat {
        match self {
            PcmDepth::Pcm16 => SampleFormat::Pcm16,
            PcmDepth::Pcm8 => SampleFormat::Pcm8,
        }
    }
}

/// Format tag stored in a voice descriptor's bit-depth field.
///
/// The coprocessor dispatches its decode loop on this byte, so the raw
/// values are part of the shared-memory contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SampleFormat {
    /// 16-bit PCM, two bytes per sample.
    Pcm16 = 0,
    /// 8-bit PCM, one byte per sample.
    Pcm8 = 1,
    /// ADX compressed stream, 18-byte blocks of 32 samples.
    Adx = 2,
}

impl SampleFormat {
    /// Decode the descriptor byte back into a format tag.
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(SampleFormat::Pcm16),
            1 => Some(SampleFormat::Pcm8),
            2 => Some(SampleFormat::Adx),
            _ => None,
        }
    }

    /// Bytes of sound RAM occupied per unit of descriptor play length.
    ///
    /// Play length counts samples for PCM voices and 18-byte blocks for ADX,
    /// so the occupied byte count is `play_size * bytes_per_play_unit`.
    pub fn bytes_per_play_unit(self) -> u32 {
        match self {
            SampleFormat::Pcm16 => 2,
            SampleFormat::Pcm8 => 1,
            SampleFormat::Adx => 18,
        }
    }
}

/// Loop and stop behaviour of a playing voice.
///
/// The ordinal values are read by the coprocessor; positive modes loop and
/// are stopped cooperatively, non-positive modes play once and can be
/// silenced immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i8)]
pub enum PlayMode {
    /// Loop, reversing playback direction at each end.
    AlternatingLoop = 3,
    /// Loop playing backwards.
    ReverseLoop = 2,
    /// Loop playing forwards.
    ForwardLoop = 1,
    /// Play once; stop silences the voice at once.
    Volatile = 0,
    /// Play once; stop lets the current pass run to its end.
    Protected = -1,
    /// Play once; like [`PlayMode::Protected`] but pre-emptible by new requests.
    Semi = -2,
}

impl PlayMode {
    /// Raw ordinal written into the descriptor's mode field.
    pub fn as_raw(self) -> i8 {
        self as i8
    }

    /// Decode a descriptor mode byte.
    pub fn from_raw(raw: i8) -> Option<Self> {
        match raw {
            3 => Some(PlayMode::AlternatingLoop),
            2 => Some(PlayMode::ReverseLoop),
            1 => Some(PlayMode::ForwardLoop),
            0 => Some(PlayMode::Volatile),
            -1 => Some(PlayMode::Protected),
            -2 => Some(PlayMode::Semi),
            _ => None,
        }
    }

    /// Whether this mode loops until stopped.
    pub fn is_looping(self) -> bool {
        self.as_raw() > 0
    }
}
