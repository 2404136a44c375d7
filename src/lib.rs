//! Sound driver core for the Saturn's dual-CPU audio subsystem.
//!
//! The host CPU does not play audio itself: it stages sample data and
//! per-voice playback state in a shared 512 KiB sound RAM, and a dedicated
//! 68k coprocessor running its own firmware decodes and mixes from there at
//! its own cadence. This crate is the host side of that contract: a bump
//! allocator over the sample region, the rate/pitch and frame-timing
//! encoders that translate sample rates into the hardware's parameter
//! formats, ADX compressed-stream validation, the voice descriptor table
//! with its publish-by-count discipline, and the CD-audio transport.
//!
//! # Features
//! - Bump-allocated sample arena with rollback-based unloading
//! - 93-voice descriptor table published through shared memory
//! - Floating-point style pitch-word encoding against the 44.1 kHz reference
//! - ADX header validation with frame-timing and working-set derivation
//! - Fire-and-forget vblank synchronization trigger
//! - CD-audio track playback with volume/pan shadowing
//!
//! # Crate feature flags
//! - `adx` (default): ADX compressed-stream validation and loading
//! - `cdda` (default): CD-audio transport controller
//! - `snd-bank` (default): `.snd` sample-library loading (LZSS)
//! - `wav-import` (optional): WAV import convenience via hound
//!
//! # Quick start
//! ```no_run
//! use scsp_driver::{DriverConfig, FsStorage, PlayMode, SoundDriver};
//!
//! # fn main() -> scsp_driver::Result<()> {
//! let mut storage = FsStorage::new("cd/data");
//! let mut driver = SoundDriver::initialize(DriverConfig::default(), &mut storage)?;
//!
//! let bump = driver.load_pcm16(&mut storage, "BUMP16.PCM")?;
//! driver.play(bump, PlayMode::Protected, 7);
//!
//! // Once per display frame, from the frame timer:
//! let vblank = driver.vblank_trigger();
//! vblank.fire();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod arena;
pub mod driver;
pub mod memory;
pub mod pitch;
pub mod storage;
pub mod timing;
pub mod voice;

#[cfg(feature = "adx")]
pub mod adx;

#[cfg(feature = "snd-bank")]
pub mod bank;

#[cfg(feature = "cdda")]
pub mod cdda;

#[cfg(feature = "wav-import")]
pub mod wav;

/// Error type for sound driver operations.
///
/// Every failure is non-fatal: a failed load leaves the allocator cursor and
/// the published voice count untouched, and the caller decides whether to
/// retry, substitute, or drop the asset.
#[derive(thiserror::Error, Debug)]
pub enum DriverError {
    /// The sample arena cannot fit the requested reservation.
    #[error("sound RAM exhausted: {requested} bytes requested, {available} free")]
    RamFull {
        /// Padded reservation size that was refused.
        requested: u32,
        /// Bytes left between the cursor and the region end.
        available: u32,
    },

    /// Every voice descriptor slot is already published.
    #[error("all {0} voice slots are in use")]
    SlotsFull(usize),

    /// A raw sample payload exceeds the per-depth byte budget.
    #[error("sample of {size} bytes exceeds the {limit} byte budget for {depth:?}")]
    SampleTooLarge {
        /// Payload size in bytes.
        size: usize,
        /// Budget for this bit depth.
        limit: usize,
        /// Bit depth the payload was declared as.
        depth: PcmDepth,
    },

    /// A stream or bank header failed structural validation.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// A compressed stream decodes at a rate the coprocessor cannot pace.
    #[error("unsupported decode rate: {0} bytes per blank")]
    UnsupportedRate(u16),

    /// The storage collaborator could not supply the requested bytes.
    #[error("storage error: {0}")]
    Storage(String),

    /// IO error from the host filesystem.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl From<String> for DriverError {
    fn from(msg: String) -> Self {
        DriverError::Other(msg)
    }
}

impl From<&str> for DriverError {
    fn from(msg: &str) -> Self {
        DriverError::Other(msg.to_string())
    }
}

/// Result type for driver operations.
pub type Result<T> = std::result::Result<T, DriverError>;

// Public API exports
pub use arena::{Arena, LOAD_BOUNDARY, PCM_REGION_END, PCM_REGION_START};
pub use driver::{AdxQuality, DriverConfig, SoundDriver, VblankTrigger, DEFAULT_SAMPLE_RATE};
pub use memory::{
    CommandBlock, CommandBlockMut, ScspControl, SoundMemory, SyncFlag, VoiceSlot, VoiceSlotMut,
};
pub use pitch::{pitch_word, SCSP_FREQUENCY};
pub use storage::{FsStorage, MemStorage, SampleFile, Storage};
pub use timing::{bytes_per_blank, VideoStandard};
pub use voice::{
    PcmDepth, PlayMode, SampleFormat, VoiceId, NO_VOICE, PAN_LEFT, PAN_RIGHT, VOICE_CAPACITY,
};

#[cfg(feature = "adx")]
pub use adx::{AdxHeader, AdxParams};

#[cfg(feature = "cdda")]
pub use cdda::{CdBlock, CdPlayMode, CdTransport, TrackRange};

#[cfg(feature = "snd-bank")]
pub use bank::BankEntry;

#[cfg(feature = "wav-import")]
pub use wav::WavPcm;
