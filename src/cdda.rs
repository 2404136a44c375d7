//! CD-audio transport control.
//!
//! CD audio bypasses the voice table entirely: tracks play straight off the
//! disc through the CD block, and the only shared state is the pair of CDDA
//! volume/pan bytes in the command block. The CD block itself is an external
//! collaborator behind the [`CdBlock`] seam, so the transport logic stays
//! testable without a disc drive.

use crate::memory::SoundMemory;
use crate::Result;
use bitflags::bitflags;
use log::debug;
use parking_lot::Mutex;
use std::sync::Arc;

bitflags! {
    /// CD-block play-mode byte.
    ///
    /// The low nibble is the repeat count (all-ones meaning infinite);
    /// a zero byte plays the range once with default pickup behaviour.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CdPlayMode: u8 {
        /// Repeat the selected range until stopped.
        const REPEAT_INFINITE = 0x0F;
    }
}

/// An inclusive range of audio tracks to play, with its play mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackRange {
    /// First track of the range.
    pub from: u8,
    /// Last track of the range, inclusive.
    pub to: u8,
    /// Play-mode byte issued with the range.
    pub mode: CdPlayMode,
}

/// External CD command interface.
pub trait CdBlock {
    /// Start playing a range of audio tracks.
    fn play(&mut self, range: TrackRange) -> Result<()>;

    /// Seek to the default position, halting audio playback.
    fn seek_home(&mut self) -> Result<()>;
}

/// CD-audio transport controller.
///
/// Independent of the voice table; shares only the CDDA volume/pan bytes in
/// the command block with the rest of the driver.
pub struct CdTransport<B: CdBlock> {
    block: B,
    memory: Arc<Mutex<SoundMemory>>,
}

impl<B: CdBlock> CdTransport<B> {
    /// Create a transport issuing commands through `block`, shadowing
    /// volume and pan into the driver's shared memory.
    pub fn new(block: B, memory: Arc<Mutex<SoundMemory>>) -> Self {
        CdTransport { block, memory }
    }

    /// Play tracks `from` through `to` inclusive, optionally repeating the
    /// range forever.
    pub fn play_range(&mut self, from: u8, to: u8, looped: bool) -> Result<()> {
        let mode = if looped {
            CdPlayMode::REPEAT_INFINITE
        } else {
            CdPlayMode::empty()
        };
        debug!("cdda: play tracks {from}-{to}{}", if looped { " looped" } else { "" });
        self.block.play(TrackRange { from, to, mode })
    }

    /// Play a single track.
    pub fn play_single(&mut self, track: u8, looped: bool) -> Result<()> {
        self.play_range(track, track, looped)
    }

    /// Stop playback by seeking the pickup to its default position.
    pub fn stop(&mut self) -> Result<()> {
        debug!("cdda: stop");
        self.block.seek_home()
    }

    /// Set the CDDA volume level (0-7) on both channels.
    pub fn set_volume(&mut self, level: u8) {
        self.memory.lock().command_block_mut().set_cdda_volume(level);
    }

    /// Set per-channel CDDA levels (0-7 each) for stereo panning.
    pub fn set_pan(&mut self, left: u8, right: u8) {
        self.memory.lock().command_block_mut().set_cdda_pan(left, right);
    }

    /// Give back the CD block, consuming the transport.
    pub fn into_block(self) -> B {
        self.block
    }
}
