//! Driver context: bootstrap, voice loading, and playback control.
//!
//! [`SoundDriver`] owns the shared sound memory, the sample arena, and the
//! published voice count. All host-side mutation of the coprocessor's world
//! goes through it, which keeps the publication discipline in one place: a
//! voice descriptor is completely written before the count that makes it
//! visible is advanced, and failed loads never move the cursor or the count.

use crate::arena::{pad_to_word, Arena, PCM_REGION_START};
use crate::memory::{ScspControl, SoundMemory, SyncFlag, SOUND_RAM_LEN, VOICE_TABLE_OFFSET};
use crate::pitch::pitch_word;
use crate::storage::{read_exact, read_to_end, Storage};
use crate::timing::{bytes_per_blank, VideoStandard};
use crate::voice::{PcmDepth, PlayMode, VoiceId, VOICE_CAPACITY};
use crate::{DriverError, Result};
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[cfg(feature = "adx")]
use crate::adx::{AdxHeader, ADX_DATA_BIAS, ADX_HEADER_LEN};
#[cfg(feature = "adx")]
use crate::voice::SampleFormat;

/// Sample rate assumed by the [`SoundDriver::load_pcm8`] and
/// [`SoundDriver::load_pcm16`] convenience loaders.
pub const DEFAULT_SAMPLE_RATE: i32 = 15_360;

/// Volume written into freshly loaded voice descriptors.
const DEFAULT_LOAD_VOLUME: u8 = 7;

/// Upper clamp of the master volume field.
const MASTER_VOLUME_MAX: i16 = 15;

/// Upper value of the 3-bit CDDA volume field.
const CDDA_VOLUME_MAX: u8 = 7;

/// ADX decode quality: the master data rate the coprocessor's decode loop
/// is tuned for, with PAL-region variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdxQuality {
    /// 7.68 kB/frame-set decode rate.
    Master768,
    /// 11.52 kB/frame-set decode rate.
    Master1152,
    /// 15.36 kB/frame-set decode rate.
    Master1536,
    /// 23.04 kB/frame-set decode rate.
    #[default]
    Master2304,
    /// PAL variant of the lowest rate.
    Pal640,
    /// PAL variant of the second rate.
    Pal960,
    /// PAL variant of the third rate.
    Pal1280,
    /// PAL variant of the highest rate.
    Pal1920,
}

impl AdxQuality {
    /// Prediction coefficient pair programmed into the command block for
    /// this decode rate.
    pub fn coefficients(self) -> (i16, i16) {
        match self {
            AdxQuality::Master768 => (4401, -1183),
            AdxQuality::Master1152 => (5386, -1771),
            AdxQuality::Master1536 => (5972, -2187),
            AdxQuality::Master2304 => (6631, -2685),
            AdxQuality::Pal640 => (3915, -936),
            AdxQuality::Pal960 => (4963, -1504),
            AdxQuality::Pal1280 => (5612, -1923),
            AdxQuality::Pal1920 => (6359, -2469),
        }
    }
}

/// Bootstrap configuration for [`SoundDriver::initialize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Storage name of the coprocessor firmware image.
    pub firmware: String,
    /// ADX decode quality to program at bootstrap.
    pub quality: AdxQuality,
    /// Display refresh standard used for frame-timing budgets.
    pub video_standard: VideoStandard,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            firmware: "SDRV.BIN".into(),
            quality: AdxQuality::default(),
            video_standard: VideoStandard::default(),
        }
    }
}

/// Handle for the periodic frame-synchronization trigger.
///
/// Clone of the driver's shared memory; [`VblankTrigger::fire`] is the only
/// host write to the synchronization flag after bootstrap. Install it on the
/// display-refresh timer and fire once per frame. Fire-and-forget: it never
/// blocks on, or waits for, the coprocessor.
#[derive(Clone)]
pub struct VblankTrigger {
    memory: Arc<Mutex<SoundMemory>>,
}

impl VblankTrigger {
    /// Grant the coprocessor its next synchronization cycle.
    pub fn fire(&self) {
        self.memory
            .lock()
            .command_block_mut()
            .set_sync(SyncFlag::Acknowledged);
    }
}

/// The host-side sound driver context.
pub struct SoundDriver {
    memory: Arc<Mutex<SoundMemory>>,
    arena: Arena,
    voice_count: i16,
    master_volume: u16,
    firmware_loaded: bool,
    config: DriverConfig,
}

impl SoundDriver {
    /// Bootstrap the audio subsystem and return the driver context.
    ///
    /// Selects the 4 Mbit RAM mapping, zeroes sound RAM, copies the firmware
    /// image to the RAM base with the coprocessor halted, programs the ADX
    /// coefficients for the configured quality, publishes the voice-table
    /// offset, arms the synchronization flag, and sets master and CD volume
    /// to maximum.
    ///
    /// A missing or unreadable firmware image is reported and leaves
    /// [`SoundDriver::firmware_loaded`] false, but the context is still
    /// usable for callers that only need raw PCM staging.
    pub fn initialize(config: DriverConfig, storage: &mut dyn Storage) -> Result<Self> {
        let mut memory = SoundMemory::new();
        memory.set_scsp_control(ScspControl::MEM_4MBIT);
        memory.clear_ram();

        let mut firmware_loaded = false;
        match storage.open(&config.firmware) {
            Ok(mut file) => {
                // Halt the coprocessor for the bulk copy so it can never
                // observe a partially written program image.
                memory.set_sound_cpu_enabled(false);
                match read_to_end(file.as_mut()) {
                    Ok(image) => {
                        let len = image.len().min(SOUND_RAM_LEN);
                        memory.write_bytes(0, &image[..len]);
                        let (first, second) = config.quality.coefficients();
                        memory.command_block_mut().set_adx_coefficients(first, second);
                        firmware_loaded = true;
                        info!("loaded firmware '{}' ({len} bytes)", config.firmware);
                    }
                    Err(e) => warn!("firmware '{}' unreadable: {e}", config.firmware),
                }
                memory.set_sound_cpu_enabled(true);
            }
            Err(e) => warn!("firmware '{}' unavailable: {e}", config.firmware),
        }

        let mut cmd = memory.command_block_mut();
        cmd.set_voice_table_offset(VOICE_TABLE_OFFSET as u32);
        cmd.set_sync(SyncFlag::ResetReady);

        let mut driver = SoundDriver {
            memory: Arc::new(Mutex::new(memory)),
            arena: Arena::new(),
            voice_count: 0,
            master_volume: 0,
            firmware_loaded,
            config,
        };
        driver.set_master_volume(MASTER_VOLUME_MAX);
        driver
            .memory
            .lock()
            .command_block_mut()
            .set_cdda_volume(CDDA_VOLUME_MAX);
        Ok(driver)
    }

    /// Number of published voices; ids `0..count` are valid.
    pub fn voice_count(&self) -> i16 {
        self.voice_count
    }

    /// Whether the firmware image made it into sound RAM at bootstrap.
    pub fn firmware_loaded(&self) -> bool {
        self.firmware_loaded
    }

    /// Current master volume, 0-15.
    pub fn master_volume(&self) -> u16 {
        self.master_volume
    }

    /// Bytes still available in the sample region.
    pub fn free_sample_bytes(&self) -> u32 {
        self.arena.free_bytes()
    }

    /// Bootstrap configuration this driver was built with.
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Handle to the shared sound memory.
    ///
    /// Test harnesses use this to read descriptors and the command block
    /// from the coprocessor's side of the contract.
    pub fn shared_memory(&self) -> Arc<Mutex<SoundMemory>> {
        Arc::clone(&self.memory)
    }

    /// Periodic synchronization handle for the frame timer.
    pub fn vblank_trigger(&self) -> VblankTrigger {
        VblankTrigger {
            memory: Arc::clone(&self.memory),
        }
    }

    /// Set the master volume, clamped to 0-15, mirroring it into the SCSP
    /// control register.
    pub fn set_master_volume(&mut self, volume: i16) {
        let clamped = volume.clamp(0, MASTER_VOLUME_MAX) as u16;
        self.memory.lock().set_scsp_control(
            ScspControl::MEM_4MBIT | ScspControl::from_bits_retain(clamped),
        );
        self.master_volume = clamped;
    }

    fn guard_capacity(&self, requested: u32) -> Result<()> {
        if self.arena.past_load_boundary() {
            return Err(DriverError::RamFull {
                requested,
                available: self.arena.free_bytes(),
            });
        }
        Ok(())
    }

    fn guard_slots(&self) -> Result<()> {
        if self.voice_count as usize >= VOICE_CAPACITY {
            return Err(DriverError::SlotsFull(VOICE_CAPACITY));
        }
        Ok(())
    }

    /// Load a raw PCM payload already in memory.
    ///
    /// On success the new voice is published and its id returned; on any
    /// failure neither the cursor nor the count moves.
    pub fn load_pcm_bytes(
        &mut self,
        data: &[u8],
        depth: PcmDepth,
        sample_rate: i32,
    ) -> Result<VoiceId> {
        self.guard_capacity(data.len() as u32)?;
        self.guard_slots()?;
        if data.len() > depth.byte_budget() {
            return Err(DriverError::SampleTooLarge {
                size: data.len(),
                limit: depth.byte_budget(),
                depth,
            });
        }

        let padded = pad_to_word(data.len() as u32);
        let offset = self.arena.reserve(data.len() as u32)?;

        let mut memory = self.memory.lock();
        memory.write_bytes(offset as usize, data);

        let index = self.voice_count as usize;
        let mut slot = memory.voice_mut(index);
        slot.set_address(offset);
        slot.set_pitch_word(pitch_word(sample_rate));
        slot.set_bytes_per_blank(bytes_per_blank(sample_rate, depth, self.config.video_standard));
        slot.set_play_size(match depth {
            PcmDepth::Pcm16 => (padded >> 1) as u16,
            PcmDepth::Pcm8 => padded as u16,
        });
        slot.set_format(depth.format());
        slot.set_loop_type(PlayMode::Volatile.as_raw());
        slot.set_volume(DEFAULT_LOAD_VOLUME);
        slot.set_pan(0);
        slot.set_loop_start(0);
        slot.set_decompression_size(0);
        slot.set_permitted(false);
        slot.set_icsr_target(0);
        drop(memory);

        // Publish: the descriptor is complete before the count exposes it.
        self.voice_count += 1;
        debug!(
            "voice {index}: {depth:?} {} bytes at {offset:#x}, {sample_rate} Hz",
            data.len()
        );
        Ok(index as VoiceId)
    }

    /// Load a raw PCM asset from storage.
    pub fn load_pcm(
        &mut self,
        storage: &mut dyn Storage,
        name: &str,
        depth: PcmDepth,
        sample_rate: i32,
    ) -> Result<VoiceId> {
        self.guard_capacity(0)?;
        self.guard_slots()?;

        let mut file = storage.open(name)?;
        let size = file.size() as usize;
        if size > depth.byte_budget() {
            return Err(DriverError::SampleTooLarge {
                size,
                limit: depth.byte_budget(),
                depth,
            });
        }
        let data = read_exact(file.as_mut(), size)?;
        drop(file);
        self.load_pcm_bytes(&data, depth, sample_rate)
    }

    /// Load an 8-bit PCM asset at the default sample rate.
    pub fn load_pcm8(&mut self, storage: &mut dyn Storage, name: &str) -> Result<VoiceId> {
        self.load_pcm(storage, name, PcmDepth::Pcm8, DEFAULT_SAMPLE_RATE)
    }

    /// Load a 16-bit PCM asset at the default sample rate.
    pub fn load_pcm16(&mut self, storage: &mut dyn Storage, name: &str) -> Result<VoiceId> {
        self.load_pcm(storage, name, PcmDepth::Pcm16, DEFAULT_SAMPLE_RATE)
    }

    /// Load an ADX compressed stream already in memory.
    ///
    /// The header is validated but not copied into sound RAM; the published
    /// descriptor address is biased past it.
    #[cfg(feature = "adx")]
    pub fn load_adx_bytes(&mut self, data: &[u8]) -> Result<VoiceId> {
        self.guard_capacity(data.len() as u32)?;
        self.guard_slots()?;

        let header = AdxHeader::parse(data)?;
        let params = header.validate(self.config.video_standard)?;
        let payload = &data[ADX_HEADER_LEN..];
        let payload_len = params.payload_len() as usize;
        if payload.len() < payload_len {
            return Err(DriverError::Storage(format!(
                "stream payload truncated: {} of {payload_len} bytes",
                payload.len()
            )));
        }

        let offset = self.arena.reserve(params.payload_len())?;

        let mut memory = self.memory.lock();
        memory.write_bytes(offset as usize, &payload[..payload_len]);

        let index = self.voice_count as usize;
        let mut slot = memory.voice_mut(index);
        slot.set_address(offset + ADX_DATA_BIAS);
        slot.set_pitch_word(pitch_word(params.sample_rate as i32));
        slot.set_bytes_per_blank(params.bytes_per_blank);
        slot.set_play_size(params.play_size);
        slot.set_format(SampleFormat::Adx);
        slot.set_loop_type(PlayMode::Semi.as_raw());
        slot.set_volume(DEFAULT_LOAD_VOLUME);
        slot.set_pan(0);
        slot.set_loop_start(0);
        slot.set_decompression_size(params.decompression_size);
        slot.set_permitted(false);
        slot.set_icsr_target(0);
        drop(memory);

        self.voice_count += 1;
        debug!(
            "voice {index}: ADX {} samples at {:#x}, {} Hz",
            params.sample_count,
            offset + ADX_DATA_BIAS,
            params.sample_rate
        );
        Ok(index as VoiceId)
    }

    /// Load an ADX compressed stream from storage.
    #[cfg(feature = "adx")]
    pub fn load_adx(&mut self, storage: &mut dyn Storage, name: &str) -> Result<VoiceId> {
        self.guard_capacity(0)?;
        self.guard_slots()?;

        let mut file = storage.open(name)?;
        let data = read_to_end(file.as_mut())?;
        drop(file);
        self.load_adx_bytes(&data)
    }

    /// Load every sample of a `.snd` library, returning the new voice ids in
    /// entry order.
    ///
    /// A failing entry stops the scan with its error; entries loaded before
    /// it stay published (their ids are `previous_count..voice_count()`).
    #[cfg(feature = "snd-bank")]
    pub fn load_sound_bank(
        &mut self,
        storage: &mut dyn Storage,
        name: &str,
    ) -> Result<Vec<VoiceId>> {
        let mut file = storage.open(name)?;
        let data = read_to_end(file.as_mut())?;
        drop(file);

        let entries = crate::bank::parse_bank(&data)?;
        let mut ids = Vec::with_capacity(entries.len());
        for entry in &entries {
            ids.push(self.load_pcm_bytes(&entry.data, entry.depth, entry.sample_rate as i32)?);
        }
        info!("bank '{name}': {} samples loaded", ids.len());
        Ok(ids)
    }

    /// Load a mono 8/16-bit PCM WAV asset at its own sample rate.
    #[cfg(feature = "wav-import")]
    pub fn load_wav(&mut self, storage: &mut dyn Storage, name: &str) -> Result<VoiceId> {
        let mut file = storage.open(name)?;
        let data = read_to_end(file.as_mut())?;
        drop(file);

        let pcm = crate::wav::decode_wav(&data)?;
        self.load_pcm_bytes(&pcm.data, pcm.depth, pcm.sample_rate)
    }

    /// Discard every voice after `last_to_keep`, rolling the sample cursor
    /// back to just past the kept voice's data. A negative id resets the
    /// whole table.
    ///
    /// The caller must ensure no discarded voice is still being played; the
    /// arena keeps no reference counts on its contents.
    pub fn unload(&mut self, last_to_keep: VoiceId) {
        if last_to_keep < 0 {
            self.arena.rollback(PCM_REGION_START);
            self.voice_count = 0;
            debug!("voice table reset");
            return;
        }
        if last_to_keep >= self.voice_count {
            warn!(
                "unload({last_to_keep}) ignored: only {} voices published",
                self.voice_count
            );
            return;
        }

        let memory = self.memory.lock();
        let slot = memory.voice(last_to_keep as usize);
        let Some(format) = slot.format() else {
            warn!("unload({last_to_keep}) ignored: descriptor format byte is corrupt");
            return;
        };
        // The cursor is reconstructed from the kept descriptor instead of
        // allocation history: address plus occupied bytes.
        let cursor = slot.address() + slot.play_size() as u32 * format.bytes_per_play_unit();
        drop(memory);

        self.voice_count = last_to_keep + 1;
        self.arena.rollback(cursor);
        debug!("unloaded to voice {last_to_keep}, cursor {cursor:#x}");
    }

    /// Authorize playback of `voice` with the given mode and volume.
    ///
    /// A negative id means "no sound" and is ignored, so failed loads can be
    /// played without checking.
    pub fn play(&mut self, voice: VoiceId, mode: PlayMode, volume: u8) {
        let Some(index) = self.published_index(voice) else {
            return;
        };
        let mut memory = self.memory.lock();
        let mut slot = memory.voice_mut(index);
        slot.set_permitted(true);
        slot.set_volume(volume);
        slot.set_loop_type(mode.as_raw());
    }

    /// Stop `voice`.
    ///
    /// One-shot modes are silenced immediately; looping modes have their
    /// authorization revoked and the coprocessor finishes the current pass
    /// on its own time; the host does not wait.
    pub fn stop(&mut self, voice: VoiceId) {
        let Some(index) = self.published_index(voice) else {
            return;
        };
        let mut memory = self.memory.lock();
        if memory.voice(index).loop_type() > 0 {
            memory.voice_mut(index).set_permitted(false);
        } else {
            memory.voice_mut(index).set_volume(0);
        }
    }

    /// Set volume and pan of a playing voice; negative ids are ignored.
    pub fn set_voice_volume(&mut self, voice: VoiceId, volume: u8, pan: u8) {
        let Some(index) = self.published_index(voice) else {
            return;
        };
        let mut memory = self.memory.lock();
        let mut slot = memory.voice_mut(index);
        slot.set_volume(volume);
        slot.set_pan(pan);
    }

    /// Map a voice id to a published table index, ignoring negatives and
    /// warning on ids that were never published.
    fn published_index(&self, voice: VoiceId) -> Option<usize> {
        if voice < 0 {
            return None;
        }
        if voice >= self.voice_count {
            warn!(
                "voice {voice} not published (count {}), request ignored",
                self.voice_count
            );
            return None;
        }
        Some(voice as usize)
    }
}

impl std::fmt::Debug for SoundDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundDriver")
            .field("voice_count", &self.voice_count)
            .field("cursor", &self.arena.cursor())
            .field("master_volume", &self.master_volume)
            .field("firmware_loaded", &self.firmware_loaded)
            .finish_non_exhaustive()
    }
}
