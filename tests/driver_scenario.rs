//! End-to-end driver scenario exercised through the public API, reading the
//! shared command table back the way the coprocessor would.

use scsp_driver::{
    DriverConfig, DriverError, MemStorage, PcmDepth, PlayMode, SampleFormat, SoundDriver,
    SyncFlag, VOICE_CAPACITY,
};

fn storage_with_firmware() -> MemStorage {
    let mut storage = MemStorage::new();
    // A token firmware image; only its placement matters to the host side.
    storage.insert("SDRV.BIN", vec![0x60, 0xFE, 0x4E, 0x71]);
    storage
}

#[test]
fn bootstrap_load_play_stop() -> anyhow::Result<()> {
    let mut storage = storage_with_firmware();
    storage.insert("BUMP16.PCM", vec![0x5A; 2000]);

    let mut driver = SoundDriver::initialize(DriverConfig::default(), &mut storage)?;
    assert!(driver.firmware_loaded());

    // Load one 16-bit PCM asset of 2000 bytes at 15360 Hz.
    let bump = driver.load_pcm(&mut storage, "BUMP16.PCM", PcmDepth::Pcm16, 15_360)?;
    assert_eq!(bump, 0);
    assert_eq!(driver.voice_count(), 1);

    let memory = driver.shared_memory();
    {
        let memory = memory.lock();
        let voice = memory.voice(0);
        assert_eq!(voice.format(), Some(SampleFormat::Pcm16));
        assert_eq!(voice.play_size(), 1000);
        assert_eq!(voice.bytes_per_blank(), 512);
    }

    // Protected playback at volume 10.
    driver.play(bump, PlayMode::Protected, 10);
    {
        let memory = memory.lock();
        let voice = memory.voice(0);
        assert!(voice.permitted());
        assert_eq!(voice.volume(), 10);
        assert_eq!(voice.loop_type(), -1);
    }

    // Protected mode stops immediately.
    driver.stop(bump);
    assert_eq!(memory.lock().voice(0).volume(), 0);
    Ok(())
}

#[test]
fn sync_flag_lifecycle() -> anyhow::Result<()> {
    let mut storage = storage_with_firmware();
    let driver = SoundDriver::initialize(DriverConfig::default(), &mut storage)?;
    let memory = driver.shared_memory();

    // Bootstrap leaves the reset sentinel for the coprocessor.
    assert_eq!(memory.lock().command_block().sync(), Some(SyncFlag::ResetReady));

    // The frame timer acknowledges, once per display frame.
    let vblank = driver.vblank_trigger();
    for _ in 0..3 {
        vblank.fire();
        assert_eq!(
            memory.lock().command_block().sync(),
            Some(SyncFlag::Acknowledged)
        );
    }
    Ok(())
}

#[test]
fn table_fills_at_capacity_and_recovers_by_unload() -> anyhow::Result<()> {
    let mut storage = storage_with_firmware();
    let mut driver = SoundDriver::initialize(DriverConfig::default(), &mut storage)?;

    for i in 0..VOICE_CAPACITY {
        let id = driver.load_pcm_bytes(&[0u8; 8], PcmDepth::Pcm8, 7_680)?;
        assert_eq!(id as usize, i);
    }
    let err = driver
        .load_pcm_bytes(&[0u8; 8], PcmDepth::Pcm8, 7_680)
        .unwrap_err();
    assert!(matches!(err, DriverError::SlotsFull(_)));

    // Dropping back to the first voice frees the slots and the RAM behind it.
    driver.unload(0);
    assert_eq!(driver.voice_count(), 1);
    let id = driver.load_pcm_bytes(&[0u8; 8], PcmDepth::Pcm8, 7_680)?;
    assert_eq!(id, 1);
    Ok(())
}

#[cfg(feature = "adx")]
#[test]
fn adx_stream_round_trip_through_storage() -> anyhow::Result<()> {
    let mut stream = Vec::new();
    stream.extend_from_slice(&0x8000u16.to_be_bytes());
    stream.extend_from_slice(&32i16.to_be_bytes());
    stream.extend_from_slice(&[3, 18, 4, 1]);
    stream.extend_from_slice(&15_360u32.to_be_bytes()); // sample rate
    stream.extend_from_slice(&6_400u32.to_be_bytes()); // sample count
    stream.extend_from_slice(&500u16.to_be_bytes());
    stream.extend_from_slice(&[0, 0]);
    stream.extend(std::iter::repeat(0xC3).take(200 * 18));

    let mut storage = storage_with_firmware();
    storage.insert("NBGM.ADX", stream);

    let mut driver = SoundDriver::initialize(DriverConfig::default(), &mut storage)?;
    let music = driver.load_adx(&mut storage, "NBGM.ADX")?;

    let memory = driver.shared_memory();
    let memory = memory.lock();
    let voice = memory.voice(music as usize);
    assert_eq!(voice.format(), Some(SampleFormat::Adx));
    assert_eq!(voice.play_size(), 200);
    assert_eq!(voice.bytes_per_blank(), 512);
    assert_eq!(voice.loop_type(), PlayMode::Semi.as_raw());
    Ok(())
}

#[cfg(feature = "cdda")]
mod cd_audio {
    use super::*;
    use scsp_driver::{CdBlock, CdPlayMode, CdTransport, TrackRange};

    #[derive(Default)]
    struct FakeCdBlock {
        log: Vec<String>,
    }

    impl CdBlock for FakeCdBlock {
        fn play(&mut self, range: TrackRange) -> scsp_driver::Result<()> {
            self.log.push(format!(
                "play {}-{} mode {:#04x}",
                range.from,
                range.to,
                range.mode.bits()
            ));
            Ok(())
        }

        fn seek_home(&mut self) -> scsp_driver::Result<()> {
            self.log.push("seek".into());
            Ok(())
        }
    }

    #[test]
    fn cd_playback_session() -> anyhow::Result<()> {
        let mut storage = storage_with_firmware();
        let driver = SoundDriver::initialize(DriverConfig::default(), &mut storage)?;

        let mut cd = CdTransport::new(FakeCdBlock::default(), driver.shared_memory());
        cd.play_single(2, true)?;
        cd.set_volume(5);
        cd.stop()?;

        let memory = driver.shared_memory();
        let (left, right) = memory.lock().command_block().cdda_vol_pan();
        assert_eq!(left >> 5, 5);
        assert_eq!(right >> 5, 5);

        let block = cd.into_block();
        assert_eq!(
            block.log,
            vec![
                format!("play 2-2 mode {:#04x}", CdPlayMode::REPEAT_INFINITE.bits()),
                "seek".to_string()
            ]
        );
        Ok(())
    }
}
