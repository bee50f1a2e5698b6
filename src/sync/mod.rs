// Host sync - Transport state mirrored for an externally hosted plugin
//
// The transport is the only writer. Readers poll the record at their own
// cadence and never acknowledge, so every setter publishes immediately.

mod shared;

pub use shared::{SEGMENT_SIZE, SharedSync, decode, encode_into};

use crate::config::HostSyncConfig;
use crate::sequencer::timeline::{DEFAULT_TEMPO, TICKS_PER_QUARTER};

/// Snapshot of transport state read by the host-sync consumer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostSyncBlock {
    pub bpm: u16,
    pub time_sig_numerator: u8,
    pub time_sig_denominator: u8,
    pub sample_rate: u32,
    pub buffer_size: u32,
    /// Latency of one buffer, in quarter notes
    pub latency: f64,
    pub is_cycle: bool,
    /// Loop start in quarter notes
    pub cycle_start: f64,
    /// Loop end in quarter notes
    pub cycle_end: f64,
    /// Running position in quarter notes
    pub ppq_pos: f64,
    pub is_playing: bool,
    /// Record lives in a segment an external process can attach to
    pub has_shm: bool,
}

impl HostSyncBlock {
    pub fn new(sample_rate: u32, buffer_size: u32) -> Self {
        let mut block = Self {
            bpm: DEFAULT_TEMPO,
            time_sig_numerator: 4,
            time_sig_denominator: 4,
            sample_rate,
            buffer_size,
            latency: 0.0,
            is_cycle: false,
            cycle_start: 0.0,
            cycle_end: 0.0,
            ppq_pos: 0.0,
            is_playing: false,
            has_shm: false,
        };
        block.latency = block.computed_latency();
        block
    }

    /// buffer_size * bpm / (sample_rate * 60), zero for a zero sample rate
    pub fn computed_latency(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.buffer_size as f64 * self.bpm as f64 / (self.sample_rate as f64 * 60.0)
    }
}

/// Destination of published host-sync records
pub trait SyncWriter: Send {
    fn publish(&mut self, block: &HostSyncBlock);

    /// True when an external process can read what is published
    fn is_shared(&self) -> bool;
}

/// In-process record used when no shared segment is available
#[derive(Debug, Clone, Default)]
pub struct PrivateSync {
    last: Option<HostSyncBlock>,
}

impl PrivateSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&HostSyncBlock> {
        self.last.as_ref()
    }
}

impl SyncWriter for PrivateSync {
    fn publish(&mut self, block: &HostSyncBlock) {
        self.last = Some(*block);
    }

    fn is_shared(&self) -> bool {
        false
    }
}

/// Host-sync record plus the writer chosen at startup
pub struct HostSync {
    block: HostSyncBlock,
    writer: Box<dyn SyncWriter>,
    compensate_latency: bool,
}

impl HostSync {
    /// Attach a shared segment when enabled, otherwise or on failure use a
    /// private record. The rest of the engine never sees the difference.
    pub fn connect(config: &HostSyncConfig, sample_rate: u32, buffer_size: u32) -> Self {
        let writer: Box<dyn SyncWriter> = if config.enabled {
            let path = config.segment_path();
            match SharedSync::create(&path) {
                Ok(shared) => {
                    log::info!("Host sync segment attached at {}", path.display());
                    Box::new(shared)
                }
                Err(e) => {
                    log::warn!("{}; falling back to private host sync record", e);
                    Box::new(PrivateSync::new())
                }
            }
        } else {
            Box::new(PrivateSync::new())
        };
        Self::with_writer(writer, sample_rate, buffer_size, config.compensate_latency)
    }

    pub fn private(sample_rate: u32, buffer_size: u32) -> Self {
        Self::with_writer(Box::new(PrivateSync::new()), sample_rate, buffer_size, false)
    }

    pub fn with_writer(
        writer: Box<dyn SyncWriter>,
        sample_rate: u32,
        buffer_size: u32,
        compensate_latency: bool,
    ) -> Self {
        let mut block = HostSyncBlock::new(sample_rate, buffer_size);
        block.has_shm = writer.is_shared();
        let mut sync = Self {
            block,
            writer,
            compensate_latency,
        };
        sync.publish();
        sync
    }

    pub fn block(&self) -> &HostSyncBlock {
        &self.block
    }

    pub fn is_shared(&self) -> bool {
        self.writer.is_shared()
    }

    fn publish(&mut self) {
        self.writer.publish(&self.block);
    }

    fn refresh_latency(&mut self) {
        self.block.latency = self.block.computed_latency();
    }

    pub fn set_tempo(&mut self, bpm: u16) {
        self.block.bpm = bpm;
        self.refresh_latency();
        self.publish();
    }

    pub fn set_time_signature(&mut self, numerator: u8, denominator: u8) {
        self.block.time_sig_numerator = numerator;
        self.block.time_sig_denominator = denominator;
        self.publish();
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.block.sample_rate = sample_rate;
        self.refresh_latency();
        self.publish();
    }

    pub fn set_buffer_size(&mut self, buffer_size: u32) {
        if self.block.buffer_size == buffer_size {
            return;
        }
        self.block.buffer_size = buffer_size;
        self.refresh_latency();
        self.publish();
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.block.is_playing = playing;
        self.publish();
    }

    /// Running position from a tick count
    pub fn set_position(&mut self, ticks: i64) {
        let mut ppq = ticks as f64 / TICKS_PER_QUARTER as f64;
        if self.compensate_latency {
            ppq -= self.block.latency;
        }
        self.block.ppq_pos = ppq;
        self.publish();
    }

    /// Loop bounds in ticks, or `None` when no loop is in effect
    pub fn set_cycle(&mut self, cycle: Option<(i64, i64)>) {
        match cycle {
            Some((begin, end)) => {
                self.block.is_cycle = true;
                self.block.cycle_start = begin as f64 / TICKS_PER_QUARTER as f64;
                self.block.cycle_end = end as f64 / TICKS_PER_QUARTER as f64;
            }
            None => self.block.is_cycle = false,
        }
        self.publish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct RecordingWriter(Arc<Mutex<Vec<HostSyncBlock>>>);

    impl SyncWriter for RecordingWriter {
        fn publish(&mut self, block: &HostSyncBlock) {
            self.0.lock().unwrap().push(*block);
        }

        fn is_shared(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_latency_formula() {
        let mut block = HostSyncBlock::new(48000, 512);
        block.bpm = 120;
        // 512 * 120 / (48000 * 60)
        let expected = 512.0 * 120.0 / 2_880_000.0;
        assert!((block.computed_latency() - expected).abs() < 1e-12);

        block.sample_rate = 0;
        assert_eq!(block.computed_latency(), 0.0);
    }

    #[test]
    fn test_private_sync_mirrors_block() {
        let mut sync = HostSync::private(48000, 512);
        assert!(!sync.is_shared());
        assert!(!sync.block().has_shm);

        sync.set_tempo(120);
        sync.set_playing(true);
        sync.set_position(96);
        assert_eq!(sync.block().bpm, 120);
        assert!(sync.block().is_playing);
        assert_eq!(sync.block().ppq_pos, 2.0);
    }

    #[test]
    fn test_every_setter_publishes() {
        let published = Arc::new(Mutex::new(Vec::new()));
        let mut sync = HostSync::with_writer(
            Box::new(RecordingWriter(Arc::clone(&published))),
            44100,
            256,
            false,
        );
        sync.set_time_signature(3, 4);
        sync.set_cycle(Some((0, 384)));

        let records = published.lock().unwrap();
        assert_eq!(records.len(), 3);
        assert!(records[0].has_shm);
        assert_eq!(records[1].time_sig_numerator, 3);
        assert!(records[2].is_cycle);
        assert_eq!(records[2].cycle_end, 8.0);
    }

    #[test]
    fn test_latency_compensation() {
        let mut sync = HostSync::with_writer(Box::new(PrivateSync::new()), 48000, 480, true);
        sync.set_tempo(100);
        // 480 * 100 / (48000 * 60) = 1/60
        sync.set_position(48);
        assert!((sync.block().ppq_pos - (1.0 - 1.0 / 60.0)).abs() < 1e-12);
    }

    #[test]
    fn test_disabled_config_uses_private_record() {
        let config = HostSyncConfig {
            enabled: false,
            ..HostSyncConfig::default()
        };
        let sync = HostSync::connect(&config, 48000, 512);
        assert!(!sync.is_shared());
        assert_eq!(sync.block().sample_rate, 48000);
    }
}
