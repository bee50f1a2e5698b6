// Shared host-sync segment backed by a memory-mapped file
//
// Fixed layout, native byte order:
//   0  u32 bpm            4  u32 numerator      8  u32 denominator
//  12  u32 sample rate   16  u32 buffer size   20  u8 has_shm
//  21  u8  is_cycle      22  u8 is_playing     24  f64 latency
//  32  f64 cycle start   40  f64 cycle end     48  f64 ppq position

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use memmap2::MmapMut;

use super::{HostSyncBlock, SyncWriter};
use crate::error::TransportError;

pub const SEGMENT_SIZE: usize = 56;

const OFFSET_BPM: usize = 0;
const OFFSET_NUMERATOR: usize = 4;
const OFFSET_DENOMINATOR: usize = 8;
const OFFSET_SAMPLE_RATE: usize = 12;
const OFFSET_BUFFER_SIZE: usize = 16;
const OFFSET_HAS_SHM: usize = 20;
const OFFSET_IS_CYCLE: usize = 21;
const OFFSET_IS_PLAYING: usize = 22;
const OFFSET_LATENCY: usize = 24;
const OFFSET_CYCLE_START: usize = 32;
const OFFSET_CYCLE_END: usize = 40;
const OFFSET_PPQ_POS: usize = 48;

fn put_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_ne_bytes());
}

fn put_f64(buf: &mut [u8], offset: usize, value: f64) {
    buf[offset..offset + 8].copy_from_slice(&value.to_ne_bytes());
}

fn get_u32(buf: &[u8], offset: usize) -> Option<u32> {
    let bytes = buf.get(offset..offset + 4)?.try_into().ok()?;
    Some(u32::from_ne_bytes(bytes))
}

fn get_f64(buf: &[u8], offset: usize) -> Option<f64> {
    let bytes = buf.get(offset..offset + 8)?.try_into().ok()?;
    Some(f64::from_ne_bytes(bytes))
}

/// Write `block` into `buf` (at least SEGMENT_SIZE bytes).
///
/// Tempo and signature go first, then the values derived from them, so a
/// reader catching a half-written record sees a consistent base.
pub fn encode_into(block: &HostSyncBlock, buf: &mut [u8]) {
    put_u32(buf, OFFSET_BPM, block.bpm as u32);
    put_u32(buf, OFFSET_NUMERATOR, block.time_sig_numerator as u32);
    put_u32(buf, OFFSET_DENOMINATOR, block.time_sig_denominator as u32);
    put_u32(buf, OFFSET_SAMPLE_RATE, block.sample_rate);
    put_u32(buf, OFFSET_BUFFER_SIZE, block.buffer_size);
    put_f64(buf, OFFSET_LATENCY, block.latency);
    put_f64(buf, OFFSET_CYCLE_START, block.cycle_start);
    put_f64(buf, OFFSET_CYCLE_END, block.cycle_end);
    buf[OFFSET_IS_CYCLE] = block.is_cycle as u8;
    put_f64(buf, OFFSET_PPQ_POS, block.ppq_pos);
    buf[OFFSET_IS_PLAYING] = block.is_playing as u8;
    buf[OFFSET_HAS_SHM] = block.has_shm as u8;
}

/// Read a record back, as an external consumer would
pub fn decode(buf: &[u8]) -> Option<HostSyncBlock> {
    if buf.len() < SEGMENT_SIZE {
        return None;
    }
    Some(HostSyncBlock {
        bpm: get_u32(buf, OFFSET_BPM)? as u16,
        time_sig_numerator: get_u32(buf, OFFSET_NUMERATOR)? as u8,
        time_sig_denominator: get_u32(buf, OFFSET_DENOMINATOR)? as u8,
        sample_rate: get_u32(buf, OFFSET_SAMPLE_RATE)?,
        buffer_size: get_u32(buf, OFFSET_BUFFER_SIZE)?,
        latency: get_f64(buf, OFFSET_LATENCY)?,
        is_cycle: buf[OFFSET_IS_CYCLE] != 0,
        cycle_start: get_f64(buf, OFFSET_CYCLE_START)?,
        cycle_end: get_f64(buf, OFFSET_CYCLE_END)?,
        ppq_pos: get_f64(buf, OFFSET_PPQ_POS)?,
        is_playing: buf[OFFSET_IS_PLAYING] != 0,
        has_shm: buf[OFFSET_HAS_SHM] != 0,
    })
}

/// Writer publishing into a file mapping other processes can open
pub struct SharedSync {
    map: MmapMut,
    path: PathBuf,
}

impl SharedSync {
    /// Create (or take over) the segment at `path`
    pub fn create(path: &Path) -> Result<Self, TransportError> {
        let segment_error = |source| TransportError::SharedSegment {
            path: path.to_path_buf(),
            source,
        };

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(segment_error)?;
        file.set_len(SEGMENT_SIZE as u64).map_err(segment_error)?;

        // SAFETY: the file was just sized by us; external readers only read.
        let map = unsafe { MmapMut::map_mut(&file) }.map_err(segment_error)?;

        Ok(Self {
            map,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SyncWriter for SharedSync {
    fn publish(&mut self, block: &HostSyncBlock) {
        encode_into(block, &mut self.map[..]);
    }

    fn is_shared(&self) -> bool {
        true
    }
}

impl Drop for SharedSync {
    fn drop(&mut self) {
        if let Err(e) = self.map.flush() {
            log::debug!("Host sync flush failed: {}", e);
        }
        if let Err(e) = fs::remove_file(&self.path) {
            log::debug!("Host sync segment {} not removed: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_layout() {
        let mut block = HostSyncBlock::new(44100, 256);
        block.bpm = 133;
        block.time_sig_numerator = 7;
        block.time_sig_denominator = 8;
        block.is_cycle = true;
        block.cycle_end = 8.0;
        block.ppq_pos = 3.5;
        block.is_playing = true;

        let mut buf = [0u8; SEGMENT_SIZE];
        encode_into(&block, &mut buf);
        assert_eq!(u32::from_ne_bytes(buf[0..4].try_into().unwrap()), 133);
        assert_eq!(decode(&buf), Some(block));
    }

    #[test]
    fn test_decode_short_buffer() {
        assert_eq!(decode(&[0u8; 10]), None);
    }

    #[test]
    fn test_create_in_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("segment");
        assert!(matches!(
            SharedSync::create(&path),
            Err(TransportError::SharedSegment { .. })
        ));
    }
}
