//! Random-access byte sources: the ROM image and auxiliary recordings

use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// GBA pointers address a 32 MiB cartridge space starting at 0x08000000;
/// masking keeps the ROM-relative offset.
pub const GBA_POINTER_MASK: u32 = 0x3FF_FFFF;

/// An owned binary image with little-endian primitive reads at absolute offsets.
#[derive(Debug, Clone)]
pub struct Rom {
    data: Vec<u8>,
}

impl Rom {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(fs::read(path)?))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn u8(&self, offset: u32) -> Result<u8> {
        self.data
            .get(offset as usize)
            .copied()
            .ok_or(Error::OutOfRange(offset))
    }

    pub fn i8(&self, offset: u32) -> Result<i8> {
        Ok(self.u8(offset)? as i8)
    }

    pub fn u32(&self, offset: u32) -> Result<u32> {
        let bytes = self.read(offset, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a 4-byte GBA address and convert it to a ROM offset.
    pub fn gba_pointer(&self, offset: u32) -> Result<u32> {
        Ok(self.u32(offset)? & GBA_POINTER_MASK)
    }

    /// Strict read: errors if any byte is out of range.
    pub fn read(&self, offset: u32, len: usize) -> Result<&[u8]> {
        let start = offset as usize;
        let end = start.checked_add(len).ok_or(Error::OutOfRange(offset))?;
        self.data.get(start..end).ok_or(Error::OutOfRange(offset))
    }

    /// Permissive read: bytes past the end of the image come back as zeroes,
    /// like a short fread. Only the start offset must be in range.
    pub fn read_padded(&self, offset: u32, len: usize) -> Result<Vec<u8>> {
        let start = offset as usize;
        if start >= self.data.len() {
            return Err(Error::OutOfRange(offset));
        }
        let mut out = vec![0u8; len];
        let avail = (self.data.len() - start).min(len);
        out[..avail].copy_from_slice(&self.data[start..start + avail]);
        Ok(out)
    }
}

/// Pre-recorded waveform banks used for the fixed-channel instruments.
///
/// Both are optional: when a file is missing the corresponding instruments
/// simply cannot be dumped, which is reported as `Error::MissingAsset` rather
/// than a read failure.
#[derive(Debug, Default)]
pub struct SynthAssets {
    /// PSG channel recordings (pulse and noise captures)
    pub psg: Option<Rom>,
    /// Golden Sun synth waveform bank (square/saw/triangle tables)
    pub synth_waves: Option<Rom>,
}

impl SynthAssets {
    /// Look for `psg_data.raw` and `goldensun_synth.raw` in the given directory.
    pub fn load_from(dir: &Path) -> Self {
        Self {
            psg: Rom::open(&dir.join("psg_data.raw")).ok(),
            synth_waves: Rom::open(&dir.join("goldensun_synth.raw")).ok(),
        }
    }

    pub fn has_synth_waves(&self) -> bool {
        self.synth_waves.is_some()
    }

    pub fn psg(&self) -> Result<&Rom> {
        self.psg.as_ref().ok_or(Error::MissingAsset("psg_data.raw"))
    }

    pub fn synth_waves(&self) -> Result<&Rom> {
        self.synth_waves
            .as_ref()
            .ok_or(Error::MissingAsset("goldensun_synth.raw"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_little_endian_reads() {
        let rom = Rom::new(vec![0x78, 0x56, 0x34, 0x12, 0xFF]);
        assert_eq!(rom.u8(4).unwrap(), 0xFF);
        assert_eq!(rom.u32(0).unwrap(), 0x12345678);
        assert!(matches!(rom.u32(2), Err(Error::OutOfRange(2))));
    }

    #[test]
    fn test_gba_pointer_mask() {
        let rom = Rom::new(0x0800_1234u32.to_le_bytes().to_vec());
        assert_eq!(rom.gba_pointer(0).unwrap(), 0x1234);
    }

    #[test]
    fn test_padded_read() {
        let rom = Rom::new(vec![1, 2, 3]);
        assert_eq!(rom.read_padded(1, 4).unwrap(), vec![2, 3, 0, 0]);
        assert!(rom.read_padded(3, 1).is_err());
    }
}
