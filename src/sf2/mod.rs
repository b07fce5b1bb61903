//! SoundFont 2.1 container builder
//!
//! The container is assembled record by record as the bank rippers walk the
//! cartridge data, then serialized in one pass with sizes computed bottom-up.

pub mod chunks;
pub mod types;

use crate::error::Result;
use crate::rom::Rom;
use chunks::{name20, GenList, HydraChunk, InfoListChunk, SampleHeader, SmplChunk};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use types::{GenAmount, SampleType, SfGenerator};

pub struct Sf2 {
    info: InfoListChunk,
    smpl: SmplChunk,
    pub(crate) hydra: HydraChunk,
    /// Rate assumed for samples whose source carries none
    default_sample_rate: u32,
}

impl Sf2 {
    pub fn new(default_sample_rate: u32) -> Self {
        Self {
            info: InfoListChunk::new(),
            smpl: SmplChunk::default(),
            hydra: HydraChunk::default(),
            default_sample_rate,
        }
    }

    pub fn default_sample_rate(&self) -> u32 {
        self.default_sample_rate
    }

    pub fn add_new_preset(&mut self, name: &str, patch: u16, bank: u16) {
        self.hydra.add_preset(name, patch, bank);
    }

    pub fn add_new_instrument(&mut self, name: &str) {
        self.hydra.add_instrument(name);
    }

    pub fn add_new_preset_bag(&mut self) {
        self.hydra.add_preset_bag();
    }

    pub fn add_new_inst_bag(&mut self) {
        self.hydra.add_inst_bag();
    }

    pub fn add_new_preset_generator(&mut self, oper: SfGenerator, amount: GenAmount) {
        self.hydra.pgens.push(GenList { oper, amount });
    }

    pub fn add_new_inst_generator(&mut self, oper: SfGenerator, amount: GenAmount) {
        self.hydra.igens.push(GenList { oper, amount });
    }

    /// Decode a sample from the source data and add it with its header.
    /// Returns the index of the new sample. On error nothing is added.
    #[allow(clippy::too_many_arguments)]
    pub fn add_new_sample(
        &mut self,
        source: &Rom,
        kind: SampleType,
        name: &str,
        pointer: u32,
        size: u32,
        loop_flag: bool,
        loop_pos: u32,
        original_pitch: u8,
        pitch_correction: i8,
        sample_rate: u32,
    ) -> Result<u16> {
        let dir_offset = self
            .smpl
            .add_sample(source, kind, pointer, size, loop_flag, loop_pos)?;

        let (end, start_loop, end_loop) = if loop_flag {
            (
                dir_offset + size + 8,
                dir_offset + loop_pos,
                dir_offset + size,
            )
        } else {
            (dir_offset + size, 0, 0)
        };

        let index = self.hydra.sample_headers.len() as u16;
        self.hydra.sample_headers.push(SampleHeader {
            name: name20(name),
            start: dir_offset,
            end,
            start_loop,
            end_loop,
            sample_rate,
            original_pitch,
            pitch_correction,
        });
        Ok(index)
    }

    /// Append the terminal records every list must end with
    fn add_terminals(&mut self) {
        self.hydra.sample_headers.push(SampleHeader {
            name: name20("EOS"),
            start: 0,
            end: 0,
            start_loop: 0,
            end_loop: 0,
            sample_rate: 0,
            original_pitch: 0,
            pitch_correction: 0,
        });

        self.hydra.add_instrument("EOI");
        self.hydra.add_inst_bag();
        self.hydra.igens.push(GenList {
            oper: SfGenerator::Null,
            amount: GenAmount::Value(0),
        });
        self.hydra.imods.push(());

        self.hydra.add_preset("EOP", 255, 255);
        self.hydra.add_preset_bag();
        self.hydra.pgens.push(GenList {
            oper: SfGenerator::Null,
            amount: GenAmount::Value(0),
        });
        self.hydra.pmods.push(());
    }

    /// Serialize the whole RIFF file
    pub fn to_bytes(mut self) -> Vec<u8> {
        self.add_terminals();

        let sdta_size = 4 + self.smpl.size() + 8;
        let riff_size =
            4 + (self.info.calc_size() + 8) + (sdta_size + 8) + (self.hydra.calc_size() + 8);

        let mut out = Vec::with_capacity(riff_size as usize + 8);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&riff_size.to_le_bytes());
        out.extend_from_slice(b"sfbk");

        self.info.write(&mut out);

        out.extend_from_slice(b"LIST");
        out.extend_from_slice(&sdta_size.to_le_bytes());
        out.extend_from_slice(b"sdta");
        self.smpl.write(&mut out);

        self.hydra.write(&mut out);
        out
    }

    pub fn write(self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes();
        let mut file = File::create(path)?;
        file.write_all(&bytes)?;
        Ok(())
    }

    /// Number of instruments added so far
    pub fn instrument_count(&self) -> u16 {
        self.hydra.instruments.len() as u16
    }

    /// Number of samples added so far
    pub fn sample_count(&self) -> u16 {
        self.hydra.sample_headers.len() as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_header_math() {
        let rom = Rom::new(vec![0u8; 64]);
        let mut sf2 = Sf2::new(22050);
        let idx = sf2
            .add_new_sample(&rom, SampleType::Signed8, "looped", 0, 64, true, 16, 60, 0, 22050)
            .unwrap();
        assert_eq!(idx, 0);
        let hdr = &sf2.hydra.sample_headers[0];
        assert_eq!(hdr.start, 0);
        assert_eq!(hdr.end, 64 + 8);
        assert_eq!(hdr.start_loop, 16);
        assert_eq!(hdr.end_loop, 64);
    }

    #[test]
    fn test_second_sample_directory_offset() {
        let rom = Rom::new(vec![0u8; 64]);
        let mut sf2 = Sf2::new(22050);
        sf2.add_new_sample(&rom, SampleType::Signed8, "a", 0, 64, false, 0, 60, 0, 22050)
            .unwrap();
        sf2.add_new_sample(&rom, SampleType::Signed8, "b", 0, 32, false, 0, 60, 0, 22050)
            .unwrap();
        let hdr = &sf2.hydra.sample_headers[1];
        assert_eq!(hdr.start, 64 + 46);
        assert_eq!(hdr.end, 64 + 46 + 32);
    }

    #[test]
    fn test_riff_size_matches_output() {
        let rom = Rom::new(vec![0u8; 64]);
        let mut sf2 = Sf2::new(22050);
        sf2.add_new_sample(&rom, SampleType::Signed8, "s", 0, 32, true, 0, 60, 0, 22050)
            .unwrap();
        sf2.add_new_instrument("inst");
        sf2.add_new_inst_bag();
        sf2.add_new_inst_generator(SfGenerator::SampleId, GenAmount::Value(0));
        sf2.add_new_preset("preset", 0, 0);
        sf2.add_new_preset_bag();
        sf2.add_new_preset_generator(SfGenerator::Instrument, GenAmount::Value(0));

        let bytes = sf2.to_bytes();
        assert_eq!(&bytes[..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"sfbk");
        let declared = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        assert_eq!(bytes.len() as u32, declared + 8);
    }

    #[test]
    fn test_terminal_records_present() {
        let sf2 = Sf2::new(22050);
        let bytes = sf2.to_bytes();
        // An empty bank still carries the EOS/EOI/EOP terminals
        let find = |needle: &[u8]| bytes.windows(needle.len()).any(|w| w == needle);
        assert!(find(b"EOS"));
        assert!(find(b"EOI"));
        assert!(find(b"EOP"));
    }
}
