//! SoundFont chunk records and sub-chunks
//!
//! Every record's start index (bag index of a header, generator index of a
//! bag) is captured as the length of the next-level list at the moment the
//! record is created. Records must therefore be added strictly in
//! header -> bag -> generators order; nothing is renumbered afterwards.

use super::types::{GenAmount, SampleType, SfGenerator};
use crate::error::Result;
use crate::rom::Rom;

/// Fixed-size name field used by preset, instrument and sample records
pub(crate) fn name20(name: &str) -> [u8; 20] {
    let mut out = [0u8; 20];
    let bytes = name.as_bytes();
    let n = bytes.len().min(20);
    out[..n].copy_from_slice(&bytes[..n]);
    out
}

/// Preset header record, 38 bytes
#[derive(Debug, Clone)]
pub struct PresetHeader {
    pub name: [u8; 20],
    pub preset: u16,
    pub bank: u16,
    /// Index of this preset's first bag, fixed at creation
    pub bag_ndx: u16,
}

impl PresetHeader {
    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.name);
        out.extend_from_slice(&self.preset.to_le_bytes());
        out.extend_from_slice(&self.bank.to_le_bytes());
        out.extend_from_slice(&self.bag_ndx.to_le_bytes());
        // dwLibrary, dwGenre, dwMorphology: reserved, zero
        out.extend_from_slice(&[0u8; 12]);
    }
}

/// Preset or instrument bag, 4 bytes
#[derive(Debug, Clone, Copy)]
pub struct Bag {
    pub gen_ndx: u16,
    pub mod_ndx: u16,
}

impl Bag {
    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.gen_ndx.to_le_bytes());
        out.extend_from_slice(&self.mod_ndx.to_le_bytes());
    }
}

/// Generator record, 4 bytes
#[derive(Debug, Clone, Copy)]
pub struct GenList {
    pub oper: SfGenerator,
    pub amount: GenAmount,
}

impl GenList {
    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.oper as u16).to_le_bytes());
        out.extend_from_slice(&self.amount.to_le_bytes());
    }
}

/// Instrument record, 22 bytes
#[derive(Debug, Clone)]
pub struct InstHeader {
    pub name: [u8; 20],
    /// Index of this instrument's first bag, fixed at creation
    pub bag_ndx: u16,
}

impl InstHeader {
    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.name);
        out.extend_from_slice(&self.bag_ndx.to_le_bytes());
    }
}

/// Sample header record, 46 bytes
#[derive(Debug, Clone)]
pub struct SampleHeader {
    pub name: [u8; 20],
    pub start: u32,
    pub end: u32,
    pub start_loop: u32,
    pub end_loop: u32,
    pub sample_rate: u32,
    pub original_pitch: u8,
    pub pitch_correction: i8,
}

impl SampleHeader {
    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.name);
        out.extend_from_slice(&self.start.to_le_bytes());
        out.extend_from_slice(&self.end.to_le_bytes());
        out.extend_from_slice(&self.start_loop.to_le_bytes());
        out.extend_from_slice(&self.end_loop.to_le_bytes());
        out.extend_from_slice(&self.sample_rate.to_le_bytes());
        out.push(self.original_pitch);
        out.push(self.pitch_correction as u8);
        out.extend_from_slice(&0u16.to_le_bytes()); // sample link
        out.extend_from_slice(&1u16.to_le_bytes()); // mono sample
    }
}

fn write_subchunk_header(out: &mut Vec<u8>, tag: &[u8; 4], size: u32) {
    out.extend_from_slice(tag);
    out.extend_from_slice(&size.to_le_bytes());
}

/// The INFO LIST chunk: format version plus a few text fields
#[derive(Debug)]
pub struct InfoListChunk {
    fields: [(&'static [u8; 4], &'static str); 4],
}

impl InfoListChunk {
    pub fn new() -> Self {
        Self {
            fields: [
                (b"isng", "EMU8000"),
                (b"INAM", "Unnamed"),
                (b"IENG", "Nintendo Game Boy Advance SoundFont"),
                (b"ICOP", "Dumped with sappyrip v0.1"),
            ],
        }
    }

    pub fn calc_size(&self) -> u32 {
        let mut size = 4u32; // "INFO" form type
        size += 4 + 8; // ifil
        for (_, text) in &self.fields {
            // Strings are written with a terminating null byte
            size += text.len() as u32 + 1 + 8;
        }
        size
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        write_subchunk_header(out, b"LIST", self.calc_size());
        out.extend_from_slice(b"INFO");

        // Output format is SoundFont v2.1
        write_subchunk_header(out, b"ifil", 4);
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());

        for (tag, text) in &self.fields {
            write_subchunk_header(out, tag, text.len() as u32 + 1);
            out.extend_from_slice(text.as_bytes());
            out.push(0);
        }
    }
}

/// One decoded sample awaiting serialization
#[derive(Debug)]
struct PcmEntry {
    pcm: Vec<i16>,
    loop_flag: bool,
    loop_pos: u32,
}

/// Samples after the loop end that the format requires to be replicated
const LOOP_TAIL: usize = 8;
/// Zero samples of mandatory padding after each sample
const SAMPLE_PAD: usize = 46;

/// The smpl sub-chunk: all sample data as uniform 16-bit PCM
#[derive(Debug, Default)]
pub struct SmplChunk {
    entries: Vec<PcmEntry>,
    /// Running byte size, kept incrementally because sample directory
    /// offsets are derived from it at add time
    size: u32,
}

impl SmplChunk {
    /// Decode and append a sample. Returns the sample-directory offset of
    /// its first data point.
    pub fn add_sample(
        &mut self,
        source: &Rom,
        kind: SampleType,
        pointer: u32,
        size: u32,
        loop_flag: bool,
        loop_pos: u32,
    ) -> Result<u32> {
        let pcm = decode_sample(source, kind, pointer, size)?;

        // 2 bytes per data point; looped samples carry the replicated tail
        let dir_offset = self.size >> 1;
        if loop_flag {
            self.size += (size + LOOP_TAIL as u32 + SAMPLE_PAD as u32) * 2;
        } else {
            self.size += (size + SAMPLE_PAD as u32) * 2;
        }

        self.entries.push(PcmEntry {
            pcm,
            loop_flag,
            loop_pos,
        });
        Ok(dir_offset)
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        write_subchunk_header(out, b"smpl", self.size);
        for entry in &self.entries {
            for &s in &entry.pcm {
                out.extend_from_slice(&s.to_le_bytes());
            }
            if entry.loop_flag {
                let start = (entry.loop_pos as usize).min(entry.pcm.len());
                let end = (start + LOOP_TAIL).min(entry.pcm.len());
                for &s in &entry.pcm[start..end] {
                    out.extend_from_slice(&s.to_le_bytes());
                }
                // Short samples still owe the full tail
                for _ in end - start..LOOP_TAIL {
                    out.extend_from_slice(&0i16.to_le_bytes());
                }
            }
            out.extend_from_slice(&[0u8; SAMPLE_PAD * 2]);
        }
    }
}

/// Expansion levels for the 4-bit chip waveform
const GB3_LEVELS: [i16; 16] = [
    -0x4000, -0x3800, -0x3000, -0x2800, -0x2000, -0x1800, -0x0100, -0x0800, 0x0000, 0x0800,
    0x1000, 0x1800, 0x2000, 0x2800, 0x3000, 0x3800,
];

/// Per-nibble deltas for the 4-bit compressed format
const BDPCM_DELTA_LUT: [i8; 16] = [
    0, 1, 4, 9, 16, 25, 36, 49, -64, -49, -36, -25, -16, -9, -4, -1,
];

/// Decode `size` data points from the source into uniform 16-bit PCM
fn decode_sample(source: &Rom, kind: SampleType, pointer: u32, size: u32) -> Result<Vec<i16>> {
    let n = size as usize;
    let mut out = vec![0i16; n];

    match kind {
        SampleType::Unsigned8 => {
            let raw = source.read_padded(pointer, n)?;
            for (o, &b) in out.iter_mut().zip(raw.iter()) {
                *o = (i16::from(b) - 0x80) << 8;
            }
        }

        SampleType::Signed8 => {
            let raw = source.read_padded(pointer, n)?;
            for (o, &b) in out.iter_mut().zip(raw.iter()) {
                *o = i16::from(b as i8) << 8;
            }
        }

        SampleType::Signed16 => {
            let raw = source.read_padded(pointer, n * 2)?;
            for (i, o) in out.iter_mut().enumerate() {
                *o = i16::from_le_bytes([raw[2 * i], raw[2 * i + 1]]);
            }
        }

        SampleType::GameboyCh3 => {
            // The stored waveform is always 16 bytes (32 nibbles); the
            // requested length selects how many times each step repeats
            let reps = n / 32;
            let raw = source.read_padded(pointer, 16)?;
            let mut l = 0;
            for j in 0..16 {
                for _ in 0..reps {
                    out[l] = GB3_LEVELS[usize::from(raw[j] >> 4)];
                    l += 1;
                }
                for _ in 0..reps {
                    out[l] = GB3_LEVELS[usize::from(raw[j] & 0xF)];
                    l += 1;
                }
            }
        }

        SampleType::Bdpcm => {
            // A block is one signed seed byte followed by 32 nibble bytes
            // (the first one zero-padded high), 64 data points per block.
            // Each nibble indexes the delta table and accumulates onto the
            // previous value. Data points past the last whole block stay 0.
            let nblocks = n / 64;
            let raw = source.read_padded(pointer, nblocks * 33)?;
            for block in 0..nblocks {
                let b = &raw[block * 33..block * 33 + 33];
                let mut sample = b[0] as i8;
                out[64 * block] = i16::from(sample) << 8;
                sample = sample.wrapping_add(BDPCM_DELTA_LUT[usize::from(b[1] & 0xF)]);
                out[64 * block + 1] = i16::from(sample) << 8;
                for j in 1..32 {
                    let d = b[j + 1];
                    sample = sample.wrapping_add(BDPCM_DELTA_LUT[usize::from(d >> 4)]);
                    out[64 * block + 2 * j] = i16::from(sample) << 8;
                    sample = sample.wrapping_add(BDPCM_DELTA_LUT[usize::from(d & 0xF)]);
                    out[64 * block + 2 * j + 1] = i16::from(sample) << 8;
                }
            }
        }
    }

    Ok(out)
}

/// The pdta ("hydra") LIST chunk: the 8 record lists
#[derive(Debug, Default)]
pub struct HydraChunk {
    pub presets: Vec<PresetHeader>,
    pub pbags: Vec<Bag>,
    pub pmods: Vec<()>,
    pub pgens: Vec<GenList>,
    pub instruments: Vec<InstHeader>,
    pub ibags: Vec<Bag>,
    pub imods: Vec<()>,
    pub igens: Vec<GenList>,
    pub sample_headers: Vec<SampleHeader>,
}

impl HydraChunk {
    pub fn add_preset(&mut self, name: &str, preset: u16, bank: u16) {
        self.presets.push(PresetHeader {
            name: name20(name),
            preset,
            bank,
            bag_ndx: self.pbags.len() as u16,
        });
    }

    pub fn add_instrument(&mut self, name: &str) {
        self.instruments.push(InstHeader {
            name: name20(name),
            bag_ndx: self.ibags.len() as u16,
        });
    }

    pub fn add_preset_bag(&mut self) {
        self.pbags.push(Bag {
            gen_ndx: self.pgens.len() as u16,
            mod_ndx: self.pmods.len() as u16,
        });
    }

    pub fn add_inst_bag(&mut self) {
        self.ibags.push(Bag {
            gen_ndx: self.igens.len() as u16,
            mod_ndx: self.imods.len() as u16,
        });
    }

    pub fn calc_size(&self) -> u32 {
        let mut size = 4u32; // "pdta" form type
        size += self.presets.len() as u32 * 38 + 8;
        size += self.pbags.len() as u32 * 4 + 8;
        size += self.pmods.len() as u32 * 10 + 8;
        size += self.pgens.len() as u32 * 4 + 8;
        size += self.instruments.len() as u32 * 22 + 8;
        size += self.ibags.len() as u32 * 4 + 8;
        size += self.imods.len() as u32 * 10 + 8;
        size += self.igens.len() as u32 * 4 + 8;
        size += self.sample_headers.len() as u32 * 46 + 8;
        size
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        write_subchunk_header(out, b"LIST", self.calc_size());
        out.extend_from_slice(b"pdta");

        write_subchunk_header(out, b"phdr", self.presets.len() as u32 * 38);
        for p in &self.presets {
            p.write(out);
        }
        write_subchunk_header(out, b"pbag", self.pbags.len() as u32 * 4);
        for b in &self.pbags {
            b.write(out);
        }
        write_subchunk_header(out, b"pmod", self.pmods.len() as u32 * 10);
        for _ in &self.pmods {
            out.extend_from_slice(&[0u8; 10]);
        }
        write_subchunk_header(out, b"pgen", self.pgens.len() as u32 * 4);
        for g in &self.pgens {
            g.write(out);
        }
        write_subchunk_header(out, b"inst", self.instruments.len() as u32 * 22);
        for i in &self.instruments {
            i.write(out);
        }
        write_subchunk_header(out, b"ibag", self.ibags.len() as u32 * 4);
        for b in &self.ibags {
            b.write(out);
        }
        write_subchunk_header(out, b"imod", self.imods.len() as u32 * 10);
        for _ in &self.imods {
            out.extend_from_slice(&[0u8; 10]);
        }
        write_subchunk_header(out, b"igen", self.igens.len() as u32 * 4);
        for g in &self.igens {
            g.write(out);
        }
        write_subchunk_header(out, b"shdr", self.sample_headers.len() as u32 * 46);
        for s in &self.sample_headers {
            s.write(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bdpcm_block_decode() {
        // Seed 10, then nibbles 1 (+1) and 0x82 (-64 then +4)
        let mut raw = vec![0u8; 33];
        raw[0] = 10;
        raw[1] = 0x01;
        raw[2] = 0x82;
        let rom = Rom::new(raw);
        let pcm = decode_sample(&rom, SampleType::Bdpcm, 0, 64).unwrap();
        assert_eq!(pcm[0], 10 << 8);
        assert_eq!(pcm[1], 11 << 8);
        assert_eq!(pcm[2], (11 - 64) << 8);
        assert_eq!(pcm[3], (11 - 64 + 4) << 8);
    }

    #[test]
    fn test_unsigned8_center() {
        let rom = Rom::new(vec![0x80, 0x00, 0xFF]);
        let pcm = decode_sample(&rom, SampleType::Unsigned8, 0, 3).unwrap();
        assert_eq!(pcm, vec![0, -0x8000, 0x7F00]);
    }

    #[test]
    fn test_gb3_expansion_length() {
        let rom = Rom::new(vec![0x8F; 16]);
        let pcm = decode_sample(&rom, SampleType::GameboyCh3, 0, 64).unwrap();
        assert_eq!(pcm.len(), 64);
        // Each nibble repeats size/32 = 2 times
        assert_eq!(pcm[0], GB3_LEVELS[8]);
        assert_eq!(pcm[1], GB3_LEVELS[8]);
        assert_eq!(pcm[2], GB3_LEVELS[15]);
    }

    #[test]
    fn test_smpl_offsets_and_tail() {
        let rom = Rom::new(vec![0u8; 64]);
        let mut smpl = SmplChunk::default();
        let off0 = smpl
            .add_sample(&rom, SampleType::Signed8, 0, 32, true, 4)
            .unwrap();
        let off1 = smpl
            .add_sample(&rom, SampleType::Signed8, 0, 16, false, 0)
            .unwrap();
        assert_eq!(off0, 0);
        // Looped sample occupies 32 + 8 + 46 data points
        assert_eq!(off1, 32 + 8 + 46);
        assert_eq!(smpl.size(), (32 + 8 + 46 + 16 + 46) * 2);

        let mut out = Vec::new();
        smpl.write(&mut out);
        assert_eq!(out.len() as u32, smpl.size() + 8);
    }

    #[test]
    fn test_hydra_prefix_sum_indices() {
        let mut hydra = HydraChunk::default();
        hydra.add_instrument("first");
        hydra.add_inst_bag();
        hydra.igens.push(GenList {
            oper: SfGenerator::SampleId,
            amount: GenAmount::Value(0),
        });
        hydra.add_inst_bag();
        hydra.igens.push(GenList {
            oper: SfGenerator::SampleId,
            amount: GenAmount::Value(1),
        });
        hydra.add_instrument("second");
        hydra.add_inst_bag();

        assert_eq!(hydra.instruments[0].bag_ndx, 0);
        assert_eq!(hydra.instruments[1].bag_ndx, 2);
        assert_eq!(hydra.ibags[0].gen_ndx, 0);
        assert_eq!(hydra.ibags[1].gen_ndx, 1);
        assert_eq!(hydra.ibags[2].gen_ndx, 2);
    }
}
