//! Sound bank to SoundFont conversion
//!
//! A sound bank is an array of up to 128 twelve-byte voice records. Each
//! record becomes one preset; the pointed instrument and sample data are
//! shared between presets through the dedup maps in the sub-builders.

pub mod instrument;
pub mod samples;

pub use instrument::{InstRecord, InstrumentBank};
pub use samples::SampleBank;

use crate::error::Result;
use crate::rom::{Rom, SynthAssets};
use crate::sf2::types::{GenAmount, SfGenerator};
use crate::sf2::Sf2;
use std::collections::BTreeSet;

/// General MIDI instrument names, for the -gm naming mode
const GM_INSTRUMENT_NAMES: [&str; 128] = [
    "Acoustic Grand Piano", "Bright Acoustic Piano", "Electric Grand Piano", "Honky-tonk Piano",
    "Rhodes Piano", "Chorused Piano", "Harpsichord", "Clavinet", "Celesta", "Glockenspiel",
    "Music Box", "Vibraphone", "Marimba", "Xylophone", "Tubular Bells", "Dulcimer",
    "Hammond Organ", "Percussive Organ", "Rock Organ", "Church Organ", "Reed Organ", "Accordion",
    "Harmonica", "Tango Accordion", "Acoustic Guitar (nylon)", "Acoustic Guitar (steel)",
    "Electric Guitar (jazz)", "Electric Guitar (clean)", "Electric Guitar (muted)",
    "Overdriven Guitar", "Distortion Guitar", "Guitar Harmonics", "Acoustic Bass",
    "Electric Bass (finger)", "Electric Bass (pick)", "Fretless Bass", "Slap Bass 1",
    "Slap Bass 2", "Synth Bass 1", "Synth Bass 2", "Violin", "Viola", "Cello", "Contrabass",
    "Tremelo Strings", "Pizzicato Strings", "Orchestral Harp", "Timpani", "String Ensemble 1",
    "String Ensemble 2", "SynthStrings 1", "SynthStrings 2", "Choir Aahs", "Voice Oohs",
    "Synth Voice", "Orchestra Hit", "Trumpet", "Trombone", "Tuba", "Muted Trumpet", "French Horn",
    "Brass Section", "Synth Brass 1", "Synth Brass 2", "Soprano Sax", "Alto Sax", "Tenor Sax",
    "Baritone Sax", "Oboe", "English Horn", "Bassoon", "Clarinet", "Piccolo", "Flute", "Recorder",
    "Pan Flute", "Bottle Blow", "Shakuhachi", "Whistle", "Ocarina", "Lead 1 (square)",
    "Lead 2 (sawtooth)", "Lead 3 (calliope lead)", "Lead 4 (chiff lead)", "Lead 5 (charang)",
    "Lead 6 (voice)", "Lead 7 (fifths)", "Lead 8 (bass + lead)", "Pad 1 (new age)",
    "Pad 2 (warm)", "Pad 3 (polysynth)", "Pad 4 (choir)", "Pad 5 (bowed)", "Pad 6 (metallic)",
    "Pad 7 (halo)", "Pad 8 (sweep)", "FX 1 (rain)", "FX 2 (soundtrack)", "FX 3 (crystal)",
    "FX 4 (atmosphere)", "FX 5 (brightness)", "FX 6 (goblins)", "FX 7 (echoes)",
    "FX 8 (sci-fi)", "Sitar", "Banjo", "Shamisen", "Koto", "Kalimba", "Bagpipe", "Fiddle",
    "Shanai", "Tinkle Bell", "Agogo", "Steel Drums", "Woodblock", "Taiko Drum", "Melodic Tom",
    "Synth Drum", "Reverse Cymbal", "Guitar Fret Noise", "Breath Noise", "Seashore",
    "Bird Tweet", "Telephone Ring", "Helicopter", "Applause", "Gunshot",
];

/// Marker record left in banks for slots that hold no voice
const UNUSED_WORD0: u32 = 0x3C01;
const UNUSED_WORD1: u32 = 0x02;
const UNUSED_WORD2: u32 = 0x000F_0000;

#[derive(Debug, Clone)]
pub struct RipperOptions {
    /// Output rate for sampled voices
    pub sample_rate: u32,
    /// Attenuates sampled presets to balance them against chip channels,
    /// range 1 to 15
    pub main_volume: u32,
    /// Name presets after the General MIDI patch list instead of their type
    /// and address
    pub gm_preset_names: bool,
}

impl Default for RipperOptions {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            main_volume: 15,
            gm_preset_names: false,
        }
    }
}

pub struct SoundFontRipper<'a> {
    rom: &'a Rom,
    assets: &'a SynthAssets,
    opts: RipperOptions,
    sf2: Sf2,
    instruments: InstrumentBank,
    addresses: BTreeSet<u32>,
}

impl<'a> SoundFontRipper<'a> {
    pub fn new(rom: &'a Rom, assets: &'a SynthAssets, opts: RipperOptions) -> Self {
        let sf2 = Sf2::new(opts.sample_rate);
        Self {
            rom,
            assets,
            opts,
            sf2,
            instruments: InstrumentBank::new(),
            addresses: BTreeSet::new(),
        }
    }

    /// Queue a sound bank for dumping. Banks are numbered in address order.
    pub fn add_address(&mut self, address: u32) {
        self.addresses.insert(address);
    }

    pub fn bank_count(&self) -> usize {
        self.addresses.len()
    }

    fn read_record(&self, addr: u32) -> Result<InstRecord> {
        Ok(InstRecord {
            word0: self.rom.u32(addr)?,
            word1: self.rom.u32(addr + 4)?,
            word2: self.rom.u32(addr + 8)?,
        })
    }

    /// Dump every queued bank and hand back the finished container
    pub fn rip(mut self) -> Sf2 {
        let addresses: Vec<u32> = self.addresses.iter().copied().collect();
        for (bank, &address) in addresses.iter().enumerate() {
            // Overlapping banks limit how many records the earlier one has
            let mut ninstr = 128;
            if let Some(&next) = addresses.get(bank + 1) {
                ninstr = ninstr.min((next - address) / 12);
            }

            for i in 0..ninstr {
                let record_addr = address + 12 * i;
                let inst = match self.read_record(record_addr) {
                    Ok(r) => r,
                    Err(_) => {
                        eprintln!("Error: invalid position within sound bank 0x{address:x}");
                        break;
                    }
                };

                if inst.word0 == UNUSED_WORD0
                    && inst.word1 == UNUSED_WORD1
                    && inst.word2 == UNUSED_WORD2
                {
                    continue;
                }

                self.build_instrument(inst, record_addr, bank as u16, i as u16);
            }
        }
        self.sf2
    }

    fn preset_name(&self, instr_type: u8, address: u32, patch: u16) -> String {
        if self.opts.gm_preset_names {
            GM_INSTRUMENT_NAMES[usize::from(patch) & 0x7F].to_string()
        } else {
            format!("Type {instr_type} @0x{address:x}")
        }
    }

    /// Attenuation generator balancing sampled presets against the fixed
    /// volume of chip channels
    fn add_attenuation_preset(&mut self) {
        if self.opts.main_volume < 15 {
            let attenuation = (100.0 * (15.0 / f64::from(self.opts.main_volume)).ln()) as u16;
            self.sf2.add_new_preset_generator(
                SfGenerator::InitialAttenuation,
                GenAmount::Value(attenuation),
            );
        }
    }

    /// Convert one voice record into a preset. Failures leave the container
    /// untouched at the preset level; broken voice records are routine in
    /// practice so nothing is reported.
    fn build_instrument(&mut self, inst: InstRecord, address: u32, bank: u16, patch: u16) {
        let instr_type = (inst.word0 & 0xFF) as u8;
        let name = self.preset_name(instr_type, address, patch);

        match instr_type {
            // Sampled voices
            0x00 | 0x08 | 0x10 | 0x18 | 0x20 | 0x28 | 0x30 | 0x38 => {
                if let Ok(i) = self.instruments.build_sampled_instrument(
                    &mut self.sf2,
                    self.rom,
                    self.assets,
                    inst,
                ) {
                    self.sf2.add_new_preset(&name, patch, bank);
                    self.sf2.add_new_preset_bag();
                    self.add_attenuation_preset();
                    self.sf2
                        .add_new_preset_generator(SfGenerator::Instrument, GenAmount::Value(i));
                }
            }

            // Square wave channels, only available with the chip recordings
            0x01 | 0x02 | 0x09 | 0x0A => {
                if self.assets.psg.is_some() {
                    if let Ok(i) =
                        self.instruments
                            .build_pulse_instrument(&mut self.sf2, self.assets, inst)
                    {
                        self.sf2.add_new_preset(&name, patch, bank);
                        self.sf2.add_new_preset_bag();
                        self.sf2
                            .add_new_preset_generator(SfGenerator::Instrument, GenAmount::Value(i));
                    }
                }
            }

            // Wave channel
            0x03 | 0x0B => {
                if let Ok(i) = self
                    .instruments
                    .build_gb3_instrument(&mut self.sf2, self.rom, inst)
                {
                    self.sf2.add_new_preset(&name, patch, bank);
                    self.sf2.add_new_preset_bag();
                    self.sf2
                        .add_new_preset_generator(SfGenerator::Instrument, GenAmount::Value(i));
                }
            }

            // Noise channel, only available with the chip recordings
            0x04 | 0x0C => {
                if self.assets.psg.is_some() {
                    if let Ok(i) =
                        self.instruments
                            .build_noise_instrument(&mut self.sf2, self.assets, inst)
                    {
                        self.sf2.add_new_preset(&name, patch, bank);
                        self.sf2.add_new_preset_bag();
                        self.sf2
                            .add_new_preset_generator(SfGenerator::Instrument, GenAmount::Value(i));
                    }
                }
            }

            // Key split
            0x40 => {
                if let Ok(i) = self.instruments.build_keysplit_instrument(
                    &mut self.sf2,
                    self.rom,
                    self.assets,
                    inst,
                ) {
                    self.sf2.add_new_preset(&name, patch, bank);
                    self.sf2.add_new_preset_bag();
                    self.add_attenuation_preset();
                    self.sf2
                        .add_new_preset_generator(SfGenerator::Instrument, GenAmount::Value(i));
                }
            }

            // One voice per key
            0x80 => {
                if let Ok(i) = self.instruments.build_every_keysplit_instrument(
                    &mut self.sf2,
                    self.rom,
                    self.assets,
                    inst,
                ) {
                    self.sf2.add_new_preset(&name, patch, bank);
                    self.sf2.add_new_preset_bag();
                    self.add_attenuation_preset();
                    self.sf2
                        .add_new_preset_generator(SfGenerator::Instrument, GenAmount::Value(i));
                }
            }

            // Other voice types are ignored
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_u32(data: &mut [u8], off: usize, v: u32) {
        data[off..off + 4].copy_from_slice(&v.to_le_bytes());
    }

    /// Fill a full 128-slot bank at `base` with the unused marker
    fn pad_bank(data: &mut [u8], base: usize) {
        for slot in 0..128 {
            let rec = base + 12 * slot;
            write_u32(data, rec, UNUSED_WORD0);
            write_u32(data, rec + 4, UNUSED_WORD1);
            write_u32(data, rec + 8, UNUSED_WORD2);
        }
    }

    fn sampled_voice(data: &mut [u8], rec: usize, sample_addr: u32) {
        write_u32(data, rec, 0);
        write_u32(data, rec + 4, 0x0800_0000 + sample_addr);
        write_u32(data, rec + 8, 0x00FF_00FF); // flat envelope
    }

    fn sample_header(data: &mut [u8], off: usize) {
        write_u32(data, off, 0x4000_0000);
        write_u32(data, off + 4, 22050 * 1024);
        write_u32(data, off + 8, 0);
        write_u32(data, off + 12, 64);
    }

    /// ROM with one sampled voice in an otherwise unused bank at 0x40
    fn bank_rom() -> Rom {
        let mut data = vec![0u8; 0x700];
        pad_bank(&mut data, 0x40);
        sampled_voice(&mut data, 0x40, 0x650);
        sample_header(&mut data, 0x650);
        Rom::new(data)
    }

    #[test]
    fn test_single_bank_dump() {
        let rom = bank_rom();
        let assets = SynthAssets::default();
        let mut ripper = SoundFontRipper::new(&rom, &assets, RipperOptions::default());
        ripper.add_address(0x40);
        let sf2 = ripper.rip();
        assert_eq!(sf2.instrument_count(), 1);
        assert_eq!(sf2.sample_count(), 1);
        assert_eq!(sf2.hydra.presets.len(), 1);
        assert_eq!(sf2.hydra.presets[0].preset, 0);
        assert_eq!(sf2.hydra.presets[0].bank, 0);
    }

    #[test]
    fn test_overlapping_banks_limit_record_count() {
        // Second bank starts 24 bytes after the first, limiting the first
        // bank to two records
        let mut data = vec![0u8; 0x700];
        pad_bank(&mut data, 0x58);
        sampled_voice(&mut data, 0x40, 0x660);
        sampled_voice(&mut data, 0x4C, 0x660);
        sampled_voice(&mut data, 0x58, 0x660);
        sample_header(&mut data, 0x660);
        let rom = Rom::new(data);

        let assets = SynthAssets::default();
        let mut ripper = SoundFontRipper::new(&rom, &assets, RipperOptions::default());
        ripper.add_address(0x40);
        ripper.add_address(0x58);
        let sf2 = ripper.rip();

        // All three records share one deduplicated instrument
        assert_eq!(sf2.instrument_count(), 1);
        assert_eq!(sf2.hydra.presets.len(), 3);
        assert_eq!(sf2.hydra.presets[1].bank, 0);
        assert_eq!(sf2.hydra.presets[2].bank, 1);
    }

    #[test]
    fn test_unused_records_are_skipped() {
        let mut data = vec![0u8; 0x700];
        pad_bank(&mut data, 0x40);
        let rom = Rom::new(data);

        let assets = SynthAssets::default();
        let mut ripper = SoundFontRipper::new(&rom, &assets, RipperOptions::default());
        ripper.add_address(0x40);
        let sf2 = ripper.rip();
        assert_eq!(sf2.hydra.presets.len(), 0);
        assert_eq!(sf2.instrument_count(), 0);
    }

    #[test]
    fn test_truncated_bank_stops_cleanly() {
        // Bank running past the end of the image: decoding stops at the
        // first unreadable record instead of failing the whole dump
        let mut data = vec![0u8; 0x100];
        sampled_voice(&mut data, 0xF4, 0x40);
        sample_header(&mut data, 0x40);
        let rom = Rom::new(data);

        let assets = SynthAssets::default();
        let mut ripper = SoundFontRipper::new(&rom, &assets, RipperOptions::default());
        ripper.add_address(0xF4);
        let sf2 = ripper.rip();
        assert_eq!(sf2.hydra.presets.len(), 1);
    }

    #[test]
    fn test_rejected_voice_leaves_presets_consistent() {
        let mut data = vec![0u8; 0x700];
        pad_bank(&mut data, 0x40);
        // Slot 0: wave channel voice with an out-of-range chip envelope
        write_u32(&mut data, 0x40, 0x03);
        write_u32(&mut data, 0x44, 0x0800_0600);
        write_u32(&mut data, 0x48, 0x0000_00FF);
        // Slot 1: valid sampled voice
        sampled_voice(&mut data, 0x4C, 0x650);
        sample_header(&mut data, 0x650);
        let rom = Rom::new(data);

        let assets = SynthAssets::default();
        let mut ripper = SoundFontRipper::new(&rom, &assets, RipperOptions::default());
        ripper.add_address(0x40);
        let sf2 = ripper.rip();

        // The rejected voice must not leave a header behind, and the
        // surviving preset's instrument generator must point at the
        // sampled instrument
        assert_eq!(sf2.instrument_count(), 1);
        assert_eq!(sf2.hydra.presets.len(), 1);
        assert_eq!(&sf2.hydra.instruments[0].name[..7], b"sample ");
        let inst_refs: Vec<GenAmount> = sf2
            .hydra
            .pgens
            .iter()
            .filter(|g| g.oper == SfGenerator::Instrument)
            .map(|g| g.amount)
            .collect();
        assert_eq!(inst_refs, vec![GenAmount::Value(0)]);
    }

    #[test]
    fn test_main_volume_attenuation() {
        let rom = bank_rom();
        let assets = SynthAssets::default();
        let opts = RipperOptions {
            main_volume: 5,
            ..Default::default()
        };
        let mut ripper = SoundFontRipper::new(&rom, &assets, opts);
        ripper.add_address(0x40);
        let sf2 = ripper.rip();

        let atten: Vec<GenAmount> = sf2
            .hydra
            .pgens
            .iter()
            .filter(|g| g.oper == SfGenerator::InitialAttenuation)
            .map(|g| g.amount)
            .collect();
        // 100 * ln(15/5) = 109.8 truncated
        assert_eq!(atten, vec![GenAmount::Value(109)]);
    }

    #[test]
    fn test_gm_preset_names() {
        let rom = bank_rom();
        let assets = SynthAssets::default();
        let opts = RipperOptions {
            gm_preset_names: true,
            ..Default::default()
        };
        let mut ripper = SoundFontRipper::new(&rom, &assets, opts);
        ripper.add_address(0x40);
        let sf2 = ripper.rip();
        assert_eq!(&sf2.hydra.presets[0].name[..20], b"Acoustic Grand Piano");
    }
}
