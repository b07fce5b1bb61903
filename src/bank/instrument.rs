//! Instrument extraction and deduplication
//!
//! A cartridge instrument is three words read from the bank table. Built
//! instruments are deduplicated on those words so presets in different
//! banks pointing at the same data share one instrument.

use super::samples::SampleBank;
use crate::error::{Error, Result};
use crate::rom::{Rom, SynthAssets, GBA_POINTER_MASK};
use crate::sf2::types::{GenAmount, SfGenerator};
use crate::sf2::Sf2;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Raw 12-byte instrument record from the bank table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstRecord {
    pub word0: u32,
    pub word1: u32,
    pub word2: u32,
}

impl Ord for InstRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.word2
            .cmp(&other.word2)
            .then(self.word1.cmp(&other.word1))
            .then(self.word0.cmp(&other.word0))
    }
}

impl PartialOrd for InstRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Envelope values are timecents, a signed quantity serialized into the
/// generator's 16-bit amount.
fn timecents(v: f64) -> GenAmount {
    GenAmount::Value(v as i64 as u16)
}

/// Chip envelope fields must each fit in 4 bits. Checked before the
/// instrument header is committed so a rejection leaves no record behind.
fn check_psg_adsr(adsr: u32) -> Result<()> {
    if adsr & 0xF0F0_F0F0 != 0 {
        return Err(Error::Instrument("invalid chip envelope".into()));
    }
    Ok(())
}

pub struct InstrumentBank {
    inst_map: BTreeMap<InstRecord, u16>,
    cur_inst_index: u16,
    pub samples: SampleBank,
}

impl InstrumentBank {
    pub fn new() -> Self {
        Self {
            inst_map: BTreeMap::new(),
            cur_inst_index: 0,
            samples: SampleBank::new(),
        }
    }

    fn finish(&mut self, inst: InstRecord) -> u16 {
        let index = self.cur_inst_index;
        self.inst_map.insert(inst, index);
        self.cur_inst_index += 1;
        index
    }

    /// Envelope generators for a sampled instrument.
    ///
    /// The engine updates envelopes 60 times per second, adding the attack
    /// rate and multiplying by decay/256 per frame; the computed times map
    /// that behavior onto the exponential envelope model.
    fn generate_adsr_generators(&self, sf2: &mut Sf2, adsr: u32) {
        let attack = adsr & 0xFF;
        let decay = (adsr >> 8) & 0xFF;
        let sustain = (adsr >> 16) & 0xFF;
        let release = adsr >> 24;

        if attack != 0xFF {
            let att_time = (256.0 / 60.0) / f64::from(attack);
            let att = 1200.0 * att_time.log2();
            sf2.add_new_inst_generator(SfGenerator::AttackVolEnv, timecents(att));
        }

        if sustain != 0xFF {
            // Attenuation in centibels, infinite when sustain is zero
            let sus = if sustain != 0 {
                100.0 * (256.0 / f64::from(sustain)).ln()
            } else {
                1000.0
            };
            sf2.add_new_inst_generator(SfGenerator::SustainVolEnv, timecents(sus));

            let mut dec_time = (256f64.ln() / (256f64.ln() - f64::from(decay).ln())) / 60.0;
            dec_time *= 10.0 / 256f64.ln();
            let dec = 1200.0 * dec_time.log2();
            sf2.add_new_inst_generator(SfGenerator::DecayVolEnv, timecents(dec));
        }

        if release != 0 {
            let rel_time = (256f64.ln() / (256f64.ln() - f64::from(release).ln())) / 60.0;
            let rel = 1200.0 * rel_time.log2();
            sf2.add_new_inst_generator(SfGenerator::ReleaseVolEnv, timecents(rel));
        }
    }

    /// Envelope generators for a chip channel instrument. Chip envelopes
    /// step every 1/5 second; `adsr` must have passed `check_psg_adsr`.
    fn generate_psg_adsr_generators(&self, sf2: &mut Sf2, adsr: u32) {
        let attack = adsr & 0xFF;
        let decay = (adsr >> 8) & 0xFF;
        let sustain = (adsr >> 16) & 0xFF;
        let release = adsr >> 24;

        if attack != 0 {
            let att = 1200.0 * (f64::from(attack) / 5.0).log2();
            sf2.add_new_inst_generator(SfGenerator::AttackVolEnv, timecents(att));
        }

        if sustain != 15 {
            let sus = if sustain != 0 {
                100.0 * (15.0 / f64::from(sustain)).ln()
            } else {
                1000.0
            };
            sf2.add_new_inst_generator(SfGenerator::SustainVolEnv, timecents(sus));

            let dec = 1200.0 * (f64::from(decay) / 5.0 + 1.0).log2();
            sf2.add_new_inst_generator(SfGenerator::DecayVolEnv, timecents(dec));
        }

        if release != 0 {
            let rel = 1200.0 * (f64::from(release) / 5.0).log2();
            sf2.add_new_inst_generator(SfGenerator::ReleaseVolEnv, timecents(rel));
        }
    }

    /// Build an instrument from a single sampled voice
    pub fn build_sampled_instrument(
        &mut self,
        sf2: &mut Sf2,
        rom: &Rom,
        assets: &SynthAssets,
        inst: InstRecord,
    ) -> Result<u16> {
        if let Some(&i) = self.inst_map.get(&inst) {
            return Ok(i);
        }

        // Type 8 voices bypass key scaling
        let no_scale = (inst.word0 & 0xFF) == 0x08;
        let sample_pointer = inst.word1 & GBA_POINTER_MASK;

        // The loop flag lives in the top byte of the sample header
        let loop_flag = rom.u8(sample_pointer | 3)? == 0x40;

        let sample_index = self
            .samples
            .build_sample(sf2, rom, assets, sample_pointer)?;

        let name = format!("sample @0x{sample_pointer:x}");
        sf2.add_new_instrument(&name);
        sf2.add_new_inst_bag();

        if no_scale {
            sf2.add_new_inst_generator(SfGenerator::ScaleTuning, GenAmount::Value(0));
        }
        self.generate_adsr_generators(sf2, inst.word2);
        sf2.add_new_inst_generator(
            SfGenerator::SampleModes,
            GenAmount::Value(u16::from(loop_flag)),
        );
        sf2.add_new_inst_generator(SfGenerator::SampleId, GenAmount::Value(sample_index));

        Ok(self.finish(inst))
    }

    /// Build an instrument from a key-split voice table
    pub fn build_keysplit_instrument(
        &mut self,
        sf2: &mut Sf2,
        rom: &Rom,
        assets: &SynthAssets,
        inst: InstRecord,
    ) -> Result<u16> {
        if let Some(&i) = self.inst_map.get(&inst) {
            return Ok(i);
        }

        let base_pointer = inst.word1 & GBA_POINTER_MASK;
        let key_table = inst.word2 & GBA_POINTER_MASK;

        // Decode the key table into split points: a new zone starts
        // wherever the voice index changes. An unreadable entry loses that
        // key only, and nothing is committed until the table is decoded.
        let mut split_list: Vec<u8> = Vec::new();
        let mut index_list: Vec<u8> = Vec::new();
        let mut prev_index: i32 = -1;
        for key in 0u8..128 {
            let Ok(index) = rom.u8(key_table + u32::from(key)) else {
                continue;
            };
            if i32::from(index) != prev_index {
                split_list.push(key);
                index_list.push(index);
                prev_index = i32::from(index);
            }
        }
        // Sentinel past the last key; its minus-one wraps to 127
        split_list.push(0x80);

        let name = format!("0x{base_pointer:x} key split");
        sf2.add_new_instrument(&name);

        for (i, &index) in index_list.iter().enumerate() {
            // A bad entry skips this zone, not the whole instrument
            let _ = self.build_keysplit_zone(
                sf2,
                rom,
                assets,
                base_pointer + 12 * u32::from(index),
                split_list[i],
                split_list[i + 1].wrapping_sub(1),
            );
        }

        Ok(self.finish(inst))
    }

    fn build_keysplit_zone(
        &mut self,
        sf2: &mut Sf2,
        rom: &Rom,
        assets: &SynthAssets,
        record: u32,
        key_lo: u8,
        key_hi: u8,
    ) -> Result<()> {
        let inst_type = rom.u8(record)?;
        let no_scale = inst_type == 8;
        let sample_pointer = rom.u32(record + 4)? & GBA_POINTER_MASK;
        let adsr = rom.u32(record + 8)?;

        // Chip voices inside key splits are not supported
        if inst_type & 0x07 != 0 {
            return Ok(());
        }

        let loop_flag = rom.u8(sample_pointer | 3)? == 0x40;
        let sample_index = self
            .samples
            .build_sample(sf2, rom, assets, sample_pointer)?;

        sf2.add_new_inst_bag();
        if no_scale {
            sf2.add_new_inst_generator(SfGenerator::ScaleTuning, GenAmount::Value(0));
        }
        self.generate_adsr_generators(sf2, adsr);
        sf2.add_new_inst_generator(SfGenerator::KeyRange, GenAmount::Range(key_lo, key_hi));
        sf2.add_new_inst_generator(
            SfGenerator::SampleModes,
            GenAmount::Value(u16::from(loop_flag)),
        );
        sf2.add_new_inst_generator(SfGenerator::SampleId, GenAmount::Value(sample_index));
        Ok(())
    }

    /// Build an instrument from a table with one voice per key
    pub fn build_every_keysplit_instrument(
        &mut self,
        sf2: &mut Sf2,
        rom: &Rom,
        assets: &SynthAssets,
        inst: InstRecord,
    ) -> Result<u16> {
        if let Some(&i) = self.inst_map.get(&inst) {
            return Ok(i);
        }

        let base_address = inst.word1 & GBA_POINTER_MASK;
        let name = format!("EveryKeySplit @0x{base_address:x}");
        sf2.add_new_instrument(&name);

        for key in 0u8..128 {
            // Problems with one key do not abort the others
            let _ = self.build_every_keysplit_zone(sf2, rom, assets, base_address, key);
        }

        Ok(self.finish(inst))
    }

    fn build_every_keysplit_zone(
        &mut self,
        sf2: &mut Sf2,
        rom: &Rom,
        assets: &SynthAssets,
        base_address: u32,
        key: u8,
    ) -> Result<()> {
        let record = base_address + 12 * u32::from(key);
        let inst_type = rom.u8(record)?;
        let keynum = rom.u8(record + 1)?;
        let panning = rom.u8(record + 3)?;
        let main_word = rom.u32(record + 4)?;
        let adsr = rom.u32(record + 8)?;

        let mut loop_flag = true;
        let sample_index;

        match inst_type & 0x0F {
            t @ (0 | 8) => {
                let no_scale = t == 8;
                let sample_pointer = main_word & GBA_POINTER_MASK;
                loop_flag = rom.u8(sample_pointer | 3)? == 0x40;
                let pitch = rom.u32(sample_pointer + 4)?;
                if pitch == 0 {
                    return Err(Error::Instrument("zero pitch in key voice".into()));
                }

                sample_index = self
                    .samples
                    .build_sample(sf2, rom, assets, sample_pointer)?;

                sf2.add_new_inst_bag();
                self.generate_adsr_generators(sf2, adsr);
                if no_scale {
                    sf2.add_new_inst_generator(SfGenerator::ScaleTuning, GenAmount::Value(0));
                }

                // Root key from the sample pitch, shifted so this key plays
                // the note the voice table assigned to it
                let delta_note =
                    12.0 * (f64::from(sf2.default_sample_rate()) * 1024.0 / f64::from(pitch)).log2();
                let rootkey = 60 + delta_note.round() as i32;
                let root = rootkey - i32::from(keynum) + i32::from(key);
                sf2.add_new_inst_generator(
                    SfGenerator::OverridingRootKey,
                    GenAmount::Value(root as u16),
                );
                sf2.add_new_inst_generator(SfGenerator::KeyRange, GenAmount::Range(key, key));
            }

            4 | 12 => {
                let metal_flag = match main_word {
                    0x0100_0000 => true,
                    0 => false,
                    _ => return Err(Error::Instrument("invalid noise voice".into())),
                };
                check_psg_adsr(adsr)?;

                sample_index = self
                    .samples
                    .build_noise_sample(sf2, assets, metal_flag, keynum)?;
                sf2.add_new_inst_bag();
                self.generate_psg_adsr_generators(sf2, adsr);
                sf2.add_new_inst_generator(
                    SfGenerator::OverridingRootKey,
                    GenAmount::Value(u16::from(key)),
                );
                sf2.add_new_inst_generator(SfGenerator::KeyRange, GenAmount::Range(key, key));
            }

            _ => return Err(Error::Instrument("unsupported key voice type".into())),
        }

        if panning != 0 {
            let pan = (f64::from(panning) - 192.0) * (500.0 / 128.0);
            sf2.add_new_inst_generator(SfGenerator::Pan, GenAmount::Value(pan as i64 as u16));
        }
        sf2.add_new_inst_generator(
            SfGenerator::SampleModes,
            GenAmount::Value(u16::from(loop_flag)),
        );
        sf2.add_new_inst_generator(SfGenerator::SampleId, GenAmount::Value(sample_index));
        Ok(())
    }

    /// Build a wave channel instrument, one zone per rendered octave
    pub fn build_gb3_instrument(
        &mut self,
        sf2: &mut Sf2,
        rom: &Rom,
        inst: InstRecord,
    ) -> Result<u16> {
        if let Some(&i) = self.inst_map.get(&inst) {
            return Ok(i);
        }

        let sample_pointer = inst.word1 & GBA_POINTER_MASK;
        // Validate the pointer and envelope before committing any records
        rom.u8(sample_pointer)?;
        check_psg_adsr(inst.word2)?;

        let sample = self.samples.build_gb3_samples(sf2, rom, sample_pointer)?;

        let name = format!("GB3 @0x{sample_pointer:x}");
        sf2.add_new_instrument(&name);

        // Global zone carries the envelope
        sf2.add_new_inst_bag();
        self.generate_psg_adsr_generators(sf2, inst.word2);

        let ranges: [(u8, u8, u16); 4] = [
            (0, 52, sample - 3),
            (53, 64, sample - 2),
            (65, 76, sample - 1),
            (77, 127, sample),
        ];
        for (lo, hi, id) in ranges {
            sf2.add_new_inst_bag();
            sf2.add_new_inst_generator(SfGenerator::KeyRange, GenAmount::Range(lo, hi));
            sf2.add_new_inst_generator(SfGenerator::SampleModes, GenAmount::Value(1));
            sf2.add_new_inst_generator(SfGenerator::SampleId, GenAmount::Value(id));
        }

        Ok(self.finish(inst))
    }

    /// Build a square wave instrument, one zone per recorded octave
    pub fn build_pulse_instrument(
        &mut self,
        sf2: &mut Sf2,
        assets: &SynthAssets,
        inst: InstRecord,
    ) -> Result<u16> {
        if let Some(&i) = self.inst_map.get(&inst) {
            return Ok(i);
        }

        // 75% duty is indistinguishable from 25%
        let duty_cycle = match inst.word1 {
            3 => 1,
            d if d > 3 => return Err(Error::Instrument("invalid duty cycle".into())),
            d => d,
        };
        check_psg_adsr(inst.word2)?;

        let sample = self.samples.build_pulse_samples(sf2, assets, duty_cycle)?;
        let name = format!("pulse {duty_cycle}");
        sf2.add_new_instrument(&name);

        sf2.add_new_inst_bag();
        self.generate_psg_adsr_generators(sf2, inst.word2);

        let ranges: [(u8, u8, u16); 5] = [
            (0, 45, sample - 4),
            (46, 57, sample - 3),
            (58, 69, sample - 2),
            (70, 81, sample - 1),
            (82, 127, sample),
        ];
        for (lo, hi, id) in ranges {
            sf2.add_new_inst_bag();
            sf2.add_new_inst_generator(SfGenerator::KeyRange, GenAmount::Range(lo, hi));
            sf2.add_new_inst_generator(SfGenerator::SampleModes, GenAmount::Value(1));
            sf2.add_new_inst_generator(SfGenerator::SampleId, GenAmount::Value(id));
        }

        Ok(self.finish(inst))
    }

    /// Build a noise channel instrument, one zone per recorded key
    pub fn build_noise_instrument(
        &mut self,
        sf2: &mut Sf2,
        assets: &SynthAssets,
        inst: InstRecord,
    ) -> Result<u16> {
        if let Some(&i) = self.inst_map.get(&inst) {
            return Ok(i);
        }

        if inst.word1 > 1 {
            return Err(Error::Instrument("invalid noise type".into()));
        }
        let metallic = inst.word1 == 1;
        check_psg_adsr(inst.word2)?;

        // All samples are built before the header so a missing recording
        // cannot leave a half-written instrument behind
        let sample42 = self.samples.build_noise_sample(sf2, assets, metallic, 42)?;
        let mut key_samples = Vec::with_capacity(35);
        for key in 43..=77u8 {
            key_samples.push(self.samples.build_noise_sample(sf2, assets, metallic, key)?);
        }
        let sample78 = self.samples.build_noise_sample(sf2, assets, metallic, 78)?;

        let name = if metallic {
            "GB metallic noise"
        } else {
            "GB noise"
        };
        sf2.add_new_instrument(name);

        sf2.add_new_inst_bag();
        self.generate_psg_adsr_generators(sf2, inst.word2);

        sf2.add_new_inst_bag();
        sf2.add_new_inst_generator(SfGenerator::KeyRange, GenAmount::Range(0, 42));
        sf2.add_new_inst_generator(SfGenerator::SampleModes, GenAmount::Value(1));
        sf2.add_new_inst_generator(SfGenerator::SampleId, GenAmount::Value(sample42));

        for (key, sample) in (43..=77u8).zip(key_samples) {
            sf2.add_new_inst_bag();
            sf2.add_new_inst_generator(SfGenerator::KeyRange, GenAmount::Range(key, key));
            sf2.add_new_inst_generator(SfGenerator::SampleModes, GenAmount::Value(1));
            sf2.add_new_inst_generator(SfGenerator::SampleId, GenAmount::Value(sample));
        }

        sf2.add_new_inst_bag();
        sf2.add_new_inst_generator(SfGenerator::KeyRange, GenAmount::Range(78, 127));
        sf2.add_new_inst_generator(SfGenerator::SampleModes, GenAmount::Value(1));
        sf2.add_new_inst_generator(SfGenerator::ScaleTuning, GenAmount::Value(0));
        sf2.add_new_inst_generator(SfGenerator::SampleId, GenAmount::Value(sample78));

        Ok(self.finish(inst))
    }
}

impl Default for InstrumentBank {
    fn default() -> Self {
        Self::new()
    }
}
