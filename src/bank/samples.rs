//! Sample extraction and deduplication
//!
//! Samples live in a single list whose indexes match the sample headers in
//! the output container. Each sample is keyed for deduplication: cartridge
//! samples by their address, synthesized chip sounds by a small id. The two
//! key spaces are deliberately shared, matching the engine's own layout
//! where chip ids never collide with plausible sample addresses.

use crate::error::{Error, Result};
use crate::rom::{Rom, SynthAssets};
use crate::sf2::types::SampleType;
use crate::sf2::Sf2;

/// Loop flag values accepted in a sample header
const LOOP_NONE: u32 = 0x0000_0000;
const LOOP_FORWARD: u32 = 0x4000_0000;
const LOOP_BDPCM: u32 = 0x0000_0001;

pub struct SampleBank {
    /// Dedup key of every sample added so far, in sample-index order
    samples_list: Vec<u32>,
}

impl SampleBank {
    pub fn new() -> Self {
        Self {
            samples_list: Vec::new(),
        }
    }

    fn find(&self, key: u32) -> Option<u16> {
        self.samples_list
            .iter()
            .rposition(|&k| k == key)
            .map(|i| i as u16)
    }

    /// Extract the sample whose 16-byte header sits at `pointer`.
    /// Returns the index of the (possibly pre-existing) sample.
    pub fn build_sample(
        &mut self,
        sf2: &mut Sf2,
        rom: &Rom,
        assets: &SynthAssets,
        pointer: u32,
    ) -> Result<u16> {
        if let Some(i) = self.find(pointer) {
            return Ok(i);
        }

        let loop_word = rom.u32(pointer)?;
        let pitch = rom.u32(pointer + 4)?;
        let loop_pos = rom.u32(pointer + 8)?;
        let len = rom.u32(pointer + 12)?;

        let (loop_en, bdpcm_en) = match loop_word {
            LOOP_FORWARD => (true, false),
            LOOP_NONE => (false, false),
            LOOP_BDPCM => (false, true),
            _ => {
                return Err(Error::Sample {
                    addr: pointer,
                    reason: "invalid loop flag".into(),
                })
            }
        };

        if pitch == 0 {
            return Err(Error::Sample {
                addr: pointer,
                reason: "zero pitch".into(),
            });
        }

        // The header pitch field is 1024 times the middle C frequency
        let delta_note = 12.0 * (f64::from(sf2.default_sample_rate()) * 1024.0 / f64::from(pitch)).log2();
        let int_delta_note = delta_note.round();
        let pitch_correction = ((int_delta_note - delta_note) * 100.0) as i8;
        let original_pitch = (60 + int_delta_note as i32) as u8;

        if assets.has_synth_waves() && len == 0 && loop_pos == 0 {
            // Synthesized waveform, played back from the bundled wave set
            let synth = assets.synth_waves()?;
            if rom.u8(pointer + 16)? != 0x80 {
                return Err(Error::Sample {
                    addr: pointer,
                    reason: "unrecognized synth sample".into(),
                });
            }
            match rom.u8(pointer + 17)? {
                0 => {
                    let name = format!("Square @0x{pointer:x}");
                    let duty_cycle = rom.u8(pointer + 18)?;
                    let change_speed = rom.u8(pointer + 19)?;
                    if change_speed == 0 {
                        // Constant duty cycle
                        let base_pointer = 128 + 64 * u32::from(duty_cycle >> 2);
                        sf2.add_new_sample(
                            synth,
                            SampleType::Unsigned8,
                            &name,
                            base_pointer,
                            64,
                            true,
                            0,
                            original_pitch,
                            pitch_correction,
                            sf2.default_sample_rate(),
                        )?;
                    } else {
                        // Sweeping duty cycle, approximated with a long
                        // pre-rendered sweep
                        sf2.add_new_sample(
                            synth,
                            SampleType::Unsigned8,
                            &name,
                            128,
                            8192,
                            true,
                            0,
                            original_pitch,
                            pitch_correction,
                            sf2.default_sample_rate(),
                        )?;
                    }
                }
                1 => {
                    let name = format!("Saw @0x{pointer:x}");
                    sf2.add_new_sample(
                        synth,
                        SampleType::Unsigned8,
                        &name,
                        0,
                        64,
                        true,
                        0,
                        original_pitch,
                        pitch_correction,
                        sf2.default_sample_rate(),
                    )?;
                }
                2 => {
                    let name = format!("Triangle @0x{pointer:x}");
                    sf2.add_new_sample(
                        synth,
                        SampleType::Unsigned8,
                        &name,
                        64,
                        64,
                        true,
                        0,
                        original_pitch,
                        pitch_correction,
                        sf2.default_sample_rate(),
                    )?;
                }
                _ => {
                    return Err(Error::Sample {
                        addr: pointer,
                        reason: "unknown synth waveform type".into(),
                    })
                }
            }
        } else {
            // Reject samples which are way too long or too short
            if !(16..=0x3F_FFFF).contains(&len) {
                return Err(Error::Sample {
                    addr: pointer,
                    reason: "implausible length".into(),
                });
            }

            let loop_pos = if loop_pos > len - 8 {
                eprintln!("Warning: illegal loop point detected");
                0
            } else {
                loop_pos
            };

            let name = if bdpcm_en {
                format!("BDPCM @0x{pointer:x}")
            } else {
                format!("Sample @0x{pointer:x}")
            };

            sf2.add_new_sample(
                rom,
                if bdpcm_en {
                    SampleType::Bdpcm
                } else {
                    SampleType::Signed8
                },
                &name,
                pointer + 16,
                len,
                loop_en,
                loop_pos,
                original_pitch,
                pitch_correction,
                sf2.default_sample_rate(),
            )?;
        }

        self.samples_list.push(pointer);
        Ok(self.samples_list.len() as u16 - 1)
    }

    /// Extract the four octave-spaced renderings of a wave channel sample.
    /// Returns the index of the last one.
    pub fn build_gb3_samples(&mut self, sf2: &mut Sf2, rom: &Rom, pointer: u32) -> Result<u16> {
        if let Some(i) = self.find(pointer) {
            return Ok(i);
        }

        let name = format!("GB3 @0x{pointer:x}");
        sf2.add_new_sample(rom, SampleType::GameboyCh3, &(name.clone() + "A"), pointer, 256, true, 0, 53, 24, 22050)?;
        sf2.add_new_sample(rom, SampleType::GameboyCh3, &(name.clone() + "B"), pointer, 128, true, 0, 65, 24, 22050)?;
        sf2.add_new_sample(rom, SampleType::GameboyCh3, &(name.clone() + "C"), pointer, 64, true, 0, 77, 24, 22050)?;
        sf2.add_new_sample(rom, SampleType::GameboyCh3, &(name + "D"), pointer, 32, true, 0, 89, 24, 22050)?;

        // Multiple list entries keep sample indexes in sync
        for _ in 0..4 {
            self.samples_list.push(pointer);
        }
        Ok(self.samples_list.len() as u16 - 1)
    }

    /// Extract the five octave-spaced recordings of a square wave with the
    /// given duty cycle. Returns the index of the last one.
    pub fn build_pulse_samples(
        &mut self,
        sf2: &mut Sf2,
        assets: &SynthAssets,
        duty_cycle: u32,
    ) -> Result<u16> {
        if let Some(i) = self.find(duty_cycle) {
            return Ok(i);
        }

        let psg = assets.psg()?;
        let name = match duty_cycle {
            0 => "square 12.5%",
            2 => "square 50%",
            _ => "square 25%",
        };

        // Offsets into the bundled chip sound recordings
        const POINTER_TBL: [[u32; 5]; 3] = [
            [0x0000, 0x2166, 0x3c88, 0x4bd2, 0x698a],
            [0x7798, 0x903e, 0xa15e, 0xb12c, 0xbf4a],
            [0xc958, 0xe200, 0xf4ec, 0x10534, 0x11360],
        ];
        const SIZE_TBL: [[u32; 5]; 3] = [
            [0x10b3, 0xd91, 0x7a5, 0xdec, 0x707],
            [0xc53, 0x890, 0x7e7, 0x70f, 0x507],
            [0xc54, 0x976, 0x824, 0x716, 0x36b],
        ];
        const LOOP_SIZE: [u32; 5] = [689, 344, 172, 86, 43];

        let d = duty_cycle as usize;
        for i in 0..5 {
            let size = SIZE_TBL[d][i];
            sf2.add_new_sample(
                psg,
                SampleType::Signed16,
                &format!("{}{}", name, (b'A' + i as u8) as char),
                POINTER_TBL[d][i],
                size,
                true,
                size - LOOP_SIZE[i],
                36 + 12 * i as u8,
                38,
                44100,
            )?;
            self.samples_list.push(duty_cycle);
        }
        Ok(self.samples_list.len() as u16 - 1)
    }

    /// Extract a noise channel recording for the given key
    pub fn build_noise_sample(
        &mut self,
        sf2: &mut Sf2,
        assets: &SynthAssets,
        metallic: bool,
        key: u8,
    ) -> Result<u16> {
        // Out of range keys snap to the recorded range
        let key = if key < 42 {
            42
        } else if key > 77 {
            76
        } else {
            key
        };

        let num = if metallic {
            3 + u32::from(key - 42)
        } else {
            80 + u32::from(key - 42)
        };
        if let Some(i) = self.find(num) {
            return Ok(i);
        }

        let psg = assets.psg()?;
        let name = format!(
            "Noise {} {}",
            if metallic { "metallic" } else { "normal" },
            key
        );

        const POINTER_TBL: [u32; 39] = [
            72246, 160446, 248646, 336846, 425046, 513246, 601446, 689646, 777846, 866046, 954246,
            1042446, 1130646, 1218846, 1307046, 1395246, 1483446, 1571646, 1659846, 1748046,
            1836246, 1924446, 2012646, 2100846, 2189046, 2277246, 2387493, 2475690, 2552863,
            2619011, 2674134, 2718233, 2756819, 2789893, 2817455, 2839504, 2856041, 2867066,
            2872578,
        ];
        const NORMAL_LEN_TBL: [u32; 39] = [
            88200, 88200, 88200, 88200, 88200, 88200, 88200, 88200, 88200, 88200, 88200, 88200,
            88200, 88200, 88200, 88200, 88200, 88200, 88200, 88200, 88200, 88200, 88200, 88200,
            88200, 110247, 88197, 77173, 66148, 55123, 44099, 38586, 33074, 27562, 22049, 16537,
            11025, 5512, 2756,
        ];
        const METALLIC_LEN_TBL: [u32; 38] = [
            43755, 38286, 32817, 27347, 21878, 19143, 16408, 13674, 10939, 9572, 8204, 6837, 5469,
            4786, 4102, 3418, 2735, 2393, 2051, 1709, 1367, 1196, 1026, 855, 684, 598, 513, 427,
            342, 299, 256, 214, 171, 150, 128, 107, 85, 64,
        ];

        let i = usize::from(key - 42);
        sf2.add_new_sample(
            psg,
            SampleType::Unsigned8,
            &name,
            POINTER_TBL[i],
            if metallic {
                METALLIC_LEN_TBL[i]
            } else {
                NORMAL_LEN_TBL[i]
            },
            true,
            0,
            key,
            0,
            44100,
        )?;

        self.samples_list.push(num);
        Ok(self.samples_list.len() as u16 - 1)
    }
}

impl Default for SampleBank {
    fn default() -> Self {
        Self::new()
    }
}
