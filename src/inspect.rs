//! Serializable summaries of sound bank contents
//!
//! These mirror what the converter reads without committing anything to an
//! output container, for debugging a game's bank layout before dumping it.

use crate::error::Result;
use crate::rom::{Rom, GBA_POINTER_MASK};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct BankSummary {
    pub address: u32,
    pub slots: Vec<SlotSummary>,
}

#[derive(Debug, Serialize)]
pub struct SlotSummary {
    pub index: u32,
    pub address: u32,
    pub kind: &'static str,
    pub word0: u32,
    pub word1: u32,
    pub word2: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adsr: Option<Adsr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<SampleInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duty_cycle: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voices_used: Option<Vec<u8>>,
}

#[derive(Debug, Serialize)]
pub struct Adsr {
    pub attack: u8,
    pub decay: u8,
    pub sustain: u8,
    pub release: u8,
}

impl Adsr {
    fn from_word(word: u32) -> Self {
        Self {
            attack: (word & 0xFF) as u8,
            decay: ((word >> 8) & 0xFF) as u8,
            sustain: ((word >> 16) & 0xFF) as u8,
            release: (word >> 24) as u8,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SampleInfo {
    pub address: u32,
    /// Playback frequency of middle C in Hz
    pub pitch: u32,
    pub length: u32,
    pub loop_kind: &'static str,
    pub loop_position: u32,
}

fn sample_info(rom: &Rom, address: u32) -> Result<SampleInfo> {
    let loop_word = rom.u32(address)?;
    Ok(SampleInfo {
        address,
        pitch: rom.u32(address + 4)? / 1024,
        length: rom.u32(address + 12)?,
        loop_kind: match loop_word {
            0 => "none",
            0x4000_0000 => "forward",
            0x1 => "bdpcm",
            _ => "invalid",
        },
        loop_position: rom.u32(address + 8)?,
    })
}

const DUTY_CYCLES: [&str; 4] = ["12.5%", "25%", "50%", "75%"];

/// Summarize `ninstr` voice records starting at `address`
pub fn inspect_bank(rom: &Rom, address: u32, ninstr: u32) -> Result<BankSummary> {
    let mut slots = Vec::new();
    for i in 0..ninstr {
        let record_addr = address + 12 * i;
        let word0 = rom.u32(record_addr)?;
        let word1 = rom.u32(record_addr + 4)?;
        let word2 = rom.u32(record_addr + 8)?;

        if word0 == 0x3C01 && word1 == 0x02 && word2 == 0x000F_0000 {
            slots.push(SlotSummary {
                index: i,
                address: record_addr,
                kind: "unused",
                word0,
                word1,
                word2,
                adsr: None,
                sample: None,
                duty_cycle: None,
                voices_used: None,
            });
            continue;
        }

        let mut slot = SlotSummary {
            index: i,
            address: record_addr,
            kind: "unknown",
            word0,
            word1,
            word2,
            adsr: None,
            sample: None,
            duty_cycle: None,
            voices_used: None,
        };

        match (word0 & 0xFF) as u8 {
            0x00 | 0x08 | 0x10 | 0x18 | 0x20 | 0x28 | 0x30 | 0x38 => {
                slot.kind = "sampled";
                slot.adsr = Some(Adsr::from_word(word2));
                slot.sample = sample_info(rom, word1 & GBA_POINTER_MASK).ok();
            }
            0x01 | 0x09 => {
                slot.kind = "pulse1";
                slot.adsr = Some(Adsr::from_word(word2));
                slot.duty_cycle = Some(DUTY_CYCLES[(word1 & 3) as usize]);
            }
            0x02 | 0x0A => {
                slot.kind = "pulse2";
                slot.adsr = Some(Adsr::from_word(word2));
                slot.duty_cycle = Some(DUTY_CYCLES[(word1 & 3) as usize]);
            }
            0x03 | 0x0B => {
                slot.kind = "wave";
                slot.adsr = Some(Adsr::from_word(word2));
            }
            0x04 | 0x0C => {
                slot.kind = if word1 == 0 {
                    "noise (long sequence)"
                } else {
                    "noise (short sequence)"
                };
                slot.adsr = Some(Adsr::from_word(word2));
            }
            0x40 => {
                slot.kind = "key split";
                // List the voice indexes the key table actually references
                if let Ok(table) = rom.read(word2 & GBA_POINTER_MASK, 128) {
                    let mut used: Vec<u8> = table
                        .iter()
                        .copied()
                        .filter(|c| c & 0x80 == 0)
                        .collect();
                    used.sort_unstable();
                    used.dedup();
                    slot.voices_used = Some(used);
                }
            }
            0x80 => {
                slot.kind = "every key split";
            }
            _ => {}
        }

        slots.push(slot);
    }

    Ok(BankSummary { address, slots })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inspect_classifies_types() {
        let mut data = vec![0u8; 0x100];
        // Slot 0: pulse channel 1, 50% duty
        data[0x40] = 0x01;
        data[0x44..0x48].copy_from_slice(&2u32.to_le_bytes());
        data[0x48..0x4C].copy_from_slice(&0x000F_0000u32.to_le_bytes());
        // Slot 1: unused marker
        data[0x4C..0x50].copy_from_slice(&0x3C01u32.to_le_bytes());
        data[0x50..0x54].copy_from_slice(&0x02u32.to_le_bytes());
        data[0x54..0x58].copy_from_slice(&0x000F_0000u32.to_le_bytes());
        let rom = Rom::new(data);

        let summary = inspect_bank(&rom, 0x40, 2).unwrap();
        assert_eq!(summary.slots[0].kind, "pulse1");
        assert_eq!(summary.slots[0].duty_cycle, Some("50%"));
        assert_eq!(summary.slots[1].kind, "unused");
    }

    #[test]
    fn test_inspect_keysplit_voice_list() {
        let mut data = vec![0u8; 0x200];
        data[0x40] = 0x40;
        data[0x48..0x4C].copy_from_slice(&0x0800_0100u32.to_le_bytes());
        // Key table: voices 1 and 3, plus invalid entries with the MSB set
        for k in 0..128 {
            data[0x100 + k] = if k < 64 { 1 } else { 3 };
        }
        data[0x100] = 0x81;
        let rom = Rom::new(data);

        let summary = inspect_bank(&rom, 0x40, 1).unwrap();
        assert_eq!(summary.slots[0].kind, "key split");
        assert_eq!(summary.slots[0].voices_used, Some(vec![1, 3]));
    }
}
