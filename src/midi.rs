//! Standard MIDI File (format 0) writer
//!
//! Events are appended in playback order; `clock` advances the running time
//! and the accumulated delta is written in front of the next event.

use crate::error::Result;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Ticks per quarter note used by the sound engine
pub const DIVISION: u16 = 24;

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;
const CONTROLLER: u8 = 0xB0;
const PROGRAM_CHANGE: u8 = 0xC0;
const CHANNEL_AFTERTOUCH: u8 = 0xD0;
const PITCH_BEND: u8 = 0xE0;

/// MIDI file writer with a single track
pub struct Midi {
    /// Track data (without the MTrk header)
    data: Vec<u8>,
    /// Ticks elapsed since the last written event
    delta: u32,
    /// Output channel for each source channel, used to route events away
    /// from the reserved drum channel
    pub chn_reorder: [u8; 16],
}

impl Midi {
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            delta: 0,
            chn_reorder: std::array::from_fn(|i| i as u8),
        }
    }

    /// Advance time by one tick
    pub fn clock(&mut self) {
        self.delta += 1;
    }

    /// Write the accumulated delta time as a variable-length quantity
    fn write_delta(&mut self) {
        let mut value = self.delta;
        let mut stack = [0u8; 4];
        let mut n = 0;
        loop {
            stack[n] = (value & 0x7F) as u8;
            value >>= 7;
            n += 1;
            if value == 0 {
                break;
            }
        }
        while n > 1 {
            n -= 1;
            self.data.push(stack[n] | 0x80);
        }
        self.data.push(stack[0]);
        self.delta = 0;
    }

    fn add_event(&mut self, status: u8, chn: u8, args: &[u8]) {
        self.write_delta();
        self.data.push(status | self.chn_reorder[(chn & 0xF) as usize]);
        self.data.extend_from_slice(args);
    }

    pub fn add_note_on(&mut self, chn: u8, key: u8, vel: u8) {
        self.add_event(NOTE_ON, chn, &[key & 0x7F, vel & 0x7F]);
    }

    pub fn add_note_off(&mut self, chn: u8, key: u8, vel: u8) {
        self.add_event(NOTE_OFF, chn, &[key & 0x7F, vel & 0x7F]);
    }

    pub fn add_controller(&mut self, chn: u8, ctrl: u8, value: u8) {
        self.add_event(CONTROLLER, chn, &[ctrl & 0x7F, value & 0x7F]);
    }

    pub fn add_pchange(&mut self, chn: u8, patch: u8) {
        self.add_event(PROGRAM_CHANGE, chn, &[patch & 0x7F]);
    }

    pub fn add_chanaft(&mut self, chn: u8, value: u8) {
        self.add_event(CHANNEL_AFTERTOUCH, chn, &[value & 0x7F]);
    }

    /// Pitch bend with a signed offset from center, coarse byte only
    pub fn add_pitch_bend(&mut self, chn: u8, value: i8) {
        let msb = (i16::from(value) + 64).clamp(0, 127) as u8;
        self.add_event(PITCH_BEND, chn, &[0, msb]);
    }

    /// Registered parameter: CC 101/100 select, CC 6 data entry
    pub fn add_rpn(&mut self, chn: u8, rpn: u16, value: u8) {
        self.add_controller(chn, 101, (rpn >> 7) as u8);
        self.add_controller(chn, 100, (rpn & 0x7F) as u8);
        self.add_controller(chn, 6, value);
    }

    /// Non-registered parameter: CC 99/98 select, CC 6 data entry
    pub fn add_nrpn(&mut self, chn: u8, nrpn: u16, value: u8) {
        self.add_controller(chn, 99, (nrpn >> 7) as u8);
        self.add_controller(chn, 98, (nrpn & 0x7F) as u8);
        self.add_controller(chn, 6, value);
    }

    /// Tempo meta event, `bpm` in quarter notes per minute
    pub fn add_tempo(&mut self, bpm: u32) {
        let usec_per_quarter = 60_000_000 / bpm.max(1);
        self.write_delta();
        self.data.extend_from_slice(&[0xFF, 0x51, 0x03]);
        self.data.push((usec_per_quarter >> 16) as u8);
        self.data.push((usec_per_quarter >> 8) as u8);
        self.data.push(usec_per_quarter as u8);
    }

    /// Marker meta event
    pub fn add_marker(&mut self, text: &str) {
        self.write_delta();
        self.data.extend_from_slice(&[0xFF, 0x06]);
        self.data.push(text.len().min(127) as u8);
        self.data
            .extend_from_slice(&text.as_bytes()[..text.len().min(127)]);
    }

    /// System exclusive message; `data` excludes the F0/F7 framing
    pub fn add_sysex(&mut self, data: &[u8]) {
        self.write_delta();
        self.data.push(0xF0);
        self.data.push((data.len() + 1).min(127) as u8);
        self.data.extend_from_slice(data);
        self.data.push(0xF7);
    }

    /// Serialize the file: MThd plus a single MTrk ending with end-of-track
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() + 32);
        out.extend_from_slice(b"MThd");
        out.extend_from_slice(&6u32.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes()); // format 0
        out.extend_from_slice(&1u16.to_be_bytes()); // one track
        out.extend_from_slice(&DIVISION.to_be_bytes());

        out.extend_from_slice(b"MTrk");
        let track_len = self.data.len() as u32 + 4; // + end-of-track event
        out.extend_from_slice(&track_len.to_be_bytes());
        out.extend_from_slice(&self.data);
        out.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);
        out
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(&self.to_bytes())?;
        Ok(())
    }
}

impl Default for Midi {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track_body(midi: &Midi) -> Vec<u8> {
        let bytes = midi.to_bytes();
        // Skip MThd (14 bytes) and the MTrk tag + length (8 bytes)
        bytes[22..].to_vec()
    }

    #[test]
    fn test_delta_time_encoding() {
        let mut midi = Midi::new();
        for _ in 0..200 {
            midi.clock();
        }
        midi.add_note_on(0, 60, 100);
        // 200 = 0x81 0x48 as a variable-length quantity
        assert_eq!(
            track_body(&midi),
            vec![0x81, 0x48, 0x90, 60, 100, 0x00, 0xFF, 0x2F, 0x00]
        );
    }

    #[test]
    fn test_channel_reorder() {
        let mut midi = Midi::new();
        midi.chn_reorder[9] = 15;
        midi.add_pchange(9, 5);
        assert_eq!(track_body(&midi)[..3], [0x00, 0xCF, 5]);
    }

    #[test]
    fn test_tempo_event() {
        let mut midi = Midi::new();
        midi.add_tempo(150);
        // 60_000_000 / 150 = 400_000 = 0x061A80
        assert_eq!(
            track_body(&midi)[..7],
            [0x00, 0xFF, 0x51, 0x03, 0x06, 0x1A, 0x80]
        );
    }

    #[test]
    fn test_pitch_bend_center_offset() {
        let mut midi = Midi::new();
        midi.add_pitch_bend(3, -64);
        assert_eq!(track_body(&midi)[..4], [0x00, 0xE3, 0, 0]);
    }
}
