//! Sequence decoder: turns the sound engine's per-track byte streams into
//! time-ordered MIDI events
//!
//! One tick is 1/60 s. Each tick decrements every track's wait counter and
//! executes events until the counter goes positive again; notes held by the
//! engine are counted down in parallel and key-offs are synthesized when a
//! countdown ends.

pub mod track;

use crate::error::{Error, Result};
use crate::midi::Midi;
use crate::rom::Rom;
use track::{SoundingNote, TrackCursor};

/// Tick counts for the delta-time commands (0x80-0xB0) and note lengths
/// (0xD0 and up, offset by one). Calibration data from the engine, do not
/// touch.
const LEN_TBL: [i32; 49] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 28,
    30, 32, 36, 40, 42, 44, 48, 52, 54, 56, 60, 64, 66, 68, 72, 76, 78, 80, 84, 88, 90, 92, 96,
];

/// Hard ceiling on decoded ticks, a safety valve against malformed data
pub const MAX_TICKS: u32 = 100_000;

/// Ceiling on zero-time events executed by one track within one tick;
/// catches self-referencing call/jump cycles that never advance time
const MAX_EVENTS_PER_TICK: u32 = 65_536;

/// Decoder configuration, provided by the caller
#[derive(Debug, Clone, Default)]
pub struct SongOptions {
    /// Force all patches into this bank via bank-select controllers
    pub bank: Option<u16>,
    /// Rearrange channels so channel 10 (drums) is used last
    pub rc: bool,
    /// Prepend a GS reset sysex and set part 10 to normal
    pub gs: bool,
    /// Prepend an XG reset sysex; bank-select is split in two controllers
    pub xg: bool,
    /// Linearize volumes and velocities (sqrt curve)
    pub lv: bool,
    /// Simulate vibrato with runtime modulation events instead of raw
    /// controllers
    pub sv: bool,
}

/// What a finished rip looked like
#[derive(Debug, Clone)]
pub struct SongSummary {
    pub track_count: u8,
    /// Instrument bank referenced by the song header
    pub bank_pointer: u32,
    /// Peak polyphony
    pub max_notes: u32,
    /// A loop point was detected
    pub looped: bool,
    /// Decoding stopped on a safety ceiling rather than normal completion
    pub bailed_out: bool,
}

/// The per-song decoder state machine
pub struct SongRipper<'a> {
    rom: &'a Rom,
    opts: SongOptions,
    midi: Midi,
    tracks: Vec<TrackCursor>,
    notes: Vec<SoundingNote>,
    loop_flag: bool,
    loop_adr: u32,
    bank_pointer: u32,
    notes_ctr: u32,
    max_notes: u32,
    bailed_out: bool,
}

impl<'a> SongRipper<'a> {
    /// Parse the song header at `base` and set up one cursor per track.
    pub fn new(rom: &'a Rom, base: u32, opts: SongOptions) -> Result<Self> {
        let track_count = rom.u8(base)?;
        if track_count < 1 || track_count > 16 {
            return Err(Error::TrackCount(track_count));
        }

        let mut midi = Midi::new();
        if opts.rc {
            // Make the drum channel last in the list so it is only used when
            // all 16 channels are needed
            midi.chn_reorder[9] = 15;
            for j in 10..16 {
                midi.chn_reorder[j] = j as u8 - 1;
            }
        }
        if opts.gs {
            midi.add_sysex(&[0x41, 0x10, 0x42, 0x12, 0x40, 0x00, 0x7F, 0x00, 0x41]);
            // Part 10 to normal
            midi.add_sysex(&[0x41, 0x10, 0x42, 0x12, 0x40, 0x10, 0x15, 0x00, 0x1B]);
        }
        if opts.xg {
            midi.add_sysex(&[0x43, 0x10, 0x4C, 0x00, 0x00, 0x7E, 0x00]);
        }
        midi.add_marker("Converted by sappyrip");

        // Header: track count, unknown, priority, reverb, bank pointer,
        // then one pointer per track
        let reverb = rom.i8(base + 3)?;
        let bank_pointer = rom.gba_pointer(base + 4)?;

        let mut tracks = Vec::with_capacity(track_count as usize);
        for i in 0..track_count {
            let ptr = rom.gba_pointer(base + 8 + 4 * u32::from(i))?;
            tracks.push(TrackCursor::new(ptr));

            if reverb < 0 {
                let raw = (reverb & 0x7F) as u8;
                let value = if opts.lv {
                    (f64::from(raw) * 127.0).sqrt() as u8
                } else {
                    raw
                };
                midi.add_controller(i, 91, value);
            }
        }

        let mut ripper = Self {
            rom,
            opts,
            midi,
            tracks,
            notes: Vec::new(),
            loop_flag: false,
            loop_adr: 0,
            bank_pointer,
            notes_ctr: 0,
            max_notes: 0,
            bailed_out: false,
        };
        ripper.detect_loop(base);
        Ok(ripper)
    }

    /// Track 0 usually ends with a jump back to its loop point, placed right
    /// before the next track's data (or before the header when there is a
    /// single track). Scan 5 bytes for the jump opcode; failures just mean
    /// no loop.
    fn detect_loop(&mut self, base: u32) {
        let scan_base = if self.tracks.len() > 1 {
            self.tracks[1].ptr.checked_sub(9)
        } else {
            base.checked_sub(9)
        };
        let Some(scan_base) = scan_base else { return };

        for i in 0..5 {
            match self.rom.u8(scan_base + i) {
                Ok(0xB2) => {
                    if let Ok(adr) = self.rom.gba_pointer(scan_base + i + 1) {
                        self.loop_flag = true;
                        self.loop_adr = adr;
                    }
                    return;
                }
                Ok(_) => {}
                Err(_) => return,
            }
        }
    }

    /// Decode everything. Consumes the ripper and returns the finished MIDI
    /// data along with a summary.
    pub fn rip(mut self) -> (Midi, SongSummary) {
        let mut budget = MAX_TICKS;
        while self.tick() {
            if budget == 0 {
                eprintln!("Time out!");
                self.bailed_out = true;
                break;
            }
            budget -= 1;
        }

        // If a loop was detected this is its end
        if self.loop_flag {
            self.midi.add_marker("loopEnd");
        }

        let summary = SongSummary {
            track_count: self.tracks.len() as u8,
            bank_pointer: self.bank_pointer,
            max_notes: self.max_notes,
            looped: self.loop_flag,
            bailed_out: self.bailed_out,
        };
        (self.midi, summary)
    }

    /// Advance time by one tick. Returns false once every track is done.
    fn tick(&mut self) -> bool {
        // Count down playing notes; a countdown reaching zero becomes a
        // key-off, an indefinite note leaves the list once its key-on is out
        let mut idx = 0;
        while idx < self.notes.len() {
            let n = &mut self.notes[idx];
            if n.counter > 0 {
                n.counter -= 1;
                if n.counter == 0 {
                    let (chn, key, vel) = (n.chn, n.key, n.vel);
                    self.notes.remove(idx);
                    self.midi.add_note_off(chn, key, vel);
                    self.stop_lfo(chn as usize);
                    self.notes_ctr = self.notes_ctr.saturating_sub(1);
                    continue;
                }
                idx += 1;
            } else {
                self.notes.remove(idx);
            }
        }

        for t in 0..self.tracks.len() {
            self.tracks[t].counter -= 1;
            let mut guard = 0u32;
            // Execute events until the track has to wait again
            while self.tracks[t].ptr != 0
                && !self.tracks[t].completed
                && self.tracks[t].counter <= 0
            {
                if t == 0
                    && self.loop_flag
                    && !self.tracks[0].return_flag
                    && !self.tracks[0].completed
                    && self.tracks[0].ptr == self.loop_adr
                {
                    self.midi.add_marker("loopStart");
                }

                self.process_event(t);

                guard += 1;
                if guard >= MAX_EVENTS_PER_TICK {
                    // Zero-time event cycle, give up on this track
                    self.tracks[t].ptr = 0;
                    self.tracks[t].completed = true;
                    self.bailed_out = true;
                }
            }
        }

        for t in 0..self.tracks.len() {
            self.process_lfo(t);
        }

        // Key-on events for this tick are made after all other events, and
        // before the completion check so notes started on the final tick are
        // not lost
        for i in 0..self.notes.len() {
            if !self.notes[i].event_made {
                let (chn, key, vel) = (self.notes[i].chn, self.notes[i].key, self.notes[i].vel);
                self.midi.add_note_on(chn, key, vel);
                self.notes[i].event_made = true;
            }
        }

        if self.tracks.iter().all(|t| t.completed) {
            return false;
        }

        self.midi.clock();
        true
    }

    fn complete(&mut self, track: usize) {
        self.tracks[track].ptr = 0;
        self.tracks[track].completed = true;
    }

    fn linearize(&self, value: u8) -> u8 {
        if self.opts.lv {
            (127.0 * f64::from(value)).sqrt() as u8
        } else {
            value
        }
    }

    /// Start a new note and count the polyphony
    fn push_note(&mut self, track: usize, len: i32, key: i32, vel: u8) {
        self.start_lfo(track);
        self.notes_ctr += 1;
        if self.notes_ctr > self.max_notes {
            self.max_notes = self.notes_ctr;
        }
        self.notes.insert(
            0,
            SoundingNote {
                counter: len,
                key: (key & 0x7F) as u8,
                vel,
                chn: track as u8,
                event_made: false,
            },
        );
    }

    /// Fetch and execute one event. Read failures terminate the track but
    /// never propagate.
    fn process_event(&mut self, track: usize) {
        let ptr = self.tracks[track].ptr;
        let Ok(mut command) = self.rom.u8(ptr) else {
            self.complete(track);
            return;
        };
        self.tracks[track].ptr += 1;

        let arg1;
        if command < 0x80 {
            // Repeat of the previous command, this byte is its first argument
            arg1 = command;
            command = self.tracks[track].last_cmd;
        } else if command <= 0xB0 {
            // Delta time
            self.tracks[track].counter = LEN_TBL[(command - 0x80) as usize];
            return;
        } else if command == 0xB1 {
            // End of track
            self.complete(track);
            return;
        } else if command == 0xB2 {
            // Unconditional jump; the engine's streams only use this to loop,
            // so the decodable portion ends here
            match self.rom.gba_pointer(self.tracks[track].ptr) {
                Ok(target) => self.tracks[track].ptr = target,
                Err(_) => self.tracks[track].ptr = 0,
            }
            self.tracks[track].completed = true;
            return;
        } else if command == 0xB3 {
            // Call
            match self.rom.gba_pointer(self.tracks[track].ptr) {
                Ok(target) => {
                    self.tracks[track].return_ptr = self.tracks[track].ptr + 4;
                    self.tracks[track].ptr = target;
                    self.tracks[track].return_flag = true;
                }
                Err(_) => self.complete(track),
            }
            return;
        } else if command == 0xB4 {
            // Return, a no-op without a pending call
            if self.tracks[track].return_flag {
                self.tracks[track].ptr = self.tracks[track].return_ptr;
                self.tracks[track].return_flag = false;
            }
            return;
        } else if command == 0xBB {
            // Tempo change, stored at half its BPM value
            let Ok(byte) = self.rom.u8(self.tracks[track].ptr) else {
                self.complete(track);
                return;
            };
            self.tracks[track].ptr += 1;
            self.midi.add_tempo(2 * u32::from(byte));
            return;
        } else {
            // Normal command with at least one argument
            self.tracks[track].last_cmd = command;
            let Ok(byte) = self.rom.u8(self.tracks[track].ptr) else {
                self.complete(track);
                return;
            };
            self.tracks[track].ptr += 1;
            arg1 = byte;
        }

        // Note with explicit length
        if command >= 0xD0 {
            let key;
            let vel;
            let mut len_ofs = 0i32;
            if arg1 < 0x80 {
                key = arg1;
                self.tracks[track].last_key = key;

                let arg2 = self.rom.u8(self.tracks[track].ptr).unwrap_or(0x80);
                if arg2 < 0x80 {
                    vel = arg2;
                    self.tracks[track].last_vel = vel;
                    self.tracks[track].ptr += 1;

                    let arg3 = self.rom.u8(self.tracks[track].ptr).unwrap_or(0x80);
                    if arg3 < 0x80 {
                        len_ofs = i32::from(arg3);
                        self.tracks[track].ptr += 1;
                    }
                } else {
                    vel = self.tracks[track].last_vel;
                }
            } else {
                // High bit set: the byte belongs to the next event, reuse the
                // cached key and velocity and seek back
                key = self.tracks[track].last_key;
                vel = self.tracks[track].last_vel;
                self.tracks[track].ptr -= 1;
            }

            let vel = self.linearize(vel);
            let len = LEN_TBL[(command - 0xD0 + 1) as usize] + len_ofs;
            let key = i32::from(key) + self.tracks[track].key_shift;
            self.push_note(track, len, key, vel);
            return;
        }

        let chn = track as u8;
        match command {
            // Key shift
            0xBC => self.tracks[track].key_shift = i32::from(arg1),

            // Set instrument
            0xBD => {
                if let Some(bank) = self.opts.bank {
                    if !self.opts.xg {
                        self.midi.add_controller(chn, 0, bank as u8);
                    } else {
                        self.midi.add_controller(chn, 0, (bank >> 7) as u8);
                        self.midi.add_controller(chn, 32, (bank & 0x7F) as u8);
                    }
                }
                self.midi.add_pchange(chn, arg1);
            }

            // Set volume
            0xBE => {
                let volume = self.linearize(arg1);
                self.midi.add_controller(chn, 7, volume);
            }

            // Set panning
            0xBF => self.midi.add_controller(chn, 10, arg1),

            // Pitch bend
            0xC0 => self.midi.add_pitch_bend(chn, arg1 as i8),

            // Pitch bend range
            0xC1 => {
                if self.opts.sv {
                    self.midi.add_rpn(chn, 0, arg1);
                } else {
                    self.midi.add_controller(chn, 20, arg1);
                }
            }

            // LFO speed
            0xC2 => {
                if self.opts.sv {
                    self.midi.add_nrpn(chn, 136, arg1);
                } else {
                    self.midi.add_controller(chn, 21, arg1);
                }
            }

            // LFO delay
            0xC3 => {
                if self.opts.sv {
                    self.tracks[track].lfo_delay = i32::from(arg1);
                } else {
                    self.midi.add_controller(chn, 26, arg1);
                }
            }

            // LFO depth
            0xC4 => {
                if self.opts.sv {
                    if self.tracks[track].lfo_delay == 0 && self.tracks[track].lfo_hack {
                        let value = if arg1 > 12 { 127 } else { 10 * arg1 };
                        if self.tracks[track].lfo_type == 0 {
                            self.midi.add_controller(chn, 1, value);
                        } else {
                            self.midi.add_chanaft(chn, value);
                        }
                        self.tracks[track].lfo_flag = true;
                    }
                    self.tracks[track].lfo_depth = i32::from(arg1);
                    // Suppress modulation events until a depth command has
                    // actually been seen
                    self.tracks[track].lfo_hack = true;
                } else {
                    self.midi.add_controller(chn, 1, arg1);
                }
            }

            // LFO type
            0xC5 => {
                if self.opts.sv {
                    self.tracks[track].lfo_type = i32::from(arg1);
                } else {
                    self.midi.add_controller(chn, 22, arg1);
                }
            }

            // Detune
            0xC8 => {
                if self.opts.sv {
                    self.midi.add_rpn(chn, 1, arg1);
                } else {
                    self.midi.add_controller(chn, 24, arg1);
                }
            }

            // Key off
            0xCE => {
                let key;
                let mut vel = 0;
                if arg1 < 0x80 {
                    key = arg1;
                    self.tracks[track].last_key = key;
                } else {
                    key = self.tracks[track].last_key;
                    vel = self.tracks[track].last_vel;
                    self.tracks[track].ptr -= 1;
                }

                let key = i32::from(key) + self.tracks[track].key_shift;
                self.midi.add_note_off(chn, (key & 0x7F) as u8, vel);
                self.stop_lfo(track);
                self.notes_ctr = self.notes_ctr.saturating_sub(1);
            }

            // Key on, indefinite length
            0xCF => {
                let key;
                let vel;
                if arg1 < 0x80 {
                    key = arg1;
                    self.tracks[track].last_key = key;

                    let arg2 = self.rom.u8(self.tracks[track].ptr).unwrap_or(0x80);
                    if arg2 < 0x80 {
                        vel = arg2;
                        self.tracks[track].last_vel = vel;
                        self.tracks[track].ptr += 1;
                    } else {
                        vel = self.tracks[track].last_vel;
                    }
                } else {
                    key = self.tracks[track].last_key;
                    vel = self.tracks[track].last_vel;
                    self.tracks[track].ptr -= 1;
                }

                let vel = self.linearize(vel);
                let key = i32::from(key) + self.tracks[track].key_shift;
                self.push_note(track, -1, key, vel);
            }

            _ => {}
        }
    }

    /// Count down a pending vibrato delay and fire the start signal on the
    /// 1 -> 0 transition
    fn process_lfo(&mut self, track: usize) {
        if !self.opts.sv || self.tracks[track].lfo_delay_ctr == 0 {
            return;
        }
        self.tracks[track].lfo_delay_ctr -= 1;
        if self.tracks[track].lfo_delay_ctr == 0 {
            let depth = self.tracks[track].lfo_depth;
            let value = if depth < 16 { (depth * 8) as u8 } else { 127 };
            if self.tracks[track].lfo_type == 0 {
                // Modulation wheel for a pitch LFO
                self.midi.add_controller(track as u8, 1, value);
            } else {
                self.midi.add_chanaft(track as u8, value);
            }
            self.tracks[track].lfo_flag = true;
        }
    }

    fn start_lfo(&mut self, track: usize) {
        if self.opts.sv && self.tracks[track].lfo_delay != 0 {
            self.tracks[track].lfo_delay_ctr = self.tracks[track].lfo_delay;
        }
    }

    fn stop_lfo(&mut self, track: usize) {
        if !self.opts.sv {
            return;
        }
        if self.tracks[track].lfo_flag {
            if self.tracks[track].lfo_type == 0 {
                self.midi.add_controller(track as u8, 1, 0);
            } else {
                self.midi.add_chanaft(track as u8, 0);
            }
            self.tracks[track].lfo_flag = false;
        } else {
            self.tracks[track].lfo_delay_ctr = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a ROM with a one-track song header at 0x100 and the given
    /// track data at 0x200.
    fn song_rom(track_data: &[u8]) -> Rom {
        let mut data = vec![0u8; 0x300];
        data[0x100] = 1; // track count
        data[0x103] = 0; // reverb off
        data[0x104..0x108].copy_from_slice(&0x0800_0000u32.to_le_bytes()); // bank
        data[0x108..0x10C].copy_from_slice(&0x0800_0200u32.to_le_bytes()); // track 0
        data[0x200..0x200 + track_data.len()].copy_from_slice(track_data);
        Rom::new(data)
    }

    fn rip(track_data: &[u8], opts: SongOptions) -> (Vec<u8>, SongSummary) {
        let rom = song_rom(track_data);
        let ripper = SongRipper::new(&rom, 0x100, opts).unwrap();
        let (midi, summary) = ripper.rip();
        (midi.to_bytes(), summary)
    }

    fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    #[test]
    fn test_rest_note_end() {
        // Rest of 1 tick, note 60 vel 100 with default length, end of track
        let (bytes, summary) = rip(&[0x81, 0xD0, 60, 100, 0xB1], SongOptions::default());

        // Key-on arrives after a 1-tick delta
        let pos = find_subsequence(&bytes, &[0x01, 0x90, 60, 100]);
        assert!(pos.is_some(), "expected a note-on at tick 1");
        assert!(!summary.bailed_out);
        assert_eq!(summary.track_count, 1);
    }

    #[test]
    fn test_argument_elision_reuses_key_and_velocity() {
        // First note sets key 64 vel 90; the second note provides neither
        // (0xD0 followed by a high-bit byte which is the end marker)
        let (bytes, _) = rip(
            &[0xD0, 64, 90, 0x81, 0xD0, 0xB1],
            SongOptions::default(),
        );

        let first = find_subsequence(&bytes, &[0x90, 64, 90]).expect("first note-on");
        let second = find_subsequence(&bytes[first + 3..], &[0x90, 64, 90]);
        assert!(second.is_some(), "elided note should reuse key 64 vel 90");
    }

    #[test]
    fn test_note_off_after_duration() {
        // Note of length 1 tick; a key-off must follow
        let (bytes, _) = rip(&[0xD0, 60, 100, 0x84, 0xB1], SongOptions::default());
        assert!(find_subsequence(&bytes, &[0x90, 60, 100]).is_some());
        assert!(find_subsequence(&bytes, &[0x80, 60, 100]).is_some());
    }

    #[test]
    fn test_repeat_compressed_command() {
        // 0xD0 note, then a bare data byte repeats the note command
        let (bytes, _) = rip(
            &[0xD0, 60, 100, 0x84, 62, 0x84, 0xB1],
            SongOptions::default(),
        );
        assert!(find_subsequence(&bytes, &[0x90, 60, 100]).is_some());
        assert!(find_subsequence(&bytes, &[0x90, 62, 100]).is_some());
    }

    #[test]
    fn test_tempo_command() {
        let (bytes, _) = rip(&[0xBB, 75, 0xB1], SongOptions::default());
        // 75 * 2 = 150 bpm -> 400_000 usec per quarter
        assert!(find_subsequence(&bytes, &[0xFF, 0x51, 0x03, 0x06, 0x1A, 0x80]).is_some());
    }

    #[test]
    fn test_key_shift_applies_to_notes() {
        let (bytes, _) = rip(&[0xBC, 12, 0xD0, 60, 100, 0xB1], SongOptions::default());
        assert!(find_subsequence(&bytes, &[0x90, 72, 100]).is_some());
    }

    #[test]
    fn test_linearized_velocity() {
        let opts = SongOptions {
            lv: true,
            ..SongOptions::default()
        };
        let (bytes, _) = rip(&[0xD0, 60, 100, 0xB1], opts);
        // floor(sqrt(127 * 100)) = 112
        assert!(find_subsequence(&bytes, &[0x90, 60, 112]).is_some());
    }

    #[test]
    fn test_call_and_return() {
        // Call a fragment at 0x8000280 that plays a note and returns
        let mut data = vec![0u8; 0x300];
        data[0x100] = 1;
        data[0x104..0x108].copy_from_slice(&0x0800_0000u32.to_le_bytes());
        data[0x108..0x10C].copy_from_slice(&0x0800_0200u32.to_le_bytes());
        let track = [0xB3, 0x80, 0x02, 0x00, 0x08, 0xB1];
        data[0x200..0x200 + track.len()].copy_from_slice(&track);
        let frag = [0xD0, 67, 80, 0x81, 0xB4];
        data[0x280..0x280 + frag.len()].copy_from_slice(&frag);

        let rom = Rom::new(data);
        let ripper = SongRipper::new(&rom, 0x100, SongOptions::default()).unwrap();
        let (midi, summary) = ripper.rip();
        let bytes = midi.to_bytes();

        assert!(find_subsequence(&bytes, &[0x90, 67, 80]).is_some());
        assert!(!summary.bailed_out);
    }

    #[test]
    fn test_jump_ends_decodable_stream() {
        // Jump back to the track start; decoding must stop, not follow the
        // loop forever
        let (_, summary) = rip(
            &[0x8C, 0xB2, 0x00, 0x02, 0x00, 0x08],
            SongOptions::default(),
        );
        assert_eq!(summary.track_count, 1);
        assert!(!summary.bailed_out);
    }

    #[test]
    fn test_pathological_self_call_bails_out() {
        // Zero-length rest then a call to itself: an event cycle that never
        // advances time must hit the safety ceiling, not hang
        let (_, summary) = rip(
            &[0x80, 0xB3, 0x01, 0x02, 0x00, 0x08],
            SongOptions::default(),
        );
        assert!(summary.bailed_out);
    }

    #[test]
    fn test_vibrato_simulation_delay() {
        let opts = SongOptions {
            sv: true,
            ..SongOptions::default()
        };
        // Depth must be armed (lfo_hack), then delay 2 ticks before the
        // modulation controller fires; the note must outlast the delay
        let (bytes, _) = rip(
            &[0xC4, 5, 0xC3, 2, 0xD1, 60, 100, 0x8C, 0xB1],
            opts,
        );
        // depth 5 < 16 -> controller 1 value 40 after the delay ran out
        assert!(find_subsequence(&bytes, &[0xB0, 1, 40]).is_some());
    }

    #[test]
    fn test_invalid_track_count() {
        let rom = Rom::new(vec![0u8; 0x200]);
        assert!(matches!(
            SongRipper::new(&rom, 0x100, SongOptions::default()),
            Err(Error::TrackCount(0))
        ));
    }
}
