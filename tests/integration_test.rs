//! Integration tests for song and sound bank ripping
//!
//! These build small synthetic ROM images, rip them to MIDI / SF2 files on
//! disk, then read the files back and verify their structure.

use sappyrip::bank::{RipperOptions, SoundFontRipper};
use sappyrip::rom::{Rom, SynthAssets};
use sappyrip::seq::{SongOptions, SongRipper};
use tempfile::tempdir;

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn u32_at(data: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([data[off], data[off + 1], data[off + 2], data[off + 3]])
}

/// ROM with a one-track song at 0x100, track data at 0x200 and a small
/// sound bank at 0x40 referenced by the song header
fn demo_rom() -> Rom {
    let mut data = vec![0u8; 0x700];

    // Sound bank: one sampled voice in slot 0, rest of the bank unused
    for slot in 0..8 {
        let rec = 0x40 + 12 * slot;
        data[rec..rec + 4].copy_from_slice(&0x3C01u32.to_le_bytes());
        data[rec + 4..rec + 8].copy_from_slice(&0x02u32.to_le_bytes());
        data[rec + 8..rec + 12].copy_from_slice(&0x000F_0000u32.to_le_bytes());
    }
    data[0x40..0x44].copy_from_slice(&0u32.to_le_bytes());
    data[0x44..0x48].copy_from_slice(&0x0800_0300u32.to_le_bytes());
    data[0x48..0x4C].copy_from_slice(&0x00FF_00FFu32.to_le_bytes());

    // Sample header at 0x300, looped, 64 data points
    data[0x300..0x304].copy_from_slice(&0x4000_0000u32.to_le_bytes());
    data[0x304..0x308].copy_from_slice(&(22050u32 * 1024).to_le_bytes());
    data[0x308..0x30C].copy_from_slice(&0u32.to_le_bytes());
    data[0x30C..0x310].copy_from_slice(&64u32.to_le_bytes());

    // Song header: 1 track, reverb off, bank at 0x40, track at 0x200
    data[0x100] = 1;
    data[0x104..0x108].copy_from_slice(&0x0800_0040u32.to_le_bytes());
    data[0x108..0x10C].copy_from_slice(&0x0800_0200u32.to_le_bytes());

    // Track: program 0, tempo 75, note, rest, end
    let track = [0xBD, 0, 0xBB, 75, 0xD0, 60, 100, 0x84, 0xB1];
    data[0x200..0x200 + track.len()].copy_from_slice(&track);

    Rom::new(data)
}

#[test]
fn test_song_rip_to_midi_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("song.mid");

    let rom = demo_rom();
    let opts = SongOptions {
        gs: true,
        ..SongOptions::default()
    };
    let ripper = SongRipper::new(&rom, 0x100, opts).expect("song header should parse");
    let (midi, summary) = ripper.rip();
    midi.write(&path).expect("write failed");

    let bytes = std::fs::read(&path).expect("read back failed");

    // Standard MIDI file header: format 0, one track, division 24
    assert_eq!(&bytes[..4], b"MThd");
    assert_eq!(&bytes[8..14], &[0, 0, 0, 1, 0, 24]);
    assert_eq!(&bytes[14..18], b"MTrk");

    // Conversion marker, GS reset, program change, note pair, end of track
    assert!(find_subsequence(&bytes, b"Converted by sappyrip").is_some());
    assert!(find_subsequence(&bytes, &[0x41, 0x10, 0x42, 0x12, 0x40, 0x00, 0x7F]).is_some());
    assert!(find_subsequence(&bytes, &[0xC0, 0]).is_some());
    assert!(find_subsequence(&bytes, &[0x90, 60, 100]).is_some());
    assert!(find_subsequence(&bytes, &[0x80, 60, 100]).is_some());
    assert_eq!(&bytes[bytes.len() - 3..], &[0xFF, 0x2F, 0x00]);

    assert_eq!(summary.track_count, 1);
    assert_eq!(summary.bank_pointer, 0x40);
    assert_eq!(summary.max_notes, 1);
    assert!(!summary.bailed_out);
}

#[test]
fn test_loop_markers_in_output() {
    let mut data = vec![0u8; 0x400];
    data[0x100] = 1;
    data[0x104..0x108].copy_from_slice(&0x0800_0000u32.to_le_bytes());
    data[0x108..0x10C].copy_from_slice(&0x0800_0200u32.to_le_bytes());

    // Loop detection scans the 5 bytes at header-9 for a jump opcode
    data[0xF7] = 0xB2;
    data[0xF8..0xFC].copy_from_slice(&0x0800_0200u32.to_le_bytes());

    // Track: short rest then jump back to its own start
    let track = [0x81, 0xB2, 0x00, 0x02, 0x00, 0x08];
    data[0x200..0x200 + track.len()].copy_from_slice(&track);

    let rom = Rom::new(data);
    let ripper = SongRipper::new(&rom, 0x100, SongOptions::default()).unwrap();
    let (midi, summary) = ripper.rip();
    let bytes = midi.to_bytes();

    assert!(summary.looped);
    assert!(find_subsequence(&bytes, b"loopStart").is_some());
    assert!(find_subsequence(&bytes, b"loopEnd").is_some());
}

#[test]
fn test_soundfont_rip_to_sf2_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bank.sf2");

    let rom = demo_rom();
    let assets = SynthAssets::default();
    let mut ripper = SoundFontRipper::new(&rom, &assets, RipperOptions::default());
    ripper.add_address(0x40);
    // Second address right after the 8 bank slots limits the first bank
    ripper.add_address(0x40 + 12 * 8);
    ripper.rip().write(&path).expect("write failed");

    let bytes = std::fs::read(&path).expect("read back failed");

    // RIFF framing with a correct total size
    assert_eq!(&bytes[..4], b"RIFF");
    assert_eq!(&bytes[8..12], b"sfbk");
    assert_eq!(bytes.len() as u32, u32_at(&bytes, 4) + 8);

    // Version record and the fixed info strings
    assert!(find_subsequence(&bytes, b"ifil").is_some());
    assert!(find_subsequence(&bytes, b"EMU8000").is_some());
    assert!(find_subsequence(&bytes, b"Dumped with sappyrip v0.1").is_some());

    // All nine hydra sub-chunks are present in order
    let pdta = find_subsequence(&bytes, b"pdta").expect("pdta list");
    let mut last = pdta;
    for tag in [
        b"phdr".as_ref(),
        b"pbag".as_ref(),
        b"pmod".as_ref(),
        b"pgen".as_ref(),
        b"inst".as_ref(),
        b"ibag".as_ref(),
        b"imod".as_ref(),
        b"igen".as_ref(),
        b"shdr".as_ref(),
    ] {
        let pos = find_subsequence(&bytes[last..], tag).expect("hydra sub-chunk");
        last += pos;
    }

    // Voice record names and terminal records
    assert!(find_subsequence(&bytes, b"Type 0 @0x40").is_some());
    assert!(find_subsequence(&bytes, b"sample @0x300").is_some());
    assert!(find_subsequence(&bytes, b"Sample @0x300").is_some());
    assert!(find_subsequence(&bytes, b"EOS").is_some());
    assert!(find_subsequence(&bytes, b"EOI").is_some());
    assert!(find_subsequence(&bytes, b"EOP").is_some());
}

#[test]
fn test_song_bank_pointer_feeds_soundfont_rip() {
    // The bank referenced by the song header can be dumped directly
    let rom = demo_rom();
    let ripper = SongRipper::new(&rom, 0x100, SongOptions::default()).unwrap();
    let (_, summary) = ripper.rip();

    let assets = SynthAssets::default();
    let mut sf_ripper = SoundFontRipper::new(&rom, &assets, RipperOptions::default());
    sf_ripper.add_address(summary.bank_pointer);
    sf_ripper.add_address(summary.bank_pointer + 12 * 8);
    let sf2 = sf_ripper.rip();
    assert_eq!(sf2.instrument_count(), 1);
    assert_eq!(sf2.sample_count(), 1);
}

#[test]
fn test_bank_inspection_as_json() {
    let rom = demo_rom();
    let summary = sappyrip::inspect::inspect_bank(&rom, 0x40, 2).unwrap();
    let json = serde_json::to_value(&summary).unwrap();

    assert_eq!(json["address"], 0x40);
    assert_eq!(json["slots"][0]["kind"], "sampled");
    assert_eq!(json["slots"][0]["sample"]["pitch"], 22050);
    assert_eq!(json["slots"][0]["sample"]["loop_kind"], "forward");
    assert_eq!(json["slots"][1]["kind"], "unused");
}
