use clap::{Parser, Subcommand};
use sappyrip::bank::{RipperOptions, SoundFontRipper};
use sappyrip::rom::{Rom, SynthAssets};
use sappyrip::seq::{SongOptions, SongRipper};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "sappyrip")]
#[command(version = "0.1.0")]
#[command(about = "Rip music and instruments from GBA sappy engine games", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rip a single song to MIDI
    Song {
        /// Input GBA ROM file
        rom: PathBuf,
        /// Output MIDI file
        output: PathBuf,
        /// Address of the song header (hexadecimal with 0x prefix, or decimal)
        address: String,

        /// Emit a bank select with this number before each program change
        #[arg(short, long)]
        bank: Option<u16>,
        /// Emit a GS reset at the start of the output
        #[arg(long)]
        gs: bool,
        /// Emit an XG reset instead of GS
        #[arg(long)]
        xg: bool,
        /// Rearrange channels so the percussion channel is avoided
        #[arg(long)]
        rc: bool,
        /// Keep volumes, velocities and vibrato exactly as encoded
        #[arg(long)]
        raw: bool,
    },

    /// Dump one or more sound banks to a SoundFont
    Soundfont {
        /// Input GBA ROM file
        rom: PathBuf,
        /// Output SF2 file
        output: PathBuf,
        /// Sound bank addresses, in increasing order
        #[arg(required = true)]
        addresses: Vec<String>,

        /// Sampling rate for sampled voices
        #[arg(short, long, default_value_t = 22050)]
        sample_rate: u32,
        /// Main volume for sampled voices, 1-15
        #[arg(short, long, default_value_t = 15)]
        main_volume: u32,
        /// Give General MIDI names to presets
        #[arg(long)]
        gm: bool,
        /// Directory holding psg_data.raw and goldensun_synth.raw
        #[arg(long)]
        assets: Option<PathBuf>,
    },

    /// Rip every song and every sound bank reachable from a song table
    Rip {
        /// Input GBA ROM file
        rom: PathBuf,
        /// Address of the song table
        address: String,

        /// Output directory (defaults to the ROM name without extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Give General MIDI names to presets
        #[arg(long)]
        gm: bool,
        /// Output XG instead of GS resets in the MIDIs
        #[arg(long)]
        xg: bool,
        /// Rearrange channels so the percussion channel is avoided
        #[arg(long)]
        rc: bool,
        /// Put every sound bank in its own .sf2 file and sub-folder
        #[arg(long)]
        sb: bool,
        /// Keep volumes, velocities and vibrato exactly as encoded
        #[arg(long)]
        raw: bool,
        /// Sampling rate for sampled voices
        #[arg(short, long, default_value_t = 22050)]
        sample_rate: u32,
        /// Main volume for sampled voices, 1-15
        #[arg(short, long, default_value_t = 15)]
        main_volume: u32,
        /// Directory holding psg_data.raw and goldensun_synth.raw
        #[arg(long)]
        assets: Option<PathBuf>,
    },
}

fn parse_address(s: &str) -> Result<u32, std::num::ParseIntError> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    }
}

/// Load the chip recordings, looking next to the executable unless a
/// directory was given
fn load_assets(dir: Option<PathBuf>) -> SynthAssets {
    let dir = dir
        .or_else(|| {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(Path::to_path_buf))
        })
        .unwrap_or_else(|| PathBuf::from("."));
    let assets = SynthAssets::load_from(&dir);
    if assets.psg.is_none() {
        println!("psg_data.raw file not found ! PSG instruments can't be dumped.");
    }
    if assets.synth_waves.is_none() {
        println!("goldensun_synth.raw file not found ! Synth instruments can't be dumped.");
    }
    assets
}

/// Entries in the song table: a GBA pointer plus a discarded sound group word
const SONG_TBL_STRIDE: u32 = 8;

/// Collect song pointers from the table, converted to ROM offsets.
/// Returns the songs and the table's end offset (unused slots point there).
fn parse_song_table(rom: &Rom, mut table_ptr: u32) -> Result<(Vec<u32>, u32), sappyrip::Error> {
    if table_ptr as usize >= rom.len() {
        return Err(sappyrip::Error::SongTable(table_ptr));
    }

    // Some games pad the start of the table with zero entries
    while rom.u32(table_ptr)? == 0 {
        table_ptr += 4;
    }

    let mut songs = Vec::new();
    let mut ptr = table_ptr;
    loop {
        let raw = match rom.u32(ptr) {
            Ok(v) => v,
            Err(_) => break,
        };
        let song = raw.wrapping_sub(0x0800_0000);
        // The table ends at the first entry that is not a valid pointer
        if song == 0 || song as usize >= rom.len() {
            break;
        }
        songs.push(song);
        ptr += SONG_TBL_STRIDE;
    }

    let end = table_ptr + SONG_TBL_STRIDE * songs.len() as u32;
    Ok((songs, end))
}

fn song_options(bank: Option<u16>, rc: bool, gs: bool, xg: bool, raw: bool) -> SongOptions {
    SongOptions {
        bank,
        rc,
        gs,
        xg,
        lv: !raw,
        sv: !raw,
    }
}

fn rip_song(rom: &Rom, address: u32, output: &Path, opts: SongOptions) -> Result<(), sappyrip::Error> {
    let ripper = SongRipper::new(rom, address, opts)?;
    let (midi, summary) = ripper.rip();
    midi.write(output)?;
    println!("Maximum simultaneous notes : {}", summary.max_notes);
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    match args.command {
        Command::Song {
            rom,
            output,
            address,
            bank,
            gs,
            xg,
            rc,
            raw,
        } => {
            let rom = Rom::open(&rom)?;
            let address = parse_address(&address)?;
            rip_song(&rom, address, &output, song_options(bank, rc, gs, xg, raw))?;
        }

        Command::Soundfont {
            rom,
            output,
            addresses,
            sample_rate,
            main_volume,
            gm,
            assets,
        } => {
            let rom = Rom::open(&rom)?;
            let assets = load_assets(assets);
            let opts = RipperOptions {
                sample_rate,
                main_volume,
                gm_preset_names: gm,
            };
            let mut ripper = SoundFontRipper::new(&rom, &assets, opts);
            for addr in &addresses {
                ripper.add_address(parse_address(addr)?);
            }
            println!("Dumping {} sound bank(s)...", ripper.bank_count());
            ripper.rip().write(&output)?;
        }

        Command::Rip {
            rom: rom_path,
            address,
            output,
            gm,
            xg,
            rc,
            sb,
            raw,
            sample_rate,
            main_volume,
            assets,
        } => {
            let rom = Rom::open(&rom_path)?;
            let assets = load_assets(assets);

            // Output directory named after the ROM by default
            let stem = rom_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "rip".to_string());
            let out_dir = output.unwrap_or_else(|| PathBuf::from(&stem));
            fs::create_dir_all(&out_dir)?;

            println!("Parsing song table...");
            let (songs, table_end) = parse_song_table(&rom, parse_address(&address)?)?;

            println!("Collecting sound bank list...");
            let mut bank_set: BTreeSet<u32> = BTreeSet::new();
            let mut song_banks: Vec<Option<u32>> = Vec::with_capacity(songs.len());
            for &song in &songs {
                // Unused songs point at the end of the table
                if song == table_end {
                    song_banks.push(None);
                    continue;
                }
                match rom.u32(song + 4) {
                    Ok(p) => {
                        let bank = p.wrapping_sub(0x0800_0000);
                        bank_set.insert(bank);
                        song_banks.push(Some(bank));
                    }
                    Err(_) => song_banks.push(None),
                }
            }
            let bank_list: Vec<u32> = bank_set.iter().copied().collect();

            if sb {
                for i in 0..bank_list.len() {
                    fs::create_dir_all(out_dir.join(format!("soundbank_{i:03}")))?;
                }
            }

            for (i, &song) in songs.iter().enumerate() {
                let Some(bank) = song_banks[i] else { continue };
                let bank_index = bank_list.iter().position(|&b| b == bank).unwrap_or(0);

                let midi_path = if sb {
                    out_dir
                        .join(format!("soundbank_{bank_index:03}"))
                        .join(format!("song{i:03}.mid"))
                } else {
                    out_dir.join(format!("song{i:03}.mid"))
                };

                // Bank select only makes sense with a combined soundfont
                let bank_opt = if sb { None } else { Some(bank_index as u16) };
                // Channel reordering replaces the reset sysex entirely
                let opts = song_options(bank_opt, rc, !rc && !xg, !rc && xg, raw);
                println!("Song {i}");
                if let Err(e) = rip_song(&rom, song, &midi_path, opts) {
                    eprintln!("An error has occured: {e}");
                }
            }

            let opts = RipperOptions {
                sample_rate,
                main_volume,
                gm_preset_names: gm,
            };

            if sb {
                for (i, &bank) in bank_list.iter().enumerate() {
                    let mut ripper = SoundFontRipper::new(&rom, &assets, opts.clone());
                    ripper.add_address(bank);
                    let path = out_dir
                        .join(format!("soundbank_{i:03}"))
                        .join(format!("soundbank_{i:03}.sf2"));
                    ripper.rip().write(&path)?;
                }
            } else {
                let mut ripper = SoundFontRipper::new(&rom, &assets, opts);
                for &bank in &bank_list {
                    ripper.add_address(bank);
                }
                ripper.rip().write(&out_dir.join(format!("{stem}.sf2")))?;
            }
            println!("Rip completed !");
        }
    }

    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error : {e}");
        std::process::exit(1);
    }
}
