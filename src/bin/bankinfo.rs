//! Sound bank to JSON inspector

use clap::Parser;
use sappyrip::inspect::inspect_bank;
use sappyrip::rom::Rom;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bankinfo")]
#[command(version = "0.1.0")]
#[command(about = "Dump GBA sound bank contents as JSON", long_about = None)]
struct Args {
    /// Input GBA ROM file
    rom: PathBuf,

    /// Sound bank addresses (hexadecimal with 0x prefix, or decimal)
    #[arg(required = true)]
    addresses: Vec<String>,

    /// Number of voice records to read per bank
    #[arg(short, long, default_value_t = 128)]
    ninstr: u32,

    /// Output JSON file (writes to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output compact JSON (default is pretty-printed)
    #[arg(short, long)]
    compact: bool,
}

fn parse_address(s: &str) -> Result<u32, std::num::ParseIntError> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let rom = Rom::open(&args.rom)?;

    let mut summaries = Vec::new();
    for addr in &args.addresses {
        let address = parse_address(addr)?;
        summaries.push(inspect_bank(&rom, address, args.ninstr)?);
    }

    let json_string = if args.compact {
        serde_json::to_string(&summaries)?
    } else {
        serde_json::to_string_pretty(&summaries)?
    };

    match args.output {
        Some(path) => {
            let mut file = File::create(path)?;
            file.write_all(json_string.as_bytes())?;
            file.write_all(b"\n")?;
        }
        None => {
            println!("{}", json_string);
        }
    }

    Ok(())
}
