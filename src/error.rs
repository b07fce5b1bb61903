use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("read past end of data at 0x{0:x}")]
    OutOfRange(u32),

    #[error("invalid sample at 0x{addr:x}: {reason}")]
    Sample { addr: u32, reason: String },

    #[error("invalid instrument: {0}")]
    Instrument(String),

    #[error("{0} data not loaded")]
    MissingAsset(&'static str),

    #[error("invalid track count {0} (must be 1-16)")]
    TrackCount(u8),

    #[error("song table at 0x{0:x} is past the end of the ROM")]
    SongTable(u32),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
