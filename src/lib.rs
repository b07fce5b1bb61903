pub mod bank;
pub mod error;
pub mod inspect;
pub mod midi;
pub mod rom;
pub mod seq;
pub mod sf2;

pub use bank::SoundFontRipper;
pub use error::Error;
pub use seq::SongRipper;
