//! Types lifted straight from the SoundFont 2.1 specification

/// Generator operators, SF2 v2.1 spec page 38
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum SfGenerator {
    Null = 0,
    ModLfoToPitch = 5,
    VibLfoToPitch = 6,
    InitialFilterFc = 8,
    Pan = 17,
    DelayVolEnv = 33,
    AttackVolEnv = 34,
    HoldVolEnv = 35,
    DecayVolEnv = 36,
    SustainVolEnv = 37,
    ReleaseVolEnv = 38,
    Instrument = 41,
    KeyRange = 43,
    VelRange = 44,
    InitialAttenuation = 48,
    CoarseTune = 51,
    FineTune = 52,
    SampleId = 53,
    SampleModes = 54,
    ScaleTuning = 56,
    ExclusiveClass = 57,
    OverridingRootKey = 58,
}

/// Two bytes holding either a 16-bit amount or a lo/hi range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenAmount {
    Value(u16),
    Range(u8, u8),
}

impl GenAmount {
    pub fn to_le_bytes(self) -> [u8; 2] {
        match self {
            GenAmount::Value(v) => v.to_le_bytes(),
            GenAmount::Range(lo, hi) => [lo, hi],
        }
    }
}

impl From<u16> for GenAmount {
    fn from(value: u16) -> Self {
        GenAmount::Value(value)
    }
}

/// Source encodings a sample can arrive in. Not part of the SF2 spec; these
/// describe the cartridge-side formats that get decoded to 16-bit PCM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleType {
    Unsigned8,
    Signed8,
    Signed16,
    /// 32-nibble chip waveform, expanded through a 16-entry level table
    GameboyCh3,
    /// 4-bit delta-compressed blocks (1 seed byte + 32 nibble bytes)
    Bdpcm,
}
