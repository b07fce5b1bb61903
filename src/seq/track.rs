//! Per-track decoder state

/// Mutable state for one sequence track.
///
/// The engine compresses streams two ways: a data byte in command position
/// repeats the previous command (`last_cmd`), and note events may omit key
/// and velocity bytes (`last_key` / `last_vel`).
#[derive(Debug, Clone)]
pub struct TrackCursor {
    /// Current position in the ROM, 0 once the track has ended
    pub ptr: u32,
    /// Last command byte with the high bit set
    pub last_cmd: u8,
    /// Cached note key for argument elision
    pub last_key: u8,
    /// Cached velocity for argument elision
    pub last_vel: u8,
    /// Ticks left to wait before the next event
    pub counter: i32,
    /// Saved position for the call/return pair
    pub return_ptr: u32,
    /// A return address is pending
    pub return_flag: bool,
    /// Added to every note key
    pub key_shift: i32,
    /// Terminal state reached (end-of-track or jump)
    pub completed: bool,

    // Vibrato simulation state
    pub lfo_delay_ctr: i32,
    pub lfo_delay: i32,
    pub lfo_depth: i32,
    pub lfo_type: i32,
    /// An LFO start signal has been sent and needs a matching stop
    pub lfo_flag: bool,
    /// Suppresses spurious modulation events before the first depth command
    pub lfo_hack: bool,
}

impl TrackCursor {
    pub fn new(ptr: u32) -> Self {
        Self {
            ptr,
            last_cmd: 0,
            last_key: 0,
            last_vel: 0,
            counter: 0,
            return_ptr: 0,
            return_flag: false,
            key_shift: 0,
            completed: false,
            lfo_delay_ctr: 0,
            lfo_delay: 0,
            lfo_depth: 0,
            lfo_type: 0,
            lfo_flag: false,
            lfo_hack: false,
        }
    }
}

/// A note currently held by some track.
///
/// A negative counter means the note sustains until an explicit key-off
/// event; it is dropped from the active list right after its key-on is
/// emitted since no countdown applies.
#[derive(Debug, Clone)]
pub struct SoundingNote {
    /// Remaining duration in ticks, negative for indefinite
    pub counter: i32,
    pub key: u8,
    pub vel: u8,
    /// Owning track
    pub chn: u8,
    /// Key-on event already written
    pub event_made: bool,
}
