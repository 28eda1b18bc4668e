mod key;
mod synth;

#[cfg(windows)]
mod windows;

pub use crate::key::{Key, ParseKeyError, ScanCode, ALL_KEYS};
pub use crate::synth::{
    ForegroundProbe, KeySynth, NoopProbe, NoopSynth, SendError,
};

#[cfg(windows)]
pub use crate::windows::{SendInputSynth, WinForegroundProbe};
