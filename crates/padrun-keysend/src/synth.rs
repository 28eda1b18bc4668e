use thiserror::Error;

use crate::key::ScanCode;

/// The OS input facility refused a synthesized event. Non-fatal; callers log
/// and keep going.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("key event rejected (scan code {scan_code:#06x}, down={down})")]
pub struct SendError {
    pub scan_code: ScanCode,
    pub down: bool,
}

/// Scan-code level keyboard event synthesis.
pub trait KeySynth {
    fn send(&mut self, scan_code: ScanCode, down: bool) -> Result<(), SendError>;
}

/// Answers "does this pid own the foreground window right now".
pub trait ForegroundProbe {
    fn is_foreground(&self, pid: u32) -> bool;
}

/// Discards every event. Stands in for the real backend on platforms
/// without one.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSynth;

impl KeySynth for NoopSynth {
    fn send(&mut self, _scan_code: ScanCode, _down: bool) -> Result<(), SendError> {
        Ok(())
    }
}

/// Probe that never reports the game foreground, keeping injection off.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProbe;

impl ForegroundProbe for NoopProbe {
    fn is_foreground(&self, _pid: u32) -> bool {
        false
    }
}
