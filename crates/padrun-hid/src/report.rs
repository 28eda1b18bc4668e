use std::mem;

use smallvec::SmallVec;

use crate::caps::DeviceCaps;

/// Hat mask with no direction held.
pub const HAT_IDLE: u16 = 0;
/// Up bit of the normalized hat mask.
pub const HAT_UP: u16 = 0x1;
/// Right bit of the normalized hat mask.
pub const HAT_RIGHT: u16 = 0x2;
/// Down bit of the normalized hat mask.
pub const HAT_DOWN: u16 = 0x4;
/// Left bit of the normalized hat mask.
pub const HAT_LEFT: u16 = 0x8;

/// Normalizes a raw hat-switch value into a 4-bit Up/Right/Down/Left mask.
///
/// Raw values outside the declared logical range (including the common idle
/// sentinels such as 8 or 15 on zero-based devices) decode as idle. In-range
/// values are shifted to a one-based clockwise position starting at Up;
/// positions adjacent to a cardinal direction set that direction's bit, so
/// diagonals set two bits.
pub fn normalize_hat(raw: u32, min: i32, max: i32) -> u16 {
    let raw = i64::from(raw);
    if min > max || raw < i64::from(min) || raw > i64::from(max) {
        return HAT_IDLE;
    }
    let pos = raw - i64::from(min) + 1; // 1..=8, Up first, clockwise
    let mut mask = HAT_IDLE;
    if matches!(pos, 8 | 1 | 2) {
        mask |= HAT_UP;
    }
    if matches!(pos, 2 | 3 | 4) {
        mask |= HAT_RIGHT;
    }
    if matches!(pos, 4 | 5 | 6) {
        mask |= HAT_DOWN;
    }
    if matches!(pos, 6 | 7 | 8) {
        mask |= HAT_LEFT;
    }
    mask
}

/// Word-packed pressed-button bitset sized to the device's button count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonStates {
    words: Vec<u64>,
    len: u16,
}

impl ButtonStates {
    pub fn new(len: u16) -> Self {
        let words = vec![0u64; (usize::from(len) + 63) / 64];
        Self { words, len }
    }

    pub fn len(&self) -> u16 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: u16) -> bool {
        debug_assert!(index < self.len);
        let i = usize::from(index);
        self.words[i / 64] & (1u64 << (i % 64)) != 0
    }

    pub fn set(&mut self, index: u16, pressed: bool) {
        debug_assert!(index < self.len);
        let i = usize::from(index);
        if pressed {
            self.words[i / 64] |= 1u64 << (i % 64);
        } else {
            self.words[i / 64] &= !(1u64 << (i % 64));
        }
    }

    pub fn clear_all(&mut self) {
        self.words.fill(0);
    }

    pub fn copy_from(&mut self, other: &ButtonStates) {
        self.words.resize(other.words.len(), 0);
        self.words.copy_from_slice(&other.words);
        self.len = other.len;
    }
}

/// One decoded state snapshot handed over by a [`ReportSource`].
///
/// `usages` holds the absolute usage codes of every currently pressed button.
/// `hat_raw` is `None` when the report carries no hat value.
///
/// [`ReportSource`]: crate::ReportSource
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub hat_raw: Option<u32>,
    pub usages: SmallVec<[u16; 32]>,
}

/// One button transition inside a [`ChangeReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonChange {
    /// Zero-based physical button index.
    pub index: u16,
    pub pressed: bool,
}

/// Deltas of one poll: changed buttons plus the hat transition.
///
/// Reused across polls by the decoder; subscribers receive owned clones.
#[derive(Debug, Clone, Default)]
pub struct ChangeReport {
    pub changes: SmallVec<[ButtonChange; 32]>,
    pub prev_hat: u16,
    pub hat: u16,
}

impl ChangeReport {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.prev_hat == self.hat
    }
}

/// Stateful diff engine turning raw frames into [`ChangeReport`]s.
///
/// Keeps the authoritative pressed-set and a scratch twin; on a detected
/// difference the two are swapped rather than copied.
#[derive(Debug)]
pub struct FrameDecoder {
    usage_min: u16,
    hat_min: i32,
    hat_max: i32,
    states: ButtonStates,
    scratch: ButtonStates,
    hat: u16,
}

impl FrameDecoder {
    pub fn new(caps: &DeviceCaps) -> Self {
        let count = caps.button_count();
        Self {
            usage_min: caps.usage_min,
            hat_min: caps.hat_min,
            hat_max: caps.hat_max,
            states: ButtonStates::new(count),
            scratch: ButtonStates::new(count),
            hat: HAT_IDLE,
        }
    }

    /// Authoritative pressed-set after the last applied frame.
    pub fn states(&self) -> &ButtonStates {
        &self.states
    }

    /// Normalized hat mask after the last applied frame.
    pub fn hat(&self) -> u16 {
        self.hat
    }

    /// Diffs `frame` against the previous state and fills `out`.
    ///
    /// Returns `true` when anything changed and the report should be
    /// dispatched. Replaying an identical frame yields `false` and an empty
    /// report.
    pub fn apply(&mut self, frame: &Frame, out: &mut ChangeReport) -> bool {
        out.changes.clear();
        let mut raise = false;
        let count = self.states.len();

        if frame.usages.is_empty() {
            // Nothing held: everything previously pressed is now released.
            for i in 0..count {
                if self.states.get(i) {
                    out.changes.push(ButtonChange { index: i, pressed: false });
                    raise = true;
                }
            }
            if raise {
                self.states.clear_all();
            }
        } else {
            self.scratch.clear_all();
            for &usage in &frame.usages {
                let Some(index) = usage.checked_sub(self.usage_min) else {
                    continue;
                };
                if index < count {
                    self.scratch.set(index, true);
                }
            }
            for i in 0..count {
                let now = self.scratch.get(i);
                if now != self.states.get(i) {
                    out.changes.push(ButtonChange { index: i, pressed: now });
                    raise = true;
                }
            }
            if raise {
                mem::swap(&mut self.states, &mut self.scratch);
            }
        }

        let hat = match frame.hat_raw {
            Some(raw) => normalize_hat(raw, self.hat_min, self.hat_max),
            None => HAT_IDLE,
        };
        out.prev_hat = self.hat;
        out.hat = hat;
        raise |= hat != self.hat;
        self.hat = hat;
        raise
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps() -> DeviceCaps {
        DeviceCaps {
            usage_min: 1,
            usage_max: 17,
            hat_min: 0,
            hat_max: 7,
            report_len: 16,
        }
    }

    fn frame(usages: &[u16], hat_raw: Option<u32>) -> Frame {
        Frame { hat_raw, usages: usages.iter().copied().collect() }
    }

    #[test]
    fn hat_idle_and_out_of_range_decode_to_zero() {
        assert_eq!(normalize_hat(8, 0, 7), HAT_IDLE);
        assert_eq!(normalize_hat(15, 0, 7), HAT_IDLE);
        assert_eq!(normalize_hat(255, 0, 7), HAT_IDLE);
        assert_eq!(normalize_hat(0, 1, 8), HAT_IDLE);
        // no hat declared
        assert_eq!(normalize_hat(3, 0, -1), HAT_IDLE);
    }

    #[test]
    fn hat_eight_positions_map_to_documented_masks() {
        let expected = [
            HAT_UP,
            HAT_UP | HAT_RIGHT,
            HAT_RIGHT,
            HAT_RIGHT | HAT_DOWN,
            HAT_DOWN,
            HAT_DOWN | HAT_LEFT,
            HAT_LEFT,
            HAT_LEFT | HAT_UP,
        ];
        for (raw, want) in expected.iter().enumerate() {
            assert_eq!(normalize_hat(raw as u32, 0, 7), *want, "raw {raw}");
            // one-based devices shift but decode identically
            assert_eq!(normalize_hat(raw as u32 + 1, 1, 8), *want, "raw {raw} (one-based)");
        }
    }

    #[test]
    fn press_and_release_produce_exact_deltas() {
        let mut dec = FrameDecoder::new(&caps());
        let mut out = ChangeReport::default();

        assert!(dec.apply(&frame(&[1, 3], None), &mut out));
        assert_eq!(
            out.changes.as_slice(),
            &[
                ButtonChange { index: 0, pressed: true },
                ButtonChange { index: 2, pressed: true },
            ]
        );

        // button 3 released, button 5 pressed
        assert!(dec.apply(&frame(&[1, 5], None), &mut out));
        assert_eq!(
            out.changes.as_slice(),
            &[
                ButtonChange { index: 2, pressed: false },
                ButtonChange { index: 4, pressed: true },
            ]
        );
    }

    #[test]
    fn replaying_a_frame_is_idempotent() {
        let mut dec = FrameDecoder::new(&caps());
        let mut out = ChangeReport::default();

        assert!(dec.apply(&frame(&[2, 4], Some(0)), &mut out));
        assert!(!dec.apply(&frame(&[2, 4], Some(0)), &mut out));
        assert!(out.changes.is_empty());
        assert_eq!(out.prev_hat, out.hat);
    }

    #[test]
    fn empty_usage_list_releases_everything() {
        let mut dec = FrameDecoder::new(&caps());
        let mut out = ChangeReport::default();

        dec.apply(&frame(&[1, 2, 17], None), &mut out);
        assert!(dec.apply(&frame(&[], None), &mut out));
        assert_eq!(
            out.changes.as_slice(),
            &[
                ButtonChange { index: 0, pressed: false },
                ButtonChange { index: 1, pressed: false },
                ButtonChange { index: 16, pressed: false },
            ]
        );
        assert!(!dec.states().get(0));
    }

    #[test]
    fn hat_change_alone_raises_with_previous_value() {
        let mut dec = FrameDecoder::new(&caps());
        let mut out = ChangeReport::default();

        assert!(dec.apply(&frame(&[], Some(1)), &mut out));
        assert!(out.changes.is_empty());
        assert_eq!(out.prev_hat, HAT_IDLE);
        assert_eq!(out.hat, HAT_UP | HAT_RIGHT);

        assert!(dec.apply(&frame(&[], Some(8)), &mut out));
        assert_eq!(out.prev_hat, HAT_UP | HAT_RIGHT);
        assert_eq!(out.hat, HAT_IDLE);
    }

    #[test]
    fn usages_outside_declared_range_are_ignored() {
        let mut dec = FrameDecoder::new(&caps());
        let mut out = ChangeReport::default();

        assert!(!dec.apply(&frame(&[0, 18, 200], None), &mut out));
        assert!(out.changes.is_empty());
    }
}
