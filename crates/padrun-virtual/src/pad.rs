use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use smallvec::SmallVec;

use padrun_hid::{ChangeReport, HAT_DOWN, HAT_LEFT, HAT_RIGHT, HAT_UP};

use crate::button::VirtualButton;

/// Delay before the auto-released "up" of a tapped modifier, chosen so a
/// downstream consumer that only reacts to discrete presses still sees a
/// complete tap.
pub const MODIFIER_TAP_RELEASE: Duration = Duration::from_millis(30);

/// Physical button index to virtual identity table, sized to the device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PadMap {
    slots: Vec<Option<VirtualButton>>,
}

impl PadMap {
    pub fn new(slots: Vec<Option<VirtualButton>>) -> Self {
        Self { slots }
    }

    pub fn get(&self, index: u16) -> Option<VirtualButton> {
        self.slots.get(usize::from(index)).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// One virtual button transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualChange {
    pub button: VirtualButton,
    pub pressed: bool,
}

/// Batch of virtual transitions derived from one physical notification.
/// Button-derived entries always precede hat-derived entries.
#[derive(Debug, Clone, Default)]
pub struct VirtualReport {
    pub changes: SmallVec<[VirtualChange; 8]>,
}

impl VirtualReport {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Shift-aware translator from physical change reports to virtual batches.
///
/// Owns the virtual state vector and the two shift-consumed flags. Deferred
/// modifier releases travel through the channel returned by
/// [`deferred_events`] so the caller's event loop delivers them on the same
/// serialized context as ordinary reports.
///
/// [`deferred_events`]: VirtualPad::deferred_events
pub struct VirtualPad {
    map: PadMap,
    state: u64,
    start_consumed: bool,
    menu_consumed: bool,
    deferred_tx: Sender<VirtualChange>,
    deferred_rx: Receiver<VirtualChange>,
}

impl VirtualPad {
    pub fn new(map: PadMap) -> Self {
        let (deferred_tx, deferred_rx) = unbounded();
        Self {
            map,
            state: 0,
            start_consumed: false,
            menu_consumed: false,
            deferred_tx,
            deferred_rx,
        }
    }

    /// Channel carrying timer-delayed modifier releases. Feed received
    /// changes back through [`apply_deferred`].
    ///
    /// [`apply_deferred`]: VirtualPad::apply_deferred
    pub fn deferred_events(&self) -> Receiver<VirtualChange> {
        self.deferred_rx.clone()
    }

    pub fn is_pressed(&self, button: VirtualButton) -> bool {
        self.state & (1u64 << button.index()) != 0
    }

    fn set_state(&mut self, button: VirtualButton, pressed: bool) {
        if pressed {
            self.state |= 1u64 << button.index();
        } else {
            self.state &= !(1u64 << button.index());
        }
    }

    /// Translates one physical change report. Returns `true` when `out`
    /// carries at least one virtual transition and should be dispatched.
    pub fn process(&mut self, report: &ChangeReport, out: &mut VirtualReport) -> bool {
        out.changes.clear();

        for change in &report.changes {
            let Some(button) = self.map.get(change.index) else {
                continue;
            };
            self.set_state(button, change.pressed);
            match button {
                VirtualButton::Start => {
                    self.process_modifier(button, change.pressed, true, out);
                }
                VirtualButton::Menu => {
                    self.process_modifier(button, change.pressed, false, out);
                }
                other => self.process_plain(other, change.pressed, out),
            }
        }

        if report.hat != report.prev_hat {
            for (bit, button) in [
                (HAT_UP, VirtualButton::HatUp),
                (HAT_RIGHT, VirtualButton::HatRight),
                (HAT_DOWN, VirtualButton::HatDown),
                (HAT_LEFT, VirtualButton::HatLeft),
            ] {
                let now = report.hat & bit != 0;
                let was = report.prev_hat & bit != 0;
                if now != was {
                    self.set_state(button, now);
                    out.changes.push(VirtualChange { button, pressed: now });
                }
            }
        }

        !out.changes.is_empty()
    }

    /// Applies a change received from [`deferred_events`] and fills `out`
    /// with the single resulting transition.
    ///
    /// [`deferred_events`]: VirtualPad::deferred_events
    pub fn apply_deferred(&mut self, change: VirtualChange, out: &mut VirtualReport) {
        out.changes.clear();
        self.set_state(change.button, change.pressed);
        out.changes.push(change);
    }

    /// A tap of a bare modifier must still read as a complete click
    /// downstream, while a hold that shifted another button must not.
    fn process_modifier(
        &mut self,
        button: VirtualButton,
        pressed: bool,
        is_start: bool,
        out: &mut VirtualReport,
    ) {
        if pressed {
            out.changes.push(VirtualChange { button, pressed: true });
            return;
        }
        let consumed = if is_start {
            std::mem::replace(&mut self.start_consumed, false)
        } else {
            std::mem::replace(&mut self.menu_consumed, false)
        };
        if consumed {
            return;
        }
        let tx = self.deferred_tx.clone();
        std::thread::spawn(move || {
            std::thread::sleep(MODIFIER_TAP_RELEASE);
            let _ = tx.send(VirtualChange { button, pressed: false });
        });
    }

    fn process_plain(
        &mut self,
        button: VirtualButton,
        pressed: bool,
        out: &mut VirtualReport,
    ) {
        let Some((start_shifted, menu_shifted)) = button.shifted() else {
            out.changes.push(VirtualChange { button, pressed });
            return;
        };

        // Release routes by "is the shifted identity active", not by
        // re-checking the modifier, so a press that resolved shifted always
        // releases shifted even if the modifier went up first.
        if (self.is_pressed(VirtualButton::Start) && pressed)
            || (self.is_pressed(start_shifted) && !pressed)
        {
            if pressed {
                self.start_consumed = true;
            }
            self.set_state(start_shifted, pressed);
            out.changes.push(VirtualChange { button: start_shifted, pressed });
        } else if (self.is_pressed(VirtualButton::Menu) && pressed)
            || (self.is_pressed(menu_shifted) && !pressed)
        {
            if pressed {
                self.menu_consumed = true;
            }
            self.set_state(menu_shifted, pressed);
            out.changes.push(VirtualChange { button: menu_shifted, pressed });
        } else {
            out.changes.push(VirtualChange { button, pressed });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use padrun_hid::{ButtonChange, HAT_IDLE};
    use crate::button::VirtualButton::*;

    fn default_map() -> PadMap {
        PadMap::new(
            [X, A, B, Y, L1, R1, L2, R2, Start, Menu, L3, R3]
                .into_iter()
                .map(Some)
                .collect(),
        )
    }

    fn report(changes: &[(u16, bool)], prev_hat: u16, hat: u16) -> ChangeReport {
        ChangeReport {
            changes: changes
                .iter()
                .map(|&(index, pressed)| ButtonChange { index, pressed })
                .collect(),
            prev_hat,
            hat,
        }
    }

    fn press(pad: &mut VirtualPad, index: u16) -> Vec<VirtualChange> {
        let mut out = VirtualReport::default();
        pad.process(&report(&[(index, true)], HAT_IDLE, HAT_IDLE), &mut out);
        out.changes.to_vec()
    }

    fn release(pad: &mut VirtualPad, index: u16) -> Vec<VirtualChange> {
        let mut out = VirtualReport::default();
        pad.process(&report(&[(index, false)], HAT_IDLE, HAT_IDLE), &mut out);
        out.changes.to_vec()
    }

    #[test]
    fn hold_modifier_shifts_press_and_release() {
        let mut pad = VirtualPad::new(default_map());

        assert_eq!(
            press(&mut pad, 8),
            vec![VirtualChange { button: Start, pressed: true }]
        );
        assert_eq!(
            press(&mut pad, 1),
            vec![VirtualChange { button: StartShiftedA, pressed: true }]
        );
        assert_eq!(
            release(&mut pad, 1),
            vec![VirtualChange { button: StartShiftedA, pressed: false }]
        );
        // consumed: the modifier release emits nothing
        assert_eq!(release(&mut pad, 8), vec![]);
        assert!(pad.deferred_events().is_empty());
    }

    #[test]
    fn tapped_modifier_defers_its_release() {
        let mut pad = VirtualPad::new(default_map());
        let deferred = pad.deferred_events();

        assert_eq!(
            press(&mut pad, 8),
            vec![VirtualChange { button: Start, pressed: true }]
        );
        assert_eq!(release(&mut pad, 8), vec![]);

        let change = deferred
            .recv_timeout(MODIFIER_TAP_RELEASE * 20)
            .expect("deferred release");
        assert_eq!(change, VirtualChange { button: Start, pressed: false });

        let mut out = VirtualReport::default();
        pad.apply_deferred(change, &mut out);
        assert_eq!(
            out.changes.as_slice(),
            &[VirtualChange { button: Start, pressed: false }]
        );
        assert!(!pad.is_pressed(Start));
    }

    #[test]
    fn shifted_release_survives_early_modifier_release() {
        let mut pad = VirtualPad::new(default_map());

        press(&mut pad, 9);
        assert_eq!(
            press(&mut pad, 0),
            vec![VirtualChange { button: MenuShiftedX, pressed: true }]
        );
        assert_eq!(release(&mut pad, 9), vec![]);
        // modifier already up: the release still resolves shifted
        assert_eq!(
            release(&mut pad, 0),
            vec![VirtualChange { button: MenuShiftedX, pressed: false }]
        );
    }

    #[test]
    fn modifier_release_before_press_in_same_batch_resolves_unshifted() {
        let mut pad = VirtualPad::new(default_map());
        let mut out = VirtualReport::default();

        press(&mut pad, 8);
        press(&mut pad, 1);
        release(&mut pad, 1);
        // Start release and a new A press arrive in one poll, release first:
        // the press must resolve unshifted because arrival order rules.
        pad.process(
            &report(&[(8, false), (1, true)], HAT_IDLE, HAT_IDLE),
            &mut out,
        );
        assert_eq!(
            out.changes.as_slice(),
            &[VirtualChange { button: A, pressed: true }]
        );
    }

    #[test]
    fn stick_clicks_and_aux_emit_base_identity() {
        let mut pad = VirtualPad::new(default_map());

        press(&mut pad, 8);
        // L3 has no shifted identity even while Start is held
        assert_eq!(
            press(&mut pad, 10),
            vec![VirtualChange { button: L3, pressed: true }]
        );

        let mut slots: Vec<_> = [X, A, B, Y].into_iter().map(Some).collect();
        slots.push(Some(Aux1));
        let mut aux_pad = VirtualPad::new(PadMap::new(slots));
        assert_eq!(
            press(&mut aux_pad, 4),
            vec![VirtualChange { button: Aux1, pressed: true }]
        );
    }

    #[test]
    fn buttons_precede_hat_edges_in_one_batch() {
        let mut pad = VirtualPad::new(default_map());
        let mut out = VirtualReport::default();

        let raised = pad.process(
            &report(&[(0, true), (3, true)], HAT_IDLE, 0x3),
            &mut out,
        );
        assert!(raised);
        assert_eq!(
            out.changes.as_slice(),
            &[
                VirtualChange { button: X, pressed: true },
                VirtualChange { button: Y, pressed: true },
                VirtualChange { button: HatUp, pressed: true },
                VirtualChange { button: HatRight, pressed: true },
            ]
        );

        // diagonal to plain right: only the up edge drops
        pad.process(&report(&[], 0x3, 0x2), &mut out);
        assert_eq!(
            out.changes.as_slice(),
            &[VirtualChange { button: HatUp, pressed: false }]
        );
    }

    #[test]
    fn unmapped_physical_index_is_ignored() {
        let mut pad = VirtualPad::new(default_map());
        let mut out = VirtualReport::default();

        assert!(!pad.process(&report(&[(40, true)], HAT_IDLE, HAT_IDLE), &mut out));
        assert!(out.is_empty());
    }
}
