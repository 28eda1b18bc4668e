use colored::Colorize;

use padrun_keysend::{ForegroundProbe, KeySynth, ScanCode};
use padrun_profile::Mappings;
use padrun_virtual::{VirtualButton, VirtualReport, ALL_VIRTUAL_BUTTONS};

use crate::print_error;

/// Sentinel for a virtual button with no configured function or key.
/// Intentionally unmapped buttons must inject nothing.
pub const NO_SCAN_CODE: ScanCode = 0;

/// Composes the virtual-to-function and function-to-key tables into one
/// direct scan-code lookup, built once per runner.
pub fn compile_key_table(mappings: &Mappings) -> [ScanCode; VirtualButton::COUNT] {
    let mut table = [NO_SCAN_CODE; VirtualButton::COUNT];
    for button in ALL_VIRTUAL_BUTTONS {
        let Some(function) = mappings.functions.function(button) else {
            continue;
        };
        if let Some(key) = mappings.keys.key_for(function) {
            table[button.index()] = key.scan_code();
        }
    }
    table
}

/// Turns virtual change batches into synthesized key events, gated on the
/// game process owning the foreground window.
pub struct KeyInjector<S, P> {
    table: [ScanCode; VirtualButton::COUNT],
    synth: S,
    probe: P,
    pid: u32,
}

impl<S: KeySynth, P: ForegroundProbe> KeyInjector<S, P> {
    pub fn new(mappings: &Mappings, synth: S, probe: P, pid: u32) -> Self {
        Self { table: compile_key_table(mappings), synth, probe, pid }
    }

    pub fn set_pid(&mut self, pid: u32) {
        self.pid = pid;
    }

    /// Injects one batch. When the game is not foreground the whole batch is
    /// dropped, never a partial prefix.
    pub fn inject(&mut self, report: &VirtualReport) {
        if !self.probe.is_foreground(self.pid) {
            return;
        }
        for change in &report.changes {
            let scan_code = self.table[change.button.index()];
            if scan_code == NO_SCAN_CODE {
                continue;
            }
            if let Err(e) = self.synth.send(scan_code, change.pressed) {
                print_error!("{e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use padrun_hid::{ButtonChange, ChangeReport, HAT_IDLE};
    use padrun_keysend::{Key, SendError};
    use padrun_virtual::{PadMap, VirtualChange, VirtualPad};

    use super::*;

    #[derive(Default, Clone)]
    struct RecordingSynth {
        sent: Rc<RefCell<Vec<(ScanCode, bool)>>>,
        reject: bool,
    }

    impl KeySynth for RecordingSynth {
        fn send(&mut self, scan_code: ScanCode, down: bool) -> Result<(), SendError> {
            if self.reject {
                return Err(SendError { scan_code, down });
            }
            self.sent.borrow_mut().push((scan_code, down));
            Ok(())
        }
    }

    struct FixedProbe(bool);

    impl ForegroundProbe for FixedProbe {
        fn is_foreground(&self, _pid: u32) -> bool {
            self.0
        }
    }

    fn report_for(button: VirtualButton, pressed: bool) -> VirtualReport {
        let mut report = VirtualReport::default();
        report.changes.push(VirtualChange { button, pressed });
        report
    }

    #[test]
    fn compiled_table_composes_both_maps() {
        let table = compile_key_table(&Mappings::default());
        assert_eq!(table[VirtualButton::X.index()], Key::LeftAlt.scan_code());
        assert_eq!(table[VirtualButton::HatUp.index()], Key::Up.scan_code());
        assert_eq!(table[VirtualButton::L3.index()], Key::F6.scan_code());
        // unmapped buttons stay on the sentinel
        assert_eq!(table[VirtualButton::Aux5.index()], NO_SCAN_CODE);
        assert_eq!(table[VirtualButton::MenuShiftedX.index()], NO_SCAN_CODE);
    }

    #[test]
    fn injects_only_while_the_game_is_foreground() {
        let synth = RecordingSynth::default();
        let sent = Rc::clone(&synth.sent);
        let mut injector =
            KeyInjector::new(&Mappings::default(), synth, FixedProbe(true), 7);

        injector.inject(&report_for(VirtualButton::X, true));
        assert_eq!(sent.borrow().as_slice(), &[(Key::LeftAlt.scan_code(), true)]);

        let background = RecordingSynth::default();
        let background_sent = Rc::clone(&background.sent);
        let mut injector = KeyInjector::new(
            &Mappings::default(),
            background,
            FixedProbe(false),
            7,
        );
        injector.inject(&report_for(VirtualButton::X, true));
        assert!(background_sent.borrow().is_empty());
    }

    #[test]
    fn unmapped_buttons_are_silently_skipped() {
        let synth = RecordingSynth::default();
        let sent = Rc::clone(&synth.sent);
        let mut injector =
            KeyInjector::new(&Mappings::default(), synth, FixedProbe(true), 7);

        let mut report = report_for(VirtualButton::Aux5, true);
        report.changes.push(VirtualChange {
            button: VirtualButton::A,
            pressed: true,
        });
        injector.inject(&report);
        assert_eq!(
            sent.borrow().as_slice(),
            &[(Key::LeftCtrl.scan_code(), true)]
        );
    }

    #[test]
    fn rejection_is_non_fatal_to_the_batch() {
        let synth = RecordingSynth { reject: true, ..Default::default() };
        let mut injector =
            KeyInjector::new(&Mappings::default(), synth, FixedProbe(true), 7);
        injector.inject(&report_for(VirtualButton::X, true));
    }

    // physical press to synthesized key, through the whole chain
    #[test]
    fn physical_press_reaches_the_keyboard() {
        let mappings = Mappings::default();
        let mut pad = VirtualPad::new(mappings.gamepad.for_device(17));
        let synth = RecordingSynth::default();
        let sent = Rc::clone(&synth.sent);
        let mut injector = KeyInjector::new(&mappings, synth, FixedProbe(true), 7);

        let physical = ChangeReport {
            changes: [ButtonChange { index: 0, pressed: true }]
                .into_iter()
                .collect(),
            prev_hat: HAT_IDLE,
            hat: HAT_IDLE,
        };
        let mut virtual_report = VirtualReport::default();
        assert!(pad.process(&physical, &mut virtual_report));
        injector.inject(&virtual_report);

        // phys 0 -> X -> "Jump" -> LeftAlt, exactly one down
        assert_eq!(sent.borrow().as_slice(), &[(Key::LeftAlt.scan_code(), true)]);
    }

    #[test]
    fn empty_device_map_injects_nothing() {
        let mappings = Mappings::default();
        let mut pad = VirtualPad::new(PadMap::default());
        let synth = RecordingSynth::default();
        let sent = Rc::clone(&synth.sent);
        let mut injector = KeyInjector::new(&mappings, synth, FixedProbe(true), 7);

        let physical = ChangeReport {
            changes: [ButtonChange { index: 0, pressed: true }]
                .into_iter()
                .collect(),
            prev_hat: HAT_IDLE,
            hat: HAT_IDLE,
        };
        let mut virtual_report = VirtualReport::default();
        assert!(!pad.process(&physical, &mut virtual_report));
        injector.inject(&virtual_report);
        assert!(sent.borrow().is_empty());
    }
}
