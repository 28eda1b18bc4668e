//! `SendInput`-based synthesis and the foreground-window probe.

use windows_sys::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT,
    KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP, KEYEVENTF_SCANCODE,
};
use windows_sys::Win32::UI::WindowsAndMessaging::{
    GetForegroundWindow, GetWindowThreadProcessId,
};

use crate::key::ScanCode;
use crate::synth::{ForegroundProbe, KeySynth, SendError};

/// Injects scan-code keyboard events into the active desktop session.
#[derive(Debug, Default, Clone, Copy)]
pub struct SendInputSynth;

impl KeySynth for SendInputSynth {
    fn send(&mut self, scan_code: ScanCode, down: bool) -> Result<(), SendError> {
        let mut flags = KEYEVENTF_SCANCODE;
        // Extended keys travel as the low byte plus the extended flag.
        if scan_code > 0xFF {
            flags |= KEYEVENTF_EXTENDEDKEY;
        }
        if !down {
            flags |= KEYEVENTF_KEYUP;
        }
        let input = INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: 0,
                    wScan: scan_code & 0xFF,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        };
        let sent = unsafe {
            SendInput(1, &input, std::mem::size_of::<INPUT>() as i32)
        };
        if sent == 1 {
            Ok(())
        } else {
            Err(SendError { scan_code, down })
        }
    }
}

/// Compares the foreground window's owning process against a pid.
#[derive(Debug, Default, Clone, Copy)]
pub struct WinForegroundProbe;

impl ForegroundProbe for WinForegroundProbe {
    fn is_foreground(&self, pid: u32) -> bool {
        unsafe {
            let hwnd = GetForegroundWindow();
            if hwnd.is_null() {
                return false;
            }
            let mut owner: u32 = 0;
            if GetWindowThreadProcessId(hwnd, &mut owner) == 0 {
                return false;
            }
            owner == pid
        }
    }
}
