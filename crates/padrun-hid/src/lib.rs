mod caps;
mod error;
mod monitor;
mod report;
mod source;

#[cfg(windows)]
mod windows;

pub use crate::caps::{DeviceCaps, GamepadInfo};
pub use crate::error::{HidError, Result};
pub use crate::monitor::{ChangeReceiver, GamepadMonitor, MonitorEvent};
pub use crate::report::{
    normalize_hat, ButtonChange, ButtonStates, ChangeReport, Frame,
    FrameDecoder, HAT_DOWN, HAT_IDLE, HAT_LEFT, HAT_RIGHT, HAT_UP,
};
pub use crate::source::{Interrupt, ReadStatus, ReportSource};

#[cfg(windows)]
pub use crate::windows::{DeviceList, WinReportSource};

/// Enumerates gamepad-class HID devices attached to the system.
#[cfg(windows)]
pub fn scan_devices() -> Result<DeviceList> {
    DeviceList::scan()
}

/// Gamepad support is Windows-only; other platforms report [`HidError::Unsupported`].
#[cfg(not(windows))]
pub fn scan_devices() -> Result<DeviceList> {
    Err(HidError::Unsupported)
}

/// Stub device list for platforms without a HID backend.
#[cfg(not(windows))]
#[derive(Debug, Default)]
pub struct DeviceList(());

#[cfg(not(windows))]
impl DeviceList {
    pub fn len(&self) -> usize {
        0
    }

    pub fn is_empty(&self) -> bool {
        true
    }

    pub fn infos(&self) -> Vec<GamepadInfo> {
        Vec::new()
    }

    pub fn info(&self, index: usize) -> Result<GamepadInfo> {
        Err(HidError::IndexOutOfRange { index, count: 0 })
    }

    pub fn open(&self, _index: usize) -> Result<Box<dyn ReportSource>> {
        Err(HidError::Unsupported)
    }
}
