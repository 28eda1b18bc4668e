use thiserror::Error;

/// Error type for device enumeration and report polling.
///
/// Variants are cloneable so a fault raised inside the poll thread can be
/// broadcast to every subscriber.
#[derive(Debug, Clone, Error)]
pub enum HidError {
    /// Failed to query the device list, open a device, or read its info.
    #[error("device error: {0}")]
    Device(String),
    /// The HID parser returned an unexpected status for a report.
    #[error("hid protocol error: status {0:#010x}")]
    Protocol(u32),
    /// A device index past the end of the enumerated list was requested.
    #[error("device index {index} out of range ({count} devices found)")]
    IndexOutOfRange { index: usize, count: usize },
    /// The monitor has no device to poll (already consumed or never provided).
    #[error("no device attached to this monitor")]
    NoDevice,
    /// No HID backend exists for the current platform.
    #[error("gamepad support is unavailable on this platform")]
    Unsupported,
}

/// Convenient result alias for HID operations.
pub type Result<T> = std::result::Result<T, HidError>;
