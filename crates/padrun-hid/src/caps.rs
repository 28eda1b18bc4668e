/// Descriptor capabilities of an opened device, derived once and cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCaps {
    /// First button usage code on the Buttons page.
    pub usage_min: u16,
    /// Last button usage code on the Buttons page (inclusive).
    pub usage_max: u16,
    /// Declared logical range of the hat switch. `hat_min > hat_max` means
    /// the device has no hat switch; every raw value then decodes as idle.
    pub hat_min: i32,
    /// See [`DeviceCaps::hat_min`].
    pub hat_max: i32,
    /// Byte length of one input report, including the report ID byte.
    pub report_len: u16,
}

impl DeviceCaps {
    /// Number of physical buttons declared by the descriptor.
    pub fn button_count(&self) -> u16 {
        self.usage_max - self.usage_min + 1
    }
}

/// Identification strings of an enumerated device, for display and selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GamepadInfo {
    pub vendor: String,
    pub product: String,
    pub serial: Option<String>,
}
