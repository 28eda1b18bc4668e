//! Raw-HID backend built on the Windows HID parser (HIDP) APIs.

use std::ffi::c_void;
use std::ptr::{null, null_mut};

use smallvec::SmallVec;
use windows_sys::Win32::Devices::HumanInterfaceDevice::{
    HidD_FreePreparsedData, HidD_GetManufacturerString, HidD_GetPreparsedData,
    HidD_GetProductString, HidD_GetSerialNumberString, HidP_GetButtonCaps,
    HidP_GetCaps, HidP_GetUsageValue, HidP_GetUsages, HidP_GetValueCaps,
    HidP_Input, HIDP_BUTTON_CAPS, HIDP_CAPS, HIDP_STATUS_BUFFER_TOO_SMALL,
    HIDP_STATUS_SUCCESS, HIDP_STATUS_USAGE_NOT_FOUND, HIDP_VALUE_CAPS,
    HID_USAGE_GENERIC_GAMEPAD, HID_USAGE_GENERIC_HATSWITCH,
    HID_USAGE_GENERIC_JOYSTICK, HID_USAGE_PAGE_BUTTON, HID_USAGE_PAGE_GENERIC,
    PHIDP_PREPARSED_DATA,
};
use windows_sys::Win32::Foundation::{
    CloseHandle, GetLastError, ERROR_OPERATION_ABORTED, GENERIC_READ,
    GENERIC_WRITE, HANDLE, INVALID_HANDLE_VALUE,
};
use windows_sys::Win32::Storage::FileSystem::{
    CreateFileW, ReadFile, FILE_ATTRIBUTE_NORMAL, FILE_SHARE_READ,
    FILE_SHARE_WRITE, OPEN_EXISTING,
};
use windows_sys::Win32::System::IO::CancelIoEx;
use windows_sys::Win32::UI::Input::{
    GetRawInputDeviceInfoW, GetRawInputDeviceList, RAWINPUTDEVICELIST,
    RIDI_DEVICEINFO, RIDI_DEVICENAME, RID_DEVICE_INFO, RIM_TYPEHID,
};

use crate::caps::{DeviceCaps, GamepadInfo};
use crate::error::{HidError, Result};
use crate::report::Frame;
use crate::source::{Interrupt, ReadStatus, ReportSource};

const STRING_BUF_CHARS: usize = 512;

fn last_error(what: &str) -> HidError {
    let code = unsafe { GetLastError() };
    HidError::Device(format!("{what} failed (os error {code})"))
}

struct Device {
    /// NUL-terminated interface path, ready for `CreateFileW`.
    path: Vec<u16>,
    info: GamepadInfo,
}

/// Gamepad-class HID devices found on the system at scan time.
pub struct DeviceList {
    devices: Vec<Device>,
}

impl DeviceList {
    /// Walks the raw-input device list and keeps joystick and gamepad
    /// top-level collections on the generic desktop page.
    pub fn scan() -> Result<Self> {
        let mut devices = Vec::new();
        for handle in raw_input_handles()? {
            if !is_gamepad_class(handle) {
                continue;
            }
            let Some(path) = device_path(handle) else {
                continue;
            };
            // Devices that refuse to open (exclusive capture, permissions)
            // are skipped rather than failing the whole scan.
            let Ok(file) = open_path(&path) else {
                continue;
            };
            let info = read_info(file);
            unsafe { CloseHandle(file) };
            devices.push(Device { path, info });
        }
        Ok(Self { devices })
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn infos(&self) -> Vec<GamepadInfo> {
        self.devices.iter().map(|d| d.info.clone()).collect()
    }

    pub fn info(&self, index: usize) -> Result<GamepadInfo> {
        self.devices
            .get(index)
            .map(|d| d.info.clone())
            .ok_or(HidError::IndexOutOfRange { index, count: self.devices.len() })
    }

    /// Opens the device at `index` for blocking report reads.
    pub fn open(&self, index: usize) -> Result<Box<dyn ReportSource>> {
        let device = self.devices.get(index).ok_or(
            HidError::IndexOutOfRange { index, count: self.devices.len() },
        )?;
        let handle = open_path(&device.path)?;
        match WinReportSource::new(handle) {
            Ok(source) => Ok(Box::new(source)),
            Err(e) => {
                unsafe { CloseHandle(handle) };
                Err(e)
            }
        }
    }
}

fn raw_input_handles() -> Result<Vec<HANDLE>> {
    unsafe {
        let entry_size = std::mem::size_of::<RAWINPUTDEVICELIST>() as u32;
        let mut count: u32 = 0;
        if GetRawInputDeviceList(null_mut(), &mut count, entry_size)
            == u32::MAX
        {
            return Err(last_error("GetRawInputDeviceList"));
        }
        if count == 0 {
            return Ok(Vec::new());
        }
        let mut list: Vec<RAWINPUTDEVICELIST> =
            vec![std::mem::zeroed(); count as usize];
        let got =
            GetRawInputDeviceList(list.as_mut_ptr(), &mut count, entry_size);
        if got == u32::MAX {
            return Err(last_error("GetRawInputDeviceList"));
        }
        list.truncate(got as usize);
        Ok(list
            .into_iter()
            .filter(|d| d.dwType == RIM_TYPEHID)
            .map(|d| d.hDevice)
            .collect())
    }
}

fn is_gamepad_class(handle: HANDLE) -> bool {
    unsafe {
        let mut info: RID_DEVICE_INFO = std::mem::zeroed();
        info.cbSize = std::mem::size_of::<RID_DEVICE_INFO>() as u32;
        let mut size = info.cbSize;
        let got = GetRawInputDeviceInfoW(
            handle,
            RIDI_DEVICEINFO,
            (&mut info as *mut RID_DEVICE_INFO).cast::<c_void>(),
            &mut size,
        );
        if got == u32::MAX || got == 0 {
            return false;
        }
        let hid = info.Anonymous.hid;
        hid.usUsagePage == HID_USAGE_PAGE_GENERIC
            && (hid.usUsage == HID_USAGE_GENERIC_JOYSTICK
                || hid.usUsage == HID_USAGE_GENERIC_GAMEPAD)
    }
}

fn device_path(handle: HANDLE) -> Option<Vec<u16>> {
    unsafe {
        let mut chars: u32 = 0;
        let r = GetRawInputDeviceInfoW(
            handle,
            RIDI_DEVICENAME,
            null_mut(),
            &mut chars,
        );
        if r == u32::MAX || chars == 0 {
            return None;
        }
        let mut wide = vec![0u16; chars as usize + 1];
        let r = GetRawInputDeviceInfoW(
            handle,
            RIDI_DEVICENAME,
            wide.as_mut_ptr().cast::<c_void>(),
            &mut chars,
        );
        if r == u32::MAX {
            return None;
        }
        // keep exactly one trailing NUL
        while wide.ends_with(&[0, 0]) {
            wide.pop();
        }
        if wide.last() != Some(&0) {
            wide.push(0);
        }
        Some(wide)
    }
}

fn open_path(path: &[u16]) -> Result<HANDLE> {
    let handle = unsafe {
        CreateFileW(
            path.as_ptr(),
            GENERIC_READ | GENERIC_WRITE,
            FILE_SHARE_READ | FILE_SHARE_WRITE,
            null(),
            OPEN_EXISTING,
            FILE_ATTRIBUTE_NORMAL,
            null_mut(),
        )
    };
    if handle == INVALID_HANDLE_VALUE {
        Err(last_error("CreateFileW"))
    } else {
        Ok(handle)
    }
}

type HidStringFn = unsafe extern "system" fn(HANDLE, *mut c_void, u32) -> u8;

fn hid_string(handle: HANDLE, fetch: HidStringFn) -> Option<String> {
    let mut buf = [0u16; STRING_BUF_CHARS];
    let ok = unsafe {
        fetch(
            handle,
            buf.as_mut_ptr().cast::<c_void>(),
            (buf.len() * 2) as u32,
        )
    };
    if ok == 0 {
        return None;
    }
    let end = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    if end == 0 {
        return None;
    }
    Some(String::from_utf16_lossy(&buf[..end]))
}

fn read_info(handle: HANDLE) -> GamepadInfo {
    GamepadInfo {
        vendor: hid_string(handle, HidD_GetManufacturerString)
            .unwrap_or_else(|| "Unknown vendor".to_string()),
        product: hid_string(handle, HidD_GetProductString)
            .unwrap_or_else(|| "Unknown product".to_string()),
        serial: hid_string(handle, HidD_GetSerialNumberString),
    }
}

struct WinInterrupt(HANDLE);

// The handle stays valid for the life of the monitor thread; CancelIoEx only
// touches pending I/O on it.
unsafe impl Send for WinInterrupt {}
unsafe impl Sync for WinInterrupt {}

impl Interrupt for WinInterrupt {
    fn interrupt(&self) {
        unsafe {
            CancelIoEx(self.0, null());
        }
    }
}

/// One opened gamepad polled with blocking `ReadFile` calls.
pub struct WinReportSource {
    handle: HANDLE,
    ppd: PHIDP_PREPARSED_DATA,
    caps: DeviceCaps,
    report: Vec<u8>,
    usages: Vec<u16>,
}

// Exclusively owned by the poll thread after start; the raw handle is the
// only non-Send member.
unsafe impl Send for WinReportSource {}

impl WinReportSource {
    fn new(handle: HANDLE) -> Result<Self> {
        let mut ppd: PHIDP_PREPARSED_DATA = 0;
        if unsafe { HidD_GetPreparsedData(handle, &mut ppd) } == 0 || ppd == 0 {
            return Err(last_error("HidD_GetPreparsedData"));
        }
        match parse_caps(ppd) {
            Ok(caps) => {
                let report = vec![0u8; usize::from(caps.report_len).max(1)];
                let usages = vec![0u16; usize::from(caps.button_count()).max(1)];
                Ok(Self { handle, ppd, caps, report, usages })
            }
            Err(e) => {
                unsafe { HidD_FreePreparsedData(ppd) };
                Err(e)
            }
        }
    }

    fn decode(&mut self, frame: &mut Frame) -> Result<()> {
        frame.usages.clear();
        frame.hat_raw = None;
        let report_len = self.report.len() as u32;

        let mut usage_len = self.usages.len() as u32;
        let status = unsafe {
            HidP_GetUsages(
                HidP_Input,
                HID_USAGE_PAGE_BUTTON,
                0,
                self.usages.as_mut_ptr(),
                &mut usage_len,
                self.ppd,
                self.report.as_mut_ptr(),
                report_len,
            )
        };
        match status {
            HIDP_STATUS_SUCCESS => {
                frame
                    .usages
                    .extend_from_slice(&self.usages[..usage_len as usize]);
            }
            // Exotic descriptors can declare more pressable usages than the
            // button range suggests; grow once and retry.
            HIDP_STATUS_BUFFER_TOO_SMALL => {
                self.usages.resize(usage_len as usize, 0);
                let status = unsafe {
                    HidP_GetUsages(
                        HidP_Input,
                        HID_USAGE_PAGE_BUTTON,
                        0,
                        self.usages.as_mut_ptr(),
                        &mut usage_len,
                        self.ppd,
                        self.report.as_mut_ptr(),
                        report_len,
                    )
                };
                if status != HIDP_STATUS_SUCCESS {
                    return Err(HidError::Protocol(status as u32));
                }
                frame
                    .usages
                    .extend_from_slice(&self.usages[..usage_len as usize]);
            }
            other => return Err(HidError::Protocol(other as u32)),
        }

        if self.caps.hat_min <= self.caps.hat_max {
            let mut value: u32 = 0;
            let status = unsafe {
                HidP_GetUsageValue(
                    HidP_Input,
                    HID_USAGE_PAGE_GENERIC,
                    0,
                    HID_USAGE_GENERIC_HATSWITCH,
                    &mut value,
                    self.ppd,
                    self.report.as_mut_ptr(),
                    report_len,
                )
            };
            match status {
                HIDP_STATUS_SUCCESS => frame.hat_raw = Some(value),
                // This report simply carries no hat value.
                HIDP_STATUS_USAGE_NOT_FOUND => {}
                other => return Err(HidError::Protocol(other as u32)),
            }
        }
        Ok(())
    }
}

impl ReportSource for WinReportSource {
    fn caps(&self) -> Result<DeviceCaps> {
        Ok(self.caps)
    }

    fn read_frame(&mut self, frame: &mut Frame) -> Result<ReadStatus> {
        let mut read: u32 = 0;
        let ok = unsafe {
            ReadFile(
                self.handle,
                self.report.as_mut_ptr(),
                self.report.len() as u32,
                &mut read,
                null_mut(),
            )
        };
        if ok == 0 {
            let code = unsafe { GetLastError() };
            if code == ERROR_OPERATION_ABORTED {
                return Ok(ReadStatus::Cancelled);
            }
            return Err(HidError::Device(format!(
                "ReadFile failed (os error {code})"
            )));
        }
        self.decode(frame)?;
        Ok(ReadStatus::Report)
    }

    fn interrupter(&self) -> Box<dyn Interrupt> {
        Box::new(WinInterrupt(self.handle))
    }
}

impl Drop for WinReportSource {
    fn drop(&mut self) {
        unsafe {
            HidD_FreePreparsedData(self.ppd);
            CloseHandle(self.handle);
        }
    }
}

fn parse_caps(ppd: PHIDP_PREPARSED_DATA) -> Result<DeviceCaps> {
    unsafe {
        let mut caps: HIDP_CAPS = std::mem::zeroed();
        let status = HidP_GetCaps(ppd, &mut caps);
        if status != HIDP_STATUS_SUCCESS {
            return Err(HidError::Protocol(status as u32));
        }

        let (usage_min, usage_max) = button_range(ppd, &caps)?;
        let (hat_min, hat_max) = hat_range(ppd, &caps);

        Ok(DeviceCaps {
            usage_min,
            usage_max,
            hat_min,
            hat_max,
            report_len: caps.InputReportByteLength,
        })
    }
}

/// First buttons-page range on the input report. Single-usage caps collapse
/// to a one-button range.
unsafe fn button_range(
    ppd: PHIDP_PREPARSED_DATA,
    caps: &HIDP_CAPS,
) -> Result<(u16, u16)> {
    let mut len = caps.NumberInputButtonCaps;
    if len == 0 {
        return Err(HidError::Device("device declares no buttons".into()));
    }
    let mut button_caps: Vec<HIDP_BUTTON_CAPS> =
        vec![std::mem::zeroed(); usize::from(len)];
    let status =
        HidP_GetButtonCaps(HidP_Input, button_caps.as_mut_ptr(), &mut len, ppd);
    if status != HIDP_STATUS_SUCCESS {
        return Err(HidError::Protocol(status as u32));
    }
    button_caps.truncate(usize::from(len));

    let mut found: SmallVec<[(u16, u16); 4]> = SmallVec::new();
    for cap in &button_caps {
        if cap.UsagePage != HID_USAGE_PAGE_BUTTON {
            continue;
        }
        if cap.IsRange != 0 {
            let range = cap.Anonymous.Range;
            if range.UsageMin <= range.UsageMax {
                found.push((range.UsageMin, range.UsageMax));
            }
        } else {
            let usage = cap.Anonymous.NotRange.Usage;
            found.push((usage, usage));
        }
    }
    found
        .first()
        .copied()
        .ok_or_else(|| HidError::Device("device declares no buttons".into()))
}

/// Logical range of the hat switch, or an inverted range when absent.
unsafe fn hat_range(ppd: PHIDP_PREPARSED_DATA, caps: &HIDP_CAPS) -> (i32, i32) {
    let mut len = caps.NumberInputValueCaps;
    if len == 0 {
        return (0, -1);
    }
    let mut value_caps: Vec<HIDP_VALUE_CAPS> =
        vec![std::mem::zeroed(); usize::from(len)];
    let status =
        HidP_GetValueCaps(HidP_Input, value_caps.as_mut_ptr(), &mut len, ppd);
    if status != HIDP_STATUS_SUCCESS {
        return (0, -1);
    }
    value_caps.truncate(usize::from(len));

    for cap in &value_caps {
        if cap.UsagePage != HID_USAGE_PAGE_GENERIC {
            continue;
        }
        let usage = if cap.IsRange != 0 {
            cap.Anonymous.Range.UsageMin
        } else {
            cap.Anonymous.NotRange.Usage
        };
        if usage == HID_USAGE_GENERIC_HATSWITCH {
            return (cap.LogicalMin, cap.LogicalMax);
        }
    }
    (0, -1)
}
