//! Display enumeration for `--list-monitors` and source selection.

use std::fmt;

use crate::error::CaptureError;
use crate::geometry::Rect;

/// One attached display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorInfo {
    /// Enumeration order, as used by `source_index`.
    pub index: usize,
    /// Device name, e.g. `\\.\DISPLAY1`.
    pub name: String,
    /// Desktop bounds.
    pub bounds: Rect,
    /// Current refresh rate; 0 when the driver does not report one.
    pub refresh_hz: u32,
    pub primary: bool,
}

impl fmt::Display for MonitorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}x{} at ({}, {}) {} Hz",
            self.index,
            self.name,
            self.bounds.width,
            self.bounds.height,
            self.bounds.x,
            self.bounds.y,
            self.refresh_hz
        )?;
        if self.primary {
            f.write_str(" (primary)")?;
        }
        Ok(())
    }
}

/// Bounds of the monitor at `index`.
pub fn monitor_bounds(monitors: &[MonitorInfo], index: usize) -> Option<Rect> {
    monitors.iter().find(|m| m.index == index).map(|m| m.bounds)
}

// ── Windows implementation ───────────────────────────────────────

#[cfg(target_os = "windows")]
mod platform {
    use super::*;
    use windows::Win32::Foundation::{BOOL, LPARAM, RECT, TRUE};
    use windows::Win32::Graphics::Gdi::{
        DEVMODEW, ENUM_CURRENT_SETTINGS, EnumDisplayMonitors, EnumDisplaySettingsW, GetMonitorInfoW,
        HDC, HMONITOR, MONITORINFO, MONITORINFOEXW,
    };
    use windows::core::PCWSTR;

    const MONITORINFOF_PRIMARY: u32 = 1;

    unsafe extern "system" fn collect(
        monitor: HMONITOR,
        _dc: HDC,
        _clip: *mut RECT,
        data: LPARAM,
    ) -> BOOL {
        let out = unsafe { &mut *(data.0 as *mut Vec<MonitorInfo>) };

        let mut info = MONITORINFOEXW::default();
        info.monitorInfo.cbSize = std::mem::size_of::<MONITORINFOEXW>() as u32;
        if !unsafe { GetMonitorInfoW(monitor, &mut info as *mut MONITORINFOEXW as *mut MONITORINFO) }
            .as_bool()
        {
            return TRUE;
        }

        let name_len = info.szDevice.iter().position(|&c| c == 0).unwrap_or(info.szDevice.len());
        let name = String::from_utf16_lossy(&info.szDevice[..name_len]);

        let mut mode = DEVMODEW {
            dmSize: std::mem::size_of::<DEVMODEW>() as u16,
            ..Default::default()
        };
        let refresh_hz = if unsafe {
            EnumDisplaySettingsW(
                PCWSTR(info.szDevice.as_ptr()),
                ENUM_CURRENT_SETTINGS,
                &mut mode,
            )
        }
        .as_bool()
        {
            mode.dmDisplayFrequency
        } else {
            0
        };

        let r = info.monitorInfo.rcMonitor;
        out.push(MonitorInfo {
            index: out.len(),
            name,
            bounds: Rect::new(
                r.left,
                r.top,
                (r.right - r.left).max(0) as u32,
                (r.bottom - r.top).max(0) as u32,
            ),
            refresh_hz,
            primary: info.monitorInfo.dwFlags & MONITORINFOF_PRIMARY != 0,
        });
        TRUE
    }

    /// List attached displays in enumeration order.
    pub fn enumerate_monitors() -> Result<Vec<MonitorInfo>, CaptureError> {
        let mut monitors: Vec<MonitorInfo> = Vec::new();
        let ok = unsafe {
            EnumDisplayMonitors(
                HDC::default(),
                None,
                Some(collect),
                LPARAM(&mut monitors as *mut Vec<MonitorInfo> as isize),
            )
        };
        if !ok.as_bool() {
            return Err(CaptureError::Backend("EnumDisplayMonitors failed".into()));
        }
        Ok(monitors)
    }
}

#[cfg(target_os = "windows")]
pub use platform::enumerate_monitors;

// ── Non-Windows stub ─────────────────────────────────────────────

#[cfg(not(target_os = "windows"))]
pub fn enumerate_monitors() -> Result<Vec<MonitorInfo>, CaptureError> {
    Err(CaptureError::Backend(
        "monitor enumeration is only available on Windows".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> Vec<MonitorInfo> {
        vec![
            MonitorInfo {
                index: 0,
                name: r"\\.\DISPLAY1".into(),
                bounds: Rect::new(0, 0, 1920, 1080),
                refresh_hz: 60,
                primary: true,
            },
            MonitorInfo {
                index: 1,
                name: r"\\.\DISPLAY2".into(),
                bounds: Rect::new(-1280, 0, 1280, 1024),
                refresh_hz: 75,
                primary: false,
            },
        ]
    }

    #[test]
    fn display_line() {
        let m = pair();
        assert_eq!(
            m[0].to_string(),
            r"[0] \\.\DISPLAY1 1920x1080 at (0, 0) 60 Hz (primary)"
        );
        assert!(!m[1].to_string().contains("primary"));
    }

    #[test]
    fn bounds_by_index() {
        let m = pair();
        assert_eq!(monitor_bounds(&m, 1), Some(Rect::new(-1280, 0, 1280, 1024)));
        assert_eq!(monitor_bounds(&m, 2), None);
    }
}
