//! Borderless topmost host window for the mirror.
//!
//! The window covers one monitor and is the parent of the magnifier
//! control when that backend is used. Closing it, pressing Escape while
//! it has focus or the global Insert hotkey all end the session.

use mirror_core::Rect;

/// Events produced by the window message loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    /// Window close requested.
    Close,
    /// The global quit hotkey fired.
    Hotkey,
    /// Escape pressed while the window had focus.
    Escape,
}

/// Options for [`MirrorWindow::create`].
#[derive(Debug, Clone)]
pub struct WindowOptions {
    pub title: String,
    /// Screen area the window covers.
    pub bounds: Rect,
    /// Register Insert as a system-wide quit key.
    pub quit_hotkey: bool,
}

impl WindowOptions {
    pub fn new(bounds: Rect) -> Self {
        Self {
            title: "deskmirror".into(),
            bounds,
            quit_hotkey: true,
        }
    }
}

#[cfg(target_os = "windows")]
mod platform {
    use std::sync::mpsc;

    use mirror_core::{HostWindow, Lifecycle};
    use tracing::{debug, warn};
    use windows::Win32::Foundation::*;
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows::Win32::UI::HiDpi::{
        DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2, SetProcessDpiAwarenessContext,
    };
    use windows::Win32::UI::Input::KeyboardAndMouse::{
        MOD_NOREPEAT, RegisterHotKey, UnregisterHotKey, VK_ESCAPE, VK_INSERT,
    };
    use windows::Win32::UI::WindowsAndMessaging::*;
    use windows::core::PCWSTR;

    use super::{WindowEvent, WindowOptions};

    const QUIT_HOTKEY_ID: i32 = 1;

    /// Opt the process into per-monitor DPI so monitor bounds and window
    /// sizes are in physical pixels. Call before any window exists.
    pub fn enable_dpi_awareness() {
        if let Err(e) = unsafe { SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2) } {
            debug!("per-monitor DPI awareness unavailable: {e}");
        }
    }

    /// Handle to the native window.
    pub struct MirrorWindow {
        hwnd: HWND,
        width: u32,
        height: u32,
        hotkey: bool,
        event_rx: mpsc::Receiver<WindowEvent>,
    }

    // The event sender lives in GWLP_USERDATA for the window's lifetime.
    unsafe extern "system" fn wndproc(
        hwnd: HWND,
        msg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        let tx_ptr = unsafe { GetWindowLongPtrW(hwnd, GWLP_USERDATA) } as *const mpsc::Sender<WindowEvent>;

        if tx_ptr.is_null() {
            return unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) };
        }

        let tx = unsafe { &*tx_ptr };

        match msg {
            WM_CLOSE => {
                let _ = tx.send(WindowEvent::Close);
                LRESULT(0)
            }
            WM_HOTKEY if wparam.0 as i32 == QUIT_HOTKEY_ID => {
                let _ = tx.send(WindowEvent::Hotkey);
                LRESULT(0)
            }
            WM_KEYDOWN if wparam.0 as u16 == VK_ESCAPE.0 => {
                let _ = tx.send(WindowEvent::Escape);
                LRESULT(0)
            }
            // Every pixel is repainted each tick.
            WM_ERASEBKGND => LRESULT(1),
            _ => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
        }
    }

    impl MirrorWindow {
        /// Create the window over `options.bounds` and show it without
        /// taking focus.
        pub fn create(options: &WindowOptions) -> Result<Self, String> {
            let (event_tx, event_rx) = mpsc::channel();
            let bounds = options.bounds;

            let hinstance = unsafe { GetModuleHandleW(None) }
                .map_err(|e| format!("GetModuleHandle: {e}"))?;

            let class_name_wide: Vec<u16> = "DeskMirrorHost\0".encode_utf16().collect();

            let wc = WNDCLASSW {
                lpfnWndProc: Some(wndproc),
                hInstance: hinstance.into(),
                lpszClassName: PCWSTR(class_name_wide.as_ptr()),
                hCursor: unsafe { LoadCursorW(None, IDC_ARROW) }.unwrap_or_default(),
                ..Default::default()
            };

            let atom = unsafe { RegisterClassW(&wc) };
            if atom == 0 {
                return Err("RegisterClassW failed".into());
            }

            let title_wide: Vec<u16> = options
                .title
                .encode_utf16()
                .chain(std::iter::once(0))
                .collect();

            let hwnd = unsafe {
                CreateWindowExW(
                    WS_EX_TOPMOST | WS_EX_TOOLWINDOW,
                    PCWSTR(class_name_wide.as_ptr()),
                    PCWSTR(title_wide.as_ptr()),
                    WS_POPUP | WS_CLIPCHILDREN,
                    bounds.x,
                    bounds.y,
                    bounds.width as i32,
                    bounds.height as i32,
                    None,
                    None,
                    hinstance,
                    None,
                )
            }
            .map_err(|e| format!("CreateWindowExW failed: {e}"))?;

            if hwnd.is_invalid() {
                return Err("CreateWindowExW returned invalid HWND".into());
            }

            let tx_ptr = Box::into_raw(Box::new(event_tx));
            unsafe {
                SetWindowLongPtrW(hwnd, GWLP_USERDATA, tx_ptr as isize);
            }

            let hotkey = options.quit_hotkey
                && match unsafe { RegisterHotKey(hwnd, QUIT_HOTKEY_ID, MOD_NOREPEAT, VK_INSERT.0 as u32) } {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("quit hotkey unavailable: {e}");
                        false
                    }
                };

            unsafe {
                let _ = ShowWindow(hwnd, SW_SHOWNOACTIVATE);
            }

            Ok(Self {
                hwnd,
                width: bounds.width,
                height: bounds.height,
                hotkey,
                event_rx,
            })
        }

        /// Ask the compositor to leave this window out of screen
        /// captures. Returns `false` where the OS does not support it.
        pub fn exclude_from_capture(&self) -> bool {
            unsafe { SetWindowDisplayAffinity(self.hwnd, WDA_EXCLUDEFROMCAPTURE) }.is_ok()
        }

        /// Pump window messages (non-blocking). Returns collected events.
        pub fn poll_events(&self) -> Vec<WindowEvent> {
            let mut quit = false;
            unsafe {
                let mut msg = MSG::default();
                while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
                    if msg.message == WM_QUIT {
                        quit = true;
                        continue;
                    }
                    let _ = TranslateMessage(&msg);
                    DispatchMessageW(&msg);
                }
            }
            let mut events: Vec<WindowEvent> = self.event_rx.try_iter().collect();
            if quit {
                events.push(WindowEvent::Close);
            }
            events
        }

        /// Pump messages and fold them into a lifecycle signal.
        pub fn pump(&self) -> Lifecycle {
            let events = self.poll_events();
            match events.first() {
                Some(ev) => {
                    debug!(event = ?ev, "quit requested");
                    Lifecycle::Quit
                }
                None => Lifecycle::Continue,
            }
        }

        pub fn hwnd(&self) -> HWND {
            self.hwnd
        }

        /// Handle for capture backends that attach to the window.
        pub fn host(&self) -> HostWindow {
            HostWindow(self.hwnd.0 as isize)
        }

        pub fn width(&self) -> u32 {
            self.width
        }

        pub fn height(&self) -> u32 {
            self.height
        }
    }

    impl Drop for MirrorWindow {
        fn drop(&mut self) {
            unsafe {
                if self.hotkey {
                    let _ = UnregisterHotKey(self.hwnd, QUIT_HOTKEY_ID);
                }
                let ptr = GetWindowLongPtrW(self.hwnd, GWLP_USERDATA) as *mut mpsc::Sender<WindowEvent>;
                if !ptr.is_null() {
                    SetWindowLongPtrW(self.hwnd, GWLP_USERDATA, 0);
                    drop(Box::from_raw(ptr));
                }
                let _ = DestroyWindow(self.hwnd);
            }
        }
    }
}

#[cfg(target_os = "windows")]
pub use platform::*;

// ── Non-Windows stub ─────────────────────────────────────────────

#[cfg(not(target_os = "windows"))]
pub mod stub {
    use mirror_core::{HostWindow, Lifecycle};

    use super::{WindowEvent, WindowOptions};

    pub fn enable_dpi_awareness() {}

    pub struct MirrorWindow {
        _private: (),
    }

    impl MirrorWindow {
        pub fn create(_options: &WindowOptions) -> Result<Self, String> {
            Err("the mirror window is only supported on Windows".into())
        }

        pub fn exclude_from_capture(&self) -> bool {
            false
        }

        pub fn poll_events(&self) -> Vec<WindowEvent> {
            Vec::new()
        }

        pub fn pump(&self) -> Lifecycle {
            Lifecycle::Quit
        }

        pub fn host(&self) -> HostWindow {
            HostWindow(0)
        }

        pub fn width(&self) -> u32 {
            0
        }

        pub fn height(&self) -> u32 {
            0
        }
    }
}

#[cfg(not(target_os = "windows"))]
pub use stub::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_default_to_hotkey() {
        let opts = WindowOptions::new(Rect::new(-1920, 0, 1920, 1080));
        assert!(opts.quit_hotkey);
        assert_eq!(opts.title, "deskmirror");
        assert_eq!(opts.bounds.x, -1920);
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn window_creation_fails_off_windows() {
        assert!(MirrorWindow::create(&WindowOptions::new(Rect::new(0, 0, 640, 480))).is_err());
    }
}
