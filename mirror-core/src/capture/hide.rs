//! Hide-during-capture policy for the blit backend.
//!
//! When the presentation window cannot be excluded from screen capture,
//! a blit of the desktop would copy the mirror into itself. The
//! decorator hides the window for the duration of each acquire and
//! restores it afterwards, also when the capture fails.

use std::time::Duration;

use crate::capture::{Acquire, BackendKind, CaptureBackend, PointerShapeUpdate, SourceFrame};
use crate::error::CaptureError;
use crate::geometry::Rect;

/// Something that can briefly take itself off screen.
pub trait SelfVisibility {
    fn hide(&mut self);
    fn show(&mut self);
}

/// Restores visibility when dropped.
struct HiddenScope<'a, V: SelfVisibility + ?Sized> {
    visibility: &'a mut V,
}

impl<'a, V: SelfVisibility + ?Sized> HiddenScope<'a, V> {
    fn enter(visibility: &'a mut V) -> Self {
        visibility.hide();
        Self { visibility }
    }
}

impl<V: SelfVisibility + ?Sized> Drop for HiddenScope<'_, V> {
    fn drop(&mut self) {
        self.visibility.show();
    }
}

/// Wraps a backend so every acquire runs with the window hidden.
pub struct HideDuringCapture<B, V> {
    inner: B,
    visibility: V,
}

impl<B: CaptureBackend, V: SelfVisibility> HideDuringCapture<B, V> {
    pub fn new(inner: B, visibility: V) -> Self {
        Self { inner, visibility }
    }
}

impl<B: CaptureBackend, V: SelfVisibility> CaptureBackend for HideDuringCapture<B, V> {
    fn kind(&self) -> BackendKind {
        self.inner.kind()
    }

    fn acquire(&mut self, timeout: Duration) -> Result<Acquire, CaptureError> {
        let _hidden = HiddenScope::enter(&mut self.visibility);
        self.inner.acquire(timeout)
    }

    fn frame(&self) -> Option<SourceFrame<'_>> {
        self.inner.frame()
    }

    fn pointer_shape_update(&mut self) -> Option<PointerShapeUpdate> {
        self.inner.pointer_shape_update()
    }

    fn release(&mut self) {
        self.inner.release()
    }

    fn set_source_rect(&mut self, rect: Rect) -> Result<(), CaptureError> {
        self.inner.set_source_rect(rect)
    }
}

// ── Windows implementation ───────────────────────────────────────

#[cfg(target_os = "windows")]
mod platform {
    use super::SelfVisibility;
    use crate::capture::HostWindow;
    use windows::Win32::Foundation::HWND;
    use windows::Win32::UI::WindowsAndMessaging::{
        HWND_TOPMOST, SWP_HIDEWINDOW, SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE, SWP_NOZORDER,
        SWP_SHOWWINDOW, SetWindowPos,
    };

    /// Toggles a top-level window with `SetWindowPos`.
    pub struct WindowVisibility {
        hwnd: HWND,
    }

    impl WindowVisibility {
        pub fn new(host: HostWindow) -> Self {
            Self {
                hwnd: HWND(host.0 as *mut _),
            }
        }
    }

    impl SelfVisibility for WindowVisibility {
        fn hide(&mut self) {
            unsafe {
                let _ = SetWindowPos(
                    self.hwnd,
                    HWND::default(),
                    0,
                    0,
                    0,
                    0,
                    SWP_NOMOVE | SWP_NOSIZE | SWP_NOZORDER | SWP_HIDEWINDOW | SWP_NOACTIVATE,
                );
            }
        }

        fn show(&mut self) {
            unsafe {
                let _ = SetWindowPos(
                    self.hwnd,
                    HWND_TOPMOST,
                    0,
                    0,
                    0,
                    0,
                    SWP_NOMOVE | SWP_NOSIZE | SWP_SHOWWINDOW | SWP_NOACTIVATE,
                );
            }
        }
    }
}

#[cfg(target_os = "windows")]
pub use platform::WindowVisibility;

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<&'static str>>>;

    struct RecordingVisibility(Log);

    impl SelfVisibility for RecordingVisibility {
        fn hide(&mut self) {
            self.0.borrow_mut().push("hide");
        }

        fn show(&mut self) {
            self.0.borrow_mut().push("show");
        }
    }

    struct ScriptedBlit {
        log: Log,
        fail: bool,
    }

    impl CaptureBackend for ScriptedBlit {
        fn kind(&self) -> BackendKind {
            BackendKind::Blit
        }

        fn acquire(&mut self, _timeout: Duration) -> Result<Acquire, CaptureError> {
            self.log.borrow_mut().push("capture");
            if self.fail {
                Err(CaptureError::Backend("BitBlt failed".into()))
            } else {
                Ok(Acquire::Frame)
            }
        }

        fn frame(&self) -> Option<SourceFrame<'_>> {
            None
        }

        fn pointer_shape_update(&mut self) -> Option<PointerShapeUpdate> {
            None
        }

        fn release(&mut self) {
            self.log.borrow_mut().push("release");
        }
    }

    fn decorated(fail: bool) -> (HideDuringCapture<ScriptedBlit, RecordingVisibility>, Log) {
        let log: Log = Rc::default();
        let backend = ScriptedBlit {
            log: Rc::clone(&log),
            fail,
        };
        (
            HideDuringCapture::new(backend, RecordingVisibility(Rc::clone(&log))),
            log,
        )
    }

    #[test]
    fn hides_captures_then_restores() {
        let (mut backend, log) = decorated(false);
        assert_eq!(backend.acquire(Duration::ZERO).unwrap(), Acquire::Frame);
        assert_eq!(*log.borrow(), ["hide", "capture", "show"]);
    }

    #[test]
    fn restores_even_when_capture_fails() {
        let (mut backend, log) = decorated(true);
        assert!(backend.acquire(Duration::ZERO).is_err());
        assert_eq!(*log.borrow(), ["hide", "capture", "show"]);
    }

    #[test]
    fn release_is_not_wrapped() {
        let (mut backend, log) = decorated(false);
        backend.acquire(Duration::ZERO).unwrap();
        backend.release();
        assert_eq!(*log.borrow(), ["hide", "capture", "show", "release"]);
        assert_eq!(backend.kind(), BackendKind::Blit);
    }
}
