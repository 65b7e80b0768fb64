//! GDI blit capture.
//!
//! Copies the live desktop into a DIB section with `BitBlt` on every
//! acquire. It never waits for a compositor frame, so each acquire yields
//! a frame. The desktop image does not carry the pointer; the backend
//! reads the current cursor handle and converts it into a
//! [`PointerShapeUpdate`] whenever the handle changes.
//!
//! A failing `BitBlt` usually means the input desktop switched (lock
//! screen, UAC prompt); it is reported as device loss so the session
//! rebuilds the DCs.

use crate::capture::types::{FrameBuffer, PointerShapeUpdate};
use crate::capture::{Acquire, BackendKind, CaptureBackend, SourceFrame};
use crate::error::CaptureError;
use crate::geometry::Rect;

/// `BitBlt`-based backend for one source rectangle.
pub struct BlitBackend {
    source: Rect,
    buffer: FrameBuffer,
    frame_held: bool,
    pending_shape: Option<PointerShapeUpdate>,
    #[cfg_attr(not(target_os = "windows"), allow(dead_code))]
    shape_serial: u64,
    #[cfg_attr(not(target_os = "windows"), allow(dead_code))]
    last_cursor: isize,

    #[cfg(target_os = "windows")]
    gdi: platform::GdiTarget,
}

impl BlitBackend {
    /// Desktop rectangle copied on each acquire.
    pub fn source(&self) -> Rect {
        self.source
    }
}

// ── Windows implementation ───────────────────────────────────────

#[cfg(target_os = "windows")]
mod platform {
    use std::time::Duration;

    use super::*;
    use crate::capture::pointer::shape_from_cursor;
    use crate::capture::types::PixelFormat;
    use crate::geometry::Point;
    use tracing::{debug, trace};
    use windows::Win32::Foundation::{HANDLE, HWND};
    use windows::Win32::Graphics::Gdi::*;
    use windows::Win32::UI::WindowsAndMessaging::{CURSOR_SHOWING, CURSORINFO, GetCursorInfo};

    /// Screen DC, memory DC and the DIB section selected into it.
    pub(super) struct GdiTarget {
        screen_dc: HDC,
        memory_dc: HDC,
        bitmap: HBITMAP,
        previous: HGDIOBJ,
        bits: *mut core::ffi::c_void,
    }

    impl GdiTarget {
        unsafe fn create(width: u32, height: u32) -> Result<Self, CaptureError> {
            let screen_dc = unsafe { GetDC(HWND::default()) };
            if screen_dc.is_invalid() {
                return Err(CaptureError::Backend("GetDC(NULL) failed".into()));
            }
            let memory_dc = unsafe { CreateCompatibleDC(screen_dc) };
            if memory_dc.is_invalid() {
                unsafe { ReleaseDC(HWND::default(), screen_dc) };
                return Err(CaptureError::Backend("CreateCompatibleDC failed".into()));
            }

            let bmi = BITMAPINFO {
                bmiHeader: BITMAPINFOHEADER {
                    biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                    biWidth: width as i32,
                    // Negative height = top-down DIB (origin at top-left).
                    biHeight: -(height as i32),
                    biPlanes: 1,
                    biBitCount: 32,
                    biCompression: BI_RGB.0,
                    ..Default::default()
                },
                ..Default::default()
            };

            let mut bits = std::ptr::null_mut();
            let bitmap = match unsafe {
                CreateDIBSection(memory_dc, &bmi, DIB_RGB_COLORS, &mut bits, HANDLE::default(), 0)
            } {
                Ok(b) if !bits.is_null() => b,
                Ok(_) | Err(_) => {
                    unsafe {
                        let _ = DeleteDC(memory_dc);
                        ReleaseDC(HWND::default(), screen_dc);
                    }
                    return Err(CaptureError::Backend("CreateDIBSection failed".into()));
                }
            };
            let previous = unsafe { SelectObject(memory_dc, bitmap) };

            Ok(Self {
                screen_dc,
                memory_dc,
                bitmap,
                previous,
                bits,
            })
        }
    }

    impl Drop for GdiTarget {
        fn drop(&mut self) {
            unsafe {
                SelectObject(self.memory_dc, self.previous);
                let _ = DeleteObject(self.bitmap);
                let _ = DeleteDC(self.memory_dc);
                ReleaseDC(HWND::default(), self.screen_dc);
            }
        }
    }

    impl BlitBackend {
        /// Prepare a blit of `source` (desktop coordinates).
        pub fn new(source: Rect) -> Result<Self, CaptureError> {
            if source.is_empty() {
                return Err(CaptureError::Backend(format!("empty source rect {source}")));
            }
            let gdi = unsafe { GdiTarget::create(source.width, source.height)? };
            debug!(%source, "GDI blit capture ready");
            Ok(Self {
                source,
                buffer: FrameBuffer::new(
                    source.width,
                    source.height,
                    PixelFormat::Bgra8,
                    Point::new(source.x, source.y),
                ),
                frame_held: false,
                pending_shape: None,
                shape_serial: 0,
                last_cursor: 0,
                gdi,
            })
        }

        fn poll_cursor_shape(&mut self) {
            let mut info = CURSORINFO {
                cbSize: std::mem::size_of::<CURSORINFO>() as u32,
                ..Default::default()
            };
            if unsafe { GetCursorInfo(&mut info) }.is_err() {
                return;
            }
            if info.flags.0 & CURSOR_SHOWING.0 == 0 || info.hCursor.is_invalid() {
                return;
            }
            let handle = info.hCursor.0 as isize;
            if handle == self.last_cursor {
                return;
            }
            self.last_cursor = handle;
            self.shape_serial += 1;
            match unsafe { shape_from_cursor(self.gdi.screen_dc, info.hCursor, self.shape_serial) } {
                Some(update) => self.pending_shape = Some(update),
                None => trace!("cursor {handle:#x} has no readable bitmaps"),
            }
        }
    }

    impl CaptureBackend for BlitBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Blit
        }

        fn acquire(&mut self, _timeout: Duration) -> Result<Acquire, CaptureError> {
            self.release();

            let (w, h) = (self.source.width as i32, self.source.height as i32);
            unsafe {
                BitBlt(
                    self.gdi.memory_dc,
                    0,
                    0,
                    w,
                    h,
                    self.gdi.screen_dc,
                    self.source.x,
                    self.source.y,
                    ROP_CODE(SRCCOPY.0 | CAPTUREBLT.0),
                )
                .map_err(|e| CaptureError::DeviceLost(format!("BitBlt: {e}")))?;
                let _ = GdiFlush();
            }

            let stride = self.source.width * 4;
            let len = stride as usize * self.source.height as usize;
            let src = unsafe { std::slice::from_raw_parts(self.gdi.bits as *const u8, len) };
            self.buffer.copy_rows(src, stride);

            self.poll_cursor_shape();
            self.frame_held = true;
            Ok(Acquire::Frame)
        }

        fn frame(&self) -> Option<SourceFrame<'_>> {
            self.frame_held.then(|| self.buffer.as_frame())
        }

        fn pointer_shape_update(&mut self) -> Option<PointerShapeUpdate> {
            self.pending_shape.take()
        }

        fn release(&mut self) {
            self.frame_held = false;
        }
    }
}

// ── Non-Windows stub ─────────────────────────────────────────────

#[cfg(not(target_os = "windows"))]
mod stub {
    use std::time::Duration;

    use super::*;

    impl BlitBackend {
        /// GDI capture is only available on Windows.
        pub fn new(_source: Rect) -> Result<Self, CaptureError> {
            Err(CaptureError::Unsupported {
                kind: BackendKind::Blit,
                reason: "GDI screen capture is only available on Windows",
            })
        }
    }

    impl CaptureBackend for BlitBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Blit
        }

        fn acquire(&mut self, _timeout: Duration) -> Result<Acquire, CaptureError> {
            Err(CaptureError::Backend("not supported on this platform".into()))
        }

        fn frame(&self) -> Option<SourceFrame<'_>> {
            self.frame_held.then(|| self.buffer.as_frame())
        }

        fn pointer_shape_update(&mut self) -> Option<PointerShapeUpdate> {
            self.pending_shape.take()
        }

        fn release(&mut self) {
            self.frame_held = false;
        }
    }
}
