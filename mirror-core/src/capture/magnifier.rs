//! Compositor-delegated capture through the Magnification API.
//!
//! A magnifier control is created as a child of the presentation window,
//! covering the render rectangle. The OS samples the source rectangle,
//! scales it by the session factors and draws the pointer itself, so
//! `acquire` never yields pixels. It only pushes the source rectangle and
//! transform to the control when they changed and asks for a repaint.

use std::time::Duration;

use crate::capture::types::PointerShapeUpdate;
use crate::capture::{Acquire, BackendKind, CaptureBackend, HostWindow, SourceFrame};
use crate::error::CaptureError;
use crate::geometry::{Rect, SessionGeometry};

/// Magnifier control bound to one host window.
pub struct MagnifierBackend {
    source: Rect,
    /// Source rectangle last handed to the control.
    applied: Option<Rect>,
    render: Rect,
    /// Render/source ratio the control should magnify by.
    scale: (f32, f32),
    scale_dirty: bool,

    #[cfg(target_os = "windows")]
    control: platform::MagControl,
}

impl MagnifierBackend {
    pub fn source(&self) -> Rect {
        self.source
    }

    /// Whether the next acquire has to refresh the control's source.
    pub fn source_dirty(&self) -> bool {
        self.applied != Some(self.source)
    }

    pub fn scale(&self) -> (f32, f32) {
        self.scale
    }

    /// Whether the next acquire has to push a new transform.
    pub fn transform_dirty(&self) -> bool {
        self.scale_dirty
    }

    fn stage_source(&mut self, rect: Rect) -> Result<(), CaptureError> {
        if rect.is_empty() {
            return Err(CaptureError::Backend(format!("empty magnifier source {rect}")));
        }
        let scale = fit_scale(self.render, rect);
        if scale != self.scale {
            self.scale = scale;
            self.scale_dirty = true;
        }
        self.source = rect;
        Ok(())
    }
}

/// Factors that stretch `source` over `render`.
fn fit_scale(render: Rect, source: Rect) -> (f32, f32) {
    (
        render.width as f32 / source.width as f32,
        render.height as f32 / source.height as f32,
    )
}

#[cfg(target_os = "windows")]
fn transform(scale: (f32, f32)) -> windows::Win32::UI::Magnification::MAGTRANSFORM {
    windows::Win32::UI::Magnification::MAGTRANSFORM {
        v: [scale.0, 0.0, 0.0, 0.0, scale.1, 0.0, 0.0, 0.0, 1.0],
    }
}

// ── Windows implementation ───────────────────────────────────────

#[cfg(target_os = "windows")]
mod platform {
    use super::*;
    use tracing::{debug, info};
    use windows::Win32::Foundation::{HWND, RECT};
    use windows::Win32::Graphics::Gdi::InvalidateRect;
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows::Win32::UI::Magnification::{
        MS_SHOWMAGNIFIEDCURSOR, MagInitialize, MagSetWindowSource,
        MagSetWindowTransform, MagUninitialize, WC_MAGNIFIER,
    };
    use windows::Win32::UI::WindowsAndMessaging::{
        CreateWindowExW, DestroyWindow, WINDOW_EX_STYLE, WINDOW_STYLE, WS_CHILD, WS_VISIBLE,
    };
    use windows::core::w;

    /// The magnifier child window. Dropping it tears down the API.
    pub(super) struct MagControl {
        pub(super) hwnd: HWND,
    }

    impl Drop for MagControl {
        fn drop(&mut self) {
            unsafe {
                let _ = DestroyWindow(self.hwnd);
                let _ = MagUninitialize();
            }
        }
    }

    impl MagnifierBackend {
        /// Create the magnifier control inside `host`.
        pub fn new(host: HostWindow, geometry: &SessionGeometry) -> Result<Self, CaptureError> {
            let render = geometry.render();
            let scale = fit_scale(render, geometry.source());

            unsafe {
                if !MagInitialize().as_bool() {
                    return Err(CaptureError::Unsupported {
                        kind: BackendKind::Magnifier,
                        reason: "MagInitialize failed",
                    });
                }

                let instance = GetModuleHandleW(None).map_err(|e| {
                    let _ = MagUninitialize();
                    CaptureError::Backend(format!("GetModuleHandleW: {e}"))
                })?;

                let hwnd = CreateWindowExW(
                    WINDOW_EX_STYLE::default(),
                    WC_MAGNIFIER,
                    w!("deskmirror-magnifier"),
                    WS_CHILD | WS_VISIBLE | WINDOW_STYLE(MS_SHOWMAGNIFIEDCURSOR as u32),
                    render.x,
                    render.y,
                    render.width as i32,
                    render.height as i32,
                    HWND(host.0 as *mut _),
                    None,
                    instance,
                    None,
                )
                .map_err(|e| {
                    let _ = MagUninitialize();
                    CaptureError::Backend(format!("magnifier control: {e}"))
                })?;
                let control = MagControl { hwnd };

                let mut initial = transform(scale);
                if !MagSetWindowTransform(control.hwnd, &mut initial).as_bool() {
                    return Err(CaptureError::Backend("MagSetWindowTransform failed".into()));
                }

                info!(
                    source = %geometry.source(),
                    %render,
                    scale_x = scale.0,
                    scale_y = scale.1,
                    "magnifier control created"
                );

                Ok(Self {
                    source: geometry.source(),
                    applied: None,
                    render,
                    scale,
                    scale_dirty: false,
                    control,
                })
            }
        }
    }

    impl CaptureBackend for MagnifierBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Magnifier
        }

        fn acquire(&mut self, _timeout: Duration) -> Result<Acquire, CaptureError> {
            if self.scale_dirty {
                let mut next = transform(self.scale);
                if !unsafe { MagSetWindowTransform(self.control.hwnd, &mut next) }.as_bool() {
                    return Err(CaptureError::DeviceLost("MagSetWindowTransform failed".into()));
                }
                debug!(scale_x = self.scale.0, scale_y = self.scale.1, "magnifier transform updated");
                self.scale_dirty = false;
            }
            if self.source_dirty() {
                let s = self.source;
                let rect = RECT {
                    left: s.x,
                    top: s.y,
                    right: s.right() as i32,
                    bottom: s.bottom() as i32,
                };
                if !unsafe { MagSetWindowSource(self.control.hwnd, rect) }.as_bool() {
                    // The control dies with the desktop it was created on.
                    return Err(CaptureError::DeviceLost("MagSetWindowSource failed".into()));
                }
                debug!(source = %s, "magnifier source updated");
                self.applied = Some(s);
            }
            unsafe {
                let _ = InvalidateRect(self.control.hwnd, None, true);
            }
            Ok(Acquire::Delegated)
        }

        fn frame(&self) -> Option<SourceFrame<'_>> {
            None
        }

        fn pointer_shape_update(&mut self) -> Option<PointerShapeUpdate> {
            None
        }

        fn release(&mut self) {}

        fn set_source_rect(&mut self, rect: Rect) -> Result<(), CaptureError> {
            self.stage_source(rect)
        }
    }
}

// ── Non-Windows stub ─────────────────────────────────────────────

#[cfg(not(target_os = "windows"))]
mod stub {
    use super::*;

    impl MagnifierBackend {
        /// The Magnification API is only available on Windows.
        pub fn new(_host: HostWindow, _geometry: &SessionGeometry) -> Result<Self, CaptureError> {
            Err(CaptureError::Unsupported {
                kind: BackendKind::Magnifier,
                reason: "the Magnification API is only available on Windows",
            })
        }
    }

    impl CaptureBackend for MagnifierBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Magnifier
        }

        fn acquire(&mut self, _timeout: Duration) -> Result<Acquire, CaptureError> {
            Err(CaptureError::Backend("not supported on this platform".into()))
        }

        fn frame(&self) -> Option<SourceFrame<'_>> {
            None
        }

        fn pointer_shape_update(&mut self) -> Option<PointerShapeUpdate> {
            None
        }

        fn release(&mut self) {}

        fn set_source_rect(&mut self, rect: Rect) -> Result<(), CaptureError> {
            self.stage_source(rect)
        }
    }
}
