//! GDI presentation surface.
//!
//! Stretches the BGRA canvas over the host window's client area with
//! `StretchDIBits`. When the window carries a magnifier child, the
//! window's `WS_CLIPCHILDREN` style keeps this from painting over it, so
//! only the pad region is drawn.

#[cfg(target_os = "windows")]
mod platform {
    use mirror_core::{Lifecycle, MirrorError, OutputCanvas, PixelFormat, PresentationSurface};
    use windows::Win32::Graphics::Gdi::*;

    use crate::window::MirrorWindow;

    /// Presents canvases into a [`MirrorWindow`].
    pub struct GdiPresenter {
        window: MirrorWindow,
    }

    impl GdiPresenter {
        pub fn new(window: MirrorWindow) -> Self {
            Self { window }
        }

        pub fn window(&self) -> &MirrorWindow {
            &self.window
        }

        fn bitmap_info(width: u32, height: u32) -> BITMAPINFO {
            BITMAPINFO {
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
                bmiColors: [RGBQUAD::default(); 1],
            }
        }
    }

    impl PresentationSurface for GdiPresenter {
        fn present(&mut self, canvas: &OutputCanvas) -> Result<(), MirrorError> {
            if canvas.format() != PixelFormat::Bgra8 {
                return Err(MirrorError::Present(format!(
                    "GDI needs BGRA canvases, got {:?}",
                    canvas.format()
                )));
            }

            let bmi = Self::bitmap_info(canvas.width(), canvas.height());
            let hwnd = self.window.hwnd();

            unsafe {
                let hdc = GetDC(hwnd);
                if hdc.is_invalid() {
                    return Err(MirrorError::Present("GetDC failed".into()));
                }

                SetStretchBltMode(hdc, COLORONCOLOR);
                let lines = StretchDIBits(
                    hdc,
                    0,
                    0,
                    self.window.width() as i32,
                    self.window.height() as i32,
                    0,
                    0,
                    canvas.width() as i32,
                    canvas.height() as i32,
                    Some(canvas.data().as_ptr() as *const _),
                    &bmi,
                    DIB_RGB_COLORS,
                    SRCCOPY,
                );

                ReleaseDC(hwnd, hdc);

                if lines == 0 {
                    return Err(MirrorError::Present("StretchDIBits copied no scan lines".into()));
                }
            }

            Ok(())
        }

        fn pump_events(&mut self) -> Lifecycle {
            self.window.pump()
        }
    }
}

#[cfg(target_os = "windows")]
pub use platform::*;

// ── Non-Windows stub ─────────────────────────────────────────────

#[cfg(not(target_os = "windows"))]
pub mod stub {
    use mirror_core::{Lifecycle, MirrorError, OutputCanvas, PresentationSurface};

    use crate::window::MirrorWindow;

    pub struct GdiPresenter {
        window: MirrorWindow,
    }

    impl GdiPresenter {
        pub fn new(window: MirrorWindow) -> Self {
            Self { window }
        }

        pub fn window(&self) -> &MirrorWindow {
            &self.window
        }
    }

    impl PresentationSurface for GdiPresenter {
        fn present(&mut self, _canvas: &OutputCanvas) -> Result<(), MirrorError> {
            Err(MirrorError::Present(
                "display output is only supported on Windows".into(),
            ))
        }

        fn pump_events(&mut self) -> Lifecycle {
            self.window.pump()
        }
    }
}

#[cfg(not(target_os = "windows"))]
pub use stub::*;
