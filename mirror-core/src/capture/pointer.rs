//! System pointer access: position/visibility every tick, and cursor
//! handle → raw shape conversion for the blit backend.

use crate::capture::types::PointerState;
use crate::error::CaptureError;
use crate::surface::PointerSource;

/// Reads the OS cursor position with `GetCursorInfo`.
pub struct SystemPointer {
    _private: (),
}

/// Combine the colour plane of a legacy icon with its AND mask.
///
/// Icons without an alpha channel describe transparency through the AND
/// mask: a set bit over black is transparent, a set bit over a colour is
/// an XOR pixel (approximated at alpha 128), a clear bit is opaque.
/// Colour planes that already carry alpha are returned unchanged.
pub fn merge_icon_mask(
    color_bgra: &[u8],
    and_mask: &[u8],
    mask_pitch: usize,
    width: usize,
    height: usize,
) -> Vec<u8> {
    let mut out = color_bgra.to_vec();
    if out.chunks_exact(4).any(|px| px[3] != 0) {
        return out;
    }

    for y in 0..height {
        for x in 0..width {
            let i = (y * width + x) * 4;
            let Some(px) = out.get_mut(i..i + 4) else {
                return out;
            };
            let and_bit = and_mask
                .get(y * mask_pitch + x / 8)
                .map_or(0, |b| (b >> (7 - (x % 8))) & 1);
            px[3] = match (and_bit, px[0] | px[1] | px[2]) {
                (0, _) => 255,
                (_, 0) => 0,
                _ => 128,
            };
        }
    }
    out
}

// ── Windows implementation ───────────────────────────────────────

#[cfg(target_os = "windows")]
mod platform {
    use super::*;
    use crate::capture::types::{PointerShapeUpdate, ShapeKind};
    use crate::geometry::Point;
    use windows::Win32::Graphics::Gdi::*;
    use windows::Win32::UI::WindowsAndMessaging::{
        CURSOR_SHOWING, CURSORINFO, GetCursorInfo, GetIconInfo, HCURSOR, HICON, ICONINFO,
    };

    impl SystemPointer {
        pub fn new() -> Result<Self, CaptureError> {
            Ok(Self { _private: () })
        }
    }

    impl PointerSource for SystemPointer {
        fn poll(&mut self) -> Option<PointerState> {
            let mut info = CURSORINFO {
                cbSize: std::mem::size_of::<CURSORINFO>() as u32,
                ..Default::default()
            };
            unsafe { GetCursorInfo(&mut info) }.ok()?;
            Some(PointerState {
                position: Point::new(info.ptScreenPos.x, info.ptScreenPos.y),
                visible: info.flags.0 & CURSOR_SHOWING.0 != 0,
            })
        }
    }

    /// `BITMAPINFO` with room for the two palette entries a 1 bpp
    /// `GetDIBits` writes.
    #[repr(C)]
    struct DibInfo {
        header: BITMAPINFOHEADER,
        colors: [RGBQUAD; 2],
    }

    /// Deletes the bitmaps `GetIconInfo` hands out.
    struct IconBitmaps(ICONINFO);

    impl Drop for IconBitmaps {
        fn drop(&mut self) {
            unsafe {
                if !self.0.hbmMask.is_invalid() {
                    let _ = DeleteObject(self.0.hbmMask);
                }
                if !self.0.hbmColor.is_invalid() {
                    let _ = DeleteObject(self.0.hbmColor);
                }
            }
        }
    }

    unsafe fn read_dib(
        dc: HDC,
        bitmap: HBITMAP,
        width: u32,
        height: u32,
        bits_per_pixel: u16,
    ) -> Option<(Vec<u8>, u32)> {
        let pitch = if bits_per_pixel == 1 {
            width.div_ceil(32) * 4
        } else {
            width * 4
        };
        let mut buf = vec![0u8; pitch as usize * height as usize];
        let mut info = DibInfo {
            header: BITMAPINFOHEADER {
                biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: width as i32,
                biHeight: -(height as i32),
                biPlanes: 1,
                biBitCount: bits_per_pixel,
                biCompression: BI_RGB.0,
                ..Default::default()
            },
            colors: [RGBQUAD::default(); 2],
        };
        let lines = unsafe {
            GetDIBits(
                dc,
                bitmap,
                0,
                height,
                Some(buf.as_mut_ptr() as *mut _),
                &mut info as *mut DibInfo as *mut BITMAPINFO,
                DIB_RGB_COLORS,
            )
        };
        (lines as u32 == height).then_some((buf, pitch))
    }

    /// Convert a cursor handle into a raw shape update.
    pub(crate) unsafe fn shape_from_cursor(
        dc: HDC,
        cursor: HCURSOR,
        shape_id: u64,
    ) -> Option<PointerShapeUpdate> {
        let mut icon = ICONINFO::default();
        unsafe { GetIconInfo(HICON(cursor.0), &mut icon) }.ok()?;
        let icon = IconBitmaps(icon);
        let hotspot = Point::new(icon.0.xHotspot as i32, icon.0.yHotspot as i32);

        let mut bm = BITMAP::default();
        let got = unsafe {
            GetObjectW(
                HGDIOBJ(icon.0.hbmMask.0),
                std::mem::size_of::<BITMAP>() as i32,
                Some(&mut bm as *mut BITMAP as *mut _),
            )
        };
        if got == 0 || bm.bmWidth <= 0 || bm.bmHeight <= 0 {
            return None;
        }
        let width = bm.bmWidth as u32;
        let mask_height = bm.bmHeight as u32;
        let (mask, mask_pitch) = unsafe { read_dib(dc, icon.0.hbmMask, width, mask_height, 1)? };

        if icon.0.hbmColor.is_invalid() {
            // Monochrome: AND and XOR planes stacked in one bitmap.
            return Some(PointerShapeUpdate {
                kind: ShapeKind::Monochrome,
                width,
                height: mask_height,
                pitch: mask_pitch,
                hotspot,
                shape_id,
                data: mask,
            });
        }

        let (color, pitch) = unsafe { read_dib(dc, icon.0.hbmColor, width, mask_height, 32)? };
        let data = merge_icon_mask(
            &color,
            &mask,
            mask_pitch as usize,
            width as usize,
            mask_height as usize,
        );
        Some(PointerShapeUpdate {
            kind: ShapeKind::Color,
            width,
            height: mask_height,
            pitch,
            hotspot,
            shape_id,
            data,
        })
    }
}

#[cfg(target_os = "windows")]
pub(crate) use platform::shape_from_cursor;

// ── Non-Windows stub ─────────────────────────────────────────────

#[cfg(not(target_os = "windows"))]
mod stub {
    use super::*;

    impl SystemPointer {
        /// Pointer tracking is only available on Windows.
        pub fn new() -> Result<Self, CaptureError> {
            Err(CaptureError::Backend(
                "system pointer tracking is only available on Windows".into(),
            ))
        }
    }

    impl PointerSource for SystemPointer {
        fn poll(&mut self) -> Option<PointerState> {
            None
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
