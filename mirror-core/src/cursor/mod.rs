//! # cursor: pointer reconstruction and overlay
//!
//! - [`decode`]: raw shape payload → [`CursorBitmap`] (pure).
//! - [`CursorCache`]: keeps the bitmap of the last shape change.
//! - [`blend`]: alpha-blends the bitmap onto the canvas, with save-under.

pub mod blend;
pub mod decode;

use tracing::{debug, warn};

use crate::capture::types::PointerShapeUpdate;
use crate::error::ShapeDecodeError;
use crate::geometry::Point;

pub use blend::{CursorOverlay, blend_cursor};
pub use decode::{INVERSE_ALPHA, decode};

/// A decoded pointer image in straight (non-premultiplied) RGBA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorBitmap {
    pub width: u32,
    pub height: u32,
    pub hotspot: Point,
    /// `width * height` RGBA pixels, rows tightly packed.
    pub pixels: Vec<u8>,
    /// Shape-change event this bitmap was decoded from.
    pub shape_id: u64,
}

impl CursorBitmap {
    /// RGBA at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }
}

// ── CursorCache ──────────────────────────────────────────────────

/// Holds the current cursor bitmap between shape changes.
///
/// Identity is the shape id carried by the update, never a pixel
/// comparison. A payload that fails to decode leaves the previous bitmap
/// in place.
#[derive(Debug, Default)]
pub struct CursorCache {
    current: Option<CursorBitmap>,
    last_id: Option<u64>,
}

impl CursorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&CursorBitmap> {
        self.current.as_ref()
    }

    /// Apply a shape update. Returns `Ok(true)` when the bitmap changed,
    /// `Ok(false)` when the shape id was already seen.
    pub fn update(&mut self, update: &PointerShapeUpdate) -> Result<bool, ShapeDecodeError> {
        if self.last_id == Some(update.shape_id) {
            return Ok(false);
        }
        self.last_id = Some(update.shape_id);

        match decode(update) {
            Ok(bitmap) => {
                debug!(
                    shape_id = update.shape_id,
                    kind = ?update.kind,
                    width = bitmap.width,
                    height = bitmap.height,
                    "cursor shape decoded"
                );
                self.current = Some(bitmap);
                Ok(true)
            }
            Err(e) => {
                warn!(shape_id = update.shape_id, error = %e, "cursor shape rejected");
                Err(e)
            }
        }
    }
}
