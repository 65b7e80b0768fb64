//! The output canvas handed to the presentation surface every tick.

use serde::{Deserialize, Serialize};

use crate::capture::types::PixelFormat;
use crate::geometry::{Rect, Size};

// ── Rgba ─────────────────────────────────────────────────────────

/// A straight RGBA color, written as `[r, g, b, a]` in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u8; 4]", into = "[u8; 4]")]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::new(0, 0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Bytes in the channel order of `format`.
    pub fn to_format(self, format: PixelFormat) -> [u8; 4] {
        let mut px = [0, self.g, 0, self.a];
        px[format.red_offset()] = self.r;
        px[format.blue_offset()] = self.b;
        px
    }

    /// Read a pixel stored in `format`.
    pub fn from_format(px: [u8; 4], format: PixelFormat) -> Self {
        Self::new(px[format.red_offset()], px[1], px[format.blue_offset()], px[3])
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::BLACK
    }
}

impl From<[u8; 4]> for Rgba {
    fn from([r, g, b, a]: [u8; 4]) -> Self {
        Self::new(r, g, b, a)
    }
}

impl From<Rgba> for [u8; 4] {
    fn from(c: Rgba) -> Self {
        [c.r, c.g, c.b, c.a]
    }
}

// ── OutputCanvas ─────────────────────────────────────────────────

/// Fixed-size, tightly packed 32-bit canvas.
///
/// Created once per session and filled with the pad color; afterwards
/// only the frame compositor (inside the render rectangle) and the
/// cursor overlay write to it. Its dimensions never change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputCanvas {
    size: Size,
    format: PixelFormat,
    pad: Rgba,
    data: Vec<u8>,
}

impl OutputCanvas {
    pub fn new(size: Size, format: PixelFormat, pad: Rgba) -> Self {
        let px = pad.to_format(format);
        let count = size.width as usize * size.height as usize;
        let mut data = Vec::with_capacity(count * PixelFormat::BYTES_PER_PIXEL);
        for _ in 0..count {
            data.extend_from_slice(&px);
        }
        Self {
            size,
            format,
            pad,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.size)
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn pad_color(&self) -> Rgba {
        self.pad
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.size.width as usize * PixelFormat::BYTES_PER_PIXEL
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.stride() + x as usize * PixelFormat::BYTES_PER_PIXEL
    }

    /// Raw pixel bytes in canvas order, `None` outside the canvas.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        let i = self.offset(x, y);
        self.data[i..i + 4].try_into().ok()
    }

    /// Pixel as straight RGBA.
    pub fn rgba(&self, x: u32, y: u32) -> Option<Rgba> {
        self.pixel(x, y).map(|px| Rgba::from_format(px, self.format))
    }

    /// Mutable pixel bytes; callers have already bounds-checked.
    pub(crate) fn pixel_mut(&mut self, x: u32, y: u32) -> &mut [u8] {
        let i = self.offset(x, y);
        &mut self.data[i..i + 4]
    }

    /// Copy out the pixels under `rect` (must lie inside the canvas).
    pub(crate) fn read_rect(&self, rect: Rect) -> Vec<u8> {
        let row_bytes = rect.width as usize * PixelFormat::BYTES_PER_PIXEL;
        let mut out = Vec::with_capacity(row_bytes * rect.height as usize);
        for y in 0..rect.height {
            let i = self.offset(rect.x as u32, rect.y as u32 + y);
            out.extend_from_slice(&self.data[i..i + row_bytes]);
        }
        out
    }

    /// Inverse of [`read_rect`](Self::read_rect).
    pub(crate) fn write_rect(&mut self, rect: Rect, pixels: &[u8]) {
        let row_bytes = rect.width as usize * PixelFormat::BYTES_PER_PIXEL;
        for (y, src) in (0..rect.height).zip(pixels.chunks_exact(row_bytes)) {
            let i = self.offset(rect.x as u32, rect.y as u32 + y);
            self.data[i..i + row_bytes].copy_from_slice(src);
        }
    }

    /// Whether every pixel of `rect` holds the pad color.
    pub fn is_filled_with_pad(&self, rect: Rect) -> bool {
        let Some(rect) = rect.intersect(&self.bounds()) else {
            return true;
        };
        let px = self.pad.to_format(self.format);
        self.read_rect(rect).chunks_exact(4).all(|p| p == px)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_canvas_is_pad_filled_in_canvas_order() {
        let pad = Rgba::new(1, 2, 3, 255);
        let canvas = OutputCanvas::new(Size::new(4, 2), PixelFormat::Bgra8, pad);
        assert_eq!(canvas.data().len(), 4 * 2 * 4);
        assert_eq!(canvas.pixel(3, 1), Some([3, 2, 1, 255]));
        assert_eq!(canvas.rgba(0, 0), Some(pad));
        assert_eq!(canvas.pixel(4, 0), None);
        assert!(canvas.is_filled_with_pad(canvas.bounds()));
    }

    #[test]
    fn rect_round_trip() {
        let mut canvas = OutputCanvas::new(Size::new(4, 4), PixelFormat::Rgba8, Rgba::BLACK);
        let rect = Rect::new(1, 1, 2, 2);
        let patch: Vec<u8> = (0..16).collect();
        canvas.write_rect(rect, &patch);
        assert_eq!(canvas.read_rect(rect), patch);
        assert!(canvas.is_filled_with_pad(Rect::new(3, 0, 1, 4)));
        assert!(!canvas.is_filled_with_pad(rect));
    }

    #[test]
    fn rgba_array_conversions() {
        let c = Rgba::from([10, 20, 30, 40]);
        assert_eq!(c, Rgba::new(10, 20, 30, 40));
        assert_eq!(<[u8; 4]>::from(c), [10, 20, 30, 40]);
        assert_eq!(c.to_format(PixelFormat::Bgra8), [30, 20, 10, 40]);
        assert_eq!(Rgba::from_format([30, 20, 10, 40], PixelFormat::Bgra8), c);
    }
}
