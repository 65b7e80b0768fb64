//! Shared types produced by capture backends.
//!
//! [`FrameBuffer`] is the owned pixel store a backend reuses across
//! acquisitions; [`SourceFrame`] is the borrowed, read-only view handed to
//! the frame compositor for the lifetime of one lease.

use std::time::Instant;

use crate::geometry::Point;

// ── PixelFormat ──────────────────────────────────────────────────

/// Channel order of a 4-byte pixel. Fixed for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    /// Blue, Green, Red, Alpha (DXGI and GDI DIB sections).
    #[default]
    Bgra8,
    /// Red, Green, Blue, Alpha.
    Rgba8,
}

impl PixelFormat {
    /// Every supported format is 32-bit.
    pub const BYTES_PER_PIXEL: usize = 4;

    /// Byte offset of the red channel inside a pixel.
    pub const fn red_offset(self) -> usize {
        match self {
            PixelFormat::Bgra8 => 2,
            PixelFormat::Rgba8 => 0,
        }
    }

    /// Byte offset of the blue channel inside a pixel.
    pub const fn blue_offset(self) -> usize {
        match self {
            PixelFormat::Bgra8 => 0,
            PixelFormat::Rgba8 => 2,
        }
    }
}

// ── SourceFrame ──────────────────────────────────────────────────

/// Read-only view of a captured display image.
///
/// `data` holds `height` rows of `stride` bytes; `stride` may exceed
/// `width * 4` (GPU row alignment). `origin` is the desktop position of
/// the captured display's top-left pixel.
#[derive(Debug, Clone, Copy)]
pub struct SourceFrame<'a> {
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub format: PixelFormat,
    pub origin: Point,
    pub data: &'a [u8],
}

impl<'a> SourceFrame<'a> {
    /// Returns a row slice (including possible padding bytes).
    pub fn row(&self, y: u32) -> &'a [u8] {
        let start = y as usize * self.stride as usize;
        let end = (start + self.stride as usize).min(self.data.len());
        &self.data[start..end]
    }

    /// Returns the pixel bytes at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> &'a [u8] {
        let offset = y as usize * self.stride as usize + x as usize * PixelFormat::BYTES_PER_PIXEL;
        &self.data[offset..offset + PixelFormat::BYTES_PER_PIXEL]
    }

    /// Whether `data` is long enough for the declared geometry.
    pub fn is_well_formed(&self) -> bool {
        if self.height == 0 || self.width == 0 {
            return false;
        }
        let row_bytes = self.width as usize * PixelFormat::BYTES_PER_PIXEL;
        self.stride as usize >= row_bytes
            && self.data.len() >= (self.height as usize - 1) * self.stride as usize + row_bytes
    }
}

// ── FrameBuffer ──────────────────────────────────────────────────

/// Owned storage for the most recent capture, reused in place.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub format: PixelFormat,
    pub origin: Point,
    pub data: Vec<u8>,
    /// Monotonic capture timestamp.
    pub timestamp: Instant,
}

impl FrameBuffer {
    /// Allocate a zeroed, tightly packed buffer.
    pub fn new(width: u32, height: u32, format: PixelFormat, origin: Point) -> Self {
        let stride = width * PixelFormat::BYTES_PER_PIXEL as u32;
        Self {
            width,
            height,
            stride,
            format,
            origin,
            data: vec![0; stride as usize * height as usize],
            timestamp: Instant::now(),
        }
    }

    /// Borrow the buffer as a compositor input.
    pub fn as_frame(&self) -> SourceFrame<'_> {
        SourceFrame {
            width: self.width,
            height: self.height,
            stride: self.stride,
            format: self.format,
            origin: self.origin,
            data: &self.data,
        }
    }

    /// Copy `height` rows of `src` (laid out at `src_stride`) into the
    /// buffer, adopting `src_stride` when it differs.
    pub fn copy_rows(&mut self, src: &[u8], src_stride: u32) {
        let needed = src_stride as usize * self.height as usize;
        self.stride = src_stride;
        self.data.resize(needed, 0);
        let n = needed.min(src.len());
        self.data[..n].copy_from_slice(&src[..n]);
        self.timestamp = Instant::now();
    }
}

// ── Pointer types ────────────────────────────────────────────────

/// Encoding of a raw pointer-shape payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// 1 bpp AND mask stacked on a 1 bpp XOR mask; declared height is
    /// twice the visible height.
    Monochrome,
    /// 32 bpp BGRA with straight alpha.
    Color,
    /// 32 bpp BGR plus a mask byte in place of alpha.
    MaskedColor,
}

/// A raw pointer-shape update, emitted only when the shape changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerShapeUpdate {
    pub kind: ShapeKind,
    /// Declared width in pixels.
    pub width: u32,
    /// Declared height in rows (both masks for monochrome).
    pub height: u32,
    /// Row pitch in bytes.
    pub pitch: u32,
    /// Offset of the logical pointer position inside the bitmap.
    pub hotspot: Point,
    /// Identifies the shape-change event that produced this update.
    pub shape_id: u64,
    pub data: Vec<u8>,
}

/// Pointer position and visibility, refreshed every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointerState {
    /// Absolute desktop coordinates.
    pub position: Point,
    pub visible: bool,
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_offsets() {
        assert_eq!(PixelFormat::Bgra8.red_offset(), 2);
        assert_eq!(PixelFormat::Bgra8.blue_offset(), 0);
        assert_eq!(PixelFormat::Rgba8.red_offset(), 0);
    }

    #[test]
    fn padded_rows_are_addressed_by_stride() {
        let mut data = vec![0u8; 2 * 16];
        data[16..20].copy_from_slice(&[1, 2, 3, 4]);
        let frame = SourceFrame {
            width: 2,
            height: 2,
            stride: 16,
            format: PixelFormat::Bgra8,
            origin: Point::default(),
            data: &data,
        };
        assert!(frame.is_well_formed());
        assert_eq!(frame.pixel(0, 1), &[1, 2, 3, 4]);
        assert_eq!(frame.row(1).len(), 16);
    }

    #[test]
    fn short_buffer_is_not_well_formed() {
        let data = vec![0u8; 12];
        let frame = SourceFrame {
            width: 2,
            height: 2,
            stride: 8,
            format: PixelFormat::Bgra8,
            origin: Point::default(),
            data: &data,
        };
        assert!(!frame.is_well_formed());
    }

    #[test]
    fn copy_rows_adopts_stride() {
        let mut buf = FrameBuffer::new(2, 2, PixelFormat::Bgra8, Point::default());
        let src = vec![7u8; 2 * 32];
        buf.copy_rows(&src, 32);
        assert_eq!(buf.stride, 32);
        assert_eq!(buf.data.len(), 64);
        assert!(buf.as_frame().is_well_formed());
    }
}
