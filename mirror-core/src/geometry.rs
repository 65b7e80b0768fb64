//! Session geometry: the source, render and output rectangles and the
//! scale factors that tie them together.
//!
//! Everything here is computed once at startup. The frame compositor and
//! the cursor compositor both go through [`SessionGeometry`] so a pointer
//! position is scaled exactly like the frame content around it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::MirrorError;

// ── Point / Size / Rect ──────────────────────────────────────────

/// A signed pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// An axis-aligned rectangle. `x`/`y` may be negative for displays left
/// of or above the primary monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle at the origin with the given size.
    pub const fn from_size(size: Size) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether `(x, y)` lies inside the rectangle (right/bottom exclusive).
    pub fn contains(&self, x: i32, y: i32) -> bool {
        let (x, y) = (x as i64, y as i64);
        x >= self.x as i64 && x < self.right() && y >= self.y as i64 && y < self.bottom()
    }

    /// Whether `other` lies entirely inside `self`.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x as i64 >= self.x as i64
            && other.y as i64 >= self.y as i64
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Overlap of two rectangles, `None` if they do not intersect.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let left = (self.x as i64).max(other.x as i64);
        let top = (self.y as i64).max(other.y as i64);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            return None;
        }
        Some(Rect::new(
            left as i32,
            top as i32,
            (right - left) as u32,
            (bottom - top) as u32,
        ))
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

// ── SessionGeometry ──────────────────────────────────────────────

/// Immutable geometry of one mirroring session.
///
/// - `source`: capture region in absolute desktop coordinates.
/// - `render`: destination of the scaled source inside the canvas.
/// - `output`: full canvas size; everything outside `render` is padding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionGeometry {
    source: Rect,
    render: Rect,
    output: Size,
    scale_x: f64,
    scale_y: f64,
}

impl SessionGeometry {
    /// Validate and build the geometry.
    ///
    /// Fails when any rectangle is empty or the render rectangle does
    /// not fit inside the output canvas.
    pub fn new(source: Rect, render: Rect, output: Size) -> Result<Self, MirrorError> {
        if source.is_empty() {
            return Err(MirrorError::Config(format!("empty source rect {source}")));
        }
        if render.is_empty() {
            return Err(MirrorError::Config(format!("empty render rect {render}")));
        }
        if output.is_empty() {
            return Err(MirrorError::Config("empty output size".into()));
        }
        if !Rect::from_size(output).contains_rect(&render) {
            return Err(MirrorError::Config(format!(
                "render rect {render} exceeds output {}x{}",
                output.width, output.height
            )));
        }

        Ok(Self {
            source,
            render,
            output,
            scale_x: render.width as f64 / source.width as f64,
            scale_y: render.height as f64 / source.height as f64,
        })
    }

    pub fn source(&self) -> Rect {
        self.source
    }

    pub fn render(&self) -> Rect {
        self.render
    }

    pub fn output(&self) -> Size {
        self.output
    }

    /// Horizontal render/source ratio.
    pub fn scale_x(&self) -> f64 {
        self.scale_x
    }

    /// Vertical render/source ratio.
    pub fn scale_y(&self) -> f64 {
        self.scale_y
    }

    /// Whether a canvas pixel belongs to the pad region.
    pub fn is_pad(&self, x: i32, y: i32) -> bool {
        Rect::from_size(self.output).contains(x, y) && !self.render.contains(x, y)
    }

    /// Scale a source-relative coordinate into canvas space.
    ///
    /// Integer arithmetic (floor) so the same input always lands on the
    /// same pixel as the frame compositor's sample grid.
    pub fn scale_point(&self, rel: Point) -> Point {
        let sx = (rel.x as i64 * self.render.width as i64).div_euclid(self.source.width as i64);
        let sy = (rel.y as i64 * self.render.height as i64).div_euclid(self.source.height as i64);
        Point::new(
            (self.render.x as i64 + sx) as i32,
            (self.render.y as i64 + sy) as i32,
        )
    }

    /// Map an absolute desktop pointer position into canvas space.
    ///
    /// Returns `None` when the position lies outside the source rectangle.
    pub fn map_pointer(&self, absolute: Point) -> Option<Point> {
        if !self.source.contains(absolute.x, absolute.y) {
            return None;
        }
        let rel = Point::new(absolute.x - self.source.x, absolute.y - self.source.y);
        Some(self.scale_point(rel))
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> SessionGeometry {
        SessionGeometry::new(
            Rect::new(0, 0, 1920, 1080),
            Rect::new(0, 0, 1440, 1080),
            Size::new(1920, 1080),
        )
        .unwrap()
    }

    #[test]
    fn reference_scale_factors() {
        let g = reference();
        assert!((g.scale_x() - 0.75).abs() < f64::EPSILON);
        assert!((g.scale_y() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn right_edge_scales_to_render_boundary() {
        let g = reference();
        assert_eq!(g.scale_point(Point::new(1920, 0)), Point::new(1440, 0));
        // Unscaled position is outside the source, so it is never drawn.
        assert_eq!(g.map_pointer(Point::new(1920, 0)), None);
    }

    #[test]
    fn map_pointer_translates_by_source_origin() {
        let g = SessionGeometry::new(
            Rect::new(-1920, 0, 1920, 1080),
            Rect::new(0, 0, 960, 540),
            Size::new(1920, 1080),
        )
        .unwrap();
        assert_eq!(g.map_pointer(Point::new(-1920, 0)), Some(Point::new(0, 0)));
        assert_eq!(g.map_pointer(Point::new(-960, 540)), Some(Point::new(480, 270)));
        assert_eq!(g.map_pointer(Point::new(0, 0)), None);
    }

    #[test]
    fn pad_region_is_complement_of_render() {
        let g = reference();
        assert!(!g.is_pad(0, 0));
        assert!(!g.is_pad(1439, 1079));
        assert!(g.is_pad(1440, 0));
        assert!(g.is_pad(1919, 1079));
        assert!(!g.is_pad(1920, 0));
    }

    #[test]
    fn render_outside_output_is_rejected() {
        let err = SessionGeometry::new(
            Rect::new(0, 0, 1920, 1080),
            Rect::new(600, 0, 1440, 1080),
            Size::new(1920, 1080),
        )
        .unwrap_err();
        assert!(matches!(err, MirrorError::Config(_)));
    }

    #[test]
    fn empty_source_is_rejected() {
        assert!(
            SessionGeometry::new(
                Rect::new(0, 0, 0, 1080),
                Rect::new(0, 0, 10, 10),
                Size::new(10, 10),
            )
            .is_err()
        );
    }

    #[test]
    fn rect_intersection() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, -5, 10, 10);
        assert_eq!(a.intersect(&b), Some(Rect::new(5, 0, 5, 5)));
        assert_eq!(a.intersect(&Rect::new(10, 0, 5, 5)), None);
    }
}
