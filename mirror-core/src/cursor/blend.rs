//! Cursor compositing onto the output canvas.

use crate::compose::canvas::OutputCanvas;
use crate::cursor::CursorBitmap;
use crate::geometry::{Point, Rect};

/// Screen-space rectangle covered by `bitmap` drawn at `position`.
fn footprint(bitmap: &CursorBitmap, position: Point) -> Rect {
    Rect::new(
        position.x.saturating_sub(bitmap.hotspot.x),
        position.y.saturating_sub(bitmap.hotspot.y),
        bitmap.width,
        bitmap.height,
    )
}

/// Blend `bitmap` with its hotspot at `position` (canvas coordinates).
///
/// Pixels outside `clip` or the canvas are skipped, as are fully
/// transparent ones. Opaque pixels are copied; the rest use
/// `dst = (src * a + dst * (255 - a)) / 255` with destination alpha
/// forced to 255. Returns the number of pixels written.
pub fn blend_cursor(
    bitmap: &CursorBitmap,
    position: Point,
    canvas: &mut OutputCanvas,
    clip: Rect,
) -> usize {
    let area = footprint(bitmap, position);
    let Some(visible) = area
        .intersect(&clip)
        .and_then(|r| r.intersect(&canvas.bounds()))
    else {
        return 0;
    };

    let format = canvas.format();
    let (ri, bi) = (format.red_offset(), format.blue_offset());
    let mut written = 0;

    for cy in visible.y..visible.y + visible.height as i32 {
        let by = (cy - area.y) as u32;
        for cx in visible.x..visible.x + visible.width as i32 {
            let bx = (cx - area.x) as u32;
            let [r, g, b, a] = bitmap.pixel(bx, by);
            if a == 0 {
                continue;
            }
            let dst = canvas.pixel_mut(cx as u32, cy as u32);
            if a == 255 {
                dst[ri] = r;
                dst[1] = g;
                dst[bi] = b;
            } else {
                let mix = |s: u8, d: u8| {
                    ((s as u32 * a as u32 + d as u32 * (255 - a as u32)) / 255) as u8
                };
                dst[ri] = mix(r, dst[ri]);
                dst[1] = mix(g, dst[1]);
                dst[bi] = mix(b, dst[bi]);
            }
            dst[3] = 255;
            written += 1;
        }
    }
    written
}

// ── Save-under ───────────────────────────────────────────────────

/// Canvas pixels hidden by the last cursor draw.
#[derive(Debug)]
struct SavedPatch {
    rect: Rect,
    pixels: Vec<u8>,
}

/// Draws the cursor while remembering what it covered.
///
/// The canvas is reused in place; a tick without a new frame must not
/// keep the previous cursor image. [`restore`](Self::restore) puts the
/// covered pixels back and runs before anything else touches the canvas.
#[derive(Debug, Default)]
pub struct CursorOverlay {
    saved: Option<SavedPatch>,
}

impl CursorOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a cursor is currently drawn on the canvas.
    pub fn is_drawn(&self) -> bool {
        self.saved.is_some()
    }

    /// Undo the last draw. No-op when nothing is drawn.
    pub fn restore(&mut self, canvas: &mut OutputCanvas) {
        if let Some(patch) = self.saved.take() {
            canvas.write_rect(patch.rect, &patch.pixels);
        }
    }

    /// Save the pixels under the cursor, then blend it.
    pub fn draw(
        &mut self,
        bitmap: &CursorBitmap,
        position: Point,
        canvas: &mut OutputCanvas,
        clip: Rect,
    ) -> usize {
        self.restore(canvas);
        let Some(rect) = footprint(bitmap, position)
            .intersect(&clip)
            .and_then(|r| r.intersect(&canvas.bounds()))
        else {
            return 0;
        };
        self.saved = Some(SavedPatch {
            rect,
            pixels: canvas.read_rect(rect),
        });
        blend_cursor(bitmap, position, canvas, clip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::types::PixelFormat;
    use crate::compose::canvas::Rgba;
    use crate::geometry::{SessionGeometry, Size};

    const UNCLIPPED: Rect = Rect::new(0, 0, 1 << 16, 1 << 16);

    fn solid(width: u32, height: u32, px: [u8; 4], hotspot: Point) -> CursorBitmap {
        CursorBitmap {
            width,
            height,
            hotspot,
            pixels: px.repeat((width * height) as usize),
            shape_id: 1,
        }
    }

    fn canvas(width: u32, height: u32) -> OutputCanvas {
        OutputCanvas::new(
            Size::new(width, height),
            PixelFormat::Bgra8,
            Rgba::new(0, 0, 0, 255),
        )
    }

    #[test]
    fn opaque_pixels_are_copied_at_hotspot_offset() {
        let mut c = canvas(8, 8);
        let bmp = solid(2, 2, [255, 0, 0, 255], Point::new(1, 1));
        let n = blend_cursor(&bmp, Point::new(4, 4), &mut c, UNCLIPPED);
        assert_eq!(n, 4);
        assert_eq!(c.rgba(3, 3), Some(Rgba::new(255, 0, 0, 255)));
        assert_eq!(c.rgba(4, 4), Some(Rgba::new(255, 0, 0, 255)));
        assert_eq!(c.rgba(5, 5), Some(Rgba::BLACK));
    }

    #[test]
    fn partial_alpha_uses_integer_blend() {
        let mut c = OutputCanvas::new(Size::new(1, 1), PixelFormat::Bgra8, Rgba::new(100, 100, 100, 0));
        let bmp = solid(1, 1, [200, 0, 255, 128], Point::default());
        blend_cursor(&bmp, Point::default(), &mut c, UNCLIPPED);
        // (200*128 + 100*127) / 255 = 150, (0 + 12700) / 255 = 49, (32640 + 12700) / 255 = 177
        assert_eq!(c.rgba(0, 0), Some(Rgba::new(150, 49, 177, 255)));
    }

    #[test]
    fn transparent_pixels_are_skipped() {
        let mut c = canvas(2, 2);
        let before = c.clone();
        let bmp = solid(2, 2, [255, 255, 255, 0], Point::default());
        assert_eq!(blend_cursor(&bmp, Point::default(), &mut c, UNCLIPPED), 0);
        assert_eq!(c, before);
    }

    #[test]
    fn extreme_hotspot_lands_off_canvas() {
        let mut c = canvas(4, 4);
        let before = c.clone();
        let bmp = solid(2, 2, [255, 255, 255, 255], Point::new(i32::MIN, i32::MIN));
        assert_eq!(blend_cursor(&bmp, Point::new(1, 1), &mut c, UNCLIPPED), 0);
        assert_eq!(c, before);

        let mut overlay = CursorOverlay::new();
        assert_eq!(overlay.draw(&bmp, Point::new(1, 1), &mut c, UNCLIPPED), 0);
        assert_eq!(c, before);
    }

    #[test]
    fn clip_protects_the_pad() {
        let mut c = canvas(16, 4);
        let render = Rect::new(0, 0, 12, 4);
        let bmp = solid(4, 4, [255, 255, 255, 255], Point::default());
        let n = blend_cursor(&bmp, Point::new(10, 0), &mut c, render);
        assert_eq!(n, 2 * 4);
        assert!(c.is_filled_with_pad(Rect::new(12, 0, 4, 4)));
    }

    #[test]
    fn pointer_at_source_right_edge_draws_nothing() {
        let g = SessionGeometry::new(
            Rect::new(0, 0, 1920, 1080),
            Rect::new(0, 0, 1440, 1080),
            Size::new(1920, 1080),
        )
        .unwrap();
        assert_eq!(g.scale_point(Point::new(1920, 0)).x, 1440);

        let mut c = OutputCanvas::new(g.output(), PixelFormat::Bgra8, Rgba::BLACK);
        let bmp = solid(4, 4, [255, 255, 255, 255], Point::default());
        // Mapped position lands on the render boundary; the clip rejects it.
        let n = blend_cursor(&bmp, g.scale_point(Point::new(1920, 0)), &mut c, g.render());
        assert_eq!(n, 0);
        assert!(c.is_filled_with_pad(c.bounds()));
    }

    #[test]
    fn negative_positions_are_clipped() {
        let mut c = canvas(4, 4);
        let bmp = solid(3, 3, [1, 2, 3, 255], Point::new(2, 2));
        assert_eq!(blend_cursor(&bmp, Point::new(0, 0), &mut c, UNCLIPPED), 1);
        assert_eq!(c.rgba(0, 0), Some(Rgba::new(1, 2, 3, 255)));
    }

    #[test]
    fn overlay_restores_what_it_covered() {
        let mut c = canvas(8, 8);
        let clean = c.clone();
        let bmp = solid(3, 3, [9, 9, 9, 200], Point::default());
        let mut overlay = CursorOverlay::new();

        assert_eq!(overlay.draw(&bmp, Point::new(2, 2), &mut c, UNCLIPPED), 9);
        let drawn = c.clone();
        assert_ne!(drawn, clean);

        // Same pointer on the next tick: restore + redraw is byte-identical.
        overlay.restore(&mut c);
        assert_eq!(c, clean);
        overlay.draw(&bmp, Point::new(2, 2), &mut c, UNCLIPPED);
        assert_eq!(c, drawn);

        // Moving the pointer leaves no trail.
        overlay.draw(&bmp, Point::new(5, 5), &mut c, UNCLIPPED);
        assert_eq!(c.rgba(2, 2), clean.rgba(2, 2));
        overlay.restore(&mut c);
        assert_eq!(c, clean);
        assert!(!overlay.is_drawn());
    }
}
