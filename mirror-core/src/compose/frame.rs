//! Source frame → render rectangle, bilinear.
//!
//! Sample positions and weights depend only on the session geometry, so
//! both axes are tabulated once. Weights are 8-bit fixed point; the
//! per-pixel work is integer only.

use tracing::debug;

use crate::capture::types::{PixelFormat, SourceFrame};
use crate::compose::canvas::OutputCanvas;
use crate::error::MirrorError;
use crate::geometry::{Rect, SessionGeometry};

const ONE: u32 = 256;

/// One destination column or row: the two source taps and the weight of
/// the second one, in 1/256.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Tap {
    i0: u32,
    i1: u32,
    w1: u32,
}

/// Pixel-center aligned taps for `dst` outputs sampling `src` inputs.
fn build_taps(src: u32, dst: u32) -> Vec<Tap> {
    let (src, dst) = (src as u64, dst as u64);
    (0..dst)
        .map(|d| {
            // ((d + 0.5) * src / dst - 0.5) in 1/256 units
            let pos = ((2 * d + 1) * src * ONE as u64 / (2 * dst)).saturating_sub(ONE as u64 / 2);
            let i0 = (pos / ONE as u64) as u32;
            let w1 = (pos % ONE as u64) as u32;
            let last = src as u32 - 1;
            if i0 >= last {
                Tap {
                    i0: last,
                    i1: last,
                    w1: 0,
                }
            } else {
                Tap { i0, i1: i0 + 1, w1 }
            }
        })
        .collect()
}

/// Scales the source rectangle of each frame into the render rectangle.
#[derive(Debug, Clone)]
pub struct FrameCompositor {
    geometry: SessionGeometry,
    xs: Vec<Tap>,
    ys: Vec<Tap>,
}

impl FrameCompositor {
    pub fn new(geometry: SessionGeometry) -> Self {
        let source = geometry.source();
        let render = geometry.render();
        let xs = build_taps(source.width, render.width);
        let ys = build_taps(source.height, render.height);
        debug!(%source, %render, "frame sample tables built");
        Self { geometry, xs, ys }
    }

    pub fn geometry(&self) -> &SessionGeometry {
        &self.geometry
    }

    /// Locate the source rectangle inside `frame`, in frame pixels.
    fn crop(&self, frame: &SourceFrame<'_>) -> Result<(u32, u32), MirrorError> {
        let source = self.geometry.source();
        let bounds = Rect::new(frame.origin.x, frame.origin.y, frame.width, frame.height);
        if !frame.is_well_formed() || !bounds.contains_rect(&source) {
            return Err(MirrorError::FrameGeometry {
                frame_width: frame.width,
                frame_height: frame.height,
                rect: source,
            });
        }
        Ok((
            (source.x as i64 - frame.origin.x as i64) as u32,
            (source.y as i64 - frame.origin.y as i64) as u32,
        ))
    }

    /// Write the scaled source into the canvas's render rectangle.
    ///
    /// Pixels outside the render rectangle are never touched. The output
    /// is opaque and in the canvas's channel order.
    pub fn composite(
        &self,
        frame: &SourceFrame<'_>,
        canvas: &mut OutputCanvas,
    ) -> Result<(), MirrorError> {
        if canvas.size() != self.geometry.output() {
            return Err(MirrorError::Config(format!(
                "canvas {}x{} does not match session output {}x{}",
                canvas.width(),
                canvas.height(),
                self.geometry.output().width,
                self.geometry.output().height
            )));
        }
        let (cx, cy) = self.crop(frame)?;
        let render = self.geometry.render();
        let swap = frame.format != canvas.format();
        let stride = canvas.stride();
        let bpp = PixelFormat::BYTES_PER_PIXEL;
        let data = canvas.data_mut();

        for (dy, ty) in self.ys.iter().enumerate() {
            let row0 = frame.row(cy + ty.i0);
            let row1 = frame.row(cy + ty.i1);
            let out_start = (render.y as usize + dy) * stride + render.x as usize * bpp;
            let out = &mut data[out_start..out_start + render.width as usize * bpp];

            for (tx, dst) in self.xs.iter().zip(out.chunks_exact_mut(bpp)) {
                let a = (cx + tx.i0) as usize * bpp;
                let b = (cx + tx.i1) as usize * bpp;
                for c in 0..3 {
                    let top = row0[a + c] as u32 * (ONE - tx.w1) + row0[b + c] as u32 * tx.w1;
                    let bottom = row1[a + c] as u32 * (ONE - tx.w1) + row1[b + c] as u32 * tx.w1;
                    let v = (top * (ONE - ty.w1) + bottom * ty.w1 + ONE * ONE / 2) / (ONE * ONE);
                    let out_c = if swap && c != 1 { 2 - c } else { c };
                    dst[out_c] = v as u8;
                }
                dst[3] = 255;
            }
        }
        Ok(())
    }
}
