//! Raw pointer-shape payloads → straight RGBA.

use crate::capture::types::{PointerShapeUpdate, ShapeKind};
use crate::cursor::CursorBitmap;
use crate::error::ShapeDecodeError;

/// Alpha used where the OS would invert the screen. A plain blend cannot
/// express XOR, so inverse pixels are drawn half-transparent.
pub const INVERSE_ALPHA: u8 = 128;

/// Decode a pointer-shape update into a drawable bitmap.
///
/// Pure: the same payload always yields the same bitmap.
pub fn decode(update: &PointerShapeUpdate) -> Result<CursorBitmap, ShapeDecodeError> {
    let (width, height) = (update.width, update.height);
    if width == 0 || height == 0 {
        return Err(ShapeDecodeError::InvalidDimensions { width, height });
    }

    let pixels = match update.kind {
        ShapeKind::Monochrome => {
            if height % 2 != 0 {
                return Err(ShapeDecodeError::InvalidDimensions { width, height });
            }
            check_layout(update, width.div_ceil(8), height)?;
            decode_monochrome(update)
        }
        ShapeKind::Color => {
            check_layout(update, color_row_bytes(width, height)?, height)?;
            decode_color(update, |a| a)
        }
        ShapeKind::MaskedColor => {
            check_layout(update, color_row_bytes(width, height)?, height)?;
            decode_color(update, |mask| if mask != 0 { INVERSE_ALPHA } else { 255 })
        }
    };

    let visible_height = match update.kind {
        ShapeKind::Monochrome => height / 2,
        _ => height,
    };

    let hotspot = update.hotspot;
    if !(0..width as i64).contains(&(hotspot.x as i64))
        || !(0..visible_height as i64).contains(&(hotspot.y as i64))
    {
        return Err(ShapeDecodeError::HotspotOutOfBounds {
            x: hotspot.x,
            y: hotspot.y,
            width,
            height: visible_height,
        });
    }

    Ok(CursorBitmap {
        width,
        height: visible_height,
        hotspot,
        pixels,
        shape_id: update.shape_id,
    })
}

/// Bytes in one BGRA row, or an error when the width cannot be addressed.
fn color_row_bytes(width: u32, height: u32) -> Result<u32, ShapeDecodeError> {
    width
        .checked_mul(4)
        .ok_or(ShapeDecodeError::InvalidDimensions { width, height })
}

/// Validate pitch against `row_bytes` and the buffer against `rows` rows.
fn check_layout(
    update: &PointerShapeUpdate,
    row_bytes: u32,
    rows: u32,
) -> Result<(), ShapeDecodeError> {
    if update.pitch < row_bytes {
        return Err(ShapeDecodeError::PitchTooSmall {
            pitch: update.pitch,
            width: update.width,
            min: row_bytes,
        });
    }
    let expected = (rows as usize - 1)
        .checked_mul(update.pitch as usize)
        .and_then(|n| n.checked_add(row_bytes as usize))
        .unwrap_or(usize::MAX);
    if update.data.len() < expected {
        return Err(ShapeDecodeError::Truncated {
            expected,
            actual: update.data.len(),
        });
    }
    Ok(())
}

fn decode_monochrome(update: &PointerShapeUpdate) -> Vec<u8> {
    let w = update.width as usize;
    let h = update.height as usize / 2;
    let pitch = update.pitch as usize;
    let xor_base = h * pitch;
    let bit = |offset: usize, x: usize| (update.data[offset + x / 8] >> (7 - (x % 8))) & 1;

    let mut out = Vec::with_capacity(w * h * 4);
    for y in 0..h {
        for x in 0..w {
            let and = bit(y * pitch, x);
            let xor = bit(xor_base + y * pitch, x);
            out.extend_from_slice(match (and, xor) {
                (0, 0) => &[0, 0, 0, 255],
                (0, _) => &[255, 255, 255, 255],
                (_, 0) => &[0, 0, 0, 0],
                _ => &[255, 255, 255, INVERSE_ALPHA],
            });
        }
    }
    out
}

/// BGRA rows → RGBA, with `alpha(fourth_byte)` deciding alpha.
fn decode_color(update: &PointerShapeUpdate, alpha: impl Fn(u8) -> u8) -> Vec<u8> {
    let w = update.width as usize;
    let h = update.height as usize;
    let pitch = update.pitch as usize;

    let mut out = Vec::with_capacity(w * h * 4);
    for row in (0..h).map(|y| &update.data[y * pitch..y * pitch + w * 4]) {
        for px in row.chunks_exact(4) {
            let (b, g, r) = (px[0], px[1], px[2]);
            out.extend_from_slice(&[r, g, b, alpha(px[3])]);
        }
    }
    out
}
