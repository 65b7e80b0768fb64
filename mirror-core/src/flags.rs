//! Per-tick outcome bits.

use bitflags::bitflags;

bitflags! {
    /// What happened during one session tick.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TickFlags: u16 {
        /// A new source frame was scaled into the canvas.
        const FRAME_COMPOSITED = 1 << 0;
        /// The backend had nothing new; the previous canvas was reused.
        const TIMEOUT          = 1 << 1;
        /// The OS draws the mirror itself (magnifier).
        const DELEGATED        = 1 << 2;
        /// A pointer-shape change was decoded into the cache.
        const SHAPE_UPDATED    = 1 << 3;
        /// A pointer-shape payload failed to decode.
        const SHAPE_REJECTED   = 1 << 4;
        /// The cursor overlay touched at least one canvas pixel.
        const CURSOR_DRAWN     = 1 << 5;
        /// The surface accepted the canvas.
        const PRESENTED        = 1 << 6;
        /// The capture device was lost during this tick.
        const DEVICE_LOST      = 1 << 7;
        /// The backend was rebuilt after a loss.
        const RECOVERED        = 1 << 8;
        /// A frame arrived but could not be composited, or the backend
        /// failed without losing the device.
        const FRAME_REJECTED   = 1 << 9;
    }
}

impl TickFlags {
    /// Whether the canvas content changed under the cursor layer.
    pub fn has_new_frame(self) -> bool {
        self.contains(Self::FRAME_COMPOSITED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovery_tick_bits() {
        let f = TickFlags::DEVICE_LOST | TickFlags::RECOVERED | TickFlags::PRESENTED;
        assert!(!f.has_new_frame());
        assert!(f.contains(TickFlags::RECOVERED));
        assert!(!f.contains(TickFlags::TIMEOUT));
    }
}
