//! # mirror-core
//!
//! Capture, composite and present one display onto another.
//!
//! This crate contains:
//! - **Capture**: the `CaptureBackend` trait with Desktop Duplication, GDI
//!   blit and Magnification API implementations, scoped frame leases,
//!   the hide-during-capture decorator and monitor enumeration
//! - **Cursor**: pointer-shape decoding, the shape cache and the
//!   save-under cursor overlay
//! - **Compose**: the fixed-size output canvas and the bilinear frame
//!   compositor
//! - **Pacer**: `MirrorSession`, its state machine, tick flags and stats
//! - **Error**: `CaptureError`, `ShapeDecodeError` and `MirrorError`,
//!   `thiserror`-based
//!
//! Everything OS-specific is gated on `target_os = "windows"`; on other
//! platforms the backends fail at construction and the rest of the
//! pipeline runs against any `CaptureBackend`.

pub mod capture;
pub mod compose;
pub mod cursor;
pub mod error;
pub mod flags;
pub mod geometry;
pub mod pacer;
pub mod surface;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use capture::{
    Acquire, BackendFactory, BackendKind, BlitBackend, CaptureBackend, DuplicationBackend,
    FrameBuffer, FrameLease, HideDuringCapture, HostWindow, Lease, MagnifierBackend, MonitorInfo,
    PixelFormat, PointerShapeUpdate, PointerState, SelfVisibility, ShapeKind, SourceFrame,
    SystemPointer, acquire_scoped, enumerate_monitors,
};
pub use compose::{FrameCompositor, OutputCanvas, Rgba};
pub use cursor::{CursorBitmap, CursorCache, CursorOverlay, blend_cursor, decode};
pub use error::{CaptureError, MirrorError, ShapeDecodeError};
pub use flags::TickFlags;
pub use geometry::{Point, Rect, SessionGeometry, Size};
pub use pacer::{MirrorSession, PacerState, SessionConfig, SessionStats};
pub use surface::{Lifecycle, PointerSource, PresentationSurface};
