//! # capture: source display acquisition
//!
//! One capability, three interchangeable strategies:
//!
//! | Backend                | Module        | Frames                          |
//! |------------------------|---------------|---------------------------------|
//! | Desktop Duplication    | `duplication` | blocking acquire, GPU copy      |
//! | GDI blit               | `blit`        | immediate copy of the live desk |
//! | Magnification service  | `magnifier`   | none, OS composites directly    |
//!
//! The session only sees [`CaptureBackend`]. Successful acquisitions are
//! wrapped in a [`FrameLease`] that releases the frame when dropped, so
//! no exit path can leave the duplication queue starved.

pub mod blit;
pub mod duplication;
pub mod hide;
pub mod magnifier;
pub mod monitors;
pub mod pointer;
pub mod types;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CaptureError;
use crate::geometry::Rect;

pub use blit::BlitBackend;
pub use duplication::DuplicationBackend;
pub use hide::{HideDuringCapture, SelfVisibility};
pub use magnifier::MagnifierBackend;
pub use monitors::{MonitorInfo, enumerate_monitors, monitor_bounds};
pub use pointer::SystemPointer;
pub use types::{
    FrameBuffer, PixelFormat, PointerShapeUpdate, PointerState, ShapeKind, SourceFrame,
};

// ── BackendKind ──────────────────────────────────────────────────

/// Which capture strategy a session uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// DXGI Desktop Duplication.
    #[default]
    Duplication,
    /// GDI `BitBlt` of the screen DC.
    Blit,
    /// Magnification API; scaling and cursor done by the OS.
    Magnifier,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Duplication => "duplication",
            Self::Blit => "blit",
            Self::Magnifier => "magnifier",
        })
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "duplication" | "dxgi" => Ok(Self::Duplication),
            "blit" | "gdi" => Ok(Self::Blit),
            "magnifier" | "mag" => Ok(Self::Magnifier),
            other => Err(format!("unknown capture backend: {other}")),
        }
    }
}

/// Opaque handle of the presentation window, for backends that need to
/// attach to it (magnifier child control, hide-during-capture).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostWindow(pub isize);

// ── CaptureBackend ───────────────────────────────────────────────

/// Successful outcome of [`CaptureBackend::acquire`].
///
/// A timeout is reported as [`CaptureError::Timeout`]; callers treat it
/// as "present the previous canvas again".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    /// A new frame is held by the backend until [`CaptureBackend::release`].
    Frame,
    /// The OS presents continuously; nothing to composite.
    Delegated,
}

/// A capture strategy.
pub trait CaptureBackend {
    fn kind(&self) -> BackendKind;

    /// Wait up to `timeout` for a new frame. A zero timeout polls.
    fn acquire(&mut self, timeout: Duration) -> Result<Acquire, CaptureError>;

    /// The frame held since the last successful `acquire`.
    fn frame(&self) -> Option<SourceFrame<'_>>;

    /// Pending pointer-shape change observed during the last acquire.
    fn pointer_shape_update(&mut self) -> Option<PointerShapeUpdate>;

    /// Give the held frame back. Idempotent.
    fn release(&mut self);

    /// Point the backend at a new source rectangle. Only meaningful for
    /// backends that keep one (the magnifier).
    fn set_source_rect(&mut self, _rect: Rect) -> Result<(), CaptureError> {
        Ok(())
    }
}

impl<B: CaptureBackend + ?Sized> CaptureBackend for Box<B> {
    fn kind(&self) -> BackendKind {
        (**self).kind()
    }

    fn acquire(&mut self, timeout: Duration) -> Result<Acquire, CaptureError> {
        (**self).acquire(timeout)
    }

    fn frame(&self) -> Option<SourceFrame<'_>> {
        (**self).frame()
    }

    fn pointer_shape_update(&mut self) -> Option<PointerShapeUpdate> {
        (**self).pointer_shape_update()
    }

    fn release(&mut self) {
        (**self).release()
    }

    fn set_source_rect(&mut self, rect: Rect) -> Result<(), CaptureError> {
        (**self).set_source_rect(rect)
    }
}

// ── Scoped acquisition ───────────────────────────────────────────

/// Result of [`acquire_scoped`].
pub enum Lease<'a> {
    Frame(FrameLease<'a>),
    Delegated,
}

/// A held frame. Dropping the lease releases it.
pub struct FrameLease<'a> {
    backend: &'a mut dyn CaptureBackend,
}

impl FrameLease<'_> {
    /// The leased frame. `None` only if the backend misreported success.
    pub fn frame(&self) -> Option<SourceFrame<'_>> {
        self.backend.frame()
    }

    /// Pointer-shape change that arrived with this frame.
    pub fn take_pointer_shape(&mut self) -> Option<PointerShapeUpdate> {
        self.backend.pointer_shape_update()
    }
}

impl Drop for FrameLease<'_> {
    fn drop(&mut self) {
        self.backend.release();
    }
}

/// Acquire a frame and tie its release to the returned lease.
pub fn acquire_scoped(
    backend: &mut dyn CaptureBackend,
    timeout: Duration,
) -> Result<Lease<'_>, CaptureError> {
    match backend.acquire(timeout)? {
        Acquire::Frame => Ok(Lease::Frame(FrameLease { backend })),
        Acquire::Delegated => Ok(Lease::Delegated),
    }
}

// ── BackendFactory ───────────────────────────────────────────────

/// Builds a fresh backend at startup and after device loss.
pub trait BackendFactory {
    fn create(&mut self) -> Result<Box<dyn CaptureBackend>, CaptureError>;
}

impl<F> BackendFactory for F
where
    F: FnMut() -> Result<Box<dyn CaptureBackend>, CaptureError>,
{
    fn create(&mut self) -> Result<Box<dyn CaptureBackend>, CaptureError> {
        self()
    }
}

// ── Tests ────────────────────────────────────────────────────────
