//! Domain-specific error types for the mirroring pipeline.
//!
//! Three layers, from the leaves up:
//!
//! - [`CaptureError`]: what a capture backend reports from `acquire`.
//! - [`ShapeDecodeError`]: a pointer-shape payload that cannot be decoded.
//! - [`MirrorError`]: session-level failures returned to the caller.
//!
//! Per-tick failures are absorbed inside the session loop; only the
//! `FatalInit` and `FatalCapture` variants ever end a session.

use std::time::Duration;
use thiserror::Error;

use crate::capture::BackendKind;

// ── CaptureError ─────────────────────────────────────────────────

/// Errors reported by a [`CaptureBackend`](crate::capture::CaptureBackend).
#[derive(Debug, Error)]
pub enum CaptureError {
    /// No new frame arrived within the wait window.
    #[error("no frame within {0:?}")]
    Timeout(Duration),

    /// The OS invalidated the capture resource (mode change, session
    /// lock, secure desktop). The backend must be recreated.
    #[error("capture device lost: {0}")]
    DeviceLost(String),

    /// The backend cannot run on this platform or display.
    #[error("{kind} capture is not supported: {reason}")]
    Unsupported {
        kind: BackendKind,
        reason: &'static str,
    },

    /// Any other OS call failure.
    #[error("capture backend error: {0}")]
    Backend(String),
}

impl CaptureError {
    /// Returns `true` when the backend has to be destroyed and rebuilt.
    pub fn is_device_lost(&self) -> bool {
        matches!(self, Self::DeviceLost(_))
    }
}

// ── ShapeDecodeError ─────────────────────────────────────────────

/// A pointer-shape payload that does not match its declared layout.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShapeDecodeError {
    /// Width or height is zero, a monochrome height is odd, or a row
    /// does not fit in addressable memory.
    #[error("invalid cursor dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// Row pitch is too small for the declared width.
    #[error("pitch {pitch} too small for width {width} (need {min})")]
    PitchTooSmall { pitch: u32, width: u32, min: u32 },

    /// Buffer ends before the last declared row.
    #[error("shape buffer truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// Hotspot lies outside the visible shape.
    #[error("hotspot ({x}, {y}) outside {width}x{height} cursor")]
    HotspotOutOfBounds { x: i32, y: i32, width: u32, height: u32 },
}

// ── MirrorError ──────────────────────────────────────────────────

/// The canonical session-level error.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// The capture backend or presentation surface could not be created.
    #[error("initialisation failed: {0}")]
    FatalInit(String),

    /// Capture was lost and the single recreation attempt failed.
    #[error("capture could not be recovered: {0}")]
    FatalCapture(#[source] CaptureError),

    /// Configuration values are inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A captured frame does not cover the configured source rectangle.
    #[error("frame {frame_width}x{frame_height} does not cover source rect {rect}")]
    FrameGeometry {
        frame_width: u32,
        frame_height: u32,
        rect: crate::geometry::Rect,
    },

    /// Handing the canvas to the presentation surface failed.
    #[error("present failed: {0}")]
    Present(String),

    /// A capture backend error that is not device loss.
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// Cursor payload could not be decoded.
    #[error(transparent)]
    ShapeDecode(#[from] ShapeDecodeError),

    /// A pacer state transition was requested from the wrong state.
    #[error("invalid state transition: {0}")]
    InvalidTransition(&'static str),

    /// I/O failure (configuration files, console output).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MirrorError {
    /// Whether this error ends the session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::FatalInit(_) | Self::FatalCapture(_))
    }
}
