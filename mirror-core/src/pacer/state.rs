//! Pacer state machine.
//!
//! Transitions are validated and return `Result` instead of panicking.

use std::fmt;

use crate::error::MirrorError;

/// Where the presentation loop is in its lifecycle.
///
/// ```text
///  Running ──► RecoveringCapture ──► Running
///     │               │
///     ▼               ▼
///  Stopped ◄──────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PacerState {
    /// Ticking normally.
    #[default]
    Running,

    /// The capture device was lost; the backend is being rebuilt.
    RecoveringCapture,

    /// Terminal. Quit was requested or recovery failed.
    Stopped,
}

impl fmt::Display for PacerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Running => "Running",
            Self::RecoveringCapture => "RecoveringCapture",
            Self::Stopped => "Stopped",
        })
    }
}

impl PacerState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Device loss observed.
    ///
    /// Valid from: `Running`.
    pub fn begin_recovery(&mut self) -> Result<(), MirrorError> {
        match self {
            Self::Running => {
                *self = Self::RecoveringCapture;
                Ok(())
            }
            _ => Err(MirrorError::InvalidTransition(
                "cannot recover: not in Running state",
            )),
        }
    }

    /// The replacement backend is up.
    ///
    /// Valid from: `RecoveringCapture`.
    pub fn finish_recovery(&mut self) -> Result<(), MirrorError> {
        match self {
            Self::RecoveringCapture => {
                *self = Self::Running;
                Ok(())
            }
            _ => Err(MirrorError::InvalidTransition(
                "cannot finish recovery: not in RecoveringCapture state",
            )),
        }
    }

    /// Quit, or recovery failed.
    ///
    /// Valid from: `Running`, `RecoveringCapture`.
    pub fn stop(&mut self) -> Result<(), MirrorError> {
        match self {
            Self::Running | Self::RecoveringCapture => {
                *self = Self::Stopped;
                Ok(())
            }
            Self::Stopped => Err(MirrorError::InvalidTransition("already stopped")),
        }
    }
}
