//! Collaborators the session drives but does not own: the window the
//! canvas is shown in and the OS pointer.

use crate::capture::types::PointerState;
use crate::compose::canvas::OutputCanvas;
use crate::error::MirrorError;

/// Lifecycle signal from the presentation side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Continue,
    /// Window closed, quit hotkey or terminate request.
    Quit,
}

/// Where the finished canvas goes.
pub trait PresentationSurface {
    /// Show `canvas`. Failures are logged by the session and the loop
    /// keeps going.
    fn present(&mut self, canvas: &OutputCanvas) -> Result<(), MirrorError>;

    /// Drain pending window events.
    fn pump_events(&mut self) -> Lifecycle;
}

/// Current pointer position and visibility.
pub trait PointerSource {
    /// `None` when the position cannot be read this tick.
    fn poll(&mut self) -> Option<PointerState>;
}

impl<S: PresentationSurface + ?Sized> PresentationSurface for &mut S {
    fn present(&mut self, canvas: &OutputCanvas) -> Result<(), MirrorError> {
        (**self).present(canvas)
    }

    fn pump_events(&mut self) -> Lifecycle {
        (**self).pump_events()
    }
}

impl<P: PointerSource + ?Sized> PointerSource for &mut P {
    fn poll(&mut self) -> Option<PointerState> {
        (**self).poll()
    }
}
