//! The mirroring session: one backend, one canvas, one tick loop.
//!
//! Per tick:
//!
//! 1. Put back the pixels the previous cursor covered.
//! 2. Acquire from the backend under a [`FrameLease`](crate::capture::FrameLease);
//!    composite the frame and decode any pointer-shape change.
//! 3. On device loss, rebuild the backend once. Failure ends the session.
//! 4. Blend the cursor, clipped to the render rectangle.
//! 5. Present, then sleep for the rest of the frame interval.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::capture::types::PixelFormat;
use crate::capture::{BackendFactory, BackendKind, CaptureBackend, Lease, acquire_scoped};
use crate::compose::{FrameCompositor, OutputCanvas, Rgba};
use crate::cursor::{CursorCache, CursorOverlay};
use crate::error::{CaptureError, MirrorError};
use crate::flags::TickFlags;
use crate::geometry::SessionGeometry;
use crate::pacer::state::PacerState;
use crate::pacer::stats::SessionStats;
use crate::surface::{Lifecycle, PointerSource, PresentationSurface};

// ── SessionConfig ────────────────────────────────────────────────

/// Immutable parameters of one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub geometry: SessionGeometry,
    /// Channel order of the canvas handed to the surface.
    pub format: PixelFormat,
    pub pad_color: Rgba,
    /// Target time between tick starts.
    pub frame_interval: Duration,
    /// Longest a tick may block in `acquire`. Zero polls.
    pub acquire_timeout: Duration,
    /// Draw the pointer into the canvas.
    pub cursor_enabled: bool,
}

impl SessionConfig {
    /// 60 Hz.
    pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_micros(16_667);

    pub fn new(geometry: SessionGeometry) -> Self {
        Self {
            geometry,
            format: PixelFormat::Bgra8,
            pad_color: Rgba::BLACK,
            frame_interval: Self::DEFAULT_FRAME_INTERVAL,
            acquire_timeout: Duration::ZERO,
            cursor_enabled: true,
        }
    }

    fn validate(&self) -> Result<(), MirrorError> {
        if self.frame_interval.is_zero() {
            return Err(MirrorError::Config("frame interval must be positive".into()));
        }
        Ok(())
    }
}

// ── MirrorSession ────────────────────────────────────────────────

/// Owns every piece of per-session state.
///
/// # Lifetime
///
/// Build with [`new`](Self::new), then either drive ticks yourself with
/// [`tick`](Self::tick) or hand control to [`run`](Self::run), which paces
/// ticks until quit or a fatal capture failure.
pub struct MirrorSession<F> {
    config: SessionConfig,
    factory: F,
    /// `None` only between dropping a lost backend and its replacement.
    backend: Option<Box<dyn CaptureBackend>>,
    compositor: FrameCompositor,
    canvas: OutputCanvas,
    cursor: CursorCache,
    overlay: CursorOverlay,
    state: PacerState,
    stats: SessionStats,
    recreations: u64,
}

impl<F: BackendFactory> MirrorSession<F> {
    /// Build the first backend and the canvas.
    ///
    /// Any failure here is a [`MirrorError::FatalInit`].
    pub fn new(config: SessionConfig, mut factory: F) -> Result<Self, MirrorError> {
        config
            .validate()
            .map_err(|e| MirrorError::FatalInit(e.to_string()))?;
        let backend = Self::build_backend(&mut factory, &config.geometry)
            .map_err(|e| MirrorError::FatalInit(format!("capture backend: {e}")))?;

        let canvas = OutputCanvas::new(config.geometry.output(), config.format, config.pad_color);
        info!(
            backend = %backend.kind(),
            source = %config.geometry.source(),
            render = %config.geometry.render(),
            output_width = canvas.width(),
            output_height = canvas.height(),
            "mirror session created"
        );

        Ok(Self {
            compositor: FrameCompositor::new(config.geometry),
            canvas,
            config,
            factory,
            backend: Some(backend),
            cursor: CursorCache::new(),
            overlay: CursorOverlay::new(),
            state: PacerState::Running,
            stats: SessionStats::default(),
            recreations: 0,
        })
    }

    fn build_backend(
        factory: &mut F,
        geometry: &SessionGeometry,
    ) -> Result<Box<dyn CaptureBackend>, CaptureError> {
        let mut backend = factory.create()?;
        backend.set_source_rect(geometry.source())?;
        Ok(backend)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn canvas(&self) -> &OutputCanvas {
        &self.canvas
    }

    pub fn state(&self) -> PacerState {
        self.state
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Backend rebuilds attempted after device loss.
    pub fn recreations(&self) -> u64 {
        self.recreations
    }

    pub fn backend_kind(&self) -> Option<BackendKind> {
        self.backend.as_ref().map(|b| b.kind())
    }

    // ── Tick ─────────────────────────────────────────────────────

    /// Run one capture → composite → cursor → present cycle.
    ///
    /// Per-tick problems are logged and reported through the returned
    /// flags. Only a failed recovery returns an error.
    pub fn tick(
        &mut self,
        surface: &mut dyn PresentationSurface,
        pointer: &mut dyn PointerSource,
    ) -> Result<TickFlags, MirrorError> {
        if self.state.is_stopped() {
            return Err(MirrorError::InvalidTransition("session is stopped"));
        }

        self.overlay.restore(&mut self.canvas);
        let mut flags = TickFlags::empty();

        match self.capture(&mut flags) {
            Ok(()) => {}
            Err(CaptureError::Timeout(_)) => flags |= TickFlags::TIMEOUT,
            Err(e) if e.is_device_lost() => {
                flags |= TickFlags::DEVICE_LOST;
                self.recover(e)?;
                flags |= TickFlags::RECOVERED;
            }
            Err(e) => {
                warn!(error = %e, "capture failed");
                flags |= TickFlags::FRAME_REJECTED;
            }
        }

        if self.config.cursor_enabled && !flags.contains(TickFlags::DELEGATED) {
            self.draw_cursor(pointer, &mut flags);
        }

        match surface.present(&self.canvas) {
            Ok(()) => flags |= TickFlags::PRESENTED,
            Err(e) => warn!(error = %e, "present failed"),
        }

        self.stats.record(flags);
        trace!(?flags, "tick");
        Ok(flags)
    }

    /// Acquire, composite and pick up pointer-shape changes. The frame is
    /// released when the lease goes out of scope.
    fn capture(&mut self, flags: &mut TickFlags) -> Result<(), CaptureError> {
        let Some(backend) = self.backend.as_deref_mut() else {
            return Err(CaptureError::DeviceLost("no capture backend".into()));
        };

        match acquire_scoped(backend, self.config.acquire_timeout)? {
            Lease::Delegated => *flags |= TickFlags::DELEGATED,
            Lease::Frame(mut lease) => {
                if let Some(update) = lease.take_pointer_shape() {
                    match self.cursor.update(&update) {
                        Ok(true) => *flags |= TickFlags::SHAPE_UPDATED,
                        Ok(false) => {}
                        Err(_) => *flags |= TickFlags::SHAPE_REJECTED,
                    }
                }

                match lease.frame() {
                    Some(frame) => match self.compositor.composite(&frame, &mut self.canvas) {
                        Ok(()) => *flags |= TickFlags::FRAME_COMPOSITED,
                        Err(e) => {
                            warn!(error = %e, "frame rejected");
                            *flags |= TickFlags::FRAME_REJECTED;
                        }
                    },
                    None => {
                        warn!("backend reported a frame but holds none");
                        *flags |= TickFlags::FRAME_REJECTED;
                    }
                }
            }
        }
        Ok(())
    }

    /// Replace a lost backend. One attempt; failure stops the session.
    fn recover(&mut self, cause: CaptureError) -> Result<(), MirrorError> {
        warn!(error = %cause, "capture device lost, recreating backend");
        self.state.begin_recovery()?;
        self.recreations += 1;

        // Release the old duplication before asking for a new one.
        self.backend = None;

        match Self::build_backend(&mut self.factory, &self.config.geometry) {
            Ok(backend) => {
                info!(backend = %backend.kind(), "capture recovered");
                self.backend = Some(backend);
                self.state.finish_recovery()?;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "capture recovery failed");
                self.state.stop()?;
                Err(MirrorError::FatalCapture(e))
            }
        }
    }

    fn draw_cursor(&mut self, pointer: &mut dyn PointerSource, flags: &mut TickFlags) {
        let Some(state) = pointer.poll() else {
            return;
        };
        if !state.visible {
            return;
        }
        let geometry = &self.config.geometry;
        let (Some(position), Some(bitmap)) =
            (geometry.map_pointer(state.position), self.cursor.current())
        else {
            return;
        };
        if self
            .overlay
            .draw(bitmap, position, &mut self.canvas, geometry.render())
            > 0
        {
            *flags |= TickFlags::CURSOR_DRAWN;
        }
    }

    // ── Loop ─────────────────────────────────────────────────────

    /// Tick at the configured cadence until quit or fatal failure.
    ///
    /// Quit is observed at the top of every tick: a [`Lifecycle::Quit`]
    /// from the surface or a cancelled `cancel` token. Returns the final
    /// statistics.
    pub async fn run<S, P>(
        &mut self,
        surface: &mut S,
        pointer: &mut P,
        cancel: CancellationToken,
    ) -> Result<SessionStats, MirrorError>
    where
        S: PresentationSurface,
        P: PointerSource,
    {
        let interval = self.config.frame_interval;
        info!(interval_ms = interval.as_secs_f64() * 1000.0, "presentation loop started");

        let outcome = loop {
            let tick_start = Instant::now();

            if cancel.is_cancelled() {
                debug!("cancellation requested");
                break Ok(());
            }
            if surface.pump_events() == Lifecycle::Quit {
                debug!("surface requested quit");
                break Ok(());
            }

            if let Err(e) = self.tick(surface, pointer) {
                break Err(e);
            }

            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = Self::pace(tick_start, interval) => {}
            }
        };

        if let Some(backend) = self.backend.as_mut() {
            backend.release();
        }
        if !self.state.is_stopped() {
            self.state.stop()?;
        }

        match &outcome {
            Ok(()) => info!(stats = %self.stats, "presentation loop ended"),
            Err(e) => error!(error = %e, stats = %self.stats, "presentation loop aborted"),
        }
        outcome.map(|()| self.stats)
    }

    /// Sleep for the remainder of the frame interval.
    async fn pace(tick_start: Instant, interval: Duration) {
        let elapsed = tick_start.elapsed();
        if elapsed < interval {
            tokio::time::sleep(interval - elapsed).await;
        }
    }
}
