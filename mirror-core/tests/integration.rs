//! Integration tests: full sessions against scripted backends, surfaces
//! and pointers.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use mirror_core::{
    Acquire, BackendKind, CaptureBackend, CaptureError, FrameBuffer, Lifecycle, MirrorError,
    MirrorSession, OutputCanvas, PacerState, PixelFormat, Point, PointerShapeUpdate,
    PointerSource, PointerState, PresentationSurface, Rect, Rgba, SessionConfig,
    SessionGeometry, ShapeKind, Size, SourceFrame, TickFlags,
};
use tokio_util::sync::CancellationToken;

// ── Helpers ──────────────────────────────────────────────────────

/// What the scripted backend does on the next acquire.
#[derive(Debug, Clone, Copy)]
enum Step {
    /// A frame filled with this value.
    Frame(u8),
    Timeout,
    Lost,
    Delegated,
}

/// State shared by every backend instance a factory builds.
#[derive(Default)]
struct Shared {
    script: VecDeque<Step>,
    /// Step used once the script runs dry.
    fallback: Option<Step>,
    created: usize,
    acquired_frames: usize,
    releases: usize,
    held: bool,
    /// Shape handed out with the next frame.
    shape: Option<PointerShapeUpdate>,
    /// Factory calls after this many creations fail.
    max_creations: Option<usize>,
}

type SharedRef = Rc<RefCell<Shared>>;

struct ScriptedBackend {
    shared: SharedRef,
    buffer: FrameBuffer,
    held: bool,
}

impl CaptureBackend for ScriptedBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Duplication
    }

    fn acquire(&mut self, timeout: Duration) -> Result<Acquire, CaptureError> {
        self.release();
        let step = {
            let mut s = self.shared.borrow_mut();
            let fallback = s.fallback.unwrap_or(Step::Timeout);
            s.script.pop_front().unwrap_or(fallback)
        };
        match step {
            Step::Frame(v) => {
                self.buffer.data.fill(v);
                self.held = true;
                let mut s = self.shared.borrow_mut();
                s.acquired_frames += 1;
                s.held = true;
                Ok(Acquire::Frame)
            }
            Step::Timeout => Err(CaptureError::Timeout(timeout)),
            Step::Lost => Err(CaptureError::DeviceLost("DXGI_ERROR_ACCESS_LOST".into())),
            Step::Delegated => Ok(Acquire::Delegated),
        }
    }

    fn frame(&self) -> Option<SourceFrame<'_>> {
        self.held.then(|| self.buffer.as_frame())
    }

    fn pointer_shape_update(&mut self) -> Option<PointerShapeUpdate> {
        self.shared.borrow_mut().shape.take()
    }

    fn release(&mut self) {
        if self.held {
            self.held = false;
            let mut s = self.shared.borrow_mut();
            s.releases += 1;
            s.held = false;
        }
    }
}

type Factory = Box<dyn FnMut() -> Result<Box<dyn CaptureBackend>, CaptureError>>;

fn factory(shared: &SharedRef, size: Size) -> Factory {
    let shared = Rc::clone(shared);
    Box::new(move || {
        let mut s = shared.borrow_mut();
        if s.max_creations.is_some_and(|max| s.created >= max) {
            return Err(CaptureError::Backend("DuplicateOutput failed".into()));
        }
        s.created += 1;
        Ok(Box::new(ScriptedBackend {
            shared: Rc::clone(&shared),
            buffer: FrameBuffer::new(size.width, size.height, PixelFormat::Bgra8, Point::default()),
            held: false,
        }) as Box<dyn CaptureBackend>)
    })
}

/// Records presented canvases and quits after `quit_after` presents.
struct RecordingSurface {
    presents: usize,
    quit_after: usize,
    last: Option<OutputCanvas>,
}

impl RecordingSurface {
    fn new(quit_after: usize) -> Self {
        Self {
            presents: 0,
            quit_after,
            last: None,
        }
    }
}

impl PresentationSurface for RecordingSurface {
    fn present(&mut self, canvas: &OutputCanvas) -> Result<(), MirrorError> {
        self.presents += 1;
        self.last = Some(canvas.clone());
        Ok(())
    }

    fn pump_events(&mut self) -> Lifecycle {
        if self.presents >= self.quit_after {
            Lifecycle::Quit
        } else {
            Lifecycle::Continue
        }
    }
}

struct MovablePointer(Option<PointerState>);

impl MovablePointer {
    fn at(x: i32, y: i32) -> Self {
        Self(Some(PointerState {
            position: Point::new(x, y),
            visible: true,
        }))
    }

    fn move_to(&mut self, x: i32, y: i32) {
        self.0 = Some(PointerState {
            position: Point::new(x, y),
            visible: true,
        });
    }
}

impl PointerSource for MovablePointer {
    fn poll(&mut self) -> Option<PointerState> {
        self.0
    }
}

/// 2×2 opaque white cursor with its hotspot at the top-left.
fn white_cursor(shape_id: u64) -> PointerShapeUpdate {
    PointerShapeUpdate {
        kind: ShapeKind::Color,
        width: 2,
        height: 2,
        pitch: 8,
        hotspot: Point::new(0, 0),
        shape_id,
        data: vec![255; 16],
    }
}

/// 32×18 source into a 24×18 render rect on a 32×18 canvas: the same
/// 4:3-in-16:9 layout as 1920×1080 → 1440×1080, scaled down.
fn small_geometry() -> SessionGeometry {
    SessionGeometry::new(
        Rect::new(0, 0, 32, 18),
        Rect::new(0, 0, 24, 18),
        Size::new(32, 18),
    )
    .unwrap()
}

fn pad_rect() -> Rect {
    Rect::new(24, 0, 8, 18)
}

fn session_with(steps: &[Step], fallback: Option<Step>) -> (MirrorSession<Factory>, SharedRef) {
    let shared: SharedRef = Rc::default();
    {
        let mut s = shared.borrow_mut();
        s.script = steps.iter().copied().collect();
        s.fallback = fallback;
        s.shape = Some(white_cursor(1));
    }
    let geometry = small_geometry();
    let session = MirrorSession::new(
        SessionConfig::new(geometry),
        factory(&shared, geometry.source().size()),
    )
    .unwrap();
    (session, shared)
}

// ── Pacing ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_600_ticks_hold_the_target_interval() {
    let (mut session, _shared) = session_with(&[], Some(Step::Frame(40)));
    let mut surface = RecordingSurface::new(600);
    let mut pointer = MovablePointer::at(5, 5);

    let start = tokio::time::Instant::now();
    let stats = session
        .run(&mut surface, &mut pointer, CancellationToken::new())
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(stats.ticks, 600);
    assert_eq!(surface.presents, 600);
    let average = elapsed / 600;
    let target = SessionConfig::DEFAULT_FRAME_INTERVAL;
    let drift = average.abs_diff(target);
    assert!(
        drift <= Duration::from_millis(2),
        "average tick {average:?} vs target {target:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_interrupts_the_sleep() {
    let (mut session, _shared) = session_with(&[], Some(Step::Timeout));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let stats = session
        .run(
            &mut RecordingSurface::new(usize::MAX),
            &mut MovablePointer(None),
            cancel,
        )
        .await
        .unwrap();

    // Six ticks start before the 100 ms mark; the sleep after the sixth
    // is cut short.
    assert_eq!(stats.ticks, 6);
    assert_eq!(stats.timeouts, 6);
    assert_eq!(session.state(), PacerState::Stopped);
}

// ── Resilience ───────────────────────────────────────────────────

#[test]
fn test_device_loss_presents_unchanged_canvas_and_recreates_once() {
    let (mut session, shared) = session_with(&[Step::Frame(90), Step::Lost], Some(Step::Frame(90)));
    let mut surface = RecordingSurface::new(usize::MAX);
    let mut pointer = MovablePointer::at(8, 8);

    let first = session.tick(&mut surface, &mut pointer).unwrap();
    assert!(first.contains(TickFlags::FRAME_COMPOSITED | TickFlags::CURSOR_DRAWN));
    let before = session.canvas().clone();

    let flags = session.tick(&mut surface, &mut pointer).unwrap();
    assert!(flags.contains(TickFlags::DEVICE_LOST | TickFlags::RECOVERED | TickFlags::PRESENTED));
    assert!(!flags.contains(TickFlags::FRAME_COMPOSITED));
    assert_eq!(session.canvas(), &before);
    assert_eq!(surface.last.as_ref(), Some(&before));
    assert_eq!(session.recreations(), 1);
    assert_eq!(shared.borrow().created, 2);
    assert_eq!(session.state(), PacerState::Running);

    // The replacement backend keeps mirroring.
    let next = session.tick(&mut surface, &mut pointer).unwrap();
    assert!(next.contains(TickFlags::FRAME_COMPOSITED));
}

#[test]
fn test_failed_recovery_stops_the_session() {
    let (mut session, shared) = session_with(&[Step::Frame(10), Step::Lost], None);
    shared.borrow_mut().max_creations = Some(1);
    let mut surface = RecordingSurface::new(usize::MAX);
    let mut pointer = MovablePointer(None);

    session.tick(&mut surface, &mut pointer).unwrap();
    let err = session.tick(&mut surface, &mut pointer).unwrap_err();
    assert!(matches!(err, MirrorError::FatalCapture(_)));
    assert!(err.is_fatal());
    assert_eq!(session.state(), PacerState::Stopped);
    assert_eq!(session.recreations(), 1);
    assert_eq!(surface.presents, 1);

    // A stopped session refuses further ticks.
    assert!(session.tick(&mut surface, &mut pointer).is_err());
}

#[tokio::test(start_paused = true)]
async fn test_run_returns_fatal_capture() {
    let (mut session, shared) = session_with(&[Step::Frame(10), Step::Lost], None);
    shared.borrow_mut().max_creations = Some(1);

    let result = session
        .run(
            &mut RecordingSurface::new(usize::MAX),
            &mut MovablePointer(None),
            CancellationToken::new(),
        )
        .await;
    assert!(matches!(result, Err(MirrorError::FatalCapture(_))));
    assert_eq!(session.state(), PacerState::Stopped);
}

// ── Canvas invariants ────────────────────────────────────────────

#[test]
fn test_pad_and_dimensions_survive_many_ticks() {
    let steps: Vec<Step> = (0..60u8)
        .map(|i| match i % 4 {
            0 | 1 => Step::Frame(i.wrapping_mul(37)),
            2 => Step::Timeout,
            _ => Step::Lost,
        })
        .collect();
    let (mut session, _shared) = session_with(&steps, None);
    let mut surface = RecordingSurface::new(usize::MAX);
    let mut pointer = MovablePointer::at(0, 0);

    let size = session.canvas().size();
    assert!(session.canvas().is_filled_with_pad(pad_rect()));

    for i in 0..60 {
        // Sweep the pointer across the whole source, right edge included.
        pointer.move_to((i * 7) % 33, (i * 3) % 18);
        session.tick(&mut surface, &mut pointer).unwrap();
        assert_eq!(session.canvas().size(), size);
        assert!(session.canvas().is_filled_with_pad(pad_rect()), "pad touched at tick {i}");
    }
    assert_eq!(session.stats().ticks, 60);
}

#[test]
fn test_timeout_reuses_canvas_without_stale_cursor() {
    let (mut session, _shared) = session_with(&[Step::Frame(50), Step::Timeout], None);
    let mut surface = RecordingSurface::new(usize::MAX);
    let mut pointer = MovablePointer::at(4, 4);

    session.tick(&mut surface, &mut pointer).unwrap();
    // 4 * 24 / 32 = 3
    assert_eq!(session.canvas().rgba(3, 4), Some(Rgba::new(255, 255, 255, 255)));

    pointer.move_to(16, 8);
    let flags = session.tick(&mut surface, &mut pointer).unwrap();
    assert!(flags.contains(TickFlags::TIMEOUT | TickFlags::CURSOR_DRAWN | TickFlags::PRESENTED));
    assert_eq!(session.canvas().rgba(3, 4), Some(Rgba::new(50, 50, 50, 255)));
    assert_eq!(session.canvas().rgba(12, 8), Some(Rgba::new(255, 255, 255, 255)));
}

#[test]
fn test_delegated_backend_leaves_canvas_to_the_os() {
    let (mut session, shared) = session_with(&[], Some(Step::Delegated));
    let mut surface = RecordingSurface::new(usize::MAX);
    let mut pointer = MovablePointer::at(4, 4);

    let flags = session.tick(&mut surface, &mut pointer).unwrap();
    assert!(flags.contains(TickFlags::DELEGATED | TickFlags::PRESENTED));
    assert!(!flags.intersects(TickFlags::FRAME_COMPOSITED | TickFlags::CURSOR_DRAWN));
    assert!(session.canvas().is_filled_with_pad(session.canvas().bounds()));
    assert_eq!(shared.borrow().acquired_frames, 0);
}

#[test]
fn test_reference_geometry_right_edge_pointer() {
    let geometry = SessionGeometry::new(
        Rect::new(0, 0, 1920, 1080),
        Rect::new(0, 0, 1440, 1080),
        Size::new(1920, 1080),
    )
    .unwrap();
    let shared: SharedRef = Rc::default();
    {
        let mut s = shared.borrow_mut();
        s.script = [Step::Frame(0)].into_iter().collect();
        s.shape = Some(white_cursor(3));
    }
    let mut session = MirrorSession::new(
        SessionConfig::new(geometry),
        factory(&shared, geometry.source().size()),
    )
    .unwrap();

    let flags = session
        .tick(&mut RecordingSurface::new(usize::MAX), &mut MovablePointer::at(1920, 0))
        .unwrap();
    assert!(flags.contains(TickFlags::SHAPE_UPDATED));
    assert!(!flags.contains(TickFlags::CURSOR_DRAWN));
    assert!(session.canvas().is_filled_with_pad(Rect::new(1440, 0, 480, 1080)));
}

// ── Frame release ────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_quit_leaves_no_frame_held() {
    let (mut session, shared) = session_with(&[], Some(Step::Frame(1)));
    let mut surface = RecordingSurface::new(5);

    session
        .run(&mut surface, &mut MovablePointer(None), CancellationToken::new())
        .await
        .unwrap();

    let s = shared.borrow();
    assert!(!s.held);
    assert_eq!(s.acquired_frames, 5);
    assert_eq!(s.releases, 5);
}

#[test]
fn test_rejected_shape_keeps_previous_cursor() {
    let (mut session, shared) = session_with(&[Step::Frame(0), Step::Frame(0)], None);
    let mut surface = RecordingSurface::new(usize::MAX);
    let mut pointer = MovablePointer::at(4, 4);

    session.tick(&mut surface, &mut pointer).unwrap();
    let mut broken = white_cursor(2);
    broken.data.truncate(3);
    shared.borrow_mut().shape = Some(broken);

    let flags = session.tick(&mut surface, &mut pointer).unwrap();
    assert!(flags.contains(TickFlags::SHAPE_REJECTED | TickFlags::CURSOR_DRAWN));
    assert_eq!(session.canvas().rgba(3, 4), Some(Rgba::new(255, 255, 255, 255)));
    assert_eq!(session.stats().shape_failures, 1);
}
