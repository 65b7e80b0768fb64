//! deskmirror entry point.
//!
//! ```text
//! deskmirror                      Mirror with defaults
//! deskmirror --config <path>      Use custom config TOML
//! deskmirror --backend blit       Override the capture backend
//! deskmirror --source 1           Override the source monitor
//! deskmirror --list-monitors      Print attached displays and exit
//! deskmirror --gen-config         Dump default config and exit
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use mirror_core::capture::monitor_bounds;
use mirror_core::{
    BackendKind, BlitBackend, CaptureBackend, CaptureError, DuplicationBackend, HostWindow,
    MagnifierBackend, MirrorSession, Rect, SessionGeometry, SystemPointer, enumerate_monitors,
};

use mirror_app::config::MirrorConfig;
use mirror_app::display::GdiPresenter;
use mirror_app::timer::TimerResolution;
use mirror_app::window::{MirrorWindow, WindowOptions, enable_dpi_awareness};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "deskmirror", about = "Mirror one display onto another")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "deskmirror.toml")]
    config: PathBuf,

    /// Capture backend (overrides config): duplication, blit or magnifier.
    #[arg(short, long)]
    backend: Option<BackendKind>,

    /// Source monitor index (overrides config).
    #[arg(short, long)]
    source: Option<u32>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    /// Print the attached monitors and exit.
    #[arg(long)]
    list_monitors: bool,
}

// ── Backends ─────────────────────────────────────────────────────

type BoxedBackend = Box<dyn CaptureBackend>;

/// Build the factory the session calls at startup and after device loss.
fn backend_factory(
    kind: BackendKind,
    source_index: u32,
    host: HostWindow,
    geometry: SessionGeometry,
    excluded: bool,
) -> impl FnMut() -> Result<BoxedBackend, CaptureError> {
    move || -> Result<BoxedBackend, CaptureError> {
        match kind {
            BackendKind::Duplication => Ok(Box::new(DuplicationBackend::new(source_index)?)),
            BackendKind::Blit => blit_backend(geometry.source(), host, excluded),
            BackendKind::Magnifier => Ok(Box::new(MagnifierBackend::new(host, &geometry)?)),
        }
    }
}

/// A blit of the desktop sees the mirror window unless the compositor
/// excludes it, so fall back to hiding the window around each copy.
#[cfg(target_os = "windows")]
fn blit_backend(source: Rect, host: HostWindow, excluded: bool) -> Result<BoxedBackend, CaptureError> {
    use mirror_core::HideDuringCapture;
    use mirror_core::capture::hide::WindowVisibility;

    let blit = BlitBackend::new(source)?;
    if excluded {
        Ok(Box::new(blit))
    } else {
        debug!("window not excluded from capture; hiding it during blits");
        Ok(Box::new(HideDuringCapture::new(blit, WindowVisibility::new(host))))
    }
}

#[cfg(not(target_os = "windows"))]
fn blit_backend(source: Rect, _host: HostWindow, _excluded: bool) -> Result<BoxedBackend, CaptureError> {
    Ok(Box::new(BlitBackend::new(source)?))
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&MirrorConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    enable_dpi_awareness();

    if cli.list_monitors {
        for monitor in enumerate_monitors()? {
            println!("{monitor}");
        }
        return Ok(());
    }

    let mut config = MirrorConfig::load(&cli.config);
    if let Some(kind) = cli.backend {
        config.capture.backend = kind;
    }
    if let Some(index) = cli.source {
        config.capture.source_index = index;
        // A rect written for the old monitor would be wrong for the new one.
        config.capture.source_rect = None;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("deskmirror v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Resolve geometry ─────────────────────────────────────

    let monitors = enumerate_monitors().unwrap_or_else(|e| {
        warn!("monitor enumeration failed: {e}");
        Vec::new()
    });
    for monitor in &monitors {
        debug!("display {monitor}");
    }

    let source_bounds = monitor_bounds(&monitors, config.capture.source_index as usize);
    let session_config = config.to_session_config(source_bounds)?;
    let geometry = session_config.geometry;

    let present_bounds = monitor_bounds(&monitors, config.output.present_index as usize)
        .unwrap_or_else(|| Rect::from_size(geometry.output()));
    info!(
        backend = %config.capture.backend,
        source = %geometry.source(),
        present = %present_bounds,
        "mirroring display {} onto display {}",
        config.capture.source_index,
        config.output.present_index,
    );

    // ── 2. Host window and surface ──────────────────────────────

    let window = MirrorWindow::create(&WindowOptions::new(present_bounds))?;
    let excluded = config.capture.exclude_from_capture && window.exclude_from_capture();
    if config.capture.exclude_from_capture && !excluded {
        warn!("capture exclusion unavailable on this system");
    }
    let host = window.host();
    let mut surface = GdiPresenter::new(window);

    let _timer = TimerResolution::raise(1);

    // ── 3. Session ──────────────────────────────────────────────

    let factory = backend_factory(
        config.capture.backend,
        config.capture.source_index,
        host,
        geometry,
        excluded,
    );
    let mut session = MirrorSession::new(session_config, factory)?;
    let mut pointer = SystemPointer::new()?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received");
            ctrl_c.cancel();
        }
    });

    // ── 4. Run ──────────────────────────────────────────────────

    let stats = session.run(&mut surface, &mut pointer, cancel).await?;
    info!(recreations = session.recreations(), "shut down cleanly: {stats}");

    Ok(())
}
