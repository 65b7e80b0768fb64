//! Mirror configuration file.

use std::path::Path;
use std::time::Duration;

use mirror_core::{BackendKind, MirrorError, Rect, Rgba, SessionConfig, SessionGeometry, Size};
use serde::{Deserialize, Serialize};

/// Top-level configuration for `deskmirror`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// What to capture and how.
    pub capture: CaptureConfig,
    /// Output canvas layout and placement.
    pub output: OutputConfig,
    /// Presentation cadence.
    pub timing: TimingConfig,
    /// Pointer overlay.
    pub cursor: CursorConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Monitor to mirror, as listed by `--list-monitors`.
    pub source_index: u32,
    /// Region of the desktop to capture. Defaults to the bounds of
    /// `source_index`.
    pub source_rect: Option<Rect>,
    /// Capture strategy.
    pub backend: BackendKind,
    /// Longest a tick may wait for a new frame. 0 polls.
    pub acquire_timeout_ms: u64,
    /// Keep the mirror window out of screen captures.
    pub exclude_from_capture: bool,
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Canvas width.
    pub width: u32,
    /// Canvas height.
    pub height: u32,
    /// Where the scaled source lands inside the canvas.
    pub render_rect: Rect,
    /// Letterbox colour, RGBA.
    pub pad_color: Rgba,
    /// Monitor the mirror window covers.
    pub present_index: u32,
}

/// Timing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Target time between frames, in milliseconds.
    pub target_frame_interval_ms: f64,
}

/// Cursor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CursorConfig {
    /// Draw the pointer into the mirror.
    pub enabled: bool,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive.
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source_index: 0,
            source_rect: None,
            backend: BackendKind::Duplication,
            acquire_timeout_ms: 0,
            exclude_from_capture: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            render_rect: Rect::new(0, 0, 1440, 1080),
            pad_color: Rgba::BLACK,
            present_index: 0,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            target_frame_interval_ms: 16.667,
        }
    }
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl MirrorConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Validate and convert into the session's immutable parameters.
    ///
    /// `monitor_rect` stands in for `capture.source_rect` when the file
    /// leaves it out.
    pub fn to_session_config(&self, monitor_rect: Option<Rect>) -> Result<SessionConfig, MirrorError> {
        let source = self
            .capture
            .source_rect
            .or(monitor_rect)
            .ok_or_else(|| {
                MirrorError::FatalInit(format!(
                    "no source rect configured and monitor {} not found",
                    self.capture.source_index
                ))
            })?;

        let interval_ms = self.timing.target_frame_interval_ms;
        if !interval_ms.is_finite() || interval_ms <= 0.0 {
            return Err(MirrorError::FatalInit(format!(
                "target_frame_interval_ms must be positive, got {interval_ms}"
            )));
        }

        let geometry = SessionGeometry::new(
            source,
            self.output.render_rect,
            Size::new(self.output.width, self.output.height),
        )
        .map_err(|e| MirrorError::FatalInit(e.to_string()))?;

        let mut config = SessionConfig::new(geometry);
        config.pad_color = self.output.pad_color;
        config.frame_interval = Duration::try_from_secs_f64(interval_ms / 1000.0).map_err(|e| {
            MirrorError::FatalInit(format!("target_frame_interval_ms {interval_ms}: {e}"))
        })?;
        config.acquire_timeout = Duration::from_millis(self.capture.acquire_timeout_ms);
        config.cursor_enabled = self.cursor.enabled;
        Ok(config)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let text = toml::to_string_pretty(&MirrorConfig::default()).unwrap();
        assert!(text.contains("[capture]"));
        assert!(text.contains("backend = \"duplication\""));
        assert!(text.contains("render_rect"));
        assert!(text.contains("target_frame_interval_ms"));
    }

    #[test]
    fn roundtrip_config() {
        let text = toml::to_string_pretty(&MirrorConfig::default()).unwrap();
        let parsed: MirrorConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.output.width, 1920);
        assert_eq!(parsed.output.render_rect, Rect::new(0, 0, 1440, 1080));
        assert_eq!(parsed.output.pad_color, Rgba::BLACK);
        assert!(parsed.capture.source_rect.is_none());
        assert!(parsed.cursor.enabled);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let parsed: MirrorConfig = toml::from_str(
            r#"
            [capture]
            backend = "blit"
            source_rect = { x = -1920, y = 0, width = 1920, height = 1080 }

            [output]
            pad_color = [16, 32, 48, 255]
            "#,
        )
        .unwrap();
        assert_eq!(parsed.capture.backend, BackendKind::Blit);
        assert_eq!(parsed.capture.source_rect, Some(Rect::new(-1920, 0, 1920, 1080)));
        assert_eq!(parsed.output.pad_color, Rgba::new(16, 32, 48, 255));
        assert_eq!(parsed.output.height, 1080);
        assert_eq!(parsed.logging.level, "info");
    }

    #[test]
    fn converts_to_session_config() {
        let mut cfg = MirrorConfig::default();
        cfg.capture.acquire_timeout_ms = 5;
        cfg.cursor.enabled = false;
        let session = cfg
            .to_session_config(Some(Rect::new(0, 0, 2560, 1440)))
            .unwrap();
        assert_eq!(session.geometry.source(), Rect::new(0, 0, 2560, 1440));
        assert_eq!(session.acquire_timeout, Duration::from_millis(5));
        let drift = session.frame_interval.abs_diff(Duration::from_micros(16_667));
        assert!(drift < Duration::from_micros(1));
        assert!(!session.cursor_enabled);
    }

    #[test]
    fn explicit_source_rect_wins() {
        let mut cfg = MirrorConfig::default();
        cfg.capture.source_rect = Some(Rect::new(100, 100, 800, 600));
        let session = cfg
            .to_session_config(Some(Rect::new(0, 0, 1920, 1080)))
            .unwrap();
        assert_eq!(session.geometry.source(), Rect::new(100, 100, 800, 600));
    }

    #[test]
    fn invalid_geometry_is_fatal_init() {
        let mut cfg = MirrorConfig::default();
        cfg.output.render_rect = Rect::new(600, 0, 1440, 1080);
        let err = cfg
            .to_session_config(Some(Rect::new(0, 0, 1920, 1080)))
            .unwrap_err();
        assert!(matches!(err, MirrorError::FatalInit(_)));

        let err = MirrorConfig::default().to_session_config(None).unwrap_err();
        assert!(matches!(err, MirrorError::FatalInit(_)));

        let mut cfg = MirrorConfig::default();
        cfg.timing.target_frame_interval_ms = 0.0;
        assert!(cfg.to_session_config(Some(Rect::new(0, 0, 1920, 1080))).is_err());

        cfg.timing.target_frame_interval_ms = 1e300;
        let err = cfg
            .to_session_config(Some(Rect::new(0, 0, 1920, 1080)))
            .unwrap_err();
        assert!(matches!(err, MirrorError::FatalInit(_)));
    }
}
