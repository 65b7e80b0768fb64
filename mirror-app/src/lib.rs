//! # mirror-app
//!
//! The runnable shell around `mirror-core`: configuration, the Win32
//! host window, the GDI presentation surface and the timer resolution
//! guard. Everything here is one-time OS setup; the capture, compositing
//! and pacing logic lives in the core crate.

pub mod config;
pub mod display;
pub mod timer;
pub mod window;
