//! # compose: building the output canvas
//!
//! The canvas is allocated once with the pad color. Each tick the
//! [`FrameCompositor`] rewrites the render rectangle from the latest
//! frame; the cursor layer lives in [`crate::cursor`].

pub mod canvas;
pub mod frame;

pub use canvas::{OutputCanvas, Rgba};
pub use frame::FrameCompositor;
