//! # pacer: the presentation loop
//!
//! [`MirrorSession`] owns the backend, canvas and cursor state and drives
//! them at a fixed cadence. [`PacerState`] tracks capture recovery;
//! [`SessionStats`] totals what each tick did.

pub mod session;
pub mod state;
pub mod stats;

pub use session::{MirrorSession, SessionConfig};
pub use state::PacerState;
pub use stats::SessionStats;
