//! Running counters for one session.

use std::fmt;

use crate::flags::TickFlags;

/// Totals accumulated from tick reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionStats {
    pub ticks: u64,
    pub frames: u64,
    pub timeouts: u64,
    pub delegated: u64,
    pub device_losses: u64,
    pub recoveries: u64,
    pub shape_updates: u64,
    pub shape_failures: u64,
    pub cursor_draws: u64,
    pub presented: u64,
    pub present_failures: u64,
    /// Frames that arrived but could not be composited.
    pub frame_errors: u64,
}

impl SessionStats {
    /// Fold one tick's outcome into the totals.
    pub fn record(&mut self, flags: TickFlags) {
        self.ticks += 1;
        let count = |f: TickFlags| u64::from(flags.contains(f));
        self.frames += count(TickFlags::FRAME_COMPOSITED);
        self.timeouts += count(TickFlags::TIMEOUT);
        self.delegated += count(TickFlags::DELEGATED);
        self.device_losses += count(TickFlags::DEVICE_LOST);
        self.recoveries += count(TickFlags::RECOVERED);
        self.shape_updates += count(TickFlags::SHAPE_UPDATED);
        self.shape_failures += count(TickFlags::SHAPE_REJECTED);
        self.cursor_draws += count(TickFlags::CURSOR_DRAWN);
        self.presented += count(TickFlags::PRESENTED);
        self.present_failures += 1 - count(TickFlags::PRESENTED);
        self.frame_errors += count(TickFlags::FRAME_REJECTED);
    }
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ticks, {} frames ({} rejected), {} timeouts, {} delegated, \
             {} device losses ({} recovered), {} cursor shapes ({} rejected), \
             {} presented ({} failed)",
            self.ticks,
            self.frames,
            self.frame_errors,
            self.timeouts,
            self.delegated,
            self.device_losses,
            self.recoveries,
            self.shape_updates,
            self.shape_failures,
            self.presented,
            self.present_failures
        )
    }
}
