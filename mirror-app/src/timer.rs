//! Process-wide timer resolution.
//!
//! The default Windows timer tick is about 15.6 ms, which is coarser than
//! a 60 Hz frame. Raising it to 1 ms lets the pacer's sleeps land on time.

/// Holds a raised timer resolution until dropped.
pub struct TimerResolution {
    period_ms: u32,
}

impl TimerResolution {
    pub fn period_ms(&self) -> u32 {
        self.period_ms
    }
}

#[cfg(target_os = "windows")]
mod platform {
    use tracing::{debug, warn};
    use windows::Win32::Media::{TIMERR_NOERROR, timeBeginPeriod, timeEndPeriod};

    use super::TimerResolution;

    impl TimerResolution {
        /// Request `period_ms` resolution. `None` if the OS refuses.
        pub fn raise(period_ms: u32) -> Option<Self> {
            let rc = unsafe { timeBeginPeriod(period_ms) };
            if rc != TIMERR_NOERROR {
                warn!(period_ms, rc, "timeBeginPeriod refused");
                return None;
            }
            debug!(period_ms, "timer resolution raised");
            Some(Self { period_ms })
        }
    }

    impl Drop for TimerResolution {
        fn drop(&mut self) {
            unsafe {
                timeEndPeriod(self.period_ms);
            }
        }
    }
}

#[cfg(not(target_os = "windows"))]
impl TimerResolution {
    /// Other platforms already sleep with fine granularity.
    pub fn raise(_period_ms: u32) -> Option<Self> {
        None
    }
}
