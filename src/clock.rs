//! Time sources for the flow controller
//!
//! Deadlines use a monotonic millisecond counter; working hours use local
//! wall-clock time. Tests drive both through [`ManualClock`].

use std::time::Instant;

use chrono::{Duration, Local, NaiveDateTime};
use parking_lot::Mutex;

pub trait Clock: Send + Sync {
    /// Monotonic milliseconds since an arbitrary origin
    fn now_ms(&self) -> u64;

    /// Local wall-clock time
    fn local_now(&self) -> NaiveDateTime;
}

/// Real time
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn local_now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock that only moves when told to
pub struct ManualClock {
    state: Mutex<(u64, NaiveDateTime)>,
}

impl ManualClock {
    pub fn new(local: NaiveDateTime) -> Self {
        Self {
            state: Mutex::new((0, local)),
        }
    }

    /// Move both the monotonic counter and the wall clock forward
    pub fn advance(&self, ms: u64) {
        let mut state = self.state.lock();
        state.0 += ms;
        state.1 += Duration::milliseconds(ms as i64);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.state.lock().0
    }

    fn local_now(&self) -> NaiveDateTime {
        self.state.lock().1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_manual_clock_advances_both() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 10)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();
        let clock = ManualClock::new(start);
        clock.advance(1500);
        assert_eq!(clock.now_ms(), 1500);
        assert_eq!(
            clock.local_now(),
            NaiveDate::from_ymd_opt(2026, 1, 11)
                .unwrap()
                .and_hms_milli_opt(0, 0, 0, 500)
                .unwrap()
        );
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
    }
}
