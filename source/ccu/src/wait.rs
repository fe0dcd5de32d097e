//! Bounded polling with exponential backoff, used for PLL lock waits.
use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// Something that can block the caller for a short time.
pub trait Delay {
    fn delay_us(&self, us: u32);
}

/// Busy-waits with `spin_loop` hints. Roughly calibrated; only the ordering of
/// polls matters for lock waits, not the precise interval.
#[derive(Copy, Clone, Debug, Default)]
pub struct SpinDelay {
    /// Spin iterations per microsecond.
    pub spins_per_us: u32,
}

impl SpinDelay {
    #[must_use]
    pub const fn new(spins_per_us: u32) -> Self {
        Self { spins_per_us }
    }
}

impl Delay for SpinDelay {
    fn delay_us(&self, us: u32) {
        for _ in 0..(us as u64 * self.spins_per_us as u64) {
            core::hint::spin_loop();
        }
    }
}

/// Sleeps the calling thread.
#[cfg(feature = "std")]
#[derive(Copy, Clone, Debug, Default)]
pub struct StdDelay;

#[cfg(feature = "std")]
impl Delay for StdDelay {
    fn delay_us(&self, us: u32) {
        std::thread::sleep(std::time::Duration::from_micros(us as u64));
    }
}

/// An exponential backoff, in microseconds.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ExpBackoff {
    min: u32,
    max: u32,
    cur: u32,
}

impl ExpBackoff {
    #[must_use]
    pub const fn new(min_us: u32) -> Self {
        Self {
            min: min_us,
            max: min_us,
            cur: min_us,
        }
    }

    #[must_use]
    pub const fn with_max(self, max_us: u32) -> Self {
        Self { max: max_us, ..self }
    }

    /// Wait until the current backoff period has elapsed, incrementing the
    /// backoff for the next call to `wait`.
    pub fn wait(&mut self, delay: &impl Delay) {
        tracing::trace!("backing off for {}us...", self.cur);
        let cur = self.cur;
        if self.cur < self.max {
            self.cur = self.cur.saturating_mul(2).min(self.max);
        }
        delay.delay_us(cur);
    }

    /// Reset the backoff to the `min` value.
    pub fn reset(&mut self) {
        self.cur = self.min;
    }

    pub fn current(&self) -> u32 {
        self.cur
    }
}

/// Lock-wait settings for PLL nodes.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LockWait {
    #[serde(default = "LockWait::default_max_polls")]
    pub max_polls: NonZeroU32,
    #[serde(default = "LockWait::default_min_backoff_us")]
    pub min_backoff_us: u32,
    #[serde(default = "LockWait::default_max_backoff_us")]
    pub max_backoff_us: u32,
}

impl LockWait {
    const fn default_max_polls() -> NonZeroU32 {
        match NonZeroU32::new(100) {
            Some(n) => n,
            None => unreachable!(),
        }
    }

    const fn default_min_backoff_us() -> u32 {
        5
    }

    const fn default_max_backoff_us() -> u32 {
        50
    }

    pub const DEFAULT: Self = Self {
        max_polls: Self::default_max_polls(),
        min_backoff_us: Self::default_min_backoff_us(),
        max_backoff_us: Self::default_max_backoff_us(),
    };

    /// Polls `check` until it returns `true` or `max_polls` checks have
    /// failed, backing off between checks.
    ///
    /// Returns the number of checks performed on success, `None` on timeout.
    pub fn poll(&self, delay: &impl Delay, mut check: impl FnMut() -> bool) -> Option<u32> {
        let mut backoff = ExpBackoff::new(self.min_backoff_us).with_max(self.max_backoff_us);
        for polls in 1..=self.max_polls.get() {
            if check() {
                if polls > 1 {
                    tracing::debug!(polls, "condition met after polling");
                }
                return Some(polls);
            }
            if polls < self.max_polls.get() {
                backoff.wait(delay);
            }
        }
        tracing::debug!(max = self.max_polls.get(), "maximum poll limit reached!");
        None
    }
}

impl Default for LockWait {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use core::cell::RefCell;

    use super::*;

    #[derive(Default)]
    struct RecordDelay(RefCell<alloc::vec::Vec<u32>>);

    impl Delay for RecordDelay {
        fn delay_us(&self, us: u32) {
            self.0.borrow_mut().push(us);
        }
    }

    #[test]
    fn backoff_doubles_up_to_max() {
        let delay = RecordDelay::default();
        let mut backoff = ExpBackoff::new(5).with_max(50);
        for _ in 0..6 {
            backoff.wait(&delay);
        }
        assert_eq!(*delay.0.borrow(), [5, 10, 20, 40, 50, 50]);
        backoff.reset();
        assert_eq!(backoff.current(), 5);
    }

    #[test]
    fn poll_succeeds_after_some_checks() {
        let delay = RecordDelay::default();
        let mut remaining = 3;
        let polls = LockWait::DEFAULT.poll(&delay, || {
            remaining -= 1;
            remaining == 0
        });
        assert_eq!(polls, Some(3));
        assert_eq!(delay.0.borrow().len(), 2);
    }

    #[test]
    fn poll_is_bounded() {
        let delay = RecordDelay::default();
        let wait = LockWait {
            max_polls: NonZeroU32::new(4).unwrap(),
            ..LockWait::DEFAULT
        };
        let mut checks = 0;
        assert_eq!(wait.poll(&delay, || {
            checks += 1;
            false
        }), None);
        assert_eq!(checks, 4);
        // no delay after the final failed check
        assert_eq!(delay.0.borrow().len(), 3);
    }
}
