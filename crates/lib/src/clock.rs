//! Time provider abstraction
//!
//! The write path stamps `modified` from a [`Clock`] and every read derives its
//! expiry horizon from one, so tests can pin both to exact values.
//!
//! # Example
//!
//! ```
//! use weavestore::{Clock, SystemClock};
//!
//! let clock = SystemClock;
//! let now = clock.now();
//! assert!(now.as_secs() > 0);
//! ```

use std::fmt::Debug;
use std::time::{SystemTime, UNIX_EPOCH};

#[cfg(any(test, feature = "testing"))]
use std::sync::Mutex;

use crate::entity::Timestamp;

/// A time provider for getting current timestamps.
pub trait Clock: Send + Sync + Debug {
    /// Returns the current time as milliseconds since Unix epoch.
    fn now_millis(&self) -> i64;

    /// Current time as a [`Timestamp`].
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.now_millis())
    }
}

/// Production clock using real system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

/// Test clock with auto-advancing time.
///
/// Every `now_millis()` call returns the current value and then advances it by
/// one millisecond, so consecutive writes get distinct `modified` stamps. Use
/// `hold()` to freeze it, or `set()` to jump to an exact instant.
///
/// # Example
///
/// ```
/// use weavestore::{Clock, FixedClock};
///
/// let clock = FixedClock::new(1000);
/// let t1 = clock.now_millis();
/// let t2 = clock.now_millis();
/// assert!(t2 > t1);
///
/// {
///     let _hold = clock.hold();
///     assert_eq!(clock.now_millis(), clock.now_millis());
/// }
/// ```
#[cfg(any(test, feature = "testing"))]
pub struct FixedClock {
    state: Mutex<FixedClockState>,
}

#[cfg(any(test, feature = "testing"))]
struct FixedClockState {
    millis: i64,
    held: bool,
}

/// RAII guard that freezes a [`FixedClock`] while held.
#[cfg(any(test, feature = "testing"))]
pub struct ClockHold<'a>(&'a FixedClock);

#[cfg(any(test, feature = "testing"))]
impl Drop for ClockHold<'_> {
    fn drop(&mut self) {
        self.0.state.lock().unwrap().held = false;
    }
}

#[cfg(any(test, feature = "testing"))]
impl FixedClock {
    /// Create a new fixed clock with the given initial time in milliseconds.
    pub fn new(millis: i64) -> Self {
        Self {
            state: Mutex::new(FixedClockState {
                millis,
                held: false,
            }),
        }
    }

    /// Create a clock starting at a whole number of seconds.
    pub fn at_secs(secs: i64) -> Self {
        Self::new(secs.saturating_mul(1000))
    }

    /// Hold the clock, preventing auto-advance until the guard is dropped.
    pub fn hold(&self) -> ClockHold<'_> {
        self.state.lock().unwrap().held = true;
        ClockHold(self)
    }

    /// Advance the clock by the given number of milliseconds.
    pub fn advance(&self, ms: i64) {
        self.state.lock().unwrap().millis += ms;
    }

    /// Set the clock to a specific time in milliseconds.
    pub fn set(&self, ms: i64) {
        self.state.lock().unwrap().millis = ms;
    }

    /// Set the clock to a whole number of seconds.
    pub fn set_secs(&self, secs: i64) {
        self.set(secs.saturating_mul(1000));
    }

    /// Get the current time without advancing (even if not held).
    pub fn get(&self) -> i64 {
        self.state.lock().unwrap().millis
    }
}

#[cfg(any(test, feature = "testing"))]
impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        let mut state = self.state.lock().unwrap();
        if state.held {
            state.millis
        } else {
            let t = state.millis;
            state.millis += 1;
            t
        }
    }
}

#[cfg(any(test, feature = "testing"))]
impl Default for FixedClock {
    fn default() -> Self {
        // 2024-01-01 00:00:00 UTC
        Self::new(1_704_067_200_000)
    }
}

#[cfg(any(test, feature = "testing"))]
impl Debug for FixedClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().unwrap();
        f.debug_struct("FixedClock")
            .field("millis", &state.millis)
            .field("held", &state.held)
            .finish()
    }
}
