//! # Timestamps
//!
//! Monotonic microseconds since a decoder-chosen epoch.
//!
//! The interpolation math wants plain numbers it can subtract and divide,
//! and the tests want to drive time by hand, so timestamps are a thin
//! newtype rather than [`std::time::Instant`]. [`Timestamp::ZERO`] doubles
//! as "never set".

use std::ops::{Add, Sub};
use std::time::{Duration, Instant};

/// A point on the decoder's monotonic clock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The unset timestamp.
    pub const ZERO: Self = Self(0);

    /// Creates a timestamp from raw microseconds.
    #[inline]
    #[must_use]
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    /// Creates a timestamp from milliseconds.
    #[inline]
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis.saturating_mul(1_000))
    }

    /// Time elapsed between `epoch` and `now`, as a timestamp.
    ///
    /// Clamped to at least one microsecond so a reading taken at the epoch
    /// itself is never mistaken for "unset".
    #[must_use]
    pub fn since(epoch: Instant, now: Instant) -> Self {
        let micros = now.saturating_duration_since(epoch).as_micros();
        Self(u64::try_from(micros).unwrap_or(u64::MAX).max(1))
    }

    /// Raw microseconds.
    #[inline]
    #[must_use]
    pub const fn as_micros(self) -> u64 {
        self.0
    }

    /// Returns true for [`Timestamp::ZERO`].
    #[inline]
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Microseconds from `earlier` to `self`, zero if `earlier` is later.
    #[inline]
    #[must_use]
    pub const fn saturating_micros_since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<Duration> for Timestamp {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self {
        let micros = u64::try_from(rhs.as_micros()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(micros))
    }
}

impl Sub for Timestamp {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Duration {
        Duration::from_micros(self.0.saturating_sub(rhs.0))
    }
}
