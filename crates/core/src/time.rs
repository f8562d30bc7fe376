use chrono::{DateTime, Duration, SubsecRound, Utc};

/// A simple clock abstraction for deterministic time in services and tests.
///
/// Every timer in the services layer is a deadline compared against this
/// clock, so a `Fixed` clock plus `advance` drives debounce and autosave in
/// tests without sleeping.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Returns a clock that uses the current system time.
    #[must_use]
    pub fn default_clock() -> Self {
        Self::Default
    }

    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// Current time truncated to the millisecond precision timestamps are
    /// persisted with, so a saved entity reloads equal to itself.
    #[must_use]
    pub fn stamp(&self) -> DateTime<Utc> {
        self.now().trunc_subsecs(3)
    }

    /// Current time as integer epoch milliseconds.
    #[must_use]
    pub fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }

    /// The instant `delay` from now.
    #[must_use]
    pub fn deadline_after(&self, delay: Duration) -> DateTime<Utc> {
        self.now() + delay
    }

    /// If this is a fixed clock, advance it by the given duration.
    ///
    /// Has no effect on `Clock::Default`.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }

    /// Returns true if this clock is fixed.
    #[must_use]
    pub fn is_fixed(&self) -> bool {
        matches!(self, Clock::Fixed(_))
    }
}

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances_deadlines() {
        let mut clock = fixed_clock();
        let deadline = clock.deadline_after(Duration::milliseconds(300));
        clock.advance(Duration::milliseconds(299));
        assert!(clock.now() < deadline);
        clock.advance(Duration::milliseconds(1));
        assert_eq!(clock.now(), deadline);
        assert_eq!(clock.now_millis(), FIXED_TEST_TIMESTAMP * 1000 + 300);
    }

    #[test]
    fn stamp_drops_sub_millisecond_precision() {
        let clock = Clock::fixed(fixed_now() + Duration::nanoseconds(1_234_567));
        assert_eq!(clock.stamp(), fixed_now() + Duration::milliseconds(1));
    }

    #[test]
    fn default_clock_ignores_advance() {
        let mut clock = Clock::default_clock();
        clock.advance(Duration::days(365));
        assert!(!clock.is_fixed());
        assert!(clock.now() < Utc::now() + Duration::days(1));
    }
}
