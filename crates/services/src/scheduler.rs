//! Cancellable deadline timers.
//!
//! A `Debouncer` holds at most one pending task. Re-arming replaces the task
//! and bumps a generation counter, so a handle obtained from an earlier `arm`
//! can never fire a superseded payload. Nothing here sleeps: callers poll with
//! the current time from their `Clock`.

use chrono::{DateTime, Duration, Utc};

/// Identifies one arming of a `Debouncer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskHandle {
    generation: u64,
}

#[derive(Debug, Clone)]
struct Pending<T> {
    generation: u64,
    deadline: DateTime<Utc>,
    payload: T,
}

#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    generation: u64,
    pending: Option<Pending<T>>,
}

impl<T> Debouncer<T> {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: 0,
            pending: None,
        }
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedules `payload` to become due `delay` after `now`, discarding any
    /// task that has not fired yet.
    pub fn arm(&mut self, payload: T, now: DateTime<Utc>) -> TaskHandle {
        self.generation += 1;
        self.pending = Some(Pending {
            generation: self.generation,
            deadline: now + self.delay,
            payload,
        });
        TaskHandle {
            generation: self.generation,
        }
    }

    /// Drops the pending task, returning its payload.
    ///
    /// Outstanding handles become stale.
    pub fn cancel(&mut self) -> Option<T> {
        self.generation += 1;
        self.pending.take().map(|p| p.payload)
    }

    /// Takes the pending payload if its deadline has passed.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Option<T> {
        let due = matches!(&self.pending, Some(p) if p.deadline <= now);
        if due { self.take_now() } else { None }
    }

    /// Fires the task identified by `handle`.
    ///
    /// Returns `None` when the handle was superseded or cancelled, or when the
    /// deadline has not been reached.
    pub fn fire(&mut self, handle: TaskHandle, now: DateTime<Utc>) -> Option<T> {
        let current = matches!(&self.pending, Some(p) if p.generation == handle.generation);
        if current { self.take_due(now) } else { None }
    }

    /// Takes the pending payload regardless of its deadline.
    pub fn take_now(&mut self) -> Option<T> {
        self.pending.take().map(|p| p.payload)
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    #[must_use]
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    #[must_use]
    pub fn pending_payload(&self) -> Option<&T> {
        self.pending.as_ref().map(|p| &p.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashcards_core::time::fixed_now;

    fn ms(n: i64) -> Duration {
        Duration::milliseconds(n)
    }

    #[test]
    fn rapid_arms_coalesce_to_last_payload() {
        let t0 = fixed_now();
        let mut d = Debouncer::new(ms(300));
        d.arm("h", t0);
        d.arm("ho", t0 + ms(100));
        d.arm("hol", t0 + ms(200));

        assert_eq!(d.take_due(t0 + ms(300)), None);
        assert_eq!(d.take_due(t0 + ms(500)), Some("hol"));
        assert!(!d.is_pending());
    }

    #[test]
    fn superseded_handle_never_fires() {
        let t0 = fixed_now();
        let mut d = Debouncer::new(ms(300));
        let stale = d.arm("old", t0);
        let fresh = d.arm("new", t0);

        assert_eq!(d.fire(stale, t0 + ms(1000)), None);
        assert_eq!(d.fire(fresh, t0 + ms(1000)), Some("new"));
    }

    #[test]
    fn cancelled_handle_never_fires() {
        let t0 = fixed_now();
        let mut d = Debouncer::new(ms(300));
        let handle = d.arm("query", t0);
        assert_eq!(d.cancel(), Some("query"));
        assert_eq!(d.fire(handle, t0 + ms(1000)), None);
        assert_eq!(d.take_due(t0 + ms(1000)), None);
    }

    #[test]
    fn take_now_ignores_deadline() {
        let mut d = Debouncer::new(ms(1000));
        d.arm((), fixed_now());
        assert_eq!(d.deadline(), Some(fixed_now() + ms(1000)));
        assert_eq!(d.take_now(), Some(()));
        assert_eq!(d.take_now(), None);
    }
}
