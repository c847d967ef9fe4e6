// Deferred application of rapidly changing input (search box keystrokes)

use std::time::{Duration, Instant};

/// Default delay before typed search text is applied
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// Holds the latest value until it has been quiet for `delay`
///
/// The caller drives time: `push` on every input event, `poll` from the event
/// loop. A newer `push` replaces the pending value and restarts the delay;
/// superseded values are dropped, never delivered.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self { delay, pending: None }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Queue `value`, replacing whatever was pending
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.delay));
    }

    /// Take the pending value if its deadline has passed
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, deadline)) if now >= *deadline => self.pending.take().map(|(value, _)| value),
            _ => None,
        }
    }

    /// Take the pending value regardless of its deadline
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending value becomes due
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}
