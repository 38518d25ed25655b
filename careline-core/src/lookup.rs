//! Ordering guarantees for search-as-you-type lookups.
//!
//! Input is debounced, and every issued request carries a generation ticket
//! so that only the most recently issued request may publish its result,
//! whatever order the responses come back in.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::config::CarelineConfig;

/// Delays a lookup until the input has been stable for `delay`.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<(String, Instant)>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    pub fn from_config(config: &CarelineConfig) -> Self {
        Self::from_millis(config.lookup_debounce_ms)
    }

    /// Record new input, restarting the delay. Blank input cancels.
    pub fn push(&mut self, input: &str, now: Instant) {
        let trimmed = input.trim();
        self.pending = if trimmed.is_empty() {
            None
        } else {
            Some((trimmed.to_string(), now + self.delay))
        };
    }

    /// The settled input, once its delay has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        match &self.pending {
            Some((_, deadline)) if now >= *deadline => self.pending.take().map(|(input, _)| input),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

/// Generation of one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestTicket(u64);

impl RequestTicket {
    pub fn generation(self) -> u64 {
        self.0
    }
}

/// Last-issued-wins guard.
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: AtomicU64,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket; every earlier ticket becomes stale.
    pub fn issue(&self) -> RequestTicket {
        RequestTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// Pass `result` through only if `ticket` is still the latest issued.
    pub fn accept<T>(&self, ticket: RequestTicket, result: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(result)
        } else {
            tracing::debug!(
                stale = ticket.0,
                latest = self.latest.load(Ordering::SeqCst),
                "discarding stale lookup result"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_settles_after_the_delay() {
        let start = Instant::now();
        let mut debouncer = Debouncer::from_millis(400);
        debouncer.push("17", start);
        debouncer.push("1712", start + Duration::from_millis(150));

        assert_eq!(debouncer.poll(start + Duration::from_millis(400)), None);
        assert_eq!(
            debouncer.poll(start + Duration::from_millis(550)),
            Some("1712".to_string())
        );
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.poll(start + Duration::from_millis(900)), None);
    }

    #[test]
    fn delay_comes_from_the_config() {
        let start = Instant::now();
        let config = CarelineConfig {
            lookup_debounce_ms: 250,
            ..CarelineConfig::default()
        };
        let mut debouncer = Debouncer::from_config(&config);
        debouncer.push("0912", start);

        assert_eq!(debouncer.poll(start + Duration::from_millis(249)), None);
        assert_eq!(
            debouncer.poll(start + Duration::from_millis(250)),
            Some("0912".to_string())
        );
    }

    #[test]
    fn blank_input_cancels_the_pending_lookup() {
        let start = Instant::now();
        let mut debouncer = Debouncer::from_millis(400);
        debouncer.push("0912", start);
        debouncer.push("   ", start + Duration::from_millis(10));

        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.poll(start + Duration::from_secs(1)), None);
    }

    #[test]
    fn last_issued_wins_over_last_completed() {
        let tracker = RequestTracker::new();
        let first = tracker.issue();
        let second = tracker.issue();

        // the second request completes first, then the first one straggles in
        assert_eq!(tracker.accept(second, "second"), Some("second"));
        assert_eq!(tracker.accept(first, "first"), None);
        assert!(first < second);
    }

    #[test]
    fn a_newer_issue_invalidates_an_in_flight_ticket() {
        let tracker = RequestTracker::new();
        let ticket = tracker.issue();
        assert!(tracker.is_current(ticket));
        let _newer = tracker.issue();
        assert!(!tracker.is_current(ticket));
    }
}
