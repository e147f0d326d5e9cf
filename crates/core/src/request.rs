use std::time::{Duration, Instant};

/// Ticket drawn for one outgoing request of a logical operation. A completion
/// is applied only while its ticket is still the latest one issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket(u64);

/// Monotonic stamp source for overlapping requests of the same operation.
/// The most recently issued request always wins regardless of response
/// arrival order; earlier completions become no-ops.
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: u64,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) -> RequestTicket {
        self.latest += 1;
        RequestTicket(self.latest)
    }

    /// The relevance predicate: should this completion still be applied?
    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        ticket.0 == self.latest
    }

    /// Invalidate every outstanding ticket without issuing a new request,
    /// e.g. when the subject of the operation changed underneath it.
    pub fn invalidate(&mut self) {
        self.latest += 1;
    }
}

/// Quiet period before slider/label tweaks trigger regeneration.
pub const REGENERATE_QUIET_PERIOD: Duration = Duration::from_millis(250);

/// Deadline-based debouncer polled from the frame loop. Rescheduling cancels
/// the previously pending fire.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns true at most once per schedule, when the quiet period elapsed.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// How long the frame loop may sleep before the pending fire is due.
    pub fn time_until_fire(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_ticket_wins() {
        let mut tracker = RequestTracker::new();
        let first = tracker.begin();
        let second = tracker.begin();

        // Second resolves first and is applied; first resolves later and is
        // dropped.
        assert!(tracker.is_current(second));
        assert!(!tracker.is_current(first));
    }

    #[test]
    fn test_single_ticket_is_current() {
        let mut tracker = RequestTracker::new();
        let ticket = tracker.begin();
        assert!(tracker.is_current(ticket));
    }

    #[test]
    fn test_invalidate_orphans_outstanding_tickets() {
        let mut tracker = RequestTracker::new();
        let ticket = tracker.begin();
        tracker.invalidate();
        assert!(!tracker.is_current(ticket));
    }

    #[test]
    fn test_debouncer_fires_after_quiet_period() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(250));
        debouncer.schedule(start);

        assert!(!debouncer.fire(start + Duration::from_millis(100)));
        assert!(debouncer.fire(start + Duration::from_millis(250)));
        // One fire per schedule.
        assert!(!debouncer.fire(start + Duration::from_millis(500)));
    }

    #[test]
    fn test_reschedule_pushes_deadline_out() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(250));
        debouncer.schedule(start);
        debouncer.schedule(start + Duration::from_millis(200));

        // The original deadline has passed but was superseded.
        assert!(!debouncer.fire(start + Duration::from_millis(260)));
        assert!(debouncer.fire(start + Duration::from_millis(450)));
    }

    #[test]
    fn test_cancel_drops_pending_fire() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(250));
        debouncer.schedule(start);
        debouncer.cancel();
        assert!(!debouncer.is_pending());
        assert!(!debouncer.fire(start + Duration::from_secs(1)));
    }
}
