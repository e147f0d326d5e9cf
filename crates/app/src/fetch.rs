use std::sync::mpsc;
use std::thread;

use eframe::egui;
use scorer_api::ApiError;
use scorer_core::RequestTicket;

/// One backend request running on a background thread. The UI polls it each
/// frame; the carried ticket decides whether a completion is still relevant
/// when it lands (stale completions are silently dropped by the caller).
pub struct Inflight<T> {
    rx: mpsc::Receiver<Result<T, ApiError>>,
    ticket: RequestTicket,
}

impl<T> Inflight<T> {
    pub fn ticket(&self) -> RequestTicket {
        self.ticket
    }

    /// Non-blocking: yields the result at most once.
    pub fn poll(&self) -> Option<Result<T, ApiError>> {
        self.rx.try_recv().ok()
    }
}

/// Run `job` off the UI thread and wake the UI when it completes. There is no
/// server-side cancellation; an abandoned job finishes on its own and its
/// result is dropped with the channel.
pub fn spawn<T, F>(ticket: RequestTicket, ctx: &egui::Context, job: F) -> Inflight<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let ctx = ctx.clone();
    thread::spawn(move || {
        let result = job();
        if tx.send(result).is_ok() {
            ctx.request_repaint();
        }
    });
    Inflight { rx, ticket }
}

/// Poll an inflight slot: on completion the slot is cleared and the result is
/// returned together with its ticket for the relevance check.
pub fn take_completed<T>(slot: &mut Option<Inflight<T>>) -> Option<(RequestTicket, Result<T, ApiError>)> {
    if let Some(inflight) = slot {
        if let Some(result) = inflight.poll() {
            let ticket = inflight.ticket();
            *slot = None;
            return Some((ticket, result));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use scorer_core::RequestTracker;
    use std::time::Duration;

    fn wait_for<T>(slot: &mut Option<Inflight<T>>) -> (RequestTicket, Result<T, ApiError>) {
        for _ in 0..200 {
            if let Some(completed) = take_completed(slot) {
                return completed;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("inflight request never completed");
    }

    #[test]
    fn test_completion_is_delivered_once() {
        let ctx = egui::Context::default();
        let mut tracker = RequestTracker::new();
        let mut slot = Some(spawn(tracker.begin(), &ctx, || Ok(41 + 1)));

        let (ticket, result) = wait_for(&mut slot);
        assert!(tracker.is_current(ticket));
        assert_eq!(result.expect("job result"), 42);
        assert!(slot.is_none());
    }

    #[test]
    fn test_stale_completion_is_detectable() {
        let ctx = egui::Context::default();
        let mut tracker = RequestTracker::new();

        // First request is slow; a second one supersedes it.
        let mut slow = Some(spawn(tracker.begin(), &ctx, || {
            thread::sleep(Duration::from_millis(50));
            Ok("slow")
        }));
        let mut fast = Some(spawn(tracker.begin(), &ctx, || Ok("fast")));

        let (fast_ticket, fast_result) = wait_for(&mut fast);
        assert!(tracker.is_current(fast_ticket));
        assert_eq!(fast_result.expect("fast"), "fast");

        let (slow_ticket, _) = wait_for(&mut slow);
        assert!(!tracker.is_current(slow_ticket));
    }
}
