//! Route-change coalescing.
//!
//! Every backing mechanism (history wrapping relayed by the companion, native
//! traversal, path polling) feeds [`NavigationMonitor::record`]. The monitor
//! holds only the latest signal and a deadline; the embedding layer arms a
//! timer for that deadline and calls [`NavigationMonitor::settle`] when it
//! fires. A settled path equal to the one the session already holds is
//! suppressed and never reaches the classifier or the redirect guard.

use serde::Serialize;
use web_time::{Duration, Instant};

use crate::route::normalize_path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationSignal {
    Initial,
    Push,
    Replace,
    /// Back/forward traversal.
    Traverse,
    Poll,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationEvent {
    pub path: String,
    pub signal: NavigationSignal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settle {
    Idle,
    /// Still inside the debounce window; check again at the deadline.
    Pending(Instant),
    Ready(NavigationEvent),
    /// The burst settled on the path already recorded.
    Suppressed,
}

#[derive(Debug, Clone)]
struct PendingSignal {
    event: NavigationEvent,
    deadline: Instant,
}

#[derive(Debug, Clone)]
pub struct NavigationMonitor {
    debounce: Duration,
    pending: Option<PendingSignal>,
    emitted: u64,
    suppressed: u64,
}

impl NavigationMonitor {
    #[must_use]
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            pending: None,
            emitted: 0,
            suppressed: 0,
        }
    }

    /// Records a raw signal and restarts the debounce window. Returns the new
    /// deadline; only the last signal of a burst survives.
    pub fn record(&mut self, path: &str, signal: NavigationSignal, now: Instant) -> Instant {
        let deadline = now + self.debounce;
        self.pending = Some(PendingSignal {
            event: NavigationEvent {
                path: normalize_path(path),
                signal,
            },
            deadline,
        });
        deadline
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|pending| pending.deadline)
    }

    /// Emits the settled event once its deadline has passed.
    pub fn settle(&mut self, now: Instant, recorded_path: &str) -> Settle {
        match &self.pending {
            None => Settle::Idle,
            Some(pending) if now < pending.deadline => Settle::Pending(pending.deadline),
            Some(_) => self.flush(recorded_path),
        }
    }

    /// Emits whatever is pending without waiting for the deadline.
    pub fn flush(&mut self, recorded_path: &str) -> Settle {
        let Some(pending) = self.pending.take() else {
            return Settle::Idle;
        };
        if pending.event.path == normalize_path(recorded_path) {
            self.suppressed += 1;
            tracing::trace!(path = %pending.event.path, "suppressed re-entrant navigation");
            return Settle::Suppressed;
        }
        self.emitted += 1;
        Settle::Ready(pending.event)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    #[must_use]
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    #[must_use]
    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }
}

/// Change detector behind the polling fallback. Reports a path only when it
/// differs from the previous observation.
#[derive(Debug, Clone, Default)]
pub struct PathPoller {
    last: Option<String>,
}

impl PathPoller {
    #[must_use]
    pub fn new(initial_path: &str) -> Self {
        Self {
            last: Some(normalize_path(initial_path)),
        }
    }

    pub fn observe(&mut self, path: &str) -> Option<String> {
        let path = normalize_path(path);
        if self.last.as_deref() == Some(path.as_str()) {
            return None;
        }
        self.last = Some(path.clone());
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEBOUNCE: Duration = Duration::from_millis(100);

    #[test]
    fn burst_collapses_to_last_path() {
        let start = Instant::now();
        let mut monitor = NavigationMonitor::new(DEBOUNCE);
        monitor.record("/a", NavigationSignal::Push, start);
        monitor.record("/b", NavigationSignal::Replace, start + Duration::from_millis(30));
        let deadline = monitor.record("/c/", NavigationSignal::Push, start + Duration::from_millis(60));

        assert_eq!(
            monitor.settle(start + Duration::from_millis(120), "/"),
            Settle::Pending(deadline)
        );
        assert_eq!(
            monitor.settle(deadline, "/"),
            Settle::Ready(NavigationEvent {
                path: "/c".to_string(),
                signal: NavigationSignal::Push,
            })
        );
        assert_eq!(monitor.settle(deadline, "/c"), Settle::Idle);
        assert_eq!(monitor.emitted(), 1);
    }

    #[test]
    fn same_path_as_recorded_is_suppressed() {
        let start = Instant::now();
        let mut monitor = NavigationMonitor::new(DEBOUNCE);
        monitor.record("/notifications?tab=all", NavigationSignal::Poll, start);
        assert_eq!(monitor.flush("/notifications"), Settle::Suppressed);
        assert_eq!(monitor.suppressed(), 1);
        assert_eq!(monitor.emitted(), 0);
    }

    #[test]
    fn cancel_discards_pending_signal() {
        let mut monitor = NavigationMonitor::new(DEBOUNCE);
        monitor.record("/a", NavigationSignal::Traverse, Instant::now());
        monitor.cancel();
        assert_eq!(monitor.deadline(), None);
        assert_eq!(monitor.flush("/"), Settle::Idle);
    }

    #[test]
    fn poller_reports_only_changes() {
        let mut poller = PathPoller::new("/home");
        assert_eq!(poller.observe("/home/"), None);
        assert_eq!(poller.observe("/explore"), Some("/explore".to_string()));
        assert_eq!(poller.observe("/explore"), None);
    }
}
