use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

/// Cross-request upstream health state, constructed once per process and
/// shared between whoever needs to read or record it.
///
/// Cloning is cheap and every clone observes the same state. A stale read
/// is tolerated: at worst one extra call hits a dead upstream before
/// `record` flips the flag.
#[derive(Clone)]
pub struct HealthTracker {
    interval: Duration,
    state: Arc<RwLock<State>>,
}

struct State {
    healthy: bool,
    last_check: Option<Instant>,
}

impl HealthTracker {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            state: Arc::new(RwLock::new(State {
                healthy: true,
                last_check: None,
            })),
        }
    }

    /// Whether a fresh probe is due (never probed, or the recheck
    /// interval has elapsed).
    pub fn due(&self) -> bool {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        match state.last_check {
            None => true,
            Some(at) => at.elapsed() >= self.interval,
        }
    }

    /// Record the outcome of a probe or a real call.
    pub fn record(&self, healthy: bool) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.healthy = healthy;
        state.last_check = Some(Instant::now());
    }

    pub fn is_healthy(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_due_and_healthy() {
        let tracker = HealthTracker::new(Duration::from_secs(300));
        assert!(tracker.due());
        assert!(tracker.is_healthy());
    }

    #[test]
    fn record_suppresses_rechecks_within_interval() {
        let tracker = HealthTracker::new(Duration::from_secs(300));
        tracker.record(false);
        assert!(!tracker.is_healthy());
        assert!(!tracker.due());
    }

    #[test]
    fn recheck_becomes_due_after_interval() {
        let tracker = HealthTracker::new(Duration::from_millis(10));
        tracker.record(true);
        assert!(!tracker.due());
        std::thread::sleep(Duration::from_millis(20));
        assert!(tracker.due());
    }

    #[test]
    fn clones_share_the_same_state() {
        let tracker = HealthTracker::new(Duration::from_secs(300));
        let observer = tracker.clone();
        tracker.record(false);
        assert!(!observer.is_healthy());
        assert!(!observer.due());
    }
}
