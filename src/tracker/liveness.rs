//! Connection liveness tracking.
//!
//! The chat transport can decay silently without emitting an error event,
//! so recovery is driven by watching the time since the last inbound event
//! rather than by error callbacks. Every inbound transport event refreshes
//! the clock, not only meaningful ones.

/// Tracks the timestamp of the last inbound transport event for a session.
pub struct Liveness {
    last_event: u64,
    threshold_secs: u64,
}

impl Liveness {
    pub fn new(now: u64, threshold_secs: u64) -> Self {
        Self {
            last_event: now,
            threshold_secs,
        }
    }

    /// Record an inbound transport event.
    pub fn touch(&mut self, now: u64) {
        self.last_event = now;
    }

    /// True when the session has been silent for longer than the threshold
    /// and should be restarted.
    pub fn is_stale(&self, now: u64) -> bool {
        now.saturating_sub(self.last_event) > self.threshold_secs
    }

    pub fn elapsed(&self, now: u64) -> u64 {
        now.saturating_sub(self.last_event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_only_past_threshold() {
        let live = Liveness::new(1000, 65);
        assert!(!live.is_stale(1065));
        assert!(live.is_stale(1066));
    }

    #[test]
    fn any_event_resets_countdown() {
        let mut live = Liveness::new(1000, 65);
        live.touch(1060);
        assert!(!live.is_stale(1100));
        assert!(live.is_stale(1126));
    }
}
