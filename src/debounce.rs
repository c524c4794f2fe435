use std::time::{Duration, Instant};
use tracing::trace;

/// Deferred-apply timer for rapid text input.
///
/// At most one value is scheduled at a time: a new `schedule` replaces any
/// pending one, so only the latest input ever fires (last-write-wins). The
/// owner drives it by calling `poll` from its event loop.
pub struct Debouncer {
    delay: Duration,
    pending: Option<(String, Instant)>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Debouncer {
            delay,
            pending: None,
        }
    }

    pub fn schedule(&mut self, value: String, now: Instant) {
        trace!("Scheduling debounced value {:?}", value);
        self.pending = Some((value, now + self.delay));
    }

    /// Returns the scheduled value once its quiescence window has elapsed.
    /// Fires at most once per schedule.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        match &self.pending {
            Some((_, deadline)) if *deadline <= now => {
                self.pending.take().map(|(value, _)| value)
            }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_after_quiescence() {
        let mut d = Debouncer::new(Duration::from_millis(250));
        let t0 = Instant::now();
        d.schedule("blue".to_string(), t0);

        assert!(d.is_pending());
        assert_eq!(d.poll(t0 + Duration::from_millis(100)), None);
        assert_eq!(
            d.poll(t0 + Duration::from_millis(250)),
            Some("blue".to_string())
        );
        assert!(!d.is_pending());
    }

    #[test]
    fn fires_at_most_once() {
        let mut d = Debouncer::new(Duration::from_millis(10));
        let t0 = Instant::now();
        d.schedule("x".to_string(), t0);

        let late = t0 + Duration::from_secs(1);
        assert_eq!(d.poll(late), Some("x".to_string()));
        assert_eq!(d.poll(late), None);
    }

    #[test]
    fn newer_schedule_supersedes_older() {
        let mut d = Debouncer::new(Duration::from_millis(250));
        let t0 = Instant::now();
        d.schedule("bl".to_string(), t0);
        // Second keystroke arrives before the first deadline; the first
        // value must never be applied.
        let t1 = t0 + Duration::from_millis(200);
        d.schedule("blu".to_string(), t1);

        assert_eq!(d.poll(t0 + Duration::from_millis(250)), None);
        assert_eq!(
            d.poll(t1 + Duration::from_millis(250)),
            Some("blu".to_string())
        );
    }

    #[test]
    fn cancel_drops_pending_value() {
        let mut d = Debouncer::new(Duration::from_millis(10));
        let t0 = Instant::now();
        d.schedule("gone".to_string(), t0);
        d.cancel();

        assert!(!d.is_pending());
        assert_eq!(d.poll(t0 + Duration::from_secs(1)), None);
    }
}
