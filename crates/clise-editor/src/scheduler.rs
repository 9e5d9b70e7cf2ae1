//! Debounced maintenance work.
//!
//! The engine is single-threaded and clock-agnostic: the host passes the
//! current time (milliseconds) with every call, and polls once per frame.

/// Trailing-edge debounce: fires once `window_ms` after the last trigger.
/// A new trigger replaces the pending deadline instead of queueing.
#[derive(Debug, Clone, PartialEq)]
pub struct Debouncer {
    window_ms: f64,
    deadline: Option<f64>,
}

impl Debouncer {
    pub fn new(window_ms: f64) -> Self {
        Self {
            window_ms: window_ms.max(0.0),
            deadline: None,
        }
    }

    pub fn window_ms(&self) -> f64 {
        self.window_ms
    }

    pub fn set_window(&mut self, window_ms: f64) {
        self.window_ms = window_ms.max(0.0);
    }

    pub fn trigger(&mut self, now: f64) {
        self.deadline = Some(now + self.window_ms);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<f64> {
        self.deadline
    }

    /// `true` exactly once when the deadline has passed.
    pub fn poll(&mut self, now: f64) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// A flag that stays raised for `decay_ms` after the last [`Activity::bump`].
#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    decay_ms: f64,
    last: Option<f64>,
}

impl Activity {
    pub fn new(decay_ms: f64) -> Self {
        Self {
            decay_ms,
            last: None,
        }
    }

    pub fn set_decay(&mut self, decay_ms: f64) {
        self.decay_ms = decay_ms.max(0.0);
    }

    pub fn bump(&mut self, now: f64) {
        self.last = Some(now);
    }

    pub fn is_active(&self, now: f64) -> bool {
        self.last.is_some_and(|t| now - t <= self.decay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_after_window() {
        let mut d = Debouncer::new(100.0);
        d.trigger(0.0);
        assert!(!d.poll(99.0));
        assert!(d.poll(100.0));
        assert!(!d.poll(200.0));
    }

    #[test]
    fn retrigger_restarts_the_window() {
        let mut d = Debouncer::new(100.0);
        d.trigger(0.0);
        d.trigger(80.0);
        assert!(!d.poll(120.0));
        assert!(d.poll(180.0));
    }

    #[test]
    fn cancel_drops_pending_run() {
        let mut d = Debouncer::new(100.0);
        d.trigger(0.0);
        d.cancel();
        assert!(!d.is_pending());
        assert!(!d.poll(1000.0));
    }

    #[test]
    fn activity_decays() {
        let mut a = Activity::new(150.0);
        assert!(!a.is_active(0.0));
        a.bump(10.0);
        assert!(a.is_active(160.0));
        assert!(!a.is_active(161.0));
    }
}
