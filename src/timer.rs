use tracing::debug;

/// What a single elapsed second did to the countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Tick(u64),
    Expired,
}

/// One-second resolution countdown. At most one countdown is armed at a time:
/// `start` replaces whatever was running.
#[derive(Debug, Clone, Default)]
pub struct SessionTimer {
    remaining: u64,
    armed: bool,
}

impl SessionTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, duration_secs: u64) {
        if self.armed {
            debug!(
                remaining = self.remaining,
                "replacing active countdown before arming a new one"
            );
            self.stop();
        }
        self.remaining = duration_secs;
        self.armed = true;
        debug!(duration = duration_secs, "countdown started");
    }

    pub fn stop(&mut self) {
        self.armed = false;
    }

    /// Advance the countdown by one second.
    ///
    /// Returns `None` when nothing is armed. Expiry is reported exactly once
    /// and disarms the timer, so a late tick after expiry is a no-op.
    pub fn tick(&mut self) -> Option<TimerEvent> {
        if !self.armed {
            return None;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.armed = false;
            Some(TimerEvent::Expired)
        } else {
            Some(TimerEvent::Tick(self.remaining))
        }
    }

    pub fn is_active(&self) -> bool {
        self.armed
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Sets the displayed remaining time without arming anything
    pub fn reset_to(&mut self, duration_secs: u64) {
        self.armed = false;
        self.remaining = duration_secs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_timer_does_not_tick() {
        let mut timer = SessionTimer::new();
        assert_eq!(timer.tick(), None);
        assert!(!timer.is_active());
    }

    #[test]
    fn test_counts_down_and_expires_once() {
        let mut timer = SessionTimer::new();
        timer.start(3);

        assert_eq!(timer.tick(), Some(TimerEvent::Tick(2)));
        assert_eq!(timer.tick(), Some(TimerEvent::Tick(1)));
        assert_eq!(timer.tick(), Some(TimerEvent::Expired));
        assert!(!timer.is_active());
        assert_eq!(timer.tick(), None);
        assert_eq!(timer.tick(), None);
    }

    #[test]
    fn test_stop_cancels_without_expiry() {
        let mut timer = SessionTimer::new();
        timer.start(2);
        timer.stop();

        assert_eq!(timer.tick(), None);
        assert_eq!(timer.remaining(), 2);
    }

    #[test]
    fn test_start_replaces_running_countdown() {
        let mut timer = SessionTimer::new();
        timer.start(10);
        timer.tick();
        timer.start(2);

        assert_eq!(timer.remaining(), 2);
        assert_eq!(timer.tick(), Some(TimerEvent::Tick(1)));
        assert_eq!(timer.tick(), Some(TimerEvent::Expired));
        assert_eq!(timer.tick(), None);
    }

    #[test]
    fn test_stop_keeps_remaining_for_time_spent() {
        let mut timer = SessionTimer::new();
        timer.start(5);
        timer.tick();
        timer.tick();
        timer.stop();
        assert_eq!(timer.remaining(), 3);
        assert!(!timer.is_active());
    }

    #[test]
    fn test_zero_duration_expires_on_first_tick() {
        let mut timer = SessionTimer::new();
        timer.start(0);
        assert_eq!(timer.tick(), Some(TimerEvent::Expired));
        assert_eq!(timer.tick(), None);
    }

    #[test]
    fn test_reset_to_disarms() {
        let mut timer = SessionTimer::new();
        timer.start(4);
        timer.reset_to(30);
        assert!(!timer.is_active());
        assert_eq!(timer.remaining(), 30);
        assert_eq!(timer.tick(), None);
    }
}
