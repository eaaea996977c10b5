//! Second-resolution counters for elapsed time and time since last shock.
//!
//! Both the session timer and the defibrillation counter are instances of
//! [`SecondsCounter`]; they only count while explicitly started, and their
//! restart semantics matter to the components built on top of them.

/// A monotonic-while-running seconds counter with start/stop/reset
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SecondsCounter {
    seconds: u32,
    running: bool,
}

impl SecondsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin counting. Has no effect if already running.
    pub fn start(&mut self) {
        self.running = true;
    }

    /// Halt counting without clearing the accumulated value
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Clear the accumulated value; does not change running state
    pub fn reset(&mut self) {
        self.seconds = 0;
    }

    /// Advance by one second. Ignored while stopped.
    pub fn tick(&mut self) {
        if self.running {
            self.seconds += 1;
        }
    }

    pub fn seconds(&self) -> u32 {
        self.seconds
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Render as `MM:SS`
    pub fn formatted(&self) -> String {
        format!("{:02}:{:02}", self.seconds / 60, self.seconds % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_ignored_while_stopped() {
        let mut counter = SecondsCounter::new();
        counter.tick();
        counter.tick();
        assert_eq!(counter.seconds(), 0);

        counter.start();
        counter.tick();
        assert_eq!(counter.seconds(), 1);

        counter.stop();
        counter.tick();
        assert_eq!(counter.seconds(), 1);
    }

    #[test]
    fn test_stop_preserves_value_reset_clears_it() {
        let mut counter = SecondsCounter::new();
        counter.start();
        for _ in 0..75 {
            counter.tick();
        }

        counter.stop();
        assert_eq!(counter.seconds(), 75);

        counter.reset();
        assert_eq!(counter.seconds(), 0);
        assert!(!counter.is_running());
    }

    #[test]
    fn test_formatted_mm_ss() {
        let mut counter = SecondsCounter::new();
        assert_eq!(counter.formatted(), "00:00");

        counter.start();
        for _ in 0..125 {
            counter.tick();
        }
        assert_eq!(counter.formatted(), "02:05");
    }
}
