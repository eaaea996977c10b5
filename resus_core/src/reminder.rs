//! Adrenaline reminder engine.
//!
//! Watches wall-clock time since the last adrenaline dose independently of
//! the cycle engine, and raises a dismissible reminder with its own
//! cool-down after dismissal. All methods take an explicit `now` so the
//! logic is deterministic under test.

use chrono::{DateTime, Duration, Utc};

/// Default seconds between doses before a reminder is raised
pub const DEFAULT_DOSE_INTERVAL_SECONDS: i64 = 180;

/// Default minimum seconds after a dismissal before the next reminder
pub const DEFAULT_COOLDOWN_SECONDS: i64 = 60;

/// Message shown when a dose is due
pub const REMINDER_MESSAGE: &str = "Consider administering Adrenaline";

/// Independent once-per-second reminder engine
#[derive(Clone, Debug)]
pub struct AdrenalineReminder {
    last_dose_at: DateTime<Utc>,
    last_dismissal_at: Option<DateTime<Utc>>,
    active: Option<String>,
    running: bool,
    dose_interval: Duration,
    cooldown: Duration,
}

impl AdrenalineReminder {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self::with_intervals(
            now,
            DEFAULT_DOSE_INTERVAL_SECONDS,
            DEFAULT_COOLDOWN_SECONDS,
        )
    }

    /// Reminder with non-default thresholds (from configuration)
    pub fn with_intervals(
        now: DateTime<Utc>,
        dose_interval_seconds: i64,
        cooldown_seconds: i64,
    ) -> Self {
        Self {
            last_dose_at: now,
            last_dismissal_at: None,
            active: None,
            running: false,
            dose_interval: Duration::seconds(dose_interval_seconds),
            cooldown: Duration::seconds(cooldown_seconds),
        }
    }

    /// Reinitialize every timestamp to `now` and resume ticking
    pub fn start(&mut self, now: DateTime<Utc>) {
        self.last_dose_at = now;
        self.last_dismissal_at = None;
        self.active = None;
        self.running = true;
        tracing::debug!("Adrenaline reminder started");
    }

    /// Alias for [`start`](Self::start); resets accumulated state
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.start(now);
    }

    /// Halt ticking without clearing accumulated state.
    ///
    /// Pausing must not lose the dose countdown; only a reset does.
    pub fn stop(&mut self) {
        self.running = false;
        tracing::debug!("Adrenaline reminder stopped");
    }

    /// Once-per-second check. Raises a reminder when the dose interval has
    /// elapsed, none is already active, and the dismissal cool-down has
    /// passed.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        if !self.running || self.active.is_some() {
            return;
        }

        let dose_due = now - self.last_dose_at >= self.dose_interval;
        let cooled_down = self
            .last_dismissal_at
            .map_or(true, |dismissed| now - dismissed >= self.cooldown);

        if dose_due && cooled_down {
            tracing::info!("Raising adrenaline reminder");
            self.active = Some(REMINDER_MESSAGE.to_string());
        }
    }

    /// A dose was given: restart the dose clock and dismiss any active
    /// reminder
    pub fn record_adrenaline(&mut self, now: DateTime<Utc>) {
        self.last_dose_at = now;
        if self.active.is_some() {
            self.dismiss(now);
        }
    }

    /// Clear the active reminder and stamp the dismissal time
    pub fn dismiss(&mut self, now: DateTime<Utc>) {
        self.active = None;
        self.last_dismissal_at = Some(now);
        tracing::debug!("Reminder dismissed");
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}
