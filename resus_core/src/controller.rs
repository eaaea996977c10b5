//! Session controller: the arbiter that owns every timer and engine.
//!
//! UI-level actions are pushed in here; the controller drives the cycle
//! engine, reminder engine and counters, and records the matching clinical
//! event in the session store in the same call. It also owns start/stop of
//! all four tick sources, so no other component can leak a duplicate
//! ticker, and ending a session halts every clock before state is cleared.

use crate::clock::{TickSource, TickSources};
use crate::config::ProtocolConfig;
use crate::cycle::CprCycleEngine;
use crate::reminder::AdrenalineReminder;
use crate::store::SessionStore;
use crate::timer::SecondsCounter;
use crate::types::{EventKind, Session, Snapshot};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::sync::mpsc::Receiver;
use uuid::Uuid;

/// Single entry point for one resuscitation session's state
pub struct SessionController {
    cycle: CprCycleEngine,
    reminder: AdrenalineReminder,
    elapsed: SecondsCounter,
    since_shock: SecondsCounter,
    store: SessionStore,
    ticks: TickSources,
    tick_rx: Option<Receiver<TickSource>>,
    clock_enabled: bool,
    rosc_achieved: bool,
}

impl SessionController {
    /// Controller with real one-second tick threads (interactive use)
    pub fn new(store: SessionStore, protocol: &ProtocolConfig) -> Self {
        Self::build(store, protocol, true)
    }

    /// Controller whose ticks are driven by the caller through
    /// [`handle_tick`](Self::handle_tick) (tests and scripted runs)
    pub fn with_manual_clock(store: SessionStore, protocol: &ProtocolConfig) -> Self {
        Self::build(store, protocol, false)
    }

    fn build(store: SessionStore, protocol: &ProtocolConfig, clock_enabled: bool) -> Self {
        let (ticks, tick_rx) = TickSources::new();
        Self {
            cycle: CprCycleEngine::with_cycle_seconds(protocol.cycle_seconds),
            reminder: AdrenalineReminder::with_intervals(
                Utc::now(),
                protocol.adrenaline_interval_seconds,
                protocol.reminder_cooldown_seconds,
            ),
            elapsed: SecondsCounter::new(),
            since_shock: SecondsCounter::new(),
            store,
            ticks,
            tick_rx: Some(tick_rx),
            clock_enabled,
            rosc_achieved: false,
        }
    }

    /// Receiver for tick messages; taken once by the presentation loop
    pub fn take_tick_receiver(&mut self) -> Option<Receiver<TickSource>> {
        self.tick_rx.take()
    }

    /// Start a new resuscitation: fresh live session, all transient state
    /// reset, session clocks running
    pub fn begin_session(&mut self) -> Result<Uuid> {
        let now = Utc::now();

        // any leftover clocks from a previous run go down first
        self.ticks.stop_all();

        let id = self.store.begin_session(now);
        self.cycle.reset();
        self.elapsed.reset();
        self.elapsed.start();
        self.since_shock.reset();
        self.since_shock.stop();
        self.reminder.start(now);
        self.rosc_achieved = false;

        if self.clock_enabled {
            self.ticks.start(TickSource::Elapsed)?;
            self.ticks.start(TickSource::Cycle)?;
            self.ticks.start(TickSource::Reminder)?;
        }
        Ok(id)
    }

    /// Report the rhythm seen at a rhythm check and log it
    pub fn submit_rhythm(&mut self, label: &str) -> Result<Uuid> {
        self.ensure_live()?;
        self.cycle.submit_rhythm(label)?;
        self.store.record(
            EventKind::Rhythm {
                label: label.into(),
            },
            Utc::now(),
        )
    }

    /// Report a delivered shock: transition the cycle engine, log the
    /// event, and restart the time-since-shock counter from zero
    pub fn submit_defibrillation(&mut self, joules: u32) -> Result<Uuid> {
        self.ensure_live()?;
        if self.rosc_achieved {
            return Err(Error::InvalidTransition(
                "defibrillation disabled after ROSC",
            ));
        }
        self.cycle.submit_defibrillation()?;

        let id = self
            .store
            .record(EventKind::Defibrillation { joules }, Utc::now())?;

        self.since_shock.reset();
        self.since_shock.start();
        if self.clock_enabled {
            self.ticks.start(TickSource::Defibrillation)?;
        }
        Ok(id)
    }

    /// Log a medication and stop its pulse flag
    pub fn record_medication(&mut self, label: &str) -> Result<Uuid> {
        self.ensure_live()?;
        self.cycle.acknowledge_medication(label);
        self.store.record(
            EventKind::Medication {
                label: label.into(),
            },
            Utc::now(),
        )
    }

    /// Log an adrenaline dose; also feeds the reminder engine
    pub fn record_adrenaline(&mut self) -> Result<Uuid> {
        self.ensure_live()?;
        let now = Utc::now();
        self.reminder.record_adrenaline(now);
        self.cycle.acknowledge_medication("Adrenaline");
        self.store.record(
            EventKind::Medication {
                label: "Adrenaline".into(),
            },
            now,
        )
    }

    /// Log a free-text alert/note
    pub fn record_alert(&mut self, text: &str) -> Result<Uuid> {
        self.ensure_live()?;
        self.store
            .record(EventKind::Note { text: text.into() }, Utc::now())
    }

    /// Return of spontaneous circulation: log it and halt the protocol
    /// clocks. The elapsed timer keeps running for post-arrest care; the
    /// session stays live until explicitly ended.
    pub fn record_rosc(&mut self) -> Result<Uuid> {
        self.ensure_live()?;
        let id = self.store.record(
            EventKind::Rhythm {
                label: "ROSC".into(),
            },
            Utc::now(),
        )?;

        self.rosc_achieved = true;
        self.ticks.stop(TickSource::Cycle);
        self.ticks.stop(TickSource::Defibrillation);
        self.ticks.stop(TickSource::Reminder);
        self.reminder.stop();
        self.since_shock.stop();
        Ok(id)
    }

    /// Dismiss the active adrenaline reminder, if any
    pub fn dismiss_reminder(&mut self) {
        self.reminder.dismiss(Utc::now());
    }

    /// Route one tick to its timer. Ticks arriving after the session ended
    /// are dropped, so a straggler cannot resurrect cleared state.
    pub fn handle_tick(&mut self, source: TickSource) {
        if self.store.live().is_none() {
            return;
        }
        match source {
            TickSource::Elapsed => self.elapsed.tick(),
            TickSource::Defibrillation => self.since_shock.tick(),
            TickSource::Cycle => self.cycle.tick(),
            TickSource::Reminder => self.reminder.tick(Utc::now()),
        }
    }

    /// End the resuscitation: halt all four tick sources, then archive the
    /// live session and clear transient state
    pub fn end_session(&mut self) -> Result<Uuid> {
        self.ticks.stop_all();
        self.elapsed.stop();
        self.since_shock.stop();
        self.reminder.stop();

        let id = self.store.end_session(Utc::now())?;

        self.cycle.reset();
        self.elapsed.reset();
        self.since_shock.reset();
        self.rosc_achieved = false;
        Ok(id)
    }

    /// Reset all transient protocol state without touching the event log.
    /// Tick sources are halted before anything is cleared; they restart if
    /// a session is still live.
    pub fn reset(&mut self) -> Result<()> {
        self.ticks.stop_all();
        self.cycle.reset();
        self.elapsed.reset();
        self.since_shock.reset();
        self.since_shock.stop();
        self.reminder.reset(Utc::now());
        self.rosc_achieved = false;

        if self.store.live().is_some() {
            self.elapsed.start();
            if self.clock_enabled {
                self.ticks.start(TickSource::Elapsed)?;
                self.ticks.start(TickSource::Cycle)?;
                self.ticks.start(TickSource::Reminder)?;
            }
        } else {
            self.elapsed.stop();
            self.reminder.stop();
        }
        Ok(())
    }

    /// Everything the presentation layer renders, in one read
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            prompt: self.cycle.prompt().text(),
            seconds_remaining: self.cycle.seconds_remaining(),
            cycle_number: self.cycle.cycle(),
            flags: self.cycle.flags(),
            reminder: self.reminder.active().map(str::to_string),
            elapsed: self.elapsed.formatted(),
            since_last_shock: self.since_shock.formatted(),
            rosc_achieved: self.rosc_achieved,
        }
    }

    pub fn live_session(&self) -> Option<&Session> {
        self.store.live()
    }

    pub fn archive(&self) -> &[Session] {
        self.store.archive()
    }

    // Historical-record editing passes straight through to the store; the
    // live protocol state is never involved.

    pub fn edit_event(&mut self, id: Uuid, new_kind: EventKind, at: DateTime<Utc>) -> Result<()> {
        self.store.edit_event(id, new_kind, at)
    }

    pub fn delete_events(&mut self, session_id: Uuid, ids: &[Uuid]) -> Result<usize> {
        self.store.delete_events(session_id, ids)
    }

    pub fn append_to_session(
        &mut self,
        session_id: Uuid,
        kind: EventKind,
        at: DateTime<Utc>,
    ) -> Result<Uuid> {
        self.store.append_to_session(session_id, kind, at)
    }

    pub fn delete_session(&mut self, session_id: Uuid) -> Result<()> {
        self.store.delete_session(session_id)
    }

    pub fn clear_archive(&mut self) {
        self.store.clear_archive()
    }

    fn ensure_live(&self) -> Result<()> {
        if self.store.live().is_some() {
            Ok(())
        } else {
            Err(Error::NoLiveSession)
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.ticks.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycle::CycleState;
    use crate::types::EventKind;

    fn controller() -> (tempfile::TempDir, SessionController) {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path().join("archive.json"));
        let controller =
            SessionController::with_manual_clock(store, &ProtocolConfig::default());
        (dir, controller)
    }

    fn run_full_countdown(c: &mut SessionController) {
        for _ in 0..ProtocolConfig::default().cycle_seconds {
            c.handle_tick(TickSource::Cycle);
        }
    }

    #[test]
    fn test_shockable_scenario_end_to_end() {
        let (_dir, mut c) = controller();
        c.begin_session().unwrap();

        c.submit_rhythm("VT/VF").unwrap();
        assert_eq!(c.snapshot().prompt, "Perform Defibrillation");
        assert!(c.snapshot().flags.defibrillation);

        c.submit_defibrillation(200).unwrap();
        // Counter restarts from zero at the moment of the shock
        assert_eq!(c.snapshot().since_last_shock, "00:00");
        assert_eq!(c.snapshot().seconds_remaining, 120);

        // Counter tracks elapsed-since-shock afterwards
        for _ in 0..5 {
            c.handle_tick(TickSource::Defibrillation);
        }
        assert_eq!(c.snapshot().since_last_shock, "00:05");

        run_full_countdown(&mut c);
        let snap = c.snapshot();
        assert_eq!(snap.cycle_number, 2);
        assert_eq!(snap.prompt, "Check pulse & rhythm");
        assert!(snap.flags.rhythm);

        // Cycle 2 calls for adrenaline once CPR restarts
        c.submit_rhythm("PEA/AS").unwrap();
        let snap = c.snapshot();
        assert_eq!(snap.prompt, "Start CPR and administer Adrenaline");
        assert!(snap.flags.adrenaline);
        assert!(!snap.flags.amiodarone);

        // The log captured each clinical action in order
        let events = &c.live_session().unwrap().events;
        assert_eq!(
            events[0].kind,
            EventKind::Rhythm {
                label: "VT/VF".into()
            }
        );
        assert_eq!(events[1].kind, EventKind::Defibrillation { joules: 200 });
        assert_eq!(
            events[2].kind,
            EventKind::Rhythm {
                label: "PEA/AS".into()
            }
        );
    }

    #[test]
    fn test_non_shockable_scenario_end_to_end() {
        let (_dir, mut c) = controller();
        c.begin_session().unwrap();

        c.submit_rhythm("PEA/AS").unwrap();
        let snap = c.snapshot();
        assert_eq!(snap.cycle_number, 1);
        assert_eq!(snap.prompt, "Start CPR");
        assert!(!snap.flags.adrenaline);
        assert!(!snap.flags.amiodarone);
    }

    #[test]
    fn test_defibrillation_noop_outside_awaiting_state() {
        let (_dir, mut c) = controller();
        c.begin_session().unwrap();
        c.submit_rhythm("PEA/AS").unwrap();

        let before = c.snapshot();
        assert!(c.submit_defibrillation(200).is_err());

        // No state change and no logged event
        assert_eq!(c.snapshot(), before);
        assert_eq!(c.live_session().unwrap().events.len(), 1);
    }

    #[test]
    fn test_actions_require_live_session() {
        let (_dir, mut c) = controller();

        assert!(matches!(c.submit_rhythm("VT/VF"), Err(Error::NoLiveSession)));
        assert!(matches!(
            c.record_medication("Adrenaline"),
            Err(Error::NoLiveSession)
        ));
        assert!(matches!(c.record_alert("note"), Err(Error::NoLiveSession)));
        assert!(matches!(c.end_session(), Err(Error::NoLiveSession)));
    }

    #[test]
    fn test_straggling_tick_after_end_is_dropped() {
        let (_dir, mut c) = controller();
        c.begin_session().unwrap();
        c.submit_rhythm("PEA/AS").unwrap();
        c.end_session().unwrap();

        // Ticks queued before the stop must not resurrect anything
        c.handle_tick(TickSource::Cycle);
        c.handle_tick(TickSource::Elapsed);
        let snap = c.snapshot();
        assert_eq!(snap.cycle_number, 1);
        assert_eq!(snap.elapsed, "00:00");
        assert_eq!(snap.seconds_remaining, 120);
    }

    #[test]
    fn test_end_session_archives_log() {
        let (_dir, mut c) = controller();
        c.begin_session().unwrap();
        c.submit_rhythm("VT/VF").unwrap();
        c.submit_defibrillation(200).unwrap();
        c.record_adrenaline().unwrap();
        let id = c.end_session().unwrap();

        assert!(c.live_session().is_none());
        assert_eq!(c.archive().len(), 1);
        let archived = &c.archive()[0];
        assert_eq!(archived.id, id);
        assert_eq!(archived.events.len(), 3);
        assert!(archived.ended_at.is_some());
    }

    #[test]
    fn test_rosc_blocks_further_shocks() {
        let (_dir, mut c) = controller();
        c.begin_session().unwrap();
        c.submit_rhythm("VT/VF").unwrap();
        c.record_rosc().unwrap();

        assert!(c.snapshot().rosc_achieved);
        assert!(matches!(
            c.submit_defibrillation(200),
            Err(Error::InvalidTransition(_))
        ));
        assert_eq!(c.live_session().unwrap().last_rhythm(), Some("ROSC"));
    }

    #[test]
    fn test_elapsed_and_shock_counters_are_independent() {
        let (_dir, mut c) = controller();
        c.begin_session().unwrap();

        for _ in 0..10 {
            c.handle_tick(TickSource::Elapsed);
        }
        // No shock yet: the defibrillation counter isn't running
        c.handle_tick(TickSource::Defibrillation);
        let snap = c.snapshot();
        assert_eq!(snap.elapsed, "00:10");
        assert_eq!(snap.since_last_shock, "00:00");

        c.submit_rhythm("VT/VF").unwrap();
        c.submit_defibrillation(150).unwrap();
        c.handle_tick(TickSource::Defibrillation);
        c.handle_tick(TickSource::Defibrillation);
        assert_eq!(c.snapshot().since_last_shock, "00:02");

        // A second shock restarts the counter
        run_full_countdown(&mut c);
        c.submit_rhythm("VT/VF").unwrap();
        c.submit_defibrillation(200).unwrap();
        assert_eq!(c.snapshot().since_last_shock, "00:00");
    }

    #[test]
    fn test_medication_recording_clears_pulse_flags() {
        let (_dir, mut c) = controller();
        c.begin_session().unwrap();

        // Advance to cycle 2, where adrenaline pulses
        c.submit_rhythm("PEA/AS").unwrap();
        run_full_countdown(&mut c);
        c.submit_rhythm("PEA/AS").unwrap();
        assert!(c.snapshot().flags.adrenaline);

        c.record_adrenaline().unwrap();
        assert!(!c.snapshot().flags.adrenaline);

        let events = &c.live_session().unwrap().events;
        assert_eq!(
            events.last().unwrap().kind,
            EventKind::Medication {
                label: "Adrenaline".into()
            }
        );
    }

    #[test]
    fn test_reset_clears_transient_state_keeps_log() {
        let (_dir, mut c) = controller();
        c.begin_session().unwrap();
        c.submit_rhythm("VT/VF").unwrap();
        c.submit_defibrillation(200).unwrap();
        for _ in 0..30 {
            c.handle_tick(TickSource::Elapsed);
        }

        c.reset().unwrap();
        let snap = c.snapshot();
        assert_eq!(snap.cycle_number, 1);
        assert_eq!(snap.prompt, "Check pulse & rhythm");
        assert_eq!(snap.elapsed, "00:00");

        // The event log survives a protocol reset
        assert_eq!(c.live_session().unwrap().events.len(), 2);
    }

    #[test]
    fn test_live_edit_does_not_touch_archive() {
        let (_dir, mut c) = controller();
        c.begin_session().unwrap();
        c.submit_rhythm("VT/VF").unwrap();
        c.submit_defibrillation(150).unwrap();
        c.end_session().unwrap();

        c.begin_session().unwrap();
        let live_id = c.submit_rhythm("PEA/AS").unwrap();
        c.edit_event(
            live_id,
            EventKind::Rhythm {
                label: "VT/VF".into(),
            },
            Utc::now(),
        )
        .unwrap();

        // Archived session unchanged by the live edit
        assert_eq!(
            c.archive()[0].events[0].kind,
            EventKind::Rhythm {
                label: "VT/VF".into()
            }
        );
        assert_eq!(c.archive()[0].events.len(), 2);
        assert_eq!(c.live_session().unwrap().last_rhythm(), Some("VT/VF"));
    }
}
