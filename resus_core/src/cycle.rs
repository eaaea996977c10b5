//! CPR cycle engine.
//!
//! The central state machine of the protocol. It drives the 2-minute
//! countdown, decides when to prompt for rhythm checks, defibrillation and
//! scheduled medications, and publishes the current prompt and pulse flags
//! for the presentation layer. It never writes to the event log itself;
//! the caller records the clinical action that triggered each transition.

use crate::schedule::{self, Medication};
use crate::types::PulseFlags;
use crate::{Error, Result};

/// Default CPR interval between rhythm checks
pub const DEFAULT_CYCLE_SECONDS: u32 = 120;

/// Protocol position within a cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleState {
    /// Waiting for the clinician to report a rhythm (initial state, and
    /// re-entered at the top of every cycle)
    AwaitingRhythmCheck,
    /// A shockable rhythm was reported; waiting for the shock
    AwaitingDefibrillation,
    /// Compressions in progress, countdown running
    CprRunning,
}

/// The single active instruction published to the presentation layer.
///
/// Exactly one prompt is active at a time; awaiting rhythm input and a
/// running countdown are mutually exclusive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Prompt {
    RhythmCheck,
    Defibrillate,
    StartCpr { medications: Vec<Medication> },
}

impl Prompt {
    pub fn text(&self) -> String {
        match self {
            Prompt::RhythmCheck => "Check pulse & rhythm".into(),
            Prompt::Defibrillate => "Perform Defibrillation".into(),
            Prompt::StartCpr { medications } if medications.is_empty() => "Start CPR".into(),
            Prompt::StartCpr { medications } => {
                let drugs: Vec<&str> = medications.iter().map(|m| m.label()).collect();
                format!("Start CPR and administer {}", drugs.join(" + "))
            }
        }
    }
}

/// State machine over one resuscitation attempt's CPR cycles
#[derive(Clone, Debug)]
pub struct CprCycleEngine {
    state: CycleState,
    cycle: u32,
    remaining: u32,
    cycle_seconds: u32,
    prompt: Prompt,
    flags: PulseFlags,
}

impl Default for CprCycleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CprCycleEngine {
    pub fn new() -> Self {
        Self::with_cycle_seconds(DEFAULT_CYCLE_SECONDS)
    }

    /// Engine with a non-default CPR interval (from configuration)
    pub fn with_cycle_seconds(cycle_seconds: u32) -> Self {
        Self {
            state: CycleState::AwaitingRhythmCheck,
            cycle: 1,
            remaining: cycle_seconds,
            cycle_seconds,
            prompt: Prompt::RhythmCheck,
            flags: PulseFlags {
                rhythm: true,
                ..PulseFlags::default()
            },
        }
    }

    /// Report the rhythm seen at a rhythm check.
    ///
    /// Valid only in [`CycleState::AwaitingRhythmCheck`]; a shockable
    /// rhythm moves to awaiting defibrillation, anything else starts CPR
    /// immediately. Rejected as a no-op in any other state.
    pub fn submit_rhythm(&mut self, label: &str) -> Result<()> {
        if self.state != CycleState::AwaitingRhythmCheck {
            return Err(Error::InvalidTransition(
                "rhythm input accepted only while awaiting a rhythm check",
            ));
        }

        self.flags.rhythm = false;
        if schedule::is_shockable(label) {
            tracing::info!(rhythm = label, "Shockable rhythm, prompting defibrillation");
            self.state = CycleState::AwaitingDefibrillation;
            self.prompt = Prompt::Defibrillate;
            self.flags.defibrillation = true;
        } else {
            tracing::info!(rhythm = label, "Non-shockable rhythm, starting CPR");
            self.start_cpr();
        }
        Ok(())
    }

    /// Report a delivered shock.
    ///
    /// Valid only in [`CycleState::AwaitingDefibrillation`]; starts CPR and
    /// restarts the countdown. The caller records the event and resets the
    /// defibrillation counter.
    pub fn submit_defibrillation(&mut self) -> Result<()> {
        if self.state != CycleState::AwaitingDefibrillation {
            return Err(Error::InvalidTransition(
                "defibrillation accepted only while awaiting a shock",
            ));
        }

        self.flags.defibrillation = false;
        self.start_cpr();
        Ok(())
    }

    fn start_cpr(&mut self) {
        let medications: Vec<Medication> = schedule::medications_for_cycle(self.cycle)
            .map(<[Medication]>::to_vec)
            .unwrap_or_default();

        self.flags.adrenaline = medications.iter().any(Medication::is_adrenaline);
        self.flags.amiodarone = medications.iter().any(Medication::is_amiodarone);
        self.prompt = Prompt::StartCpr { medications };
        self.state = CycleState::CprRunning;
        self.remaining = self.cycle_seconds;
        tracing::debug!(cycle = self.cycle, "CPR countdown started");
    }

    /// Advance the countdown by one second.
    ///
    /// Ignored unless CPR is running. Reaching zero forces the transition
    /// to the next rhythm check regardless of any pending UI interaction.
    pub fn tick(&mut self) {
        if self.state != CycleState::CprRunning {
            return;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.cycle += 1;
            self.state = CycleState::AwaitingRhythmCheck;
            self.prompt = Prompt::RhythmCheck;
            self.flags = PulseFlags {
                rhythm: true,
                ..PulseFlags::default()
            };
            tracing::info!(cycle = self.cycle, "Cycle complete, rhythm check due");
        }
    }

    /// Stop a drug's pulse flag once the clinician has given it
    pub fn acknowledge_medication(&mut self, label: &str) {
        if label == "Adrenaline" {
            self.flags.adrenaline = false;
        }
        if label.contains("Amiodarone") {
            self.flags.amiodarone = false;
        }
    }

    /// Cancel any running countdown and return to cycle 1 awaiting a
    /// rhythm check, with only the rhythm flag pulsing
    pub fn reset(&mut self) {
        *self = Self::with_cycle_seconds(self.cycle_seconds);
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn cycle(&self) -> u32 {
        self.cycle
    }

    pub fn seconds_remaining(&self) -> u32 {
        self.remaining
    }

    pub fn prompt(&self) -> &Prompt {
        &self.prompt
    }

    pub fn flags(&self) -> PulseFlags {
        self.flags
    }
}
