//! Protocol reference tables consulted by the cycle engine.
//!
//! This module holds the fixed clinical reference data:
//! - The medication schedule keyed by cycle number
//! - Rhythm classification (shockable vs non-shockable)
//! - Energy options and auxiliary medication/note menus

use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// A medication called for at the top of a CPR cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Medication {
    Adrenaline,
    Amiodarone300,
    Amiodarone150,
}

impl Medication {
    /// Label as recorded in the event log and shown in prompts
    pub fn label(&self) -> &'static str {
        match self {
            Medication::Adrenaline => "Adrenaline",
            Medication::Amiodarone300 => "Amiodarone 300mg",
            Medication::Amiodarone150 => "Amiodarone 150mg",
        }
    }

    pub fn is_adrenaline(&self) -> bool {
        matches!(self, Medication::Adrenaline)
    }

    pub fn is_amiodarone(&self) -> bool {
        matches!(self, Medication::Amiodarone300 | Medication::Amiodarone150)
    }
}

/// Fixed medication schedule keyed by cycle number.
///
/// Cycles without an entry prompt a plain "Start CPR". Built once and
/// reused across all sessions.
static MEDICATION_SCHEDULE: Lazy<BTreeMap<u32, Vec<Medication>>> = Lazy::new(|| {
    BTreeMap::from([
        (2, vec![Medication::Adrenaline]),
        (4, vec![Medication::Adrenaline, Medication::Amiodarone300]),
        (6, vec![Medication::Adrenaline, Medication::Amiodarone150]),
        (8, vec![Medication::Adrenaline]),
    ])
});

/// Look up the medications scheduled for a given cycle number.
///
/// `None` means the cycle has no scheduled medication, which is an
/// expected outcome rather than an error.
pub fn medications_for_cycle(cycle: u32) -> Option<&'static [Medication]> {
    MEDICATION_SCHEDULE.get(&cycle).map(|m| m.as_slice())
}

/// Classify a rhythm label as shockable.
///
/// Only "VT/VF" mandates defibrillation; every other label (PEA/AS, ROSC,
/// free text) continues straight to CPR.
pub fn is_shockable(label: &str) -> bool {
    label == "VT/VF"
}

/// Defibrillation energy options offered by the presentation layer
pub const JOULE_OPTIONS: [u32; 4] = [100, 150, 200, 240];

/// Medications outside the fixed schedule, selectable from a menu
pub const OTHER_MEDICATIONS: [&str; 7] = [
    "Atropine",
    "Calcium",
    "D50",
    "Dopamine Infusion",
    "Lidocaine",
    "Magnesium",
    "NaHCO3",
];

/// Predefined free-text note options
pub const NOTE_OPTIONS: [&str; 2] = ["Intubation", "Termination of CPR"];
