//! Core domain types for the resuscitation assistant.
//!
//! This module defines the fundamental types used throughout the system:
//! - Clinical events and their payloads
//! - Resuscitation sessions (live and archived)
//! - The observable state published to the presentation layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Event Types
// ============================================================================

/// Payload of a clinical event.
///
/// The variant is fixed once an event is created: consumers filter on it
/// (e.g. "most recent rhythm"), so edits may only replace the payload and
/// timestamp.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// Result of a rhythm check (e.g. "VT/VF", "PEA/AS", "ROSC")
    Rhythm { label: String },
    /// Medication administered (name/dose label)
    Medication { label: String },
    /// Defibrillation delivered at the given energy
    Defibrillation { joules: u32 },
    /// Free-text alert or note (e.g. "Intubation")
    Note { text: String },
}

impl EventKind {
    /// Check whether `other` carries the same variant (payloads may differ)
    pub fn same_variant(&self, other: &EventKind) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Human-readable one-line description of the payload
    pub fn describe(&self) -> String {
        match self {
            EventKind::Rhythm { label } => format!("Rhythm: {}", label),
            EventKind::Medication { label } => format!("Medication: {}", label),
            EventKind::Defibrillation { joules } => format!("Defibrillation: {}J", joules),
            EventKind::Note { text } => format!("Note: {}", text),
        }
    }
}

/// A single timestamped entry in the event log
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub id: Uuid,
    #[serde(flatten)]
    pub kind: EventKind,
    pub at: DateTime<Utc>,
}

impl Event {
    /// Create an event with a fresh unique id. The id never changes again.
    pub fn new(kind: EventKind, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            at,
        }
    }
}

// ============================================================================
// Session Types
// ============================================================================

/// One complete resuscitation attempt.
///
/// `ended_at` is `None` while the session is live. Once archived, the
/// start/end timestamps never change; the event sequence remains editable
/// by a human reviewer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub events: Vec<Event>,
}

impl Session {
    /// Start a new live session with an empty event sequence
    pub fn begin(now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: now,
            ended_at: None,
            events: Vec::new(),
        }
    }

    pub fn is_live(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Most recent rhythm-check label, if any
    pub fn last_rhythm(&self) -> Option<&str> {
        self.events.iter().rev().find_map(|e| match &e.kind {
            EventKind::Rhythm { label } => Some(label.as_str()),
            _ => None,
        })
    }
}

// ============================================================================
// Observable State
// ============================================================================

/// Which action buttons the presentation layer should pulse
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PulseFlags {
    pub rhythm: bool,
    pub defibrillation: bool,
    pub adrenaline: bool,
    pub amiodarone: bool,
}

/// Point-in-time view of everything the presentation layer renders
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub prompt: String,
    pub seconds_remaining: u32,
    pub cycle_number: u32,
    pub flags: PulseFlags,
    pub reminder: Option<String>,
    pub elapsed: String,
    pub since_last_shock: String,
    pub rosc_achieved: bool,
}
