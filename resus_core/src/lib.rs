#![forbid(unsafe_code)]

//! Core protocol engine and event log for the ResQ resuscitation assistant.
//!
//! This crate provides:
//! - Domain types (sessions, clinical events, observable state)
//! - The CPR cycle state machine and adrenaline reminder engine
//! - Second-resolution timers and one-second tick sources
//! - The session store (live event log + persisted archive)
//! - The session controller that arbitrates all of the above

pub mod types;
pub mod error;
pub mod schedule;
pub mod config;
pub mod logging;
pub mod timer;
pub mod clock;
pub mod cycle;
pub mod reminder;
pub mod store;
pub mod controller;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use schedule::{is_shockable, medications_for_cycle, Medication, JOULE_OPTIONS};
pub use timer::SecondsCounter;
pub use clock::{TickSource, TickSources};
pub use cycle::{CprCycleEngine, CycleState, Prompt};
pub use reminder::AdrenalineReminder;
pub use store::SessionStore;
pub use controller::SessionController;
