//! One-second tick sources.
//!
//! Each timer in the system (elapsed clock, defibrillation counter, CPR
//! countdown, adrenaline reminder) is fed by its own tick thread. All
//! threads send into one channel owned by the session controller, so tick
//! handling never interleaves with user-triggered calls.
//!
//! Restart semantics are the important part: starting a source that is
//! already running stops the previous thread first, so a source can never
//! tick twice per second.

use crate::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Identifies which timer a tick belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickSource {
    Elapsed,
    Defibrillation,
    Cycle,
    Reminder,
}

impl TickSource {
    pub const ALL: [TickSource; 4] = [
        TickSource::Elapsed,
        TickSource::Defibrillation,
        TickSource::Cycle,
        TickSource::Reminder,
    ];

    fn index(self) -> usize {
        match self {
            TickSource::Elapsed => 0,
            TickSource::Defibrillation => 1,
            TickSource::Cycle => 2,
            TickSource::Reminder => 3,
        }
    }
}

/// Handle to a single spawned tick thread
struct Ticker {
    stop: Arc<AtomicBool>,
}

impl Ticker {
    fn spawn(source: TickSource, tx: Sender<TickSource>) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);

        thread::Builder::new()
            .name(format!("tick-{:?}", source).to_lowercase())
            .spawn(move || loop {
                thread::sleep(Duration::from_secs(1));
                if flag.load(Ordering::SeqCst) {
                    break;
                }
                if tx.send(source).is_err() {
                    // receiver gone, nothing left to tick
                    break;
                }
            })?;

        Ok(Self { stop })
    }

    fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Owns at most one live ticker per source.
///
/// Ticks queued before a stop are delivered anyway; the controller drops
/// them when no session is live, so a straggler cannot resurrect cleared
/// state.
pub struct TickSources {
    tx: Sender<TickSource>,
    slots: [Option<Ticker>; 4],
}

impl TickSources {
    /// Create the tick channel; the receiver goes to whoever drives the
    /// session (controller or presentation loop)
    pub fn new() -> (Self, Receiver<TickSource>) {
        let (tx, rx) = channel();
        (
            Self {
                tx,
                slots: [None, None, None, None],
            },
            rx,
        )
    }

    /// Start (or restart) the ticker for `source`, stopping any previous
    /// one for the same source first
    pub fn start(&mut self, source: TickSource) -> Result<()> {
        let slot = &mut self.slots[source.index()];
        if let Some(old) = slot.take() {
            tracing::debug!(?source, "Replacing running ticker");
            old.stop();
        }
        *slot = Some(Ticker::spawn(source, self.tx.clone())?);
        Ok(())
    }

    /// Signal the ticker for `source` to stop. Synchronous: the stop flag
    /// is set before this returns, so the thread sends nothing after its
    /// next wakeup.
    pub fn stop(&mut self, source: TickSource) {
        if let Some(ticker) = self.slots[source.index()].take() {
            ticker.stop();
        }
    }

    pub fn stop_all(&mut self) {
        for source in TickSource::ALL {
            self.stop(source);
        }
    }

    pub fn is_running(&self, source: TickSource) -> bool {
        self.slots[source.index()].is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restart_stops_previous_ticker() {
        let (mut sources, _rx) = TickSources::new();
        sources.start(TickSource::Elapsed).unwrap();

        let first_flag = Arc::clone(
            &sources.slots[TickSource::Elapsed.index()]
                .as_ref()
                .unwrap()
                .stop,
        );
        assert!(!first_flag.load(Ordering::SeqCst));

        // Restart: the old thread must be told to stop before the new one
        // exists, otherwise the source ticks twice per second
        sources.start(TickSource::Elapsed).unwrap();
        assert!(first_flag.load(Ordering::SeqCst));
        assert!(sources.is_running(TickSource::Elapsed));
    }

    #[test]
    fn test_stop_all_halts_every_source() {
        let (mut sources, _rx) = TickSources::new();
        let mut flags = Vec::new();

        for source in TickSource::ALL {
            sources.start(source).unwrap();
            flags.push(Arc::clone(
                &sources.slots[source.index()].as_ref().unwrap().stop,
            ));
        }

        sources.stop_all();

        for (source, flag) in TickSource::ALL.iter().zip(&flags) {
            assert!(!sources.is_running(*source));
            assert!(flag.load(Ordering::SeqCst), "{:?} still live", source);
        }
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (mut sources, _rx) = TickSources::new();
        sources.stop(TickSource::Cycle);
        sources.start(TickSource::Cycle).unwrap();
        sources.stop(TickSource::Cycle);
        sources.stop(TickSource::Cycle);
        assert!(!sources.is_running(TickSource::Cycle));
    }

    #[test]
    fn test_ticker_delivers_ticks() {
        let (mut sources, rx) = TickSources::new();
        sources.start(TickSource::Reminder).unwrap();

        let tick = rx.recv_timeout(Duration::from_secs(3)).unwrap();
        assert_eq!(tick, TickSource::Reminder);

        sources.stop(TickSource::Reminder);
    }
}
