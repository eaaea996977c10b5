//! Event log and session archive with atomic persistence.
//!
//! The store is the single source of truth for "what happened": it owns
//! the live session's event log (append-only) and the archive of completed
//! sessions (editable by a reviewer). Only the archive is durably stored;
//! it is saved atomically with file locking, and a corrupt or missing
//! archive loads as empty so a damaged file can never block a new
//! resuscitation.

use crate::{Error, Event, EventKind, Result, Session};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Owner of the Session/Event graph and the only writer to durable storage
pub struct SessionStore {
    live: Option<Session>,
    archive: Vec<Session>,
    path: PathBuf,
}

impl SessionStore {
    /// Open the store backed by `path`, loading any previously archived
    /// sessions
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let archive = load_archive(&path);
        Self {
            live: None,
            archive,
            path,
        }
    }

    /// Create a new live session, discarding any prior uncommitted one
    pub fn begin_session(&mut self, now: DateTime<Utc>) -> Uuid {
        if let Some(old) = self.live.take() {
            tracing::warn!(
                session = %old.id,
                dropped_events = old.events.len(),
                "Discarding uncommitted live session"
            );
        }
        let session = Session::begin(now);
        let id = session.id;
        tracing::info!(session = %id, "Resuscitation session started");
        self.live = Some(session);
        id
    }

    /// Append an event to the live session. Never touches the archive.
    pub fn record(&mut self, kind: EventKind, now: DateTime<Utc>) -> Result<Uuid> {
        let live = self.live.as_mut().ok_or(Error::NoLiveSession)?;
        let event = Event::new(kind, now);
        let id = event.id;
        tracing::debug!(event = %id, "{}", event.kind.describe());
        live.events.push(event);
        Ok(id)
    }

    /// Stamp the end time, move the live session into the archive, and
    /// persist
    pub fn end_session(&mut self, now: DateTime<Utc>) -> Result<Uuid> {
        let mut session = self.live.take().ok_or(Error::NoLiveSession)?;
        session.ended_at = Some(now);
        let id = session.id;
        tracing::info!(session = %id, events = session.events.len(), "Session archived");
        self.archive.push(session);
        self.persist();
        Ok(id)
    }

    /// Replace an event's payload and timestamp in place, wherever it
    /// lives. The id and variant are preserved; a payload of a different
    /// variant is rejected.
    pub fn edit_event(
        &mut self,
        id: Uuid,
        new_kind: EventKind,
        at: DateTime<Utc>,
    ) -> Result<()> {
        if let Some(live) = self.live.as_mut() {
            if let Some(event) = live.events.iter_mut().find(|e| e.id == id) {
                if !event.kind.same_variant(&new_kind) {
                    return Err(Error::VariantMismatch);
                }
                event.kind = new_kind;
                event.at = at;
                return Ok(());
            }
        }

        let mut location = None;
        for (si, session) in self.archive.iter().enumerate() {
            if let Some(ei) = session.events.iter().position(|e| e.id == id) {
                location = Some((si, ei));
                break;
            }
        }

        match location {
            Some((si, ei)) => {
                let event = &mut self.archive[si].events[ei];
                if !event.kind.same_variant(&new_kind) {
                    return Err(Error::VariantMismatch);
                }
                event.kind = new_kind;
                event.at = at;
                self.persist();
                Ok(())
            }
            None => Err(Error::EventNotFound(id)),
        }
    }

    /// Reviewer addition of an event to an archived session. Live appends
    /// go through [`record`](Self::record) instead.
    pub fn append_to_session(
        &mut self,
        session_id: Uuid,
        kind: EventKind,
        at: DateTime<Utc>,
    ) -> Result<Uuid> {
        let idx = self
            .archive
            .iter()
            .position(|s| s.id == session_id)
            .ok_or(Error::SessionNotFound(session_id))?;
        let event = Event::new(kind, at);
        let id = event.id;
        self.archive[idx].events.push(event);
        self.persist();
        Ok(id)
    }

    /// Remove matching events from one specific session (live or
    /// archived). Returns how many were removed.
    pub fn delete_events(&mut self, session_id: Uuid, ids: &[Uuid]) -> Result<usize> {
        if let Some(live) = self.live.as_mut() {
            if live.id == session_id {
                let before = live.events.len();
                live.events.retain(|e| !ids.contains(&e.id));
                return Ok(before - live.events.len());
            }
        }

        let idx = self
            .archive
            .iter()
            .position(|s| s.id == session_id)
            .ok_or(Error::SessionNotFound(session_id))?;
        let events = &mut self.archive[idx].events;
        let before = events.len();
        events.retain(|e| !ids.contains(&e.id));
        let removed = before - events.len();
        if removed > 0 {
            self.persist();
        }
        Ok(removed)
    }

    /// Remove one archived session entirely
    pub fn delete_session(&mut self, session_id: Uuid) -> Result<()> {
        let before = self.archive.len();
        self.archive.retain(|s| s.id != session_id);
        if self.archive.len() == before {
            return Err(Error::SessionNotFound(session_id));
        }
        self.persist();
        Ok(())
    }

    /// Discard every archived session
    pub fn clear_archive(&mut self) {
        self.archive.clear();
        self.persist();
    }

    pub fn live(&self) -> Option<&Session> {
        self.live.as_ref()
    }

    pub fn archive(&self) -> &[Session] {
        &self.archive
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the archive to disk. Explicit variant of the internal
    /// best-effort persist.
    pub fn save(&self) -> Result<()> {
        save_archive(&self.path, &self.archive)
    }

    /// Persist the archive. A save failure is non-fatal: the in-memory
    /// state stays authoritative and the session keeps running.
    fn persist(&self) {
        if let Err(e) = self.save() {
            tracing::warn!("Failed to persist archive to {:?}: {}", self.path, e);
        }
    }
}

/// Load archived sessions from `path`.
///
/// Missing file, unreadable file, and unparseable contents all yield an
/// empty archive; corruption is logged so it stays distinguishable from
/// first run in the logs.
fn load_archive(path: &Path) -> Vec<Session> {
    if !path.exists() {
        tracing::info!("No archive found at {:?}, starting empty", path);
        return Vec::new();
    }

    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            tracing::warn!("Unable to open archive {:?}: {}. Starting empty.", path, e);
            return Vec::new();
        }
    };

    if let Err(e) = file.lock_shared() {
        tracing::warn!("Unable to lock archive {:?}: {}. Starting empty.", path, e);
        return Vec::new();
    }

    let mut contents = String::new();
    let mut reader = std::io::BufReader::new(&file);
    let read_result = reader.read_to_string(&mut contents);
    let _ = file.unlock();

    if let Err(e) = read_result {
        tracing::warn!("Failed to read archive {:?}: {}. Starting empty.", path, e);
        return Vec::new();
    }

    match serde_json::from_str::<Vec<Session>>(&contents) {
        Ok(sessions) => {
            tracing::debug!("Loaded {} archived sessions from {:?}", sessions.len(), path);
            sessions
        }
        Err(e) => {
            tracing::warn!(
                "Archive {:?} is unreadable ({}); starting empty",
                path,
                e
            );
            Vec::new()
        }
    }
}

/// Save the archive atomically: write a locked temp file in the same
/// directory, sync, then rename over the original.
fn save_archive(path: &Path, archive: &[Session]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let temp = NamedTempFile::new_in(path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::Other, "archive path missing parent")
    })?)?;

    temp.as_file().lock_exclusive()?;

    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        let contents = serde_json::to_string(archive)?;
        writer.write_all(contents.as_bytes())?;
        writer.flush()?;
    }

    temp.as_file().sync_all()?;
    temp.as_file().unlock()?;

    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    tracing::debug!("Saved {} archived sessions to {:?}", archive.len(), path);
    Ok(())
}
