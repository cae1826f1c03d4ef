//! The session screen's state, with pure update functions.
//!
//! A single owner (the session controller) holds a `ShareState` and is the
//! only one to mutate it.

use std::sync::Arc;

use crate::domain::{SessionPhase, SharedFile};

/// What happened to a fetched file list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileListUpdate {
    Replaced,
    /// Deep-equal to the current list; the current `Arc` is kept.
    Unchanged,
    /// Fetched for a passkey that is no longer the active one.
    Stale,
}

#[derive(Debug, Clone)]
pub struct ShareState {
    phase: SessionPhase,
    files: Arc<Vec<SharedFile>>,
    /// The passkey `files` was fetched for.
    files_passkey: Option<String>,
}

impl Default for ShareState {
    fn default() -> Self {
        Self::new()
    }
}

impl ShareState {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::NoSession,
            files: Arc::new(Vec::new()),
            files_passkey: None,
        }
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn passkey(&self) -> Option<&str> {
        self.phase.passkey()
    }

    pub fn files(&self) -> &Arc<Vec<SharedFile>> {
        &self.files
    }

    /// Moves into a transitional phase (`Creating` / `Joining`) and returns
    /// the phase to restore if the request fails.
    pub fn begin(&mut self, transitional: SessionPhase) -> SessionPhase {
        std::mem::replace(&mut self.phase, transitional)
    }

    /// Puts back the phase saved by [`ShareState::begin`], unless something
    /// else (a leave) moved the state on in the meantime.
    pub fn restore(&mut self, previous: SessionPhase) {
        if matches!(self.phase, SessionPhase::Creating | SessionPhase::Joining) {
            self.phase = previous;
        }
    }

    /// Finishes what [`ShareState::begin`] started by adopting `passkey`.
    ///
    /// Returns `None` without touching anything if the transitional phase is
    /// gone, i.e. the session was left while the request was in flight.
    pub fn complete(&mut self, passkey: &str) -> Option<bool> {
        if !matches!(self.phase, SessionPhase::Creating | SessionPhase::Joining) {
            return None;
        }
        Some(self.enter_session(passkey))
    }

    /// Adopts `passkey` as the active session. Files cached for another
    /// passkey are dropped. Returns whether the visible file list changed.
    pub fn enter_session(&mut self, passkey: &str) -> bool {
        self.phase = SessionPhase::InSession {
            passkey: passkey.to_string(),
        };
        if self.files_passkey.as_deref() == Some(passkey) {
            return false;
        }
        self.files_passkey = Some(passkey.to_string());
        if self.files.is_empty() {
            false
        } else {
            self.files = Arc::new(Vec::new());
            true
        }
    }

    /// Forgets the session. Returns whether the visible file list changed.
    pub fn leave(&mut self) -> bool {
        self.phase = SessionPhase::NoSession;
        self.files_passkey = None;
        if self.files.is_empty() {
            false
        } else {
            self.files = Arc::new(Vec::new());
            true
        }
    }

    pub fn replace_files(&mut self, passkey: &str, files: Vec<SharedFile>) -> FileListUpdate {
        if self.passkey() != Some(passkey) {
            return FileListUpdate::Stale;
        }
        if *self.files == files {
            return FileListUpdate::Unchanged;
        }
        self.files = Arc::new(files);
        self.files_passkey = Some(passkey.to_string());
        FileListUpdate::Replaced
    }
}
