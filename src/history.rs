//! Bounded snapshot history.
//!
//! Each tracked instance keeps its latest capture plus a two-slot FIFO window
//! of the captures it superseded, oldest first. That answers "what changed
//! since the last event" (previous -> current) as well as "what changed in
//! the event before that" (old -> previous), and nothing older is ever needed.
//!
//! ```text
//!   old()                 previous()              current()
//!     |---previous_changes--|-------changes()--------|
//!     |--------------------old_changes()-------------|
//! ```

use crate::error::{ChangesError, Result};
use crate::types::Snapshot;
use std::collections::VecDeque;

/// Number of superseded snapshots retained per instance.
pub const HISTORY_DEPTH: usize = 2;

/// Latest capture plus a bounded window of the captures before it.
#[derive(Clone, Debug, Default)]
pub struct SnapshotHistory {
    /// Most recent capture.
    head: Option<Snapshot>,
    /// Superseded captures, oldest first. Never longer than `HISTORY_DEPTH`.
    window: VecDeque<Snapshot>,
}

impl SnapshotHistory {
    pub fn new() -> Self {
        Self {
            head: None,
            window: VecDeque::with_capacity(HISTORY_DEPTH),
        }
    }

    /// Record a new capture.
    ///
    /// The previous head moves into the window; when the window is already
    /// full its oldest entry is evicted first.
    pub fn push(&mut self, snapshot: Snapshot) {
        if let Some(superseded) = self.head.replace(snapshot) {
            if self.window.len() == HISTORY_DEPTH {
                self.window.pop_front();
            }
            self.window.push_back(superseded);
        }
    }

    /// The most recently captured snapshot.
    pub fn current(&self) -> Result<&Snapshot> {
        self.head.as_ref().ok_or(ChangesError::EmptyHistory)
    }

    /// The capture before `current`, or `current` when there is only one.
    pub fn previous(&self) -> Result<&Snapshot> {
        match self.window.back() {
            Some(snapshot) => Ok(snapshot),
            None => self.current(),
        }
    }

    /// The oldest retained capture; equals `previous` until a third capture.
    pub fn old(&self) -> Result<&Snapshot> {
        match self.window.front() {
            Some(snapshot) => Ok(snapshot),
            None => self.current(),
        }
    }

    /// Number of superseded snapshots in the window (at most `HISTORY_DEPTH`).
    pub fn depth(&self) -> usize {
        self.window.len()
    }

    /// Whether nothing has been captured yet.
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Retained snapshots, oldest first, ending with `current`.
    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.window.iter().chain(self.head.iter())
    }
}
