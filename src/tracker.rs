//! Per-instance change tracker.
//!
//! A [`ChangeTracker`] owns one tracked instance together with its snapshot
//! history. The environment drives it: construction performs the initial
//! capture, then `record_event` is called once per save or delete. Every
//! capture after the first is reported to the configured sink.

use crate::error::{ChangesError, Result};
use crate::history::SnapshotHistory;
use crate::model::TrackedModel;
use crate::types::{diff, Changes, EventKind, Sequence, Snapshot};
use std::fmt;
use std::sync::Arc;
use tracing::{trace, warn};

/// Callback invoked after every non-initial capture.
///
/// The tracked instance is reachable through [`ChangeTracker::instance`].
pub type ChangeSink<M> = Arc<dyn Fn(&ChangeTracker<M>) + Send + Sync>;

/// Tracks the field-value history of one instance.
pub struct ChangeTracker<M: TrackedModel> {
    instance: M,
    history: SnapshotHistory,
    sink: Option<ChangeSink<M>>,
    /// Sequence of the last accepted capture (the initial capture is 0).
    sequence: Sequence,
    last_event: EventKind,
}

impl<M: TrackedModel> ChangeTracker<M> {
    /// Start tracking `instance` without a change sink.
    pub fn new(instance: M) -> Result<Self> {
        Self::build(instance, None)
    }

    /// Start tracking `instance`, reporting later captures to `sink`.
    pub fn with_sink(instance: M, sink: ChangeSink<M>) -> Result<Self> {
        Self::build(instance, Some(sink))
    }

    fn build(instance: M, sink: Option<ChangeSink<M>>) -> Result<Self> {
        let snapshot = instance.read_fields()?;
        let mut history = SnapshotHistory::new();
        history.push(snapshot);

        trace!(model = M::MODEL_NAME, "initial snapshot captured");

        Ok(Self {
            instance,
            history,
            sink,
            sequence: Sequence::default(),
            last_event: EventKind::Init,
        })
    }

    // --- Capture ---

    /// Capture a snapshot for a save or delete.
    ///
    /// Fails with `OutOfOrderEvent` when no sequence is left after the last
    /// accepted one (after `record_event_at` with `Sequence(u64::MAX)`).
    pub fn record_event(&mut self, event: EventKind) -> Result<()> {
        let sequence = self.sequence.next().ok_or(ChangesError::OutOfOrderEvent {
            last: self.sequence,
            got: self.sequence,
        })?;
        self.capture(event, sequence)
    }

    /// Capture a snapshot for an event stamped by the environment.
    ///
    /// `sequence` must be strictly greater than the last accepted one;
    /// otherwise the event is rejected and history is left untouched.
    pub fn record_event_at(&mut self, event: EventKind, sequence: Sequence) -> Result<()> {
        if sequence <= self.sequence {
            warn!(
                model = M::MODEL_NAME,
                last = self.sequence.0,
                got = sequence.0,
                "rejecting out of order event"
            );
            return Err(ChangesError::OutOfOrderEvent {
                last: self.sequence,
                got: sequence,
            });
        }
        self.capture(event, sequence)
    }

    fn capture(&mut self, event: EventKind, sequence: Sequence) -> Result<()> {
        if event == EventKind::Init {
            warn!(model = M::MODEL_NAME, "init event after construction");
            return Err(ChangesError::InvalidEvent(event));
        }

        let snapshot = if event == EventKind::Delete {
            // A deleted record has no identity. The key is cleared only once
            // the read succeeded, so a failed read leaves the instance as is.
            let pk = M::primary_key_field()?;
            let snapshot = self.instance.read_fields()?;
            self.instance.clear_primary_key();
            snapshot.with(pk, self.instance.primary_key())
        } else {
            self.instance.read_fields()?
        };
        self.history.push(snapshot);
        self.sequence = sequence;
        self.last_event = event;

        trace!(
            model = M::MODEL_NAME,
            event = %event,
            sequence = sequence.0,
            "snapshot captured"
        );

        if let Some(sink) = self.sink.clone() {
            sink(&*self);
        }

        Ok(())
    }

    // --- States ---

    /// Snapshot taken at the most recent event.
    pub fn current_state(&self) -> Result<&Snapshot> {
        self.history.current()
    }

    /// Snapshot taken at the event before the most recent one.
    pub fn previous_state(&self) -> Result<&Snapshot> {
        self.history.previous()
    }

    /// Oldest retained snapshot, falling back to `previous_state`.
    pub fn old_state(&self) -> Result<&Snapshot> {
        self.history.old()
    }

    // --- Changes ---

    /// Changes from the previous state to the current state.
    pub fn changes(&self) -> Result<Changes> {
        Ok(diff(self.previous_state()?, self.current_state()?))
    }

    /// Changes from the old state to the current state.
    pub fn old_changes(&self) -> Result<Changes> {
        Ok(diff(self.old_state()?, self.current_state()?))
    }

    /// Changes from the old state to the previous state.
    pub fn previous_changes(&self) -> Result<Changes> {
        Ok(diff(self.old_state()?, self.previous_state()?))
    }

    // --- Persistence ---

    /// Whether the instance had a primary key in its old state.
    pub fn was_persisted(&self) -> Result<bool> {
        let pk = M::primary_key_field()?;
        Ok(self.old_state()?.value(pk).is_set())
    }

    /// Whether the live instance currently has a primary key.
    ///
    /// Reads the instance, not the history, so it reflects mutations made
    /// since the last event.
    pub fn is_persisted(&self) -> bool {
        self.instance.primary_key().is_set()
    }

    // --- Reconstruction ---

    /// Detached instance rebuilt from the old state.
    pub fn old_instance(&self) -> Result<M> {
        Ok(M::construct(self.old_state()?)?)
    }

    /// Detached instance rebuilt from the previous state.
    pub fn previous_instance(&self) -> Result<M> {
        Ok(M::construct(self.previous_state()?)?)
    }

    // --- Accessors ---

    pub fn instance(&self) -> &M {
        &self.instance
    }

    /// Mutable access to the live instance. Mutations are not captured
    /// until the next event.
    pub fn instance_mut(&mut self) -> &mut M {
        &mut self.instance
    }

    pub fn into_inner(self) -> M {
        self.instance
    }

    pub fn history(&self) -> &SnapshotHistory {
        &self.history
    }

    pub fn sequence(&self) -> Sequence {
        self.sequence
    }

    pub fn last_event(&self) -> EventKind {
        self.last_event
    }

    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }
}

impl<M: TrackedModel + fmt::Debug> fmt::Debug for ChangeTracker<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeTracker")
            .field("model", &M::MODEL_NAME)
            .field("instance", &self.instance)
            .field("history", &self.history)
            .field("sequence", &self.sequence)
            .field("last_event", &self.last_event)
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}
