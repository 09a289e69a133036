//! Snapshots and the linear undo stack that holds them.

use crate::document::DocumentState;
use crate::error::HistoryError;
use std::sync::Arc;

bitflags::bitflags! {
    /// How a recorded step should be treated.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct UndoPush: u8 {
        /// This step alone may justify a durable checkpoint.
        const AUTOSAVE = 1 << 0;
        /// Continuation of the previous step with the same description; folded
        /// into it instead of becoming a separate undo stop.
        const CONSOLIDATE = 1 << 1;
        /// The first snapshot of a document. Never amended or popped.
        const INITIAL = 1 << 2;
    }
}

/// Identity of one recorded snapshot, unique within its history.
///
/// An amend produces a new id at the same index, which is how the autosave
/// bookkeeping notices that the state at an index has changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnapshotId(pub u64);

/// Immutable capture of the document at one point in history.
#[derive(Debug, Clone)]
pub struct Snapshot {
    id: SnapshotId,
    state: DocumentState,
    short_description: String,
    long_description: String,
    flags: UndoPush,
}

impl Snapshot {
    pub fn new(
        id: SnapshotId,
        state: DocumentState,
        short_description: impl Into<String>,
        long_description: impl Into<String>,
        flags: UndoPush,
    ) -> Self {
        Self {
            id,
            state,
            short_description: short_description.into(),
            long_description: long_description.into(),
            flags,
        }
    }

    pub fn id(&self) -> SnapshotId {
        self.id
    }

    pub fn state(&self) -> &DocumentState {
        &self.state
    }

    pub fn short_description(&self) -> &str {
        &self.short_description
    }

    pub fn long_description(&self) -> &str {
        &self.long_description
    }

    pub fn flags(&self) -> UndoPush {
        self.flags
    }

    pub fn is_initial(&self) -> bool {
        self.flags.contains(UndoPush::INITIAL)
    }
}

/// Ordered snapshots plus the index of the one matching the live document.
///
/// Index 0 is the initial snapshot. There is a single timeline: pushing below
/// the top throws the redo tail away.
#[derive(Debug, Default)]
pub struct HistoryStack {
    entries: Vec<Arc<Snapshot>>,
    current: usize,
}

impl HistoryStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a fresh stack. Only legal while the stack is empty.
    pub fn initial_state(&mut self, snapshot: Arc<Snapshot>) -> Result<(), HistoryError> {
        if !self.entries.is_empty() {
            return Err(HistoryError::InvalidState(
                "initial state on a non-empty history",
            ));
        }
        self.entries.push(snapshot);
        self.current = 0;
        Ok(())
    }

    /// Commit a new step after the current one. Returns how many redo entries
    /// were discarded.
    pub fn push(&mut self, snapshot: Arc<Snapshot>) -> usize {
        debug_assert!(!self.entries.is_empty(), "push before initial state");
        let keep = (self.current + 1).min(self.entries.len());
        let discarded = self.entries.len() - keep;
        self.entries.truncate(keep);
        self.entries.push(snapshot);
        self.current = self.entries.len() - 1;
        discarded
    }

    /// Replace the current entry in place. The redo tail is kept.
    pub fn amend_top(&mut self, snapshot: Arc<Snapshot>) -> Result<(), HistoryError> {
        if self.entries.is_empty() {
            return Err(HistoryError::InvalidState("amend on an empty history"));
        }
        if self.current == 0 {
            return Err(HistoryError::InvalidState(
                "the initial state cannot be amended",
            ));
        }
        self.entries[self.current] = snapshot;
        Ok(())
    }

    /// The committed snapshot a cancelled edit falls back to. Does not touch the stack.
    pub fn rollback_to_top(&self) -> Result<Arc<Snapshot>, HistoryError> {
        self.top()
            .cloned()
            .ok_or(HistoryError::InvalidState("rollback on an empty history"))
    }

    pub fn move_to(&mut self, index: usize) -> Result<Arc<Snapshot>, HistoryError> {
        let snapshot = self
            .entries
            .get(index)
            .cloned()
            .ok_or(HistoryError::OutOfRange {
                index,
                len: self.entries.len(),
            })?;
        self.current = index;
        Ok(snapshot)
    }

    pub fn can_undo(&self) -> bool {
        self.current > 0
    }

    pub fn can_redo(&self) -> bool {
        self.current + 1 < self.entries.len()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn top(&self) -> Option<&Arc<Snapshot>> {
        self.entries.get(self.current)
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Snapshot>> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Snapshot>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.current = 0;
    }
}
