//! Dirty flag and autosave gating.
//!
//! Checkpoints can mean writing hours of sample data, so a write is only asked
//! for when the caller opted in *and* the recorded state differs from the one
//! last known to be on disk (or an earlier write failed and is still owed).

use crate::history::SnapshotId;

/// A position in history pinned to the snapshot that occupied it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryMark {
    pub index: usize,
    pub id: SnapshotId,
}

#[derive(Debug)]
pub struct AutosaveCoordinator {
    enabled: bool,
    dirty: bool,
    /// Last state durably written, by autosave or explicit save.
    persisted: Option<HistoryMark>,
    /// Where the user last explicitly saved.
    saved: Option<HistoryMark>,
    in_flight: Option<HistoryMark>,
    retry_pending: bool,
}

impl AutosaveCoordinator {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            dirty: false,
            persisted: None,
            saved: None,
            in_flight: None,
            retry_pending: false,
        }
    }

    /// A freshly seeded history counts as persisted and saved.
    pub fn reset(&mut self, initial: HistoryMark) {
        self.dirty = false;
        self.persisted = Some(initial);
        self.saved = Some(initial);
        self.in_flight = None;
        self.retry_pending = false;
    }

    pub fn clear(&mut self) {
        self.dirty = false;
        self.persisted = None;
        self.saved = None;
        self.in_flight = None;
        self.retry_pending = false;
    }

    pub fn dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Explicit flag access. Clearing it means the caller just saved `top`.
    pub fn set_dirty(&mut self, value: bool, top: Option<HistoryMark>) {
        self.dirty = value;
        if !value {
            self.persisted = top;
            self.saved = top;
        }
    }

    /// The document never reached an explicit save, e.g. it was recovered
    /// from a crash checkpoint.
    pub fn forget_save_point(&mut self) {
        self.saved = None;
        self.dirty = true;
    }

    /// Entries after `current` are about to be discarded; forget marks into them.
    pub fn truncate_after(&mut self, current: usize) {
        let keep = |mark: Option<HistoryMark>| mark.filter(|m| m.index <= current);
        self.persisted = keep(self.persisted);
        self.saved = keep(self.saved);
    }

    /// Navigation landed on `top`.
    pub fn navigated(&mut self, top: HistoryMark) {
        self.dirty = self.persisted != Some(top);
    }

    pub fn last_persisted(&self) -> Option<HistoryMark> {
        self.persisted
    }

    pub fn unsaved_changes(&self, top: Option<HistoryMark>) -> bool {
        self.saved != top
    }

    pub fn wants_checkpoint(&self, top: HistoryMark, opted_in: bool) -> bool {
        if !self.enabled || !opted_in {
            return false;
        }
        if self.retry_pending {
            return true;
        }
        self.persisted != Some(top) && self.in_flight != Some(top)
    }

    pub fn requested(&mut self, mark: HistoryMark) {
        self.in_flight = Some(mark);
        self.retry_pending = false;
    }

    pub fn request_failed(&mut self) {
        self.retry_pending = true;
    }

    /// Apply a write completion. `still_current` tells whether the written
    /// snapshot still occupies its index.
    pub fn completed(&mut self, mark: HistoryMark, ok: bool, still_current: bool) {
        if self.in_flight == Some(mark) {
            self.in_flight = None;
        }
        if !ok {
            self.retry_pending = true;
            return;
        }
        if still_current {
            self.persisted = Some(mark);
            if self.saved == Some(mark) {
                self.dirty = false;
            }
        }
    }

    pub fn retry_pending(&self) -> bool {
        self.retry_pending
    }
}
