//! The single entry point commands use to record what they did to a document.
//!
//! Commands mutate the live document themselves and then call in here to turn
//! the result into a history step. Every call takes the document explicitly;
//! there is no process-wide "current project".

use crate::autosave::{CheckpointOutcome, CheckpointSink};
use crate::coordinator::{AutosaveCoordinator, HistoryMark};
use crate::document::{DocumentState, LiveDocument};
use crate::error::HistoryError;
use crate::history::{HistoryStack, Snapshot, SnapshotId, UndoPush};
use std::sync::Arc;

/// Best-effort notifications for whoever redraws the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryEvent {
    Pushed { index: usize },
    Modified { index: usize },
    Restored { index: usize },
    Reset,
    CheckpointFailed { message: String },
}

pub struct ProjectHistory {
    stack: HistoryStack,
    autosave: AutosaveCoordinator,
    checkpoints: Option<Box<dyn CheckpointSink>>,
    events: Option<rtrb::Producer<HistoryEvent>>,
    default_flags: UndoPush,
    next_id: u64,
}

impl Default for ProjectHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectHistory {
    pub fn new() -> Self {
        Self {
            stack: HistoryStack::new(),
            autosave: AutosaveCoordinator::new(true),
            checkpoints: None,
            events: None,
            default_flags: UndoPush::AUTOSAVE,
            next_id: 0,
        }
    }

    /// Flags used by [`ProjectHistory::push_state_default`].
    pub fn with_default_flags(mut self, flags: UndoPush) -> Self {
        self.default_flags = flags - UndoPush::INITIAL;
        self
    }

    pub fn with_autosave_enabled(mut self, enabled: bool) -> Self {
        self.autosave = AutosaveCoordinator::new(enabled);
        self
    }

    pub fn set_checkpoint_sink(&mut self, sink: Box<dyn CheckpointSink>) {
        self.checkpoints = Some(sink);
    }

    /// Route [`HistoryEvent`]s into a ring of `capacity` entries. Events that
    /// do not fit are dropped.
    pub fn subscribe(&mut self, capacity: usize) -> rtrb::Consumer<HistoryEvent> {
        let (producer, consumer) = rtrb::RingBuffer::new(capacity);
        self.events = Some(producer);
        consumer
    }

    pub fn initial_state(&mut self, doc: &impl LiveDocument) -> Result<(), HistoryError> {
        let snapshot = self.snapshot(doc.capture(), "Created new project", "", UndoPush::INITIAL);
        let mark = mark_of(0, &snapshot);
        self.stack.initial_state(snapshot)?;
        self.autosave.reset(mark);
        tracing::debug!("history seeded");
        self.notify(HistoryEvent::Reset);
        Ok(())
    }

    pub fn push_state_default(
        &mut self,
        doc: &impl LiveDocument,
        short_description: &str,
        long_description: &str,
    ) -> Result<(), HistoryError> {
        self.push_state(doc, short_description, long_description, self.default_flags)
    }

    /// Record the live document as a new undo step.
    ///
    /// With [`UndoPush::CONSOLIDATE`], a step continuing a consolidating top
    /// with the same descriptions replaces it instead.
    pub fn push_state(
        &mut self,
        doc: &impl LiveDocument,
        short_description: &str,
        long_description: &str,
        flags: UndoPush,
    ) -> Result<(), HistoryError> {
        if self.stack.is_empty() {
            return Err(HistoryError::InvalidState("push before initial state"));
        }
        let flags = flags - UndoPush::INITIAL;
        let consolidate = flags.contains(UndoPush::CONSOLIDATE)
            && self.can_consolidate(short_description, long_description);
        let snapshot =
            self.snapshot(doc.capture(), short_description, long_description, flags);

        let index = if consolidate {
            self.stack.amend_top(snapshot)?;
            self.stack.current_index()
        } else {
            self.autosave.truncate_after(self.stack.current_index());
            let discarded = self.stack.push(snapshot);
            if discarded > 0 {
                tracing::debug!(discarded, "redo history discarded");
            }
            self.stack.current_index()
        };

        tracing::debug!(index, short_description, consolidate, "history push");
        self.autosave.mark_dirty();
        self.notify(if consolidate {
            HistoryEvent::Modified { index }
        } else {
            HistoryEvent::Pushed { index }
        });
        self.request_checkpoint(flags.contains(UndoPush::AUTOSAVE));
        Ok(())
    }

    /// Fold the live document into the current step without adding an undo stop.
    pub fn modify_state(
        &mut self,
        doc: &impl LiveDocument,
        want_autosave: bool,
    ) -> Result<(), HistoryError> {
        let top = self
            .stack
            .top()
            .cloned()
            .ok_or(HistoryError::InvalidState("modify before initial state"))?;
        let snapshot = self.snapshot(
            doc.capture(),
            top.short_description(),
            top.long_description(),
            top.flags(),
        );
        self.stack.amend_top(snapshot)?;

        let index = self.stack.current_index();
        tracing::debug!(index, want_autosave, "history modify");
        self.autosave.mark_dirty();
        self.notify(HistoryEvent::Modified { index });
        self.request_checkpoint(want_autosave);
        Ok(())
    }

    /// Throw away live edits not yet recorded, going back to the current step.
    pub fn rollback_state(&mut self, doc: &mut impl LiveDocument) -> Result<(), HistoryError> {
        let top = self.stack.rollback_to_top()?;
        doc.restore(top.state());
        let index = self.stack.current_index();
        tracing::debug!(index, "history rollback");
        self.notify(HistoryEvent::Restored { index });
        Ok(())
    }

    /// Put the document back into the state recorded at `index`.
    pub fn set_state_to(
        &mut self,
        doc: &mut impl LiveDocument,
        index: usize,
    ) -> Result<(), HistoryError> {
        let snapshot = self.stack.move_to(index)?;
        doc.restore(snapshot.state());
        self.autosave.navigated(mark_of(index, &snapshot));
        tracing::debug!(index, description = snapshot.short_description(), "history moved");
        self.notify(HistoryEvent::Restored { index });
        Ok(())
    }

    pub fn undo(&mut self, doc: &mut impl LiveDocument) -> Result<(), HistoryError> {
        if !self.can_undo() {
            return Err(HistoryError::NothingToUndo);
        }
        self.set_state_to(doc, self.stack.current_index() - 1)
    }

    pub fn redo(&mut self, doc: &mut impl LiveDocument) -> Result<(), HistoryError> {
        if !self.can_redo() {
            return Err(HistoryError::NothingToRedo);
        }
        self.set_state_to(doc, self.stack.current_index() + 1)
    }

    pub fn can_undo(&self) -> bool {
        self.stack.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.stack.can_redo()
    }

    pub fn dirty(&self) -> bool {
        self.autosave.dirty()
    }

    /// `false` records that the current state was just saved by the caller.
    pub fn set_dirty(&mut self, value: bool) {
        let top = self.top_mark();
        self.autosave.set_dirty(value, top);
    }

    /// Treat the current state as never saved by the user.
    pub fn forget_save_point(&mut self) {
        self.autosave.forget_save_point();
    }

    /// The live document differs from where the user last explicitly saved.
    pub fn unsaved_changes(&self) -> bool {
        self.autosave.unsaved_changes(self.top_mark())
    }

    pub fn current_index(&self) -> usize {
        self.stack.current_index()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn last_persisted_index(&self) -> Option<usize> {
        self.autosave.last_persisted().map(|mark| mark.index)
    }

    pub fn top(&self) -> Option<&Arc<Snapshot>> {
        self.stack.top()
    }

    /// `(short, long)` descriptions, oldest first, for a history window.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.stack
            .iter()
            .map(|s| (s.short_description(), s.long_description()))
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.can_undo()
            .then(|| self.stack.top())
            .flatten()
            .map(|s| s.short_description())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.stack
            .get(self.stack.current_index() + 1)
            .map(|s| s.short_description())
    }

    /// Feed back the result of a checkpoint write. A failed write comes back
    /// as [`HistoryError::Persistence`]; history is unaffected and the write is
    /// retried on the next qualifying push or modify.
    pub fn checkpoint_finished(&mut self, outcome: CheckpointOutcome) -> Result<(), HistoryError> {
        let mark = outcome.mark;
        let still_current = self
            .stack
            .get(mark.index)
            .is_some_and(|s| s.id() == mark.id);
        self.autosave
            .completed(mark, outcome.result.is_ok(), still_current);

        match outcome.result {
            Ok(()) => {
                tracing::debug!(index = mark.index, still_current, "checkpoint persisted");
                Ok(())
            }
            Err(message) => {
                tracing::warn!(index = mark.index, %message, "checkpoint failed, will retry");
                self.notify(HistoryEvent::CheckpointFailed {
                    message: message.clone(),
                });
                Err(HistoryError::Persistence(message))
            }
        }
    }

    /// Drop every state. The history must be seeded again before use.
    pub fn clear_states(&mut self) {
        self.stack.clear();
        self.autosave.clear();
    }

    /// Clean close: the autosave artifact is deleted and all states dropped.
    pub fn close(&mut self) {
        self.delete_autosave_artifact();
        self.clear_states();
        tracing::debug!("history closed");
    }

    /// Empty the document and start a new history from it. The checkpoint of
    /// the discarded document is deleted so a crash cannot bring it back.
    pub fn reset_to_empty(&mut self, doc: &mut impl LiveDocument) -> Result<(), HistoryError> {
        doc.restore(&DocumentState::default());
        self.delete_autosave_artifact();
        self.clear_states();
        self.initial_state(&*doc)
    }

    fn delete_autosave_artifact(&mut self) {
        if let Some(sink) = self.checkpoints.as_mut() {
            sink.delete_autosave_artifact();
            tracing::debug!("autosave artifact deletion requested");
        }
    }

    /// Both descriptions must match: the long one names the edited object, so
    /// drags on two different tracks stay separate steps.
    fn can_consolidate(&self, short_description: &str, long_description: &str) -> bool {
        self.stack.can_undo()
            && !self.stack.can_redo()
            && self.stack.top().is_some_and(|top| {
                top.flags().contains(UndoPush::CONSOLIDATE)
                    && top.short_description() == short_description
                    && top.long_description() == long_description
            })
    }

    fn snapshot(
        &mut self,
        state: DocumentState,
        short_description: &str,
        long_description: &str,
        flags: UndoPush,
    ) -> Arc<Snapshot> {
        let id = SnapshotId(self.next_id);
        self.next_id += 1;
        Arc::new(Snapshot::new(id, state, short_description, long_description, flags))
    }

    fn top_mark(&self) -> Option<HistoryMark> {
        let index = self.stack.current_index();
        self.stack.top().map(|top| mark_of(index, top))
    }

    fn request_checkpoint(&mut self, opted_in: bool) {
        let Some(mark) = self.top_mark() else {
            return;
        };
        if !self.autosave.wants_checkpoint(mark, opted_in) {
            return;
        }
        let (Some(sink), Some(top)) = (self.checkpoints.as_mut(), self.stack.top()) else {
            return;
        };

        match sink.request_checkpoint(mark, top.clone()) {
            Ok(()) => {
                tracing::debug!(index = mark.index, "checkpoint requested");
                self.autosave.requested(mark);
            }
            Err(error) => {
                tracing::warn!(index = mark.index, %error, "checkpoint request failed");
                self.autosave.request_failed();
                self.notify(HistoryEvent::CheckpointFailed {
                    message: error.to_string(),
                });
            }
        }
    }

    fn notify(&mut self, event: HistoryEvent) {
        if let Some(events) = self.events.as_mut() {
            let _ = events.push(event);
        }
    }
}

fn mark_of(index: usize, snapshot: &Snapshot) -> HistoryMark {
    HistoryMark {
        index,
        id: snapshot.id(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorded {
        requests: Vec<HistoryMark>,
        deletes: usize,
        fail_requests: bool,
    }

    #[derive(Clone, Default)]
    struct RecordingSink(Rc<RefCell<Recorded>>);

    impl CheckpointSink for RecordingSink {
        fn request_checkpoint(
            &mut self,
            mark: HistoryMark,
            _snapshot: Arc<Snapshot>,
        ) -> Result<(), HistoryError> {
            let mut recorded = self.0.borrow_mut();
            if recorded.fail_requests {
                return Err(HistoryError::Persistence("disk full".to_string()));
            }
            recorded.requests.push(mark);
            Ok(())
        }

        fn delete_autosave_artifact(&mut self) {
            self.0.borrow_mut().deletes += 1;
        }
    }

    fn seeded() -> (Document, ProjectHistory, RecordingSink) {
        let document = Document::new();
        let mut history = ProjectHistory::new();
        let sink = RecordingSink::default();
        history.set_checkpoint_sink(Box::new(sink.clone()));
        history.initial_state(&document).expect("initial state");
        (document, history, sink)
    }

    fn ok(mark: HistoryMark) -> CheckpointOutcome {
        CheckpointOutcome {
            mark,
            result: Ok(()),
        }
    }

    #[test]
    fn test_initial_state() {
        let (document, mut history, _) = seeded();

        assert!(!history.dirty());
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert_eq!(history.last_persisted_index(), Some(0));
        assert!(history.top().expect("top").is_initial());
        assert!(matches!(
            history.initial_state(&document),
            Err(HistoryError::InvalidState(_))
        ));
    }

    #[test]
    fn test_add_track_undo_redo_scenario() {
        let (mut document, mut history, _) = seeded();

        document.add_track("Audio 1");
        history
            .push_state(&document, "Add Track", "Added track", UndoPush::empty())
            .expect("push");
        assert_eq!(history.current_index(), 1);
        assert!(history.dirty());
        let after_push = document.capture();

        history.undo(&mut document).expect("undo");
        assert_eq!(history.current_index(), 0);
        assert!(document.is_empty());

        history.redo(&mut document).expect("redo");
        assert_eq!(history.current_index(), 1);
        assert_eq!(document.capture(), after_push);
        assert!(history.dirty());
    }

    #[test]
    fn test_undo_redo_unavailable() {
        let (mut document, mut history, _) = seeded();

        assert_eq!(history.undo(&mut document), Err(HistoryError::NothingToUndo));
        assert_eq!(history.redo(&mut document), Err(HistoryError::NothingToRedo));
    }

    #[test]
    fn test_set_state_to_out_of_range_leaves_document() {
        let (mut document, mut history, _) = seeded();
        document.add_track("Audio 1");
        history
            .push_state(&document, "Add Track", "Added track", UndoPush::empty())
            .expect("push");
        let before = document.capture();

        let err = history.set_state_to(&mut document, 5).unwrap_err();

        assert_eq!(err, HistoryError::OutOfRange { index: 5, len: 2 });
        assert_eq!(history.current_index(), 1);
        assert_eq!(document.capture(), before);
    }

    #[test]
    fn test_snapshots_survive_later_edits() {
        let (mut document, mut history, _) = seeded();
        let id = document.add_track("Drums");
        history
            .push_state(&document, "Add Track", "Added track", UndoPush::empty())
            .expect("push");

        document.track_mut(id).expect("track").volume = 0.1;
        history
            .push_state(&document, "Volume", "Changed volume", UndoPush::empty())
            .expect("push");

        history.undo(&mut document).expect("undo");
        assert_eq!(document.track(id).expect("track").volume, 1.0);
        history.redo(&mut document).expect("redo");
        assert_eq!(document.track(id).expect("track").volume, 0.1);
    }

    #[test]
    fn test_modify_state_repeatedly_keeps_one_entry() {
        let (mut document, mut history, sink) = seeded();
        let id = document.add_track("Synth");
        history
            .push_state(&document, "Add Track", "Added track", UndoPush::empty())
            .expect("push");

        for step in 1..=10 {
            document.track_mut(id).expect("track").pan = step as f32 / 10.0;
            history.modify_state(&document, true).expect("modify");
        }

        assert_eq!(history.len(), 2);
        assert_eq!(history.current_index(), 1);
        assert_eq!(document.track(id).expect("track").pan, 1.0);
        let top = history.top().expect("top");
        assert_eq!(top.state().tracks[0].pan, 1.0);
        assert_eq!(top.short_description(), "Add Track");
        // each tweak is a new state at the same index
        assert_eq!(sink.0.borrow().requests.len(), 10);
    }

    #[test]
    fn test_modify_initial_state_is_invalid() {
        let (document, mut history, _) = seeded();

        assert!(matches!(
            history.modify_state(&document, false),
            Err(HistoryError::InvalidState(_))
        ));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_rollback_discards_unrecorded_edit() {
        let (mut document, mut history, _) = seeded();
        let id = document.add_track("Gtr");
        history
            .push_state(&document, "Add Track", "Added track", UndoPush::empty())
            .expect("push");
        let recorded = document.capture();

        document.track_mut(id).expect("track").name = "Preview".to_string();
        history.rollback_state(&mut document).expect("rollback");

        assert_eq!(document.capture(), recorded);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_autosave_only_for_candidates() {
        let (mut document, mut history, sink) = seeded();

        document.add_track("A");
        history
            .push_state(&document, "Add Track", "Added track", UndoPush::empty())
            .expect("push");
        assert!(sink.0.borrow().requests.is_empty());

        document.add_track("B");
        history
            .push_state(&document, "Add Track", "Added track", UndoPush::AUTOSAVE)
            .expect("push");
        assert_eq!(sink.0.borrow().requests.len(), 1);
        assert_eq!(sink.0.borrow().requests[0].index, 2);
    }

    #[test]
    fn test_successful_checkpoint_advances_persisted_index() {
        let (mut document, mut history, sink) = seeded();
        document.add_track("A");
        history
            .push_state_default(&document, "Add Track", "Added track")
            .expect("push");
        let mark = sink.0.borrow().requests[0];

        history.checkpoint_finished(ok(mark)).expect("persisted");

        assert_eq!(history.last_persisted_index(), Some(history.current_index()));
        assert!(history.dirty(), "autosave is not an explicit save");

        history.set_dirty(false);
        assert!(!history.dirty());
        assert!(!history.unsaved_changes());
    }

    #[test]
    fn test_failed_checkpoint_is_reported_and_retried() {
        let (mut document, mut history, sink) = seeded();
        let id = document.add_track("A");
        history
            .push_state_default(&document, "Add Track", "Added track")
            .expect("push");
        let mark = sink.0.borrow().requests[0];

        let err = history
            .checkpoint_finished(CheckpointOutcome {
                mark,
                result: Err("disk full".to_string()),
            })
            .unwrap_err();
        assert_eq!(err, HistoryError::Persistence("disk full".to_string()));
        assert_eq!(history.len(), 2);
        assert_eq!(history.last_persisted_index(), Some(0));

        // a non-candidate push does not retry
        document.track_mut(id).expect("track").solo = true;
        history
            .push_state(&document, "Solo", "Soloed", UndoPush::empty())
            .expect("push");
        assert_eq!(sink.0.borrow().requests.len(), 1);

        history.modify_state(&document, true).expect("modify");
        assert_eq!(sink.0.borrow().requests.len(), 2);
    }

    #[test]
    fn test_request_failure_is_retried() {
        let (mut document, mut history, sink) = seeded();
        let mut events = history.subscribe(8);
        sink.0.borrow_mut().fail_requests = true;

        document.add_track("A");
        history
            .push_state_default(&document, "Add Track", "Added track")
            .expect("push is not failed by persistence");
        assert_eq!(events.pop(), Ok(HistoryEvent::Pushed { index: 1 }));
        assert!(matches!(
            events.pop(),
            Ok(HistoryEvent::CheckpointFailed { .. })
        ));

        sink.0.borrow_mut().fail_requests = false;
        history.modify_state(&document, true).expect("modify");
        assert_eq!(sink.0.borrow().requests.len(), 1);
    }

    #[test]
    fn test_stale_checkpoint_completion_is_ignored() {
        let (mut document, mut history, sink) = seeded();
        document.add_track("A");
        history
            .push_state_default(&document, "Add Track", "Added track")
            .expect("push");
        let mark = sink.0.borrow().requests[0];

        history.undo(&mut document).expect("undo");
        document.add_track("B");
        history
            .push_state(&document, "Add Track", "Added other track", UndoPush::empty())
            .expect("push");
        history.checkpoint_finished(ok(mark)).expect("ok");

        assert_eq!(history.last_persisted_index(), Some(0));
    }

    #[test]
    fn test_navigation_dirty_follows_persisted_index() {
        let (mut document, mut history, _) = seeded();
        document.add_track("A");
        history
            .push_state(&document, "Add Track", "Added track", UndoPush::empty())
            .expect("push");

        history.undo(&mut document).expect("undo");
        assert!(!history.dirty());
        history.redo(&mut document).expect("redo");
        assert!(history.dirty());
    }

    #[test]
    fn test_set_dirty_without_write_does_not_crash() {
        let (mut document, mut history, _) = seeded();
        document.add_track("A");
        history
            .push_state(&document, "Add Track", "Added track", UndoPush::empty())
            .expect("push");

        history.set_dirty(false);
        history.set_dirty(false);

        assert!(!history.dirty());
        assert_eq!(history.last_persisted_index(), Some(1));
        history.undo(&mut document).expect("undo");
        assert!(history.dirty());
        assert!(history.unsaved_changes());
    }

    #[test]
    fn test_consolidating_pushes_fold_into_one_step() {
        let (mut document, mut history, _) = seeded();
        let id = document.add_track("A");
        history
            .push_state(&document, "Add Track", "Added track", UndoPush::empty())
            .expect("push");

        for gain in [0.9, 0.8, 0.7] {
            document.track_mut(id).expect("track").volume = gain;
            history
                .push_state(&document, "Volume", "Moved gain slider", UndoPush::CONSOLIDATE)
                .expect("push");
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.top().expect("top").state().tracks[0].volume, 0.7);

        document.track_mut(id).expect("track").pan = 0.5;
        history
            .push_state(&document, "Pan", "Moved pan slider", UndoPush::CONSOLIDATE)
            .expect("push");
        assert_eq!(history.len(), 4);

        history.undo(&mut document).expect("undo");
        assert_eq!(document.track(id).expect("track").volume, 0.7);
        history.undo(&mut document).expect("undo");
        assert_eq!(document.track(id).expect("track").volume, 1.0);
    }

    #[test]
    fn test_consolidate_does_not_fold_over_redo_tail() {
        let (mut document, mut history, _) = seeded();
        let id = document.add_track("A");
        for gain in [0.9, 0.8] {
            document.track_mut(id).expect("track").volume = gain;
            history
                .push_state(&document, "Volume", "Moved gain slider", UndoPush::empty())
                .expect("push");
        }
        history.undo(&mut document).expect("undo");

        history
            .push_state(&document, "Volume", "Moved gain slider", UndoPush::CONSOLIDATE)
            .expect("push");

        assert_eq!(history.len(), 3);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_descriptions() {
        let (mut document, mut history, _) = seeded();
        document.add_track("A");
        history
            .push_state(&document, "Add Track", "Added track", UndoPush::empty())
            .expect("push");
        assert_eq!(history.undo_description(), Some("Add Track"));
        assert_eq!(history.redo_description(), None);

        history.undo(&mut document).expect("undo");
        assert_eq!(history.undo_description(), None);
        assert_eq!(history.redo_description(), Some("Add Track"));

        let shorts: Vec<_> = history.entries().map(|(short, _)| short).collect();
        assert_eq!(shorts, vec!["Created new project", "Add Track"]);
    }

    #[test]
    fn test_close_deletes_artifact_and_clears() {
        let (_, mut history, sink) = seeded();

        history.close();

        assert_eq!(sink.0.borrow().deletes, 1);
        assert!(history.is_empty());
        assert!(!history.dirty());
    }

    #[test]
    fn test_reset_to_empty() {
        let (mut document, mut history, sink) = seeded();
        document.add_track("A");
        history
            .push_state(&document, "Add Track", "Added track", UndoPush::empty())
            .expect("push");

        history.reset_to_empty(&mut document).expect("reset");

        assert!(document.is_empty());
        assert_eq!(history.len(), 1);
        assert!(!history.dirty());
        assert!(!history.can_undo());
        assert_eq!(sink.0.borrow().deletes, 1, "stale checkpoint must not survive a reset");
    }

    #[test]
    fn test_consolidation_needs_matching_long_description() {
        let (mut document, mut history, _) = seeded();
        let a = document.add_track("A");
        let b = document.add_track("B");
        history
            .push_state(&document, "Add Track", "Added tracks", UndoPush::empty())
            .expect("push");

        document.track_mut(a).expect("a").volume = 0.5;
        history
            .push_state(&document, "Volume", "Set 'A' volume", UndoPush::CONSOLIDATE)
            .expect("push");
        document.track_mut(b).expect("b").volume = 0.25;
        history
            .push_state(&document, "Volume", "Set 'B' volume", UndoPush::CONSOLIDATE)
            .expect("push");

        assert_eq!(history.len(), 4);
        history.undo(&mut document).expect("undo");
        assert_eq!(document.track(a).expect("a").volume, 0.5);
        assert_eq!(document.track(b).expect("b").volume, 1.0);
    }

    #[test]
    fn test_push_before_initial_state_fails() {
        let document = Document::new();
        let mut history = ProjectHistory::new();

        assert!(matches!(
            history.push_state_default(&document, "Add Track", "Added track"),
            Err(HistoryError::InvalidState(_))
        ));
    }

    #[test]
    fn test_disabled_autosave_never_requests() {
        let mut document = Document::new();
        let sink = RecordingSink::default();
        let mut history = ProjectHistory::new().with_autosave_enabled(false);
        history.set_checkpoint_sink(Box::new(sink.clone()));
        history.initial_state(&document).expect("initial");

        document.add_track("A");
        history
            .push_state(&document, "Add Track", "Added track", UndoPush::AUTOSAVE)
            .expect("push");

        assert!(sink.0.borrow().requests.is_empty());
    }

    proptest! {
        #[test]
        fn prop_pushes_advance_by_one(count in 1usize..30) {
            let (mut document, mut history, _) = seeded();
            for step in 0..count {
                document.add_track(format!("Track {step}"));
                history.push_state_default(&document, "Add Track", "Added track").expect("push");
                prop_assert_eq!(history.current_index(), step + 1);
                prop_assert!(!history.can_redo());
            }
        }

        #[test]
        fn prop_undo_then_redo_restores(pushes in 1usize..12, undos in 1usize..12) {
            let (mut document, mut history, _) = seeded();
            for step in 0..pushes {
                document.add_track(format!("Track {step}"));
                history.push_state(&document, "Add Track", "Added track", UndoPush::empty()).expect("push");
            }
            for _ in 0..undos.min(pushes) {
                let before = document.capture();
                history.undo(&mut document).expect("undo");
                history.redo(&mut document).expect("redo");
                prop_assert_eq!(document.capture(), before);
                history.undo(&mut document).expect("undo");
            }
        }
    }
}
