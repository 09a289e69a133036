use std::path::{Path, PathBuf};

use anyhow::Context;
use daw_project::load_checkpoint;

use crate::autosave::{CheckpointOutcomes, spawn_worker};
use crate::config::HistoryConfig;
use crate::document::Document;
use crate::error::HistoryError;
use crate::project_history::{HistoryEvent, ProjectHistory};

/// One open document with its history, autosave worker and UI event feed.
pub struct Session {
    document: Document,
    history: ProjectHistory,
    outcomes: Option<CheckpointOutcomes>,
    events: rtrb::Consumer<HistoryEvent>,
    config: HistoryConfig,
    autosave_path: Option<PathBuf>,
}

impl Session {
    pub fn new(name: &str, config: HistoryConfig) -> anyhow::Result<Self> {
        Self::start(name, Document::new(), config)
    }

    /// Reopen a document from the checkpoint a crashed session left behind.
    /// The recovered state becomes the initial state and counts as unsaved.
    pub fn recover(path: &Path, name: &str, config: HistoryConfig) -> anyhow::Result<Self> {
        let data = load_checkpoint(path)
            .with_context(|| format!("failed to load checkpoint {}", path.display()))?;
        let tracks = data.to_tracks()?;

        let mut document = Document::from_tracks(tracks);
        *document.selection_mut() = (&data.selection).into();
        *document.view_mut() = (&data.view).into();

        let mut session = Self::start(name, document, config)?;
        session.history.forget_save_point();
        tracing::info!(
            path = %path.display(),
            tracks = session.document.tracks().len(),
            last_edit = %data.short_description,
            "recovered document"
        );
        Ok(session)
    }

    fn start(name: &str, document: Document, config: HistoryConfig) -> anyhow::Result<Self> {
        let mut history = ProjectHistory::new()
            .with_default_flags(config.default_push_flags())
            .with_autosave_enabled(config.autosave_enabled);
        let events = history.subscribe(config.event_capacity.max(1));

        let autosave_path = config
            .autosave_path(name)
            .filter(|_| config.autosave_enabled);
        let outcomes = match &autosave_path {
            Some(path) => {
                let (sink, outcomes) = spawn_worker(path.clone(), config.checkpoint_queue.max(1))
                    .context("failed to start autosave worker")?;
                history.set_checkpoint_sink(Box::new(sink));
                Some(outcomes)
            }
            None => {
                tracing::info!(name, "autosave disabled for this session");
                None
            }
        };

        history.initial_state(&document)?;

        Ok(Self {
            document,
            history,
            outcomes,
            events,
            config,
            autosave_path,
        })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Edits made here are live only until recorded through [`Session::parts_mut`].
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn history(&self) -> &ProjectHistory {
        &self.history
    }

    /// Split borrow for commands that edit the document and record the result.
    pub fn parts_mut(&mut self) -> (&mut Document, &mut ProjectHistory) {
        (&mut self.document, &mut self.history)
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    pub fn autosave_path(&self) -> Option<&Path> {
        self.autosave_path.as_deref()
    }

    pub fn undo(&mut self) -> Result<(), HistoryError> {
        self.history.undo(&mut self.document)
    }

    pub fn redo(&mut self) -> Result<(), HistoryError> {
        self.history.redo(&mut self.document)
    }

    /// Apply finished checkpoint writes. Returns the failures, which are
    /// already scheduled for retry.
    pub fn poll(&mut self) -> Vec<HistoryError> {
        let Some(outcomes) = self.outcomes.as_mut() else {
            return Vec::new();
        };
        outcomes
            .drain()
            .into_iter()
            .filter_map(|outcome| self.history.checkpoint_finished(outcome).err())
            .collect()
    }

    pub fn drain_events(&mut self) -> Vec<HistoryEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.pop() {
            events.push(event);
        }
        events
    }

    /// Closing should ask the user to save first.
    pub fn needs_save_prompt(&self) -> bool {
        (self.config.empty_can_be_dirty || !self.document.is_empty())
            && self.history.unsaved_changes()
    }

    /// Nothing done yet; another document may be opened in place of this one.
    pub fn is_pristine(&self) -> bool {
        !self.history.dirty() && self.document.is_empty()
    }

    /// Clean close: the crash-recovery checkpoint is deleted.
    pub fn close(&mut self) {
        // frees the outcome ring so the worker can reach the delete
        for error in self.poll() {
            tracing::warn!(%error, "checkpoint failed before close");
        }
        self.history.close();
        tracing::info!("session closed");
    }

    pub fn reset_to_empty(&mut self) -> Result<(), HistoryError> {
        self.history.reset_to_empty(&mut self.document)
    }
}
