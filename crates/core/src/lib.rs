//! Undo/redo history for the document model, with dirty tracking and
//! background crash-recovery checkpoints.

pub mod autosave;
pub mod commands;
pub mod config;
pub mod coordinator;
pub mod document;
pub mod error;
pub mod history;
pub mod project_history;
pub mod session;

pub use autosave::{CheckpointOutcome, CheckpointOutcomes, CheckpointSink, spawn_worker};
pub use commands::{CommandError, MoveChoice};
pub use config::HistoryConfig;
pub use coordinator::HistoryMark;
pub use document::{Document, DocumentState, LiveDocument, Selection, ViewWindow};
pub use error::HistoryError;
pub use history::{HistoryStack, Snapshot, SnapshotId, UndoPush};
pub use project_history::{HistoryEvent, ProjectHistory};
pub use session::Session;

pub use daw_project::{CheckpointData, ProjectError, load_checkpoint};
pub use daw_transport::{AudioArc, Clip, PPQN, Track, TrackHandle, TrackId, WaveformData};
