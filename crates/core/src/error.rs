/// Failures surfaced by the history engine.
///
/// `InvalidState` and `OutOfRange` mean the calling command is wrong about the
/// shape of the history; they are returned, never absorbed. `Persistence` is the
/// only recoverable kind: the in-memory history is untouched and the write is
/// retried on the next qualifying push or modify.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    #[error("invalid history state: {0}")]
    InvalidState(&'static str),

    #[error("history index {index} out of range (history has {len} entries)")]
    OutOfRange { index: usize, len: usize },

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,

    #[error("autosave checkpoint failed: {0}")]
    Persistence(String),
}
