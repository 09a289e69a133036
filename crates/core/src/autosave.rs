//! Background checkpoint writer.
//!
//! The document thread hands snapshots to a dedicated worker thread over an
//! `rtrb` ring and never waits for the disk. Outcomes travel back over a second
//! ring and are fed into [`ProjectHistory::checkpoint_finished`] by whoever
//! owns the document thread (see `Session::poll`).
//!
//! [`ProjectHistory::checkpoint_finished`]: crate::ProjectHistory::checkpoint_finished

use crate::coordinator::HistoryMark;
use crate::error::HistoryError;
use crate::history::Snapshot;
use daw_project::{CheckpointData, ProjectError, delete_checkpoint, write_checkpoint};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle, Thread};
use std::time::Duration;

/// Persistence collaborator of the history engine.
///
/// Both calls must return without waiting for I/O.
pub trait CheckpointSink {
    fn request_checkpoint(
        &mut self,
        mark: HistoryMark,
        snapshot: Arc<Snapshot>,
    ) -> Result<(), HistoryError>;

    /// The document closed cleanly; the crash-recovery artifact is no longer needed.
    fn delete_autosave_artifact(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointOutcome {
    pub mark: HistoryMark,
    pub result: Result<(), String>,
}

enum Job {
    Write {
        mark: HistoryMark,
        snapshot: Arc<Snapshot>,
    },
    Delete,
}

/// Serialized form of one snapshot.
pub fn checkpoint_data(snapshot: &Snapshot) -> CheckpointData {
    let state = snapshot.state();
    CheckpointData::from_tracks(
        snapshot.short_description(),
        snapshot.long_description(),
        &state.tracks,
        (&state.selection).into(),
        (&state.view).into(),
    )
}

pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), ProjectError> {
    write_checkpoint(path, &checkpoint_data(snapshot))
}

/// Producer half, owned by the history. Dropping it stops the worker after it
/// has drained every queued job.
pub struct AutosaveSink {
    jobs: rtrb::Producer<Job>,
    running: Arc<AtomicBool>,
    /// Set when a delete did not fit in the job ring.
    delete_pending: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

/// Consumer half for completed writes, polled on the document thread.
pub struct CheckpointOutcomes {
    outcomes: rtrb::Consumer<CheckpointOutcome>,
    worker: Thread,
}

pub fn spawn_worker(
    path: PathBuf,
    capacity: usize,
) -> std::io::Result<(AutosaveSink, CheckpointOutcomes)> {
    let (jobs_tx, jobs_rx) = rtrb::RingBuffer::<Job>::new(capacity);
    let (outcome_tx, outcome_rx) = rtrb::RingBuffer::<CheckpointOutcome>::new(capacity);
    let running = Arc::new(AtomicBool::new(true));
    let delete_pending = Arc::new(AtomicBool::new(false));

    let worker = thread::Builder::new().name("autosave".to_string()).spawn({
        let running = running.clone();
        let delete_pending = delete_pending.clone();
        move || run_worker(path, jobs_rx, outcome_tx, running, delete_pending)
    })?;
    let worker_thread = worker.thread().clone();

    Ok((
        AutosaveSink {
            jobs: jobs_tx,
            running,
            delete_pending,
            worker: Some(worker),
        },
        CheckpointOutcomes {
            outcomes: outcome_rx,
            worker: worker_thread,
        },
    ))
}

impl AutosaveSink {
    fn wake(&self) {
        if let Some(worker) = &self.worker {
            worker.thread().unpark();
        }
    }
}

impl CheckpointSink for AutosaveSink {
    fn request_checkpoint(
        &mut self,
        mark: HistoryMark,
        snapshot: Arc<Snapshot>,
    ) -> Result<(), HistoryError> {
        self.jobs
            .push(Job::Write { mark, snapshot })
            .map_err(|_| HistoryError::Persistence("autosave queue is full".to_string()))?;
        self.wake();
        Ok(())
    }

    fn delete_autosave_artifact(&mut self) {
        if self.jobs.push(Job::Delete).is_err() {
            // the worker deletes after draining what is already queued
            self.delete_pending.store(true, Ordering::Release);
        }
        self.wake();
    }
}

impl Drop for AutosaveSink {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            worker.thread().unpark();
            if worker.join().is_err() {
                tracing::warn!("autosave worker panicked");
            }
        }
    }
}

impl CheckpointOutcomes {
    pub fn drain(&mut self) -> Vec<CheckpointOutcome> {
        let mut drained = Vec::new();
        while let Ok(outcome) = self.outcomes.pop() {
            drained.push(outcome);
        }
        if !drained.is_empty() {
            // the worker may be waiting for room in the outcome ring
            self.worker.unpark();
        }
        drained
    }
}

fn run_worker(
    path: PathBuf,
    mut jobs: rtrb::Consumer<Job>,
    mut outcomes: rtrb::Producer<CheckpointOutcome>,
    running: Arc<AtomicBool>,
    delete_pending: Arc<AtomicBool>,
) {
    tracing::debug!(path = %path.display(), "autosave worker started");
    loop {
        let stopping = !running.load(Ordering::Acquire);

        while let Ok(job) = jobs.pop() {
            match job {
                Job::Write { mark, snapshot } => {
                    let result = write_snapshot(&path, &snapshot).map_err(|e| e.to_string());
                    if let Err(error) = &result {
                        tracing::warn!(index = mark.index, %error, "checkpoint write failed");
                    }
                    deliver(&mut outcomes, CheckpointOutcome { mark, result }, &running);
                }
                Job::Delete => delete_artifact(&path),
            }
        }

        if delete_pending.swap(false, Ordering::AcqRel) {
            delete_artifact(&path);
        }

        if stopping {
            break;
        }
        // the stop signal's wakeup may already have been consumed by `deliver`
        if running.load(Ordering::Acquire) {
            thread::park();
        }
    }
    tracing::debug!("autosave worker stopped");
}

fn delete_artifact(path: &Path) {
    if let Err(error) = delete_checkpoint(path) {
        tracing::warn!(path = %path.display(), %error, "failed to delete checkpoint");
    }
}

/// Push an outcome, waiting for the document thread to make room. Once the
/// sink has been dropped nobody reads outcomes, so it is discarded instead and
/// the remaining jobs still run.
fn deliver(
    outcomes: &mut rtrb::Producer<CheckpointOutcome>,
    mut outcome: CheckpointOutcome,
    running: &AtomicBool,
) {
    loop {
        match outcomes.push(outcome) {
            Ok(()) => return,
            Err(rtrb::PushError::Full(rejected)) => {
                if !running.load(Ordering::Acquire) {
                    tracing::debug!(index = rejected.mark.index, "dropping checkpoint outcome");
                    return;
                }
                outcome = rejected;
                thread::park_timeout(Duration::from_millis(10));
            }
        }
    }
}
