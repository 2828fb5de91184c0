//! Serialized background execution for one engine.
//!
//! A dedicated thread owns the `SearchEngine`. Jobs go through a bounded
//! queue with a single slot: one job may run while one more waits, and any
//! further submission is rejected with `EngineError::Busy`. Every job
//! reports back on its own channel, surfaced to callers as a `Pending`.

use crate::engine::SearchEngine;
use crate::error::{EngineError, Result};
use crate::indexer::SourceItem;
use crate::persist::{normalize_folder, MetaFile};
use crate::ranker::SearchHit;
use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use parking_lot::RwLock;
use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const QUEUE_DEPTH: usize = 1;

pub type DocumentSource = Box<dyn Iterator<Item = SourceItem> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Rebuild,
    RebuildAndSave,
    Query,
    Save,
    Load,
}

/// Readable at any time, from any thread.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkerStatus {
    pub running: Option<JobKind>,
    pub total_docs: u32,
    pub folder: Option<String>,
    pub completed_jobs: u64,
}

enum Job {
    Rebuild { source: DocumentSource, folder: Option<String>, reply: Sender<Result<usize>> },
    RebuildAndSave { source: DocumentSource, folder: String, reply: Sender<Result<MetaFile>> },
    Query { query: String, top_k: usize, reply: Sender<Result<Vec<SearchHit>>> },
    Save { key: String, reply: Sender<Result<MetaFile>> },
    Load { key: String, reply: Sender<Result<()>> },
}

impl Job {
    fn kind(&self) -> JobKind {
        match self {
            Job::Rebuild { .. } => JobKind::Rebuild,
            Job::RebuildAndSave { .. } => JobKind::RebuildAndSave,
            Job::Query { .. } => JobKind::Query,
            Job::Save { .. } => JobKind::Save,
            Job::Load { .. } => JobKind::Load,
        }
    }
}

/// Completion handle for one submitted job.
#[must_use = "a pending job reports its outcome only through this handle"]
pub struct Pending<T> {
    rx: Receiver<Result<T>>,
}

impl<T> Pending<T> {
    /// Blocks until the job finishes.
    pub fn wait(self) -> Result<T> {
        self.rx.recv().unwrap_or(Err(EngineError::WorkerGone))
    }

    /// `None` if the job is still queued or running after `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<T>> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(EngineError::WorkerGone)),
        }
    }

    /// Non-blocking poll. Once the outcome has been taken, later polls
    /// report `WorkerGone`.
    pub fn try_take(&self) -> Option<Result<T>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(EngineError::WorkerGone)),
        }
    }
}

pub struct EngineWorker {
    jobs: Option<Sender<Job>>,
    handle: Option<JoinHandle<()>>,
    status: Arc<RwLock<WorkerStatus>>,
}

impl EngineWorker {
    /// Moves `engine` onto a new worker thread.
    pub fn spawn(engine: SearchEngine) -> Result<Self> {
        let (tx, rx) = bounded(QUEUE_DEPTH);
        let status = Arc::new(RwLock::new(WorkerStatus {
            total_docs: engine.total_docs(),
            folder: engine.folder().map(str::to_string),
            ..WorkerStatus::default()
        }));
        let thread_status = status.clone();
        let handle = thread::Builder::new()
            .name("localsearch-worker".into())
            .spawn(move || run(engine, rx, thread_status))?;
        Ok(Self { jobs: Some(tx), handle: Some(handle), status })
    }

    /// Starts a full rebuild from `source`; resolves to the indexed document count.
    pub fn begin_rebuild<I>(&self, source: I, folder: Option<String>) -> Result<Pending<usize>>
    where
        I: IntoIterator<Item = SourceItem>,
        I::IntoIter: Send + 'static,
    {
        let source: DocumentSource = Box::new(source.into_iter());
        self.submit(|reply| Job::Rebuild { source, folder, reply })
    }

    /// Rebuilds from `source` and snapshots the result under `folder`'s key
    /// as one job, so nothing queued behind it can run in between.
    pub fn rebuild_and_save<I>(&self, source: I, folder: &Path) -> Result<Pending<MetaFile>>
    where
        I: IntoIterator<Item = SourceItem>,
        I::IntoIter: Send + 'static,
    {
        let source: DocumentSource = Box::new(source.into_iter());
        let folder = normalize_folder(folder);
        self.submit(|reply| Job::RebuildAndSave { source, folder, reply })
    }

    pub fn query(&self, raw_query: impl Into<String>, top_k: usize) -> Result<Pending<Vec<SearchHit>>> {
        if top_k == 0 {
            return Err(EngineError::InvalidTopK);
        }
        let query = raw_query.into();
        self.submit(|reply| Job::Query { query, top_k, reply })
    }

    pub fn save_snapshot(&self, key: impl Into<String>) -> Result<Pending<MetaFile>> {
        let key = key.into();
        self.submit(|reply| Job::Save { key, reply })
    }

    /// On failure the engine ends up empty.
    pub fn load_snapshot(&self, key: impl Into<String>) -> Result<Pending<()>> {
        let key = key.into();
        self.submit(|reply| Job::Load { key, reply })
    }

    pub fn status(&self) -> WorkerStatus { self.status.read().clone() }

    /// Closes the queue and waits for queued work to drain.
    pub fn shutdown(mut self) { self.stop(); }

    fn submit<T>(&self, make: impl FnOnce(Sender<Result<T>>) -> Job) -> Result<Pending<T>> {
        let jobs = self.jobs.as_ref().ok_or(EngineError::WorkerGone)?;
        let (reply, rx) = bounded(1);
        match jobs.try_send(make(reply)) {
            Ok(()) => Ok(Pending { rx }),
            Err(TrySendError::Full(job)) => {
                tracing::debug!(kind = ?job.kind(), "worker busy, rejecting job");
                Err(EngineError::Busy)
            }
            Err(TrySendError::Disconnected(_)) => Err(EngineError::WorkerGone),
        }
    }

    fn stop(&mut self) {
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("engine worker thread panicked");
            }
        }
    }
}

impl Drop for EngineWorker {
    fn drop(&mut self) { self.stop(); }
}

fn run(mut engine: SearchEngine, jobs: Receiver<Job>, status: Arc<RwLock<WorkerStatus>>) {
    tracing::debug!("engine worker started");
    while let Ok(job) = jobs.recv() {
        let kind = job.kind();
        status.write().running = Some(kind);
        match job {
            Job::Rebuild { source, folder, reply } => {
                let result = guarded(kind, || Ok(engine.rebuild(source, folder)));
                publish(&status, &engine);
                let _ = reply.send(result);
            }
            Job::RebuildAndSave { source, folder, reply } => {
                let result = guarded(kind, || engine.rebuild_and_save(source, folder));
                publish(&status, &engine);
                let _ = reply.send(result);
            }
            Job::Query { query, top_k, reply } => {
                let result = guarded(kind, || engine.query(&query, top_k));
                publish(&status, &engine);
                let _ = reply.send(result);
            }
            Job::Save { key, reply } => {
                let result = guarded(kind, || engine.save_snapshot(&key));
                publish(&status, &engine);
                let _ = reply.send(result);
            }
            Job::Load { key, reply } => {
                let result = guarded(kind, || engine.load_snapshot(&key));
                publish(&status, &engine);
                let _ = reply.send(result);
            }
        }
    }
    tracing::debug!("engine worker stopped");
}

fn publish(status: &RwLock<WorkerStatus>, engine: &SearchEngine) {
    let mut s = status.write();
    s.running = None;
    s.total_docs = engine.total_docs();
    s.folder = engine.folder().map(str::to_string);
    s.completed_jobs += 1;
}

/// Runs one job, turning a panic into an `Internal` error. Rebuilds swap the
/// new state in only at the end, so a panic leaves the engine consistent.
fn guarded<T>(kind: JobKind, f: impl FnOnce() -> Result<T>) -> Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => {
            if let Err(e) = &result {
                tracing::warn!(?kind, error = %e, "job failed");
            }
            result
        }
        Err(payload) => {
            let msg = panic_message(payload.as_ref());
            tracing::error!(?kind, panic = %msg, "job panicked");
            Err(EngineError::Internal(format!("{kind:?} job panicked: {msg}")))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
