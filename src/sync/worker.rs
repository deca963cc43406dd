//! Worker thread logic for the parallel pull
//!
//! Each worker:
//! - Builds its own private engine session inside the thread (database
//!   sessions and their server-side cursors must not be shared)
//! - Pulls items from the work queue
//! - Executes tasks: fetch the addressed rows, build documents, submit one
//!   bulk indexing request
//! - Acknowledges every item it dequeues, then exits on a termination signal
//!
//! On any execution failure the worker raises the pool-wide failure flag and
//! the pool degrades to acknowledge-only draining, so `join()` always stays
//! decidable and the coordinator can fail the cycle without advancing the
//! checkpoint.

use crate::engine::{EngineFactory, SyncEngine};
use crate::error::{EngineResult, WorkerError};
use crate::sync::queue::QueueReceiver;
use crate::sync::task::{QueueItem, Task};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{error, info, trace};

/// Statistics collected by a worker
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Tasks executed to completion
    pub tasks_executed: AtomicU64,

    /// Rows addressed by executed tasks
    pub rows_requested: AtomicU64,

    /// Documents accepted by the index
    pub documents_indexed: AtomicU64,

    /// Tasks drained without execution after a failure
    pub tasks_skipped: AtomicU64,
}

/// A worker thread that processes sync tasks
pub struct Worker {
    /// Worker ID
    id: usize,

    /// Thread handle
    handle: Option<JoinHandle<Result<(), WorkerError>>>,

    /// Worker statistics
    stats: Arc<WorkerStats>,
}

impl Worker {
    /// Spawn a new worker thread
    pub fn spawn<F: EngineFactory>(
        id: usize,
        factory: Arc<F>,
        queue_rx: QueueReceiver,
        failed: Arc<AtomicBool>,
    ) -> Result<Self, WorkerError> {
        let stats = Arc::new(WorkerStats::default());
        let stats_clone = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name(format!("syncer-{}", id))
            .spawn(move || worker_loop(id, factory, queue_rx, failed, stats_clone))
            .map_err(|e| WorkerError::InitFailed {
                id,
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            handle: Some(handle),
            stats,
        })
    }

    /// Get worker ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Get worker statistics
    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    /// Wait for the worker to finish
    pub fn join(mut self) -> Result<(), WorkerError> {
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(result) => result,
                Err(_) => Err(WorkerError::Panicked { id: self.id }),
            }
        } else {
            Ok(())
        }
    }
}

/// Main worker loop
fn worker_loop<F: EngineFactory>(
    id: usize,
    factory: Arc<F>,
    queue_rx: QueueReceiver,
    failed: Arc<AtomicBool>,
    stats: Arc<WorkerStats>,
) -> Result<(), WorkerError> {
    info!(worker = id, "Worker starting");

    // Private engine session for this worker. A worker that cannot connect
    // keeps draining the queue acknowledge-only, so join() never hangs on
    // its unconsumed items.
    let (mut engine, mut first_error) = match factory.connect() {
        Ok(engine) => (Some(engine), None),
        Err(e) => {
            error!(worker = id, error = %e, "Failed to open engine session");
            failed.store(true, Ordering::SeqCst);
            (
                None,
                Some(WorkerError::InitFailed {
                    id,
                    reason: e.to_string(),
                }),
            )
        }
    };

    loop {
        let Some(item) = queue_rx.recv() else {
            // the coordinator holds the queue for the whole cycle, so a
            // closed channel only happens on teardown
            break;
        };

        match item {
            QueueItem::Terminate => {
                queue_rx.acknowledge();
                break;
            }
            QueueItem::Task(task) => {
                let executable = !failed.load(Ordering::SeqCst);
                match (&mut engine, executable) {
                    (Some(engine), true) => match execute_task(engine, &task) {
                        Ok(indexed) => {
                            stats.tasks_executed.fetch_add(1, Ordering::Relaxed);
                            stats
                                .rows_requested
                                .fetch_add(task.len() as u64, Ordering::Relaxed);
                            stats
                                .documents_indexed
                                .fetch_add(indexed as u64, Ordering::Relaxed);
                            trace!(worker = id, rows = task.len(), indexed, "Task executed");
                        }
                        Err(e) => {
                            error!(worker = id, error = %e, "Task execution failed");
                            failed.store(true, Ordering::SeqCst);
                            if first_error.is_none() {
                                first_error = Some(WorkerError::TaskFailed {
                                    id,
                                    reason: e.to_string(),
                                });
                            }
                        }
                    },
                    _ => {
                        stats.tasks_skipped.fetch_add(1, Ordering::Relaxed);
                        trace!(worker = id, "Draining task without executing");
                    }
                }
                queue_rx.acknowledge();
            }
        }
    }

    info!(
        worker = id,
        tasks = stats.tasks_executed.load(Ordering::Relaxed),
        documents = stats.documents_indexed.load(Ordering::Relaxed),
        "Worker shutting down"
    );

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Execute one task against an engine
///
/// Fetches the rows the task addresses (bounded by its transaction window),
/// transforms them into index documents, and submits them as a single bulk
/// request. Returns the number of documents accepted.
pub fn execute_task(engine: &mut impl SyncEngine, task: &Task) -> EngineResult<usize> {
    let documents = engine.build_documents(task)?;
    if documents.is_empty() {
        return Ok(0);
    }
    engine.bulk_index(documents)
}

/// Aggregate statistics from multiple workers
pub fn aggregate_stats(workers: &[Worker]) -> (u64, u64, u64, u64) {
    let mut tasks = 0u64;
    let mut rows = 0u64;
    let mut documents = 0u64;
    let mut skipped = 0u64;

    for worker in workers {
        tasks += worker.stats.tasks_executed.load(Ordering::Relaxed);
        rows += worker.stats.rows_requested.load(Ordering::Relaxed);
        documents += worker.stats.documents_indexed.load(Ordering::Relaxed);
        skipped += worker.stats.tasks_skipped.load(Ordering::Relaxed);
    }

    (tasks, rows, documents, skipped)
}
