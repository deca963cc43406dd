//! Checkpoint coordinator - orchestrates one pull cycle per target
//!
//! The coordinator is responsible for:
//! - Capturing the transaction-id window that brackets the parallel phase
//! - Planning the task list
//! - Spawning and draining the worker pool
//! - Advancing the persisted checkpoint only after every item is acknowledged
//! - Triggering the catch-up replay for the captured window
//!
//! Ordering is the whole point: `txmin` is read before planning, `txmax`
//! immediately after, and the checkpoint is advanced to that same captured
//! `txmax` - never a re-read value - so the replay window is exactly
//! reproducible.

use crate::engine::{EngineFactory, SyncEngine, TxId};
use crate::error::{EngineError, Result, SyncError, WorkerError};
use crate::sync::planner::TaskPlanner;
use crate::sync::queue::SyncQueue;
use crate::sync::task::QueueItem;
use crate::sync::worker::{aggregate_stats, Worker};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Result of a completed pull cycle
#[derive(Debug)]
pub struct CycleReport {
    /// Tasks planned for the cycle
    pub tasks: usize,

    /// Rows addressed by executed tasks
    pub rows: u64,

    /// Documents accepted by the index during the parallel phase
    pub documents_indexed: u64,

    /// Rows re-applied by the catch-up replay
    pub replayed: u64,

    /// Lower transaction bound (checkpoint before the cycle)
    pub txmin: TxId,

    /// Upper transaction bound (captured before workers started)
    pub txmax: TxId,

    /// Time taken for the cycle
    pub duration: Duration,
}

/// Coordinates the parallel pull for one configured target
pub struct SyncCoordinator<F: EngineFactory> {
    factory: Arc<F>,
    worker_count: usize,
    block_size: usize,
}

impl<F: EngineFactory> SyncCoordinator<F> {
    /// Create a coordinator
    pub fn new(factory: F, worker_count: usize, block_size: usize) -> Self {
        Self {
            factory: Arc::new(factory),
            worker_count,
            block_size,
        }
    }

    /// Run one full pull cycle
    pub fn run(&self) -> Result<CycleReport> {
        let started = Instant::now();

        // Planning-only session; every worker gets its own.
        let mut engine = self.factory.connect().map_err(SyncError::Engine)?;

        let txmin = engine.checkpoint()?;
        let planner = TaskPlanner::new(self.block_size)?;
        let tasks = planner.plan(&mut engine)?;
        let txmax = engine.current_txid()?;

        if txmin > txmax {
            return Err(EngineError::CheckpointAhead {
                checkpoint: txmin,
                current: txmax,
            }
            .into());
        }

        let task_count = tasks.len();
        info!(
            tasks = task_count,
            txmin,
            txmax,
            workers = self.worker_count,
            "Starting parallel pull"
        );

        let queue = SyncQueue::new();
        let failed = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(self.worker_count);
        for id in 0..self.worker_count {
            workers.push(Worker::spawn(
                id,
                Arc::clone(&self.factory),
                queue.receiver(),
                Arc::clone(&failed),
            )?);
        }

        for task in tasks {
            queue.enqueue(QueueItem::Task(task.with_window(txmin, txmax)))?;
        }
        // exactly one per worker; fewer would strand a worker on an empty queue
        for _ in 0..self.worker_count {
            queue.enqueue(QueueItem::Terminate)?;
        }

        queue.join();

        let (executed, rows, documents_indexed, skipped) = aggregate_stats(&workers);
        let mut first_failure: Option<WorkerError> = None;
        for worker in workers {
            if let Err(e) = worker.join() {
                warn!(error = %e, "Worker finished with error");
                if first_failure.is_none() {
                    first_failure = Some(e);
                }
            }
        }

        if let Some(e) = first_failure {
            // checkpoint stays untouched; the next run redoes the pull
            warn!(skipped, "Pull cycle failed, checkpoint not advanced");
            return Err(e.into());
        }

        engine.set_checkpoint(txmax)?;
        let replayed = engine.replay(txmin, txmax)?;

        info!(
            tasks = executed,
            documents = documents_indexed,
            replayed,
            checkpoint = txmax,
            "Pull cycle complete"
        );

        Ok(CycleReport {
            tasks: task_count,
            rows,
            documents_indexed,
            replayed,
            txmin,
            txmax,
            duration: started.elapsed(),
        })
    }
}
