//! Task planner - partitions the root table scan into work units
//!
//! The planner streams the root table's physical row locators through a
//! lightweight projection query (incremental fetch, so memory stays bounded
//! on arbitrarily large tables), parses each locator, and groups rows into
//! tasks of `block_size` rows. Grouping counts rows across the whole stream,
//! not pages, so one task may span several pages.

use crate::engine::SyncEngine;
use crate::error::{PlanError, SyncError};
use crate::sync::task::{Locator, Task, TaskBuilder};
use tracing::{debug, info};

/// Partitions a locator stream into tasks of bounded size
#[derive(Debug)]
pub struct TaskPlanner {
    block_size: usize,
}

impl TaskPlanner {
    /// Create a planner
    ///
    /// Fails fast on a zero block size, which would never emit a task.
    pub fn new(block_size: usize) -> Result<Self, PlanError> {
        if block_size == 0 {
            return Err(PlanError::InvalidBlockSize { size: block_size });
        }
        Ok(Self { block_size })
    }

    /// Rows per emitted task
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Produce the ordered task list for one pull cycle
    ///
    /// Emits `ceil(rows / block_size)` tasks: every locator lands in exactly
    /// one task, tasks preserve stream order, and the trailing partial group
    /// is flushed after the stream ends.
    pub fn plan(&self, engine: &mut dyn SyncEngine) -> Result<Vec<Task>, SyncError> {
        let mut tasks = Vec::new();
        let mut builder = TaskBuilder::new();
        let mut rows = 0usize;

        for raw in engine.stream_locators()? {
            let raw = raw?;
            builder.push(Locator::parse(&raw)?);
            rows += 1;

            if builder.len() == self.block_size {
                tasks.push(std::mem::take(&mut builder).build());
                debug!(tasks = tasks.len(), rows, "Block boundary reached");
            }
        }

        // the scan rarely ends on an exact block boundary
        if !builder.is_empty() {
            tasks.push(builder.build());
        }

        info!(
            tasks = tasks.len(),
            rows,
            block_size = self.block_size,
            "Scan partitioned"
        );

        Ok(tasks)
    }
}
