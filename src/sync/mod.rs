//! Parallel bootstrap sync engine
//!
//! Implements the fast path of table replication: the root table scan is
//! partitioned by physical row location into tasks, a fixed pool of worker
//! threads drains them through a join-counted queue, and the whole parallel
//! phase is bracketed by transaction-id checkpoints.
//!
//! # Architecture
//!
//! ```text
//!                 ┌────────────────────────────┐
//!                 │     SyncCoordinator        │
//!                 │  txmin ─ plan ─ txmax      │
//!                 │  spawn / enqueue / join    │
//!                 └─────────────┬──────────────┘
//!                               │
//!                               ▼
//!                 ┌────────────────────────────┐
//!                 │        SyncQueue           │
//!                 │  (crossbeam + join count)  │
//!                 │  tasks ... + N terminates  │
//!                 └─────────────┬──────────────┘
//!           ┌───────────────────┼───────────────────┐
//!           │                   │                   │
//!     ┌─────▼─────┐       ┌─────▼─────┐       ┌─────▼─────┐
//!     │  Worker 1 │       │  Worker 2 │       │  Worker N │
//!     │  pg + idx │       │  pg + idx │       │  pg + idx │
//!     └───────────┘       └───────────┘       └───────────┘
//! ```
//!
//! After `join()` returns the coordinator advances the checkpoint to the
//! captured `txmax` and requests a catch-up replay over `(txmin, txmax]`.

pub mod coordinator;
pub mod planner;
pub mod queue;
pub mod task;
pub mod worker;

pub use coordinator::{CycleReport, SyncCoordinator};
pub use planner::TaskPlanner;
pub use queue::{QueueReceiver, QueueStats, SyncQueue};
pub use task::{Locator, QueueItem, Task, TaskBuilder};
pub use worker::{Worker, WorkerStats};
