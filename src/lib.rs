//! bulksync - Parallel PostgreSQL to Search Index Bootstrap Loader
//!
//! Performs the initial bulk ("fast path") replication of PostgreSQL tables
//! into a search index, using parallel workers to overcome per-request
//! network latency, then hands the captured transaction window to a catch-up
//! replay so writes landing during the bulk load are not lost.
//!
//! # Features
//!
//! - **Physical-storage partitioning**: The table scan is split by heap
//!   tuple id (`ctid`) into disjoint blocks of rows, so workers never
//!   contend and no primary-key distribution assumptions are needed.
//!
//! - **Parallel pull**: Multiple worker threads each with their own
//!   database session and index client for maximum throughput.
//!
//! - **Deterministic completion**: A join-counted work queue guarantees
//!   every task and termination signal is acknowledged before the
//!   checkpoint advances - no row silently skipped, no deadlock on
//!   completion.
//!
//! - **Checkpointed consistency**: The parallel phase is bracketed by
//!   transaction-id bounds; the window is replayed afterwards to close the
//!   gap left by writes committed mid-pull.
//!
//! # Example
//!
//! ```bash
//! # Sync every target in sync.json with 16 workers
//! bulksync sync.json -w 16
//!
//! # Inspect the plan without touching anything
//! bulksync sync.json --dry-run
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod progress;
pub mod sync;

pub use config::{CliArgs, SyncConfig, TargetConfig};
pub use engine::{Document, EngineFactory, SyncEngine, TxId};
pub use error::{Result, SyncError};
pub use sync::{CycleReport, Locator, SyncCoordinator, SyncQueue, Task, TaskPlanner};
