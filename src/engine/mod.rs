//! Sync engine - the seam between the parallel pull and its collaborators
//!
//! The planner, workers and coordinator only ever talk to a [`SyncEngine`]:
//! a private session bundling the source database connection, the search
//! index client and the persisted checkpoint for one configured target.
//! Workers never share a session - each one builds its own through an
//! [`EngineFactory`], since neither the database session nor its server-side
//! cursors tolerate concurrent use.

pub mod checkpoint;
pub mod index;
pub mod postgres;

use crate::error::EngineResult;
use crate::sync::task::Task;

/// Monotonically increasing source transaction identifier
pub type TxId = u64;

/// A document ready for bulk submission to the search index
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Document id (the row's primary key, rendered as text)
    pub id: String,

    /// Document body
    pub body: serde_json::Value,
}

/// Lazily streamed raw locator strings from the root table scan
pub type LocatorStream<'a> = Box<dyn Iterator<Item = EngineResult<String>> + 'a>;

/// One target's sync session
pub trait SyncEngine: Send {
    /// Read the persisted synchronization checkpoint (0 when never synced)
    fn checkpoint(&mut self) -> EngineResult<TxId>;

    /// Persist the synchronization checkpoint
    fn set_checkpoint(&mut self, txid: TxId) -> EngineResult<()>;

    /// Read the source database's current transaction id
    fn current_txid(&mut self) -> EngineResult<TxId>;

    /// Stream the root table's physical row locators
    ///
    /// The stream must fetch incrementally; it never materializes the whole
    /// table.
    fn stream_locators(&mut self) -> EngineResult<LocatorStream<'_>>;

    /// Fetch the rows a task addresses, bounded by its transaction window,
    /// as index documents
    fn build_documents(&mut self, task: &Task) -> EngineResult<Vec<Document>>;

    /// Submit documents to the search index as one bulk request
    fn bulk_index(&mut self, documents: Vec<Document>) -> EngineResult<usize>;

    /// Re-apply writes committed inside `(txmin, txmax]`
    ///
    /// Called exactly once per cycle, strictly after every task has been
    /// acknowledged and the checkpoint advanced.
    fn replay(&mut self, txmin: TxId, txmax: TxId) -> EngineResult<u64>;
}

/// Builds a fresh private engine session per consumer
pub trait EngineFactory: Send + Sync + 'static {
    /// The session type this factory produces
    type Engine: SyncEngine;

    /// Open a new session for the factory's target
    fn connect(&self) -> EngineResult<Self::Engine>;
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted engine for planner/worker/coordinator tests

    use super::{Document, EngineFactory, LocatorStream, SyncEngine, TxId};
    use crate::error::{EngineError, EngineResult};
    use crate::sync::task::Task;
    use std::sync::{Arc, Mutex};

    /// Observable side effects, in call order
    #[derive(Debug, Clone, PartialEq)]
    pub enum MockEvent {
        Bulk { documents: usize },
        SetCheckpoint(TxId),
        Replay { txmin: TxId, txmax: TxId },
    }

    #[derive(Debug, Default)]
    pub struct MockState {
        pub checkpoint: TxId,
        pub txid: TxId,
        /// `current_txid()` advances by this after each read, so a test can
        /// detect a re-read where the captured value was required
        pub txid_step: TxId,
        pub connects: usize,
        pub events: Vec<MockEvent>,
        pub executed: Vec<Task>,
    }

    #[derive(Clone, Default)]
    pub struct MockFactory {
        pub locators: Vec<String>,
        /// Tasks touching this page fail their fetch
        pub fail_page: Option<u32>,
        /// Fail the nth connect (1-based; the planning session connects first)
        pub fail_connect_at: Option<usize>,
        pub state: Arc<Mutex<MockState>>,
    }

    impl MockFactory {
        pub fn with_locators(locators: &[&str]) -> Self {
            Self {
                locators: locators.iter().map(|s| s.to_string()).collect(),
                ..Self::default()
            }
        }

        pub fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
            self.state.lock().unwrap()
        }
    }

    impl EngineFactory for MockFactory {
        type Engine = MockEngine;

        fn connect(&self) -> EngineResult<MockEngine> {
            let mut state = self.state.lock().unwrap();
            state.connects += 1;
            if self.fail_connect_at == Some(state.connects) {
                return Err(EngineError::Other("mock connect refused".into()));
            }
            Ok(MockEngine {
                locators: self.locators.clone(),
                fail_page: self.fail_page,
                state: Arc::clone(&self.state),
            })
        }
    }

    pub struct MockEngine {
        locators: Vec<String>,
        fail_page: Option<u32>,
        state: Arc<Mutex<MockState>>,
    }

    impl SyncEngine for MockEngine {
        fn checkpoint(&mut self) -> EngineResult<TxId> {
            Ok(self.state.lock().unwrap().checkpoint)
        }

        fn set_checkpoint(&mut self, txid: TxId) -> EngineResult<()> {
            let mut state = self.state.lock().unwrap();
            state.checkpoint = txid;
            state.events.push(MockEvent::SetCheckpoint(txid));
            Ok(())
        }

        fn current_txid(&mut self) -> EngineResult<TxId> {
            let mut state = self.state.lock().unwrap();
            let txid = state.txid;
            state.txid += state.txid_step;
            Ok(txid)
        }

        fn stream_locators(&mut self) -> EngineResult<LocatorStream<'_>> {
            Ok(Box::new(self.locators.clone().into_iter().map(Ok)))
        }

        fn build_documents(&mut self, task: &Task) -> EngineResult<Vec<Document>> {
            if let Some(page) = self.fail_page {
                if task.pages().any(|(p, _)| p == page) {
                    return Err(EngineError::Other("mock fetch failure".into()));
                }
            }

            let documents = task
                .locators()
                .map(|locator| Document {
                    id: format!("{}:{}", locator.page, locator.row),
                    body: serde_json::json!({ "page": locator.page, "row": locator.row }),
                })
                .collect();
            self.state.lock().unwrap().executed.push(task.clone());
            Ok(documents)
        }

        fn bulk_index(&mut self, documents: Vec<Document>) -> EngineResult<usize> {
            let mut state = self.state.lock().unwrap();
            state.events.push(MockEvent::Bulk {
                documents: documents.len(),
            });
            Ok(documents.len())
        }

        fn replay(&mut self, txmin: TxId, txmax: TxId) -> EngineResult<u64> {
            self.state
                .lock()
                .unwrap()
                .events
                .push(MockEvent::Replay { txmin, txmax });
            Ok(0)
        }
    }
}
