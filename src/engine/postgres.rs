//! PostgreSQL-backed sync engine
//!
//! One `PgEngine` bundles a blocking database session, a search index client
//! and the checkpoint store for a single configured target. Sessions are
//! never shared: the server-side portals backing the locator scan belong to
//! one connection, so every worker builds its own engine through
//! `PgEngineFactory`.
//!
//! Row addressing uses the heap tuple id (`ctid`); transaction bounds use
//! `txid_current()` values, which are epoch-qualified and survive xid
//! wraparound.

use crate::config::{TableRef, TargetConfig};
use crate::engine::checkpoint::CheckpointStore;
use crate::engine::index::SearchClient;
use crate::engine::{Document, EngineFactory, LocatorStream, SyncEngine, TxId};
use crate::error::{EngineError, EngineResult};
use crate::sync::task::{Locator, Task, TaskBuilder};
use fallible_iterator::FallibleIterator;
use postgres::types::ToSql;
use postgres::{Client, NoTls};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Sync session for one PostgreSQL/search-index target
pub struct PgEngine {
    client: Client,
    target: TargetConfig,
    search: SearchClient,
    checkpoints: CheckpointStore,
}

impl PgEngine {
    /// Open a new session for the target
    pub fn connect(target: &TargetConfig, checkpoint_dir: &Path) -> EngineResult<Self> {
        let client = Client::connect(&target.database, NoTls)?;
        let search = SearchClient::new(&target.search_url, &target.index)?;
        let checkpoints = CheckpointStore::new(checkpoint_dir, &target.index);

        debug!(table = %target.table, index = %target.index, "Engine session opened");

        Ok(Self {
            client,
            target: target.clone(),
            search,
            checkpoints,
        })
    }
}

impl SyncEngine for PgEngine {
    fn checkpoint(&mut self) -> EngineResult<TxId> {
        self.checkpoints.load()
    }

    fn set_checkpoint(&mut self, txid: TxId) -> EngineResult<()> {
        self.checkpoints.store(txid)
    }

    fn current_txid(&mut self) -> EngineResult<TxId> {
        let row = self.client.query_one("SELECT txid_current()", &[])?;
        Ok(row.get::<_, i64>(0) as TxId)
    }

    fn stream_locators(&mut self) -> EngineResult<LocatorStream<'_>> {
        let sql = format!("SELECT ctid::text FROM {}", self.target.table.qualified());
        let rows = self
            .client
            .query_raw(sql.as_str(), std::iter::empty::<&(dyn ToSql + Sync)>())?;

        Ok(Box::new(rows.iterator().map(|row| {
            row.map(|r| r.get::<_, String>(0)).map_err(EngineError::from)
        })))
    }

    fn build_documents(&mut self, task: &Task) -> EngineResult<Vec<Document>> {
        if task.is_empty() {
            return Ok(Vec::new());
        }

        let sql = document_query(&self.target.table, &self.target.primary_key, task);
        let txmin = task.txmin().unwrap_or(0) as i64;
        let txmax = task.txmax().map_or(i64::MAX, |v| v as i64);

        let rows = self.client.query(sql.as_str(), &[&txmin, &txmax])?;

        let mut documents = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.get(0);
            let raw: String = row.get(1);
            let body = serde_json::from_str(&raw).map_err(|e| EngineError::Document {
                id: id.clone(),
                reason: e.to_string(),
            })?;
            documents.push(Document { id, body });
        }

        Ok(documents)
    }

    fn bulk_index(&mut self, documents: Vec<Document>) -> EngineResult<usize> {
        Ok(self.search.bulk(&documents)?)
    }

    fn replay(&mut self, txmin: TxId, txmax: TxId) -> EngineResult<u64> {
        let sql = format!(
            "SELECT ctid::text FROM {} \
             WHERE xmin::text::bigint > $1 AND xmin::text::bigint <= $2",
            self.target.table.qualified()
        );
        let rows = self
            .client
            .query(sql.as_str(), &[&(txmin as i64), &(txmax as i64)])?;

        if rows.is_empty() {
            debug!(txmin, txmax, "Replay window is empty");
            return Ok(0);
        }

        // re-fetch and re-index in block-size chunks, same path as the
        // parallel phase
        let mut chunks = Vec::new();
        let mut builder = TaskBuilder::new();
        for row in &rows {
            let raw: String = row.get(0);
            builder.push(Locator::parse(&raw)?);
            if builder.len() == self.target.block_size {
                chunks.push(std::mem::take(&mut builder).build());
            }
        }
        if !builder.is_empty() {
            chunks.push(builder.build());
        }

        let mut replayed = 0u64;
        for chunk in chunks {
            let chunk = chunk.with_window(txmin, txmax);
            let documents = self.build_documents(&chunk)?;
            replayed += self.bulk_index(documents)? as u64;
        }

        info!(txmin, txmax, replayed, "Replay complete");
        Ok(replayed)
    }
}

/// Render the windowed document fetch for a task
///
/// The tid array is inlined (locators are parsed integers, so the literal is
/// injection-safe); the transaction bounds stay as parameters.
fn document_query(table: &TableRef, primary_key: &str, task: &Task) -> String {
    let mut tids = String::new();
    for locator in task.locators() {
        if !tids.is_empty() {
            tids.push(',');
        }
        tids.push_str(&format!("'({},{})'", locator.page, locator.row));
    }

    format!(
        "SELECT \"{primary_key}\"::text, row_to_json(t)::text FROM {table} t \
         WHERE t.ctid = ANY (ARRAY[{tids}]::tid[]) \
         AND xmin::text::bigint > $1 AND xmin::text::bigint <= $2",
        table = table.qualified(),
    )
}

/// Builds one private `PgEngine` per consumer
pub struct PgEngineFactory {
    target: TargetConfig,
    checkpoint_dir: PathBuf,
}

impl PgEngineFactory {
    /// Create a factory for the target
    pub fn new(target: TargetConfig, checkpoint_dir: PathBuf) -> Self {
        Self {
            target,
            checkpoint_dir,
        }
    }
}

impl EngineFactory for PgEngineFactory {
    type Engine = PgEngine;

    fn connect(&self) -> EngineResult<PgEngine> {
        PgEngine::connect(&self.target, &self.checkpoint_dir)
    }
}
