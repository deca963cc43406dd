//! Work units for the parallel pull
//!
//! A `Task` groups the physical row locators of up to `block_size` rows,
//! keyed by page so a worker can fetch a whole unit with one query. Tasks
//! are built only by the planner and consumed exactly once by exactly one
//! worker.

use crate::engine::TxId;
use crate::error::PlanError;
use std::collections::BTreeMap;

/// Physical storage position of a row: PostgreSQL's ctid `(page, row)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locator {
    /// Heap page (block) number
    pub page: u32,

    /// Row offset within the page
    pub row: u16,
}

impl Locator {
    /// Parse a storage-engine tuple string of the form `"(page,row)"`
    pub fn parse(raw: &str) -> Result<Self, PlanError> {
        let bad = |reason: &str| PlanError::BadLocator {
            value: raw.to_string(),
            reason: reason.to_string(),
        };

        let inner = raw
            .trim()
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .ok_or_else(|| bad("expected '(page,row)'"))?;

        let (page, row) = inner.split_once(',').ok_or_else(|| bad("missing comma"))?;

        let page = page
            .trim()
            .parse::<u32>()
            .map_err(|e| bad(&format!("bad page number: {e}")))?;
        let row = row
            .trim()
            .parse::<u16>()
            .map_err(|e| bad(&format!("bad row number: {e}")))?;

        Ok(Self { page, row })
    }
}

/// An immutable unit of parallel work
///
/// Maps each page to the row offsets belonging to this unit, in the order
/// they were streamed from the table scan, plus the transaction window the
/// fetch must be bounded by. A single task may span multiple pages; the
/// planner counts rows, not pages.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Task {
    pages: BTreeMap<u32, Vec<u16>>,
    rows: usize,
    txmin: Option<TxId>,
    txmax: Option<TxId>,
}

impl Task {
    /// Attach the transaction window bracketing this pull cycle
    pub fn with_window(mut self, txmin: TxId, txmax: TxId) -> Self {
        self.txmin = Some(txmin);
        self.txmax = Some(txmax);
        self
    }

    /// Lower transaction bound (last persisted checkpoint)
    pub fn txmin(&self) -> Option<TxId> {
        self.txmin
    }

    /// Upper transaction bound (txid captured when the pull started)
    pub fn txmax(&self) -> Option<TxId> {
        self.txmax
    }

    /// Number of rows in this unit
    pub fn len(&self) -> usize {
        self.rows
    }

    /// True when the unit addresses no rows
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Pages and their row offsets, ordered by page number
    pub fn pages(&self) -> impl Iterator<Item = (u32, &[u16])> {
        self.pages.iter().map(|(page, rows)| (*page, rows.as_slice()))
    }

    /// Every locator in this unit, ordered by page then by streamed order
    pub fn locators(&self) -> impl Iterator<Item = Locator> + '_ {
        self.pages.iter().flat_map(|(page, rows)| {
            rows.iter().map(move |row| Locator {
                page: *page,
                row: *row,
            })
        })
    }
}

/// Accumulates locators into the next `Task`
#[derive(Debug, Default)]
pub struct TaskBuilder {
    pages: BTreeMap<u32, Vec<u16>>,
    rows: usize,
}

impl TaskBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one locator to the running group
    pub fn push(&mut self, locator: Locator) {
        self.pages.entry(locator.page).or_default().push(locator.row);
        self.rows += 1;
    }

    /// Rows accumulated so far
    pub fn len(&self) -> usize {
        self.rows
    }

    /// True when nothing has been accumulated
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Finish the group as an immutable task (window attached later)
    pub fn build(self) -> Task {
        Task {
            pages: self.pages,
            rows: self.rows,
            txmin: None,
            txmax: None,
        }
    }
}

/// Items flowing through the work queue
#[derive(Debug, Clone)]
pub enum QueueItem {
    /// A unit of work to execute
    Task(Task),

    /// Graceful-shutdown sentinel, enqueued once per worker
    Terminate,
}
