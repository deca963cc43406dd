//! Work queue with join semantics
//!
//! This module provides the multi-producer/multi-consumer FIFO that carries
//! tasks and termination signals to the worker pool. Unlike a plain channel,
//! the queue counts outstanding items: every enqueue increments the count,
//! every acknowledgment decrements it, and `join()` blocks the coordinator
//! until the count reaches zero - i.e. until every enqueued item (task or
//! termination signal) has been acknowledged as processed.
//!
//! The queue is unbounded: the full task list for a cycle is enqueued before
//! any worker drains it, so peak depth equals the cycle's task count.

use crate::error::SyncError;
use crate::sync::task::QueueItem;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};

/// Statistics for the work queue
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Total items enqueued (tasks + termination signals)
    pub enqueued: AtomicU64,

    /// Total items dequeued by workers
    pub dequeued: AtomicU64,

    /// Total items acknowledged as processed
    pub acknowledged: AtomicU64,
}

impl QueueStats {
    /// Items enqueued but not yet acknowledged
    pub fn outstanding(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed) - self.acknowledged.load(Ordering::Relaxed)
    }
}

/// Outstanding-item counter backing `join()`
#[derive(Debug, Default)]
struct JoinCounter {
    outstanding: Mutex<u64>,
    drained: Condvar,
}

/// Work queue with join semantics
pub struct SyncQueue {
    sender: Sender<QueueItem>,
    receiver: Receiver<QueueItem>,
    counter: Arc<JoinCounter>,
    stats: Arc<QueueStats>,
}

impl SyncQueue {
    /// Create a new empty queue
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();

        Self {
            sender,
            receiver,
            counter: Arc::new(JoinCounter::default()),
            stats: Arc::new(QueueStats::default()),
        }
    }

    /// Enqueue an item, counting it as outstanding until acknowledged
    pub fn enqueue(&self, item: QueueItem) -> Result<(), SyncError> {
        {
            let mut outstanding = self
                .counter
                .outstanding
                .lock()
                .expect("queue counter poisoned");
            *outstanding += 1;
        }

        self.sender
            .send(item)
            .map_err(|_| SyncError::ChannelClosed)?;
        self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Get a receiver handle for this queue (clone one per worker)
    pub fn receiver(&self) -> QueueReceiver {
        QueueReceiver {
            receiver: self.receiver.clone(),
            counter: Arc::clone(&self.counter),
            stats: Arc::clone(&self.stats),
        }
    }

    /// Get queue statistics
    pub fn stats(&self) -> Arc<QueueStats> {
        Arc::clone(&self.stats)
    }

    /// Check if the queue is empty
    ///
    /// An empty queue is not a drained queue: items already dequeued may
    /// still be unacknowledged. Use `join()` for completion.
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Get current queue length
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Block until every enqueued item has been acknowledged
    pub fn join(&self) {
        let mut outstanding = self
            .counter
            .outstanding
            .lock()
            .expect("queue counter poisoned");
        while *outstanding > 0 {
            outstanding = self
                .counter
                .drained
                .wait(outstanding)
                .expect("queue counter poisoned");
        }
    }
}

impl Default for SyncQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for dequeuing and acknowledging items
#[derive(Clone)]
pub struct QueueReceiver {
    receiver: Receiver<QueueItem>,
    counter: Arc<JoinCounter>,
    stats: Arc<QueueStats>,
}

impl QueueReceiver {
    /// Receive an item, blocking until one is available
    ///
    /// Returns `None` when the queue has been torn down.
    pub fn recv(&self) -> Option<QueueItem> {
        match self.receiver.recv() {
            Ok(item) => {
                self.stats.dequeued.fetch_add(1, Ordering::Relaxed);
                Some(item)
            }
            Err(_) => None,
        }
    }

    /// Acknowledge the most recently dequeued item as processed
    pub fn acknowledge(&self) {
        let mut outstanding = self
            .counter
            .outstanding
            .lock()
            .expect("queue counter poisoned");
        if *outstanding > 0 {
            *outstanding -= 1;
            if *outstanding == 0 {
                self.counter.drained.notify_all();
            }
        }
        self.stats.acknowledged.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::task::{Locator, TaskBuilder};
    use std::thread;
    use std::time::Duration;

    fn one_row_task() -> QueueItem {
        let mut builder = TaskBuilder::new();
        builder.push(Locator { page: 0, row: 1 });
        QueueItem::Task(builder.build())
    }

    #[test]
    fn test_queue_basic() {
        let queue = SyncQueue::new();
        queue.enqueue(one_row_task()).unwrap();
        assert!(!queue.is_empty());
        assert_eq!(queue.len(), 1);

        let receiver = queue.receiver();
        let item = receiver.recv().unwrap();
        assert!(matches!(item, QueueItem::Task(_)));
        receiver.acknowledge();

        queue.join(); // returns immediately, everything acknowledged
    }

    #[test]
    fn test_join_waits_for_acknowledgment() {
        let queue = SyncQueue::new();
        queue.enqueue(one_row_task()).unwrap();
        queue.enqueue(QueueItem::Terminate).unwrap();

        let receiver = queue.receiver();
        let drainer = thread::spawn(move || {
            // dequeue both, then acknowledge after a delay so a premature
            // join would return before the acknowledgments land
            let first = receiver.recv().unwrap();
            let second = receiver.recv().unwrap();
            assert!(matches!(first, QueueItem::Task(_)));
            assert!(matches!(second, QueueItem::Terminate));

            thread::sleep(Duration::from_millis(50));
            receiver.acknowledge();
            receiver.acknowledge();
        });

        let started = std::time::Instant::now();
        queue.join();
        assert!(started.elapsed() >= Duration::from_millis(40));

        drainer.join().unwrap();
        assert_eq!(queue.stats().outstanding(), 0);
    }

    #[test]
    fn test_join_accounting_across_workers() {
        // 7 tasks + 3 termination signals = 10 acknowledgments, regardless
        // of which consumer drained which item
        let queue = SyncQueue::new();
        for _ in 0..7 {
            queue.enqueue(one_row_task()).unwrap();
        }
        for _ in 0..3 {
            queue.enqueue(QueueItem::Terminate).unwrap();
        }

        let mut drainers = Vec::new();
        for _ in 0..3 {
            let receiver = queue.receiver();
            drainers.push(thread::spawn(move || loop {
                match receiver.recv() {
                    Some(QueueItem::Task(_)) => receiver.acknowledge(),
                    Some(QueueItem::Terminate) => {
                        receiver.acknowledge();
                        break;
                    }
                    None => break,
                }
            }));
        }

        queue.join();

        let stats = queue.stats();
        assert_eq!(stats.enqueued.load(Ordering::Relaxed), 10);
        assert_eq!(stats.acknowledged.load(Ordering::Relaxed), 10);

        for drainer in drainers {
            drainer.join().unwrap();
        }
    }

    #[test]
    fn test_join_on_empty_queue_returns_immediately() {
        let queue = SyncQueue::new();
        queue.join();
    }

    #[test]
    fn test_fifo_order() {
        let queue = SyncQueue::new();
        queue.enqueue(one_row_task()).unwrap();
        queue.enqueue(QueueItem::Terminate).unwrap();

        let receiver = queue.receiver();
        assert!(matches!(receiver.recv(), Some(QueueItem::Task(_))));
        assert!(matches!(receiver.recv(), Some(QueueItem::Terminate)));
        receiver.acknowledge();
        receiver.acknowledge();
    }
}
