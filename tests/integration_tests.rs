//! Integration tests for bulksync
//!
//! Note: end-to-end runs require a live PostgreSQL and search index.
//! These tests exercise the public API surface only: config loading,
//! checkpoint persistence, task partitioning primitives and queue join
//! accounting.

use bulksync::config::{CliArgs, SyncConfig, TableRef};
use bulksync::engine::checkpoint::CheckpointStore;
use bulksync::sync::{Locator, QueueItem, SyncQueue, TaskBuilder};
use clap::Parser;
use std::fs;
use std::thread;
use tempfile::tempdir;

#[test]
fn test_config_loading_from_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sync.json");
    fs::write(
        &path,
        r#"{
            "targets": [
                {
                    "database": "postgres://localhost/app",
                    "table": "app.book",
                    "index": "book",
                    "primary_key": "isbn",
                    "search_url": "http://localhost:9200",
                    "block_size": 2048
                },
                {
                    "database": "postgres://localhost/app",
                    "table": "author",
                    "index": "author",
                    "primary_key": "id",
                    "search_url": "http://localhost:9200"
                }
            ]
        }"#,
    )
    .unwrap();

    let args = CliArgs::parse_from([
        "bulksync",
        path.to_str().unwrap(),
        "-w",
        "4",
        "--checkpoint-dir",
        dir.path().to_str().unwrap(),
    ]);
    let config = SyncConfig::load(&args).unwrap();

    assert_eq!(config.worker_count, 4);
    assert_eq!(config.targets.len(), 2);

    // order of the file is preserved
    assert_eq!(config.targets[0].index, "book");
    assert_eq!(config.targets[0].block_size, 2048);
    assert_eq!(config.targets[0].table, TableRef::parse("app.book").unwrap());
    assert_eq!(config.targets[1].index, "author");
    assert_eq!(config.targets[1].table.schema, "public");
}

#[test]
fn test_missing_config_file_fails_before_any_work() {
    let args = CliArgs::parse_from(["bulksync", "/nonexistent/sync.json"]);
    let err = SyncConfig::load(&args).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/sync.json"));
}

#[test]
fn test_checkpoint_round_trip() {
    let dir = tempdir().unwrap();
    let store = CheckpointStore::new(dir.path(), "book");

    // never synced reads as zero
    assert_eq!(store.load().unwrap(), 0);

    store.store(150).unwrap();
    assert_eq!(store.load().unwrap(), 150);

    // a fresh store over the same directory sees the persisted value
    let reopened = CheckpointStore::new(dir.path(), "book");
    assert_eq!(reopened.load().unwrap(), 150);
}

#[test]
fn test_locator_partitioning_primitives() {
    let locator = Locator::parse("(128,7)").unwrap();
    assert_eq!(locator.page, 128);
    assert_eq!(locator.row, 7);

    let mut builder = TaskBuilder::new();
    for raw in ["(0,1)", "(0,2)", "(1,1)"] {
        builder.push(Locator::parse(raw).unwrap());
    }
    let task = builder.build().with_window(100, 150);
    assert_eq!(task.len(), 3);
    assert_eq!(task.txmin(), Some(100));
    assert_eq!(task.txmax(), Some(150));
}

#[test]
fn test_queue_join_accounting_across_threads() {
    let queue = SyncQueue::new();

    // 7 tasks + 3 termination signals, drained by 3 consumers
    for row in 1..=7 {
        let mut builder = TaskBuilder::new();
        builder.push(Locator { page: 0, row });
        queue.enqueue(QueueItem::Task(builder.build())).unwrap();
    }
    for _ in 0..3 {
        queue.enqueue(QueueItem::Terminate).unwrap();
    }

    let mut consumers = Vec::new();
    for _ in 0..3 {
        let receiver = queue.receiver();
        consumers.push(thread::spawn(move || {
            let mut drained = 0usize;
            loop {
                match receiver.recv() {
                    Some(QueueItem::Task(_)) => {
                        drained += 1;
                        receiver.acknowledge();
                    }
                    Some(QueueItem::Terminate) => {
                        receiver.acknowledge();
                        break;
                    }
                    None => break,
                }
            }
            drained
        }));
    }

    // returns only once all 10 acknowledgments arrived
    queue.join();

    let drained: usize = consumers.into_iter().map(|c| c.join().unwrap()).sum();
    assert_eq!(drained, 7);
    assert_eq!(queue.stats().outstanding(), 0);
}
