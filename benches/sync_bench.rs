//! Benchmarks for bulksync
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn benchmark_locator_parse(c: &mut Criterion) {
    use bulksync::sync::Locator;

    c.bench_function("locator_parse", |b| {
        b.iter(|| {
            let locator = Locator::parse(black_box("(4242,17)")).unwrap();
            black_box(locator);
        })
    });
}

fn benchmark_queue_operations(c: &mut Criterion) {
    use bulksync::sync::{Locator, QueueItem, SyncQueue, TaskBuilder};

    c.bench_function("queue_enqueue_recv_ack", |b| {
        let queue = SyncQueue::new();
        let receiver = queue.receiver();

        b.iter(|| {
            let mut builder = TaskBuilder::new();
            builder.push(Locator { page: 0, row: 1 });
            queue.enqueue(QueueItem::Task(builder.build())).unwrap();

            let item = receiver.recv().unwrap();
            receiver.acknowledge();
            black_box(item);
        })
    });
}

fn benchmark_task_grouping(c: &mut Criterion) {
    use bulksync::sync::{Locator, TaskBuilder};

    c.bench_function("task_grouping_4096", |b| {
        b.iter(|| {
            let mut builder = TaskBuilder::new();
            for i in 0..4096u32 {
                builder.push(Locator {
                    page: i / 226,
                    row: (i % 226 + 1) as u16,
                });
            }
            black_box(builder.build());
        })
    });
}

criterion_group!(
    benches,
    benchmark_locator_parse,
    benchmark_queue_operations,
    benchmark_task_grouping
);
criterion_main!(benches);
