use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rust_frontier::{ByteQueue, CrawlRequest, DiskQueue, MemoryQueue, PriorityQueue, QueueFactory};
use tempfile::TempDir;

fn memory_factory() -> QueueFactory {
    Box::new(|_priority| Ok(Box::new(MemoryQueue::new()) as Box<dyn ByteQueue>))
}

fn bench_priority_queue_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("pqueue_push_pop");

    for num_items in [100, 1000, 10000] {
        let record = CrawlRequest::new("https://example.com/page")
            .encode()
            .unwrap();

        group.bench_with_input(
            BenchmarkId::new("memory_buckets", num_items),
            &num_items,
            |b, &n| {
                b.iter(|| {
                    let mut queue = PriorityQueue::new(memory_factory());
                    for i in 0..n {
                        queue.push(black_box(&record), (i % 5) as i32).unwrap();
                    }
                    while let Some(popped) = queue.pop().unwrap() {
                        black_box(popped);
                    }
                });
            },
        );
    }

    group.finish();
}

fn bench_disk_queue_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("disk_queue");
    group.sample_size(20);

    for num_items in [100, 1000] {
        let record = CrawlRequest::new("https://example.com/some/deep/path?page=42")
            .encode()
            .unwrap();

        group.bench_with_input(
            BenchmarkId::new("push_pop", num_items),
            &num_items,
            |b, &n| {
                b.iter(|| {
                    let dir = TempDir::new().unwrap();
                    let mut queue = DiskQueue::open(dir.path().join("0")).unwrap();
                    for _ in 0..n {
                        queue.push(black_box(&record)).unwrap();
                    }
                    while let Some(popped) = queue.pop().unwrap() {
                        black_box(popped);
                    }
                    Box::new(queue).close().unwrap();
                });
            },
        );
    }

    group.finish();
}

fn bench_request_encode(c: &mut Criterion) {
    let request = CrawlRequest::new("https://example.com/catalog/item/12345?ref=feed")
        .with_method("POST")
        .with_body(vec![0u8; 256]);

    c.bench_function("request_encode", |b| {
        b.iter(|| black_box(&request).encode().unwrap())
    });

    let encoded = request.encode().unwrap();
    c.bench_function("request_decode", |b| {
        b.iter(|| CrawlRequest::decode(black_box(&encoded)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_priority_queue_cycle,
    bench_disk_queue_throughput,
    bench_request_encode
);
criterion_main!(benches);
