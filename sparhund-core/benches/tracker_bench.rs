#[macro_use]
extern crate criterion;

use criterion::Criterion;

use sparhund_core::events::{ConnectionEvent, Decision};
use sparhund_core::filter::SearchScope;
use sparhund_core::tracker::ConnectionTracker;

fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("tracker_append");

    for capacity in [1024, 8192, 65536] {
        group.throughput(criterion::Throughput::Elements(1));
        group.bench_function(format!("capacity_{}", capacity), |b| {
            let tracker = ConnectionTracker::with_capacity(capacity);
            let mut ts = 0i64;
            b.iter(|| {
                ts += 1;
                tracker.append(
                    ConnectionEvent::new("203.0.113.7", Decision::Block, ts)
                        .with_app("org.example.browser"),
                );
            });
        });
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("tracker_search");

    let tracker = ConnectionTracker::with_capacity(8192);
    for i in 0..8192i64 {
        tracker.append(
            ConnectionEvent::new(format!("10.{}.{}.{}", i % 3, (i / 3) % 250, i % 250), Decision::Allow, i + 1)
                .with_app(format!("app.pkg{}", i % 40)),
        );
    }

    group.bench_function("address_substring", |b| {
        b.iter(|| tracker.search("10.1.", SearchScope::Address).count());
    });
    group.bench_function("full_history", |b| {
        b.iter(|| tracker.search("", SearchScope::Any).count());
    });
    group.finish();
}

criterion_group!(benches, bench_append, bench_search);
criterion_main!(benches);
