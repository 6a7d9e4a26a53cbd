//! Benchmark suite for querywatch's hot paths.
//!
//! Benchmarks cover:
//! - SQL normalization
//! - Index suggestion
//! - `track()` on enabled and disabled trackers
//! - Report computation over a request log
//!
//! Run with: `cargo bench`

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use querywatch::analyzer::{normalize, suggest_index, MemorySink, QueryTracker};
use querywatch::config::AnalyzerConfig;

// ---------------------------------------------------------------------------
// SQL test inputs organized by complexity
// ---------------------------------------------------------------------------

const SIMPLE_SELECT: &str = "SELECT * FROM users";

const SELECT_WITH_PARAM: &str = "SELECT * FROM posts WHERE user_id = $1";

const SELECT_WITH_WHERE: &str =
    "SELECT id, name, email FROM users WHERE age > 18 AND status = 'active'";

const SELECT_WITH_JOIN: &str = "SELECT u.name, o.total, o.created_at \
    FROM users u \
    JOIN orders o ON u.id = o.user_id \
    WHERE o.total > 100.00 AND o.status IN ('paid', 'shipped') \
    ORDER BY o.created_at DESC \
    LIMIT 50";

const INSERT_QUERY: &str =
    "INSERT INTO users (name, email, age, department) VALUES ('John Doe', 'john@example.com', 30, 'Engineering')";

const UPDATE_QUERY: &str = "UPDATE employees SET salary = salary * 1.10, \
    updated_at = CURRENT_TIMESTAMP \
    WHERE department = 'Engineering' AND performance_rating > 4";

const CASES: [(&str, &str); 6] = [
    ("simple_select", SIMPLE_SELECT),
    ("select_param", SELECT_WITH_PARAM),
    ("select_where", SELECT_WITH_WHERE),
    ("select_join", SELECT_WITH_JOIN),
    ("insert", INSERT_QUERY),
    ("update", UPDATE_QUERY),
];

fn enabled_tracker() -> QueryTracker {
    let config = AnalyzerConfig::new().with_enabled(true);
    QueryTracker::with_sink(&config, Arc::new(MemorySink::new()))
}

// ---------------------------------------------------------------------------
// Benchmark groups
// ---------------------------------------------------------------------------

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");

    for (name, sql) in &CASES {
        group.bench_with_input(BenchmarkId::new("normalize", name), sql, |b, sql| {
            b.iter(|| normalize(black_box(sql)));
        });
    }

    group.finish();
}

fn bench_suggest_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_advisor");

    for (name, sql) in &CASES {
        group.bench_with_input(BenchmarkId::new("suggest", name), sql, |b, sql| {
            b.iter(|| suggest_index(black_box(sql)));
        });
    }

    group.finish();
}

fn bench_track(c: &mut Criterion) {
    let mut group = c.benchmark_group("track");

    let disabled = QueryTracker::disabled();
    group.bench_function("disabled", |b| {
        b.iter(|| disabled.track(black_box(SELECT_WITH_PARAM), black_box(5), "req-1"));
    });

    let enabled = enabled_tracker();
    group.bench_function("enabled_fast", |b| {
        b.iter(|| {
            enabled.track(black_box(SELECT_WITH_PARAM), black_box(5), "req-1");
        });
        enabled.clear_all();
    });

    group.bench_function("enabled_slow", |b| {
        b.iter(|| {
            enabled.track(black_box(SELECT_WITH_JOIN), black_box(500), "req-2");
        });
        enabled.clear_all();
    });

    group.finish();
}

fn bench_report(c: &mut Criterion) {
    let mut group = c.benchmark_group("report");

    for size in [10usize, 100, 1000] {
        let tracker = enabled_tracker();
        for i in 0..size {
            let sql = CASES[i % CASES.len()].1;
            tracker.track(sql, (i % 7) as u64, "req-1");
        }
        group.bench_with_input(BenchmarkId::new("report", size), &tracker, |b, tracker| {
            b.iter(|| tracker.report(black_box("req-1")));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_normalize,
    bench_suggest_index,
    bench_track,
    bench_report,
);
criterion_main!(benches);
