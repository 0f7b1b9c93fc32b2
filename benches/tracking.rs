//! Performance benchmarks for community tracking.
//!
//! Run with: `cargo bench --bench tracking`
//!
//! ## Workloads
//!
//! | Benchmark | Shape | Notes |
//! |-----------|-------|-------|
//! | chronological_observe | C clusters × C predecessors | Quadratic Jaccard scan |
//! | history_match | C communities × C candidates | Exclusive matching |
//! | snapshot_parse | N nodes, N edges, N/10 clusters | Marker layout file |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::collections::BTreeSet;

use alluvial_kernel::{
    CandidateSelection, ChronologicalCommunityTracker, Cluster, CommunityHistory,
    HistoryFileMatcher, SnapshotParser, TrackerConfig,
};

/// Clusters of 10 members each; `shift` slides membership between timestamps.
fn make_clusters(count: i64, shift: i64) -> Vec<Cluster> {
    (0..count)
        .map(|c| {
            let start = c * 10 + shift;
            Cluster::new(c + 1, 0.0, 0.0, 1.0, start..start + 10)
        })
        .collect()
}

fn make_history(count: i64, shift: i64) -> CommunityHistory {
    let mut history = CommunityHistory::new();
    for c in 0..count {
        let start = c * 10 + shift;
        let members: BTreeSet<String> = (start..start + 10).map(|m| m.to_string()).collect();
        history.insert(c + 1, members);
    }
    history
}

fn make_snapshot(nodes: usize) -> String {
    let clusters = nodes / 10;
    let mut out = format!("#nodes,{}\n", nodes);
    for n in 0..nodes {
        out.push_str(&format!("{},{}.5,{}.5,{},n{}\n", n, n, n, n / 10, n));
    }
    out.push_str(&format!("#edges,{}\n", nodes));
    for e in 0..nodes {
        out.push_str(&format!("{},{},{}\n", e, e, (e + 1) % nodes));
    }
    out.push_str(&format!("#clusters,{}\n", clusters * 2));
    for c in 0..clusters {
        out.push_str(&format!("{},0.0,0.0,1.0\n", c));
        let children: Vec<String> = (c * 10..c * 10 + 10).map(|m| m.to_string()).collect();
        out.push_str(&format!("_,{}\n", children.join(",")));
    }
    out
}

/// Benchmark one tracked timestamp against a full previous timestamp.
fn bench_chronological_observe(c: &mut Criterion) {
    let mut group = c.benchmark_group("chronological_observe");

    for count in [10i64, 100, 500] {
        let first = make_clusters(count, 0);
        let second = make_clusters(count, 3);
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                let mut tracker = ChronologicalCommunityTracker::new(TrackerConfig::default());
                tracker.observe("t0", &first).unwrap();
                black_box(tracker.observe("t1", &second).unwrap())
            })
        });
    }

    group.finish();
}

/// Benchmark exclusive history matching under both selection rules.
fn bench_history_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("history_match");

    for selection in [CandidateSelection::LastQualifying, CandidateSelection::BestQualifying] {
        let matcher = HistoryFileMatcher::new(0.25, selection);
        for count in [10i64, 100, 500] {
            let previous = make_history(count, 0);
            let current = make_history(count, 2);
            group.throughput(Throughput::Elements(count as u64));

            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", selection), count),
                &count,
                |b, _| b.iter(|| black_box(matcher.match_ids(&current, &previous))),
            );
        }
    }

    group.finish();
}

/// Benchmark parsing a layout snapshot.
fn bench_snapshot_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_parse");
    let parser = SnapshotParser::new();

    for nodes in [100usize, 1_000, 10_000] {
        let content = make_snapshot(nodes);
        group.throughput(Throughput::Bytes(content.len() as u64));

        group.bench_with_input(BenchmarkId::from_parameter(nodes), &content, |b, content| {
            b.iter(|| black_box(parser.parse_reader(content.as_bytes()).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_chronological_observe,
    bench_history_match,
    bench_snapshot_parse,
);

criterion_main!(benches);
