//! Sankey Benchmarks
//!
//! Graph construction over store-sized result sets and query generation.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kuba_sankey::{build_graph, QueryColumn, QueryFilter, SankeyQuery, SankeyRow, TimeRange};
use std::hint::black_box;

// =============================================================================
// Test Data Generators
// =============================================================================

/// Weight-descending rows with a small value alphabet per layer
fn create_rows(dimensions: &[QueryColumn], count: usize) -> Vec<SankeyRow> {
    (0..count)
        .map(|i| {
            let values = dimensions.iter().enumerate().map(|(layer, column)| {
                let bucket = (i * (layer + 3)) % 12;
                if bucket == 0 {
                    "Other".to_string()
                } else {
                    format!("{}-{}", column, bucket)
                }
            });
            SankeyRow::new((count - i) as f64 * 1000.0, values)
        })
        .collect()
}

fn dimensions(width: usize) -> Vec<QueryColumn> {
    QueryColumn::ALL[..width].to_vec()
}

// =============================================================================
// Graph Construction
// =============================================================================

fn bench_build_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_graph");

    for &count in &[10usize, 50, 500] {
        for &width in &[2usize, 4, 8] {
            let dims = dimensions(width);
            let rows = create_rows(&dims, count);

            group.throughput(Throughput::Elements(count as u64));
            group.bench_with_input(
                BenchmarkId::new(format!("{}_dims", width), count),
                &rows,
                |b, rows| b.iter(|| build_graph(black_box(&dims), black_box(rows.clone()))),
            );
        }
    }

    group.finish();
}

// =============================================================================
// Query Generation
// =============================================================================

fn bench_to_sql(c: &mut Criterion) {
    let mut group = c.benchmark_group("to_sql");
    let range = TimeRange::new(
        "2022-04-10T15:45:10Z".parse().unwrap(),
        "2022-04-11T15:45:10Z".parse().unwrap(),
    )
    .unwrap();

    for &width in &[2usize, 4, 8] {
        let query = SankeyQuery::new(
            range,
            dimensions(width),
            10,
            QueryFilter::new("DstCountry = 'FR'"),
        )
        .unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(width), &query, |b, query| {
            b.iter(|| black_box(query).to_sql())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build_graph, bench_to_sql);
criterion_main!(benches);
