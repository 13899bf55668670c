//! Criterion benchmarks for the checkflow engine.
//!
//! Measures the hot paths of a large run: assembling a grouped result from
//! categorized items and rendering the two per-item artifacts.

use criterion::{criterion_group, criterion_main, Criterion};

use checkflow_engine::builder::{build_complete_output, ItemMeta, ItemSet, OutputSpec};
use checkflow_engine::formatter::{render_log, render_report};
use checkflow_engine::types::CheckResult;

fn synthetic_result(items: usize) -> CheckResult {
    let mut found = ItemSet::default();
    let mut missing = ItemSet::default();
    for i in 0..items {
        let meta = ItemMeta {
            line_number: (i + 1) as u32,
            file_path: Some(format!("reports/run_{i}.log")),
            line_content: format!("pattern_{i} matched"),
        };
        if i % 4 == 0 {
            missing.insert(format!("pattern_{i}"), meta);
        } else {
            found.insert(format!("pattern_{i}"), meta);
        }
    }

    build_complete_output(OutputSpec {
        found_items: Some(found),
        missing_items: Some(missing),
        has_pattern_items: true,
        item_desc: "Synthetic pattern check".to_owned(),
        ..OutputSpec::default()
    })
}

fn bench_build_output(c: &mut Criterion) {
    c.bench_function("build_complete_output_200", |b| {
        b.iter(|| std::hint::black_box(synthetic_result(200)))
    });
}

fn bench_render(c: &mut Criterion) {
    let result = synthetic_result(200);
    c.bench_function("render_log_200", |b| {
        b.iter(|| std::hint::black_box(render_log(&result, "IMP-BENCH-00")))
    });
    c.bench_function("render_report_200", |b| {
        b.iter(|| std::hint::black_box(render_report(&result, "IMP-BENCH-00")))
    });
}

criterion_group!(benches, bench_build_output, bench_render);
criterion_main!(benches);
