//! Inference benchmark: record → sequence model raw score.

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use stream_anomaly::model::{AnomalyModel, SequenceModel};
use stream_anomaly::params::{ConfigProvider, ScalarMetricTemplate, TemplateRequest, TmImplementation};
use stream_anomaly::Record;

fn model(learning: bool) -> SequenceModel {
    let config = ScalarMetricTemplate
        .template(&TemplateRequest {
            metric_data: &[0.0],
            min_val: Some(-20.0),
            max_val: Some(120.0),
            min_resolution: 0.001,
            tm_implementation: TmImplementation::Cpp,
        })
        .unwrap()
        .into_field_config();
    let mut m = SequenceModel::create(&config).unwrap();
    m.enable_inference("value").unwrap();
    m.set_learning(learning);
    m
}

fn records(n: i64) -> Vec<Record> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| Record::new(start + Duration::minutes(i), (i % 100) as f64))
        .collect()
}

fn bench_run_learning(c: &mut Criterion) {
    let mut m = model(true);
    let input = records(1000);
    let mut i = 0;

    c.bench_function("sequence_run_learning", |b| {
        b.iter(|| {
            i = (i + 1) % input.len();
            black_box(m.run(black_box(&input[i])).unwrap())
        })
    });
}

fn bench_run_inference_only(c: &mut Criterion) {
    let mut m = model(true);
    let input = records(1000);
    for r in &input {
        m.run(r).unwrap();
    }
    m.set_learning(false);
    let mut i = 0;

    c.bench_function("sequence_run_frozen", |b| {
        b.iter(|| {
            i = (i + 1) % input.len();
            black_box(m.run(black_box(&input[i])).unwrap())
        })
    });
}

criterion_group!(benches, bench_run_learning, bench_run_inference_only);
criterion_main!(benches);
