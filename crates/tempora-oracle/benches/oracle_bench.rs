//! Benchmarks for TEMPORA oracle operations

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use tempora_oracle::{CaseRegistry, Comparator, ComparatorConfig, Locale};

fn transcript(lines: usize) -> String {
    let mut text = String::new();
    for i in 0..lines {
        text.push_str(&format!("Processing time {} ms\n", i * 10));
        text.push_str(&format!("  TimeNode: Progress = {}\n", i as f64 / lines as f64));
    }
    text
}

fn bench_compare_identical(c: &mut Criterion) {
    let comparator = Comparator::new(ComparatorConfig::default());
    let text = transcript(500);

    c.bench_function("compare_identical_500", |b| {
        b.iter(|| black_box(comparator.compare(black_box(&text), black_box(&text))))
    });
}

fn bench_compare_localized(c: &mut Criterion) {
    let comparator = Comparator::new(ComparatorConfig::default().with_locale(Locale::with_separator(',')));
    let actual = transcript(500);
    let expected = actual.replace("0.", "0,");

    c.bench_function("compare_localized_500", |b| {
        b.iter(|| black_box(comparator.compare(black_box(&actual), black_box(&expected))))
    });
}

fn bench_progress_of(c: &mut Criterion) {
    let comparator = Comparator::new(ComparatorConfig::default());

    c.bench_function("progress_of", |b| {
        b.iter(|| black_box(comparator.progress_of(black_box("  TimeNode: CurrentTimeInvalidated fired (Progress = 0.35)"))))
    });
}

fn bench_builtin_cases(c: &mut Criterion) {
    let registry = CaseRegistry::builtin();

    for id in ["Begin", "AutoReverse", "SlipClock"] {
        c.bench_function(&format!("case_{}", id), |b| {
            b.iter(|| {
                let mut case = registry.construct(id).unwrap();
                black_box(case.test().unwrap())
            })
        });
    }
}

criterion_group!(
    benches,
    bench_compare_identical,
    bench_compare_localized,
    bench_progress_of,
    bench_builtin_cases,
);
criterion_main!(benches);
