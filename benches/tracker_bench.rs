use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rollcall::core::recognition::{
    cooldown::CooldownRegistry,
    tracker::{ConfirmationTracker, Decision},
    Sample,
};

fn sample_stream(len: usize, candidates: usize) -> Vec<Sample> {
    let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
    (0..len)
        .map(|i| {
            let candidate = format!("S{}", (i / 12) % candidates);
            let confidence = if i % 17 == 0 { 0.5 } else { 0.9 };
            Sample::matched(candidate, confidence, t0 + Duration::milliseconds(i as i64 * 100))
        })
        .collect()
}

fn bench_tracker(c: &mut Criterion) {
    let mut group = c.benchmark_group("tracker_observe");

    for candidates in [1usize, 4, 32] {
        let samples = sample_stream(10_000, candidates);
        group.bench_with_input(BenchmarkId::from_parameter(candidates), &samples, |b, samples| {
            b.iter(|| {
                let mut tracker = ConfirmationTracker::default();
                let mut registry = CooldownRegistry::default();
                let mut admitted = 0usize;

                for sample in samples.iter().cloned() {
                    if let Decision::Confirmed(confirmation) = tracker.observe(sample) {
                        if registry.admit(&confirmation.candidate_id, confirmation.confirmed_at) {
                            admitted += 1;
                        }
                    }
                }
                black_box(admitted)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_tracker);
criterion_main!(benches);
