//! Performance benchmarks for stride-engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::{json, Value};
use std::sync::Arc;
use stride_engine::{
    normalize, Collection, KeyValueStorage, LocalStore, ManualClock, MemoryStorage,
    NormalizeContext,
};

fn legacy_workouts(count: usize) -> Value {
    let workouts: Vec<Value> = (0..count)
        .map(|i| {
            json!({
                "id": format!("w{i}"),
                "date": format!("2026-01-{:02}T07:00:00.000Z", i % 28 + 1),
                "type": if i % 3 == 0 { "Full Body" } else { "legs" },
                "exercises": [
                    {"name": "Squat", "sets": [{"reps": "5", "weight": 100}, {"reps": 5, "weight": "102.5"}]},
                    "Lunges",
                ],
                "rpe": i % 10,
            })
        })
        .collect();
    Value::Array(workouts)
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    let ctx = NormalizeContext::new(chrono::NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());

    for size in [10, 100, 1000].iter() {
        let raw = legacy_workouts(*size);
        group.bench_with_input(BenchmarkId::new("workouts", size), size, |b, _| {
            b.iter(|| normalize(Collection::Workouts, black_box(&raw), &ctx))
        });
    }

    let settings = json!({
        "darkMode": true,
        "workoutSplit": "push,pull,legs,upper",
        "customExercises": (0..150).map(|i| format!("Move {i}")).collect::<Vec<_>>(),
        "profile": {"age": "34", "units": "imperial"},
    });
    group.bench_function("settings", |b| {
        b.iter(|| normalize(Collection::Settings, black_box(&settings), &ctx))
    });

    group.finish();
}

fn bench_migrate(c: &mut Criterion) {
    let mut group = c.benchmark_group("migrate");

    for size in [100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("full_store", size), size, |b, &size| {
            let storage = Arc::new(MemoryStorage::new());
            storage
                .set("stride.workouts", &legacy_workouts(size).to_string())
                .unwrap();
            let clock = Arc::new(ManualClock::at("2026-02-01T14:00:00Z").unwrap());
            let store = LocalStore::new(storage, clock);

            b.iter(|| store.migrate())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_normalize, bench_migrate);
criterion_main!(benches);
