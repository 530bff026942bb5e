//! Benchmarks de bout en bout : source Kuri → texte C (Criterion)
//!
//! Chaque itération crée une `Compilatrice` neuve : lexage, syntaxage,
//! validation, graphe de dépendances et coulisse C.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use kuri_benches::{env_ms, env_usize, programme_synthetique, CAS};
use kuri_compiler::{Compilatrice, OptionsCompilation};

fn compile(src: &str, trace_appels: bool) -> usize {
    let options = OptionsCompilation { trace_appels, ..OptionsCompilation::default() };
    Compilatrice::new(options).compile_source("bench.kuri", src).map_or(0, |c| c.len())
}

fn bench_compilation_micro(c: &mut Criterion) {
    let mut group = c.benchmark_group("compilation/micro");
    group.sample_size(env_usize("CRIT_SAMPLES", 40));
    group.warm_up_time(env_ms("CRIT_WARMUP_MS", 300));
    group.measurement_time(env_ms("CRIT_MEASURE_MS", 1000));

    for (name, src) in CAS {
        assert!(compile(src, false) > 0, "le cas « {name} » ne compile pas");
        group.throughput(Throughput::Bytes(src.len() as u64));
        group.bench_with_input(BenchmarkId::new("sans-trace", name), src, |b, s| {
            b.iter(|| black_box(compile(black_box(s), false)));
        });
        group.bench_with_input(BenchmarkId::new("trace", name), src, |b, s| {
            b.iter(|| black_box(compile(black_box(s), true)));
        });
    }
    group.finish();
}

fn bench_compilation_synthetic(c: &mut Criterion) {
    let mut group = c.benchmark_group("compilation/synthetic");
    group.sample_size(env_usize("CRIT_SAMPLES", 20));
    group.warm_up_time(env_ms("CRIT_WARMUP_MS", 500));
    group.measurement_time(env_ms("CRIT_MEASURE_MS", 2000));

    for n in [10usize, 100, 500] {
        let src = programme_synthetique(n);
        group.throughput(Throughput::Bytes(src.len() as u64));
        group.bench_with_input(BenchmarkId::new("fonctions", n), &src, |b, s| {
            b.iter(|| black_box(compile(black_box(s), false)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_compilation_micro, bench_compilation_synthetic);
criterion_main!(benches);
