//! Benchmarks du lexer Kuri (Criterion)
//!
//! ▶ Paramètres via variables d'environnement :
//!   - CRIT_SAMPLES      (def=60)   — taille d'échantillon Criterion
//!   - CRIT_WARMUP_MS    (def=300)  — warmup en ms
//!   - CRIT_MEASURE_MS   (def=1000) — fenêtre de mesure en ms
//!
//! Suites : `micro` (sources embarquées) et `synthetic` (16 → 1024 Kio).

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use kuri_benches::{env_ms, env_usize, gonfle_kib, CAS, SRC_BOUCLES, SRC_CHAINES};
use kuri_core::SourceId;

fn lex_count(src: &str) -> usize { kuri_lexer::lexe(src, SourceId(0)).map_or(0, |l| l.len()) }

fn bench_lexer_micro(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer/micro");
    group.sample_size(env_usize("CRIT_SAMPLES", 60));
    group.warm_up_time(env_ms("CRIT_WARMUP_MS", 300));
    group.measurement_time(env_ms("CRIT_MEASURE_MS", 800));

    for (name, src) in CAS {
        group.throughput(Throughput::Bytes(src.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), src, |b, s| {
            b.iter(|| black_box(lex_count(black_box(s))));
        });
    }
    group.finish();
}

fn bench_lexer_synthetic(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer/synthetic");
    group.sample_size(env_usize("CRIT_SAMPLES", 50));
    group.warm_up_time(env_ms("CRIT_WARMUP_MS", 300));
    group.measurement_time(env_ms("CRIT_MEASURE_MS", 1000));

    let commentaires = "// commentaire de ligne\n/* bloc /* imbriqué */ */ x := 1 + 2 + 3; // fin";
    for kib in [16usize, 64, 256, 1024] {
        for (name, seed) in [("code", SRC_BOUCLES), ("unicode", SRC_CHAINES), ("commentaires", commentaires)] {
            let src = gonfle_kib(seed, kib);
            group.throughput(Throughput::Bytes(src.len() as u64));
            group.bench_with_input(BenchmarkId::new(name, kib), &src, |b, s| {
                b.iter(|| black_box(lex_count(black_box(s))));
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_lexer_micro, bench_lexer_synthetic);
criterion_main!(benches);
