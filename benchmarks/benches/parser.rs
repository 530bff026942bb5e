//! Benchmarks de la syntaxeuse Kuri (Criterion)
//!
//! Le lexage est fait hors mesure : seule l'analyse syntaxique est chronométrée.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};

use kuri_ast::Assembleuse;
use kuri_benches::{env_ms, env_usize, programme_synthetique, CAS};
use kuri_core::SourceId;
use kuri_lexer::Lexeme;

fn lexemes(src: &str) -> Vec<Lexeme> { kuri_lexer::lexe(src, SourceId(0)).unwrap_or_default() }

fn analyse(lexemes: &[Lexeme]) -> usize {
    let mut asm = Assembleuse::new();
    let _ = kuri_parser::analyse_fichier(lexemes, SourceId(0), &mut asm);
    asm.len()
}

fn bench_parser_micro(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser/micro");
    group.sample_size(env_usize("CRIT_SAMPLES", 60));
    group.warm_up_time(env_ms("CRIT_WARMUP_MS", 300));
    group.measurement_time(env_ms("CRIT_MEASURE_MS", 800));

    for (name, src) in CAS {
        let l = lexemes(src);
        group.throughput(Throughput::Elements(l.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &l, |b, l| {
            b.iter(|| black_box(analyse(black_box(l))));
        });
    }
    group.finish();
}

fn bench_parser_synthetic(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser/synthetic");
    group.sample_size(env_usize("CRIT_SAMPLES", 30));
    group.warm_up_time(env_ms("CRIT_WARMUP_MS", 300));
    group.measurement_time(env_ms("CRIT_MEASURE_MS", 1000));

    for n in [10usize, 100, 1000] {
        let l = lexemes(&programme_synthetique(n));
        group.throughput(Throughput::Elements(l.len() as u64));
        group.bench_with_input(BenchmarkId::new("fonctions", n), &l, |b, l| {
            b.iter_batched(|| l.clone(), |l| black_box(analyse(&l)), BatchSize::LargeInput);
        });
    }

    // imbrication juste sous PROFONDEUR_EXPRESSION_MAX
    let profonde = format!("fonc f() : z32 {{ retourne {}1{}; }}", "(1 + ".repeat(30), ")".repeat(30));
    let l = lexemes(&profonde);
    group.bench_function("parentheses-30", |b| b.iter(|| black_box(analyse(black_box(&l)))));
    group.finish();
}

criterion_group!(benches, bench_parser_micro, bench_parser_synthetic);
criterion_main!(benches);
