//! Compile le C produit avec le compilateur C du système et exécute le
//! programme. Ignorés par défaut : `cargo test -- --ignored`.

use std::fs;
use std::process::Command;

use kuri_compiler::R16_H;
use kuri_tests::compile;

fn execute(src: &str) -> i32 {
    let dossier = tempfile::tempdir().expect("dossier temporaire");
    let c = dossier.path().join("prog.c");
    let exe = dossier.path().join("prog");
    fs::write(&c, compile(src)).expect("écriture du C");
    fs::write(dossier.path().join("r16.h"), R16_H).expect("écriture de r16.h");

    let cc = std::env::var("CC").unwrap_or_else(|_| "cc".into());
    let sortie = Command::new(cc)
        .arg("-std=c99")
        .arg("-w")
        .arg("-o")
        .arg(&exe)
        .arg(&c)
        .arg("-lpthread")
        .arg("-lm")
        .output()
        .expect("compilateur C introuvable");
    assert!(sortie.status.success(), "{}", String::from_utf8_lossy(&sortie.stderr));

    Command::new(&exe).status().expect("exécution").code().expect("code de sortie")
}

#[test]
#[ignore = "nécessite un compilateur C"]
fn arithmetique_et_appels() {
    let src = "fonc carre(x : z32) : z32 { retourne x * x; }
               fonc principale() : z32 { retourne carre(3) + 1; }";
    assert_eq!(execute(src), 10);
}

#[test]
#[ignore = "nécessite un compilateur C"]
fn boucles_et_sorties_multiples() {
    let src = "fonc divise(a : z32, b : z32) : z32, z32 { retourne a / b, a % b; }
               fonc principale() : z32 {
                   total := 0;
                   pour i dans 1 ... 4 { total += i; }
                   q, r := divise(total, 3);
                   retourne q * 10 + r;
               }";
    assert_eq!(execute(src), 31);
}

#[test]
#[ignore = "nécessite un compilateur C"]
fn coroutine_par_fils() {
    let src = "corout compte(n : z32) : z32 {
                   i := 0;
                   tantque i < n { retiens i; i += 1; }
               }
               fonc principale() : z32 {
                   total := 0;
                   pour x dans compte(4) { total += x; }
                   retourne total;
               }";
    assert_eq!(execute(src), 6);
}

#[test]
#[ignore = "nécessite un compilateur C"]
fn sansarret_apres_au_moins_une_iteration() {
    let src = "fonc principale() : z32 {
                   r := 0;
                   pour i dans 1 ... 0 { r += 1; } sansarrêt { r += 100; }
                   pour i dans 1 ... 2 { r += 1; } sansarrêt { r += 10; }
                   retourne r;
               }";
    assert_eq!(execute(src), 12);
}
