//! Corpus partagé par les benchmarks : sources Kuri embarquées et générées.

use std::fmt::Write as _;
use std::time::Duration;

/// Entier lu dans l'environnement.
pub fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key).ok().and_then(|s| s.parse::<usize>().ok()).unwrap_or(default)
}

/// Durée en millisecondes lue dans l'environnement.
pub fn env_ms(key: &str, default: u64) -> Duration {
    Duration::from_millis(std::env::var(key).ok().and_then(|s| s.parse::<u64>().ok()).unwrap_or(default))
}

pub const SRC_CARRE: &str = "fonc carre(x : z32) : z32 { retourne x * x; }
fonc principale() : z32 { retourne carre(7); }
";

pub const SRC_STRUCTURES: &str = "Vecteur3D :: struct { x : r32; y : r32; z : r32 = 1.0; }
fonc longueur2(v : *Vecteur3D) : r32 { retourne v.x * v.x + v.y * v.y + v.z * v.z; }
fonc principale() : z32 {
    v := loge Vecteur3D;
    v.x = 2.0;
    l := longueur2(v);
    déloge v;
    retourne 0;
}
";

pub const SRC_BOUCLES: &str = "fonc somme(args : ...z32) : z32 {
    s := 0;
    pour a dans args { s += a; }
    retourne s;
}
fonc principale() : z32 {
    total := 0;
    pour i dans 0 ... 99 {
        si i % 3 == 0 { continue; }
        total += somme(i, 1, 2);
    }
    tantque total > 1000 { total -= 7; }
    retourne total;
}
";

pub const SRC_CHAINES: &str = "fonc principale() : z32 {
    s := \"accents éèà et échappements \\n \\t \\\"\";
    discr s {
        \"a\" { retourne 1; }
        \"b\" { retourne 2; }
        sinon { retourne 3; }
    }
    retourne 0;
}
";

/// Cas embarqués : nom et source.
pub const CAS: [(&str, &str); 4] =
    [("carre", SRC_CARRE), ("structures", SRC_STRUCTURES), ("boucles", SRC_BOUCLES), ("chaines", SRC_CHAINES)];

/// Programme valide de `n` fonctions qui s'appellent en chaîne.
pub fn programme_synthetique(n: usize) -> String {
    let mut out = String::new();
    for i in 0..n {
        let _ = writeln!(out, "Paire{i} :: struct {{ a : z32; b : z64; }}");
        let _ = writeln!(out, "fonc calcule{i}(x : z32, p : Paire{i}) : z64 {{");
        let _ = writeln!(out, "    total : z64 = p.b;");
        let _ = writeln!(out, "    pour j dans 0 ... x {{ si j % 2 == 0 {{ total += j; }} sinon {{ total -= 1; }} }}");
        if i > 0 {
            let _ = writeln!(out, "    q : Paire{};", i - 1);
            let _ = writeln!(out, "    total += calcule{}(x - 1, q);", i - 1);
        }
        let _ = writeln!(out, "    retourne total + p.a;");
        let _ = writeln!(out, "}}");
    }
    let dernier = n.saturating_sub(1);
    let _ = writeln!(out, "fonc principale() : z32 {{");
    if n > 0 {
        let _ = writeln!(out, "    p : Paire{dernier};");
        let _ = writeln!(out, "    r := calcule{dernier}(10, p);");
    }
    let _ = writeln!(out, "    retourne 0;\n}}");
    out
}

/// Répète `seed` jusqu'à au moins `kib` Kio.
pub fn gonfle_kib(seed: &str, kib: usize) -> String {
    let cible = kib * 1024;
    let mut out = String::with_capacity(cible + seed.len());
    while out.len() < cible {
        out.push_str(seed);
        out.push('\n');
    }
    out
}
