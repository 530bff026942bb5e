//! Résolution des `importe` et `charge` depuis le disque.

use kuri_compiler::{Compilatrice, OptionsCompilation};
use kuri_core::TypeErreur;
use kuri_tests::{options, RacineKuri};
use pretty_assertions::assert_eq;

fn compilatrice(racine: &RacineKuri) -> Compilatrice {
    Compilatrice::new(OptionsCompilation { racine_kuri: Some(racine.chemin().to_path_buf()), ..options() })
}

#[test]
fn module_a_plusieurs_fichiers() {
    let racine = RacineKuri::new();
    racine
        .module("Geometrie", "point.kuri", "Point :: struct { x : z32; y : z32; }")
        .module("Geometrie", "calcul.kuri", "fonc somme(p : Point) : z32 { retourne p.x + p.y; }");
    let entree = racine.fichier(
        "jeu.kuri",
        "importe Geometrie\nfonc principale() : z32 { p := Point(x = 1, y = 2); retourne somme(p); }",
    );

    let mut c = compilatrice(&racine);
    let code = c.compile_fichier(&entree).unwrap_or_else(|e| panic!("{}", e.rapport()));
    assert_eq!(c.espace().fichiers().len(), 3);
    assert!(code.contains("struct KsPoint {"), "{code}");
    assert!(code.contains("_KF3jeu_10principale"), "{code}");
}

#[test]
fn module_importe_une_seule_fois() {
    let racine = RacineKuri::new();
    racine
        .module("Base", "base.kuri", "fonc un() : z32 { retourne 1; }")
        .module("Milieu", "milieu.kuri", "importe Base\nfonc deux() : z32 { retourne un() + un(); }");
    let entree = racine.fichier(
        "haut.kuri",
        "importe Base\nimporte Milieu\nfonc principale() : z32 { retourne un() + deux(); }",
    );

    let mut c = compilatrice(&racine);
    let code = c.compile_fichier(&entree).unwrap_or_else(|e| panic!("{}", e.rapport()));
    assert_eq!(c.espace().modules().len(), 3);
    assert_eq!(c.espace().fichiers().len(), 3);
    assert!(code.contains("_KF6Milieu_4deux"), "{code}");
}

#[test]
fn fichier_charge_relatif_au_fichier_courant() {
    let racine = RacineKuri::new();
    racine.fichier("aide.kuri", "fonc aide() : z32 { retourne 7; }");
    let entree = racine.fichier("prog.kuri", "charge \"aide\"\nfonc principale() : z32 { retourne aide(); }");

    let code = compilatrice(&racine).compile_fichier(&entree).unwrap_or_else(|e| panic!("{}", e.rapport()));
    assert!(code.contains("_KF4prog_4aide(contexte)"), "{code}");
}

#[test]
fn fichier_charge_absent() {
    let racine = RacineKuri::new();
    let entree = racine.fichier("prog.kuri", "charge \"absent\"\nfonc principale() {}");
    let e = compilatrice(&racine).compile_fichier(&entree).unwrap_err();
    assert_eq!(e.genre(), Some(TypeErreur::FichierInconnu));
}

#[test]
fn module_absent() {
    let racine = RacineKuri::new();
    let entree = racine.fichier("prog.kuri", "importe Nulle\nfonc principale() {}");
    let e = compilatrice(&racine).compile_fichier(&entree).unwrap_err();
    assert_eq!(e.genre(), Some(TypeErreur::ModuleInconnu));
    assert!(e.rapport().contains("importe Nulle"), "{}", e.rapport());
}
