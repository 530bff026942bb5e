//! Erreurs rapportées par la compilation d'un programme complet.

use kuri_core::TypeErreur;
use kuri_tests::erreur;
use pretty_assertions::assert_eq;

fn genre(src: &str) -> TypeErreur {
    erreur(src).genre().unwrap_or_else(|| panic!("erreur sans genre pour :\n{src}"))
}

#[test]
fn rapport_localise_et_souligne() {
    let e = erreur("fonc principale() : z32 {\n    x := 1;\n    retourne y;\n}");
    assert_eq!(e.genre(), Some(TypeErreur::VariableInconnue));
    let rapport = e.rapport();
    let lignes: Vec<_> = rapport.lines().collect();
    assert!(lignes[0].starts_with("essai.kuri:3:14: "), "{rapport}");
    assert_eq!(lignes[1], "   3 |     retourne y;");
    assert_eq!(lignes[2], "     |              ^");
}

#[test]
fn erreurs_de_syntaxe() {
    assert_eq!(genre("fonc principale() { x := (1 + 2; }"), TypeErreur::Desequilibre);
    assert_eq!(genre("#inconnue fonc principale() {}"), TypeErreur::DirectiveInconnue);
}

#[test]
fn erreurs_de_nommage() {
    assert_eq!(genre("fonc principale() { g(); }"), TypeErreur::FonctionInconnue);
    assert_eq!(genre("S :: struct { a : z32; } fonc principale() { s : S; x := s.b; }"), TypeErreur::MembreInconnu);
    assert_eq!(genre("fonc principale() { x := 1; x := 2; }"), TypeErreur::Redefinition);
}

#[test]
fn erreurs_de_type() {
    assert_eq!(genre("fonc principale() { x := 1; x = \"a\"; }"), TypeErreur::TypeArgument);
    assert_eq!(genre("fonc principale() { a, b := 1, 2, 3; }"), TypeErreur::NombreArgument);
    assert_eq!(genre("fonc f(n : z32) { t : [n]z32; } fonc principale() { f(4); }"), TypeErreur::ExpressionNonConstante);
}

#[test]
fn structures_mutuellement_contenues() {
    assert_eq!(
        genre("A :: struct { b : B; } B :: struct { a : A; } fonc principale() { a : A; }"),
        TypeErreur::DependanceCirculaire
    );
}

#[test]
fn retour_manquant() {
    assert_eq!(genre("fonc f() : z32 { x := 1; } fonc principale() { f(); }"), TypeErreur::ControleInvalide);
}

#[test]
fn point_entree_introuvable() {
    let e = erreur("fonc autre() {}");
    assert_eq!(e.genre(), None);
    assert!(e.to_string().contains("principale"), "{e}");
}
