//! Broyage des noms : identifiants Unicode vers symboles C.

use core::fmt::Write as _;

/// Mots réservés du C, qui ne peuvent pas nommer une variable générée.
const MOTS_CLES_C: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else", "enum", "extern",
    "float", "for", "goto", "if", "inline", "int", "long", "main", "register", "restrict", "return", "short",
    "signed", "sizeof", "static", "struct", "switch", "typedef", "union", "unsigned", "void", "volatile", "while",
    "_Bool", "_Complex", "_Imaginary", "bool", "contexte", "octet", "chaine", "eini", "membre_actif",
];

/// Nom ASCII : les points de code ASCII passent tels quels, les autres
/// deviennent `_xHH` pour chacun de leurs octets UTF-8. Un `_` suivi d'un `x`
/// s'écrit lui-même `_x5F`, ce qui garde l'encodage injectif.
///
/// ```
/// use kuri_compiler::broyage::broye_nom_simple;
/// assert_eq!(broye_nom_simple("été"), "_xC3_xA9t_xC3_xA9");
/// assert_eq!(broye_nom_simple("a_x"), "a_x5Fx");
/// ```
pub fn broye_nom_simple(nom: &str) -> String {
    let mut sortie = String::with_capacity(nom.len());
    let mut caracteres = nom.chars().peekable();
    while let Some(c) = caracteres.next() {
        if c == '_' && caracteres.peek() == Some(&'x') {
            sortie.push_str("_x5F");
            continue;
        }
        if c.is_ascii() {
            sortie.push(c);
            continue;
        }
        let mut tampon = [0u8; 4];
        for octet in c.encode_utf8(&mut tampon).bytes() {
            let _ = write!(sortie, "_x{octet:02X}");
        }
    }
    sortie
}

/// Nom d'une variable locale, d'un paramètre ou d'un membre.
///
/// Un nom qui entrerait en conflit avec un mot du C ou un nom généré reçoit le
/// suffixe `_x5F`, qu'aucun nom broyé ne peut produire seul.
pub fn broye_nom_local(nom: &str) -> String {
    let mut broye = broye_nom_simple(nom);
    if MOTS_CLES_C.contains(&broye.as_str()) || broye.starts_with("__") {
        broye.push_str("_x5F");
    }
    broye
}

/// Nom C d'une fonction : `_KF{n}{module}_{n}{fonction}`, suivi de `_O{i}` pour
/// la `i`-ième surcharge (la première n'a pas de suffixe).
pub fn broye_nom_fonction(nom: &str, module: &str, index_surcharge: usize) -> String {
    let module = broye_nom_simple(module);
    let nom = broye_nom_simple(nom);
    let mut sortie = format!("_KF{}{module}_{}{nom}", module.len(), nom.len());
    if index_surcharge != 0 {
        let _ = write!(sortie, "_O{index_surcharge}");
    }
    sortie
}

/// Nom C d'une structure, d'une union ou d'une énum.
pub fn broye_nom_type(nom: &str) -> String { format!("Ks{}", broye_nom_simple(nom)) }

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn ascii_inchange() {
        assert_eq!(broye_nom_simple("carre_2"), "carre_2");
    }

    #[test]
    fn multi_octets_en_hexadecimal() {
        assert_eq!(broye_nom_simple("é"), "_xC3_xA9");
        assert_eq!(broye_nom_simple("arrête"), "arr_xC3_xAAte");
        assert_eq!(broye_nom_simple("€"), "_xE2_x82_xAC");
    }

    #[test]
    fn echappement_et_texte_litteral_distincts() {
        assert_ne!(broye_nom_simple("é"), broye_nom_simple("_xC3_xA9"));
        assert_ne!(broye_nom_simple("é"), broye_nom_simple("xC3xA9"));
        assert_eq!(broye_nom_simple("_xC3_xA9"), "_x5FxC3_x5FxA9");
        assert_ne!(
            broye_nom_fonction("é", "essai", 0),
            broye_nom_fonction("_xC3_xA9", "essai", 0)
        );
    }

    #[test]
    fn noms_de_fonction() {
        assert_eq!(broye_nom_fonction("carre", "Test", 0), "_KF4Test_5carre");
        assert_eq!(broye_nom_fonction("carre", "Test", 2), "_KF4Test_5carre_O2");
        assert_eq!(broye_nom_fonction("données", "", 0), "_KF0_14donn_xC3_xA9es");
        assert_eq!(broye_nom_type("Vecteur2D"), "KsVecteur2D");
    }

    #[test]
    fn mots_du_c() {
        assert_eq!(broye_nom_local("int"), "int_x5F");
        assert_eq!(broye_nom_local("contexte"), "contexte_x5F");
        assert_eq!(broye_nom_local("__ret0"), "__ret0_x5F");
        assert_ne!(broye_nom_local("int"), broye_nom_local("int_"));
        assert_eq!(broye_nom_local("entier"), "entier");
    }

    proptest! {
        #[test]
        fn ascii_et_deterministe(s in "\\PC*") {
            let a = broye_nom_simple(&s);
            prop_assert!(a.is_ascii());
            prop_assert_eq!(a, broye_nom_simple(&s));
        }

        #[test]
        fn injectif(a in "[a-zA-Z0-9_éèàçœ€]{0,12}", b in "[a-zA-Z0-9_éèàçœ€]{0,12}") {
            prop_assume!(a != b);
            prop_assert_ne!(broye_nom_simple(&a), broye_nom_simple(&b));
        }
    }
}
