//! Évaluation des expressions constantes.

use indexmap::IndexMap;

use kuri_ast::{Assembleuse, Forme, NoeudId};
use kuri_lexer::GenreLexeme;

/// Valeur calculée à la compilation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValeurConstante {
    /// Entier (toutes largeurs).
    Entier(i64),
    /// Réel.
    Reel(f64),
    /// Booléen.
    Booleen(bool),
}

impl ValeurConstante {
    /// Valeur entière, si c'en est une.
    pub const fn entier(self) -> Option<i64> {
        match self {
            Self::Entier(v) => Some(v),
            _ => None,
        }
    }
}

/// Valeurs connues par noeud (tailles, valeurs d'énum, `taille_de`…).
pub type Constantes = IndexMap<NoeudId, ValeurConstante>;

/// Valeur d'une expression si elle est calculable à la compilation.
///
/// Les noeuds déjà présents dans `constantes` sont pris tels quels ; une
/// référence vaut la constante de sa déclaration.
pub fn evalue_constante(asm: &Assembleuse, constantes: &Constantes, id: NoeudId) -> Option<ValeurConstante> {
    use ValeurConstante::{Booleen, Entier, Reel};

    if let Some(v) = constantes.get(&id) {
        return Some(*v);
    }

    let noeud = asm.noeud(id);
    match &noeud.forme {
        Forme::NombreEntier { valeur } => Some(Entier(*valeur as i64)),
        Forme::NombreReel { valeur } => Some(Reel(*valeur)),
        Forme::Booleen { valeur } => Some(Booleen(*valeur)),
        Forme::Caractere { valeur } => Some(Entier(i64::from(*valeur))),
        Forme::Reference { declaration: Some(decl) } if *decl != id => constantes.get(decl).copied(),
        Forme::ExpressionUnaire { operande: Some(op) } => {
            let v = evalue_constante(asm, constantes, *op)?;
            match (noeud.lexeme.genre, v) {
                (GenreLexeme::MoinsUnaire, Entier(e)) => e.checked_neg().map(Entier),
                (GenreLexeme::MoinsUnaire, Reel(r)) => Some(Reel(-r)),
                (GenreLexeme::PlusUnaire, v) => Some(v),
                (GenreLexeme::Exclamation, Booleen(b)) => Some(Booleen(!b)),
                (GenreLexeme::Tilde, Entier(e)) => Some(Entier(!e)),
                _ => None,
            }
        }
        Forme::ExpressionBinaire { gauche: Some(g), droite: Some(d) } => {
            let g = evalue_constante(asm, constantes, *g)?;
            let d = evalue_constante(asm, constantes, *d)?;
            operation_binaire(noeud.lexeme.genre, g, d)
        }
        Forme::Transtype { expression: Some(e) } => evalue_constante(asm, constantes, *e),
        _ => None,
    }
}

fn operation_binaire(op: GenreLexeme, g: ValeurConstante, d: ValeurConstante) -> Option<ValeurConstante> {
    use GenreLexeme as G;
    use ValeurConstante::{Booleen, Entier, Reel};

    match (g, d) {
        (Entier(a), Entier(b)) => Some(match op {
            G::Plus => Entier(a.checked_add(b)?),
            G::Moins => Entier(a.checked_sub(b)?),
            G::Fois => Entier(a.checked_mul(b)?),
            G::Divise => Entier(a.checked_div(b)?),
            G::Pourcent => Entier(a.checked_rem(b)?),
            G::Esperluette => Entier(a & b),
            G::Barre => Entier(a | b),
            G::Chapeau => Entier(a ^ b),
            G::DecalageGauche => Entier(a.checked_shl(u32::try_from(b).ok()?)?),
            G::DecalageDroite => Entier(a.checked_shr(u32::try_from(b).ok()?)?),
            G::Egalite => Booleen(a == b),
            G::Difference => Booleen(a != b),
            G::Inferieur => Booleen(a < b),
            G::InferieurEgal => Booleen(a <= b),
            G::Superieur => Booleen(a > b),
            G::SuperieurEgal => Booleen(a >= b),
            _ => return None,
        }),
        (Reel(a), Reel(b)) => Some(match op {
            G::Plus => Reel(a + b),
            G::Moins => Reel(a - b),
            G::Fois => Reel(a * b),
            G::Divise => Reel(a / b),
            G::Inferieur => Booleen(a < b),
            G::InferieurEgal => Booleen(a <= b),
            G::Superieur => Booleen(a > b),
            G::SuperieurEgal => Booleen(a >= b),
            _ => return None,
        }),
        (Reel(_), Entier(b)) => operation_binaire(op, g, Reel(b as f64)),
        (Entier(a), Reel(_)) => operation_binaire(op, Reel(a as f64), d),
        (Booleen(a), Booleen(b)) => Some(match op {
            G::EspEsp => Booleen(a && b),
            G::BarreBarre => Booleen(a || b),
            G::Egalite => Booleen(a == b),
            G::Difference => Booleen(a != b),
            _ => return None,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuri_core::SourceId;
    use kuri_parser::Syntaxeuse;
    use pretty_assertions::assert_eq;

    fn evalue(src: &str) -> Option<ValeurConstante> {
        let lexemes = kuri_lexer::lexe(src, SourceId(0)).unwrap();
        let mut asm = Assembleuse::new();
        let id = Syntaxeuse::new(&lexemes, SourceId(0), &mut asm)
            .analyse_expression_seule(GenreLexeme::PointVirgule)
            .unwrap()
            .unwrap();
        evalue_constante(&asm, &Constantes::new(), id)
    }

    #[test]
    fn arithmetique_entiere() {
        assert_eq!(evalue("1 + 2 * 3;"), Some(ValeurConstante::Entier(7)));
        assert_eq!(evalue("(1 << 4) | 3;"), Some(ValeurConstante::Entier(19)));
        assert_eq!(evalue("-5 % 3;"), Some(ValeurConstante::Entier(-2)));
        assert_eq!(evalue("~0;"), Some(ValeurConstante::Entier(-1)));
    }

    #[test]
    fn comparaisons_et_booleens() {
        assert_eq!(evalue("3 < 4;"), Some(ValeurConstante::Booleen(true)));
        assert_eq!(evalue("vrai && !faux;"), Some(ValeurConstante::Booleen(true)));
        assert_eq!(evalue("1.5 * 2;"), Some(ValeurConstante::Reel(3.0)));
    }

    #[test]
    fn non_constantes() {
        assert_eq!(evalue("x + 1;"), None);
        assert_eq!(evalue("1 / 0;"), None);
        assert_eq!(evalue("f(2);"), None);
    }

    #[test]
    fn constantes_connues() {
        let lexemes = kuri_lexer::lexe("a * 2;", SourceId(0)).unwrap();
        let mut asm = Assembleuse::new();
        let id = Syntaxeuse::new(&lexemes, SourceId(0), &mut asm)
            .analyse_expression_seule(GenreLexeme::PointVirgule)
            .unwrap()
            .unwrap();
        let Forme::ExpressionBinaire { gauche: Some(a), .. } = asm.noeud(id).forme else { unreachable!() };
        let mut constantes = Constantes::new();
        constantes.insert(a, ValeurConstante::Entier(21));
        assert_eq!(evalue_constante(&asm, &constantes, id), Some(ValeurConstante::Entier(42)));
    }
}
