//! Analyse des déclarations de type.

use kuri_ast::{ComposantType, TypeBase, TypeDeclare};
use kuri_core::{Resultat, TypeErreur};
use kuri_lexer::GenreLexeme;

use crate::Syntaxeuse;

use GenreLexeme as G;

impl Syntaxeuse<'_> {
    /// `*T`, `&T`, `[N]T`, `[]T`, `...T`, `...`, `type_de(e)`, `fonc(…)(…)`, base ou nom.
    pub(crate) fn analyse_type_declare(&mut self) -> Resultat<TypeDeclare> {
        let debut = self.span_courant();
        let mut composants = Vec::new();

        loop {
            match self.genre() {
                G::Fois => {
                    self.avance();
                    composants.push(ComposantType::Pointeur);
                }
                G::Esperluette => {
                    self.avance();
                    composants.push(ComposantType::Reference);
                }
                G::CrochetOuvrant => {
                    self.avance();
                    if self.consomme_si(G::CrochetFermant) {
                        composants.push(ComposantType::Tableau(None));
                        continue;
                    }
                    let Some(taille) = self.analyse_expression(G::CrochetFermant, G::CrochetOuvrant, false)? else {
                        return Err(self.erreur(TypeErreur::Syntaxe, "Attendu la taille du tableau"));
                    };
                    composants.push(ComposantType::Tableau(Some(taille)));
                }
                G::TroisPoints => {
                    self.avance();
                    composants.push(ComposantType::Variadique);
                    if !self.genre().est_specifiant_type() {
                        // `...` nu : variadique C.
                        return Ok(TypeDeclare { composants, span: debut.fusionne(self.span_precedent()) });
                    }
                }
                _ => break,
            }
        }

        let base = match self.genre() {
            G::Diese => {
                self.avance();
                let directive = self.consomme(G::ChaineCaractere, "Attendu « nulctx »")?;
                if directive.chaine != "nulctx" {
                    return Err(self.erreur_sur(
                        TypeErreur::DirectiveInconnue,
                        format!("Directive inconnue « {} » dans un type", directive.chaine),
                        directive.span,
                    ));
                }
                if !matches!(self.genre(), G::Fonc | G::Corout) {
                    return Err(self.erreur(TypeErreur::LexemeAttendu, "Attendu « fonc » ou « corout » après #nulctx"));
                }
                self.analyse_type_fonction(true)?
            }
            G::Fonc | G::Corout => self.analyse_type_fonction(false)?,
            G::TypeDe => {
                self.avance();
                self.consomme(G::ParentheseOuvrante, "Attendu une parenthèse ouvrante après « type_de »")?;
                let Some(expr) = self.analyse_expression(G::ParentheseFermante, G::TypeDe, false)? else {
                    return Err(self.erreur(TypeErreur::Syntaxe, "Attendu une expression dans « type_de »"));
                };
                ComposantType::TypeDe(expr)
            }
            G::ChaineCaractere => ComposantType::Base(TypeBase::Nomme(self.avance().chaine)),
            g => match TypeBase::depuis_genre(g) {
                Some(b) => {
                    self.avance();
                    ComposantType::Base(b)
                }
                None => return Err(self.erreur(TypeErreur::Syntaxe, "Attendu la déclaration d'un type")),
            },
        };
        composants.push(base);

        Ok(TypeDeclare { composants, span: debut.fusionne(self.span_precedent()) })
    }

    /// `fonc(T, …)(R, …)` ; sans second groupe, la sortie est `rien`.
    fn analyse_type_fonction(&mut self, nulctx: bool) -> Resultat<ComposantType> {
        let est_coroutine = self.avance().genre == G::Corout;

        let entrees = self.analyse_liste_types()?;
        let sorties = if self.est(G::ParentheseOuvrante) {
            self.analyse_liste_types()?
        } else {
            vec![TypeDeclare::base(TypeBase::Rien, self.span_precedent())]
        };

        Ok(ComposantType::Fonction { est_coroutine, nulctx, entrees, sorties })
    }

    fn analyse_liste_types(&mut self) -> Resultat<Vec<TypeDeclare>> {
        self.consomme(G::ParentheseOuvrante, "Attendu une parenthèse ouvrante")?;
        let mut types = Vec::new();
        while !self.consomme_si(G::ParentheseFermante) {
            types.push(self.analyse_type_declare()?);
            if !self.consomme_si(G::Virgule) && !self.est(G::ParentheseFermante) {
                return Err(self.erreur(TypeErreur::LexemeAttendu, "Attendu une virgule ou une parenthèse fermante"));
            }
        }
        Ok(types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuri_ast::Assembleuse;
    use kuri_core::SourceId;
    use pretty_assertions::assert_eq;

    fn type_de(src: &str) -> Resultat<TypeDeclare> {
        let lexemes = kuri_lexer::lexe(src, SourceId(0)).expect("lexage");
        let mut asm = Assembleuse::new();
        Syntaxeuse::new(&lexemes, SourceId(0), &mut asm).analyse_type_declare()
    }

    #[test]
    fn composants_dans_l_ordre() {
        let t = type_de("*[]&z32").unwrap();
        assert_eq!(
            t.composants,
            vec![
                ComposantType::Pointeur,
                ComposantType::Tableau(None),
                ComposantType::Reference,
                ComposantType::Base(TypeBase::Z32),
            ]
        );
        assert_eq!(type_de("Vecteur2D").unwrap().to_string(), "Vecteur2D");
    }

    #[test]
    fn variadiques() {
        assert_eq!(type_de("...z32").unwrap().to_string(), "...z32");
        let nu = type_de("...)").unwrap();
        assert_eq!(nu.composants, vec![ComposantType::Variadique]);
    }

    #[test]
    fn types_fonction() {
        let t = type_de("fonc(z32, *r64)(bool)").unwrap();
        assert_eq!(t.to_string(), "fonc(z32, *r64)(bool)");
        let t = type_de("#nulctx corout(z32)").unwrap();
        let ComposantType::Fonction { est_coroutine, nulctx, sorties, .. } = &t.composants[0] else {
            panic!("fonction attendue")
        };
        assert!(*est_coroutine && *nulctx);
        assert!(sorties[0].est_rien());
    }

    #[test]
    fn type_invalide() {
        let e = type_de("+").unwrap_err();
        assert!(e.message.contains("Attendu la déclaration d'un type"));
        assert_eq!(type_de("#enligne fonc()").unwrap_err().genre, TypeErreur::DirectiveInconnue);
    }
}
