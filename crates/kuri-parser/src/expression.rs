//! Analyse des expressions : algorithme de la gare de triage.
//!
//! Les opérandes vont dans la file de sortie, les opérateurs dans une pile ;
//! une parenthèse ouvrante empile une sentinelle. La file obtenue (notation
//! polonaise inverse) est ensuite repliée en arbre par une passe ascendante.
//!
//! Les formes spéciales (`taille_de`, `transtype`, `loge`, `si`, indexage, …)
//! rappellent `analyse_expression` avec leur propre terminateur et déposent le
//! sous-arbre obtenu dans la file comme un opérande.

use smallvec::SmallVec;

use kuri_ast::{ComposantType, DrapeauxNoeud, Forme, NoeudId, TypeBase, TypeDeclare};
use kuri_core::{Resultat, TypeErreur};
use kuri_lexer::{GenreLexeme, Lexeme, ValeurLexeme};

use crate::Syntaxeuse;

use GenreLexeme as G;

/// Profondeur d'imbrication par défaut des sous-expressions.
pub const PROFONDEUR_EXPRESSION_MAX: usize = 32;

/// Entrée de la pile des opérateurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntreePile {
    /// Parenthèse ouvrante.
    Sentinelle,
    /// Noeud opérateur et genre de son lexème (après reclassification des unaires).
    Operateur(NoeudId, GenreLexeme),
}

/// Sens de regroupement d'un opérateur.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativite {
    /// `a - b - c` = `(a - b) - c`.
    Gauche,
    /// `- - a` = `-(-a)`.
    Droite,
}

/// Associativité et priorité d'un opérateur (plus la priorité est haute, plus il lie fort).
pub const fn associativite(genre: GenreLexeme) -> (Associativite, u32) {
    use Associativite::{Droite, Gauche};
    match genre {
        G::TroisPoints => (Gauche, 0),
        G::Egal | G::DeclarationVariable => (Gauche, 1),
        g if g.est_assignation_composee() => (Gauche, 1),
        G::Virgule => (Gauche, 2),
        G::BarreBarre => (Gauche, 3),
        G::EspEsp => (Gauche, 4),
        G::Barre => (Gauche, 5),
        G::Chapeau => (Gauche, 6),
        G::Esperluette => (Gauche, 7),
        G::Difference | G::Egalite => (Gauche, 8),
        G::Inferieur | G::InferieurEgal | G::Superieur | G::SuperieurEgal => (Gauche, 9),
        G::DecalageGauche | G::DecalageDroite => (Gauche, 10),
        G::Plus | G::Moins => (Gauche, 11),
        G::Fois | G::Divise | G::Pourcent => (Gauche, 12),
        G::Exclamation | G::Tilde | G::Arobase | G::PlusUnaire | G::MoinsUnaire | G::ExpansionVariadique => {
            (Droite, 13)
        }
        G::Point | G::CrochetOuvrant => (Gauche, 14),
        _ => (Gauche, 0),
    }
}

/// Vrai si l'opérateur `haut`, au sommet de la pile, doit sortir avant d'empiler `nouveau`.
pub const fn precedence_faible(nouveau: GenreLexeme, haut: GenreLexeme) -> bool {
    let (assoc, pn) = associativite(nouveau);
    let (_, ph) = associativite(haut);
    match assoc {
        Associativite::Gauche => pn <= ph,
        Associativite::Droite => pn < ph,
    }
}

/// Vrai si `dernier` clôt un opérande : un `+`, `-` ou `...` qui suit est alors binaire.
const fn precede_unaire_valide(dernier: GenreLexeme) -> bool {
    !matches!(
        dernier,
        G::ParentheseFermante
            | G::CrochetFermant
            | G::ChaineCaractere
            | G::NombreEntier
            | G::NombreReel
            | G::ChaineLitterale
            | G::Caractere
            | G::Vrai
            | G::Faux
            | G::Nul
    )
}

/// Forme du noeud créé pour un opérateur binaire.
fn forme_binaire(genre: GenreLexeme) -> Forme {
    match genre {
        G::Egal => Forme::Assignation { cible: None, valeur: None },
        g if g.est_assignation_composee() => Forme::Assignation { cible: None, valeur: None },
        G::DeclarationVariable => Forme::DeclarationVariable { cible: None, valeur: None },
        G::Point => Forme::AccesMembre { structure: None, membre: None, index_membre: None },
        G::CrochetOuvrant => Forme::Indexage { tableau: None, index: None },
        G::TroisPoints => Forme::Plage { debut: None, fin: None },
        G::Virgule => Forme::Virgule { gauche: None, droite: None },
        _ => Forme::ExpressionBinaire { gauche: None, droite: None },
    }
}

impl Syntaxeuse<'_> {
    /// Analyse une expression jusqu'à `terminateur` (consommé s'il est trouvé hors parenthèses).
    ///
    /// `racine` indique le contexte appelant (`transtype`, `loge`, paramètre…) ;
    /// si `ajoute`, le résultat est attaché au noeud courant de l'assembleuse.
    pub(crate) fn analyse_expression(
        &mut self,
        terminateur: GenreLexeme,
        racine: GenreLexeme,
        ajoute: bool,
    ) -> Resultat<Option<NoeudId>> {
        self.profondeur += 1;
        if self.profondeur > self.profondeur_max {
            self.profondeur -= 1;
            return Err(self.erreur(TypeErreur::ProfondeurExpression, "Excès de la pile d'expression autorisée"));
        }

        let niveau = self.profondeur - 1;
        if self.piles.len() <= niveau {
            self.piles.resize_with(niveau + 1, Default::default);
        }
        let (mut sortie, mut pile) = core::mem::take(&mut self.piles[niveau]);
        sortie.clear();
        pile.clear();

        let resultat = self.analyse_expression_niveau(terminateur, racine, &mut sortie, &mut pile);

        self.piles[niveau] = (sortie, pile);
        self.profondeur -= 1;

        let id = resultat?;
        if let (Some(id), true) = (id, ajoute) {
            self.assembleuse.ajoute_noeud(id)?;
        }
        Ok(id)
    }

    fn analyse_expression_niveau(
        &mut self,
        terminateur: GenreLexeme,
        racine: GenreLexeme,
        sortie: &mut Vec<NoeudId>,
        pile: &mut Vec<EntreePile>,
    ) -> Resultat<Option<NoeudId>> {
        let mut dernier = G::Inconnu;
        let mut paren = 0usize;
        let mut assignation_vue = false;

        while let Some(lexeme) = self.lexeme().cloned() {
            let genre = lexeme.genre;

            if genre == terminateur && paren == 0 {
                self.avance();
                break;
            }

            match genre {
                G::ChaineCaractere => {
                    self.avance();
                    if self.est(G::ParentheseOuvrante) {
                        let id = self.analyse_appel(lexeme)?;
                        sortie.push(id);
                        dernier = G::ParentheseFermante;
                        continue;
                    }
                    let id = self.assembleuse.cree_noeud(Forme::Reference { declaration: None }, lexeme);
                    let annotation_permise = paren == 0 && !matches!(racine, G::Transtype | G::Loge | G::Reloge);
                    if annotation_permise && self.est(G::DoublePoints) {
                        self.avance();
                        let t = self.analyse_type_declare()?;
                        let n = self.assembleuse.noeud_mut(id);
                        n.type_declare = Some(t);
                        n.drapeaux |= DrapeauxNoeud::EST_DECLARATION;
                    }
                    sortie.push(id);
                }
                G::NombreEntier | G::NombreReel | G::ChaineLitterale | G::Caractere | G::Vrai | G::Faux | G::Nul => {
                    self.avance();
                    let forme = match (&lexeme.valeur, genre) {
                        (ValeurLexeme::Entier(v), _) => Forme::NombreEntier { valeur: *v },
                        (ValeurLexeme::Reel(v), _) => Forme::NombreReel { valeur: *v },
                        (ValeurLexeme::Chaine(v), _) => Forme::ChaineLitterale { valeur: v.clone() },
                        (ValeurLexeme::Caractere(v), _) => Forme::Caractere { valeur: *v },
                        (_, G::Vrai) => Forme::Booleen { valeur: true },
                        (_, G::Faux) => Forme::Booleen { valeur: false },
                        _ => Forme::Nul,
                    };
                    let id = self.assembleuse.cree_noeud(forme, lexeme);
                    sortie.push(id);
                }
                G::TailleDe | G::InfoDe | G::Memoire | G::Transtype | G::Loge | G::Reloge | G::Si | G::Saufsi => {
                    let id = self.analyse_forme_speciale(genre)?;
                    self.pousse_operande(sortie, id);
                    dernier = G::ParentheseFermante;
                    continue;
                }
                G::Deloge => {
                    self.avance();
                    let Some(expr) = self.analyse_expression(terminateur, G::Deloge, false)? else {
                        return Err(self.erreur(TypeErreur::Syntaxe, "Attendu une expression après « déloge »"));
                    };
                    let id = self.assembleuse.cree_noeud(Forme::Deloge { expression: Some(expr) }, lexeme);
                    sortie.push(id);
                    // Le terminateur a été consommé par la sous-expression.
                    break;
                }
                G::ParentheseOuvrante => {
                    self.avance();
                    pile.push(EntreePile::Sentinelle);
                    paren += 1;
                }
                G::ParentheseFermante => {
                    if paren == 0 {
                        break;
                    }
                    self.avance();
                    loop {
                        match pile.pop() {
                            Some(EntreePile::Sentinelle) => break,
                            Some(EntreePile::Operateur(id, _)) => sortie.push(id),
                            None => {
                                return Err(self.erreur_sur(
                                    TypeErreur::Desequilibre,
                                    "Il manque une paranthèse dans l'expression",
                                    lexeme.span,
                                ))
                            }
                        }
                    }
                    paren -= 1;
                }
                G::CrochetOuvrant if !precede_unaire_valide(dernier) => {
                    self.avance();
                    self.vide_operateurs(G::CrochetOuvrant, sortie, pile);
                    let Some(index) = self.analyse_expression(G::CrochetFermant, G::CrochetOuvrant, false)? else {
                        return Err(self.erreur(TypeErreur::Syntaxe, "Attendu une expression d'index"));
                    };
                    self.pousse_operande(sortie, index);
                    let id = self.assembleuse.cree_noeud(forme_binaire(G::CrochetOuvrant), lexeme);
                    pile.push(EntreePile::Operateur(id, G::CrochetOuvrant));
                    dernier = G::CrochetFermant;
                    continue;
                }
                G::CrochetOuvrant => {
                    self.avance();
                    let elements = match self.analyse_expression(G::CrochetFermant, G::CrochetOuvrant, false)? {
                        Some(e) => self.assembleuse.aplatis_virgules(e),
                        None => Vec::new(),
                    };
                    let id = self.assembleuse.cree_noeud(Forme::ConstruitTableau { elements }, lexeme);
                    sortie.push(id);
                    dernier = G::CrochetFermant;
                    continue;
                }
                G::AccoladeFermante | G::PointVirgule | G::AccoladeOuvrante => break,
                G::TroisPoints | G::Plus | G::Moins if precede_unaire_valide(dernier) => {
                    self.avance();
                    let (genre_unaire, forme) = match genre {
                        G::TroisPoints => (G::ExpansionVariadique, Forme::ExpansionVariadique { expression: None }),
                        G::Plus => (G::PlusUnaire, Forme::ExpressionUnaire { operande: None }),
                        _ => (G::MoinsUnaire, Forme::ExpressionUnaire { operande: None }),
                    };
                    let lexeme = Lexeme { genre: genre_unaire, ..lexeme };
                    let id = self.assembleuse.cree_noeud(forme, lexeme);
                    pile.push(EntreePile::Operateur(id, genre_unaire));
                }
                G::Exclamation | G::Tilde | G::Arobase => {
                    self.avance();
                    let id = self.assembleuse.cree_noeud(Forme::ExpressionUnaire { operande: None }, lexeme);
                    pile.push(EntreePile::Operateur(id, genre));
                }
                g if g.est_operateur_binaire() => {
                    if matches!(g, G::Egal | G::DeclarationVariable) || g.est_assignation_composee() {
                        if assignation_vue {
                            return Err(self.erreur(
                                TypeErreur::Assignation,
                                "Une expression ne peut contenir qu'une seule assignation",
                            ));
                        }
                        assignation_vue = true;
                    }
                    self.avance();
                    self.vide_operateurs(g, sortie, pile);
                    let id = self.assembleuse.cree_noeud(forme_binaire(g), lexeme);
                    pile.push(EntreePile::Operateur(id, g));
                }
                _ => {
                    return Err(self.erreur(TypeErreur::LexemeInattendu, "Identifiant inattendu dans l'expression"));
                }
            }

            dernier = genre;
        }

        while let Some(entree) = pile.pop() {
            match entree {
                EntreePile::Operateur(id, _) => sortie.push(id),
                EntreePile::Sentinelle => {
                    return Err(self.erreur(TypeErreur::Desequilibre, "Il manque une paranthèse dans l'expression"));
                }
            }
        }

        if sortie.is_empty() {
            return Ok(None);
        }

        self.replie_sortie(sortie).map(Some)
    }

    /// Dépile vers la sortie les opérateurs qui lient plus fort que `nouveau`.
    fn vide_operateurs(&mut self, nouveau: GenreLexeme, sortie: &mut Vec<NoeudId>, pile: &mut Vec<EntreePile>) {
        while let Some(&EntreePile::Operateur(id, haut)) = pile.last() {
            if !precedence_faible(nouveau, haut) {
                break;
            }
            pile.pop();
            sortie.push(id);
        }
    }

    /// Dépose un sous-arbre déjà construit dans la file de sortie.
    fn pousse_operande(&mut self, sortie: &mut Vec<NoeudId>, id: NoeudId) {
        let n = self.assembleuse.noeud_mut(id);
        if n.forme.arite() != 0 {
            n.drapeaux |= DrapeauxNoeud::IGNORE_OPERATEUR;
        }
        sortie.push(id);
    }

    /// Passe ascendante : construit l'arbre depuis la notation polonaise inverse.
    fn replie_sortie(&mut self, sortie: &[NoeudId]) -> Resultat<NoeudId> {
        let mut operandes: SmallVec<[NoeudId; 8]> = SmallVec::new();

        for &id in sortie {
            let n = self.assembleuse.noeud(id);
            let arite = if n.possede(DrapeauxNoeud::IGNORE_OPERATEUR) { 0 } else { n.forme.arite() };
            match arite {
                0 => operandes.push(id),
                1 => {
                    let Some(operande) = operandes.pop() else {
                        return Err(self.erreur_sur(
                            TypeErreur::Syntaxe,
                            "Expression malformée pour opérateur unaire",
                            self.assembleuse.noeud(id).lexeme.span,
                        ));
                    };
                    self.assembleuse.ajoute_enfant(id, operande)?;
                    operandes.push(id);
                }
                _ => {
                    let (Some(droite), Some(gauche)) = (operandes.pop(), operandes.pop()) else {
                        return Err(self.erreur_sur(
                            TypeErreur::Syntaxe,
                            "Expression malformée pour opérateur binaire",
                            self.assembleuse.noeud(id).lexeme.span,
                        ));
                    };
                    self.assembleuse.ajoute_enfant(id, gauche)?;
                    self.assembleuse.ajoute_enfant(id, droite)?;
                    operandes.push(id);
                }
            }
        }

        match operandes.as_slice() {
            [id] => Ok(*id),
            [premier, reste @ ..] => {
                let plage = reste
                    .iter()
                    .fold(self.assembleuse.span_arbre(*premier), |s, &id| s.fusionne(self.assembleuse.span_arbre(id)));
                Err(self
                    .erreur_sur(
                        TypeErreur::Syntaxe,
                        "Expression malformée, il est possible qu'il manque un opérateur",
                        self.assembleuse.noeud(*premier).lexeme.span,
                    )
                    .avec_plage(plage))
            }
            [] => Err(self.erreur(TypeErreur::Syntaxe, "Expression vide")),
        }
    }

    /// `nom(arg, arg, …)` ; position sur la parenthèse ouvrante.
    fn analyse_appel(&mut self, nom: Lexeme) -> Resultat<NoeudId> {
        self.consomme(G::ParentheseOuvrante, "Attendu une parenthèse ouvrante")?;
        let id = self.assembleuse.cree_noeud(Forme::Appel { arguments: Vec::new(), resolution: None }, nom);

        while !self.consomme_si(G::ParentheseFermante) {
            if self.fini() {
                return Err(self.erreur(TypeErreur::Desequilibre, "Attendu une parenthèse fermante à la fin de l'appel"));
            }
            let position = self.position;
            match self.analyse_expression(G::Virgule, G::ParentheseOuvrante, false)? {
                Some(arg) => self.assembleuse.ajoute_enfant(id, arg)?,
                None if self.position == position => {
                    return Err(self.erreur(TypeErreur::LexemeInattendu, "Argument inattendu dans l'appel"));
                }
                None => {}
            }
        }

        Ok(id)
    }

    /// `taille_de`, `info_de`, `mémoire`, `transtype`, `loge`, `reloge`, `si`/`saufsi`.
    fn analyse_forme_speciale(&mut self, genre: GenreLexeme) -> Resultat<NoeudId> {
        if matches!(genre, G::Si | G::Saufsi) {
            return self.analyse_controle_si(false);
        }

        let lexeme = self.avance();
        match genre {
            G::TailleDe => {
                self.consomme(G::ParentheseOuvrante, "Attendu une parenthèse ouvrante après « taille_de »")?;
                let t = self.analyse_type_declare()?;
                self.consomme(G::ParentheseFermante, "Attendu une parenthèse fermante après le type")?;
                let id = self.assembleuse.cree_noeud(Forme::TailleDe, lexeme);
                self.assembleuse.noeud_mut(id).type_declare = Some(t);
                Ok(id)
            }
            G::InfoDe | G::Memoire => {
                self.consomme(G::ParentheseOuvrante, "Attendu une parenthèse ouvrante")?;
                let expr = self.analyse_expression(G::ParentheseFermante, genre, false)?;
                if expr.is_none() {
                    return Err(self.erreur(TypeErreur::Syntaxe, "Attendu une expression entre les parenthèses"));
                }
                let forme = if genre == G::InfoDe {
                    Forme::InfoDe { expression: expr }
                } else {
                    Forme::Memoire { expression: expr }
                };
                Ok(self.assembleuse.cree_noeud(forme, lexeme))
            }
            G::Transtype => {
                self.consomme(G::ParentheseOuvrante, "Attendu une parenthèse ouvrante après « transtype »")?;
                let expr = self.analyse_expression(G::DoublePoints, G::Transtype, false)?;
                if expr.is_none() {
                    return Err(self.erreur(TypeErreur::Syntaxe, "Attendu l'expression à transtyper"));
                }
                let t = self.analyse_type_declare()?;
                self.consomme(G::ParentheseFermante, "Attendu une parenthèse fermante après le type")?;
                let id = self.assembleuse.cree_noeud(Forme::Transtype { expression: expr }, lexeme);
                self.assembleuse.noeud_mut(id).type_declare = Some(t);
                Ok(id)
            }
            G::Loge => {
                let (t, taille) = self.analyse_type_loge()?;
                let id = self.assembleuse.cree_noeud(Forme::Loge { taille, bloc_sinon: None }, lexeme);
                self.assembleuse.noeud_mut(id).type_declare = Some(t);
                self.analyse_sinon_loge(id)?;
                Ok(id)
            }
            _ => {
                let expr = self.analyse_expression(G::DoublePoints, G::Reloge, false)?;
                if expr.is_none() {
                    return Err(self.erreur(TypeErreur::Syntaxe, "Attendu l'expression à reloger"));
                }
                let (t, taille) = self.analyse_type_loge()?;
                let id = self.assembleuse.cree_noeud(Forme::Reloge { expression: expr, taille, bloc_sinon: None }, lexeme);
                self.assembleuse.noeud_mut(id).type_declare = Some(t);
                self.analyse_sinon_loge(id)?;
                Ok(id)
            }
        }
    }

    /// Type d'une allocation ; `chaine(n)` et `[n]T` donnent aussi l'expression de taille.
    fn analyse_type_loge(&mut self) -> Resultat<(TypeDeclare, Option<NoeudId>)> {
        if self.est(G::Chaine) && self.genre_suivant(1) == G::ParentheseOuvrante {
            let l = self.avance();
            self.avance();
            let taille = self.analyse_expression(G::ParentheseFermante, G::Loge, false)?;
            return Ok((TypeDeclare::base(TypeBase::Chaine, l.span), taille));
        }

        let mut t = self.analyse_type_declare()?;
        let taille = match t.composants.first_mut() {
            Some(c @ ComposantType::Tableau(Some(_))) => {
                let ComposantType::Tableau(taille) = core::mem::replace(c, ComposantType::Tableau(None)) else {
                    unreachable!()
                };
                taille
            }
            _ => None,
        };
        Ok((t, taille))
    }

    fn analyse_sinon_loge(&mut self, id: NoeudId) -> Resultat<()> {
        if !self.consomme_si(G::Sinon) {
            return Ok(());
        }
        let bloc = self.analyse_bloc(false)?;
        match &mut self.assembleuse.noeud_mut(id).forme {
            Forme::Loge { bloc_sinon, .. } | Forme::Reloge { bloc_sinon, .. } => *bloc_sinon = Some(bloc),
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuri_ast::{Assembleuse, GenreNoeud};
    use kuri_core::{Erreur, SourceId};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn expression(src: &str) -> Result<(Assembleuse, Option<NoeudId>), Erreur> {
        let lexemes = kuri_lexer::lexe(src, SourceId(0)).expect("lexage");
        let mut asm = Assembleuse::new();
        let id = Syntaxeuse::new(&lexemes, SourceId(0), &mut asm).analyse_expression_seule(G::PointVirgule)?;
        Ok((asm, id))
    }

    /// Forme parenthésée d'un arbre, pour comparer facilement.
    fn rendu(asm: &Assembleuse, id: NoeudId) -> String {
        let n = asm.noeud(id);
        let enfants = n.forme.enfants();
        match n.genre() {
            GenreNoeud::ExpressionUnaire | GenreNoeud::ExpansionVariadique => {
                format!("({} {})", n.lexeme.genre.chaine(), rendu(asm, enfants[0]))
            }
            GenreNoeud::Indexage => format!("({}[{}])", rendu(asm, enfants[0]), rendu(asm, enfants[1])),
            _ if enfants.len() == 2 && n.forme.arite() == 2 => {
                format!("({} {} {})", rendu(asm, enfants[0]), n.chaine(), rendu(asm, enfants[1]))
            }
            GenreNoeud::Appel => {
                let args: Vec<_> = enfants.iter().map(|&e| rendu(asm, e)).collect();
                format!("{}({})", n.chaine(), args.join(", "))
            }
            _ => n.chaine().to_string(),
        }
    }

    fn rendu_src(src: &str) -> String {
        let (asm, id) = expression(src).unwrap();
        rendu(&asm, id.unwrap())
    }

    #[test]
    fn priorites_arithmetiques() {
        assert_eq!(rendu_src("1 + 2 * 3;"), "(1 + (2 * 3))");
        assert_eq!(rendu_src("(1 + 2) * 3;"), "((1 + 2) * 3)");
        assert_eq!(rendu_src("a - b - c;"), "((a - b) - c)");
        assert_eq!(rendu_src("a < b && c != d || e;"), "(((a < b) && (c != d)) || e)");
    }

    #[test]
    fn moins_unaire_et_binaire() {
        assert_eq!(rendu_src("-5;"), "(- unaire 5)");
        assert_eq!(rendu_src("3 - 5;"), "(3 - 5)");
        assert_eq!(rendu_src("a[-1];"), "(a[(- unaire 1)])");
        assert_eq!(rendu_src("-a.b;"), "(- unaire (a . b))");
        assert_eq!(rendu_src("!x && y;"), "((! x) && y)");
    }

    #[test]
    fn indexage_et_acces_membre() {
        assert_eq!(rendu_src("a.b[i + 1];"), "((a . b)[(i + 1)])");
        assert_eq!(rendu_src("f(x)[0];"), "(f(x)[0])");
    }

    #[test]
    fn appels_et_plages() {
        assert_eq!(rendu_src("f(1, g(2), a + b);"), "f(1, g(2), (a + b))");
        assert_eq!(rendu_src("0 ... n - 1;"), "(0 ... (n - 1))");
        assert_eq!(rendu_src("imprime(...args);"), "imprime((... unaire args))");
    }

    #[test]
    fn assignations() {
        assert_eq!(rendu_src("x = a + 1;"), "(x = (a + 1))");
        assert_eq!(rendu_src("a, b := f();"), "((a , b) := f())");
        assert_eq!(rendu_src("x += 2 * y;"), "(x += (2 * y))");
        let e = expression("a = b = c;").unwrap_err();
        assert_eq!(e.genre, TypeErreur::Assignation);
    }

    #[test]
    fn parenthese_manquante() {
        let e = expression("(1 + 2;").unwrap_err();
        assert_eq!(e.genre, TypeErreur::Desequilibre);
        assert!(e.message.contains("Il manque une paranthèse"));
    }

    #[test]
    fn operateur_manquant_donne_une_plage() {
        let e = expression("a b;").unwrap_err();
        assert_eq!(e.genre, TypeErreur::Syntaxe);
        let plage = e.plage.unwrap();
        assert_eq!((plage.start.0, plage.end.0), (0, 3));
    }

    #[test]
    fn operande_manquant() {
        let e = expression("1 + ;").unwrap_err();
        assert!(e.message.contains("opérateur binaire"));
    }

    #[test]
    fn profondeur_limitee() {
        let src = format!("{}1{};", "[".repeat(40), "]".repeat(40));
        let e = expression(&src).unwrap_err();
        assert_eq!(e.genre, TypeErreur::ProfondeurExpression);
        let src = format!("{}1{};", "[".repeat(10), "]".repeat(10));
        assert!(expression(&src).is_ok());
    }

    #[test]
    fn formes_speciales() {
        let (asm, id) = expression("transtype(x : *z8);").unwrap();
        let n = asm.noeud(id.unwrap());
        assert_eq!(n.genre(), GenreNoeud::Transtype);
        assert_eq!(n.type_declare.as_ref().unwrap().to_string(), "*z8");

        let (asm, id) = expression("loge [n]z32;").unwrap();
        let n = asm.noeud(id.unwrap());
        let Forme::Loge { taille: Some(t), bloc_sinon: None } = n.forme else { panic!("loge attendu") };
        assert_eq!(asm.noeud(t).chaine(), "n");
        assert_eq!(n.type_declare.as_ref().unwrap().to_string(), "[]z32");

        let (asm, id) = expression("loge Vecteur2D sinon { retourne; };").unwrap();
        let Forme::Loge { bloc_sinon, .. } = asm.noeud(id.unwrap()).forme else { panic!("loge attendu") };
        assert!(bloc_sinon.is_some());

        let (asm, id) = expression("taille_de(Vecteur2D) * 2;").unwrap();
        assert_eq!(asm.genre(id.unwrap()), GenreNoeud::ExpressionBinaire);
    }

    #[test]
    fn tableau_litteral() {
        let (asm, id) = expression("[1, 2, 3];").unwrap();
        let Forme::ConstruitTableau { elements } = &asm.noeud(id.unwrap()).forme else { panic!() };
        assert_eq!(elements.len(), 3);
    }

    #[test]
    fn expression_vide() {
        let (_, id) = expression(";").unwrap();
        assert!(id.is_none());
    }

    proptest! {
        #[test]
        fn ne_panique_jamais(src in "[a-c0-9+*()\\[\\]., -]{0,40}") {
            let src = format!("{src};");
            if let Ok(lexemes) = kuri_lexer::lexe(&src, SourceId(0)) {
                let mut asm = Assembleuse::new();
                let _ = Syntaxeuse::new(&lexemes, SourceId(0), &mut asm).analyse_expression_seule(G::PointVirgule);
            }
        }
    }
}
