//! Arène des noeuds et pile de construction.

use core::fmt::Write as _;

use indexmap::IndexSet;
use kuri_core::{Erreur, Resultat, Span, TypeErreur};
use kuri_lexer::{GenreLexeme, Lexeme};

use crate::{Forme, GenreNoeud, Noeud, NoeudId};

/// Propriétaire unique de tous les noeuds.
///
/// Les noeuds ne sont jamais déplacés ni libérés avant la destruction de l'arène ;
/// toutes les références entre noeuds sont des `NoeudId`.
#[derive(Debug, Default)]
pub struct Assembleuse {
    noeuds: Vec<Noeud>,
    pile: Vec<NoeudId>,
    /// `#inclus` : en-têtes C à inclure.
    pub inclusions: IndexSet<String>,
    /// `#bib` : bibliothèques à lier.
    pub bibliotheques: IndexSet<String>,
    /// `#chemin` : chemins de recherche des bibliothèques.
    pub chemins: IndexSet<String>,
    /// `#def` : définitions du préprocesseur C.
    pub definitions: IndexSet<String>,
}

impl Assembleuse {
    /// Arène vide.
    pub fn new() -> Self { Self::default() }

    /// Alloue un noeud sans toucher à la pile.
    pub fn cree_noeud(&mut self, forme: Forme, lexeme: Lexeme) -> NoeudId {
        let id = NoeudId(self.noeuds.len() as u32);
        self.noeuds.push(Noeud::new(forme, lexeme));
        id
    }

    /// Alloue un noeud, l'attache au noeud courant si `ajoute`, puis l'empile.
    pub fn empile_noeud(&mut self, forme: Forme, lexeme: Lexeme, ajoute: bool) -> Resultat<NoeudId> {
        let id = self.cree_noeud(forme, lexeme);
        if ajoute {
            self.ajoute_noeud(id)?;
        }
        self.pile.push(id);
        Ok(id)
    }

    /// Dépile le noeud courant en vérifiant son genre.
    pub fn depile_noeud(&mut self, attendu: GenreNoeud) -> Resultat<NoeudId> {
        let Some(id) = self.pile.pop() else {
            return Err(Erreur::new(
                TypeErreur::Syntaxe,
                format!("Pile de construction vide, {attendu:?} attendu"),
                Span::default(),
            ));
        };
        let obtenu = self.noeuds[id.index()].genre();
        if obtenu != attendu {
            return Err(Erreur::new(
                TypeErreur::Syntaxe,
                format!("Noeud dépilé de genre {obtenu:?}, {attendu:?} attendu"),
                self.noeuds[id.index()].lexeme.span,
            ));
        }
        Ok(id)
    }

    /// Attache `enfant` au noeud courant (sans effet si la pile est vide).
    pub fn ajoute_noeud(&mut self, enfant: NoeudId) -> Resultat<()> {
        match self.pile.last().copied() {
            Some(parent) => self.ajoute_enfant(parent, enfant),
            None => Ok(()),
        }
    }

    /// Attache `enfant` au premier emplacement libre de `parent`.
    pub fn ajoute_enfant(&mut self, parent: NoeudId, enfant: NoeudId) -> Resultat<()> {
        if self.noeuds[parent.index()].forme.ajoute_enfant(enfant) {
            return Ok(());
        }
        Err(Erreur::new(
            TypeErreur::Syntaxe,
            format!("Le noeud {:?} ne peut recevoir d'enfant supplémentaire", self.genre(parent)),
            self.noeuds[enfant.index()].lexeme.span,
        ))
    }

    /// Noeud courant de la pile.
    pub fn courant(&self) -> Option<NoeudId> { self.pile.last().copied() }

    /// Profondeur de la pile de construction.
    pub fn profondeur(&self) -> usize { self.pile.len() }

    /// Accès en lecture.
    pub fn noeud(&self, id: NoeudId) -> &Noeud { &self.noeuds[id.index()] }

    /// Accès en écriture.
    pub fn noeud_mut(&mut self, id: NoeudId) -> &mut Noeud { &mut self.noeuds[id.index()] }

    /// Genre d'un noeud.
    pub fn genre(&self, id: NoeudId) -> GenreNoeud { self.noeuds[id.index()].genre() }

    /// Nombre de noeuds alloués.
    pub fn len(&self) -> usize { self.noeuds.len() }

    /// Aucun noeud alloué.
    pub fn is_empty(&self) -> bool { self.noeuds.is_empty() }

    /// Itère sur tous les noeuds.
    pub fn iter(&self) -> impl Iterator<Item = (NoeudId, &Noeud)> {
        self.noeuds.iter().enumerate().map(|(i, n)| (NoeudId(i as u32), n))
    }

    /// Aplatit un arbre de virgules en liste, de gauche à droite.
    pub fn aplatis_virgules(&self, racine: NoeudId) -> Vec<NoeudId> {
        let mut out = Vec::new();
        let mut pile = vec![racine];
        while let Some(id) = pile.pop() {
            match &self.noeud(id).forme {
                Forme::Virgule { gauche, droite } => {
                    pile.extend(*droite);
                    pile.extend(*gauche);
                }
                _ => out.push(id),
            }
        }
        out
    }

    /// Span couvrant un noeud et tous ses descendants.
    pub fn span_arbre(&self, racine: NoeudId) -> Span {
        let mut span = self.noeud(racine).lexeme.span;
        let mut pile = self.noeud(racine).forme.enfants();
        while let Some(id) = pile.pop() {
            span = span.fusionne(self.noeud(id).lexeme.span);
            pile.extend(self.noeud(id).forme.enfants());
        }
        span
    }

    /// Représentation textuelle indentée d'un sous-arbre.
    pub fn imprime_arbre(&self, racine: NoeudId) -> String {
        let mut out = String::new();
        self.imprime_noeud(racine, 0, &mut out);
        out
    }

    fn imprime_noeud(&self, id: NoeudId, profondeur: usize, out: &mut String) {
        let n = self.noeud(id);
        for _ in 0..profondeur {
            out.push_str("  ");
        }
        let _ = write!(out, "{:?}", n.genre());
        if !matches!(n.lexeme.genre, GenreLexeme::Inconnu) && !n.lexeme.chaine.is_empty() {
            let _ = write!(out, " '{}'", n.lexeme.chaine);
        }
        if let Some(t) = &n.type_declare {
            let _ = write!(out, " : {t}");
        }
        out.push('\n');
        for e in n.forme.enfants() {
            self.imprime_noeud(e, profondeur + 1, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lex(g: GenreLexeme, s: &str) -> Lexeme { Lexeme::new(g, s, Span::default()) }

    #[test]
    fn empile_attache_au_courant() {
        let mut asm = Assembleuse::new();
        let f = asm.empile_noeud(Forme::fonction(), lex(GenreLexeme::ChaineCaractere, "f"), false).unwrap();
        let b = asm.empile_noeud(Forme::bloc(), lex(GenreLexeme::AccoladeOuvrante, "{"), true).unwrap();
        let r = asm.cree_noeud(Forme::Retour { expression: None }, lex(GenreLexeme::Retourne, "retourne"));
        asm.ajoute_noeud(r).unwrap();
        assert_eq!(asm.depile_noeud(GenreNoeud::Bloc).unwrap(), b);
        assert_eq!(asm.depile_noeud(GenreNoeud::DeclarationFonction).unwrap(), f);
        assert_eq!(asm.noeud(f).comme_fonction().unwrap().bloc, Some(b));
        assert_eq!(asm.noeud(b).forme.enfants(), vec![r]);
        assert_eq!(asm.profondeur(), 0);
    }

    #[test]
    fn depile_verifie_le_genre() {
        let mut asm = Assembleuse::new();
        asm.empile_noeud(Forme::bloc(), lex(GenreLexeme::AccoladeOuvrante, "{"), false).unwrap();
        let e = asm.depile_noeud(GenreNoeud::Boucle).unwrap_err();
        assert_eq!(e.genre, TypeErreur::Syntaxe);
        assert!(asm.depile_noeud(GenreNoeud::Bloc).is_err());
    }

    #[test]
    fn aplatit_les_virgules() {
        let mut asm = Assembleuse::new();
        let a = asm.cree_noeud(Forme::Nul, lex(GenreLexeme::Nul, "a"));
        let b = asm.cree_noeud(Forme::Nul, lex(GenreLexeme::Nul, "b"));
        let c = asm.cree_noeud(Forme::Nul, lex(GenreLexeme::Nul, "c"));
        let v1 = asm.cree_noeud(Forme::Virgule { gauche: Some(a), droite: Some(b) }, lex(GenreLexeme::Virgule, ","));
        let v2 = asm.cree_noeud(Forme::Virgule { gauche: Some(v1), droite: Some(c) }, lex(GenreLexeme::Virgule, ","));
        assert_eq!(asm.aplatis_virgules(v2), vec![a, b, c]);
        assert_eq!(asm.aplatis_virgules(a), vec![a]);
    }
}
