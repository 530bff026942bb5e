//! kuri-lexer — analyse lexicale pour Kuri
//!
//! Faits saillants :
//! - `Lexeuse` : commentaires `//`, `/* */` (imbriqués), identifiants Unicode (`arrête`, `mémoire`, …),
//!   mots-clés, nombres (2/8/10/16, `_`, réels + exposant), chaînes avec échappements, caractères
//! - ponctuation à correspondance la plus longue (`<<=` avant `<<` avant `<`)
//! - `TableLignes` pour `(ligne, colonne)` et le texte d'une ligne
//! - Erreurs avec `Display` en français + spans précis
//!
//! Exemple éclair :
//! ```
//! use kuri_core::SourceId;
//! use kuri_lexer::{GenreLexeme, Lexeuse};
//!
//! let lexemes = Lexeuse::new("x := 5;", SourceId(0)).lexe().unwrap();
//! assert_eq!(lexemes[1].genre, GenreLexeme::DeclarationVariable);
//! ```

#![deny(missing_docs)]
#![cfg_attr(not(feature = "std"), no_std)]

use core::fmt;

#[cfg(feature = "std")]
use std::{string::String, vec::Vec};

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};
#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use kuri_core::{Pos, SourceId, Span};

mod genre;

pub use genre::{mot_cle, GenreLexeme};

/* ─────────────────────────── Table des lignes ─────────────────────────── */

/// Table des lignes pour (byte offset) → (ligne, colonne).
#[derive(Debug, Clone)]
pub struct TableLignes {
    /// Offsets des débuts de lignes (toujours contient 0).
    pub debuts: Vec<u32>,
}

impl TableLignes {
    /// Construit la table à partir d’un `&str`.
    pub fn new(src: &str) -> Self {
        let mut debuts = Vec::with_capacity(64);
        debuts.push(0);
        for (i, b) in src.bytes().enumerate() {
            if b == b'\n' {
                debuts.push(i as u32 + 1);
            }
        }
        Self { debuts }
    }

    /// Convertit un `Pos` en (ligne, colonne), 1-based.
    pub fn ligne_colonne(&self, pos: Pos) -> (u32, u32) {
        let idx = match self.debuts.binary_search(&pos.0) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let debut = self.debuts[idx];
        (idx as u32 + 1, pos.0.saturating_sub(debut) + 1)
    }

    /// Texte de la ligne `ligne` (1-based) sans le retour à la ligne.
    pub fn texte_ligne<'s>(&self, src: &'s str, ligne: u32) -> &'s str {
        let idx = ligne.saturating_sub(1) as usize;
        let Some(&debut) = self.debuts.get(idx) else { return "" };
        let fin = self.debuts.get(idx + 1).map_or(src.len(), |&f| f as usize);
        src.get(debut as usize..fin).unwrap_or("").trim_end_matches(['\n', '\r'])
    }

    /// Nombre de lignes.
    pub fn len(&self) -> usize { self.debuts.len() }

    /// Jamais vrai : une source vide a une ligne.
    pub fn is_empty(&self) -> bool { self.debuts.is_empty() }
}

/* ─────────────────────────── Lexèmes ─────────────────────────── */

/// Valeur décodée d'un littéral.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ValeurLexeme {
    /// Pas de valeur (ponctuation, mots-clés, identifiants).
    Aucune,
    /// Entier non signé.
    Entier(u64),
    /// Réel.
    Reel(f64),
    /// Chaîne littérale après échappements.
    Chaine(String),
    /// Point de code d'un caractère littéral.
    Caractere(u32),
}

/// Lexème : genre, texte source, valeur éventuelle, localisation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Lexeme {
    /// Genre.
    pub genre: GenreLexeme,
    /// Texte tel qu'écrit dans la source.
    pub chaine: String,
    /// Valeur décodée pour les littéraux.
    pub valeur: ValeurLexeme,
    /// Localisation.
    pub span: Span,
}

impl Lexeme {
    /// Lexème sans valeur.
    pub fn new(genre: GenreLexeme, chaine: impl Into<String>, span: Span) -> Self {
        Self { genre, chaine: chaine.into(), valeur: ValeurLexeme::Aucune, span }
    }
}

/* ─────────────────────────── Erreurs ─────────────────────────── */

/// Genre d’erreur lexicale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenreErreurLexage {
    /// Caractère inattendu.
    CaractereInattendu(char),
    /// Commentaire bloc non terminé.
    CommentaireNonTermine,
    /// Chaîne non terminée.
    ChaineNonTerminee,
    /// Séquence d’échappement invalide.
    EchappementInvalide,
    /// Littéral numérique invalide.
    NombreInvalide,
    /// Dépassement d'un entier 64 bits.
    DepassementEntier,
    /// Littéral caractère invalide.
    CaractereInvalide,
}

/// Erreur lexicale avec localisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErreurLexage {
    /// Localisation.
    pub span: Span,
    /// Genre d’erreur.
    pub genre: GenreErreurLexage,
}

impl fmt::Display for ErreurLexage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use GenreErreurLexage::*;
        match &self.genre {
            CaractereInattendu(c) => write!(f, "caractère inattendu : {c:?}"),
            CommentaireNonTermine => write!(f, "commentaire non terminé"),
            ChaineNonTerminee => write!(f, "chaîne littérale non terminée"),
            EchappementInvalide => write!(f, "séquence d'échappement invalide"),
            NombreInvalide => write!(f, "nombre littéral invalide"),
            DepassementEntier => write!(f, "le nombre littéral dépasse 64 bits"),
            CaractereInvalide => write!(f, "caractère littéral invalide"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ErreurLexage {}

/* ─────────────────────────── Lexeuse ─────────────────────────── */

/// Analyseur lexical (itératif).
pub struct Lexeuse<'a> {
    src: &'a str,
    /// Position courante en bytes.
    off: usize,
    /// Id de la source.
    source: SourceId,
}

impl<'a> Lexeuse<'a> {
    /// Crée une lexeuse.
    pub const fn new(src: &'a str, source: SourceId) -> Self {
        Self { src, off: 0, source }
    }

    /// Prochain lexème, ou `None` en fin de source.
    pub fn suivant(&mut self) -> Result<Option<Lexeme>, ErreurLexage> {
        self.saute_blancs_et_commentaires()?;
        let Some(c) = self.peek() else { return Ok(None) };
        let debut = self.off;

        if est_debut_identifiant(c) {
            self.consomme_tant_que(est_suite_identifiant);
            let texte = &self.src[debut..self.off];
            let genre = mot_cle(texte).unwrap_or(GenreLexeme::ChaineCaractere);
            return Ok(Some(Lexeme::new(genre, texte, self.span_depuis(debut))));
        }

        if c.is_ascii_digit() {
            return self.lexe_nombre(debut).map(Some);
        }

        if c == '"' {
            self.off += 1;
            let valeur = self.lexe_chaine(debut)?;
            let mut lexeme = Lexeme::new(GenreLexeme::ChaineLitterale, &self.src[debut..self.off], self.span_depuis(debut));
            lexeme.valeur = ValeurLexeme::Chaine(valeur);
            return Ok(Some(lexeme));
        }

        if c == '\'' {
            self.off += 1;
            let valeur = self.lexe_caractere(debut)?;
            let mut lexeme = Lexeme::new(GenreLexeme::Caractere, &self.src[debut..self.off], self.span_depuis(debut));
            lexeme.valeur = ValeurLexeme::Caractere(valeur);
            return Ok(Some(lexeme));
        }

        let Some((genre, largeur)) = ponctuation(&self.src[self.off..]) else {
            return Err(self.err_depuis(debut, GenreErreurLexage::CaractereInattendu(c)));
        };
        self.off += largeur;
        Ok(Some(Lexeme::new(genre, &self.src[debut..self.off], self.span_depuis(debut))))
    }

    /// Découpe toute la source.
    pub fn lexe(mut self) -> Result<Vec<Lexeme>, ErreurLexage> {
        let mut out = Vec::new();
        while let Some(l) = self.suivant()? {
            out.push(l);
        }
        Ok(out)
    }

    /* ────────── Primitives internes ────────── */

    #[inline] fn peek(&self) -> Option<char> { self.src[self.off..].chars().next() }
    #[inline] fn peek2(&self) -> Option<char> { self.src[self.off..].chars().nth(1) }
    #[inline] fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.off += c.len_utf8();
        Some(c)
    }
    #[inline] fn eat(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) { self.off += ch.len_utf8(); true } else { false }
    }

    fn consomme_tant_que(&mut self, mut p: impl FnMut(char) -> bool) {
        while let Some(c) = self.peek() {
            if p(c) { self.off += c.len_utf8(); } else { break; }
        }
    }

    fn saute_blancs_et_commentaires(&mut self) -> Result<(), ErreurLexage> {
        loop {
            self.consomme_tant_que(char::is_whitespace);
            if self.peek() == Some('/') && self.peek2() == Some('/') {
                self.consomme_tant_que(|c| c != '\n');
                continue;
            }
            if self.peek() == Some('/') && self.peek2() == Some('*') {
                let debut = self.off;
                self.off += 2;
                let mut profondeur = 1u32;
                while profondeur != 0 {
                    if self.peek().is_none() {
                        return Err(self.err_depuis(debut, GenreErreurLexage::CommentaireNonTermine));
                    }
                    if self.peek() == Some('/') && self.peek2() == Some('*') {
                        self.off += 2;
                        profondeur += 1;
                    } else if self.peek() == Some('*') && self.peek2() == Some('/') {
                        self.off += 2;
                        profondeur -= 1;
                    } else {
                        self.bump();
                    }
                }
                continue;
            }
            return Ok(());
        }
    }

    fn lexe_echappement(&mut self, debut: usize) -> Result<char, ErreurLexage> {
        match self.bump() {
            Some('n') => Ok('\n'),
            Some('t') => Ok('\t'),
            Some('r') => Ok('\r'),
            Some('0') => Ok('\0'),
            Some('\\') => Ok('\\'),
            Some('"') => Ok('"'),
            Some('\'') => Ok('\''),
            Some(_) => Err(self.err_depuis(debut, GenreErreurLexage::EchappementInvalide)),
            None => Err(self.err_depuis(debut, GenreErreurLexage::ChaineNonTerminee)),
        }
    }

    fn lexe_chaine(&mut self, debut: usize) -> Result<String, ErreurLexage> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.err_depuis(debut, GenreErreurLexage::ChaineNonTerminee)),
                Some('"') => return Ok(out),
                Some('\\') => out.push(self.lexe_echappement(debut)?),
                Some(c) => out.push(c),
            }
        }
    }

    fn lexe_caractere(&mut self, debut: usize) -> Result<u32, ErreurLexage> {
        let c = match self.bump() {
            None | Some('\'') => return Err(self.err_depuis(debut, GenreErreurLexage::CaractereInvalide)),
            Some('\\') => self.lexe_echappement(debut)?,
            Some(c) => c,
        };
        if !self.eat('\'') {
            return Err(self.err_depuis(debut, GenreErreurLexage::CaractereInvalide));
        }
        Ok(c as u32)
    }

    fn lexe_nombre(&mut self, debut: usize) -> Result<Lexeme, ErreurLexage> {
        let base = match (self.peek(), self.peek2()) {
            (Some('0'), Some('x' | 'X')) => 16,
            (Some('0'), Some('b' | 'B')) => 2,
            (Some('0'), Some('o' | 'O')) => 8,
            _ => 10,
        };

        if base != 10 {
            self.off += 2;
            self.consomme_tant_que(|c| c.is_digit(base) || c == '_');
            let brut = self.src[debut + 2..self.off].replace('_', "");
            if brut.is_empty() {
                return Err(self.err_depuis(debut, GenreErreurLexage::NombreInvalide));
            }
            let v = u64::from_str_radix(&brut, base)
                .map_err(|_| self.err_depuis(debut, GenreErreurLexage::DepassementEntier))?;
            return Ok(self.lexeme_nombre(debut, ValeurLexeme::Entier(v)));
        }

        self.consomme_tant_que(|c| c.is_ascii_digit() || c == '_');
        let mut reel = false;
        // `0...10` est une plage, pas un réel
        if self.peek() == Some('.') && self.peek2().is_some_and(|c| c.is_ascii_digit()) {
            reel = true;
            self.off += 1;
            self.consomme_tant_que(|c| c.is_ascii_digit() || c == '_');
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let retour = self.off;
            self.off += 1;
            self.eat('+');
            self.eat('-');
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                reel = true;
                self.consomme_tant_que(|c| c.is_ascii_digit() || c == '_');
            } else {
                self.off = retour;
            }
        }

        let brut = self.src[debut..self.off].replace('_', "");
        let valeur = if reel {
            ValeurLexeme::Reel(brut.parse::<f64>().map_err(|_| self.err_depuis(debut, GenreErreurLexage::NombreInvalide))?)
        } else {
            ValeurLexeme::Entier(brut.parse::<u64>().map_err(|_| self.err_depuis(debut, GenreErreurLexage::DepassementEntier))?)
        };
        Ok(self.lexeme_nombre(debut, valeur))
    }

    fn lexeme_nombre(&self, debut: usize, valeur: ValeurLexeme) -> Lexeme {
        let genre = if matches!(valeur, ValeurLexeme::Reel(_)) { GenreLexeme::NombreReel } else { GenreLexeme::NombreEntier };
        Lexeme { genre, chaine: String::from(&self.src[debut..self.off]), valeur, span: self.span_depuis(debut) }
    }

    /* ────────── Spans / erreurs ────────── */

    #[inline] fn span_depuis(&self, debut: usize) -> Span {
        Span::new(self.source, Pos(debut as u32), Pos(self.off as u32))
    }
    #[inline] fn err_depuis(&self, debut: usize, genre: GenreErreurLexage) -> ErreurLexage {
        let fin = self.off.max(debut + 1);
        ErreurLexage { span: Span::new(self.source, Pos(debut as u32), Pos(fin as u32)), genre }
    }
}

/// Découpe toute une source (raccourci pour `Lexeuse::new(..).lexe()`).
pub fn lexe(src: &str, source: SourceId) -> Result<Vec<Lexeme>, ErreurLexage> {
    Lexeuse::new(src, source).lexe()
}

/* ─────────────────────────── Helpers ─────────────────────────── */

#[inline]
fn est_debut_identifiant(c: char) -> bool { c == '_' || c.is_alphabetic() }

#[inline]
fn est_suite_identifiant(c: char) -> bool { c == '_' || c.is_alphanumeric() }

/// Ponctuation la plus longue au début de `s`.
fn ponctuation(s: &str) -> Option<(GenreLexeme, usize)> {
    use GenreLexeme as G;
    let b = s.as_bytes();
    let c0 = *b.first()?;
    let c1 = b.get(1).copied().unwrap_or(0);
    let c2 = b.get(2).copied().unwrap_or(0);

    let trois = match (c0, c1, c2) {
        (b'.', b'.', b'.') => Some(G::TroisPoints),
        (b'<', b'<', b'=') => Some(G::DecGaucheEgal),
        (b'>', b'>', b'=') => Some(G::DecDroiteEgal),
        _ => None,
    };
    if let Some(g) = trois {
        return Some((g, 3));
    }

    let deux = match (c0, c1) {
        (b'!', b'=') => Some(G::Difference),
        (b'%', b'=') => Some(G::ModuloEgal),
        (b'&', b'&') => Some(G::EspEsp),
        (b'&', b'=') => Some(G::EtEgal),
        (b'*', b'=') => Some(G::MultiplieEgal),
        (b'+', b'=') => Some(G::PlusEgal),
        (b'-', b'=') => Some(G::MoinsEgal),
        (b'-', b'>') => Some(G::Fleche),
        (b'/', b'=') => Some(G::DiviseEgal),
        (b':', b':') => Some(G::DeclarationConstante),
        (b':', b'=') => Some(G::DeclarationVariable),
        (b'<', b'<') => Some(G::DecalageGauche),
        (b'<', b'=') => Some(G::InferieurEgal),
        (b'=', b'=') => Some(G::Egalite),
        (b'>', b'=') => Some(G::SuperieurEgal),
        (b'>', b'>') => Some(G::DecalageDroite),
        (b'^', b'=') => Some(G::OuxEgal),
        (b'|', b'=') => Some(G::OuEgal),
        (b'|', b'|') => Some(G::BarreBarre),
        _ => None,
    };
    if let Some(g) = deux {
        return Some((g, 2));
    }

    let un = match c0 {
        b'!' => G::Exclamation,
        b'#' => G::Diese,
        b'%' => G::Pourcent,
        b'&' => G::Esperluette,
        b'(' => G::ParentheseOuvrante,
        b')' => G::ParentheseFermante,
        b'*' => G::Fois,
        b'+' => G::Plus,
        b',' => G::Virgule,
        b'-' => G::Moins,
        b'.' => G::Point,
        b'/' => G::Divise,
        b':' => G::DoublePoints,
        b';' => G::PointVirgule,
        b'<' => G::Inferieur,
        b'=' => G::Egal,
        b'>' => G::Superieur,
        b'@' => G::Arobase,
        b'[' => G::CrochetOuvrant,
        b']' => G::CrochetFermant,
        b'^' => G::Chapeau,
        b'{' => G::AccoladeOuvrante,
        b'|' => G::Barre,
        b'}' => G::AccoladeFermante,
        b'~' => G::Tilde,
        _ => return None,
    };
    Some((un, 1))
}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use GenreLexeme as G;

    fn genres(src: &str) -> Vec<GenreLexeme> {
        lexe(src, SourceId(0)).unwrap().into_iter().map(|l| l.genre).collect()
    }

    #[test]
    fn mots_cles_accentues() {
        assert_eq!(
            genres("arrête diffère mémoire nonsûr répète sansarrêt énum déloge fonc x_1 été"),
            vec![
                G::Arrete, G::Differe, G::Memoire, G::Nonsur, G::Repete, G::Sansarret,
                G::Enum, G::Deloge, G::Fonc, G::ChaineCaractere, G::ChaineCaractere,
            ]
        );
    }

    #[test]
    fn ponctuation_plus_longue() {
        assert_eq!(
            genres("<<= << <= < ... . :: := : -> -="),
            vec![
                G::DecGaucheEgal, G::DecalageGauche, G::InferieurEgal, G::Inferieur,
                G::TroisPoints, G::Point, G::DeclarationConstante, G::DeclarationVariable,
                G::DoublePoints, G::Fleche, G::MoinsEgal,
            ]
        );
    }

    #[test]
    fn nombres() {
        let ls = lexe("0xFF 0o17 0b101 1_000 2.5 3e2 0...9", SourceId(0)).unwrap();
        assert_eq!(ls[0].valeur, ValeurLexeme::Entier(255));
        assert_eq!(ls[1].valeur, ValeurLexeme::Entier(15));
        assert_eq!(ls[2].valeur, ValeurLexeme::Entier(5));
        assert_eq!(ls[3].valeur, ValeurLexeme::Entier(1000));
        assert_eq!(ls[4].valeur, ValeurLexeme::Reel(2.5));
        assert_eq!(ls[5].valeur, ValeurLexeme::Reel(300.0));
        assert_eq!(ls[6].valeur, ValeurLexeme::Entier(0));
        assert_eq!(ls[7].genre, G::TroisPoints);
        assert_eq!(ls[8].valeur, ValeurLexeme::Entier(9));
    }

    #[test]
    fn chaines_et_caracteres() {
        let ls = lexe(r#""a\tb\"c" '\n' 'é'"#, SourceId(0)).unwrap();
        assert_eq!(ls[0].valeur, ValeurLexeme::Chaine("a\tb\"c".into()));
        assert_eq!(ls[1].valeur, ValeurLexeme::Caractere(10));
        assert_eq!(ls[2].valeur, ValeurLexeme::Caractere('é' as u32));
    }

    #[test]
    fn commentaires_imbriques() {
        assert_eq!(genres("a /* x /* y */ z */ b // fin\n c"), vec![G::ChaineCaractere; 3]);
    }

    #[test]
    fn erreurs() {
        let e = lexe("\"abc", SourceId(0)).unwrap_err();
        assert_eq!(e.genre, GenreErreurLexage::ChaineNonTerminee);
        let e = lexe("a $ b", SourceId(0)).unwrap_err();
        assert_eq!(e.genre, GenreErreurLexage::CaractereInattendu('$'));
        assert_eq!(e.span.start, Pos(2));
        let e = lexe("/* ouvert", SourceId(0)).unwrap_err();
        assert_eq!(e.genre, GenreErreurLexage::CommentaireNonTermine);
        let e = lexe("99999999999999999999999", SourceId(0)).unwrap_err();
        assert_eq!(e.genre, GenreErreurLexage::DepassementEntier);
    }

    #[test]
    fn spans_et_lignes() {
        let src = "a\nbé c\n";
        let ls = lexe(src, SourceId(3)).unwrap();
        let table = TableLignes::new(src);
        assert_eq!(ls[2].span.source, SourceId(3));
        assert_eq!(table.ligne_colonne(ls[2].span.start), (2, 5));
        assert_eq!(table.texte_ligne(src, 2), "bé c");
        assert_eq!(table.texte_ligne(src, 9), "");
    }

    #[test]
    fn predicats() {
        assert!(G::PlusEgal.est_assignation_composee());
        assert_eq!(G::DecGaucheEgal.operateur_de_base(), Some(G::DecalageGauche));
        assert!(G::Z32.est_identifiant_type());
        assert!(G::Virgule.est_operateur_binaire());
        assert!(!G::Exclamation.est_operateur_binaire());
        assert!(G::MoinsUnaire.est_operateur_unaire());
        assert_eq!(G::Sansarret.chaine(), "sansarrêt");
    }

    proptest::proptest! {
        #[test]
        fn jamais_de_panique(src in "\\PC{0,64}") {
            let _ = lexe(&src, SourceId(0));
        }
    }
}
