//! Erreurs de compilation localisées.

use std::fmt::Write as _;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use kuri_core::{Erreur, TypeErreur};
use kuri_lexer::ErreurLexage;

/* ------------------------------ Erreurs ------------------------------ */

/// Erreur rendue par la compilatrice.
#[derive(Debug, Error)]
pub enum ErreurCompilation {
    /// Erreur du programme compilé, localisée dans un fichier.
    #[error("{fichier}:{ligne}:{colonne}: erreur : {}", erreur.message)]
    Kuri {
        /// Erreur d'origine.
        erreur: Erreur,
        /// Nom du fichier.
        fichier: String,
        /// Ligne (1-based).
        ligne: u32,
        /// Colonne (1-based).
        colonne: u32,
        /// Texte de la ligne fautive.
        texte_ligne: String,
    },

    /// Lecture d'un fichier ou d'un dossier de module impossible.
    #[error("impossible de lire « {} » : {source}", chemin.display())]
    Io {
        /// Chemin concerné.
        chemin: PathBuf,
        /// Cause.
        #[source]
        source: io::Error,
    },

    /// Point d'entrée introuvable ou autre erreur sans localisation.
    #[error("erreur : {0}")]
    Msg(String),
}

/// Résultat des opérations de la compilatrice.
pub type ResultatCompilation<T> = Result<T, ErreurCompilation>;

impl ErreurCompilation {
    /// Famille de l'erreur, si elle vient du programme compilé.
    pub const fn genre(&self) -> Option<TypeErreur> {
        match self {
            Self::Kuri { erreur, .. } => Some(erreur.genre),
            _ => None,
        }
    }

    /// Rapport complet : en-tête, ligne fautive et soulignement.
    ///
    /// ```text
    /// test.kuri:3:9: erreur : Variable inconnue « y »
    ///    3 |     x := y + 1;
    ///      |          ^
    /// ```
    pub fn rapport(&self) -> String {
        let Self::Kuri { erreur, ligne, colonne, texte_ligne, .. } = self else {
            return self.to_string();
        };

        let mut sortie = format!("{self}\n");
        let marge = ligne.to_string().len().max(4);
        let _ = writeln!(sortie, "{ligne:>marge$} | {texte_ligne}");

        let etendue = erreur.plage.filter(|p| p.start.0 <= erreur.span.start.0).map_or(erreur.span, |p| p.fusionne(erreur.span));
        let decalage = etendue.start.0.saturating_sub(erreur.span.start.0);
        let debut = colonne.saturating_sub(1).saturating_sub(decalage) as usize;
        let reste = texte_ligne.chars().count().saturating_sub(debut).max(1);
        let largeur = (etendue.len() as usize).clamp(1, reste);

        let _ = write!(sortie, "{:>marge$} | {}{}", "", " ".repeat(debut), "^".repeat(largeur));
        sortie
    }
}

/// Erreur lexicale vers erreur commune.
pub fn depuis_lexage(e: &ErreurLexage) -> Erreur { Erreur::new(TypeErreur::Lexage, e.to_string(), e.span) }

#[cfg(test)]
mod tests {
    use super::*;
    use kuri_core::{Pos, SourceId, Span};
    use pretty_assertions::assert_eq;

    fn erreur(debut: u32, fin: u32) -> ErreurCompilation {
        ErreurCompilation::Kuri {
            erreur: Erreur::new(
                TypeErreur::VariableInconnue,
                "Variable inconnue « y »",
                Span::new(SourceId(0), Pos(debut), Pos(fin)),
            ),
            fichier: "test.kuri".into(),
            ligne: 3,
            colonne: 10,
            texte_ligne: "    x := y + 1;".into(),
        }
    }

    #[test]
    fn rapport_souligne_la_colonne() {
        let r = erreur(40, 41).rapport();
        let lignes: Vec<_> = r.lines().collect();
        assert_eq!(lignes[0], "test.kuri:3:10: erreur : Variable inconnue « y »");
        assert_eq!(lignes[1], "   3 |     x := y + 1;");
        assert_eq!(lignes[2], "     |          ^");
    }

    #[test]
    fn genre_et_message() {
        let e = erreur(40, 41);
        assert_eq!(e.genre(), Some(TypeErreur::VariableInconnue));
        let io = ErreurCompilation::Io { chemin: "absent.kuri".into(), source: io::Error::from(io::ErrorKind::NotFound) };
        assert_eq!(io.genre(), None);
        assert!(io.rapport().starts_with("impossible de lire « absent.kuri »"));
    }
}
