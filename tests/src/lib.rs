//! Outils partagés par les tests d'intégration.

use std::fs;
use std::path::{Path, PathBuf};

use kuri_compiler::{Compilatrice, ErreurCompilation, OptionsCompilation};

/// Options des tests : sans traces d'appel, sauf mention contraire.
pub fn options() -> OptionsCompilation { OptionsCompilation { trace_appels: false, ..OptionsCompilation::default() } }

/// Compile `src` (module `essai`) et rend le C.
///
/// # Panics
/// Si la compilation échoue ; le rapport complet est affiché.
pub fn compile(src: &str) -> String { compile_avec(src, options()) }

/// Variante de [`compile`] avec des options choisies.
///
/// # Panics
/// Si la compilation échoue.
pub fn compile_avec(src: &str, options: OptionsCompilation) -> String {
    Compilatrice::new(options)
        .compile_source("essai.kuri", src)
        .unwrap_or_else(|e| panic!("compilation échouée :\n{}", e.rapport()))
}

/// Compile `src` en attendant une erreur.
///
/// # Panics
/// Si la compilation réussit.
pub fn erreur(src: &str) -> ErreurCompilation {
    match Compilatrice::new(options()).compile_source("essai.kuri", src) {
        Ok(c) => panic!("erreur attendue, C produit :\n{c}"),
        Err(e) => e,
    }
}

/// Corps C d'une fonction : de sa définition jusqu'à l'accolade fermante en
/// début de ligne.
///
/// # Panics
/// Si la définition est absente.
pub fn corps<'a>(c: &'a str, nom_broye: &str) -> &'a str {
    let motif = format!(" {nom_broye}(");
    let mut debut = None;
    let mut position = 0;
    for ligne in c.split_inclusive('\n') {
        if ligne.starts_with("static ") && ligne.contains(&motif) && !ligne.trim_end().ends_with(';') {
            debut = Some(position);
            break;
        }
        position += ligne.len();
    }
    let debut = debut.unwrap_or_else(|| panic!("définition de {nom_broye} absente :\n{c}"));
    let reste = &c[debut..];
    let fin = reste.find("\n}\n").map_or(reste.len(), |f| f + 3);
    &reste[..fin]
}

/// Position de `motif` dans `c`.
///
/// # Panics
/// Si le motif est absent.
pub fn position(c: &str, motif: &str) -> usize {
    c.find(motif).unwrap_or_else(|| panic!("« {motif} » absent de :\n{c}"))
}

/// Racine Kuri temporaire contenant `modules/<nom>/<fichier>`.
pub struct RacineKuri {
    dossier: tempfile::TempDir,
}

impl RacineKuri {
    /// Racine vide.
    ///
    /// # Panics
    /// Si le dossier temporaire ne peut être créé.
    pub fn new() -> Self { Self { dossier: tempfile::tempdir().expect("dossier temporaire") } }

    /// Chemin de la racine.
    pub fn chemin(&self) -> &Path { self.dossier.path() }

    /// Ajoute un fichier au module `module`.
    ///
    /// # Panics
    /// En cas d'erreur d'E/S.
    pub fn module(&self, module: &str, fichier: &str, src: &str) -> &Self {
        let dossier = self.chemin().join("modules").join(module);
        fs::create_dir_all(&dossier).expect("dossier de module");
        fs::write(dossier.join(fichier), src).expect("écriture du module");
        self
    }

    /// Écrit un fichier hors des modules et rend son chemin.
    ///
    /// # Panics
    /// En cas d'erreur d'E/S.
    pub fn fichier(&self, nom: &str, src: &str) -> PathBuf {
        let chemin = self.chemin().join(nom);
        fs::write(&chemin, src).expect("écriture du fichier");
        chemin
    }
}

impl Default for RacineKuri {
    fn default() -> Self { Self::new() }
}
