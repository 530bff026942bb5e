//! Kuri Compiler - des fichiers `.kuri` à une unité de traduction C
//!
//! - Entrée : un fichier (et les modules qu'il importe) ou un texte source
//! - Étapes : lexage, syntaxage, validation, graphe de dépendances, coulisse C
//! - Sortie : le texte C, à compiler avec `r16.h` ([`R16_H`]) à côté
//!
//! Features :
//! - `std` (par défaut)
//! - `serde` (sérialisation de [`OptionsCompilation`])
//! - `trace` (traces détaillées de la syntaxeuse)
//!
//! API principale :
//! ```ignore
//! use kuri_compiler::{Compilatrice, OptionsCompilation};
//!
//! let mut c = Compilatrice::new(OptionsCompilation::default());
//! let code_c = c.compile_fichier("exemple.kuri".as_ref())?;
//! std::fs::write("exemple.c", code_c)?;
//! ```

#![deny(missing_docs)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, info};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use kuri_ast::{Assembleuse, NoeudId};
use kuri_core::SourceId;
use kuri_parser::{Dependances, Syntaxeuse, PROFONDEUR_EXPRESSION_MAX};

pub mod broyage;
pub mod coulisse_c;
pub mod erreur;
pub mod graphe;
pub mod modules;
pub mod transformation;
pub mod typeuse;
pub mod validation;

pub use coulisse_c::{Coulisse, CoulisseC, Enchaineuse, EntreeCoulisse, R16_H};
pub use erreur::{ErreurCompilation, ResultatCompilation};
pub use graphe::{GrapheDependance, NoeudDependance};
pub use modules::{EspaceModules, Fichier};
pub use typeuse::{Type, Typeuse};
pub use validation::{Programme, Validatrice};

/// Variable d'environnement donnant la racine Kuri (dossier contenant `modules/`).
pub const VAR_RACINE_KURI: &str = "RACINE_KURI";

// ─────────────────────────────────────────────────────────────────────────────
// Options
// ─────────────────────────────────────────────────────────────────────────────

/// Options de la compilatrice
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OptionsCompilation {
    /// Dossier contenant `modules/` ; à défaut, `RACINE_KURI`
    pub racine_kuri: Option<PathBuf>,
    /// Fonction appelée par `main`
    pub point_entree: String,
    /// Enregistrer une trace d'appel autour de chaque appel
    pub trace_appels: bool,
    /// Imbrication maximale des expressions
    pub profondeur_expression_max: usize,
}

impl Default for OptionsCompilation {
    fn default() -> Self {
        Self {
            racine_kuri: None,
            point_entree: "principale".to_owned(),
            trace_appels: true,
            profondeur_expression_max: PROFONDEUR_EXPRESSION_MAX,
        }
    }
}

impl OptionsCompilation {
    /// Racine explicite, sinon celle de l'environnement.
    pub fn racine_effective(&self) -> Option<PathBuf> {
        self.racine_kuri.clone().or_else(|| std::env::var_os(VAR_RACINE_KURI).map(PathBuf::from))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Compilatrice
// ─────────────────────────────────────────────────────────────────────────────

/// État d'une compilation : fichiers, arbre, types et dépendances.
///
/// Une compilatrice sert pour une seule compilation ; les fichiers chargés et
/// les types créés s'accumulent.
#[derive(Debug)]
pub struct Compilatrice {
    options: OptionsCompilation,
    espace: EspaceModules,
    assembleuse: Assembleuse,
    typeuse: Typeuse,
    graphe: GrapheDependance,
    racines: Vec<NoeudId>,
}

impl Compilatrice {
    /// Nouvelle compilatrice
    pub fn new(options: OptionsCompilation) -> Self {
        let espace = EspaceModules::new(options.racine_effective());
        Self {
            options,
            espace,
            assembleuse: Assembleuse::new(),
            typeuse: Typeuse::new(),
            graphe: GrapheDependance::new(),
            racines: Vec::new(),
        }
    }

    /// Options en vigueur
    pub const fn options(&self) -> &OptionsCompilation { &self.options }

    /// Fichiers et modules chargés
    pub const fn espace(&self) -> &EspaceModules { &self.espace }

    /// Arbre de tous les fichiers chargés
    pub const fn assembleuse(&self) -> &Assembleuse { &self.assembleuse }

    /// Table des types
    pub const fn typeuse(&self) -> &Typeuse { &self.typeuse }

    /// Compile un fichier et tout ce qu'il importe ou charge.
    pub fn compile_fichier(&mut self, chemin: &Path) -> ResultatCompilation<String> {
        info!("compilation de {}", chemin.display());
        let dossier = chemin.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
        let module = self.espace.cree_module(&nom_module(chemin), Some(dossier));
        let id = self.espace.charge_fichier(chemin, module)?;
        self.charge_tout(id)?;
        self.termine()
    }

    /// Compile un texte source ; `nom` sert aux messages et au nom du module.
    pub fn compile_source(&mut self, nom: &str, source: &str) -> ResultatCompilation<String> {
        info!("compilation de {nom}");
        let module = self.espace.cree_module(&nom_module(Path::new(nom)), None);
        let id = self.espace.ajoute_fichier(nom, None, source.to_owned(), module);
        self.charge_tout(id)?;
        self.termine()
    }

    /// Découpe et analyse `premier`, puis chaque fichier qu'il fait charger.
    pub fn charge_tout(&mut self, premier: SourceId) -> ResultatCompilation<()> {
        let mut file = VecDeque::from([premier]);
        while let Some(id) = file.pop_front() {
            let dependances = self.analyse(id)?;
            for (nom, span) in dependances.modules {
                let dossier = self.espace.chemin_module(&nom, span).map_err(|e| self.espace.localise(e))?;
                if let Some(f) = self.espace.fichier_mut(id) {
                    f.modules_importes.insert(nom.clone());
                }
                if self.espace.module_pour_chemin(&dossier).is_some() {
                    continue;
                }
                let module = self.espace.cree_module(&nom, Some(dossier.as_path()));
                for chemin in modules::fichiers_module(&dossier)? {
                    file.push_back(self.espace.charge_fichier(&chemin, module)?);
                }
                info!("module « {nom} » importé");
            }
            for (nom, span) in dependances.fichiers {
                let chemin = self.espace.chemin_charge(id, &nom, span).map_err(|e| self.espace.localise(e))?;
                if self.espace.fichier_pour_chemin(&chemin).is_some() {
                    continue;
                }
                let module = self.espace.fichier(id).map_or(0, |f| f.module);
                file.push_back(self.espace.charge_fichier(&chemin, module)?);
            }
        }
        Ok(())
    }

    /// Lexage et syntaxage d'un fichier enregistré.
    fn analyse(&mut self, id: SourceId) -> ResultatCompilation<Dependances> {
        let Some(fichier) = self.espace.fichier(id) else {
            return Err(ErreurCompilation::Msg(format!("fichier {id:?} inconnu")));
        };
        let debut = Instant::now();
        let lexemes = kuri_lexer::lexe(&fichier.tampon, id)
            .map_err(|e| self.espace.localise(erreur::depuis_lexage(&e)))?;
        let lexage = debut.elapsed();

        let debut = Instant::now();
        let mut syntaxeuse = Syntaxeuse::new(&lexemes, id, &mut self.assembleuse)
            .avec_profondeur_max(self.options.profondeur_expression_max);
        let racine = syntaxeuse.analyse();
        let dependances = syntaxeuse.into_dependances();
        let racine = racine.map_err(|e| self.espace.localise(e))?;
        let syntaxage = debut.elapsed();

        if let Some(f) = self.espace.fichier_mut(id) {
            debug!("{} : {} lexème(s) en {lexage:?}, syntaxe en {syntaxage:?}", f.nom, lexemes.len());
            f.lexemes = lexemes;
            f.racine = Some(racine);
            f.temps.lexage = lexage;
            f.temps.syntaxage = syntaxage;
        }
        self.racines.push(racine);
        Ok(dependances)
    }

    /// Validation de tous les fichiers chargés puis génération du C.
    fn termine(&mut self) -> ResultatCompilation<String> {
        let programme = self.valide()?;
        if programme.point_entree.is_none() {
            return Err(ErreurCompilation::Msg(format!(
                "point d'entrée « {} » introuvable",
                self.options.point_entree
            )));
        }
        Ok(self.genere_c(&programme))
    }

    /// Valide les fichiers chargés.
    pub fn valide(&mut self) -> ResultatCompilation<Programme> {
        let debut = Instant::now();
        let programme = Validatrice::new(&mut self.assembleuse, &mut self.typeuse, &mut self.graphe, &self.espace)
            .valide(&self.racines, &self.options.point_entree)
            .map_err(|e| self.espace.localise(e))?;
        info!(
            "validation : {} fonction(s), {} type(s), {} noeud(s) de dépendance en {:?}",
            programme.fonctions.len(),
            self.typeuse.len(),
            self.graphe.len(),
            debut.elapsed()
        );
        Ok(programme)
    }

    /// Texte C d'un programme validé par cette compilatrice.
    pub fn genere_c(&self, programme: &Programme) -> String {
        let entree = EntreeCoulisse {
            assembleuse: &self.assembleuse,
            typeuse: &self.typeuse,
            graphe: &self.graphe,
            programme,
            espace: &self.espace,
        };
        let debut = Instant::now();
        let sortie = CoulisseC::new(self.options.trace_appels).genere(&entree);
        info!("coulisse C : {} octet(s) en {:?}", sortie.len(), debut.elapsed());
        sortie.chaine()
    }
}

/// Nom de module tiré du nom de fichier.
fn nom_module(chemin: &Path) -> String {
    chemin.file_stem().and_then(|s| s.to_str()).filter(|s| !s.is_empty()).unwrap_or("principal").to_owned()
}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use kuri_core::TypeErreur;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn options() -> OptionsCompilation { OptionsCompilation { trace_appels: false, ..OptionsCompilation::default() } }

    #[test]
    fn options_par_defaut() {
        let o = OptionsCompilation::default();
        assert_eq!(o.point_entree, "principale");
        assert!(o.trace_appels);
        assert_eq!(o.profondeur_expression_max, PROFONDEUR_EXPRESSION_MAX);
    }

    #[test]
    fn source_compilee() {
        let mut c = Compilatrice::new(options());
        let code = c.compile_source("essai.kuri", "fonc principale() : z32 { retourne 0; }").unwrap();
        assert!(code.contains("_KF5essai_10principale"), "{code}");
        assert!(code.contains("int main(void)"));
        assert_eq!(c.espace().fichiers().len(), 1);
    }

    #[test]
    fn point_entree_absent() {
        let mut c = Compilatrice::new(options());
        let e = c.compile_source("essai.kuri", "fonc autre() {}").unwrap_err();
        assert!(matches!(e, ErreurCompilation::Msg(_)), "{e}");
        assert!(e.to_string().contains("principale"));
    }

    #[test]
    fn erreur_localisee() {
        let mut c = Compilatrice::new(options());
        let e = c
            .compile_source("essai.kuri", "fonc principale() : z32 {\n    retourne y;\n}")
            .unwrap_err();
        assert_eq!(e.genre(), Some(TypeErreur::VariableInconnue));
        let ErreurCompilation::Kuri { fichier, ligne, .. } = &e else { panic!("{e}") };
        assert_eq!(fichier, "essai.kuri");
        assert_eq!(*ligne, 2);
    }

    #[test]
    fn modules_et_fichiers_charges() {
        let racine = tempfile::tempdir().unwrap();
        let module = racine.path().join("modules").join("Maths");
        fs::create_dir_all(&module).unwrap();
        fs::write(module.join("carre.kuri"), "fonc carre(x : z32) : z32 { retourne x * x; }").unwrap();

        let projet = tempfile::tempdir().unwrap();
        fs::write(projet.path().join("outils.kuri"), "fonc double(x : z32) : z32 { retourne x + x; }").unwrap();
        let entree = projet.path().join("main.kuri");
        fs::write(
            &entree,
            "importe Maths\ncharge \"outils\"\nfonc principale() : z32 { retourne carre(double(2)); }",
        )
        .unwrap();

        let options = OptionsCompilation { racine_kuri: Some(racine.path().to_path_buf()), ..options() };
        let mut c = Compilatrice::new(options);
        let code = c.compile_fichier(&entree).unwrap();
        assert_eq!(c.espace().fichiers().len(), 3);
        assert!(code.contains("_KF5Maths_5carre"), "{code}");
        assert!(code.contains("_KF4main_6double"), "{code}");
        let principal = &c.espace().fichiers()[0];
        assert!(principal.modules_importes.contains("Maths"));
    }

    #[test]
    fn module_introuvable() {
        let racine = tempfile::tempdir().unwrap();
        let options = OptionsCompilation { racine_kuri: Some(racine.path().to_path_buf()), ..options() };
        let mut c = Compilatrice::new(options);
        let e = c.compile_source("essai.kuri", "importe Absent\nfonc principale() {}").unwrap_err();
        assert_eq!(e.genre(), Some(TypeErreur::ModuleInconnu));
    }
}
