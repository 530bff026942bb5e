//! Fichiers et modules d'une compilation.
//!
//! `importe M` charge tous les `.kuri` de `<racine>/modules/M/` ;
//! `charge "f"` charge `f.kuri` relativement au fichier courant. Un même
//! chemin canonique n'est chargé qu'une fois.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use indexmap::{IndexMap, IndexSet};

use kuri_ast::NoeudId;
use kuri_core::{Erreur, SourceId, Span, TypeErreur};
use kuri_lexer::{Lexeme, TableLignes};

use crate::erreur::{ErreurCompilation, ResultatCompilation};

/// Extension des fichiers sources.
pub const EXTENSION: &str = "kuri";

/* ─────────────────────────── Fichiers ─────────────────────────── */

/// Durées mesurées pour un fichier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Temps {
    /// Découpage en lexèmes.
    pub lexage: Duration,
    /// Analyse syntaxique.
    pub syntaxage: Duration,
}

/// Un fichier source chargé.
#[derive(Debug, Clone)]
pub struct Fichier {
    /// Identifiant porté par les spans de ses lexèmes.
    pub id: SourceId,
    /// Nom affiché dans les messages.
    pub nom: String,
    /// Chemin sur disque (absent pour une source en mémoire).
    pub chemin: Option<PathBuf>,
    /// Texte source.
    pub tampon: String,
    /// Débuts de lignes.
    pub lignes: TableLignes,
    /// Lexèmes.
    pub lexemes: Vec<Lexeme>,
    /// Module propriétaire (index dans l'espace).
    pub module: usize,
    /// Noeud `Racine`, une fois analysé.
    pub racine: Option<NoeudId>,
    /// Modules importés par ce fichier.
    pub modules_importes: IndexSet<String>,
    /// Durées.
    pub temps: Temps,
}

impl Fichier {
    /// Ligne, colonne et texte de la ligne d'une position.
    pub fn localise(&self, span: Span) -> (u32, u32, &str) {
        let (ligne, colonne) = self.lignes.ligne_colonne(span.start);
        (ligne, colonne, self.lignes.texte_ligne(&self.tampon, ligne))
    }
}

/// Un module : ensemble de fichiers partageant un nom.
#[derive(Debug, Clone, Default)]
pub struct DonneesModule {
    /// Index dans l'espace.
    pub id: usize,
    /// Nom (utilisé par le broyage).
    pub nom: String,
    /// Dossier du module.
    pub chemin: Option<PathBuf>,
    /// Fichiers du module.
    pub fichiers: Vec<SourceId>,
    /// Noms des fonctions déclarées.
    pub fonctions_exportees: IndexSet<String>,
    /// Surcharges par nom.
    pub fonctions: IndexMap<String, Vec<NoeudId>>,
}

/* ─────────────────────────── Espace ─────────────────────────── */

/// Fichiers et modules d'une compilation.
#[derive(Debug, Default)]
pub struct EspaceModules {
    fichiers: Vec<Fichier>,
    modules: Vec<DonneesModule>,
    chemins_fichiers: IndexMap<PathBuf, SourceId>,
    chemins_modules: IndexMap<PathBuf, usize>,
    racine_kuri: Option<PathBuf>,
}

impl EspaceModules {
    /// Espace vide ; `racine_kuri` contient le dossier `modules/`.
    pub fn new(racine_kuri: Option<PathBuf>) -> Self { Self { racine_kuri, ..Self::default() } }

    /// Crée un module, ou rend celui déjà ouvert pour ce dossier.
    pub fn cree_module(&mut self, nom: &str, chemin: Option<&Path>) -> usize {
        let canonique = chemin.map(canonique);
        if let Some(c) = &canonique {
            if let Some(&id) = self.chemins_modules.get(c) {
                return id;
            }
        }
        let id = self.modules.len();
        self.modules.push(DonneesModule { id, nom: nom.to_owned(), chemin: canonique.clone(), ..DonneesModule::default() });
        if let Some(c) = canonique {
            self.chemins_modules.insert(c, id);
        }
        log::debug!("module « {nom} » ouvert");
        id
    }

    /// Module déjà ouvert pour ce dossier.
    pub fn module_pour_chemin(&self, chemin: &Path) -> Option<usize> {
        self.chemins_modules.get(&canonique(chemin)).copied()
    }

    /// Fichier déjà chargé depuis ce chemin.
    pub fn fichier_pour_chemin(&self, chemin: &Path) -> Option<SourceId> {
        self.chemins_fichiers.get(&canonique(chemin)).copied()
    }

    /// Enregistre un fichier (pas encore découpé).
    pub fn ajoute_fichier(&mut self, nom: &str, chemin: Option<&Path>, tampon: String, module: usize) -> SourceId {
        let id = SourceId(self.fichiers.len() as u32);
        let chemin = chemin.map(canonique);
        if let Some(c) = &chemin {
            self.chemins_fichiers.insert(c.clone(), id);
        }
        self.fichiers.push(Fichier {
            id,
            nom: nom.to_owned(),
            chemin,
            lignes: TableLignes::new(&tampon),
            tampon,
            lexemes: Vec::new(),
            module,
            racine: None,
            modules_importes: IndexSet::new(),
            temps: Temps::default(),
        });
        if let Some(m) = self.modules.get_mut(module) {
            m.fichiers.push(id);
        }
        id
    }

    /// Lit un fichier sur disque et l'enregistre.
    pub fn charge_fichier(&mut self, chemin: &Path, module: usize) -> ResultatCompilation<SourceId> {
        if let Some(id) = self.fichier_pour_chemin(chemin) {
            return Ok(id);
        }
        let tampon = fs::read_to_string(chemin)
            .map_err(|source| ErreurCompilation::Io { chemin: chemin.to_path_buf(), source })?;
        let nom = chemin.display().to_string();
        log::debug!("fichier « {nom} » chargé ({} octets)", tampon.len());
        Ok(self.ajoute_fichier(&nom, Some(chemin), tampon, module))
    }

    /* ─────────── Résolution des directives ─────────── */

    /// Dossier du module `nom` ; `span` est celui de la directive `importe`.
    pub fn chemin_module(&self, nom: &str, span: Span) -> Result<PathBuf, Erreur> {
        let Some(racine) = &self.racine_kuri else {
            return Err(Erreur::new(
                TypeErreur::ModuleInconnu,
                format!("Impossible d'importer « {nom} » : aucune racine Kuri n'est définie"),
                span,
            ));
        };
        let chemin = racine.join("modules").join(nom);
        if !chemin.exists() {
            return Err(Erreur::new(
                TypeErreur::ModuleInconnu,
                format!("Impossible de trouver le module « {nom} » ({})", chemin.display()),
                span,
            ));
        }
        if !chemin.is_dir() {
            return Err(Erreur::new(
                TypeErreur::ModuleInconnu,
                format!("Le chemin du module « {nom} » ne pointe pas vers un dossier"),
                span,
            ));
        }
        Ok(chemin)
    }

    /// Fichier désigné par `charge "nom"` depuis le fichier `depuis`.
    pub fn chemin_charge(&self, depuis: SourceId, nom: &str, span: Span) -> Result<PathBuf, Erreur> {
        let dossier = self
            .fichier(depuis)
            .and_then(|f| f.chemin.as_deref())
            .and_then(Path::parent)
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let mut chemin = dossier.join(nom);
        if chemin.extension().is_none() {
            chemin.set_extension(EXTENSION);
        }
        if !chemin.exists() {
            return Err(Erreur::new(
                TypeErreur::FichierInconnu,
                format!("Impossible de trouver le fichier « {} »", chemin.display()),
                span,
            ));
        }
        if !chemin.is_file() {
            return Err(Erreur::new(
                TypeErreur::FichierInconnu,
                format!("Le chemin « {} » ne pointe pas vers un fichier", chemin.display()),
                span,
            ));
        }
        Ok(chemin)
    }

    /* ─────────── Accès ─────────── */

    /// Fichier par identifiant.
    pub fn fichier(&self, id: SourceId) -> Option<&Fichier> { self.fichiers.get(id.0 as usize) }

    /// Variante mutable de [`EspaceModules::fichier`].
    pub fn fichier_mut(&mut self, id: SourceId) -> Option<&mut Fichier> { self.fichiers.get_mut(id.0 as usize) }

    /// Tous les fichiers, dans l'ordre de chargement.
    pub fn fichiers(&self) -> &[Fichier] { &self.fichiers }

    /// Module par index.
    pub fn module(&self, id: usize) -> Option<&DonneesModule> { self.modules.get(id) }

    /// Variante mutable de [`EspaceModules::module`].
    pub fn module_mut(&mut self, id: usize) -> Option<&mut DonneesModule> { self.modules.get_mut(id) }

    /// Tous les modules.
    pub fn modules(&self) -> &[DonneesModule] { &self.modules }

    /// Nom du module propriétaire d'une source.
    pub fn nom_module(&self, source: SourceId) -> &str {
        self.fichier(source).and_then(|f| self.modules.get(f.module)).map_or("", |m| m.nom.as_str())
    }

    /// Localise une erreur dans son fichier.
    pub fn localise(&self, erreur: Erreur) -> ErreurCompilation {
        match self.fichier(erreur.span.source) {
            Some(f) => {
                let (ligne, colonne, texte) = f.localise(erreur.span);
                let texte_ligne = texte.to_owned();
                ErreurCompilation::Kuri { fichier: f.nom.clone(), ligne, colonne, texte_ligne, erreur }
            }
            None => ErreurCompilation::Kuri {
                fichier: String::from("<inconnu>"),
                ligne: 0,
                colonne: 0,
                texte_ligne: String::new(),
                erreur,
            },
        }
    }
}

/// Fichiers `.kuri` d'un dossier de module, triés.
pub fn fichiers_module(dossier: &Path) -> ResultatCompilation<Vec<PathBuf>> {
    let io = |source| ErreurCompilation::Io { chemin: dossier.to_path_buf(), source };
    let mut fichiers = Vec::new();
    for entree in fs::read_dir(dossier).map_err(io)? {
        let chemin = entree.map_err(io)?.path();
        if chemin.is_file() && chemin.extension().is_some_and(|e| e == EXTENSION) {
            fichiers.push(chemin);
        }
    }
    fichiers.sort();
    Ok(fichiers)
}

fn canonique(chemin: &Path) -> PathBuf { fs::canonicalize(chemin).unwrap_or_else(|_| chemin.to_path_buf()) }

#[cfg(test)]
mod tests {
    use super::*;
    use kuri_core::Pos;
    use pretty_assertions::assert_eq;

    fn span() -> Span { Span::new(SourceId(0), Pos(0), Pos(7)) }

    #[test]
    fn modules_dedupliques_par_chemin() {
        let dir = tempfile::tempdir().unwrap();
        let mut espace = EspaceModules::new(Some(dir.path().to_path_buf()));
        let a = espace.cree_module("A", Some(dir.path()));
        let b = espace.cree_module("A", Some(&dir.path().join(".")));
        assert_eq!(a, b);
        let c = espace.cree_module("Racine", None);
        assert_ne!(a, c);
    }

    #[test]
    fn fichiers_de_module_tries() {
        let dir = tempfile::tempdir().unwrap();
        let module = dir.path().join("modules").join("Maths");
        fs::create_dir_all(&module).unwrap();
        fs::write(module.join("b.kuri"), "").unwrap();
        fs::write(module.join("a.kuri"), "").unwrap();
        fs::write(module.join("notes.txt"), "").unwrap();

        let espace = EspaceModules::new(Some(dir.path().to_path_buf()));
        let chemin = espace.chemin_module("Maths", span()).unwrap();
        let noms: Vec<_> = fichiers_module(&chemin)
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(noms, vec!["a.kuri", "b.kuri"]);
    }

    #[test]
    fn module_introuvable() {
        let dir = tempfile::tempdir().unwrap();
        let espace = EspaceModules::new(Some(dir.path().to_path_buf()));
        let e = espace.chemin_module("Absent", span()).unwrap_err();
        assert_eq!(e.genre, TypeErreur::ModuleInconnu);
        assert_eq!(e.span, span());

        let sans_racine = EspaceModules::new(None);
        assert!(sans_racine.chemin_module("Absent", span()).is_err());
    }

    #[test]
    fn charge_relatif_au_fichier() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("outils.kuri"), "fonc f() {}").unwrap();
        fs::write(dir.path().join("principal.kuri"), "charge \"outils\"").unwrap();

        let mut espace = EspaceModules::new(None);
        let m = espace.cree_module("principal", Some(dir.path()));
        let id = espace.charge_fichier(&dir.path().join("principal.kuri"), m).unwrap();
        let chemin = espace.chemin_charge(id, "outils", span()).unwrap();
        assert!(chemin.ends_with("outils.kuri"));
        let e = espace.chemin_charge(id, "absent", span()).unwrap_err();
        assert_eq!(e.genre, TypeErreur::FichierInconnu);

        // un second chargement rend le même fichier
        assert_eq!(espace.charge_fichier(&dir.path().join("principal.kuri"), m).unwrap(), id);
        assert_eq!(espace.module(m).unwrap().fichiers, vec![id]);
    }

    #[test]
    fn localisation_des_erreurs() {
        let mut espace = EspaceModules::new(None);
        let m = espace.cree_module("test", None);
        let id = espace.ajoute_fichier("test.kuri", None, "a := 1;\nb := c;\n".into(), m);
        let e = Erreur::new(TypeErreur::VariableInconnue, "Variable inconnue « c »", Span::new(id, Pos(13), Pos(14)));
        let ErreurCompilation::Kuri { ligne, colonne, texte_ligne, .. } = espace.localise(e) else { panic!() };
        assert_eq!((ligne, colonne, texte_ligne.as_str()), (2, 6, "b := c;"));
    }
}
