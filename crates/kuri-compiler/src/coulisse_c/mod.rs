//! Coulisse C : traduit un programme validé en une unité de traduction C.
//!
//! L'ordre d'émission suit le graphe de dépendances : types, info-types,
//! globales, prototypes, corps des fonctions atteignables depuis le point
//! d'entrée, puis `main`. Chaque expression est abaissée en une valeur C
//! (souvent un temporaire `__tN`) après avoir émis ses instructions
//! préparatoires.

mod enchaineuse;
mod expression;
mod instruction;
mod preambule;
mod transformation;
mod types;

use indexmap::{IndexMap, IndexSet};
use log::{debug, trace};

use kuri_ast::{Assembleuse, DrapeauxNoeud, Forme, NoeudId, TypeId};

use crate::broyage::broye_nom_local;
use crate::graphe::{GrapheDependance, NoeudDependance};
use crate::modules::EspaceModules;
use crate::typeuse::{Type, Typeuse};
use crate::validation::Programme;

pub use enchaineuse::{Enchaineuse, TAILLE_TAMPON};
pub use preambule::{litteral_c, R16_H};

use preambule::{INCLUSIONS, PREAMBULE};

/// Capacité initiale du stockage temporaire du contexte.
pub const TAILLE_STOCKAGE_TEMPORAIRE: usize = 16 * 1024;

/* ─────────────────────────── Interface ─────────────────────────── */

/// Tout ce que la validation a produit, en lecture seule.
#[derive(Debug, Clone, Copy)]
pub struct EntreeCoulisse<'a> {
    /// Arbre typé.
    pub assembleuse: &'a Assembleuse,
    /// Table des types.
    pub typeuse: &'a Typeuse,
    /// Dépendances entre fonctions, types et globales.
    pub graphe: &'a GrapheDependance,
    /// Point d'entrée, constantes, arguments des appels.
    pub programme: &'a Programme,
    /// Fichiers, pour les positions des paniques et des traces.
    pub espace: &'a EspaceModules,
}

/// Générateur de code à partir d'un programme validé.
pub trait Coulisse {
    /// Produit le texte complet de l'unité de traduction.
    fn genere(&mut self, entree: &EntreeCoulisse<'_>) -> Enchaineuse;
}

/// Coulisse produisant du C11.
#[derive(Debug, Clone, Default)]
pub struct CoulisseC {
    /// Enregistre une trace d'appel autour de chaque appel.
    pub trace_appels: bool,
}

impl CoulisseC {
    /// Coulisse avec ou sans traces d'appel.
    pub const fn new(trace_appels: bool) -> Self { Self { trace_appels } }
}

impl Coulisse for CoulisseC {
    fn genere(&mut self, entree: &EntreeCoulisse<'_>) -> Enchaineuse {
        GeneratriceC::new(entree, self.trace_appels).genere()
    }
}

/* ─────────────────────────── Génératrice ─────────────────────────── */

#[derive(Debug, Clone)]
pub(crate) struct CadreBoucle {
    pub etiquette: String,
    pub continue_: String,
    pub arrete: String,
    /// Nombre de blocs ouverts à l'entrée de la boucle.
    pub profondeur: usize,
}

pub(crate) struct GeneratriceC<'a> {
    pub asm: &'a Assembleuse,
    pub typeuse: &'a Typeuse,
    pub graphe: &'a GrapheDependance,
    pub programme: &'a Programme,
    pub espace: &'a EspaceModules,
    pub trace_appels: bool,

    pub sortie: Enchaineuse,
    pub retrait: usize,
    pub compteur: u32,
    /// Résultats d'une virgule ou d'un appel à plusieurs retours.
    pub valeurs_multiples: IndexMap<NoeudId, Vec<String>>,
    pub types_emis: IndexSet<String>,
    pub initialisations: IndexSet<TypeId>,

    // fonction courante
    pub nom_fonction: String,
    pub avec_contexte: bool,
    pub trace: bool,
    pub coroutine: bool,
    pub sorties: Vec<TypeId>,
    pub blocs: Vec<Vec<NoeudId>>,
    pub boucles: Vec<CadreBoucle>,
    pub nonsur: u32,
}

impl<'a> GeneratriceC<'a> {
    pub(crate) fn new(entree: &EntreeCoulisse<'a>, trace_appels: bool) -> Self {
        Self {
            asm: entree.assembleuse,
            typeuse: entree.typeuse,
            graphe: entree.graphe,
            programme: entree.programme,
            espace: entree.espace,
            trace_appels,
            sortie: Enchaineuse::new(),
            retrait: 0,
            compteur: 0,
            valeurs_multiples: IndexMap::new(),
            types_emis: IndexSet::new(),
            initialisations: IndexSet::new(),
            nom_fonction: String::new(),
            avec_contexte: true,
            trace: false,
            coroutine: false,
            sorties: Vec::new(),
            blocs: Vec::new(),
            boucles: Vec::new(),
            nonsur: 0,
        }
    }

    pub(crate) fn genere(mut self) -> Enchaineuse {
        let racines: Vec<NoeudDependance> = match self.programme.point_entree {
            Some(f) => vec![NoeudDependance::Fonction(f)],
            None => self.programme.fonctions.iter().map(|&f| NoeudDependance::Fonction(f)).collect(),
        };
        let ordre = self.graphe.parcours(&racines);
        let asm = self.asm;
        let fonctions: Vec<NoeudId> = ordre
            .iter()
            .filter_map(|n| match n {
                NoeudDependance::Fonction(f) => Some(*f),
                _ => None,
            })
            .filter(|&f| {
                let n = asm.noeud(f);
                !n.possede(DrapeauxNoeud::EST_EXTERNE) && n.comme_fonction().is_some_and(|d| d.bloc.is_some())
            })
            .collect();
        let globales: Vec<NoeudId> = ordre
            .iter()
            .filter_map(|n| match n {
                NoeudDependance::Globale(g) if !asm.noeud(*g).possede(DrapeauxNoeud::EST_EXTERNE) => Some(*g),
                _ => None,
            })
            .collect();
        debug!("coulisse C : {} fonction(s), {} globale(s) atteignables", fonctions.len(), globales.len());

        self.sortie.ajoute(INCLUSIONS);
        for inclusion in &asm.inclusions {
            self.ligne(&format!("#include \"{inclusion}\""));
        }
        for definition in &asm.definitions {
            self.ligne(&format!("#define {}", definition.replacen('=', " ", 1)));
        }
        self.sortie.ajoute(PREAMBULE);

        self.section("types");
        self.genere_types();
        self.section("info-types");
        self.genere_infos_types();
        self.genere_etats_coroutines(&fonctions);
        self.declare_initialisations();

        self.section("globales");
        for &g in &globales {
            self.declare_globale(g);
        }

        self.section("fonctions");
        for &f in &fonctions {
            let signature = self.signature(f);
            self.ligne(&format!("{signature};"));
        }
        self.ligne("");
        for &f in &fonctions {
            self.genere_fonction(f);
        }
        self.genere_initialisation_globales(&globales);
        self.genere_initialisations();
        self.genere_principale();
        debug!("coulisse C : {} octet(s) générés", self.sortie.len());
        self.sortie
    }

    /* ─────────── Écriture ─────────── */

    pub(crate) fn ligne(&mut self, texte: &str) {
        if !texte.is_empty() {
            for _ in 0..self.retrait {
                self.sortie.ajoute("    ");
            }
            self.sortie.ajoute(texte);
        }
        self.sortie.ajoute("\n");
    }

    /// Écrit `texte` puis augmente le retrait.
    pub(crate) fn ouvre(&mut self, texte: &str) {
        self.ligne(texte);
        self.retrait += 1;
    }

    /// Diminue le retrait puis écrit `texte`.
    pub(crate) fn ferme(&mut self, texte: &str) {
        self.retrait = self.retrait.saturating_sub(1);
        self.ligne(texte);
    }

    fn section(&mut self, nom: &str) {
        self.ligne("");
        self.ligne(&format!("/* {nom} */"));
    }

    pub(crate) fn nouvel_index(&mut self) -> u32 {
        self.compteur += 1;
        self.compteur
    }

    pub(crate) fn temporaire(&mut self) -> String { format!("__t{}", self.nouvel_index()) }

    /* ─────────── Noeuds ─────────── */

    /// Type calculé d'un noeud, avant transformation.
    pub(crate) fn type_de(&self, id: NoeudId) -> TypeId { self.asm.noeud(id).type_.unwrap_or(Typeuse::RIEN) }

    /// Nom C d'une variable désignée par son noeud de déclaration.
    pub(crate) fn nom_variable(&self, decl: NoeudId) -> String {
        let n = self.asm.noeud(decl);
        if n.possede(DrapeauxNoeud::EST_EXTERNE) {
            return n.chaine().to_owned();
        }
        if let Some(f) = n.comme_fonction() {
            return f.nom_broye.clone();
        }
        broye_nom_local(n.chaine())
    }

    /// Ligne, colonne et texte de la ligne d'un noeud.
    pub(crate) fn position(&self, id: NoeudId) -> (u32, u32, String) {
        let span = self.asm.noeud(id).lexeme.span;
        self.espace
            .fichier(span.source)
            .map_or((0, 0, String::new()), |f| {
                let (l, c, texte) = f.localise(span);
                (l, c, texte.trim().to_owned())
            })
    }

    pub(crate) fn nom_fichier(&self, id: NoeudId) -> String {
        let span = self.asm.noeud(id).lexeme.span;
        self.espace.fichier(span.source).map_or_else(String::new, |f| f.nom.clone())
    }

    /// Littéral `&(PositionCodeSource){…}` passé à l'allocatrice.
    pub(crate) fn position_c(&self, id: NoeudId) -> String {
        let (l, c, _) = self.position(id);
        format!(
            "&(PositionCodeSource){{ {}, {}, {l}, {c} }}",
            litteral_c(&self.nom_fichier(id)),
            litteral_c(&self.nom_fonction)
        )
    }

    pub(crate) const fn contexte_panique(&self) -> &'static str {
        if self.avec_contexte {
            "contexte"
        } else {
            "KR__contexte_global"
        }
    }

    /// Appel d'une fonction de panique du préambule.
    pub(crate) fn panique(&mut self, fonction: &str, id: NoeudId) {
        let (l, c, _) = self.position(id);
        let fichier = litteral_c(&self.nom_fichier(id));
        let contexte = self.contexte_panique();
        self.ligne(&format!("{fonction}({contexte}, {fichier}, {l}, {c});"));
    }

    /* ─────────── Fonctions ─────────── */

    fn entre_fonction(&mut self, nom: &str, avec_contexte: bool, trace: bool, coroutine: bool) {
        self.nom_fonction = nom.to_owned();
        self.avec_contexte = avec_contexte;
        self.trace = trace;
        self.coroutine = coroutine;
        self.sorties.clear();
        self.blocs.clear();
        self.boucles.clear();
        self.nonsur = 0;
        self.valeurs_multiples.clear();
    }

    fn signature(&self, decl: NoeudId) -> String {
        let n = self.asm.noeud(decl);
        let nom = n.comme_fonction().map_or("", |f| f.nom_broye.as_str());
        if n.possede(DrapeauxNoeud::EST_COROUTINE) {
            return format!("static void *{nom}(void *KR__arg)");
        }
        let (sorties, nulctx) = match self.typeuse.type_(self.type_de(decl)) {
            Type::Fonction { sorties, nulctx, .. } => (sorties.clone(), *nulctx),
            _ => (Vec::new(), false),
        };
        let mut parametres = Vec::new();
        if !nulctx {
            parametres.push("ContexteProgramme *contexte".to_owned());
        }
        for &p in n.comme_fonction().map(|f| f.parametres.as_slice()).unwrap_or_default() {
            if let Forme::DeclarationVariable { cible: Some(c), .. } = self.asm.noeud(p).forme {
                parametres.push(format!("{} {}", self.nom_c(self.type_de(c)), self.nom_variable(c)));
            }
        }
        for (i, &s) in sorties.iter().enumerate().skip(1) {
            parametres.push(format!("{} *__ret{i}", self.nom_c(s)));
        }
        let retour = sorties.first().map_or_else(|| "void".to_owned(), |&s| self.nom_c(s));
        let parametres = if parametres.is_empty() { "void".to_owned() } else { parametres.join(", ") };
        let prefixe = if n.possede(DrapeauxNoeud::FORCE_ENLIGNE) {
            "static inline "
        } else if n.possede(DrapeauxNoeud::FORCE_HORSLIGNE) {
            "static __attribute__((noinline)) "
        } else {
            "static "
        };
        format!("{prefixe}{retour} {nom}({parametres})")
    }

    fn genere_fonction(&mut self, decl: NoeudId) {
        let n = self.asm.noeud(decl);
        let Some(f) = n.comme_fonction() else { return };
        let Some(bloc) = f.bloc else { return };
        let coroutine = n.possede(DrapeauxNoeud::EST_COROUTINE);
        let nulctx = matches!(self.typeuse.type_(self.type_de(decl)), Type::Fonction { nulctx: true, .. });
        let avec_contexte = coroutine || !nulctx;
        let trace = self.trace_appels && avec_contexte && !n.possede(DrapeauxNoeud::SANS_TRACE);
        trace!("génère {}", f.nom_broye);
        self.entre_fonction(n.chaine(), avec_contexte, trace, coroutine);
        if let Type::Fonction { sorties, .. } = self.typeuse.type_(self.type_de(decl)) {
            self.sorties.clone_from(sorties);
        }

        let signature = self.signature(decl);
        self.ligne(&signature);
        self.ouvre("{");
        if coroutine {
            let etat = format!("KC_{}", f.nom_broye);
            self.ligne(&format!("{etat} *KR__etat = ({etat} *)KR__arg;"));
            self.ligne("ContexteProgramme *contexte = KR__etat->contexte;");
            for &p in &f.parametres {
                if let Forme::DeclarationVariable { cible: Some(c), .. } = self.asm.noeud(p).forme {
                    let nom = self.nom_variable(c);
                    self.ligne(&format!("{} {nom} = KR__etat->{nom};", self.nom_c(self.type_de(c))));
                }
            }
        }
        if trace {
            self.ligne(&format!("static const char *KR__fichier = {};", litteral_c(&self.nom_fichier(decl))));
            self.ligne(&format!("static const char *KR__fonction = {};", litteral_c(n.chaine())));
        }
        self.genere_contenu_bloc(bloc);
        if coroutine {
            self.ligne("__fin_coroutine:;");
            self.ligne("pthread_mutex_lock(&KR__etat->mutex_boucle);");
            self.ligne("KR__etat->termine = 1;");
            self.ligne("pthread_cond_signal(&KR__etat->cond_boucle);");
            self.ligne("pthread_mutex_unlock(&KR__etat->mutex_boucle);");
            self.ligne("return NULL;");
        }
        self.ferme("}");
        self.ligne("");
    }

    /// Structure d'état partagée entre une coroutine et la boucle qui l'itère.
    fn genere_etats_coroutines(&mut self, fonctions: &[NoeudId]) {
        for &f in fonctions {
            let n = self.asm.noeud(f);
            if !n.possede(DrapeauxNoeud::EST_COROUTINE) {
                continue;
            }
            let Some(donnees) = n.comme_fonction() else { continue };
            let nom = format!("KC_{}", donnees.nom_broye);
            let sorties = match self.typeuse.type_(self.type_de(f)) {
                Type::Fonction { sorties, .. } => sorties.clone(),
                _ => Vec::new(),
            };
            self.ouvre(&format!("typedef struct {nom} {{"));
            for champ in [
                "pthread_mutex_t mutex_boucle;",
                "pthread_cond_t cond_boucle;",
                "pthread_mutex_t mutex_coro;",
                "pthread_cond_t cond_coro;",
                "bool termine;",
                "bool disponible;",
                "bool reprise;",
                "ContexteProgramme *contexte;",
            ] {
                self.ligne(champ);
            }
            for &p in &donnees.parametres {
                if let Forme::DeclarationVariable { cible: Some(c), .. } = self.asm.noeud(p).forme {
                    self.ligne(&format!("{} {};", self.nom_c(self.type_de(c)), self.nom_variable(c)));
                }
            }
            for (i, &s) in sorties.iter().enumerate() {
                self.ligne(&format!("{} __ret{i};", self.nom_c(s)));
            }
            self.ferme(&format!("}} {nom};"));
        }
    }

    /* ─────────── Globales ─────────── */

    fn declare_globale(&mut self, decl: NoeudId) {
        let Forme::DeclarationVariable { cible: Some(cible), .. } = self.asm.noeud(decl).forme else { return };
        for c in self.asm.aplatis_virgules(cible) {
            self.ligne(&format!("static {} {};", self.nom_c(self.type_de(c)), self.nom_variable(c)));
        }
    }

    fn genere_initialisation_globales(&mut self, globales: &[NoeudId]) {
        self.entre_fonction("KR__initialise_globales", true, false, false);
        self.ligne("static void KR__initialise_globales(ContexteProgramme *contexte)");
        self.ouvre("{");
        self.ligne("(void)contexte;");
        self.blocs.push(Vec::new());
        for &g in globales {
            let Forme::DeclarationVariable { cible: Some(cible), valeur } = self.asm.noeud(g).forme else { continue };
            let cibles = self.asm.aplatis_virgules(cible);
            let valeurs = valeur.map(|v| self.valeurs(v)).unwrap_or_default();
            for (i, &c) in cibles.iter().enumerate() {
                let nom = self.nom_variable(c);
                match valeurs.get(i) {
                    Some(v) => self.ligne(&format!("{nom} = {v};")),
                    None => self.initialise_valeur(&nom, self.type_de(c)),
                }
            }
        }
        self.blocs.pop();
        self.ferme("}");
        self.ligne("");
    }

    /* ─────────── Point d'entrée ─────────── */

    fn genere_principale(&mut self) {
        self.ligne("int main(void)");
        self.ouvre("{");
        self.ligne("ContexteProgramme KR__contexte;");
        self.ligne("memset(&KR__contexte, 0, sizeof(KR__contexte));");
        self.ligne("KR__contexte.allocatrice = KR__allocatrice_defaut;");
        self.ligne(&format!("KR__contexte.capacite = {TAILLE_STOCKAGE_TEMPORAIRE};"));
        self.ligne("KR__contexte.stockage_temporaire = (octet *)malloc((size_t)KR__contexte.capacite);");
        self.ligne("if (KR__contexte.stockage_temporaire == NULL) {");
        self.ligne("    KR__hors_memoire();");
        self.ligne("}");
        self.ligne("ContexteProgramme *contexte = &KR__contexte;");
        self.ligne("KR__contexte_global = contexte;");
        self.ligne("KR__initialise_globales(contexte);");
        match self.programme.point_entree {
            Some(f) => {
                let n = self.asm.noeud(f);
                let nom = n.comme_fonction().map_or("", |d| d.nom_broye.as_str());
                let (retour, nulctx) = match self.typeuse.type_(self.type_de(f)) {
                    Type::Fonction { sorties, nulctx, .. } => (!sorties.is_empty(), *nulctx),
                    _ => (false, false),
                };
                let arguments = if nulctx { "" } else { "contexte" };
                if retour {
                    self.ligne(&format!("int32_t KR__resultat = {nom}({arguments});"));
                } else {
                    self.ligne(&format!("{nom}({arguments});"));
                    self.ligne("int32_t KR__resultat = 0;");
                }
            }
            None => self.ligne("int32_t KR__resultat = 0;"),
        }
        self.ligne("free(KR__contexte.stockage_temporaire);");
        self.ligne("return (int)KR__resultat;");
        self.ferme("}");
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use kuri_core::SourceId;

    use crate::validation::Validatrice;

    fn genere_avec(src: &str, trace_appels: bool) -> String {
        let lexemes = kuri_lexer::lexe(src, SourceId(0)).unwrap();
        let mut asm = Assembleuse::new();
        let (racine, _) = kuri_parser::analyse_fichier(&lexemes, SourceId(0), &mut asm).unwrap();
        let mut typeuse = Typeuse::new();
        let mut graphe = GrapheDependance::new();
        let mut espace = EspaceModules::new(None);
        let m = espace.cree_module("Test", None);
        espace.ajoute_fichier("test.kuri", None, src.to_owned(), m);
        let programme = Validatrice::new(&mut asm, &mut typeuse, &mut graphe, &espace)
            .valide(&[racine], "principale")
            .unwrap();
        let entree = EntreeCoulisse {
            assembleuse: &asm,
            typeuse: &typeuse,
            graphe: &graphe,
            programme: &programme,
            espace: &espace,
        };
        CoulisseC::new(trace_appels).genere(&entree).chaine()
    }

    fn genere(src: &str) -> String { genere_avec(src, false) }

    fn position(c: &str, motif: &str) -> usize {
        c.find(motif).unwrap_or_else(|| panic!("« {motif} » absent de :\n{c}"))
    }

    #[test]
    fn signature_broyee() {
        let c = genere("fonc carre(x : z32) : z32 { retourne x * x; } fonc principale() : z32 { retourne carre(3); }");
        assert!(c.contains("static int32_t _KF4Test_5carre(ContexteProgramme *contexte, int32_t x)"), "{c}");
        assert!(c.contains("_KF4Test_5carre(contexte, 3)"), "{c}");
        assert!(c.contains("int main(void)"));
        assert!(c.contains("int32_t KR__resultat = _KF4Test_10principale(contexte);"), "{c}");
    }

    #[test]
    fn differe_en_ordre_inverse() {
        let src = "fonc a() {} fonc b() {}
                   fonc principale() : z32 {
                       diffère { a(); }
                       diffère { b(); }
                       si vrai { retourne 1; }
                       retourne 0;
                   }";
        let c = genere(src);
        let corps = &c[position(&c, "_KF4Test_10principale(ContexteProgramme *contexte)\n{")..];
        // au retour anticipé puis au retour final : b avant a
        let b = position(corps, "_KF4Test_1b(contexte);");
        let a = position(corps, "_KF4Test_1a(contexte);");
        assert!(b < a, "{corps}");
        // la valeur rendue est mise de côté avant les différés
        let retenue = position(corps, "int32_t __t");
        assert!(corps[retenue..].lines().next().is_some_and(|l| l.ends_with(" = 1;")), "{corps}");
        assert!(retenue < b, "{corps}");
        assert!(a < position(corps, "return __t"), "{corps}");
        assert_eq!(corps.matches("_KF4Test_1b(contexte);").count(), 2, "{corps}");
        assert_eq!(corps.matches("_KF4Test_1a(contexte);").count(), 2, "{corps}");
    }

    #[test]
    fn differe_rejoue_regenere_ses_valeurs() {
        let src = "Couleur :: énum z32 { ROUGE; VERT = 5; }
                   fonc f(c : Couleur) {}
                   fonc principale() : z32 {
                       diffère { f(Couleur.VERT); }
                       si vrai { retourne 1; }
                       retourne 0;
                   }";
        let c = genere(src);
        let corps = &c[position(&c, "_KF4Test_10principale(ContexteProgramme *contexte)\n{")..];
        assert_eq!(corps.matches("_KF4Test_1f(contexte, 5);").count(), 2, "{corps}");
    }

    #[test]
    fn sansarret_garde_par_le_compteur() {
        let src = "fonc principale() : z32 {
                       r := 0;
                       pour i dans 1 ... 0 { r += 1; } sansarrêt { r += 100; }
                       retourne r;
                   }";
        let c = genere(src);
        let corps = &c[position(&c, "_KF4Test_10principale(ContexteProgramme *contexte)\n{")..];
        let garde = position(corps, " != 0) {");
        assert!(corps[..garde].ends_with(|c: char| c.is_ascii_digit()), "{corps}");
        assert!(garde < position(corps, "100"), "{corps}");
        assert!(!corps.contains(" == 0) {"), "{corps}");
    }

    #[test]
    fn loge_verifie_le_pointeur() {
        let src = "Vecteur2D :: struct { x : r32; y : r32 = 1.0; }
                   fonc principale() : z32 {
                       v := loge Vecteur2D;
                       v.x = 2.0;
                       déloge v;
                       retourne 0;
                   }";
        let c = genere(src);
        let corps = &c[position(&c, "_KF4Test_10principale(ContexteProgramme *contexte)\n{")..];
        let test_nul = position(corps, "== NULL");
        let panique = position(corps, "decl_panique_memoire(contexte");
        let usage = position(corps, "->x = ");
        assert!(test_nul < panique && panique < usage, "{corps}");
        assert!(c.contains("static void initialise_KsVecteur2D(KsVecteur2D *p)"), "{c}");
        assert!(corps.contains("contexte->allocatrice(2"), "{corps}");
    }

    #[test]
    fn types_emis_une_seule_fois() {
        let src = "Point :: struct { x : z32; y : z32; }
                   fonc a(p : Point) : z32 { retourne p.x; }
                   fonc b(p : Point) : z32 { retourne a(p) + p.y; }
                   fonc principale() : z32 { p : Point; retourne b(p); }";
        let c = genere(src);
        assert_eq!(c.matches("struct KsPoint {").count(), 1, "{c}");
        assert_eq!(c.matches("typedef struct KsPoint KsPoint;").count(), 1);
        assert_eq!(c.matches("_KF4Test_1a(ContexteProgramme *contexte, KsPoint p)\n{").count(), 1);
        // dépendances d'abord
        assert!(position(&c, "_KF4Test_1a(ContexteProgramme *contexte, KsPoint p)\n{")
            < position(&c, "_KF4Test_1b(ContexteProgramme *contexte, KsPoint p)\n{"));
    }

    #[test]
    fn fonctions_inatteignables_omises() {
        let c = genere("fonc inutile() : z32 { retourne 1; } fonc principale() : z32 { retourne 0; }");
        assert!(!c.contains("_KF4Test_7inutile"), "{c}");
    }

    #[test]
    fn boucles_etiquetees() {
        let src = "fonc principale() : z32 {
                       total := 0;
                       pour i dans 0 ... 9 {
                           pour j dans 0 ... 9 {
                               si j == 5 { arrête i; }
                               total += j;
                           }
                       }
                       retourne total;
                   }";
        let c = genere(src);
        assert!(c.contains("goto __boucle_pour_brise"), "{c}");
        assert!(c.contains("__boucle_pour_fin"));
        assert!(c.contains("__courant"));
    }

    #[test]
    fn coroutine_par_fils() {
        let src = "corout compte(n : z32) : z32 {
                       i := 0;
                       tantque i < n { retiens i; i += 1; }
                   }
                   fonc principale() : z32 {
                       total := 0;
                       pour x dans compte(3) { total += x; }
                       retourne total;
                   }";
        let c = genere(src);
        assert!(c.contains("typedef struct KC__KF4Test_6compte {"), "{c}");
        assert!(c.contains("static void *_KF4Test_6compte(void *KR__arg)"));
        assert!(c.contains("pthread_create("));
        assert!(c.contains("pthread_join("));
        assert!(c.contains("KR__etat->disponible = 1;"));
    }

    #[test]
    fn variadique_type() {
        let src = "fonc somme(args : ...z32) : z32 {
                       s := 0;
                       pour a dans args { s += a; }
                       retourne s;
                   }
                   fonc principale() : z32 { retourne somme(1, 2, 3); }";
        let c = genere(src);
        assert!(c.contains("struct KTD_int32_t { int32_t *pointeur; int64_t taille; };"), "{c}");
        assert!(c.contains("_KF4Test_5somme(ContexteProgramme *contexte, KTD_int32_t args)"));
    }

    #[test]
    fn union_sure_verifiee() {
        let src = "Nombre :: union { e : z32; r : r64; }
                   fonc principale() : z32 {
                       n : Nombre;
                       n.e = 5;
                       retourne n.e;
                   }";
        let c = genere(src);
        assert!(c.contains("int membre_actif;"), "{c}");
        assert!(c.contains("n.membre_actif = 1;"), "{c}");
        assert!(c.contains("decl_panique_membre_union(contexte"), "{c}");
    }

    #[test]
    fn eini_et_info_type() {
        let src = "fonc prend(e : eini) {}
                   fonc principale() : z32 { x : z64 = 5; prend(x); retourne 0; }";
        let c = genere(src);
        assert!(c.contains("((eini){ (void *)&x, (&__info_type"), "{c}");
        assert!(c.contains("static KsInfoType __info_type10 = { 10, 8, {"), "{c}");
    }

    #[test]
    fn traces_d_appel() {
        let src = "fonc un() : z32 { retourne 1; } fonc principale() : z32 { retourne un(); }";
        let c = genere_avec(src, true);
        assert!(c.contains("static const char *KR__fonction = \"principale\";"), "{c}");
        let sans = genere(src);
        assert!(c.matches("DEBUTE_RECORD_TRACE_APPEL(").count() > sans.matches("DEBUTE_RECORD_TRACE_APPEL(").count());
        assert!(c.matches("TERMINE_RECORD_TRACE_APPEL(").count() > sans.matches("TERMINE_RECORD_TRACE_APPEL(").count());
        assert!(!sans.contains("KR__fonction = "));
    }

    #[test]
    fn discrimination_de_chaine() {
        let src = "fonc principale() : z32 {
                       s := \"b\";
                       discr s {
                           \"a\" { retourne 1; }
                           \"b\" { retourne 2; }
                           sinon { retourne 3; }
                       }
                       retourne 0;
                   }";
        let c = genere(src);
        assert!(c.contains("KR__chaines_egales("), "{c}");
        assert!(c.contains("__fin_discr"));
    }
}
