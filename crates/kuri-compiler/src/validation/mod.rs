//! Validation sémantique : noms, types, surcharges, transformations et
//! graphe de dépendances.
//!
//! Chaque déclaration de haut niveau devient une unité de travail. Une unité
//! qui interroge une structure pas encore disposée est suspendue (`Attente`)
//! et remise en fin de file ; un tour complet de la file sans progrès est une
//! dépendance circulaire.

mod appel;
pub mod constante;
mod expression;
mod instruction;

use std::collections::VecDeque;

use indexmap::IndexMap;

use kuri_ast::{
    Assembleuse, ComposantType, ConversionR16, DrapeauxNoeud, Forme, GenreNoeud, NoeudId, TransformationType, TypeBase,
    TypeDeclare, TypeId,
};
use kuri_core::{Erreur, Resultat, Span, TypeErreur};
use kuri_lexer::GenreLexeme;

use crate::broyage::broye_nom_fonction;
use crate::graphe::{GrapheDependance, NoeudDependance};
use crate::modules::EspaceModules;
use crate::transformation::{cherche_transformation, ResultatTransformation};
use crate::typeuse::{MembreStructure, Type, Typeuse};

pub use constante::{evalue_constante, Constantes, ValeurConstante};

/* ─────────────────────────── Suspensions ─────────────────────────── */

/// Issue non réussie de la validation d'une unité.
#[derive(Debug)]
pub(crate) enum Suspension {
    /// Erreur définitive.
    Erreur(Erreur),
    /// Le type doit d'abord être validé.
    Attente(TypeId),
    /// La déclaration (fonction, globale) doit d'abord être typée.
    AttenteDeclaration(NoeudId),
}

impl From<Erreur> for Suspension {
    fn from(e: Erreur) -> Self { Self::Erreur(e) }
}

pub(crate) type ResultatValidation<T> = Result<T, Suspension>;

/* ─────────────────────────── Tables ─────────────────────────── */

#[derive(Debug, Clone)]
enum Symbole {
    Fonctions(Vec<NoeudId>),
    Type(TypeId),
    Globale { decl: NoeudId, cible: NoeudId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Unite {
    Type(NoeudId),
    Entete(NoeudId),
    Globale(NoeudId),
    Corps(NoeudId),
}

impl Unite {
    const fn decl(self) -> NoeudId {
        match self {
            Self::Type(d) | Self::Entete(d) | Self::Globale(d) | Self::Corps(d) => d,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Parametre {
    pub nom: String,
    pub type_: TypeId,
    pub defaut: Option<NoeudId>,
}

/// Signature calculée par la validation de l'en-tête d'une fonction.
#[derive(Debug, Clone)]
pub(crate) struct Signature {
    pub parametres: Vec<Parametre>,
    pub sorties: Vec<TypeId>,
    /// `Some(Some(T))` pour `...T`, `Some(None)` pour les variadiques C.
    pub variadique: Option<Option<TypeId>>,
    pub est_coroutine: bool,
    pub avec_contexte: bool,
}

/// Résultat de la validation, lu par la coulisse.
#[derive(Debug, Clone, Default)]
pub struct Programme {
    /// Fonction d'entrée, si elle existe.
    pub point_entree: Option<NoeudId>,
    /// Toutes les fonctions, dans l'ordre de déclaration.
    pub fonctions: Vec<NoeudId>,
    /// Déclarations de variables globales.
    pub globales: Vec<NoeudId>,
    /// Valeurs calculées à la compilation.
    pub constantes: Constantes,
    /// Arguments d'un appel dans l'ordre des paramètres (ou des membres
    /// pour une construction de structure) ; `None` : membre non fourni.
    pub appels: IndexMap<NoeudId, Vec<Option<NoeudId>>>,
}

/* ─────────────────────────── Validatrice ─────────────────────────── */

/// Validation d'un ensemble de fichiers analysés.
pub struct Validatrice<'a> {
    asm: &'a mut Assembleuse,
    typeuse: &'a mut Typeuse,
    graphe: &'a mut GrapheDependance,
    espace: &'a EspaceModules,
    symboles: IndexMap<String, Symbole>,
    signatures: IndexMap<NoeudId, Signature>,
    programme: Programme,

    // état de l'unité courante
    courant: Option<NoeudDependance>,
    fonction: Option<NoeudId>,
    portees: Vec<IndexMap<String, NoeudId>>,
    boucles: Vec<String>,
    differes: u32,
    coroutine_permise: bool,
}

impl<'a> Validatrice<'a> {
    /// Validatrice sur l'arène, la table des types et le graphe d'une compilation.
    pub fn new(
        asm: &'a mut Assembleuse,
        typeuse: &'a mut Typeuse,
        graphe: &'a mut GrapheDependance,
        espace: &'a EspaceModules,
    ) -> Self {
        Self {
            asm,
            typeuse,
            graphe,
            espace,
            symboles: IndexMap::new(),
            signatures: IndexMap::new(),
            programme: Programme::default(),
            courant: None,
            fonction: None,
            portees: Vec::new(),
            boucles: Vec::new(),
            differes: 0,
            coroutine_permise: false,
        }
    }

    /// Valide toutes les déclarations des racines données.
    pub fn valide(mut self, racines: &[NoeudId], point_entree: &str) -> Resultat<Programme> {
        let mut file = self.collecte(racines)?;
        log::debug!("validation : {} unité(s)", file.len());

        let mut sans_progres = 0usize;
        let mut attentes: IndexMap<Unite, Suspension> = IndexMap::new();

        while let Some(unite) = file.pop_front() {
            match self.valide_unite(unite) {
                Ok(()) => {
                    sans_progres = 0;
                    attentes.swap_remove(&unite);
                }
                Err(Suspension::Erreur(e)) => return Err(e),
                Err(attente) => {
                    log::trace!("unité {unite:?} suspendue : {attente:?}");
                    file.push_back(unite);
                    attentes.insert(unite, attente);
                    sans_progres += 1;
                    if sans_progres >= file.len() {
                        return Err(self.erreur_circulaire(unite, &attentes));
                    }
                }
            }
        }

        let entree = match self.symboles.get(point_entree) {
            Some(Symbole::Fonctions(v)) => v.first().copied(),
            _ => None,
        };
        if let Some(f) = entree {
            let n = self.asm.noeud(f);
            let sorties = self.signatures.get(&f).map(|s| s.sorties.clone()).unwrap_or_default();
            let parametres = n.comme_fonction().map_or(0, |d| d.parametres.len());
            if parametres != 0 || !matches!(sorties.as_slice(), [] | [Typeuse::Z32]) {
                return Err(Erreur::new(
                    TypeErreur::TypeArgument,
                    format!("« {point_entree} » ne doit prendre aucun paramètre et retourner rien ou z32"),
                    n.lexeme.span,
                ));
            }
        }
        self.programme.point_entree = entree;
        Ok(self.programme)
    }

    /* ─────────── Collecte ─────────── */

    fn collecte(&mut self, racines: &[NoeudId]) -> Resultat<VecDeque<Unite>> {
        let mut types = Vec::new();
        let mut entetes = Vec::new();
        let mut globales = Vec::new();
        let mut corps = Vec::new();

        for &racine in racines {
            for decl in self.asm.noeud(racine).forme.enfants() {
                let n = self.asm.noeud(decl);
                let nom = n.chaine().to_owned();
                let span = n.lexeme.span;
                match &n.forme {
                    Forme::DeclarationFonction(f) => {
                        let a_un_corps = f.bloc.is_some();
                        match self.symboles.entry(nom.clone()).or_insert_with(|| Symbole::Fonctions(Vec::new())) {
                            Symbole::Fonctions(v) => v.push(decl),
                            _ => return Err(redefinition(&nom, span)),
                        }
                        self.programme.fonctions.push(decl);
                        entetes.push(Unite::Entete(decl));
                        if a_un_corps {
                            corps.push(Unite::Corps(decl));
                        }
                    }
                    Forme::DeclarationStructure { est_union, .. } => {
                        if self.symboles.contains_key(&nom) {
                            return Err(redefinition(&nom, span));
                        }
                        let est_union = *est_union;
                        let est_nonsur = n.possede(DrapeauxNoeud::EST_NONSUR);
                        let est_externe = n.possede(DrapeauxNoeud::EST_EXTERNE);
                        let t = self.typeuse.cree_structure(&nom, Some(decl), est_union);
                        if let Some(s) = self.typeuse.structure_mut(t) {
                            s.est_nonsur = est_nonsur;
                            s.est_externe = est_externe;
                        }
                        self.asm.noeud_mut(decl).type_ = Some(t);
                        self.symboles.insert(nom, Symbole::Type(t));
                        types.push(Unite::Type(decl));
                    }
                    Forme::DeclarationEnum { .. } => {
                        if self.symboles.contains_key(&nom) {
                            return Err(redefinition(&nom, span));
                        }
                        let t = self.typeuse.cree_enum(&nom, Some(decl), Typeuse::Z32);
                        self.asm.noeud_mut(decl).type_ = Some(t);
                        self.symboles.insert(nom, Symbole::Type(t));
                        types.push(Unite::Type(decl));
                    }
                    Forme::DeclarationVariable { cible: Some(cible), .. } => {
                        for c in self.asm.aplatis_virgules(*cible) {
                            let nom = self.asm.noeud(c).chaine().to_owned();
                            if self.symboles.contains_key(&nom) {
                                return Err(redefinition(&nom, self.asm.noeud(c).lexeme.span));
                            }
                            let drapeaux = self.asm.noeud(decl).drapeaux & DrapeauxNoeud::EST_EXTERNE;
                            self.asm.noeud_mut(c).drapeaux |= DrapeauxNoeud::EST_GLOBALE | drapeaux;
                            self.symboles.insert(nom, Symbole::Globale { decl, cible: c });
                        }
                        self.programme.globales.push(decl);
                        globales.push(Unite::Globale(decl));
                    }
                    _ => {}
                }
            }
        }

        Ok(types.into_iter().chain(entetes).chain(globales).chain(corps).collect())
    }

    fn reinitialise(&mut self, courant: NoeudDependance) {
        self.courant = Some(courant);
        self.fonction = None;
        self.portees.clear();
        self.boucles.clear();
        self.differes = 0;
        self.coroutine_permise = false;
    }

    fn valide_unite(&mut self, unite: Unite) -> ResultatValidation<()> {
        match unite {
            Unite::Type(d) => {
                let t = self.type_de(d);
                self.reinitialise(NoeudDependance::Type(t));
                if self.asm.genre(d) == GenreNoeud::DeclarationEnum {
                    self.valide_enum(d, t)
                } else {
                    self.valide_structure(d, t)
                }
            }
            Unite::Entete(d) => {
                self.reinitialise(NoeudDependance::Fonction(d));
                self.valide_entete(d)
            }
            Unite::Globale(d) => {
                self.reinitialise(NoeudDependance::Globale(d));
                self.valide_declaration(d)
            }
            Unite::Corps(d) => {
                self.reinitialise(NoeudDependance::Fonction(d));
                self.valide_corps(d)
            }
        }
    }

    fn erreur_circulaire(&self, unite: Unite, attentes: &IndexMap<Unite, Suspension>) -> Erreur {
        let n = self.asm.noeud(unite.decl());
        let attendu = match attentes.get(&unite) {
            Some(Suspension::Attente(t)) => self.typeuse.nom(*t),
            Some(Suspension::AttenteDeclaration(d)) => self.asm.noeud(*d).chaine().to_owned(),
            _ => String::from("?"),
        };
        Erreur::new(
            TypeErreur::DependanceCirculaire,
            format!("Dépendance circulaire : « {} » attend « {attendu} »", n.chaine()),
            n.lexeme.span,
        )
    }

    /* ─────────── Structures et énums ─────────── */

    fn valide_structure(&mut self, decl: NoeudId, t: TypeId) -> ResultatValidation<()> {
        let Forme::DeclarationStructure { membres: noeuds, .. } = self.asm.noeud(decl).forme.clone() else {
            return Ok(());
        };
        let nom_structure = self.asm.noeud(decl).chaine().to_owned();

        let mut membres: Vec<MembreStructure> = Vec::with_capacity(noeuds.len());
        for &m in &noeuds {
            let (nom, type_declare, valeur, est_employe, span) = {
                let n = self.asm.noeud(m);
                let Forme::DeclarationVariable { valeur, .. } = n.forme else { continue };
                (n.chaine().to_owned(), n.type_declare.clone(), valeur, n.possede(DrapeauxNoeud::EST_EMPLOYE), n.lexeme.span)
            };
            let type_ = match (&type_declare, valeur) {
                (Some(td), _) => self.resous_type(td)?,
                (None, Some(v)) => {
                    self.valide_expression(v)?;
                    self.fige(v)?
                }
                (None, None) => {
                    return Err(Erreur::new(TypeErreur::Syntaxe, format!("Type du membre « {nom} » manquant"), span).into())
                }
            };
            if type_ == t {
                return Err(Erreur::new(
                    TypeErreur::DependanceCirculaire,
                    format!("La structure « {nom_structure} » ne peut se contenir elle-même"),
                    span,
                )
                .into());
            }
            if membres.iter().any(|x| x.nom == nom) {
                return Err(Erreur::new(TypeErreur::Redefinition, format!("Redéfinition du membre « {nom} »"), span).into());
            }
            if est_employe && self.typeuse.structure(type_).is_none() {
                return Err(Erreur::new(
                    TypeErreur::TypeArgument,
                    format!("Le membre employé « {nom} » doit être une structure"),
                    span,
                )
                .into());
            }
            self.asm.noeud_mut(m).type_ = Some(type_);
            membres.push(MembreStructure { nom, type_, decalage: 0, est_employe, defaut: valeur });
        }

        for m in &membres {
            self.graphe.ajoute_dependance(NoeudDependance::Type(t), NoeudDependance::Type(m.type_));
        }
        if let Some(s) = self.typeuse.structure_mut(t) {
            s.membres = membres.clone();
        }
        self.typeuse.calcule_disposition(t).map_err(Suspension::Attente)?;

        for (&m, membre) in noeuds.iter().zip(&membres) {
            let explicite = self.asm.noeud(m).type_declare.is_some();
            if let (Some(v), true) = (membre.defaut, explicite) {
                self.valide_expression(v)?;
                self.applique(v, membre.type_)?;
            }
        }
        log::trace!("structure « {nom_structure} » validée : {} octet(s)", self.typeuse.taille_de(t));
        Ok(())
    }

    fn valide_enum(&mut self, decl: NoeudId, t: TypeId) -> ResultatValidation<()> {
        let (noeuds, type_declare, span) = {
            let n = self.asm.noeud(decl);
            let Forme::DeclarationEnum { membres } = &n.forme else { return Ok(()) };
            (membres.clone(), n.type_declare.clone(), n.lexeme.span)
        };
        let sous_jacent = match &type_declare {
            Some(td) => self.resous_type(td)?,
            None => Typeuse::Z32,
        };
        if !self.typeuse.est_entier(sous_jacent) && sous_jacent != Typeuse::OCTET {
            return Err(Erreur::new(TypeErreur::TypeArgument, "Le type d'une énum doit être entier", span).into());
        }

        self.empile_portee();
        let mut valeurs: Vec<(String, i64)> = Vec::with_capacity(noeuds.len());
        let mut precedente: Option<i64> = None;
        let mut declares = Vec::with_capacity(2 * noeuds.len());
        for &m in &noeuds {
            let (nom, cible, valeur, span) = {
                let n = self.asm.noeud(m);
                let Forme::DeclarationVariable { cible: Some(cible), valeur } = n.forme else { continue };
                (n.chaine().to_owned(), cible, valeur, n.lexeme.span)
            };
            if valeurs.iter().any(|(n, _)| *n == nom) {
                return Err(Erreur::new(TypeErreur::Redefinition, format!("Redéfinition du membre « {nom} »"), span).into());
            }
            let v = match valeur {
                Some(e) => {
                    let te = self.valide_expression(e)?;
                    let constante = evalue_constante(self.asm, &self.programme.constantes, e).and_then(ValeurConstante::entier);
                    match constante {
                        Some(v) if self.typeuse.est_entier_ou_assimile(te) => v,
                        _ => {
                            return Err(Erreur::new(
                                TypeErreur::ExpressionNonConstante,
                                format!("La valeur de « {nom} » doit être une constante entière"),
                                self.asm.span_arbre(e),
                            )
                            .into())
                        }
                    }
                }
                None => precedente.map_or(0, |p| p.wrapping_add(1)),
            };
            precedente = Some(v);
            // dans le corps de l'énum, les membres se combinent comme des entiers
            for id in [m, cible] {
                self.programme.constantes.insert(id, ValeurConstante::Entier(v));
                let n = self.asm.noeud_mut(id);
                n.type_ = Some(sous_jacent);
                n.drapeaux |= DrapeauxNoeud::EST_CALCULE;
            }
            declares.extend([m, cible]);
            if let Forme::Reference { declaration } = &mut self.asm.noeud_mut(cible).forme {
                *declaration = Some(cible);
            }
            if let Some(p) = self.portees.last_mut() {
                p.insert(nom.clone(), cible);
            }
            valeurs.push((nom, v));
        }
        self.depile_portee();
        for id in declares {
            self.asm.noeud_mut(id).type_ = Some(t);
        }

        if let Some(e) = self.typeuse.enum_mut(t) {
            e.type_sous_jacent = sous_jacent;
            e.valeurs = valeurs;
            e.valide = true;
        }
        Ok(())
    }

    /* ─────────── Fonctions ─────────── */

    fn valide_entete(&mut self, decl: NoeudId) -> ResultatValidation<()> {
        let (nom, drapeaux, parametres, types_retour, span) = {
            let n = self.asm.noeud(decl);
            let Some(f) = n.comme_fonction() else { return Ok(()) };
            (n.chaine().to_owned(), n.drapeaux, f.parametres.clone(), f.types_retour.clone(), n.lexeme.span)
        };
        let est_externe = drapeaux.contains(DrapeauxNoeud::EST_EXTERNE);
        let est_coroutine = drapeaux.contains(DrapeauxNoeud::EST_COROUTINE);
        let nulctx = est_externe || drapeaux.contains(DrapeauxNoeud::FORCE_NULCTX);

        let mut params: Vec<Parametre> = Vec::with_capacity(parametres.len());
        let mut entrees = Vec::with_capacity(parametres.len());
        let mut variadique = None;

        for &p in &parametres {
            let (nom_p, cible, valeur, type_declare, span_p) = {
                let n = self.asm.noeud(p);
                let Forme::DeclarationVariable { cible: Some(cible), valeur } = n.forme else { continue };
                (n.chaine().to_owned(), cible, valeur, n.type_declare.clone(), n.lexeme.span)
            };
            if params.iter().any(|x| x.nom == nom_p) {
                return Err(Erreur::new(TypeErreur::Redefinition, format!("Redéfinition du paramètre « {nom_p} »"), span_p).into());
            }
            let t = match (&type_declare, valeur) {
                (Some(td), _) => self.resous_type(td)?,
                (None, Some(v)) => {
                    self.valide_expression(v)?;
                    self.fige(v)?
                }
                (None, None) => {
                    return Err(Erreur::new(TypeErreur::Syntaxe, format!("Type du paramètre « {nom_p} » manquant"), span_p).into())
                }
            };
            if let (Some(_), Some(v)) = (&type_declare, valeur) {
                self.valide_expression(v)?;
                self.applique(v, t)?;
            }

            let type_variable = match *self.typeuse.type_(t) {
                Type::Variadique(None) if !est_externe => {
                    return Err(Erreur::new(
                        TypeErreur::TypeArgument,
                        "Les arguments variadiques sans type sont réservés aux fonctions externes",
                        span_p,
                    )
                    .into())
                }
                Type::Variadique(e) => {
                    variadique = Some(e);
                    e.map_or(t, |e| self.typeuse.tableau_dynamique(e))
                }
                _ => t,
            };
            for id in [p, cible] {
                let n = self.asm.noeud_mut(id);
                n.type_ = Some(type_variable);
                n.drapeaux |= DrapeauxNoeud::EST_PARAMETRE;
            }
            if let Forme::Reference { declaration } = &mut self.asm.noeud_mut(cible).forme {
                *declaration = Some(cible);
            }
            self.utilise_type(type_variable);
            params.push(Parametre { nom: nom_p, type_: t, defaut: valeur });
            entrees.push(t);
        }

        let mut sorties = Vec::with_capacity(types_retour.len());
        for td in types_retour.iter().filter(|td| !td.est_rien()) {
            sorties.push(self.resous_type(td)?);
        }

        // deux surcharges de mêmes paramètres ne peuvent coexister
        let surcharges = match self.symboles.get(&nom) {
            Some(Symbole::Fonctions(v)) => v.clone(),
            _ => Vec::new(),
        };
        for autre in surcharges.iter().filter(|&&a| a != decl) {
            if let Some(s) = self.signatures.get(autre) {
                if s.parametres.iter().map(|p| p.type_).eq(params.iter().map(|p| p.type_)) {
                    return Err(Erreur::new(
                        TypeErreur::Redefinition,
                        format!("Redéfinition de la fonction « {nom} » avec les mêmes paramètres"),
                        span,
                    )
                    .into());
                }
            }
        }

        let type_fonction = self.typeuse.fonction(entrees, sorties.clone(), est_coroutine, nulctx);
        let nom_broye = if est_externe {
            nom.clone()
        } else {
            let index = surcharges.iter().position(|&a| a == decl).unwrap_or(0);
            broye_nom_fonction(&nom, self.espace.nom_module(span.source), index)
        };
        {
            let n = self.asm.noeud_mut(decl);
            n.type_ = Some(type_fonction);
            if let Some(f) = n.comme_fonction_mut() {
                f.nom_broye = nom_broye;
            }
        }
        self.utilise_type(type_fonction);
        self.signatures.insert(
            decl,
            Signature { parametres: params, sorties, variadique, est_coroutine, avec_contexte: !nulctx },
        );
        Ok(())
    }

    fn valide_corps(&mut self, decl: NoeudId) -> ResultatValidation<()> {
        let Some(signature) = self.signatures.get(&decl).cloned() else {
            return Err(Suspension::AttenteDeclaration(decl));
        };
        let (parametres, bloc, span, nom) = {
            let n = self.asm.noeud(decl);
            let Some(f) = n.comme_fonction() else { return Ok(()) };
            let Some(bloc) = f.bloc else { return Ok(()) };
            (f.parametres.clone(), bloc, n.lexeme.span, n.chaine().to_owned())
        };

        self.fonction = Some(decl);
        self.empile_portee();
        for p in parametres {
            if let Forme::DeclarationVariable { cible: Some(c), .. } = self.asm.noeud(p).forme {
                let nom = self.asm.noeud(c).chaine().to_owned();
                self.declare_locale(&nom, c)?;
            }
        }
        self.valide_bloc(bloc)?;
        self.depile_portee();

        if !signature.sorties.is_empty() && !signature.est_coroutine && !self.termine_par_retour(bloc) {
            return Err(Erreur::new(
                TypeErreur::ControleInvalide,
                format!("Instruction de retour manquante dans « {nom} »"),
                span,
            )
            .into());
        }
        log::trace!("fonction « {nom} » validée");
        Ok(())
    }

    /// Toute exécution du bloc se termine par `retourne` (approximation prudente).
    fn termine_par_retour(&self, bloc: NoeudId) -> bool {
        let n = self.asm.noeud(bloc);
        match &n.forme {
            Forme::Retour { .. } | Forme::Boucle { .. } => true,
            Forme::Bloc { expressions } => expressions.last().is_some_and(|&e| self.termine_par_retour(e)),
            Forme::NonSur { bloc: Some(b) } => self.termine_par_retour(*b),
            Forme::Si { bloc_si_vrai: Some(v), bloc_si_faux: Some(f), .. } => {
                self.termine_par_retour(*v) && self.termine_par_retour(*f)
            }
            Forme::Discr { paires, sinon: Some(s), .. } => {
                self.termine_par_retour(*s)
                    && paires.iter().all(|&p| match self.asm.noeud(p).forme {
                        Forme::PaireDiscr { bloc: Some(b), .. } => self.termine_par_retour(b),
                        _ => false,
                    })
            }
            _ => false,
        }
    }

    /* ─────────── Types déclarés ─────────── */

    /// Type canonique d'un type écrit dans la source.
    pub(crate) fn resous_type(&mut self, td: &TypeDeclare) -> ResultatValidation<TypeId> {
        let malforme = || Erreur::new(TypeErreur::Syntaxe, format!("Type malformé « {td} »"), td.span);
        let mut composants = td.composants.iter().rev();

        let mut t = match composants.next() {
            Some(ComposantType::Base(b)) => self.type_base(b, td.span)?,
            Some(ComposantType::TypeDe(e)) => {
                self.valide_expression(*e)?;
                self.fige(*e)?
            }
            Some(ComposantType::Fonction { est_coroutine, nulctx, entrees, sorties }) => {
                let mut e = Vec::with_capacity(entrees.len());
                for x in entrees {
                    e.push(self.resous_type(x)?);
                }
                let mut s = Vec::with_capacity(sorties.len());
                for x in sorties.iter().filter(|x| !x.est_rien()) {
                    s.push(self.resous_type(x)?);
                }
                self.typeuse.fonction(e, s, *est_coroutine, *nulctx)
            }
            Some(ComposantType::Variadique) if td.composants.len() == 1 => self.typeuse.variadique(None),
            _ => return Err(malforme().into()),
        };

        for c in composants {
            t = match c {
                ComposantType::Pointeur => self.typeuse.pointeur(t),
                ComposantType::Reference => self.typeuse.reference(t),
                ComposantType::Tableau(None) => self.typeuse.tableau_dynamique(t),
                ComposantType::Tableau(Some(n)) => {
                    let taille = self.taille_tableau(*n)?;
                    self.typeuse.tableau_fixe(t, taille)
                }
                ComposantType::Variadique => self.typeuse.variadique(Some(t)),
                _ => return Err(malforme().into()),
            };
        }
        self.utilise_type(t);
        Ok(t)
    }

    fn type_base(&self, base: &TypeBase, span: Span) -> ResultatValidation<TypeId> {
        Ok(match base {
            TypeBase::N8 => Typeuse::N8,
            TypeBase::N16 => Typeuse::N16,
            TypeBase::N32 => Typeuse::N32,
            TypeBase::N64 => Typeuse::N64,
            TypeBase::Z8 => Typeuse::Z8,
            TypeBase::Z16 => Typeuse::Z16,
            TypeBase::Z32 => Typeuse::Z32,
            TypeBase::Z64 => Typeuse::Z64,
            TypeBase::R16 => Typeuse::R16,
            TypeBase::R32 => Typeuse::R32,
            TypeBase::R64 => Typeuse::R64,
            TypeBase::Bool => Typeuse::BOOL,
            TypeBase::Rien => Typeuse::RIEN,
            TypeBase::Eini => Typeuse::EINI,
            TypeBase::Chaine => Typeuse::CHAINE,
            TypeBase::Octet => Typeuse::OCTET,
            TypeBase::Nomme(nom) if nom == "InfoType" => Typeuse::INFO_TYPE,
            TypeBase::Nomme(nom) => match self.symboles.get(nom) {
                Some(Symbole::Type(t)) => *t,
                _ => {
                    return Err(Erreur::new(TypeErreur::StructureInconnue, format!("Type inconnu « {nom} »"), span).into())
                }
            },
        })
    }

    fn taille_tableau(&mut self, expr: NoeudId) -> ResultatValidation<u64> {
        self.valide_expression(expr)?;
        match evalue_constante(self.asm, &self.programme.constantes, expr) {
            Some(ValeurConstante::Entier(v)) if v > 0 => Ok(v.unsigned_abs()),
            _ => Err(Erreur::new(
                TypeErreur::ExpressionNonConstante,
                "La taille d'un tableau doit être une constante entière positive",
                self.asm.span_arbre(expr),
            )
            .into()),
        }
    }

    /* ─────────── Portées ─────────── */

    fn empile_portee(&mut self) { self.portees.push(IndexMap::new()); }

    fn depile_portee(&mut self) { self.portees.pop(); }

    fn cherche_locale(&self, nom: &str) -> Option<NoeudId> {
        self.portees.iter().rev().find_map(|p| p.get(nom).copied())
    }

    /// Déclare une variable locale ; `decl` est la référence qui la déclare.
    fn declare_locale(&mut self, nom: &str, decl: NoeudId) -> ResultatValidation<()> {
        if self.cherche_locale(nom).is_some() {
            return Err(Erreur::new(
                TypeErreur::Redefinition,
                format!("Redéfinition de la variable « {nom} »"),
                self.asm.noeud(decl).lexeme.span,
            )
            .into());
        }
        if self.portees.is_empty() {
            self.empile_portee();
        }
        if let Some(p) = self.portees.last_mut() {
            p.insert(nom.to_owned(), decl);
        }
        Ok(())
    }

    /* ─────────── Outils ─────────── */

    fn type_de(&self, id: NoeudId) -> TypeId { self.asm.noeud(id).type_.unwrap_or(Typeuse::RIEN) }

    fn type_pose(&mut self, id: NoeudId, t: TypeId) -> TypeId {
        self.asm.noeud_mut(id).type_ = Some(t);
        self.utilise_type(t);
        t
    }

    fn utilise_type(&mut self, t: TypeId) {
        if let Some(c) = self.courant {
            if c != NoeudDependance::Type(t) {
                self.graphe.ajoute_dependance(c, NoeudDependance::Type(t));
            }
        }
    }

    fn utilise(&mut self, n: NoeudDependance) {
        if let Some(c) = self.courant {
            self.graphe.ajoute_dependance(c, n);
        }
    }

    fn est_valeur_gauche(&self, id: NoeudId) -> bool { self.asm.noeud(id).possede(DrapeauxNoeud::EST_VALEUR_GAUCHE) }

    fn erreur(&self, id: NoeudId, genre: TypeErreur, message: impl Into<String>) -> Suspension {
        Suspension::Erreur(Erreur::new(genre, message, self.asm.noeud(id).lexeme.span))
    }

    /// Fixe un entier littéral non typé à `z32`.
    fn fige(&mut self, id: NoeudId) -> ResultatValidation<TypeId> {
        let t = self.type_de(id);
        if t == Typeuse::ENTIER_CONSTANT {
            self.applique(id, Typeuse::Z32)?;
            return Ok(Typeuse::Z32);
        }
        Ok(t)
    }

    /// Calcule et pose la transformation qui amène la valeur de `id` au type `vers`.
    pub(crate) fn applique(&mut self, id: NoeudId, vers: TypeId) -> ResultatValidation<()> {
        let de = self.type_de(id);
        if de == Typeuse::R64 && self.typeuse.est_reel(vers) && self.est_litteral_reel(id) {
            if vers == Typeuse::R16 {
                self.asm.noeud_mut(id).transformation =
                    TransformationType::ConversionR16 { conversion: ConversionR16::DepuisR64, vers };
            } else {
                self.retype_litteral(id, vers);
            }
            return Ok(());
        }

        match cherche_transformation(self.typeuse, de, vers, false) {
            ResultatTransformation::Attente(t) => Err(Suspension::Attente(t)),
            ResultatTransformation::Trouvee(TransformationType::Impossible) => Err(self.erreur(
                id,
                TypeErreur::TypeArgument,
                format!("Impossible de convertir « {} » en « {} »", self.typeuse.nom(de), self.typeuse.nom(vers)),
            )),
            ResultatTransformation::Trouvee(TransformationType::PrendReference) if !self.est_valeur_gauche(id) => Err(
                self.erreur(id, TypeErreur::TypeArgument, "Impossible de prendre une référence sur une valeur non adressable"),
            ),
            ResultatTransformation::Trouvee(t) => {
                self.asm.noeud_mut(id).transformation = t;
                Ok(())
            }
        }
    }

    fn est_litteral_reel(&self, id: NoeudId) -> bool {
        let n = self.asm.noeud(id);
        match n.forme {
            Forme::NombreReel { .. } => true,
            Forme::ExpressionUnaire { operande: Some(o) }
                if matches!(n.lexeme.genre, GenreLexeme::MoinsUnaire | GenreLexeme::PlusUnaire) =>
            {
                self.est_litteral_reel(o)
            }
            _ => false,
        }
    }

    fn retype_litteral(&mut self, id: NoeudId, vers: TypeId) {
        let n = self.asm.noeud_mut(id);
        n.type_ = Some(vers);
        if let Forme::ExpressionUnaire { operande: Some(o) } = n.forme {
            self.retype_litteral(o, vers);
        }
    }
}

fn redefinition(nom: &str, span: Span) -> Erreur {
    Erreur::new(TypeErreur::Redefinition, format!("Redéfinition du symbole « {nom} »"), span)
}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use kuri_core::SourceId;
    use pretty_assertions::assert_eq;

    pub(crate) struct Valide {
        pub asm: Assembleuse,
        pub typeuse: Typeuse,
        pub graphe: GrapheDependance,
        pub programme: Programme,
        pub racine: NoeudId,
    }

    pub(crate) fn valide(src: &str) -> Result<Valide, Erreur> {
        let lexemes = kuri_lexer::lexe(src, SourceId(0)).unwrap();
        let mut asm = Assembleuse::new();
        let (racine, _) = kuri_parser::analyse_fichier(&lexemes, SourceId(0), &mut asm)?;
        let mut typeuse = Typeuse::new();
        let mut graphe = GrapheDependance::new();
        let mut espace = EspaceModules::new(None);
        let m = espace.cree_module("Test", None);
        espace.ajoute_fichier("test.kuri", None, src.to_owned(), m);
        let programme = Validatrice::new(&mut asm, &mut typeuse, &mut graphe, &espace).valide(&[racine], "principale")?;
        Ok(Valide { asm, typeuse, graphe, programme, racine })
    }

    pub(crate) fn erreur(src: &str) -> Erreur {
        match valide(src) {
            Ok(_) => panic!("erreur attendue pour {src:?}"),
            Err(e) => e,
        }
    }

    impl Valide {
        pub(crate) fn declaration(&self, nom: &str) -> NoeudId {
            self.asm.noeud(self.racine).forme.enfants().into_iter().find(|&d| self.asm.noeud(d).chaine() == nom).unwrap()
        }

        pub(crate) fn instructions(&self, fonction: &str) -> Vec<NoeudId> {
            let f = self.declaration(fonction);
            let bloc = self.asm.noeud(f).comme_fonction().unwrap().bloc.unwrap();
            self.asm.noeud(bloc).forme.enfants()
        }
    }

    #[test]
    fn fonction_simple() {
        let v = valide("fonc carre(x : z32) : z32 { retourne x * x; } fonc principale() {}").unwrap();
        let f = v.declaration("carre");
        assert_eq!(v.asm.noeud(f).comme_fonction().unwrap().nom_broye, "_KF4Test_5carre");
        assert_eq!(v.typeuse.nom(v.asm.noeud(f).type_.unwrap()), "fonc(z32)(z32)");
        assert_eq!(v.programme.point_entree, Some(v.declaration("principale")));
    }

    #[test]
    fn structures_dans_le_desordre() {
        let src = "A :: struct { b : B; x : z32; }
                   B :: struct { y : z64; }
                   fonc principale() { a : A; a.b.y = 3; }";
        let v = valide(src).unwrap();
        let a = v.asm.noeud(v.declaration("A")).type_.unwrap();
        assert_eq!(v.typeuse.taille_de(a), 16);
    }

    #[test]
    fn dependance_circulaire() {
        let e = erreur("A :: struct { b : B; } B :: struct { a : A; } fonc principale() {}");
        assert_eq!(e.genre, TypeErreur::DependanceCirculaire);
        assert!(e.message.starts_with("Dépendance circulaire"));

        let e = erreur("A :: struct { a : A; } fonc principale() {}");
        assert_eq!(e.genre, TypeErreur::DependanceCirculaire);
        // un pointeur vers soi-même est permis
        assert!(valide("Noeud :: struct { suivant : *Noeud; v : z32; } fonc principale() {}").is_ok());
    }

    #[test]
    fn valeurs_d_enum() {
        let v = valide("Couleur :: énum n8 { ROUGE; VERT = 5; BLEU; NOIR = VERT * 2; } fonc principale() {}").unwrap();
        let t = v.asm.noeud(v.declaration("Couleur")).type_.unwrap();
        let e = v.typeuse.enum_(t).unwrap();
        assert_eq!(e.valeurs, vec![("ROUGE".into(), 0), ("VERT".into(), 5), ("BLEU".into(), 6), ("NOIR".into(), 10)]);
        assert_eq!(e.type_sous_jacent, Typeuse::N8);

        let v = valide("Drapeau :: énum { A = 1; B = A << 1; C = A | B; } fonc principale() {}").unwrap();
        let t = v.asm.noeud(v.declaration("Drapeau")).type_.unwrap();
        let e = v.typeuse.enum_(t).unwrap();
        assert_eq!(e.valeurs, vec![("A".into(), 1), ("B".into(), 2), ("C".into(), 3)]);
    }

    #[test]
    fn redefinitions() {
        assert_eq!(erreur("S :: struct {} S :: struct {}").genre, TypeErreur::Redefinition);
        assert_eq!(erreur("fonc f(a : z32) {} fonc f(b : z32) {}").genre, TypeErreur::Redefinition);
        assert_eq!(erreur("fonc f() { x := 1; x := 2; }").genre, TypeErreur::Redefinition);
        assert!(valide("fonc f(a : z32) {} fonc f(a : r64) {} fonc principale() {}").is_ok());
    }

    #[test]
    fn surcharges_broyees_distinctement() {
        let v = valide("fonc f(a : z32) {} fonc f(a : r64) {} fonc principale() {}").unwrap();
        let noms: Vec<_> = v
            .programme
            .fonctions
            .iter()
            .map(|&f| v.asm.noeud(f).comme_fonction().unwrap().nom_broye.clone())
            .collect();
        assert_eq!(noms, vec!["_KF4Test_1f", "_KF4Test_1f_O1", "_KF4Test_10principale"]);
    }

    #[test]
    fn retour_manquant() {
        let e = erreur("fonc f(a : z32) : z32 { si a > 0 { retourne 1; } }");
        assert_eq!(e.genre, TypeErreur::ControleInvalide);
        assert!(valide("fonc f(a : z32) : z32 { si a > 0 { retourne 1; } sinon { retourne 2; } } fonc principale() {}").is_ok());
    }

    #[test]
    fn tableaux_de_taille_constante() {
        let v = valide("fonc principale() { t : [2 * 3]z32; }").unwrap();
        let decl = v.instructions("principale")[0];
        assert_eq!(v.typeuse.nom(v.asm.noeud(decl).type_.unwrap()), "[6]z32");
        let e = erreur("fonc f(n : z32) { t : [n]z32; }");
        assert_eq!(e.genre, TypeErreur::ExpressionNonConstante);
    }

    #[test]
    fn point_d_entree_absent() {
        let v = valide("fonc f() {}").unwrap();
        assert_eq!(v.programme.point_entree, None);
        assert_eq!(erreur("fonc principale(x : z32) {}").genre, TypeErreur::TypeArgument);
    }

    #[test]
    fn graphe_des_appels() {
        let v = valide("fonc g() : z32 { retourne 1; } fonc f() : z32 { retourne g(); } fonc principale() { f(); }").unwrap();
        let ordre = v.graphe.parcours(&[NoeudDependance::Fonction(v.declaration("principale"))]);
        let pos = |n: NoeudDependance| ordre.iter().position(|&x| x == n).unwrap();
        let (f, g) = (v.declaration("f"), v.declaration("g"));
        assert!(pos(NoeudDependance::Fonction(g)) < pos(NoeudDependance::Fonction(f)));
        assert!(ordre.contains(&NoeudDependance::Type(Typeuse::Z32)));
    }
}
