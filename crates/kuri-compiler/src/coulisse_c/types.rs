//! Noms et définitions C des types, info-types et fonctions d'initialisation.

use kuri_ast::TypeId;

use super::{litteral_c, GeneratriceC};
use crate::broyage::{broye_nom_local, broye_nom_type};
use crate::typeuse::{Type, Typeuse};

impl GeneratriceC<'_> {
    /* ─────────── Noms ─────────── */

    /// Nom C d'un type.
    pub(crate) fn nom_c(&self, t: TypeId) -> String {
        match self.typeuse.type_(t) {
            Type::Rien | Type::Tuple(_) => "void".to_owned(),
            Type::Bool => "bool".to_owned(),
            Type::Octet => "octet".to_owned(),
            Type::Entier { signe: true, bits } => format!("int{bits}_t"),
            Type::Entier { signe: false, bits } => format!("uint{bits}_t"),
            Type::EntierConstant => "int32_t".to_owned(),
            Type::Reel { bits: 16 } => "r16".to_owned(),
            Type::Reel { bits: 32 } => "float".to_owned(),
            Type::Reel { .. } => "double".to_owned(),
            Type::Chaine => "chaine".to_owned(),
            Type::Eini => "eini".to_owned(),
            Type::Nul => "void *".to_owned(),
            Type::InfoType => "KsInfoType".to_owned(),
            Type::Pointeur(p) | Type::Reference(p) => {
                if *p == Typeuse::RIEN {
                    "void *".to_owned()
                } else {
                    format!("{} *", self.nom_c(*p))
                }
            }
            Type::TableauFixe { element, taille } => format!("KT{taille}_{}", self.ident_c(*element)),
            Type::TableauDynamique(e) | Type::Variadique(Some(e)) => format!("KTD_{}", self.ident_c(*e)),
            Type::Variadique(None) => "...".to_owned(),
            Type::Fonction { .. } => format!("KTFn{}", t.0),
            Type::Structure(_) | Type::Union(_) | Type::Enum(_) => self.nom_nominal(t),
        }
    }

    fn nom_nominal(&self, t: TypeId) -> String {
        if let Some(s) = self.typeuse.structure(t) {
            if s.est_externe {
                return s.nom.clone();
            }
            return broye_nom_type(&s.nom);
        }
        self.typeuse.enum_(t).map_or_else(|| "void".to_owned(), |e| broye_nom_type(&e.nom))
    }

    /// Nom C utilisable dans un identifiant composé.
    fn ident_c(&self, t: TypeId) -> String { self.nom_c(t).replace(" *", "_ptr").replace(' ', "_") }

    /// Type assignable avec `=` depuis un entier ou un pointeur.
    pub(crate) fn est_scalaire(&self, t: TypeId) -> bool {
        matches!(
            self.typeuse.type_(t),
            Type::Bool
                | Type::Octet
                | Type::Entier { .. }
                | Type::EntierConstant
                | Type::Reel { .. }
                | Type::Nul
                | Type::Pointeur(_)
                | Type::Reference(_)
                | Type::Fonction { .. }
                | Type::Enum(_)
        )
    }

    /// Structure ou union dont la définition est générée.
    pub(crate) fn a_initialisation(&self, t: TypeId) -> bool {
        self.typeuse.structure(t).is_some_and(|s| !s.est_externe)
    }

    /* ─────────── Définitions ─────────── */

    /// Déclarations anticipées puis définitions, chaque nom une seule fois.
    pub(crate) fn genere_types(&mut self) {
        let typeuse = self.typeuse;
        let mut declares = Vec::new();
        for (t, type_) in typeuse.iter() {
            let mot = match type_ {
                Type::Structure(_) | Type::Union(_) => match typeuse.structure(t) {
                    Some(s) if s.est_externe => continue,
                    Some(s) if s.est_union && !s.est_union_sure() => "union",
                    _ => "struct",
                },
                Type::TableauFixe { .. } | Type::TableauDynamique(_) | Type::Variadique(Some(_)) => "struct",
                _ => continue,
            };
            let nom = self.nom_c(t);
            if !declares.contains(&nom) {
                self.ligne(&format!("typedef {mot} {nom} {nom};"));
                declares.push(nom);
            }
        }
        for (t, _) in typeuse.iter() {
            self.emets_type(t);
        }
    }

    /// Émet la définition de `t` après celles dont elle a besoin par valeur.
    fn emets_type(&mut self, t: TypeId) {
        let typeuse = self.typeuse;
        match typeuse.type_(t) {
            Type::Pointeur(p) | Type::Reference(p) => self.emets_nom(*p),
            Type::Tuple(ts) => {
                for &e in ts {
                    self.emets_type(e);
                }
            }
            Type::TableauFixe { element, taille } => {
                let nom = self.nom_c(t);
                if !self.types_emis.insert(nom.clone()) {
                    return;
                }
                self.emets_type(*element);
                let e = self.nom_c(*element);
                self.ligne(&format!("struct {nom} {{ {e} d[{taille}]; }};"));
            }
            Type::TableauDynamique(e) | Type::Variadique(Some(e)) => {
                let nom = self.nom_c(t);
                if !self.types_emis.insert(nom.clone()) {
                    return;
                }
                self.emets_nom(*e);
                let e = self.nom_c(*e);
                self.ligne(&format!("struct {nom} {{ {e} *pointeur; int64_t taille; }};"));
            }
            Type::Fonction { entrees, sorties, est_coroutine, nulctx } => {
                let nom = self.nom_c(t);
                if !self.types_emis.insert(nom.clone()) {
                    return;
                }
                if *est_coroutine {
                    self.ligne(&format!("typedef void *(*{nom})(void *);"));
                    return;
                }
                for &x in entrees.iter().chain(sorties) {
                    self.emets_nom(x);
                }
                let mut parametres = Vec::new();
                if !*nulctx {
                    parametres.push("ContexteProgramme *".to_owned());
                }
                parametres.extend(entrees.iter().map(|&e| self.nom_c(e)));
                parametres.extend(sorties.iter().skip(1).map(|&s| format!("{} *", self.nom_c(s))));
                let retour = sorties.first().map_or_else(|| "void".to_owned(), |&s| self.nom_c(s));
                let parametres = if parametres.is_empty() { "void".to_owned() } else { parametres.join(", ") };
                self.ligne(&format!("typedef {retour} (*{nom})({parametres});"));
            }
            Type::Enum(_) => {
                let nom = self.nom_c(t);
                if !self.types_emis.insert(nom.clone()) {
                    return;
                }
                let sous_jacent = typeuse.enum_(t).map_or(Typeuse::Z32, |e| e.type_sous_jacent);
                self.ligne(&format!("typedef {} {nom};", self.nom_c(sous_jacent)));
            }
            Type::Structure(_) | Type::Union(_) => self.emets_structure(t),
            _ => {}
        }
    }

    /// Pour un composant vu à travers un pointeur : seul le nom doit exister.
    fn emets_nom(&mut self, t: TypeId) {
        if matches!(
            self.typeuse.type_(t),
            Type::Enum(_) | Type::Fonction { .. } | Type::Pointeur(_) | Type::Reference(_)
        ) {
            self.emets_type(t);
        }
    }

    fn emets_structure(&mut self, t: TypeId) {
        let typeuse = self.typeuse;
        let Some(s) = typeuse.structure(t) else { return };
        if s.est_externe {
            return;
        }
        let nom = self.nom_c(t);
        if !self.types_emis.insert(nom.clone()) {
            return;
        }
        for m in &s.membres {
            self.emets_type(m.type_);
        }
        let sure = s.est_union_sure();
        let mot = if s.est_union && !sure { "union" } else { "struct" };
        self.ouvre(&format!("{mot} {nom} {{"));
        if sure {
            self.ouvre("union {");
        }
        for m in &s.membres {
            self.ligne(&format!("{} {};", self.nom_c(m.type_), broye_nom_local(&m.nom)));
        }
        if s.membres.is_empty() {
            self.ligne("char KR__vide;");
        }
        if sure {
            self.ferme("};");
            self.ligne("int membre_actif;");
        }
        self.ferme("};");
    }

    /* ─────────── Info-types ─────────── */

    fn a_info_type(&self, t: TypeId) -> bool { !matches!(self.typeuse.type_(t), Type::Tuple(_) | Type::Variadique(None)) }

    /// `&__info_typeN` ; un entier constant est décrit comme `z32`.
    pub(crate) fn info_type(&self, t: TypeId) -> String {
        let t = if t == Typeuse::ENTIER_CONSTANT { Typeuse::Z32 } else { t };
        format!("(&__info_type{})", t.0)
    }

    pub(crate) fn genere_infos_types(&mut self) {
        let typeuse = self.typeuse;
        for (t, _) in typeuse.iter() {
            if self.a_info_type(t) {
                self.ligne(&format!("static KsInfoType __info_type{};", t.0));
            }
        }
        for (t, _) in typeuse.iter() {
            if !self.a_info_type(t) {
                continue;
            }
            let nom = typeuse.nom(t);
            self.ligne(&format!(
                "static KsInfoType __info_type{id} = {{ {id}, {taille}, {{ {lit}, {len} }} }};",
                id = t.0,
                taille = typeuse.taille_de(t),
                lit = litteral_c(&nom),
                len = nom.len()
            ));
        }
    }

    /* ─────────── Initialisation ─────────── */

    pub(crate) fn declare_initialisations(&mut self) {
        let typeuse = self.typeuse;
        for (t, _) in typeuse.iter() {
            if self.a_initialisation(t) {
                let nom = self.nom_c(t);
                self.ligne(&format!("static void initialise_{nom}({nom} *p);"));
            }
        }
    }

    /// Nom de la fonction d'initialisation, dont le corps sera émis.
    pub(crate) fn requiert_initialisation(&mut self, t: TypeId) -> String {
        self.initialisations.insert(t);
        format!("initialise_{}", self.nom_c(t))
    }

    /// Corps des fonctions d'initialisation demandées ; en générer une peut en
    /// demander d'autres.
    pub(crate) fn genere_initialisations(&mut self) {
        let mut i = 0;
        while let Some(&t) = self.initialisations.get_index(i) {
            self.genere_initialisation(t);
            i += 1;
        }
    }

    fn genere_initialisation(&mut self, t: TypeId) {
        let typeuse = self.typeuse;
        let Some(s) = typeuse.structure(t) else { return };
        let nom = self.nom_c(t);
        self.entre_fonction(&format!("initialise_{nom}"), true, false, false);
        self.ligne(&format!("static void initialise_{nom}({nom} *p)"));
        self.ouvre("{");
        self.ligne("ContexteProgramme *contexte = KR__contexte_global;");
        self.ligne("(void)contexte;");
        self.ligne("memset(p, 0, sizeof(*p));");
        if !s.est_union {
            self.blocs.push(Vec::new());
            for m in &s.membres {
                let cible = format!("p->{}", broye_nom_local(&m.nom));
                match m.defaut {
                    Some(d) => {
                        let v = self.expression(d);
                        self.ligne(&format!("{cible} = {v};"));
                    }
                    None if !self.est_scalaire(m.type_) => self.initialise_valeur(&cible, m.type_),
                    None => {}
                }
            }
            self.blocs.pop();
        }
        self.ferme("}");
        self.ligne("");
    }

    /// Valeur initiale d'une variable déclarée sans expression.
    pub(crate) fn initialise_valeur(&mut self, cible: &str, t: TypeId) {
        let typeuse = self.typeuse;
        match typeuse.type_(t) {
            Type::Structure(_) | Type::Union(_) if self.a_initialisation(t) => {
                let f = self.requiert_initialisation(t);
                self.ligne(&format!("{f}(&{cible});"));
            }
            Type::TableauFixe { element, taille } if self.a_initialisation(*element) => {
                let f = self.requiert_initialisation(*element);
                let i = format!("__i{}", self.nouvel_index());
                self.ligne(&format!("for (int64_t {i} = 0; {i} < {taille}; {i}++) {{"));
                self.ligne(&format!("    {f}(&({cible}).d[{i}]);"));
                self.ligne("}");
            }
            _ if self.est_scalaire(t) => self.ligne(&format!("{cible} = 0;")),
            _ => self.ligne(&format!("memset(&{cible}, 0, sizeof({cible}));")),
        }
    }
}
