//! Abaissement des expressions.
//!
//! Chaque fonction émet d'abord les instructions dont la valeur a besoin
//! (temporaires, vérifications, appels) puis rend le texte C de la valeur.

use kuri_ast::{DrapeauxNoeud, Forme, NoeudId, Resolution, TypeId};
use kuri_lexer::GenreLexeme;

use super::{litteral_c, GeneratriceC};
use crate::broyage::broye_nom_local;
use crate::typeuse::{Type, Typeuse};
use crate::validation::ValeurConstante;

/// Texte C utilisable sans parenthèses devant `.`, `->` ou `[`.
pub(crate) fn est_simple(s: &str) -> bool {
    !s.is_empty()
        && !s.starts_with('-')
        && s.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']' | '-' | '>'))
}

pub(crate) fn entoure(s: &str) -> String {
    if est_simple(s) {
        s.to_owned()
    } else {
        format!("({s})")
    }
}

impl GeneratriceC<'_> {
    /// Valeur C d'un noeud, transformation comprise.
    pub(crate) fn expression(&mut self, id: NoeudId) -> String {
        // un différé rejoué régénère ses expressions
        self.valeurs_multiples.swap_remove(&id);
        let brut = self.expression_brute(id);
        self.applique_transformation(id, brut)
    }

    /// Valeurs d'une liste à virgules ou d'un appel à plusieurs retours.
    pub(crate) fn valeurs(&mut self, id: NoeudId) -> Vec<String> {
        let elements = self.asm.aplatis_virgules(id);
        if elements.len() > 1 {
            return elements.into_iter().map(|e| self.expression(e)).collect();
        }
        let valeur = self.expression(id);
        match self.valeurs_multiples.get(&id) {
            Some(v) => v.clone(),
            None => vec![valeur],
        }
    }

    /// Le texte désigne un objet adressable.
    pub(crate) fn est_adressable(&self, id: NoeudId, valeur: &str) -> bool {
        self.asm.noeud(id).possede(DrapeauxNoeud::EST_VALEUR_GAUCHE) || valeur.starts_with("__t")
    }

    fn expression_brute(&mut self, id: NoeudId) -> String {
        let asm = self.asm;
        let n = asm.noeud(id);
        let t = self.type_de(id);
        if let Some(&v) = self.programme.constantes.get(&id) {
            return self.litteral(v, t);
        }
        match &n.forme {
            Forme::NombreEntier { valeur } => self.litteral_entier(*valeur as i64, t),
            Forme::NombreReel { valeur } => self.litteral_reel(*valeur, t),
            Forme::Caractere { valeur } => valeur.to_string(),
            Forme::Booleen { valeur } => if *valeur { "1" } else { "0" }.to_owned(),
            Forme::Nul => "NULL".to_owned(),
            Forme::ChaineLitterale { valeur } => format!("((chaine){{ {}, {} }})", litteral_c(valeur), valeur.len()),
            Forme::Reference { declaration } => {
                declaration.map_or_else(|| broye_nom_local(n.chaine()), |d| self.nom_variable(d))
            }
            Forme::ExpressionBinaire { gauche: Some(g), droite: Some(d) } => self.binaire(id, *g, *d),
            Forme::ExpressionUnaire { operande: Some(o) } => self.unaire(id, *o),
            Forme::AccesMembre { structure: Some(s), membre, index_membre } => {
                self.acces_membre(id, *s, *membre, *index_membre)
            }
            Forme::Indexage { tableau: Some(a), index: Some(i) } => self.indexage(id, *a, *i),
            Forme::Virgule { .. } => {
                let valeurs: Vec<String> = asm.aplatis_virgules(id).into_iter().map(|e| self.expression(e)).collect();
                let premiere = valeurs.first().cloned().unwrap_or_default();
                self.valeurs_multiples.insert(id, valeurs);
                premiere
            }
            Forme::Appel { .. } => self.appel(id),
            Forme::TailleDe => "0".to_owned(),
            Forme::InfoDe { expression: Some(e) } => self.info_type(self.type_de(*e)),
            Forme::Memoire { expression: Some(e) } => {
                let v = self.expression(*e);
                format!("(*{})", entoure(&v))
            }
            Forme::Transtype { expression: Some(e) } | Forme::ExpansionVariadique { expression: Some(e) } => {
                self.expression(*e)
            }
            Forme::Loge { .. } => self.loge(id),
            Forme::Reloge { .. } => {
                self.reloge(id);
                String::new()
            }
            Forme::Deloge { .. } => {
                self.deloge(id);
                String::new()
            }
            Forme::ConstruitTableau { elements } => self.construit_tableau(id, elements),
            Forme::Si { .. } => self.si_expression(id),
            _ => {
                self.genere_instruction(id);
                String::new()
            }
        }
    }

    /* ─────────── Littéraux ─────────── */

    pub(crate) fn litteral(&self, v: ValeurConstante, t: TypeId) -> String {
        match v {
            ValeurConstante::Entier(e) => self.litteral_entier(e, t),
            ValeurConstante::Reel(r) => self.litteral_reel(r, t),
            ValeurConstante::Booleen(b) => if b { "1" } else { "0" }.to_owned(),
        }
    }

    pub(crate) fn litteral_entier(&self, v: i64, t: TypeId) -> String {
        match self.typeuse.type_(t) {
            Type::Reel { .. } => self.litteral_reel(v as f64, t),
            Type::Entier { signe: false, bits: 64 } => format!("UINT64_C({})", v as u64),
            Type::Pointeur(_) | Type::Nul => format!("(({}){v})", self.nom_c(t)),
            _ if v > i64::from(i32::MAX) || v < i64::from(i32::MIN) => format!("INT64_C({v})"),
            _ if v < 0 => format!("({v})"),
            _ => v.to_string(),
        }
    }

    pub(crate) fn litteral_reel(&self, r: f64, t: TypeId) -> String {
        let texte = if r < 0.0 { format!("({r:?})") } else { format!("{r:?}") };
        match self.typeuse.type_(t) {
            Type::Reel { bits: 16 } => format!("DLS_depuis_r64({texte})"),
            Type::Reel { bits: 32 } => format!("((float){texte})"),
            _ => texte,
        }
    }

    /* ─────────── Opérateurs ─────────── */

    fn binaire(&mut self, id: NoeudId, g: NoeudId, d: NoeudId) -> String {
        let genre = self.asm.noeud(id).lexeme.genre;
        if matches!(genre, GenreLexeme::EspEsp | GenreLexeme::BarreBarre) {
            return self.logique(genre, g, d);
        }
        let a = self.expression(g);
        let b = self.expression(d);
        let tg = self.type_de(g);
        let op = genre.chaine();
        if tg == Typeuse::CHAINE && matches!(genre, GenreLexeme::Egalite | GenreLexeme::Difference) {
            let negation = if genre == GenreLexeme::Difference { "!" } else { "" };
            return format!("({negation}KR__chaines_egales({a}, {b}))");
        }
        if tg == Typeuse::R16 {
            let calcul = format!("(DLS_vers_r32({a}) {op} DLS_vers_r32({b}))");
            return if genre.est_operateur_comparaison() { calcul } else { format!("DLS_depuis_r32{calcul}") };
        }
        if genre == GenreLexeme::Moins && self.typeuse.est_pointeur(tg) && self.typeuse.est_pointeur(self.type_de(d)) {
            return format!("((int64_t)({a} - {b}))");
        }
        format!("({a} {op} {b})")
    }

    /// `&&` et `||` court-circuités : l'opérande droit n'est évalué qu'au besoin.
    fn logique(&mut self, genre: GenreLexeme, g: NoeudId, d: NoeudId) -> String {
        let a = self.expression(g);
        let t = self.temporaire();
        self.ligne(&format!("bool {t} = {a};"));
        if genre == GenreLexeme::EspEsp {
            self.ouvre(&format!("if ({t}) {{"));
        } else {
            self.ouvre(&format!("if (!{t}) {{"));
        }
        let b = self.expression(d);
        self.ligne(&format!("{t} = {b};"));
        self.ferme("}");
        t
    }

    fn unaire(&mut self, id: NoeudId, o: NoeudId) -> String {
        let op = match self.asm.noeud(id).lexeme.genre {
            GenreLexeme::MoinsUnaire => "-",
            GenreLexeme::PlusUnaire => "+",
            GenreLexeme::Exclamation => "!",
            GenreLexeme::Tilde => "~",
            GenreLexeme::Arobase => "&",
            _ => "",
        };
        let v = self.expression(o);
        if self.type_de(o) == Typeuse::R16 && op == "-" {
            return format!("DLS_depuis_r32(-DLS_vers_r32({v}))");
        }
        format!("({op}{})", entoure(&v))
    }

    /* ─────────── Accès ─────────── */

    fn acces_membre(&mut self, id: NoeudId, s: NoeudId, membre: Option<NoeudId>, index: Option<u32>) -> String {
        let asm = self.asm;
        let typeuse = self.typeuse;
        let n = asm.noeud(id);
        let nom_membre = membre.map_or("", |m| asm.noeud(m).chaine());
        let base = self.expression(s);
        let ts = self.type_de(s);
        let (tb, fleche) = typeuse.pointe(ts).map_or((ts, false), |p| (p, true));
        let base = entoure(&base);
        let acces = |m: &str| if fleche { format!("{base}->{m}") } else { format!("{base}.{m}") };
        let cible = n.possede(DrapeauxNoeud::EST_CIBLE_ASSIGNATION);

        match typeuse.type_(tb) {
            Type::Structure(_) | Type::Union(_) => {
                let Some(donnees) = typeuse.structure(tb) else { return String::new() };
                let i = index.map_or_else(|| donnees.index_membre(nom_membre).unwrap_or(0), |i| i as usize);
                let Some(m) = donnees.membres.get(i) else { return String::new() };
                let champ = acces(&broye_nom_local(&m.nom));
                if donnees.est_union_sure() && self.nonsur == 0 {
                    let actif = acces("membre_actif");
                    if cible {
                        self.ligne(&format!("{actif} = {};", i + 1));
                    } else {
                        self.ouvre(&format!("if ({actif} != {}) {{", i + 1));
                        self.panique("decl_panique_membre_union", id);
                        self.ferme("}");
                    }
                }
                champ
            }
            Type::Chaine if nom_membre == "pointeur" && !cible => format!("((int8_t *){})", acces("pointeur")),
            Type::TableauFixe { .. } if nom_membre == "pointeur" => acces("d"),
            _ => acces(nom_membre),
        }
    }

    fn indexage(&mut self, id: NoeudId, a: NoeudId, i: NoeudId) -> String {
        let tableau = self.expression(a);
        let index = self.expression(i);
        let base = entoure(&tableau);
        let verifie = self.nonsur == 0;
        match self.typeuse.type_(self.type_de(a)) {
            Type::TableauFixe { taille, .. } => {
                if verifie {
                    self.verifie_index(id, &index, &taille.to_string());
                }
                format!("{base}.d[{index}]")
            }
            Type::TableauDynamique(_) | Type::Variadique(_) => {
                if verifie {
                    self.verifie_index(id, &index, &format!("{base}.taille"));
                }
                format!("{base}.pointeur[{index}]")
            }
            Type::Chaine => {
                if verifie {
                    self.verifie_index(id, &index, &format!("{base}.taille"));
                }
                format!("((int8_t *){base}.pointeur)[{index}]")
            }
            _ => format!("{base}[{index}]"),
        }
    }

    fn verifie_index(&mut self, id: NoeudId, index: &str, taille: &str) {
        self.ouvre(&format!("if ((int64_t)({index}) < 0 || (int64_t)({index}) >= (int64_t)({taille})) {{"));
        self.panique("decl_panique_tableau", id);
        self.ferme("}");
    }

    /* ─────────── Appels ─────────── */

    fn appel(&mut self, id: NoeudId) -> String {
        let asm = self.asm;
        let Forme::Appel { resolution: Some(resolution), .. } = asm.noeud(id).forme else { return String::new() };
        let emplacements = self.programme.appels.get(&id).cloned().unwrap_or_default();
        match resolution {
            Resolution::Structure(t) => self.construit_structure(t, &emplacements),
            Resolution::Fonction(f) => {
                let nom = asm.noeud(f).comme_fonction().map_or_else(String::new, |d| d.nom_broye.clone());
                self.appel_fonction(id, nom, self.type_de(f), &emplacements)
            }
            Resolution::Pointeur(v) => {
                let nom = self.nom_variable(v);
                self.appel_fonction(id, nom, self.type_de(v), &emplacements)
            }
        }
    }

    fn appel_fonction(&mut self, id: NoeudId, appele: String, t: TypeId, emplacements: &[Option<NoeudId>]) -> String {
        let typeuse = self.typeuse;
        let (sorties, nulctx) = match typeuse.type_(t) {
            Type::Fonction { sorties, nulctx, .. } => (sorties.as_slice(), *nulctx),
            _ => (&[][..], true),
        };
        let mut arguments = Vec::with_capacity(emplacements.len() + 1);
        if !nulctx {
            arguments.push("contexte".to_owned());
        }
        for &e in emplacements.iter().flatten() {
            arguments.push(self.expression(e));
        }
        let mut valeurs = Vec::with_capacity(sorties.len());
        for &s in sorties.iter().skip(1) {
            let t = self.temporaire();
            self.ligne(&format!("{} {t};", self.nom_c(s)));
            arguments.push(format!("&{t}"));
            valeurs.push(t);
        }
        let appel = format!("{appele}({})", arguments.join(", "));
        let trace = self.debute_trace(id);
        let resultat = match sorties.first() {
            Some(&s) => {
                let t = self.temporaire();
                self.ligne(&format!("{} {t} = {appel};", self.nom_c(s)));
                valeurs.insert(0, t.clone());
                t
            }
            None => {
                self.ligne(&format!("{appel};"));
                String::new()
            }
        };
        self.termine_trace(trace);
        if valeurs.len() > 1 {
            self.valeurs_multiples.insert(id, valeurs);
        }
        resultat
    }

    pub(crate) fn debute_trace(&mut self, id: NoeudId) -> Option<u32> {
        if !self.trace {
            return None;
        }
        let index = self.nouvel_index();
        let (l, c, texte) = self.position(id);
        self.ligne(&format!("DEBUTE_RECORD_TRACE_APPEL({index}, {l}, {c}, {});", litteral_c(&texte)));
        Some(index)
    }

    pub(crate) fn termine_trace(&mut self, trace: Option<u32>) {
        if let Some(index) = trace {
            self.ligne(&format!("TERMINE_RECORD_TRACE_APPEL({index});"));
        }
    }

    fn construit_structure(&mut self, t: TypeId, emplacements: &[Option<NoeudId>]) -> String {
        let typeuse = self.typeuse;
        let tmp = self.temporaire();
        self.ligne(&format!("{} {tmp};", self.nom_c(t)));
        self.initialise_valeur(&tmp, t);
        let Some(donnees) = typeuse.structure(t) else { return tmp };
        for (i, (e, m)) in emplacements.iter().zip(&donnees.membres).enumerate() {
            let Some(e) = *e else { continue };
            let v = self.expression(e);
            self.ligne(&format!("{tmp}.{} = {v};", broye_nom_local(&m.nom)));
            if donnees.est_union_sure() {
                self.ligne(&format!("{tmp}.membre_actif = {};", i + 1));
            }
        }
        tmp
    }

    fn construit_tableau(&mut self, id: NoeudId, elements: &[NoeudId]) -> String {
        let t = self.type_de(id);
        let nom = self.nom_c(t);
        if !matches!(self.typeuse.type_(t), Type::TableauFixe { .. }) {
            return format!("(({nom}){{ NULL, 0 }})");
        }
        let tmp = self.temporaire();
        self.ligne(&format!("{nom} {tmp};"));
        for (i, &e) in elements.iter().enumerate() {
            let v = self.expression(e);
            self.ligne(&format!("{tmp}.d[{i}] = {v};"));
        }
        tmp
    }

    /* ─────────── Si-expression ─────────── */

    fn si_expression(&mut self, id: NoeudId) -> String {
        let tmp = self.temporaire();
        self.ligne(&format!("{} {tmp};", self.nom_c(self.type_de(id))));
        self.si_valeur(id, &tmp);
        tmp
    }

    fn si_valeur(&mut self, id: NoeudId, tmp: &str) {
        let asm = self.asm;
        let n = asm.noeud(id);
        let Forme::Si { condition: Some(c), bloc_si_vrai: Some(v), bloc_si_faux: Some(f) } = n.forme else { return };
        let condition = self.expression(c);
        if n.lexeme.genre == GenreLexeme::Saufsi {
            self.ouvre(&format!("if (!{}) {{", entoure(&condition)));
        } else {
            self.ouvre(&format!("if ({condition}) {{"));
        }
        self.bloc_valeur(v, tmp);
        self.ferme("}");
        self.ouvre("else {");
        self.bloc_valeur(f, tmp);
        self.ferme("}");
    }

    fn bloc_valeur(&mut self, bloc: NoeudId, tmp: &str) {
        let asm = self.asm;
        let Forme::Bloc { expressions } = &asm.noeud(bloc).forme else {
            let v = self.expression(bloc);
            self.ligne(&format!("{tmp} = {v};"));
            return;
        };
        self.blocs.push(Vec::new());
        if let Some((&derniere, debut)) = expressions.split_last() {
            for &e in debut {
                self.genere_instruction(e);
            }
            let v = self.expression(derniere);
            self.ligne(&format!("{tmp} = {v};"));
        }
        self.sort_bloc();
    }

    /* ─────────── Mémoire ─────────── */

    fn appel_allocatrice(&self, id: NoeudId, mode: u8, nouvelle: &str, ancienne: &str, pointeur: &str, info: TypeId) -> String {
        format!(
            "contexte->allocatrice({mode}, {nouvelle}, {ancienne}, (void *){pointeur}, contexte->donnees_allocatrice, {}, {})",
            self.info_type(info),
            self.position_c(id)
        )
    }

    /// Élément C alloué pour une chaîne ou un tableau dynamique.
    fn element_alloue(&self, t: TypeId) -> (String, TypeId) {
        match self.typeuse.type_(t) {
            Type::Chaine => ("char".to_owned(), Typeuse::Z8),
            _ => {
                let e = self.typeuse.element(t).unwrap_or(Typeuse::OCTET);
                (self.nom_c(e), e)
            }
        }
    }

    fn echec_allocation(&mut self, condition: &str, bloc_sinon: Option<NoeudId>, id: NoeudId) {
        self.ouvre(&format!("if ({condition}) {{"));
        match bloc_sinon {
            Some(b) => self.genere_contenu_bloc(b),
            None => self.panique("decl_panique_memoire", id),
        }
        self.ferme("}");
    }

    fn loge(&mut self, id: NoeudId) -> String {
        let typeuse = self.typeuse;
        let Forme::Loge { taille, bloc_sinon } = self.asm.noeud(id).forme else { return String::new() };
        let t = self.type_de(id);
        let nom = self.nom_c(t);
        let tmp = self.temporaire();
        match typeuse.type_(t) {
            Type::Pointeur(p) => {
                let p = *p;
                let octets = format!("(int64_t)sizeof({})", self.nom_c(p));
                let appel = self.appel_allocatrice(id, 0, &octets, "0", "NULL", p);
                self.ligne(&format!("{nom} {tmp} = ({nom}){appel};"));
                self.echec_allocation(&format!("{tmp} == NULL"), bloc_sinon, id);
                if bloc_sinon.is_some() {
                    self.ouvre(&format!("if ({tmp} != NULL) {{"));
                    self.initialise_valeur(&format!("(*{tmp})"), p);
                    self.ferme("}");
                } else {
                    self.initialise_valeur(&format!("(*{tmp})"), p);
                }
            }
            _ => {
                let (element, info) = self.element_alloue(t);
                let n = taille.map_or_else(|| "0".to_owned(), |x| self.expression(x));
                self.ligne(&format!("{nom} {tmp};"));
                self.ligne(&format!("{tmp}.taille = {n};"));
                let octets = format!("{tmp}.taille * (int64_t)sizeof({element})");
                let appel = self.appel_allocatrice(id, 0, &octets, "0", "NULL", info);
                self.ligne(&format!("{tmp}.pointeur = ({element} *){appel};"));
                self.echec_allocation(&format!("{tmp}.pointeur == NULL && {tmp}.taille != 0"), bloc_sinon, id);
                if t != Typeuse::CHAINE && self.a_initialisation(info) {
                    let f = self.requiert_initialisation(info);
                    let i = format!("__i{}", self.nouvel_index());
                    self.ligne(&format!("for (int64_t {i} = 0; {tmp}.pointeur != NULL && {i} < {tmp}.taille; {i}++) {{"));
                    self.ligne(&format!("    {f}(&{tmp}.pointeur[{i}]);"));
                    self.ligne("}");
                }
            }
        }
        tmp
    }

    fn reloge(&mut self, id: NoeudId) {
        let typeuse = self.typeuse;
        let Forme::Reloge { expression: Some(e), taille, bloc_sinon } = self.asm.noeud(id).forme else { return };
        let cible = entoure(&self.expression(e));
        let t = self.type_de(e);
        let tmp = self.temporaire();
        match typeuse.type_(t) {
            Type::Pointeur(p) => {
                let octets = format!("(int64_t)sizeof({})", self.nom_c(*p));
                let appel = self.appel_allocatrice(id, 1, &octets, &octets, &cible, *p);
                self.ligne(&format!("void *{tmp} = {appel};"));
                self.echec_allocation(&format!("{tmp} == NULL"), bloc_sinon, id);
                self.ligne(&format!("{cible} = ({}){tmp};", self.nom_c(t)));
            }
            _ => {
                let (element, info) = self.element_alloue(t);
                let n = taille.map_or_else(|| format!("{cible}.taille"), |x| self.expression(x));
                let nouvelle = self.temporaire();
                self.ligne(&format!("int64_t {nouvelle} = {n};"));
                let appel = self.appel_allocatrice(
                    id,
                    1,
                    &format!("{nouvelle} * (int64_t)sizeof({element})"),
                    &format!("{cible}.taille * (int64_t)sizeof({element})"),
                    &format!("{cible}.pointeur"),
                    info,
                );
                self.ligne(&format!("void *{tmp} = {appel};"));
                self.echec_allocation(&format!("{tmp} == NULL && {nouvelle} != 0"), bloc_sinon, id);
                self.ligne(&format!("{cible}.pointeur = ({element} *){tmp};"));
                self.ligne(&format!("{cible}.taille = {nouvelle};"));
            }
        }
    }

    fn deloge(&mut self, id: NoeudId) {
        let typeuse = self.typeuse;
        let Forme::Deloge { expression: Some(e) } = self.asm.noeud(id).forme else { return };
        let cible = entoure(&self.expression(e));
        let t = self.type_de(e);
        match typeuse.type_(t) {
            Type::Pointeur(p) => {
                let octets = format!("(int64_t)sizeof({})", self.nom_c(*p));
                let appel = self.appel_allocatrice(id, 2, "0", &octets, &cible, *p);
                self.ligne(&format!("{appel};"));
                self.ligne(&format!("{cible} = NULL;"));
            }
            _ => {
                let (element, info) = self.element_alloue(t);
                let ancienne = format!("{cible}.taille * (int64_t)sizeof({element})");
                let appel = self.appel_allocatrice(id, 2, "0", &ancienne, &format!("{cible}.pointeur"), info);
                self.ligne(&format!("{appel};"));
                self.ligne(&format!("{cible}.pointeur = NULL;"));
                self.ligne(&format!("{cible}.taille = 0;"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parentheses_au_besoin() {
        assert_eq!(entoure("x"), "x");
        assert_eq!(entoure("p->a.b[3]"), "p->a.b[3]");
        assert_eq!(entoure("(a + b)"), "((a + b))");
        assert_eq!(entoure("-1"), "(-1)");
        assert_eq!(entoure("f(x)"), "(f(x))");
        assert!(!est_simple(""));
    }
}
