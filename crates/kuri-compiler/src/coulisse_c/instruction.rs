//! Abaissement des instructions : blocs, différés, boucles, discriminations.
//!
//! Les blocs `diffère` sont empilés par bloc englobant et rejoués en ordre
//! inverse à chaque sortie : fin du bloc, `retourne`, `arrête`, `continue`.

use kuri_ast::{DrapeauxNoeud, Forme, GenreNoeud, NoeudId, Resolution};
use kuri_lexer::GenreLexeme;

use super::expression::entoure;
use super::{CadreBoucle, GeneratriceC};
use crate::typeuse::{Type, Typeuse};

/// Ce que parcourt une boucle `pour`.
enum Iteration {
    Plage { courant: String, fin: String },
    Tableau { pointeur: String, taille: String },
    Coroutine { etat: String, fil: String },
}

impl GeneratriceC<'_> {
    /* ─────────── Blocs ─────────── */

    /// Bloc entre accolades.
    pub(crate) fn genere_bloc(&mut self, id: NoeudId) {
        self.ouvre("{");
        self.genere_contenu_bloc(id);
        self.ferme("}");
    }

    /// Instructions d'un bloc, suivies de ses différés.
    pub(crate) fn genere_contenu_bloc(&mut self, id: NoeudId) {
        let asm = self.asm;
        let Forme::Bloc { expressions } = &asm.noeud(id).forme else {
            self.blocs.push(Vec::new());
            self.genere_instruction(id);
            self.sort_bloc();
            return;
        };
        self.blocs.push(Vec::new());
        for &e in expressions {
            self.genere_instruction(e);
        }
        // après un `retourne` final, les différés ont déjà été émis
        if expressions.last().is_some_and(|&e| asm.genre(e) == GenreNoeud::Retour) {
            self.blocs.pop();
        } else {
            self.sort_bloc();
        }
    }

    /// Dépile le bloc courant et émet ses différés.
    pub(crate) fn sort_bloc(&mut self) {
        if let Some(differes) = self.blocs.pop() {
            for &d in differes.iter().rev() {
                self.genere_bloc(d);
            }
        }
    }

    /// Différés des blocs `blocs[depuis..]`, du plus interne au plus externe.
    fn emets_differes(&mut self, depuis: usize) {
        let cadres: Vec<Vec<NoeudId>> = self.blocs.get(depuis..).map(<[_]>::to_vec).unwrap_or_default();
        for cadre in cadres.iter().rev() {
            for &d in cadre.iter().rev() {
                self.genere_bloc(d);
            }
        }
    }

    pub(crate) fn genere_instruction(&mut self, id: NoeudId) {
        let asm = self.asm;
        match &asm.noeud(id).forme {
            Forme::DeclarationVariable { cible: Some(cible), valeur } => self.declaration(*cible, *valeur),
            Forme::Assignation { cible: Some(cible), valeur: Some(valeur) } => self.assignation(id, *cible, *valeur),
            Forme::Si { .. } => self.si(id),
            Forme::Bloc { .. } => self.genere_bloc(id),
            Forme::Retour { expression } => self.retour(*expression),
            Forme::Retiens { expression } => self.retiens(*expression),
            Forme::Boucle { .. } | Forme::Repete { .. } | Forme::Tantque { .. } => self.boucle(id),
            Forme::Pour { .. } => self.pour(id),
            Forme::Controle { etiquette } => self.controle(id, *etiquette),
            Forme::Discr { .. } => self.discr(id),
            Forme::Differe { bloc: Some(b) } => {
                if let Some(cadre) = self.blocs.last_mut() {
                    cadre.push(*b);
                }
            }
            Forme::NonSur { bloc: Some(b) } => {
                self.nonsur += 1;
                self.genere_bloc(*b);
                self.nonsur -= 1;
            }
            Forme::DeclarationFonction(_)
            | Forme::DeclarationStructure { .. }
            | Forme::DeclarationEnum { .. }
            | Forme::Importe
            | Forme::Charge
            | Forme::Differe { bloc: None }
            | Forme::NonSur { bloc: None } => {}
            _ => {
                let _ = self.expression(id);
            }
        }
    }

    /* ─────────── Déclarations et assignations ─────────── */

    fn declaration(&mut self, cible: NoeudId, valeur: Option<NoeudId>) {
        let cibles = self.asm.aplatis_virgules(cible);
        let valeurs = valeur.map(|v| self.valeurs(v)).unwrap_or_default();
        for (i, &c) in cibles.iter().enumerate() {
            let t = self.type_de(c);
            let nom = self.nom_variable(c);
            let type_c = self.nom_c(t);
            match valeurs.get(i) {
                Some(v) => self.ligne(&format!("{type_c} {nom} = {v};")),
                None => {
                    self.ligne(&format!("{type_c} {nom};"));
                    self.initialise_valeur(&nom, t);
                }
            }
        }
    }

    fn assignation(&mut self, id: NoeudId, cible: NoeudId, valeur: NoeudId) {
        let cibles = self.asm.aplatis_virgules(cible);
        if cibles.len() == 1 {
            let v = self.expression(valeur);
            let c = self.expression(cible);
            let op = self.asm.noeud(id).lexeme.genre;
            if self.type_de(cible) == Typeuse::R16 && op != GenreLexeme::Egal {
                let operateur = op.chaine().trim_end_matches('=');
                self.ligne(&format!("{c} = DLS_depuis_r32(DLS_vers_r32({c}) {operateur} DLS_vers_r32({v}));"));
            } else {
                self.ligne(&format!("{c} {} {v};", op.chaine()));
            }
            return;
        }
        // toutes les sources sont évaluées avant la première écriture
        let valeurs = self.valeurs(valeur);
        let mut temporaires = Vec::with_capacity(valeurs.len());
        for (&c, v) in cibles.iter().zip(&valeurs) {
            let tmp = self.temporaire();
            self.ligne(&format!("{} {tmp} = {v};", self.nom_c(self.type_de(c))));
            temporaires.push(tmp);
        }
        for (&c, tmp) in cibles.iter().zip(&temporaires) {
            let c = self.expression(c);
            self.ligne(&format!("{c} = {tmp};"));
        }
    }

    /* ─────────── Conditions ─────────── */

    fn si(&mut self, id: NoeudId) {
        let asm = self.asm;
        let n = asm.noeud(id);
        let Forme::Si { condition: Some(c), bloc_si_vrai, bloc_si_faux } = n.forme else { return };
        let condition = self.expression(c);
        if n.lexeme.genre == GenreLexeme::Saufsi {
            self.ouvre(&format!("if (!{}) {{", entoure(&condition)));
        } else {
            self.ouvre(&format!("if ({condition}) {{"));
        }
        if let Some(b) = bloc_si_vrai {
            self.genere_contenu_bloc(b);
        }
        if let Some(f) = bloc_si_faux {
            self.ferme("}");
            self.ouvre("else {");
            if asm.genre(f) == GenreNoeud::Si {
                self.si(f);
            } else {
                self.genere_contenu_bloc(f);
            }
        }
        self.ferme("}");
    }

    fn discr(&mut self, id: NoeudId) {
        let asm = self.asm;
        let typeuse = self.typeuse;
        let Forme::Discr { expression: Some(e), paires, sinon } = &asm.noeud(id).forme else { return };
        let te = self.type_de(*e);
        let union_sure = typeuse.structure(te).is_some_and(|s| s.est_union_sure());
        let fin = format!("__fin_discr{}", self.nouvel_index());
        let valeur = self.expression(*e);
        self.ouvre("{");
        let sujet = self.temporaire();
        self.ligne(&format!("{} {sujet} = {valeur};", self.nom_c(te)));
        for &paire in paires {
            let Forme::PaireDiscr { valeurs, bloc } = asm.noeud(paire).forme else { continue };
            let mut conditions = Vec::new();
            for v in valeurs.map(|v| asm.aplatis_virgules(v)).unwrap_or_default() {
                if union_sure {
                    let index = self.programme.constantes.get(&v).and_then(|c| c.entier()).unwrap_or(0);
                    conditions.push(format!("{sujet}.membre_actif == {index}"));
                } else if te == Typeuse::CHAINE {
                    let x = self.expression(v);
                    conditions.push(format!("KR__chaines_egales({sujet}, {x})"));
                } else {
                    let x = self.expression(v);
                    conditions.push(format!("{sujet} == {x}"));
                }
            }
            if conditions.is_empty() {
                continue;
            }
            self.ouvre(&format!("if ({}) {{", conditions.join(" || ")));
            if let Some(b) = bloc {
                self.genere_bloc(b);
            }
            self.ligne(&format!("goto {fin};"));
            self.ferme("}");
        }
        match sinon {
            Some(s) => self.genere_bloc(*s),
            None if union_sure => self.panique("decl_panique_erreur", id),
            None => {}
        }
        self.ligne(&format!("{fin}:;"));
        self.ferme("}");
    }

    /* ─────────── Sorties ─────────── */

    fn retour(&mut self, expression: Option<NoeudId>) {
        let valeurs = expression.map(|e| self.valeurs(e)).unwrap_or_default();
        let pending = self.blocs.iter().any(|b| !b.is_empty());
        // les différés pourraient modifier les variables rendues
        let valeurs = if pending && !self.coroutine {
            let sorties = self.sorties.clone();
            valeurs
                .into_iter()
                .enumerate()
                .map(|(i, v)| {
                    let t = sorties.get(i).copied().unwrap_or(Typeuse::Z32);
                    let tmp = self.temporaire();
                    self.ligne(&format!("{} {tmp} = {v};", self.nom_c(t)));
                    tmp
                })
                .collect()
        } else {
            valeurs
        };
        self.emets_differes(0);
        if self.coroutine {
            self.ligne("goto __fin_coroutine;");
            return;
        }
        for (i, v) in valeurs.iter().enumerate().skip(1) {
            self.ligne(&format!("*__ret{i} = {v};"));
        }
        match valeurs.first() {
            Some(v) => self.ligne(&format!("return {v};")),
            None => self.ligne("return;"),
        }
    }

    /// Publie des valeurs puis attend que la boucle les ait consommées.
    fn retiens(&mut self, expression: Option<NoeudId>) {
        let valeurs = expression.map(|e| self.valeurs(e)).unwrap_or_default();
        self.ligne("pthread_mutex_lock(&KR__etat->mutex_boucle);");
        for (i, v) in valeurs.iter().enumerate() {
            self.ligne(&format!("KR__etat->__ret{i} = {v};"));
        }
        self.ligne("KR__etat->disponible = 1;");
        self.ligne("pthread_cond_signal(&KR__etat->cond_boucle);");
        self.ligne("pthread_mutex_unlock(&KR__etat->mutex_boucle);");
        self.ligne("pthread_mutex_lock(&KR__etat->mutex_coro);");
        self.ouvre("while (!KR__etat->reprise) {");
        self.ligne("pthread_cond_wait(&KR__etat->cond_coro, &KR__etat->mutex_coro);");
        self.ferme("}");
        self.ligne("KR__etat->reprise = 0;");
        self.ligne("pthread_mutex_unlock(&KR__etat->mutex_coro);");
    }

    fn controle(&mut self, id: NoeudId, etiquette: Option<NoeudId>) {
        let asm = self.asm;
        let est_arrete = asm.noeud(id).lexeme.genre == GenreLexeme::Arrete;
        let cadre = match etiquette {
            Some(e) => {
                let nom = asm.noeud(e).chaine();
                self.boucles.iter().rev().find(|b| b.etiquette == nom).cloned()
            }
            None => self.boucles.last().cloned(),
        };
        let Some(cadre) = cadre else { return };
        self.emets_differes(cadre.profondeur);
        let cible = if est_arrete { cadre.arrete } else { cadre.continue_ };
        self.ligne(&format!("goto {cible};"));
    }

    /* ─────────── Boucles ─────────── */

    fn boucle(&mut self, id: NoeudId) {
        let asm = self.asm;
        let index = self.nouvel_index();
        let continue_ = format!("__continue_boucle{index}");
        let arrete = format!("__arrete_boucle{index}");
        let cadre = CadreBoucle {
            etiquette: String::new(),
            continue_: continue_.clone(),
            arrete: arrete.clone(),
            profondeur: self.blocs.len(),
        };
        self.ouvre("while (1) {");
        match asm.noeud(id).forme {
            Forme::Tantque { condition, bloc } => {
                if let Some(c) = condition {
                    let c = self.expression(c);
                    self.ligne(&format!("if (!{}) {{ goto {arrete}; }}", entoure(&c)));
                }
                self.corps_boucle(cadre, bloc);
                self.ligne(&format!("{continue_}:;"));
            }
            Forme::Repete { bloc, condition } => {
                self.corps_boucle(cadre, bloc);
                self.ligne(&format!("{continue_}:;"));
                if let Some(c) = condition {
                    let c = self.expression(c);
                    self.ligne(&format!("if (!{}) {{ goto {arrete}; }}", entoure(&c)));
                }
            }
            Forme::Boucle { bloc } => {
                self.corps_boucle(cadre, bloc);
                self.ligne(&format!("{continue_}:;"));
            }
            _ => {}
        }
        self.ferme("}");
        self.ligne(&format!("{arrete}:;"));
    }

    fn corps_boucle(&mut self, cadre: CadreBoucle, bloc: Option<NoeudId>) {
        self.boucles.push(cadre);
        if let Some(b) = bloc {
            self.genere_bloc(b);
        }
        self.boucles.pop();
    }

    fn pour(&mut self, id: NoeudId) {
        let asm = self.asm;
        let typeuse = self.typeuse;
        let Forme::Pour { variable: Some(variable), expression: Some(expression), bloc, bloc_sansarret, bloc_sinon } =
            asm.noeud(id).forme
        else {
            return;
        };
        let variables = asm.aplatis_virgules(variable);
        let n = self.nouvel_index();
        let compteur = format!("__index{n}");
        let continue_ = format!("__continue_boucle_pour{n}");
        let post = format!("__boucle_pour_post{n}");
        let brise = format!("__boucle_pour_brise{n}");
        let fin = format!("__boucle_pour_fin{n}");
        let etiquette = variables.first().map(|&v| asm.noeud(v).chaine().to_owned()).unwrap_or_default();

        self.ouvre("{");
        self.ligne(&format!("int64_t {compteur} = 0;"));
        let coroutine = match asm.noeud(expression).forme {
            Forme::Appel { resolution: Some(Resolution::Fonction(f)), .. }
                if asm.noeud(f).possede(DrapeauxNoeud::EST_COROUTINE) =>
            {
                Some(f)
            }
            _ => None,
        };
        let te = self.type_de(expression);
        let iteration = if let Some(f) = coroutine {
            self.lance_coroutine(expression, f, n)
        } else if let Forme::Plage { debut: Some(debut), fin: Some(fin_plage) } = asm.noeud(expression).forme {
            let d = self.expression(debut);
            let f = self.expression(fin_plage);
            let type_c = self.nom_c(te);
            let courant = format!("__courant{n}");
            let fin_c = format!("__fin{n}");
            self.ligne(&format!("{type_c} {courant} = {d};"));
            self.ligne(&format!("{type_c} {fin_c} = {f};"));
            Iteration::Plage { courant, fin: fin_c }
        } else {
            let tableau = self.expression(expression);
            let element = typeuse.element(te).unwrap_or(Typeuse::OCTET);
            let type_element = self.nom_c(element);
            let pointeur = format!("__ptr{n}");
            let source = format!("__tab{n}");
            self.ligne(&format!("{} {source} = {tableau};", self.nom_c(te)));
            let taille = match typeuse.type_(te) {
                Type::TableauFixe { taille, .. } => {
                    self.ligne(&format!("{type_element} *{pointeur} = {source}.d;"));
                    taille.to_string()
                }
                _ => {
                    self.ligne(&format!("{type_element} *{pointeur} = ({type_element} *){source}.pointeur;"));
                    format!("{source}.taille")
                }
            };
            Iteration::Tableau { pointeur, taille }
        };

        self.ouvre("while (1) {");
        let types_variables: Vec<_> = variables.iter().map(|&v| (self.nom_c(self.type_de(v)), self.nom_variable(v))).collect();
        match &iteration {
            Iteration::Plage { courant, fin: fin_c } => {
                self.ligne(&format!("if ({courant} > {fin_c}) {{ goto {post}; }}"));
                if let Some((t, nom)) = types_variables.first() {
                    self.ligne(&format!("{t} {nom} = {courant};"));
                }
            }
            Iteration::Tableau { pointeur, taille } => {
                self.ligne(&format!("if ({compteur} >= {taille}) {{ goto {post}; }}"));
                if let Some((t, nom)) = types_variables.first() {
                    self.ligne(&format!("{t} {nom} = {pointeur}[{compteur}];"));
                }
            }
            Iteration::Coroutine { etat, .. } => {
                self.ligne(&format!("pthread_mutex_lock(&{etat}.mutex_boucle);"));
                self.ouvre(&format!("while (!{etat}.disponible && !{etat}.termine) {{"));
                self.ligne(&format!("pthread_cond_wait(&{etat}.cond_boucle, &{etat}.mutex_boucle);"));
                self.ferme("}");
                self.ouvre(&format!("if (!{etat}.disponible) {{"));
                self.ligne(&format!("pthread_mutex_unlock(&{etat}.mutex_boucle);"));
                self.ligne(&format!("goto {post};"));
                self.ferme("}");
                self.ligne(&format!("{etat}.disponible = 0;"));
                for (i, (t, nom)) in types_variables.iter().enumerate() {
                    self.ligne(&format!("{t} {nom} = {etat}.__ret{i};"));
                }
                self.ligne(&format!("pthread_mutex_unlock(&{etat}.mutex_boucle);"));
            }
        }
        if !matches!(iteration, Iteration::Coroutine { .. }) {
            if let Some((t, nom)) = types_variables.get(1) {
                self.ligne(&format!("{t} {nom} = {compteur};"));
            }
        }

        let cadre = CadreBoucle { etiquette, continue_: continue_.clone(), arrete: brise.clone(), profondeur: self.blocs.len() };
        self.corps_boucle(cadre, bloc);
        self.ligne(&format!("{continue_}:;"));
        self.ligne(&format!("{compteur} += 1;"));
        match &iteration {
            Iteration::Plage { courant, .. } => self.ligne(&format!("{courant} += 1;")),
            Iteration::Tableau { .. } => {}
            Iteration::Coroutine { etat, .. } => {
                self.ligne(&format!("pthread_mutex_lock(&{etat}.mutex_coro);"));
                self.ligne(&format!("{etat}.reprise = 1;"));
                self.ligne(&format!("pthread_cond_signal(&{etat}.cond_coro);"));
                self.ligne(&format!("pthread_mutex_unlock(&{etat}.mutex_coro);"));
            }
        }
        self.ferme("}");

        self.ligne(&format!("{post}:;"));
        if let Iteration::Coroutine { fil, .. } = &iteration {
            self.ligne(&format!("pthread_join({fil}, NULL);"));
        }
        match (bloc_sinon, bloc_sansarret) {
            (Some(s), Some(a)) => {
                self.ouvre(&format!("if ({compteur} == 0) {{"));
                self.genere_contenu_bloc(s);
                self.ferme("}");
                self.ouvre("else {");
                self.genere_contenu_bloc(a);
                self.ferme("}");
            }
            (Some(s), None) => {
                self.ouvre(&format!("if ({compteur} == 0) {{"));
                self.genere_contenu_bloc(s);
                self.ferme("}");
            }
            (None, Some(a)) => {
                self.ouvre(&format!("if ({compteur} != 0) {{"));
                self.genere_contenu_bloc(a);
                self.ferme("}");
            }
            (None, None) => {}
        }
        self.ligne(&format!("goto {fin};"));
        self.ligne(&format!("{brise}:;"));
        if let Iteration::Coroutine { fil, .. } = &iteration {
            self.ligne(&format!("pthread_cancel({fil});"));
            self.ligne(&format!("pthread_join({fil}, NULL);"));
        }
        self.ligne(&format!("{fin}:;"));
        self.ferme("}");
    }

    /// Prépare l'état partagé et lance la coroutine sur un fil.
    fn lance_coroutine(&mut self, appel: NoeudId, f: NoeudId, n: u32) -> Iteration {
        let asm = self.asm;
        let Some(donnees) = asm.noeud(f).comme_fonction() else {
            return Iteration::Plage { courant: "0".to_owned(), fin: "(-1)".to_owned() };
        };
        let etat = format!("__etat{n}");
        let fil = format!("__fil{n}");
        self.ligne(&format!("KC_{} {etat};", donnees.nom_broye));
        self.ligne(&format!("memset(&{etat}, 0, sizeof({etat}));"));
        self.ligne(&format!("pthread_mutex_init(&{etat}.mutex_boucle, NULL);"));
        self.ligne(&format!("pthread_cond_init(&{etat}.cond_boucle, NULL);"));
        self.ligne(&format!("pthread_mutex_init(&{etat}.mutex_coro, NULL);"));
        self.ligne(&format!("pthread_cond_init(&{etat}.cond_coro, NULL);"));
        self.ligne(&format!("{etat}.contexte = contexte;"));
        let emplacements = self.programme.appels.get(&appel).cloned().unwrap_or_default();
        for (&p, e) in donnees.parametres.iter().zip(&emplacements) {
            let (Forme::DeclarationVariable { cible: Some(c), .. }, Some(e)) = (&asm.noeud(p).forme, e) else { continue };
            let v = self.expression(*e);
            self.ligne(&format!("{etat}.{} = {v};", self.nom_variable(*c)));
        }
        self.ligne(&format!("pthread_t {fil};"));
        self.ligne(&format!("pthread_create(&{fil}, NULL, {}, &{etat});", donnees.nom_broye));
        Iteration::Coroutine { etat, fil }
    }
}
