//! Typage des expressions.

use kuri_ast::{DrapeauxNoeud, Forme, GenreNoeud, NoeudId, TransformationType, TypeBase, TypeId};
use kuri_core::TypeErreur;
use kuri_lexer::{GenreLexeme, Lexeme};

use super::{ResultatValidation, Suspension, Symbole, ValeurConstante, Validatrice};
use crate::graphe::NoeudDependance;
use crate::transformation::{cherche_transformation, ResultatTransformation};
use crate::typeuse::{Type, Typeuse};

impl Validatrice<'_> {
    /// Type l'expression `id` et ses enfants ; le type est aussi posé sur le noeud.
    pub(super) fn valide_expression(&mut self, id: NoeudId) -> ResultatValidation<TypeId> {
        self.asm.noeud_mut(id).transformation = TransformationType::Inutile;
        let t = match self.asm.genre(id) {
            GenreNoeud::NombreEntier | GenreNoeud::Caractere => Typeuse::ENTIER_CONSTANT,
            GenreNoeud::NombreReel => Typeuse::R64,
            GenreNoeud::ChaineLitterale => Typeuse::CHAINE,
            GenreNoeud::Booleen => Typeuse::BOOL,
            GenreNoeud::Nul => Typeuse::NUL,
            GenreNoeud::Reference => self.valide_reference(id)?,
            GenreNoeud::ExpressionBinaire => self.valide_binaire(id)?,
            GenreNoeud::ExpressionUnaire => self.valide_unaire(id)?,
            GenreNoeud::AccesMembre => self.valide_acces_membre(id)?,
            GenreNoeud::Indexage => self.valide_indexage(id)?,
            GenreNoeud::Plage => self.valide_plage(id)?,
            GenreNoeud::Virgule => {
                let mut types = Vec::new();
                for e in self.asm.aplatis_virgules(id) {
                    self.valide_expression(e)?;
                    types.push(self.fige(e)?);
                }
                self.typeuse.tuple(types)
            }
            GenreNoeud::Appel => self.valide_appel(id)?,
            GenreNoeud::TailleDe => self.valide_taille_de(id)?,
            GenreNoeud::InfoDe => self.valide_info_de(id)?,
            GenreNoeud::Memoire => self.valide_memoire(id)?,
            GenreNoeud::Transtype => self.valide_transtype(id)?,
            GenreNoeud::Loge => self.valide_loge(id)?,
            GenreNoeud::Reloge => self.valide_reloge(id)?,
            GenreNoeud::Deloge => self.valide_deloge(id)?,
            GenreNoeud::ConstruitTableau => self.valide_construit_tableau(id)?,
            GenreNoeud::Si => self.valide_si_expression(id)?,
            GenreNoeud::ExpansionVariadique => {
                return Err(self.erreur(
                    id,
                    TypeErreur::Syntaxe,
                    "« ... » n'est permis que sur le dernier argument d'un appel variadique",
                ))
            }
            _ => return Err(self.erreur(id, TypeErreur::Syntaxe, "Instruction inattendue dans une expression")),
        };
        Ok(self.type_pose(id, t))
    }

    /* ─────────── Références ─────────── */

    fn valide_reference(&mut self, id: NoeudId) -> ResultatValidation<TypeId> {
        let nom = self.asm.noeud(id).chaine().to_owned();
        if let Some(decl) = self.cherche_locale(&nom) {
            let t = self.asm.noeud(decl).type_.ok_or(Suspension::AttenteDeclaration(decl))?;
            self.lie(id, decl, true);
            return Ok(t);
        }
        match self.symboles.get(&nom).cloned() {
            Some(Symbole::Globale { decl, cible }) => {
                self.utilise(NoeudDependance::Globale(decl));
                let t = self.asm.noeud(cible).type_.ok_or(Suspension::AttenteDeclaration(decl))?;
                self.lie(id, cible, true);
                Ok(t)
            }
            Some(Symbole::Fonctions(v)) => {
                let [f] = v[..] else {
                    return Err(self.erreur(
                        id,
                        TypeErreur::TypeArgument,
                        format!("Référence ambiguë à la fonction surchargée « {nom} »"),
                    ));
                };
                let t = self.asm.noeud(f).type_.ok_or(Suspension::AttenteDeclaration(f))?;
                self.utilise(NoeudDependance::Fonction(f));
                self.lie(id, f, false);
                Ok(t)
            }
            Some(Symbole::Type(_)) => {
                Err(self.erreur(id, TypeErreur::VariableInconnue, format!("« {nom} » est un type, pas une valeur")))
            }
            None => Err(self.erreur(id, TypeErreur::VariableInconnue, format!("Variable inconnue « {nom} »"))),
        }
    }

    fn lie(&mut self, id: NoeudId, decl: NoeudId, valeur_gauche: bool) {
        let n = self.asm.noeud_mut(id);
        if let Forme::Reference { declaration } = &mut n.forme {
            *declaration = Some(decl);
        }
        if valeur_gauche {
            n.drapeaux |= DrapeauxNoeud::EST_VALEUR_GAUCHE;
        }
    }

    /// Type nommé par une référence (`z32`, `Vecteur`), hors variables locales.
    fn type_nomme(&self, id: NoeudId) -> Option<TypeId> {
        let n = self.asm.noeud(id);
        if n.genre() != GenreNoeud::Reference || self.cherche_locale(n.chaine()).is_some() {
            return None;
        }
        if let Some(base) = TypeBase::depuis_genre(n.lexeme.genre) {
            return self.type_base(&base, n.lexeme.span).ok();
        }
        match self.symboles.get(n.chaine()) {
            Some(Symbole::Type(t)) => Some(*t),
            _ if n.chaine() == "InfoType" => Some(Typeuse::INFO_TYPE),
            _ => None,
        }
    }

    /* ─────────── Opérateurs ─────────── */

    fn valide_binaire(&mut self, id: NoeudId) -> ResultatValidation<TypeId> {
        let (g, d, op) = {
            let n = self.asm.noeud(id);
            let Forme::ExpressionBinaire { gauche: Some(g), droite: Some(d) } = n.forme else {
                return Err(self.erreur(id, TypeErreur::Syntaxe, "Opérande manquante"));
            };
            (g, d, n.lexeme.genre)
        };
        let tg = self.valide_expression(g)?;
        let td = self.valide_expression(d)?;

        use GenreLexeme as G;
        match op {
            G::EspEsp | G::BarreBarre => {
                for (e, t) in [(g, tg), (d, td)] {
                    if t != Typeuse::BOOL {
                        return Err(self.erreur(
                            e,
                            TypeErreur::TypeArgument,
                            format!("Opérande de type « {} » au lieu de « bool »", self.typeuse.nom(t)),
                        ));
                    }
                }
                Ok(Typeuse::BOOL)
            }
            _ if op.est_operateur_comparaison() => {
                let t = self.unifie(id, g, d)?;
                let ordonne = matches!(op, G::Inferieur | G::InferieurEgal | G::Superieur | G::SuperieurEgal);
                let comparable = match self.typeuse.type_(t) {
                    Type::Entier { .. } | Type::EntierConstant | Type::Reel { .. } | Type::Octet | Type::Enum(_) => true,
                    Type::Pointeur(_) | Type::Nul => true,
                    Type::Bool | Type::Chaine | Type::Fonction { .. } => !ordonne,
                    _ => false,
                };
                if !comparable {
                    return Err(self.erreur_operateur(id, op, t));
                }
                Ok(Typeuse::BOOL)
            }
            G::Plus | G::Moins if self.typeuse.est_pointeur(tg) || self.typeuse.est_pointeur(td) => {
                self.arithmetique_pointeur(id, op, g, d)
            }
            G::Plus | G::Moins | G::Fois | G::Divise | G::Pourcent => {
                let t = self.unifie(id, g, d)?;
                let valide = if op == G::Pourcent {
                    self.typeuse.est_entier_ou_assimile(t) && !matches!(self.typeuse.type_(t), Type::Enum(_))
                } else {
                    self.typeuse.est_numerique(t)
                };
                if !valide {
                    return Err(self.erreur_operateur(id, op, t));
                }
                Ok(t)
            }
            G::Esperluette | G::Barre | G::Chapeau | G::DecalageGauche | G::DecalageDroite => {
                let t = self.unifie(id, g, d)?;
                if !self.typeuse.est_entier_ou_assimile(t) && t != Typeuse::BOOL {
                    return Err(self.erreur_operateur(id, op, t));
                }
                Ok(t)
            }
            _ => Err(self.erreur(id, TypeErreur::Syntaxe, format!("Opérateur binaire « {} » inattendu", op.chaine()))),
        }
    }

    fn arithmetique_pointeur(&mut self, id: NoeudId, op: GenreLexeme, g: NoeudId, d: NoeudId) -> ResultatValidation<TypeId> {
        let (tg, td) = (self.type_de(g), self.type_de(d));
        let entier = |s: &Self, t: TypeId| matches!(s.typeuse.type_(t), Type::Entier { .. } | Type::EntierConstant | Type::Octet);

        if self.typeuse.est_pointeur(tg) && self.typeuse.est_pointeur(td) {
            if op == GenreLexeme::Moins && tg == td {
                return Ok(Typeuse::Z64);
            }
            return Err(self.erreur_operateur(id, op, tg));
        }
        let (pointeur, decalage, tp) = if self.typeuse.est_pointeur(tg) { (g, d, tg) } else { (d, g, td) };
        if !entier(self, self.type_de(decalage)) || (op == GenreLexeme::Moins && pointeur == d) || tp == Typeuse::NUL {
            return Err(self.erreur_operateur(id, op, tp));
        }
        if tp == Typeuse::PTR_RIEN {
            return Err(self.erreur(id, TypeErreur::TypeArgument, "Arithmétique impossible sur « *rien »"));
        }
        if self.type_de(decalage) == Typeuse::ENTIER_CONSTANT {
            self.applique(decalage, Typeuse::Z64)?;
        }
        Ok(tp)
    }

    fn erreur_operateur(&self, id: NoeudId, op: GenreLexeme, t: TypeId) -> Suspension {
        self.erreur(
            id,
            TypeErreur::TypeArgument,
            format!("Opérateur « {} » inapplicable au type « {} »", op.chaine(), self.typeuse.nom(t)),
        )
    }

    /// Type commun de deux opérandes ; l'une des deux est convertie au besoin.
    fn unifie(&mut self, id: NoeudId, g: NoeudId, d: NoeudId) -> ResultatValidation<TypeId> {
        let (tg, td) = (self.type_de(g), self.type_de(d));
        if tg == td {
            return Ok(tg);
        }
        for (source, ts, tc) in [(g, tg, td), (d, td, tg)] {
            let litteral = ts == Typeuse::ENTIER_CONSTANT
                && (self.typeuse.est_numerique(tc) || matches!(self.typeuse.type_(tc), Type::Enum(_)));
            let reel = ts == Typeuse::R64 && self.est_litteral_reel(source) && self.typeuse.est_reel(tc);
            let nul = ts == Typeuse::NUL && matches!(self.typeuse.type_(tc), Type::Pointeur(_) | Type::Fonction { .. });
            if litteral || reel || nul {
                self.applique(source, tc)?;
                return Ok(tc);
            }
        }
        for (source, ts, tc) in [(g, tg, td), (d, td, tg)] {
            match cherche_transformation(self.typeuse, ts, tc, false) {
                ResultatTransformation::Attente(t) => return Err(Suspension::Attente(t)),
                ResultatTransformation::Trouvee(
                    TransformationType::AugmenteTailleType { .. } | TransformationType::Dereference,
                ) => {
                    self.applique(source, tc)?;
                    return Ok(tc);
                }
                ResultatTransformation::Trouvee(_) => {}
            }
        }
        Err(self.erreur(
            id,
            TypeErreur::TypeArgument,
            format!(
                "Types incompatibles « {} » et « {} » pour l'opérateur « {} »",
                self.typeuse.nom(tg),
                self.typeuse.nom(td),
                self.asm.noeud(id).chaine()
            ),
        ))
    }

    fn valide_unaire(&mut self, id: NoeudId) -> ResultatValidation<TypeId> {
        let (o, op) = {
            let n = self.asm.noeud(id);
            let Forme::ExpressionUnaire { operande: Some(o) } = n.forme else {
                return Err(self.erreur(id, TypeErreur::Syntaxe, "Opérande manquante"));
            };
            (o, n.lexeme.genre)
        };
        let t = self.valide_expression(o)?;
        match op {
            GenreLexeme::MoinsUnaire | GenreLexeme::PlusUnaire if self.typeuse.est_numerique(t) => Ok(t),
            GenreLexeme::Exclamation if t == Typeuse::BOOL => Ok(t),
            GenreLexeme::Tilde if self.typeuse.est_entier_ou_assimile(t) => Ok(t),
            GenreLexeme::Arobase => {
                if !self.est_valeur_gauche(o) {
                    return Err(self.erreur(
                        id,
                        TypeErreur::Assignation,
                        "Impossible de prendre l'adresse d'une valeur non adressable",
                    ));
                }
                Ok(self.typeuse.pointeur(t))
            }
            _ => Err(self.erreur_operateur(id, op, t)),
        }
    }

    /* ─────────── Accès ─────────── */

    fn valide_acces_membre(&mut self, id: NoeudId) -> ResultatValidation<TypeId> {
        let Forme::AccesMembre { structure: Some(s), membre: Some(m), .. } = self.asm.noeud(id).forme else {
            return Err(self.erreur(id, TypeErreur::Syntaxe, "Accès à un membre incomplet"));
        };
        if self.asm.genre(m) != GenreNoeud::Reference {
            return Err(self.erreur(m, TypeErreur::Syntaxe, "Attendu un nom de membre"));
        }
        let nom = self.asm.noeud(m).chaine().to_owned();

        // valeur d'énum : `Couleur.ROUGE`
        if let Some(t) = self.type_nomme(s) {
            return self.valeur_enum(id, s, t, &nom);
        }

        let ts = self.valide_expression(s)?;
        let (base, via_pointeur) = match self.typeuse.pointe(ts) {
            Some(p) => (p, true),
            None => (ts, false),
        };
        let valeur_gauche = via_pointeur || self.est_valeur_gauche(s);
        let inconnu = |v: &Self| {
            v.erreur(
                m,
                TypeErreur::MembreInconnu,
                format!("Le type « {} » n'a pas de membre « {nom} »", v.typeuse.nom(base)),
            )
        };

        let (t, constante) = match self.typeuse.type_(base).clone() {
            Type::Structure(_) | Type::Union(_) => {
                let Some(donnees) = self.typeuse.structure(base) else { return Err(inconnu(self)) };
                if !donnees.valide {
                    return Err(Suspension::Attente(base));
                }
                let Some(chemin) = self.chemin_membre(base, &nom) else { return Err(inconnu(self)) };
                if chemin.len() > 1 {
                    self.deplie_employes(id, s, base, &chemin);
                    return self.valide_acces_membre(id);
                }
                let index = chemin[0];
                let t = self.typeuse.structure(base).map_or(Typeuse::RIEN, |d| d.membres[index].type_);
                if let Forme::AccesMembre { index_membre, .. } = &mut self.asm.noeud_mut(id).forme {
                    *index_membre = u32::try_from(index).ok();
                }
                (t, None)
            }
            Type::Chaine => match nom.as_str() {
                "taille" => (Typeuse::Z64, None),
                "pointeur" => (self.typeuse.pointeur(Typeuse::Z8), None),
                _ => return Err(inconnu(self)),
            },
            Type::TableauDynamique(e) | Type::Variadique(Some(e)) => match nom.as_str() {
                "taille" => (Typeuse::Z64, None),
                "pointeur" => (self.typeuse.pointeur(e), None),
                _ => return Err(inconnu(self)),
            },
            Type::TableauFixe { element, taille } => match nom.as_str() {
                "taille" => (Typeuse::Z64, Some(i64::try_from(taille).unwrap_or(i64::MAX))),
                "pointeur" => (self.typeuse.pointeur(element), None),
                _ => return Err(inconnu(self)),
            },
            Type::Eini => match nom.as_str() {
                "pointeur" => (Typeuse::PTR_RIEN, None),
                "info" => (Typeuse::PTR_INFO_TYPE, None),
                _ => return Err(inconnu(self)),
            },
            Type::InfoType => match nom.as_str() {
                "id" | "taille_en_octet" => (Typeuse::N32, None),
                "nom" => (Typeuse::CHAINE, None),
                _ => return Err(inconnu(self)),
            },
            _ => return Err(inconnu(self)),
        };

        let modifiable = valeur_gauche && constante.is_none();
        if let Some(v) = constante {
            self.programme.constantes.insert(id, ValeurConstante::Entier(v));
            self.asm.noeud_mut(id).drapeaux |= DrapeauxNoeud::EST_CALCULE;
        }
        if modifiable {
            self.asm.noeud_mut(id).drapeaux |= DrapeauxNoeud::EST_VALEUR_GAUCHE;
        }
        self.asm.noeud_mut(m).type_ = Some(t);
        Ok(t)
    }

    fn valeur_enum(&mut self, id: NoeudId, s: NoeudId, t: TypeId, nom: &str) -> ResultatValidation<TypeId> {
        let Some(donnees) = self.typeuse.enum_(t) else {
            return Err(self.erreur(
                s,
                TypeErreur::VariableInconnue,
                format!("« {} » est un type, pas une valeur", self.typeuse.nom(t)),
            ));
        };
        if !donnees.valide {
            return Err(Suspension::Attente(t));
        }
        let Some(&(_, v)) = donnees.valeurs.iter().find(|(n, _)| n == nom) else {
            return Err(self.erreur(
                id,
                TypeErreur::MembreInconnu,
                format!("« {nom} » n'est pas un membre de « {} »", self.typeuse.nom(t)),
            ));
        };
        self.programme.constantes.insert(id, ValeurConstante::Entier(v));
        self.asm.noeud_mut(id).drapeaux |= DrapeauxNoeud::EST_CALCULE;
        self.type_pose(s, t);
        Ok(t)
    }

    /// Indices des membres à traverser pour atteindre `nom`, à travers les `empl`.
    fn chemin_membre(&self, t: TypeId, nom: &str) -> Option<Vec<usize>> {
        let donnees = self.typeuse.structure(t)?;
        if let Some(i) = donnees.index_membre(nom) {
            return Some(vec![i]);
        }
        donnees.membres.iter().enumerate().filter(|(_, m)| m.est_employe).find_map(|(i, m)| {
            let mut chemin = self.chemin_membre(m.type_, nom)?;
            chemin.insert(0, i);
            Some(chemin)
        })
    }

    /// Réécrit `s.x` en `s.base.x` en insérant les accès aux membres employés.
    fn deplie_employes(&mut self, id: NoeudId, s: NoeudId, base: TypeId, chemin: &[usize]) {
        let lexeme = self.asm.noeud(id).lexeme.clone();
        let mut courant = s;
        let mut t = base;
        for &i in &chemin[..chemin.len() - 1] {
            let Some(membre) = self.typeuse.structure(t).map(|d| d.membres[i].clone()) else { return };
            let reference = self.asm.cree_noeud(
                Forme::Reference { declaration: None },
                Lexeme::new(GenreLexeme::ChaineCaractere, membre.nom.clone(), lexeme.span),
            );
            courant = self.asm.cree_noeud(
                Forme::AccesMembre { structure: Some(courant), membre: Some(reference), index_membre: None },
                lexeme.clone(),
            );
            t = membre.type_;
        }
        if let Forme::AccesMembre { structure, .. } = &mut self.asm.noeud_mut(id).forme {
            *structure = Some(courant);
        }
    }

    fn valide_indexage(&mut self, id: NoeudId) -> ResultatValidation<TypeId> {
        let Forme::Indexage { tableau: Some(tableau), index: Some(index) } = self.asm.noeud(id).forme else {
            return Err(self.erreur(id, TypeErreur::Syntaxe, "Indexage incomplet"));
        };
        let tt = self.valide_expression(tableau)?;
        let ti = self.valide_expression(index)?;

        let element = match self.typeuse.type_(tt) {
            Type::Pointeur(p) if *p != Typeuse::RIEN => Some(*p),
            Type::Pointeur(_) => None,
            _ => self.typeuse.element(tt),
        };
        let Some(element) = element else {
            return Err(self.erreur(
                tableau,
                TypeErreur::TypeArgument,
                format!("Le type « {} » n'est pas indexable", self.typeuse.nom(tt)),
            ));
        };
        if !matches!(self.typeuse.type_(ti), Type::Entier { .. } | Type::EntierConstant | Type::Octet) {
            return Err(self.erreur(
                index,
                TypeErreur::TypeArgument,
                format!("Index de type « {} » au lieu d'un entier", self.typeuse.nom(ti)),
            ));
        }
        if ti == Typeuse::ENTIER_CONSTANT {
            self.applique(index, Typeuse::Z64)?;
        }
        self.asm.noeud_mut(id).drapeaux |= DrapeauxNoeud::EST_VALEUR_GAUCHE;
        Ok(element)
    }

    fn valide_plage(&mut self, id: NoeudId) -> ResultatValidation<TypeId> {
        let Forme::Plage { debut: Some(debut), fin: Some(fin) } = self.asm.noeud(id).forme else {
            return Err(self.erreur(id, TypeErreur::Syntaxe, "Plage incomplète"));
        };
        self.valide_expression(debut)?;
        self.valide_expression(fin)?;
        let mut t = self.unifie(id, debut, fin)?;
        if t == Typeuse::ENTIER_CONSTANT {
            self.applique(debut, Typeuse::Z32)?;
            self.applique(fin, Typeuse::Z32)?;
            t = Typeuse::Z32;
        }
        if !self.typeuse.est_entier(t) && !self.typeuse.est_reel(t) {
            return Err(self.erreur(id, TypeErreur::TypeArgument, "Les bornes d'une plage doivent être numériques"));
        }
        Ok(t)
    }

    /* ─────────── Formes spéciales ─────────── */

    fn valide_taille_de(&mut self, id: NoeudId) -> ResultatValidation<TypeId> {
        let Some(td) = self.asm.noeud(id).type_declare.clone() else {
            return Err(self.erreur(id, TypeErreur::Syntaxe, "Type manquant"));
        };
        let t = self.resous_type(&td)?;
        if let Some(attente) = self.typeuse.type_en_attente(t) {
            return Err(Suspension::Attente(attente));
        }
        let taille = i64::from(self.typeuse.taille_de(t));
        self.programme.constantes.insert(id, ValeurConstante::Entier(taille));
        self.asm.noeud_mut(id).drapeaux |= DrapeauxNoeud::EST_CALCULE;
        Ok(Typeuse::N32)
    }

    fn valide_info_de(&mut self, id: NoeudId) -> ResultatValidation<TypeId> {
        let Forme::InfoDe { expression: Some(e) } = self.asm.noeud(id).forme else {
            return Err(self.erreur(id, TypeErreur::Syntaxe, "Expression manquante"));
        };
        let t = match self.type_nomme(e) {
            Some(t) => self.type_pose(e, t),
            None => {
                self.valide_expression(e)?;
                self.fige(e)?
            }
        };
        if let Some(attente) = self.typeuse.type_en_attente(t) {
            return Err(Suspension::Attente(attente));
        }
        Ok(Typeuse::PTR_INFO_TYPE)
    }

    fn valide_memoire(&mut self, id: NoeudId) -> ResultatValidation<TypeId> {
        let Forme::Memoire { expression: Some(e) } = self.asm.noeud(id).forme else {
            return Err(self.erreur(id, TypeErreur::Syntaxe, "Expression manquante"));
        };
        let t = self.valide_expression(e)?;
        match self.typeuse.pointe(t) {
            Some(p) if p != Typeuse::RIEN => {
                self.asm.noeud_mut(id).drapeaux |= DrapeauxNoeud::EST_VALEUR_GAUCHE;
                Ok(p)
            }
            _ => Err(self.erreur(
                e,
                TypeErreur::TypeArgument,
                format!("« mémoire » attend un pointeur, obtenu « {} »", self.typeuse.nom(t)),
            )),
        }
    }

    fn valide_transtype(&mut self, id: NoeudId) -> ResultatValidation<TypeId> {
        let (e, td) = {
            let n = self.asm.noeud(id);
            let (Forme::Transtype { expression: Some(e) }, Some(td)) = (&n.forme, &n.type_declare) else {
                return Err(self.erreur(id, TypeErreur::Syntaxe, "Transtypage incomplet"));
            };
            (*e, td.clone())
        };
        let vers = self.resous_type(&td)?;
        let de = self.valide_expression(e)?;
        match cherche_transformation(self.typeuse, de, vers, true) {
            ResultatTransformation::Attente(t) => Err(Suspension::Attente(t)),
            ResultatTransformation::Trouvee(TransformationType::Impossible) => Err(self.erreur(
                id,
                TypeErreur::TypeArgument,
                format!("Transtypage impossible de « {} » vers « {} »", self.typeuse.nom(de), self.typeuse.nom(vers)),
            )),
            ResultatTransformation::Trouvee(t) => {
                self.asm.noeud_mut(e).transformation = t;
                Ok(vers)
            }
        }
    }

    /* ─────────── Mémoire ─────────── */

    fn verifie_contexte(&self, id: NoeudId) -> ResultatValidation<()> {
        let nulctx = self.fonction.is_some_and(|f| {
            let n = self.asm.noeud(f);
            n.possede(DrapeauxNoeud::FORCE_NULCTX) || n.possede(DrapeauxNoeud::EST_EXTERNE)
        });
        if nulctx {
            return Err(self.erreur(
                id,
                TypeErreur::ControleInvalide,
                "Allocation impossible dans une fonction sans contexte (#nulctx)",
            ));
        }
        Ok(())
    }

    fn taille_allocation(&mut self, taille: NoeudId) -> ResultatValidation<()> {
        let t = self.valide_expression(taille)?;
        if !matches!(self.typeuse.type_(t), Type::Entier { .. } | Type::EntierConstant | Type::Octet) {
            return Err(self.erreur(taille, TypeErreur::TypeArgument, "La taille d'une allocation doit être entière"));
        }
        if t != Typeuse::Z64 {
            let vers = if t == Typeuse::ENTIER_CONSTANT { Typeuse::Z64 } else { t };
            self.applique(taille, vers)?;
        }
        Ok(())
    }

    /// Type alloué par `loge`/`reloge` : `*T`, `chaine` ou `[]T`.
    fn type_alloue(&mut self, id: NoeudId, taille: Option<NoeudId>) -> ResultatValidation<TypeId> {
        let Some(td) = self.asm.noeud(id).type_declare.clone() else {
            return Err(self.erreur(id, TypeErreur::Syntaxe, "Type manquant"));
        };
        let t = self.resous_type(&td)?;
        let tableau = matches!(self.typeuse.type_(t), Type::Chaine | Type::TableauDynamique(_));
        match (tableau, taille) {
            (true, Some(n)) => {
                self.taille_allocation(n)?;
                Ok(t)
            }
            (true, None) => Err(self.erreur(id, TypeErreur::Syntaxe, "Taille manquante pour l'allocation")),
            (false, Some(_)) => Err(self.erreur(id, TypeErreur::Syntaxe, "Taille inattendue pour l'allocation")),
            (false, None) => {
                if let Some(attente) = self.typeuse.type_en_attente(t) {
                    return Err(Suspension::Attente(attente));
                }
                Ok(self.typeuse.pointeur(t))
            }
        }
    }

    fn valide_loge(&mut self, id: NoeudId) -> ResultatValidation<TypeId> {
        let Forme::Loge { taille, bloc_sinon } = self.asm.noeud(id).forme else { return Ok(Typeuse::RIEN) };
        self.verifie_contexte(id)?;
        let t = self.type_alloue(id, taille)?;
        if let Some(b) = bloc_sinon {
            self.valide_bloc(b)?;
        }
        Ok(t)
    }

    fn valide_reloge(&mut self, id: NoeudId) -> ResultatValidation<TypeId> {
        let Forme::Reloge { expression: Some(e), taille, bloc_sinon } = self.asm.noeud(id).forme else {
            return Err(self.erreur(id, TypeErreur::Syntaxe, "Expression manquante"));
        };
        self.verifie_contexte(id)?;
        let te = self.valide_expression(e)?;
        if !self.est_valeur_gauche(e) {
            return Err(self.erreur(e, TypeErreur::Assignation, "« reloge » attend une valeur adressable"));
        }
        let t = self.type_alloue(id, taille)?;
        if t != te {
            return Err(self.erreur(
                id,
                TypeErreur::TypeArgument,
                format!("Réallocation de « {} » en « {} »", self.typeuse.nom(te), self.typeuse.nom(t)),
            ));
        }
        if let Some(b) = bloc_sinon {
            self.valide_bloc(b)?;
        }
        Ok(Typeuse::RIEN)
    }

    fn valide_deloge(&mut self, id: NoeudId) -> ResultatValidation<TypeId> {
        let Forme::Deloge { expression: Some(e) } = self.asm.noeud(id).forme else {
            return Err(self.erreur(id, TypeErreur::Syntaxe, "Expression manquante"));
        };
        self.verifie_contexte(id)?;
        let t = self.valide_expression(e)?;
        if !self.est_valeur_gauche(e) {
            return Err(self.erreur(e, TypeErreur::Assignation, "« déloge » attend une valeur adressable"));
        }
        if !matches!(self.typeuse.type_(t), Type::Pointeur(_) | Type::Chaine | Type::TableauDynamique(_)) {
            return Err(self.erreur(
                e,
                TypeErreur::TypeArgument,
                format!("Impossible de déloger une valeur de type « {} »", self.typeuse.nom(t)),
            ));
        }
        Ok(Typeuse::RIEN)
    }

    /* ─────────── Tableaux et si ─────────── */

    fn valide_construit_tableau(&mut self, id: NoeudId) -> ResultatValidation<TypeId> {
        let Forme::ConstruitTableau { elements } = &self.asm.noeud(id).forme else { return Ok(Typeuse::RIEN) };
        let elements = elements.clone();
        let Some((&premier, reste)) = elements.split_first() else {
            return Err(self.erreur(id, TypeErreur::TypeArgument, "Un tableau littéral ne peut être vide"));
        };
        self.valide_expression(premier)?;
        let element = self.fige(premier)?;
        for &e in reste {
            self.valide_expression(e)?;
            self.applique(e, element)?;
        }
        Ok(self.typeuse.tableau_fixe(element, elements.len() as u64))
    }

    /// Valeur d'un bloc : sa dernière expression.
    fn valide_bloc_valeur(&mut self, bloc: NoeudId, attendu: Option<TypeId>) -> ResultatValidation<TypeId> {
        let expressions = match &self.asm.noeud(bloc).forme {
            Forme::Bloc { expressions } => expressions.clone(),
            Forme::Si { .. } => {
                let t = self.valide_si_expression(bloc)?;
                self.type_pose(bloc, t);
                return self.conforme(bloc, attendu);
            }
            _ => vec![bloc],
        };
        let Some((&derniere, debut)) = expressions.split_last() else {
            return Err(self.erreur(bloc, TypeErreur::TypeArgument, "Un bloc vide n'a pas de valeur"));
        };
        self.empile_portee();
        for &e in debut {
            self.valide_instruction(e)?;
        }
        self.valide_expression(derniere)?;
        let t = self.conforme(derniere, attendu)?;
        self.depile_portee();
        self.type_pose(bloc, t);
        Ok(t)
    }

    fn conforme(&mut self, id: NoeudId, attendu: Option<TypeId>) -> ResultatValidation<TypeId> {
        match attendu {
            Some(t) => {
                self.applique(id, t)?;
                Ok(t)
            }
            None => self.fige(id),
        }
    }

    fn valide_si_expression(&mut self, id: NoeudId) -> ResultatValidation<TypeId> {
        let Forme::Si { condition: Some(c), bloc_si_vrai: Some(vrai), bloc_si_faux } = self.asm.noeud(id).forme else {
            return Err(self.erreur(id, TypeErreur::Syntaxe, "« si » incomplet"));
        };
        let Some(faux) = bloc_si_faux else {
            return Err(self.erreur(id, TypeErreur::Syntaxe, "Un « si » utilisé comme valeur doit avoir un « sinon »"));
        };
        self.valide_condition(c)?;
        let t = self.valide_bloc_valeur(vrai, None)?;
        self.valide_bloc_valeur(faux, Some(t))?;
        Ok(t)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{erreur, valide};
    use kuri_ast::{Forme, NoeudId, TransformationType};
    use kuri_core::TypeErreur;
    use pretty_assertions::assert_eq;

    use crate::typeuse::Typeuse;

    fn valeur(v: &super::super::tests::Valide, decl: NoeudId) -> NoeudId {
        match v.asm.noeud(decl).forme {
            Forme::DeclarationVariable { valeur: Some(val), .. } => val,
            _ => panic!("déclaration attendue"),
        }
    }

    #[test]
    fn litteraux_et_operateurs() {
        let v = valide("fonc principale() { a := 1 + 2 * 3; b : n8 = 4; c := b + 1; d := 1.5 * 2.0; e := !vrai; }").unwrap();
        let types: Vec<_> =
            v.instructions("principale").iter().map(|&i| v.typeuse.nom(v.asm.noeud(i).type_.unwrap())).collect();
        assert_eq!(types, vec!["z32", "n8", "n8", "r64", "bool"]);
        let a = valeur(&v, v.instructions("principale")[0]);
        assert_eq!(v.asm.noeud(a).transformation, TransformationType::ConvertiEntierConstant { vers: Typeuse::Z32 });
    }

    #[test]
    fn operandes_incompatibles() {
        assert_eq!(erreur("fonc principale() { a := 1 + \"x\"; }").genre, TypeErreur::TypeArgument);
        assert_eq!(erreur("fonc principale() { a := 1 && vrai; }").genre, TypeErreur::TypeArgument);
        assert_eq!(erreur("fonc principale() { a := 1.5 % 2.0; }").genre, TypeErreur::TypeArgument);
        assert_eq!(erreur("fonc principale() { a := @5; }").genre, TypeErreur::Assignation);
        assert_eq!(erreur("fonc principale() { a := b; }").genre, TypeErreur::VariableInconnue);
    }

    #[test]
    fn pointeurs() {
        let src = "fonc principale() { x := 3; p := @x; q := p + 1; d := q - p; y := mémoire(p); p = nul; }";
        let v = valide(src).unwrap();
        let types: Vec<_> =
            v.instructions("principale")[..5].iter().map(|&i| v.typeuse.nom(v.asm.noeud(i).type_.unwrap())).collect();
        assert_eq!(types, vec!["z32", "*z32", "*z32", "z64", "z32"]);
        assert_eq!(erreur("fonc principale() { x := 3; y := mémoire(x); }").genre, TypeErreur::TypeArgument);
    }

    #[test]
    fn membres_et_employes() {
        let src = "Vecteur :: struct { x : r32; y : r32; }
                   Point :: struct { empl v : Vecteur; nom : chaine; }
                   fonc principale() {
                       p : Point;
                       p.x = 1.0;
                       a := p.nom.taille;
                       pp := @p;
                       b := pp.y;
                   }";
        let v = valide(src).unwrap();
        let instr = v.instructions("principale");
        let Forme::Assignation { cible: Some(c), .. } = v.asm.noeud(instr[1]).forme else { panic!() };
        // p.x est réécrit en p.v.x
        let Forme::AccesMembre { structure: Some(s), index_membre, .. } = v.asm.noeud(c).forme else { panic!() };
        assert_eq!(v.asm.noeud(s).genre(), kuri_ast::GenreNoeud::AccesMembre);
        assert_eq!(index_membre, Some(0));
        assert_eq!(v.typeuse.nom(v.asm.noeud(instr[2]).type_.unwrap()), "z64");
        assert_eq!(v.typeuse.nom(v.asm.noeud(instr[4]).type_.unwrap()), "r32");
        assert_eq!(erreur("S :: struct { a : z32; } fonc principale() { s : S; s.b = 1; }").genre, TypeErreur::MembreInconnu);
    }

    #[test]
    fn constantes_calculees() {
        let src = "Couleur :: énum { ROUGE; VERT = 4; }
                   fonc principale() { t : [3]z32; a := t.taille; b := taille_de(z64); c := Couleur.VERT; }";
        let v = valide(src).unwrap();
        let instr = v.instructions("principale");
        let valeurs: Vec<_> = instr[1..]
            .iter()
            .map(|&i| v.programme.constantes.get(&valeur(&v, i)).and_then(|c| c.entier()))
            .collect();
        assert_eq!(valeurs, vec![Some(3), Some(8), Some(4)]);
    }

    #[test]
    fn transtypages() {
        let v = valide("fonc principale() { a := 3.7; b := transtype(a : z32); c : z64 = b; p := transtype(c : *rien); }").unwrap();
        let b = valeur(&v, v.instructions("principale")[1]);
        let Forme::Transtype { expression: Some(e) } = v.asm.noeud(b).forme else { panic!() };
        assert_eq!(v.asm.noeud(e).transformation, TransformationType::ReelVersEntier { vers: Typeuse::Z32 });
        let e = erreur("S :: struct { a : z32; } fonc principale() { s : S; x := transtype(s : r64); }");
        assert_eq!(e.genre, TypeErreur::TypeArgument);
    }

    #[test]
    fn allocations() {
        let src = "fonc principale() {
                       p := loge z32;
                       s := loge chaine(16);
                       t := loge [8]r64;
                       reloge s : chaine(32);
                       déloge p;
                       déloge s;
                       déloge t;
                   }";
        let v = valide(src).unwrap();
        let types: Vec<_> =
            v.instructions("principale")[..3].iter().map(|&i| v.typeuse.nom(v.asm.noeud(i).type_.unwrap())).collect();
        assert_eq!(types, vec!["*z32", "chaine", "[]r64"]);
        assert_eq!(erreur("#nulctx fonc f() { p := loge z32; }").genre, TypeErreur::ControleInvalide);
    }

    #[test]
    fn tableaux_litteraux_et_si_valeur() {
        let v = valide("fonc principale() { t := [1, 2, 3]; x := si t[0] > 1 { 2.5 } sinon { 1.0 }; }").unwrap();
        let types: Vec<_> =
            v.instructions("principale").iter().map(|&i| v.typeuse.nom(v.asm.noeud(i).type_.unwrap())).collect();
        assert_eq!(types, vec!["[3]z32", "r64"]);
        assert_eq!(erreur("fonc principale() { x := si vrai { 1 }; }").genre, TypeErreur::Syntaxe);
        assert_eq!(erreur("fonc principale() { t := [1, \"a\"]; }").genre, TypeErreur::TypeArgument);
    }
}
