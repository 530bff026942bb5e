//! Instructions : déclarations, assignations et contrôle de flux.

use kuri_ast::{DrapeauxNoeud, Forme, GenreNoeud, NoeudId, Resolution, TypeId};
use kuri_core::TypeErreur;
use kuri_lexer::GenreLexeme;

use super::{ResultatValidation, ValeurConstante, Validatrice};
use crate::typeuse::{Type, Typeuse};

/// Valeur destinée à une cible : un noeud à convertir, ou un élément de tuple.
#[derive(Clone, Copy)]
enum Source {
    Noeud(NoeudId),
    Element(TypeId),
}

#[derive(Clone, Copy)]
enum GenreDiscr {
    Enum(TypeId),
    Union(TypeId),
    Chaine,
    Entier(TypeId),
}

impl Validatrice<'_> {
    pub(super) fn valide_bloc(&mut self, bloc: NoeudId) -> ResultatValidation<()> {
        let Forme::Bloc { expressions } = &self.asm.noeud(bloc).forme else {
            return self.valide_instruction(bloc);
        };
        let expressions = expressions.clone();
        self.empile_portee();
        for e in expressions {
            self.valide_instruction(e)?;
        }
        self.depile_portee();
        self.asm.noeud_mut(bloc).type_ = Some(Typeuse::RIEN);
        Ok(())
    }

    pub(super) fn valide_instruction(&mut self, id: NoeudId) -> ResultatValidation<()> {
        match self.asm.genre(id) {
            GenreNoeud::DeclarationVariable => self.valide_declaration(id),
            GenreNoeud::Assignation => self.valide_assignation(id),
            GenreNoeud::Si => self.valide_si(id),
            GenreNoeud::Bloc => self.valide_bloc(id),
            GenreNoeud::Retour | GenreNoeud::Retiens => self.valide_retour(id),
            GenreNoeud::Boucle | GenreNoeud::Repete | GenreNoeud::Tantque => self.valide_boucle(id),
            GenreNoeud::Pour => self.valide_pour(id),
            GenreNoeud::Controle => self.valide_controle(id),
            GenreNoeud::Discr => self.valide_discr(id),
            GenreNoeud::Differe => {
                self.differes += 1;
                if let Forme::Differe { bloc: Some(b) } = self.asm.noeud(id).forme {
                    self.valide_bloc(b)?;
                }
                self.differes -= 1;
                Ok(())
            }
            GenreNoeud::NonSur => {
                if let Forme::NonSur { bloc: Some(b) } = self.asm.noeud(id).forme {
                    self.valide_bloc(b)?;
                }
                Ok(())
            }
            _ => {
                self.valide_expression(id)?;
                self.fige(id)?;
                Ok(())
            }
        }
    }

    /* ─────────── Déclarations et assignations ─────────── */

    /// Déclaration locale ou globale (`EST_GLOBALE`).
    pub(super) fn valide_declaration(&mut self, id: NoeudId) -> ResultatValidation<()> {
        let (cible, valeur, type_declare, est_globale) = {
            let n = self.asm.noeud(id);
            let Forme::DeclarationVariable { cible: Some(cible), valeur } = n.forme else { return Ok(()) };
            (cible, valeur, n.type_declare.clone(), n.possede(DrapeauxNoeud::EST_GLOBALE))
        };
        let cibles = self.asm.aplatis_virgules(cible);

        if cibles.len() == 1 {
            if let Some(v) = valeur {
                self.valide_expression(v)?;
            }
            let t = match (&type_declare, valeur) {
                (Some(td), Some(v)) => {
                    let t = self.resous_type(td)?;
                    self.applique(v, t)?;
                    t
                }
                (Some(td), None) => self.resous_type(td)?,
                (None, Some(v)) => self.infere(v)?,
                (None, None) => return Err(self.erreur(id, TypeErreur::Syntaxe, "Déclaration sans type ni valeur")),
            };
            self.declare_variable(cible, t, est_globale)?;
            self.asm.noeud_mut(id).type_ = Some(t);
            return Ok(());
        }

        let sources = match valeur {
            Some(v) => self.sources(v)?,
            None => Vec::new(),
        };
        if valeur.is_some() && sources.len() != cibles.len() {
            return Err(self.erreur(
                id,
                TypeErreur::NombreArgument,
                format!("{} variable(s) pour {} valeur(s)", cibles.len(), sources.len()),
            ));
        }
        for (i, &c) in cibles.iter().enumerate() {
            let declare = self.asm.noeud(c).type_declare.clone().or_else(|| type_declare.clone());
            let declare = match &declare {
                Some(td) => Some(self.resous_type(td)?),
                None => None,
            };
            let t = match (declare, sources.get(i).copied()) {
                (Some(t), Some(Source::Noeud(e))) => {
                    self.applique(e, t)?;
                    t
                }
                (Some(t), Some(Source::Element(te))) if t == te => t,
                (Some(t), Some(Source::Element(te))) => {
                    return Err(self.erreur(
                        c,
                        TypeErreur::TypeArgument,
                        format!("Valeur de type « {} » pour une variable de type « {} »", self.typeuse.nom(te), self.typeuse.nom(t)),
                    ))
                }
                (Some(t), None) => t,
                (None, Some(Source::Noeud(e))) => self.infere(e)?,
                (None, Some(Source::Element(te))) => te,
                (None, None) => return Err(self.erreur(c, TypeErreur::Syntaxe, "Déclaration sans type ni valeur")),
            };
            self.declare_variable(c, t, est_globale)?;
        }
        self.asm.noeud_mut(id).type_ = Some(Typeuse::RIEN);
        Ok(())
    }

    /// Valeurs d'une liste `a, b` ou d'un appel à plusieurs retours.
    fn sources(&mut self, valeur: NoeudId) -> ResultatValidation<Vec<Source>> {
        if self.asm.genre(valeur) == GenreNoeud::Virgule {
            let elements = self.asm.aplatis_virgules(valeur);
            for &e in &elements {
                self.valide_expression(e)?;
            }
            return Ok(elements.into_iter().map(Source::Noeud).collect());
        }
        let t = self.valide_expression(valeur)?;
        Ok(match self.typeuse.type_(t) {
            Type::Tuple(ts) => ts.iter().map(|&t| Source::Element(t)).collect(),
            _ => vec![Source::Noeud(valeur)],
        })
    }

    /// Type d'une variable déclarée sans type.
    fn infere(&mut self, valeur: NoeudId) -> ResultatValidation<TypeId> {
        let t = self.type_de(valeur);
        match self.typeuse.type_(t) {
            Type::EntierConstant => self.fige(valeur),
            Type::Nul => Err(self.erreur(valeur, TypeErreur::TypeArgument, "Impossible d'inférer le type de « nul »")),
            Type::Rien => {
                Err(self.erreur(valeur, TypeErreur::TypeArgument, "Une expression sans valeur ne peut initialiser une variable"))
            }
            Type::Tuple(_) => {
                Err(self.erreur(valeur, TypeErreur::NombreArgument, "Plusieurs valeurs pour une seule variable"))
            }
            _ => Ok(t),
        }
    }

    pub(super) fn declare_variable(&mut self, cible: NoeudId, t: TypeId, est_globale: bool) -> ResultatValidation<()> {
        if self.asm.genre(cible) != GenreNoeud::Reference {
            return Err(self.erreur(cible, TypeErreur::Syntaxe, "Attendu un nom de variable"));
        }
        if t == Typeuse::RIEN {
            return Err(self.erreur(cible, TypeErreur::TypeArgument, "Une variable ne peut être de type « rien »"));
        }
        let nom = {
            let n = self.asm.noeud_mut(cible);
            n.type_ = Some(t);
            n.drapeaux |= DrapeauxNoeud::EST_DECLARATION | DrapeauxNoeud::EST_VALEUR_GAUCHE;
            if let Forme::Reference { declaration } = &mut n.forme {
                *declaration = Some(cible);
            }
            n.chaine().to_owned()
        };
        if !est_globale {
            self.declare_locale(&nom, cible)?;
        }
        self.utilise_type(t);
        Ok(())
    }

    fn valide_assignation(&mut self, id: NoeudId) -> ResultatValidation<()> {
        let (cible, valeur, operateur) = {
            let n = self.asm.noeud(id);
            let Forme::Assignation { cible: Some(cible), valeur: Some(valeur) } = n.forme else { return Ok(()) };
            (cible, valeur, n.lexeme.genre)
        };
        self.asm.noeud_mut(id).type_ = Some(Typeuse::RIEN);
        let cibles = self.asm.aplatis_virgules(cible);

        let mut types_cibles = Vec::with_capacity(cibles.len());
        for &c in &cibles {
            let t = self.valide_expression(c)?;
            if !self.est_valeur_gauche(c) {
                return Err(self.erreur(c, TypeErreur::Assignation, "Impossible d'assigner à une valeur non adressable"));
            }
            self.asm.noeud_mut(c).drapeaux |= DrapeauxNoeud::EST_CIBLE_ASSIGNATION;
            types_cibles.push(t);
        }

        if cibles.len() > 1 {
            if operateur != GenreLexeme::Egal {
                return Err(self.erreur(id, TypeErreur::Syntaxe, "Assignation composée sur plusieurs cibles"));
            }
            let sources = self.sources(valeur)?;
            if sources.len() != cibles.len() {
                return Err(self.erreur(
                    id,
                    TypeErreur::NombreArgument,
                    format!("{} cible(s) pour {} valeur(s)", cibles.len(), sources.len()),
                ));
            }
            for ((&c, &tc), source) in cibles.iter().zip(&types_cibles).zip(sources) {
                match source {
                    Source::Noeud(e) => self.applique(e, tc)?,
                    Source::Element(te) if te == tc => {}
                    Source::Element(te) => {
                        return Err(self.erreur(
                            c,
                            TypeErreur::Assignation,
                            format!("Valeur de type « {} » pour une cible de type « {} »", self.typeuse.nom(te), self.typeuse.nom(tc)),
                        ))
                    }
                }
            }
            return Ok(());
        }

        let tc = types_cibles[0];
        let tv = self.valide_expression(valeur)?;
        if operateur == GenreLexeme::Egal {
            return self.applique(valeur, tc);
        }

        let arithmetique =
            matches!(operateur, GenreLexeme::PlusEgal | GenreLexeme::MoinsEgal | GenreLexeme::MultiplieEgal | GenreLexeme::DiviseEgal);
        if self.typeuse.est_pointeur(tc) && matches!(operateur, GenreLexeme::PlusEgal | GenreLexeme::MoinsEgal) {
            if !self.typeuse.est_entier_ou_assimile(tv) {
                return Err(self.erreur(valeur, TypeErreur::TypeArgument, "Un pointeur ne peut être décalé que d'un entier"));
            }
            if tv == Typeuse::ENTIER_CONSTANT {
                self.applique(valeur, Typeuse::Z64)?;
            }
            return Ok(());
        }
        let valide = if arithmetique { self.typeuse.est_numerique(tc) } else { self.typeuse.est_entier_ou_assimile(tc) };
        if !valide {
            return Err(self.erreur(
                id,
                TypeErreur::TypeArgument,
                format!("Opérateur « {} » inapplicable au type « {} »", operateur.chaine(), self.typeuse.nom(tc)),
            ));
        }
        self.applique(valeur, tc)
    }

    /* ─────────── Contrôle de flux ─────────── */

    pub(super) fn valide_condition(&mut self, condition: NoeudId) -> ResultatValidation<()> {
        let t = self.valide_expression(condition)?;
        if t != Typeuse::BOOL {
            return Err(self.erreur(
                condition,
                TypeErreur::TypeArgument,
                format!("Condition de type « {} » au lieu de « bool »", self.typeuse.nom(t)),
            ));
        }
        Ok(())
    }

    fn valide_si(&mut self, id: NoeudId) -> ResultatValidation<()> {
        let Forme::Si { condition, bloc_si_vrai, bloc_si_faux } = self.asm.noeud(id).forme else { return Ok(()) };
        if let Some(c) = condition {
            self.valide_condition(c)?;
        }
        if let Some(b) = bloc_si_vrai {
            self.valide_bloc(b)?;
        }
        if let Some(b) = bloc_si_faux {
            self.valide_instruction(b)?;
        }
        self.asm.noeud_mut(id).type_ = Some(Typeuse::RIEN);
        Ok(())
    }

    fn valide_retour(&mut self, id: NoeudId) -> ResultatValidation<()> {
        let (expression, est_retiens) = match self.asm.noeud(id).forme {
            Forme::Retour { expression } => (expression, false),
            Forme::Retiens { expression } => (expression, true),
            _ => return Ok(()),
        };
        let mot = if est_retiens { "retiens" } else { "retourne" };
        let Some(signature) = self.fonction.and_then(|f| self.signatures.get(&f)).cloned() else {
            return Err(self.erreur(id, TypeErreur::ControleInvalide, format!("« {mot} » hors d'une fonction")));
        };
        if est_retiens && !signature.est_coroutine {
            return Err(self.erreur(id, TypeErreur::ControleInvalide, "« retiens » hors d'une coroutine"));
        }
        if !est_retiens && self.differes > 0 {
            return Err(self.erreur(id, TypeErreur::ControleInvalide, "« retourne » est interdit dans un bloc « diffère »"));
        }
        self.asm.noeud_mut(id).type_ = Some(Typeuse::RIEN);

        let Some(e) = expression else {
            if !signature.sorties.is_empty() && (est_retiens || !signature.est_coroutine) {
                return Err(self.erreur(id, TypeErreur::TypeArgument, "Valeur de retour manquante"));
            }
            return Ok(());
        };
        if signature.est_coroutine && !est_retiens {
            return Err(self.erreur(id, TypeErreur::ControleInvalide, "Une coroutine rend ses valeurs avec « retiens »"));
        }

        let elements = self.asm.aplatis_virgules(e);
        if elements.len() == 1 && signature.sorties.len() > 1 {
            let t = self.valide_expression(e)?;
            return match self.typeuse.type_(t) {
                Type::Tuple(ts) if *ts == signature.sorties => Ok(()),
                _ => Err(self.erreur(e, TypeErreur::NombreArgument, "Nombre de valeurs de retour incorrect")),
            };
        }
        if elements.len() != signature.sorties.len() {
            return Err(self.erreur(
                e,
                TypeErreur::NombreArgument,
                format!(
                    "Nombre de valeurs de retour incorrect : {} attendue(s), {} obtenue(s)",
                    signature.sorties.len(),
                    elements.len()
                ),
            ));
        }
        for (&el, &t) in elements.iter().zip(&signature.sorties) {
            self.valide_expression(el)?;
            self.applique(el, t)?;
        }
        Ok(())
    }

    fn valide_boucle(&mut self, id: NoeudId) -> ResultatValidation<()> {
        let (bloc, condition, condition_avant) = match self.asm.noeud(id).forme {
            Forme::Boucle { bloc } => (bloc, None, false),
            Forme::Tantque { condition, bloc } => (bloc, condition, true),
            Forme::Repete { bloc, condition } => (bloc, condition, false),
            _ => return Ok(()),
        };
        if let (Some(c), true) = (condition, condition_avant) {
            self.valide_condition(c)?;
        }
        self.boucles.push(String::new());
        if let Some(b) = bloc {
            self.valide_bloc(b)?;
        }
        self.boucles.pop();
        if let (Some(c), false) = (condition, condition_avant) {
            self.valide_condition(c)?;
        }
        self.asm.noeud_mut(id).type_ = Some(Typeuse::RIEN);
        Ok(())
    }

    fn valide_pour(&mut self, id: NoeudId) -> ResultatValidation<()> {
        let Forme::Pour { variable: Some(variable), expression: Some(expression), bloc, bloc_sansarret, bloc_sinon } =
            self.asm.noeud(id).forme
        else {
            return Ok(());
        };
        let variables = self.asm.aplatis_virgules(variable);
        if let Some(&v) = variables.iter().find(|&&v| self.asm.genre(v) != GenreNoeud::Reference) {
            return Err(self.erreur(v, TypeErreur::Syntaxe, "Attendu un nom de variable après « pour »"));
        }

        self.coroutine_permise = self.asm.genre(expression) == GenreNoeud::Appel;
        let te = self.valide_expression(expression)?;
        self.coroutine_permise = false;

        let coroutine = match &self.asm.noeud(expression).forme {
            Forme::Appel { resolution: Some(Resolution::Fonction(f)), .. } => {
                self.signatures.get(f).filter(|s| s.est_coroutine).map(|s| s.sorties.clone())
            }
            _ => None,
        };
        let types = match coroutine {
            Some(sorties) => {
                if variables.len() != sorties.len() {
                    return Err(self.erreur(
                        variable,
                        TypeErreur::NombreArgument,
                        format!("La coroutine rend {} valeur(s) pour {} variable(s)", sorties.len(), variables.len()),
                    ));
                }
                sorties
            }
            None => {
                let element = if self.asm.genre(expression) == GenreNoeud::Plage {
                    Some(te)
                } else {
                    self.typeuse.element(te)
                };
                let Some(element) = element else {
                    return Err(self.erreur(
                        expression,
                        TypeErreur::TypeArgument,
                        format!("Le type « {} » n'est pas itérable", self.typeuse.nom(te)),
                    ));
                };
                if variables.len() > 2 {
                    return Err(self.erreur(variable, TypeErreur::NombreArgument, "Au plus deux variables : valeur et index"));
                }
                vec![element, Typeuse::Z64]
            }
        };

        self.empile_portee();
        for (&v, &t) in variables.iter().zip(&types) {
            self.declare_variable(v, t, false)?;
        }
        let etiquette = self.asm.noeud(variables[0]).chaine().to_owned();
        self.boucles.push(etiquette);
        if let Some(b) = bloc {
            self.valide_bloc(b)?;
        }
        self.boucles.pop();
        self.depile_portee();

        for b in [bloc_sansarret, bloc_sinon].into_iter().flatten() {
            self.valide_bloc(b)?;
        }
        self.asm.noeud_mut(id).type_ = Some(Typeuse::RIEN);
        Ok(())
    }

    fn valide_controle(&mut self, id: NoeudId) -> ResultatValidation<()> {
        let n = self.asm.noeud(id);
        let Forme::Controle { etiquette } = n.forme else { return Ok(()) };
        if self.boucles.is_empty() {
            return Err(self.erreur(id, TypeErreur::ControleInvalide, format!("« {} » en dehors d'une boucle", n.chaine())));
        }
        if let Some(e) = etiquette {
            let nom = self.asm.noeud(e).chaine();
            if !self.boucles.iter().any(|b| b == nom) {
                return Err(self.erreur(e, TypeErreur::ControleInvalide, format!("Étiquette « {nom} » inconnue")));
            }
        }
        self.asm.noeud_mut(id).type_ = Some(Typeuse::RIEN);
        Ok(())
    }

    fn valide_discr(&mut self, id: NoeudId) -> ResultatValidation<()> {
        let (expression, paires, sinon) = match &self.asm.noeud(id).forme {
            Forme::Discr { expression: Some(e), paires, sinon } => (*e, paires.clone(), *sinon),
            _ => return Ok(()),
        };
        self.valide_expression(expression)?;
        let te = self.fige(expression)?;

        let genre = match self.typeuse.type_(te) {
            Type::Enum(_) => GenreDiscr::Enum(te),
            Type::Union(_) => match self.typeuse.structure(te) {
                Some(s) if !s.valide => return Err(super::Suspension::Attente(te)),
                Some(s) if s.est_union_sure() => GenreDiscr::Union(te),
                _ => {
                    return Err(self.erreur(expression, TypeErreur::TypeArgument, "Seules les unions sûres peuvent être discriminées"))
                }
            },
            Type::Chaine => GenreDiscr::Chaine,
            Type::Entier { .. } | Type::Octet | Type::Bool => GenreDiscr::Entier(te),
            _ => {
                return Err(self.erreur(
                    expression,
                    TypeErreur::TypeArgument,
                    format!("Le type « {} » ne peut être discriminé", self.typeuse.nom(te)),
                ))
            }
        };

        for paire in paires {
            let Forme::PaireDiscr { valeurs, bloc } = self.asm.noeud(paire).forme else { continue };
            for v in valeurs.map(|v| self.asm.aplatis_virgules(v)).unwrap_or_default() {
                self.valide_valeur_discr(v, genre)?;
            }
            if let Some(b) = bloc {
                self.valide_bloc(b)?;
            }
            self.asm.noeud_mut(paire).type_ = Some(Typeuse::RIEN);
        }
        if let Some(s) = sinon {
            self.valide_bloc(s)?;
        }
        self.asm.noeud_mut(id).type_ = Some(Typeuse::RIEN);
        Ok(())
    }

    fn valide_valeur_discr(&mut self, v: NoeudId, genre: GenreDiscr) -> ResultatValidation<()> {
        let est_nom = self.asm.genre(v) == GenreNoeud::Reference;
        let nom = self.asm.noeud(v).chaine().to_owned();
        match genre {
            GenreDiscr::Enum(t) if est_nom => {
                let valeur = self.typeuse.enum_(t).and_then(|e| e.valeurs.iter().find(|(n, _)| *n == nom).map(|(_, v)| *v));
                let Some(valeur) = valeur else {
                    return Err(self.erreur(
                        v,
                        TypeErreur::MembreInconnu,
                        format!("« {nom} » n'est pas un membre de « {} »", self.typeuse.nom(t)),
                    ));
                };
                self.programme.constantes.insert(v, ValeurConstante::Entier(valeur));
                self.asm.noeud_mut(v).drapeaux |= DrapeauxNoeud::EST_CALCULE;
                self.type_pose(v, t);
            }
            GenreDiscr::Union(t) => {
                let index = self.typeuse.structure(t).and_then(|s| s.index_membre(&nom)).filter(|_| est_nom);
                let Some(index) = index else {
                    return Err(self.erreur(
                        v,
                        TypeErreur::MembreInconnu,
                        format!("« {nom} » n'est pas un membre de l'union « {} »", self.typeuse.nom(t)),
                    ));
                };
                let index = i64::try_from(index).unwrap_or(i64::MAX).saturating_add(1);
                self.programme.constantes.insert(v, ValeurConstante::Entier(index));
                self.asm.noeud_mut(v).drapeaux |= DrapeauxNoeud::EST_CALCULE;
                self.type_pose(v, Typeuse::Z32);
            }
            GenreDiscr::Enum(t) | GenreDiscr::Entier(t) => {
                self.valide_expression(v)?;
                self.applique(v, t)?;
            }
            GenreDiscr::Chaine => {
                self.valide_expression(v)?;
                self.applique(v, Typeuse::CHAINE)?;
            }
        }
        Ok(())
    }
}
