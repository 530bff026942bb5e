//! Résolution des appels : surcharges, arguments nommés, variadiques,
//! pointeurs de fonction et construction de structures.

use kuri_ast::{DrapeauxNoeud, Forme, GenreNoeud, NoeudId, Resolution, TransformationType, TypeId};
use kuri_core::TypeErreur;
use kuri_lexer::GenreLexeme;

use super::{ResultatValidation, Signature, Suspension, Symbole, Validatrice};
use crate::graphe::NoeudDependance;
use crate::transformation::{verifie_compatibilite, Compatibilite};
use crate::typeuse::{Type, Typeuse};

#[derive(Debug, Clone)]
struct Argument {
    nom: Option<String>,
    valeur: NoeudId,
    expansion: bool,
}

/// Surcharge acceptée, avec ce qu'il faut appliquer si elle est retenue.
#[derive(Debug)]
struct Candidat {
    decl: NoeudId,
    poids: f64,
    emplacements: Vec<Option<NoeudId>>,
    transformations: Vec<(NoeudId, TransformationType)>,
    supplementaires: Vec<NoeudId>,
    expansion: Option<NoeudId>,
}

impl Validatrice<'_> {
    pub(super) fn valide_appel(&mut self, id: NoeudId) -> ResultatValidation<TypeId> {
        let permise = std::mem::take(&mut self.coroutine_permise);
        let nom = self.asm.noeud(id).chaine().to_owned();
        let arguments = self.valide_arguments(id)?;

        if let Some(variable) = self.cherche_locale(&nom) {
            return self.appel_pointeur(id, variable, &arguments);
        }

        match self.symboles.get(&nom).cloned() {
            Some(Symbole::Globale { decl, cible }) => {
                self.utilise(NoeudDependance::Globale(decl));
                if self.asm.noeud(cible).type_.is_none() {
                    return Err(Suspension::AttenteDeclaration(decl));
                }
                self.appel_pointeur(id, cible, &arguments)
            }
            Some(Symbole::Type(t)) => self.construit_structure(id, t, &arguments),
            Some(Symbole::Fonctions(candidates)) => self.appel_fonction(id, &nom, &candidates, &arguments, permise),
            None => Err(self.erreur(id, TypeErreur::FonctionInconnue, format!("Fonction inconnue « {nom} »"))),
        }
    }

    fn valide_arguments(&mut self, id: NoeudId) -> ResultatValidation<Vec<Argument>> {
        let Forme::Appel { arguments, .. } = &self.asm.noeud(id).forme else { return Ok(Vec::new()) };
        let mut resultat = Vec::new();

        for a in arguments.clone() {
            let n = self.asm.noeud(a);
            let argument = match n.forme {
                Forme::Assignation { cible: Some(c), valeur: Some(v) }
                    if n.lexeme.genre == GenreLexeme::Egal && self.asm.genre(c) == GenreNoeud::Reference =>
                {
                    let nom = self.asm.noeud(c).chaine().to_owned();
                    self.valide_expression(v)?;
                    Argument { nom: Some(nom), valeur: v, expansion: false }
                }
                Forme::ExpansionVariadique { expression: Some(e) } => {
                    let t = self.valide_expression(e)?;
                    self.asm.noeud_mut(a).transformation = TransformationType::Inutile;
                    self.type_pose(a, t);
                    Argument { nom: None, valeur: a, expansion: true }
                }
                _ => {
                    self.valide_expression(a)?;
                    Argument { nom: None, valeur: a, expansion: false }
                }
            };
            resultat.push(argument);
        }

        Ok(resultat)
    }

    /* ─────────── Fonctions ─────────── */

    fn appel_fonction(
        &mut self,
        id: NoeudId,
        nom: &str,
        candidates: &[NoeudId],
        arguments: &[Argument],
        permise: bool,
    ) -> ResultatValidation<TypeId> {
        let mut acceptes = Vec::new();
        let mut erreurs = Vec::new();

        for &f in candidates {
            let Some(signature) = self.signatures.get(&f).cloned() else {
                return Err(Suspension::AttenteDeclaration(f));
            };
            match self.evalue_candidat(id, f, nom, &signature, arguments) {
                Ok(c) => acceptes.push(c),
                Err(Suspension::Erreur(e)) => erreurs.push(e),
                Err(s) => return Err(s),
            }
        }

        if acceptes.is_empty() {
            if candidates.len() == 1 {
                if let Some(e) = erreurs.into_iter().next() {
                    return Err(Suspension::Erreur(e));
                }
            }
            return Err(self.erreur(
                id,
                TypeErreur::TypeArgument,
                format!("Aucune surcharge de « {nom} » ne convient aux arguments"),
            ));
        }

        let max = acceptes.iter().map(|c| c.poids).fold(f64::MIN, f64::max);
        acceptes.retain(|c| (c.poids - max).abs() < f64::EPSILON);
        if acceptes.len() > 1 {
            return Err(self.erreur(
                id,
                TypeErreur::TypeArgument,
                format!("Appel ambigu de « {nom} » : {} surcharges conviennent", acceptes.len()),
            ));
        }
        let Some(choisi) = acceptes.pop() else { return Err(self.erreur(id, TypeErreur::TypeArgument, "Appel vide")) };
        let Some(signature) = self.signatures.get(&choisi.decl).cloned() else {
            return Err(Suspension::AttenteDeclaration(choisi.decl));
        };

        if signature.est_coroutine && !permise {
            return Err(self.erreur(
                id,
                TypeErreur::ControleInvalide,
                format!("La coroutine « {nom} » ne peut être appelée que dans une boucle « pour »"),
            ));
        }
        if signature.avec_contexte && self.appelant_sans_contexte() {
            return Err(self.erreur(
                id,
                TypeErreur::ControleInvalide,
                format!("« {nom} » a besoin du contexte, absent d'une fonction #nulctx"),
            ));
        }

        for (n, t) in &choisi.transformations {
            self.asm.noeud_mut(*n).transformation = *t;
        }

        let mut emplacements = choisi.emplacements;
        match signature.variadique {
            Some(Some(element)) => {
                let paquet = match choisi.expansion {
                    Some(e) => e,
                    None => self.cree_paquet(id, element, &choisi.supplementaires),
                };
                if let Some(dernier) = emplacements.last_mut() {
                    *dernier = Some(paquet);
                }
            }
            Some(None) => {
                emplacements.pop();
                for e in choisi.supplementaires {
                    self.fige(e)?;
                    emplacements.push(Some(e));
                }
            }
            None => {}
        }

        self.programme.appels.insert(id, emplacements);
        self.resous(id, Resolution::Fonction(choisi.decl));
        self.utilise(NoeudDependance::Fonction(choisi.decl));

        let t = match signature.sorties.as_slice() {
            [] => Typeuse::RIEN,
            [t] => *t,
            sorties => self.typeuse.tuple(sorties.to_vec()),
        };
        Ok(self.type_pose(id, t))
    }

    fn appelant_sans_contexte(&self) -> bool {
        self.fonction.and_then(|f| self.signatures.get(&f)).is_some_and(|s| !s.avec_contexte)
    }

    /// Range les arguments dans l'ordre des paramètres et calcule le poids
    /// de la surcharge `f`. Une erreur rejette la surcharge.
    fn evalue_candidat(
        &mut self,
        id: NoeudId,
        f: NoeudId,
        nom: &str,
        signature: &Signature,
        arguments: &[Argument],
    ) -> ResultatValidation<Candidat> {
        let n = signature.parametres.len();
        let index_variadique = signature.variadique.map(|_| n.saturating_sub(1));

        let mut emplacements: Vec<Option<NoeudId>> = vec![None; n];
        let mut supplementaires = Vec::new();
        let mut expansion = None;
        let mut position = 0;
        let mut nomme = false;

        for a in arguments {
            if let Some(nom_argument) = &a.nom {
                nomme = true;
                let Some(i) = signature.parametres.iter().position(|p| p.nom == *nom_argument) else {
                    return Err(self.erreur(
                        a.valeur,
                        TypeErreur::ArgumentNomme,
                        format!("« {nom} » n'a pas de paramètre « {nom_argument} »"),
                    ));
                };
                if Some(i) == index_variadique {
                    return Err(self.erreur(
                        a.valeur,
                        TypeErreur::ArgumentNomme,
                        "Un paramètre variadique ne peut être nommé",
                    ));
                }
                if emplacements[i].is_some() {
                    return Err(self.erreur(
                        a.valeur,
                        TypeErreur::ArgumentNomme,
                        format!("L'argument « {nom_argument} » est donné plusieurs fois"),
                    ));
                }
                emplacements[i] = Some(a.valeur);
                continue;
            }

            if nomme {
                return Err(self.erreur(
                    a.valeur,
                    TypeErreur::ArgumentNomme,
                    "Argument positionnel après un argument nommé",
                ));
            }

            if Some(position) == index_variadique {
                if expansion.is_some() || (a.expansion && !supplementaires.is_empty()) {
                    return Err(self.erreur(
                        a.valeur,
                        TypeErreur::TypeArgument,
                        "Une expansion variadique doit être le seul argument variadique",
                    ));
                }
                if a.expansion {
                    if signature.variadique == Some(None) {
                        return Err(self.erreur(
                            a.valeur,
                            TypeErreur::TypeArgument,
                            "Expansion variadique impossible vers une fonction externe",
                        ));
                    }
                    expansion = Some(a.valeur);
                } else {
                    supplementaires.push(a.valeur);
                }
            } else if position >= n {
                return Err(self.erreur(
                    id,
                    TypeErreur::NombreArgument,
                    format!("Trop d'arguments pour « {nom} » : {n} attendu(s), {} donné(s)", arguments.len()),
                ));
            } else if a.expansion {
                return Err(self.erreur(
                    a.valeur,
                    TypeErreur::TypeArgument,
                    "Expansion variadique hors du paramètre variadique",
                ));
            } else {
                emplacements[position] = Some(a.valeur);
                position += 1;
            }
        }

        let mut poids = 1.0;
        let mut transformations = Vec::new();

        for (i, p) in signature.parametres.iter().enumerate() {
            if Some(i) == index_variadique {
                continue;
            }
            match emplacements[i] {
                Some(v) => {
                    let (w, t) = self.compatibilite(p.type_, v)?;
                    if w <= 0.0 {
                        return Err(self.erreur_argument(v, &p.nom, p.type_));
                    }
                    poids *= w;
                    transformations.push((v, t));
                }
                None => match p.defaut {
                    Some(d) => emplacements[i] = Some(d),
                    None => {
                        return Err(self.erreur(
                            id,
                            TypeErreur::NombreArgument,
                            format!("Argument « {} » manquant dans l'appel de « {nom} »", p.nom),
                        ))
                    }
                },
            }
        }

        if let Some(Some(element)) = signature.variadique {
            if let Some(e) = expansion {
                let tableau = self.typeuse.tableau_dynamique(element);
                let (w, t) = self.compatibilite_expansion(tableau, e)?;
                if w <= 0.0 {
                    return Err(self.erreur_argument(e, "...", tableau));
                }
                poids *= w;
                transformations.push((e, t));
            }
            for &e in &supplementaires {
                let (w, t) = self.compatibilite(element, e)?;
                if w <= 0.0 {
                    return Err(self.erreur_argument(e, "...", element));
                }
                poids *= w;
                transformations.push((e, t));
            }
        }

        Ok(Candidat { decl: f, poids, emplacements, transformations, supplementaires, expansion })
    }

    fn compatibilite(&self, vers: TypeId, valeur: NoeudId) -> ResultatValidation<(f64, TransformationType)> {
        let de = self.type_de(valeur);
        if de == Typeuse::R64 && vers != Typeuse::R64 && self.typeuse.est_reel(vers) && self.est_litteral_reel(valeur) {
            let t = if vers == Typeuse::R16 {
                TransformationType::ConversionR16 { conversion: kuri_ast::ConversionR16::DepuisR64, vers }
            } else {
                TransformationType::ReduitTailleType { vers }
            };
            return Ok((0.5, t));
        }
        match verifie_compatibilite(self.typeuse, vers, de, Some(self.asm.noeud(valeur))) {
            Compatibilite::Poids(w, t) => Ok((w, t)),
            Compatibilite::Attente(t) => Err(Suspension::Attente(t)),
        }
    }

    /// Une expansion accepte un tableau fixe, dynamique ou un paramètre
    /// variadique reçu.
    fn compatibilite_expansion(
        &mut self,
        tableau: TypeId,
        valeur: NoeudId,
    ) -> ResultatValidation<(f64, TransformationType)> {
        let de = self.type_de(valeur);
        if let Type::Variadique(Some(e)) = *self.typeuse.type_(de) {
            if self.typeuse.tableau_dynamique(e) == tableau {
                return Ok((1.0, TransformationType::Inutile));
            }
        }
        self.compatibilite(tableau, valeur)
    }

    fn erreur_argument(&self, valeur: NoeudId, parametre: &str, attendu: TypeId) -> Suspension {
        let de = self.type_de(valeur);
        self.erreur(
            valeur,
            TypeErreur::TypeArgument,
            format!(
                "Argument « {parametre} » : impossible de convertir « {} » en « {} »",
                self.typeuse.nom(de),
                self.typeuse.nom(attendu)
            ),
        )
    }

    /// Regroupe les arguments variadiques dans un tableau littéral converti
    /// en `[]T`.
    fn cree_paquet(&mut self, appel: NoeudId, element: TypeId, valeurs: &[NoeudId]) -> NoeudId {
        let lexeme = self.asm.noeud(appel).lexeme.clone();
        let paquet = self.asm.cree_noeud(Forme::ConstruitTableau { elements: valeurs.to_vec() }, lexeme);
        self.asm.noeud_mut(paquet).drapeaux |= DrapeauxNoeud::EST_VARIADIQUE;

        let dynamique = self.typeuse.tableau_dynamique(element);
        if valeurs.is_empty() {
            self.type_pose(paquet, dynamique);
        } else {
            let fixe = self.typeuse.tableau_fixe(element, valeurs.len() as u64);
            self.type_pose(paquet, fixe);
            self.asm.noeud_mut(paquet).transformation = TransformationType::ConvertiTableau { vers: dynamique };
        }
        paquet
    }

    /* ─────────── Pointeurs de fonction ─────────── */

    fn appel_pointeur(&mut self, id: NoeudId, variable: NoeudId, arguments: &[Argument]) -> ResultatValidation<TypeId> {
        let nom = self.asm.noeud(variable).chaine().to_owned();
        let t = self.type_de(variable);
        let Type::Fonction { entrees, sorties, .. } = self.typeuse.type_(t).clone() else {
            return Err(self.erreur(
                id,
                TypeErreur::FonctionInconnue,
                format!("« {nom} » de type « {} » n'est pas une fonction", self.typeuse.nom(t)),
            ));
        };

        if let Some(a) = arguments.iter().find(|a| a.nom.is_some() || a.expansion) {
            return Err(self.erreur(
                a.valeur,
                TypeErreur::ArgumentNomme,
                "Un pointeur de fonction ne prend que des arguments positionnels",
            ));
        }
        if arguments.len() != entrees.len() {
            return Err(self.erreur(
                id,
                TypeErreur::NombreArgument,
                format!("« {nom} » attend {} argument(s), {} donné(s)", entrees.len(), arguments.len()),
            ));
        }

        for (i, (a, &e)) in arguments.iter().zip(&entrees).enumerate() {
            let (w, t) = self.compatibilite(e, a.valeur)?;
            if w <= 0.0 {
                return Err(self.erreur_argument(a.valeur, &format!("#{i}"), e));
            }
            self.asm.noeud_mut(a.valeur).transformation = t;
        }

        self.programme.appels.insert(id, arguments.iter().map(|a| Some(a.valeur)).collect());
        self.resous(id, Resolution::Pointeur(variable));

        let t = match sorties.as_slice() {
            [] => Typeuse::RIEN,
            [t] => *t,
            s => self.typeuse.tuple(s.to_vec()),
        };
        Ok(self.type_pose(id, t))
    }

    /* ─────────── Structures ─────────── */

    fn construit_structure(&mut self, id: NoeudId, t: TypeId, arguments: &[Argument]) -> ResultatValidation<TypeId> {
        let nom = self.typeuse.nom(t);
        let Some(donnees) = self.typeuse.structure(t).cloned() else {
            return Err(self.erreur(
                id,
                TypeErreur::TypeArgument,
                format!("« {nom} » n'est pas une structure constructible"),
            ));
        };
        if !donnees.valide {
            return Err(Suspension::Attente(t));
        }

        let mut emplacements = vec![None; donnees.membres.len()];
        for a in arguments {
            let Some(membre) = &a.nom else {
                return Err(self.erreur(
                    a.valeur,
                    TypeErreur::ArgumentNomme,
                    format!("Les arguments de construction de « {nom} » doivent être nommés"),
                ));
            };
            let Some(i) = donnees.index_membre(membre) else {
                return Err(self.erreur(
                    a.valeur,
                    TypeErreur::MembreInconnu,
                    format!("« {nom} » n'a pas de membre « {membre} »"),
                ));
            };
            if emplacements[i].is_some() {
                return Err(self.erreur(
                    a.valeur,
                    TypeErreur::ArgumentNomme,
                    format!("Le membre « {membre} » est donné plusieurs fois"),
                ));
            }
            self.applique(a.valeur, donnees.membres[i].type_)?;
            emplacements[i] = Some(a.valeur);
        }

        if donnees.est_union && arguments.len() != 1 {
            return Err(self.erreur(
                id,
                TypeErreur::NombreArgument,
                format!("L'union « {nom} » se construit avec exactement un membre"),
            ));
        }

        self.programme.appels.insert(id, emplacements);
        self.resous(id, Resolution::Structure(t));
        Ok(self.type_pose(id, t))
    }

    fn resous(&mut self, id: NoeudId, r: Resolution) {
        if let Forme::Appel { resolution, .. } = &mut self.asm.noeud_mut(id).forme {
            *resolution = Some(r);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{erreur, valide};
    use kuri_ast::{DrapeauxNoeud, Forme, Resolution, TransformationType};
    use kuri_core::TypeErreur;
    use pretty_assertions::assert_eq;

    use crate::typeuse::Typeuse;

    fn appel_de(v: &super::super::tests::Valide, fonction: &str, index: usize) -> kuri_ast::NoeudId {
        let i = v.instructions(fonction)[index];
        match &v.asm.noeud(i).forme {
            Forme::DeclarationVariable { valeur: Some(a), .. } => *a,
            _ => i,
        }
    }

    #[test]
    fn surcharge_par_type_exact() {
        let src = "fonc f(a : z32) : z32 { retourne 1; }
                   fonc f(a : r64) : z32 { retourne 2; }
                   fonc principale() { x : r64 = 1.0; a := f(x); }";
        let v = valide(src).unwrap();
        let appel = appel_de(&v, "principale", 1);
        let Forme::Appel { resolution: Some(Resolution::Fonction(f)), .. } = v.asm.noeud(appel).forme else {
            panic!("appel non résolu")
        };
        assert_eq!(v.asm.noeud(f).comme_fonction().unwrap().nom_broye, "_KF4Test_1f_O1");
    }

    #[test]
    fn appel_ambigu() {
        let src = "fonc f(a : z32) {} fonc f(a : z64) {} fonc principale() { f(1); }";
        let e = erreur(src);
        assert_eq!(e.genre, TypeErreur::TypeArgument);
        assert!(e.message.contains("ambigu"), "{}", e.message);
    }

    #[test]
    fn arguments_nommes_et_defauts() {
        let src = "fonc f(a : z32, b := 2, c : z32 = 3) : z32 { retourne a + b + c; }
                   fonc principale() { x := f(1, c = 5); }";
        let v = valide(src).unwrap();
        let appel = appel_de(&v, "principale", 0);
        let args = &v.programme.appels[&appel];
        assert_eq!(args.len(), 3);
        assert!(args.iter().all(Option::is_some));
        assert_eq!(v.asm.noeud(args[2].unwrap()).chaine(), "5");

        assert_eq!(erreur("fonc f(a : z32) {} fonc principale() { f(b = 1); }").genre, TypeErreur::ArgumentNomme);
        assert_eq!(erreur("fonc f(a : z32, b : z32) {} fonc principale() { f(a = 1, 2); }").genre, TypeErreur::ArgumentNomme);
        assert_eq!(erreur("fonc f(a : z32) {} fonc principale() { f(a = 1, a = 2); }").genre, TypeErreur::ArgumentNomme);
    }

    #[test]
    fn nombre_d_arguments() {
        assert_eq!(erreur("fonc f(a : z32) {} fonc principale() { f(); }").genre, TypeErreur::NombreArgument);
        assert_eq!(erreur("fonc f(a : z32) {} fonc principale() { f(1, 2); }").genre, TypeErreur::NombreArgument);
        let e = erreur("fonc f(a : z32) {} fonc principale() { f(\"x\"); }");
        assert_eq!(e.genre, TypeErreur::TypeArgument);
        assert!(e.message.contains("chaine"), "{}", e.message);
    }

    #[test]
    fn variadiques_empaquetes() {
        let src = "fonc somme(v : ...z32) : z32 { r := 0; pour x dans v { r += x; } retourne r; }
                   fonc principale() { a := somme(1, 2, 3); b := somme(); t : [2]z32; c := somme(...t); }";
        let v = valide(src).unwrap();

        let appel = appel_de(&v, "principale", 0);
        let paquet = v.programme.appels[&appel][0].unwrap();
        let n = v.asm.noeud(paquet);
        assert!(n.possede(DrapeauxNoeud::EST_VARIADIQUE));
        assert_eq!(v.typeuse.nom(n.type_.unwrap()), "[3]z32");
        assert!(matches!(n.transformation, TransformationType::ConvertiTableau { .. }));

        let vide = v.programme.appels[&appel_de(&v, "principale", 1)][0].unwrap();
        assert_eq!(v.typeuse.nom(v.asm.noeud(vide).type_.unwrap()), "[]z32");

        let expansion = v.programme.appels[&appel_de(&v, "principale", 3)][0].unwrap();
        assert!(matches!(v.asm.noeud(expansion).transformation, TransformationType::ConvertiTableau { .. }));
    }

    #[test]
    fn variadiques_externes() {
        let src = "externe fonc printf(format : *z8, args : ...) : z32;
                   fonc principale() { f : *z8 = nul; printf(f, 1, 2.5); }";
        let v = valide(src).unwrap();
        let appel = v.instructions("principale")[1];
        let args = &v.programme.appels[&appel];
        assert_eq!(args.len(), 3);
        assert_eq!(v.asm.noeud(args[1].unwrap()).type_, Some(Typeuse::ENTIER_CONSTANT));
        assert!(matches!(v.asm.noeud(args[1].unwrap()).transformation, TransformationType::ConvertiEntierConstant { .. }));
    }

    #[test]
    fn construction_de_structures() {
        let src = "Vec :: struct { x : r32; y : r32; }
                   fonc principale() { v := Vec(y = 2.0); }";
        let v = valide(src).unwrap();
        let appel = appel_de(&v, "principale", 0);
        assert!(matches!(v.asm.noeud(appel).forme, Forme::Appel { resolution: Some(Resolution::Structure(_)), .. }));
        let args = &v.programme.appels[&appel];
        assert!(args[0].is_none());
        assert_eq!(v.asm.noeud(args[1].unwrap()).type_, Some(Typeuse::R32));

        assert_eq!(erreur("S :: struct { x : z32; } fonc principale() { s := S(1); }").genre, TypeErreur::ArgumentNomme);
        assert_eq!(erreur("S :: struct { x : z32; } fonc principale() { s := S(y = 1); }").genre, TypeErreur::MembreInconnu);
        assert_eq!(
            erreur("U :: union { a : z32; b : r32; } fonc principale() { u := U(a = 1, b = 2.0); }").genre,
            TypeErreur::NombreArgument
        );
    }

    #[test]
    fn pointeurs_de_fonction() {
        let src = "fonc double(x : z32) : z32 { retourne x * 2; }
                   fonc principale() { f : fonc(z32)(z32) = double; a := f(4); }";
        let v = valide(src).unwrap();
        let appel = appel_de(&v, "principale", 1);
        assert!(matches!(v.asm.noeud(appel).forme, Forme::Appel { resolution: Some(Resolution::Pointeur(_)), .. }));
        assert_eq!(v.asm.noeud(appel).type_, Some(Typeuse::Z32));
    }

    #[test]
    fn fonction_inconnue_et_contexte() {
        assert_eq!(erreur("fonc principale() { g(); }").genre, TypeErreur::FonctionInconnue);
        let src = "fonc g() {} fonc h() #nulctx { g(); } fonc principale() { h(); }";
        assert_eq!(erreur(src).genre, TypeErreur::ControleInvalide);
    }

    #[test]
    fn coroutines_dans_pour_seulement() {
        let src = "corout compte(n : z32) : z32 { i := 0; tantque i < n { retiens i; i += 1; } }
                   fonc principale() { pour x dans compte(3) { } }";
        assert!(valide(src).is_ok());
        let src = "corout compte(n : z32) : z32 { retiens n; } fonc principale() { compte(3); }";
        assert_eq!(erreur(src).genre, TypeErreur::ControleInvalide);
    }
}
