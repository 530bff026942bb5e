//! Recherche des transformations entre types.
//!
//! Les règles sont écrites en dur, dans l'ordre où elles s'appliquent ; la
//! première qui correspond l'emporte. Une requête sur une structure ou une
//! union dont la disposition n'est pas encore connue rend `Attente`.

use kuri_ast::{ConversionR16, DrapeauxNoeud, Noeud, TransformationType, TypeId};

use crate::typeuse::{Type, Typeuse};

/// Résultat d'une recherche de transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultatTransformation {
    /// Transformation trouvée (éventuellement `Impossible`).
    Trouvee(TransformationType),
    /// Le type doit d'abord être validé.
    Attente(TypeId),
}

impl ResultatTransformation {
    /// Transformation trouvée, `None` si la requête est suspendue.
    pub const fn transformation(self) -> Option<TransformationType> {
        match self {
            Self::Trouvee(t) => Some(t),
            Self::Attente(_) => None,
        }
    }
}

/// Poids d'une transformation pour la résolution des surcharges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Compatibilite {
    /// Poids dans `[0, 1]` et transformation à appliquer.
    Poids(f64, TransformationType),
    /// Le type doit d'abord être validé.
    Attente(TypeId),
}

/* ─────────────────────────── Recherche ─────────────────────────── */

/// Transformation pour passer une valeur de type `de` vers le type `vers`.
///
/// `transtypage` autorise les conversions réservées à `transtype(e : T)`.
pub fn cherche_transformation(typeuse: &Typeuse, de: TypeId, vers: TypeId, transtypage: bool) -> ResultatTransformation {
    use ResultatTransformation::{Attente, Trouvee};
    use TransformationType as TT;

    if de == vers {
        return Trouvee(TT::Inutile);
    }

    let type_de = typeuse.type_(de);
    let type_vers = typeuse.type_(vers);

    match (type_de, type_vers) {
        (Type::EntierConstant, Type::Entier { .. } | Type::Octet | Type::Reel { .. } | Type::Enum(_)) => {
            return Trouvee(TT::ConvertiEntierConstant { vers });
        }
        (Type::EntierConstant, Type::Pointeur(_)) if transtypage => {
            return Trouvee(TT::ConvertiEntierConstant { vers });
        }
        _ => {}
    }

    /* eini */
    if vers == Typeuse::EINI {
        if matches!(type_de, Type::Rien | Type::Tuple(_)) {
            return Trouvee(TT::Impossible);
        }
        if let Some(attente) = typeuse.type_en_attente(de) {
            return Attente(attente);
        }
        return Trouvee(TT::ConstruitEini);
    }
    if de == Typeuse::EINI {
        return Trouvee(TT::ExtraitEini { vers });
    }

    /* unions */
    if let Type::Union(_) = type_vers {
        return construit_union(typeuse, de, vers);
    }
    if let Type::Union(_) = type_de {
        let Some(donnees) = typeuse.structure(de) else { return Trouvee(TT::Impossible) };
        if !donnees.valide {
            return Attente(de);
        }
        if let Some(index) = donnees.membres.iter().position(|m| m.type_ == vers) {
            return Trouvee(TT::ExtraitUnion { vers, index_membre: index as u32 });
        }
        return Trouvee(TT::Impossible);
    }

    /* nul */
    if matches!(type_de, Type::Nul) {
        if matches!(type_vers, Type::Pointeur(_) | Type::Fonction { .. }) {
            return Trouvee(TT::ConvertiVersTypeCible { vers });
        }
        return Trouvee(TT::Impossible);
    }

    /* références */
    if let Type::Reference(pointe) = type_vers {
        if *pointe == de {
            return Trouvee(TT::PrendReference);
        }
    }
    if let Type::Reference(pointe) = type_de {
        if *pointe == vers {
            return Trouvee(TT::Dereference);
        }
    }

    Trouvee(match (type_de, type_vers) {
        /* nombres */
        (&Type::Entier { signe: sd, bits: bd }, &Type::Entier { signe: sv, bits: bv }) => {
            if sd == sv && bd < bv {
                TT::AugmenteTailleType { vers }
            } else if !transtypage {
                TT::Impossible
            } else if bd > bv {
                TT::ReduitTailleType { vers }
            } else if bd < bv {
                TT::AugmenteTailleType { vers }
            } else {
                TT::ConvertiVersTypeCible { vers }
            }
        }
        (&Type::Reel { bits: bd }, &Type::Reel { bits: bv }) => transformation_reel(bd, bv, vers, transtypage),
        (Type::Entier { .. }, Type::Reel { bits }) if transtypage && *bits != 16 => TT::EntierVersReel { vers },
        (Type::Reel { bits }, Type::Entier { .. }) if transtypage && *bits != 16 => TT::ReelVersEntier { vers },
        (Type::Octet | Type::Bool, &Type::Entier { bits, .. }) if transtypage => {
            if bits > 8 {
                TT::AugmenteTailleType { vers }
            } else {
                TT::ConvertiVersTypeCible { vers }
            }
        }
        (&Type::Entier { bits, .. }, Type::Octet) if transtypage => {
            if bits > 8 {
                TT::ReduitTailleType { vers }
            } else {
                TT::ConvertiVersTypeCible { vers }
            }
        }
        (Type::Enum(_), Type::Entier { .. }) | (Type::Entier { .. }, Type::Enum(_)) if transtypage => {
            TT::ConvertiVersTypeCible { vers }
        }

        /* tableaux */
        (Type::TableauFixe { element, .. }, Type::TableauDynamique(element_vers)) if element == element_vers => {
            TT::ConvertiTableau { vers }
        }
        (Type::TableauFixe { .. } | Type::TableauDynamique(_) | Type::Chaine, _) if vers == Typeuse::TABL_OCTET => {
            TT::ConstruitTablOctet
        }

        /* pointeurs */
        (&Type::Pointeur(pointe_de), &Type::Pointeur(pointe_vers)) => {
            return transformation_pointeur(typeuse, pointe_de, pointe_vers, vers, transtypage);
        }
        (&Type::Reference(pointe_de), &Type::Reference(pointe_vers)) => {
            return conversion_heritage(typeuse, pointe_de, pointe_vers, vers, transtypage).unwrap_or(Trouvee(TT::Impossible));
        }
        (Type::Pointeur(_), &Type::Entier { bits: 64, .. }) | (&Type::Entier { bits: 64, .. }, Type::Pointeur(_))
            if transtypage =>
        {
            TT::ConvertiVersTypeCible { vers }
        }
        (Type::Fonction { .. }, Type::Pointeur(_)) if transtypage && vers == Typeuse::PTR_RIEN => {
            TT::ConvertiVersPtrRien { vers }
        }

        _ => TT::Impossible,
    })
}

/// Union construite depuis une valeur : un et un seul membre doit convenir.
fn construit_union(typeuse: &Typeuse, de: TypeId, vers: TypeId) -> ResultatTransformation {
    use ResultatTransformation::{Attente, Trouvee};

    let Some(donnees) = typeuse.structure(vers) else {
        return Trouvee(TransformationType::Impossible);
    };
    if !donnees.valide {
        return Attente(vers);
    }

    let mut candidat = None;
    for (index, membre) in donnees.membres.iter().enumerate() {
        let convient = membre.type_ == de
            || (de == Typeuse::ENTIER_CONSTANT && typeuse.est_entier(membre.type_))
            || match (typeuse.type_(de), typeuse.type_(membre.type_)) {
                (Type::Pointeur(pd), Type::Pointeur(pm)) => typeuse.decalage_base(*pd, *pm).is_some(),
                _ => false,
            };
        if convient {
            if candidat.is_some() {
                return Trouvee(TransformationType::Impossible);
            }
            candidat = Some(index as u32);
        }
    }

    Trouvee(match candidat {
        Some(index_membre) => TransformationType::ConstruitUnion { vers, index_membre },
        None => TransformationType::Impossible,
    })
}

fn transformation_reel(bits_de: u8, bits_vers: u8, vers: TypeId, transtypage: bool) -> TransformationType {
    use TransformationType as TT;

    let conversion = match (bits_de, bits_vers) {
        (16, 32) => Some(ConversionR16::VersR32),
        (16, 64) => Some(ConversionR16::VersR64),
        (32, 16) if transtypage => Some(ConversionR16::DepuisR32),
        (64, 16) if transtypage => Some(ConversionR16::DepuisR64),
        (_, 16) | (16, _) => return TT::Impossible,
        _ => None,
    };
    if let Some(conversion) = conversion {
        return TT::ConversionR16 { conversion, vers };
    }

    if bits_de < bits_vers {
        TT::AugmenteTailleType { vers }
    } else if transtypage {
        TT::ReduitTailleType { vers }
    } else {
        TT::Impossible
    }
}

fn transformation_pointeur(
    typeuse: &Typeuse,
    pointe_de: TypeId,
    pointe_vers: TypeId,
    vers: TypeId,
    transtypage: bool,
) -> ResultatTransformation {
    use ResultatTransformation::Trouvee;
    use TransformationType as TT;

    if pointe_de == Typeuse::RIEN {
        return Trouvee(TT::ConvertiVersTypeCible { vers });
    }
    if pointe_vers == Typeuse::RIEN {
        return Trouvee(TT::ConvertiVersPtrRien { vers });
    }
    if pointe_vers == Typeuse::OCTET {
        return Trouvee(TT::ConvertiVersTypeCible { vers });
    }

    if let Some(resultat) = conversion_heritage(typeuse, pointe_de, pointe_vers, vers, transtypage) {
        return resultat;
    }

    Trouvee(if transtypage { TT::ConvertiVersTypeCible { vers } } else { TT::Impossible })
}

/// Pointeur ou référence d'une structure vers sa base (`empl`), ou vers une
/// dérivée sous `transtype`. `None` si les types pointés ne sont pas liés.
fn conversion_heritage(
    typeuse: &Typeuse,
    pointe_de: TypeId,
    pointe_vers: TypeId,
    vers: TypeId,
    transtypage: bool,
) -> Option<ResultatTransformation> {
    use ResultatTransformation::{Attente, Trouvee};
    use TransformationType as TT;

    let (Type::Structure(_), Type::Structure(_)) = (typeuse.type_(pointe_de), typeuse.type_(pointe_vers)) else {
        return None;
    };
    for t in [pointe_de, pointe_vers] {
        if !typeuse.est_valide(t) {
            return Some(Attente(t));
        }
    }
    if let Some(decalage) = typeuse.decalage_base(pointe_de, pointe_vers) {
        return Some(Trouvee(TT::ConvertiVersBase { vers, decalage }));
    }
    if transtypage {
        if let Some(decalage) = typeuse.decalage_base(pointe_vers, pointe_de) {
            return Some(Trouvee(TT::ConvertiVersDerive { vers, decalage }));
        }
    }
    None
}

/* ─────────────────────────── Poids ─────────────────────────── */

/// Poids d'un argument de type `de` passé pour un paramètre de type `vers`.
///
/// 1.0 sans transformation, 0.0 si elle est impossible ou si une référence est
/// prise sur une valeur non adressable, 0.5 pour toute autre transformation.
pub fn verifie_compatibilite(typeuse: &Typeuse, vers: TypeId, de: TypeId, noeud: Option<&Noeud>) -> Compatibilite {
    let transformation = match cherche_transformation(typeuse, de, vers, false) {
        ResultatTransformation::Trouvee(t) => t,
        ResultatTransformation::Attente(t) => return Compatibilite::Attente(t),
    };

    let poids = match transformation {
        TransformationType::Inutile => 1.0,
        TransformationType::Impossible => 0.0,
        TransformationType::PrendReference => match noeud {
            Some(n) if !n.possede(DrapeauxNoeud::EST_VALEUR_GAUCHE) => 0.0,
            _ => 1.0,
        },
        _ => 0.5,
    };

    Compatibilite::Poids(poids, transformation)
}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typeuse::MembreStructure;
    use kuri_ast::Forme;
    use kuri_core::Span;
    use kuri_lexer::{GenreLexeme, Lexeme};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use TransformationType as TT;

    fn trouve(t: &Typeuse, de: TypeId, vers: TypeId) -> TransformationType {
        cherche_transformation(t, de, vers, false).transformation().unwrap()
    }

    fn transtype(t: &Typeuse, de: TypeId, vers: TypeId) -> TransformationType {
        cherche_transformation(t, de, vers, true).transformation().unwrap()
    }

    fn structure(t: &mut Typeuse, nom: &str, est_union: bool, membres: &[(&str, TypeId, bool)]) -> TypeId {
        let id = t.cree_structure(nom, None, est_union);
        t.structure_mut(id).unwrap().membres = membres
            .iter()
            .map(|(nom, type_, est_employe)| MembreStructure {
                nom: (*nom).into(),
                type_: *type_,
                decalage: 0,
                est_employe: *est_employe,
                defaut: None,
            })
            .collect();
        t.calcule_disposition(id).unwrap();
        id
    }

    #[test]
    fn retrecissement_selon_le_mode() {
        let t = Typeuse::new();
        assert_eq!(trouve(&t, Typeuse::N64, Typeuse::N32), TT::Impossible);
        assert_eq!(transtype(&t, Typeuse::N64, Typeuse::N32), TT::ReduitTailleType { vers: Typeuse::N32 });
        assert_eq!(trouve(&t, Typeuse::N32, Typeuse::N64), TT::AugmenteTailleType { vers: Typeuse::N64 });
        assert_eq!(trouve(&t, Typeuse::N32, Typeuse::Z64), TT::Impossible);
        assert_eq!(transtype(&t, Typeuse::N32, Typeuse::Z32), TT::ConvertiVersTypeCible { vers: Typeuse::Z32 });
    }

    #[test]
    fn entier_constant() {
        let mut t = Typeuse::new();
        for vers in [Typeuse::Z8, Typeuse::N64, Typeuse::OCTET, Typeuse::R32] {
            assert_eq!(trouve(&t, Typeuse::ENTIER_CONSTANT, vers), TT::ConvertiEntierConstant { vers });
        }
        assert_eq!(trouve(&t, Typeuse::ENTIER_CONSTANT, Typeuse::CHAINE), TT::Impossible);

        // vers un pointeur, seulement sous transtype
        let pz = t.pointeur(Typeuse::Z32);
        assert_eq!(trouve(&t, Typeuse::ENTIER_CONSTANT, pz), TT::Impossible);
        assert_eq!(transtype(&t, Typeuse::ENTIER_CONSTANT, pz), TT::ConvertiEntierConstant { vers: pz });
    }

    #[test]
    fn reels_et_r16() {
        let t = Typeuse::new();
        assert_eq!(
            trouve(&t, Typeuse::R16, Typeuse::R32),
            TT::ConversionR16 { conversion: ConversionR16::VersR32, vers: Typeuse::R32 }
        );
        assert_eq!(trouve(&t, Typeuse::R32, Typeuse::R16), TT::Impossible);
        assert_eq!(
            transtype(&t, Typeuse::R64, Typeuse::R16),
            TT::ConversionR16 { conversion: ConversionR16::DepuisR64, vers: Typeuse::R16 }
        );
        assert_eq!(trouve(&t, Typeuse::R32, Typeuse::R64), TT::AugmenteTailleType { vers: Typeuse::R64 });
        assert_eq!(trouve(&t, Typeuse::Z32, Typeuse::R64), TT::Impossible);
        assert_eq!(transtype(&t, Typeuse::Z32, Typeuse::R64), TT::EntierVersReel { vers: Typeuse::R64 });
        assert_eq!(transtype(&t, Typeuse::R32, Typeuse::Z32), TT::ReelVersEntier { vers: Typeuse::Z32 });
    }

    #[test]
    fn construction_d_union() {
        let mut t = Typeuse::new();
        let u = structure(&mut t, "U", true, &[("e", Typeuse::Z32, false), ("r", Typeuse::R64, false)]);
        assert_eq!(trouve(&t, Typeuse::R64, u), TT::ConstruitUnion { vers: u, index_membre: 1 });
        assert_eq!(trouve(&t, Typeuse::ENTIER_CONSTANT, u), TT::ConstruitUnion { vers: u, index_membre: 0 });
        assert_eq!(trouve(&t, Typeuse::CHAINE, u), TT::Impossible);
        assert_eq!(trouve(&t, u, Typeuse::R64), TT::ExtraitUnion { vers: Typeuse::R64, index_membre: 1 });
    }

    #[test]
    fn union_ambigue_refusee() {
        let mut t = Typeuse::new();
        let u = structure(&mut t, "U", true, &[("a", Typeuse::Z32, false), ("b", Typeuse::Z64, false)]);
        assert_eq!(trouve(&t, Typeuse::ENTIER_CONSTANT, u), TT::Impossible);
        assert_eq!(trouve(&t, Typeuse::Z64, u), TT::ConstruitUnion { vers: u, index_membre: 1 });
    }

    #[test]
    fn attente_sur_type_non_valide() {
        let mut t = Typeuse::new();
        let u = t.cree_structure("U", None, true);
        let s = t.cree_structure("S", None, false);
        assert_eq!(cherche_transformation(&t, Typeuse::Z32, u, false), ResultatTransformation::Attente(u));
        assert_eq!(cherche_transformation(&t, s, Typeuse::EINI, false), ResultatTransformation::Attente(s));
        assert_eq!(cherche_transformation(&t, Typeuse::EINI, s, false).transformation(), Some(TT::ExtraitEini { vers: s }));
    }

    #[test]
    fn base_et_derive() {
        let mut t = Typeuse::new();
        let base = structure(&mut t, "Base", false, &[("x", Typeuse::Z32, false)]);
        let derive = structure(&mut t, "Derive", false, &[("y", Typeuse::Z64, false), ("b", base, true)]);
        let pb = t.pointeur(base);
        let pd = t.pointeur(derive);

        assert_eq!(trouve(&t, pd, pb), TT::ConvertiVersBase { vers: pb, decalage: 8 });
        assert_eq!(trouve(&t, pb, pd), TT::Impossible);
        assert_eq!(transtype(&t, pb, pd), TT::ConvertiVersDerive { vers: pd, decalage: 8 });

        let rb = t.reference(base);
        let rd = t.reference(derive);
        assert_eq!(trouve(&t, rd, rb), TT::ConvertiVersBase { vers: rb, decalage: 8 });
        assert_eq!(trouve(&t, rb, rd), TT::Impossible);
        assert_eq!(transtype(&t, rb, rd), TT::ConvertiVersDerive { vers: rd, decalage: 8 });
    }

    #[test]
    fn pointeurs_sentinelles() {
        let mut t = Typeuse::new();
        let pz = t.pointeur(Typeuse::Z32);
        let pr = t.pointeur(Typeuse::R32);
        assert_eq!(trouve(&t, pz, Typeuse::PTR_RIEN), TT::ConvertiVersPtrRien { vers: Typeuse::PTR_RIEN });
        assert_eq!(trouve(&t, Typeuse::PTR_RIEN, pz), TT::ConvertiVersTypeCible { vers: pz });
        assert_eq!(trouve(&t, Typeuse::NUL, pz), TT::ConvertiVersTypeCible { vers: pz });
        assert_eq!(trouve(&t, pz, pr), TT::Impossible);
        assert_eq!(transtype(&t, pz, pr), TT::ConvertiVersTypeCible { vers: pr });
        assert_eq!(transtype(&t, pz, Typeuse::N64), TT::ConvertiVersTypeCible { vers: Typeuse::N64 });
    }

    #[test]
    fn tableaux() {
        let mut t = Typeuse::new();
        let fixe = t.tableau_fixe(Typeuse::Z32, 3);
        let dyn_ = t.tableau_dynamique(Typeuse::Z32);
        let dyn_r = t.tableau_dynamique(Typeuse::R32);
        assert_eq!(trouve(&t, fixe, dyn_), TT::ConvertiTableau { vers: dyn_ });
        assert_eq!(trouve(&t, fixe, dyn_r), TT::Impossible);
        assert_eq!(trouve(&t, dyn_, Typeuse::TABL_OCTET), TT::ConstruitTablOctet);
        assert_eq!(trouve(&t, Typeuse::CHAINE, Typeuse::TABL_OCTET), TT::ConstruitTablOctet);
    }

    #[test]
    fn poids_des_references() {
        let mut t = Typeuse::new();
        let rz = t.reference(Typeuse::Z32);
        let mut n = Noeud::new(Forme::Reference { declaration: None }, Lexeme::new(GenreLexeme::ChaineCaractere, "x", Span::default()));

        assert_eq!(verifie_compatibilite(&t, rz, Typeuse::Z32, Some(&n)), Compatibilite::Poids(0.0, TT::PrendReference));
        n.drapeaux |= DrapeauxNoeud::EST_VALEUR_GAUCHE;
        assert_eq!(verifie_compatibilite(&t, rz, Typeuse::Z32, Some(&n)), Compatibilite::Poids(1.0, TT::PrendReference));
        assert_eq!(verifie_compatibilite(&t, rz, Typeuse::Z32, None), Compatibilite::Poids(1.0, TT::PrendReference));
        assert_eq!(
            verifie_compatibilite(&t, Typeuse::Z64, Typeuse::Z32, None),
            Compatibilite::Poids(0.5, TT::AugmenteTailleType { vers: Typeuse::Z64 })
        );
        assert_eq!(verifie_compatibilite(&t, Typeuse::Z32, Typeuse::Z32, None), Compatibilite::Poids(1.0, TT::Inutile));
    }

    proptest! {
        #[test]
        fn reflexivite(index in 0u32..23, transtypage: bool) {
            let t = Typeuse::new();
            let id = TypeId(index);
            prop_assert_eq!(cherche_transformation(&t, id, id, transtypage), ResultatTransformation::Trouvee(TT::Inutile));
        }
    }
}
