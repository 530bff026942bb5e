//! Table des types canoniques.
//!
//! Chaque forme de type n'existe qu'une fois : deux `TypeId` égaux désignent le
//! même type, et deux types structurellement identiques ont le même `TypeId`.

use core::fmt::Write as _;

use indexmap::IndexSet;
use kuri_ast::{NoeudId, TypeId};

/* ─────────────────────────── Types ─────────────────────────── */

/// Forme d'un type canonique.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// `rien`
    Rien,
    /// `bool`
    Bool,
    /// `octet`
    Octet,
    /// `n8` … `n64`, `z8` … `z64`.
    Entier {
        /// Relatif (signé).
        signe: bool,
        /// Largeur en bits.
        bits: u8,
    },
    /// Littéral entier pas encore typé.
    EntierConstant,
    /// `r16`, `r32`, `r64`.
    Reel {
        /// Largeur en bits.
        bits: u8,
    },
    /// `chaine` : pointeur et taille.
    Chaine,
    /// `eini` : pointeur vers la valeur et son info-type.
    Eini,
    /// Type du littéral `nul`.
    Nul,
    /// Métadonnées de réflexion générées par type.
    InfoType,
    /// `*T`
    Pointeur(TypeId),
    /// `&T`
    Reference(TypeId),
    /// `[N]T`
    TableauFixe {
        /// Type des éléments.
        element: TypeId,
        /// Nombre d'éléments.
        taille: u64,
    },
    /// `[]T`
    TableauDynamique(TypeId),
    /// `...T` ; `None` pour les variadiques C des fonctions externes.
    Variadique(Option<TypeId>),
    /// `fonc(…)(…)` ou `corout(…)(…)`.
    Fonction {
        /// Paramètres.
        entrees: Vec<TypeId>,
        /// Retours.
        sorties: Vec<TypeId>,
        /// Coroutine.
        est_coroutine: bool,
        /// Sans paramètre de contexte.
        nulctx: bool,
    },
    /// Valeurs multiples d'un appel à plusieurs retours.
    Tuple(Vec<TypeId>),
    /// Structure, index dans la table des structures.
    Structure(u32),
    /// Union, index dans la table des structures.
    Union(u32),
    /// Énum, index dans la table des énums.
    Enum(u32),
}

/// Membre d'une structure ou d'une union.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembreStructure {
    /// Nom dans la source.
    pub nom: String,
    /// Type résolu.
    pub type_: TypeId,
    /// Décalage en octets depuis le début de la structure.
    pub decalage: u32,
    /// Membre `empl`.
    pub est_employe: bool,
    /// Expression de la valeur par défaut.
    pub defaut: Option<NoeudId>,
}

/// Données d'une structure ou d'une union.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DonneesStructure {
    /// Nom dans la source.
    pub nom: String,
    /// Déclaration d'origine.
    pub decl: Option<NoeudId>,
    /// Membres, dans l'ordre de déclaration.
    pub membres: Vec<MembreStructure>,
    /// Union plutôt que structure.
    pub est_union: bool,
    /// Union `nonsûr` : pas de membre actif.
    pub est_nonsur: bool,
    /// Déclarée `externe` : définie dans un en-tête C.
    pub est_externe: bool,
    /// Taille en octets, valide une fois la disposition calculée.
    pub taille: u32,
    /// Alignement en octets.
    pub alignement: u32,
    /// Membres et disposition connus.
    pub valide: bool,
}

impl DonneesStructure {
    /// Index d'un membre par son nom.
    pub fn index_membre(&self, nom: &str) -> Option<usize> { self.membres.iter().position(|m| m.nom == nom) }

    /// Union sûre : porte un discriminant `membre_actif`.
    pub const fn est_union_sure(&self) -> bool { self.est_union && !self.est_nonsur && !self.est_externe }
}

/// Données d'une énum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DonneesEnum {
    /// Nom dans la source.
    pub nom: String,
    /// Déclaration d'origine.
    pub decl: Option<NoeudId>,
    /// Type entier sous-jacent.
    pub type_sous_jacent: TypeId,
    /// Valeurs, dans l'ordre de déclaration.
    pub valeurs: Vec<(String, i64)>,
    /// Valeurs calculées.
    pub valide: bool,
}

/* ─────────────────────────── Typeuse ─────────────────────────── */

/// Table des types d'une compilation.
#[derive(Debug, Clone)]
pub struct Typeuse {
    types: IndexSet<Type>,
    structures: Vec<DonneesStructure>,
    enums: Vec<DonneesEnum>,
}

impl Default for Typeuse {
    fn default() -> Self { Self::new() }
}

impl Typeuse {
    /// `rien`
    pub const RIEN: TypeId = TypeId(0);
    /// `bool`
    pub const BOOL: TypeId = TypeId(1);
    /// `octet`
    pub const OCTET: TypeId = TypeId(2);
    /// `n8`
    pub const N8: TypeId = TypeId(3);
    /// `n16`
    pub const N16: TypeId = TypeId(4);
    /// `n32`
    pub const N32: TypeId = TypeId(5);
    /// `n64`
    pub const N64: TypeId = TypeId(6);
    /// `z8`
    pub const Z8: TypeId = TypeId(7);
    /// `z16`
    pub const Z16: TypeId = TypeId(8);
    /// `z32`
    pub const Z32: TypeId = TypeId(9);
    /// `z64`
    pub const Z64: TypeId = TypeId(10);
    /// `r16`
    pub const R16: TypeId = TypeId(11);
    /// `r32`
    pub const R32: TypeId = TypeId(12);
    /// `r64`
    pub const R64: TypeId = TypeId(13);
    /// Entier littéral non typé.
    pub const ENTIER_CONSTANT: TypeId = TypeId(14);
    /// `chaine`
    pub const CHAINE: TypeId = TypeId(15);
    /// `eini`
    pub const EINI: TypeId = TypeId(16);
    /// Type de `nul`.
    pub const NUL: TypeId = TypeId(17);
    /// `InfoType`
    pub const INFO_TYPE: TypeId = TypeId(18);
    /// `*rien`
    pub const PTR_RIEN: TypeId = TypeId(19);
    /// `*octet`
    pub const PTR_OCTET: TypeId = TypeId(20);
    /// `*InfoType`
    pub const PTR_INFO_TYPE: TypeId = TypeId(21);
    /// `[]octet`
    pub const TABL_OCTET: TypeId = TypeId(22);

    /// Table contenant les types prédéfinis.
    pub fn new() -> Self {
        let mut t = Self { types: IndexSet::new(), structures: Vec::new(), enums: Vec::new() };
        for type_ in [
            Type::Rien,
            Type::Bool,
            Type::Octet,
            Type::Entier { signe: false, bits: 8 },
            Type::Entier { signe: false, bits: 16 },
            Type::Entier { signe: false, bits: 32 },
            Type::Entier { signe: false, bits: 64 },
            Type::Entier { signe: true, bits: 8 },
            Type::Entier { signe: true, bits: 16 },
            Type::Entier { signe: true, bits: 32 },
            Type::Entier { signe: true, bits: 64 },
            Type::Reel { bits: 16 },
            Type::Reel { bits: 32 },
            Type::Reel { bits: 64 },
            Type::EntierConstant,
            Type::Chaine,
            Type::Eini,
            Type::Nul,
            Type::InfoType,
            Type::Pointeur(Self::RIEN),
            Type::Pointeur(Self::OCTET),
            Type::Pointeur(Self::INFO_TYPE),
            Type::TableauDynamique(Self::OCTET),
        ] {
            t.ajoute(type_);
        }
        t
    }

    /* ─────────── Construction ─────────── */

    /// Identifiant canonique d'une forme de type.
    pub fn ajoute(&mut self, type_: Type) -> TypeId {
        let (index, _) = self.types.insert_full(type_);
        TypeId(index as u32)
    }

    /// `*T`
    pub fn pointeur(&mut self, t: TypeId) -> TypeId { self.ajoute(Type::Pointeur(t)) }

    /// `&T`
    pub fn reference(&mut self, t: TypeId) -> TypeId { self.ajoute(Type::Reference(t)) }

    /// `[N]T`
    pub fn tableau_fixe(&mut self, element: TypeId, taille: u64) -> TypeId {
        self.ajoute(Type::TableauFixe { element, taille })
    }

    /// `[]T`
    pub fn tableau_dynamique(&mut self, element: TypeId) -> TypeId { self.ajoute(Type::TableauDynamique(element)) }

    /// `...T`
    pub fn variadique(&mut self, element: Option<TypeId>) -> TypeId { self.ajoute(Type::Variadique(element)) }

    /// Type de fonction.
    pub fn fonction(&mut self, entrees: Vec<TypeId>, sorties: Vec<TypeId>, est_coroutine: bool, nulctx: bool) -> TypeId {
        self.ajoute(Type::Fonction { entrees, sorties, est_coroutine, nulctx })
    }

    /// Plusieurs valeurs ; un seul élément donne l'élément lui-même.
    pub fn tuple(&mut self, types: Vec<TypeId>) -> TypeId {
        match types.as_slice() {
            [] => Self::RIEN,
            [t] => *t,
            _ => self.ajoute(Type::Tuple(types)),
        }
    }

    /// Nouvelle structure ou union, sans membres.
    pub fn cree_structure(&mut self, nom: &str, decl: Option<NoeudId>, est_union: bool) -> TypeId {
        let index = self.structures.len() as u32;
        self.structures.push(DonneesStructure {
            nom: nom.to_owned(),
            decl,
            membres: Vec::new(),
            est_union,
            est_nonsur: false,
            est_externe: false,
            taille: 0,
            alignement: 1,
            valide: false,
        });
        self.ajoute(if est_union { Type::Union(index) } else { Type::Structure(index) })
    }

    /// Nouvelle énum, sans valeurs.
    pub fn cree_enum(&mut self, nom: &str, decl: Option<NoeudId>, type_sous_jacent: TypeId) -> TypeId {
        let index = self.enums.len() as u32;
        self.enums.push(DonneesEnum { nom: nom.to_owned(), decl, type_sous_jacent, valeurs: Vec::new(), valide: false });
        self.ajoute(Type::Enum(index))
    }

    /* ─────────── Accès ─────────── */

    /// Forme d'un type.
    pub fn type_(&self, id: TypeId) -> &Type {
        self.types.get_index(id.index()).unwrap_or(&Type::Rien)
    }

    /// Nombre de types.
    pub fn len(&self) -> usize { self.types.len() }

    /// Jamais vrai : les types prédéfinis sont toujours présents.
    pub fn is_empty(&self) -> bool { self.types.is_empty() }

    /// Tous les types, par identifiant croissant.
    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &Type)> {
        self.types.iter().enumerate().map(|(i, t)| (TypeId(i as u32), t))
    }

    /// Données de structure ou d'union.
    pub fn structure(&self, id: TypeId) -> Option<&DonneesStructure> {
        match self.type_(id) {
            Type::Structure(i) | Type::Union(i) => self.structures.get(*i as usize),
            _ => None,
        }
    }

    /// Variante mutable de [`Typeuse::structure`].
    pub fn structure_mut(&mut self, id: TypeId) -> Option<&mut DonneesStructure> {
        match self.types.get_index(id.index()) {
            Some(Type::Structure(i) | Type::Union(i)) => self.structures.get_mut(*i as usize),
            _ => None,
        }
    }

    /// Données d'énum.
    pub fn enum_(&self, id: TypeId) -> Option<&DonneesEnum> {
        match self.type_(id) {
            Type::Enum(i) => self.enums.get(*i as usize),
            _ => None,
        }
    }

    /// Variante mutable de [`Typeuse::enum_`].
    pub fn enum_mut(&mut self, id: TypeId) -> Option<&mut DonneesEnum> {
        match self.types.get_index(id.index()) {
            Some(Type::Enum(i)) => self.enums.get_mut(*i as usize),
            _ => None,
        }
    }

    /* ─────────── Prédicats ─────────── */

    /// Entier typé (hors octet et littéral).
    pub fn est_entier(&self, id: TypeId) -> bool { matches!(self.type_(id), Type::Entier { .. }) }

    /// Entier, octet, littéral entier ou énum.
    pub fn est_entier_ou_assimile(&self, id: TypeId) -> bool {
        matches!(self.type_(id), Type::Entier { .. } | Type::EntierConstant | Type::Octet | Type::Enum(_))
    }

    /// `r16`, `r32`, `r64`.
    pub fn est_reel(&self, id: TypeId) -> bool { matches!(self.type_(id), Type::Reel { .. }) }

    /// Entier ou réel.
    pub fn est_numerique(&self, id: TypeId) -> bool {
        matches!(self.type_(id), Type::Entier { .. } | Type::EntierConstant | Type::Octet | Type::Reel { .. })
    }

    /// `*T` ou `nul`.
    pub fn est_pointeur(&self, id: TypeId) -> bool { matches!(self.type_(id), Type::Pointeur(_) | Type::Nul) }

    /// Type pointé par `*T` ou `&T`.
    pub fn pointe(&self, id: TypeId) -> Option<TypeId> {
        match self.type_(id) {
            Type::Pointeur(t) | Type::Reference(t) => Some(*t),
            _ => None,
        }
    }

    /// Élément d'un tableau, d'un variadique ou `octet` pour une chaîne.
    pub fn element(&self, id: TypeId) -> Option<TypeId> {
        match self.type_(id) {
            Type::TableauFixe { element, .. } | Type::TableauDynamique(element) | Type::Variadique(Some(element)) => {
                Some(*element)
            }
            Type::Chaine => Some(Self::Z8),
            _ => None,
        }
    }

    /// Structure, union ou énum dont les données sont complètes.
    ///
    /// Les types composés sont valides si leur contenu l'est ; un pointeur ne
    /// demande pas la validation du type pointé.
    pub fn est_valide(&self, id: TypeId) -> bool { self.type_en_attente(id).is_none() }

    /// Premier type non validé dont dépend la disposition de `id`.
    pub fn type_en_attente(&self, id: TypeId) -> Option<TypeId> {
        match self.type_(id) {
            Type::Structure(i) | Type::Union(i) => (!self.structures[*i as usize].valide).then_some(id),
            Type::Enum(i) => (!self.enums[*i as usize].valide).then_some(id),
            Type::TableauFixe { element, .. } => self.type_en_attente(*element),
            Type::Tuple(ts) => ts.iter().find_map(|t| self.type_en_attente(*t)),
            _ => None,
        }
    }

    /* ─────────── Disposition ─────────── */

    /// Taille en octets.
    pub fn taille_de(&self, id: TypeId) -> u32 {
        match self.type_(id) {
            Type::Rien | Type::Nul => 0,
            Type::Bool | Type::Octet => 1,
            Type::Entier { bits, .. } | Type::Reel { bits } => u32::from(*bits) / 8,
            Type::EntierConstant => 4,
            Type::Pointeur(_) | Type::Reference(_) | Type::Fonction { .. } => 8,
            Type::Chaine | Type::Eini | Type::TableauDynamique(_) | Type::Variadique(_) => 16,
            Type::InfoType => 24,
            Type::TableauFixe { element, taille } => {
                self.taille_de(*element).saturating_mul(u32::try_from(*taille).unwrap_or(u32::MAX))
            }
            Type::Tuple(ts) => ts.iter().map(|t| self.taille_de(*t)).sum(),
            Type::Structure(i) | Type::Union(i) => self.structures[*i as usize].taille,
            Type::Enum(i) => self.taille_de(self.enums[*i as usize].type_sous_jacent),
        }
    }

    /// Alignement en octets.
    pub fn alignement(&self, id: TypeId) -> u32 {
        match self.type_(id) {
            Type::Rien | Type::Nul | Type::Bool | Type::Octet => 1,
            Type::Entier { bits, .. } | Type::Reel { bits } => u32::from(*bits) / 8,
            Type::EntierConstant => 4,
            Type::TableauFixe { element, .. } => self.alignement(*element),
            Type::Tuple(ts) => ts.iter().map(|t| self.alignement(*t)).max().unwrap_or(1),
            Type::Structure(i) | Type::Union(i) => self.structures[*i as usize].alignement,
            Type::Enum(i) => self.alignement(self.enums[*i as usize].type_sous_jacent),
            _ => 8,
        }
    }

    /// Calcule décalages, taille et alignement d'une structure dont les membres sont typés.
    ///
    /// Renvoie le type membre à attendre si l'un d'eux n'est pas encore disposé.
    pub fn calcule_disposition(&mut self, id: TypeId) -> Result<(), TypeId> {
        let Some(donnees) = self.structure(id) else { return Ok(()) };
        if let Some(attente) = donnees.membres.iter().find_map(|m| self.type_en_attente(m.type_)) {
            return Err(attente);
        }

        let est_union = donnees.est_union;
        let union_sure = donnees.est_union_sure();
        let mut decalages = Vec::with_capacity(donnees.membres.len());
        let mut taille = 0u32;
        let mut alignement = 1u32;

        for m in &donnees.membres {
            let (t, a) = (self.taille_de(m.type_), self.alignement(m.type_).max(1));
            alignement = alignement.max(a);
            if est_union {
                decalages.push(0);
                taille = taille.max(t);
            } else {
                let decalage = aligne(taille, a);
                decalages.push(decalage);
                taille = decalage + t;
            }
        }

        if union_sure {
            // int membre_actif après la donnée
            alignement = alignement.max(4);
            taille = aligne(taille, 4) + 4;
        }
        let taille = aligne(taille, alignement);

        if let Some(donnees) = self.structure_mut(id) {
            for (m, d) in donnees.membres.iter_mut().zip(decalages) {
                m.decalage = d;
            }
            donnees.taille = taille;
            donnees.alignement = alignement;
            donnees.valide = true;
        }
        Ok(())
    }

    /// Décalage cumulé de la base employée `base` dans la structure `derive`.
    ///
    /// Parcourt la chaîne des membres `empl`, en largeur.
    pub fn decalage_base(&self, derive: TypeId, base: TypeId) -> Option<u32> {
        let mut file = vec![(derive, 0u32)];
        let mut vus = Vec::new();
        while let Some((courant, decalage)) = file.pop() {
            if vus.contains(&courant) {
                continue;
            }
            vus.push(courant);
            let Some(donnees) = self.structure(courant) else { continue };
            for m in donnees.membres.iter().filter(|m| m.est_employe) {
                if m.type_ == base {
                    return Some(decalage + m.decalage);
                }
                file.insert(0, (m.type_, decalage + m.decalage));
            }
        }
        None
    }

    /* ─────────── Noms ─────────── */

    /// Nom du type dans la syntaxe Kuri, pour les messages.
    pub fn nom(&self, id: TypeId) -> String {
        let mut s = String::new();
        self.ecris_nom(id, &mut s);
        s
    }

    fn ecris_nom(&self, id: TypeId, s: &mut String) {
        match self.type_(id) {
            Type::Rien => s.push_str("rien"),
            Type::Bool => s.push_str("bool"),
            Type::Octet => s.push_str("octet"),
            Type::Entier { signe, bits } => {
                let _ = write!(s, "{}{bits}", if *signe { 'z' } else { 'n' });
            }
            Type::EntierConstant => s.push_str("entier_constant"),
            Type::Reel { bits } => {
                let _ = write!(s, "r{bits}");
            }
            Type::Chaine => s.push_str("chaine"),
            Type::Eini => s.push_str("eini"),
            Type::Nul => s.push_str("nul"),
            Type::InfoType => s.push_str("InfoType"),
            Type::Pointeur(t) => {
                s.push('*');
                self.ecris_nom(*t, s);
            }
            Type::Reference(t) => {
                s.push('&');
                self.ecris_nom(*t, s);
            }
            Type::TableauFixe { element, taille } => {
                let _ = write!(s, "[{taille}]");
                self.ecris_nom(*element, s);
            }
            Type::TableauDynamique(t) => {
                s.push_str("[]");
                self.ecris_nom(*t, s);
            }
            Type::Variadique(t) => {
                s.push_str("...");
                if let Some(t) = t {
                    self.ecris_nom(*t, s);
                }
            }
            Type::Fonction { entrees, sorties, est_coroutine, nulctx } => {
                if *nulctx {
                    s.push_str("#nulctx ");
                }
                s.push_str(if *est_coroutine { "corout(" } else { "fonc(" });
                self.ecris_liste(entrees, s);
                s.push_str(")(");
                self.ecris_liste(sorties, s);
                s.push(')');
            }
            Type::Tuple(ts) => {
                s.push('(');
                self.ecris_liste(ts, s);
                s.push(')');
            }
            Type::Structure(i) | Type::Union(i) => s.push_str(&self.structures[*i as usize].nom),
            Type::Enum(i) => s.push_str(&self.enums[*i as usize].nom),
        }
    }

    fn ecris_liste(&self, ts: &[TypeId], s: &mut String) {
        for (i, t) in ts.iter().enumerate() {
            if i != 0 {
                s.push_str(", ");
            }
            self.ecris_nom(*t, s);
        }
    }
}

const fn aligne(valeur: u32, alignement: u32) -> u32 {
    if alignement <= 1 {
        return valeur;
    }
    valeur.div_ceil(alignement) * alignement
}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn membre(nom: &str, type_: TypeId, est_employe: bool) -> MembreStructure {
        MembreStructure { nom: nom.into(), type_, decalage: 0, est_employe, defaut: None }
    }

    #[test]
    fn types_dedupliques() {
        let mut t = Typeuse::new();
        let a = t.pointeur(Typeuse::Z32);
        let b = t.pointeur(Typeuse::Z32);
        assert_eq!(a, b);
        assert_eq!(t.pointeur(Typeuse::RIEN), Typeuse::PTR_RIEN);
        assert_eq!(t.tableau_dynamique(Typeuse::OCTET), Typeuse::TABL_OCTET);
        assert_ne!(t.tableau_fixe(Typeuse::Z32, 4), t.tableau_fixe(Typeuse::Z32, 5));
        let f1 = t.fonction(vec![Typeuse::Z32], vec![Typeuse::BOOL], false, false);
        let f2 = t.fonction(vec![Typeuse::Z32], vec![Typeuse::BOOL], false, false);
        assert_eq!(f1, f2);
        assert_eq!(t.nom(f1), "fonc(z32)(bool)");
    }

    #[test]
    fn structures_distinctes_par_declaration() {
        let mut t = Typeuse::new();
        let a = t.cree_structure("A", None, false);
        let b = t.cree_structure("A", None, false);
        assert_ne!(a, b);
        let pa = t.pointeur(a);
        assert_eq!(t.nom(pa), "*A");
    }

    #[test]
    fn disposition_structure() {
        let mut t = Typeuse::new();
        let s = t.cree_structure("S", None, false);
        t.structure_mut(s).unwrap().membres = vec![
            membre("a", Typeuse::Z8, false),
            membre("b", Typeuse::Z64, false),
            membre("c", Typeuse::Z16, false),
        ];
        assert!(!t.est_valide(s));
        t.calcule_disposition(s).unwrap();
        let d = t.structure(s).unwrap();
        assert_eq!(d.membres.iter().map(|m| m.decalage).collect::<Vec<_>>(), vec![0, 8, 16]);
        assert_eq!(d.taille, 24);
        assert_eq!(d.alignement, 8);
        assert!(t.est_valide(s));
    }

    #[test]
    fn disposition_union_sure() {
        let mut t = Typeuse::new();
        let u = t.cree_structure("U", None, true);
        t.structure_mut(u).unwrap().membres = vec![membre("e", Typeuse::Z32, false), membre("r", Typeuse::R64, false)];
        t.calcule_disposition(u).unwrap();
        assert_eq!(t.taille_de(u), 16);

        let n = t.cree_structure("N", None, true);
        t.structure_mut(n).unwrap().est_nonsur = true;
        t.structure_mut(n).unwrap().membres = vec![membre("e", Typeuse::Z32, false), membre("r", Typeuse::R64, false)];
        t.calcule_disposition(n).unwrap();
        assert_eq!(t.taille_de(n), 8);
    }

    #[test]
    fn disposition_attend_les_membres() {
        let mut t = Typeuse::new();
        let a = t.cree_structure("A", None, false);
        let b = t.cree_structure("B", None, false);
        let pb = t.pointeur(b);
        t.structure_mut(a).unwrap().membres = vec![membre("b", b, false)];
        assert_eq!(t.calcule_disposition(a), Err(b));
        t.structure_mut(a).unwrap().membres = vec![membre("b", pb, false)];
        assert_eq!(t.calcule_disposition(a), Ok(()));
    }

    #[test]
    fn decalage_par_la_chaine_empl() {
        let mut t = Typeuse::new();
        let base = t.cree_structure("Base", None, false);
        t.structure_mut(base).unwrap().membres = vec![membre("x", Typeuse::Z32, false)];
        t.calcule_disposition(base).unwrap();

        let milieu = t.cree_structure("Milieu", None, false);
        t.structure_mut(milieu).unwrap().membres = vec![membre("a", Typeuse::Z64, false), membre("base", base, true)];
        t.calcule_disposition(milieu).unwrap();

        let derive = t.cree_structure("Derive", None, false);
        t.structure_mut(derive).unwrap().membres = vec![membre("b", Typeuse::Z32, false), membre("m", milieu, true)];
        t.calcule_disposition(derive).unwrap();

        assert_eq!(t.decalage_base(milieu, base), Some(8));
        assert_eq!(t.decalage_base(derive, base), Some(16));
        assert_eq!(t.decalage_base(base, derive), None);
    }

    #[test]
    fn tailles_et_noms() {
        let mut t = Typeuse::new();
        let tab = t.tableau_fixe(Typeuse::Z32, 4);
        assert_eq!(t.taille_de(tab), 16);
        assert_eq!(t.nom(tab), "[4]z32");
        assert_eq!(t.taille_de(Typeuse::CHAINE), 16);
        assert_eq!(t.tuple(vec![Typeuse::Z32]), Typeuse::Z32);
        assert_eq!(t.tuple(Vec::new()), Typeuse::RIEN);
    }
}
