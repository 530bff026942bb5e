//! Noeuds de l'arbre : une forme typée par genre.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use kuri_lexer::Lexeme;

use crate::{DrapeauxNoeud, NoeudId, TransformationType, TypeDeclare, TypeId};

/// Genre d'un noeud, déduit de sa forme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[allow(missing_docs)]
pub enum GenreNoeud {
    Racine,
    DeclarationFonction,
    DeclarationStructure,
    DeclarationEnum,
    DeclarationVariable,
    Assignation,
    ExpressionBinaire,
    ExpressionUnaire,
    AccesMembre,
    Indexage,
    Plage,
    Virgule,
    Appel,
    Reference,
    NombreEntier,
    NombreReel,
    ChaineLitterale,
    Caractere,
    Booleen,
    Nul,
    TailleDe,
    InfoDe,
    Memoire,
    Transtype,
    Loge,
    Reloge,
    Deloge,
    ConstruitTableau,
    ExpansionVariadique,
    Si,
    Bloc,
    Retour,
    Retiens,
    Boucle,
    Repete,
    Tantque,
    Pour,
    Controle,
    Differe,
    NonSur,
    Discr,
    PaireDiscr,
    Importe,
    Charge,
}

/// Données d'une déclaration de fonction ou de coroutine.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeclFonction {
    /// Paramètres (`DeclarationVariable`).
    pub parametres: Vec<NoeudId>,
    /// Types de retour déclarés (vide : `rien`).
    pub types_retour: Vec<TypeDeclare>,
    /// Corps (absent pour les fonctions externes).
    pub bloc: Option<NoeudId>,
    /// Nom C, renseigné par la validation.
    pub nom_broye: String,
}

/// Cible résolue d'un appel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Resolution {
    /// Appel direct d'une fonction déclarée.
    Fonction(NoeudId),
    /// Appel à travers une variable de type fonction.
    Pointeur(NoeudId),
    /// Construction d'une structure ou d'une union.
    Structure(TypeId),
}

/// Forme d'un noeud : enfants typés propres à chaque genre.
///
/// Les emplacements `Option<NoeudId>` sont remplis dans l'ordre par
/// [`Forme::ajoute_enfant`], ce qui permet à l'assembleuse d'attacher un enfant
/// au noeud courant sans connaître sa forme.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[allow(missing_docs)]
pub enum Forme {
    /// Déclarations de haut niveau d'un fichier.
    Racine { declarations: Vec<NoeudId> },
    /// `nom :: fonc (…) : … { … }`
    DeclarationFonction(Box<DeclFonction>),
    /// `Nom :: struct { … }` ou union.
    DeclarationStructure { membres: Vec<NoeudId>, est_union: bool },
    /// `Nom :: énum T { … }`
    DeclarationEnum { membres: Vec<NoeudId> },
    /// `x := e`, `x : T = e`, `x : T`.
    DeclarationVariable { cible: Option<NoeudId>, valeur: Option<NoeudId> },
    /// `a = b` et assignations composées.
    Assignation { cible: Option<NoeudId>, valeur: Option<NoeudId> },
    /// Opération arithmétique, logique ou de comparaison.
    ExpressionBinaire { gauche: Option<NoeudId>, droite: Option<NoeudId> },
    /// `-x`, `!x`, `~x`, `@x`.
    ExpressionUnaire { operande: Option<NoeudId> },
    /// `a.b` ; `index_membre` est renseigné par la validation.
    AccesMembre { structure: Option<NoeudId>, membre: Option<NoeudId>, index_membre: Option<u32> },
    /// `a[i]`
    Indexage { tableau: Option<NoeudId>, index: Option<NoeudId> },
    /// `a ... b`
    Plage { debut: Option<NoeudId>, fin: Option<NoeudId> },
    /// `a, b`
    Virgule { gauche: Option<NoeudId>, droite: Option<NoeudId> },
    /// `f(a, b = c)`
    Appel { arguments: Vec<NoeudId>, resolution: Option<Resolution> },
    /// Identifiant ; `declaration` est renseigné par la validation.
    Reference { declaration: Option<NoeudId> },
    NombreEntier { valeur: u64 },
    NombreReel { valeur: f64 },
    ChaineLitterale { valeur: String },
    Caractere { valeur: u32 },
    Booleen { valeur: bool },
    Nul,
    /// `taille_de(T)` ; le type est dans `type_declare`.
    TailleDe,
    InfoDe { expression: Option<NoeudId> },
    Memoire { expression: Option<NoeudId> },
    /// `transtype(e : T)`
    Transtype { expression: Option<NoeudId> },
    /// `loge T` ; `taille` pour `loge chaine(n)` et `loge [n]T`.
    Loge { taille: Option<NoeudId>, bloc_sinon: Option<NoeudId> },
    /// `reloge e : T`
    Reloge { expression: Option<NoeudId>, taille: Option<NoeudId>, bloc_sinon: Option<NoeudId> },
    Deloge { expression: Option<NoeudId> },
    /// `[a, b, c]`
    ConstruitTableau { elements: Vec<NoeudId> },
    /// `...x`
    ExpansionVariadique { expression: Option<NoeudId> },
    /// `si`/`saufsi`, instruction ou expression.
    Si { condition: Option<NoeudId>, bloc_si_vrai: Option<NoeudId>, bloc_si_faux: Option<NoeudId> },
    Bloc { expressions: Vec<NoeudId> },
    Retour { expression: Option<NoeudId> },
    Retiens { expression: Option<NoeudId> },
    Boucle { bloc: Option<NoeudId> },
    /// `répète { } tantque c;`
    Repete { bloc: Option<NoeudId>, condition: Option<NoeudId> },
    Tantque { condition: Option<NoeudId>, bloc: Option<NoeudId> },
    /// `pour x dans e { } sansarrêt { } sinon { }`
    Pour {
        variable: Option<NoeudId>,
        expression: Option<NoeudId>,
        bloc: Option<NoeudId>,
        bloc_sansarret: Option<NoeudId>,
        bloc_sinon: Option<NoeudId>,
    },
    /// `arrête` / `continue`, avec étiquette optionnelle.
    Controle { etiquette: Option<NoeudId> },
    Differe { bloc: Option<NoeudId> },
    NonSur { bloc: Option<NoeudId> },
    /// `discr e { … }`
    Discr { expression: Option<NoeudId>, paires: Vec<NoeudId>, sinon: Option<NoeudId> },
    /// `v1, v2 { … }` dans un `discr`.
    PaireDiscr { valeurs: Option<NoeudId>, bloc: Option<NoeudId> },
    /// `importe "Module"`
    Importe,
    /// `charge "fichier"`
    Charge,
}

impl Forme {
    /// Bloc vide.
    pub const fn bloc() -> Self { Self::Bloc { expressions: Vec::new() } }

    /// Fonction sans paramètres ni corps.
    pub fn fonction() -> Self { Self::DeclarationFonction(Box::default()) }

    /// Genre correspondant.
    pub const fn genre(&self) -> GenreNoeud {
        use GenreNoeud as G;
        match self {
            Self::Racine { .. } => G::Racine,
            Self::DeclarationFonction(_) => G::DeclarationFonction,
            Self::DeclarationStructure { .. } => G::DeclarationStructure,
            Self::DeclarationEnum { .. } => G::DeclarationEnum,
            Self::DeclarationVariable { .. } => G::DeclarationVariable,
            Self::Assignation { .. } => G::Assignation,
            Self::ExpressionBinaire { .. } => G::ExpressionBinaire,
            Self::ExpressionUnaire { .. } => G::ExpressionUnaire,
            Self::AccesMembre { .. } => G::AccesMembre,
            Self::Indexage { .. } => G::Indexage,
            Self::Plage { .. } => G::Plage,
            Self::Virgule { .. } => G::Virgule,
            Self::Appel { .. } => G::Appel,
            Self::Reference { .. } => G::Reference,
            Self::NombreEntier { .. } => G::NombreEntier,
            Self::NombreReel { .. } => G::NombreReel,
            Self::ChaineLitterale { .. } => G::ChaineLitterale,
            Self::Caractere { .. } => G::Caractere,
            Self::Booleen { .. } => G::Booleen,
            Self::Nul => G::Nul,
            Self::TailleDe => G::TailleDe,
            Self::InfoDe { .. } => G::InfoDe,
            Self::Memoire { .. } => G::Memoire,
            Self::Transtype { .. } => G::Transtype,
            Self::Loge { .. } => G::Loge,
            Self::Reloge { .. } => G::Reloge,
            Self::Deloge { .. } => G::Deloge,
            Self::ConstruitTableau { .. } => G::ConstruitTableau,
            Self::ExpansionVariadique { .. } => G::ExpansionVariadique,
            Self::Si { .. } => G::Si,
            Self::Bloc { .. } => G::Bloc,
            Self::Retour { .. } => G::Retour,
            Self::Retiens { .. } => G::Retiens,
            Self::Boucle { .. } => G::Boucle,
            Self::Repete { .. } => G::Repete,
            Self::Tantque { .. } => G::Tantque,
            Self::Pour { .. } => G::Pour,
            Self::Controle { .. } => G::Controle,
            Self::Differe { .. } => G::Differe,
            Self::NonSur { .. } => G::NonSur,
            Self::Discr { .. } => G::Discr,
            Self::PaireDiscr { .. } => G::PaireDiscr,
            Self::Importe => G::Importe,
            Self::Charge => G::Charge,
        }
    }

    /// Nombre d'opérandes pour la passe ascendante de l'analyse d'expression.
    pub const fn arite(&self) -> usize {
        match self {
            Self::Assignation { .. }
            | Self::DeclarationVariable { .. }
            | Self::ExpressionBinaire { .. }
            | Self::AccesMembre { .. }
            | Self::Indexage { .. }
            | Self::Plage { .. }
            | Self::Virgule { .. } => 2,
            Self::ExpressionUnaire { .. } | Self::ExpansionVariadique { .. } => 1,
            _ => 0,
        }
    }

    /// Remplit le premier emplacement libre ; renvoie `false` si la forme n'en a plus.
    pub fn ajoute_enfant(&mut self, enfant: NoeudId) -> bool {
        fn remplis(emplacements: &mut [&mut Option<NoeudId>], enfant: NoeudId) -> bool {
            for e in emplacements.iter_mut() {
                if e.is_none() {
                    **e = Some(enfant);
                    return true;
                }
            }
            false
        }

        match self {
            Self::Racine { declarations: v }
            | Self::DeclarationStructure { membres: v, .. }
            | Self::DeclarationEnum { membres: v }
            | Self::Appel { arguments: v, .. }
            | Self::ConstruitTableau { elements: v }
            | Self::Bloc { expressions: v } => {
                v.push(enfant);
                true
            }
            Self::DeclarationFonction(f) => remplis(&mut [&mut f.bloc], enfant),
            Self::DeclarationVariable { cible: a, valeur: b }
            | Self::Assignation { cible: a, valeur: b }
            | Self::ExpressionBinaire { gauche: a, droite: b }
            | Self::AccesMembre { structure: a, membre: b, .. }
            | Self::Indexage { tableau: a, index: b }
            | Self::Plage { debut: a, fin: b }
            | Self::Virgule { gauche: a, droite: b }
            | Self::Repete { bloc: a, condition: b }
            | Self::Tantque { condition: a, bloc: b }
            | Self::PaireDiscr { valeurs: a, bloc: b } => remplis(&mut [a, b], enfant),
            Self::ExpressionUnaire { operande: a }
            | Self::InfoDe { expression: a }
            | Self::Memoire { expression: a }
            | Self::Transtype { expression: a }
            | Self::Loge { bloc_sinon: a, .. }
            | Self::Deloge { expression: a }
            | Self::ExpansionVariadique { expression: a }
            | Self::Retour { expression: a }
            | Self::Retiens { expression: a }
            | Self::Boucle { bloc: a }
            | Self::Controle { etiquette: a }
            | Self::Differe { bloc: a }
            | Self::NonSur { bloc: a } => remplis(&mut [a], enfant),
            Self::Reloge { expression, bloc_sinon, .. } => remplis(&mut [expression, bloc_sinon], enfant),
            Self::Si { condition, bloc_si_vrai, bloc_si_faux } => {
                remplis(&mut [condition, bloc_si_vrai, bloc_si_faux], enfant)
            }
            Self::Pour { variable, expression, bloc, .. } => remplis(&mut [variable, expression, bloc], enfant),
            Self::Discr { expression, paires, .. } => {
                if expression.is_none() {
                    *expression = Some(enfant);
                } else {
                    paires.push(enfant);
                }
                true
            }
            Self::Reference { .. }
            | Self::NombreEntier { .. }
            | Self::NombreReel { .. }
            | Self::ChaineLitterale { .. }
            | Self::Caractere { .. }
            | Self::Booleen { .. }
            | Self::Nul
            | Self::TailleDe
            | Self::Importe
            | Self::Charge => false,
        }
    }

    /// Enfants présents, dans l'ordre des emplacements.
    pub fn enfants(&self) -> Vec<NoeudId> {
        let mut out = Vec::new();
        let mut pousse = |o: &Option<NoeudId>| {
            if let Some(id) = o {
                out.push(*id);
            }
        };
        match self {
            Self::DeclarationFonction(f) => {
                let mut v = f.parametres.clone();
                v.extend(f.bloc);
                return v;
            }
            Self::Racine { declarations: v }
            | Self::DeclarationStructure { membres: v, .. }
            | Self::DeclarationEnum { membres: v }
            | Self::Appel { arguments: v, .. }
            | Self::ConstruitTableau { elements: v }
            | Self::Bloc { expressions: v } => return v.clone(),
            Self::DeclarationVariable { cible: a, valeur: b }
            | Self::Assignation { cible: a, valeur: b }
            | Self::ExpressionBinaire { gauche: a, droite: b }
            | Self::AccesMembre { structure: a, membre: b, .. }
            | Self::Indexage { tableau: a, index: b }
            | Self::Plage { debut: a, fin: b }
            | Self::Virgule { gauche: a, droite: b }
            | Self::Repete { bloc: a, condition: b }
            | Self::Tantque { condition: a, bloc: b }
            | Self::PaireDiscr { valeurs: a, bloc: b }
            | Self::Loge { taille: a, bloc_sinon: b } => {
                pousse(a);
                pousse(b);
            }
            Self::ExpressionUnaire { operande: a }
            | Self::InfoDe { expression: a }
            | Self::Memoire { expression: a }
            | Self::Transtype { expression: a }
            | Self::Deloge { expression: a }
            | Self::ExpansionVariadique { expression: a }
            | Self::Retour { expression: a }
            | Self::Retiens { expression: a }
            | Self::Boucle { bloc: a }
            | Self::Controle { etiquette: a }
            | Self::Differe { bloc: a }
            | Self::NonSur { bloc: a } => pousse(a),
            Self::Reloge { expression, taille, bloc_sinon } => {
                pousse(expression);
                pousse(taille);
                pousse(bloc_sinon);
            }
            Self::Si { condition, bloc_si_vrai, bloc_si_faux } => {
                pousse(condition);
                pousse(bloc_si_vrai);
                pousse(bloc_si_faux);
            }
            Self::Pour { variable, expression, bloc, bloc_sansarret, bloc_sinon } => {
                pousse(variable);
                pousse(expression);
                pousse(bloc);
                pousse(bloc_sansarret);
                pousse(bloc_sinon);
            }
            Self::Discr { expression, paires, sinon } => {
                pousse(expression);
                out.extend(paires.iter().copied());
                if let Some(s) = sinon {
                    out.push(*s);
                }
            }
            _ => {}
        }
        out
    }
}

/// Un noeud de l'arbre.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Noeud {
    /// Lexème source (nom, opérateur, mot-clé…).
    pub lexeme: Lexeme,
    /// Drapeaux.
    pub drapeaux: DrapeauxNoeud,
    /// Forme et enfants.
    pub forme: Forme,
    /// Type écrit dans la source, s'il y en a un.
    pub type_declare: Option<TypeDeclare>,
    /// Type calculé par la validation.
    pub type_: Option<TypeId>,
    /// Coercition calculée par la validation.
    pub transformation: TransformationType,
}

impl Noeud {
    /// Nouveau noeud sans type.
    pub fn new(forme: Forme, lexeme: Lexeme) -> Self {
        Self {
            lexeme,
            drapeaux: DrapeauxNoeud::empty(),
            forme,
            type_declare: None,
            type_: None,
            transformation: TransformationType::Inutile,
        }
    }

    /// Genre, déduit de la forme.
    pub const fn genre(&self) -> GenreNoeud { self.forme.genre() }

    /// Texte du lexème.
    pub fn chaine(&self) -> &str { &self.lexeme.chaine }

    /// Données de fonction, si le noeud en est une.
    pub fn comme_fonction(&self) -> Option<&DeclFonction> {
        match &self.forme {
            Forme::DeclarationFonction(f) => Some(f),
            _ => None,
        }
    }

    /// Variante mutable de [`Noeud::comme_fonction`].
    pub fn comme_fonction_mut(&mut self) -> Option<&mut DeclFonction> {
        match &mut self.forme {
            Forme::DeclarationFonction(f) => Some(f),
            _ => None,
        }
    }

    /// Teste un drapeau.
    pub const fn possede(&self, d: DrapeauxNoeud) -> bool { self.drapeaux.contains(d) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn emplacements_remplis_dans_l_ordre() {
        let mut f = Forme::Si { condition: None, bloc_si_vrai: None, bloc_si_faux: None };
        assert!(f.ajoute_enfant(NoeudId(1)));
        assert!(f.ajoute_enfant(NoeudId(2)));
        assert!(f.ajoute_enfant(NoeudId(3)));
        assert!(!f.ajoute_enfant(NoeudId(4)));
        assert_eq!(f.enfants(), vec![NoeudId(1), NoeudId(2), NoeudId(3)]);
    }

    #[test]
    fn discr_accumule_les_paires() {
        let mut f = Forme::Discr { expression: None, paires: Vec::new(), sinon: None };
        for i in 0..4 {
            assert!(f.ajoute_enfant(NoeudId(i)));
        }
        let Forme::Discr { expression, paires, .. } = &f else { unreachable!() };
        assert_eq!(*expression, Some(NoeudId(0)));
        assert_eq!(paires.len(), 3);
    }

    #[test]
    fn feuilles_refusent_les_enfants() {
        assert!(!Forme::Nul.ajoute_enfant(NoeudId(0)));
        assert!(!Forme::Reference { declaration: None }.ajoute_enfant(NoeudId(0)));
        assert_eq!(Forme::Nul.arite(), 0);
        assert_eq!(Forme::Virgule { gauche: None, droite: None }.arite(), 2);
    }
}
