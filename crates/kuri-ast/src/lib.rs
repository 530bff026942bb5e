//! Kuri AST (arbre syntaxique)
//!
//! Ce crate définit les structures de données qui représentent un programme Kuri
//! après l'analyse syntaxique, puis annotées par la validation (types, transformations).
//!
//! - Une seule représentation : une forme typée par genre de noeud (`Forme`), avec des
//!   emplacements d'enfants nommés
//! - Tous les noeuds vivent dans une arène (`Assembleuse`) et se référencent par `NoeudId`
//! - `TypeDeclare` : type tel qu'écrit dans la source, résolu plus tard par la `Typeuse`
//! - `TransformationType` : coercition calculée une fois par la validation, lue par la coulisse
//!
//! # Features
//! - `std` (par défaut)
//! - `serde` : permet la sérialisation de l’arbre
//!
//! # Exemple
//! ```rust
//! use kuri_ast::{Assembleuse, Forme, GenreNoeud};
//! use kuri_lexer::{GenreLexeme, Lexeme};
//! use kuri_core::Span;
//!
//! let mut asm = Assembleuse::new();
//! let lex = Lexeme::new(GenreLexeme::AccoladeOuvrante, "{", Span::default());
//! let bloc = asm.empile_noeud(Forme::bloc(), lex, true).unwrap();
//! assert_eq!(asm.depile_noeud(GenreNoeud::Bloc).unwrap(), bloc);
//! ```

#![deny(missing_docs)]

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod assembleuse;
mod noeud;
mod transformation;
mod type_declare;

pub use assembleuse::Assembleuse;
pub use noeud::{DeclFonction, Forme, GenreNoeud, Noeud, Resolution};
pub use transformation::{ConversionR16, TransformationType};
pub use type_declare::{ComposantType, TypeBase, TypeDeclare};

/// Identifiant stable d'un noeud dans l'arène.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NoeudId(pub u32);

impl NoeudId {
    /// Index dans l'arène.
    pub const fn index(self) -> usize { self.0 as usize }
}

/// Identifiant d'un type canonique dans la table des types.
///
/// Deux types sont interchangeables si et seulement si leurs identifiants sont égaux.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TypeId(pub u32);

impl TypeId {
    /// Index dans la table des types.
    pub const fn index(self) -> usize { self.0 as usize }
}

bitflags::bitflags! {
    /// Drapeaux portés par un noeud.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct DrapeauxNoeud: u32 {
        /// Déclaration `externe` (fonction, structure, variable).
        const EST_EXTERNE          = 1 << 0;
        /// `#enligne`.
        const FORCE_ENLIGNE        = 1 << 1;
        /// `#horsligne`.
        const FORCE_HORSLIGNE      = 1 << 2;
        /// `#nulctx` : pas de paramètre de contexte.
        const FORCE_NULCTX         = 1 << 3;
        /// Fonction variadique.
        const EST_VARIADIQUE       = 1 << 4;
        /// Référence qui déclare une variable (`x : T`, `x := …`).
        const EST_DECLARATION      = 1 << 5;
        /// Variable dynamique (`dyn`), assignable.
        const EST_DYNAMIQUE        = 1 << 6;
        /// Membre employé (`empl`).
        const EST_EMPLOYE          = 1 << 7;
        /// Valeur calculée à la compilation.
        const EST_CALCULE          = 1 << 8;
        /// Sous-arbre déjà construit : pas un opérateur pour la passe ascendante.
        const IGNORE_OPERATEUR     = 1 << 9;
        /// Fonction `corout`.
        const EST_COROUTINE        = 1 << 10;
        /// Union `nonsûr`.
        const EST_NONSUR           = 1 << 11;
        /// Variable globale.
        const EST_GLOBALE          = 1 << 12;
        /// Paramètre de fonction.
        const EST_PARAMETRE        = 1 << 13;
        /// Cible d'une assignation.
        const EST_CIBLE_ASSIGNATION = 1 << 14;
        /// Expression adressable (valeur gauche).
        const EST_VALEUR_GAUCHE    = 1 << 15;
        /// Fonction sans trace d'appel.
        const SANS_TRACE           = 1 << 16;
        /// Argument variadique étendu (`...x`).
        const EST_EXPANSION        = 1 << 17;
    }
}
