//! Descripteurs de coercition attachés aux noeuds.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::TypeId;

/// Conversion nommée vers ou depuis le réel 16 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConversionR16 {
    /// r16 → r32
    VersR32,
    /// r16 → r64
    VersR64,
    /// r32 → r16
    DepuisR32,
    /// r64 → r16
    DepuisR64,
}

impl ConversionR16 {
    /// Fonction de l'en-tête `r16.h` réalisant la conversion.
    pub const fn nom_fonction(self) -> &'static str {
        match self {
            Self::VersR32 => "DLS_vers_r32",
            Self::VersR64 => "DLS_vers_r64",
            Self::DepuisR32 => "DLS_depuis_r32",
            Self::DepuisR64 => "DLS_depuis_r64",
        }
    }
}

/// Coercition à appliquer à la valeur d'un noeud.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TransformationType {
    /// Rien à faire.
    #[default]
    Inutile,
    /// Aucune conversion possible.
    Impossible,
    /// Entier littéral non typé vers un type numérique, pointeur ou énum.
    ConvertiEntierConstant {
        /// Type cible.
        vers: TypeId,
    },
    /// Élargissement numérique.
    AugmenteTailleType {
        /// Type cible.
        vers: TypeId,
    },
    /// Rétrécissement numérique (transtypage seulement).
    ReduitTailleType {
        /// Type cible.
        vers: TypeId,
    },
    /// Entier vers réel (transtypage seulement).
    EntierVersReel {
        /// Type cible.
        vers: TypeId,
    },
    /// Réel vers entier (transtypage seulement).
    ReelVersEntier {
        /// Type cible.
        vers: TypeId,
    },
    /// Conversion du réel 16 bits par fonction.
    ConversionR16 {
        /// Fonction de conversion.
        conversion: ConversionR16,
        /// Type cible.
        vers: TypeId,
    },
    /// Simple conversion C vers le type cible.
    ConvertiVersTypeCible {
        /// Type cible.
        vers: TypeId,
    },
    /// Pointeur quelconque vers `*rien`.
    ConvertiVersPtrRien {
        /// Type cible.
        vers: TypeId,
    },
    /// Pointeur dérivé vers pointeur de base employée.
    ConvertiVersBase {
        /// Type cible.
        vers: TypeId,
        /// Décalage cumulé en octets.
        decalage: u32,
    },
    /// Pointeur de base vers pointeur dérivé (transtypage seulement).
    ConvertiVersDerive {
        /// Type cible.
        vers: TypeId,
        /// Décalage cumulé en octets.
        decalage: u32,
    },
    /// Valeur vers union.
    ConstruitUnion {
        /// Union cible.
        vers: TypeId,
        /// Membre construit.
        index_membre: u32,
    },
    /// Union vers un de ses membres.
    ExtraitUnion {
        /// Type du membre.
        vers: TypeId,
        /// Membre lu.
        index_membre: u32,
    },
    /// Valeur vers `eini`.
    ConstruitEini,
    /// `eini` vers une valeur.
    ExtraitEini {
        /// Type extrait.
        vers: TypeId,
    },
    /// Tableau fixe vers tableau dynamique.
    ConvertiTableau {
        /// Type cible.
        vers: TypeId,
    },
    /// Vue d'octets sur une valeur.
    ConstruitTablOctet,
    /// Valeur vers référence.
    PrendReference,
    /// Référence vers valeur.
    Dereference,
}

impl TransformationType {
    /// `INUTILE`
    pub const fn est_inutile(self) -> bool { matches!(self, Self::Inutile) }

    /// `IMPOSSIBLE`
    pub const fn est_impossible(self) -> bool { matches!(self, Self::Impossible) }

    /// Type cible porté par la transformation, s'il y en a un.
    pub const fn type_cible(self) -> Option<TypeId> {
        match self {
            Self::ConvertiEntierConstant { vers }
            | Self::AugmenteTailleType { vers }
            | Self::ReduitTailleType { vers }
            | Self::EntierVersReel { vers }
            | Self::ReelVersEntier { vers }
            | Self::ConversionR16 { vers, .. }
            | Self::ConvertiVersTypeCible { vers }
            | Self::ConvertiVersPtrRien { vers }
            | Self::ConvertiVersBase { vers, .. }
            | Self::ConvertiVersDerive { vers, .. }
            | Self::ConstruitUnion { vers, .. }
            | Self::ExtraitUnion { vers, .. }
            | Self::ExtraitEini { vers }
            | Self::ConvertiTableau { vers } => Some(vers),
            _ => None,
        }
    }
}
