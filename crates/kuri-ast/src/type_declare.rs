//! Types tels qu'écrits dans la source.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use core::fmt;

use kuri_core::Span;
use kuri_lexer::GenreLexeme;

use crate::NoeudId;

/// Type de base, dernier composant d'un `TypeDeclare`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TypeBase {
    /// `n8`
    N8,
    /// `n16`
    N16,
    /// `n32`
    N32,
    /// `n64`
    N64,
    /// `z8`
    Z8,
    /// `z16`
    Z16,
    /// `z32`
    Z32,
    /// `z64`
    Z64,
    /// `r16`
    R16,
    /// `r32`
    R32,
    /// `r64`
    R64,
    /// `bool`
    Bool,
    /// `rien`
    Rien,
    /// `eini`
    Eini,
    /// `chaine`
    Chaine,
    /// `octet`
    Octet,
    /// Structure, union ou énum nommée.
    Nomme(String),
}

impl TypeBase {
    /// Type de base d'un mot-clé de type.
    pub fn depuis_genre(genre: GenreLexeme) -> Option<Self> {
        use GenreLexeme as G;
        Some(match genre {
            G::N8 => Self::N8,
            G::N16 => Self::N16,
            G::N32 => Self::N32,
            G::N64 => Self::N64,
            G::Z8 => Self::Z8,
            G::Z16 => Self::Z16,
            G::Z32 => Self::Z32,
            G::Z64 => Self::Z64,
            G::R16 => Self::R16,
            G::R32 => Self::R32,
            G::R64 => Self::R64,
            G::Bool => Self::Bool,
            G::Rien => Self::Rien,
            G::Eini => Self::Eini,
            G::Chaine => Self::Chaine,
            G::Octet => Self::Octet,
            _ => return None,
        })
    }
}

impl fmt::Display for TypeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::N8 => "n8",
            Self::N16 => "n16",
            Self::N32 => "n32",
            Self::N64 => "n64",
            Self::Z8 => "z8",
            Self::Z16 => "z16",
            Self::Z32 => "z32",
            Self::Z64 => "z64",
            Self::R16 => "r16",
            Self::R32 => "r32",
            Self::R64 => "r64",
            Self::Bool => "bool",
            Self::Rien => "rien",
            Self::Eini => "eini",
            Self::Chaine => "chaine",
            Self::Octet => "octet",
            Self::Nomme(n) => n,
        };
        f.write_str(s)
    }
}

/// Un constructeur de type.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ComposantType {
    /// `*`
    Pointeur,
    /// `&`
    Reference,
    /// `[N]` (taille constante, expression) ou `[]` (tableau dynamique).
    Tableau(Option<NoeudId>),
    /// `...` ; seul en fin de paramètres externes, il désigne les variadiques C.
    Variadique,
    /// `type_de(expr)`
    TypeDe(NoeudId),
    /// `fonc(…)(…)` ou `corout(…)(…)`.
    Fonction {
        /// Coroutine.
        est_coroutine: bool,
        /// Sans paramètre de contexte.
        nulctx: bool,
        /// Types des paramètres.
        entrees: Vec<TypeDeclare>,
        /// Types des retours.
        sorties: Vec<TypeDeclare>,
    },
    /// Type de base.
    Base(TypeBase),
}

/// Suite de constructeurs, du plus externe au plus interne :
/// `*[4]z32` donne `[Pointeur, Tableau(4), Base(z32)]`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TypeDeclare {
    /// Composants.
    pub composants: Vec<ComposantType>,
    /// Localisation.
    pub span: Span,
}

impl TypeDeclare {
    /// Type de base seul.
    pub fn base(base: TypeBase, span: Span) -> Self {
        Self { composants: vec![ComposantType::Base(base)], span }
    }

    /// Premier composant.
    pub fn externe(&self) -> Option<&ComposantType> { self.composants.first() }

    /// Type privé de son premier composant.
    #[must_use]
    pub fn dereference(&self) -> Self {
        Self { composants: self.composants.iter().skip(1).cloned().collect(), span: self.span }
    }

    /// `...T` : paramètre variadique.
    pub fn est_variadique(&self) -> bool { matches!(self.externe(), Some(ComposantType::Variadique)) }

    /// `rien` seul.
    pub fn est_rien(&self) -> bool {
        matches!(self.composants.as_slice(), [ComposantType::Base(TypeBase::Rien)])
    }
}

impl fmt::Display for TypeDeclare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.composants {
            match c {
                ComposantType::Pointeur => f.write_str("*")?,
                ComposantType::Reference => f.write_str("&")?,
                ComposantType::Tableau(Some(_)) => f.write_str("[N]")?,
                ComposantType::Tableau(None) => f.write_str("[]")?,
                ComposantType::Variadique => f.write_str("...")?,
                ComposantType::TypeDe(_) => f.write_str("type_de(…)")?,
                ComposantType::Fonction { est_coroutine, entrees, sorties, .. } => {
                    f.write_str(if *est_coroutine { "corout(" } else { "fonc(" })?;
                    for (i, e) in entrees.iter().enumerate() {
                        if i != 0 { f.write_str(", ")?; }
                        write!(f, "{e}")?;
                    }
                    f.write_str(")(")?;
                    for (i, s) in sorties.iter().enumerate() {
                        if i != 0 { f.write_str(", ")?; }
                        write!(f, "{s}")?;
                    }
                    f.write_str(")")?;
                }
                ComposantType::Base(b) => write!(f, "{b}")?,
            }
        }
        Ok(())
    }
}
