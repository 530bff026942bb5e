//! kuri-core — primitives partagées (no_std-ready)
//!
//! Fournit :
//! - `SourceId`, `Pos`, `Span`, `Spanned<T>`
//! - `TypeErreur` : étiquette d'erreur stable (utilisée par les tests)
//! - `Erreur` + alias `Resultat<T>` : erreur structurée (message + localisation)
//!
//! Features :
//! - `std` (par défaut) : impl `std::error::Error`
//! - `serde` : derive (dé)sérialisation sur les structures utiles

#![deny(missing_docs)]
#![cfg_attr(not(feature = "std"), no_std)]

/* ─────────────────────────── Imports ─────────────────────────── */

use core::fmt;

#[cfg(feature = "std")]
use std::string::String;

#[cfg(not(feature = "std"))]
use alloc::string::String;

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/* ─────────────────────────── Résultat commun ─────────────────────────── */

/// Alias résultat commun au compilateur.
pub type Resultat<T> = core::result::Result<T, Erreur>;

/* ─────────────────────────── Spans / Positions ─────────────────────────── */

/// Identifiant de source (index du fichier dans le contexte de compilation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SourceId(pub u32);

/// Position (offset byte) depuis le début de la source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pos(pub u32);

impl Pos {
    /// Position nulle.
    pub const ZERO: Self = Pos(0);
    /// Addition saturée.
    #[must_use]
    pub const fn saturating_add(self, v: u32) -> Self { Pos(self.0.saturating_add(v)) }
}

/// Plage (demi-ouverte) `[start, end)` dans une source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Span {
    /// Source d’où provient l’item.
    pub source: SourceId,
    /// Début inclus.
    pub start: Pos,
    /// Fin exclue.
    pub end: Pos,
}

impl Span {
    /// Crée un span.
    pub const fn new(source: SourceId, start: Pos, end: Pos) -> Self { Self { source, start, end } }
    /// Longueur en bytes.
    pub const fn len(&self) -> u32 { self.end.0.saturating_sub(self.start.0) }
    /// Vrai si le span est vide.
    pub const fn is_empty(&self) -> bool { self.start.0 >= self.end.0 }

    /// Plus petit span couvrant `self` et `autre` (même source supposée).
    #[must_use]
    pub fn fusionne(self, autre: Span) -> Span {
        Span {
            source: self.source,
            start: if self.start <= autre.start { self.start } else { autre.start },
            end: if self.end >= autre.end { self.end } else { autre.end },
        }
    }
}

/// Wrapper utilitaire « valeur + span ».
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Spanned<T> {
    /// La valeur.
    pub value: T,
    /// La localisation.
    pub span: Span,
}

impl<T> Spanned<T> {
    /// Construit un `Spanned<T>`.
    pub const fn new(value: T, span: Span) -> Self { Self { value, span } }
    /// Applique une fonction à la valeur et conserve le span.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> { Spanned { value: f(self.value), span: self.span } }
}

/* ─────────────────────────── Erreurs ─────────────────────────── */

/// Étiquette d'une erreur de compilation.
///
/// Ce n'est pas un code d'erreur public : elle sert à distinguer les familles
/// d'erreurs dans les tests sans comparer les messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TypeErreur {
    /// Erreur de lexage.
    Lexage,
    /// Lexème inattendu.
    LexemeInattendu,
    /// Lexème attendu absent.
    LexemeAttendu,
    /// Erreur générique de syntaxe.
    Syntaxe,
    /// Parenthèses ou crochets déséquilibrés.
    Desequilibre,
    /// Profondeur d'expression maximale dépassée.
    ProfondeurExpression,
    /// Directive `#` inconnue.
    DirectiveInconnue,
    /// Module introuvable ou illisible.
    ModuleInconnu,
    /// Fichier introuvable ou illisible.
    FichierInconnu,
    /// Structure, union ou énum inconnue.
    StructureInconnue,
    /// Membre inconnu.
    MembreInconnu,
    /// Variable inconnue.
    VariableInconnue,
    /// Fonction inconnue.
    FonctionInconnue,
    /// Redéfinition (structure, énum, variable, fonction).
    Redefinition,
    /// Nombre d'arguments incorrect.
    NombreArgument,
    /// Argument nommé inconnu ou utilisé deux fois.
    ArgumentNomme,
    /// Types incompatibles.
    TypeArgument,
    /// Construction d'union ambiguë.
    UnionAmbigue,
    /// Assignation invalide.
    Assignation,
    /// Contrôle de flux invalide (`arrête`, `continue`, `retiens` mal placés).
    ControleInvalide,
    /// Dépendance circulaire entre types.
    DependanceCirculaire,
    /// Constante non calculable à la compilation.
    ExpressionNonConstante,
}

/// Erreur structurée : étiquette, message humain, localisation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Erreur {
    /// Famille de l'erreur.
    pub genre: TypeErreur,
    /// Message en français.
    pub message: String,
    /// Localisation principale.
    pub span: Span,
    /// Plage min/max couvrant une sous-expression ambiguë.
    pub plage: Option<Span>,
}

impl Erreur {
    /// Construit une erreur.
    pub fn new(genre: TypeErreur, message: impl Into<String>, span: Span) -> Self {
        Self { genre, message: message.into(), span, plage: None }
    }

    /// Attache une plage couvrant plusieurs lexèmes.
    #[must_use]
    pub const fn avec_plage(mut self, plage: Span) -> Self {
        self.plage = Some(plage);
        self
    }
}

impl fmt::Display for Erreur {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (octets {}..{})", self.message, self.span.start.0, self.span.end.0)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Erreur {}

/* ─────────────────────────── Tests ─────────────────────────── */
