//! Genres de lexèmes et prédicats associés.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

macro_rules! genres_lexemes {
    ($($var:ident => $txt:literal),* $(,)?) => {
        /// Genre d'un lexème (ponctuation, mot-clé, littéral, identifiant).
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        pub enum GenreLexeme {
            $(
                #[doc = concat!("`", $txt, "`")]
                $var,
            )*
        }

        impl GenreLexeme {
            /// Texte canonique du genre, pour les messages d'erreur.
            pub const fn chaine(self) -> &'static str {
                match self {
                    $(Self::$var => $txt,)*
                }
            }
        }
    };
}

genres_lexemes! {
    // ponctuation
    Exclamation => "!",
    Diese => "#",
    Pourcent => "%",
    Esperluette => "&",
    ParentheseOuvrante => "(",
    ParentheseFermante => ")",
    Fois => "*",
    Plus => "+",
    Virgule => ",",
    Moins => "-",
    Point => ".",
    Divise => "/",
    DoublePoints => ":",
    PointVirgule => ";",
    Inferieur => "<",
    Egal => "=",
    Superieur => ">",
    Arobase => "@",
    CrochetOuvrant => "[",
    CrochetFermant => "]",
    Chapeau => "^",
    AccoladeOuvrante => "{",
    Barre => "|",
    AccoladeFermante => "}",
    Tilde => "~",
    Difference => "!=",
    ModuloEgal => "%=",
    EspEsp => "&&",
    EtEgal => "&=",
    MultiplieEgal => "*=",
    PlusEgal => "+=",
    MoinsEgal => "-=",
    Fleche => "->",
    DiviseEgal => "/=",
    DeclarationConstante => "::",
    DeclarationVariable => ":=",
    DecalageGauche => "<<",
    InferieurEgal => "<=",
    Egalite => "==",
    SuperieurEgal => ">=",
    DecalageDroite => ">>",
    OuxEgal => "^=",
    OuEgal => "|=",
    BarreBarre => "||",
    TroisPoints => "...",
    DecGaucheEgal => "<<=",
    DecDroiteEgal => ">>=",
    // mots-clés
    Arrete => "arrête",
    Associe => "associe",
    Bool => "bool",
    Boucle => "boucle",
    Chaine => "chaine",
    Charge => "charge",
    Continue => "continue",
    Corout => "corout",
    Dans => "dans",
    Differe => "diffère",
    Discr => "discr",
    Deloge => "déloge",
    Dyn => "dyn",
    Eini => "eini",
    Empl => "empl",
    Externe => "externe",
    Faux => "faux",
    Fonc => "fonc",
    Importe => "importe",
    InfoDe => "info_de",
    Loge => "loge",
    Memoire => "mémoire",
    N8 => "n8",
    N16 => "n16",
    N32 => "n32",
    N64 => "n64",
    Nonsur => "nonsûr",
    Nul => "nul",
    Octet => "octet",
    Pour => "pour",
    R16 => "r16",
    R32 => "r32",
    R64 => "r64",
    Reloge => "reloge",
    Retiens => "retiens",
    Retourne => "retourne",
    Rien => "rien",
    Repete => "répète",
    Sansarret => "sansarrêt",
    Saufsi => "saufsi",
    Si => "si",
    Sinon => "sinon",
    Soit => "soit",
    Struct => "struct",
    TailleDe => "taille_de",
    Tantque => "tantque",
    Transtype => "transtype",
    TypeDe => "type_de",
    Union => "union",
    Vrai => "vrai",
    Z8 => "z8",
    Z16 => "z16",
    Z32 => "z32",
    Z64 => "z64",
    Enum => "énum",
    // littéraux et genres synthétiques
    NombreEntier => "nombre entier",
    NombreReel => "nombre réel",
    ChaineCaractere => "identifiant",
    ChaineLitterale => "chaîne littérale",
    Caractere => "caractère",
    PlusUnaire => "+ unaire",
    MoinsUnaire => "- unaire",
    ExpansionVariadique => "... unaire",
    Inconnu => "inconnu",
}

/// Cherche le mot-clé correspondant au texte d'un identifiant.
pub fn mot_cle(s: &str) -> Option<GenreLexeme> {
    use GenreLexeme as G;
    Some(match s {
        "arrête" => G::Arrete,
        "associe" => G::Associe,
        "bool" => G::Bool,
        "boucle" => G::Boucle,
        "chaine" => G::Chaine,
        "charge" => G::Charge,
        "continue" => G::Continue,
        "corout" => G::Corout,
        "dans" => G::Dans,
        "diffère" => G::Differe,
        "discr" => G::Discr,
        "déloge" => G::Deloge,
        "dyn" => G::Dyn,
        "eini" => G::Eini,
        "empl" => G::Empl,
        "externe" => G::Externe,
        "faux" => G::Faux,
        "fonc" => G::Fonc,
        "importe" => G::Importe,
        "info_de" => G::InfoDe,
        "loge" => G::Loge,
        "mémoire" => G::Memoire,
        "n8" => G::N8,
        "n16" => G::N16,
        "n32" => G::N32,
        "n64" => G::N64,
        "nonsûr" => G::Nonsur,
        "nul" => G::Nul,
        "octet" => G::Octet,
        "pour" => G::Pour,
        "r16" => G::R16,
        "r32" => G::R32,
        "r64" => G::R64,
        "reloge" => G::Reloge,
        "retiens" => G::Retiens,
        "retourne" => G::Retourne,
        "rien" => G::Rien,
        "répète" => G::Repete,
        "sansarrêt" => G::Sansarret,
        "saufsi" => G::Saufsi,
        "si" => G::Si,
        "sinon" => G::Sinon,
        "soit" => G::Soit,
        "struct" => G::Struct,
        "taille_de" => G::TailleDe,
        "tantque" => G::Tantque,
        "transtype" => G::Transtype,
        "type_de" => G::TypeDe,
        "union" => G::Union,
        "vrai" => G::Vrai,
        "z8" => G::Z8,
        "z16" => G::Z16,
        "z32" => G::Z32,
        "z64" => G::Z64,
        "énum" => G::Enum,
        _ => return None,
    })
}

impl GenreLexeme {
    /// Mot-clé désignant un type de base (`z32`, `bool`, `chaine`, …).
    pub const fn est_identifiant_type(self) -> bool {
        use GenreLexeme as G;
        matches!(
            self,
            G::N8 | G::N16 | G::N32 | G::N64
                | G::Z8 | G::Z16 | G::Z32 | G::Z64
                | G::R16 | G::R32 | G::R64
                | G::Bool | G::Rien | G::Eini | G::Chaine | G::Octet
        )
    }

    /// Lexème pouvant ouvrir une déclaration de type (sigil ou type de base).
    pub const fn est_specifiant_type(self) -> bool {
        use GenreLexeme as G;
        matches!(
            self,
            G::Fois | G::Esperluette | G::CrochetOuvrant | G::TroisPoints | G::TypeDe | G::Fonc | G::Corout
                | G::Diese | G::ChaineCaractere
        ) || self.est_identifiant_type()
    }

    /// Opérateur binaire reconnu par l'analyse d'expression.
    pub const fn est_operateur_binaire(self) -> bool {
        use GenreLexeme as G;
        matches!(
            self,
            G::Plus | G::Moins | G::Fois | G::Divise | G::Pourcent
                | G::Esperluette | G::Barre | G::Chapeau
                | G::DecalageGauche | G::DecalageDroite
                | G::Inferieur | G::InferieurEgal | G::Superieur | G::SuperieurEgal
                | G::Egalite | G::Difference
                | G::EspEsp | G::BarreBarre
                | G::Point | G::TroisPoints | G::Virgule
                | G::Egal | G::DeclarationVariable
        ) || self.est_assignation_composee()
    }

    /// Opérateur unaire (après reclassification de `+`/`-`).
    pub const fn est_operateur_unaire(self) -> bool {
        use GenreLexeme as G;
        matches!(
            self,
            G::Exclamation | G::Tilde | G::Arobase | G::PlusUnaire | G::MoinsUnaire | G::ExpansionVariadique
        )
    }

    /// `+=`, `-=`, `<<=`, …
    pub const fn est_assignation_composee(self) -> bool {
        use GenreLexeme as G;
        matches!(
            self,
            G::PlusEgal | G::MoinsEgal | G::MultiplieEgal | G::DiviseEgal | G::ModuloEgal
                | G::EtEgal | G::OuEgal | G::OuxEgal | G::DecGaucheEgal | G::DecDroiteEgal
        )
    }

    /// Opérateur de comparaison (résultat booléen).
    pub const fn est_operateur_comparaison(self) -> bool {
        use GenreLexeme as G;
        matches!(
            self,
            G::Inferieur | G::InferieurEgal | G::Superieur | G::SuperieurEgal | G::Egalite | G::Difference
        )
    }

    /// Littéral numérique.
    pub const fn est_nombre(self) -> bool {
        matches!(self, Self::NombreEntier | Self::NombreReel)
    }

    /// Opérateur binaire correspondant à une assignation composée (`+=` → `+`).
    pub const fn operateur_de_base(self) -> Option<Self> {
        use GenreLexeme as G;
        Some(match self {
            G::PlusEgal => G::Plus,
            G::MoinsEgal => G::Moins,
            G::MultiplieEgal => G::Fois,
            G::DiviseEgal => G::Divise,
            G::ModuloEgal => G::Pourcent,
            G::EtEgal => G::Esperluette,
            G::OuEgal => G::Barre,
            G::OuxEgal => G::Chapeau,
            G::DecGaucheEgal => G::DecalageGauche,
            G::DecDroiteEgal => G::DecalageDroite,
            _ => return None,
        })
    }
}
