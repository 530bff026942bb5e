//! kuri-parser — syntaxeuse du langage Kuri
//!
//! Branches :
//! - `kuri-lexer` pour les lexèmes
//! - `kuri-core` pour `Span` et `Erreur`
//! - `kuri-ast` pour l'arène cible (`Assembleuse`)
//!
//! Grammaire (essentiel) :
//! ```text
//! fichier        := declaration*
//! declaration    := nom "::" ("fonc" | "corout") signature corps
//!                 | ("fonc" | "corout") nom signature corps
//!                 | nom "::" ("struct" | "union" "nonsûr"?) bloc_membres
//!                 | ("struct" | "union") nom bloc_membres
//!                 | nom "::" "énum" type? bloc_membres | "énum" nom type? bloc_membres
//!                 | "importe" nom | "charge" chaine
//!                 | "#" directive | "externe" declaration
//!                 | expression ";"                       (variable globale)
//! signature      := "(" (parametre ("," parametre)*)? ")" ((":" | "->") type ("," type)*)?
//! corps          := bloc | ";"                          (fonctions externes)
//! bloc           := "{" instruction* "}"
//! instruction    := "retourne" expr? ";" | "retiens" expr? ";"
//!                 | "si" expr bloc ("sinon" (si | bloc))? | "saufsi" …
//!                 | "boucle" bloc | "répète" bloc "tantque" expr ";" | "tantque" expr bloc
//!                 | "pour" expr "dans" expr bloc ("sansarrêt" bloc)? ("sinon" bloc)?
//!                 | ("arrête" | "continue") nom? ";"
//!                 | "diffère" bloc | "nonsûr" bloc
//!                 | ("discr" | "associe") expr "{" (expr bloc)* ("sinon" bloc)? "}"
//!                 | bloc | ("soit" | "dyn")? expression ";"
//! type           := ("*" | "&" | "[" expr? "]" | "...")* (base | nom | "type_de" "(" expr ")")
//!                 | "#nulctx"? ("fonc" | "corout") "(" types ")" ("(" types ")")?
//! ```
//!
//! Les expressions sont analysées par l'algorithme de la gare de triage (voir `expression`).

#![deny(missing_docs)]

/* ─────────────────────────── Imports ─────────────────────────── */

use indexmap::IndexMap;

use kuri_ast::{Assembleuse, DrapeauxNoeud, Forme, GenreNoeud, NoeudId};
use kuri_core::{Erreur, Pos, Resultat, SourceId, Span, TypeErreur};
use kuri_lexer::{GenreLexeme, Lexeme, ValeurLexeme};

mod expression;
mod type_declare;

pub use expression::{associativite, precedence_faible, Associativite, PROFONDEUR_EXPRESSION_MAX};

use expression::EntreePile;

use GenreLexeme as G;

/* ─────────────────────────── Résultat de l'analyse ─────────────────────────── */

/// Dépendances d'un fichier découvertes pendant l'analyse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependances {
    /// `importe Module` : nom du module → span de la directive.
    pub modules: IndexMap<String, Span>,
    /// `charge "fichier"` : chemin tel qu'écrit → span de la directive.
    pub fichiers: IndexMap<String, Span>,
}

/* ─────────────────────────── Syntaxeuse ─────────────────────────── */

/// Analyseur syntaxique d'un fichier.
///
/// Tous les noeuds sont créés dans l'`Assembleuse` fournie, partagée par les
/// fichiers d'une même compilation.
pub struct Syntaxeuse<'a> {
    lexemes: &'a [Lexeme],
    position: usize,
    source: SourceId,
    assembleuse: &'a mut Assembleuse,
    /// Profondeur de récursion courante de l'analyse d'expression.
    profondeur: usize,
    profondeur_max: usize,
    /// Piles réutilisées, une paire par niveau de récursion.
    piles: Vec<(Vec<NoeudId>, Vec<EntreePile>)>,
    /// Drapeaux (`externe`, `#enligne`, …) en attente de la prochaine déclaration.
    drapeaux_en_attente: DrapeauxNoeud,
    dependances: Dependances,
}

impl<'a> Syntaxeuse<'a> {
    /// Crée une syntaxeuse sur les lexèmes d'un fichier.
    pub fn new(lexemes: &'a [Lexeme], source: SourceId, assembleuse: &'a mut Assembleuse) -> Self {
        Self {
            lexemes,
            position: 0,
            source,
            assembleuse,
            profondeur: 0,
            profondeur_max: PROFONDEUR_EXPRESSION_MAX,
            piles: Vec::new(),
            drapeaux_en_attente: DrapeauxNoeud::empty(),
            dependances: Dependances::default(),
        }
    }

    /// Change la profondeur maximale d'imbrication des expressions.
    #[must_use]
    pub fn avec_profondeur_max(mut self, profondeur: usize) -> Self {
        self.profondeur_max = profondeur;
        self
    }

    /// Dépendances (`importe`, `charge`) rencontrées.
    pub const fn dependances(&self) -> &Dependances { &self.dependances }

    /// Consomme la syntaxeuse et rend ses dépendances.
    pub fn into_dependances(self) -> Dependances { self.dependances }

    /// Analyse tout le fichier ; renvoie le noeud `Racine`.
    pub fn analyse(&mut self) -> Resultat<NoeudId> {
        let lexeme = Lexeme::new(G::Inconnu, "", self.span_debut());
        self.assembleuse.empile_noeud(Forme::Racine { declarations: Vec::new() }, lexeme, false)?;

        while !self.fini() {
            self.analyse_declaration()?;
        }

        if !self.drapeaux_en_attente.is_empty() {
            return Err(self.erreur(TypeErreur::Syntaxe, "Directive ou « externe » sans déclaration"));
        }

        self.assembleuse.depile_noeud(GenreNoeud::Racine)
    }

    /// Analyse une unique expression terminée par `terminateur` (utile aux outils et aux tests).
    pub fn analyse_expression_seule(&mut self, terminateur: GenreLexeme) -> Resultat<Option<NoeudId>> {
        self.analyse_expression(terminateur, G::Inconnu, false)
    }

    /* ─────────── Primitives ─────────── */

    fn fini(&self) -> bool { self.position >= self.lexemes.len() }

    fn lexeme(&self) -> Option<&Lexeme> { self.lexemes.get(self.position) }

    fn genre(&self) -> GenreLexeme { self.lexeme().map_or(G::Inconnu, |l| l.genre) }

    fn genre_suivant(&self, n: usize) -> GenreLexeme {
        self.lexemes.get(self.position + n).map_or(G::Inconnu, |l| l.genre)
    }

    fn est(&self, g: GenreLexeme) -> bool { self.genre() == g }

    fn avance(&mut self) -> Lexeme {
        let l = self.lexeme().cloned().unwrap_or_else(|| Lexeme::new(G::Inconnu, "", self.span_fin()));
        self.position += 1;
        l
    }

    fn recule(&mut self) { self.position = self.position.saturating_sub(1); }

    fn consomme(&mut self, g: GenreLexeme, message: &str) -> Resultat<Lexeme> {
        if self.est(g) {
            return Ok(self.avance());
        }
        Err(self.erreur(TypeErreur::LexemeAttendu, message))
    }

    fn consomme_si(&mut self, g: GenreLexeme) -> bool {
        if self.est(g) {
            self.position += 1;
            return true;
        }
        false
    }

    fn span_debut(&self) -> Span {
        self.lexemes.first().map_or(Span::new(self.source, Pos::ZERO, Pos::ZERO), |l| l.span)
    }

    fn span_fin(&self) -> Span {
        self.lexemes.last().map_or(Span::new(self.source, Pos::ZERO, Pos::ZERO), |l| Span::new(self.source, l.span.end, l.span.end))
    }

    fn span_precedent(&self) -> Span {
        self.position
            .checked_sub(1)
            .and_then(|i| self.lexemes.get(i))
            .map_or_else(|| self.span_courant(), |l| l.span)
    }

    fn span_courant(&self) -> Span { self.lexeme().map_or_else(|| self.span_fin(), |l| l.span) }

    fn erreur(&self, genre: TypeErreur, message: impl Into<String>) -> Erreur {
        let message = message.into();
        let message = match self.lexeme() {
            Some(l) => format!("{message} (obtenu « {} »)", l.chaine),
            None => format!("{message} (fin du fichier)"),
        };
        Erreur::new(genre, message, self.span_courant())
    }

    fn erreur_sur(&self, genre: TypeErreur, message: impl Into<String>, span: Span) -> Erreur {
        Erreur::new(genre, message, span)
    }

    fn lexeme_synthetique(&self, genre: GenreLexeme, chaine: &str) -> Lexeme {
        Lexeme::new(genre, chaine, self.span_courant())
    }

    /* ─────────── Déclarations ─────────── */

    fn analyse_declaration(&mut self) -> Resultat<()> {
        match self.genre() {
            G::Importe => self.analyse_dependance(true),
            G::Charge => self.analyse_dependance(false),
            G::Diese => self.analyse_directive(),
            G::Externe => {
                self.avance();
                self.drapeaux_en_attente |= DrapeauxNoeud::EST_EXTERNE;
                Ok(())
            }
            G::Fonc | G::Corout => {
                let est_coroutine = self.est(G::Corout);
                self.avance();
                let nom = self.consomme(G::ChaineCaractere, "Attendu le nom de la fonction")?;
                self.analyse_declaration_fonction(nom, est_coroutine).map(|_| ())
            }
            G::Struct | G::Union => {
                let est_union = self.est(G::Union);
                self.avance();
                let nom = self.consomme(G::ChaineCaractere, "Attendu le nom de la structure")?;
                self.analyse_declaration_structure(nom, est_union).map(|_| ())
            }
            G::Enum => {
                self.avance();
                let nom = self.consomme(G::ChaineCaractere, "Attendu le nom de l'énum")?;
                self.analyse_declaration_enum(nom).map(|_| ())
            }
            G::ChaineCaractere if self.genre_suivant(1) == G::DeclarationConstante => {
                let nom = self.avance();
                self.avance();
                while self.est(G::Diese) {
                    self.analyse_directive()?;
                }
                match self.genre() {
                    G::Fonc | G::Corout => {
                        let est_coroutine = self.est(G::Corout);
                        self.avance();
                        self.analyse_declaration_fonction(nom, est_coroutine).map(|_| ())
                    }
                    G::Struct | G::Union => {
                        let est_union = self.est(G::Union);
                        self.avance();
                        self.analyse_declaration_structure(nom, est_union).map(|_| ())
                    }
                    G::Enum => {
                        self.avance();
                        self.analyse_declaration_enum(nom).map(|_| ())
                    }
                    _ => Err(self.erreur(TypeErreur::LexemeInattendu, "Attendu une déclaration après « :: »")),
                }
            }
            _ => {
                let position = self.position;
                let Some(id) = self.analyse_expression(G::PointVirgule, G::Inconnu, false)? else {
                    if self.position == position {
                        return Err(self.erreur(TypeErreur::LexemeInattendu, "Lexème inattendu hors des fonctions"));
                    }
                    return Ok(());
                };
                let id = self.normalise_declaration(id)?;
                if self.assembleuse.genre(id) != GenreNoeud::DeclarationVariable {
                    return Err(self.erreur_sur(
                        TypeErreur::Syntaxe,
                        "Seules les déclarations sont permises hors des fonctions",
                        self.assembleuse.noeud(id).lexeme.span,
                    ));
                }
                let drapeaux = core::mem::take(&mut self.drapeaux_en_attente) | DrapeauxNoeud::EST_GLOBALE;
                self.assembleuse.noeud_mut(id).drapeaux |= drapeaux;
                self.assembleuse.ajoute_noeud(id)
            }
        }
    }

    fn analyse_dependance(&mut self, est_module: bool) -> Resultat<()> {
        let directive = self.avance();
        let nom = match self.genre() {
            G::ChaineLitterale => match self.avance().valeur {
                ValeurLexeme::Chaine(s) => s,
                _ => String::new(),
            },
            G::ChaineCaractere if est_module => self.avance().chaine,
            _ => return Err(self.erreur(TypeErreur::LexemeAttendu, "Attendu le nom du module ou du fichier")),
        };
        self.consomme_si(G::PointVirgule);
        let table = if est_module { &mut self.dependances.modules } else { &mut self.dependances.fichiers };
        table.entry(nom).or_insert(directive.span);
        Ok(())
    }

    fn analyse_directive(&mut self) -> Resultat<()> {
        self.avance();
        let directive = self.consomme(G::ChaineCaractere, "Attendu le nom de la directive")?;
        match directive.chaine.as_str() {
            "inclus" => {
                let v = self.argument_directive()?;
                self.assembleuse.inclusions.insert(v);
            }
            "bib" => {
                let v = self.argument_directive()?;
                self.assembleuse.bibliotheques.insert(v);
            }
            "chemin" => {
                let v = self.argument_directive()?;
                self.assembleuse.chemins.insert(v);
            }
            "def" => {
                let v = self.argument_directive()?;
                self.assembleuse.definitions.insert(v);
            }
            "enligne" => self.drapeaux_en_attente |= DrapeauxNoeud::FORCE_ENLIGNE,
            "horsligne" => self.drapeaux_en_attente |= DrapeauxNoeud::FORCE_HORSLIGNE,
            "nulctx" => self.drapeaux_en_attente |= DrapeauxNoeud::FORCE_NULCTX,
            "sanstrace" => self.drapeaux_en_attente |= DrapeauxNoeud::SANS_TRACE,
            autre => {
                return Err(self.erreur_sur(
                    TypeErreur::DirectiveInconnue,
                    format!("Directive inconnue « {autre} »"),
                    directive.span,
                ))
            }
        }
        self.consomme_si(G::PointVirgule);
        Ok(())
    }

    fn argument_directive(&mut self) -> Resultat<String> {
        if let Some(Lexeme { genre: G::ChaineLitterale, valeur: ValeurLexeme::Chaine(v), .. }) = self.lexeme() {
            let v = v.clone();
            self.avance();
            return Ok(v);
        }
        Err(self.erreur(TypeErreur::LexemeAttendu, "Attendu une chaîne littérale après la directive"))
    }

    /// Position : juste après `fonc`/`corout` (sur la parenthèse ouvrante).
    fn analyse_declaration_fonction(&mut self, nom: Lexeme, est_coroutine: bool) -> Resultat<NoeudId> {
        let span_nom = nom.span;
        let id = self.assembleuse.empile_noeud(Forme::fonction(), nom, true)?;
        let mut drapeaux = core::mem::take(&mut self.drapeaux_en_attente);
        if est_coroutine {
            drapeaux |= DrapeauxNoeud::EST_COROUTINE;
        }
        let est_externe = drapeaux.contains(DrapeauxNoeud::EST_EXTERNE);
        if est_externe && est_coroutine {
            return Err(self.erreur_sur(TypeErreur::Syntaxe, "Une coroutine ne peut pas être externe", span_nom));
        }

        self.consomme(G::ParentheseOuvrante, "Attendu une parenthèse ouvrante après le nom de la fonction")?;

        let mut parametres = Vec::new();
        while !self.consomme_si(G::ParentheseFermante) {
            if self.fini() {
                return Err(self.erreur(TypeErreur::Desequilibre, "Attendu une parenthèse fermante à la fin des paramètres"));
            }
            let Some(p) = self.analyse_expression(G::Virgule, G::Fonc, false)? else {
                return Err(self.erreur(TypeErreur::Syntaxe, "Attendu la déclaration d'un paramètre"));
            };
            let p = self.normalise_declaration(p)?;
            if self.assembleuse.genre(p) != GenreNoeud::DeclarationVariable {
                return Err(self.erreur_sur(
                    TypeErreur::Syntaxe,
                    "Attendu la déclaration d'un paramètre avec son type",
                    self.assembleuse.noeud(p).lexeme.span,
                ));
            }
            self.assembleuse.noeud_mut(p).drapeaux |= DrapeauxNoeud::EST_PARAMETRE;
            parametres.push(p);
        }

        for (i, &p) in parametres.iter().enumerate() {
            let variadique = self.assembleuse.noeud(p).type_declare.as_ref().is_some_and(kuri_ast::TypeDeclare::est_variadique);
            if variadique {
                if i + 1 != parametres.len() {
                    return Err(self.erreur_sur(
                        TypeErreur::Syntaxe,
                        "Le paramètre variadique doit être le dernier",
                        self.assembleuse.noeud(p).lexeme.span,
                    ));
                }
                drapeaux |= DrapeauxNoeud::EST_VARIADIQUE;
            }
        }

        let mut types_retour = Vec::new();
        if self.consomme_si(G::DoublePoints) || self.consomme_si(G::Fleche) {
            loop {
                types_retour.push(self.analyse_type_declare()?);
                if !self.consomme_si(G::Virgule) {
                    break;
                }
            }
        }

        if est_externe && types_retour.len() > 1 {
            return Err(self.erreur_sur(
                TypeErreur::Syntaxe,
                "Ne peut avoir plusieurs valeurs de retour pour une fonction externe",
                span_nom,
            ));
        }

        while self.est(G::Diese) {
            self.analyse_directive()?;
            drapeaux |= core::mem::take(&mut self.drapeaux_en_attente);
        }

        {
            let noeud = self.assembleuse.noeud_mut(id);
            noeud.drapeaux |= drapeaux;
            if let Some(f) = noeud.comme_fonction_mut() {
                f.parametres = parametres;
                f.types_retour = types_retour;
            }
        }

        if est_externe {
            self.consomme_si(G::PointVirgule);
        } else {
            if self.est(G::PointVirgule) {
                return Err(self.erreur(TypeErreur::Syntaxe, "Une fonction non externe doit avoir un corps"));
            }
            self.analyse_bloc(true)?;
        }

        self.assembleuse.depile_noeud(GenreNoeud::DeclarationFonction)
    }

    /// Position : juste après `struct`/`union`.
    fn analyse_declaration_structure(&mut self, nom: Lexeme, est_union: bool) -> Resultat<NoeudId> {
        let id = self.assembleuse.empile_noeud(Forme::DeclarationStructure { membres: Vec::new(), est_union }, nom, true)?;
        let mut drapeaux = core::mem::take(&mut self.drapeaux_en_attente);
        if est_union && self.consomme_si(G::Nonsur) {
            drapeaux |= DrapeauxNoeud::EST_NONSUR;
        }
        self.assembleuse.noeud_mut(id).drapeaux |= drapeaux;

        if drapeaux.contains(DrapeauxNoeud::EST_EXTERNE) && !self.est(G::AccoladeOuvrante) {
            self.consomme_si(G::PointVirgule);
            return self.assembleuse.depile_noeud(GenreNoeud::DeclarationStructure);
        }

        self.consomme(G::AccoladeOuvrante, "Attendu une accolade ouvrante après le nom de la structure")?;
        while !self.consomme_si(G::AccoladeFermante) {
            if self.fini() {
                return Err(self.erreur(TypeErreur::Desequilibre, "Attendu une accolade fermante à la fin de la structure"));
            }
            let employe = self.consomme_si(G::Empl);
            let position = self.position;
            let Some(membre) = self.analyse_expression(G::PointVirgule, G::Struct, false)? else {
                if self.position == position {
                    return Err(self.erreur(TypeErreur::LexemeInattendu, "Lexème inattendu dans la structure"));
                }
                continue;
            };
            let membre = self.normalise_declaration(membre)?;
            if self.assembleuse.genre(membre) != GenreNoeud::DeclarationVariable {
                return Err(self.erreur_sur(
                    TypeErreur::Syntaxe,
                    "Attendu la déclaration d'un membre",
                    self.assembleuse.noeud(membre).lexeme.span,
                ));
            }
            if employe {
                self.assembleuse.noeud_mut(membre).drapeaux |= DrapeauxNoeud::EST_EMPLOYE;
            }
            self.assembleuse.ajoute_noeud(membre)?;
        }

        self.assembleuse.depile_noeud(GenreNoeud::DeclarationStructure)
    }

    /// Position : juste après `énum`.
    fn analyse_declaration_enum(&mut self, nom: Lexeme) -> Resultat<NoeudId> {
        let id = self.assembleuse.empile_noeud(Forme::DeclarationEnum { membres: Vec::new() }, nom, true)?;
        self.drapeaux_en_attente = DrapeauxNoeud::empty();
        if !self.est(G::AccoladeOuvrante) {
            let t = self.analyse_type_declare()?;
            self.assembleuse.noeud_mut(id).type_declare = Some(t);
        }

        self.consomme(G::AccoladeOuvrante, "Attendu une accolade ouvrante après le nom de l'énum")?;
        while !self.consomme_si(G::AccoladeFermante) {
            if self.fini() {
                return Err(self.erreur(TypeErreur::Desequilibre, "Attendu une accolade fermante à la fin de l'énum"));
            }
            let position = self.position;
            let Some(expr) = self.analyse_expression(G::PointVirgule, G::Enum, false)? else {
                if self.position == position {
                    return Err(self.erreur(TypeErreur::LexemeInattendu, "Lexème inattendu dans l'énum"));
                }
                continue;
            };
            for membre in self.assembleuse.aplatis_virgules(expr) {
                let membre = self.normalise_membre_enum(membre)?;
                self.assembleuse.ajoute_noeud(membre)?;
            }
        }

        self.assembleuse.depile_noeud(GenreNoeud::DeclarationEnum)
    }

    /// `A` ou `A = valeur` dans un énum, converti en déclaration.
    fn normalise_membre_enum(&mut self, id: NoeudId) -> Resultat<NoeudId> {
        let forme = self.assembleuse.noeud(id).forme.clone();
        match forme {
            Forme::Reference { .. } => self.convertis_reference_en_declaration(id),
            Forme::Assignation { cible: Some(cible), valeur } | Forme::DeclarationVariable { cible: Some(cible), valeur }
                if self.assembleuse.genre(cible) == GenreNoeud::Reference =>
            {
                let lexeme = self.assembleuse.noeud(cible).lexeme.clone();
                let n = self.assembleuse.noeud_mut(id);
                n.forme = Forme::DeclarationVariable { cible: Some(cible), valeur };
                n.lexeme = lexeme;
                Ok(id)
            }
            _ => Err(self.erreur_sur(
                TypeErreur::Syntaxe,
                "Attendu le nom d'un membre de l'énum",
                self.assembleuse.noeud(id).lexeme.span,
            )),
        }
    }

    /// Transforme les formes déclaratives d'une expression en `DeclarationVariable`.
    ///
    /// - `x : T` (référence annotée) ;
    /// - `x : T = e` (assignation dont toutes les cibles sont annotées) ;
    /// - `x := e` (déjà une déclaration ; marque les cibles).
    fn normalise_declaration(&mut self, id: NoeudId) -> Resultat<NoeudId> {
        let noeud = self.assembleuse.noeud(id);
        match noeud.forme.clone() {
            Forme::Reference { .. } if noeud.possede(DrapeauxNoeud::EST_DECLARATION) => {
                self.convertis_reference_en_declaration(id)
            }
            Forme::Assignation { cible: Some(cible), valeur } if noeud.lexeme.genre == G::Egal => {
                let cibles = self.assembleuse.aplatis_virgules(cible);
                let declarees = cibles.iter().all(|&c| self.assembleuse.noeud(c).possede(DrapeauxNoeud::EST_DECLARATION));
                if declarees {
                    self.assembleuse.noeud_mut(id).forme = Forme::DeclarationVariable { cible: Some(cible), valeur };
                    self.finalise_declaration(id, cible);
                }
                Ok(id)
            }
            Forme::DeclarationVariable { cible: Some(cible), .. } => {
                for c in self.assembleuse.aplatis_virgules(cible) {
                    if self.assembleuse.genre(c) != GenreNoeud::Reference {
                        return Err(self.erreur_sur(
                            TypeErreur::Syntaxe,
                            "Attendu un nom de variable à gauche de « := »",
                            self.assembleuse.noeud(c).lexeme.span,
                        ));
                    }
                    self.assembleuse.noeud_mut(c).drapeaux |= DrapeauxNoeud::EST_DECLARATION;
                }
                self.finalise_declaration(id, cible);
                Ok(id)
            }
            _ => Ok(id),
        }
    }

    /// Copie le nom et le type d'une cible unique sur le noeud de déclaration.
    fn finalise_declaration(&mut self, id: NoeudId, cible: NoeudId) {
        if self.assembleuse.genre(cible) == GenreNoeud::Reference {
            let (lexeme, type_declare) = {
                let c = self.assembleuse.noeud(cible);
                (c.lexeme.clone(), c.type_declare.clone())
            };
            let n = self.assembleuse.noeud_mut(id);
            n.lexeme = lexeme;
            n.type_declare = type_declare;
        }
    }

    fn convertis_reference_en_declaration(&mut self, id: NoeudId) -> Resultat<NoeudId> {
        let copie = self.assembleuse.noeud(id).clone();
        let cible = self.assembleuse.cree_noeud(copie.forme, copie.lexeme);
        {
            let c = self.assembleuse.noeud_mut(cible);
            c.drapeaux = copie.drapeaux | DrapeauxNoeud::EST_DECLARATION;
            c.type_declare.clone_from(&copie.type_declare);
        }
        self.assembleuse.noeud_mut(id).forme = Forme::DeclarationVariable { cible: Some(cible), valeur: None };
        Ok(id)
    }

    /* ─────────── Instructions ─────────── */

    fn analyse_bloc(&mut self, ajoute: bool) -> Resultat<NoeudId> {
        let accolade = self.consomme(G::AccoladeOuvrante, "Attendu une accolade ouvrante")?;
        let id = self.assembleuse.empile_noeud(Forme::bloc(), accolade, ajoute)?;
        self.analyse_corps_fonction()?;
        self.consomme(G::AccoladeFermante, "Attendu une accolade fermante à la fin du bloc")?;
        self.assembleuse.depile_noeud(GenreNoeud::Bloc)?;
        Ok(id)
    }

    fn analyse_corps_fonction(&mut self) -> Resultat<()> {
        while !self.est(G::AccoladeFermante) && !self.fini() {
            let position = self.position;
            self.analyse_instruction()?;
            if self.position == position {
                return Err(self.erreur(TypeErreur::Syntaxe, "Boucle infini dans l'analyse du corps de la fonction"));
            }
        }
        Ok(())
    }

    fn analyse_instruction(&mut self) -> Resultat<()> {
        match self.genre() {
            G::Retourne | G::Retiens => {
                let est_retour = self.est(G::Retourne);
                let lexeme = self.avance();
                let (forme, genre) = if est_retour {
                    (Forme::Retour { expression: None }, GenreNoeud::Retour)
                } else {
                    (Forme::Retiens { expression: None }, GenreNoeud::Retiens)
                };
                self.assembleuse.empile_noeud(forme, lexeme, true)?;
                if !self.consomme_si(G::PointVirgule) && !self.est(G::AccoladeFermante) {
                    self.analyse_expression(G::PointVirgule, G::Retourne, true)?;
                }
                self.assembleuse.depile_noeud(genre)?;
            }
            G::Pour => self.analyse_pour()?,
            G::Boucle => {
                let lexeme = self.avance();
                self.assembleuse.empile_noeud(Forme::Boucle { bloc: None }, lexeme, true)?;
                self.analyse_bloc(true)?;
                self.assembleuse.depile_noeud(GenreNoeud::Boucle)?;
            }
            G::Repete => {
                let lexeme = self.avance();
                self.assembleuse.empile_noeud(Forme::Repete { bloc: None, condition: None }, lexeme, true)?;
                self.analyse_bloc(true)?;
                self.consomme(G::Tantque, "Attendu « tantque » après le bloc de « répète »")?;
                self.analyse_expression(G::PointVirgule, G::Tantque, true)?;
                self.assembleuse.depile_noeud(GenreNoeud::Repete)?;
            }
            G::Tantque => {
                let lexeme = self.avance();
                self.assembleuse.empile_noeud(Forme::Tantque { condition: None, bloc: None }, lexeme, true)?;
                self.analyse_expression(G::AccoladeOuvrante, G::Tantque, true)?;
                self.recule();
                self.analyse_bloc(true)?;
                self.assembleuse.depile_noeud(GenreNoeud::Tantque)?;
            }
            G::Arrete | G::Continue => {
                let lexeme = self.avance();
                self.assembleuse.empile_noeud(Forme::Controle { etiquette: None }, lexeme, true)?;
                if self.est(G::ChaineCaractere) {
                    let etiquette = self.avance();
                    let id = self.assembleuse.cree_noeud(Forme::Reference { declaration: None }, etiquette);
                    self.assembleuse.ajoute_noeud(id)?;
                }
                self.consomme_si(G::PointVirgule);
                self.assembleuse.depile_noeud(GenreNoeud::Controle)?;
            }
            G::Differe | G::Nonsur => {
                let (forme, genre) = if self.est(G::Differe) {
                    (Forme::Differe { bloc: None }, GenreNoeud::Differe)
                } else {
                    (Forme::NonSur { bloc: None }, GenreNoeud::NonSur)
                };
                let lexeme = self.avance();
                self.assembleuse.empile_noeud(forme, lexeme, true)?;
                self.analyse_bloc(true)?;
                self.assembleuse.depile_noeud(genre)?;
            }
            G::Si | G::Saufsi => {
                self.analyse_controle_si(true)?;
            }
            G::Discr | G::Associe => self.analyse_discr()?,
            G::AccoladeOuvrante => {
                self.analyse_bloc(true)?;
            }
            G::PointVirgule => {
                self.avance();
            }
            G::Soit | G::Dyn => {
                let dynamique = self.est(G::Dyn);
                self.avance();
                let Some(id) = self.analyse_expression(G::PointVirgule, G::Inconnu, false)? else {
                    return Err(self.erreur(TypeErreur::Syntaxe, "Attendu une déclaration de variable"));
                };
                let id = self.normalise_declaration(id)?;
                if self.assembleuse.genre(id) != GenreNoeud::DeclarationVariable {
                    return Err(self.erreur_sur(
                        TypeErreur::Syntaxe,
                        "Attendu une déclaration de variable",
                        self.assembleuse.noeud(id).lexeme.span,
                    ));
                }
                if dynamique {
                    self.assembleuse.noeud_mut(id).drapeaux |= DrapeauxNoeud::EST_DYNAMIQUE;
                }
                self.assembleuse.ajoute_noeud(id)?;
            }
            _ => {
                if let Some(id) = self.analyse_expression(G::PointVirgule, G::Inconnu, false)? {
                    let id = self.normalise_declaration(id)?;
                    self.assembleuse.ajoute_noeud(id)?;
                }
            }
        }
        Ok(())
    }

    /// `si`/`saufsi`, en instruction (`ajoute`) ou en expression.
    fn analyse_controle_si(&mut self, ajoute: bool) -> Resultat<NoeudId> {
        let lexeme = self.avance();
        let id = self.assembleuse.empile_noeud(
            Forme::Si { condition: None, bloc_si_vrai: None, bloc_si_faux: None },
            lexeme,
            ajoute,
        )?;
        self.analyse_expression(G::AccoladeOuvrante, G::Si, true)?;
        self.recule();
        self.analyse_bloc(true)?;

        if self.consomme_si(G::Sinon) {
            if matches!(self.genre(), G::Si | G::Saufsi) {
                self.analyse_controle_si(true)?;
            } else {
                self.analyse_bloc(true)?;
            }
        }

        self.assembleuse.depile_noeud(GenreNoeud::Si)?;
        Ok(id)
    }

    fn analyse_pour(&mut self) -> Resultat<()> {
        let lexeme = self.avance();
        let id = self.assembleuse.empile_noeud(
            Forme::Pour { variable: None, expression: None, bloc: None, bloc_sansarret: None, bloc_sinon: None },
            lexeme,
            true,
        )?;
        if self.analyse_expression(G::Dans, G::Pour, true)?.is_none() {
            return Err(self.erreur(TypeErreur::Syntaxe, "Attendu la variable de la boucle « pour »"));
        }
        if self.analyse_expression(G::AccoladeOuvrante, G::Dans, true)?.is_none() {
            return Err(self.erreur(TypeErreur::Syntaxe, "Attendu l'expression itérée par la boucle « pour »"));
        }
        self.recule();
        self.analyse_bloc(true)?;

        if self.consomme_si(G::Sansarret) {
            let b = self.analyse_bloc(false)?;
            if let Forme::Pour { bloc_sansarret, .. } = &mut self.assembleuse.noeud_mut(id).forme {
                *bloc_sansarret = Some(b);
            }
        }
        if self.consomme_si(G::Sinon) {
            let b = self.analyse_bloc(false)?;
            if let Forme::Pour { bloc_sinon, .. } = &mut self.assembleuse.noeud_mut(id).forme {
                *bloc_sinon = Some(b);
            }
        }

        self.assembleuse.depile_noeud(GenreNoeud::Pour)?;
        Ok(())
    }

    fn analyse_discr(&mut self) -> Resultat<()> {
        let lexeme = self.avance();
        let id = self.assembleuse.empile_noeud(Forme::Discr { expression: None, paires: Vec::new(), sinon: None }, lexeme, true)?;
        if self.analyse_expression(G::AccoladeOuvrante, G::Discr, true)?.is_none() {
            return Err(self.erreur(TypeErreur::Syntaxe, "Attendu l'expression discriminée"));
        }

        while !self.consomme_si(G::AccoladeFermante) {
            if self.fini() {
                return Err(self.erreur(TypeErreur::Desequilibre, "Attendu une accolade fermante à la fin de « discr »"));
            }
            if self.est(G::Sinon) {
                let span = self.span_courant();
                self.avance();
                let b = self.analyse_bloc(false)?;
                if let Forme::Discr { sinon, .. } = &mut self.assembleuse.noeud_mut(id).forme {
                    if sinon.is_some() {
                        return Err(self.erreur_sur(TypeErreur::Syntaxe, "Redéfinition d'un bloc sinon", span));
                    }
                    *sinon = Some(b);
                }
                continue;
            }
            let lexeme = self.lexeme_synthetique(G::Inconnu, "");
            self.assembleuse.empile_noeud(Forme::PaireDiscr { valeurs: None, bloc: None }, lexeme, true)?;
            if self.analyse_expression(G::AccoladeOuvrante, G::Discr, true)?.is_none() {
                return Err(self.erreur(TypeErreur::Syntaxe, "Attendu une valeur pour la branche de « discr »"));
            }
            self.recule();
            self.analyse_bloc(true)?;
            self.assembleuse.depile_noeud(GenreNoeud::PaireDiscr)?;
        }

        self.assembleuse.depile_noeud(GenreNoeud::Discr)?;
        Ok(())
    }
}

/* ─────────────────────────── Façade ─────────────────────────── */

/// Analyse un fichier déjà découpé en lexèmes.
pub fn analyse_fichier(lexemes: &[Lexeme], source: SourceId, assembleuse: &mut Assembleuse) -> Resultat<(NoeudId, Dependances)> {
    let mut s = Syntaxeuse::new(lexemes, source, assembleuse);
    let racine = s.analyse()?;
    #[cfg(feature = "trace")]
    log::trace!("fichier {source:?} analysé : {} dépendance(s)", s.dependances().modules.len());
    Ok((racine, s.into_dependances()))
}

/* ─────────────────────────── Tests ─────────────────────────── */
