//! Application des coercitions calculées par la validation.

use kuri_ast::{NoeudId, TransformationType as T, TypeId};

use super::expression::entoure;
use super::GeneratriceC;
use crate::broyage::broye_nom_local;
use crate::typeuse::{Type, Typeuse};
use crate::validation::evalue_constante;

impl GeneratriceC<'_> {
    /// Convertit la valeur C d'un noeud vers le type attendu par son parent.
    pub(crate) fn applique_transformation(&mut self, id: NoeudId, valeur: String) -> String {
        let n = self.asm.noeud(id);
        let de = n.type_.unwrap_or(Typeuse::RIEN);
        match n.transformation {
            T::Inutile | T::Impossible => valeur,
            T::ConvertiEntierConstant { vers } => {
                match evalue_constante(self.asm, &self.programme.constantes, id).and_then(|v| v.entier()) {
                    Some(v) => self.litteral_entier(v, vers),
                    None => self.convertis(&valeur, de, vers),
                }
            }
            T::AugmenteTailleType { vers }
            | T::ReduitTailleType { vers }
            | T::EntierVersReel { vers }
            | T::ReelVersEntier { vers }
            | T::ConvertiVersTypeCible { vers }
            | T::ConvertiVersPtrRien { vers } => self.convertis(&valeur, de, vers),
            T::ConversionR16 { conversion, .. } => format!("{}({valeur})", conversion.nom_fonction()),
            T::ConvertiVersBase { vers, decalage } => self.decale(&valeur, vers, i64::from(decalage)),
            T::ConvertiVersDerive { vers, decalage } => self.decale(&valeur, vers, -i64::from(decalage)),
            T::ConstruitUnion { vers, index_membre } => self.construit_union(&valeur, vers, index_membre as usize),
            T::ExtraitUnion { vers: _, index_membre } => self.extrait_union(id, &valeur, de, index_membre as usize),
            T::ConstruitEini => self.construit_eini(id, valeur, de),
            T::ExtraitEini { vers } => format!("(*({} *){}.pointeur)", self.nom_c(vers), entoure(&valeur)),
            T::ConvertiTableau { vers } => {
                let Type::TableauFixe { taille, .. } = *self.typeuse.type_(de) else { return valeur };
                let source = self.adressable(id, valeur, de);
                format!("(({}){{ {source}.d, {taille} }})", self.nom_c(vers))
            }
            T::ConstruitTablOctet => self.construit_tabl_octet(id, valeur, de),
            T::PrendReference => format!("(&{})", entoure(&valeur)),
            T::Dereference => format!("(*{})", entoure(&valeur)),
        }
    }

    /// Transtypage C, ou passage par `double` pour `r16`.
    fn convertis(&self, valeur: &str, de: TypeId, vers: TypeId) -> String {
        if vers == Typeuse::R16 {
            return format!("DLS_depuis_r64((double){})", entoure(valeur));
        }
        if de == Typeuse::R16 {
            return format!("(({})DLS_vers_r64({valeur}))", self.nom_c(vers));
        }
        format!("(({}){})", self.nom_c(vers), entoure(valeur))
    }

    /// Pointeur vers une base ou une dérivée placée à `decalage` octets.
    fn decale(&self, valeur: &str, vers: TypeId, decalage: i64) -> String {
        let nom = self.nom_c(vers);
        if decalage == 0 {
            return format!("(({nom}){})", entoure(valeur));
        }
        format!("(({nom})((char *){} + {decalage}))", entoure(valeur))
    }

    /// Copie la valeur dans un temporaire si elle n'a pas d'adresse.
    fn adressable(&mut self, id: NoeudId, valeur: String, t: TypeId) -> String {
        if self.est_adressable(id, &valeur) {
            return entoure(&valeur);
        }
        let tmp = self.temporaire();
        self.ligne(&format!("{} {tmp} = {valeur};", self.nom_c(t)));
        tmp
    }

    fn construit_union(&mut self, valeur: &str, vers: TypeId, index: usize) -> String {
        let typeuse = self.typeuse;
        let Some(s) = typeuse.structure(vers) else { return valeur.to_owned() };
        let Some(m) = s.membres.get(index) else { return valeur.to_owned() };
        let tmp = self.temporaire();
        self.ligne(&format!("{} {tmp};", self.nom_c(vers)));
        self.ligne(&format!("memset(&{tmp}, 0, sizeof({tmp}));"));
        let champ = broye_nom_local(&m.nom);
        if self.est_scalaire(m.type_) {
            self.ligne(&format!("{tmp}.{champ} = ({}){valeur};", self.nom_c(m.type_)));
        } else {
            self.ligne(&format!("{tmp}.{champ} = {valeur};"));
        }
        if s.est_union_sure() {
            self.ligne(&format!("{tmp}.membre_actif = {};", index + 1));
        }
        tmp
    }

    fn extrait_union(&mut self, id: NoeudId, valeur: &str, de: TypeId, index: usize) -> String {
        let typeuse = self.typeuse;
        let Some(s) = typeuse.structure(de) else { return valeur.to_owned() };
        let Some(m) = s.membres.get(index) else { return valeur.to_owned() };
        let base = entoure(valeur);
        if s.est_union_sure() && self.nonsur == 0 {
            self.ouvre(&format!("if ({base}.membre_actif != {}) {{", index + 1));
            self.panique("decl_panique_membre_union", id);
            self.ferme("}");
        }
        format!("{base}.{}", broye_nom_local(&m.nom))
    }

    fn construit_eini(&mut self, id: NoeudId, valeur: String, de: TypeId) -> String {
        let de = if de == Typeuse::ENTIER_CONSTANT { Typeuse::Z32 } else { de };
        let source = self.adressable(id, valeur, de);
        format!("((eini){{ (void *)&{source}, {} }})", self.info_type(de))
    }

    /// Vue `[]octet` sur les octets d'un tableau ou d'une chaîne.
    fn construit_tabl_octet(&mut self, id: NoeudId, valeur: String, de: TypeId) -> String {
        let typeuse = self.typeuse;
        let nom = self.nom_c(Typeuse::TABL_OCTET);
        match typeuse.type_(de) {
            Type::TableauFixe { element, taille } => {
                let e = self.nom_c(*element);
                let source = self.adressable(id, valeur, de);
                format!("(({nom}){{ (octet *){source}.d, {taille} * (int64_t)sizeof({e}) }})")
            }
            Type::TableauDynamique(element) | Type::Variadique(Some(element)) => {
                let e = self.nom_c(*element);
                let source = self.adressable(id, valeur, de);
                format!("(({nom}){{ (octet *){source}.pointeur, {source}.taille * (int64_t)sizeof({e}) }})")
            }
            _ => {
                let source = self.adressable(id, valeur, de);
                format!("(({nom}){{ (octet *){source}.pointeur, {source}.taille }})")
            }
        }
    }
}
