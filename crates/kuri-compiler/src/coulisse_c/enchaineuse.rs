//! Tampon de texte par morceaux.
//!
//! Le code C est ajouté par petites touches ; plutôt que de faire grandir une
//! seule `String` (et de la recopier à chaque réallocation), les ajouts
//! remplissent des morceaux de taille fixe. La chaîne finale est matérialisée
//! en un seul passage.

use core::fmt;
use std::io;

/// Capacité d'un morceau.
pub const TAILLE_TAMPON: usize = 16 * 1024;

/// Tampon de sortie par morceaux.
#[derive(Debug, Clone, Default)]
pub struct Enchaineuse {
    morceaux: Vec<String>,
    taille: usize,
}

impl Enchaineuse {
    /// Tampon vide.
    pub fn new() -> Self { Self::default() }

    /// Ajoute du texte à la fin.
    pub fn ajoute(&mut self, texte: &str) {
        if texte.is_empty() {
            return;
        }
        let place = self.morceaux.last().map_or(0, |m| m.capacity() - m.len());
        if place < texte.len() {
            self.morceaux.push(String::with_capacity(TAILLE_TAMPON.max(texte.len())));
        }
        if let Some(m) = self.morceaux.last_mut() {
            m.push_str(texte);
        }
        self.taille += texte.len();
    }

    /// Déplace le contenu d'un autre tampon à la fin de celui-ci.
    pub fn ajoute_enchaineuse(&mut self, autre: Self) {
        self.taille += autre.taille;
        self.morceaux.extend(autre.morceaux);
    }

    /// Taille totale en octets.
    pub const fn len(&self) -> usize { self.taille }

    /// Aucun texte.
    pub const fn is_empty(&self) -> bool { self.taille == 0 }

    /// Nombre de morceaux alloués.
    pub fn nombre_morceaux(&self) -> usize { self.morceaux.len() }

    /// Texte complet.
    pub fn chaine(&self) -> String {
        let mut s = String::with_capacity(self.taille);
        for m in &self.morceaux {
            s.push_str(m);
        }
        s
    }

    /// Écrit le texte complet dans `sortie`.
    pub fn ecris<W: io::Write>(&self, sortie: &mut W) -> io::Result<()> {
        for m in &self.morceaux {
            sortie.write_all(m.as_bytes())?;
        }
        sortie.flush()
    }
}

impl fmt::Write for Enchaineuse {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.ajoute(s);
        Ok(())
    }
}

impl fmt::Display for Enchaineuse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in &self.morceaux {
            f.write_str(m)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write as _;
    use pretty_assertions::assert_eq;

    #[test]
    fn ajouts_concatenes() {
        let mut e = Enchaineuse::new();
        assert!(e.is_empty());
        e.ajoute("int ");
        e.ajoute("");
        write!(e, "x = {};", 42).unwrap();
        assert_eq!(e.chaine(), "int x = 42;");
        assert_eq!(e.len(), 11);
        assert_eq!(e.nombre_morceaux(), 1);
    }

    #[test]
    fn nouveaux_morceaux_au_besoin() {
        let mut e = Enchaineuse::new();
        let bloc = "a".repeat(TAILLE_TAMPON - 1);
        e.ajoute(&bloc);
        e.ajoute("bc");
        assert_eq!(e.nombre_morceaux(), 2);
        let grand = "z".repeat(TAILLE_TAMPON * 2);
        e.ajoute(&grand);
        assert_eq!(e.nombre_morceaux(), 3);
        assert_eq!(e.len(), bloc.len() + 2 + grand.len());
        let chaine = e.chaine();
        assert_eq!(&chaine[bloc.len()..bloc.len() + 4], "bczz");
        assert!(chaine.ends_with("zz"));
    }

    #[test]
    fn ecriture_et_fusion() {
        let mut a = Enchaineuse::new();
        a.ajoute("debut;");
        let mut b = Enchaineuse::new();
        b.ajoute("fin;");
        a.ajoute_enchaineuse(b);
        let mut sortie = Vec::new();
        a.ecris(&mut sortie).unwrap();
        assert_eq!(String::from_utf8(sortie).unwrap(), "debut;fin;");
        assert_eq!(a.to_string(), "debut;fin;");
    }
}
