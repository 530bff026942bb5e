//! Graphe de dépendances entre fonctions, types et globales.
//!
//! Une arête `a → b` signifie que `a` utilise `b`. Le parcours en profondeur
//! postfixe depuis le point d'entrée rend donc chaque noeud après tout ce
//! dont il dépend ; les cycles (récursion mutuelle) sont permis.

use indexmap::IndexMap;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::DfsPostOrder;

use kuri_ast::{NoeudId, TypeId};

/// Sommet du graphe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoeudDependance {
    /// Déclaration de fonction.
    Fonction(NoeudId),
    /// Type canonique.
    Type(TypeId),
    /// Déclaration de variable globale.
    Globale(NoeudId),
}

/// Graphe construit pendant la validation.
#[derive(Debug, Default, Clone)]
pub struct GrapheDependance {
    graphe: DiGraph<NoeudDependance, ()>,
    index: IndexMap<NoeudDependance, NodeIndex>,
}

impl GrapheDependance {
    /// Graphe vide.
    pub fn new() -> Self { Self::default() }

    /// Sommet correspondant, créé au besoin.
    pub fn noeud(&mut self, n: NoeudDependance) -> NodeIndex {
        if let Some(&i) = self.index.get(&n) {
            return i;
        }
        let i = self.graphe.add_node(n);
        self.index.insert(n, i);
        i
    }

    /// `de` utilise `vers` ; les arêtes en double sont ignorées.
    pub fn ajoute_dependance(&mut self, de: NoeudDependance, vers: NoeudDependance) {
        let a = self.noeud(de);
        let b = self.noeud(vers);
        self.graphe.update_edge(a, b, ());
    }

    /// Dépendances directes de `n`.
    pub fn dependances(&self, n: NoeudDependance) -> Vec<NoeudDependance> {
        let Some(&i) = self.index.get(&n) else { return Vec::new() };
        let mut v: Vec<_> = self.graphe.neighbors(i).map(|j| self.graphe[j]).collect();
        // petgraph rend les voisins du plus récent au plus ancien
        v.reverse();
        v
    }

    /// Tous les sommets atteignables depuis `racines`, chacun une seule fois,
    /// dépendances d'abord.
    pub fn parcours(&self, racines: &[NoeudDependance]) -> Vec<NoeudDependance> {
        let mut dfs = DfsPostOrder::empty(&self.graphe);
        let mut ordre = Vec::new();
        for racine in racines {
            let Some(&i) = self.index.get(racine) else { continue };
            dfs.move_to(i);
            while let Some(j) = dfs.next(&self.graphe) {
                ordre.push(self.graphe[j]);
            }
        }
        ordre
    }

    /// Nombre de sommets.
    pub fn len(&self) -> usize { self.graphe.node_count() }

    /// Aucun sommet.
    pub fn is_empty(&self) -> bool { self.graphe.node_count() == 0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use NoeudDependance::{Fonction, Globale, Type};

    #[test]
    fn dependances_d_abord() {
        let mut g = GrapheDependance::new();
        g.ajoute_dependance(Fonction(NoeudId(0)), Fonction(NoeudId(1)));
        g.ajoute_dependance(Fonction(NoeudId(1)), Type(TypeId(30)));
        g.ajoute_dependance(Fonction(NoeudId(0)), Globale(NoeudId(5)));
        g.ajoute_dependance(Fonction(NoeudId(9)), Fonction(NoeudId(0)));

        let ordre = g.parcours(&[Fonction(NoeudId(0))]);
        assert_eq!(ordre.last(), Some(&Fonction(NoeudId(0))));
        let pos = |n| ordre.iter().position(|&x| x == n).unwrap();
        assert!(pos(Type(TypeId(30))) < pos(Fonction(NoeudId(1))));
        // 9 n'est pas atteignable depuis 0
        assert!(!ordre.contains(&Fonction(NoeudId(9))));
        assert_eq!(ordre.len(), 4);
    }

    #[test]
    fn recursion_mutuelle_une_seule_fois() {
        let mut g = GrapheDependance::new();
        g.ajoute_dependance(Fonction(NoeudId(0)), Fonction(NoeudId(1)));
        g.ajoute_dependance(Fonction(NoeudId(1)), Fonction(NoeudId(0)));
        g.ajoute_dependance(Fonction(NoeudId(1)), Fonction(NoeudId(0)));
        let ordre = g.parcours(&[Fonction(NoeudId(0)), Fonction(NoeudId(1))]);
        assert_eq!(ordre, vec![Fonction(NoeudId(1)), Fonction(NoeudId(0))]);
        assert_eq!(g.dependances(Fonction(NoeudId(1))), vec![Fonction(NoeudId(0))]);
    }

    #[test]
    fn racine_inconnue() {
        let g = GrapheDependance::new();
        assert!(g.parcours(&[Fonction(NoeudId(3))]).is_empty());
        assert!(g.is_empty());
    }
}
