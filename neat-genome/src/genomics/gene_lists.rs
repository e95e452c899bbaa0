use super::{ConnectionGene, NeuronGene};
use crate::Innovation;

use serde::{Deserialize, Serialize};

use std::ops::Deref;

/// Anything identified by an innovation number
/// that can be kept in a [`GeneList`].
pub trait Gene {
    /// Returns the gene's innovation number.
    fn innovation(&self) -> Innovation;
}

impl Gene for NeuronGene {
    fn innovation(&self) -> Innovation {
        NeuronGene::innovation(self)
    }
}

impl Gene for ConnectionGene {
    fn innovation(&self) -> Innovation {
        ConnectionGene::innovation(self)
    }
}

/// Outcome of a [`GeneList::binary_search`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchResult {
    /// The gene is at this index.
    Found(usize),
    /// The gene is absent, and would be inserted at this index.
    Absent(usize),
}

impl SearchResult {
    /// Returns the index of the gene, if it was found.
    pub fn found(self) -> Option<usize> {
        match self {
            SearchResult::Found(index) => Some(index),
            SearchResult::Absent(_) => None,
        }
    }
}

/// A sequence of genes which is usually kept sorted
/// by innovation number, but is not forced to be:
/// operations that require it document it as a
/// precondition, and [`sort_by_innovation`] restores
/// the order on demand.
///
/// [`sort_by_innovation`]: GeneList::sort_by_innovation
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeneList<G> {
    genes: Vec<G>,
}

/// Neuron genes of a genome.
pub type NeuronGeneList = GeneList<NeuronGene>;
/// Connection genes of a genome.
pub type ConnectionGeneList = GeneList<ConnectionGene>;

impl<G> Default for GeneList<G> {
    fn default() -> Self {
        GeneList { genes: Vec::new() }
    }
}

impl<G: Gene> GeneList<G> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty list with room for `capacity` genes.
    pub fn with_capacity(capacity: usize) -> Self {
        GeneList {
            genes: Vec::with_capacity(capacity),
        }
    }

    /// Appends a gene without regard for ordering.
    pub fn push(&mut self, gene: G) {
        self.genes.push(gene);
    }

    /// Searches for the gene with the passed innovation number.
    ///
    /// The list must be sorted; if it is not, the result
    /// is meaningless (but never out of bounds).
    ///
    /// # Examples
    /// ```
    /// use neat_genome::genomics::{ConnectionGene, ConnectionGeneList, SearchResult};
    ///
    /// let list: ConnectionGeneList = vec![
    ///     ConnectionGene::new(2, 0, 1, 0.5),
    ///     ConnectionGene::new(5, 0, 2, 0.5),
    /// ]
    /// .into();
    ///
    /// assert_eq!(list.binary_search(5), SearchResult::Found(1));
    /// assert_eq!(list.binary_search(3), SearchResult::Absent(1));
    /// assert_eq!(list.binary_search(9), SearchResult::Absent(2));
    /// ```
    pub fn binary_search(&self, id: Innovation) -> SearchResult {
        match self.genes.binary_search_by_key(&id, G::innovation) {
            Ok(index) => SearchResult::Found(index),
            Err(index) => SearchResult::Absent(index),
        }
    }

    /// Inserts a gene at its sorted position, scanning
    /// backwards from the end of the list, as new genes
    /// usually carry the highest innovation number.
    ///
    /// # Panics
    /// Panics if a gene with the same innovation
    /// number is already in the list.
    ///
    /// # Examples
    /// ```
    /// use neat_genome::genomics::{NeuronGene, NeuronGeneList, NodeType};
    ///
    /// let mut list = NeuronGeneList::new();
    /// list.insert_sorted(NeuronGene::new(4, NodeType::Hidden, 0));
    /// list.insert_sorted(NeuronGene::new(9, NodeType::Hidden, 0));
    /// list.insert_sorted(NeuronGene::new(6, NodeType::Hidden, 0));
    ///
    /// assert!(list.is_sorted());
    /// assert_eq!(list[1].innovation(), 6);
    /// ```
    pub fn insert_sorted(&mut self, gene: G) {
        let id = gene.innovation();
        let mut index = self.genes.len();
        while index > 0 {
            let previous = self.genes[index - 1].innovation();
            if previous < id {
                break;
            }
            if previous == id {
                panic!("duplicate insertion of gene with id {}", id);
            }
            index -= 1;
        }
        self.genes.insert(index, gene);
    }

    /// Removes and returns the gene with the
    /// passed innovation number.
    ///
    /// # Panics
    /// Panics if the gene is not in the list,
    /// or the list is not sorted.
    pub fn remove(&mut self, id: Innovation) -> G {
        match self.binary_search(id) {
            SearchResult::Found(index) => self.genes.remove(index),
            SearchResult::Absent(_) => {
                panic!("attempted removal of nonexistent gene with id {}", id)
            }
        }
    }

    /// Removes and returns the gene at `index`.
    pub(super) fn remove_at(&mut self, index: usize) -> G {
        self.genes.remove(index)
    }

    /// Returns the gene with the passed innovation number.
    /// The list must be sorted.
    pub fn get(&self, id: Innovation) -> Option<&G> {
        self.binary_search(id).found().map(|index| &self.genes[index])
    }

    pub(super) fn get_mut(&mut self, id: Innovation) -> Option<&mut G> {
        match self.binary_search(id) {
            SearchResult::Found(index) => Some(&mut self.genes[index]),
            SearchResult::Absent(_) => None,
        }
    }

    /// Whether a gene with the passed innovation number is
    /// in the list. The list must be sorted.
    pub fn contains(&self, id: Innovation) -> bool {
        self.binary_search(id).found().is_some()
    }

    /// Whether innovation numbers are strictly increasing.
    /// This is an O(n) scan, meant for checks rather than hot paths.
    pub fn is_sorted(&self) -> bool {
        self.genes
            .windows(2)
            .all(|pair| pair[0].innovation() < pair[1].innovation())
    }

    /// Sorts the list by innovation number.
    pub fn sort_by_innovation(&mut self) {
        self.genes.sort_unstable_by_key(G::innovation);
    }

    /// Returns the innovation number of the last gene.
    pub fn last_innovation(&self) -> Option<Innovation> {
        self.genes.last().map(G::innovation)
    }

    pub(super) fn iter_mut(&mut self) -> std::slice::IterMut<'_, G> {
        self.genes.iter_mut()
    }

    /// Consumes the list, returning its genes in their current order.
    pub fn into_vec(self) -> Vec<G> {
        self.genes
    }
}

impl ConnectionGeneList {
    /// Clears the per-pass mutation flag of every connection.
    pub(super) fn reset_mutated_flags(&mut self) {
        for gene in self.genes.iter_mut() {
            gene.set_mutated(false);
        }
    }
}

impl<G> Deref for GeneList<G> {
    type Target = [G];

    fn deref(&self) -> &[G] {
        &self.genes
    }
}

impl<G> From<Vec<G>> for GeneList<G> {
    fn from(genes: Vec<G>) -> Self {
        GeneList { genes }
    }
}

impl<G> FromIterator<G> for GeneList<G> {
    fn from_iter<I: IntoIterator<Item = G>>(iter: I) -> Self {
        GeneList {
            genes: iter.into_iter().collect(),
        }
    }
}

impl<'a, G> IntoIterator for &'a GeneList<G> {
    type Item = &'a G;
    type IntoIter = std::slice::Iter<'a, G>;

    fn into_iter(self) -> Self::IntoIter {
        self.genes.iter()
    }
}
