use crate::{ActivationFnId, Innovation};

use ahash::RandomState;
use serde::{Deserialize, Serialize};

use std::collections::HashSet;
use std::fmt;

/// A NodeType indicates the function of
/// the neuron's network equivalent.
///
/// The variants are ordered as the neuron
/// blocks of a genome are laid out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeType {
    /// The constant-output neuron, always with id 0.
    Bias,
    /// Input neurons.
    Input,
    /// Output neurons.
    Output,
    /// Hidden neurons.
    Hidden,
}

impl NodeType {
    /// Whether connections may end at neurons of this type.
    pub fn accepts_connections(self) -> bool {
        matches!(self, NodeType::Output | NodeType::Hidden)
    }
}

/// Neuron genes are the structural elements of genomes
/// between which connection genes are created.
///
/// Besides its identity, a neuron gene caches the ids of
/// the neurons directly connected to it. The cache is never
/// serialized and can always be rebuilt from the genome's
/// connection genes.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct NeuronGene {
    id: Innovation,
    node_type: NodeType,
    activation_fn_id: ActivationFnId,
    #[serde(skip)]
    source_neurons: HashSet<Innovation, RandomState>,
    #[serde(skip)]
    target_neurons: HashSet<Innovation, RandomState>,
}

impl NeuronGene {
    /// Generate a new, unconnected neuron with the passed parameters.
    ///
    /// # Examples
    /// ```
    /// use neat_genome::genomics::{NeuronGene, NodeType};
    ///
    /// let neuron = NeuronGene::new(5, NodeType::Hidden, 0);
    ///
    /// assert_eq!(neuron.source_neurons().count(), 0);
    /// ```
    pub fn new(
        id: Innovation,
        node_type: NodeType,
        activation_fn_id: ActivationFnId,
    ) -> NeuronGene {
        NeuronGene {
            id,
            node_type,
            activation_fn_id,
            source_neurons: HashSet::default(),
            target_neurons: HashSet::default(),
        }
    }

    /// Returns a copy of the neuron without
    /// its cached connectivity.
    pub(super) fn without_connectivity(&self) -> NeuronGene {
        NeuronGene::new(self.id, self.node_type, self.activation_fn_id)
    }

    /// Returns the neuron's innovation number.
    pub fn innovation(&self) -> Innovation {
        self.id
    }

    /// Returns the neuron's type.
    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    /// Returns the index of the neuron's activation function.
    pub fn activation_fn_id(&self) -> ActivationFnId {
        self.activation_fn_id
    }

    /// Returns an iterator over the ids of the neurons
    /// that have a connection to this neuron.
    pub fn source_neurons(&self) -> impl Iterator<Item = &Innovation> {
        self.source_neurons.iter()
    }

    /// Returns an iterator over the ids of the neurons
    /// this neuron has a connection to.
    pub fn target_neurons(&self) -> impl Iterator<Item = &Innovation> {
        self.target_neurons.iter()
    }

    /// Whether there is a connection from `neuron` to this neuron.
    pub fn has_source(&self, neuron: Innovation) -> bool {
        self.source_neurons.contains(&neuron)
    }

    /// Whether there is a connection from this neuron to `neuron`.
    pub fn has_target(&self, neuron: Innovation) -> bool {
        self.target_neurons.contains(&neuron)
    }

    /// Whether the neuron has no connections at all.
    pub fn is_disconnected(&self) -> bool {
        self.source_neurons.is_empty() && self.target_neurons.is_empty()
    }

    pub(super) fn source_set(&self) -> &HashSet<Innovation, RandomState> {
        &self.source_neurons
    }

    pub(super) fn target_set(&self) -> &HashSet<Innovation, RandomState> {
        &self.target_neurons
    }

    pub(super) fn add_source(&mut self, neuron: Innovation) {
        self.source_neurons.insert(neuron);
    }

    pub(super) fn add_target(&mut self, neuron: Innovation) {
        self.target_neurons.insert(neuron);
    }

    pub(super) fn remove_source(&mut self, neuron: Innovation) {
        self.source_neurons.remove(&neuron);
    }

    pub(super) fn remove_target(&mut self, neuron: Innovation) {
        self.target_neurons.remove(&neuron);
    }

    pub(super) fn clear_connectivity(&mut self) {
        self.source_neurons.clear();
        self.target_neurons.clear();
    }
}

impl fmt::Display for NeuronGene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Neuron({}, {:?}, fn {}, {} in, {} out)",
            self.id,
            self.node_type,
            self.activation_fn_id,
            self.source_neurons.len(),
            self.target_neurons.len()
        )
    }
}
