use super::cycles::{self, ConnectivityGraph};
use super::{ConnectionGene, Genome, NeuronGene, NodeType};
use crate::{GenomeId, Innovation};

use ahash::RandomState;

use std::collections::{BTreeMap, HashMap, HashSet};

/// Accumulates the connections of a genome under construction.
///
/// Connections with already present endpoints are rejected or
/// merged, neurons are copied from the parent owning them the
/// first time they are referenced, and every neuron's connectivity
/// is kept up to date so that cycles can be detected along the way.
#[derive(Debug, Default)]
pub(super) struct ConnectionListBuilder {
    neurons: BTreeMap<Innovation, NeuronGene>,
    connections: Vec<ConnectionGene>,
    endpoints: HashMap<(Innovation, Innovation), usize, RandomState>,
}

impl ConnectionListBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the bias, input and output neurons of `genome`,
    /// which every genome has regardless of its connections.
    pub fn register_fixed_neurons(&mut self, genome: &Genome) {
        for neuron in genome
            .neurons()
            .iter()
            .filter(|neuron| neuron.node_type() != NodeType::Hidden)
        {
            self.neurons
                .entry(neuron.innovation())
                .or_insert_with(|| neuron.without_connectivity());
        }
    }

    /// Adds a copy of `gene`, whose endpoints are taken from `parent`.
    ///
    /// If a connection with the same endpoints is already present,
    /// the gene is rejected, unless `overwrite` is set, in which
    /// case the present connection takes the gene's weight.
    /// Returns whether the builder changed.
    ///
    /// # Panics
    /// Panics if an endpoint of `gene` is not a neuron of `parent`.
    pub fn try_add(&mut self, gene: &ConnectionGene, parent: &Genome, overwrite: bool) -> bool {
        if let Some(&index) = self.endpoints.get(&gene.endpoints()) {
            if overwrite {
                self.connections[index].replace_weight(gene.weight());
            }
            return overwrite;
        }

        let (source, target) = gene.endpoints();
        for id in [source, target] {
            self.neurons.entry(id).or_insert_with(|| {
                parent
                    .neuron(id)
                    .map(NeuronGene::without_connectivity)
                    .unwrap_or_else(|| {
                        panic!(
                            "connection {} refers to neuron {} absent from genome {}",
                            gene.innovation(),
                            id,
                            parent.id()
                        )
                    })
            });
        }
        if let Some(neuron) = self.neurons.get_mut(&source) {
            neuron.add_target(target);
        }
        if let Some(neuron) = self.neurons.get_mut(&target) {
            neuron.add_source(source);
        }

        self.endpoints.insert((source, target), self.connections.len());
        self.connections.push(gene.clone());
        true
    }

    /// Whether adding a connection from `source`
    /// to `target` would create a cycle.
    pub fn is_connection_cyclic(&self, source: Innovation, target: Innovation) -> bool {
        cycles::would_create_cycle(self, source, target)
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Produces the genome, with neurons laid out by id, connections
    /// sorted, and connectivity already consistent.
    pub fn build(
        self,
        id: GenomeId,
        birth_generation: u32,
        input_count: usize,
        output_count: usize,
    ) -> Genome {
        let mut connections: super::ConnectionGeneList = self.connections.into();
        connections.sort_by_innovation();
        Genome::from_genes(
            id,
            birth_generation,
            self.neurons.into_values().collect(),
            connections,
            input_count,
            output_count,
            false,
        )
    }
}

impl ConnectivityGraph for ConnectionListBuilder {
    fn sources_of(&self, neuron: Innovation) -> Option<&HashSet<Innovation, RandomState>> {
        self.neurons.get(&neuron).map(NeuronGene::source_set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Bias 0, input 1, output 2, hidden 10 and 11, connected
    /// 1 -> 10 -> 11 -> 2.
    fn parent() -> Genome {
        let neurons = vec![
            NeuronGene::new(0, NodeType::Bias, 0),
            NeuronGene::new(1, NodeType::Input, 0),
            NeuronGene::new(2, NodeType::Output, 0),
            NeuronGene::new(10, NodeType::Hidden, 0),
            NeuronGene::new(11, NodeType::Hidden, 0),
        ];
        let connections = vec![
            ConnectionGene::new(4, 1, 10, 1.0),
            ConnectionGene::new(12, 10, 11, 1.0),
            ConnectionGene::new(13, 11, 2, 1.0),
        ];
        Genome::from_genes(7, 0, neurons.into(), connections.into(), 1, 1, true)
    }

    #[test]
    fn duplicate_endpoints() {
        let parent = parent();
        let mut builder = ConnectionListBuilder::new();

        assert!(builder.try_add(&ConnectionGene::new(4, 1, 10, 1.0), &parent, false));
        assert!(!builder.try_add(&ConnectionGene::new(20, 1, 10, -3.0), &parent, false));
        assert_eq!(builder.connections[0].weight(), 1.0);

        assert!(builder.try_add(&ConnectionGene::new(20, 1, 10, -3.0), &parent, true));
        assert_eq!(builder.connections.len(), 1);
        assert_eq!(builder.connections[0].innovation(), 4);
        assert_eq!(builder.connections[0].weight(), -3.0);
    }

    #[test]
    fn materializes_neurons_lazily() {
        let parent = parent();
        let mut builder = ConnectionListBuilder::new();
        builder.register_fixed_neurons(&parent);
        assert_eq!(builder.neurons.len(), 3);

        builder.try_add(&ConnectionGene::new(12, 10, 11, 1.0), &parent, false);

        assert_eq!(builder.neurons.len(), 5);
        assert!(builder.neurons[&10].has_target(11));
        assert!(builder.neurons[&11].has_source(10));
        assert!(!builder.neurons[&10].has_source(1));
    }

    #[test]
    #[should_panic]
    fn unknown_endpoint() {
        let parent = parent();
        let mut builder = ConnectionListBuilder::new();
        builder.try_add(&ConnectionGene::new(30, 1, 99, 1.0), &parent, false);
    }

    #[test]
    fn cycle_detection() {
        let parent = parent();
        let mut builder = ConnectionListBuilder::new();
        builder.register_fixed_neurons(&parent);
        for connection in parent.connections().iter() {
            builder.try_add(connection, &parent, false);
        }

        assert!(builder.is_connection_cyclic(2, 1));
        assert!(builder.is_connection_cyclic(11, 10));
        assert!(builder.is_connection_cyclic(2, 10));
        assert!(builder.is_connection_cyclic(10, 10));
        assert!(!builder.is_connection_cyclic(10, 2));
        assert!(!builder.is_connection_cyclic(0, 11));
    }

    #[test]
    fn build() {
        let parent = parent();
        let mut builder = ConnectionListBuilder::new();
        builder.register_fixed_neurons(&parent);
        for connection in parent.connections().iter().rev() {
            builder.try_add(connection, &parent, false);
        }

        let genome = builder.build(7, 0, 1, 1);

        assert_eq!(genome, parent);
        assert!(crate::genomics::check_integrity(&genome, true));
    }
}
