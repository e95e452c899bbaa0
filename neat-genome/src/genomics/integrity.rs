use super::{cycles, Genome, IntegrityError, NodeType};
use crate::Innovation;

use ahash::RandomState;

use std::collections::{HashMap, HashSet};

/// Checks every genome invariant, returning the first one violated.
///
/// The checks, in order: the neuron layout (bias with id 0, then
/// inputs, outputs and hidden neurons, ids strictly increasing, and
/// counts matching the genome's), the presence of at least one
/// connection, connection ordering, endpoint validity and uniqueness,
/// the neurons' cached connectivity, and finally, if
/// `feedforward_only` is set, acyclicity.
///
/// # Examples
/// ```
/// use neat_genome::genomics::{verify, ConnectionGene, Genome, IntegrityError, NeuronGene, NodeType};
///
/// let neurons = vec![
///     NeuronGene::new(0, NodeType::Bias, 0),
///     NeuronGene::new(1, NodeType::Input, 0),
///     NeuronGene::new(2, NodeType::Output, 0),
/// ];
/// let connections = vec![
///     ConnectionGene::new(4, 1, 2, 0.5),
///     ConnectionGene::new(3, 0, 2, 0.5),
/// ];
/// let genome = Genome::from_genes(0, 0, neurons.into(), connections.into(), 1, 1, true);
///
/// assert_eq!(
///     verify(&genome, false),
///     Err(IntegrityError::ConnectionsNotSorted { previous: 4, next: 3 })
/// );
/// ```
pub fn verify(genome: &Genome, feedforward_only: bool) -> Result<(), IntegrityError> {
    verify_neurons(genome)?;
    verify_connections(genome)?;
    verify_adjacency(genome)?;
    if feedforward_only && !cycles::is_acyclic(genome.connections().iter()) {
        return Err(IntegrityError::Cyclic);
    }
    Ok(())
}

/// Whether the genome satisfies every invariant.
/// See [`verify`] for the invariants checked.
pub fn check_integrity(genome: &Genome, feedforward_only: bool) -> bool {
    verify(genome, feedforward_only).is_ok()
}

fn verify_neurons(genome: &Genome) -> Result<(), IntegrityError> {
    let neurons = genome.neurons();
    if neurons.len() < 2 {
        return Err(IntegrityError::TooFewNeurons(neurons.len()));
    }

    let bias = &neurons[0];
    if bias.node_type() != NodeType::Bias || bias.innovation() != 0 {
        return Err(IntegrityError::MissingBias {
            id: bias.innovation(),
            node_type: bias.node_type(),
        });
    }

    for (position, pair) in neurons.windows(2).enumerate() {
        let (previous, next) = (&pair[0], &pair[1]);
        if next.node_type() < previous.node_type() || next.node_type() == NodeType::Bias {
            return Err(IntegrityError::NeuronLayout {
                position: position + 1,
                id: next.innovation(),
                node_type: next.node_type(),
            });
        }
        if next.innovation() <= previous.innovation() {
            return Err(IntegrityError::NeuronsNotSorted {
                previous: previous.innovation(),
                next: next.innovation(),
            });
        }
    }

    for (node_type, expected) in [
        (NodeType::Input, genome.input_count()),
        (NodeType::Output, genome.output_count()),
    ] {
        let found = neurons
            .iter()
            .filter(|neuron| neuron.node_type() == node_type)
            .count();
        if found != expected {
            return Err(IntegrityError::NeuronCount {
                node_type,
                expected,
                found,
            });
        }
    }

    Ok(())
}

fn verify_connections(genome: &Genome) -> Result<(), IntegrityError> {
    let connections = genome.connections();
    if connections.is_empty() {
        return Err(IntegrityError::NoConnections);
    }

    for pair in connections.windows(2) {
        if pair[1].innovation() <= pair[0].innovation() {
            return Err(IntegrityError::ConnectionsNotSorted {
                previous: pair[0].innovation(),
                next: pair[1].innovation(),
            });
        }
    }

    let mut endpoints: HashSet<(Innovation, Innovation), RandomState> = HashSet::default();
    for connection in connections.iter() {
        let id = connection.innovation();
        if genome.neuron(id).is_some() {
            return Err(IntegrityError::IdCollision(id));
        }
        for neuron in [connection.source(), connection.target()] {
            if genome.neuron(neuron).is_none() {
                return Err(IntegrityError::MissingEndpoint {
                    connection: id,
                    neuron,
                });
            }
        }
        let target_type = genome
            .neuron(connection.target())
            .map(|neuron| neuron.node_type());
        if let Some(node_type) = target_type.filter(|node_type| !node_type.accepts_connections()) {
            return Err(IntegrityError::InvalidTarget {
                connection: id,
                target: connection.target(),
                node_type,
            });
        }
        if !endpoints.insert(connection.endpoints()) {
            let (from, to) = connection.endpoints();
            return Err(IntegrityError::DuplicateEndpoints { from, to });
        }
    }

    Ok(())
}

type NeighbourSets = (
    HashSet<Innovation, RandomState>,
    HashSet<Innovation, RandomState>,
);

fn verify_adjacency(genome: &Genome) -> Result<(), IntegrityError> {
    let mut expected: HashMap<Innovation, NeighbourSets, RandomState> = HashMap::default();
    for connection in genome.connections().iter() {
        let (source, target) = connection.endpoints();
        expected.entry(source).or_default().1.insert(target);
        expected.entry(target).or_default().0.insert(source);
    }

    let empty = NeighbourSets::default();
    for neuron in genome.neurons().iter() {
        let (sources, targets) = expected.get(&neuron.innovation()).unwrap_or(&empty);
        if neuron.source_set() != sources || neuron.target_set() != targets {
            return Err(IntegrityError::AdjacencyMismatch(neuron.innovation()));
        }
    }

    Ok(())
}
