use super::NodeType;
use crate::Innovation;

/// The first genome invariant found to be violated
/// by the integrity checker.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntegrityError {
    /// A genome needs at least a bias and one other neuron.
    #[error("genome has {0} neuron(s), at least 2 are required")]
    TooFewNeurons(usize),
    /// The first neuron must be the bias, with id 0.
    #[error("first neuron must be the bias with id 0, found {node_type:?} with id {id}")]
    MissingBias { id: Innovation, node_type: NodeType },
    /// A neuron is out of the bias/input/output/hidden block order.
    #[error("neuron {id} of type {node_type:?} at position {position} is out of block order")]
    NeuronLayout {
        position: usize,
        id: Innovation,
        node_type: NodeType,
    },
    /// The number of neurons of a fixed type differs from the genome's count.
    #[error("expected {expected} {node_type:?} neuron(s), found {found}")]
    NeuronCount {
        node_type: NodeType,
        expected: usize,
        found: usize,
    },
    /// Neuron ids are not strictly increasing.
    #[error("neuron ids out of order: {next} follows {previous}")]
    NeuronsNotSorted {
        previous: Innovation,
        next: Innovation,
    },
    /// The genome has no connections.
    #[error("genome has no connections")]
    NoConnections,
    /// Connection ids are not strictly increasing.
    #[error("connection ids out of order: {next} follows {previous}")]
    ConnectionsNotSorted {
        previous: Innovation,
        next: Innovation,
    },
    /// Two connections share endpoints.
    #[error("more than one connection from {from} to {to}")]
    DuplicateEndpoints { from: Innovation, to: Innovation },
    /// A connection refers to a neuron that is not in the genome.
    #[error("connection {connection} refers to nonexistent neuron {neuron}")]
    MissingEndpoint {
        connection: Innovation,
        neuron: Innovation,
    },
    /// A connection ends at a bias or input neuron.
    #[error("connection {connection} targets {node_type:?} neuron {target}")]
    InvalidTarget {
        connection: Innovation,
        target: Innovation,
        node_type: NodeType,
    },
    /// A connection shares its id with a neuron.
    #[error("id {0} is used by both a neuron and a connection")]
    IdCollision(Innovation),
    /// A neuron's cached connectivity differs from its connections.
    #[error("cached connectivity of neuron {0} does not match the connection genes")]
    AdjacencyMismatch(Innovation),
    /// The genome is cyclic, but was required to be feed-forward.
    #[error("feed-forward genome contains a cycle")]
    Cyclic,
}

/// An error type indicating a genome obtained from
/// an external source is unusable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenomeError {
    /// The genome breaks one of its invariants.
    #[error("malformed genome: {0}")]
    Integrity(#[from] IntegrityError),
    /// The genome's input count differs from the one expected.
    #[error("genome has {found} input(s), expected {expected}")]
    InputCountMismatch { expected: usize, found: usize },
    /// The genome's output count differs from the one expected.
    #[error("genome has {found} output(s), expected {expected}")]
    OutputCountMismatch { expected: usize, found: usize },
}

/// An error type indicating an unusable configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// A probability is not in [0.0, 1.0].
    #[error("{field} must be in [0, 1], got {value}")]
    ProbabilityOutOfRange { field: &'static str, value: f64 },
    /// The weight bound is not a positive finite number.
    #[error("weight_bound must be positive and finite, got {0}")]
    InvalidWeightBound(f64),
    /// There are no weight mutation entries.
    #[error("weight_mutation_scheme is empty")]
    EmptyWeightMutationScheme,
    /// A weight mutation entry has a negative or non-finite chance or parameter.
    #[error("weight_mutation_scheme entry {0} is invalid")]
    InvalidWeightMutationInfo(usize),
}
