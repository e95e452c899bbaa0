//! Genomes are the focus of evolution in NEAT.
//! They are a collection of neuron and connection genes that can
//! be decoded into a phenotype (a neural network). Genomes are
//! progressively mutated and recombined, adding complexity and
//! functionality, while a shared [`History`] keeps identical
//! structural innovations aligned across the whole population.

mod builder;
mod config;
mod correlation;
mod crossover;
mod cycles;
mod errors;
mod gene_lists;
mod genes;
mod history;
mod integrity;
mod mutation;
mod nodes;
mod ring_buffer;

pub use config::{
    ConnectionSelection, GeneticConfig, WeightMutationInfo, WeightPerturbation,
    DEFAULT_HISTORY_CAPACITY,
};
pub use correlation::{
    correlate, CorrelationItem, CorrelationKind, CorrelationResult, CorrelationStatistics, Parent,
};
pub use crossover::{build_offspring, CrossoverPolicy, FitnessTiebreak};
pub use errors::{ConfigError, GenomeError, IntegrityError};
pub use gene_lists::{ConnectionGeneList, Gene, GeneList, NeuronGeneList, SearchResult};
pub use genes::ConnectionGene;
pub use history::{AddedNeuronIds, History};
pub use integrity::{check_integrity, verify};
pub use mutation::{MutationKind, MutationOutcome};
pub use nodes::{NeuronGene, NodeType};

use crate::{GenomeId, Innovation};
use cycles::ConnectivityGraph;

use ahash::RandomState;
use rand::prelude::{Rng, SliceRandom};
use serde::{Deserialize, Serialize};
use tracing::trace;

use std::collections::HashSet;
use std::fmt;

/// A sorted collection of neuron and connection genes.
///
/// Neurons are laid out as the bias (id 0), the inputs, the
/// outputs, and then any hidden neurons, with ids strictly
/// increasing throughout. Connections are sorted by innovation
/// number. Each neuron caches the ids of its direct neighbours;
/// the connection genes are authoritative and the cache is kept
/// in step with them by every operation.
///
/// Supports Serde for convenient genome saving and loading.
/// Deserialized genomes are checked with [`verify`], so
/// a corrupt save is rejected instead of silently repaired.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(try_from = "GenomeRecord", into = "GenomeRecord")]
pub struct Genome {
    id: GenomeId,
    birth_generation: u32,
    neurons: NeuronGeneList,
    connections: ConnectionGeneList,
    input_count: usize,
    output_count: usize,
}

impl Genome {
    /// Assembles a genome from its parts.
    ///
    /// If `rebuild_adjacency` is `false`, the neurons' cached
    /// connectivity is trusted as given; otherwise it is
    /// recomputed from the connections. Nothing is validated:
    /// use [`verify`] on genomes built from untrusted parts.
    ///
    /// # Examples
    /// ```
    /// use neat_genome::genomics::{check_integrity, ConnectionGene, Genome, NeuronGene, NodeType};
    ///
    /// let neurons = vec![
    ///     NeuronGene::new(0, NodeType::Bias, 0),
    ///     NeuronGene::new(1, NodeType::Input, 0),
    ///     NeuronGene::new(2, NodeType::Output, 0),
    /// ];
    /// let connections = vec![ConnectionGene::new(4, 1, 2, 0.5)];
    ///
    /// let genome = Genome::from_genes(0, 0, neurons.into(), connections.into(), 1, 1, true);
    ///
    /// assert!(check_integrity(&genome, true));
    /// assert!(genome.neuron(2).unwrap().has_source(1));
    /// ```
    pub fn from_genes(
        id: GenomeId,
        birth_generation: u32,
        neurons: NeuronGeneList,
        connections: ConnectionGeneList,
        input_count: usize,
        output_count: usize,
        rebuild_adjacency: bool,
    ) -> Genome {
        let mut genome = Genome {
            id,
            birth_generation,
            neurons,
            connections,
            input_count,
            output_count,
        };
        if rebuild_adjacency {
            genome.rebuild_adjacency();
        }
        genome
    }

    /// Create a new initial genome with the specified configuration.
    ///
    /// The genome has the bias, input and output neurons, and a
    /// random subset of all possible bias/input → output
    /// connections, of size
    /// [`initial_interconnections_proportion`] ⨯ `(input_count + 1) ⨯ output_count`
    /// (rounded probabilistically, and never less than 1). Innovation
    /// numbers are the ones pre-allocated by [`History::new`].
    ///
    /// [`initial_interconnections_proportion`]: GeneticConfig::initial_interconnections_proportion
    ///
    /// # Examples
    /// ```
    /// use neat_genome::genomics::{check_integrity, GeneticConfig, Genome, History, NodeType};
    /// use rand::{rngs::StdRng, SeedableRng};
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(3).unwrap(),
    ///     output_count: NonZeroUsize::new(2).unwrap(),
    ///     initial_interconnections_proportion: 1.0,
    ///     ..GeneticConfig::default()
    /// };
    /// let mut history = History::new(&config);
    /// let mut rng = StdRng::seed_from_u64(42);
    ///
    /// let genome = Genome::new(&mut history, &config, &mut rng);
    ///
    /// // Bias + 3 inputs + 2 outputs.
    /// assert_eq!(genome.neurons().len(), 1 + 3 + 2);
    /// assert_eq!(genome.neurons().iter().filter(|n| n.node_type() == NodeType::Input).count(), 3);
    ///
    /// // With a proportion of 1, every bias/input is connected to every output.
    /// assert_eq!(genome.connections().len(), 4 * 2);
    /// assert!(genome.connections().iter().all(|c| c.weight().abs() <= config.weight_bound));
    /// assert!(check_integrity(&genome, true));
    /// ```
    pub fn new(history: &mut History, config: &GeneticConfig, rng: &mut impl Rng) -> Genome {
        let input_count = config.input_count.get();
        let output_count = config.output_count.get();

        let mut neurons = NeuronGeneList::with_capacity(1 + input_count + output_count);
        neurons.push(NeuronGene::new(0, NodeType::Bias, config.activation_fn_id));
        for i in 0..input_count {
            neurons.push(NeuronGene::new(
                (1 + i) as Innovation,
                NodeType::Input,
                config.activation_fn_id,
            ));
        }
        for o in 0..output_count {
            neurons.push(NeuronGene::new(
                History::output_neuron_id(input_count, o),
                NodeType::Output,
                config.activation_fn_id,
            ));
        }

        let mut candidates: Vec<(usize, usize)> = (0..=input_count)
            .flat_map(|s| (0..output_count).map(move |o| (s, o)))
            .collect();
        candidates.shuffle(rng);
        let count = Self::probabilistic_round(
            candidates.len() as f64 * config.initial_interconnections_proportion,
            rng,
        )
        .clamp(1, candidates.len());

        let mut connections: ConnectionGeneList = candidates[..count]
            .iter()
            .map(|&(s, o)| {
                ConnectionGene::new(
                    History::initial_connection_id(input_count, output_count, s, o),
                    s as Innovation,
                    History::output_neuron_id(input_count, o),
                    ConnectionGene::random_weight(config, rng),
                )
            })
            .collect();
        connections.sort_by_innovation();

        let genome = Genome::from_genes(
            history.next_genome_id(),
            0,
            neurons,
            connections,
            input_count,
            output_count,
            true,
        );
        trace!(genome = genome.id, connections = count, "initial genome created");
        genome.debug_verify(config.feedforward_only);
        genome
    }

    /// Creates `size` initial genomes sharing `history`.
    pub fn new_population(
        size: usize,
        history: &mut History,
        config: &GeneticConfig,
        rng: &mut impl Rng,
    ) -> Vec<Genome> {
        (0..size).map(|_| Genome::new(history, config, rng)).collect()
    }

    /// Rounds down or up, with a chance of rounding up
    /// equal to the fractional part.
    fn probabilistic_round(value: f64, rng: &mut impl Rng) -> usize {
        let floor = value.floor();
        if rng.gen::<f64>() < value - floor {
            floor as usize + 1
        } else {
            floor as usize
        }
    }

    /// Recomputes every neuron's cached connectivity from
    /// the connection genes. Endpoints missing from the
    /// neuron list are ignored.
    pub fn rebuild_adjacency(&mut self) {
        for neuron in self.neurons.iter_mut() {
            neuron.clear_connectivity();
        }
        let endpoints: Vec<(Innovation, Innovation)> =
            self.connections.iter().map(ConnectionGene::endpoints).collect();
        for (source, target) in endpoints {
            self.link(source, target);
        }
    }

    /// Records a connection from `source` to `target`
    /// in the caches of both endpoints.
    fn link(&mut self, source: Innovation, target: Innovation) {
        if let Some(neuron) = self.neurons.get_mut(source) {
            neuron.add_target(target);
        }
        if let Some(neuron) = self.neurons.get_mut(target) {
            neuron.add_source(source);
        }
    }

    /// Forgets a connection from `source` to `target`
    /// in the caches of both endpoints.
    fn unlink(&mut self, source: Innovation, target: Innovation) {
        if let Some(neuron) = self.neurons.get_mut(source) {
            neuron.remove_target(target);
        }
        if let Some(neuron) = self.neurons.get_mut(target) {
            neuron.remove_source(source);
        }
    }

    /// Checks that the genome has the input and output counts
    /// expected by `config`, and that it satisfies every invariant,
    /// including acyclicity if `config` requires it.
    ///
    /// # Errors
    /// Returns the first mismatch or violated invariant found.
    ///
    /// # Examples
    /// ```
    /// use neat_genome::genomics::{GeneticConfig, Genome, GenomeError, History};
    /// use rand::{rngs::StdRng, SeedableRng};
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig::default();
    /// let mut history = History::new(&config);
    /// let genome = Genome::new(&mut history, &config, &mut StdRng::seed_from_u64(0));
    ///
    /// assert!(genome.conforms_to(&config).is_ok());
    ///
    /// let wider = GeneticConfig {
    ///     input_count: NonZeroUsize::new(4).unwrap(),
    ///     ..GeneticConfig::default()
    /// };
    /// assert_eq!(
    ///     genome.conforms_to(&wider),
    ///     Err(GenomeError::InputCountMismatch { expected: 4, found: 1 })
    /// );
    /// ```
    pub fn conforms_to(&self, config: &GeneticConfig) -> Result<(), GenomeError> {
        if self.input_count != config.input_count.get() {
            return Err(GenomeError::InputCountMismatch {
                expected: config.input_count.get(),
                found: self.input_count,
            });
        }
        if self.output_count != config.output_count.get() {
            return Err(GenomeError::OutputCountMismatch {
                expected: config.output_count.get(),
                found: self.output_count,
            });
        }
        verify(self, config.feedforward_only)?;
        Ok(())
    }

    /// Panics if the genome breaks an invariant. Does nothing
    /// in release builds.
    fn debug_verify(&self, feedforward_only: bool) {
        if cfg!(debug_assertions) {
            verify(self, feedforward_only).unwrap_or_else(|e| panic!("{} in {}", e, self));
        }
    }

    /// Returns the genome's id.
    pub fn id(&self) -> GenomeId {
        self.id
    }

    /// Returns the generation the genome was created in.
    pub fn birth_generation(&self) -> u32 {
        self.birth_generation
    }

    /// Returns the genome's neuron genes, in id order.
    pub fn neurons(&self) -> &NeuronGeneList {
        &self.neurons
    }

    /// Returns the genome's connection genes, in innovation order.
    pub fn connections(&self) -> &ConnectionGeneList {
        &self.connections
    }

    /// Returns the neuron with the passed id.
    pub fn neuron(&self, id: Innovation) -> Option<&NeuronGene> {
        self.neurons.get(id)
    }

    /// Returns the connection with the passed innovation number.
    pub fn connection(&self, id: Innovation) -> Option<&ConnectionGene> {
        self.connections.get(id)
    }

    /// Whether there is a connection from `source` to `target`.
    pub fn has_connection(&self, source: Innovation, target: Innovation) -> bool {
        self.neurons
            .get(source)
            .map_or(false, |neuron| neuron.has_target(target))
    }

    /// Whether a neuron or connection of the genome uses `id`.
    fn uses_id(&self, id: Innovation) -> bool {
        self.neurons.contains(id) || self.connections.contains(id)
    }

    /// Number of input neurons, the bias not included.
    pub fn input_count(&self) -> usize {
        self.input_count
    }

    /// Number of output neurons.
    pub fn output_count(&self) -> usize {
        self.output_count
    }

    /// Number of bias, input and output neurons.
    pub fn fixed_neuron_count(&self) -> usize {
        1 + self.input_count + self.output_count
    }

    /// Number of hidden neurons.
    pub fn hidden_count(&self) -> usize {
        self.neurons.len().saturating_sub(self.fixed_neuron_count())
    }
}

impl ConnectivityGraph for Genome {
    fn sources_of(&self, neuron: Innovation) -> Option<&HashSet<Innovation, RandomState>> {
        self.neurons.get(neuron).map(NeuronGene::source_set)
    }
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let neurons: Vec<String> = self.neurons.iter().map(ToString::to_string).collect();
        let connections: Vec<String> = self.connections.iter().map(ToString::to_string).collect();
        f.debug_struct("Genome")
            .field("id", &self.id)
            .field("birth_generation", &self.birth_generation)
            .field("neurons", &neurons)
            .field("connections", &connections)
            .finish()
    }
}

/// Persisted form of a [`Genome`], without cached connectivity.
#[derive(Serialize, Deserialize)]
struct GenomeRecord {
    id: GenomeId,
    birth_generation: u32,
    input_count: usize,
    output_count: usize,
    neurons: NeuronGeneList,
    connections: ConnectionGeneList,
}

impl From<Genome> for GenomeRecord {
    fn from(genome: Genome) -> GenomeRecord {
        GenomeRecord {
            id: genome.id,
            birth_generation: genome.birth_generation,
            input_count: genome.input_count,
            output_count: genome.output_count,
            neurons: genome.neurons,
            connections: genome.connections,
        }
    }
}

impl TryFrom<GenomeRecord> for Genome {
    type Error = GenomeError;

    fn try_from(record: GenomeRecord) -> Result<Genome, GenomeError> {
        let genome = Genome::from_genes(
            record.id,
            record.birth_generation,
            record.neurons,
            record.connections,
            record.input_count,
            record.output_count,
            true,
        );
        verify(&genome, false)?;
        Ok(genome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use std::num::NonZeroUsize;

    fn config(input_count: usize, output_count: usize) -> GeneticConfig {
        GeneticConfig {
            input_count: NonZeroUsize::new(input_count).unwrap(),
            output_count: NonZeroUsize::new(output_count).unwrap(),
            ..GeneticConfig::default()
        }
    }

    #[test]
    fn new_fully_connected() {
        let mut rng = StdRng::seed_from_u64(3);
        for input_count in 1..8 {
            for output_count in 1..8 {
                let config = GeneticConfig {
                    initial_interconnections_proportion: 1.0,
                    ..config(input_count, output_count)
                };
                let mut history = History::new(&config);
                let genome = Genome::new(&mut history, &config, &mut rng);

                assert_eq!(genome.connections.len(), (input_count + 1) * output_count);
                assert_eq!(genome.hidden_count(), 0);
                assert_eq!(genome.neurons[0].node_type(), NodeType::Bias);
                assert_eq!(genome.neurons[0].innovation(), 0);

                for connection in genome.connections.iter() {
                    let source_index = connection.source() as usize;
                    let output_index = connection.target() as usize - 1 - input_count;
                    assert_eq!(
                        connection.innovation(),
                        History::initial_connection_id(
                            input_count,
                            output_count,
                            source_index,
                            output_index
                        )
                    );
                    assert_eq!(
                        history.try_reuse_connection_id(connection.source(), connection.target()),
                        Some(connection.innovation())
                    );
                    assert!(genome
                        .neuron(connection.source())
                        .unwrap()
                        .has_target(connection.target()));
                }
                assert!(check_integrity(&genome, true), "{}", genome);
            }
        }
    }

    #[test]
    fn new_sparse_has_at_least_one_connection() {
        let config = GeneticConfig {
            initial_interconnections_proportion: 0.0,
            ..config(2, 2)
        };
        let mut history = History::new(&config);
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..20 {
            let genome = Genome::new(&mut history, &config, &mut rng);
            assert_eq!(genome.connections.len(), 1);
        }
    }

    #[test]
    fn new_population_ids() {
        let config = config(2, 1);
        let mut history = History::new(&config);
        let population =
            Genome::new_population(10, &mut history, &config, &mut StdRng::seed_from_u64(5));

        let ids: Vec<GenomeId> = population.iter().map(Genome::id).collect();
        assert_eq!(ids, (0..10).collect::<Vec<_>>());
        assert!(population.iter().all(|g| g.birth_generation() == 0));
    }

    #[test]
    fn probabilistic_round() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let rounded = Genome::probabilistic_round(2.25, &mut rng);
            assert!(rounded == 2 || rounded == 3);
        }
        assert_eq!(Genome::probabilistic_round(4.0, &mut rng), 4);
    }

    #[test]
    fn rebuild_adjacency() {
        let config = GeneticConfig {
            initial_interconnections_proportion: 1.0,
            ..config(2, 2)
        };
        let mut history = History::new(&config);
        let genome = Genome::new(&mut history, &config, &mut StdRng::seed_from_u64(9));

        let mut stale = genome.clone();
        for neuron in stale.neurons.iter_mut() {
            neuron.clear_connectivity();
        }
        assert!(!check_integrity(&stale, true));

        stale.rebuild_adjacency();
        assert_eq!(stale, genome);
    }

    #[test]
    fn serde() {
        let config = GeneticConfig {
            initial_interconnections_proportion: 0.5,
            ..config(3, 2)
        };
        let mut history = History::new(&config);
        let genome = Genome::new(&mut history, &config, &mut StdRng::seed_from_u64(21));

        let serialized = serde_json::to_string(&genome).unwrap();
        let deserialized: Genome = serde_json::from_str(&serialized).unwrap();

        assert_eq!(genome, deserialized);
        assert!(deserialized.conforms_to(&config).is_ok());
    }

    #[test]
    fn serde_rejects_malformed() {
        // Output (id 2) listed before the input (id 1).
        let unordered = r#"{
            "id": 0, "birth_generation": 0, "input_count": 1, "output_count": 1,
            "neurons": [
                {"id": 0, "node_type": "Bias", "activation_fn_id": 0},
                {"id": 2, "node_type": "Output", "activation_fn_id": 0},
                {"id": 1, "node_type": "Input", "activation_fn_id": 0}
            ],
            "connections": [{"id": 3, "source": 0, "target": 2, "weight": 0.5}]
        }"#;
        assert!(serde_json::from_str::<Genome>(unordered).is_err());

        let no_connections = r#"{
            "id": 0, "birth_generation": 0, "input_count": 1, "output_count": 1,
            "neurons": [
                {"id": 0, "node_type": "Bias", "activation_fn_id": 0},
                {"id": 1, "node_type": "Input", "activation_fn_id": 0},
                {"id": 2, "node_type": "Output", "activation_fn_id": 0}
            ],
            "connections": []
        }"#;
        assert!(serde_json::from_str::<Genome>(no_connections).is_err());

        let wrong_count = r#"{
            "id": 0, "birth_generation": 0, "input_count": 2, "output_count": 1,
            "neurons": [
                {"id": 0, "node_type": "Bias", "activation_fn_id": 0},
                {"id": 1, "node_type": "Input", "activation_fn_id": 0},
                {"id": 2, "node_type": "Output", "activation_fn_id": 0}
            ],
            "connections": [{"id": 3, "source": 0, "target": 2, "weight": 0.5}]
        }"#;
        assert!(serde_json::from_str::<Genome>(wrong_count).is_err());
    }
}
