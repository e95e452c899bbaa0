use super::cycles;
use super::{
    AddedNeuronIds, ConnectionGene, ConnectionSelection, GeneticConfig, Genome, History,
    NeuronGene, NodeType, WeightPerturbation,
};
use crate::Innovation;

use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// The mutation operators a genome can undergo.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MutationKind {
    /// Perturbation of connection weights.
    Weights,
    /// Split of a connection by a new hidden neuron.
    AddNeuron,
    /// Addition of a connection between two neurons.
    AddConnection,
    /// Removal of a connection.
    DeleteConnection,
    /// Removal of a simple hidden neuron, bridging its neighbours.
    DeleteNeuron,
}

impl MutationKind {
    /// Every mutation kind, in roulette order.
    pub const ALL: [MutationKind; 5] = [
        MutationKind::Weights,
        MutationKind::AddNeuron,
        MutationKind::AddConnection,
        MutationKind::DeleteConnection,
        MutationKind::DeleteNeuron,
    ];

    /// The relative chance given to the kind by `config`.
    pub fn chance(self, config: &GeneticConfig) -> f64 {
        match self {
            MutationKind::Weights => config.weight_mutation_chance,
            MutationKind::AddNeuron => config.add_neuron_mutation_chance,
            MutationKind::AddConnection => config.add_connection_mutation_chance,
            MutationKind::DeleteConnection => config.delete_connection_mutation_chance,
            MutationKind::DeleteNeuron => config.delete_neuron_mutation_chance,
        }
    }

    /// Whether the kind removes structure.
    pub fn is_destructive(self) -> bool {
        matches!(
            self,
            MutationKind::DeleteConnection | MutationKind::DeleteNeuron
        )
    }
}

/// What a mutation did to a genome.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationOutcome {
    /// This many connection weights were changed.
    WeightsMutated(usize),
    /// A connection was added.
    ConnectionAdded {
        innovation: Innovation,
        /// Whether the innovation number came from the history.
        reused: bool,
    },
    /// A connection was split by a new hidden neuron.
    NeuronAdded {
        ids: AddedNeuronIds,
        /// Whether the innovation numbers came from the history.
        reused: bool,
    },
    /// The connection with this innovation number was removed.
    ConnectionDeleted(Innovation),
    /// A hidden neuron was removed, and its neighbours joined
    /// by `bridges` new connections.
    NeuronDeleted { neuron: Innovation, bridges: usize },
    /// No legal mutation was found; the genome is unchanged.
    NoMutation,
}

impl MutationOutcome {
    /// Whether the genome was changed.
    pub fn is_mutation(&self) -> bool {
        *self != MutationOutcome::NoMutation
    }

    /// The kind of mutation applied, if any.
    pub fn kind(&self) -> Option<MutationKind> {
        match self {
            MutationOutcome::WeightsMutated(_) => Some(MutationKind::Weights),
            MutationOutcome::ConnectionAdded { .. } => Some(MutationKind::AddConnection),
            MutationOutcome::NeuronAdded { .. } => Some(MutationKind::AddNeuron),
            MutationOutcome::ConnectionDeleted(_) => Some(MutationKind::DeleteConnection),
            MutationOutcome::NeuronDeleted { .. } => Some(MutationKind::DeleteNeuron),
            MutationOutcome::NoMutation => None,
        }
    }
}

/// A hidden neuron removal, worked out before touching the genome.
struct NeuronDeletion {
    neuron: Innovation,
    incident: Vec<ConnectionGene>,
    bridges: Vec<(Innovation, Innovation, f64)>,
}

impl Genome {
    /// Picks a mutation kind by roulette over the chances in
    /// `config` and applies it.
    ///
    /// Genomes with fewer than two connections never undergo
    /// destructive mutations. If the picked structural mutation
    /// finds nothing legal to do, the weights are mutated instead.
    ///
    /// # Examples
    /// ```
    /// use neat_genome::genomics::{check_integrity, GeneticConfig, Genome, History};
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let config = GeneticConfig {
    ///     add_neuron_mutation_chance: 0.5,
    ///     add_connection_mutation_chance: 0.5,
    ///     ..GeneticConfig::default()
    /// };
    /// let mut history = History::new(&config);
    /// let mut rng = StdRng::seed_from_u64(3);
    /// let mut genome = Genome::new(&mut history, &config, &mut rng);
    ///
    /// for _ in 0..100 {
    ///     assert!(genome.mutate(&mut history, &config, &mut rng).is_mutation());
    /// }
    /// assert!(check_integrity(&genome, config.feedforward_only));
    /// ```
    pub fn mutate(
        &mut self,
        history: &mut History,
        config: &GeneticConfig,
        rng: &mut impl Rng,
    ) -> MutationOutcome {
        let destructive_allowed = self.connections.len() >= 2;
        let chances = MutationKind::ALL.map(|kind| {
            if kind.is_destructive() && !destructive_allowed {
                0.0
            } else {
                kind.chance(config)
            }
        });
        let kind = match WeightedIndex::new(chances) {
            Ok(distribution) => MutationKind::ALL[distribution.sample(rng)],
            Err(_) => {
                trace!(genome = self.id, "no mutation kind available");
                return MutationOutcome::NoMutation;
            }
        };

        let outcome = self.apply_mutation(kind, history, config, rng);
        if !outcome.is_mutation() && kind != MutationKind::Weights {
            trace!(genome = self.id, ?kind, "falling back to weight mutation");
            return self.mutate_weights(config, rng);
        }
        outcome
    }

    /// Applies a mutation of the given kind.
    pub fn apply_mutation(
        &mut self,
        kind: MutationKind,
        history: &mut History,
        config: &GeneticConfig,
        rng: &mut impl Rng,
    ) -> MutationOutcome {
        match kind {
            MutationKind::Weights => self.mutate_weights(config, rng),
            MutationKind::AddNeuron => self.mutate_add_neuron(history, config, rng),
            MutationKind::AddConnection => self.mutate_add_connection(history, config, rng),
            MutationKind::DeleteConnection => self.mutate_delete_connection(config, rng),
            MutationKind::DeleteNeuron => self.mutate_delete_neuron(history, config, rng),
        }
    }

    /// Creates an asexual offspring: a copy of the genome with a
    /// new id and the given birth generation, mutated once.
    ///
    /// # Examples
    /// ```
    /// use neat_genome::genomics::{GeneticConfig, Genome, History};
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let config = GeneticConfig::default();
    /// let mut history = History::new(&config);
    /// let mut rng = StdRng::seed_from_u64(0);
    /// let parent = Genome::new(&mut history, &config, &mut rng);
    ///
    /// let child = parent.create_offspring(1, &mut history, &config, &mut rng);
    ///
    /// assert_ne!(child.id(), parent.id());
    /// assert_eq!(child.birth_generation(), 1);
    /// ```
    pub fn create_offspring(
        &self,
        birth_generation: u32,
        history: &mut History,
        config: &GeneticConfig,
        rng: &mut impl Rng,
    ) -> Genome {
        let mut offspring = Genome {
            id: history.next_genome_id(),
            birth_generation,
            ..self.clone()
        };
        let outcome = offspring.mutate(history, config, rng);
        debug!(
            genome = offspring.id,
            parent = self.id,
            ?outcome,
            "asexual offspring created"
        );
        offspring
    }

    /// Perturbs connection weights, following one entry of
    /// the configured weight mutation scheme picked at random
    /// by [`activation_chance`].
    ///
    /// Resulting weights are clamped to ±[`weight_bound`]. Returns
    /// [`MutationOutcome::NoMutation`] if no connection was selected.
    ///
    /// [`activation_chance`]: crate::genomics::WeightMutationInfo::activation_chance
    /// [`weight_bound`]: GeneticConfig::weight_bound
    ///
    /// # Examples
    /// ```
    /// use neat_genome::genomics::{
    ///     ConnectionSelection, GeneticConfig, Genome, History, MutationOutcome,
    ///     WeightMutationInfo, WeightPerturbation,
    /// };
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let config = GeneticConfig {
    ///     initial_interconnections_proportion: 1.0,
    ///     weight_mutation_scheme: vec![WeightMutationInfo::new(
    ///         1.0,
    ///         WeightPerturbation::JiggleUniform { magnitude: 0.1 },
    ///         ConnectionSelection::Quantity(1),
    ///     )],
    ///     ..GeneticConfig::default()
    /// };
    /// let mut history = History::new(&config);
    /// let mut rng = StdRng::seed_from_u64(5);
    /// let mut genome = Genome::new(&mut history, &config, &mut rng);
    ///
    /// assert_eq!(genome.mutate_weights(&config, &mut rng), MutationOutcome::WeightsMutated(1));
    /// ```
    pub fn mutate_weights(
        &mut self,
        config: &GeneticConfig,
        rng: &mut impl Rng,
    ) -> MutationOutcome {
        if self.connections.is_empty() {
            return MutationOutcome::NoMutation;
        }
        let scheme = &config.weight_mutation_scheme;
        let info = match WeightedIndex::new(scheme.iter().map(|info| info.activation_chance)) {
            Ok(distribution) => scheme[distribution.sample(rng)],
            Err(_) => {
                trace!(genome = self.id, "weight mutation scheme unusable");
                return MutationOutcome::NoMutation;
            }
        };

        let genes = self.connections.iter_mut().into_slice();
        match info.selection {
            ConnectionSelection::Proportion(chance) => {
                for gene in genes.iter_mut() {
                    if rng.gen::<f64>() < chance {
                        gene.set_mutated(true);
                    }
                }
                if !genes.iter().any(|gene| gene.is_mutated()) {
                    let index = rng.gen_range(0..genes.len());
                    genes[index].set_mutated(true);
                }
            }
            ConnectionSelection::Quantity(quantity) => {
                let len = genes.len();
                for _ in 0..quantity.min(len) {
                    let start = rng.gen_range(0..len);
                    if let Some(index) = (start..len)
                        .chain(0..start)
                        .find(|&index| !genes[index].is_mutated())
                    {
                        genes[index].set_mutated(true);
                    }
                }
            }
        }

        let gaussian = match info.perturbation {
            WeightPerturbation::JiggleGaussian { sigma } => Normal::new(0.0, sigma).ok(),
            _ => None,
        };
        let mut count = 0;
        for gene in genes.iter_mut().filter(|gene| gene.is_mutated()) {
            let weight = match info.perturbation {
                WeightPerturbation::Reset => ConnectionGene::random_weight(config, rng),
                WeightPerturbation::JiggleUniform { magnitude } if magnitude > 0.0 => {
                    gene.weight() + rng.gen_range(-magnitude..=magnitude)
                }
                WeightPerturbation::JiggleUniform { .. } => gene.weight(),
                WeightPerturbation::JiggleGaussian { .. } => {
                    gene.weight() + gaussian.map_or(0.0, |normal| normal.sample(rng))
                }
            };
            gene.set_weight(weight, config.weight_bound);
            count += 1;
        }
        self.connections.reset_mutated_flags();

        if count == 0 {
            trace!(genome = self.id, "no weight selected");
            return MutationOutcome::NoMutation;
        }
        trace!(genome = self.id, count, perturbation = ?info.perturbation, "weights mutated");
        MutationOutcome::WeightsMutated(count)
    }

    /// Adds a connection between two previously unconnected neurons.
    ///
    /// Up to [`max_add_connection_attempts`] random pairs are
    /// tried. Connections never target the bias or an input,
    /// and never join a neuron to itself; in feed-forward mode
    /// they also never leave an output nor close a cycle.
    ///
    /// The innovation number is the one the history remembers for
    /// the pair, if any and not already used by the genome.
    /// Returns [`MutationOutcome::NoMutation`] if no legal pair was found.
    ///
    /// [`max_add_connection_attempts`]: GeneticConfig::max_add_connection_attempts
    ///
    /// # Examples
    /// ```
    /// use neat_genome::genomics::{GeneticConfig, Genome, History, MutationOutcome};
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let config = GeneticConfig {
    ///     initial_interconnections_proportion: 1.0,
    ///     max_add_connection_attempts: 20,
    ///     feedforward_only: true,
    ///     ..GeneticConfig::default()
    /// };
    /// let mut history = History::new(&config);
    /// let mut rng = StdRng::seed_from_u64(0);
    /// let mut genome = Genome::new(&mut history, &config, &mut rng);
    ///
    /// // Bias and input are both connected to the output already.
    /// assert_eq!(
    ///     genome.mutate_add_connection(&mut history, &config, &mut rng),
    ///     MutationOutcome::NoMutation
    /// );
    /// ```
    pub fn mutate_add_connection(
        &mut self,
        history: &mut History,
        config: &GeneticConfig,
        rng: &mut impl Rng,
    ) -> MutationOutcome {
        let sources: Vec<Innovation> = self
            .neurons
            .iter()
            .filter(|neuron| !config.feedforward_only || neuron.node_type() != NodeType::Output)
            .map(NeuronGene::innovation)
            .collect();
        let targets: Vec<Innovation> = self
            .neurons
            .iter()
            .filter(|neuron| neuron.node_type().accepts_connections())
            .map(NeuronGene::innovation)
            .collect();

        for _ in 0..config.max_add_connection_attempts {
            let (source, target) = match (sources.choose(rng), targets.choose(rng)) {
                (Some(&source), Some(&target)) => (source, target),
                _ => break,
            };
            if source == target || self.has_connection(source, target) {
                continue;
            }
            if config.feedforward_only && cycles::would_create_cycle(&*self, source, target) {
                continue;
            }

            let weight = ConnectionGene::random_weight(config, rng);
            let (innovation, reused) =
                self.add_connection_with_history(source, target, weight, history);
            debug!(genome = self.id, innovation, source, target, reused, "connection added");
            self.debug_verify(config.feedforward_only);
            return MutationOutcome::ConnectionAdded { innovation, reused };
        }

        trace!(genome = self.id, "no connection could be added");
        MutationOutcome::NoMutation
    }

    /// Splits a random connection with a new hidden neuron.
    ///
    /// The split connection is replaced by one from its source to
    /// the new neuron, of weight 1 (or the weight bound, if lower),
    /// and one from the new neuron to its target, keeping its weight.
    /// If the same connection was split before, the remembered
    /// innovation numbers are reused.
    ///
    /// # Examples
    /// ```
    /// use neat_genome::genomics::{GeneticConfig, Genome, History, MutationOutcome, NodeType};
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let config = GeneticConfig::default();
    /// let mut history = History::new(&config);
    /// let mut rng = StdRng::seed_from_u64(0);
    /// let mut genome = Genome::new(&mut history, &config, &mut rng);
    /// let connection_count = genome.connections().len();
    ///
    /// let outcome = genome.mutate_add_neuron(&mut history, &config, &mut rng);
    ///
    /// assert!(matches!(outcome, MutationOutcome::NeuronAdded { reused: false, .. }));
    /// assert_eq!(genome.hidden_count(), 1);
    /// assert_eq!(genome.connections().len(), connection_count + 1);
    /// ```
    pub fn mutate_add_neuron(
        &mut self,
        history: &mut History,
        config: &GeneticConfig,
        rng: &mut impl Rng,
    ) -> MutationOutcome {
        let connection = match self.connections.choose(rng) {
            Some(connection) => connection.innovation(),
            None => {
                trace!(genome = self.id, "no connection to split");
                return MutationOutcome::NoMutation;
            }
        };
        self.split_connection(connection, history, config)
    }

    fn split_connection(
        &mut self,
        connection: Innovation,
        history: &mut History,
        config: &GeneticConfig,
    ) -> MutationOutcome {
        let remembered = history.try_reuse_split_ids(connection);
        let (ids, reused) = match remembered {
            Some(ids)
                if !self.uses_id(ids.neuron)
                    && !self.uses_id(ids.input_connection)
                    && !self.uses_id(ids.output_connection) =>
            {
                (ids, true)
            }
            _ => {
                let ids = history.mint_split_ids();
                if remembered.is_none() {
                    history.record_split_ids(connection, ids);
                }
                (ids, false)
            }
        };

        let split = self.connections.remove(connection);
        let (source, target) = split.endpoints();
        self.unlink(source, target);
        history.record_connection_id(source, ids.neuron, ids.input_connection);
        history.record_connection_id(ids.neuron, target, ids.output_connection);

        self.neurons.insert_sorted(NeuronGene::new(
            ids.neuron,
            NodeType::Hidden,
            config.activation_fn_id,
        ));
        let mut input = ConnectionGene::new(ids.input_connection, source, ids.neuron, 0.0);
        input.set_weight(1.0, config.weight_bound);
        self.connections.insert_sorted(input);
        self.connections.insert_sorted(ConnectionGene::new(
            ids.output_connection,
            ids.neuron,
            target,
            split.weight(),
        ));
        self.link(source, ids.neuron);
        self.link(ids.neuron, target);

        debug!(
            genome = self.id,
            connection,
            neuron = ids.neuron,
            reused,
            "neuron added"
        );
        self.debug_verify(config.feedforward_only);
        MutationOutcome::NeuronAdded { ids, reused }
    }

    /// Removes a random connection.
    ///
    /// Refused for genomes with fewer than two connections.
    /// A hidden endpoint left without any connection is removed
    /// as well; the bias, inputs and outputs always stay.
    ///
    /// # Examples
    /// ```
    /// use neat_genome::genomics::{GeneticConfig, Genome, History, MutationOutcome};
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let config = GeneticConfig {
    ///     initial_interconnections_proportion: 1.0,
    ///     ..GeneticConfig::default()
    /// };
    /// let mut history = History::new(&config);
    /// let mut rng = StdRng::seed_from_u64(0);
    /// let mut genome = Genome::new(&mut history, &config, &mut rng);
    ///
    /// assert!(genome.mutate_delete_connection(&config, &mut rng).is_mutation());
    /// assert_eq!(genome.connections().len(), 1);
    ///
    /// // The last connection is never removed.
    /// assert_eq!(
    ///     genome.mutate_delete_connection(&config, &mut rng),
    ///     MutationOutcome::NoMutation
    /// );
    /// ```
    pub fn mutate_delete_connection(
        &mut self,
        config: &GeneticConfig,
        rng: &mut impl Rng,
    ) -> MutationOutcome {
        if self.connections.len() < 2 {
            trace!(genome = self.id, "too few connections to delete one");
            return MutationOutcome::NoMutation;
        }

        let index = rng.gen_range(0..self.connections.len());
        let removed = self.connections.remove_at(index);
        let (source, target) = removed.endpoints();
        self.unlink(source, target);
        self.remove_neuron_if_orphaned(source);
        self.remove_neuron_if_orphaned(target);

        debug!(
            genome = self.id,
            innovation = removed.innovation(),
            "connection deleted"
        );
        self.debug_verify(config.feedforward_only);
        MutationOutcome::ConnectionDeleted(removed.innovation())
    }

    /// Removes a random simple hidden neuron: one with at most one
    /// incoming or at most one outgoing connection, self-connections
    /// aside. Every neuron it was fed by is then connected to every
    /// neuron it fed, with the weight of the connection to the
    /// latter, unless already connected.
    ///
    /// Neurons whose removal would leave no connection are passed
    /// over. Returns [`MutationOutcome::NoMutation`] if there is
    /// no such neuron.
    pub fn mutate_delete_neuron(
        &mut self,
        history: &mut History,
        config: &GeneticConfig,
        rng: &mut impl Rng,
    ) -> MutationOutcome {
        let mut candidates: Vec<Innovation> = self
            .neurons
            .iter()
            .filter(|neuron| neuron.node_type() == NodeType::Hidden)
            .filter(|neuron| {
                let id = neuron.innovation();
                neuron.source_neurons().filter(|&&source| source != id).count() <= 1
                    || neuron.target_neurons().filter(|&&target| target != id).count() <= 1
            })
            .map(NeuronGene::innovation)
            .collect();
        candidates.shuffle(rng);

        let deletion = candidates
            .into_iter()
            .map(|neuron| self.plan_neuron_deletion(neuron))
            .find(|deletion| {
                self.connections.len() - deletion.incident.len() + deletion.bridges.len() > 0
            });
        match deletion {
            Some(deletion) => self.delete_neuron(deletion, history, config),
            None => {
                trace!(genome = self.id, "no neuron can be deleted");
                MutationOutcome::NoMutation
            }
        }
    }

    fn plan_neuron_deletion(&self, neuron: Innovation) -> NeuronDeletion {
        let incident: Vec<ConnectionGene> = self
            .connections
            .iter()
            .filter(|connection| connection.source() == neuron || connection.target() == neuron)
            .cloned()
            .collect();

        let mut bridges = Vec::new();
        for incoming in incident
            .iter()
            .filter(|connection| connection.target() == neuron && connection.source() != neuron)
        {
            for outgoing in incident
                .iter()
                .filter(|connection| connection.source() == neuron && connection.target() != neuron)
            {
                let (source, target) = (incoming.source(), outgoing.target());
                if source != target && !self.has_connection(source, target) {
                    bridges.push((source, target, outgoing.weight()));
                }
            }
        }

        NeuronDeletion {
            neuron,
            incident,
            bridges,
        }
    }

    fn delete_neuron(
        &mut self,
        deletion: NeuronDeletion,
        history: &mut History,
        config: &GeneticConfig,
    ) -> MutationOutcome {
        let NeuronDeletion {
            neuron,
            incident,
            bridges,
        } = deletion;

        for connection in &incident {
            self.connections.remove(connection.innovation());
            self.unlink(connection.source(), connection.target());
        }
        self.neurons.remove(neuron);

        for &(source, target, weight) in &bridges {
            let (innovation, reused) =
                self.add_connection_with_history(source, target, weight, history);
            trace!(genome = self.id, innovation, source, target, reused, "bridge added");
        }

        for connection in &incident {
            for endpoint in [connection.source(), connection.target()] {
                if endpoint != neuron {
                    self.remove_neuron_if_orphaned(endpoint);
                }
            }
        }

        debug!(
            genome = self.id,
            neuron,
            bridges = bridges.len(),
            "neuron deleted"
        );
        self.debug_verify(config.feedforward_only);
        MutationOutcome::NeuronDeleted {
            neuron,
            bridges: bridges.len(),
        }
    }

    /// Adds a connection, taking its innovation number from the
    /// history when possible. Returns the innovation number and
    /// whether it was reused.
    fn add_connection_with_history(
        &mut self,
        source: Innovation,
        target: Innovation,
        weight: f64,
        history: &mut History,
    ) -> (Innovation, bool) {
        let (innovation, reused) = match history.try_reuse_connection_id(source, target) {
            Some(innovation) if !self.uses_id(innovation) => (innovation, true),
            _ => {
                let innovation = history.next_id();
                history.record_connection_id(source, target, innovation);
                (innovation, false)
            }
        };
        self.connections
            .insert_sorted(ConnectionGene::new(innovation, source, target, weight));
        self.link(source, target);
        (innovation, reused)
    }

    /// Removes `neuron` if it is hidden and has no connections left.
    fn remove_neuron_if_orphaned(&mut self, neuron: Innovation) -> bool {
        let orphaned = self.neuron(neuron).map_or(false, |neuron| {
            neuron.node_type() == NodeType::Hidden && neuron.is_disconnected()
        });
        if orphaned {
            self.neurons.remove(neuron);
            trace!(genome = self.id, neuron, "orphaned neuron removed");
        }
        orphaned
    }
}
