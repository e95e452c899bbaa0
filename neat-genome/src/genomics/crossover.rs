use super::builder::ConnectionListBuilder;
use super::{
    correlate, ConnectionGene, CorrelationKind, CorrelationResult, GeneticConfig, Genome, History,
    Parent,
};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which parent of a crossover is the fitter one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitnessTiebreak {
    /// The first parent is fitter.
    First,
    /// The second parent is fitter.
    Second,
    /// The parents are equally fit; one is picked at random.
    Random,
}

/// Parameters of offspring construction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CrossoverPolicy {
    /// Designates the fitter parent.
    pub tiebreak: FitnessTiebreak,
    /// Chance of each disjoint or excess gene being inherited.
    pub recombine_probability: f64,
    /// Whether the offspring must be acyclic.
    pub feedforward_only: bool,
}

impl CrossoverPolicy {
    /// Takes the recombination chance and acyclicity
    /// requirement from `config`.
    pub fn from_config(config: &GeneticConfig, tiebreak: FitnessTiebreak) -> CrossoverPolicy {
        CrossoverPolicy {
            tiebreak,
            recombine_probability: config.disjoint_excess_recombine_chance,
            feedforward_only: config.feedforward_only,
        }
    }
}

/// Builds the offspring of the two correlated genomes.
///
/// Matching genes are inherited from the fitter parent, with their
/// weights. Disjoint and excess genes of either parent are inherited
/// with the policy's recombination chance, drawn once per gene. The
/// fitter parent's genes are added first and take precedence over
/// the other parent's genes with the same endpoints; the other
/// parent's genes are then added only where they do not clash and,
/// for feed-forward offspring, do not close a cycle. If nothing was
/// inherited at all, the fitter parent's disjoint and excess genes
/// are all added, so the offspring always has a connection.
///
/// `correlation` must be the result of correlating `first` and `second`.
///
/// # Examples
/// ```
/// use neat_genome::genomics::{
///     build_offspring, check_integrity, correlate, CrossoverPolicy, FitnessTiebreak,
///     GeneticConfig, Genome, History,
/// };
/// use rand::{rngs::StdRng, SeedableRng};
/// use std::num::NonZeroUsize;
///
/// let config = GeneticConfig {
///     input_count: NonZeroUsize::new(3).unwrap(),
///     output_count: NonZeroUsize::new(2).unwrap(),
///     initial_interconnections_proportion: 0.5,
///     ..GeneticConfig::default()
/// };
/// let mut history = History::new(&config);
/// let mut rng = StdRng::seed_from_u64(8);
/// let first = Genome::new(&mut history, &config, &mut rng);
/// let second = Genome::new(&mut history, &config, &mut rng);
///
/// let correlation = correlate(&first, &second);
/// let policy = CrossoverPolicy::from_config(&config, FitnessTiebreak::First);
/// let child = build_offspring(&correlation, &first, &second, policy, 1, &mut history, &mut rng);
///
/// assert_eq!(child.birth_generation(), 1);
/// assert!(check_integrity(&child, config.feedforward_only));
/// ```
pub fn build_offspring(
    correlation: &CorrelationResult<'_>,
    first: &Genome,
    second: &Genome,
    policy: CrossoverPolicy,
    birth_generation: u32,
    history: &mut History,
    rng: &mut impl Rng,
) -> Genome {
    let fitter = match policy.tiebreak {
        FitnessTiebreak::First => Parent::First,
        FitnessTiebreak::Second => Parent::Second,
        FitnessTiebreak::Random => {
            if rng.gen::<bool>() {
                Parent::First
            } else {
                Parent::Second
            }
        }
    };
    let parent_genome = |parent: Parent| match parent {
        Parent::First => first,
        Parent::Second => second,
    };
    let (fitter_genome, other_genome) = (parent_genome(fitter), parent_genome(fitter.other()));

    let mut builder = ConnectionListBuilder::new();
    builder.register_fixed_neurons(fitter_genome);

    let mut other_genes: Vec<&ConnectionGene> = Vec::new();
    let mut fitter_leftovers: Vec<&ConnectionGene> = Vec::new();

    for item in correlation.items() {
        match (item.kind(), item.unmatched_gene()) {
            (CorrelationKind::Match, _) => {
                if let Some(gene) = item.gene_of(fitter) {
                    builder.try_add(gene, fitter_genome, true);
                }
            }
            (_, Some((owner, gene))) => {
                let inherited = rng.gen::<f64>() < policy.recombine_probability;
                match (owner == fitter, inherited) {
                    (true, true) => {
                        builder.try_add(gene, fitter_genome, true);
                    }
                    (true, false) => fitter_leftovers.push(gene),
                    (false, true) => other_genes.push(gene),
                    (false, false) => {}
                }
            }
            (_, None) => {}
        }
    }

    let mut rejected = 0;
    for gene in other_genes {
        let (source, target) = gene.endpoints();
        if policy.feedforward_only && builder.is_connection_cyclic(source, target) {
            rejected += 1;
            continue;
        }
        if !builder.try_add(gene, other_genome, false) {
            rejected += 1;
        }
    }

    if builder.is_empty() {
        for gene in fitter_leftovers {
            builder.try_add(gene, fitter_genome, true);
        }
    }

    let offspring = builder.build(
        history.next_genome_id(),
        birth_generation,
        fitter_genome.input_count(),
        fitter_genome.output_count(),
    );
    debug!(
        genome = offspring.id(),
        first = first.id(),
        second = second.id(),
        connections = offspring.connections().len(),
        rejected,
        "offspring built"
    );
    offspring.debug_verify(policy.feedforward_only);
    offspring
}

impl Genome {
    /// Mates the genome with `other`, producing an offspring by
    /// [`build_offspring`]. The fitter of the two is designated
    /// by `tiebreak`, with [`FitnessTiebreak::First`] meaning `self`.
    ///
    /// # Examples
    /// ```
    /// use neat_genome::genomics::{check_integrity, FitnessTiebreak, GeneticConfig, Genome, History};
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let config = GeneticConfig {
    ///     feedforward_only: true,
    ///     ..GeneticConfig::default()
    /// };
    /// let mut history = History::new(&config);
    /// let mut rng = StdRng::seed_from_u64(1);
    /// let mother = Genome::new(&mut history, &config, &mut rng);
    /// let father = Genome::new(&mut history, &config, &mut rng);
    ///
    /// let child = mother.mate(&father, FitnessTiebreak::Random, 1, &mut history, &config, &mut rng);
    ///
    /// assert!(check_integrity(&child, true));
    /// ```
    pub fn mate(
        &self,
        other: &Genome,
        tiebreak: FitnessTiebreak,
        birth_generation: u32,
        history: &mut History,
        config: &GeneticConfig,
        rng: &mut impl Rng,
    ) -> Genome {
        let correlation = correlate(self, other);
        build_offspring(
            &correlation,
            self,
            other,
            CrossoverPolicy::from_config(config, tiebreak),
            birth_generation,
            history,
            rng,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::{check_integrity, NeuronGene, NodeType};
    use crate::Innovation;
    use rand::{rngs::StdRng, SeedableRng};

    /// Bias 0, inputs 1 and 2, outputs 3 and 4, hidden 20 and 21.
    fn genome(id: u64, connections: &[(Innovation, Innovation, Innovation, f64)]) -> Genome {
        let mut neurons = vec![
            NeuronGene::new(0, NodeType::Bias, 0),
            NeuronGene::new(1, NodeType::Input, 0),
            NeuronGene::new(2, NodeType::Input, 0),
            NeuronGene::new(3, NodeType::Output, 0),
            NeuronGene::new(4, NodeType::Output, 0),
        ];
        for hidden in [20, 21] {
            if connections
                .iter()
                .any(|&(_, source, target, _)| source == hidden || target == hidden)
            {
                neurons.push(NeuronGene::new(hidden, NodeType::Hidden, 0));
            }
        }
        let connections: Vec<ConnectionGene> = connections
            .iter()
            .map(|&(id, source, target, weight)| ConnectionGene::new(id, source, target, weight))
            .collect();
        Genome::from_genes(id, 0, neurons.into(), connections.into(), 2, 2, true)
    }

    fn policy(tiebreak: FitnessTiebreak, recombine_probability: f64) -> CrossoverPolicy {
        CrossoverPolicy {
            tiebreak,
            recombine_probability,
            feedforward_only: true,
        }
    }

    fn ids(genome: &Genome) -> Vec<Innovation> {
        genome.connections().iter().map(ConnectionGene::innovation).collect()
    }

    #[test]
    fn matches_come_from_fitter_parent() {
        let first = genome(0, &[(5, 0, 3, 0.5), (6, 1, 3, 1.0), (8, 2, 4, 1.5)]);
        let second = genome(1, &[(5, 0, 3, -0.5), (7, 1, 4, 2.0), (8, 2, 4, -1.5)]);
        let mut history = History::new(&GeneticConfig::zero());
        let mut rng = StdRng::seed_from_u64(0);
        let correlation = correlate(&first, &second);

        let child = build_offspring(
            &correlation,
            &first,
            &second,
            policy(FitnessTiebreak::Second, 0.0),
            3,
            &mut history,
            &mut rng,
        );

        assert_eq!(ids(&child), vec![5, 8]);
        assert_eq!(child.connection(5).unwrap().weight(), -0.5);
        assert_eq!(child.connection(8).unwrap().weight(), -1.5);
        assert_eq!(child.birth_generation(), 3);
        assert!(check_integrity(&child, true));
    }

    #[test]
    fn full_recombination_inherits_everything() {
        let first = genome(0, &[(5, 0, 3, 0.5), (6, 1, 3, 1.0), (8, 2, 4, 1.5)]);
        let second = genome(1, &[(5, 0, 3, -0.5), (7, 1, 4, 2.0), (8, 2, 4, -1.5), (9, 0, 4, 1.0)]);
        let mut history = History::new(&GeneticConfig::zero());
        let mut rng = StdRng::seed_from_u64(0);
        let correlation = correlate(&first, &second);

        let child = build_offspring(
            &correlation,
            &first,
            &second,
            policy(FitnessTiebreak::First, 1.0),
            1,
            &mut history,
            &mut rng,
        );

        assert_eq!(ids(&child), vec![5, 6, 7, 8, 9]);
        assert_eq!(child.connection(5).unwrap().weight(), 0.5);
        assert!(check_integrity(&child, true));
    }

    #[test]
    fn no_recombination_without_matches_keeps_fitter_genes() {
        let first = genome(0, &[(5, 0, 3, 0.5)]);
        let second = genome(1, &[(6, 1, 3, 1.0), (7, 2, 4, 1.0)]);
        let mut history = History::new(&GeneticConfig::zero());
        let mut rng = StdRng::seed_from_u64(0);
        let correlation = correlate(&first, &second);

        let child = build_offspring(
            &correlation,
            &first,
            &second,
            policy(FitnessTiebreak::Second, 0.0),
            1,
            &mut history,
            &mut rng,
        );

        assert_eq!(ids(&child), vec![6, 7]);
        assert!(check_integrity(&child, true));
    }

    #[test]
    fn hidden_neurons_are_copied() {
        let first = genome(0, &[(5, 0, 3, 0.5), (30, 1, 20, 1.0), (31, 20, 4, 1.0)]);
        let second = genome(1, &[(5, 0, 3, 0.5)]);
        let mut history = History::new(&GeneticConfig::zero());
        let mut rng = StdRng::seed_from_u64(0);
        let correlation = correlate(&first, &second);

        let child = build_offspring(
            &correlation,
            &first,
            &second,
            policy(FitnessTiebreak::First, 1.0),
            1,
            &mut history,
            &mut rng,
        );

        assert_eq!(child.hidden_count(), 1);
        assert!(child.neuron(20).unwrap().has_source(1));
        assert!(child.neuron(20).unwrap().has_target(4));
        assert!(check_integrity(&child, true));
    }

    #[test]
    fn clashing_endpoints_favour_fitter_parent() {
        // The same connection, 1 -> 3, under two innovation numbers.
        let first = genome(0, &[(5, 0, 3, 0.5), (6, 1, 3, 1.0)]);
        let second = genome(1, &[(5, 0, 3, 0.5), (40, 1, 3, -1.0)]);
        let mut history = History::new(&GeneticConfig::zero());
        let mut rng = StdRng::seed_from_u64(0);
        let correlation = correlate(&first, &second);

        for (tiebreak, expected) in [
            (FitnessTiebreak::First, (6, 1.0)),
            (FitnessTiebreak::Second, (40, -1.0)),
        ] {
            let child = build_offspring(
                &correlation,
                &first,
                &second,
                policy(tiebreak, 1.0),
                1,
                &mut history,
                &mut rng,
            );

            assert_eq!(child.connections().len(), 2);
            let clash = &child.connections()[1];
            assert_eq!((clash.innovation(), clash.weight()), expected);
            assert!(check_integrity(&child, true));
        }
    }

    #[test]
    fn cyclic_genes_of_other_parent_are_rejected() {
        let first = genome(0, &[(5, 1, 20, 1.0), (6, 20, 21, 1.0), (7, 21, 3, 1.0)]);
        let second = genome(1, &[(5, 1, 20, 1.0), (50, 21, 20, 1.0)]);
        let mut history = History::new(&GeneticConfig::zero());
        let mut rng = StdRng::seed_from_u64(0);
        let correlation = correlate(&first, &second);

        let child = build_offspring(
            &correlation,
            &first,
            &second,
            policy(FitnessTiebreak::First, 1.0),
            1,
            &mut history,
            &mut rng,
        );

        assert_eq!(ids(&child), vec![5, 6, 7]);
        assert!(check_integrity(&child, true));

        // Without the acyclicity requirement, the gene is kept.
        let child = build_offspring(
            &correlation,
            &first,
            &second,
            CrossoverPolicy {
                feedforward_only: false,
                ..policy(FitnessTiebreak::First, 1.0)
            },
            1,
            &mut history,
            &mut rng,
        );
        assert_eq!(ids(&child), vec![5, 6, 7, 50]);
        assert!(check_integrity(&child, false));
    }

    #[test]
    fn offspring_get_fresh_ids() {
        let first = genome(0, &[(5, 0, 3, 0.5)]);
        let mut history = History::new(&GeneticConfig::zero());
        let config = GeneticConfig::default();
        let mut rng = StdRng::seed_from_u64(0);

        let a = first.mate(&first, FitnessTiebreak::Random, 1, &mut history, &config, &mut rng);
        let b = first.mate(&first, FitnessTiebreak::Random, 1, &mut history, &config, &mut rng);

        assert_ne!(a.id(), b.id());
        assert_eq!(ids(&a), vec![5]);
    }
}
