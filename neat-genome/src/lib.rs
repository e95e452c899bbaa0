//! # neat-genome
//! The genome encoding and structural evolution engine of
//! NeuroEvolution of Augmenting Topologies, following the 2002 paper:
//! <http://nn.cs.utexas.edu/keyword?stanley:ec02>
//!
//! Provides a [`Genome`] type made of sorted neuron and connection genes,
//! the mutation operators that grow, prune and perturb it, and the
//! correlation and crossover machinery that aligns two genomes by
//! innovation number. A shared [`History`] makes identical structural
//! mutations receive identical innovation numbers across a population.
//!
//! Speciation, fitness evaluation and the decoding of genomes into
//! networks are left to the user.
//!
//! [`Genome`]: crate::genomics::Genome
//! [`History`]: crate::genomics::History
//!
//! # Example usage: a few generations of blind evolution
//! ```
//! use neat_genome::genomics::{
//!     check_integrity, FitnessTiebreak, GeneticConfig, Genome, History,
//! };
//! use rand::{rngs::StdRng, Rng, SeedableRng};
//! use std::num::NonZeroUsize;
//!
//! let config = GeneticConfig {
//!     input_count: NonZeroUsize::new(3).unwrap(),
//!     output_count: NonZeroUsize::new(2).unwrap(),
//!     feedforward_only: true,
//!     add_neuron_mutation_chance: 0.1,
//!     add_connection_mutation_chance: 0.2,
//!     ..GeneticConfig::default()
//! };
//! config.validate().unwrap();
//!
//! let mut history = History::new(&config);
//! let mut rng = StdRng::seed_from_u64(2002);
//! let mut population = Genome::new_population(20, &mut history, &config, &mut rng);
//!
//! for generation in 1..=10 {
//!     population = (0..population.len())
//!         .map(|_| {
//!             let first = &population[rng.gen_range(0..population.len())];
//!             if rng.gen_bool(0.5) {
//!                 let second = &population[rng.gen_range(0..population.len())];
//!                 first.mate(second, FitnessTiebreak::Random, generation, &mut history, &config, &mut rng)
//!             } else {
//!                 first.create_offspring(generation, &mut history, &config, &mut rng)
//!             }
//!         })
//!         .collect();
//! }
//!
//! assert!(population.iter().all(|genome| check_integrity(genome, true)));
//! assert!(population.iter().all(|genome| genome.birth_generation() == 10));
//! ```

pub mod genomics;

/// Identifier type used to designate historically
/// identical mutations for the purposes of
/// genome comparison and genetic tracking.
///
/// Neurons and connections draw from the same sequence.
pub type Innovation = u64;

/// Identifier of a genome, unique within a [`History`].
///
/// [`History`]: crate::genomics::History
pub type GenomeId = u64;

/// Index of a neuron's activation function, resolved
/// against a table owned by the network decoder.
pub type ActivationFnId = usize;
