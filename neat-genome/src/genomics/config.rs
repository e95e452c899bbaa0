use super::ConfigError;
use crate::ActivationFnId;

use serde::{Deserialize, Serialize};

use std::num::NonZeroUsize;

/// Default capacity of each innovation history buffer.
pub const DEFAULT_HISTORY_CAPACITY: usize = 0x20000;

/// The way a selected connection's weight is changed
/// during a weight mutation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum WeightPerturbation {
    /// Draw a fresh weight uniformly from
    /// `[-weight_bound, weight_bound]`.
    Reset,
    /// Add a value drawn uniformly from `[-magnitude, magnitude]`.
    JiggleUniform { magnitude: f64 },
    /// Add a value drawn from a gaussian distribution
    /// with mean 0 and the given standard deviation.
    JiggleGaussian { sigma: f64 },
}

/// The policy used to pick which connections
/// a weight mutation applies to.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ConnectionSelection {
    /// Each connection is selected independently with the
    /// given chance. At least one connection is always selected.
    Proportion(f64),
    /// Exactly this many distinct connections are selected,
    /// or all of them if the genome has fewer.
    Quantity(usize),
}

/// One entry of a weight mutation scheme. A scheme entry
/// is chosen by weighted random selection over
/// [`activation_chance`] every time weights are mutated.
///
/// [`activation_chance`]: WeightMutationInfo::activation_chance
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightMutationInfo {
    /// Relative chance of this entry being picked.
    pub activation_chance: f64,
    /// How selected weights are changed.
    pub perturbation: WeightPerturbation,
    /// Which weights are selected.
    pub selection: ConnectionSelection,
}

impl WeightMutationInfo {
    /// Creates a new scheme entry.
    pub fn new(
        activation_chance: f64,
        perturbation: WeightPerturbation,
        selection: ConnectionSelection,
    ) -> WeightMutationInfo {
        WeightMutationInfo {
            activation_chance,
            perturbation,
            selection,
        }
    }

    /// The classic weight mutation scheme: small gaussian
    /// jiggles on one, two or three connections most of the time,
    /// and an occasional reset of one, two or three connections.
    ///
    /// # Examples
    /// ```
    /// use neat_genome::genomics::WeightMutationInfo;
    ///
    /// let scheme = WeightMutationInfo::default_scheme();
    ///
    /// assert_eq!(scheme.len(), 6);
    /// assert!(scheme.iter().all(|info| info.activation_chance > 0.0));
    /// ```
    pub fn default_scheme() -> Vec<WeightMutationInfo> {
        use ConnectionSelection::Quantity;
        use WeightPerturbation::{JiggleGaussian, Reset};

        let jiggle = JiggleGaussian { sigma: 0.01 };
        vec![
            WeightMutationInfo::new(0.5985, jiggle, Quantity(1)),
            WeightMutationInfo::new(0.2985, jiggle, Quantity(2)),
            WeightMutationInfo::new(0.0985, jiggle, Quantity(3)),
            WeightMutationInfo::new(0.015, Reset, Quantity(1)),
            WeightMutationInfo::new(0.015, Reset, Quantity(2)),
            WeightMutationInfo::new(0.015, Reset, Quantity(3)),
        ]
    }
}

/// Configuration data for genome generation,
/// mutation and crossover.
///
/// # Note
/// All quantities expressing probabilities
/// should be in the range [0.0, 1.0]. Use
/// [`validate`] to check a configuration
/// obtained from an untrusted source.
///
/// [`validate`]: GeneticConfig::validate
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneticConfig {
    /// Number of input neurons in a genome (the bias not included).
    pub input_count: NonZeroUsize,
    /// Number of output neurons in a genome.
    pub output_count: NonZeroUsize,
    /// Whether genomes must remain acyclic.
    pub feedforward_only: bool,
    /// Activation function index given to newly created hidden neurons.
    pub activation_fn_id: ActivationFnId,
    /// Maximum magnitude of a connection's weight.
    pub weight_bound: f64,
    /// Proportion of all possible bias/input → output connections
    /// present in an initial genome. At least one connection is
    /// always created.
    pub initial_interconnections_proportion: f64,
    /// Chance of a disjoint or excess gene being inherited
    /// during crossover.
    pub disjoint_excess_recombine_chance: f64,
    /// Relative chance of a weight mutation.
    pub weight_mutation_chance: f64,
    /// Relative chance of a neuron addition mutation.
    pub add_neuron_mutation_chance: f64,
    /// Relative chance of a connection addition mutation.
    pub add_connection_mutation_chance: f64,
    /// Relative chance of a connection deletion mutation.
    pub delete_connection_mutation_chance: f64,
    /// Relative chance of a neuron deletion mutation.
    pub delete_neuron_mutation_chance: f64,
    /// Weight mutation entries to choose from.
    pub weight_mutation_scheme: Vec<WeightMutationInfo>,
    /// Maximum number of candidate pairs tried by a
    /// connection addition mutation before giving up.
    pub max_add_connection_attempts: usize,
    /// Capacity of each of the innovation history buffers.
    pub history_capacity: NonZeroUsize,
}

impl GeneticConfig {
    /// Returns a "zero-valued" configuration.
    /// All values are 0, empty or false, except for
    /// the input and output counts, which are 1,
    /// and the history capacity, which is
    /// [`DEFAULT_HISTORY_CAPACITY`].
    ///
    /// Useful for struct-update syntax.
    ///
    /// # Examples
    /// ```
    /// use neat_genome::genomics::GeneticConfig;
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(2).unwrap(),
    ///     weight_bound: 5.0,
    ///     ..GeneticConfig::zero()
    /// };
    ///
    /// assert_eq!(config.output_count.get(), 1);
    /// assert!(config.weight_mutation_scheme.is_empty());
    /// ```
    pub const fn zero() -> GeneticConfig {
        let history_capacity = match NonZeroUsize::new(DEFAULT_HISTORY_CAPACITY) {
            Some(capacity) => capacity,
            None => unreachable!(),
        };
        GeneticConfig {
            input_count: NonZeroUsize::MIN,
            output_count: NonZeroUsize::MIN,
            feedforward_only: false,
            activation_fn_id: 0,
            weight_bound: 0.0,
            initial_interconnections_proportion: 0.0,
            disjoint_excess_recombine_chance: 0.0,
            weight_mutation_chance: 0.0,
            add_neuron_mutation_chance: 0.0,
            add_connection_mutation_chance: 0.0,
            delete_connection_mutation_chance: 0.0,
            delete_neuron_mutation_chance: 0.0,
            weight_mutation_scheme: Vec::new(),
            max_add_connection_attempts: 0,
            history_capacity,
        }
    }

    /// Returns a copy of this configuration with the mutation
    /// chances replaced by those of the simplifying phase of
    /// complexity regulation: no structure is added, and
    /// connections are deleted often.
    ///
    /// # Examples
    /// ```
    /// use neat_genome::genomics::GeneticConfig;
    ///
    /// let simplifying = GeneticConfig::default().simplifying();
    ///
    /// assert_eq!(simplifying.add_neuron_mutation_chance, 0.0);
    /// assert_eq!(simplifying.add_connection_mutation_chance, 0.0);
    /// assert!(simplifying.delete_connection_mutation_chance > 0.0);
    /// ```
    pub fn simplifying(&self) -> GeneticConfig {
        GeneticConfig {
            weight_mutation_chance: 0.6,
            add_neuron_mutation_chance: 0.0,
            add_connection_mutation_chance: 0.0,
            delete_connection_mutation_chance: 0.4,
            ..self.clone()
        }
    }

    /// Checks that every probability lies in [0.0, 1.0], that
    /// the weight bound is positive and finite, and that the
    /// weight mutation scheme is usable.
    ///
    /// # Errors
    /// Returns the first problem found.
    ///
    /// # Examples
    /// ```
    /// use neat_genome::genomics::GeneticConfig;
    ///
    /// assert!(GeneticConfig::default().validate().is_ok());
    ///
    /// let config = GeneticConfig {
    ///     weight_mutation_chance: 1.5,
    ///     ..GeneticConfig::default()
    /// };
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let probabilities = [
            (
                "initial_interconnections_proportion",
                self.initial_interconnections_proportion,
            ),
            (
                "disjoint_excess_recombine_chance",
                self.disjoint_excess_recombine_chance,
            ),
            ("weight_mutation_chance", self.weight_mutation_chance),
            ("add_neuron_mutation_chance", self.add_neuron_mutation_chance),
            (
                "add_connection_mutation_chance",
                self.add_connection_mutation_chance,
            ),
            (
                "delete_connection_mutation_chance",
                self.delete_connection_mutation_chance,
            ),
            (
                "delete_neuron_mutation_chance",
                self.delete_neuron_mutation_chance,
            ),
        ];
        for (field, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ProbabilityOutOfRange { field, value });
            }
        }

        if !(self.weight_bound.is_finite() && self.weight_bound > 0.0) {
            return Err(ConfigError::InvalidWeightBound(self.weight_bound));
        }

        if self.weight_mutation_scheme.is_empty() {
            return Err(ConfigError::EmptyWeightMutationScheme);
        }
        for (index, info) in self.weight_mutation_scheme.iter().enumerate() {
            let valid_parameter = match info.perturbation {
                WeightPerturbation::Reset => true,
                WeightPerturbation::JiggleUniform { magnitude } => {
                    magnitude.is_finite() && magnitude >= 0.0
                }
                WeightPerturbation::JiggleGaussian { sigma } => sigma.is_finite() && sigma >= 0.0,
            };
            let valid_selection = match info.selection {
                ConnectionSelection::Proportion(p) => (0.0..=1.0).contains(&p),
                ConnectionSelection::Quantity(n) => n > 0,
            };
            let valid_chance = info.activation_chance.is_finite() && info.activation_chance >= 0.0;
            if !valid_chance || !valid_parameter || !valid_selection {
                return Err(ConfigError::InvalidWeightMutationInfo(index));
            }
        }

        Ok(())
    }
}

impl Default for GeneticConfig {
    /// Single input and output, cyclic networks allowed,
    /// with the classic mutation rates.
    fn default() -> GeneticConfig {
        GeneticConfig {
            weight_bound: 5.0,
            initial_interconnections_proportion: 0.05,
            disjoint_excess_recombine_chance: 0.1,
            weight_mutation_chance: 0.94,
            add_neuron_mutation_chance: 0.01,
            add_connection_mutation_chance: 0.025,
            delete_connection_mutation_chance: 0.025,
            weight_mutation_scheme: WeightMutationInfo::default_scheme(),
            max_add_connection_attempts: 5,
            ..GeneticConfig::zero()
        }
    }
}
