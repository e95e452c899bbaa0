use crate::genomics::GeneticConfig;
use crate::Innovation;

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Connection genes are the weighted links of a genome.
/// They join a source neuron to a target neuron, and
/// become network connections in the genome's phenotype.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ConnectionGene {
    id: Innovation,
    source: Innovation,
    target: Innovation,
    weight: f64,
    #[serde(skip)]
    is_mutated: bool,
}

impl ConnectionGene {
    /// Returns a new connection gene with the specified parameters.
    ///
    /// # Examples
    /// ```
    /// use neat_genome::genomics::ConnectionGene;
    ///
    /// let gene = ConnectionGene::new(42, 3, 9, 2.0);
    /// ```
    pub fn new(
        id: Innovation,
        source: Innovation,
        target: Innovation,
        weight: f64,
    ) -> ConnectionGene {
        ConnectionGene {
            id,
            source,
            target,
            weight,
            is_mutated: false,
        }
    }

    /// Returns a random weight, drawn uniformly
    /// from ±[`weight_bound`].
    ///
    /// [`weight_bound`]: crate::genomics::GeneticConfig::weight_bound
    pub(super) fn random_weight(config: &GeneticConfig, rng: &mut impl Rng) -> f64 {
        if config.weight_bound > 0.0 {
            rng.gen_range(-config.weight_bound..=config.weight_bound)
        } else {
            0.0
        }
    }

    /// Returns the gene's innovation number.
    ///
    /// # Examples
    /// ```
    /// use neat_genome::genomics::ConnectionGene;
    ///
    /// let gene = ConnectionGene::new(42, 3, 9, 2.0);
    ///
    /// assert_eq!(gene.innovation(), 42);
    /// ```
    pub fn innovation(&self) -> Innovation {
        self.id
    }

    /// Returns the id of the neuron the connection leaves from.
    pub fn source(&self) -> Innovation {
        self.source
    }

    /// Returns the id of the neuron the connection arrives at.
    pub fn target(&self) -> Innovation {
        self.target
    }

    /// Returns the gene's `(source, target)` pair.
    ///
    /// # Examples
    /// ```
    /// use neat_genome::genomics::ConnectionGene;
    ///
    /// let gene = ConnectionGene::new(42, 3, 9, 2.0);
    ///
    /// assert_eq!(gene.endpoints(), (3, 9));
    /// ```
    pub fn endpoints(&self) -> (Innovation, Innovation) {
        (self.source, self.target)
    }

    /// Returns the gene's weight.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Sets the gene's weight, clamped to ±`bound`.
    pub(super) fn set_weight(&mut self, weight: f64, bound: f64) {
        let bound = bound.abs();
        self.weight = weight.clamp(-bound, bound);
    }

    /// Sets the gene's weight as given.
    pub(super) fn replace_weight(&mut self, weight: f64) {
        self.weight = weight;
    }

    /// Whether the gene was already changed in the
    /// current weight mutation.
    pub(super) fn is_mutated(&self) -> bool {
        self.is_mutated
    }

    pub(super) fn set_mutated(&mut self, is_mutated: bool) {
        self.is_mutated = is_mutated;
    }
}

impl fmt::Display for ConnectionGene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Connection({}, {} -> {}, {:+.4})",
            self.id, self.source, self.target, self.weight
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn new() {
        const ID: Innovation = 42;
        const SOURCE: Innovation = 3;
        const TARGET: Innovation = 9;
        const WEIGHT: f64 = 2.0;

        let gene = ConnectionGene::new(ID, SOURCE, TARGET, WEIGHT);

        assert_eq!(gene.innovation(), ID);
        assert_eq!(gene.source(), SOURCE);
        assert_eq!(gene.target(), TARGET);
        assert_eq!(gene.weight(), WEIGHT);
        assert!(!gene.is_mutated());
    }

    #[test]
    fn set_weight_clamps() {
        let mut gene = ConnectionGene::new(0, 0, 1, 0.0);

        gene.set_weight(7.5, 5.0);
        assert_eq!(gene.weight(), 5.0);

        gene.set_weight(-7.5, 5.0);
        assert_eq!(gene.weight(), -5.0);

        gene.set_weight(1.25, 5.0);
        assert_eq!(gene.weight(), 1.25);
    }

    #[test]
    fn random_weight_in_bound() {
        let config = GeneticConfig {
            weight_bound: 3.0,
            ..GeneticConfig::zero()
        };
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..1000 {
            assert!(ConnectionGene::random_weight(&config, &mut rng).abs() <= 3.0);
        }
        assert_eq!(
            ConnectionGene::random_weight(&GeneticConfig::zero(), &mut rng),
            0.0
        );
    }

    #[test]
    fn mutated_flag_is_not_serialized() {
        let mut gene = ConnectionGene::new(4, 0, 2, -0.5);
        gene.set_mutated(true);

        let serialized = serde_json::to_string(&gene).unwrap();
        let deserialized: ConnectionGene = serde_json::from_str(&serialized).unwrap();

        assert!(!deserialized.is_mutated());
        assert_eq!(deserialized.endpoints(), (0, 2));
        assert_eq!(deserialized.weight(), -0.5);
    }
}
