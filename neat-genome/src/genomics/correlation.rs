use super::{ConnectionGene, Genome};
use crate::Innovation;

use std::cmp::Ordering;

/// One of the two genomes being correlated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parent {
    /// The first genome passed to [`correlate`].
    First,
    /// The second genome passed to [`correlate`].
    Second,
}

impl Parent {
    /// Returns the other parent.
    pub fn other(self) -> Parent {
        match self {
            Parent::First => Parent::Second,
            Parent::Second => Parent::First,
        }
    }
}

/// How a connection gene relates to the other genome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CorrelationKind {
    /// Both genomes have the gene.
    Match,
    /// Only one genome has the gene, and its innovation number is
    /// below the highest one of the other genome.
    Disjoint,
    /// Only one genome has the gene, and its innovation number is
    /// above the highest one of the other genome.
    Excess,
}

/// A single aligned position of two correlated genomes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CorrelationItem<'a> {
    kind: CorrelationKind,
    first: Option<&'a ConnectionGene>,
    second: Option<&'a ConnectionGene>,
}

impl<'a> CorrelationItem<'a> {
    fn matched(first: &'a ConnectionGene, second: &'a ConnectionGene) -> Self {
        CorrelationItem {
            kind: CorrelationKind::Match,
            first: Some(first),
            second: Some(second),
        }
    }

    fn unmatched(kind: CorrelationKind, owner: Parent, gene: &'a ConnectionGene) -> Self {
        let (first, second) = match owner {
            Parent::First => (Some(gene), None),
            Parent::Second => (None, Some(gene)),
        };
        CorrelationItem {
            kind,
            first,
            second,
        }
    }

    /// Returns the kind of the item.
    pub fn kind(&self) -> CorrelationKind {
        self.kind
    }

    /// Returns the gene of the first genome, if it has one here.
    pub fn first(&self) -> Option<&'a ConnectionGene> {
        self.first
    }

    /// Returns the gene of the second genome, if it has one here.
    pub fn second(&self) -> Option<&'a ConnectionGene> {
        self.second
    }

    /// Returns the gene of `parent`, if it has one here.
    pub fn gene_of(&self, parent: Parent) -> Option<&'a ConnectionGene> {
        match parent {
            Parent::First => self.first,
            Parent::Second => self.second,
        }
    }

    /// Returns the parent owning a disjoint or excess gene,
    /// and the gene. Returns `None` for matches.
    pub fn unmatched_gene(&self) -> Option<(Parent, &'a ConnectionGene)> {
        match (self.first, self.second) {
            (Some(gene), None) => Some((Parent::First, gene)),
            (None, Some(gene)) => Some((Parent::Second, gene)),
            _ => None,
        }
    }

    /// Returns the item's innovation number.
    pub fn innovation(&self) -> Innovation {
        self.first
            .or(self.second)
            .map_or(0, ConnectionGene::innovation)
    }
}

/// Summary of a correlation, from which genetic
/// compatibility measures can be computed.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CorrelationStatistics {
    /// Number of genes present in both genomes.
    pub match_count: usize,
    /// Number of disjoint genes, over both genomes.
    pub disjoint_count: usize,
    /// Number of excess genes, over both genomes.
    pub excess_count: usize,
    /// Sum of absolute weight differences between matching genes.
    pub weight_delta: f64,
}

impl CorrelationStatistics {
    /// Average weight difference between matching genes,
    /// or 0 if there are none.
    pub fn mean_weight_delta(&self) -> f64 {
        if self.match_count == 0 {
            0.0
        } else {
            self.weight_delta / self.match_count as f64
        }
    }
}

/// Gene-by-gene alignment of two genomes.
#[derive(Clone, Debug, PartialEq)]
pub struct CorrelationResult<'a> {
    items: Vec<CorrelationItem<'a>>,
    statistics: CorrelationStatistics,
}

impl<'a> CorrelationResult<'a> {
    /// Returns the aligned items, in innovation order.
    pub fn items(&self) -> &[CorrelationItem<'a>] {
        &self.items
    }

    /// Returns the correlation's statistics.
    pub fn statistics(&self) -> &CorrelationStatistics {
        &self.statistics
    }

    /// Counts the items of `kind` holding a gene of `parent`.
    ///
    /// # Examples
    /// ```
    /// use neat_genome::genomics::{correlate, CorrelationKind, Genome, History, GeneticConfig, Parent};
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let config = GeneticConfig::default();
    /// let mut history = History::new(&config);
    /// let mut rng = StdRng::seed_from_u64(0);
    /// let first = Genome::new(&mut history, &config, &mut rng);
    /// let second = Genome::new(&mut history, &config, &mut rng);
    ///
    /// let correlation = correlate(&first, &second);
    /// let stats = correlation.statistics();
    ///
    /// for (parent, genome) in [(Parent::First, &first), (Parent::Second, &second)] {
    ///     assert_eq!(
    ///         stats.match_count
    ///             + correlation.count(CorrelationKind::Disjoint, parent)
    ///             + correlation.count(CorrelationKind::Excess, parent),
    ///         genome.connections().len()
    ///     );
    /// }
    /// ```
    pub fn count(&self, kind: CorrelationKind, parent: Parent) -> usize {
        self.items
            .iter()
            .filter(|item| item.kind == kind && item.gene_of(parent).is_some())
            .count()
    }

    /// Whether items are in strictly increasing innovation order,
    /// each item holds the genes its kind requires, and the
    /// statistics agree with the items.
    pub fn is_consistent(&self) -> bool {
        let mut statistics = CorrelationStatistics::default();
        for item in &self.items {
            match (item.kind, item.first, item.second) {
                (CorrelationKind::Match, Some(first), Some(second)) => {
                    if first.innovation() != second.innovation() {
                        return false;
                    }
                    statistics.match_count += 1;
                    statistics.weight_delta += (first.weight() - second.weight()).abs();
                }
                (CorrelationKind::Disjoint, Some(_), None)
                | (CorrelationKind::Disjoint, None, Some(_)) => statistics.disjoint_count += 1,
                (CorrelationKind::Excess, Some(_), None)
                | (CorrelationKind::Excess, None, Some(_)) => statistics.excess_count += 1,
                _ => return false,
            }
        }

        let ordered = self
            .items
            .windows(2)
            .all(|pair| pair[0].innovation() < pair[1].innovation());

        ordered
            && statistics.match_count == self.statistics.match_count
            && statistics.disjoint_count == self.statistics.disjoint_count
            && statistics.excess_count == self.statistics.excess_count
            && (statistics.weight_delta - self.statistics.weight_delta).abs() < 1e-9
    }
}

/// Aligns the connection genes of two genomes by innovation number,
/// classifying each as a match, disjoint or excess gene.
///
/// Both genomes must have their connections sorted by innovation
/// number, which every genome built by this crate does; the result
/// is meaningless otherwise.
///
/// # Examples
/// ```
/// use neat_genome::genomics::{correlate, ConnectionGene, CorrelationKind, Genome, NeuronGene, NodeType};
///
/// let genome = |ids: &[u64]| {
///     let neurons = vec![
///         NeuronGene::new(0, NodeType::Bias, 0),
///         NeuronGene::new(20, NodeType::Input, 0),
///         NeuronGene::new(21, NodeType::Output, 0),
///         NeuronGene::new(22, NodeType::Output, 0),
///         NeuronGene::new(23, NodeType::Output, 0),
///     ];
///     let targets = [21, 22, 23];
///     let connections: Vec<ConnectionGene> = ids
///         .iter()
///         .enumerate()
///         .map(|(i, &id)| ConnectionGene::new(id, 20, targets[i], 1.0))
///         .collect();
///     Genome::from_genes(0, 0, neurons.into(), connections.into(), 1, 3, true)
/// };
/// let first = genome(&[1, 2, 4]);
/// let second = genome(&[1, 3, 4]);
///
/// let correlation = correlate(&first, &second);
/// let kinds: Vec<CorrelationKind> = correlation.items().iter().map(|i| i.kind()).collect();
///
/// assert_eq!(kinds, vec![
///     CorrelationKind::Match,
///     CorrelationKind::Disjoint,
///     CorrelationKind::Disjoint,
///     CorrelationKind::Match,
/// ]);
/// assert_eq!(correlation.statistics().disjoint_count, 2);
/// ```
pub fn correlate<'a>(first: &'a Genome, second: &'a Genome) -> CorrelationResult<'a> {
    correlate_connections(first.connections(), second.connections())
}

fn correlate_connections<'a>(
    first: &'a [ConnectionGene],
    second: &'a [ConnectionGene],
) -> CorrelationResult<'a> {
    let mut items = Vec::with_capacity(first.len().max(second.len()));
    let mut statistics = CorrelationStatistics::default();
    let (mut i, mut j) = (0, 0);

    loop {
        match (first.get(i), second.get(j)) {
            (Some(a), Some(b)) => match a.innovation().cmp(&b.innovation()) {
                Ordering::Equal => {
                    items.push(CorrelationItem::matched(a, b));
                    statistics.match_count += 1;
                    statistics.weight_delta += (a.weight() - b.weight()).abs();
                    i += 1;
                    j += 1;
                }
                Ordering::Less => {
                    items.push(CorrelationItem::unmatched(
                        CorrelationKind::Disjoint,
                        Parent::First,
                        a,
                    ));
                    statistics.disjoint_count += 1;
                    i += 1;
                }
                Ordering::Greater => {
                    items.push(CorrelationItem::unmatched(
                        CorrelationKind::Disjoint,
                        Parent::Second,
                        b,
                    ));
                    statistics.disjoint_count += 1;
                    j += 1;
                }
            },
            (Some(a), None) => {
                items.push(CorrelationItem::unmatched(
                    CorrelationKind::Excess,
                    Parent::First,
                    a,
                ));
                statistics.excess_count += 1;
                i += 1;
            }
            (None, Some(b)) => {
                items.push(CorrelationItem::unmatched(
                    CorrelationKind::Excess,
                    Parent::Second,
                    b,
                ));
                statistics.excess_count += 1;
                j += 1;
            }
            (None, None) => break,
        }
    }

    CorrelationResult { items, statistics }
}
