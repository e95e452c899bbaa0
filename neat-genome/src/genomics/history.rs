use super::ring_buffer::KeyedRingBuffer;
use crate::genomics::GeneticConfig;
use crate::{GenomeId, Innovation};

use serde::{Deserialize, Serialize};
use tracing::trace;

use std::num::NonZeroUsize;

/// Innovation numbers produced by splitting a connection
/// with a neuron addition mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddedNeuronIds {
    /// The new hidden neuron.
    pub neuron: Innovation,
    /// The connection from the split connection's source to the new neuron.
    pub input_connection: Innovation,
    /// The connection from the new neuron to the split connection's target.
    pub output_connection: Innovation,
}

/// A `History` keeps track of structural innovations in a
/// population, in order to make sure identical mutations
/// are assigned the same innovation numbers.
///
/// Neurons and connections share a single sequence of
/// innovation numbers.
///
/// For connection innovations the source and target neurons
/// identify identical mutations. For neuron innovations the
/// split connection does, and the ids of the new neuron and
/// its two connections are recorded.
///
/// Both records are bounded: once full, recording a new
/// mutation forgets the oldest one, and a forgotten mutation
/// gets fresh innovation numbers if it ever happens again.
#[derive(Debug, Clone)]
pub struct History {
    next_innovation: Innovation,
    next_genome_id: GenomeId,
    added_connections: KeyedRingBuffer<(Innovation, Innovation), Innovation>,
    added_neurons: KeyedRingBuffer<Innovation, AddedNeuronIds>,
}

impl History {
    /// Creates a new History using the specified configuration.
    ///
    /// Innovation numbers are pre-allocated for everything an
    /// initial genome may contain: the bias neuron gets 0, input
    /// neurons `1..=input_count`, and output neurons the following
    /// `output_count` numbers. Then every possible connection from
    /// the bias or an input to an output gets the number
    /// `base + s ⨯ output_count + o`, where `base` is the first number
    /// after the output neurons, `s` is the index of the source
    /// (0 for the bias) and `o` that of the output.
    ///
    /// # Examples
    /// ```
    /// use neat_genome::genomics::{GeneticConfig, History};
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(2).unwrap(),
    ///     output_count: NonZeroUsize::new(1).unwrap(),
    ///     ..GeneticConfig::zero()
    /// };
    /// let history = History::new(&config);
    ///
    /// // Bias 0, inputs 1 and 2, output 3, then 3 initial connections.
    /// assert_eq!(history.max_innovation(), 6);
    /// assert_eq!(history.try_reuse_connection_id(2, 3), Some(6));
    /// ```
    pub fn new(config: &GeneticConfig) -> History {
        let input_count = config.input_count.get();
        let output_count = config.output_count.get();

        let mut added_connections = KeyedRingBuffer::new(config.history_capacity);
        for source_index in 0..=input_count {
            for output_index in 0..output_count {
                let target = Self::output_neuron_id(input_count, output_index);
                added_connections.insert(
                    (source_index as Innovation, target),
                    Self::initial_connection_id(
                        input_count,
                        output_count,
                        source_index,
                        output_index,
                    ),
                );
            }
        }

        History {
            next_innovation: (1 + input_count + output_count + (input_count + 1) * output_count)
                as Innovation,
            next_genome_id: 0,
            added_connections,
            added_neurons: KeyedRingBuffer::new(config.history_capacity),
        }
    }

    /// Innovation number of the output neuron with the given index.
    pub(super) fn output_neuron_id(input_count: usize, output_index: usize) -> Innovation {
        (1 + input_count + output_index) as Innovation
    }

    /// Innovation number pre-allocated to the initial connection
    /// from the bias (`source_index` 0) or an input to an output.
    pub(super) fn initial_connection_id(
        input_count: usize,
        output_count: usize,
        source_index: usize,
        output_index: usize,
    ) -> Innovation {
        let base = 1 + input_count + output_count;
        (base + source_index * output_count + output_index) as Innovation
    }

    /// Returns a new, never before used, innovation number.
    ///
    /// # Examples
    /// ```
    /// use neat_genome::genomics::{GeneticConfig, History};
    ///
    /// let mut history = History::new(&GeneticConfig::zero());
    /// let first = history.next_id();
    ///
    /// assert_eq!(history.next_id(), first + 1);
    /// assert_eq!(history.max_innovation(), first + 1);
    /// ```
    pub fn next_id(&mut self) -> Innovation {
        let id = self.next_innovation;
        self.next_innovation += 1;
        id
    }

    /// Returns a new genome id.
    pub fn next_genome_id(&mut self) -> GenomeId {
        let id = self.next_genome_id;
        self.next_genome_id += 1;
        id
    }

    /// Returns the innovation number previously assigned to a
    /// connection from `source` to `target`, if it is still
    /// remembered.
    pub fn try_reuse_connection_id(
        &self,
        source: Innovation,
        target: Innovation,
    ) -> Option<Innovation> {
        self.added_connections.get(&(source, target)).copied()
    }

    /// Records the innovation number assigned to a
    /// connection from `source` to `target`.
    pub fn record_connection_id(&mut self, source: Innovation, target: Innovation, id: Innovation) {
        if let Some(((source, target), id)) = self.added_connections.insert((source, target), id) {
            trace!(source, target, id, "connection innovation forgotten");
        }
    }

    /// Returns the innovation numbers previously assigned to
    /// the split of `connection`, if they are still remembered.
    pub fn try_reuse_split_ids(&self, connection: Innovation) -> Option<AddedNeuronIds> {
        self.added_neurons.get(&connection).copied()
    }

    /// Records the innovation numbers assigned to the split of `connection`.
    pub fn record_split_ids(&mut self, connection: Innovation, ids: AddedNeuronIds) {
        if let Some((connection, _)) = self.added_neurons.insert(connection, ids) {
            trace!(connection, "neuron innovation forgotten");
        }
    }

    /// Returns three new innovation numbers for a connection split,
    /// in the order neuron, input connection, output connection.
    /// Nothing is recorded.
    pub fn mint_split_ids(&mut self) -> AddedNeuronIds {
        AddedNeuronIds {
            neuron: self.next_id(),
            input_connection: self.next_id(),
            output_connection: self.next_id(),
        }
    }

    /// Returns the highest innovation number generated.
    ///
    /// # Examples
    /// ```
    /// use neat_genome::genomics::{GeneticConfig, History};
    ///
    /// let history = History::new(&GeneticConfig::zero());
    ///
    /// // Bias, input, output, and the two initial connections.
    /// assert_eq!(history.max_innovation(), 4);
    /// ```
    pub fn max_innovation(&self) -> Innovation {
        self.next_innovation - 1
    }

    /// Returns the capacity of each of the history's records.
    pub fn capacity(&self) -> NonZeroUsize {
        self.added_connections.capacity()
    }

    /// Returns an iterator over the remembered connection
    /// innovations, in the format `((source, target), innovation)`,
    /// from oldest to newest.
    ///
    /// # Examples
    /// ```
    /// use neat_genome::genomics::{GeneticConfig, History};
    ///
    /// let history = History::new(&GeneticConfig::zero());
    ///
    /// for ((source, target), connection) in history.connection_history() {
    ///     println!("connection {} from neuron {} to neuron {}",
    ///         connection, source, target);
    /// }
    /// assert_eq!(history.connection_history().count(), 2);
    /// ```
    pub fn connection_history(
        &self,
    ) -> impl Iterator<Item = (&(Innovation, Innovation), &Innovation)> {
        self.added_connections.iter()
    }

    /// Returns an iterator over the remembered neuron
    /// innovations, in the format `(split connection, ids)`,
    /// from oldest to newest.
    pub fn split_history(&self) -> impl Iterator<Item = (&Innovation, &AddedNeuronIds)> {
        self.added_neurons.iter()
    }

    /// Number of remembered connection and neuron innovations.
    pub fn remembered(&self) -> (usize, usize) {
        (self.added_connections.len(), self.added_neurons.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(input_count: usize, output_count: usize, capacity: usize) -> GeneticConfig {
        GeneticConfig {
            input_count: NonZeroUsize::new(input_count).unwrap(),
            output_count: NonZeroUsize::new(output_count).unwrap(),
            history_capacity: NonZeroUsize::new(capacity).unwrap(),
            ..GeneticConfig::zero()
        }
    }

    #[test]
    fn new_preallocates_initial_ids() {
        for input_count in 1..6 {
            for output_count in 1..6 {
                let history = History::new(&config(input_count, output_count, 1024));
                let neuron_count = 1 + input_count + output_count;
                let connection_count = (input_count + 1) * output_count;

                assert_eq!(
                    history.max_innovation() as usize,
                    neuron_count + connection_count - 1
                );

                let mut ids: Vec<Innovation> =
                    history.connection_history().map(|(_, id)| *id).collect();
                ids.sort_unstable();
                let expected: Vec<Innovation> = (neuron_count..neuron_count + connection_count)
                    .map(|id| id as Innovation)
                    .collect();
                assert_eq!(ids, expected);

                for ((source, target), _) in history.connection_history() {
                    assert!((*source as usize) <= input_count);
                    assert!((*target as usize) > input_count);
                    assert!((*target as usize) < neuron_count);
                }
            }
        }
    }

    #[test]
    fn connection_reuse() {
        const SOURCE: Innovation = 1;
        const TARGET: Innovation = 40;

        let mut history = History::new(&config(2, 2, 1024));
        assert_eq!(history.try_reuse_connection_id(SOURCE, TARGET), None);

        let id = history.next_id();
        history.record_connection_id(SOURCE, TARGET, id);

        assert_eq!(history.try_reuse_connection_id(SOURCE, TARGET), Some(id));
        assert_eq!(history.try_reuse_connection_id(TARGET, SOURCE), None);
    }

    #[test]
    fn split_reuse() {
        const SPLIT: Innovation = 7;

        let mut history = History::new(&config(2, 2, 1024));
        assert_eq!(history.try_reuse_split_ids(SPLIT), None);

        let ids = history.mint_split_ids();
        assert_eq!(ids.input_connection, ids.neuron + 1);
        assert_eq!(ids.output_connection, ids.neuron + 2);
        history.record_split_ids(SPLIT, ids);

        assert_eq!(history.try_reuse_split_ids(SPLIT), Some(ids));
        assert_eq!(history.split_history().count(), 1);
    }

    #[test]
    fn bounded_eviction() {
        const CAPACITY: usize = 16;

        let mut history = History::new(&config(1, 1, CAPACITY));
        let first = history.next_id();
        history.record_connection_id(100, 200, first);

        for i in 0..CAPACITY as Innovation {
            let id = history.next_id();
            history.record_connection_id(1000 + i, 2000 + i, id);
        }

        assert_eq!(history.try_reuse_connection_id(100, 200), None);
        assert_eq!(history.remembered().0, CAPACITY);
        let newest = CAPACITY as Innovation - 1;
        assert!(history
            .try_reuse_connection_id(1000 + newest, 2000 + newest)
            .is_some());
    }

    #[test]
    fn genome_ids() {
        let mut history = History::new(&GeneticConfig::zero());

        assert_eq!(history.next_genome_id(), 0);
        assert_eq!(history.next_genome_id(), 1);
    }
}
