use ahash::RandomState;

use std::collections::hash_map::{Entry, HashMap};
use std::collections::VecDeque;
use std::hash::Hash;
use std::num::NonZeroUsize;

/// A fixed-capacity map which forgets its oldest
/// entry when a new key is inserted while full.
#[derive(Clone, Debug)]
pub(super) struct KeyedRingBuffer<K, V> {
    capacity: NonZeroUsize,
    order: VecDeque<K>,
    entries: HashMap<K, V, RandomState>,
}

impl<K: Eq + Hash + Clone, V> KeyedRingBuffer<K, V> {
    pub fn new(capacity: NonZeroUsize) -> Self {
        KeyedRingBuffer {
            capacity,
            order: VecDeque::new(),
            entries: HashMap::default(),
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    /// Records `value` under `key`. An existing entry for `key` is
    /// overwritten and keeps its age; otherwise the oldest entry
    /// is evicted and returned if the buffer is full.
    pub fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        match self.entries.entry(key) {
            Entry::Occupied(mut entry) => {
                entry.insert(value);
                None
            }
            Entry::Vacant(entry) => {
                self.order.push_back(entry.key().clone());
                entry.insert(value);
                if self.order.len() > self.capacity.get() {
                    self.order.pop_front().and_then(|oldest| {
                        let evicted = self.entries.remove(&oldest);
                        evicted.map(|value| (oldest, value))
                    })
                } else {
                    None
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn capacity(&self) -> NonZeroUsize {
        self.capacity
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.order
            .iter()
            .filter_map(move |key| self.entries.get(key).map(|value| (key, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(capacity: usize) -> KeyedRingBuffer<(u64, u64), u64> {
        KeyedRingBuffer::new(NonZeroUsize::new(capacity).unwrap())
    }

    #[test]
    fn insert_and_get() {
        let mut buffer = buffer(4);

        assert!(buffer.insert((0, 1), 10).is_none());
        assert!(buffer.insert((0, 2), 11).is_none());

        assert_eq!(buffer.get(&(0, 1)), Some(&10));
        assert_eq!(buffer.get(&(0, 2)), Some(&11));
        assert_eq!(buffer.get(&(1, 2)), None);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn evicts_oldest_first() {
        let mut buffer = buffer(3);
        for i in 0..3 {
            buffer.insert((i, i + 1), i);
        }

        assert_eq!(buffer.insert((3, 4), 3), Some(((0, 1), 0)));
        assert_eq!(buffer.insert((4, 5), 4), Some(((1, 2), 1)));

        assert_eq!(buffer.get(&(0, 1)), None);
        assert_eq!(buffer.get(&(1, 2)), None);
        assert_eq!(buffer.get(&(2, 3)), Some(&2));
        assert_eq!(buffer.len(), 3);
        assert_eq!(
            buffer.iter().map(|(_, v)| *v).collect::<Vec<_>>(),
            vec![2, 3, 4]
        );
    }

    #[test]
    fn reinsertion_keeps_age() {
        let mut buffer = buffer(2);
        buffer.insert((0, 1), 0);
        buffer.insert((1, 2), 1);

        assert!(buffer.insert((0, 1), 7).is_none());
        assert_eq!(buffer.get(&(0, 1)), Some(&7));

        // (0, 1) is still the oldest entry.
        assert_eq!(buffer.insert((2, 3), 2), Some(((0, 1), 7)));
    }
}
