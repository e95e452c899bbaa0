use super::ConnectionGene;
use crate::Innovation;

use ahash::RandomState;

use std::collections::{HashMap, HashSet};

/// Gives access to the incoming neighbours of a
/// neuron, for backward reachability searches.
pub(super) trait ConnectivityGraph {
    /// Ids of the neurons with a connection to `neuron`.
    fn sources_of(&self, neuron: Innovation) -> Option<&HashSet<Innovation, RandomState>>;
}

/// Whether adding a connection from `source` to `target` would
/// close a cycle, i.e. whether `target` already reaches `source`.
///
/// Walks backwards from `source` through incoming connections
/// with an explicit stack, visiting each neuron at most once.
/// A self-connection is always cyclic.
pub(super) fn would_create_cycle(
    graph: &impl ConnectivityGraph,
    source: Innovation,
    target: Innovation,
) -> bool {
    if source == target {
        return true;
    }

    let mut visited: HashSet<Innovation, RandomState> = HashSet::default();
    let mut stack = vec![source];
    visited.insert(source);

    while let Some(neuron) = stack.pop() {
        for &upstream in graph.sources_of(neuron).into_iter().flatten() {
            if upstream == target {
                return true;
            }
            if visited.insert(upstream) {
                stack.push(upstream);
            }
        }
    }

    false
}

/// Whether the graph described by `connections` has no cycles,
/// by topological sort (Kahn's algorithm).
pub(super) fn is_acyclic<'a>(connections: impl IntoIterator<Item = &'a ConnectionGene>) -> bool {
    let mut in_degrees: HashMap<Innovation, usize, RandomState> = HashMap::default();
    let mut targets: HashMap<Innovation, Vec<Innovation>, RandomState> = HashMap::default();

    for connection in connections {
        let (source, target) = connection.endpoints();
        in_degrees.entry(source).or_insert(0);
        *in_degrees.entry(target).or_insert(0) += 1;
        targets.entry(source).or_default().push(target);
    }

    let mut ready: Vec<Innovation> = in_degrees
        .iter()
        .filter(|(_, &degree)| degree == 0)
        .map(|(&neuron, _)| neuron)
        .collect();
    let mut sorted = 0;

    while let Some(neuron) = ready.pop() {
        sorted += 1;
        for target in targets.get(&neuron).into_iter().flatten() {
            if let Some(degree) = in_degrees.get_mut(target) {
                *degree -= 1;
                if *degree == 0 {
                    ready.push(*target);
                }
            }
        }
    }

    sorted == in_degrees.len()
}
