//! Local search over connected node sets.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::debug;

use crate::graph::NodeId;

/// Improves a connected node set by single-node swaps.
///
/// A round tries, for every node of the set that is not fixed and has at most one neighbour in
/// the set, to drop it and optionally add one outside node adjacent to the rest. The first
/// improving swap any thread finds is taken; rounds repeat until none improves.
pub struct HillClimber<F> {
    fitness: F,
    fixed_nodes: HashSet<NodeId>,
    adjacency: HashMap<NodeId, Vec<NodeId>>,
}

impl<F> HillClimber<F>
where
    F: Fn(&HashSet<NodeId>) -> f64 + Sync,
{
    /// `adjacency` may list each edge in one direction only.
    pub fn new(adjacency: &BTreeMap<NodeId, Vec<NodeId>>, fixed_nodes: HashSet<NodeId>, fitness: F) -> Self {
        let mut symmetric: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for (&id, neighbours) in adjacency {
            symmetric.entry(id).or_default();
            for &neighbour in neighbours {
                if neighbour == id {
                    continue;
                }
                let forward = symmetric.entry(id).or_default();
                if !forward.contains(&neighbour) {
                    forward.push(neighbour);
                }
                let backward = symmetric.entry(neighbour).or_default();
                if !backward.contains(&id) {
                    backward.push(id);
                }
            }
        }
        HillClimber {
            fitness,
            fixed_nodes,
            adjacency: symmetric,
        }
    }

    fn neighbours(&self, node: NodeId) -> &[NodeId] {
        self.adjacency.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns a set with at least the fitness of `solution`.
    pub fn improve(&self, solution: &HashSet<NodeId>) -> HashSet<NodeId> {
        let mut current = solution.clone();
        let mut current_fitness = (self.fitness)(&current);
        let mut round = 0;
        while let Some((improved, fitness)) = self.improve_once(&current, current_fitness) {
            round += 1;
            debug!(round, fitness, previous = current_fitness, "hill climber improved solution");
            current = improved;
            current_fitness = fitness;
        }
        current
    }

    fn improve_once(&self, current: &HashSet<NodeId>, current_fitness: f64) -> Option<(HashSet<NodeId>, f64)> {
        let removable: Vec<NodeId> = current
            .iter()
            .copied()
            .filter(|n| !self.fixed_nodes.contains(n))
            .filter(|&n| self.neighbours(n).iter().filter(|m| current.contains(m)).count() <= 1)
            .collect();

        let found = AtomicBool::new(false);
        let winner: Mutex<Option<(HashSet<NodeId>, f64)>> = Mutex::new(None);
        let commit = |candidate: HashSet<NodeId>, fitness: f64| {
            let mut winner = winner.lock();
            if winner.is_none() {
                *winner = Some((candidate, fitness));
                found.store(true, Ordering::Release);
            }
        };

        removable.par_iter().for_each(|&removed| {
            if found.load(Ordering::Acquire) {
                return;
            }
            let mut candidate = current.clone();
            candidate.remove(&removed);
            let fitness = (self.fitness)(&candidate);
            if fitness > current_fitness {
                commit(candidate, fitness);
                return;
            }

            let outside: HashSet<NodeId> = candidate
                .iter()
                .flat_map(|&n| self.neighbours(n).iter().copied())
                .filter(|n| *n != removed && !candidate.contains(n))
                .collect();
            for added in outside {
                if found.load(Ordering::Acquire) {
                    return;
                }
                candidate.insert(added);
                let fitness = (self.fitness)(&candidate);
                if fitness > current_fitness {
                    commit(candidate, fitness);
                    return;
                }
                candidate.remove(&added);
            }
        });
        winner.into_inner()
    }
}
