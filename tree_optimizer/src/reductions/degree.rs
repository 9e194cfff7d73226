use std::collections::{BTreeSet, HashMap};

use super::{ReductionContext, ReductionTest};

/// Removes non-targets with at most two neighbours and merges fixed targets with the neighbours
/// every optimal tree must connect them through.
#[derive(Debug, Default)]
pub struct DegreeTest;

impl ReductionTest for DegreeTest {
    fn name(&self) -> &'static str {
        "degree"
    }

    fn execute(&mut self, context: &mut ReductionContext) -> usize {
        let mut removed_nodes = 0;
        let mut untested: BTreeSet<usize> = (0..context.search_space_size()).collect();
        // Fixed targets waiting on the neighbour they depend on to be tested first.
        let mut dependent_nodes: HashMap<usize, Vec<usize>> = HashMap::new();

        while let Some(i) = untested.pop_first() {
            if context.states.is_removed(i) {
                continue;
            }
            let neighbors = context.edge_set.neighbors_of(i).to_vec();

            if !context.states.is_target(i) {
                if neighbors.len() <= 2 {
                    // Such a node is never a branch point, a path through it is kept as an edge.
                    untested.extend(neighbors.iter().copied());
                    context.remove_node(i);
                    removed_nodes += 1;
                }
            } else if context.states.is_fixed_target(i) {
                if let [other] = neighbors[..] {
                    let other_degree = context.edge_set.neighbors_of(other).len();
                    if other_degree > 2 || context.states.is_target(other) {
                        // The only edge of a fixed target is always taken.
                        let (survivor, merged_neighbors) = context.merge_into(other, i);
                        untested.remove(&other);
                        untested.remove(&i);
                        untested.insert(survivor);
                        untested.extend(merged_neighbors);
                        removed_nodes += 1;
                    } else {
                        // other might be a dead end, it has to be tested first.
                        dependent_nodes.entry(other).or_default().push(i);
                    }
                } else if neighbors.len() > 1 {
                    // An edge of minimum cost between two fixed targets is in some optimal tree.
                    let minimum_cost = neighbors
                        .iter()
                        .map(|&other| context.distances.distance(i, other))
                        .min()
                        .unwrap_or(u32::MAX);
                    let target_neighbor = neighbors.iter().copied().find(|&other| {
                        context.distances.distance(i, other) == minimum_cost
                            && context.states.is_fixed_target(other)
                    });
                    if let Some(other) = target_neighbor {
                        let (survivor, merged_neighbors) = context.merge_into(other, i);
                        untested.remove(&other);
                        untested.remove(&i);
                        untested.insert(survivor);
                        untested.extend(merged_neighbors);
                        removed_nodes += 1;
                    }
                }
            }

            if let Some(dependent) = dependent_nodes.remove(&i) {
                untested.extend(dependent);
            }
        }
        removed_nodes
    }
}
