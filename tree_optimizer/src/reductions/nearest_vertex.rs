use std::collections::HashSet;

use super::{shortest_two_edges, ReductionContext, ReductionTest};
use crate::voronoi::VoronoiPartition;

/// Contracts the shortest edge `(z, v)` of a fixed target `z` if the second shortest edge of `z`
/// is at least as long as going over `v` to the terminal nearest to `v`.
#[derive(Debug, Default)]
pub struct NearestVertexTest;

impl ReductionTest for NearestVertexTest {
    fn name(&self) -> &'static str {
        "nearest vertex"
    }

    fn execute(&mut self, context: &mut ReductionContext) -> usize {
        let fixed = context.fixed_target_indices();
        if fixed.len() < 2 {
            return 0;
        }
        let voronoi = VoronoiPartition::calculate(&context.edge_set, &fixed);
        // Regions touched by a merge, their distances are stale.
        let mut dirty: HashSet<usize> = HashSet::new();
        let mut removed_nodes = 0;

        for z in fixed {
            if context.states.is_removed(z) || !context.states.is_fixed_target(z) || dirty.contains(&z) {
                continue;
            }
            let edges = context.edge_set.edges_of(z);
            let Some((shortest, second_weight)) = shortest_two_edges(&edges) else {
                continue;
            };
            let v = shortest.other(z);
            let (Some(base), Some(v_distance)) = (voronoi.base(v), voronoi.distance(v)) else {
                continue;
            };
            if base == z || dirty.contains(&base) {
                continue;
            }
            if u64::from(second_weight) < u64::from(shortest.weight) + u64::from(v_distance) {
                continue;
            }

            let (survivor, merged_neighbors) = context.merge_into(v, z);
            dirty.insert(z);
            dirty.insert(base);
            let touched = merged_neighbors
                .iter()
                .chain(context.edge_set.neighbors_of(survivor))
                .filter_map(|&n| voronoi.base(n));
            dirty.extend(touched);
            removed_nodes += 1;
        }
        removed_nodes
    }
}
