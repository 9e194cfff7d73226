use std::collections::HashSet;

use super::{shortest_two_edges, ReductionContext, ReductionTest};
use crate::voronoi::VoronoiPartition;

/// Contracts the shortest edge leaving the Voronoi region of a fixed target `z` if it starts at
/// `z` and every other edge leaving the region is at least as long as the path over it to the
/// next terminal.
#[derive(Debug, Default)]
pub struct ShortestLinksTest;

impl ReductionTest for ShortestLinksTest {
    fn name(&self) -> &'static str {
        "shortest links"
    }

    fn execute(&mut self, context: &mut ReductionContext) -> usize {
        let fixed = context.fixed_target_indices();
        if fixed.len() < 2 {
            return 0;
        }
        let voronoi = VoronoiPartition::calculate(&context.edge_set, &fixed);
        let mut dirty: HashSet<usize> = HashSet::new();
        let mut removed_nodes = 0;

        for z in fixed {
            if context.states.is_removed(z) || !context.states.is_fixed_target(z) || dirty.contains(&z) {
                continue;
            }
            let boundary = voronoi.boundary_edges(&context.edge_set, z);
            let (shortest, second_weight) = match boundary[..] {
                [] => continue,
                [only] => (only, u32::MAX),
                _ => match shortest_two_edges(&boundary) {
                    Some(pair) => pair,
                    None => continue,
                },
            };
            // Boundary edges start inside the region.
            if shortest.n1 != z {
                continue;
            }
            let w = shortest.n2;
            let (Some(base), Some(w_distance)) = (voronoi.base(w), voronoi.distance(w)) else {
                continue;
            };
            if dirty.contains(&base) {
                continue;
            }
            if u64::from(second_weight) < u64::from(shortest.weight) + u64::from(w_distance) {
                continue;
            }

            let (survivor, merged_neighbors) = context.merge_into(w, z);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reductions::test_support::{context, index_of};

    #[test]
    fn contracts_only_link_between_regions() {
        // Targets 0 and 4 with the branch point 2 between them: 0 - 2 directly and 2 - 3 - 4.
        let edges = [(0, 2), (2, 3), (3, 4), (2, 5), (0, 6), (0, 7), (4, 8), (4, 9)];
        let mut context = context(&edges, &[0, 4], &[]);
        let zero = index_of(&context, 0);
        let two = index_of(&context, 2);
        assert_eq!(context.edge_set.edges_of(zero).len(), 1);
        assert_eq!(ShortestLinksTest.execute(&mut context), 1);
        // The region of 4 is left only over 4 - 3 - 2.
        assert!(context.states.is_removed(two));
        let target = context.graph.get(4).unwrap();
        assert_eq!(context.graph.node(target).nodes(), &[2, 3, 4]);
        let four = index_of(&context, 4);
        assert_eq!(context.edge_set.get(zero, four).map(|e| e.weight), Some(1));
    }

    #[test]
    fn keeps_links_with_cheap_alternative() {
        // Targets 0 and 1 share two parallel links through the branch points 2 and 3.
        let edges = [(0, 2), (2, 1), (0, 3), (3, 1), (2, 4), (3, 5)];
        let mut context = context(&edges, &[0, 1], &[]);
        let before = context.edge_set.len();
        assert_eq!(ShortestLinksTest.execute(&mut context), 0);
        assert_eq!(context.edge_set.len(), before);
    }
}
