use super::{ReductionContext, ReductionTest};
use crate::bottleneck::BottleneckSteinerDistances;
use crate::distance::DistanceLookup;
use crate::edges::GraphEdge;
use crate::mst::MinimalSpanningTree;

const MIN_DEGREE: usize = 3;
const MAX_DEGREE: usize = 6;

/// Removes non-targets of small degree whose neighbours are always connected at least as cheaply
/// without them. For every subset of at least three neighbours, the edges to the node must not
/// be cheaper than a spanning tree of the subset under bottleneck Steiner distances.
#[derive(Debug, Default)]
pub struct NonTerminalsOfDegreeKTest;

impl ReductionTest for NonTerminalsOfDegreeKTest {
    fn name(&self) -> &'static str {
        "non terminals of degree k"
    }

    fn execute(&mut self, context: &mut ReductionContext) -> usize {
        if context.bottleneck.is_none() {
            context.compute_bottleneck();
        }
        let Some(bottleneck) = context.bottleneck.take() else {
            return 0;
        };
        let mut removed_nodes = 0;
        for i in 0..context.search_space_size() {
            if context.states.is_removed(i) || context.states.is_target(i) {
                continue;
            }
            let edges = context.edge_set.edges_of(i);
            if !(MIN_DEGREE..=MAX_DEGREE).contains(&edges.len()) {
                continue;
            }
            if !is_replaceable(i, &edges, &bottleneck) {
                continue;
            }

            for edge in &edges {
                context.edge_set.remove(edge.n1, edge.n2);
            }
            for (k, first) in edges.iter().enumerate() {
                for second in &edges[k + 1..] {
                    let (a, b) = (first.other(i), second.other(i));
                    let weight = first.weight + second.weight;
                    if weight <= bottleneck.distance(a, b) {
                        context.edge_set.add(a, b, weight);
                    }
                }
            }
            context.states.mark_node_as_removed(i);
            removed_nodes += 1;
        }
        context.bottleneck = Some(bottleneck);
        removed_nodes
    }
}

/// True if no subset of at least three neighbours reaches them more cheaply through `node` than
/// through their spanning tree.
fn is_replaceable(node: usize, edges: &[GraphEdge], bottleneck: &BottleneckSteinerDistances) -> bool {
    let degree = edges.len();
    for mask in 1u32..(1 << degree) {
        if (mask.count_ones() as usize) < MIN_DEGREE {
            continue;
        }
        let subset: Vec<&GraphEdge> = (0..degree)
            .filter(|&k| mask & (1 << k) != 0)
            .map(|k| &edges[k])
            .collect();
        let edge_sum: u64 = subset.iter().map(|e| u64::from(e.weight)).sum();
        let neighbors: Vec<usize> = subset.iter().map(|e| e.other(node)).collect();
        let start = neighbors[0];
        let mut mst = MinimalSpanningTree::new(neighbors, bottleneck);
        mst.span(start);
        if edge_sum < mst.total_weight() {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reductions::test_support::{context, index_of};

    #[test]
    fn removes_hub_between_close_targets() {
        // Hub 4 joins the targets 0, 1, 2, which also form the triangle 0 - 1 - 2.
        let edges = [(4, 0), (4, 1), (4, 2), (0, 1), (1, 2), (2, 0)];
        let mut context = context(&edges, &[0, 1, 2], &[]);
        let hub = index_of(&context, 4);
        assert_eq!(context.edge_set.neighbors_of(hub).len(), 3);
        assert_eq!(NonTerminalsOfDegreeKTest.execute(&mut context), 1);
        assert!(context.states.is_removed(hub));
        assert!(context.edge_set.neighbors_of(hub).is_empty());
        // The detours through the hub are longer than the direct target edges.
        assert_eq!(context.edge_set.len(), 3);
    }

    #[test]
    fn keeps_hub_of_a_star() {
        // Targets 1, 2, 3 only meet at the hub 0, their leaves keep them tracked.
        let edges = [(0, 1), (0, 2), (0, 3), (1, 4), (1, 5), (2, 6), (2, 7), (3, 8), (3, 9)];
        let mut context = context(&edges, &[1, 2, 3], &[]);
        let hub = index_of(&context, 0);
        assert_eq!(NonTerminalsOfDegreeKTest.execute(&mut context), 0);
        assert!(!context.states.is_removed(hub));
        assert_eq!(context.edge_set.neighbors_of(hub).len(), 3);
    }
}
