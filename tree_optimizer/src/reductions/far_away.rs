use super::{ReductionContext, ReductionTest};
use crate::distance::DistanceLookup;

/// Removes edges and non-targets that are farther away than the longest bottleneck Steiner
/// distance between two fixed targets. Only applies without variable targets.
#[derive(Debug, Default)]
pub struct FarAwayNonTerminalsTest;

impl ReductionTest for FarAwayNonTerminalsTest {
    fn name(&self) -> &'static str {
        "far away non terminals"
    }

    fn execute(&mut self, context: &mut ReductionContext) -> usize {
        let fixed = context.fixed_target_indices();
        if fixed.len() < 2 || context.states.variable_target_count() > 0 {
            return 0;
        }
        if context.bottleneck.is_none() {
            context.compute_bottleneck();
        }
        let Some(bottleneck) = context.bottleneck.as_ref() else {
            return 0;
        };

        let mut limit = 0;
        for (k, &a) in fixed.iter().enumerate() {
            for &b in &fixed[k + 1..] {
                limit = limit.max(bottleneck.distance(a, b));
            }
        }

        context.edge_set.remove_where(|edge| edge.weight > limit);

        let mut removed_nodes = 0;
        for i in 0..context.search_space_size() {
            if context.states.is_removed(i) || context.states.is_target(i) {
                continue;
            }
            if fixed.iter().all(|&t| context.distances.distance(i, t) >= limit) {
                context.isolate_node(i);
                removed_nodes += 1;
            }
        }
        removed_nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reductions::test_support::{context, index_of};

    // Targets 0 and 2 are neighbours of the branch point 1, which also leads to the branch
    // point 5 two hops away.
    const EDGES: [(u16, u16); 9] = [
        (0, 1),
        (1, 2),
        (1, 3),
        (3, 5),
        (5, 6),
        (5, 7),
        (1, 8),
        (0, 9),
        (2, 10),
    ];

    #[test]
    fn isolates_distant_branch_points() {
        let mut context = context(&EDGES, &[0, 2], &[]);
        let one = index_of(&context, 1);
        let five = index_of(&context, 5);
        assert_eq!(context.edge_set.get(one, five).map(|e| e.weight), Some(2));
        assert_eq!(FarAwayNonTerminalsTest.execute(&mut context), 1);
        assert!(context.states.is_removed(five));
        assert!(!context.states.is_removed(one));
        assert_eq!(context.edge_set.get(one, five), None);
        assert_eq!(context.edge_set.len(), 2);
    }

    #[test]
    fn skipped_with_variable_targets() {
        let mut context = context(&EDGES, &[0, 2], &[6]);
        let before = context.edge_set.len();
        assert_eq!(FarAwayNonTerminalsTest.execute(&mut context), 0);
        assert_eq!(context.edge_set.len(), before);
    }
}
