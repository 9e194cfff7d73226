use super::{ReductionContext, ReductionTest};
use crate::distance::DistanceLookup;

/// Drops every edge that is longer than the bottleneck Steiner distance between its endpoints.
/// Such an edge can always be replaced by a path whose segments between fixed targets are shorter.
#[derive(Debug, Default)]
pub struct PathsWithManyTerminalsTest;

impl ReductionTest for PathsWithManyTerminalsTest {
    fn name(&self) -> &'static str {
        "paths with many terminals"
    }

    fn execute(&mut self, context: &mut ReductionContext) -> usize {
        if context.bottleneck.is_none() {
            context.compute_bottleneck();
        }
        let Some(bottleneck) = context.bottleneck.as_ref() else {
            return 0;
        };
        context
            .edge_set
            .remove_where(|edge| edge.weight > bottleneck.distance(edge.n1, edge.n2));
        0
    }
}
