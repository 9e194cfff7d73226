//! Shrinks a search graph before the expensive optimization runs.
//!
//! The start node and every fixed target survive preprocessing, merged nodes keep representing
//! the ids that were contracted into them.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::distance::{DenseDistances, DistanceCache};
use crate::edges::GraphEdgeSet;
use crate::error::{OptimizerError, Result};
use crate::graph::{NodeId, NodeRef, SearchGraph};
use crate::mst::MinimalSpanningTree;
use crate::node_states::NodeStates;
use crate::reductions::{
    DegreeTest, Eliminations, FarAwayNonTerminalsTest, NearestVertexTest, NonTerminalsOfDegreeKTest,
    PathsWithManyTerminalsTest, Reduction, ReductionContext, ShortestLinksTest,
};

/// Upper bound on reduction rounds. Later rounds rarely eliminate anything.
const MAX_ROUNDS: usize = 9;

/// The search space left after preprocessing.
#[derive(Debug)]
pub struct ReducedSearchSpace {
    pub graph: SearchGraph,
    /// Surviving nodes in cache-index order.
    pub nodes: Vec<NodeRef>,
    /// Surviving fixed targets in cache-index order. Includes the start node.
    pub fixed_targets: Vec<NodeRef>,
    pub variable_targets: Vec<NodeRef>,
    pub start: NodeRef,
    pub distances: DenseDistances,
    pub edge_set: GraphEdgeSet,
    /// Ids used by the spanning tree over the fixed targets before any reduction.
    pub least_solution: HashSet<NodeId>,
}

impl ReducedSearchSpace {
    pub fn search_space_size(&self) -> usize {
        self.nodes.len()
    }

    pub fn start_index(&self) -> usize {
        self.graph.node(self.start).distances_index().unwrap_or(0)
    }

    pub fn fixed_target_indices(&self) -> Vec<usize> {
        self.fixed_targets
            .iter()
            .filter_map(|&n| self.graph.node(n).distances_index())
            .collect()
    }

    /// Indices of every surviving node that is not a fixed target, ascending.
    pub fn candidate_indices(&self) -> Vec<usize> {
        let fixed: HashSet<NodeRef> = self.fixed_targets.iter().copied().collect();
        (0..self.nodes.len()).filter(|&i| !fixed.contains(&self.nodes[i])).collect()
    }
}

/// Runs the reduction pipeline over one graph.
#[derive(Debug)]
pub struct SteinerPreprocessor {
    graph: SearchGraph,
    fixed_targets: Vec<NodeRef>,
    start: Option<NodeRef>,
    variable_targets: Vec<NodeRef>,
    distance_cache: DistanceCache,
}

impl SteinerPreprocessor {
    /// `start` defaults to the fixed target with the smallest id and must itself be a fixed
    /// target. Variable targets that are also fixed are treated as fixed.
    pub fn new(
        graph: SearchGraph,
        fixed_targets: Vec<NodeRef>,
        start: Option<NodeRef>,
        variable_targets: Vec<NodeRef>,
    ) -> Self {
        SteinerPreprocessor {
            graph,
            fixed_targets,
            start,
            variable_targets,
            distance_cache: DistanceCache::default(),
        }
    }

    /// Reuses distances computed earlier for the same graph.
    pub fn with_distance_cache(mut self, distance_cache: DistanceCache) -> Self {
        self.distance_cache = distance_cache;
        self
    }

    pub fn reduce_search_space(self) -> Result<ReducedSearchSpace> {
        let SteinerPreprocessor {
            mut graph,
            mut fixed_targets,
            start,
            variable_targets,
            distance_cache,
        } = self;

        fixed_targets.sort_unstable();
        fixed_targets.dedup();
        if fixed_targets.is_empty() {
            return Err(OptimizerError::NoTargets);
        }
        let start = match start {
            Some(start) => start,
            None => fixed_targets
                .iter()
                .copied()
                .min_by_key(|&n| graph.node(n).id())
                .ok_or(OptimizerError::NoTargets)?,
        };
        if !fixed_targets.contains(&start) {
            return Err(OptimizerError::invalid("start", "the start node must be a fixed target"));
        }
        let fixed: HashSet<NodeRef> = fixed_targets.iter().copied().collect();
        let mut variable: Vec<NodeRef> = variable_targets.into_iter().filter(|n| !fixed.contains(n)).collect();
        variable.sort_unstable();
        variable.dedup();

        // Nodes with at most two neighbours are never branch points, paths through them are
        // represented by the cached shortest paths.
        let (mut nodes, fixed_nodes): (Vec<NodeRef>, Vec<NodeRef>) = graph
            .live_nodes()
            .map(|(n, _)| n)
            .filter(|&n| graph.degree(n) > 2 || fixed.contains(&n) || variable.contains(&n))
            .partition(|n| !fixed.contains(n));
        nodes.extend(fixed_nodes);
        info!(
            graph_nodes = graph.live_nodes().count(),
            search_space = nodes.len(),
            fixed_targets = fixed_targets.len(),
            variable_targets = variable.len(),
            "reducing search space"
        );

        let mut distances = distance_cache.calculate_fully(&mut graph, &nodes);
        let index_of = |graph: &SearchGraph, n: NodeRef| graph.node(n).distances_index().unwrap_or(0);
        let start_index = index_of(&graph, start);
        for &target in &fixed_targets {
            if !distances.are_connected(start_index, index_of(&graph, target)) {
                return Err(OptimizerError::GraphNotConnected {
                    from: graph.node(start).id(),
                    to: graph.node(target).id(),
                });
            }
        }

        let fixed_indices: Vec<usize> = fixed_targets.iter().map(|&n| index_of(&graph, n)).collect();
        let (least_solution, limit) = {
            let mut mst = MinimalSpanningTree::new(fixed_indices.clone(), &distances);
            mst.span(start_index);
            let longest_edge = mst
                .spanning_edges()
                .iter()
                .map(|e| distances.distance(e.inside, e.outside))
                .max();
            let limit = match longest_edge {
                Some(longest) if variable.is_empty() => longest,
                _ => u32::MAX,
            };
            (mst.used_nodes(&graph), limit)
        };

        let removed: Vec<NodeRef> = nodes
            .iter()
            .enumerate()
            .filter(|&(i, n)| {
                if !distances.are_connected(start_index, i) {
                    return true;
                }
                !fixed.contains(n)
                    && !variable.contains(n)
                    && fixed_indices.iter().all(|&t| distances.distance(i, t) >= limit)
            })
            .map(|(_, &n)| n)
            .collect();
        let remaining = distances.remove_nodes(&mut graph, &removed);
        variable.retain(|n| graph.node(*n).distances_index().is_some());
        debug!(removed_nodes = removed.len(), "removed unreachable and distant nodes");

        let states = NodeStates::new(&remaining, fixed_targets.iter().copied(), variable.iter().copied());
        let edge_set = GraphEdgeSet::from_search_space(&graph, &distances, &states);
        let mut context = ReductionContext::new(graph, distances, edge_set, states, start);

        if variable.is_empty() {
            run_reductions(&mut context);
        }

        let (graph, distances, edge_set, states) = context.into_parts();
        let nodes = states.search_space().to_vec();
        let fixed_targets: Vec<NodeRef> = states.fixed_target_indices().map(|i| nodes[i]).collect();
        let variable_targets: Vec<NodeRef> = nodes
            .iter()
            .enumerate()
            .filter(|&(i, _)| states.is_variable_target(i))
            .map(|(_, &n)| n)
            .collect();
        info!(
            search_space = nodes.len(),
            edges = edge_set.len(),
            fixed_targets = fixed_targets.len(),
            "reduced search space"
        );
        Ok(ReducedSearchSpace {
            graph,
            nodes,
            fixed_targets,
            variable_targets,
            start,
            distances,
            edge_set,
            least_solution,
        })
    }
}

/// Runs the degree test once, then rounds of all other tests until a round eliminates no edge.
/// A test that eliminates nothing is not run again. The degree test follows every other test.
fn run_reductions(context: &mut ReductionContext) {
    let mut degree = Reduction::new(DegreeTest);
    let mut eliminations = Eliminations::default();
    degree.run(context, &mut eliminations);
    context.contract();

    let mut reductions = vec![
        Reduction::new(PathsWithManyTerminalsTest),
        Reduction::new(NonTerminalsOfDegreeKTest),
        Reduction::new(FarAwayNonTerminalsTest),
        Reduction::new(NearestVertexTest),
        Reduction::new(ShortestLinksTest),
    ];
    for round in 1..=MAX_ROUNDS {
        context.compute_bottleneck();
        let mut eliminations = Eliminations::default();
        for reduction in &mut reductions {
            if !reduction.is_enabled() {
                continue;
            }
            if !reduction.run(context, &mut eliminations) {
                reduction.set_enabled(false);
                debug!(test = reduction.name(), round, "disabled reduction test");
            }
            degree.run(context, &mut eliminations);
        }
        context.contract();
        debug!(
            round,
            removed_nodes = eliminations.nodes,
            removed_edges = eliminations.edges,
            search_space = context.search_space_size(),
            "finished reduction round"
        );
        if eliminations.edges == 0 {
            break;
        }
    }
}
