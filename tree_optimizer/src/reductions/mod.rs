//! Reduction tests for the Steiner tree problem.
//!
//! Every test removes nodes or edges that provably are not needed by at least one optimal
//! Steiner tree. Nodes are only ever merged into fixed targets, so a node either represents a
//! single original node or is a fixed target.

mod degree;
mod degree_k;
mod far_away;
mod nearest_vertex;
mod paths_many_terminals;
mod shortest_links;

use tracing::debug;

pub use degree::DegreeTest;
pub use degree_k::NonTerminalsOfDegreeKTest;
pub use far_away::FarAwayNonTerminalsTest;
pub use nearest_vertex::NearestVertexTest;
pub use paths_many_terminals::PathsWithManyTerminalsTest;
pub use shortest_links::ShortestLinksTest;

use crate::bottleneck::BottleneckSteinerDistances;
use crate::distance::DenseDistances;
use crate::edges::{GraphEdge, GraphEdgeSet};
use crate::graph::{NodeRef, SearchGraph};
use crate::node_states::NodeStates;

/// Mutable state of one preprocessing run, shared by all reduction tests.
#[derive(Debug)]
pub struct ReductionContext {
    pub graph: SearchGraph,
    pub distances: DenseDistances,
    pub edge_set: GraphEdgeSet,
    pub states: NodeStates,
    /// Bottleneck Steiner distances of the current round.
    pub bottleneck: Option<BottleneckSteinerDistances>,
    start: NodeRef,
}

impl ReductionContext {
    pub fn new(
        graph: SearchGraph,
        distances: DenseDistances,
        edge_set: GraphEdgeSet,
        states: NodeStates,
        start: NodeRef,
    ) -> Self {
        ReductionContext {
            graph,
            distances,
            edge_set,
            states,
            bottleneck: None,
            start,
        }
    }

    pub fn start(&self) -> NodeRef {
        self.start
    }

    pub fn into_parts(self) -> (SearchGraph, DenseDistances, GraphEdgeSet, NodeStates) {
        (self.graph, self.distances, self.edge_set, self.states)
    }

    /// Cache index of the start node. The start node is never removed.
    pub fn start_index(&self) -> usize {
        self.graph.node(self.start).distances_index().unwrap_or(0)
    }

    pub fn search_space_size(&self) -> usize {
        self.distances.nodes().len()
    }

    pub fn fixed_target_indices(&self) -> Vec<usize> {
        self.states.fixed_target_indices().collect()
    }

    /// Removes a non-target node with at most two neighbours. With two neighbours, they get
    /// connected directly if that edge is not longer than their distance.
    pub fn remove_node(&mut self, index: usize) {
        debug_assert!(!self.states.is_target(index), "target nodes can't be removed");
        let neighbors = self.edge_set.neighbors_of(index).to_vec();
        match neighbors[..] {
            [] => {}
            [only] => {
                self.edge_set.remove(index, only);
            }
            [left, right] => {
                let left_weight = self.edge_set.remove(index, left).unwrap_or(0);
                let right_weight = self.edge_set.remove(index, right).unwrap_or(0);
                let weight = left_weight + right_weight;
                if weight <= self.distances.distance(left, right) {
                    self.edge_set.add(left, right, weight);
                }
            }
            _ => {
                debug_assert!(false, "removing nodes with more than two neighbours is not supported");
                return;
            }
        }
        self.states.mark_node_as_removed(index);
    }

    /// Removes a non-target node together with all of its edges.
    pub fn isolate_node(&mut self, index: usize) {
        for neighbor in self.edge_set.neighbors_of(index).to_vec() {
            self.edge_set.remove(index, neighbor);
        }
        self.states.mark_node_as_removed(index);
    }

    /// Contracts `x` into the fixed target `into`. If `x` is the start node the roles are
    /// swapped so that the start node survives.
    ///
    /// Returns the surviving index and the former neighbours of the merged-away node.
    pub fn merge_into(&mut self, x: usize, into: usize) -> (usize, Vec<usize>) {
        let (x, into) = if x == self.start_index() { (into, x) } else { (x, into) };
        debug_assert!(self.states.is_fixed_target(into), "nodes can only be merged into fixed targets");

        let path: Vec<_> = self.distances.shortest_path(x, into).map(<[_]>::to_vec).unwrap_or_default();
        self.graph.merge_nodes(self.distances.index_to_node(into), self.distances.index_to_node(x), &path);
        self.distances.merge_into(x, into);

        self.edge_set.remove(x, into);
        let x_neighbors = self.edge_set.neighbors_of(x).to_vec();
        let mut neighbors = self.edge_set.neighbors_of(into).to_vec();
        for &neighbor in &x_neighbors {
            self.edge_set.remove(x, neighbor);
            if !neighbors.contains(&neighbor) {
                neighbors.push(neighbor);
            }
        }
        for neighbor in neighbors {
            let weight = self.distances.distance(into, neighbor);
            self.edge_set.add(into, neighbor, weight);
        }

        self.states.mark_node_as_removed(x);
        (into, x_neighbors)
    }

    /// Drops removed nodes from the cache and renumbers everything that remains.
    pub fn contract(&mut self) {
        let edges: Vec<(NodeRef, NodeRef, u32)> = self
            .edge_set
            .iter()
            .map(|e| (self.distances.index_to_node(e.n1), self.distances.index_to_node(e.n2), e.weight))
            .collect();
        let removed = self.states.removed_nodes();
        let remaining = self.distances.remove_nodes(&mut self.graph, &removed);
        self.states.set_search_space(&remaining);
        self.edge_set = GraphEdgeSet::new(remaining.len());
        for (a, b, weight) in edges {
            if let (Some(i), Some(j)) = (self.graph.node(a).distances_index(), self.graph.node(b).distances_index()) {
                self.edge_set.add(i, j, weight);
            }
        }
        self.bottleneck = None;
    }

    /// Recomputes the bottleneck Steiner distances for the current fixed targets.
    pub fn compute_bottleneck(&mut self) {
        let fixed = self.fixed_target_indices();
        self.bottleneck = Some(BottleneckSteinerDistances::calculate(&self.distances, &fixed));
    }
}

/// The shortest edge and the weight of the second shortest edge. Needs at least two edges.
pub(crate) fn shortest_two_edges(edges: &[GraphEdge]) -> Option<(GraphEdge, u32)> {
    let (&first, &second) = (edges.first()?, edges.get(1)?);
    let (mut shortest, mut second_weight) = if first.weight <= second.weight {
        (first, second.weight)
    } else {
        (second, first.weight)
    };
    for &edge in &edges[2..] {
        if edge.weight < shortest.weight {
            second_weight = shortest.weight;
            shortest = edge;
        } else if edge.weight < second_weight {
            second_weight = edge.weight;
        }
    }
    Some((shortest, second_weight))
}

/// A single reduction test.
pub trait ReductionTest: Send {
    fn name(&self) -> &'static str;

    /// Runs the test once and returns the number of removed nodes.
    fn execute(&mut self, context: &mut ReductionContext) -> usize;
}

/// Node and edge eliminations of one preprocessing round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Eliminations {
    pub nodes: usize,
    pub edges: usize,
}

/// A reduction test together with its run bookkeeping.
pub struct Reduction {
    test: Box<dyn ReductionTest>,
    enabled: bool,
    iteration: usize,
}

impl Reduction {
    pub fn new(test: impl ReductionTest + 'static) -> Self {
        Reduction {
            test: Box::new(test),
            enabled: true,
            iteration: 0,
        }
    }

    pub fn name(&self) -> &'static str {
        self.test.name()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Runs the test if enabled and adds its eliminations. Returns whether edges were eliminated.
    pub fn run(&mut self, context: &mut ReductionContext, eliminations: &mut Eliminations) -> bool {
        if !self.enabled {
            return false;
        }
        let edge_count_before = context.edge_set.len();
        let removed_nodes = self.test.execute(context);
        let removed_edges = edge_count_before.saturating_sub(context.edge_set.len());
        self.iteration += 1;
        debug!(
            test = self.test.name(),
            iteration = self.iteration,
            removed_nodes,
            removed_edges,
            "ran reduction test"
        );
        eliminations.nodes += removed_nodes;
        eliminations.edges += removed_edges;
        removed_edges > 0
    }
}
