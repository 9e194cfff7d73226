//! Minimal spanning trees over a subset of cache indices.

use std::collections::HashSet;

use crate::disjoint_set::DisjointSet;
use crate::distance::{DenseDistances, DistanceLookup};
use crate::edges::DirectedGraphEdge;
use crate::graph::{NodeId, SearchGraph};
use crate::priority_queue::LinkedListPriorityQueue;

/// Builds the minimal spanning tree between `mst_nodes` using the distances as edge weights.
pub struct MinimalSpanningTree<'a, D> {
    mst_nodes: Vec<usize>,
    distances: &'a D,
    spanning_edges: Vec<DirectedGraphEdge>,
}

impl<'a, D: DistanceLookup> MinimalSpanningTree<'a, D> {
    pub fn new(mst_nodes: Vec<usize>, distances: &'a D) -> Self {
        MinimalSpanningTree {
            mst_nodes,
            distances,
            spanning_edges: Vec::new(),
        }
    }

    /// Edges of the last spanned tree.
    pub fn spanning_edges(&self) -> &[DirectedGraphEdge] {
        &self.spanning_edges
    }

    pub fn into_spanning_edges(self) -> Vec<DirectedGraphEdge> {
        self.spanning_edges
    }

    /// Sum of the distances along the spanning edges.
    pub fn total_weight(&self) -> u64 {
        self.spanning_edges
            .iter()
            .map(|e| u64::from(self.distances.distance(e.inside, e.outside)))
            .sum()
    }

    /// Prim's algorithm starting at `start`. Quadratic in the number of spanned nodes.
    pub fn span(&mut self, start: usize) {
        let node_count = self.mst_nodes.len();
        self.spanning_edges = Vec::with_capacity(node_count);
        let mut is_included = vec![false; self.distances.cache_size()];
        let mut queue = LinkedListPriorityQueue::new(100, node_count * node_count);

        let mut not_included: Vec<usize> = Vec::with_capacity(node_count);
        for &t in &self.mst_nodes {
            if t != start && !not_included.contains(&t) {
                not_included.push(t);
                queue.enqueue(DirectedGraphEdge::new(start, t), self.distances.distance(start, t));
            }
        }
        is_included[start] = true;

        while !not_included.is_empty() {
            // Skip edges whose outside node was admitted in the meantime.
            let shortest = loop {
                match queue.dequeue() {
                    Some(edge) if is_included[edge.outside] => continue,
                    other => break other,
                }
            };
            let Some(shortest) = shortest else {
                break;
            };
            let new_in = shortest.outside;
            self.spanning_edges.push(shortest);
            is_included[new_in] = true;

            not_included.retain(|&n| n != new_in);
            for &other in &not_included {
                queue.enqueue(DirectedGraphEdge::new(new_in, other), self.distances.distance(new_in, other));
            }
        }
    }

    /// Kruskal's algorithm over edges ordered by ascending distance. Edges with an endpoint outside
    /// of the spanned nodes are skipped. Linear in the number of edges.
    pub fn span_ordered(&mut self, ordered_edges: &[DirectedGraphEdge]) {
        self.spanning_edges = Vec::with_capacity(self.mst_nodes.len());
        let mut to_add = self.mst_nodes.len().saturating_sub(1);
        if to_add == 0 {
            return;
        }
        let mut set = DisjointSet::new(self.distances.cache_size());
        let mut considered = vec![false; self.distances.cache_size()];
        for &t in &self.mst_nodes {
            considered[t] = true;
        }
        for &edge in ordered_edges {
            if !considered[edge.inside] || !considered[edge.outside] {
                continue;
            }
            if !set.union(edge.inside, edge.outside) {
                continue;
            }
            self.spanning_edges.push(edge);
            to_add -= 1;
            if to_add == 0 {
                break;
            }
        }
    }
}

impl MinimalSpanningTree<'_, DenseDistances> {
    /// Ids of every node the tree uses: the spanned nodes and the paths behind the spanning edges.
    pub fn used_nodes(&self, graph: &SearchGraph) -> HashSet<NodeId> {
        let mut used = HashSet::new();
        for &index in &self.mst_nodes {
            let node = self.distances.index_to_node(index);
            used.extend(graph.node(node).nodes().iter().copied());
        }
        for edge in &self.spanning_edges {
            if let Some(path) = self.distances.shortest_path(edge.inside, edge.outside) {
                used.extend(path.iter().copied());
            }
        }
        used
    }
}

/// All edges between `nodes` in ascending distance order, as expected by
/// [`MinimalSpanningTree::span_ordered`].
pub fn ordered_edges<D: DistanceLookup>(distances: &D, nodes: &[usize]) -> Vec<DirectedGraphEdge> {
    let pair_count = nodes.len() * nodes.len().saturating_sub(1) / 2;
    let mut queue = LinkedListPriorityQueue::new(100, pair_count);
    for (k, &a) in nodes.iter().enumerate() {
        for &b in &nodes[k + 1..] {
            queue.enqueue(DirectedGraphEdge::new(a, b), distances.distance(a, b));
        }
    }
    queue.collect()
}
