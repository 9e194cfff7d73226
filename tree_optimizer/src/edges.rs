use std::collections::BTreeMap;

use crate::distance::DenseDistances;
use crate::graph::{NodeRef, SearchGraph};
use crate::node_states::NodeStates;

/// Undirected weighted edge between two cache indices, `n1 < n2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphEdge {
    pub n1: usize,
    pub n2: usize,
    pub weight: u32,
}

impl GraphEdge {
    /// The endpoint that is not `node`.
    pub fn other(&self, node: usize) -> usize {
        if self.n1 == node {
            self.n2
        } else {
            self.n1
        }
    }
}

/// Edge of a spanning tree, pointing from the node already in the tree to the one it admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirectedGraphEdge {
    pub inside: usize,
    pub outside: usize,
}

impl DirectedGraphEdge {
    pub fn new(inside: usize, outside: usize) -> Self {
        DirectedGraphEdge { inside, outside }
    }
}

/// Set of weighted edges over the cache indices `0..size` with per-node neighbour lists.
#[derive(Debug, Clone)]
pub struct GraphEdgeSet {
    edges: BTreeMap<(usize, usize), u32>,
    adjacency: Vec<Vec<usize>>,
}

fn key(a: usize, b: usize) -> (usize, usize) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

impl GraphEdgeSet {
    pub fn new(size: usize) -> Self {
        GraphEdgeSet {
            edges: BTreeMap::new(),
            adjacency: vec![Vec::new(); size],
        }
    }

    /// Number of nodes the set was created for.
    pub fn size(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of edges.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Adds the edge. If it already exists the smaller weight is kept. Self-loops are ignored.
    pub fn add(&mut self, a: usize, b: usize, weight: u32) {
        if a == b {
            return;
        }
        let k = key(a, b);
        match self.edges.get_mut(&k) {
            Some(existing) => *existing = (*existing).min(weight),
            None => {
                self.edges.insert(k, weight);
                self.adjacency[a].push(b);
                self.adjacency[b].push(a);
            }
        }
    }

    /// Removes the edge and returns its weight.
    pub fn remove(&mut self, a: usize, b: usize) -> Option<u32> {
        let weight = self.edges.remove(&key(a, b))?;
        self.adjacency[a].retain(|&n| n != b);
        self.adjacency[b].retain(|&n| n != a);
        Some(weight)
    }

    pub fn get(&self, a: usize, b: usize) -> Option<GraphEdge> {
        let (n1, n2) = key(a, b);
        self.edges.get(&(n1, n2)).map(|&weight| GraphEdge { n1, n2, weight })
    }

    pub fn neighbors_of(&self, node: usize) -> &[usize] {
        &self.adjacency[node]
    }

    /// Edges incident to `node`, in neighbour order.
    pub fn edges_of(&self, node: usize) -> Vec<GraphEdge> {
        self.adjacency[node]
            .iter()
            .filter_map(|&n| self.get(node, n))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = GraphEdge> + '_ {
        self.edges
            .iter()
            .map(|(&(n1, n2), &weight)| GraphEdge { n1, n2, weight })
    }

    /// Removes every edge matching `predicate` and returns how many were removed.
    pub fn remove_where(&mut self, mut predicate: impl FnMut(&GraphEdge) -> bool) -> usize {
        let doomed: Vec<GraphEdge> = self.iter().filter(|e| predicate(e)).collect();
        for edge in &doomed {
            self.remove(edge.n1, edge.n2);
        }
        doomed.len()
    }

    /// Builds the edges between the tracked nodes of `graph`.
    ///
    /// From every tracked node each neighbour chain of untracked or non-target nodes with exactly
    /// two neighbours is followed to its end. The chain becomes an edge if it ends at a tracked
    /// node and is a shortest path between both ends; its weight is their distance.
    pub fn from_search_space(graph: &SearchGraph, distances: &DenseDistances, states: &NodeStates) -> Self {
        let mut edge_set = GraphEdgeSet::new(distances.nodes().len());
        let is_chain_link = |node: NodeRef| {
            let graph_node = graph.node(node);
            graph_node.adjacent().len() == 2
                && graph_node.distances_index().map_or(true, |i| !states.is_target(i))
        };
        for (i, &node) in distances.nodes().iter().enumerate() {
            for &neighbour in graph.node(node).adjacent() {
                let mut previous = node;
                let mut current = neighbour;
                let mut length = 1;
                while is_chain_link(current) && current != node {
                    let next = graph
                        .node(current)
                        .adjacent()
                        .iter()
                        .copied()
                        .find(|&n| n != previous);
                    match next {
                        Some(next) => {
                            previous = current;
                            current = next;
                            length += 1;
                        }
                        None => break,
                    }
                }
                let Some(j) = graph.node(current).distances_index() else {
                    continue;
                };
                // Only chains that are shortest paths are kept.
                if current != node && distances.are_connected(i, j) && distances.distance(i, j) == length {
                    edge_set.add(i, j, length);
                }
            }
        }
        edge_set
    }
}
