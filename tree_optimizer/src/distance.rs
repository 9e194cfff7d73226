//! Shortest path distances between graph nodes.
//!
//! The graph is unweighted, so distances are edge counts found by breadth-first flood fills.
//! [`SparseDistances`] answers single queries lazily, [`DenseDistances`] holds the full matrix
//! over every node of a search space. [`DistanceCache`] is the cache in either state.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use nalgebra::DMatrix;
use rayon::prelude::*;
use tracing::debug;

use crate::error::{OptimizerError, Result};
use crate::graph::{NodeId, NodeRef, SearchGraph};

/// Ids of the nodes strictly between two endpoints of a shortest path.
pub type Path = Arc<[NodeId]>;

/// Symmetric distances between nodes addressed by their dense index in `0..cache_size()`.
pub trait DistanceLookup {
    fn cache_size(&self) -> usize;

    fn distance(&self, a: usize, b: usize) -> u32;
}

/// Breadth-first flood from `start`. `visit` is called once for every newly found node with its
/// distance and the predecessor table; returning false stops the flood.
fn flood_fill<F>(graph: &SearchGraph, start: NodeRef, mut visit: F)
where
    F: FnMut(NodeRef, u32, &[Option<NodeRef>]) -> bool,
{
    let mut visited = vec![false; graph.len()];
    let mut predecessors: Vec<Option<NodeRef>> = vec![None; graph.len()];
    visited[start.0] = true;
    let mut front = vec![start];
    let mut distance = 0;
    while !front.is_empty() {
        distance += 1;
        let mut new_front = Vec::new();
        for &node in &front {
            for &adjacent in graph.node(node).adjacent() {
                if visited[adjacent.0] {
                    continue;
                }
                visited[adjacent.0] = true;
                predecessors[adjacent.0] = Some(node);
                if !visit(adjacent, distance, &predecessors) {
                    return;
                }
                new_front.push(adjacent);
            }
        }
        front = new_front;
    }
}

/// Reads the path from `target` back to `start` out of the predecessor table.
fn read_path(
    graph: &SearchGraph,
    start: NodeRef,
    target: NodeRef,
    predecessors: &[Option<NodeRef>],
) -> Path {
    let mut path = Vec::new();
    let mut current = predecessors[target.0];
    while let Some(node) = current {
        if node == start {
            break;
        }
        path.push(graph.node(node).id());
        current = predecessors[node.0];
    }
    path.into()
}

fn empty_path() -> Path {
    Arc::from(Vec::new())
}

/// Lazily filled distances, one flood fill per unseen pair.
#[derive(Debug, Clone, Default)]
pub struct SparseDistances {
    entries: HashMap<(NodeRef, NodeRef), (u32, Path)>,
}

impl SparseDistances {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(a: NodeRef, b: NodeRef) -> (NodeRef, NodeRef) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    fn lookup(&mut self, graph: &SearchGraph, a: NodeRef, b: NodeRef) -> Result<(u32, Path)> {
        if a == b {
            return Ok((0, empty_path()));
        }
        let key = Self::key(a, b);
        if let Some((distance, path)) = self.entries.get(&key) {
            return Ok((*distance, Arc::clone(path)));
        }
        let mut found = None;
        flood_fill(graph, a, |node, distance, predecessors| {
            if node == b {
                found = Some((distance, read_path(graph, a, b, predecessors)));
                return false;
            }
            true
        });
        let entry = found.ok_or(OptimizerError::GraphNotConnected {
            from: graph.node(a).id(),
            to: graph.node(b).id(),
        })?;
        self.entries.insert(key, entry.clone());
        Ok(entry)
    }

    /// Number of edges on a shortest path between `a` and `b`.
    pub fn distance(&mut self, graph: &SearchGraph, a: NodeRef, b: NodeRef) -> Result<u32> {
        Ok(self.lookup(graph, a, b)?.0)
    }

    /// Ids strictly between `a` and `b` on a shortest path.
    pub fn shortest_path(&mut self, graph: &SearchGraph, a: NodeRef, b: NodeRef) -> Result<Path> {
        Ok(self.lookup(graph, a, b)?.1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Computes all distances between `nodes` and switches to the dense representation.
    ///
    /// `nodes` get their distances index set to their position in the slice; every other node of
    /// the graph loses its index. Pairs that cannot be connected keep distance 0 and no path.
    pub fn calculate_fully(self, graph: &mut SearchGraph, nodes: &[NodeRef]) -> DenseDistances {
        for node in graph.refs().collect::<Vec<_>>() {
            graph.node_mut(node).set_distances_index(None);
        }
        for (i, &node) in nodes.iter().enumerate() {
            graph.node_mut(node).set_distances_index(Some(i));
        }
        let graph: &SearchGraph = graph;
        let size = nodes.len();

        let mut dense = DenseDistances {
            distances: DMatrix::from_element(size, size, 0),
            paths: DMatrix::from_element(size, size, None),
            nodes: nodes.to_vec(),
        };
        for i in 0..size {
            dense.paths[(i, i)] = Some(empty_path());
        }
        for ((a, b), (distance, path)) in self.entries {
            if let (Some(i), Some(j)) = (graph.node(a).distances_index(), graph.node(b).distances_index()) {
                dense.set(i, j, distance, Some(path));
            }
        }

        // Each row only needs the nodes with a higher index, the matrix is symmetric.
        let rows: Vec<Vec<(usize, u32, Path)>> = nodes
            .par_iter()
            .enumerate()
            .map(|(i, &start)| {
                let mut row = Vec::new();
                let mut remaining = size - i - 1;
                if remaining == 0 {
                    return row;
                }
                flood_fill(graph, start, |node, distance, predecessors| {
                    if let Some(j) = graph.node(node).distances_index() {
                        if j > i {
                            row.push((j, distance, read_path(graph, start, node, predecessors)));
                            remaining -= 1;
                        }
                    }
                    remaining > 0
                });
                row
            })
            .collect();
        for (i, row) in rows.into_iter().enumerate() {
            for (j, distance, path) in row {
                if dense.paths[(i, j)].is_none() {
                    dense.set(i, j, distance, Some(path));
                }
            }
        }
        debug!(cache_size = size, "calculated all distances");
        dense
    }
}

/// Full distance and path matrices over a fixed set of nodes.
#[derive(Debug, Clone)]
pub struct DenseDistances {
    distances: DMatrix<u32>,
    paths: DMatrix<Option<Path>>,
    nodes: Vec<NodeRef>,
}

impl DenseDistances {
    fn set(&mut self, a: usize, b: usize, distance: u32, path: Option<Path>) {
        self.distances[(a, b)] = distance;
        self.distances[(b, a)] = distance;
        self.paths[(b, a)] = path.clone();
        self.paths[(a, b)] = path;
    }

    /// Distance between the nodes at index `a` and `b`, 0 if they are not connected.
    pub fn distance(&self, a: usize, b: usize) -> u32 {
        self.distances[(a, b)]
    }

    /// Ids strictly between `a` and `b` on a shortest path, `None` if they are not connected.
    pub fn shortest_path(&self, a: usize, b: usize) -> Option<&[NodeId]> {
        self.paths[(a, b)].as_deref()
    }

    pub fn are_connected(&self, a: usize, b: usize) -> bool {
        self.paths[(a, b)].is_some()
    }

    pub fn index_to_node(&self, index: usize) -> NodeRef {
        self.nodes[index]
    }

    /// The tracked nodes in index order.
    pub fn nodes(&self) -> &[NodeRef] {
        &self.nodes
    }

    /// Updates the distances and paths to `into` after `x` was contracted into it: every node
    /// gets the shorter of its paths to `x` or `into`, not counting the nodes that were on the
    /// path between both. Rows of `x` itself are left stale.
    pub fn merge_into(&mut self, x: usize, into: usize) {
        let contracted: HashSet<NodeId> = self
            .shortest_path(x, into)
            .map(|path| path.iter().copied().collect())
            .unwrap_or_default();
        self.set(x, into, 0, Some(empty_path()));

        let filtered = |paths: &DMatrix<Option<Path>>, a: usize, b: usize| -> Option<Vec<NodeId>> {
            paths[(a, b)]
                .as_ref()
                .map(|path| path.iter().copied().filter(|n| !contracted.contains(n)).collect())
        };
        for i in 0..self.cache_size() {
            if i == into || i == x {
                continue;
            }
            let via_x = filtered(&self.paths, i, x);
            let via_into = filtered(&self.paths, i, into);
            let best = match (via_x, via_into) {
                (Some(a), Some(b)) => {
                    if a.len() < b.len() {
                        a
                    } else {
                        b
                    }
                }
                (Some(a), None) => a,
                (None, Some(b)) => b,
                (None, None) => continue,
            };
            self.set(i, into, best.len() as u32 + 1, Some(best.into()));
        }
    }

    /// Drops `removed` from the cache and renumbers the remaining nodes contiguously, keeping
    /// their relative order. Returns the remaining nodes in index order.
    pub fn remove_nodes(&mut self, graph: &mut SearchGraph, removed: &[NodeRef]) -> Vec<NodeRef> {
        let mut is_removed = vec![false; self.cache_size()];
        for &node in removed {
            if let Some(i) = graph.node(node).distances_index() {
                is_removed[i] = true;
                graph.node_mut(node).set_distances_index(None);
            }
        }
        let kept: Vec<usize> = (0..self.cache_size()).filter(|&i| !is_removed[i]).collect();

        let size = kept.len();
        self.distances = DMatrix::from_fn(size, size, |r, c| self.distances[(kept[r], kept[c])]);
        self.paths = DMatrix::from_fn(size, size, |r, c| self.paths[(kept[r], kept[c])].clone());
        self.nodes = kept.iter().map(|&i| self.nodes[i]).collect();
        for (i, &node) in self.nodes.iter().enumerate() {
            graph.node_mut(node).set_distances_index(Some(i));
        }
        self.nodes.clone()
    }
}

impl DistanceLookup for DenseDistances {
    fn cache_size(&self) -> usize {
        self.nodes.len()
    }

    fn distance(&self, a: usize, b: usize) -> u32 {
        self.distances[(a, b)]
    }
}

/// Distance cache in its lazy or its fully computed state.
#[derive(Debug, Clone)]
pub enum DistanceCache {
    Sparse(SparseDistances),
    Dense(DenseDistances),
}

impl Default for DistanceCache {
    fn default() -> Self {
        DistanceCache::Sparse(SparseDistances::default())
    }
}

impl DistanceCache {
    pub fn is_dense(&self) -> bool {
        matches!(self, DistanceCache::Dense(_))
    }

    /// Switches to the dense state over `nodes`. Lazily found distances are reused, a dense cache
    /// over different nodes is computed from scratch.
    pub fn calculate_fully(self, graph: &mut SearchGraph, nodes: &[NodeRef]) -> DenseDistances {
        match self {
            DistanceCache::Sparse(sparse) => sparse.calculate_fully(graph, nodes),
            DistanceCache::Dense(dense) if dense.nodes == nodes => {
                for (i, &node) in nodes.iter().enumerate() {
                    graph.node_mut(node).set_distances_index(Some(i));
                }
                dense
            }
            DistanceCache::Dense(_) => SparseDistances::default().calculate_fully(graph, nodes),
        }
    }
}
