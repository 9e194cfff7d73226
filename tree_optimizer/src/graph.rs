use std::collections::{BTreeMap, HashMap};

use crate::error::{OptimizerError, Result};

/// Stable identity of a node in the input graph.
pub type NodeId = u16;

/// Index of a [`GraphNode`] inside its [`SearchGraph`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(pub usize);

/// A node of the search graph. After merges it stands for several original nodes.
#[derive(Debug, Clone)]
pub struct GraphNode {
    id: NodeId,
    nodes: Vec<NodeId>,
    adjacent: Vec<NodeRef>,
    // Dense index while tracked by a distance cache.
    distances_index: Option<usize>,
}

impl GraphNode {
    fn new(id: NodeId) -> Self {
        GraphNode {
            id,
            nodes: vec![id],
            adjacent: Vec::new(),
            distances_index: None,
        }
    }

    /// Smallest original id this node represents.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// All original ids this node represents, including contracted paths.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn adjacent(&self) -> &[NodeRef] {
        &self.adjacent
    }

    pub fn distances_index(&self) -> Option<usize> {
        self.distances_index
    }

    pub(crate) fn set_distances_index(&mut self, index: Option<usize>) {
        self.distances_index = index;
    }
}

/// Arena of graph nodes with undirected adjacency.
///
/// Built once per optimization run from the caller's adjacency lists. Merges keep the arena
/// slots of merged-away nodes, so a [`NodeRef`] stays valid for the whole run.
#[derive(Debug, Clone, Default)]
pub struct SearchGraph {
    nodes: Vec<GraphNode>,
    by_id: HashMap<NodeId, NodeRef>,
}

impl SearchGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the graph from `(id, neighbour ids)` lists. Every neighbour must itself be a key.
    pub fn from_adjacency(adjacency: &BTreeMap<NodeId, Vec<NodeId>>) -> Result<Self> {
        let mut graph = SearchGraph::new();
        for &id in adjacency.keys() {
            graph.add_node(id);
        }
        for (&id, neighbours) in adjacency {
            let u = graph.node_ref(id)?;
            for &neighbour in neighbours {
                let v = graph.node_ref(neighbour)?;
                graph.add_edge(u, v);
            }
        }
        Ok(graph)
    }

    /// Adds a node, or returns the existing one with that id.
    pub fn add_node(&mut self, id: NodeId) -> NodeRef {
        if let Some(&existing) = self.by_id.get(&id) {
            return existing;
        }
        let node_ref = NodeRef(self.nodes.len());
        self.nodes.push(GraphNode::new(id));
        self.by_id.insert(id, node_ref);
        node_ref
    }

    /// Adds the undirected edge `u`-`v` once. Self-loops are ignored.
    pub fn add_edge(&mut self, u: NodeRef, v: NodeRef) {
        if u == v {
            return;
        }
        if !self.nodes[u.0].adjacent.contains(&v) {
            self.nodes[u.0].adjacent.push(v);
            self.nodes[v.0].adjacent.push(u);
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, node: NodeRef) -> &GraphNode {
        &self.nodes[node.0]
    }

    pub(crate) fn node_mut(&mut self, node: NodeRef) -> &mut GraphNode {
        &mut self.nodes[node.0]
    }

    /// The node originally created for `id`.
    pub fn get(&self, id: NodeId) -> Option<NodeRef> {
        self.by_id.get(&id).copied()
    }

    pub fn node_ref(&self, id: NodeId) -> Result<NodeRef> {
        self.get(id).ok_or(OptimizerError::UnknownNode(id))
    }

    pub fn refs(&self) -> impl Iterator<Item = NodeRef> {
        (0..self.nodes.len()).map(NodeRef)
    }

    pub fn degree(&self, node: NodeRef) -> usize {
        self.nodes[node.0].adjacent.len()
    }

    /// Merges all given nodes into a single start node and returns it.
    pub fn set_start_nodes(&mut self, ids: &[NodeId]) -> Result<NodeRef> {
        let mut refs = ids
            .iter()
            .map(|&id| self.node_ref(id))
            .collect::<Result<Vec<_>>>()?;
        refs.sort_by_key(|r| self.nodes[r.0].id);
        refs.dedup();
        let (&start, rest) = refs
            .split_first()
            .ok_or_else(|| OptimizerError::invalid("start", "at least one start node is required"))?;
        for &other in rest {
            self.merge_nodes(start, other, &[]);
        }
        Ok(start)
    }

    /// Contracts `x` into `into`. `path` holds the ids of the nodes between the two that are
    /// now represented by `into` as well.
    ///
    /// Neighbours of `x` are rewired to `into` and `x` is left without ids or edges.
    pub fn merge_nodes(&mut self, into: NodeRef, x: NodeRef, path: &[NodeId]) {
        if into == x {
            return;
        }
        let x_node = std::mem::replace(
            &mut self.nodes[x.0],
            GraphNode {
                id: 0,
                nodes: Vec::new(),
                adjacent: Vec::new(),
                distances_index: None,
            },
        );
        // Keep the cache index: the distance cache still references x until it is rebuilt.
        self.nodes[x.0].distances_index = x_node.distances_index;
        self.nodes[x.0].id = x_node.id;

        for &neighbour in &x_node.adjacent {
            if neighbour == into {
                continue;
            }
            let adjacent = &mut self.nodes[neighbour.0].adjacent;
            adjacent.retain(|&n| n != x);
            if !adjacent.contains(&into) {
                adjacent.push(into);
            }
        }

        let target = &mut self.nodes[into.0];
        target.adjacent.retain(|&n| n != x);
        for neighbour in x_node.adjacent {
            if neighbour != into && !target.adjacent.contains(&neighbour) {
                target.adjacent.push(neighbour);
            }
        }
        target.nodes.extend(x_node.nodes);
        target.nodes.extend_from_slice(path);
        target.nodes.sort_unstable();
        target.nodes.dedup();
        target.id = target.nodes.first().copied().unwrap_or(target.id);
    }

    /// Iterates all nodes that currently represent at least one id.
    pub fn live_nodes(&self) -> impl Iterator<Item = (NodeRef, &GraphNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| !n.nodes.is_empty())
            .map(|(i, n)| (NodeRef(i), n))
    }
}
