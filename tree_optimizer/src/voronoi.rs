//! Voronoi regions of terminals in a weighted edge set.

use crate::edges::{GraphEdge, GraphEdgeSet};
use crate::priority_queue::LinkedListPriorityQueue;

/// Nearest terminal and its distance for every node of an edge set. Ties go to the terminal
/// whose flood reached the node first.
#[derive(Debug, Clone)]
pub struct VoronoiPartition {
    base: Vec<Option<usize>>,
    distance: Vec<u32>,
}

impl VoronoiPartition {
    /// Floods the edge set from all `terminals` at once.
    pub fn calculate(edge_set: &GraphEdgeSet, terminals: &[usize]) -> Self {
        let size = edge_set.size();
        let mut base = vec![None; size];
        let mut distance = vec![u32::MAX; size];
        let mut settled = vec![false; size];
        let mut queue = LinkedListPriorityQueue::new(100, size);

        for &t in terminals {
            distance[t] = 0;
            queue.enqueue((t, t), 0);
        }
        while let Some((node, terminal)) = queue.dequeue() {
            if settled[node] {
                continue;
            }
            settled[node] = true;
            base[node] = Some(terminal);
            for edge in edge_set.edges_of(node) {
                let other = edge.other(node);
                let tentative = distance[node].saturating_add(edge.weight);
                if !settled[other] && tentative < distance[other] {
                    distance[other] = tentative;
                    queue.enqueue((other, terminal), tentative);
                }
            }
        }
        VoronoiPartition { base, distance }
    }

    /// Terminal whose region contains `node`, `None` if no terminal reaches it.
    pub fn base(&self, node: usize) -> Option<usize> {
        self.base[node]
    }

    /// Distance from `node` to its base terminal.
    pub fn distance(&self, node: usize) -> Option<u32> {
        self.base[node].map(|_| self.distance[node])
    }

    pub fn region_of(&self, terminal: usize) -> Vec<usize> {
        (0..self.base.len()).filter(|&n| self.base[n] == Some(terminal)).collect()
    }

    /// Edges with exactly one endpoint in the region of `terminal`. The edges are oriented so
    /// that `n1` is the endpoint inside the region.
    pub fn boundary_edges(&self, edge_set: &GraphEdgeSet, terminal: usize) -> Vec<GraphEdge> {
        let mut edges = Vec::new();
        for inside in self.region_of(terminal) {
            for edge in edge_set.edges_of(inside) {
                let outside = edge.other(inside);
                if self.base[outside] != Some(terminal) {
                    edges.push(GraphEdge {
                        n1: inside,
                        n2: outside,
                        weight: edge.weight,
                    });
                }
            }
        }
        edges
    }

    /// Every edge whose endpoints lie in different regions.
    pub fn crossing_edges(&self, edge_set: &GraphEdgeSet) -> Vec<GraphEdge> {
        edge_set
            .iter()
            .filter(|e| self.base[e.n1] != self.base[e.n2])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 0 -1- 1 -1- 2 -3- 3 -1- 4, terminals 0 and 4
    fn line() -> GraphEdgeSet {
        let mut set = GraphEdgeSet::new(5);
        set.add(0, 1, 1);
        set.add(1, 2, 1);
        set.add(2, 3, 3);
        set.add(3, 4, 1);
        set
    }

    #[test]
    fn assigns_nearest_terminal() {
        let set = line();
        let voronoi = VoronoiPartition::calculate(&set, &[0, 4]);
        assert_eq!(voronoi.region_of(0), vec![0, 1, 2]);
        assert_eq!(voronoi.region_of(4), vec![3, 4]);
        assert_eq!(voronoi.distance(2), Some(2));
        assert_eq!(voronoi.distance(3), Some(1));
        assert_eq!(voronoi.base(4), Some(4));
    }

    #[test]
    fn boundary_edges_point_outwards() {
        let set = line();
        let voronoi = VoronoiPartition::calculate(&set, &[0, 4]);
        assert_eq!(voronoi.boundary_edges(&set, 0), vec![GraphEdge { n1: 2, n2: 3, weight: 3 }]);
        assert_eq!(voronoi.boundary_edges(&set, 4), vec![GraphEdge { n1: 3, n2: 2, weight: 3 }]);
        assert_eq!(voronoi.crossing_edges(&set).len(), 1);
    }

    #[test]
    fn unreachable_nodes_have_no_base() {
        let mut set = line();
        set.remove(1, 2);
        let voronoi = VoronoiPartition::calculate(&set, &[0]);
        assert_eq!(voronoi.base(1), Some(0));
        assert_eq!(voronoi.base(2), None);
        assert_eq!(voronoi.distance(3), None);
    }
}
