//! Bottleneck Steiner distances.
//!
//! The bottleneck Steiner distance between two nodes is the smallest possible longest segment
//! over all paths between them in the complete distance graph, where a path is split into
//! segments at fixed targets only. It bounds which edges can be part of an optimal tree.

use nalgebra::DMatrix;
use rayon::prelude::*;

use crate::distance::DistanceLookup;

#[derive(Debug, Clone)]
pub struct BottleneckSteinerDistances {
    matrix: DMatrix<u32>,
}

impl BottleneckSteinerDistances {
    /// Computes the distances between all pairs of `0..distances.cache_size()`.
    pub fn calculate<D: DistanceLookup + Sync>(distances: &D, fixed_targets: &[usize]) -> Self {
        let size = distances.cache_size();
        let rows: Vec<Vec<u32>> = (0..size)
            .into_par_iter()
            .map(|i| labels_from(distances, fixed_targets, i))
            .collect();
        BottleneckSteinerDistances {
            matrix: DMatrix::from_fn(size, size, |i, j| rows[i][j]),
        }
    }
}

/// Dijkstra-like label setting from `from` that only continues paths through fixed targets.
/// Labels approach the bottleneck length instead of the path length.
fn labels_from<D: DistanceLookup>(distances: &D, fixed_targets: &[usize], from: usize) -> Vec<u32> {
    let size = distances.cache_size();
    let mut labels: Vec<u32> = (0..size).map(|j| distances.distance(from, j)).collect();
    let mut visited = vec![false; size];
    visited[from] = true;
    let mut unvisited_targets: Vec<usize> = fixed_targets.iter().copied().filter(|&t| t != from).collect();

    while !unvisited_targets.is_empty() {
        // Unvisited target with the smallest label.
        let mut position = 0;
        for (p, &t) in unvisited_targets.iter().enumerate() {
            if labels[t] < labels[unvisited_targets[position]] {
                position = p;
            }
        }
        let k = unvisited_targets.swap_remove(position);
        visited[k] = true;

        for j in 0..size {
            if visited[j] {
                continue;
            }
            let bottleneck = labels[k].max(distances.distance(k, j));
            if bottleneck < labels[j] {
                labels[j] = bottleneck;
            }
        }
    }
    labels
}

impl DistanceLookup for BottleneckSteinerDistances {
    fn cache_size(&self) -> usize {
        self.matrix.nrows()
    }

    fn distance(&self, a: usize, b: usize) -> u32 {
        self.matrix[(a, b)]
    }
}
