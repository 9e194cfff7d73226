use std::collections::{BTreeMap, HashSet};

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tree_optimizer::distance::{DenseDistances, DistanceLookup, SparseDistances};
use tree_optimizer::mst::{ordered_edges, MinimalSpanningTree};
use tree_optimizer::{NodeId, NodeRef, SearchGraph};

fn graph(edges: &[(NodeId, NodeId)], node_count: NodeId) -> SearchGraph {
    let mut adjacency: BTreeMap<NodeId, Vec<NodeId>> = (0..node_count).map(|id| (id, Vec::new())).collect();
    for &(a, b) in edges {
        adjacency.entry(a).or_default().push(b);
    }
    SearchGraph::from_adjacency(&adjacency).unwrap()
}

fn dense(graph: &mut SearchGraph, ids: &[NodeId]) -> DenseDistances {
    let nodes: Vec<NodeRef> = ids.iter().map(|&id| graph.get(id).unwrap()).collect();
    SparseDistances::new().calculate_fully(graph, &nodes)
}

/// Random connected graph: a random tree plus a few extra edges.
fn random_graph(rng: &mut ChaCha8Rng, node_count: NodeId) -> Vec<(NodeId, NodeId)> {
    let mut edges = Vec::new();
    for id in 1..node_count {
        edges.push((rng.gen_range(0..id), id));
    }
    for _ in 0..rng.gen_range(0..node_count) {
        let a = rng.gen_range(0..node_count);
        let b = rng.gen_range(0..node_count);
        if a != b {
            edges.push((a, b));
        }
    }
    edges
}

/// Minimal weight over every (k-1)-subset of the complete graph's edges that spans all k nodes.
fn brute_force_weight<D: DistanceLookup>(distances: &D, nodes: &[usize]) -> u64 {
    let pairs: Vec<(usize, usize)> = (0..nodes.len())
        .flat_map(|i| (i + 1..nodes.len()).map(move |j| (i, j)))
        .collect();
    let needed = nodes.len() - 1;
    let mut best = u64::MAX;
    for mask in 0u32..(1 << pairs.len()) {
        if mask.count_ones() as usize != needed {
            continue;
        }
        let mut component: Vec<usize> = (0..nodes.len()).collect();
        let mut weight = 0;
        for (bit, &(i, j)) in pairs.iter().enumerate() {
            if mask & (1 << bit) == 0 {
                continue;
            }
            let (ci, cj) = (component[i], component[j]);
            for c in component.iter_mut() {
                if *c == cj {
                    *c = ci;
                }
            }
            weight += u64::from(distances.distance(nodes[i], nodes[j]));
        }
        if component.iter().all(|&c| c == component[0]) {
            best = best.min(weight);
        }
    }
    best
}

#[test]
fn sample_graph_tree() {
    let edges = [(0, 1), (0, 4), (1, 2), (2, 3), (2, 5), (3, 5), (4, 5), (5, 6), (6, 7)];
    let mut graph = graph(&edges, 8);
    let distances = dense(&mut graph, &[3, 5, 7, 0]);
    let index = |id| graph.node(graph.get(id).unwrap()).distances_index().unwrap();

    let mut mst = MinimalSpanningTree::new(vec![0, 1, 2, 3], &distances);
    mst.span(index(0));
    assert_eq!(mst.spanning_edges().len(), 3);
    assert_eq!(mst.total_weight(), 5);

    let mut ids: Vec<(NodeId, NodeId)> = mst
        .spanning_edges()
        .iter()
        .map(|e| {
            let a = graph.node(distances.index_to_node(e.inside)).id();
            let b = graph.node(distances.index_to_node(e.outside)).id();
            (a.min(b), a.max(b))
        })
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![(0, 5), (3, 5), (5, 7)]);
    assert_eq!(mst.used_nodes(&graph), HashSet::from([0, 3, 4, 5, 6, 7]));
}

#[test]
fn distances_follow_breadth_first_search() {
    let edges = [(0, 1), (0, 4), (1, 2), (2, 3), (2, 5), (3, 5), (4, 5)];
    let mut graph = graph(&edges, 6);
    let distances = dense(&mut graph, &[0, 1, 2, 3, 4, 5]);
    assert_eq!(distances.distance(0, 0), 0);
    assert_eq!(distances.distance(0, 5), 2);
    assert_eq!(distances.distance(0, 3), 3);
    assert_eq!(distances.shortest_path(0, 5).map(<[NodeId]>::len), Some(1));
}

#[test]
fn unconnected_pairs_have_no_path() {
    let edges = [(0, 1), (2, 3), (2, 5), (3, 5), (4, 5)];
    let mut graph = graph(&edges, 6);
    let distances = dense(&mut graph, &[0, 2, 4, 3]);
    assert!(!distances.are_connected(0, 3));
    assert_eq!(distances.shortest_path(0, 3), None);
    assert!(distances.are_connected(1, 2));

    let (a, b) = (graph.get(0).unwrap(), graph.get(3).unwrap());
    assert!(SparseDistances::new().distance(&graph, a, b).is_err());
}

#[test]
fn distances_are_a_metric() {
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    for _ in 0..20 {
        let node_count = rng.gen_range(3..12);
        let mut graph = graph(&random_graph(&mut rng, node_count), node_count);
        let ids: Vec<NodeId> = (0..node_count).collect();
        let distances = dense(&mut graph, &ids);
        let size = distances.cache_size();
        for a in 0..size {
            assert_eq!(distances.distance(a, a), 0);
            for b in 0..size {
                assert_eq!(distances.distance(a, b), distances.distance(b, a));
                let path = distances.shortest_path(a, b).unwrap();
                assert_eq!(path.len() as u32, distances.distance(a, b).saturating_sub(1));
                for c in 0..size {
                    assert!(distances.distance(a, c) <= distances.distance(a, b) + distances.distance(b, c));
                }
            }
        }
    }
}

#[test]
fn lazy_and_dense_distances_agree() {
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let node_count = 10;
    let mut graph = graph(&random_graph(&mut rng, node_count), node_count);
    let mut sparse = SparseDistances::new();
    let mut lazy = Vec::new();
    for a in 0..node_count {
        for b in 0..node_count {
            let (ra, rb) = (graph.get(a).unwrap(), graph.get(b).unwrap());
            lazy.push(sparse.distance(&graph, ra, rb).unwrap());
        }
    }
    let nodes: Vec<NodeRef> = (0..node_count).map(|id| graph.get(id).unwrap()).collect();
    let distances = sparse.calculate_fully(&mut graph, &nodes);
    let n = usize::from(node_count);
    for a in 0..n {
        for b in 0..n {
            assert_eq!(distances.distance(a, b), lazy[a * n + b]);
        }
    }
}

#[test]
fn prim_and_kruskal_match_brute_force() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for _ in 0..30 {
        let node_count = rng.gen_range(4..14);
        let mut graph = graph(&random_graph(&mut rng, node_count), node_count);
        let ids: Vec<NodeId> = (0..node_count).collect();
        let distances = dense(&mut graph, &ids);

        let mut indices: Vec<usize> = (0..usize::from(node_count)).collect();
        indices.shuffle(&mut rng);
        indices.truncate(rng.gen_range(2..=6.min(indices.len())));
        let expected = brute_force_weight(&distances, &indices);

        let mut prim = MinimalSpanningTree::new(indices.clone(), &distances);
        prim.span(indices[0]);
        assert_eq!(prim.spanning_edges().len(), indices.len() - 1);
        assert_eq!(prim.total_weight(), expected);

        let all: Vec<usize> = (0..usize::from(node_count)).collect();
        let ordered = ordered_edges(&distances, &all);
        let mut kruskal = MinimalSpanningTree::new(indices.clone(), &distances);
        kruskal.span_ordered(&ordered);
        assert_eq!(kruskal.spanning_edges().len(), indices.len() - 1);
        assert_eq!(kruskal.total_weight(), expected);
    }
}
