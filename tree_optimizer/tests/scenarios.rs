use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::sync::atomic::AtomicBool;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use tree_optimizer::{NodeId, OptimizerError, Solver, SolverConfig, SteinerPreprocessor, SteinerProblem};

fn adjacency(edges: &[(NodeId, NodeId)]) -> BTreeMap<NodeId, Vec<NodeId>> {
    let mut adjacency: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
    for &(a, b) in edges {
        adjacency.entry(a).or_default().push(b);
        adjacency.entry(b).or_default().push(a);
    }
    adjacency
}

/// Square grid with `side * side` nodes, ids row by row.
fn grid(side: NodeId) -> BTreeMap<NodeId, Vec<NodeId>> {
    let mut edges = Vec::new();
    for row in 0..side {
        for col in 0..side {
            let id = row * side + col;
            if col + 1 < side {
                edges.push((id, id + 1));
            }
            if row + 1 < side {
                edges.push((id, id + side));
            }
        }
    }
    adjacency(&edges)
}

/// Set `RUST_LOG=tree_optimizer=debug` to follow a solve.
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn config() -> SolverConfig {
    SolverConfig {
        generations: Some(30),
        population_size: Some(16),
        seed: Some(7),
        ..SolverConfig::default()
    }
}

fn is_connected(adjacency: &BTreeMap<NodeId, Vec<NodeId>>, nodes: &BTreeSet<NodeId>) -> bool {
    let Some(&first) = nodes.iter().next() else {
        return true;
    };
    let mut seen = HashSet::from([first]);
    let mut queue = VecDeque::from([first]);
    while let Some(node) = queue.pop_front() {
        for &next in &adjacency[&node] {
            if nodes.contains(&next) && seen.insert(next) {
                queue.push_back(next);
            }
        }
    }
    seen.len() == nodes.len()
}

#[test]
fn path_graph_is_taken_whole() {
    let edges = [(0, 1), (1, 2), (2, 3), (3, 4), (4, 5)];
    let problem = SteinerProblem::new(adjacency(&edges), 0, [5]);
    let tree = Solver::steiner(problem, config()).unwrap().solve().unwrap();
    assert_eq!(tree.nodes, (0..6).collect());
    assert_eq!(tree.cost(), 5);
}

#[test]
fn star_graph_skips_unused_leaf() {
    let (center, a, b, d) = (10, 11, 12, 13);
    let problem = SteinerProblem::new(adjacency(&[(center, a), (center, b), (center, d)]), center, [a, b]);
    let tree = Solver::steiner(problem, config()).unwrap().solve().unwrap();
    assert_eq!(tree.nodes, BTreeSet::from([center, a, b]));
    assert_eq!(tree.cost(), 2);
    assert!(!tree.contains(d));
}

#[test]
fn disconnected_target_is_a_fault() {
    let problem = SteinerProblem::new(adjacency(&[(0, 1), (2, 3)]), 0, [3]);
    let result = Solver::steiner(problem, config()).unwrap().solve();
    assert_eq!(result, Err(OptimizerError::GraphNotConnected { from: 0, to: 3 }));
}

#[test]
fn cycle_picks_one_of_the_equal_paths() {
    let problem = SteinerProblem::new(adjacency(&[(0, 1), (1, 2), (2, 3), (3, 0)]), 0, [2]);
    let tree = Solver::steiner(problem, config()).unwrap().solve().unwrap();
    assert_eq!(tree.nodes.len(), 3);
    assert!(tree.contains(0) && tree.contains(2));
    assert!(tree.contains(1) != tree.contains(3));
}

#[test]
fn grid_solution_is_a_connected_cover_of_the_targets() {
    init_logging();
    let adjacency = grid(8);
    let targets = [7, 27, 42, 56, 63];
    let problem = SteinerProblem::new(adjacency.clone(), 0, targets);
    let tree = Solver::steiner(problem, config()).unwrap().solve().unwrap();

    assert!(tree.contains(0));
    for target in targets {
        assert!(tree.contains(target), "missing target {target}");
    }
    assert!(is_connected(&adjacency, &tree.nodes));

    // Never worse than the spanning tree over the targets computed before any search.
    let mut graph = tree_optimizer::SearchGraph::from_adjacency(&adjacency).unwrap();
    let start = graph.set_start_nodes(&[0]).unwrap();
    let fixed = targets.iter().chain([&0]).map(|&id| graph.get(id).unwrap()).collect();
    let reduced = SteinerPreprocessor::new(graph, fixed, Some(start), Vec::new())
        .reduce_search_space()
        .unwrap();
    assert!(tree.nodes.len() <= reduced.least_solution.len());
}

#[test]
fn rewarded_variable_target_is_included() {
    init_logging();
    // 0 - 1 - 2 - 3 - 4 with a branch 2 - 5 - 6.
    let adjacency = adjacency(&[(0, 1), (1, 2), (2, 3), (3, 4), (2, 5), (5, 6)]);
    let universe = adjacency.len();
    let fitness = move |nodes: &HashSet<NodeId>| {
        let bonus = if nodes.contains(&6) { 100.0 } else { 0.0 };
        bonus + (universe + 1 - nodes.len()) as f64
    };
    let problem = SteinerProblem::new(adjacency.clone(), 0, [4]).with_variable_targets([6]);
    let tree = Solver::new(problem, config(), fitness).unwrap().solve().unwrap();
    assert_eq!(tree.nodes, (0..7).collect());
}

#[test]
fn unrewarded_variable_target_is_left_out() {
    let adjacency = adjacency(&[(0, 1), (1, 2), (2, 3), (3, 4), (2, 5), (5, 6)]);
    let problem = SteinerProblem::new(adjacency, 0, [4]).with_variable_targets([6]);
    let tree = Solver::steiner(problem, config()).unwrap().solve().unwrap();
    assert_eq!(tree.nodes, (0..5).collect());
}

#[test]
fn seeded_solves_agree() {
    let solve = || {
        // The hill climber commits whichever improvement a thread finds first.
        let config = SolverConfig { final_hill_climb: false, ..config() };
        let problem = SteinerProblem::new(grid(6), 0, [5, 20, 30, 35]);
        Solver::steiner(problem, config).unwrap().solve().unwrap()
    };
    assert_eq!(solve(), solve());
}

#[test]
fn problem_round_trips_through_json() {
    let json = r#"{"adjacency":{"0":[1],"1":[2],"2":[]},"start":0,"targets":[2]}"#;
    let problem: SteinerProblem = serde_json::from_str(json).unwrap();
    assert!(problem.variable_targets.is_empty());
    let tree = Solver::steiner(problem, config()).unwrap().solve().unwrap();
    assert_eq!(serde_json::to_string(&tree).unwrap(), r#"{"nodes":[0,1,2]}"#);
}

/// Smallest connected node set containing `fixed`, by trying every subset of the other nodes.
fn minimum_tree_size(adjacency: &BTreeMap<NodeId, Vec<NodeId>>, fixed: &BTreeSet<NodeId>) -> usize {
    let others: Vec<NodeId> = adjacency.keys().copied().filter(|id| !fixed.contains(id)).collect();
    let mut best = usize::MAX;
    for mask in 0u32..(1 << others.len()) {
        let size = fixed.len() + mask.count_ones() as usize;
        if size >= best {
            continue;
        }
        let mut nodes = fixed.clone();
        nodes.extend(others.iter().enumerate().filter(|&(bit, _)| mask & (1 << bit) != 0).map(|(_, &id)| id));
        if is_connected(adjacency, &nodes) {
            best = size;
        }
    }
    best
}

#[test]
fn small_graphs_are_solved_optimally() {
    init_logging();
    let mut rng = ChaCha8Rng::seed_from_u64(2718);
    // Preprocessing reduces this one down to the start node.
    let mut cases = vec![(
        adjacency(&[
            (0, 1),
            (0, 2),
            (0, 3),
            (0, 4),
            (1, 5),
            (1, 6),
            (2, 7),
            (2, 8),
            (6, 9),
            (4, 10),
            (5, 3),
            (4, 6),
            (1, 2),
        ]),
        10,
        vec![1, 5, 9],
    )];
    for _ in 0..120 {
        let node_count: NodeId = rng.gen_range(6..=14);
        let mut edges = Vec::new();
        for id in 1..node_count {
            edges.push((rng.gen_range(0..id), id));
        }
        for _ in 0..rng.gen_range(0..node_count) {
            let (a, b) = (rng.gen_range(0..node_count), rng.gen_range(0..node_count));
            if a != b {
                edges.push((a, b));
            }
        }
        let mut ids: Vec<NodeId> = (0..node_count).collect();
        ids.shuffle(&mut rng);
        let target_count = rng.gen_range(1..=3);
        cases.push((adjacency(&edges), ids[0], ids[1..=target_count].to_vec()));
    }

    let mut fully_reduced = 0;
    for (seed, (adjacency, start, targets)) in cases.into_iter().enumerate() {
        let fixed: BTreeSet<NodeId> = targets.iter().copied().chain([start]).collect();
        let expected = minimum_tree_size(&adjacency, &fixed);
        for final_hill_climb in [false, true] {
            let config = SolverConfig {
                generations: Some(60),
                seed: Some(seed as u64),
                final_hill_climb,
                ..SolverConfig::default()
            };
            let problem = SteinerProblem::new(adjacency.clone(), start, targets.iter().copied());
            let mut solver = Solver::steiner(problem, config).unwrap();
            solver.initialize().unwrap();
            if solver.steps() == 0 {
                fully_reduced += 1;
            }
            let tree = solver.solve_until(&AtomicBool::new(false)).unwrap();
            assert!(fixed.iter().all(|&id| tree.contains(id)));
            assert!(is_connected(&adjacency, &tree.nodes));
            assert_eq!(tree.nodes.len(), expected, "start {start}, targets {targets:?}, graph {adjacency:?}");
        }
    }
    assert!(fully_reduced >= 2);
}
