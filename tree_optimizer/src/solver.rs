//! Runs the whole pipeline for one problem: preprocessing, the genetic search over candidate
//! nodes and the final hill climb.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::SolverConfig;
use crate::edges::DirectedGraphEdge;
use crate::error::{OptimizerError, Result};
use crate::genetic::{Dna, GeneticAlgorithm};
use crate::graph::{NodeId, SearchGraph};
use crate::hill_climber::HillClimber;
use crate::mst::{ordered_edges, MinimalSpanningTree};
use crate::preprocessor::{ReducedSearchSpace, SteinerPreprocessor};

/// Kruskal over pre-sorted edges is used once fixed targets make up this share of the search space.
const PRE_SORTED_SPAN_THRESHOLD: f64 = 0.1;

/// Fitness over sets of original node ids. Higher is better, values must be non-negative.
pub type BoxedFitness = Box<dyn Fn(&HashSet<NodeId>) -> f64 + Send + Sync>;

type DnaFitness = Box<dyn Fn(&Dna) -> f64 + Send + Sync>;

/// Input of a solver run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SteinerProblem {
    /// Neighbours of every node in the universe. Edges may be listed in one direction only.
    pub adjacency: BTreeMap<NodeId, Vec<NodeId>>,
    pub start: NodeId,
    /// Nodes the result must contain.
    pub targets: BTreeSet<NodeId>,
    /// Nodes the result may contain if the fitness function rewards them.
    #[serde(default)]
    pub variable_targets: BTreeSet<NodeId>,
}

impl SteinerProblem {
    pub fn new(adjacency: BTreeMap<NodeId, Vec<NodeId>>, start: NodeId, targets: impl IntoIterator<Item = NodeId>) -> Self {
        SteinerProblem {
            adjacency,
            start,
            targets: targets.into_iter().collect(),
            variable_targets: BTreeSet::new(),
        }
    }

    pub fn with_variable_targets(mut self, variable_targets: impl IntoIterator<Item = NodeId>) -> Self {
        self.variable_targets = variable_targets.into_iter().collect();
        self
    }

    /// Every referenced id must be a node of the universe.
    pub fn validate(&self) -> Result<()> {
        let known = |id: NodeId| {
            if self.adjacency.contains_key(&id) {
                Ok(())
            } else {
                Err(OptimizerError::UnknownNode(id))
            }
        };
        known(self.start)?;
        for &id in self.targets.iter().chain(&self.variable_targets) {
            known(id)?;
        }
        for neighbours in self.adjacency.values() {
            for &id in neighbours {
                known(id)?;
            }
        }
        Ok(())
    }

    /// The start and all targets.
    fn fixed_nodes(&self) -> HashSet<NodeId> {
        self.targets.iter().copied().chain([self.start]).collect()
    }
}

/// The node set computed by a solver run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SteinerTree {
    pub nodes: BTreeSet<NodeId>,
}

impl SteinerTree {
    /// Number of edges of the tree.
    pub fn cost(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(&id)
    }
}

/// Turns DNA into node sets. Shared by the solver and the fitness closure of the genetic
/// algorithm.
struct SpaceEvaluator<F> {
    space: ReducedSearchSpace,
    /// Cache index of the node behind each DNA bit.
    candidates: Vec<usize>,
    fixed_indices: Vec<usize>,
    start_index: usize,
    /// Set when spanning trees are built with Kruskal.
    ordered_edges: Option<Vec<DirectedGraphEdge>>,
    /// Surviving node id -> every id it represents.
    expansion: HashMap<NodeId, Vec<NodeId>>,
    fitness: Arc<F>,
}

impl<F> SpaceEvaluator<F>
where
    F: Fn(&HashSet<NodeId>) -> f64 + Send + Sync,
{
    /// Ids of the spanning tree over the fixed targets and the candidates selected by `dna`,
    /// with merged nodes expanded.
    fn used_nodes(&self, dna: &Dna) -> HashSet<NodeId> {
        let mut mst_nodes = self.fixed_indices.clone();
        mst_nodes.extend(dna.ones().map(|bit| self.candidates[bit]));
        let mut mst = MinimalSpanningTree::new(mst_nodes.clone(), &self.space.distances);
        match &self.ordered_edges {
            Some(edges) => mst.span_ordered(edges),
            None => mst.span(self.start_index),
        }

        let mut used: HashSet<NodeId> = mst_nodes
            .iter()
            .map(|&index| self.space.graph.node(self.space.distances.index_to_node(index)).id())
            .collect();
        for edge in mst.spanning_edges() {
            if let Some(path) = self.space.distances.shortest_path(edge.inside, edge.outside) {
                used.extend(path.iter().copied());
            }
        }
        self.expand(used)
    }

    fn expand(&self, nodes: HashSet<NodeId>) -> HashSet<NodeId> {
        nodes
            .into_iter()
            .flat_map(|id| match self.expansion.get(&id) {
                Some(ids) => ids.clone(),
                None => vec![id],
            })
            .collect()
    }

    fn fitness(&self, dna: &Dna) -> f64 {
        (self.fitness)(&self.used_nodes(dna))
    }
}

/// Searches a small connected node set containing the start and all targets of a
/// [`SteinerProblem`].
///
/// ```no_run
/// # use std::collections::BTreeMap;
/// # use tree_optimizer::{Solver, SolverConfig, SteinerProblem};
/// let adjacency = BTreeMap::from([(0, vec![1]), (1, vec![2]), (2, vec![])]);
/// let problem = SteinerProblem::new(adjacency, 0, [2]);
/// let tree = Solver::steiner(problem, SolverConfig::default())?.solve()?;
/// assert_eq!(tree.cost(), 2);
/// # Ok::<(), tree_optimizer::OptimizerError>(())
/// ```
pub struct Solver<F> {
    problem: SteinerProblem,
    config: SolverConfig,
    fitness: Arc<F>,
    evaluator: Option<Arc<SpaceEvaluator<F>>>,
    ga: Option<GeneticAlgorithm<DnaFitness>>,
    best_dna: Option<Dna>,
    best_solution: HashSet<NodeId>,
    best_fitness: f64,
    finished: bool,
}

impl Solver<BoxedFitness> {
    /// Solver for the plain Steiner tree problem: fewer nodes are better.
    pub fn steiner(problem: SteinerProblem, config: SolverConfig) -> Result<Self> {
        let universe = problem.adjacency.len();
        let fitness: BoxedFitness = Box::new(move |nodes: &HashSet<NodeId>| (universe + 1).saturating_sub(nodes.len()) as f64);
        Solver::new(problem, config, fitness)
    }
}

impl<F> Solver<F>
where
    F: Fn(&HashSet<NodeId>) -> f64 + Send + Sync + 'static,
{
    /// Validates the problem and the configuration. Nothing is computed until
    /// [`initialize`](Self::initialize).
    pub fn new(problem: SteinerProblem, config: SolverConfig, fitness: F) -> Result<Self> {
        problem.validate()?;
        config.validate()?;
        Ok(Solver {
            problem,
            config,
            fitness: Arc::new(fitness),
            evaluator: None,
            ga: None,
            best_dna: None,
            best_solution: HashSet::new(),
            best_fitness: 0.0,
            finished: false,
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.evaluator.is_some()
    }

    /// Preprocesses the problem and seeds the genetic algorithm.
    pub fn initialize(&mut self) -> Result<()> {
        let mut graph = SearchGraph::from_adjacency(&self.problem.adjacency)?;
        let start = graph.set_start_nodes(&[self.problem.start])?;
        let fixed_targets = self
            .problem
            .fixed_nodes()
            .into_iter()
            .map(|id| graph.node_ref(id))
            .collect::<Result<Vec<_>>>()?;
        let variable_targets = self
            .problem
            .variable_targets
            .iter()
            .map(|&id| graph.node_ref(id))
            .collect::<Result<Vec<_>>>()?;

        let space = SteinerPreprocessor::new(graph, fixed_targets, Some(start), variable_targets).reduce_search_space()?;

        let expansion: HashMap<NodeId, Vec<NodeId>> = space
            .nodes
            .iter()
            .map(|&n| {
                let node = space.graph.node(n);
                (node.id(), node.nodes().to_vec())
            })
            .collect();
        let candidates = space.candidate_indices();
        let fixed_indices = space.fixed_target_indices();
        let search_space_size = space.search_space_size();
        let ordered_edges = if fixed_indices.len() as f64 / search_space_size.max(1) as f64 >= PRE_SORTED_SPAN_THRESHOLD {
            let all: Vec<usize> = (0..search_space_size).collect();
            Some(ordered_edges(&space.distances, &all))
        } else {
            None
        };
        info!(
            search_space = search_space_size,
            candidates = candidates.len(),
            kruskal = ordered_edges.is_some(),
            "initialized solver"
        );

        self.best_solution = space.least_solution.clone();
        self.best_fitness = (self.fitness)(&self.best_solution);
        let dna_length = candidates.len();
        let evaluator = Arc::new(SpaceEvaluator {
            start_index: space.start_index(),
            space,
            candidates,
            fixed_indices,
            ordered_edges,
            expansion,
            fitness: Arc::clone(&self.fitness),
        });

        self.ga = if dna_length == 0 {
            None
        } else {
            let parameters = self.config.ga_parameters(dna_length)?;
            let seed = self.config.seed.unwrap_or_else(rand::random);
            let shared = Arc::clone(&evaluator);
            let fitness: DnaFitness = Box::new(move |dna: &Dna| shared.fitness(dna));
            Some(GeneticAlgorithm::new(fitness, parameters, None, seed)?)
        };
        self.evaluator = Some(evaluator);
        self.best_dna = None;
        self.finished = false;
        self.update_best_solution();
        Ok(())
    }

    /// Generations per iteration. 0 when there is nothing to search.
    pub fn steps(&self) -> usize {
        self.ga.as_ref().map_or(0, |ga| ga.max_generation())
    }

    pub fn current_step(&self) -> usize {
        self.ga.as_ref().map_or(0, |ga| ga.generation_count())
    }

    pub fn iterations(&self) -> usize {
        self.config.iterations
    }

    pub fn current_iteration(&self) -> usize {
        self.ga.as_ref().map_or(0, |ga| ga.current_iteration())
    }

    /// Whether every generation of every iteration ran.
    pub fn is_done(&self) -> bool {
        self.is_initialized()
            && self.current_iteration() + 1 >= self.iterations()
            && self.current_step() >= self.steps()
    }

    /// Evolves one generation, starting the next iteration when the current one is complete.
    pub fn step(&mut self) -> Result<()> {
        if !self.is_initialized() {
            return Err(OptimizerError::invalid("solver", "not initialized"));
        }
        let Some(ga) = self.ga.as_mut() else {
            return Ok(());
        };
        if ga.generation_count() >= ga.max_generation() {
            ga.next_iteration()?;
        }
        ga.new_generation()?;
        self.update_best_solution();
        Ok(())
    }

    /// Improves the best solution with the hill climber if enabled. Runs once.
    pub fn final_step(&mut self) {
        if self.finished || !self.config.final_hill_climb {
            self.finished = true;
            return;
        }
        self.finished = true;
        let fitness = Arc::clone(&self.fitness);
        let climber = HillClimber::new(&self.problem.adjacency, self.problem.fixed_nodes(), move |nodes: &HashSet<NodeId>| {
            fitness(nodes)
        });
        let improved = climber.improve(&self.best_solution);
        let improved_fitness = (self.fitness)(&improved);
        debug!(before = self.best_fitness, after = improved_fitness, "final hill climb");
        self.best_solution = improved;
        self.best_fitness = improved_fitness;
    }

    /// Ids of the best node set found so far.
    pub fn best_solution(&self) -> &HashSet<NodeId> {
        &self.best_solution
    }

    pub fn best_fitness(&self) -> f64 {
        self.best_fitness
    }

    pub fn best_tree(&self) -> SteinerTree {
        SteinerTree {
            nodes: self.best_solution.iter().copied().collect(),
        }
    }

    /// Runs all generations of all iterations and the final step.
    pub fn solve(mut self) -> Result<SteinerTree> {
        let never = AtomicBool::new(false);
        self.solve_until(&never)
    }

    /// Like [`solve`](Self::solve), but stops between generations once `cancel` is set. The
    /// final step is skipped when cancelled.
    pub fn solve_until(&mut self, cancel: &AtomicBool) -> Result<SteinerTree> {
        if !self.is_initialized() {
            self.initialize()?;
        }
        while !self.is_done() {
            if cancel.load(Ordering::Relaxed) {
                info!(
                    iteration = self.current_iteration(),
                    generation = self.current_step(),
                    "solver cancelled"
                );
                return Ok(self.best_tree());
            }
            self.step()?;
        }
        self.final_step();
        let tree = self.best_tree();
        info!(nodes = tree.nodes.len(), fitness = self.best_fitness, "solved");
        Ok(tree)
    }

    /// Adopts the tree of the best DNA if it is at least as fit as the current best. Without a
    /// genetic algorithm the empty DNA stands for the reduced search space itself.
    fn update_best_solution(&mut self) {
        let Some(evaluator) = self.evaluator.as_ref() else {
            return;
        };
        let dna = match self.ga.as_ref() {
            Some(ga) => ga.best_dna().clone(),
            None => Dna::new(evaluator.candidates.len()),
        };
        if self.best_dna.as_ref() == Some(&dna) {
            return;
        }
        let solution = evaluator.used_nodes(&dna);
        let fitness = (self.fitness)(&solution);
        self.best_dna = Some(dna);
        if fitness >= self.best_fitness {
            self.best_solution = solution;
            self.best_fitness = fitness;
        }
    }
}
