//! Steiner tree search over sparse node graphs.
//!
//! Given a graph of nodes, a start node and a set of target nodes, the crate computes a small
//! connected subgraph containing all of them. The pipeline is:
//! graph model -> distance cache -> search space reduction -> MST -> genetic algorithm -> hill climber.
//!
//! Most callers only need [`Solver`] and [`SteinerProblem`].

pub mod bottleneck;
pub mod config;
pub mod disjoint_set;
pub mod distance;
pub mod edges;
pub mod error;
pub mod genetic;
pub mod graph;
pub mod hill_climber;
pub mod mst;
pub mod node_states;
pub mod preprocessor;
pub mod priority_queue;
pub mod reductions;
pub mod solver;
pub mod voronoi;

pub use config::{GeneticAlgorithmParameters, SolverConfig};
pub use error::{OptimizerError, Result};
pub use graph::{GraphNode, NodeId, NodeRef, SearchGraph};
pub use hill_climber::HillClimber;
pub use preprocessor::{ReducedSearchSpace, SteinerPreprocessor};
pub use solver::{Solver, SteinerProblem, SteinerTree};
