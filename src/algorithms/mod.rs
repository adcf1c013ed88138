//! Rank computation (relaxation, convergence, `PageRank`, reporting, inflation)
//!
//! Lock-free asynchronous Gauss–Seidel over a [`BacklinkIndex`](crate::BacklinkIndex).

pub mod convergence;
pub mod inflation;
pub mod pagerank;
pub mod rank_vector;
pub mod relaxation;
pub mod report;

pub use convergence::{ConvergenceController, ConvergenceReport};
pub use inflation::{evaluate_inflation, inflation_candidates, InflationOutcome, InflationPlan};
pub use pagerank::{pagerank, PageRankResult};
pub use rank_vector::RankVector;
pub use relaxation::{RelaxationEngine, SweepStats};
pub use report::{normalized_by_min, percentiles, top_k, RankSummary};
