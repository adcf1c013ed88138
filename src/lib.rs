//! trueno-rank: parallel lock-free `PageRank` over a compressed backlink index
//!
//! # Overview
//!
//! trueno-rank turns an edge list into a compressed reverse index (CSR over
//! in-edges), persists it as flat little-endian arrays, and computes `PageRank`
//! with a pool of workers that update a shared rank vector in place through
//! atomic compare-and-swap.
//!
//! # Quick Start
//!
//! ```no_run
//! use trueno_rank::{pagerank, BacklinkIndex, EdgeList, NodeId, RankConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Build index from edge list
//! let edges = EdgeList::from_edges(vec![
//!     (NodeId(0), NodeId(1)),
//!     (NodeId(0), NodeId(2)),
//!     (NodeId(1), NodeId(3)),
//!     (NodeId(2), NodeId(1)),
//! ]);
//! let index = BacklinkIndex::build(&edges, Default::default())?;
//!
//! // Backlinks of a node (O(1) via CSR indexing)
//! assert_eq!(index.backlinks_of(NodeId(1))?, &[0, 2]);
//!
//! // Persist the four index arrays
//! index.write_dir("index").await?;
//!
//! // Load from disk and rank
//! let loaded = BacklinkIndex::read_dir("index").await?;
//! let result = pagerank(&loaded, &RankConfig::default())?;
//! println!("{} sweeps", result.report.iterations);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Storage**: CSR backlink index, length-prefixed `u32` arrays, Parquet edge lists
//! - **Relaxation**: `AtomicU32` rank slots updated by CAS from a rayon pool
//! - **Convergence**: L1 change between sweep snapshots, with iteration cap,
//!   deadline, and cancellation
//! - **Inflation**: plan and evaluate link injection toward a target page
//! - **Binaries**: `build-backlinks` and `compute-pagerank`

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod algorithms;
pub mod config;
pub mod error;
pub mod storage;

// Re-export core types
pub use algorithms::{
    evaluate_inflation, inflation_candidates, normalized_by_min, pagerank, percentiles, top_k,
    ConvergenceController, ConvergenceReport, InflationOutcome, InflationPlan, PageRankResult,
    RankSummary, RankVector, RelaxationEngine, SweepStats,
};
pub use config::{CancelToken, ChangeMetric, Partitioning, RankConfig};
pub use storage::{BacklinkIndex, BuildOptions, EdgeList, NodeId, OutOfRangePolicy};

// Error type
pub use error::{RankError, Result};
