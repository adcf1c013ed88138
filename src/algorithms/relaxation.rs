//! One parallel relaxation sweep over the backlink index
//!
//! Based on Page et al. (1999) "The `PageRank` Citation Ranking: Bringing Order
//! to the Web", simplified recurrence with damping:
//!
//! ```text
//! PR(n) = (1-d)/A + d * Σ(PR(b) / outdegree(b))   for every backlink b of n
//! ```
//!
//! Where:
//! - d = damping factor
//! - A = number of active nodes (outdegree > 0)
//!
//! # Update discipline
//!
//! Each slot is replaced with a compare-and-swap on its bit pattern: read the
//! old bits, recompute the rank from the *current* backlink ranks, and swap
//! only if the slot still holds the old bits; otherwise recompute. Workers read
//! ranks that other workers are updating in the same sweep, which makes this
//! an asynchronous Gauss–Seidel-like iteration rather than a Jacobi one.
//!
//! Runs are therefore **not bit-reproducible**: the interleaving of workers
//! decides which neighbor values each update sees. The fixed point is the
//! same; the path to it, and the last few ulps, are not.

use super::rank_vector::RankVector;
use crate::config::{Partitioning, RankConfig};
use crate::error::{RankError, Result};
use crate::storage::BacklinkIndex;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::iter::StepBy;
use std::ops::Range;
use std::sync::atomic::Ordering;

/// Counters for one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Successful slot replacements
    pub updates: u64,
    /// Compare-and-swap failures that forced a recomputation
    pub retries: u64,
}

impl std::ops::Add for SweepStats {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            updates: self.updates + rhs.updates,
            retries: self.retries + rhs.retries,
        }
    }
}

impl Partitioning {
    /// Nodes that `worker` (of `workers`) updates in a sweep over `n` nodes
    #[must_use]
    pub fn nodes(self, worker: usize, workers: usize, n: usize) -> StepBy<Range<usize>> {
        match self {
            Self::Contiguous => {
                let chunk = n.div_ceil(workers.max(1));
                let start = (worker * chunk).min(n);
                let end = (start + chunk).min(n);
                (start..end).step_by(1)
            }
            Self::RoundRobin => (worker.min(n)..n).step_by(workers.max(1)),
            Self::Replicated => (0..n).step_by(1),
        }
    }
}

/// Parallel sweep executor
///
/// Holds a thread pool of `workers` threads for its whole lifetime; every
/// [`sweep`](Self::sweep) fans out one task per worker and returns only after
/// all of them finish.
pub struct RelaxationEngine<'a> {
    index: &'a BacklinkIndex,
    damping: f32,
    teleport: f32,
    workers: usize,
    partitioning: Partitioning,
    pool: ThreadPool,
}

impl std::fmt::Debug for RelaxationEngine<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelaxationEngine")
            .field("damping", &self.damping)
            .field("teleport", &self.teleport)
            .field("workers", &self.workers)
            .field("partitioning", &self.partitioning)
            .finish_non_exhaustive()
    }
}

impl<'a> RelaxationEngine<'a> {
    /// Engine over `index` with the damping, workers and partitioning of
    /// `config`
    ///
    /// # Errors
    ///
    /// Returns [`RankError::InvalidConfig`] for a bad configuration or if the
    /// thread pool cannot be built, and [`RankError::NoActiveNodes`] if the
    /// index has nodes but none of them links anywhere
    #[allow(clippy::cast_precision_loss)] // Active counts >16M round in the teleport term only
    pub fn new(index: &'a BacklinkIndex, config: &RankConfig) -> Result<Self> {
        config.validate()?;

        let num_active = index.num_active();
        if num_active == 0 && index.num_nodes() > 0 {
            return Err(RankError::NoActiveNodes {
                nodes: index.num_nodes(),
            });
        }
        let teleport = (1.0 - config.damping) / num_active.max(1) as f32;

        let pool = ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("relax-{i}"))
            .build()
            .map_err(|e| RankError::InvalidConfig(format!("cannot start workers: {e}")))?;

        Ok(Self {
            index,
            damping: config.damping,
            teleport,
            workers: config.workers,
            partitioning: config.partitioning,
            pool,
        })
    }

    /// Index this engine sweeps over
    #[must_use]
    pub fn index(&self) -> &'a BacklinkIndex {
        self.index
    }

    /// Constant `(1 - d) / A` term
    #[must_use]
    pub fn teleport(&self) -> f32 {
        self.teleport
    }

    /// Update every node once, in parallel
    ///
    /// # Errors
    ///
    /// Returns [`RankError::IndexOutOfRange`] if `ranks` does not have one slot
    /// per node or a backlink points outside the rank vector
    pub fn sweep(&self, ranks: &RankVector) -> Result<SweepStats> {
        let n = self.index.num_nodes();
        if ranks.len() != n {
            return Err(RankError::IndexOutOfRange {
                what: "rank vector length",
                index: ranks.len() as u64,
                bound: n as u64,
            });
        }

        self.pool.install(|| {
            (0..self.workers)
                .into_par_iter()
                .map(|worker| self.relax_partition(ranks, worker))
                .try_reduce(SweepStats::default, |a, b| Ok(a + b))
        })
    }

    fn relax_partition(&self, ranks: &RankVector, worker: usize) -> Result<SweepStats> {
        let mut stats = SweepStats::default();
        for node in self.partitioning.nodes(worker, self.workers, ranks.len()) {
            stats.retries += self.relax_node(ranks, node)?;
            stats.updates += 1;
        }
        Ok(stats)
    }

    /// Recompute and swap in the rank of `node`, returning the number of
    /// failed compare-and-swaps
    ///
    /// # Errors
    ///
    /// Returns [`RankError::IndexOutOfRange`] if `node` or one of its
    /// backlinks has no rank slot
    pub fn relax_node(&self, ranks: &RankVector, node: usize) -> Result<u64> {
        if node >= self.index.num_nodes() {
            return Err(RankError::IndexOutOfRange {
                what: "node",
                index: node as u64,
                bound: self.index.num_nodes() as u64,
            });
        }
        let slot = ranks.slot(node)?;
        let mut retries = 0;

        loop {
            let old = slot.load(Ordering::Acquire);
            let new = self.teleport + self.damping * self.backlink_sum(ranks, node)?;

            match slot.compare_exchange_weak(old, new.to_bits(), Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return Ok(retries),
                Err(_) => retries += 1,
            }
        }
    }

    /// `Σ PR(b) / outdegree(b)` over the backlinks of `node`
    fn backlink_sum(&self, ranks: &RankVector, node: usize) -> Result<f32> {
        let (backlinks, counts, cumsum, outlinks) = self.index.components();
        let end = cumsum[node] as usize;
        let start = end - counts[node] as usize;

        let mut sum = 0.0_f32;
        for &source in &backlinks[start..end] {
            let source = source as usize;
            let rank = f32::from_bits(ranks.slot(source)?.load(Ordering::Relaxed));
            // from_parts/build guarantee every backlink source has outdegree > 0
            #[allow(clippy::cast_precision_loss)]
            let outdegree = outlinks[source] as f32;
            sum += rank / outdegree;
        }
        Ok(sum)
    }
}
