//! `PageRank` over a compressed backlink index
//!
//! Based on Page et al. (1999) "The `PageRank` Citation Ranking: Bringing Order to the Web"
//! Implementation uses lock-free asynchronous relaxation; see
//! [`relaxation`](super::relaxation) for the update discipline.

use super::convergence::{ConvergenceController, ConvergenceReport};
use super::rank_vector::RankVector;
use super::relaxation::RelaxationEngine;
use crate::config::RankConfig;
use crate::error::Result;
use crate::storage::BacklinkIndex;

/// Converged ranks plus how they were reached
#[derive(Debug, Clone)]
pub struct PageRankResult {
    /// One rank per node
    pub ranks: Vec<f32>,
    /// Sweeps, final change, retries, time
    pub report: ConvergenceReport,
}

/// Compute `PageRank` scores for all nodes in the index
///
/// # Arguments
///
/// * `index` - Compressed backlink index
/// * `config` - Damping, threshold, workers and stopping rules
///
/// # Returns
///
/// Vector of `PageRank` scores, one per node. On graphs where every node has
/// outgoing edges the scores sum to 1.0; dangling nodes leak rank.
///
/// # Algorithm
///
/// `PageRank` formula:
/// ```text
/// PR(u) = (1-d)/A + d * Σ(PR(v) / outdegree(v))
/// ```
///
/// Where:
/// - d = damping factor (default 0.85)
/// - A = number of nodes with outdegree > 0
/// - v = nodes with edges to u
///
/// # Errors
///
/// Returns configuration errors, [`NoActiveNodes`](crate::RankError::NoActiveNodes)
/// for graphs without edges, and the stop conditions of
/// [`ConvergenceController::run`]
///
/// # Example
///
/// ```
/// use trueno_rank::{pagerank, BacklinkIndex, EdgeList, NodeId, RankConfig};
///
/// let edges = EdgeList::from_edges(vec![
///     (NodeId(0), NodeId(1)),
///     (NodeId(1), NodeId(2)),
///     (NodeId(2), NodeId(0)), // Cycle
/// ]);
/// let index = BacklinkIndex::build(&edges, Default::default()).unwrap();
///
/// let result = pagerank(&index, &RankConfig::default()).unwrap();
/// assert_eq!(result.ranks.len(), 3);
/// assert!((result.ranks.iter().sum::<f32>() - 1.0).abs() < 1e-3); // Sum = 1.0
/// ```
pub fn pagerank(index: &BacklinkIndex, config: &RankConfig) -> Result<PageRankResult> {
    config.validate()?;

    let n = index.num_nodes();
    if n == 0 {
        return Ok(PageRankResult {
            ranks: Vec::new(),
            report: ConvergenceReport {
                iterations: 0,
                last_change: 0.0,
                retries: 0,
                elapsed: std::time::Duration::ZERO,
            },
        });
    }

    log::info!(
        "PageRank: {} nodes, {} edges, {} active",
        n,
        index.num_edges(),
        index.num_active()
    );
    log::info!(
        "Damping {}, threshold {:e} ({} change), {} workers ({} partitioning)",
        config.damping,
        config.change_threshold,
        config.change_metric,
        config.workers,
        config.partitioning
    );

    let engine = RelaxationEngine::new(index, config)?;
    let ranks = RankVector::uniform(n);
    let report = ConvergenceController::new(config).run(&engine, &ranks)?;

    Ok(PageRankResult {
        ranks: ranks.into_ranks(),
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChangeMetric, Partitioning};
    use crate::error::RankError;
    use crate::storage::{BuildOptions, EdgeList, NodeId};

    fn index_from(edges: &[(u32, u32)]) -> BacklinkIndex {
        let list = EdgeList::from_edges(edges.iter().map(|&(s, d)| (NodeId(s), NodeId(d))).collect());
        BacklinkIndex::build(&list, BuildOptions::default()).unwrap()
    }

    #[test]
    fn test_pagerank_cycle() {
        // Cycle: 0 → 1 → 2 → 0
        let index = index_from(&[(0, 1), (1, 2), (2, 0)]);

        let scores = pagerank(&index, &RankConfig::default()).unwrap().ranks;

        // In a symmetric cycle, all nodes should have equal rank
        assert_eq!(scores.len(), 3);

        let sum: f32 = scores.iter().sum();
        assert!((sum - 1.0).abs() < 1e-3);

        // All scores should be approximately 1/3
        for score in &scores {
            assert!((*score - 1.0 / 3.0).abs() < 0.01, "Score = {score}");
        }
    }

    #[test]
    fn test_pagerank_scenario_fixed_point() {
        // 0 → 1, 0 → 2, 1 → 3, 2 → 1; node 3 dangling, A = 3
        let index = index_from(&[(0, 1), (0, 2), (1, 3), (2, 1)]);

        let scores = pagerank(&index, &RankConfig::default()).unwrap().ranks;

        let t = 0.15 / 3.0;
        let r0 = t;
        let r2 = t + 0.85 * r0 / 2.0;
        let r1 = t + 0.85 * (r0 / 2.0 + r2);
        let r3 = t + 0.85 * r1;
        for (got, want) in scores.iter().zip([r0, r1, r2, r3]) {
            assert!((got - want).abs() < 1e-5, "got {got}, want {want}");
        }

        // Two backlinks beat one
        assert!(scores[1] > scores[2]);
    }

    #[test]
    fn test_pagerank_star() {
        // Star: 0 ↔ 1, 0 ↔ 2, 0 ↔ 3 (all point to center)
        let index = index_from(&[(1, 0), (2, 0), (3, 0), (0, 1), (0, 2), (0, 3)]);

        let scores = pagerank(&index, &RankConfig::default()).unwrap().ranks;

        // Center node (0) should have highest score
        assert!(scores[0] > scores[1]);
        assert!(scores[0] > scores[2]);
        assert!(scores[0] > scores[3]);

        // Peripheral nodes should have similar scores
        assert!((scores[1] - scores[2]).abs() < 0.01);
        assert!((scores[2] - scores[3]).abs() < 0.01);
    }

    #[test]
    fn test_pagerank_empty_index() {
        let result = pagerank(&BacklinkIndex::empty(), &RankConfig::default()).unwrap();
        assert!(result.ranks.is_empty());
        assert_eq!(result.report.iterations, 0);
    }

    #[test]
    fn test_pagerank_single_node_no_edges() {
        let list = EdgeList::new(vec![NodeId(0)], Vec::new());
        let index = BacklinkIndex::build(&list, BuildOptions::default()).unwrap();

        let err = pagerank(&index, &RankConfig::default()).unwrap_err();
        assert!(matches!(err, RankError::NoActiveNodes { nodes: 1 }));
    }

    #[test]
    fn test_pagerank_single_node_self_loop() {
        let index = index_from(&[(0, 0)]);

        let scores = pagerank(&index, &RankConfig::default()).unwrap().ranks;
        assert_eq!(scores.len(), 1);
        assert!((scores[0] - 1.0).abs() < 1e-5); // Single node gets all rank
    }

    #[test]
    fn test_pagerank_partitionings_agree() {
        let mut edges = Vec::new();
        for i in 0..40 {
            edges.push((i, (i + 1) % 40));
            edges.push((i, (i * 7 + 3) % 40));
        }
        let index = index_from(&edges);

        let mut results = Vec::new();
        for partitioning in [
            Partitioning::Contiguous,
            Partitioning::RoundRobin,
            Partitioning::Replicated,
        ] {
            let config = RankConfig {
                workers: 4,
                partitioning,
                ..RankConfig::default()
            };
            results.push(pagerank(&index, &config).unwrap().ranks);
        }

        for other in &results[1..] {
            for (a, b) in results[0].iter().zip(other) {
                assert!((a - b).abs() < 1e-4, "{a} vs {b}");
            }
        }
    }

    #[test]
    fn test_pagerank_bit_pattern_metric() {
        // Chain: one ordered sweep reaches the exact fixed point
        let index = index_from(&[(0, 1), (1, 2), (2, 3)]);
        let config = RankConfig {
            change_metric: ChangeMetric::BitPattern,
            max_iterations: Some(100),
            workers: 1,
            ..RankConfig::default()
        };

        let result = pagerank(&index, &config).unwrap();
        assert!(result.report.last_change < 1e-7);
    }
}
