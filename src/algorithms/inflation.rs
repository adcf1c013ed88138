//! Link-injection planning against a converged rank vector
//!
//! Adding a link from page `p` (rank `r`, outdegree `k`) to a target lends the
//! target roughly `d * r / (k + 1)` of rank. [`inflation_candidates`] ranks
//! every page by that estimate and picks the best ones until the target's
//! min-normalized rank should reach a requested value;
//! [`evaluate_inflation`] injects the links and reruns `PageRank` to measure
//! what actually happens.

use super::pagerank::pagerank;
use crate::config::RankConfig;
use crate::error::{RankError, Result};
use crate::storage::{BacklinkIndex, BuildOptions, EdgeList, NodeId};

/// Pages to link from, and the boost they are expected to give
#[derive(Debug, Clone, PartialEq)]
pub struct InflationPlan {
    /// Page whose rank is inflated
    pub target: NodeId,
    /// Pages that should each gain one link to `target`, best first
    pub linking_pages: Vec<u32>,
    /// Predicted increase of the target's min-normalized rank
    pub predicted_boost: f64,
}

/// Result of rerunning `PageRank` with the planned links in place
#[derive(Debug, Clone)]
pub struct InflationOutcome {
    /// Min-normalized rank of the target before injection
    pub before: f64,
    /// Min-normalized rank of the target after injection
    pub after: f64,
    /// Full rank vector of the modified graph
    pub ranks: Vec<f32>,
}

fn smallest_positive(ranks: &[f32]) -> Result<f64> {
    ranks
        .iter()
        .copied()
        .filter(|&r| r > 0.0)
        .fold(None, |min: Option<f32>, r| Some(min.map_or(r, |m| m.min(r))))
        .map(f64::from)
        .ok_or_else(|| RankError::InvalidConfig("rank vector has no positive entry".to_string()))
}

fn check_lengths(index: &BacklinkIndex, ranks: &[f32], target: NodeId) -> Result<()> {
    let n = index.num_nodes();
    if ranks.len() != n {
        return Err(RankError::IndexOutOfRange {
            what: "rank vector length",
            index: ranks.len() as u64,
            bound: n as u64,
        });
    }
    if target.0 as usize >= n {
        return Err(RankError::IndexOutOfRange {
            what: "target node",
            index: u64::from(target.0),
            bound: n as u64,
        });
    }
    Ok(())
}

/// Choose pages whose new links should lift `target` to a min-normalized
/// rank of about `amount`
///
/// Pages already linking to `target`, and `target` itself, are skipped.
/// Pages are taken in decreasing order of `damping * rank / (outdegree + 1)`
/// until the summed estimate reaches the missing rank. A target already at or
/// above `amount` gets an empty plan.
///
/// # Errors
///
/// Returns [`RankError::IndexOutOfRange`] if `ranks` does not match the index
/// or `target` is not a node, and [`RankError::InvalidConfig`] if no rank is
/// positive
pub fn inflation_candidates(
    index: &BacklinkIndex,
    ranks: &[f32],
    target: NodeId,
    amount: f64,
    damping: f32,
) -> Result<InflationPlan> {
    check_lengths(index, ranks, target)?;
    let min_rank = smallest_positive(ranks)?;

    let current = f64::from(ranks[target.0 as usize]);
    let missing = (amount * min_rank) - current;

    let (_, _, _, outlinks) = index.components();
    let boost = |page: usize| f64::from(damping) * f64::from(ranks[page]) / f64::from(outlinks[page] + 1);

    let mut existing = index.backlinks_of(target)?.to_vec();
    existing.sort_unstable();
    let mut pages: Vec<usize> = (0..ranks.len())
        .filter(|&page| page != target.0 as usize)
        .collect();
    pages.sort_by(|&a, &b| boost(b).total_cmp(&boost(a)).then(a.cmp(&b)));

    let mut total = 0.0;
    let mut linking_pages = Vec::new();
    for page in pages {
        if total >= missing {
            break;
        }
        #[allow(clippy::cast_possible_truncation)] // page < num_nodes <= u32::MAX + 1
        let page_id = page as u32;
        if existing.binary_search(&page_id).is_ok() {
            continue;
        }
        total += boost(page);
        linking_pages.push(page_id);
    }

    log::info!(
        "Inflation plan for node {}: {} links, predicted boost {:.3} (normalized)",
        target.0,
        linking_pages.len(),
        total / min_rank
    );

    Ok(InflationPlan {
        target,
        linking_pages,
        predicted_boost: total / min_rank,
    })
}

/// Inject the links of `plan` into `index` and rerun `PageRank`
///
/// The modified index is rebuilt from the forward adjacency of `index` plus
/// one edge from every linking page to the target.
///
/// # Errors
///
/// Returns the errors of [`inflation_candidates`]' validation, of
/// [`BacklinkIndex::build`] and of [`pagerank`]
pub fn evaluate_inflation(
    index: &BacklinkIndex,
    ranks: &[f32],
    plan: &InflationPlan,
    config: &RankConfig,
) -> Result<InflationOutcome> {
    check_lengths(index, ranks, plan.target)?;
    let before = f64::from(ranks[plan.target.0 as usize]) / smallest_positive(ranks)?;

    let mut edges: Vec<(NodeId, NodeId)> = Vec::with_capacity(index.num_edges() + plan.linking_pages.len());
    for (src, dsts) in index.outlinks().into_iter().enumerate() {
        #[allow(clippy::cast_possible_truncation)] // src < num_nodes
        let src = NodeId(src as u32);
        edges.extend(dsts.into_iter().map(|dst| (src, NodeId(dst))));
    }
    edges.extend(plan.linking_pages.iter().map(|&page| (NodeId(page), plan.target)));

    #[allow(clippy::cast_possible_truncation)] // num_nodes fits the u32 id space
    let nodes = (0..index.num_nodes()).map(|id| NodeId(id as u32)).collect();
    let modified = BacklinkIndex::build(&EdgeList::new(nodes, edges), BuildOptions::default())?;

    let result = pagerank(&modified, config)?;
    let after = f64::from(result.ranks[plan.target.0 as usize]) / smallest_positive(&result.ranks)?;
    log::info!(
        "Node {} moved from {before:.3} to {after:.3} (normalized)",
        plan.target.0
    );

    Ok(InflationOutcome {
        before,
        after,
        ranks: result.ranks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_from(edges: &[(u32, u32)]) -> BacklinkIndex {
        let list = EdgeList::from_edges(edges.iter().map(|&(s, d)| (NodeId(s), NodeId(d))).collect());
        BacklinkIndex::build(&list, BuildOptions::default()).unwrap()
    }

    fn ring_with_tail() -> BacklinkIndex {
        // Ring 0..6 plus node 6 linked only from 5
        index_from(&[(0, 1), (1, 2), (2, 3), (3, 4), (4, 5), (5, 0), (5, 6), (6, 0)])
    }

    #[test]
    fn test_candidates_order_and_skip_existing() {
        let index = ring_with_tail();
        let ranks = pagerank(&index, &RankConfig::default()).unwrap().ranks;
        let target = NodeId(6);

        let plan = inflation_candidates(&index, &ranks, target, 1_000.0, 0.85).unwrap();

        // Huge goal: every page except the target and its existing backlink
        assert_eq!(plan.linking_pages.len(), 5);
        assert!(!plan.linking_pages.contains(&5));
        assert!(!plan.linking_pages.contains(&6));

        // Best estimated boost first
        let (_, _, _, outlinks) = index.components();
        let boost = |p: u32| ranks[p as usize] / (outlinks[p as usize] + 1) as f32;
        for pair in plan.linking_pages.windows(2) {
            assert!(boost(pair[0]) >= boost(pair[1]));
        }
        assert!(plan.predicted_boost > 0.0);
    }

    #[test]
    fn test_candidates_stop_at_goal() {
        let index = ring_with_tail();
        let ranks = pagerank(&index, &RankConfig::default()).unwrap().ranks;
        let min = ranks.iter().copied().fold(f32::INFINITY, f32::min);
        let current = f64::from(ranks[6] / min);

        // Already there: nothing to do
        let plan = inflation_candidates(&index, &ranks, NodeId(6), current * 0.5, 0.85).unwrap();
        assert!(plan.linking_pages.is_empty());

        // A modest goal needs fewer links than a huge one
        let modest = inflation_candidates(&index, &ranks, NodeId(6), current * 1.05, 0.85).unwrap();
        let huge = inflation_candidates(&index, &ranks, NodeId(6), 1_000.0, 0.85).unwrap();
        assert!(!modest.linking_pages.is_empty());
        assert!(modest.linking_pages.len() < huge.linking_pages.len());
    }

    #[test]
    fn test_evaluate_raises_target() {
        let index = ring_with_tail();
        let config = RankConfig::default();
        let ranks = pagerank(&index, &config).unwrap().ranks;

        let plan = inflation_candidates(&index, &ranks, NodeId(6), 1_000.0, config.damping).unwrap();
        let outcome = evaluate_inflation(&index, &ranks, &plan, &config).unwrap();

        assert!(outcome.after > outcome.before, "{} -> {}", outcome.before, outcome.after);
        assert_eq!(outcome.ranks.len(), ranks.len());
        // Original index untouched
        assert_eq!(index.backlinks_of(NodeId(6)).unwrap(), &[5]);
    }

    #[test]
    fn test_empty_plan_changes_nothing() {
        let index = ring_with_tail();
        let config = RankConfig::default();
        let ranks = pagerank(&index, &config).unwrap().ranks;

        let plan = InflationPlan {
            target: NodeId(6),
            linking_pages: Vec::new(),
            predicted_boost: 0.0,
        };
        let outcome = evaluate_inflation(&index, &ranks, &plan, &config).unwrap();
        assert!((outcome.after - outcome.before).abs() < 1e-3);
    }

    #[test]
    fn test_bad_inputs() {
        let index = ring_with_tail();
        let ranks = vec![0.1_f32; 7];

        let err = inflation_candidates(&index, &ranks, NodeId(7), 10.0, 0.85).unwrap_err();
        assert!(matches!(err, RankError::IndexOutOfRange { what: "target node", .. }));

        let err = inflation_candidates(&index, &ranks[..3], NodeId(0), 10.0, 0.85).unwrap_err();
        assert!(matches!(err, RankError::IndexOutOfRange { .. }));

        let err = inflation_candidates(&index, &[0.0; 7], NodeId(0), 10.0, 0.85).unwrap_err();
        assert!(matches!(err, RankError::InvalidConfig(_)));
    }
}
