//! Diagnostics over a finished rank vector

/// Headline numbers of a rank vector
#[derive(Debug, Clone, PartialEq)]
pub struct RankSummary {
    /// Number of ranks
    pub len: usize,
    /// Sum of all ranks, accumulated in `f64`
    pub sum: f64,
    /// Smallest rank
    pub min: f32,
    /// Largest rank and its node
    pub max: (usize, f32),
    /// First few `(node, rank)` pairs
    pub samples: Vec<(usize, f32)>,
}

impl RankSummary {
    /// Summarize `ranks`, keeping up to `samples` leading entries
    ///
    /// Returns `None` for an empty vector.
    #[must_use]
    pub fn from_ranks(ranks: &[f32], samples: usize) -> Option<Self> {
        let (&first, _) = ranks.split_first()?;

        let mut sum = 0.0_f64;
        let mut min = first;
        let mut max = (0, first);
        for (node, &rank) in ranks.iter().enumerate() {
            sum += f64::from(rank);
            min = min.min(rank);
            if rank > max.1 {
                max = (node, rank);
            }
        }

        Some(Self {
            len: ranks.len(),
            sum,
            min,
            max,
            samples: ranks.iter().copied().enumerate().take(samples).collect(),
        })
    }

    /// Whether the sum is within `tolerance` of 1.0
    ///
    /// Holds for graphs where every node has outgoing edges; dangling nodes
    /// leak rank and pull the sum below 1.0.
    #[must_use]
    pub fn is_stochastic(&self, tolerance: f64) -> bool {
        (self.sum - 1.0).abs() <= tolerance
    }
}

/// Ranks divided by the smallest positive rank
///
/// Makes values readable on large graphs, where raw ranks are tiny. Zero and
/// negative ranks are left at zero.
#[must_use]
pub fn normalized_by_min(ranks: &[f32]) -> Vec<f32> {
    let min = ranks
        .iter()
        .copied()
        .filter(|&r| r > 0.0)
        .fold(f32::INFINITY, f32::min);

    ranks
        .iter()
        .map(|&r| if r > 0.0 { r / min } else { 0.0 })
        .collect()
}

/// Percentiles of `ranks` with linear interpolation between closest ranks
///
/// Each `q` is in `[0, 100]` and is clamped into that range. Returns an empty
/// vector for empty `ranks`.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn percentiles(ranks: &[f32], qs: &[f64]) -> Vec<f32> {
    if ranks.is_empty() {
        return Vec::new();
    }
    let mut sorted = ranks.to_vec();
    sorted.sort_by(f32::total_cmp);
    let last = sorted.len() - 1;

    qs.iter()
        .map(|&q| {
            let pos = q.clamp(0.0, 100.0) / 100.0 * last as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            let frac = pos - lo as f64;
            let value = f64::from(sorted[lo]) + (f64::from(sorted[hi]) - f64::from(sorted[lo])) * frac;
            value as f32
        })
        .collect()
}

/// The `k` highest-ranked nodes, best first; ties go to the lower node id
#[must_use]
pub fn top_k(ranks: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut order: Vec<(usize, f32)> = ranks.iter().copied().enumerate().collect();
    order.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    order.truncate(k);
    order
}
