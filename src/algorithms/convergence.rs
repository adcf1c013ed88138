//! Repeated sweeps until the rank vector settles

use super::rank_vector::RankVector;
use super::relaxation::RelaxationEngine;
use crate::config::{CancelToken, ChangeMetric, RankConfig};
use crate::error::{RankError, Result};
use std::time::{Duration, Instant};

/// Summary of a converged run
#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceReport {
    /// Sweeps performed
    pub iterations: usize,
    /// Change measured after the last sweep
    pub last_change: f64,
    /// Compare-and-swap retries over all sweeps
    pub retries: u64,
    /// Wall-clock time spent sweeping
    pub elapsed: Duration,
}

impl ChangeMetric {
    /// Change between two snapshots of `f32` bit patterns
    ///
    /// `Numeric` is the L1 norm `Σ|current - previous|`, which does not shrink
    /// as the graph grows. `BitPattern` is the mean wrapping difference of the
    /// raw bits. Both return 0 for empty snapshots.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn change(self, current: &[u32], previous: &[u32]) -> f64 {
        debug_assert_eq!(current.len(), previous.len());
        if current.is_empty() {
            return 0.0;
        }

        match self {
            Self::Numeric => current
                .iter()
                .zip(previous)
                .map(|(&a, &b)| (f64::from(f32::from_bits(a)) - f64::from(f32::from_bits(b))).abs())
                .sum(),
            Self::BitPattern => {
                let total: f64 = current
                    .iter()
                    .zip(previous)
                    .map(|(&a, &b)| f64::from(a.wrapping_sub(b)))
                    .sum();
                total / current.len() as f64
            }
        }
    }
}

/// Drives [`RelaxationEngine`] sweeps until the change drops below a threshold
///
/// After every sweep the controller snapshots the rank vector and compares it
/// with the snapshot taken before the sweep. Cancellation and the deadline are
/// checked between sweeps, never inside one.
#[derive(Debug, Clone)]
pub struct ConvergenceController {
    threshold: f64,
    metric: ChangeMetric,
    max_iterations: Option<usize>,
    deadline: Option<Duration>,
    cancel: CancelToken,
}

impl ConvergenceController {
    /// Controller with the stopping rules of `config`
    #[must_use]
    pub fn new(config: &RankConfig) -> Self {
        Self {
            threshold: config.change_threshold,
            metric: config.change_metric,
            max_iterations: config.max_iterations,
            deadline: config.deadline,
            cancel: config.cancel.clone(),
        }
    }

    /// Sweep `ranks` in place until convergence
    ///
    /// # Errors
    ///
    /// - [`RankError::ConvergenceTimeout`] when the sweep cap is reached
    /// - [`RankError::DeadlineExceeded`] when the deadline passes
    /// - [`RankError::Cancelled`] when the cancel token fires
    /// - any sweep error from the engine
    ///
    /// `ranks` keeps the last swept values in every case.
    pub fn run(&self, engine: &RelaxationEngine<'_>, ranks: &RankVector) -> Result<ConvergenceReport> {
        let start = Instant::now();
        let mut previous = Vec::with_capacity(ranks.len());
        let mut current = Vec::with_capacity(ranks.len());
        ranks.snapshot_bits_into(&mut previous);

        let mut iterations = 0;
        let mut retries = 0;

        loop {
            if self.cancel.is_cancelled() {
                log::warn!("Cancelled after {iterations} sweeps");
                return Err(RankError::Cancelled { iterations });
            }
            if let Some(deadline) = self.deadline {
                if start.elapsed() >= deadline {
                    return Err(RankError::DeadlineExceeded {
                        deadline,
                        iterations,
                    });
                }
            }

            let stats = engine.sweep(ranks)?;
            iterations += 1;
            retries += stats.retries;

            ranks.snapshot_bits_into(&mut current);
            let change = self.metric.change(&current, &previous);
            log::debug!(
                "Sweep {iterations}: change {change:.3e}, {} updates, {} retries",
                stats.updates,
                stats.retries
            );

            if change < self.threshold {
                let report = ConvergenceReport {
                    iterations,
                    last_change: change,
                    retries,
                    elapsed: start.elapsed(),
                };
                log::info!(
                    "Converged after {} sweeps in {:.3?} (change {:.3e}, {} retries)",
                    report.iterations,
                    report.elapsed,
                    report.last_change,
                    report.retries
                );
                return Ok(report);
            }

            if self.max_iterations.is_some_and(|max| iterations >= max) {
                return Err(RankError::ConvergenceTimeout {
                    iterations,
                    last_change: change,
                });
            }

            std::mem::swap(&mut previous, &mut current);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Partitioning;
    use crate::storage::{BacklinkIndex, BuildOptions, EdgeList, NodeId};

    fn cycle_index(n: u32) -> BacklinkIndex {
        let edges = (0..n).map(|i| (NodeId(i), NodeId((i + 1) % n))).collect();
        BacklinkIndex::build(&EdgeList::from_edges(edges), BuildOptions::default()).unwrap()
    }

    #[test]
    fn test_numeric_change_is_l1_norm() {
        let current = [0.5_f32.to_bits(), 0.25_f32.to_bits()];
        let previous = [0.25_f32.to_bits(), 0.5_f32.to_bits()];

        // |0.25| + |-0.25|
        let change = ChangeMetric::Numeric.change(&current, &previous);
        assert!((change - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_bit_pattern_change_wraps() {
        let current = [10_u32, 5];
        let previous = [7_u32, 6];

        // (10 - 7) + (5 - 6 wrapping) = 3 + (2^32 - 1)
        let change = ChangeMetric::BitPattern.change(&current, &previous);
        let expected = (3.0 + f64::from(u32::MAX)) / 2.0;
        assert!((change - expected).abs() < 1e-3);
    }

    #[test]
    fn test_numeric_change_does_not_shrink_with_size() {
        // The same total shift spread over 10x more nodes measures the same
        let small_prev = vec![0.1_f32.to_bits(); 10];
        let small_cur = vec![0.11_f32.to_bits(); 10];
        let large_prev = vec![0.01_f32.to_bits(); 100];
        let large_cur = vec![0.011_f32.to_bits(); 100];

        let small = ChangeMetric::Numeric.change(&small_cur, &small_prev);
        let large = ChangeMetric::Numeric.change(&large_cur, &large_prev);
        assert!((small - 0.1).abs() < 1e-6);
        assert!((large - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_empty_change_is_zero() {
        assert!(ChangeMetric::Numeric.change(&[], &[]).abs() < f64::EPSILON);
        assert!(ChangeMetric::BitPattern.change(&[], &[]).abs() < f64::EPSILON);
    }

    #[test]
    fn test_cycle_converges_to_uniform() {
        let index = cycle_index(10);
        let config = RankConfig {
            workers: 4,
            ..RankConfig::default()
        };
        let engine = RelaxationEngine::new(&index, &config).unwrap();
        let ranks = RankVector::uniform(10);

        let report = ConvergenceController::new(&config).run(&engine, &ranks).unwrap();
        assert!(report.iterations >= 1);
        assert!(report.last_change < config.change_threshold);

        for rank in ranks.to_vec() {
            assert!((rank - 0.1).abs() < 1e-4, "rank = {rank}");
        }
    }

    #[test]
    fn test_iteration_cap() {
        // Start far from the fixed point so one sweep cannot settle
        let index = cycle_index(50);
        let config = RankConfig {
            workers: 2,
            max_iterations: Some(1),
            ..RankConfig::default()
        };
        let engine = RelaxationEngine::new(&index, &config).unwrap();
        let mut skewed = vec![0.0_f32; 50];
        skewed[0] = 1.0;
        let ranks = RankVector::from_ranks(&skewed);

        let err = ConvergenceController::new(&config)
            .run(&engine, &ranks)
            .unwrap_err();
        assert!(matches!(
            err,
            RankError::ConvergenceTimeout { iterations: 1, .. }
        ));
    }

    #[test]
    fn test_cancel_before_first_sweep() {
        let index = cycle_index(5);
        let config = RankConfig::default();
        config.cancel.cancel();

        let engine = RelaxationEngine::new(&index, &config).unwrap();
        let ranks = RankVector::uniform(5);

        let err = ConvergenceController::new(&config)
            .run(&engine, &ranks)
            .unwrap_err();
        assert!(matches!(err, RankError::Cancelled { iterations: 0 }));
        // No sweep ran
        assert_eq!(ranks.to_vec(), vec![0.2; 5]);
    }

    #[test]
    fn test_zero_deadline() {
        let index = cycle_index(5);
        let config = RankConfig {
            deadline: Some(Duration::ZERO),
            ..RankConfig::default()
        };
        let engine = RelaxationEngine::new(&index, &config).unwrap();

        let err = ConvergenceController::new(&config)
            .run(&engine, &RankVector::uniform(5))
            .unwrap_err();
        assert!(matches!(err, RankError::DeadlineExceeded { iterations: 0, .. }));
    }

    #[test]
    fn test_bit_pattern_metric_converges_on_dag() {
        // Chain: exact fixed point reached after a few sweeps
        let edges = vec![(NodeId(0), NodeId(1)), (NodeId(1), NodeId(2)), (NodeId(2), NodeId(3))];
        let index =
            BacklinkIndex::build(&EdgeList::from_edges(edges), BuildOptions::default()).unwrap();
        let config = RankConfig {
            workers: 3,
            partitioning: Partitioning::RoundRobin,
            change_metric: ChangeMetric::BitPattern,
            max_iterations: Some(100),
            ..RankConfig::default()
        };
        let engine = RelaxationEngine::new(&index, &config).unwrap();
        let ranks = RankVector::uniform(4);

        let report = ConvergenceController::new(&config).run(&engine, &ranks).unwrap();
        assert!(report.last_change < 1e-7);
    }
}
