//! Rank computation settings

use crate::error::{RankError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Damping factor for `PageRank` (Google standard)
pub const DEFAULT_DAMPING: f32 = 0.85;

/// Change between sweeps below which iteration stops
pub const DEFAULT_CHANGE_THRESHOLD: f64 = 1e-7;

/// Sweep cap guarding against graphs that never settle
pub const DEFAULT_MAX_ITERATIONS: usize = 10_000;

/// How nodes are dealt out to workers within one sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Partitioning {
    /// Worker `w` owns one contiguous range of about `n / workers` nodes
    #[default]
    Contiguous,
    /// Node `i` belongs to worker `i % workers`
    RoundRobin,
    /// Every worker sweeps every node, so workers race on the same slots
    Replicated,
}

impl std::fmt::Display for Partitioning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Contiguous => f.write_str("contiguous"),
            Self::RoundRobin => f.write_str("round-robin"),
            Self::Replicated => f.write_str("replicated"),
        }
    }
}

/// How the change between consecutive sweeps is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChangeMetric {
    /// L1 norm `Σ|current - previous|` over the `f32` values
    #[default]
    Numeric,
    /// Mean of the wrapping `u32` difference of the bit patterns
    ///
    /// Reproduces historical reference runs. It is not a numeric distance: a
    /// rank that decreases by one ulp counts as a change of about 4e9.
    BitPattern,
}

impl std::fmt::Display for ChangeMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Numeric => f.write_str("numeric"),
            Self::BitPattern => f.write_str("bit-pattern"),
        }
    }
}

/// Cooperative stop signal, checked between sweeps
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Fresh, uncancelled token
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop before the next sweep
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether [`cancel`](Self::cancel) has been called
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Settings for [`pagerank`](crate::pagerank)
#[derive(Debug, Clone)]
pub struct RankConfig {
    /// Damping factor `d`, in the open interval (0, 1)
    pub damping: f32,

    /// Stop once the measured change falls below this value
    pub change_threshold: f64,

    /// Concurrent workers per sweep (default: available cores)
    pub workers: usize,

    /// Assignment of nodes to workers
    pub partitioning: Partitioning,

    /// Change measurement between sweeps
    pub change_metric: ChangeMetric,

    /// Sweep cap, `None` for unbounded
    pub max_iterations: Option<usize>,

    /// Wall-clock budget for the whole computation
    pub deadline: Option<Duration>,

    /// External stop signal
    pub cancel: CancelToken,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            damping: DEFAULT_DAMPING,
            change_threshold: DEFAULT_CHANGE_THRESHOLD,
            workers: num_cpus::get().max(1),
            partitioning: Partitioning::default(),
            change_metric: ChangeMetric::default(),
            max_iterations: Some(DEFAULT_MAX_ITERATIONS),
            deadline: None,
            cancel: CancelToken::new(),
        }
    }
}

impl RankConfig {
    /// Check every field
    ///
    /// # Errors
    ///
    /// Returns [`RankError::InvalidConfig`] naming the first bad field
    pub fn validate(&self) -> Result<()> {
        if !(self.damping > 0.0 && self.damping < 1.0) {
            return Err(RankError::InvalidConfig(format!(
                "damping must be in (0, 1), got {}",
                self.damping
            )));
        }
        if !(self.change_threshold.is_finite() && self.change_threshold > 0.0) {
            return Err(RankError::InvalidConfig(format!(
                "change threshold must be positive and finite, got {}",
                self.change_threshold
            )));
        }
        if self.workers == 0 {
            return Err(RankError::InvalidConfig(
                "at least one worker is required".to_string(),
            ));
        }
        if self.max_iterations == Some(0) {
            return Err(RankError::InvalidConfig(
                "max iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RankConfig::default();
        config.validate().unwrap();
        assert!((config.damping - 0.85).abs() < f32::EPSILON);
        assert!(config.workers >= 1);
        assert_eq!(config.partitioning, Partitioning::Contiguous);
        assert_eq!(config.change_metric, ChangeMetric::Numeric);
    }

    #[test]
    fn test_rejects_bad_damping() {
        for damping in [0.0, 1.0, -0.5, f32::NAN] {
            let config = RankConfig {
                damping,
                ..RankConfig::default()
            };
            assert!(
                matches!(config.validate(), Err(RankError::InvalidConfig(_))),
                "damping {damping} accepted"
            );
        }
    }

    #[test]
    fn test_rejects_bad_threshold_and_workers() {
        let config = RankConfig {
            change_threshold: 0.0,
            ..RankConfig::default()
        };
        assert!(config.validate().is_err());

        let config = RankConfig {
            workers: 0,
            ..RankConfig::default()
        };
        assert!(config.validate().is_err());

        let config = RankConfig {
            max_iterations: Some(0),
            ..RankConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cancel_token_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        token.cancel();
        assert!(clone.is_cancelled());
    }
}
