//! Shared rank vector with atomic `f32` slots
//!
//! Ranks are stored as `AtomicU32` holding `f32::to_bits`, so that a slot can
//! be replaced with a compare-and-swap on its exact bit pattern.

use crate::error::{RankError, Result};
use std::sync::atomic::{AtomicU32, Ordering};

/// Fixed-length vector of per-node ranks, shared by all workers of a sweep
#[derive(Debug)]
pub struct RankVector {
    slots: Box<[AtomicU32]>,
}

impl RankVector {
    /// `n` slots initialized to `1 / n`
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Graphs >16M nodes lose precision in 1/n only
    pub fn uniform(n: usize) -> Self {
        let bits = if n == 0 { 0 } else { (1.0 / n as f32).to_bits() };
        Self::from_bits(vec![bits; n])
    }

    /// Vector holding the given ranks
    #[must_use]
    pub fn from_ranks(ranks: &[f32]) -> Self {
        Self::from_bits(ranks.iter().map(|r| r.to_bits()).collect())
    }

    /// Vector holding the given `f32` bit patterns
    #[must_use]
    pub fn from_bits(bits: Vec<u32>) -> Self {
        Self {
            slots: bits.into_iter().map(AtomicU32::new).collect(),
        }
    }

    /// Number of slots
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the vector has no slots
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Current rank of `node`, `None` if out of range
    #[must_use]
    pub fn get(&self, node: usize) -> Option<f32> {
        self.slots
            .get(node)
            .map(|slot| f32::from_bits(slot.load(Ordering::Relaxed)))
    }

    /// Atomic slot of `node`
    ///
    /// # Errors
    ///
    /// Returns [`RankError::IndexOutOfRange`] if `node` has no slot
    pub(crate) fn slot(&self, node: usize) -> Result<&AtomicU32> {
        self.slots.get(node).ok_or(RankError::IndexOutOfRange {
            what: "rank slot",
            index: node as u64,
            bound: self.slots.len() as u64,
        })
    }

    /// Copy the current bit patterns into `out`, reusing its allocation
    pub fn snapshot_bits_into(&self, out: &mut Vec<u32>) {
        out.clear();
        out.extend(self.slots.iter().map(|slot| slot.load(Ordering::Acquire)));
    }

    /// Current ranks
    #[must_use]
    pub fn to_vec(&self) -> Vec<f32> {
        self.slots
            .iter()
            .map(|slot| f32::from_bits(slot.load(Ordering::Acquire)))
            .collect()
    }

    /// Consume the vector, returning the final ranks
    #[must_use]
    pub fn into_ranks(self) -> Vec<f32> {
        self.slots
            .into_vec()
            .into_iter()
            .map(|slot| f32::from_bits(slot.into_inner()))
            .collect()
    }
}
