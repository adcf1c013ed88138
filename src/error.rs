//! Error taxonomy for index building, persistence and rank computation

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Boxed error carried by edge source failures
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by trueno-rank
///
/// Every variant is fatal for the stage that raised it: both stages are cheap
/// to restart from their inputs, so nothing is retried or salvaged.
#[derive(Debug, Error)]
pub enum RankError {
    /// Edge/node source unreadable or inconsistent
    #[error("edge source error: {context}")]
    DataSource {
        /// What was being read and what went wrong
        context: String,
        /// Underlying reader error, if any
        #[source]
        source: Option<BoxedSource>,
    },

    /// Array file could not be read or written
    #[error("failed to access {}: {source}", path.display())]
    Persistence {
        /// File being accessed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Array file does not follow the length-prefixed layout
    #[error("malformed array file {}: {reason}", path.display())]
    MalformedArray {
        /// File being decoded
        path: PathBuf,
        /// Decoder diagnosis
        #[source]
        reason: ArrayFormatError,
    },

    /// A node or backlink index falls outside `[0, max_id]`
    #[error("{what} {index} out of range (expected < {bound})")]
    IndexOutOfRange {
        /// Which kind of index overflowed
        what: &'static str,
        /// Offending value
        index: u64,
        /// Exclusive upper bound
        bound: u64,
    },

    /// Backlink arrays disagree with each other
    #[error("inconsistent backlink index: {0}")]
    CorruptIndex(String),

    /// No node has an outgoing edge, so the teleport term is undefined
    #[error("graph has {nodes} nodes but none with outgoing edges")]
    NoActiveNodes {
        /// Number of nodes in the index
        nodes: usize,
    },

    /// Sweep budget exhausted before the change fell below the threshold
    #[error("no convergence after {iterations} sweeps (last change {last_change:e})")]
    ConvergenceTimeout {
        /// Sweeps performed
        iterations: usize,
        /// Change measured after the last sweep
        last_change: f64,
    },

    /// Wall-clock deadline passed before convergence
    #[error("deadline of {deadline:?} exceeded after {iterations} sweeps")]
    DeadlineExceeded {
        /// Configured deadline
        deadline: Duration,
        /// Sweeps performed
        iterations: usize,
    },

    /// Computation stopped through a [`CancelToken`](crate::CancelToken)
    #[error("rank computation cancelled after {iterations} sweeps")]
    Cancelled {
        /// Sweeps performed
        iterations: usize,
    },

    /// Rejected configuration value
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RankError {
    /// Edge source error without an underlying cause
    pub fn data_source(context: impl Into<String>) -> Self {
        Self::DataSource {
            context: context.into(),
            source: None,
        }
    }

    /// Edge source error wrapping a reader error
    pub fn data_source_with(
        context: impl Into<String>,
        source: impl Into<BoxedSource>,
    ) -> Self {
        Self::DataSource {
            context: context.into(),
            source: Some(source.into()),
        }
    }
}

/// Layout violations of the length-prefixed array format
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArrayFormatError {
    /// Fewer than four bytes: no length prefix
    #[error("missing length prefix ({0} bytes)")]
    MissingHeader(usize),

    /// Payload shorter than the length prefix announces
    #[error("truncated payload: header announces {expected} elements, found {found} bytes")]
    Truncated {
        /// Elements announced by the header
        expected: u64,
        /// Payload bytes present
        found: usize,
    },

    /// Payload longer than the length prefix announces
    #[error("{extra} trailing bytes after {expected} elements")]
    TrailingBytes {
        /// Elements announced by the header
        expected: u64,
        /// Bytes left over
        extra: usize,
    },

    /// Array does not fit the 32-bit length prefix
    #[error("array of {0} elements exceeds the u32 length prefix")]
    TooLong(usize),
}

/// Result alias used throughout the crate
pub type Result<T, E = RankError> = std::result::Result<T, E>;
