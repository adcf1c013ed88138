//! Compressed backlink index (CSR encoding of the reverse graph)
//!
//! # Layout
//!
//! ```text
//! Graph: 0 → 1, 0 → 2, 1 → 3, 2 → 1
//!
//! backlinks:        [0, 2, 0, 1]   // node 1 ← {0, 2}, node 2 ← {0}, node 3 ← {1}
//! backlinks_count:  [0, 2, 1, 1]   // incoming edges per node
//! backlinks_cumsum: [0, 2, 3, 4]   // node n: backlinks[cumsum[n-1] .. cumsum[n])
//! outlinks_count:   [2, 1, 1, 0]   // outgoing edges per node
//! ```
//!
//! Unlike the usual `n + 1` row offsets, `backlinks_cumsum` is inclusive: it has
//! one entry per node and the group of node 0 starts at 0.

use super::edge_list::EdgeList;
use super::array_io::{read_u32_array, write_u32_array};
use crate::error::{RankError, Result};
use std::path::Path;

/// Node identifier (zero-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// File holding the backlink sources
pub const BACKLINKS_FILE: &str = "backlinks.out";
/// File holding per-node backlink counts
pub const BACKLINKS_COUNT_FILE: &str = "backlinks_count.out";
/// File holding per-node cumulative backlink counts
pub const BACKLINKS_CUMSUM_FILE: &str = "backlinks_cumsum.out";
/// File holding per-node outdegrees
pub const OUTLINKS_COUNT_FILE: &str = "outlinks_count.out";

/// What to do with an edge whose endpoint is not a declared node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutOfRangePolicy {
    /// Fail with [`RankError::DataSource`], whether the endpoint lies above the
    /// largest declared id or in a gap of the node set
    #[default]
    Reject,
    /// Accept the endpoint, growing `max_id` if it lies above it
    Extend,
}

/// Options for [`BacklinkIndex::build`]
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Handling of edges that reference undeclared node ids
    pub out_of_range: OutOfRangePolicy,
}

/// Compressed backlink index
///
/// Built once, then shared read-only by every relaxation worker. All four
/// arrays are validated against each other at construction, so lookups on a
/// constructed index never divide by a zero outdegree.
///
/// # Example
///
/// ```
/// use trueno_rank::{BacklinkIndex, EdgeList, NodeId};
///
/// let edges = EdgeList::from_edges(vec![(NodeId(0), NodeId(1)), (NodeId(2), NodeId(1))]);
/// let index = BacklinkIndex::build(&edges, Default::default()).unwrap();
///
/// assert_eq!(index.backlinks_of(NodeId(1)).unwrap(), &[0, 2]);
/// assert_eq!(index.outdegree(NodeId(1)), Some(0));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BacklinkIndex {
    /// Sources of all edges, grouped by destination
    /// Length: `num_edges`
    backlinks: Vec<u32>,

    /// Incoming edges per node
    /// Length: `num_nodes`
    backlinks_count: Vec<u32>,

    /// Inclusive prefix sum of `backlinks_count`
    /// Length: `num_nodes`
    backlinks_cumsum: Vec<u32>,

    /// Outgoing edges per node
    /// Length: `num_nodes`
    outlinks_count: Vec<u32>,
}

impl BacklinkIndex {
    /// Build the index from a node set and an edge set
    ///
    /// Two passes over the edges (count, then scatter); sources keep their
    /// input order within each destination group.
    ///
    /// # Errors
    ///
    /// Returns [`RankError::DataSource`] if an edge references a node outside
    /// the declared node set under [`OutOfRangePolicy::Reject`], or if there are
    /// more than `u32::MAX` edges
    pub fn build(edge_list: &EdgeList, options: BuildOptions) -> Result<Self> {
        let edges = edge_list.edges();

        let declared_max = edge_list.nodes().iter().map(|n| n.0).max();
        let edge_max = edges.iter().flat_map(|(src, dst)| [src.0, dst.0]).max();

        let max_id = match (declared_max, edge_max, options.out_of_range) {
            (None, None, _) => {
                log::info!("Empty edge source: built an index with 0 nodes");
                return Ok(Self::empty());
            }
            (Some(declared), _, OutOfRangePolicy::Reject) => {
                check_declared(edge_list, declared)?;
                declared
            }
            (None, Some(_), OutOfRangePolicy::Reject) => {
                return Err(RankError::data_source(
                    "edges present but the node set is empty",
                ));
            }
            (Some(declared), seen, OutOfRangePolicy::Extend) => declared.max(seen.unwrap_or(0)),
            (None, Some(seen), OutOfRangePolicy::Extend) => seen,
        };

        let num_nodes = max_id as usize + 1;
        let num_edges = u32::try_from(edges.len()).map_err(|_| {
            RankError::data_source(format!(
                "{} edges exceed the 32-bit array format",
                edges.len()
            ))
        })?;

        // Pass 1: degrees in both directions
        let mut backlinks_count = vec![0_u32; num_nodes];
        let mut outlinks_count = vec![0_u32; num_nodes];
        for (src, dst) in edges {
            outlinks_count[src.0 as usize] += 1;
            backlinks_count[dst.0 as usize] += 1;
        }

        let mut backlinks_cumsum = Vec::with_capacity(num_nodes);
        let mut running = 0_u32;
        for &count in &backlinks_count {
            running += count;
            backlinks_cumsum.push(running);
        }
        debug_assert_eq!(running, num_edges);

        // Pass 2: scatter sources into their destination groups
        let mut cursor: Vec<u32> = backlinks_cumsum
            .iter()
            .zip(&backlinks_count)
            .map(|(end, count)| end - count)
            .collect();
        let mut backlinks = vec![0_u32; edges.len()];
        for (src, dst) in edges {
            let slot = &mut cursor[dst.0 as usize];
            backlinks[*slot as usize] = src.0;
            *slot += 1;
        }

        log::info!(
            "Built backlink index: {} nodes, {} edges, {} active",
            num_nodes,
            num_edges,
            outlinks_count.iter().filter(|&&c| c > 0).count()
        );

        Ok(Self {
            backlinks,
            backlinks_count,
            backlinks_cumsum,
            outlinks_count,
        })
    }

    /// Index with no nodes
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            backlinks: Vec::new(),
            backlinks_count: Vec::new(),
            backlinks_cumsum: Vec::new(),
            outlinks_count: Vec::new(),
        }
    }

    /// Assemble an index from its four arrays, checking every invariant
    ///
    /// # Errors
    ///
    /// Returns [`RankError::CorruptIndex`] if lengths, counts and cumulative
    /// sums disagree or a backlink source has outdegree 0, and
    /// [`RankError::IndexOutOfRange`] if a backlink source is not a node
    pub fn from_parts(
        backlinks: Vec<u32>,
        backlinks_count: Vec<u32>,
        backlinks_cumsum: Vec<u32>,
        outlinks_count: Vec<u32>,
    ) -> Result<Self> {
        let num_nodes = backlinks_count.len();
        if backlinks_cumsum.len() != num_nodes || outlinks_count.len() != num_nodes {
            return Err(RankError::CorruptIndex(format!(
                "per-node arrays differ in length: count={}, cumsum={}, outlinks={}",
                num_nodes,
                backlinks_cumsum.len(),
                outlinks_count.len()
            )));
        }

        let mut running = 0_u64;
        for (node, (&count, &cumsum)) in backlinks_count.iter().zip(&backlinks_cumsum).enumerate() {
            running += u64::from(count);
            if running != u64::from(cumsum) {
                return Err(RankError::CorruptIndex(format!(
                    "cumulative count of node {node} is {cumsum}, expected {running}"
                )));
            }
        }
        if running != backlinks.len() as u64 {
            return Err(RankError::CorruptIndex(format!(
                "counts sum to {running} but there are {} backlinks",
                backlinks.len()
            )));
        }

        for &source in &backlinks {
            match outlinks_count.get(source as usize) {
                None => {
                    return Err(RankError::IndexOutOfRange {
                        what: "backlink source",
                        index: u64::from(source),
                        bound: num_nodes as u64,
                    })
                }
                Some(0) => {
                    return Err(RankError::CorruptIndex(format!(
                        "node {source} appears as a backlink but has outdegree 0"
                    )))
                }
                Some(_) => {}
            }
        }

        Ok(Self {
            backlinks,
            backlinks_count,
            backlinks_cumsum,
            outlinks_count,
        })
    }

    /// Write the four arrays into `dir`
    ///
    /// # Errors
    ///
    /// Returns [`RankError::Persistence`] if any file cannot be written
    pub async fn write_dir<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();

        log::info!("Writing backlinks");
        write_u32_array(dir.join(BACKLINKS_FILE), &self.backlinks).await?;
        log::info!("Writing backlinks count");
        write_u32_array(dir.join(BACKLINKS_COUNT_FILE), &self.backlinks_count).await?;
        log::info!("Writing backlinks cumsum");
        write_u32_array(dir.join(BACKLINKS_CUMSUM_FILE), &self.backlinks_cumsum).await?;
        log::info!("Writing outlinks count");
        write_u32_array(dir.join(OUTLINKS_COUNT_FILE), &self.outlinks_count).await?;

        Ok(())
    }

    /// Load and validate the four arrays from `dir`
    ///
    /// # Errors
    ///
    /// Returns persistence errors for unreadable files and the errors of
    /// [`from_parts`](Self::from_parts) for inconsistent contents
    pub async fn read_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();

        let backlinks = read_u32_array(dir.join(BACKLINKS_FILE)).await?;
        let backlinks_count = read_u32_array(dir.join(BACKLINKS_COUNT_FILE)).await?;
        let backlinks_cumsum = read_u32_array(dir.join(BACKLINKS_CUMSUM_FILE)).await?;
        let outlinks_count = read_u32_array(dir.join(OUTLINKS_COUNT_FILE)).await?;

        let index = Self::from_parts(backlinks, backlinks_count, backlinks_cumsum, outlinks_count)?;
        log::info!(
            "Loaded backlink index from {}: {} nodes, {} edges",
            dir.display(),
            index.num_nodes(),
            index.num_edges()
        );
        Ok(index)
    }

    /// Sources of the edges pointing at `node`
    ///
    /// # Errors
    ///
    /// Returns [`RankError::IndexOutOfRange`] if `node` is not in the index
    pub fn backlinks_of(&self, node: NodeId) -> Result<&[u32]> {
        let idx = node.0 as usize;
        let end = *self
            .backlinks_cumsum
            .get(idx)
            .ok_or(RankError::IndexOutOfRange {
                what: "node",
                index: u64::from(node.0),
                bound: self.num_nodes() as u64,
            })? as usize;
        let start = end - self.backlinks_count[idx] as usize;

        Ok(&self.backlinks[start..end])
    }

    /// Outgoing edge count of `node`, `None` if `node` is not in the index
    #[must_use]
    pub fn outdegree(&self, node: NodeId) -> Option<u32> {
        self.outlinks_count.get(node.0 as usize).copied()
    }

    /// Number of nodes (`max_id + 1`)
    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.backlinks_count.len()
    }

    /// Number of edges
    #[must_use]
    pub fn num_edges(&self) -> usize {
        self.backlinks.len()
    }

    /// Number of nodes with at least one outgoing edge
    #[must_use]
    pub fn num_active(&self) -> usize {
        self.outlinks_count.iter().filter(|&&c| c > 0).count()
    }

    /// Raw arrays: (backlinks, counts, cumulative counts, outdegrees)
    #[must_use]
    pub fn components(&self) -> (&[u32], &[u32], &[u32], &[u32]) {
        (
            &self.backlinks,
            &self.backlinks_count,
            &self.backlinks_cumsum,
            &self.outlinks_count,
        )
    }

    /// Rebuild forward adjacency lists from the reverse index
    ///
    /// Targets of each node come out in ascending order.
    #[must_use]
    pub fn outlinks(&self) -> Vec<Vec<u32>> {
        let mut forward: Vec<Vec<u32>> = self
            .outlinks_count
            .iter()
            .map(|&c| Vec::with_capacity(c as usize))
            .collect();

        let mut start = 0_usize;
        for (target, &end) in self.backlinks_cumsum.iter().enumerate() {
            let end = end as usize;
            for &source in &self.backlinks[start..end] {
                #[allow(clippy::cast_possible_truncation)] // node ids are u32
                forward[source as usize].push(target as u32);
            }
            start = end;
        }

        forward
    }
}

impl Default for BacklinkIndex {
    fn default() -> Self {
        Self::empty()
    }
}

/// Fail on the first edge with an endpoint outside the declared node set
fn check_declared(edge_list: &EdgeList, declared_max: u32) -> Result<()> {
    let mut declared = vec![false; declared_max as usize + 1];
    for node in edge_list.nodes() {
        declared[node.0 as usize] = true;
    }
    let is_declared = |id: NodeId| declared.get(id.0 as usize).copied().unwrap_or(false);

    match edge_list
        .edges()
        .iter()
        .find(|&&(src, dst)| !is_declared(src) || !is_declared(dst))
    {
        Some((src, dst)) => Err(RankError::data_source(format!(
            "edge {} -> {} references a node outside the declared node set (max id {declared_max})",
            src.0, dst.0
        ))),
        None => Ok(()),
    }
}
