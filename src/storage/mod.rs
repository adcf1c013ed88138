//! Graph storage layer
//!
//! Provides the compressed backlink index, edge sources, and the
//! length-prefixed array files both batch jobs exchange.

pub mod array_io;
pub mod backlinks;
pub mod edge_list;
#[cfg(feature = "storage")]
pub mod parquet;

pub use array_io::{read_f32_array, read_u32_array, write_f32_array, write_u32_array};
pub use backlinks::{BacklinkIndex, BuildOptions, NodeId, OutOfRangePolicy};
pub use edge_list::EdgeList;
