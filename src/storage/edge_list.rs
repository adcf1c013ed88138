//! Edge/node sources
//!
//! An [`EdgeList`] is the builder's whole input: the declared node ids and the
//! directed edges between them. Text files are one record per line:
//!
//! ```text
//! # edges: source target
//! 0 1
//! 0 2
//! 1 3
//! ```
//!
//! Node files hold one id per line. Blank lines and `#` comments are skipped.

use super::backlinks::NodeId;
use crate::error::{RankError, Result};
use std::collections::BTreeSet;
use std::path::Path;

/// Declared nodes plus directed edges
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeList {
    nodes: Vec<NodeId>,
    edges: Vec<(NodeId, NodeId)>,
}

impl EdgeList {
    /// Edge list with an explicit node set
    #[must_use]
    pub fn new(nodes: Vec<NodeId>, edges: Vec<(NodeId, NodeId)>) -> Self {
        Self { nodes, edges }
    }

    /// Edge list whose node set is the set of edge endpoints
    #[must_use]
    pub fn from_edges(edges: Vec<(NodeId, NodeId)>) -> Self {
        let nodes: BTreeSet<NodeId> = edges.iter().flat_map(|&(src, dst)| [src, dst]).collect();
        Self {
            nodes: nodes.into_iter().collect(),
            edges,
        }
    }

    /// Declared node ids
    #[must_use]
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Directed edges (source, destination)
    #[must_use]
    pub fn edges(&self) -> &[(NodeId, NodeId)] {
        &self.edges
    }

    /// Read a whitespace-separated text edge list
    ///
    /// Without `nodes_path` the node set is derived from the edge endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`RankError::DataSource`] if a file cannot be read or a line is
    /// not a pair of non-negative 32-bit integers
    pub async fn read_text<P: AsRef<Path>>(edges_path: P, nodes_path: Option<&Path>) -> Result<Self> {
        let edges_path = edges_path.as_ref();
        let text = read_source(edges_path).await?;
        let edges = parse_edges(&text, edges_path)?;

        let list = match nodes_path {
            Some(path) => {
                let text = read_source(path).await?;
                Self::new(parse_nodes(&text, path)?, edges)
            }
            None => Self::from_edges(edges),
        };

        log::info!(
            "Read {} nodes and {} edges from {}",
            list.nodes.len(),
            list.edges.len(),
            edges_path.display()
        );
        Ok(list)
    }

    /// Write the edges (and optionally the nodes) as text files
    ///
    /// # Errors
    ///
    /// Returns [`RankError::DataSource`] if a file cannot be written
    pub async fn write_text<P: AsRef<Path>>(&self, edges_path: P, nodes_path: Option<&Path>) -> Result<()> {
        let edges_path = edges_path.as_ref();
        let mut out = String::with_capacity(self.edges.len() * 12);
        for (src, dst) in &self.edges {
            out.push_str(&format!("{}\t{}\n", src.0, dst.0));
        }
        write_source(edges_path, out).await?;

        if let Some(path) = nodes_path {
            let out: String = self.nodes.iter().map(|n| format!("{}\n", n.0)).collect();
            write_source(path, out).await?;
        }
        Ok(())
    }
}

async fn read_source(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| RankError::data_source_with(format!("failed to read {}", path.display()), e))
}

async fn write_source(path: &Path, contents: String) -> Result<()> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| RankError::data_source_with(format!("failed to write {}", path.display()), e))
}

fn records(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.split('#').next().unwrap_or("").trim()))
        .filter(|(_, line)| !line.is_empty())
}

fn parse_id(field: &str, path: &Path, line: usize) -> Result<NodeId> {
    field.parse::<u32>().map(NodeId).map_err(|e| {
        RankError::data_source_with(
            format!("{}:{line}: invalid node id {field:?}", path.display()),
            e,
        )
    })
}

fn parse_edges(text: &str, path: &Path) -> Result<Vec<(NodeId, NodeId)>> {
    records(text)
        .map(|(line, record)| {
            let mut fields = record.split_whitespace();
            match (fields.next(), fields.next(), fields.next()) {
                (Some(src), Some(dst), None) => {
                    Ok((parse_id(src, path, line)?, parse_id(dst, path, line)?))
                }
                _ => Err(RankError::data_source(format!(
                    "{}:{line}: expected `source target`, got {record:?}",
                    path.display()
                ))),
            }
        })
        .collect()
}

fn parse_nodes(text: &str, path: &Path) -> Result<Vec<NodeId>> {
    records(text)
        .map(|(line, record)| parse_id(record, path, line))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_from_edges_derives_nodes() {
        let list = EdgeList::from_edges(vec![(NodeId(3), NodeId(1)), (NodeId(1), NodeId(3))]);
        assert_eq!(list.nodes(), &[NodeId(1), NodeId(3)]);
    }

    #[test]
    fn test_parse_edges_skips_comments() {
        let text = "# header\n0 1\n\n  2\t3  # trailing\n";
        let edges = parse_edges(text, Path::new("edges.txt")).unwrap();
        assert_eq!(edges, vec![(NodeId(0), NodeId(1)), (NodeId(2), NodeId(3))]);
    }

    #[test]
    fn test_parse_edges_reports_line() {
        let err = parse_edges("0 1\n1 -2\n", Path::new("edges.txt")).unwrap_err();
        assert!(matches!(err, RankError::DataSource { .. }));
        assert!(err.to_string().contains("edges.txt:2"), "{err}");
    }

    #[test]
    fn test_parse_edges_rejects_extra_fields() {
        let err = parse_edges("0 1 2\n", Path::new("edges.txt")).unwrap_err();
        assert!(err.to_string().contains("expected `source target`"), "{err}");
    }

    #[tokio::test]
    async fn test_text_roundtrip_with_nodes() {
        let dir = tempdir().unwrap();
        let edges_path = dir.path().join("edges.txt");
        let nodes_path = dir.path().join("nodes.txt");

        let list = EdgeList::new(
            vec![NodeId(0), NodeId(1), NodeId(5)],
            vec![(NodeId(0), NodeId(1)), (NodeId(5), NodeId(0))],
        );
        list.write_text(&edges_path, Some(&nodes_path)).await.unwrap();

        let loaded = EdgeList::read_text(&edges_path, Some(&nodes_path)).await.unwrap();
        assert_eq!(loaded, list);
    }

    #[tokio::test]
    async fn test_missing_file_is_data_source_error() {
        let dir = tempdir().unwrap();
        let err = EdgeList::read_text(dir.path().join("absent.txt"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RankError::DataSource { source: Some(_), .. }));
    }
}
