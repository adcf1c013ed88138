//! Parquet edge sources
//!
//! Based on `DuckDB` (Raasveldt et al., SIGMOD 2019) columnar storage patterns.
//!
//! # Format
//!
//! An edge source is stored as two Parquet files:
//! - `{path}_edges.parquet`: (source, target); further columns are ignored
//! - `{path}_nodes.parquet`: (`node_id`); further columns are ignored
//!
//! This matches the trueno-graph layout, so graphs exported there can be
//! ranked directly.

use super::{EdgeList, NodeId};
use crate::error::{RankError, Result};
use arrow::array::{Array, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::arrow_writer::ArrowWriter;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

impl EdgeList {
    /// Write the edge list to Parquet files
    ///
    /// Creates two files:
    /// - `{path}_edges.parquet`: Edge list (source, target)
    /// - `{path}_nodes.parquet`: Declared nodes (`node_id`)
    ///
    /// # Errors
    ///
    /// Returns [`RankError::DataSource`] if file I/O or Arrow conversion fails
    #[allow(clippy::unused_async)] // Async API for future I/O operations
    pub async fn write_parquet<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let base_path = path.as_ref();

        let (sources, targets): (Vec<u32>, Vec<u32>) =
            self.edges().iter().map(|(src, dst)| (src.0, dst.0)).unzip();
        write_columns(
            &edges_path(base_path),
            vec![("source", sources), ("target", targets)],
        )?;

        let node_ids: Vec<u32> = self.nodes().iter().map(|n| n.0).collect();
        write_columns(&nodes_path(base_path), vec![("node_id", node_ids)])?;

        Ok(())
    }

    /// Read an edge list from Parquet files
    ///
    /// # Errors
    ///
    /// Returns [`RankError::DataSource`] if files don't exist, a required
    /// column is missing, or a column is not `UInt32`
    #[allow(clippy::unused_async)] // Async API for future I/O operations
    pub async fn read_parquet<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref();

        let mut columns = read_columns(&edges_path(base_path), &["source", "target"])?;
        let targets = columns.pop().unwrap_or_default();
        let sources = columns.pop().unwrap_or_default();
        let edges = sources
            .into_iter()
            .zip(targets)
            .map(|(src, dst)| (NodeId(src), NodeId(dst)))
            .collect::<Vec<_>>();

        let nodes = read_columns(&nodes_path(base_path), &["node_id"])?
            .pop()
            .unwrap_or_default()
            .into_iter()
            .map(NodeId)
            .collect::<Vec<_>>();

        log::info!(
            "Read {} nodes and {} edges from {}",
            nodes.len(),
            edges.len(),
            edges_path(base_path)
        );
        Ok(Self::new(nodes, edges))
    }
}

fn edges_path(base_path: &Path) -> String {
    format!("{}_edges.parquet", base_path.display())
}

fn nodes_path(base_path: &Path) -> String {
    format!("{}_nodes.parquet", base_path.display())
}

fn write_columns(path: &str, columns: Vec<(&str, Vec<u32>)>) -> Result<()> {
    // Create Arrow schema
    let schema = Arc::new(Schema::new(
        columns
            .iter()
            .map(|(name, _)| Field::new(*name, DataType::UInt32, false))
            .collect::<Vec<_>>(),
    ));

    // Create Arrow arrays
    let arrays = columns
        .into_iter()
        .map(|(_, values)| Arc::new(UInt32Array::from(values)) as Arc<dyn Array>)
        .collect::<Vec<_>>();

    // Create RecordBatch
    let batch = RecordBatch::try_new(schema.clone(), arrays)
        .map_err(|e| RankError::data_source_with("failed to create RecordBatch", e))?;

    // Write to Parquet
    let file = File::create(path)
        .map_err(|e| RankError::data_source_with(format!("failed to create {path}"), e))?;

    let zstd = parquet::basic::ZstdLevel::try_new(3)
        .map_err(|e| RankError::data_source_with("invalid zstd level", e))?;
    let props = WriterProperties::builder()
        .set_compression(parquet::basic::Compression::ZSTD(zstd))
        .build();

    let parquet_err = |e: parquet::errors::ParquetError| {
        RankError::data_source_with(format!("failed to write {path}"), e)
    };
    let mut writer = ArrowWriter::try_new(file, schema, Some(props)).map_err(parquet_err)?;
    writer.write(&batch).map_err(parquet_err)?;
    writer.close().map_err(parquet_err)?;

    Ok(())
}

fn read_columns(path: &str, names: &[&str]) -> Result<Vec<Vec<u32>>> {
    let file = File::open(path)
        .map_err(|e| RankError::data_source_with(format!("failed to open {path}"), e))?;

    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .and_then(|builder| builder.build())
        .map_err(|e| RankError::data_source_with(format!("failed to read {path}"), e))?;

    let mut columns = vec![Vec::new(); names.len()];

    for batch_result in reader {
        let batch: RecordBatch = batch_result
            .map_err(|e| RankError::data_source_with(format!("failed to decode {path}"), e))?;

        for (name, values) in names.iter().zip(&mut columns) {
            let column = batch
                .column_by_name(name)
                .ok_or_else(|| RankError::data_source(format!("{path}: missing column {name}")))?
                .as_any()
                .downcast_ref::<UInt32Array>()
                .ok_or_else(|| {
                    RankError::data_source(format!("{path}: column {name} is not UInt32"))
                })?;

            if column.null_count() > 0 {
                return Err(RankError::data_source(format!(
                    "{path}: column {name} contains nulls"
                )));
            }
            values.extend(column.values().iter().copied());
        }
    }

    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, Float32Array};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_parquet_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test_graph");

        let list = EdgeList::new(
            vec![NodeId(0), NodeId(1), NodeId(2), NodeId(3)],
            vec![
                (NodeId(0), NodeId(1)),
                (NodeId(0), NodeId(2)),
                (NodeId(1), NodeId(3)),
                (NodeId(2), NodeId(1)),
            ],
        );

        // Write to Parquet
        list.write_parquet(&path).await.unwrap();

        // Read back
        let loaded = EdgeList::read_parquet(&path).await.unwrap();
        assert_eq!(loaded, list);
    }

    #[tokio::test]
    async fn test_empty_edge_list_parquet() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty_graph");

        EdgeList::default().write_parquet(&path).await.unwrap();

        let loaded = EdgeList::read_parquet(&path).await.unwrap();
        assert!(loaded.nodes().is_empty());
        assert!(loaded.edges().is_empty());
    }

    #[tokio::test]
    async fn test_missing_files() {
        let dir = tempdir().unwrap();
        let err = EdgeList::read_parquet(dir.path().join("absent"))
            .await
            .unwrap_err();
        assert!(matches!(err, RankError::DataSource { .. }));
    }

    #[tokio::test]
    async fn test_wrong_column_type() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("bad");

        // Float targets instead of UInt32
        let schema = Arc::new(Schema::new(vec![
            Field::new("source", DataType::UInt32, false),
            Field::new("target", DataType::Float32, false),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(UInt32Array::from(vec![0_u32])) as ArrayRef,
                Arc::new(Float32Array::from(vec![1.0_f32])) as ArrayRef,
            ],
        )
        .unwrap();
        let file = File::create(edges_path(&base)).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let err = EdgeList::read_parquet(&base).await.unwrap_err();
        assert!(err.to_string().contains("not UInt32"), "{err}");
    }
}
