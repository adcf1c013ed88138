//! Build the backlink index of an edge list and persist its four arrays

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use trueno_rank::{BacklinkIndex, BuildOptions, EdgeList, OutOfRangePolicy};

/// Compress an edge list into a backlink index.
#[derive(Parser, Debug)]
#[command(name = "build-backlinks", version, about)]
struct Args {
    /// Text edge list, one `src dst` pair per line.
    #[arg(long, conflicts_with = "parquet", required_unless_present = "parquet")]
    edges: Option<PathBuf>,

    /// Text node list, one id per line. Defaults to the edge endpoints.
    #[arg(long, requires = "edges")]
    nodes: Option<PathBuf>,

    /// Parquet base path, reading `{BASE}_edges.parquet` and `{BASE}_nodes.parquet`.
    #[arg(long)]
    parquet: Option<PathBuf>,

    /// Directory receiving the index arrays.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Grow the node range to cover edge endpoints above the largest node id
    /// instead of failing.
    #[arg(long)]
    extend_node_range: bool,
}

fn init_env_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

async fn load_edges(args: &Args) -> Result<EdgeList> {
    match (&args.edges, &args.parquet) {
        (Some(edges), _) => EdgeList::read_text(edges, args.nodes.as_deref())
            .await
            .with_context(|| format!("Could not load edge list {}", edges.display())),
        (None, Some(base)) => EdgeList::read_parquet(base)
            .await
            .with_context(|| format!("Could not load Parquet tables {}", base.display())),
        (None, None) => anyhow::bail!("Either --edges or --parquet is required"),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_env_logger();
    let args = Args::parse();

    let edges = load_edges(&args).await?;
    log::info!(
        "Loaded {} nodes and {} edges",
        edges.nodes().len(),
        edges.edges().len()
    );

    let options = BuildOptions {
        out_of_range: if args.extend_node_range {
            OutOfRangePolicy::Extend
        } else {
            OutOfRangePolicy::Reject
        },
    };
    let index = BacklinkIndex::build(&edges, options).context("Could not build backlink index")?;
    log::info!(
        "Built index: {} nodes, {} backlinks, {} active",
        index.num_nodes(),
        index.num_edges(),
        index.num_active()
    );

    tokio::fs::create_dir_all(&args.out_dir)
        .await
        .with_context(|| format!("Could not create {}", args.out_dir.display()))?;
    index
        .write_dir(&args.out_dir)
        .await
        .with_context(|| format!("Could not write index to {}", args.out_dir.display()))?;
    log::info!("Index written to {}", args.out_dir.display());

    Ok(())
}
