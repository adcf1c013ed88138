//! Compute `PageRank` over a persisted backlink index

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use trueno_rank::config::{DEFAULT_CHANGE_THRESHOLD, DEFAULT_DAMPING, DEFAULT_MAX_ITERATIONS};
use trueno_rank::storage::write_f32_array;
use trueno_rank::{
    normalized_by_min, pagerank, percentiles, top_k, BacklinkIndex, ChangeMetric, Partitioning,
    RankConfig, RankSummary,
};

/// Percentiles of the normalized ranks printed after a run.
const PERCENTILES: [f64; 7] = [1.0, 10.0, 25.0, 50.0, 75.0, 90.0, 99.0];

/// How nodes are split among workers.
#[derive(ValueEnum, Debug, Clone, Copy, Default)]
enum CliPartitioning {
    /// One contiguous block of nodes per worker.
    #[default]
    Contiguous,
    /// Node `i` goes to worker `i % workers`.
    RoundRobin,
    /// Every worker sweeps every node.
    Replicated,
}

impl From<CliPartitioning> for Partitioning {
    fn from(p: CliPartitioning) -> Self {
        match p {
            CliPartitioning::Contiguous => Self::Contiguous,
            CliPartitioning::RoundRobin => Self::RoundRobin,
            CliPartitioning::Replicated => Self::Replicated,
        }
    }
}

/// How the change between sweeps is measured.
#[derive(ValueEnum, Debug, Clone, Copy, Default)]
enum CliMetric {
    /// Sum of absolute rank differences (L1 norm).
    #[default]
    Numeric,
    /// Mean wrapping difference of the raw `f32` bit patterns.
    BitPattern,
}

impl From<CliMetric> for ChangeMetric {
    fn from(m: CliMetric) -> Self {
        match m {
            CliMetric::Numeric => Self::Numeric,
            CliMetric::BitPattern => Self::BitPattern,
        }
    }
}

/// Rank the nodes of a backlink index.
#[derive(Parser, Debug)]
#[command(name = "compute-pagerank", version, about)]
struct Args {
    /// Directory holding the index arrays.
    #[arg(long, default_value = ".")]
    index_dir: PathBuf,

    /// File receiving the rank vector.
    #[arg(long, default_value = "pageranks.out")]
    output: PathBuf,

    /// Damping factor.
    #[arg(short, long, default_value_t = DEFAULT_DAMPING)]
    damping: f32,

    /// Change between sweeps (L1 norm) below which iteration stops.
    #[arg(long, default_value_t = DEFAULT_CHANGE_THRESHOLD)]
    threshold: f64,

    /// Number of worker threads. Defaults to the number of CPUs.
    #[arg(short, long)]
    workers: Option<usize>,

    /// How nodes are split among workers.
    #[arg(long, value_enum, default_value_t)]
    partitioning: CliPartitioning,

    /// How the change between sweeps is measured.
    #[arg(long, value_enum, default_value_t)]
    metric: CliMetric,

    /// Maximum number of sweeps; 0 removes the cap.
    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    max_iterations: usize,

    /// Give up after this many seconds.
    #[arg(long)]
    deadline_secs: Option<f64>,

    /// Number of leading ranks to print.
    #[arg(long, default_value_t = 10)]
    samples: usize,

    /// Number of top pages to print.
    #[arg(long, default_value_t = 10)]
    top: usize,
}

impl Args {
    fn rank_config(&self) -> Result<RankConfig> {
        let mut config = RankConfig {
            damping: self.damping,
            change_threshold: self.threshold,
            partitioning: self.partitioning.into(),
            change_metric: self.metric.into(),
            max_iterations: (self.max_iterations > 0).then_some(self.max_iterations),
            ..RankConfig::default()
        };
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(secs) = self.deadline_secs {
            config.deadline =
                Some(Duration::try_from_secs_f64(secs).context("Invalid --deadline-secs")?);
        }
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

fn init_env_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_env_logger();
    let args = Args::parse();
    let config = args.rank_config()?;

    let index = BacklinkIndex::read_dir(&args.index_dir)
        .await
        .with_context(|| format!("Could not load index from {}", args.index_dir.display()))?;
    log::info!(
        "Loaded index: {} nodes, {} backlinks, {} active",
        index.num_nodes(),
        index.num_edges(),
        index.num_active()
    );

    let result = pagerank(&index, &config).context("PageRank did not converge")?;

    write_f32_array(&args.output, &result.ranks)
        .await
        .with_context(|| format!("Could not write ranks to {}", args.output.display()))?;
    log::info!("Ranks written to {}", args.output.display());

    let Some(summary) = RankSummary::from_ranks(&result.ranks, args.samples) else {
        println!("Empty graph: no ranks");
        return Ok(());
    };

    for (node, rank) in &summary.samples {
        println!("{node}\t{rank:e}");
    }
    println!("Sum of ranks: {:.6}", summary.sum);
    if !summary.is_stochastic(1e-3) {
        log::warn!(
            "Ranks sum to {:.6}; dangling nodes or unreachable nodes leak rank",
            summary.sum
        );
    }

    let normalized = normalized_by_min(&result.ranks);
    println!("Top {} pages (rank / min rank):", args.top.min(summary.len));
    for (node, rank) in top_k(&normalized, args.top) {
        println!("{node}\t{rank:.3}");
    }

    println!("Percentiles (rank / min rank):");
    for (q, value) in PERCENTILES.iter().zip(percentiles(&normalized, &PERCENTILES)) {
        println!("p{q}\t{value:.3}");
    }

    Ok(())
}
