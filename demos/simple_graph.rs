//! Simple example demonstrating trueno-rank usage
//!
//! Run with: cargo run --example simple_graph

use anyhow::Context;
use trueno_rank::storage::{read_f32_array, write_f32_array};
use trueno_rank::{
    normalized_by_min, pagerank, top_k, BacklinkIndex, BuildOptions, EdgeList, NodeId, RankConfig,
    RankSummary,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("🦀 trueno-rank Example\n");

    // 1. Build a tiny link graph
    println!("📊 Building link graph...");
    let names = ["home", "about", "blog", "contact"];
    let edges = EdgeList::from_edges(vec![
        (NodeId(0), NodeId(1)), // home → about
        (NodeId(0), NodeId(2)), // home → blog
        (NodeId(1), NodeId(3)), // about → contact
        (NodeId(2), NodeId(1)), // blog → about
    ]);
    let index = BacklinkIndex::build(&edges, BuildOptions::default())?;
    println!(
        "  ✅ Index built: {} nodes, {} backlinks, {} active\n",
        index.num_nodes(),
        index.num_edges(),
        index.num_active()
    );

    // 2. Query backlinks
    println!("🔍 Querying backlinks...");
    for (node, name) in names.iter().enumerate() {
        let sources = index.backlinks_of(NodeId(node as u32))?;
        let linked_from: Vec<&str> = sources.iter().map(|&s| names[s as usize]).collect();
        println!("  {name} ← {linked_from:?}");
    }

    // 3. Persist index arrays
    println!("\n💾 Saving index...");
    let dir = std::env::temp_dir().join("trueno_rank_example");
    tokio::fs::create_dir_all(&dir).await?;
    index
        .write_dir(&dir)
        .await
        .with_context(|| format!("writing index to {}", dir.display()))?;
    println!("  ✅ Saved to {}", dir.display());

    // 4. Reload and rank
    println!("\n📂 Loading index and ranking...");
    let loaded = BacklinkIndex::read_dir(&dir).await?;
    assert_eq!(loaded, index);

    let result = pagerank(&loaded, &RankConfig::default())?;
    println!(
        "  ✅ Converged after {} sweeps ({:.3?})",
        result.report.iterations, result.report.elapsed
    );

    let ranks_path = dir.join("pageranks.out");
    write_f32_array(&ranks_path, &result.ranks).await?;
    assert_eq!(read_f32_array(&ranks_path).await?, result.ranks);

    // 5. Report
    if let Some(summary) = RankSummary::from_ranks(&result.ranks, names.len()) {
        for (node, rank) in &summary.samples {
            println!("  {:<8} {rank:.6}", names[*node]);
        }
        // contact is dangling, so rank leaks
        println!("  sum      {:.6}", summary.sum);
    }

    println!("\n🏆 Top pages (rank / min rank):");
    for (node, rank) in top_k(&normalized_by_min(&result.ranks), 3) {
        println!("  {:<8} {rank:.3}", names[node]);
    }

    println!("\n✨ Example complete!");

    Ok(())
}
