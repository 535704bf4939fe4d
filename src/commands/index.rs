//! Index commands - full and incremental corpus indexing

use crate::config::Config;
use crate::embed::create_embedder;
use crate::error::Result;
use crate::store::QdrantStore;
use crate::sync::{SyncReport, Synchronizer};
use std::path::Path;

/// Fully index a corpus, treating every document as new. Used for first-time
/// index population.
pub async fn cmd_index(config: &Config, store: &QdrantStore, path: &Path) -> Result<SyncReport> {
    let embedder = create_embedder(config)?;
    let sync = Synchronizer::new(config, embedder.as_ref(), store);
    sync.run_full(path).await
}

/// Incrementally synchronize the index with a corpus
pub async fn cmd_sync(config: &Config, store: &QdrantStore, path: &Path) -> Result<SyncReport> {
    let embedder = create_embedder(config)?;
    let sync = Synchronizer::new(config, embedder.as_ref(), store);
    sync.run_incremental(path).await
}

/// Print a sync report to console
pub fn print_sync_report(report: &SyncReport, incremental: bool) {
    let heading = if report.is_clean() {
        "✅ Indexing Complete"
    } else {
        "⚠️  Indexing Partially Complete"
    };
    println!("\n{}\n", heading);

    println!("Documents new: {}", report.docs_new);
    if incremental {
        println!("Documents changed: {}", report.docs_stale);
        println!("Documents unchanged: {}", report.docs_unchanged);
        if report.docs_removed > 0 {
            println!("Documents removed: {}", report.docs_removed);
        }
        println!("Paths purged: {}", report.paths_purged);
    }
    println!("Chunks indexed: {}", report.chunks_indexed);

    if report.batches_failed > 0 {
        println!("Embedding batches skipped: {}", report.batches_failed);
    }

    if !report.failed_paths.is_empty() {
        println!("\nUnsynchronized paths (next run will retry):");
        for path in &report.failed_paths {
            println!("- {}", path);
        }
    }

    if !report.errors.is_empty() {
        println!("\nErrors:");
        for error in &report.errors {
            println!("- {}", error);
        }
    }
}
