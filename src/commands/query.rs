//! Query command implementation

use crate::config::Config;
use crate::embed::create_embedder;
use crate::error::Result;
use crate::retrieve::{retrieve, RetrievedChunk};
use crate::store::QdrantStore;

/// Execute a query against the index
pub async fn cmd_query(
    config: &Config,
    store: &QdrantStore,
    query: &str,
    limit: Option<usize>,
) -> Result<Vec<RetrievedChunk>> {
    let k = limit
        .unwrap_or(config.query.default_k)
        .min(config.query.max_results)
        .max(1);

    let embedder = create_embedder(config)?;
    retrieve(embedder.as_ref(), store, query, k).await
}

/// Print query results to console
pub fn print_query_results(query: &str, results: &[RetrievedChunk]) {
    println!("\n🔍 Query: {}\n", query);
    println!("Found {} results:\n", results.len());

    for (i, r) in results.iter().enumerate() {
        println!("{}. [score: {:.3}] {}", i + 1, r.relevance_score, r.source_path);

        if !r.title.is_empty() {
            println!("   Title: {}", r.title);
        }

        let preview = if r.text.len() > 200 {
            let cut = r.text
                .char_indices()
                .nth(200)
                .map(|(idx, _)| idx)
                .unwrap_or(r.text.len());
            format!("{}...", r.text[..cut].trim())
        } else {
            r.text.trim().to_string()
        };
        println!("   {}\n", preview.replace('\n', " "));
    }
}
