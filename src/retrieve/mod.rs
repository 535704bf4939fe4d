//! Query-side retrieval
//!
//! Stateless read path: embed the query (query input type, since embedding
//! models treat queries and documents asymmetrically), search the index, and
//! shape hits for the caller. Independent of the write path.

use crate::embed::{Embedder, InputType};
use crate::error::{Error, Result};
use crate::store::VectorIndex;
use serde::Serialize;
use tracing::{debug, info};

/// One retrieved passage with its provenance
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub id: String,
    pub text: String,
    pub relevance_score: f32,
    pub source_path: String,
    pub title: String,
}

/// Embed `query` and return the `top_k` most similar chunks, ordered by
/// descending similarity score
pub async fn retrieve(
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
    query: &str,
    top_k: usize,
) -> Result<Vec<RetrievedChunk>> {
    info!("Retrieving top {} chunks for query", top_k);

    let embeddings = embedder.embed(vec![query.to_string()], InputType::Query).await?;
    let query_vector = embeddings
        .into_iter()
        .next()
        .ok_or_else(|| Error::Embedding("No embedding returned for query".to_string()))?;

    let mut hits = index.search(query_vector, top_k).await?;
    debug!("Got {} raw hits", hits.len());

    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    hits.truncate(top_k);

    Ok(hits
        .into_iter()
        .map(|hit| RetrievedChunk {
            id: hit.id,
            text: hit.payload.text,
            relevance_score: hit.score,
            source_path: hit.payload.source_path,
            title: hit.payload.title,
        })
        .collect())
}
