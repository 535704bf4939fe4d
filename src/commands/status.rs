//! Status command implementation

use crate::config::Config;
use crate::error::Result;
use crate::store::QdrantStore;
use serde::Serialize;

/// Status information
#[derive(Debug, Clone, Serialize)]
pub struct StatusInfo {
    pub qdrant_url: String,
    pub collection_name: String,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    pub collection_exists: bool,
    pub points_count: u64,
    pub collection_status: Option<String>,
}

/// Get system status
pub async fn cmd_status(config: &Config, store: &QdrantStore) -> Result<StatusInfo> {
    let info = store.get_collection_info().await?;

    Ok(StatusInfo {
        qdrant_url: config.qdrant_url.clone(),
        collection_name: config.collection_name.clone(),
        embedding_model: config.embedding.model.clone(),
        embedding_dimension: config.embedding.dimension,
        collection_exists: info.is_some(),
        points_count: info.as_ref().map(|i| i.points_count).unwrap_or(0),
        collection_status: info.map(|i| i.status),
    })
}

/// Print status to console
pub fn print_status(status: &StatusInfo) {
    println!("\n📚 archivist status\n");
    println!("Qdrant URL: {}", status.qdrant_url);
    println!("Collection: {}", status.collection_name);
    println!(
        "Embedding model: {} ({} dimensions)",
        status.embedding_model, status.embedding_dimension
    );

    if status.collection_exists {
        println!("Indexed records: {}", status.points_count);
        if let Some(ref s) = status.collection_status {
            println!("Collection status: {}", s);
        }
    } else {
        println!("Collection does not exist yet; run 'archivist index <path>' first");
    }
}
