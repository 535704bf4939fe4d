//! Qdrant vector database integration
//!
//! This module wraps the Qdrant client behind the [`VectorIndex`] capability
//! trait: create-if-absent, upsert-by-id, filtered delete, similarity search,
//! and a paginated payload scan. Everything else in the crate depends only on
//! the trait and the canonical record types in [`payload`].

mod payload;

pub use payload::*;

use crate::config::Config;
use crate::error::{Error, Result};
use async_trait::async_trait;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter,
    GetCollectionInfoResponse, PointId, PointStruct, ScrollPointsBuilder, SearchPointsBuilder,
    UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use tracing::{debug, info};

/// Capability contract of the remote vector index
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create the collection if absent; verify dimensionality if present.
    /// A dimension mismatch is a fatal configuration error.
    async fn ensure_collection(&self) -> Result<()>;

    /// Paginated full scan of every record's payload
    async fn scroll_payloads(&self) -> Result<Vec<RecordPayload>>;

    /// Insert-or-overwrite records keyed by id
    async fn upsert_records(&self, records: Vec<IndexedRecord>) -> Result<()>;

    /// Delete every record whose payload source path equals `source_path`
    async fn delete_by_source_path(&self, source_path: &str) -> Result<()>;

    /// Top-k similarity search
    async fn search(&self, vector: Vec<f32>, top_k: usize) -> Result<Vec<SearchHit>>;
}

/// Information about a Qdrant collection
#[derive(Debug, Clone)]
pub struct CollectionInfo {
    pub points_count: u64,
    pub status: String,
}

/// Qdrant store handle
pub struct QdrantStore {
    client: Qdrant,
    collection: String,
    dimension: usize,
}

impl QdrantStore {
    /// Connect to Qdrant using config
    pub async fn connect(config: &Config) -> Result<Self> {
        Self::new(
            &config.qdrant_url,
            config.qdrant_api_key(),
            &config.collection_name,
            config.embedding.dimension,
        )
        .await
    }

    /// Create a new store connection directly with URL and collection name
    pub async fn new(
        url: &str,
        api_key: Option<String>,
        collection: &str,
        dimension: usize,
    ) -> Result<Self> {
        debug!("Connecting to Qdrant at {}", url);

        let mut builder = Qdrant::from_url(url).skip_compatibility_check();
        if let Some(key) = api_key {
            builder = builder.api_key(key);
        }
        let client = builder.build().map_err(|e| Error::Qdrant(e.to_string()))?;

        Ok(Self {
            client,
            collection: collection.to_string(),
            dimension,
        })
    }

    /// Get the expected vector dimension for this store
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Check if the collection exists
    pub async fn collection_exists(&self) -> Result<bool> {
        let exists = self.client.collection_exists(&self.collection).await?;
        Ok(exists)
    }

    /// Delete the collection if it exists
    pub async fn delete_collection(&self) -> Result<bool> {
        if !self.collection_exists().await? {
            return Ok(false);
        }

        info!("Deleting collection {}", self.collection);
        self.client.delete_collection(&self.collection).await?;
        Ok(true)
    }

    /// Reset the collection (delete and recreate)
    pub async fn reset_collection(&self) -> Result<()> {
        self.delete_collection().await?;
        self.ensure_collection().await?;
        Ok(())
    }

    /// Get collection info (point count, status)
    pub async fn get_collection_info(&self) -> Result<Option<CollectionInfo>> {
        if !self.collection_exists().await? {
            return Ok(None);
        }

        let info = self.client.collection_info(&self.collection).await?;
        Ok(info.result.map(|result| CollectionInfo {
            points_count: result.points_count.unwrap_or(0),
            status: format!("{:?}", result.status()),
        }))
    }

    async fn collection_vector_size(&self) -> Result<Option<u64>> {
        let info = self.client.collection_info(&self.collection).await?;
        Ok(extract_vector_size(&info))
    }

    fn source_path_filter(source_path: &str) -> Filter {
        Filter {
            must: vec![Condition::matches(
                "source_path",
                source_path.to_string(),
            )],
            should: vec![],
            must_not: vec![],
            min_should: None,
        }
    }
}

#[async_trait]
impl VectorIndex for QdrantStore {
    async fn ensure_collection(&self) -> Result<()> {
        if self.client.collection_exists(&self.collection).await? {
            debug!("Collection {} already exists", self.collection);

            if let Some(size) = self.collection_vector_size().await? {
                if size as usize != self.dimension {
                    return Err(Error::Qdrant(format!(
                        "Collection '{}' has vector size {}, but the configured embedding model expects {}. Set a new collection name or reset the collection.",
                        self.collection, size, self.dimension
                    )));
                }
            }

            return Ok(());
        }

        info!(
            "Creating collection {} with dimension {}",
            self.collection, self.dimension
        );

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection).vectors_config(
                    VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine),
                ),
            )
            .await?;

        Ok(())
    }

    async fn scroll_payloads(&self) -> Result<Vec<RecordPayload>> {
        let mut payloads = Vec::new();
        let mut offset: Option<PointId> = None;
        let batch_size = 1000u32;

        loop {
            let mut scroll_builder = ScrollPointsBuilder::new(&self.collection)
                .limit(batch_size)
                .with_payload(true)
                .with_vectors(false);

            if let Some(ref o) = offset {
                scroll_builder = scroll_builder.offset(o.clone());
            }

            let response = self.client.scroll(scroll_builder).await?;
            if response.result.is_empty() {
                break;
            }

            for point in response.result {
                payloads.push(RecordPayload::from_qdrant_payload(point.payload));
            }

            offset = response.next_page_offset;
            if offset.is_none() {
                break;
            }
        }

        debug!(
            "Scanned {} record payloads from collection {}",
            payloads.len(),
            self.collection
        );
        Ok(payloads)
    }

    async fn upsert_records(&self, records: Vec<IndexedRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        if let Some(mismatch) = records.iter().find(|r| r.vector.len() != self.dimension) {
            return Err(Error::Qdrant(format!(
                "Vector dimension mismatch for collection '{}': expected {}, got {}",
                self.collection,
                self.dimension,
                mismatch.vector.len()
            )));
        }

        debug!(
            "Upserting {} records to collection {}",
            records.len(),
            self.collection
        );

        let points: Vec<PointStruct> = records.into_iter().map(|r| r.to_point_struct()).collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points))
            .await?;

        Ok(())
    }

    async fn delete_by_source_path(&self, source_path: &str) -> Result<()> {
        debug!(
            "Deleting records with source_path {} from collection {}",
            source_path, self.collection
        );

        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection)
                    .points(Self::source_path_filter(source_path)),
            )
            .await?;

        Ok(())
    }

    async fn search(&self, vector: Vec<f32>, top_k: usize) -> Result<Vec<SearchHit>> {
        debug!(
            "Searching collection {} with top_k {}",
            self.collection, top_k
        );

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, vector, top_k as u64)
                    .with_payload(true),
            )
            .await?;

        let hits = response
            .result
            .into_iter()
            .map(|p| SearchHit {
                id: point_id_to_string(p.id),
                score: p.score,
                payload: RecordPayload::from_qdrant_payload(p.payload),
            })
            .collect();

        Ok(hits)
    }
}

fn extract_vector_size(info: &GetCollectionInfoResponse) -> Option<u64> {
    let params = info
        .result
        .as_ref()?
        .config
        .as_ref()?
        .params
        .as_ref()?
        .vectors_config
        .as_ref()?
        .config
        .as_ref()?;

    match params {
        qdrant_client::qdrant::vectors_config::Config::Params(p) => Some(p.size),
        qdrant_client::qdrant::vectors_config::Config::ParamsMap(map) => {
            map.map.values().next().map(|p| p.size)
        }
    }
}

/// Convert PointId to string
fn point_id_to_string(id: Option<PointId>) -> String {
    use qdrant_client::qdrant::point_id::PointIdOptions;

    match id.and_then(|i| i.point_id_options) {
        Some(PointIdOptions::Uuid(uuid)) => uuid,
        Some(PointIdOptions::Num(num)) => num.to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_source_path_filter_targets_single_field() {
        let filter = QdrantStore::source_path_filter("docs/a.md");
        assert_eq!(filter.must.len(), 1);
        assert!(filter.should.is_empty());
        assert!(filter.must_not.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_records_rejects_dimension_mismatch() {
        let store = QdrantStore::new("http://127.0.0.1:6334", None, "test_collection", 3)
            .await
            .expect("store should initialize");

        let record = IndexedRecord {
            id: Uuid::new_v4(),
            vector: vec![0.1, 0.2],
            payload: RecordPayload {
                text: "text".to_string(),
                source_path: "docs/a.md".to_string(),
                title: String::new(),
                modification_time: 1.0,
                chunk_index: 0,
            },
        };

        let err = store
            .upsert_records(vec![record])
            .await
            .expect_err("should reject mismatched vector length");

        match err {
            Error::Qdrant(message) => assert!(message.contains("dimension mismatch")),
            other => panic!("expected qdrant error, got {other:?}"),
        }
    }
}
