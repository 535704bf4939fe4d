//! Default values for configuration

/// Default Qdrant gRPC URL for local development (port 6334, not 6333 REST)
pub fn default_qdrant_url() -> String {
    std::env::var("QDRANT_URL").unwrap_or_else(|_| "http://127.0.0.1:6334".to_string())
}

/// Default environment variable name for Qdrant API key
pub fn default_qdrant_api_key_env() -> String {
    "QDRANT_API_KEY".to_string()
}

/// Default collection name
pub fn default_collection_name() -> String {
    "archivist_docs".to_string()
}

/// Default embedding service base URL
pub fn default_embedding_url() -> String {
    std::env::var("ARCHIVIST_EMBEDDING_URL")
        .unwrap_or_else(|_| "https://api.cohere.com".to_string())
}

/// Default environment variable name for the embedding service API key
pub fn default_embedding_api_key_env() -> String {
    "COHERE_API_KEY".to_string()
}

/// Default embedding model
pub fn default_embedding_model() -> String {
    "embed-english-v3.0".to_string()
}

/// Default embedding dimension (embed-english-v3.0)
pub fn default_embedding_dimension() -> usize {
    1024
}

/// Default batch size for embedding requests
pub fn default_embedding_batch_size() -> usize {
    96
}

/// Default embedding request timeout in seconds
pub fn default_embedding_timeout() -> u64 {
    60
}

/// Default retries per embedding batch before it is skipped
pub fn default_embedding_max_retries() -> usize {
    2
}

/// Default target characters per chunk
pub fn default_chunk_size() -> usize {
    512
}

/// Default overlap characters carried into the next chunk
pub fn default_chunk_overlap() -> usize {
    50
}

/// Default number of query results
pub fn default_query_k() -> usize {
    5
}

/// Default maximum results allowed per query
pub fn default_query_max_results() -> usize {
    50
}

/// Default: purge index records for documents removed from the corpus
pub fn default_prune_removed() -> bool {
    true
}
