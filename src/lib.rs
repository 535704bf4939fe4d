//! archivist - incremental document indexing and retrieval
//!
//! Ingests a corpus of markdown documents, splits them into overlapping
//! chunks, embeds the chunks through an external embedding service, and keeps
//! a remote Qdrant collection synchronized with the corpus as files change.
//! Retrieval embeds a query and searches the same collection.

pub mod chunk;
pub mod commands;
pub mod config;
pub mod embed;
pub mod error;
pub mod extract;
pub mod progress;
pub mod retrieve;
pub mod store;
pub mod sync;

pub use config::Config;
pub use error::{Error, Result};
