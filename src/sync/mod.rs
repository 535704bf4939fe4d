//! Index synchronization
//!
//! The synchronizer drives the remote index to convergence with the corpus
//! through strictly ordered stages: `Scan → Diff → Purge → Reindex → Done`,
//! where `Done` is reached directly from `Diff` on a no-op run. Purge always
//! completes for a path before its replacement records are written, so at
//! most one generation of chunks per source path is ever present. No state
//! is saved between runs; every run re-derives the index snapshot from a
//! full payload scan, which makes an interrupted run self-healing.

use crate::chunk::{chunk_documents, Chunk};
use crate::config::Config;
use crate::embed::{embed_in_batches, Embedder, InputType};
use crate::extract::{extract_corpus, Document};
use crate::progress::{advance_progress, finish_progress, start_progress_bar};
use crate::store::{IndexedRecord, RecordPayload, VectorIndex};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info, warn};

/// Stages of a synchronization run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Scan,
    Diff,
    Purge,
    Reindex,
    Done,
}

/// The synchronizer's view of what is currently indexed: source path to the
/// latest modification time seen across that path's records. A partially
/// written generation still surfaces its newest timestamp.
#[derive(Debug, Default)]
pub struct IndexSnapshot {
    latest: HashMap<String, f64>,
}

impl IndexSnapshot {
    pub fn from_payloads(payloads: &[RecordPayload]) -> Self {
        let mut latest: HashMap<String, f64> = HashMap::new();
        for payload in payloads {
            if payload.source_path.is_empty() {
                continue;
            }
            latest
                .entry(payload.source_path.clone())
                .and_modify(|t| *t = t.max(payload.modification_time))
                .or_insert(payload.modification_time);
        }
        Self { latest }
    }

    pub fn latest_for(&self, source_path: &str) -> Option<f64> {
        self.latest.get(source_path).copied()
    }

    pub fn source_paths(&self) -> impl Iterator<Item = &str> {
        self.latest.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }
}

/// Classification of the current corpus against the index snapshot
#[derive(Debug, Default)]
pub struct CorpusDiff {
    /// Documents absent from the snapshot
    pub new: Vec<Document>,
    /// Documents whose modification time moved past the snapshot's
    pub stale: Vec<Document>,
    /// Indexed paths no longer present in the corpus
    pub removed: Vec<String>,
    pub unchanged: usize,
}

impl CorpusDiff {
    pub fn is_noop(&self) -> bool {
        self.new.is_empty() && self.stale.is_empty() && self.removed.is_empty()
    }
}

/// Compare current documents against the snapshot. Unchanged documents
/// (modification time not strictly greater) are excluded from further work.
pub fn diff_corpus(
    documents: Vec<Document>,
    snapshot: &IndexSnapshot,
    prune_removed: bool,
) -> CorpusDiff {
    let mut diff = CorpusDiff::default();
    let mut seen: HashSet<String> = HashSet::new();

    for doc in documents {
        seen.insert(doc.source_path.clone());
        match snapshot.latest_for(&doc.source_path) {
            None => diff.new.push(doc),
            Some(indexed_at) if doc.modified_at > indexed_at => diff.stale.push(doc),
            Some(_) => diff.unchanged += 1,
        }
    }

    if prune_removed {
        diff.removed = snapshot
            .source_paths()
            .filter(|p| !seen.contains(*p))
            .map(str::to_string)
            .collect();
        diff.removed.sort();
    }

    diff
}

/// Outcome of a synchronization run. A run with batch-level failures is a
/// partial success: it reports what it could not index instead of aborting.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub stage: Option<Stage>,
    pub docs_new: usize,
    pub docs_stale: usize,
    pub docs_unchanged: usize,
    pub docs_removed: usize,
    pub chunks_indexed: usize,
    pub paths_purged: usize,
    pub batches_failed: usize,
    /// Paths left unsynchronized this run; the next run repairs them
    pub failed_paths: Vec<String>,
    pub errors: Vec<String>,
}

impl SyncReport {
    /// Whether every document that needed work was fully synchronized
    pub fn is_clean(&self) -> bool {
        self.failed_paths.is_empty() && self.errors.is_empty() && self.batches_failed == 0
    }

    fn enter(&mut self, stage: Stage) {
        debug!(?stage, "Entering stage");
        self.stage = Some(stage);
    }
}

/// Orchestrates extractor, chunker, embedder, and the remote index
pub struct Synchronizer<'a> {
    config: &'a Config,
    embedder: &'a dyn Embedder,
    index: &'a dyn VectorIndex,
}

impl<'a> Synchronizer<'a> {
    pub fn new(config: &'a Config, embedder: &'a dyn Embedder, index: &'a dyn VectorIndex) -> Self {
        Self {
            config,
            embedder,
            index,
        }
    }

    /// Full (non-incremental) indexing: every document is treated as new.
    /// Used for first-time index population; safe to re-run because records
    /// are upserted under stable chunk identifiers.
    pub async fn run_full(&self, corpus_root: &Path) -> crate::error::Result<SyncReport> {
        info!("Running full indexing of {}", corpus_root.display());
        self.index.ensure_collection().await?;

        let mut report = SyncReport::default();
        let documents = extract_corpus(corpus_root)?;
        report.docs_new = documents.len();

        report.enter(Stage::Reindex);
        self.reindex(&documents, &mut report).await;

        report.enter(Stage::Done);
        self.log_outcome(&report);
        Ok(report)
    }

    /// Incremental indexing: scan the index, classify the corpus, purge
    /// superseded generations, reindex only what changed.
    pub async fn run_incremental(&self, corpus_root: &Path) -> crate::error::Result<SyncReport> {
        info!("Running incremental indexing of {}", corpus_root.display());
        self.index.ensure_collection().await?;

        let mut report = SyncReport::default();

        report.enter(Stage::Scan);
        let payloads = self.index.scroll_payloads().await?;
        let snapshot = IndexSnapshot::from_payloads(&payloads);
        debug!(
            "Snapshot holds {} source paths from {} records",
            snapshot.len(),
            payloads.len()
        );

        report.enter(Stage::Diff);
        let documents = extract_corpus(corpus_root)?;
        let diff = diff_corpus(documents, &snapshot, self.config.sync.prune_removed);
        report.docs_new = diff.new.len();
        report.docs_stale = diff.stale.len();
        report.docs_unchanged = diff.unchanged;
        report.docs_removed = diff.removed.len();

        if diff.is_noop() {
            info!("No new or updated documents found");
            report.enter(Stage::Done);
            return Ok(report);
        }

        report.enter(Stage::Purge);
        let mut to_reindex = diff.new;
        for doc in diff.stale {
            // The old generation must be gone before replacement records are
            // written; a purge failure withholds the path from reindexing.
            match self.index.delete_by_source_path(&doc.source_path).await {
                Ok(()) => {
                    report.paths_purged += 1;
                    to_reindex.push(doc);
                }
                Err(e) => {
                    let message = format!("{}: purge failed: {}", doc.source_path, e);
                    warn!("{}", message);
                    report.failed_paths.push(doc.source_path.clone());
                    report.errors.push(message);
                }
            }
        }
        for source_path in &diff.removed {
            match self.index.delete_by_source_path(source_path).await {
                Ok(()) => report.paths_purged += 1,
                Err(e) => {
                    let message = format!("{}: purge failed: {}", source_path, e);
                    warn!("{}", message);
                    report.failed_paths.push(source_path.clone());
                    report.errors.push(message);
                }
            }
        }

        report.enter(Stage::Reindex);
        self.reindex(&to_reindex, &mut report).await;

        report.enter(Stage::Done);
        self.log_outcome(&report);
        Ok(report)
    }

    /// Chunk, embed, and upsert the given documents. Records are grouped by
    /// source path and a path is upserted only when every one of its chunks
    /// received a vector; partial paths are withheld and reported.
    async fn reindex(&self, documents: &[Document], report: &mut SyncReport) {
        if documents.is_empty() {
            return;
        }

        let chunks = chunk_documents(documents, &self.config.chunk);
        if chunks.is_empty() {
            debug!("No chunks produced from {} documents", documents.len());
            return;
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let (vectors, batches_failed) = embed_in_batches(
            self.embedder,
            &texts,
            InputType::Document,
            self.config.embedding.batch_size,
            self.config.embedding.max_retries,
        )
        .await;
        report.batches_failed += batches_failed;

        // Group records per source path, preserving document order
        let mut path_order: Vec<String> = Vec::new();
        let mut grouped: HashMap<String, Vec<IndexedRecord>> = HashMap::new();
        let mut incomplete: HashSet<String> = HashSet::new();

        for (chunk, vector) in chunks.into_iter().zip(vectors) {
            if !grouped.contains_key(&chunk.source_path) {
                path_order.push(chunk.source_path.clone());
            }
            match vector {
                Some(vector) => {
                    let record = to_record(&chunk, vector);
                    grouped.entry(chunk.source_path).or_default().push(record);
                }
                None => {
                    incomplete.insert(chunk.source_path.clone());
                    grouped.entry(chunk.source_path).or_default();
                }
            }
        }

        let pb = start_progress_bar(path_order.len(), "Upserting documents");
        for source_path in path_order {
            if incomplete.contains(&source_path) {
                let message = format!("{}: embedding incomplete, not upserted", source_path);
                warn!("{}", message);
                report.failed_paths.push(source_path);
                report.errors.push(message);
                advance_progress(&pb);
                continue;
            }

            let records = grouped.remove(&source_path).unwrap_or_default();
            let count = records.len();
            match self.index.upsert_records(records).await {
                Ok(()) => report.chunks_indexed += count,
                Err(e) => {
                    let message = format!("{}: upsert failed: {}", source_path, e);
                    warn!("{}", message);
                    report.failed_paths.push(source_path);
                    report.errors.push(message);
                }
            }
            advance_progress(&pb);
        }
        finish_progress(pb, "Documents upserted");
    }

    fn log_outcome(&self, report: &SyncReport) {
        if report.is_clean() {
            info!(
                "Sync complete: {} new, {} stale, {} unchanged, {} removed, {} chunks indexed",
                report.docs_new,
                report.docs_stale,
                report.docs_unchanged,
                report.docs_removed,
                report.chunks_indexed
            );
        } else {
            warn!(
                "Sync partially complete: {} chunks indexed, {} paths failed, {} batches skipped",
                report.chunks_indexed,
                report.failed_paths.len(),
                report.batches_failed
            );
        }
    }
}

fn to_record(chunk: &Chunk, vector: Vec<f32>) -> IndexedRecord {
    IndexedRecord {
        id: chunk.id,
        vector,
        payload: RecordPayload {
            text: chunk.text.clone(),
            source_path: chunk.source_path.clone(),
            title: chunk.title.clone(),
            modification_time: chunk.modified_at,
            chunk_index: chunk.chunk_index as i64,
        },
    }
}
