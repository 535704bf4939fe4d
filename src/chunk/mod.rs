//! Text chunking
//!
//! Splits normalized document text into bounded, overlapping chunks at
//! sentence-like boundaries. The chunk size is a soft target: a single
//! sentence longer than the target is emitted whole rather than split
//! mid-sentence. Overlap is measured in characters over the closed chunk's
//! raw text, so it may cut mid-word.

use crate::config::ChunkConfig;
use crate::extract::Document;
use regex::Regex;
use std::sync::OnceLock;
use uuid::Uuid;

/// A bounded, embeddable slice of a document. Superseded, never mutated,
/// when the owning document changes.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Stable identifier, unique per document generation
    pub id: Uuid,
    /// Owning document's source path
    pub source_path: String,
    /// Owning document's title
    pub title: String,
    /// Owning document's modification time
    pub modified_at: f64,
    /// Ordinal position within the document, contiguous from 0
    pub chunk_index: usize,
    /// Chunk text
    pub text: String,
}

fn sentence_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]\s+").unwrap())
}

/// Derive the chunk identifier from its provenance. A new generation of the
/// same document carries a new modification time, so identifiers are never
/// reused for different text.
pub fn chunk_id(source_path: &str, modified_at: f64, chunk_index: usize) -> Uuid {
    let name = format!(
        "{}\u{0}{}\u{0}{}",
        source_path,
        modified_at.to_bits(),
        chunk_index
    );
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Last `overlap` characters of `text`, on a character boundary
fn overlap_tail(text: &str, overlap: usize) -> &str {
    let total = char_len(text);
    if total <= overlap {
        return text;
    }
    let (idx, _) = text
        .char_indices()
        .nth(total - overlap)
        .unwrap_or((text.len(), ' '));
    &text[idx..]
}

/// Chunk a single document
pub fn chunk_document(doc: &Document, config: &ChunkConfig) -> Vec<Chunk> {
    let mut chunks: Vec<Chunk> = Vec::new();
    let mut buf = String::new();

    let emit = |chunks: &mut Vec<Chunk>, text: String| {
        let chunk_index = chunks.len();
        chunks.push(Chunk {
            id: chunk_id(&doc.source_path, doc.modified_at, chunk_index),
            source_path: doc.source_path.clone(),
            title: doc.title.clone(),
            modified_at: doc.modified_at,
            chunk_index,
            text,
        });
    };

    for segment in sentence_pattern().split(&doc.text) {
        if char_len(&buf) + char_len(segment) > config.chunk_size && !buf.trim().is_empty() {
            let seed = overlap_tail(&buf, config.overlap).to_string();
            emit(&mut chunks, buf.trim().to_string());
            buf = format!("{} {}", seed, segment);
        } else {
            buf.push(' ');
            buf.push_str(segment);
        }
    }

    if !buf.trim().is_empty() {
        emit(&mut chunks, buf.trim().to_string());
    }

    chunks
}

/// Chunk a sequence of documents, ordinals restarting at 0 per document
pub fn chunk_documents(docs: &[Document], config: &ChunkConfig) -> Vec<Chunk> {
    docs.iter()
        .flat_map(|doc| chunk_document(doc, config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn doc(source_path: &str, text: &str, modified_at: f64) -> Document {
        Document {
            source_path: source_path.to_string(),
            text: text.to_string(),
            title: "Title".to_string(),
            modified_at,
            metadata: BTreeMap::new(),
        }
    }

    fn config(chunk_size: usize, overlap: usize) -> ChunkConfig {
        ChunkConfig { chunk_size, overlap }
    }

    #[test]
    fn test_overlap_seeds_next_chunk() {
        let chunks = chunk_document(&doc("docs/a.md", "One. Two. Three.", 1.0), &config(10, 3));

        assert!(chunks.len() >= 2);
        assert_eq!(chunks[0].text, "One Two");

        // The second chunk starts with the last 3 characters of the first
        let tail: String = chunks[0].text.chars().rev().take(3).collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        assert!(chunks[1].text.starts_with(&tail));
    }

    #[test]
    fn test_oversized_segment_emitted_whole() {
        let long = "word ".repeat(40);
        let text = format!("Short start. {}", long.trim());
        let chunks = chunk_document(&doc("docs/a.md", &text, 1.0), &config(20, 5));

        // The long sentence has no internal boundaries; it must survive intact
        assert!(chunks.iter().any(|c| c.text.contains("word word word")));
        let longest = chunks.iter().map(|c| c.text.len()).max().unwrap();
        assert!(longest > 20);
    }

    #[test]
    fn test_whitespace_only_text_produces_no_chunks() {
        assert!(chunk_document(&doc("docs/a.md", "   \n  ", 1.0), &config(10, 3)).is_empty());
        assert!(chunk_document(&doc("docs/a.md", "", 1.0), &config(10, 3)).is_empty());
    }

    #[test]
    fn test_ordinals_restart_per_document() {
        let docs = vec![
            doc("docs/a.md", "One. Two. Three. Four. Five. Six.", 1.0),
            doc("docs/b.md", "Seven. Eight. Nine. Ten. Eleven.", 1.0),
        ];
        let chunks = chunk_documents(&docs, &config(12, 3));

        for path in ["docs/a.md", "docs/b.md"] {
            let ordinals: Vec<usize> = chunks
                .iter()
                .filter(|c| c.source_path == path)
                .map(|c| c.chunk_index)
                .collect();
            assert_eq!(ordinals, (0..ordinals.len()).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_size_bound_holds_for_non_final_chunks() {
        let text = (0..50)
            .map(|i| format!("Sentence number {i:02} here."))
            .collect::<Vec<_>>()
            .join(" ");
        let chunk_size = 80;
        let chunks = chunk_document(&doc("docs/a.md", &text, 1.0), &config(chunk_size, 10));

        assert!(chunks.len() > 1);
        for chunk in &chunks[..chunks.len() - 1] {
            assert!(chunk.text.chars().count() <= chunk_size);
        }
    }

    #[test]
    fn test_ids_stable_for_same_generation() {
        let a = chunk_document(&doc("docs/a.md", "One. Two. Three.", 5.0), &config(10, 3));
        let b = chunk_document(&doc("docs/a.md", "One. Two. Three.", 5.0), &config(10, 3));
        assert_eq!(a[0].id, b[0].id);

        // A new generation gets fresh identifiers
        let c = chunk_document(&doc("docs/a.md", "One. Two. Three.", 6.0), &config(10, 3));
        assert_ne!(a[0].id, c[0].id);

        // Different documents never collide
        let d = chunk_document(&doc("docs/b.md", "One. Two. Three.", 5.0), &config(10, 3));
        assert_ne!(a[0].id, d[0].id);
    }

    #[test]
    fn test_overlap_tail_respects_char_boundaries() {
        assert_eq!(overlap_tail("héllo", 3), "llo");
        assert_eq!(overlap_tail("héllo", 10), "héllo");
        assert_eq!(overlap_tail("αβγδε", 2), "δε");
    }
}
