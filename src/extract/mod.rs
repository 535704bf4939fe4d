//! Document extraction
//!
//! Walks a corpus root, separates front matter from markdown bodies, and
//! produces normalized plain-text documents with provenance metadata.
//! Per-file failures are logged and skipped; they never abort the pass.

mod markdown;

pub use markdown::*;

use crate::error::{Error, Result};
use ignore::WalkBuilder;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{debug, info, warn};

/// Prefix recorded on every source path so index payloads are stable across
/// machines with different corpus locations
pub const CORPUS_ROOT_MARKER: &str = "docs/";

/// One source file at one point in time. Recomputed from the filesystem every
/// run, never persisted.
#[derive(Debug, Clone)]
pub struct Document {
    /// Root-relative path prefixed with [`CORPUS_ROOT_MARKER`]
    pub source_path: String,
    /// Normalized plain text
    pub text: String,
    /// Title from front matter, empty when absent
    pub title: String,
    /// File modification time, seconds since the Unix epoch
    pub modified_at: f64,
    /// Remaining front matter fields
    pub metadata: BTreeMap<String, String>,
}

fn is_markdown(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("md") | Some("mdx") | Some("markdown")
    )
}

fn source_path_for(root: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| Error::InvalidPath(path.display().to_string()))?;

    let mut parts: Vec<String> = Vec::new();
    for component in relative.components() {
        parts.push(component.as_os_str().to_string_lossy().into_owned());
    }
    Ok(format!("{}{}", CORPUS_ROOT_MARKER, parts.join("/")))
}

fn modification_time(path: &Path) -> Result<f64> {
    let modified = std::fs::metadata(path)?.modified()?;
    let since_epoch = modified
        .duration_since(UNIX_EPOCH)
        .map_err(|e| Error::Extract(format!("{}: mtime before epoch: {}", path.display(), e)))?;
    Ok(since_epoch.as_secs_f64())
}

/// Extract a single file into a [`Document`]
pub fn extract_file(root: &Path, path: &Path) -> Result<Document> {
    let raw = std::fs::read_to_string(path)?;
    let (front, body) = split_front_matter(&raw);
    let text = render_plain_text(body);

    Ok(Document {
        source_path: source_path_for(root, path)?,
        text,
        title: front.title,
        modified_at: modification_time(path)?,
        metadata: front.metadata,
    })
}

/// Extract every recognized document under `root`.
///
/// Files that fail to read or parse are skipped with a warning; the rest of
/// the corpus is still returned.
pub fn extract_corpus(root: &Path) -> Result<Vec<Document>> {
    if !root.is_dir() {
        return Err(Error::InvalidPath(format!(
            "Corpus root is not a directory: {}",
            root.display()
        )));
    }

    info!("Extracting corpus from {}", root.display());

    let mut files: Vec<PathBuf> = Vec::new();
    let walker = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(true)
        .git_exclude(true)
        .build();

    for entry in walker {
        match entry {
            Ok(e) if e.file_type().map(|t| t.is_file()).unwrap_or(false) => {
                let path = e.path().to_path_buf();
                if is_markdown(&path) {
                    files.push(path);
                }
            }
            Ok(_) => {}
            Err(e) => warn!("Walk error: {}", e),
        }
    }
    files.sort();

    let mut documents = Vec::with_capacity(files.len());
    for path in files {
        match extract_file(root, &path) {
            Ok(doc) => {
                debug!(source_path = %doc.source_path, chars = doc.text.len(), "Extracted document");
                documents.push(doc);
            }
            Err(e) => warn!("Failed to process {}: {}", path.display(), e),
        }
    }

    info!("Extracted {} documents", documents.len());
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_file(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_extract_corpus_finds_markdown_recursively() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "a.md", "---\ntitle: A\n---\nAlpha body.");
        write_file(tmp.path(), "nested/b.mdx", "Beta body.");
        write_file(tmp.path(), "ignored.txt", "not markdown");

        let docs = extract_corpus(tmp.path()).unwrap();
        assert_eq!(docs.len(), 2);

        let a = docs.iter().find(|d| d.source_path == "docs/a.md").unwrap();
        assert_eq!(a.title, "A");
        assert_eq!(a.text, "Alpha body.");
        assert!(a.modified_at > 0.0);

        let b = docs.iter().find(|d| d.source_path == "docs/nested/b.mdx").unwrap();
        assert_eq!(b.title, "");
    }

    #[test]
    fn test_unreadable_file_is_skipped() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "good.md", "Fine.");
        // Invalid UTF-8 makes read_to_string fail for this file only
        std::fs::write(tmp.path().join("bad.md"), [0xff, 0xfe, 0x00]).unwrap();

        let docs = extract_corpus(tmp.path()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source_path, "docs/good.md");
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope");
        assert!(extract_corpus(&missing).is_err());
    }
}
