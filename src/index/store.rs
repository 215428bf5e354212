//! Document store: the read-only reference corpus.
//!
//! Loads every `.txt` and `.md` file under the configured directory
//! (recursively) once at process start. An absent or empty directory is a
//! fatal startup condition: the application refuses to serve ungrounded
//! answers.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Error, Result};

/// File extensions treated as readable documents
const DOCUMENT_EXTENSIONS: &[&str] = &["txt", "md"];

/// A loaded reference document
#[derive(Debug, Clone)]
pub struct Document {
    /// Path relative to the document root
    pub relative_path: String,

    /// Full document text
    pub text: String,
}

/// A chunk of a document, the unit of retrieval
#[derive(Debug, Clone)]
pub struct DocumentChunk {
    /// Source document (relative path)
    pub source: String,

    /// Chunk text
    pub text: String,
}

/// The read-only collection of reference documents
pub struct DocumentStore {
    root: PathBuf,
    documents: Vec<Document>,
}

impl DocumentStore {
    /// Load all documents under `root`, recursively.
    pub fn load(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::DocumentsMissing {
                path: root.to_path_buf(),
            });
        }

        let mut documents = Vec::new();
        collect_documents(root, root, &mut documents)?;

        if documents.is_empty() {
            return Err(Error::DocumentsEmpty {
                path: root.to_path_buf(),
            });
        }

        // Stable order: retrieval ranking must not depend on directory
        // traversal order.
        documents.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        info!(
            count = documents.len(),
            root = %root.display(),
            "Documents loaded"
        );

        Ok(Self {
            root: root.to_path_buf(),
            documents,
        })
    }

    /// The document root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All loaded documents, sorted by relative path.
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Split every document into retrieval chunks.
    pub fn chunks(&self, chunk_chars: usize, overlap: usize) -> Vec<DocumentChunk> {
        let mut chunks = Vec::new();
        for doc in &self.documents {
            for text in chunk_text(&doc.text, chunk_chars, overlap) {
                chunks.push(DocumentChunk {
                    source: doc.relative_path.clone(),
                    text,
                });
            }
        }
        debug!(chunks = chunks.len(), "Documents chunked");
        chunks
    }
}

/// Recursively collect documents under `dir`.
fn collect_documents(root: &Path, dir: &Path, out: &mut Vec<Document>) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| Error::DocumentRead {
        path: dir.to_path_buf(),
        source: e,
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| Error::DocumentRead {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();

        if path.is_dir() {
            collect_documents(root, &path, out)?;
            continue;
        }

        let is_document = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| DOCUMENT_EXTENSIONS.contains(&e.to_lowercase().as_str()))
            .unwrap_or(false);
        if !is_document {
            continue;
        }

        let text = fs::read_to_string(&path).map_err(|e| Error::DocumentRead {
            path: path.clone(),
            source: e,
        })?;

        if text.trim().is_empty() {
            debug!(path = %path.display(), "Skipping empty document");
            continue;
        }

        let relative_path = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .to_string_lossy()
            .into_owned();

        out.push(Document {
            relative_path,
            text,
        });
    }

    Ok(())
}

/// Split text into chunks of at most `chunk_chars` characters.
///
/// Paragraphs are kept whole when they fit; a paragraph longer than
/// `chunk_chars` is split at character boundaries with `overlap` characters
/// repeated between consecutive pieces so no phrase is lost at a cut.
pub fn chunk_text(text: &str, chunk_chars: usize, overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;

    for paragraph in text.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }

        let para_chars = paragraph.chars().count();

        if para_chars > chunk_chars {
            // Flush whatever was accumulated, then hard-split the paragraph.
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_chars = 0;
            }
            chunks.extend(split_long_paragraph(paragraph, chunk_chars, overlap));
            continue;
        }

        if !current.is_empty() && current_chars + 2 + para_chars > chunk_chars {
            chunks.push(std::mem::take(&mut current));
            current_chars = 0;
        }

        if !current.is_empty() {
            current.push_str("\n\n");
            current_chars += 2;
        }
        current.push_str(paragraph);
        current_chars += para_chars;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Hard-split an oversized paragraph at character boundaries with overlap.
fn split_long_paragraph(paragraph: &str, chunk_chars: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = paragraph.chars().collect();
    let step = chunk_chars.saturating_sub(overlap).max(1);
    let mut out = Vec::new();
    let mut start = 0usize;

    while start < chars.len() {
        let end = (start + chunk_chars).min(chars.len());
        out.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    out
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
