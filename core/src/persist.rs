use crate::index::{DocId, DocMeta, InvertedIndex};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Load/store failures for the two index artifacts. Parse errors carry the
/// 1-based line number so a corrupt file can be pinpointed; a partial index
/// is never returned.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("index file is empty, missing the document-count header")]
    MissingHeader,
    #[error("line {line}: invalid document count `{value}`")]
    BadDocCount { line: usize, value: String },
    #[error("line {line}: missing tab separator")]
    MissingTab { line: usize },
    #[error("line {line}: invalid document id `{value}`")]
    BadDocId { line: usize, value: String },
    #[error("line {line}: invalid occurrence count `{value}`")]
    BadOccurrenceCount { line: usize, value: String },
    #[error("line {line}: empty posting list")]
    EmptyPostings { line: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Resolves artifact file names under one index directory.
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn index(&self) -> PathBuf { self.root.join("search.index") }
    pub fn documents(&self) -> PathBuf { self.root.join("search.documents") }
}

/// Encode the index as line-oriented text: a document-count header, then one
/// `token\tdocId:count,docId:count,...` line per token. Tokens and doc ids
/// are emitted in sorted order so output is deterministic.
pub fn serialize_index(index: &InvertedIndex) -> String {
    let mut tokens: Vec<&String> = index.terms().keys().collect();
    tokens.sort();

    let mut out = String::new();
    out.push_str(&index.doc_count().to_string());
    out.push('\n');
    for token in tokens {
        let postings = &index.terms()[token];
        let mut ids: Vec<DocId> = postings.keys().copied().collect();
        ids.sort_unstable();
        out.push_str(token);
        out.push('\t');
        for (i, doc_id) in ids.iter().enumerate() {
            if i > 0 { out.push(','); }
            out.push_str(&format!("{doc_id}:{}", postings[doc_id]));
        }
        out.push('\n');
    }
    out
}

/// Decode [`serialize_index`] output. A bare `docId` entry with no `:count`
/// is accepted as a single occurrence, so presence-only index files load as
/// presence/absence weights.
pub fn deserialize_index(data: &str) -> Result<InvertedIndex, PersistError> {
    let mut lines = data.lines().enumerate();
    let (_, header) = lines.next().ok_or(PersistError::MissingHeader)?;
    let doc_count: u32 = header.trim().parse().map_err(|_| PersistError::BadDocCount {
        line: 1,
        value: header.to_string(),
    })?;

    let mut terms: HashMap<String, HashMap<DocId, u32>> = HashMap::new();
    for (idx, line) in lines {
        let line_no = idx + 1;
        if line.is_empty() { continue; }
        let (token, entries) = line
            .split_once('\t')
            .ok_or(PersistError::MissingTab { line: line_no })?;
        if entries.is_empty() {
            return Err(PersistError::EmptyPostings { line: line_no });
        }
        let mut postings = HashMap::new();
        for entry in entries.split(',') {
            let (id_part, count) = match entry.split_once(':') {
                Some((id_part, count_part)) => {
                    let count: u32 = count_part.parse().map_err(|_| {
                        PersistError::BadOccurrenceCount { line: line_no, value: entry.to_string() }
                    })?;
                    if count == 0 {
                        return Err(PersistError::BadOccurrenceCount {
                            line: line_no,
                            value: entry.to_string(),
                        });
                    }
                    (id_part, count)
                }
                None => (entry, 1),
            };
            let doc_id: DocId = id_part.parse().map_err(|_| PersistError::BadDocId {
                line: line_no,
                value: entry.to_string(),
            })?;
            postings.insert(doc_id, count);
        }
        terms.insert(token.to_string(), postings);
    }

    tracing::debug!(doc_count, terms = terms.len(), "index deserialized");
    Ok(InvertedIndex::from_parts(doc_count, terms))
}

/// Encode the document table: one `slug\ttitle` line per document in build
/// order. The Nth line (0-based) is document id N. Embedded tabs and
/// newlines in fields are flattened to spaces to keep the format intact.
pub fn serialize_documents(documents: &[DocMeta]) -> String {
    let mut out = String::new();
    for doc in documents {
        out.push_str(&clean_field(&doc.slug));
        out.push('\t');
        out.push_str(&clean_field(&doc.title));
        out.push('\n');
    }
    out
}

pub fn deserialize_documents(data: &str) -> Result<Vec<DocMeta>, PersistError> {
    let mut documents = Vec::new();
    for (idx, line) in data.lines().enumerate() {
        let (slug, title) = line
            .split_once('\t')
            .ok_or(PersistError::MissingTab { line: idx + 1 })?;
        documents.push(DocMeta { slug: slug.to_string(), title: title.to_string() });
    }
    Ok(documents)
}

fn clean_field(value: &str) -> String {
    value.replace(['\t', '\n', '\r'], " ")
}

pub fn save_index(paths: &IndexPaths, index: &InvertedIndex) -> Result<(), PersistError> {
    fs::create_dir_all(&paths.root)?;
    fs::write(paths.index(), serialize_index(index))?;
    Ok(())
}

pub fn load_index(paths: &IndexPaths) -> Result<InvertedIndex, PersistError> {
    let data = fs::read_to_string(paths.index())?;
    deserialize_index(&data)
}

pub fn save_documents(paths: &IndexPaths, documents: &[DocMeta]) -> Result<(), PersistError> {
    fs::create_dir_all(&paths.root)?;
    fs::write(paths.documents(), serialize_documents(documents))?;
    Ok(())
}

pub fn load_documents(paths: &IndexPaths) -> Result<Vec<DocMeta>, PersistError> {
    let data = fs::read_to_string(paths.documents())?;
    deserialize_documents(&data)
}
