use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type DocId = u32;

/// Presentation metadata for one indexed page. Document ids are positional:
/// the id is the document's offset in the build-order table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocMeta {
    pub slug: String,
    pub title: String,
}

/// Token -> per-document occurrence counts, plus the corpus document count.
///
/// Document frequency is the size of a token's posting map, so the
/// `df == postings.len()` invariant cannot drift. IDF values are memoized per
/// token and the whole cache is dropped on any mutation.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    terms: HashMap<String, HashMap<DocId, u32>>,
    doc_count: u32,
    idf_cache: Mutex<HashMap<String, f32>>,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    /// Rebuild an index from already-parsed parts (deserialization path).
    pub(crate) fn from_parts(doc_count: u32, terms: HashMap<String, HashMap<DocId, u32>>) -> Self {
        Self { terms, doc_count, idf_cache: Mutex::new(HashMap::new()) }
    }

    pub fn doc_count(&self) -> u32 { self.doc_count }

    pub fn term_count(&self) -> usize { self.terms.len() }

    pub fn document_frequency(&self, token: &str) -> u32 {
        self.terms.get(token).map_or(0, |p| p.len() as u32)
    }

    pub fn postings(&self, token: &str) -> Option<&HashMap<DocId, u32>> {
        self.terms.get(token)
    }

    pub(crate) fn terms(&self) -> &HashMap<String, HashMap<DocId, u32>> {
        &self.terms
    }

    /// Fold one document's token stream into the index.
    ///
    /// Caller contract: each `doc_id` is indexed at most once per index.
    /// Re-indexing an id double-counts; the builder does not check for it.
    pub fn index_document(&mut self, doc_id: DocId, tokens: &[String]) {
        for token in tokens {
            let postings = self.terms.entry(token.clone()).or_default();
            *postings.entry(doc_id).or_insert(0) += 1;
        }
        self.doc_count += 1;
        // df distribution changed; every memoized value is stale
        self.idf_cache.lock().clear();
    }

    /// Memoized inverse document frequency, `1 + ln(N / (1 + df))`, clamped
    /// at zero. `None` for tokens not in the index.
    pub fn idf(&self, token: &str) -> Option<f32> {
        if let Some(&cached) = self.idf_cache.lock().get(token) {
            return Some(cached);
        }
        let df = self.terms.get(token)?.len() as f32;
        let idf = (1.0 + (self.doc_count as f32 / (1.0 + df)).ln()).max(0.0);
        self.idf_cache.lock().insert(token.to_string(), idf);
        Some(idf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn counts_occurrences_and_doc_frequency() {
        let mut index = InvertedIndex::new();
        index.index_document(0, &toks(&["fox", "fox", "jump"]));
        index.index_document(1, &toks(&["fox"]));
        assert_eq!(index.doc_count(), 2);
        assert_eq!(index.document_frequency("fox"), 2);
        assert_eq!(index.document_frequency("jump"), 1);
        assert_eq!(index.postings("fox").unwrap()[&0], 2);
        assert_eq!(index.postings("fox").unwrap()[&1], 1);
    }

    #[test]
    fn idf_is_monotonic_in_df() {
        let mut index = InvertedIndex::new();
        index.index_document(0, &toks(&["rare", "common"]));
        index.index_document(1, &toks(&["common"]));
        index.index_document(2, &toks(&["common"]));
        let rare = index.idf("rare").unwrap();
        let common = index.idf("common").unwrap();
        assert!(rare > common);
        assert!(index.idf("absent").is_none());
    }

    #[test]
    fn indexing_invalidates_cached_idf() {
        let mut index = InvertedIndex::new();
        index.index_document(0, &toks(&["fox"]));
        let before = index.idf("fox").unwrap();
        index.index_document(1, &toks(&["jump"]));
        let after = index.idf("fox").unwrap();
        assert!(after > before);
    }
}
