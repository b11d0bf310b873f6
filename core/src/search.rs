use crate::index::{DocId, DocMeta, InvertedIndex};
use crate::tokenizer::normalize_query;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SearchError {
    /// Query issued before an index was loaded. Distinct from an empty
    /// result so callers can tell "no matches" from "not ready yet".
    #[error("search engine is not ready, no index has been loaded")]
    NotReady,
    #[error("search engine already holds a loaded index")]
    AlreadyLoaded,
}

/// One ranked result.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub doc_id: DocId,
    pub slug: String,
    pub title: String,
    pub score: f32,
}

struct Loaded {
    index: InvertedIndex,
    documents: Vec<DocMeta>,
}

/// Query-time engine over one loaded, immutable index.
///
/// Lifecycle is `Uninitialized -> Ready`, transitioned exactly once by
/// [`SearchEngine::load`]; there is no way back. Once `Ready` the engine is
/// read-only and can be shared across concurrent queries behind an `Arc`
/// without locking.
#[derive(Default)]
pub struct SearchEngine {
    inner: Option<Loaded>,
}

impl SearchEngine {
    pub fn new() -> Self { Self::default() }

    pub fn is_ready(&self) -> bool { self.inner.is_some() }

    pub fn load(&mut self, index: InvertedIndex, documents: Vec<DocMeta>) -> Result<(), SearchError> {
        if self.inner.is_some() {
            return Err(SearchError::AlreadyLoaded);
        }
        tracing::info!(
            doc_count = index.doc_count(),
            terms = index.term_count(),
            documents = documents.len(),
            "search engine ready"
        );
        self.inner = Some(Loaded { index, documents });
        Ok(())
    }

    pub fn doc_count(&self) -> Result<u32, SearchError> {
        Ok(self.loaded()?.index.doc_count())
    }

    pub fn document(&self, doc_id: DocId) -> Result<Option<&DocMeta>, SearchError> {
        Ok(self.loaded()?.documents.get(doc_id as usize))
    }

    /// Rank documents against free query text, most relevant first.
    ///
    /// Candidates are the intersection of posting lists across all query
    /// tokens (strict AND); each candidate is scored by summed
    /// tf * idf over the query tokens. Ties fall back to ascending doc id so
    /// ordering is reproducible. An empty or all-stopword query, or any
    /// query token missing from the index, yields an empty result.
    pub fn search(&self, query: &str) -> Result<Vec<Hit>, SearchError> {
        let loaded = self.loaded()?;
        let tokens = normalize_query(query);
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let mut token_postings = Vec::with_capacity(tokens.len());
        for token in &tokens {
            match loaded.index.postings(token) {
                Some(postings) => token_postings.push((token.as_str(), postings)),
                None => return Ok(Vec::new()),
            }
        }
        // intersect starting from the rarest token
        token_postings.sort_by_key(|(_, postings)| postings.len());
        let (_, rarest) = token_postings[0];
        let candidates = rarest
            .keys()
            .copied()
            .filter(|doc_id| token_postings[1..].iter().all(|(_, p)| p.contains_key(doc_id)));

        let mut hits = Vec::new();
        for doc_id in candidates {
            let Some(meta) = loaded.documents.get(doc_id as usize) else {
                tracing::warn!(doc_id, "posting references unknown document, skipping");
                continue;
            };
            let mut score = 0.0f32;
            for (token, postings) in &token_postings {
                let tf = postings.get(&doc_id).copied().unwrap_or(0) as f32;
                score += tf * loaded.index.idf(token).unwrap_or(0.0);
            }
            hits.push(Hit {
                doc_id,
                slug: meta.slug.clone(),
                title: meta.title.clone(),
                score,
            });
        }
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.doc_id.cmp(&b.doc_id)));
        Ok(hits)
    }

    /// [`SearchEngine::search`] truncated to the `k` best hits.
    pub fn search_top(&self, query: &str, k: usize) -> Result<Vec<Hit>, SearchError> {
        let mut hits = self.search(query)?;
        hits.truncate(k);
        Ok(hits)
    }

    fn loaded(&self) -> Result<&Loaded, SearchError> {
        self.inner.as_ref().ok_or(SearchError::NotReady)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::normalize;

    fn engine(pages: &[(&str, &str, &str)]) -> SearchEngine {
        let mut index = InvertedIndex::new();
        let mut documents = Vec::new();
        for (doc_id, (slug, title, body)) in pages.iter().enumerate() {
            let mut tokens = normalize(title);
            tokens.extend(normalize(body));
            index.index_document(doc_id as DocId, &tokens);
            documents.push(DocMeta { slug: slug.to_string(), title: title.to_string() });
        }
        let mut engine = SearchEngine::new();
        engine.load(index, documents).unwrap();
        engine
    }

    #[test]
    fn query_before_load_is_not_ready() {
        let engine = SearchEngine::new();
        assert_eq!(engine.search("fox").unwrap_err(), SearchError::NotReady);
        assert!(!engine.is_ready());
    }

    #[test]
    fn second_load_is_rejected() {
        let mut engine = SearchEngine::new();
        engine.load(InvertedIndex::new(), Vec::new()).unwrap();
        let err = engine.load(InvertedIndex::new(), Vec::new()).unwrap_err();
        assert_eq!(err, SearchError::AlreadyLoaded);
    }

    #[test]
    fn stemmed_query_matches_inflected_documents() {
        let engine = engine(&[
            ("/docs/fox", "The Quick Brown Fox", "A fox. The fox jumps."),
            ("/docs/foxes", "Quick foxes jump", "Many foxes."),
        ]);
        let hits = engine.search("fox").unwrap();
        assert_eq!(hits.len(), 2);
        // doc 0 mentions the stem three times (title + body), doc 1 twice
        assert_eq!(hits[0].doc_id, 0);
        assert_eq!(hits[1].doc_id, 1);
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn conjunctive_query_requires_every_token() {
        let engine = engine(&[
            ("/a", "Alpha", "shared alpha words"),
            ("/b", "Beta", "shared beta words"),
        ]);
        let both = engine.search("shared words").unwrap();
        assert_eq!(both.len(), 2);
        let only_a = engine.search("shared alpha").unwrap();
        assert_eq!(only_a.len(), 1);
        assert_eq!(only_a[0].slug, "/a");
        assert!(engine.search("shared zzzzz").unwrap().is_empty());
    }

    #[test]
    fn empty_and_stopword_queries_return_nothing() {
        let engine = engine(&[("/a", "Alpha", "body")]);
        assert!(engine.search("").unwrap().is_empty());
        assert!(engine.search("the and of").unwrap().is_empty());
    }

    #[test]
    fn ties_break_by_ascending_doc_id() {
        let engine = engine(&[
            ("/b", "Twin", "same words"),
            ("/a", "Twin", "same words"),
        ]);
        let hits = engine.search("twin").unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].doc_id, 0);
        assert_eq!(hits[1].doc_id, 1);
    }

    #[test]
    fn repeated_queries_return_identical_ordering() {
        let engine = engine(&[
            ("/a", "Fox", "fox fox jump"),
            ("/b", "Fox", "fox jump jump"),
            ("/c", "Fox", "fox jump"),
        ]);
        let first = engine.search("fox jump").unwrap();
        let second = engine.search("fox jump").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn top_k_truncates() {
        let engine = engine(&[
            ("/a", "Fox", "fox"),
            ("/b", "Fox", "fox fox"),
            ("/c", "Fox", "fox fox fox"),
        ]);
        let hits = engine.search_top("fox", 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].doc_id, 2);
    }
}
