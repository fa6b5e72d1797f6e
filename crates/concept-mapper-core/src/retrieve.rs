//! Concept retrieval: query text → ranked concept labels + excerpt.
//!
//! # Algorithm
//!
//! 1. Validate the query (trimmed, at least `min_query_chars` characters).
//!    Invalid queries never reach the embedder or the index.
//! 2. Embed the query and ask the [`FragmentIndex`] for `top_k` fragments.
//! 3. Map each fragment to its concept label, keeping the index's rank
//!    order and dropping repeats (first occurrence wins).
//! 4. Join the text of the first `excerpt_fragments` fragments into an
//!    excerpt for summarization, or return [`NO_CONCEPTS_FOUND`] when the
//!    index had nothing.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::embedding::EmbeddingProvider;
use crate::index::FragmentIndex;
use crate::models::{Fragment, FragmentMetadata};

/// Minimum trimmed query length, in characters.
pub const MIN_QUERY_CHARS: usize = 20;
/// Default number of fragments requested from the index.
pub const DEFAULT_TOP_K: usize = 5;
/// Default number of top fragments folded into the excerpt.
pub const DEFAULT_EXCERPT_FRAGMENTS: usize = 3;
/// Excerpt used when the index returns no fragments.
pub const NO_CONCEPTS_FOUND: &str = "No concepts found.";

/// Retrieval tuning parameters, decoupled from application config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalParams {
    pub top_k: usize,
    pub excerpt_fragments: usize,
    pub min_query_chars: usize,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            excerpt_fragments: DEFAULT_EXCERPT_FRAGMENTS,
            min_query_chars: MIN_QUERY_CHARS,
        }
    }
}

/// A query rejected before any lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Transcript too short or missing.")]
    Missing,
    // Same client-facing message; `min` and `actual` are for logs and tests.
    #[error("Transcript too short or missing.")]
    TooShort { min: usize, actual: usize },
}

/// Failure of a retrieval request.
#[derive(Debug, Error)]
pub enum RetrieveError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("query embedding failed: {0:#}")]
    Embedding(anyhow::Error),
    #[error("fragment index lookup failed: {0:#}")]
    Index(anyhow::Error),
}

/// Labels and excerpt derived from one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retrieval {
    /// Unique concept labels in rank order.
    pub labels: Vec<String>,
    /// Summary-ready excerpt, or [`NO_CONCEPTS_FOUND`].
    pub excerpt: String,
    /// Number of fragments the index returned.
    pub fragment_count: usize,
}

impl Retrieval {
    pub fn is_empty(&self) -> bool {
        self.fragment_count == 0
    }
}

/// Check a query against the minimum length, returning it trimmed.
pub fn validate_query(query: &str, min_chars: usize) -> Result<&str, ValidationError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Missing);
    }
    let actual = trimmed.chars().count();
    if actual < min_chars {
        return Err(ValidationError::TooShort {
            min: min_chars,
            actual,
        });
    }
    Ok(trimmed)
}

/// Human-readable label for a fragment's metadata.
///
/// `"Class 12 – Physics – Chapter 12, Page 4"`
pub fn concept_label(metadata: &FragmentMetadata) -> String {
    format!(
        "{} – {} – Chapter {}, Page {}",
        metadata.class(),
        metadata.subject(),
        metadata.chapter(),
        metadata.page
    )
}

/// Concept labels of `fragments` in order, first occurrence wins.
pub fn unique_labels(fragments: &[Fragment]) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for f in fragments {
        let label = concept_label(&f.metadata);
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    labels
}

/// Join the text of the first `n` fragments into one line.
pub fn build_excerpt(fragments: &[Fragment], n: usize) -> String {
    if fragments.is_empty() {
        return NO_CONCEPTS_FOUND.to_string();
    }
    fragments
        .iter()
        .take(n)
        .map(|f| f.text.trim().replace('\n', " "))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Turns queries into ranked concept labels using an embedder and an index.
#[derive(Clone)]
pub struct ConceptRetriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn FragmentIndex>,
    params: RetrievalParams,
}

impl ConceptRetriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn FragmentIndex>,
        params: RetrievalParams,
    ) -> Self {
        Self {
            embedder,
            index,
            params,
        }
    }

    pub fn params(&self) -> &RetrievalParams {
        &self.params
    }

    /// Validate only; no collaborator is called.
    pub fn validate<'q>(&self, query: &'q str) -> Result<&'q str, ValidationError> {
        validate_query(query, self.params.min_query_chars)
    }

    /// Retrieve with the configured `top_k`.
    pub async fn retrieve(&self, query: &str) -> Result<Retrieval, RetrieveError> {
        self.retrieve_k(query, self.params.top_k).await
    }

    /// Retrieve the `k` nearest fragments for `query`.
    pub async fn retrieve_k(&self, query: &str, k: usize) -> Result<Retrieval, RetrieveError> {
        let query = self.validate(query)?;

        let query_vec = self
            .embedder
            .embed_query(query)
            .await
            .map_err(RetrieveError::Embedding)?;

        let fragments = self
            .index
            .nearest(&query_vec, k)
            .await
            .map_err(RetrieveError::Index)?;

        debug!(requested = k, returned = fragments.len(), "index lookup");

        Ok(Retrieval {
            labels: unique_labels(&fragments),
            excerpt: build_excerpt(&fragments, self.params.excerpt_fragments),
            fragment_count: fragments.len(),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::models::Identity;
    use std::sync::atomic::Ordering;

    const QUERY: &str = "today we study the laws of motion and inertia";

    fn physics() -> Arc<Identity> {
        Arc::new(Identity::resolved("Class 12", "Physics", "12"))
    }

    fn retriever(index: Arc<ScriptedIndex>, embedder: Arc<CountingEmbedder>) -> ConceptRetriever {
        ConceptRetriever::new(embedder, index, RetrievalParams::default())
    }

    #[test]
    fn test_validation_boundary() {
        let nineteen = "a".repeat(19);
        let twenty = "a".repeat(20);
        assert_eq!(
            validate_query(&nineteen, 20),
            Err(ValidationError::TooShort { min: 20, actual: 19 })
        );
        assert_eq!(validate_query(&twenty, 20), Ok(twenty.as_str()));
    }

    #[test]
    fn test_validation_trims_before_counting() {
        let padded = format!("   {}   ", "b".repeat(19));
        assert!(validate_query(&padded, 20).is_err());
        assert_eq!(validate_query("\n  hello  \n", 5), Ok("hello"));
    }

    #[test]
    fn test_validation_empty_is_missing() {
        assert_eq!(validate_query("", 20), Err(ValidationError::Missing));
        assert_eq!(validate_query("    ", 20), Err(ValidationError::Missing));
    }

    #[test]
    fn test_validation_counts_characters_not_bytes() {
        let devanagari = "बल".repeat(10);
        assert_eq!(devanagari.chars().count(), 20);
        assert!(validate_query(&devanagari, 20).is_ok());
    }

    #[test]
    fn test_concept_label_format() {
        let f = fragment("a", "x", &physics(), 4);
        assert_eq!(
            concept_label(&f.metadata),
            "Class 12 – Physics – Chapter 12, Page 4"
        );
        let unknown = fragment("b", "x", &Arc::new(Identity::Unresolved), 2);
        assert_eq!(
            concept_label(&unknown.metadata),
            "Unknown Class – Unknown Subject – Chapter Unknown Chapter, Page 2"
        );
    }

    #[test]
    fn test_dedup_preserves_first_seen_order() {
        let id = physics();
        let f1 = fragment("f1", "one", &id, 1);
        let f2 = fragment("f2", "two", &id, 2);
        let f3 = fragment("f3", "three", &id, 1);
        let labels = unique_labels(&[f1.clone(), f2.clone(), f1, f3]);
        assert_eq!(
            labels,
            vec![
                "Class 12 – Physics – Chapter 12, Page 1".to_string(),
                "Class 12 – Physics – Chapter 12, Page 2".to_string(),
            ]
        );
    }

    #[test]
    fn test_dedup_keeps_rank_not_alphabetical_order() {
        let id = physics();
        let labels = unique_labels(&[
            fragment("a", "x", &id, 9),
            fragment("b", "x", &id, 1),
        ]);
        assert!(labels[0].ends_with("Page 9"));
        assert!(labels[1].ends_with("Page 1"));
    }

    #[test]
    fn test_excerpt_uses_top_three_and_flattens_newlines() {
        let id = physics();
        let frags = vec![
            fragment("a", " first\nline ", &id, 1),
            fragment("b", "second", &id, 1),
            fragment("c", "third\n\npart", &id, 2),
            fragment("d", "fourth", &id, 3),
        ];
        assert_eq!(
            build_excerpt(&frags, 3),
            "first line second third  part"
        );
    }

    #[test]
    fn test_excerpt_with_fewer_fragments() {
        let frags = vec![fragment("a", "only", &physics(), 1)];
        assert_eq!(build_excerpt(&frags, 3), "only");
    }

    #[test]
    fn test_excerpt_fallback_when_empty() {
        assert_eq!(build_excerpt(&[], 3), NO_CONCEPTS_FOUND);
    }

    #[tokio::test]
    async fn test_short_query_makes_no_collaborator_calls() {
        let index = Arc::new(ScriptedIndex::new(Vec::new()));
        let embedder = Arc::new(CountingEmbedder::default());
        let r = retriever(index.clone(), embedder.clone());

        for q in ["", "short", "   tiny   "] {
            let err = r.retrieve(q).await.unwrap_err();
            assert!(matches!(err, RetrieveError::Validation(_)));
        }
        assert_eq!(index.calls.load(Ordering::SeqCst), 0);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_retrieve_labels_and_excerpt() {
        let id = physics();
        let index = Arc::new(ScriptedIndex::new(vec![
            fragment("f1", "inertia is", &id, 5),
            fragment("f2", "a body at rest", &id, 6),
            fragment("f3", "stays at rest", &id, 5),
        ]));
        let embedder = Arc::new(CountingEmbedder::default());
        let r = retriever(index.clone(), embedder.clone());

        let out = r.retrieve(QUERY).await.unwrap();
        assert_eq!(out.fragment_count, 3);
        assert_eq!(
            out.labels,
            vec![
                "Class 12 – Physics – Chapter 12, Page 5".to_string(),
                "Class 12 – Physics – Chapter 12, Page 6".to_string(),
            ]
        );
        assert_eq!(out.excerpt, "inertia is a body at rest stays at rest");
        assert_eq!(index.calls.load(Ordering::SeqCst), 1);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retrieve_respects_top_k() {
        let id = physics();
        let frags: Vec<Fragment> = (1..=10)
            .map(|p| fragment(&format!("f{}", p), "t", &id, p))
            .collect();
        let index = Arc::new(ScriptedIndex::new(frags));
        let r = retriever(index, Arc::new(CountingEmbedder::default()));

        assert_eq!(r.retrieve(QUERY).await.unwrap().labels.len(), 5);
        assert_eq!(r.retrieve_k(QUERY, 2).await.unwrap().labels.len(), 2);
    }

    #[tokio::test]
    async fn test_retrieve_empty_index() {
        let index = Arc::new(ScriptedIndex::new(Vec::new()));
        let r = retriever(index, Arc::new(CountingEmbedder::default()));
        let out = r.retrieve(QUERY).await.unwrap();
        assert!(out.is_empty());
        assert!(out.labels.is_empty());
        assert_eq!(out.excerpt, NO_CONCEPTS_FOUND);
    }

    #[tokio::test]
    async fn test_index_failure_is_propagated() {
        let index = Arc::new(ScriptedIndex::failing());
        let r = retriever(index, Arc::new(CountingEmbedder::default()));
        let err = r.retrieve(QUERY).await.unwrap_err();
        assert!(matches!(err, RetrieveError::Index(_)));
        assert!(err.to_string().contains("index unavailable"));
    }
}
