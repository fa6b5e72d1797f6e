//! In-memory [`FragmentIndex`] implementation for tests and small corpora.
//!
//! Keeps `(fragment, vector)` pairs in a `Vec` behind `std::sync::RwLock`.
//! Search is brute-force cosine similarity; ties keep insertion order.

use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::Fragment;

use super::FragmentIndex;

struct StoredVector {
    fragment: Fragment,
    vector: Vec<f32>,
}

/// In-memory fragment index.
pub struct InMemoryIndex {
    entries: RwLock<Vec<StoredVector>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Add a fragment with its embedding. Appends; ids are not deduplicated.
    pub fn insert(&self, fragment: Fragment, vector: Vec<f32>) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("in-memory index lock poisoned"))?;
        entries.push(StoredVector { fragment, vector });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FragmentIndex for InMemoryIndex {
    async fn nearest(&self, query_vec: &[f32], k: usize) -> Result<Vec<Fragment>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow!("in-memory index lock poisoned"))?;

        let mut scored: Vec<(f32, &Fragment)> = entries
            .iter()
            .map(|sv| (cosine_similarity(query_vec, &sv.vector), &sv.fragment))
            .collect();

        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        Ok(scored.into_iter().map(|(_, f)| f.clone()).collect())
    }
}
