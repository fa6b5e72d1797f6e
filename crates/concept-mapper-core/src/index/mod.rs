//! Nearest-neighbor fragment index abstraction.
//!
//! The [`FragmentIndex`] trait is the only view the retrieval pipeline has
//! of the vector store: given a query vector, return the `k` most similar
//! fragments, best first. The SQLite implementation lives in the app
//! crate; [`memory::InMemoryIndex`] serves tests and small corpora.
//!
//! At query time an index is read-only from the retriever's point of view
//! and must be safe to share across concurrent requests.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::Fragment;

#[async_trait]
pub trait FragmentIndex: Send + Sync {
    /// Return up to `k` fragments ranked by similarity to `query_vec`,
    /// best first. The caller does not re-sort.
    async fn nearest(&self, query_vec: &[f32], k: usize) -> Result<Vec<Fragment>>;
}
