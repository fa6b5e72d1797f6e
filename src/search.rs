//! Query commands: `cmap search` and `cmap map`.
//!
//! Both build the same [`ConceptMapper`] the server uses, so the CLI and
//! HTTP surfaces share one retrieval path.

use anyhow::Result;
use std::sync::Arc;

use concept_mapper_core::mapping::{ConceptMapper, MappingRequest};
use concept_mapper_core::retrieve::ConceptRetriever;

use crate::config::Config;
use crate::db;
use crate::embedding;
use crate::index::{self, SqliteIndex};
use crate::migrate;
use crate::summarizer;

/// Wire the configured embedder, SQLite index and summarizer together.
///
/// A disabled embedder is allowed here so the server can still start; every
/// retrieval then fails at the embedding step.
pub async fn build_mapper(config: &Config) -> Result<ConceptMapper> {
    let embedder = embedding::create_query_provider(&config.embedding)?;
    let summarizer = summarizer::create_summarizer(&config.summarizer)?;

    let pool = db::connect(config).await?;
    migrate::apply(&pool).await?;
    if config.embedding.is_enabled() {
        index::warn_on_model_mismatch(&pool, embedder.model_name()).await?;
    }

    let index = Arc::new(SqliteIndex::new(pool, embedder.model_name()));
    let retriever = ConceptRetriever::new(embedder, index, config.retrieval.params());
    Ok(ConceptMapper::new(retriever, summarizer))
}

pub async fn run_search(config: &Config, query: &str, limit: Option<usize>) -> Result<()> {
    let mapper = build_mapper(config).await?;
    let retriever = mapper.retriever();
    let k = limit.unwrap_or(retriever.params().top_k);

    let retrieval = retriever.retrieve_k(query, k).await?;
    if retrieval.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, label) in retrieval.labels.iter().enumerate() {
        println!("{}. {}", i + 1, label);
    }
    println!();
    println!("fragments: {}", retrieval.fragment_count);
    println!("excerpt: \"{}\"", retrieval.excerpt);

    Ok(())
}

pub async fn run_map(config: &Config, transcript: &str, include_timestamps: bool) -> Result<()> {
    let mapper = build_mapper(config).await?;
    let response = mapper
        .map(&MappingRequest::new(transcript, include_timestamps))
        .await?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
