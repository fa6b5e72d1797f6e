use anyhow::{bail, Result};
use sqlx::SqlitePool;
use tracing::{info, warn};

use concept_mapper_core::embedding::EmbeddingProvider;

use crate::config::Config;
use crate::db;
use crate::embedding;
use crate::extract::list_files;
use crate::index;
use crate::ingest::{document_of_chunk_file, load_fragments};
use crate::migrate;

/// Load chunk files into the index and embed every fragment that lacks an
/// up-to-date vector for the configured model.
pub async fn run_embed(
    config: &Config,
    rebuild: bool,
    batch_size_override: Option<usize>,
) -> Result<()> {
    if !config.embedding.is_enabled() {
        bail!("Embedding provider is disabled. Set [embedding] provider in config.");
    }

    let provider = embedding::create_provider(&config.embedding)?;
    let pool = db::connect(config).await?;
    migrate::apply(&pool).await?;
    let batch_size = batch_size_override
        .unwrap_or(config.embedding.batch_size)
        .max(1);

    if rebuild {
        index::clear_vectors(&pool).await?;
        info!("cleared existing vectors");
    }

    let documents = load_documents(config, &pool).await?;

    let stats = embed_pending(&pool, provider.as_ref(), batch_size).await?;

    println!("embed{}", if rebuild { " (rebuild)" } else { "" });
    println!("  documents: {}", documents);
    println!("  pending: {}", stats.pending);
    println!("  embedded: {}", stats.embedded);
    println!("  failed: {}", stats.failed);
    println!("ok");

    pool.close().await;
    Ok(())
}

/// Replace each document's fragments with the contents of its chunk file.
async fn load_documents(config: &Config, pool: &SqlitePool) -> Result<u64> {
    let mut documents = 0u64;
    for path in list_files(&config.paths.chunks_dir, "json")? {
        let Some(document) = document_of_chunk_file(&path) else {
            continue;
        };
        let fragments = match load_fragments(&path) {
            Ok(f) => f,
            Err(e) => {
                warn!("skipping {}: {:#}", path.display(), e);
                continue;
            }
        };
        index::replace_document(pool, &document, &fragments).await?;
        documents += 1;
    }
    Ok(documents)
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct EmbedStats {
    pub pending: u64,
    pub embedded: u64,
    pub failed: u64,
}

/// Embed pending fragments in batches. A failed batch is counted and
/// skipped; its fragments stay pending for the next run.
pub async fn embed_pending(
    pool: &SqlitePool,
    provider: &dyn EmbeddingProvider,
    batch_size: usize,
) -> Result<EmbedStats> {
    let model = provider.model_name().to_string();
    let pending = index::find_pending(pool, &model).await?;
    let mut stats = EmbedStats {
        pending: pending.len() as u64,
        ..EmbedStats::default()
    };

    for batch in pending.chunks(batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|p| p.text.clone()).collect();

        match provider.embed(&texts).await {
            Ok(vectors) if vectors.len() == batch.len() => {
                for (item, vector) in batch.iter().zip(vectors.iter()) {
                    index::upsert_vector(pool, item, &model, vector).await?;
                    stats.embedded += 1;
                }
            }
            Ok(vectors) => {
                warn!(
                    expected = batch.len(),
                    got = vectors.len(),
                    "embedding batch returned the wrong number of vectors"
                );
                stats.failed += batch.len() as u64;
            }
            Err(e) => {
                warn!("embedding batch failed: {:#}", e);
                stats.failed += batch.len() as u64;
            }
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use concept_mapper_core::models::{Fragment, FragmentMetadata, Identity};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Maps each text to `[len, 1]`; fails every call after `fail_after`.
    struct LengthEmbedder {
        calls: AtomicUsize,
        fail_after: usize,
    }

    #[async_trait]
    impl EmbeddingProvider for LengthEmbedder {
        fn model_name(&self) -> &str {
            "length"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) >= self.fail_after {
                bail!("provider down");
            }
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }
    }

    async fn pool_with(tmp: &TempDir, n: usize) -> SqlitePool {
        let mut config = Config::minimal();
        config.db.path = tmp.path().join("cmap.sqlite");
        let pool = db::connect(&config).await.unwrap();
        migrate::apply(&pool).await.unwrap();

        let identity = Arc::new(Identity::resolved("Class 11", "Physics", "5"));
        let fragments: Vec<Fragment> = (0..n)
            .map(|i| Fragment {
                id: format!("doc_p1_c{}", i),
                text: "w".repeat(i + 1),
                metadata: FragmentMetadata {
                    identity: Arc::clone(&identity),
                    page: 1,
                },
            })
            .collect();
        index::replace_document(&pool, "doc", &fragments)
            .await
            .unwrap();
        pool
    }

    #[tokio::test]
    async fn test_embed_pending_in_batches() {
        let tmp = TempDir::new().unwrap();
        let pool = pool_with(&tmp, 5).await;
        let provider = LengthEmbedder {
            calls: AtomicUsize::new(0),
            fail_after: usize::MAX,
        };

        let stats = embed_pending(&pool, &provider, 2).await.unwrap();
        assert_eq!(
            stats,
            EmbedStats {
                pending: 5,
                embedded: 5,
                failed: 0
            }
        );
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);

        // Second run has nothing to do
        let stats = embed_pending(&pool, &provider, 2).await.unwrap();
        assert_eq!(stats.pending, 0);
    }

    #[tokio::test]
    async fn test_failed_batches_stay_pending() {
        let tmp = TempDir::new().unwrap();
        let pool = pool_with(&tmp, 4).await;
        let provider = LengthEmbedder {
            calls: AtomicUsize::new(0),
            fail_after: 1,
        };

        let stats = embed_pending(&pool, &provider, 2).await.unwrap();
        assert_eq!(stats.embedded, 2);
        assert_eq!(stats.failed, 2);
        assert_eq!(index::find_pending(&pool, "length").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_disabled_provider_fails_fast() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::minimal();
        config.db.path = tmp.path().join("cmap.sqlite");
        let err = run_embed(&config, false, None).await.unwrap_err();
        assert!(err.to_string().contains("disabled"));
        assert!(!config.db.path.exists());
    }
}
