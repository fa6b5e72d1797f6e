//! SQLite-backed fragment store and [`FragmentIndex`].
//!
//! Fragments live in `fragments`; their vectors in `fragment_vectors`, with
//! the producing model and text hash in `embeddings`. Search loads every
//! vector for the active model and ranks by cosine similarity in Rust.
//! Equal scores keep fragment insertion (rowid) order.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, warn};

use concept_mapper_core::embedding::{blob_to_vec, cosine_similarity, text_hash, vec_to_blob};
use concept_mapper_core::index::FragmentIndex;
use concept_mapper_core::models::{Fragment, FragmentMetadata, Identity};

/// Read-only nearest-neighbor view over the fragment database.
pub struct SqliteIndex {
    pool: SqlitePool,
    model: String,
}

impl SqliteIndex {
    /// Search only vectors produced by `model`.
    pub fn new(pool: SqlitePool, model: impl Into<String>) -> Self {
        Self {
            pool,
            model: model.into(),
        }
    }
}

#[async_trait]
impl FragmentIndex for SqliteIndex {
    async fn nearest(&self, query_vec: &[f32], k: usize) -> Result<Vec<Fragment>> {
        let rows = sqlx::query(
            r#"
            SELECT f.id, f.text, f.page, f.class, f.subject, f.chapter, v.embedding
            FROM fragments f
            JOIN fragment_vectors v ON v.fragment_id = f.id
            JOIN embeddings e ON e.fragment_id = f.id
            WHERE e.model = ?
            ORDER BY f.rowid
            "#,
        )
        .bind(&self.model)
        .fetch_all(&self.pool)
        .await?;

        let mut scored: Vec<(f32, Fragment)> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let score = cosine_similarity(query_vec, &blob_to_vec(&blob));
                (score, fragment_from_row(row))
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        debug!(candidates = rows.len(), k, "vector scan");
        Ok(scored.into_iter().map(|(_, f)| f).collect())
    }
}

fn fragment_from_row(row: &sqlx::sqlite::SqliteRow) -> Fragment {
    let class: String = row.get("class");
    let subject: String = row.get("subject");
    let chapter: String = row.get("chapter");
    let page: i64 = row.get("page");
    Fragment {
        id: row.get("id"),
        text: row.get("text"),
        metadata: FragmentMetadata {
            identity: std::sync::Arc::new(Identity::from_fields(&class, &subject, &chapter)),
            page: page as u32,
        },
    }
}

/// Replace every stored fragment of `document` with `fragments`.
///
/// Vectors whose fragment id survives with the same text stay valid; the
/// rest become orphans and are removed.
pub async fn replace_document(
    pool: &SqlitePool,
    document: &str,
    fragments: &[Fragment],
) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM fragments WHERE document = ?")
        .bind(document)
        .execute(&mut *tx)
        .await?;

    // Window ordinal within each page, in fragment order.
    let mut windows_per_page: HashMap<u32, i64> = HashMap::new();
    for fragment in fragments {
        let counter = windows_per_page.entry(fragment.metadata.page).or_insert(0);
        let window_index = *counter;
        *counter += 1;

        sqlx::query(
            r#"
            INSERT INTO fragments (id, document, page, window_index, text, class, subject, chapter, hash)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                document = excluded.document,
                page = excluded.page,
                window_index = excluded.window_index,
                text = excluded.text,
                class = excluded.class,
                subject = excluded.subject,
                chapter = excluded.chapter,
                hash = excluded.hash
            "#,
        )
        .bind(&fragment.id)
        .bind(document)
        .bind(fragment.metadata.page as i64)
        .bind(window_index)
        .bind(&fragment.text)
        .bind(fragment.metadata.class())
        .bind(fragment.metadata.subject())
        .bind(fragment.metadata.chapter())
        .bind(text_hash(&fragment.text))
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("DELETE FROM embeddings WHERE fragment_id NOT IN (SELECT id FROM fragments)")
        .execute(&mut *tx)
        .await?;
    sqlx::query(
        "DELETE FROM fragment_vectors WHERE fragment_id NOT IN (SELECT id FROM fragments)",
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// A fragment that has no vector for the active model, or a stale one.
pub struct PendingFragment {
    pub id: String,
    pub document: String,
    pub text: String,
    pub hash: String,
}

pub async fn find_pending(pool: &SqlitePool, model: &str) -> Result<Vec<PendingFragment>> {
    let rows = sqlx::query(
        r#"
        SELECT f.id, f.document, f.text, f.hash
        FROM fragments f
        LEFT JOIN embeddings e ON e.fragment_id = f.id AND e.model = ?
        WHERE e.fragment_id IS NULL OR e.hash != f.hash
        ORDER BY f.rowid
        "#,
    )
    .bind(model)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| PendingFragment {
            id: row.get("id"),
            document: row.get("document"),
            text: row.get("text"),
            hash: row.get("hash"),
        })
        .collect())
}

pub async fn upsert_vector(
    pool: &SqlitePool,
    fragment: &PendingFragment,
    model: &str,
    vector: &[f32],
) -> Result<()> {
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        r#"
        INSERT INTO embeddings (fragment_id, model, dims, created_at, hash)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(fragment_id) DO UPDATE SET
            model = excluded.model,
            dims = excluded.dims,
            created_at = excluded.created_at,
            hash = excluded.hash
        "#,
    )
    .bind(&fragment.id)
    .bind(model)
    .bind(vector.len() as i64)
    .bind(now)
    .bind(&fragment.hash)
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO fragment_vectors (fragment_id, document, embedding)
        VALUES (?, ?, ?)
        ON CONFLICT(fragment_id) DO UPDATE SET
            document = excluded.document,
            embedding = excluded.embedding
        "#,
    )
    .bind(&fragment.id)
    .bind(&fragment.document)
    .bind(vec_to_blob(vector))
    .execute(pool)
    .await?;

    Ok(())
}

/// Remove every stored vector.
pub async fn clear_vectors(pool: &SqlitePool) -> Result<()> {
    sqlx::query("DELETE FROM fragment_vectors")
        .execute(pool)
        .await?;
    sqlx::query("DELETE FROM embeddings").execute(pool).await?;
    Ok(())
}

/// Warn when stored vectors come from a model other than `model`.
///
/// Vectors from different models are not comparable, so such fragments are
/// invisible to search until re-embedded.
pub async fn warn_on_model_mismatch(pool: &SqlitePool, model: &str) -> Result<()> {
    let rows = sqlx::query(
        "SELECT model, COUNT(*) AS n FROM embeddings WHERE model != ? GROUP BY model",
    )
    .bind(model)
    .fetch_all(pool)
    .await?;

    for row in rows {
        let other: String = row.get("model");
        let n: i64 = row.get("n");
        warn!(
            configured = model,
            stored = %other,
            fragments = n,
            "stored vectors were produced by a different embedding model; run `cmap embed --rebuild`"
        );
    }
    Ok(())
}
