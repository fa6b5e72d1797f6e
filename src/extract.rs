//! PDF → page JSON.
//!
//! Each PDF in `[paths] pdf_dir` becomes `<extracted_dir>/<stem>.json`, an
//! array of `{page, text}`. Page text is whitespace-collapsed, blank pages
//! are dropped, and page numbers are physical (1-based) so they stay stable
//! when blanks are skipped.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};
use walkdir::WalkDir;

use concept_mapper_core::models::Page;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
}

/// Collapse every run of whitespace (including line breaks) to one space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split raw per-page text into non-blank [`Page`]s numbered from 1.
pub fn pages_from_text(raw_pages: &[String]) -> Vec<Page> {
    raw_pages
        .iter()
        .zip(1u32..)
        .filter_map(|(raw, page)| {
            let text = collapse_whitespace(raw);
            (!text.is_empty()).then_some(Page { page, text })
        })
        .collect()
}

/// Extract the non-blank pages of an in-memory PDF.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<Page>, ExtractError> {
    let raw = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;
    Ok(pages_from_text(&raw))
}

/// Files directly inside `dir` whose extension matches `ext`, sorted by name.
pub fn list_files(dir: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("Directory does not exist: {}", dir.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .map(|e| e.eq_ignore_ascii_case(ext))
            .unwrap_or(false);
        if matches {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Write `value` as pretty-printed UTF-8 JSON.
pub fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

pub fn run_extract(config: &Config) -> Result<()> {
    let pdf_dir = &config.paths.pdf_dir;
    let out_dir = &config.paths.extracted_dir;
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let mut documents = 0u64;
    let mut pages_total = 0u64;
    let mut failed = 0u64;

    for path in list_files(pdf_dir, "pdf")? {
        let stem = match path.file_stem() {
            Some(s) => s.to_string_lossy().to_string(),
            None => continue,
        };

        let pages = match std::fs::read(&path)
            .map_err(|e| e.to_string())
            .and_then(|bytes| extract_pages(&bytes).map_err(|e| e.to_string()))
        {
            Ok(pages) => pages,
            Err(e) => {
                warn!(file = %path.display(), "skipping: {}", e);
                failed += 1;
                continue;
            }
        };

        let out_path = out_dir.join(format!("{}.json", stem));
        write_json(&out_path, &pages)?;
        info!(document = %stem, pages = pages.len(), "extracted");

        documents += 1;
        pages_total += pages.len() as u64;
    }

    println!("extract");
    println!("  documents: {}", documents);
    println!("  pages: {}", pages_total);
    println!("  failed: {}", failed);
    println!("ok");

    Ok(())
}
