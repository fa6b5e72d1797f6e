//! Page JSON → chunk JSON (`cmap chunk`).
//!
//! For every `<extracted_dir>/<doc>.json` the document's identity is
//! resolved from `<doc>`, each page is windowed, and the fragments are
//! written to `<chunks_dir>/<doc>_chunks.json`. A file that cannot be read
//! or parsed is skipped with a warning; the run continues.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use concept_mapper_core::chunk::WindowParams;
use concept_mapper_core::fragment::{self, DocumentFragments};
use concept_mapper_core::models::{Fragment, Page};

use crate::config::Config;
use crate::extract::{list_files, write_json};

const CHUNKS_SUFFIX: &str = "_chunks";

/// Output path for a document's fragments.
pub fn chunk_file_path(chunks_dir: &Path, document: &str) -> PathBuf {
    chunks_dir.join(format!("{}{}.json", document, CHUNKS_SUFFIX))
}

/// Document name of a chunk file: `"12th phy ch 1_chunks.json"` → `"12th phy ch 1"`.
pub fn document_of_chunk_file(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_string_lossy().to_string();
    Some(
        stem.strip_suffix(CHUNKS_SUFFIX)
            .map(str::to_string)
            .unwrap_or(stem),
    )
}

/// Read extracted pages. Page numbers start at 1; a page 0 rejects the file.
pub fn load_pages(path: &Path) -> Result<Vec<Page>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let pages: Vec<Page> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid page JSON in {}", path.display()))?;
    if pages.iter().any(|p| p.page == 0) {
        bail!("Page numbers start at 1: found page 0 in {}", path.display());
    }
    Ok(pages)
}

pub fn load_fragments(path: &Path) -> Result<Vec<Fragment>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let fragments: Vec<Fragment> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid chunk JSON in {}", path.display()))?;
    if let Some(f) = fragments.iter().find(|f| f.metadata.page == 0) {
        bail!("Fragment {} in {} has page 0", f.id, path.display());
    }
    Ok(fragments)
}

/// Build and write the fragments of one extracted-text file.
pub fn chunk_document(
    path: &Path,
    chunks_dir: &Path,
    params: WindowParams,
) -> Result<DocumentFragments> {
    let document = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .ok_or_else(|| anyhow::anyhow!("No file name: {}", path.display()))?;

    let pages = load_pages(path)?;
    let built = fragment::build(&document, &pages, params);
    write_json(&chunk_file_path(chunks_dir, &document), &built.fragments)?;
    Ok(built)
}

pub fn run_chunk(config: &Config) -> Result<()> {
    let chunks_dir = &config.paths.chunks_dir;
    std::fs::create_dir_all(chunks_dir)
        .with_context(|| format!("Failed to create {}", chunks_dir.display()))?;

    let params = config.chunking.params();
    let mut documents = 0u64;
    let mut fragments = 0u64;
    let mut unparsed = 0u64;
    let mut failed = 0u64;

    for path in list_files(&config.paths.extracted_dir, "json")? {
        match chunk_document(&path, chunks_dir, params) {
            Ok(built) => {
                info!(
                    file = %path.display(),
                    fragments = built.fragments.len(),
                    "chunked"
                );
                documents += 1;
                fragments += built.fragments.len() as u64;
                if built.warning.is_some() {
                    unparsed += 1;
                }
            }
            Err(e) => {
                warn!("skipping {}: {:#}", path.display(), e);
                failed += 1;
            }
        }
    }

    println!("chunk");
    println!("  documents: {}", documents);
    println!("  fragments: {}", fragments);
    println!("  unparsed filenames: {}", unparsed);
    println!("  failed: {}", failed);
    println!("ok");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_pages(dir: &Path, name: &str, pages: &[(u32, &str)]) -> PathBuf {
        let pages: Vec<Page> = pages
            .iter()
            .map(|(page, text)| Page {
                page: *page,
                text: text.to_string(),
            })
            .collect();
        let path = dir.join(name);
        write_json(&path, &pages).unwrap();
        path
    }

    #[test]
    fn test_chunk_file_naming() {
        let path = chunk_file_path(Path::new("out"), "12th phy ch 1");
        assert_eq!(path, Path::new("out/12th phy ch 1_chunks.json"));
        assert_eq!(document_of_chunk_file(&path).unwrap(), "12th phy ch 1");
        assert_eq!(
            document_of_chunk_file(Path::new("x/plain.json")).unwrap(),
            "plain"
        );
    }

    #[test]
    fn test_page_zero_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let input = write_pages(tmp.path(), "9th phy ch 9.json", &[(0, "cover"), (1, "motion")]);

        let err = chunk_document(&input, tmp.path(), WindowParams::new(2, 0)).unwrap_err();
        assert!(err.to_string().contains("page 0"), "{}", err);
        assert!(!chunk_file_path(tmp.path(), "9th phy ch 9").exists());
    }

    #[test]
    fn test_chunk_document_writes_fragments() {
        let tmp = TempDir::new().unwrap();
        let input = write_pages(
            tmp.path(),
            "10th chem ch 2.json",
            &[(1, "acids bases and salts"), (4, "indicators")],
        );

        let built = chunk_document(&input, tmp.path(), WindowParams::new(2, 0)).unwrap();
        assert!(built.warning.is_none());
        assert_eq!(built.fragments.len(), 3);

        let written = load_fragments(&chunk_file_path(tmp.path(), "10th chem ch 2")).unwrap();
        assert_eq!(written, built.fragments);
        assert_eq!(written[0].id, "10th chem ch 2_p1_c0");
        assert_eq!(written[2].id, "10th chem ch 2_p4_c0");
        assert_eq!(written[2].metadata.subject(), "Chemistry");
        assert_eq!(written[2].metadata.page, 4);
    }

    #[test]
    fn test_unparsed_name_still_chunks() {
        let tmp = TempDir::new().unwrap();
        let input = write_pages(tmp.path(), "biology notes.json", &[(1, "cells")]);
        let built = chunk_document(&input, tmp.path(), WindowParams::default()).unwrap();
        assert!(built.warning.is_some());
        assert_eq!(built.fragments[0].metadata.class(), "Unknown Class");
    }

    #[test]
    fn test_load_fragments_accepts_chunk_id_key() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("legacy_chunks.json");
        std::fs::write(
            &path,
            r#"[{"chunk_id": "6th math ch 3_p2_c0", "text": "playing with numbers",
                 "metadata": {"class": "Class 6", "subject": "Math", "chapter": "3", "page": 2}}]"#,
        )
        .unwrap();
        let fragments = load_fragments(&path).unwrap();
        assert_eq!(fragments[0].id, "6th math ch 3_p2_c0");
        assert!(fragments[0].metadata.identity.is_resolved());
    }

    #[test]
    fn test_invalid_page_json_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(chunk_document(&path, tmp.path(), WindowParams::default()).is_err());
    }
}
