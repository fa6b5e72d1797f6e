//! Fragment building: pages + identity → retrievable fragments.
//!
//! A document's identity is resolved once from its name and shared by
//! every fragment through an `Arc`. Each page is windowed independently,
//! so a fragment's page number always matches the page its text came from.

use std::sync::Arc;

use crate::chunk::{window, WindowParams};
use crate::identity::{self, ParseWarning};
use crate::models::{Fragment, FragmentMetadata, Identity, Page};

/// All fragments produced from one document.
#[derive(Debug, Clone)]
pub struct DocumentFragments {
    pub identity: Arc<Identity>,
    pub warning: Option<ParseWarning>,
    pub fragments: Vec<Fragment>,
}

/// Deterministic fragment id: `{document}_p{page}_c{window_index}`.
pub fn fragment_id(document_name: &str, page: u32, window_index: usize) -> String {
    format!("{}_p{}_c{}", document_name, page, window_index)
}

/// Build the fragments of one document.
///
/// `document_name` is the document's file stem; it is used both for the
/// identity lookup and as the id prefix. Pages are processed in the given
/// order and windows in window order. Performs no I/O.
pub fn build(document_name: &str, pages: &[Page], params: WindowParams) -> DocumentFragments {
    let resolution = identity::resolve(document_name);
    let identity = Arc::new(resolution.identity);

    let fragments = pages
        .iter()
        .flat_map(|page| {
            let identity = Arc::clone(&identity);
            window(&page.text, params)
                .into_iter()
                .enumerate()
                .map(move |(i, text)| Fragment {
                    id: fragment_id(document_name, page.page, i),
                    text,
                    metadata: FragmentMetadata {
                        identity: Arc::clone(&identity),
                        page: page.page,
                    },
                })
        })
        .collect();

    DocumentFragments {
        identity,
        warning: resolution.warning,
        fragments,
    }
}
