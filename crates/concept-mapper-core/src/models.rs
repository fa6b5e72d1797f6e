//! Core data models used throughout Concept Mapper.
//!
//! These types represent the pages, document identities and fragments that
//! flow through the ingestion and retrieval pipeline.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Sentinel class for documents whose filename matched no known convention.
pub const UNKNOWN_CLASS: &str = "Unknown Class";
/// Sentinel subject for unresolved documents.
pub const UNKNOWN_SUBJECT: &str = "Unknown Subject";
/// Sentinel chapter for unresolved documents.
pub const UNKNOWN_CHAPTER: &str = "Unknown Chapter";

/// One page of extracted document text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub page: u32,
    pub text: String,
}

/// Curriculum identity of a source document.
///
/// Either every field holds a parsed value or the document is
/// [`Unresolved`](Identity::Unresolved), which renders as the sentinel
/// triple. There is no partially resolved state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Resolved {
        class: String,
        subject: String,
        chapter: String,
    },
    Unresolved,
}

impl Identity {
    pub fn resolved(
        class: impl Into<String>,
        subject: impl Into<String>,
        chapter: impl Into<String>,
    ) -> Self {
        Identity::Resolved {
            class: class.into(),
            subject: subject.into(),
            chapter: chapter.into(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Identity::Resolved { .. })
    }

    pub fn class(&self) -> &str {
        match self {
            Identity::Resolved { class, .. } => class,
            Identity::Unresolved => UNKNOWN_CLASS,
        }
    }

    pub fn subject(&self) -> &str {
        match self {
            Identity::Resolved { subject, .. } => subject,
            Identity::Unresolved => UNKNOWN_SUBJECT,
        }
    }

    pub fn chapter(&self) -> &str {
        match self {
            Identity::Resolved { chapter, .. } => chapter,
            Identity::Unresolved => UNKNOWN_CHAPTER,
        }
    }

    /// Rebuilds an identity from stored field values.
    ///
    /// The exact sentinel triple maps back to `Unresolved`; anything else is
    /// taken as resolved.
    pub fn from_fields(class: &str, subject: &str, chapter: &str) -> Self {
        if class == UNKNOWN_CLASS && subject == UNKNOWN_SUBJECT && chapter == UNKNOWN_CHAPTER {
            Identity::Unresolved
        } else {
            Identity::resolved(class, subject, chapter)
        }
    }
}

/// Metadata attached to every fragment.
///
/// The identity is shared by all fragments of one document; only the page
/// differs between them. Serialized flat as `{class, subject, chapter, page}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "MetadataRecord", into = "MetadataRecord")]
pub struct FragmentMetadata {
    pub identity: Arc<Identity>,
    pub page: u32,
}

impl FragmentMetadata {
    pub fn class(&self) -> &str {
        self.identity.class()
    }

    pub fn subject(&self) -> &str {
        self.identity.subject()
    }

    pub fn chapter(&self) -> &str {
        self.identity.chapter()
    }
}

#[derive(Serialize, Deserialize)]
struct MetadataRecord {
    class: String,
    subject: String,
    chapter: String,
    page: u32,
}

impl From<MetadataRecord> for FragmentMetadata {
    fn from(r: MetadataRecord) -> Self {
        FragmentMetadata {
            identity: Arc::new(Identity::from_fields(&r.class, &r.subject, &r.chapter)),
            page: r.page,
        }
    }
}

impl From<FragmentMetadata> for MetadataRecord {
    fn from(m: FragmentMetadata) -> Self {
        MetadataRecord {
            class: m.class().to_string(),
            subject: m.subject().to_string(),
            chapter: m.chapter().to_string(),
            page: m.page,
        }
    }
}

/// The atomic retrievable unit: one word window of one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    /// `{document}_p{page}_c{window_index}`.
    #[serde(alias = "chunk_id")]
    pub id: String,
    pub text: String,
    pub metadata: FragmentMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(identity: Identity) -> Fragment {
        Fragment {
            id: "doc_p1_c0".to_string(),
            text: "alpha beta".to_string(),
            metadata: FragmentMetadata {
                identity: Arc::new(identity),
                page: 1,
            },
        }
    }

    #[test]
    fn test_metadata_serializes_flat() {
        let f = fragment(Identity::resolved("Class 12", "Physics", "12"));
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(json["id"], "doc_p1_c0");
        assert_eq!(json["metadata"]["class"], "Class 12");
        assert_eq!(json["metadata"]["subject"], "Physics");
        assert_eq!(json["metadata"]["chapter"], "12");
        assert_eq!(json["metadata"]["page"], 1);
    }

    #[test]
    fn test_unresolved_serializes_as_sentinels() {
        let f = fragment(Identity::Unresolved);
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(json["metadata"]["class"], UNKNOWN_CLASS);
        assert_eq!(json["metadata"]["subject"], UNKNOWN_SUBJECT);
        assert_eq!(json["metadata"]["chapter"], UNKNOWN_CHAPTER);

        let back: Fragment = serde_json::from_value(json).unwrap();
        assert_eq!(*back.metadata.identity, Identity::Unresolved);
    }

    #[test]
    fn test_accepts_legacy_chunk_id_key() {
        let raw = r#"{
            "chunk_id": "6th math ch 3_p2_c1",
            "text": "fractions",
            "metadata": {"class": "Class 6", "subject": "Math", "chapter": "3", "page": 2}
        }"#;
        let f: Fragment = serde_json::from_str(raw).unwrap();
        assert_eq!(f.id, "6th math ch 3_p2_c1");
        assert_eq!(f.metadata.page, 2);
        assert_eq!(
            *f.metadata.identity,
            Identity::resolved("Class 6", "Math", "3")
        );
    }

    #[test]
    fn test_partial_sentinels_stay_resolved() {
        let id = Identity::from_fields(UNKNOWN_CLASS, "Physics", UNKNOWN_CHAPTER);
        assert!(id.is_resolved());
    }
}
