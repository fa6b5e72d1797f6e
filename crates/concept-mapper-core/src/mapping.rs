//! Concept mapping service: transcript → concepts, title and summary.
//!
//! Each request runs `Validate → Retrieve → Summarize → Respond`:
//!
//! - an invalid transcript stops at Validate with a [`ValidationError`]
//!   (wrapped in [`RetrieveError::Validation`]) before any collaborator call;
//! - an empty retrieval skips Summarize and answers with the
//!   "No concepts found." fallback;
//! - a summarizer failure is absorbed into [`Summary::unavailable`], so
//!   concept labels are returned whenever the index found fragments;
//! - embedding or index failures propagate as errors.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::retrieve::{ConceptRetriever, RetrieveError, NO_CONCEPTS_FOUND};
use crate::summarize::{summary_or_fallback, Summarizer};

/// Title returned when retrieval finds nothing.
pub const NO_TITLE_FOUND: &str = "No Title Found";

/// Number of labels that receive a display timestamp.
const PACED_CONCEPTS: usize = 3;
const PACING_START_SECS: u32 = 30;
const PACING_INTERVAL_SECS: u32 = 15;

/// Incoming mapping request. Mirrors the `POST /map-concepts` body.
///
/// Absent and `null` fields are the same thing: no transcript, no timestamps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MappingRequest {
    pub transcript: Option<String>,
    pub include_timestamps: Option<bool>,
}

impl MappingRequest {
    pub fn new(transcript: impl Into<String>, include_timestamps: bool) -> Self {
        Self {
            transcript: Some(transcript.into()),
            include_timestamps: Some(include_timestamps),
        }
    }
}

/// A concept paired with a display timestamp in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampedConcept {
    pub timestamp: u32,
    pub concept: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingResponse {
    pub concepts: Vec<String>,
    pub summary: String,
    pub title: String,
    pub timestamped_concepts: Vec<TimestampedConcept>,
}

/// Spread the first few labels over evenly spaced display timestamps.
///
/// These timestamps are a presentation aid only (`30 + i * 15` seconds).
/// They are not aligned with the transcript and carry no timing meaning.
pub fn display_pacing(labels: &[String]) -> Vec<TimestampedConcept> {
    labels
        .iter()
        .take(PACED_CONCEPTS)
        .zip(0u32..)
        .map(|(concept, i)| TimestampedConcept {
            timestamp: PACING_START_SECS + i * PACING_INTERVAL_SECS,
            concept: concept.clone(),
        })
        .collect()
}

/// Orchestrates retrieval and summarization for one request at a time.
///
/// Holds only shared read-only handles, so one instance serves concurrent
/// requests.
#[derive(Clone)]
pub struct ConceptMapper {
    retriever: ConceptRetriever,
    summarizer: Arc<dyn Summarizer>,
}

impl ConceptMapper {
    pub fn new(retriever: ConceptRetriever, summarizer: Arc<dyn Summarizer>) -> Self {
        Self {
            retriever,
            summarizer,
        }
    }

    pub fn retriever(&self) -> &ConceptRetriever {
        &self.retriever
    }

    pub async fn map(&self, request: &MappingRequest) -> Result<MappingResponse, RetrieveError> {
        // Validate
        let transcript = self
            .retriever
            .validate(request.transcript.as_deref().unwrap_or_default())?;

        // Retrieve
        let retrieval = self.retriever.retrieve(transcript).await?;
        if retrieval.is_empty() {
            info!("no fragments matched transcript");
            return Ok(MappingResponse {
                concepts: Vec::new(),
                summary: NO_CONCEPTS_FOUND.to_string(),
                title: NO_TITLE_FOUND.to_string(),
                timestamped_concepts: Vec::new(),
            });
        }

        // Summarize
        debug!(
            summarizer = self.summarizer.name(),
            excerpt_chars = retrieval.excerpt.len(),
            "summarizing excerpt"
        );
        let summary = summary_or_fallback(self.summarizer.summarize(&retrieval.excerpt).await);

        // Respond
        let timestamped_concepts = if request.include_timestamps.unwrap_or(false) {
            display_pacing(&retrieval.labels)
        } else {
            Vec::new()
        };

        Ok(MappingResponse {
            concepts: retrieval.labels,
            summary: summary.summary,
            title: summary.title,
            timestamped_concepts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Identity;
    use crate::retrieve::test_support::*;
    use crate::retrieve::RetrievalParams;
    use crate::summarize::{Summary, SummarizerError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const TRANSCRIPT: &str = "In this lecture we discuss electric charges and fields";

    struct FakeSummarizer {
        fail: bool,
        calls: AtomicUsize,
        last_excerpt: Mutex<Option<String>>,
    }

    impl FakeSummarizer {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                calls: AtomicUsize::new(0),
                last_excerpt: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl Summarizer for FakeSummarizer {
        fn name(&self) -> &str {
            "fake"
        }

        async fn summarize(&self, excerpt: &str) -> Result<Summary, SummarizerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_excerpt.lock().unwrap() = Some(excerpt.to_string());
            if self.fail {
                return Err(SummarizerError::Request("boom".to_string()));
            }
            Ok(Summary {
                title: "Electric Charges".to_string(),
                summary: "Charges exert forces.".to_string(),
            })
        }
    }

    fn mapper(
        index: Arc<ScriptedIndex>,
        summarizer: Arc<FakeSummarizer>,
    ) -> ConceptMapper {
        let retriever = ConceptRetriever::new(
            Arc::new(CountingEmbedder::default()),
            index,
            RetrievalParams::default(),
        );
        ConceptMapper::new(retriever, summarizer)
    }

    fn sample_index() -> Arc<ScriptedIndex> {
        let id = Arc::new(Identity::resolved("Class 12", "Physics", "1"));
        Arc::new(ScriptedIndex::new(vec![
            fragment("a", "charge is quantised", &id, 3),
            fragment("b", "coulomb law", &id, 4),
            fragment("c", "more on charge", &id, 3),
            fragment("d", "field lines", &id, 7),
            fragment("e", "flux", &id, 9),
        ]))
    }

    fn request(transcript: &str, include_timestamps: bool) -> MappingRequest {
        MappingRequest::new(transcript, include_timestamps)
    }

    #[test]
    fn test_display_pacing() {
        let labels: Vec<String> = (0..5).map(|i| format!("L{}", i)).collect();
        let paced = display_pacing(&labels);
        assert_eq!(paced.len(), 3);
        assert_eq!(
            paced.iter().map(|t| t.timestamp).collect::<Vec<_>>(),
            vec![30, 45, 60]
        );
        assert_eq!(paced[2].concept, "L2");
        assert!(display_pacing(&[]).is_empty());
        assert_eq!(display_pacing(&labels[..1]).len(), 1);
    }

    #[test]
    fn test_request_deserializes_camel_case_with_defaults() {
        let r: MappingRequest =
            serde_json::from_str(r#"{"transcript": "abc", "includeTimestamps": true}"#).unwrap();
        assert!(r.include_timestamps);
        let r: MappingRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(r, MappingRequest::default());
    }

    #[tokio::test]
    async fn test_full_mapping() {
        let summarizer = Arc::new(FakeSummarizer::new(false));
        let m = mapper(sample_index(), summarizer.clone());

        let resp = m.map(&request(TRANSCRIPT, true)).await.unwrap();
        assert_eq!(
            resp.concepts,
            vec![
                "Class 12 – Physics – Chapter 1, Page 3",
                "Class 12 – Physics – Chapter 1, Page 4",
                "Class 12 – Physics – Chapter 1, Page 7",
                "Class 12 – Physics – Chapter 1, Page 9",
            ]
        );
        assert_eq!(resp.title, "Electric Charges");
        assert_eq!(resp.summary, "Charges exert forces.");
        assert_eq!(resp.timestamped_concepts.len(), 3);
        assert_eq!(resp.timestamped_concepts[0].timestamp, 30);
        assert_eq!(resp.timestamped_concepts[0].concept, resp.concepts[0]);
        assert_eq!(
            summarizer.last_excerpt.lock().unwrap().as_deref(),
            Some("charge is quantised coulomb law more on charge")
        );
    }

    #[tokio::test]
    async fn test_timestamps_only_on_opt_in() {
        let m = mapper(sample_index(), Arc::new(FakeSummarizer::new(false)));
        let resp = m.map(&request(TRANSCRIPT, false)).await.unwrap();
        assert!(resp.timestamped_concepts.is_empty());
    }

    #[tokio::test]
    async fn test_summarizer_failure_keeps_concepts() {
        let summarizer = Arc::new(FakeSummarizer::new(true));
        let m = mapper(sample_index(), summarizer.clone());

        let resp = m.map(&request(TRANSCRIPT, false)).await.unwrap();
        assert_eq!(resp.concepts.len(), 4);
        assert_eq!(resp.title, "Error Generating Title");
        assert_eq!(resp.summary, "Summary not available.");
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_result_skips_summarizer() {
        let summarizer = Arc::new(FakeSummarizer::new(false));
        let m = mapper(Arc::new(ScriptedIndex::new(Vec::new())), summarizer.clone());

        let resp = m.map(&request(TRANSCRIPT, true)).await.unwrap();
        assert!(resp.concepts.is_empty());
        assert_eq!(resp.summary, "No concepts found.");
        assert_eq!(resp.title, NO_TITLE_FOUND);
        assert!(resp.timestamped_concepts.is_empty());
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_transcript_calls_nothing() {
        let index = sample_index();
        let summarizer = Arc::new(FakeSummarizer::new(false));
        let m = mapper(index.clone(), summarizer.clone());

        let err = m.map(&request("too short", true)).await.unwrap_err();
        assert!(matches!(err, RetrieveError::Validation(_)));
        assert_eq!(index.calls.load(Ordering::SeqCst), 0);
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_index_failure_is_an_error() {
        let summarizer = Arc::new(FakeSummarizer::new(false));
        let m = mapper(Arc::new(ScriptedIndex::failing()), summarizer.clone());
        let err = m.map(&request(TRANSCRIPT, false)).await.unwrap_err();
        assert!(matches!(err, RetrieveError::Index(_)));
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_response_serializes_camel_case() {
        let resp = MappingResponse {
            concepts: vec!["c".to_string()],
            summary: "s".to_string(),
            title: "t".to_string(),
            timestamped_concepts: display_pacing(&["c".to_string()]),
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["timestampedConcepts"][0]["timestamp"], 30);
        assert_eq!(json["timestampedConcepts"][0]["concept"], "c");
    }

    #[tokio::test]
    async fn test_null_fields_read_as_absent() {
        let req: MappingRequest =
            serde_json::from_str(r#"{"transcript": null, "includeTimestamps": null}"#).unwrap();
        assert_eq!(req, MappingRequest::default());

        let index = sample_index();
        let m = mapper(index.clone(), Arc::new(FakeSummarizer::new(false)));
        let err = m.map(&req).await.unwrap_err();
        assert!(matches!(
            err,
            RetrieveError::Validation(crate::retrieve::ValidationError::Missing)
        ));
        assert_eq!(index.calls.load(Ordering::SeqCst), 0);
    }
}
