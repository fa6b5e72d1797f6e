//! Summarizer trait, strict output parsing and the failure fallback.
//!
//! A summarizer turns a short excerpt into a `{title, summary}` pair. Its
//! output contract is strict: a JSON object with two string fields. Any
//! other output is [`SummarizerError::Malformed`]; nothing is partially
//! trusted. Callers map failures to [`Summary::unavailable`] with
//! [`summary_or_fallback`] so a broken summarizer never fails a request.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Title used when the summarizer fails.
pub const ERROR_TITLE: &str = "Error Generating Title";
/// Summary used when the summarizer fails.
pub const SUMMARY_UNAVAILABLE: &str = "Summary not available.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Summary {
    pub title: String,
    pub summary: String,
}

impl Summary {
    /// Sentinel summary substituted for a summarizer failure.
    pub fn unavailable() -> Self {
        Self {
            title: ERROR_TITLE.to_string(),
            summary: SUMMARY_UNAVAILABLE.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SummarizerError {
    #[error("summarizer is disabled")]
    Disabled,
    #[error("summarizer request failed: {0}")]
    Request(String),
    #[error("summarizer returned malformed output: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Provider name for logs (e.g. `"gemini"`).
    fn name(&self) -> &str;

    async fn summarize(&self, excerpt: &str) -> Result<Summary, SummarizerError>;
}

/// Prompt sent to LLM-backed summarizers.
pub fn summary_prompt(excerpt: &str) -> String {
    format!(
        r#"You are an educational assistant. Read the NCERT textbook content below.

Provide:
1. A concise, student-friendly title (5-10 words) for the content.
2. A summary of the content in 2-3 clear, student-friendly lines. Focus on what the learner will understand and connect it to textbook concepts.

Respond with a JSON object with exactly two string keys: "title" and "summary".

Content:
{}
"#,
        excerpt
    )
}

/// Parse raw summarizer output into a [`Summary`].
///
/// Accepts only a JSON object holding non-empty string `title` and
/// `summary` fields and nothing else.
pub fn parse_summary(raw: &str) -> Result<Summary, SummarizerError> {
    let value: serde_json::Value = serde_json::from_str(raw.trim())
        .map_err(|e| SummarizerError::Malformed(e.to_string()))?;
    // Derived struct impls also accept a sequence; only an object is valid.
    if !value.is_object() {
        return Err(SummarizerError::Malformed(
            "expected a JSON object".to_string(),
        ));
    }
    let summary: Summary =
        serde_json::from_value(value).map_err(|e| SummarizerError::Malformed(e.to_string()))?;
    if summary.title.trim().is_empty() || summary.summary.trim().is_empty() {
        return Err(SummarizerError::Malformed(
            "title and summary must not be empty".to_string(),
        ));
    }
    Ok(summary)
}

/// Map a summarizer result to a summary, substituting the sentinel on failure.
pub fn summary_or_fallback(result: Result<Summary, SummarizerError>) -> Summary {
    match result {
        Ok(summary) => summary,
        Err(e) => {
            warn!("summarization failed, using fallback: {}", e);
            Summary::unavailable()
        }
    }
}

/// A summarizer that always fails with [`SummarizerError::Disabled`].
pub struct DisabledSummarizer;

#[async_trait]
impl Summarizer for DisabledSummarizer {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn summarize(&self, _excerpt: &str) -> Result<Summary, SummarizerError> {
        Err(SummarizerError::Disabled)
    }
}
