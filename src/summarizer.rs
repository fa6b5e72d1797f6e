//! LLM-backed summarizers.
//!
//! Both backends ask the model for JSON output and hand the raw text to
//! [`parse_summary`], which accepts nothing but `{title, summary}`. Neither
//! retries: a failed call becomes a [`SummarizerError`] and the mapping
//! service substitutes its fallback summary.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use concept_mapper_core::summarize::{
    parse_summary, summary_prompt, DisabledSummarizer, Summarizer, SummarizerError, Summary,
};

use crate::config::SummarizerConfig;

const GEMINI_URL: &str = "https://generativelanguage.googleapis.com";
const GEMINI_MODEL: &str = "gemini-1.5-flash";
const OLLAMA_URL: &str = "http://localhost:11434";
const OLLAMA_MODEL: &str = "llama3.2";

fn http_client(config: &SummarizerConfig) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?)
}

/// Send `request` and return the JSON response. Transport and HTTP errors
/// become [`SummarizerError::Request`].
async fn post_json(
    request: reqwest::RequestBuilder,
    label: &str,
) -> Result<serde_json::Value, SummarizerError> {
    let response = request
        .send()
        .await
        .map_err(|e| SummarizerError::Request(format!("{}: {}", label, e)))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SummarizerError::Request(format!(
            "{} API error {}: {}",
            label, status, body
        )));
    }

    response
        .json()
        .await
        .map_err(|e| SummarizerError::Malformed(format!("{} response body: {}", label, e)))
}

// ============ Gemini ============

/// Google Gemini `generateContent` with `responseMimeType = application/json`.
/// The API key is read from `GEMINI_API_KEY`.
pub struct GeminiSummarizer {
    model: String,
    url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiSummarizer {
    pub fn new(config: &SummarizerConfig) -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| anyhow!("GEMINI_API_KEY environment variable not set"))?;
        Self::with_key(config, api_key)
    }

    fn with_key(config: &SummarizerConfig, api_key: String) -> Result<Self> {
        Ok(Self {
            model: config
                .model
                .clone()
                .unwrap_or_else(|| GEMINI_MODEL.to_string()),
            url: config
                .url
                .as_deref()
                .unwrap_or(GEMINI_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key,
            client: http_client(config)?,
        })
    }
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn summarize(&self, excerpt: &str) -> Result<Summary, SummarizerError> {
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": summary_prompt(excerpt) }] }],
            "generationConfig": { "responseMimeType": "application/json" }
        });
        let request = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&body);

        let json = post_json(request, "Gemini").await?;
        let text = json
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(|t| t.as_str())
            .ok_or_else(|| {
                SummarizerError::Malformed("Gemini response has no candidate text".to_string())
            })?;

        debug!(model = %self.model, chars = text.len(), "gemini responded");
        parse_summary(text)
    }
}

// ============ Ollama ============

/// Local Ollama `/api/generate` with `format = "json"`.
pub struct OllamaSummarizer {
    model: String,
    url: String,
    client: reqwest::Client,
}

impl OllamaSummarizer {
    pub fn new(config: &SummarizerConfig) -> Result<Self> {
        Ok(Self {
            model: config
                .model
                .clone()
                .unwrap_or_else(|| OLLAMA_MODEL.to_string()),
            url: config
                .url
                .as_deref()
                .unwrap_or(OLLAMA_URL)
                .trim_end_matches('/')
                .to_string(),
            client: http_client(config)?,
        })
    }
}

#[async_trait]
impl Summarizer for OllamaSummarizer {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn summarize(&self, excerpt: &str) -> Result<Summary, SummarizerError> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": summary_prompt(excerpt),
            "format": "json",
            "stream": false
        });
        let request = self
            .client
            .post(format!("{}/api/generate", self.url))
            .json(&body);

        let json = post_json(request, "Ollama").await?;
        let text = json
            .get("response")
            .and_then(|t| t.as_str())
            .ok_or_else(|| {
                SummarizerError::Malformed("Ollama response has no `response` field".to_string())
            })?;

        parse_summary(text)
    }
}

/// Create the [`Summarizer`] named by `summarizer.provider`.
pub fn create_summarizer(config: &SummarizerConfig) -> Result<Arc<dyn Summarizer>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledSummarizer)),
        "gemini" => Ok(Arc::new(GeminiSummarizer::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaSummarizer::new(config)?)),
        other => bail!("Unknown summarizer provider: {}", other),
    }
}
