//! Summarization
//!
//! Input is truncated to a fixed character budget and summarized in a single
//! call. Every implementation clamps its output to the configured maximum
//! number of words, so the bound holds whatever the upstream model returns.

use crate::errors::IngestionError;
use async_trait::async_trait;
use papercast_common::config::{SummarizerConfig, SummarizerProvider};
use papercast_common::metrics::record_upstream;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Length limits applied around every summarization call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryBounds {
    /// Input characters kept before summarizing
    pub max_input_chars: usize,
    /// Lower output bound in words, passed to the model
    pub min_length: usize,
    /// Upper output bound in words, always enforced
    pub max_length: usize,
}

impl SummaryBounds {
    pub fn from_config(config: &SummarizerConfig) -> Self {
        Self {
            max_input_chars: config.max_input_chars,
            min_length: config.min_length.min(config.max_length),
            max_length: config.max_length,
        }
    }

    /// Keep at most `max_input_chars` characters
    pub fn truncate_input<'a>(&self, text: &'a str) -> &'a str {
        match text.char_indices().nth(self.max_input_chars) {
            Some((idx, _)) => &text[..idx],
            None => text,
        }
    }

    /// Keep at most `max_length` words
    pub fn clamp_output(&self, summary: &str) -> String {
        summary
            .split_whitespace()
            .take(self.max_length)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Trait for summarization
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Condense `text` into at most `max_length` words
    async fn summarize(&self, text: &str) -> Result<String, IngestionError>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Hugging Face summarization client
pub struct HuggingFaceSummarizer {
    client: reqwest::Client,
    endpoint: String,
    api_token: Option<String>,
    model: String,
    bounds: SummaryBounds,
}

#[derive(Serialize)]
struct SummarizationRequest<'a> {
    inputs: &'a str,
    parameters: SummarizationParameters,
}

#[derive(Serialize)]
struct SummarizationParameters {
    min_length: usize,
    max_length: usize,
    do_sample: bool,
}

#[derive(Deserialize)]
struct SummarizationOutput {
    summary_text: String,
}

impl HuggingFaceSummarizer {
    /// Create a new summarizer client
    pub fn new(config: &SummarizerConfig) -> Result<Self, IngestionError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: format!("{}/{}", config.api_base.trim_end_matches('/'), config.model),
            api_token: config.api_token.clone(),
            model: config.model.clone(),
            bounds: SummaryBounds::from_config(config),
        })
    }

    async fn make_request(&self, text: &str) -> Result<String, IngestionError> {
        let request = SummarizationRequest {
            inputs: text,
            parameters: SummarizationParameters {
                min_length: self.bounds.min_length,
                max_length: self.bounds.max_length,
                do_sample: false,
            },
        };

        let mut call = self.client.post(&self.endpoint).json(&request);
        if let Some(ref token) = self.api_token {
            call = call.bearer_auth(token);
        }

        let response = call
            .send()
            .await
            .map_err(|e| IngestionError::upstream("summarizer", format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(IngestionError::upstream(
                "summarizer",
                format!("API error {}: {}", status, body),
            ));
        }

        let outputs: Vec<SummarizationOutput> = response.json().await.map_err(|e| {
            IngestionError::upstream("summarizer", format!("Failed to parse response: {}", e))
        })?;

        outputs
            .into_iter()
            .next()
            .map(|o| o.summary_text)
            .ok_or_else(|| IngestionError::upstream("summarizer", "Empty response"))
    }
}

#[async_trait]
impl Summarizer for HuggingFaceSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, IngestionError> {
        let input = self.bounds.truncate_input(text.trim());
        if input.is_empty() {
            return Ok(String::new());
        }

        let result = self.make_request(input).await;
        record_upstream("summarizer", result.is_ok());

        Ok(self.bounds.clamp_output(&result?))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Offline extractive summarizer: leading sentences up to the word bound
pub struct LeadSummarizer {
    bounds: SummaryBounds,
}

impl LeadSummarizer {
    pub fn new(bounds: SummaryBounds) -> Self {
        Self { bounds }
    }
}

#[async_trait]
impl Summarizer for LeadSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, IngestionError> {
        let input = self.bounds.truncate_input(text.trim());

        let mut words = 0;
        let mut sentences = Vec::new();
        for sentence in input.split_inclusive(['.', '!', '?']) {
            let sentence = sentence.split_whitespace().collect::<Vec<_>>().join(" ");
            if sentence.is_empty() {
                continue;
            }
            let count = sentence.split(' ').count();
            if words + count > self.bounds.max_length && !sentences.is_empty() {
                break;
            }
            words += count;
            sentences.push(sentence);
        }

        Ok(self.bounds.clamp_output(&sentences.join(" ")))
    }

    fn model_name(&self) -> &str {
        "lead"
    }
}

/// Create a summarizer based on configuration
pub fn create_summarizer(config: &SummarizerConfig) -> Result<Arc<dyn Summarizer>, IngestionError> {
    Ok(match config.provider {
        SummarizerProvider::HuggingFace => Arc::new(HuggingFaceSummarizer::new(config)?),
        SummarizerProvider::Lead => Arc::new(LeadSummarizer::new(SummaryBounds::from_config(config))),
    })
}
