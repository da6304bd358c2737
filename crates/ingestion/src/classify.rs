//! Zero-shot topic classification
//!
//! Provides a unified interface over:
//! - Hugging Face inference API (bart-large-mnli and friends)
//! - An offline keyword classifier for development and tests

use crate::errors::IngestionError;
use async_trait::async_trait;
use papercast_common::config::{ClassifierConfig, ClassifierProvider};
use papercast_common::metrics::record_upstream;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Trait for topic classification
#[async_trait]
pub trait TopicClassifier: Send + Sync {
    /// Pick the best matching label; the result is always a member of `labels`
    async fn classify(&self, text: &str, labels: &[String]) -> Result<String, IngestionError>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Choose the highest ranked candidate that is one of `labels`
fn best_member(ranked: impl IntoIterator<Item = String>, labels: &[String]) -> Option<String> {
    ranked.into_iter().find(|candidate| labels.contains(candidate))
}

fn ensure_labels(labels: &[String]) -> Result<(), IngestionError> {
    if labels.is_empty() {
        return Err(IngestionError::InvalidInput(
            "at least one candidate label is required".to_string(),
        ));
    }
    Ok(())
}

/// Hugging Face zero-shot classification client
pub struct HuggingFaceClassifier {
    client: reqwest::Client,
    endpoint: String,
    api_token: Option<String>,
    model: String,
}

#[derive(Serialize)]
struct ZeroShotRequest<'a> {
    inputs: &'a str,
    parameters: ZeroShotParameters<'a>,
}

#[derive(Serialize)]
struct ZeroShotParameters<'a> {
    candidate_labels: &'a [String],
}

/// The inference API answers in one of two shapes depending on the backend
#[derive(Deserialize)]
#[serde(untagged)]
enum ZeroShotResponse {
    Ranked { labels: Vec<String> },
    Scored(Vec<ScoredLabel>),
}

#[derive(Deserialize)]
struct ScoredLabel {
    label: String,
    score: f64,
}

impl ZeroShotResponse {
    fn into_ranked(self) -> Vec<String> {
        match self {
            ZeroShotResponse::Ranked { labels } => labels,
            ZeroShotResponse::Scored(mut scored) => {
                scored.sort_by(|a, b| b.score.total_cmp(&a.score));
                scored.into_iter().map(|s| s.label).collect()
            }
        }
    }
}

impl HuggingFaceClassifier {
    /// Create a new classifier client
    pub fn new(config: &ClassifierConfig) -> Result<Self, IngestionError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: format!("{}/{}", config.api_base.trim_end_matches('/'), config.model),
            api_token: config.api_token.clone(),
            model: config.model.clone(),
        })
    }

    async fn make_request(&self, text: &str, labels: &[String]) -> Result<Vec<String>, IngestionError> {
        let request = ZeroShotRequest {
            inputs: text,
            parameters: ZeroShotParameters {
                candidate_labels: labels,
            },
        };

        let mut call = self.client.post(&self.endpoint).json(&request);
        if let Some(ref token) = self.api_token {
            call = call.bearer_auth(token);
        }

        let response = call
            .send()
            .await
            .map_err(|e| IngestionError::upstream("classifier", format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(IngestionError::upstream(
                "classifier",
                format!("API error {}: {}", status, body),
            ));
        }

        let parsed: ZeroShotResponse = response.json().await.map_err(|e| {
            IngestionError::upstream("classifier", format!("Failed to parse response: {}", e))
        })?;

        Ok(parsed.into_ranked())
    }
}

#[async_trait]
impl TopicClassifier for HuggingFaceClassifier {
    async fn classify(&self, text: &str, labels: &[String]) -> Result<String, IngestionError> {
        ensure_labels(labels)?;

        let result = self.make_request(text, labels).await;
        record_upstream("classifier", result.is_ok());
        let ranked = result?;

        Ok(best_member(ranked, labels).unwrap_or_else(|| {
            tracing::warn!(model = %self.model, "Classifier ranked no candidate label, using the first");
            labels[0].clone()
        }))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Offline classifier: scores labels by keyword occurrences
pub struct KeywordClassifier;

impl KeywordClassifier {
    /// Words that count towards a label besides the label's own words
    fn vocabulary(label: &str) -> &'static [&'static str] {
        match label.to_lowercase().as_str() {
            "ai" => &[
                "artificial intelligence", "machine learning", "neural", "deep learning",
                "language model", "transformer", "reinforcement",
            ],
            "quantum computing" => &["qubit", "quantum", "entanglement", "superconducting"],
            "climate" => &["climate", "carbon", "emission", "warming", "weather", "ocean"],
            "biology" => &["cell", "gene", "protein", "organism", "evolution", "dna"],
            "medicine" => &["patient", "clinical", "disease", "treatment", "therapy", "drug"],
            _ => &[],
        }
    }

    /// `text` must already be lowercase
    fn score(text: &str, label: &str) -> usize {
        let tokens: Vec<&str> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        let count = |term: &str, exact: bool| -> usize {
            if term.contains(' ') {
                text.matches(term).count()
            } else if exact {
                tokens.iter().filter(|t| **t == term).count()
            } else {
                tokens.iter().filter(|t| t.starts_with(term)).count()
            }
        };

        let own = label.to_lowercase();
        let own_score = count(&own, true);
        let vocabulary_score: usize = Self::vocabulary(label)
            .iter()
            .map(|term| count(term, false))
            .sum();

        own_score + vocabulary_score
    }
}

#[async_trait]
impl TopicClassifier for KeywordClassifier {
    async fn classify(&self, text: &str, labels: &[String]) -> Result<String, IngestionError> {
        ensure_labels(labels)?;

        let text = text.to_lowercase();
        let mut best = &labels[0];
        let mut best_score = 0;

        // strict comparison keeps the earlier label on ties
        for label in labels {
            let score = Self::score(&text, label);
            if score > best_score {
                best = label;
                best_score = score;
            }
        }

        Ok(best.clone())
    }

    fn model_name(&self) -> &str {
        "keyword"
    }
}

/// Create a classifier based on configuration
pub fn create_classifier(config: &ClassifierConfig) -> Result<Arc<dyn TopicClassifier>, IngestionError> {
    Ok(match config.provider {
        ClassifierProvider::HuggingFace => Arc::new(HuggingFaceClassifier::new(config)?),
        ClassifierProvider::Keyword => Arc::new(KeywordClassifier),
    })
}
