//! Capability services shared by every pipeline run

use crate::classify::{create_classifier, TopicClassifier};
use crate::discovery::{create_discovery, PaperDiscovery};
use crate::errors::IngestionError;
use crate::extraction::{DocumentExtractor, TextExtractor};
use crate::speech::{create_speech_engine, Narrator};
use crate::summarize::{create_summarizer, Summarizer};
use papercast_common::AppConfig;
use std::sync::Arc;
use tracing::info;

/// One instance of each capability, built once at startup and never mutated
#[derive(Clone)]
pub struct Services {
    pub extractor: Arc<dyn TextExtractor>,
    pub classifier: Arc<dyn TopicClassifier>,
    pub summarizer: Arc<dyn Summarizer>,
    pub narrator: Narrator,
    pub discovery: Arc<dyn PaperDiscovery>,
}

impl Services {
    /// Build every service selected by configuration
    pub fn from_config(config: &AppConfig) -> Result<Self, IngestionError> {
        let services = Self {
            extractor: Arc::new(DocumentExtractor::new(&config.extraction)?),
            classifier: create_classifier(&config.classifier)?,
            summarizer: create_summarizer(&config.summarizer)?,
            narrator: Narrator::new(create_speech_engine(&config.speech)?),
            discovery: create_discovery(&config.discovery)?,
        };

        info!(
            classifier = services.classifier.model_name(),
            summarizer = services.summarizer.model_name(),
            speech = services.narrator.engine_name(),
            "Services initialized"
        );

        Ok(services)
    }
}
