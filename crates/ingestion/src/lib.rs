//! PaperCast Ingestion
//!
//! Turns papers into narrated summaries:
//! 1. Extracts text from uploads, URLs, DOIs and academic pages
//! 2. Classifies the topic against a fixed label set
//! 3. Summarizes the text
//! 4. Narrates the summary to an audio file
//! 5. Persists one record per paper

pub mod classify;
pub mod discovery;
pub mod errors;
pub mod extraction;
pub mod media;
pub mod pipeline;
pub mod services;
pub mod speech;
pub mod summarize;

pub use errors::IngestionError;
pub use pipeline::{Pipeline, PipelineStage, TopicSynthesis, UploadedPaper};
pub use services::Services;
