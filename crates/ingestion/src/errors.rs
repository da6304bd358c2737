//! Ingestion error types

use papercast_common::errors::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("PDF parse error for {path}: {message}")]
    PdfParseError { path: String, message: String },

    #[error("{service} request failed: {message}")]
    Upstream {
        service: &'static str,
        message: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Feed parse error: {0}")]
    FeedParse(#[from] quick_xml::DeError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl IngestionError {
    pub(crate) fn upstream(service: &'static str, message: impl Into<String>) -> Self {
        IngestionError::Upstream {
            service,
            message: message.into(),
        }
    }
}

impl From<IngestionError> for AppError {
    fn from(e: IngestionError) -> Self {
        match e {
            IngestionError::PdfParseError { message, .. } => AppError::ExtractionFailed {
                source_kind: "document".to_string(),
                detail: Some(message),
            },
            IngestionError::Upstream { service, message } => AppError::Upstream {
                service: service.to_string(),
                message,
            },
            IngestionError::InvalidInput(message) => AppError::Validation {
                message,
                field: None,
            },
            IngestionError::FeedParse(e) => AppError::Upstream {
                service: "discovery".to_string(),
                message: e.to_string(),
            },
            IngestionError::Http(e) => AppError::HttpClient(e),
            IngestionError::IoError(e) => AppError::from(e),
            IngestionError::Join(e) => AppError::Internal {
                message: e.to_string(),
            },
        }
    }
}
