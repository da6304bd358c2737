//! API handlers module

pub mod health;
pub mod ingest;
pub mod papers;
pub mod search;
pub mod synthesis;

use papercast_common::errors::{AppError, Result};

/// Non-blank value of a required request field
pub(crate) fn required(value: Option<String>, field: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::MissingField {
            field: field.to_string(),
        })
}
