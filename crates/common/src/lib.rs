//! PaperCast Common Library
//!
//! Shared code for the PaperCast crates including:
//! - Paper entity and repository
//! - Error types and HTTP mapping
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{DbPool, NewPaper, Repository};
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Topic labels used for zero-shot classification when none are configured
pub const DEFAULT_TOPICS: &[&str] = &["AI", "Quantum Computing", "Climate", "Biology", "Medicine"];
