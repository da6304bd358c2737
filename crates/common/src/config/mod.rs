//! Configuration management for PaperCast services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Media storage (uploads and audio)
    #[serde(default)]
    pub media: MediaConfig,

    /// Remote document fetching
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Zero-shot topic classification
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Summarization
    #[serde(default)]
    pub summarizer: SummarizerConfig,

    /// Text-to-speech
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Paper discovery feed
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Pipeline behaviour
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Largest accepted upload body
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Primary database URL (for writes)
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Read replica URL (optional, falls back to primary)
    pub read_url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MediaConfig {
    /// Root directory; stored paths are relative to it
    #[serde(default = "default_media_root")]
    pub root: PathBuf,

    /// Sub-directory for synthesized audio
    #[serde(default = "default_audio_dir")]
    pub audio_dir: String,

    /// Sub-directory for uploaded papers
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractionConfig {
    /// Timeout for every outbound document fetch
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// DOI resolver prefixes, tried in order
    #[serde(default = "default_doi_resolvers")]
    pub doi_resolvers: Vec<String>,

    /// DOIs with this prefix resolve straight to the arXiv PDF
    #[serde(default = "default_arxiv_doi_prefix")]
    pub arxiv_doi_prefix: String,

    /// Base URL for arXiv PDFs
    #[serde(default = "default_arxiv_pdf_base")]
    pub arxiv_pdf_base: String,

    /// User agent sent with fetches
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Classifier implementation
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierProvider {
    #[serde(rename = "huggingface")]
    HuggingFace,
    Keyword,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_classifier_provider")]
    pub provider: ClassifierProvider,

    /// Inference API base URL
    #[serde(default = "default_inference_base")]
    pub api_base: String,

    /// API token for the inference service
    pub api_token: Option<String>,

    #[serde(default = "default_classifier_model")]
    pub model: String,

    /// Request timeout; unset means wait for the model
    pub timeout_secs: Option<u64>,
}

/// Summarizer implementation
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SummarizerProvider {
    #[serde(rename = "huggingface")]
    HuggingFace,
    Lead,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SummarizerConfig {
    #[serde(default = "default_summarizer_provider")]
    pub provider: SummarizerProvider,

    #[serde(default = "default_inference_base")]
    pub api_base: String,

    pub api_token: Option<String>,

    #[serde(default = "default_summarizer_model")]
    pub model: String,

    pub timeout_secs: Option<u64>,

    /// Input is truncated to this many characters
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,

    /// Lower output bound in words
    #[serde(default = "default_min_length")]
    pub min_length: usize,

    /// Upper output bound in words
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

/// Speech implementation
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpeechProvider {
    Google,
    Transcript,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpeechConfig {
    #[serde(default = "default_speech_provider")]
    pub provider: SpeechProvider,

    #[serde(default = "default_speech_base")]
    pub base_url: String,

    /// Spoken language code
    #[serde(default = "default_speech_language")]
    pub language: String,

    /// Maximum characters per synthesis request
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,

    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscoveryConfig {
    /// arXiv query endpoint
    #[serde(default = "default_discovery_base")]
    pub base_url: String,

    /// Entries ingested per search
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Candidate labels for topic classification
    #[serde(default = "default_topics")]
    pub topics: Vec<String>,

    /// Characters of text handed to the classifier
    #[serde(default = "default_classify_chars")]
    pub classify_chars: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8000 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_max_upload_bytes() -> usize { 25 * 1024 * 1024 }
fn default_database_url() -> String { "sqlite://papercast.db?mode=rwc".to_string() }
fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 1 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_media_root() -> PathBuf { PathBuf::from("media") }
fn default_audio_dir() -> String { "audios".to_string() }
fn default_upload_dir() -> String { "papers".to_string() }
fn default_fetch_timeout() -> u64 { 10 }
fn default_doi_resolvers() -> Vec<String> {
    vec!["https://doi.org/".to_string(), "http://dx.doi.org/".to_string()]
}
fn default_arxiv_doi_prefix() -> String { "10.48550/arXiv.".to_string() }
fn default_arxiv_pdf_base() -> String { "https://arxiv.org/pdf/".to_string() }
fn default_user_agent() -> String { format!("papercast/{}", crate::VERSION) }
fn default_classifier_provider() -> ClassifierProvider { ClassifierProvider::HuggingFace }
fn default_inference_base() -> String { "https://api-inference.huggingface.co/models".to_string() }
fn default_classifier_model() -> String { "facebook/bart-large-mnli".to_string() }
fn default_summarizer_provider() -> SummarizerProvider { SummarizerProvider::HuggingFace }
fn default_summarizer_model() -> String { "facebook/bart-large-cnn".to_string() }
fn default_max_input_chars() -> usize { 3000 }
fn default_min_length() -> usize { 120 }
fn default_max_length() -> usize { 360 }
fn default_speech_provider() -> SpeechProvider { SpeechProvider::Google }
fn default_speech_base() -> String { "https://translate.google.com".to_string() }
fn default_speech_language() -> String { "en".to_string() }
fn default_max_chunk_chars() -> usize { 100 }
fn default_discovery_base() -> String { "http://export.arxiv.org/api/query".to_string() }
fn default_max_results() -> usize { 5 }
fn default_topics() -> Vec<String> {
    crate::DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect()
}
fn default_classify_chars() -> usize { 500 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "papercast".to_string() }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8081
            .add_source(Self::environment())

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Self::environment())
            .build()?;

        config.try_deserialize()
    }

    fn environment() -> Environment {
        Environment::with_prefix("APP")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("pipeline.topics")
            .with_list_parse_key("extraction.doi_resolvers")
            .try_parsing(true)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }
}

impl ExtractionConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            read_url: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: default_media_root(),
            audio_dir: default_audio_dir(),
            upload_dir: default_upload_dir(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: default_fetch_timeout(),
            doi_resolvers: default_doi_resolvers(),
            arxiv_doi_prefix: default_arxiv_doi_prefix(),
            arxiv_pdf_base: default_arxiv_pdf_base(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            provider: default_classifier_provider(),
            api_base: default_inference_base(),
            api_token: None,
            model: default_classifier_model(),
            timeout_secs: None,
        }
    }
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            provider: default_summarizer_provider(),
            api_base: default_inference_base(),
            api_token: None,
            model: default_summarizer_model(),
            timeout_secs: None,
            max_input_chars: default_max_input_chars(),
            min_length: default_min_length(),
            max_length: default_max_length(),
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            provider: default_speech_provider(),
            base_url: default_speech_base(),
            language: default_speech_language(),
            max_chunk_chars: default_max_chunk_chars(),
            timeout_secs: default_fetch_timeout(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            base_url: default_discovery_base(),
            max_results: default_max_results(),
            timeout_secs: default_fetch_timeout(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            topics: default_topics(),
            classify_chars: default_classify_chars(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            media: MediaConfig::default(),
            extraction: ExtractionConfig::default(),
            classifier: ClassifierConfig::default(),
            summarizer: SummarizerConfig::default(),
            speech: SpeechConfig::default(),
            discovery: DiscoveryConfig::default(),
            pipeline: PipelineConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}
