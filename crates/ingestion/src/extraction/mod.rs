//! Text extraction from local documents, URLs, DOIs and academic pages
//!
//! Remote documents are downloaded into a scoped temporary file and handed to
//! the PDF extractor; the file is removed when the scope ends, whatever the
//! outcome. Fetch failures yield empty text rather than errors, and callers
//! treat empty text as an extraction failure.

pub mod html;
pub mod pdf;

use crate::errors::IngestionError;
use async_trait::async_trait;
use papercast_common::config::ExtractionConfig;
use papercast_common::metrics::record_upstream;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

const PDF_MIME: &str = "application/pdf";

/// Title and readable text scraped from a web page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapedPage {
    pub title: Option<String>,
    pub text: String,
}

/// Trait for text extraction
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Plain text of every page of a local document, pages separated by newlines
    async fn extract_from_file(&self, path: &Path) -> Result<String, IngestionError>;

    /// Text of the document behind `url`; empty when it cannot be fetched
    async fn extract_from_url(&self, url: &str) -> Result<String, IngestionError>;

    /// Text of the PDF a DOI resolves to; empty when no resolver yields one
    async fn extract_from_doi(&self, doi: &str) -> Result<String, IngestionError>;

    /// `<title>` of the HTML page at `url`, if it is an HTML page and has one
    async fn page_title(&self, url: &str) -> Result<Option<String>, IngestionError>;

    /// Title and article text of an academic web page
    async fn extract_from_page(&self, url: &str) -> Result<ScrapedPage, IngestionError>;

    /// Landing page of a DOI, used to look up its title
    fn doi_landing_url(&self, doi: &str) -> Option<String>;
}

/// PDF and web extractor backed by lopdf and reqwest
pub struct DocumentExtractor {
    client: reqwest::Client,
    doi_resolvers: Vec<String>,
    arxiv_doi_prefix: String,
    arxiv_pdf_base: String,
}

impl DocumentExtractor {
    /// Create a new extractor
    pub fn new(config: &ExtractionConfig) -> Result<Self, IngestionError> {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout())
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            doi_resolvers: config.doi_resolvers.clone(),
            arxiv_doi_prefix: config.arxiv_doi_prefix.clone(),
            arxiv_pdf_base: config.arxiv_pdf_base.clone(),
        })
    }

    /// Direct PDF URL for archive DOIs (`10.48550/arXiv.<id>`)
    pub fn arxiv_pdf_url(&self, doi: &str) -> Option<String> {
        doi.strip_prefix(&self.arxiv_doi_prefix)
            .filter(|id| !id.is_empty())
            .map(|id| format!("{}{}.pdf", self.arxiv_pdf_base, id))
    }

    /// Candidate resolver URLs for a DOI, in the order they are tried
    pub fn resolver_urls(&self, doi: &str) -> Vec<String> {
        self.doi_resolvers
            .iter()
            .map(|prefix| {
                if doi.starts_with(prefix.as_str()) {
                    doi.to_string()
                } else {
                    format!("{}{}", prefix, doi)
                }
            })
            .collect()
    }

    /// Write the payload to a scoped temp file and extract it
    async fn extract_from_bytes(&self, bytes: Vec<u8>) -> Result<String, IngestionError> {
        tokio::task::spawn_blocking(move || {
            let mut file = tempfile::Builder::new()
                .prefix("papercast-")
                .suffix(".pdf")
                .tempfile()?;
            file.write_all(&bytes)?;
            file.flush()?;

            // The temp file is deleted when `file` drops, on success or error
            pdf::extract_text_from_pdf(file.path())
        })
        .await?
    }

    /// Fetch `url` asking for a PDF; `None` unless the response is a PDF
    async fn fetch_pdf(&self, url: &str) -> Result<Option<Vec<u8>>, IngestionError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, PDF_MIME)
            .send()
            .await?;

        let is_pdf = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains(PDF_MIME))
            .unwrap_or(false);

        if !response.status().is_success() || !is_pdf {
            debug!(url, status = %response.status(), is_pdf, "Resolver did not return a PDF");
            return Ok(None);
        }

        Ok(Some(response.bytes().await?.to_vec()))
    }
}

#[async_trait]
impl TextExtractor for DocumentExtractor {
    async fn extract_from_file(&self, path: &Path) -> Result<String, IngestionError> {
        let path: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || pdf::extract_text_from_pdf(&path)).await?
    }

    #[instrument(skip(self))]
    async fn extract_from_url(&self, url: &str) -> Result<String, IngestionError> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Document fetch failed");
                record_upstream("fetch", false);
                return Ok(String::new());
            }
        };

        if !response.status().is_success() {
            warn!(status = %response.status(), "Document fetch returned non-success status");
            record_upstream("fetch", false);
            return Ok(String::new());
        }

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(e) => {
                warn!(error = %e, "Failed to read document body");
                record_upstream("fetch", false);
                return Ok(String::new());
            }
        };

        record_upstream("fetch", true);
        info!(bytes = bytes.len(), "Document downloaded");

        self.extract_from_bytes(bytes).await
    }

    #[instrument(skip(self))]
    async fn extract_from_doi(&self, doi: &str) -> Result<String, IngestionError> {
        if let Some(pdf_url) = self.arxiv_pdf_url(doi) {
            info!(%pdf_url, "Resolving archive DOI directly");
            return self.extract_from_url(&pdf_url).await;
        }

        for url in self.resolver_urls(doi) {
            let bytes = match self.fetch_pdf(&url).await {
                Ok(Some(bytes)) => bytes,
                Ok(None) => continue,
                Err(e) => {
                    warn!(%url, error = %e, "DOI resolver failed, trying next");
                    continue;
                }
            };

            match self.extract_from_bytes(bytes).await {
                Ok(text) => {
                    record_upstream("doi", true);
                    info!(%url, "DOI resolved to PDF");
                    return Ok(text);
                }
                Err(e) => {
                    warn!(%url, error = %e, "Resolved PDF could not be read, trying next");
                }
            }
        }

        record_upstream("doi", false);
        warn!("No resolver produced a PDF");
        Ok(String::new())
    }

    async fn page_title(&self, url: &str) -> Result<Option<String>, IngestionError> {
        let response = self.client.get(url).send().await?;

        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("html"))
            .unwrap_or(false);

        if !response.status().is_success() || !is_html {
            return Ok(None);
        }

        let body = response.text().await?;
        Ok(html::page_title(&body))
    }

    #[instrument(skip(self))]
    async fn extract_from_page(&self, url: &str) -> Result<ScrapedPage, IngestionError> {
        let response = match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                warn!(status = %response.status(), "Page fetch returned non-success status");
                record_upstream("fetch", false);
                return Ok(ScrapedPage::default());
            }
            Err(e) => {
                warn!(error = %e, "Page fetch failed");
                record_upstream("fetch", false);
                return Ok(ScrapedPage::default());
            }
        };

        let body = response.text().await?;
        record_upstream("fetch", true);

        Ok(ScrapedPage {
            title: html::page_title(&body),
            text: html::academic_text(&body),
        })
    }

    fn doi_landing_url(&self, doi: &str) -> Option<String> {
        self.resolver_urls(doi).into_iter().next()
    }
}
